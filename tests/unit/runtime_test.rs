//! Tests for the tokio runtime driver

use std::sync::Arc;
use std::time::Duration;

use slot_sniper::builders::SchedulerBuilder;
use slot_sniper::config::RunConfig;
use slot_sniper::core::{
    Account, Course, CourseListing, Credential, DateSpec, InMemoryOutcomeSink, Occupancy,
    ReasonCode, Task,
};
use slot_sniper::infra::ScriptedTransport;
use slot_sniper::runtime::{block_on_run, build_runtime, worker_threads};
use slot_sniper::util::FixedDelay;

#[test]
fn test_worker_threads_bounds() {
    assert_eq!(worker_threads(0), 1);
    assert_eq!(worker_threads(1), 1);
    assert!(worker_threads(10_000) <= num_cpus::get());
}

#[test]
fn test_build_runtime() {
    let runtime = build_runtime(2).expect("runtime");
    let value = runtime.block_on(async { 123 });
    assert_eq!(value, 123);
}

#[test]
fn test_block_on_run_drives_scheduler() {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 11, 8).unwrap();
    let mut cfg = RunConfig::new("612773420");
    cfg.accounts = vec![Account {
        name: "alice".to_string(),
        credential: Credential::new("PHPSESSID=abc"),
        preferred_cards: vec![],
    }];
    cfg.tasks = vec![Task {
        title_keywords: vec!["Swimming".to_string()],
        allow_fallback: false,
        date: Some(DateSpec::Single { date }),
        ..Task::default()
    }];

    let transport = ScriptedTransport::new().with_listing(
        date,
        CourseListing::with_courses(vec![Course {
            id: "1".to_string(),
            title: "Yoga".to_string(),
            time_label: "08:00-09:00".to_string(),
            occupancy: Occupancy::Available,
            required_card_hints: vec![],
            taken: 0,
            total: 10,
            href: String::new(),
        }]),
    );
    let sink = Arc::new(InMemoryOutcomeSink::new(16));
    let scheduler = SchedulerBuilder::new(cfg)
        .transport(Arc::new(transport))
        .sampler(Arc::new(FixedDelay(Duration::ZERO)))
        .sink(sink.clone())
        .build()
        .unwrap();

    let report = block_on_run(&scheduler).unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].reason, ReasonCode::NoMatch);
    assert!(!report.succeeded());
    assert_eq!(sink.outcomes().len(), 1);
}
