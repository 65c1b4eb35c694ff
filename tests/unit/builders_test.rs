//! Tests for builder modules

use std::sync::Arc;

use slot_sniper::builders::SchedulerBuilder;
use slot_sniper::config::RunConfig;
use slot_sniper::core::{Account, ConfigError, Credential, Task};
use slot_sniper::infra::ScriptedTransport;

fn config() -> RunConfig {
    let mut cfg = RunConfig::new("612773420");
    cfg.accounts = vec![Account {
        name: "alice".to_string(),
        credential: Credential::new("PHPSESSID=abc"),
        preferred_cards: vec![],
    }];
    cfg.tasks = vec![Task {
        title_keywords: vec!["Swimming".to_string()],
        ..Task::default()
    }];
    cfg.utc_offset_minutes = Some(480);
    cfg
}

#[test]
fn test_scheduler_builder_defaults() {
    let scheduler = SchedulerBuilder::new(config())
        .transport(Arc::new(ScriptedTransport::new()))
        .build()
        .unwrap();
    assert_eq!(scheduler.config().tasks[0].id, "task-1");
    assert_eq!(scheduler.config().shop_id, "612773420");
}

#[test]
fn test_scheduler_builder_requires_transport() {
    let err = SchedulerBuilder::new(config()).build().err().unwrap();
    assert_eq!(err, ConfigError::Invalid("transport not set".to_string()));
}

#[test]
fn test_scheduler_builder_validates_config() {
    let mut cfg = config();
    cfg.tasks[0].title_keywords.clear();
    let err = SchedulerBuilder::new(cfg)
        .transport(Arc::new(ScriptedTransport::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::MissingFilter(_)));
}
