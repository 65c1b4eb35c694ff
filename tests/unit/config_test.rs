//! Tests for run configuration validation

use slot_sniper::config::RunConfig;
use slot_sniper::core::{Account, ConfigError, Credential, DateRule, DateSpec, Task};
use slot_sniper::util::DelayRange;

fn account(name: &str) -> Account {
    Account {
        name: name.to_string(),
        credential: Credential::new("PHPSESSID=abc"),
        preferred_cards: vec![],
    }
}

fn task(title: &str) -> Task {
    Task {
        title_keywords: vec![title.to_string()],
        ..Task::default()
    }
}

fn valid() -> RunConfig {
    let mut cfg = RunConfig::new("612773420");
    cfg.accounts = vec![account("alice")];
    cfg.tasks = vec![task("Swimming")];
    cfg.normalized()
}

#[test]
fn test_run_config_validation() {
    assert!(valid().validate().is_ok());
}

#[test]
fn test_default_task_ids() {
    let mut cfg = valid();
    cfg.tasks.push(task("Yoga"));
    cfg.tasks[1].id = String::new();
    let cfg = cfg.normalized();
    assert_eq!(cfg.tasks[0].id, "task-1");
    assert_eq!(cfg.tasks[1].id, "task-2");
}

#[test]
fn test_run_config_empty_shop() {
    let mut cfg = valid();
    cfg.shop_id = "  ".to_string();
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_run_config_requires_accounts_and_tasks() {
    let mut cfg = valid();
    cfg.accounts.clear();
    assert!(cfg.validate().is_err());

    let mut cfg = valid();
    cfg.tasks.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_task_without_filter_rejected() {
    let mut cfg = valid();
    cfg.tasks[0].title_keywords = vec!["  ".to_string()];
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::MissingFilter("task-1".to_string()))
    );

    cfg.tasks[0].course_id = Some("89007443".to_string());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_inverted_delay_rejected() {
    let mut cfg = valid();
    cfg.tasks[0].delay = DelayRange {
        min_ms: 300,
        max_ms: 120,
    };
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::InvalidDelayRange {
            task: "task-1".to_string(),
            min_ms: 300,
            max_ms: 120,
        })
    );
}

#[test]
fn test_zero_attempts_and_concurrency_rejected() {
    let mut cfg = valid();
    cfg.tasks[0].max_attempts = 0;
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::InvalidMaxAttempts("task-1".to_string()))
    );

    let mut cfg = valid();
    cfg.concurrency = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_blank_credential_and_duplicate_names() {
    let mut cfg = valid();
    cfg.accounts[0].credential = Credential::new(" ");
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::MissingCredential("alice".to_string()))
    );

    let mut cfg = valid();
    cfg.accounts.push(account("alice"));
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_unknown_account_assignment() {
    let mut cfg = valid();
    cfg.tasks[0].accounts = vec!["mallory".to_string()];
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::UnknownAccount { .. })
    ));
}

#[test]
fn test_from_json_str() {
    let cfg = RunConfig::from_json_str(
        r#"{
            "shop_id": "612773420",
            "accounts": [{"name": "alice", "credential": "PHPSESSID=abc"}],
            "tasks": [{
                "title_keywords": ["游泳馆"],
                "date": {"kind": "range", "start": "2024-11-01", "end": "2024-11-03"},
                "max_attempts": 2
            }],
            "date_rule": "plus_7_after_17",
            "utc_offset_minutes": 480
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.tasks[0].id, "task-1");
    assert_eq!(cfg.tasks[0].max_attempts, 2);
    assert!(cfg.tasks[0].strict_match);
    assert_eq!(cfg.tasks[0].delay, DelayRange::default());
    assert!(matches!(cfg.tasks[0].date, Some(DateSpec::Range { .. })));
    assert_eq!(cfg.date_rule, Some(DateRule::Plus7After17));
    assert_eq!(cfg.concurrency, 1);
    assert_eq!(cfg.utc_offset().map(|o| o.local_minus_utc()), Some(8 * 3600));
}

#[test]
fn test_from_json_str_parse_error() {
    assert!(matches!(
        RunConfig::from_json_str("{not json"),
        Err(ConfigError::Invalid(_))
    ));
}
