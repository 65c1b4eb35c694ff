//! Tests for the layered configuration loader

use std::path::PathBuf;

use slot_sniper::config::ConfigLoader;
use slot_sniper::core::DateRule;

const ACCOUNTS: &str = r#"[{"name":"alice","cookie":"PHPSESSID=abc","preferred_cards":"次卡"}]"#;
const TASKS: &str = r#"[{"title_keywords":"游泳馆|健身中心","time_keywords":"12:30","delay_ms":[50,80]}]"#;

struct EnvFile(PathBuf);

impl EnvFile {
    fn write(contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("slot-sniper-{}.env", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).expect("write env file");
        Self(path)
    }
}

impl Drop for EnvFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn base_env() -> Vec<(&'static str, &'static str)> {
    vec![("SHOP_ID", "612773420"), ("ACCOUNTS", ACCOUNTS), ("TASKS", TASKS)]
}

#[test]
fn test_loader_builds_typed_config() {
    let cfg = ConfigLoader::new()
        .without_env_file()
        .with_env(base_env())
        .load()
        .unwrap();

    assert_eq!(cfg.shop_id, "612773420");
    assert_eq!(cfg.accounts[0].preferred_cards, vec!["次卡"]);
    assert_eq!(cfg.tasks[0].id, "task-1");
    assert_eq!(cfg.tasks[0].title_keywords, vec!["游泳馆", "健身中心"]);
    assert_eq!(cfg.tasks[0].delay.min_ms, 50);
    assert_eq!(cfg.concurrency, 1);
    assert!(!cfg.log_json);
    assert_eq!(cfg.date_rule, None);
}

#[test]
fn test_loader_precedence() {
    let file = EnvFile::write(&format!(
        "SHOP_ID=from-file\nCONCURRENCY=2\nLOG_JSON=true\nDATE_RULE=today\nACCOUNTS='{ACCOUNTS}'\nTASKS='{TASKS}'\n"
    ));

    let cfg = ConfigLoader::new()
        .env_file(&file.0)
        .with_env([("SHOP_ID", "from-env"), ("CONCURRENCY", "4")])
        .set("CONCURRENCY", "3")
        .load()
        .unwrap();

    assert_eq!(cfg.shop_id, "from-env");
    assert_eq!(cfg.concurrency, 3);
    assert!(cfg.log_json);
    assert_eq!(cfg.date_rule, Some(DateRule::Today));
    assert_eq!(cfg.accounts.len(), 1);
}

#[test]
fn test_blank_values_do_not_override() {
    let mut env = base_env();
    env.push(("DATE_RULE", "plus_7_after_17"));
    let cfg = ConfigLoader::new()
        .without_env_file()
        .with_env(env)
        .set("DATE_RULE", "  ")
        .load()
        .unwrap();
    assert_eq!(cfg.date_rule, Some(DateRule::Plus7After17));
}

#[test]
fn test_missing_env_file_is_skipped() {
    let missing = std::env::temp_dir().join(format!("absent-{}.env", uuid::Uuid::new_v4()));
    let cfg = ConfigLoader::new()
        .env_file(missing)
        .with_env(base_env())
        .load();
    assert!(cfg.is_ok());
}

#[test]
fn test_loader_rejects_bad_values() {
    let mut env = base_env();
    env.push(("DATE_RULE", "whenever"));
    let err = ConfigLoader::new()
        .without_env_file()
        .with_env(env)
        .load()
        .unwrap_err();
    assert!(format!("{err:#}").contains("unknown date rule"));

    let mut env = base_env();
    env.push(("GLOBAL_TIMEOUT_MS", "soon"));
    assert!(ConfigLoader::new()
        .without_env_file()
        .with_env(env)
        .load()
        .is_err());
}

#[test]
fn test_loader_rejects_task_without_filters() {
    let err = ConfigLoader::new()
        .without_env_file()
        .with_env([
            ("SHOP_ID", "612773420"),
            ("ACCOUNTS", ACCOUNTS),
            ("TASKS", r#"[{"title_keywords":"","time_keywords":[]}]"#),
        ])
        .load()
        .unwrap_err();
    assert!(format!("{err:#}").contains("task-1"));
}

#[test]
fn test_single_account_shorthand() {
    let cfg = ConfigLoader::new()
        .without_env_file()
        .with_env([
            ("STYD_SHOP_ID", "612773420"),
            ("QL_COOKIE", "PHPSESSID=ql"),
            ("STYD_PREFERRED_CARDS", "年卡|次卡"),
            ("STYD_TITLE_KEYWORDS", "游泳馆"),
            ("STYD_TIME_KEYWORDS", "12:30"),
            ("STYD_DATE", "2024-11-08"),
            ("STYD_ALLOW_FALLBACK", "false"),
            ("STYD_MAX_ATTEMPTS", "0"),
            ("STYD_DELAY_MS", "50|80"),
            ("STYD_CONCURRENCY", "2"),
        ])
        .load()
        .unwrap();

    assert_eq!(cfg.shop_id, "612773420");
    assert_eq!(cfg.concurrency, 2);
    assert_eq!(cfg.accounts.len(), 1);
    assert_eq!(cfg.accounts[0].name, "QL-Account");
    assert_eq!(cfg.accounts[0].preferred_cards, vec!["年卡", "次卡"]);

    let task = &cfg.tasks[0];
    assert_eq!(task.title_keywords, vec!["游泳馆"]);
    assert_eq!(task.time_keywords, vec!["12:30"]);
    assert!(task.date.is_some());
    assert!(!task.allow_fallback);
    assert_eq!(task.max_attempts, 1);
    assert_eq!((task.delay.min_ms, task.delay.max_ms), (50, 80));
}

#[test]
fn test_shorthand_cookie_precedence_and_task_passthrough() {
    let cfg = ConfigLoader::new()
        .without_env_file()
        .with_env([
            ("SHOP_ID", "612773420"),
            ("COOKIE", "PHPSESSID=plain"),
            ("STYD_COOKIE", "PHPSESSID=styd"),
            ("STYD_ACCOUNT_NAME", "alice"),
            ("TASKS", TASKS),
        ])
        .load()
        .unwrap();

    assert_eq!(cfg.accounts[0].name, "alice");
    assert_eq!(cfg.accounts[0].credential.expose(), "PHPSESSID=styd");
    assert_eq!(cfg.tasks[0].title_keywords, vec!["游泳馆", "健身中心"]);
}

#[test]
fn test_accounts_key_disables_shorthand() {
    let mut env = base_env();
    env.push(("STYD_COOKIE", "PHPSESSID=ignored"));
    env.push(("STYD_TITLE_KEYWORDS", "瑜伽"));
    let cfg = ConfigLoader::new()
        .without_env_file()
        .with_env(env)
        .load()
        .unwrap();

    assert_eq!(cfg.accounts[0].name, "alice");
    assert_eq!(cfg.tasks[0].title_keywords, vec!["游泳馆", "健身中心"]);
}

#[test]
fn test_shorthand_without_keywords_or_tasks_fails() {
    let err = ConfigLoader::new()
        .without_env_file()
        .with_env([("SHOP_ID", "612773420"), ("STYD_COOKIE", "PHPSESSID=abc")])
        .load()
        .unwrap_err();
    assert!(format!("{err:#}").contains("STYD_TITLE_KEYWORDS"));
}

#[test]
fn test_default_card_keys_must_pair() {
    let mut env = base_env();
    env.push(("DEFAULT_MEMBER_CARD_ID", "13413533"));
    env.push(("DEFAULT_CARD_CAT_ID", "8566400"));
    let cfg = ConfigLoader::new()
        .without_env_file()
        .with_env(env)
        .load()
        .unwrap();
    assert_eq!(cfg.default_member_card_id.as_deref(), Some("13413533"));
    assert_eq!(cfg.default_card_cat_id.as_deref(), Some("8566400"));

    let mut env = base_env();
    env.push(("DEFAULT_MEMBER_CARD_ID", "13413533"));
    let err = ConfigLoader::new()
        .without_env_file()
        .with_env(env)
        .load()
        .unwrap_err();
    assert!(format!("{err:#}").contains("set together"));
}
