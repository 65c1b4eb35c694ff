//! Layered configuration loading.
//!
//! Sources, lowest precedence first: built-in defaults, a `.env` file, the
//! process environment, explicit overrides (typically command-line flags).
//! A key present in a later source replaces the earlier value; blank values
//! do not override.
//!
//! Without `ACCOUNTS`, a single account and task can be spelled with the
//! `STYD_*` shorthand keys plus a cookie (`STYD_COOKIE`, `QL_COOKIE` or
//! `COOKIE`). The expansion sits above the env file and environment and
//! below explicit overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{json, Map, Value};

use super::parse;
use super::run::RunConfig;
use crate::core::date_rule::DateRule;
use crate::core::error::{AppResult, ConfigError};

/// Keys understood by the loader.
pub const KEYS: &[&str] = &[
    "SHOP_ID",
    "ACCOUNTS",
    "TASKS",
    "DATE_RULE",
    "GLOBAL_TIMEOUT_MS",
    "CONCURRENCY",
    "LOG_JSON",
    "DEFAULT_COURSE_ID",
    "DEFAULT_MEMBER_CARD_ID",
    "DEFAULT_CARD_CAT_ID",
    "UTC_OFFSET_MINUTES",
];

/// Single-account shorthand keys, expanded into [`KEYS`] while loading.
pub const SHORTHAND_KEYS: &[&str] = &[
    "STYD_COOKIE",
    "QL_COOKIE",
    "COOKIE",
    "STYD_ACCOUNT_NAME",
    "STYD_PREFERRED_CARDS",
    "STYD_TITLE_KEYWORDS",
    "STYD_TIME_KEYWORDS",
    "STYD_DATE",
    "STYD_STRICT_MATCH",
    "STYD_ALLOW_FALLBACK",
    "STYD_MAX_ATTEMPTS",
    "STYD_DELAY_MS",
    "STYD_SHOP_ID",
    "STYD_DATE_RULE",
    "STYD_GLOBAL_TIMEOUT_MS",
    "STYD_CONCURRENCY",
    "STYD_LOG_JSON",
];

/// Cookie keys in precedence order.
const COOKIE_KEYS: &[&str] = &["STYD_COOKIE", "QL_COOKIE", "COOKIE"];

/// Shorthand spellings of plain keys.
const ALIASES: &[(&str, &str)] = &[
    ("STYD_SHOP_ID", "SHOP_ID"),
    ("STYD_DATE_RULE", "DATE_RULE"),
    ("STYD_GLOBAL_TIMEOUT_MS", "GLOBAL_TIMEOUT_MS"),
    ("STYD_CONCURRENCY", "CONCURRENCY"),
    ("STYD_LOG_JSON", "LOG_JSON"),
];

/// Task fields copied verbatim from shorthand keys.
const TASK_FIELDS: &[(&str, &str)] = &[
    ("STYD_DATE", "date"),
    ("STYD_STRICT_MATCH", "strict_match"),
    ("STYD_ALLOW_FALLBACK", "allow_fallback"),
    ("STYD_DELAY_MS", "delay_ms"),
];

const SHORTHAND_ACCOUNT: &str = "QL-Account";

fn known(key: &str) -> bool {
    KEYS.contains(&key) || SHORTHAND_KEYS.contains(&key)
}

const DEFAULTS: &[(&str, &str)] = &[("CONCURRENCY", "1"), ("LOG_JSON", "false")];

/// Where the process environment comes from.
#[derive(Debug, Clone)]
enum EnvSource {
    Process,
    Fixed(HashMap<String, String>),
}

/// Builder-style loader producing a validated [`RunConfig`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_file: Option<PathBuf>,
    env: EnvSource,
    overrides: HashMap<String, String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            env_file: Some(PathBuf::from(".env")),
            env: EnvSource::Process,
            overrides: HashMap::new(),
        }
    }
}

impl ConfigLoader {
    /// Loader reading `./.env` and the process environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path` instead of `./.env`; a missing file is skipped.
    #[must_use]
    pub fn env_file(mut self, path: impl AsRef<Path>) -> Self {
        self.env_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Do not read any env file.
    #[must_use]
    pub fn without_env_file(mut self) -> Self {
        self.env_file = None;
        self
    }

    /// Use `vars` in place of the process environment.
    #[must_use]
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = EnvSource::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Highest-precedence value for `key`.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    fn read_env_file(path: &Path) -> AppResult<HashMap<String, String>> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "env file absent, skipping");
            return Ok(HashMap::new());
        }
        let iter = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to open env file {}", path.display()))?;
        let mut values = HashMap::new();
        for item in iter {
            let (key, value) =
                item.with_context(|| format!("failed to parse env file {}", path.display()))?;
            values.insert(key, value);
        }
        Ok(values)
    }

    fn process_env(&self) -> HashMap<String, String> {
        match &self.env {
            EnvSource::Process => std::env::vars()
                .filter(|(k, _)| known(k))
                .collect(),
            EnvSource::Fixed(vars) => vars.clone(),
        }
    }

    /// Merged raw values, restricted to [`KEYS`], with the shorthand expanded.
    pub fn merged(&self) -> AppResult<HashMap<String, String>> {
        let mut merged: HashMap<String, String> = DEFAULTS
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let file = match &self.env_file {
            Some(path) => Self::read_env_file(path)?,
            None => HashMap::new(),
        };
        let layer = |merged: &mut HashMap<String, String>, source: HashMap<String, String>| {
            for (key, value) in source {
                if known(&key) && !value.trim().is_empty() {
                    merged.insert(key, value);
                }
            }
        };
        layer(&mut merged, file);
        layer(&mut merged, self.process_env());

        let mut effective = merged.clone();
        layer(&mut effective, self.overrides.clone());
        let expanded = Self::shorthand(&effective).context("invalid configuration")?;
        if !expanded.is_empty() {
            tracing::debug!(keys = expanded.len(), "single-account shorthand expanded");
        }
        layer(&mut merged, expanded);
        layer(&mut merged, self.overrides.clone());

        merged.retain(|key, _| KEYS.contains(&key.as_str()));
        Ok(merged)
    }

    /// Plain keys spelled by the shorthand in `raw`; empty when `ACCOUNTS` is
    /// set or no cookie is given.
    ///
    /// Without title or time keywords the task is left to `TASKS`, and it is
    /// an error when that is unset too.
    fn shorthand(raw: &HashMap<String, String>) -> Result<HashMap<String, String>, ConfigError> {
        let get = |key: &str| raw.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        if get("ACCOUNTS").is_some() {
            return Ok(HashMap::new());
        }
        let Some(cookie) = COOKIE_KEYS.iter().find_map(|key| get(*key)) else {
            return Ok(HashMap::new());
        };

        let mut account = json!({
            "name": get("STYD_ACCOUNT_NAME").unwrap_or(SHORTHAND_ACCOUNT),
            "cookie": cookie,
        });
        let preferred = parse::split_keywords(get("STYD_PREFERRED_CARDS").unwrap_or_default());
        if !preferred.is_empty() {
            account["preferred_cards"] = json!(preferred);
        }
        let mut expanded = HashMap::from([("ACCOUNTS".to_string(), json!([account]).to_string())]);

        let titles = parse::split_keywords(get("STYD_TITLE_KEYWORDS").unwrap_or_default());
        let times = parse::split_keywords(get("STYD_TIME_KEYWORDS").unwrap_or_default());
        if titles.is_empty() && times.is_empty() {
            if get("TASKS").is_none() {
                return Err(ConfigError::Invalid(
                    "STYD_TITLE_KEYWORDS or STYD_TIME_KEYWORDS is required to build a task".into(),
                ));
            }
        } else {
            let mut task = Map::new();
            if !titles.is_empty() {
                task.insert("title_keywords".into(), json!(titles));
            }
            if !times.is_empty() {
                task.insert("time_keywords".into(), json!(times));
            }
            for (key, field) in TASK_FIELDS {
                if let Some(value) = get(*key) {
                    task.insert((*field).into(), Value::String(value.to_string()));
                }
            }
            // Unparsable counts are dropped; anything below one becomes one.
            if let Some(attempts) = get("STYD_MAX_ATTEMPTS").and_then(|v| v.parse::<i64>().ok()) {
                task.insert("max_attempts".into(), json!(attempts.max(1)));
            }
            expanded.insert("TASKS".into(), json!([task]).to_string());
        }

        for (alias, key) in ALIASES {
            if let Some(value) = get(*alias) {
                expanded.insert((*key).to_string(), value.to_string());
            }
        }
        Ok(expanded)
    }

    /// Load, parse and validate.
    pub fn load(&self) -> AppResult<RunConfig> {
        let merged = self.merged()?;
        let config = Self::build(&merged).context("invalid configuration")?;
        tracing::debug!(
            accounts = config.accounts.len(),
            tasks = config.tasks.len(),
            concurrency = config.concurrency,
            "configuration loaded"
        );
        Ok(config)
    }

    fn build(merged: &HashMap<String, String>) -> Result<RunConfig, ConfigError> {
        let get = |key: &str| merged.get(key).map(String::as_str).unwrap_or_default();
        let value = |key: &str| {
            merged
                .get(key)
                .map_or(Value::Null, |v| Value::String(v.clone()))
        };

        let mut config = RunConfig::new(get("SHOP_ID").trim());
        config.accounts = parse::accounts(get("ACCOUNTS"))?;
        config.tasks = parse::tasks(get("TASKS"))?;
        config.date_rule = match get("DATE_RULE").trim() {
            "" => None,
            rule => Some(rule.parse::<DateRule>()?),
        };
        config.global_timeout_ms = parse::integer(&value("GLOBAL_TIMEOUT_MS"), "GLOBAL_TIMEOUT_MS")?;
        config.concurrency = parse::integer(&value("CONCURRENCY"), "CONCURRENCY")?
            .map_or(Ok(1), usize::try_from)
            .map_err(|_| ConfigError::Invalid("CONCURRENCY out of range".into()))?;
        config.log_json = parse::boolean(&value("LOG_JSON"), false, "LOG_JSON")?;
        let optional = |key: &str| Some(get(key).trim().to_string()).filter(|v| !v.is_empty());
        config.default_course_id = optional("DEFAULT_COURSE_ID");
        config.default_member_card_id = optional("DEFAULT_MEMBER_CARD_ID");
        config.default_card_cat_id = optional("DEFAULT_CARD_CAT_ID");
        config.utc_offset_minutes = match get("UTC_OFFSET_MINUTES").trim() {
            "" => None,
            raw => Some(raw.parse().map_err(|_| {
                ConfigError::Invalid(format!("UTC_OFFSET_MINUTES: `{raw}` is not an integer"))
            })?),
        };

        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }
}
