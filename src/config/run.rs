//! Run configuration consumed by the scheduler.

use std::collections::HashSet;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::core::date_rule::DateRule;
use crate::core::error::ConfigError;
use crate::core::model::{Account, Task};

const fn default_concurrency() -> usize {
    1
}

/// Fully merged, validated configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Venue identifier passed to listing fetches.
    pub shop_id: String,
    /// Accounts in the order their outcomes are reported.
    pub accounts: Vec<Account>,
    /// Tasks in the order their outcomes are reported.
    pub tasks: Vec<Task>,
    /// Rule applied to tasks without a date specification.
    #[serde(default)]
    pub date_rule: Option<DateRule>,
    /// Global wall-clock budget for starting units.
    #[serde(default)]
    pub global_timeout_ms: Option<u64>,
    /// Units in flight per account.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Emit one JSON line per outcome.
    #[serde(default)]
    pub log_json: bool,
    /// Last link of the course-id chain.
    #[serde(default)]
    pub default_course_id: Option<String>,
    /// Membership card used when neither the order page nor the account's
    /// card listing yields one. Set together with `default_card_cat_id`.
    #[serde(default)]
    pub default_member_card_id: Option<String>,
    /// Category of `default_member_card_id`.
    #[serde(default)]
    pub default_card_cat_id: Option<String>,
    /// Platform timezone as minutes east of UTC; host timezone when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl RunConfig {
    /// Empty configuration for `shop_id` with default knobs.
    pub fn new(shop_id: impl Into<String>) -> Self {
        Self {
            shop_id: shop_id.into(),
            accounts: Vec::new(),
            tasks: Vec::new(),
            date_rule: None,
            global_timeout_ms: None,
            concurrency: default_concurrency(),
            log_json: false,
            default_course_id: None,
            default_member_card_id: None,
            default_card_cat_id: None,
            utc_offset_minutes: None,
        }
    }

    /// Give every unnamed task the id `task-<n>` (1-based).
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for (idx, task) in self.tasks.iter_mut().enumerate() {
            if task.id.trim().is_empty() {
                task.id = format!("task-{}", idx + 1);
            } else {
                task.id = task.id.trim().to_string();
            }
        }
        self
    }

    /// Platform timezone, when configured.
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes.saturating_mul(60)))
    }

    /// Check every structural invariant; the first violation wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shop_id.trim().is_empty() {
            return Err(ConfigError::Invalid("shop_id must not be empty".into()));
        }
        if self.accounts.is_empty() {
            return Err(ConfigError::Invalid("at least one account must be defined".into()));
        }
        if self.tasks.is_empty() {
            return Err(ConfigError::Invalid("at least one task must be defined".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be greater than 0".into()));
        }
        if self.global_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "global_timeout_ms must be greater than 0".into(),
            ));
        }
        let set = |v: &Option<String>| v.as_deref().is_some_and(|v| !v.trim().is_empty());
        if set(&self.default_member_card_id) != set(&self.default_card_cat_id) {
            return Err(ConfigError::Invalid(
                "default_member_card_id and default_card_cat_id must be set together".into(),
            ));
        }
        if let Some(minutes) = self.utc_offset_minutes {
            if self.utc_offset().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "utc_offset_minutes {minutes} out of range"
                )));
            }
        }

        let mut names = HashSet::new();
        for account in &self.accounts {
            if account.name.trim().is_empty() {
                return Err(ConfigError::Invalid("account name must not be empty".into()));
            }
            if !names.insert(account.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate account name `{}`",
                    account.name
                )));
            }
            if account.credential.is_blank() {
                return Err(ConfigError::MissingCredential(account.name.clone()));
            }
        }

        let mut task_ids = HashSet::new();
        for task in &self.tasks {
            if !task.id.is_empty() && !task_ids.insert(task.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate task id `{}`", task.id)));
            }
            if !task.has_filter() {
                return Err(ConfigError::MissingFilter(task.id.clone()));
            }
            if task.max_attempts == 0 {
                return Err(ConfigError::InvalidMaxAttempts(task.id.clone()));
            }
            if task.delay.min_ms > task.delay.max_ms {
                return Err(ConfigError::InvalidDelayRange {
                    task: task.id.clone(),
                    min_ms: task.delay.min_ms,
                    max_ms: task.delay.max_ms,
                });
            }
            if let Some(spec) = &task.date {
                spec.validate()?;
            }
            if let Some(unknown) = task.accounts.iter().find(|a| !names.contains(a.as_str())) {
                return Err(ConfigError::UnknownAccount {
                    task: task.id.clone(),
                    account: unknown.clone(),
                });
            }
        }
        Ok(())
    }

    /// Parse from JSON, fill default task ids and validate.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| ConfigError::Invalid(format!("parse error: {e}")))?;
        let cfg = cfg.normalized();
        cfg.validate()?;
        Ok(cfg)
    }
}
