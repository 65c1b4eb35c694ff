//! Date specifications and slot-release rules.
//!
//! A task names the day(s) it wants either literally or through a rule tied to
//! the platform's release schedule. Everything is turned into an ascending,
//! de-duplicated list of dates before any unit is scheduled.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// Hour (local) at which the platform opens the next day's slots.
pub const RELEASE_HOUR: u32 = 17;

/// Upper bound on days a single range may expand to.
pub const MAX_RANGE_DAYS: i64 = 366;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Named date rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRule {
    /// Before 17:00 local, today + 6 days; from 17:00, today + 7 days.
    #[serde(rename = "plus_7_after_17")]
    Plus7After17,
    /// The current local date.
    Today,
}

impl DateRule {
    /// Apply the rule at local time `now`.
    pub fn apply(self, now: NaiveDateTime) -> Option<NaiveDate> {
        match self {
            Self::Plus7After17 => {
                let release = NaiveTime::from_hms_opt(RELEASE_HOUR, 0, 0)?;
                let days = if now.time() < release { 6 } else { 7 };
                now.date().checked_add_days(Days::new(days))
            }
            Self::Today => Some(now.date()),
        }
    }

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plus7After17 => "plus_7_after_17",
            Self::Today => "today",
        }
    }
}

impl fmt::Display for DateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plus_7_after_17" => Ok(Self::Plus7After17),
            "today" => Ok(Self::Today),
            other => Err(ConfigError::UnknownRule(other.to_string())),
        }
    }
}

/// Which day(s) a task targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateSpec {
    /// One literal date.
    Single {
        /// The date.
        date: NaiveDate,
    },
    /// Explicit collection of dates.
    List {
        /// The dates, any order, duplicates allowed.
        dates: Vec<NaiveDate>,
    },
    /// Inclusive range.
    Range {
        /// First day.
        start: NaiveDate,
        /// Last day.
        end: NaiveDate,
    },
    /// Named rule evaluated at run time.
    Rule {
        /// The rule.
        rule: DateRule,
    },
}

fn parse_date(token: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(token.trim(), DATE_FORMAT)
        .map_err(|_| ConfigError::InvalidDateSpec(token.trim().to_string()))
}

fn expand_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, ConfigError> {
    if end < start {
        return Err(ConfigError::InvertedRange { start, end });
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(ConfigError::InvalidDateSpec(format!(
            "{start}~{end} spans more than {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}

/// Parse `A~B` into its endpoints.
fn parse_range_token(token: &str) -> Result<(NaiveDate, NaiveDate), ConfigError> {
    let (start, end) = token
        .split_once('~')
        .ok_or_else(|| ConfigError::InvalidDateSpec(token.to_string()))?;
    if start.trim().is_empty() || end.trim().is_empty() {
        return Err(ConfigError::InvalidDateSpec(token.to_string()));
    }
    Ok((parse_date(start)?, parse_date(end)?))
}

fn expand_token(token: &str) -> Result<Vec<NaiveDate>, ConfigError> {
    if token.contains('~') {
        let (start, end) = parse_range_token(token)?;
        expand_range(start, end)
    } else {
        Ok(vec![parse_date(token)?])
    }
}

fn looks_like_rule(raw: &str) -> bool {
    raw.chars().any(|c| c.is_ascii_alphabetic())
        && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl DateSpec {
    /// Parse a textual specification.
    ///
    /// Accepts `2024-11-01`, `2024-11-01~2024-11-03`, lists separated by
    /// comma, pipe, semicolon or newline (elements may be ranges), a JSON
    /// array of such strings, or a rule name.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::InvalidDateSpec(String::new()));
        }
        if raw.starts_with('[') {
            let items: Vec<String> = serde_json::from_str(raw)
                .map_err(|e| ConfigError::InvalidDateSpec(format!("{raw}: {e}")))?;
            return Self::from_tokens(items.iter().map(String::as_str));
        }
        if looks_like_rule(raw) {
            return Ok(Self::Rule { rule: raw.parse()? });
        }
        let tokens: Vec<&str> = raw
            .split(['|', ',', ';', '\n'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        match tokens.as_slice() {
            [single] if single.contains('~') => {
                let (start, end) = parse_range_token(single)?;
                if end < start {
                    return Err(ConfigError::InvertedRange { start, end });
                }
                Ok(Self::Range { start, end })
            }
            [single] => Ok(Self::Single {
                date: parse_date(single)?,
            }),
            _ => Self::from_tokens(tokens.into_iter()),
        }
    }

    fn from_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Self, ConfigError> {
        let mut dates = Vec::new();
        for token in tokens.map(str::trim).filter(|t| !t.is_empty()) {
            dates.extend(expand_token(token)?);
        }
        Ok(Self::List { dates })
    }

    /// Check structural invariants without evaluating rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Range { start, end } => expand_range(*start, *end).map(|_| ()),
            Self::Single { .. } | Self::List { .. } | Self::Rule { .. } => Ok(()),
        }
    }

    /// Concrete dates at local time `now`, ascending and unique.
    pub fn expand(&self, now: NaiveDateTime) -> Result<Vec<NaiveDate>, ConfigError> {
        let dates: BTreeSet<NaiveDate> = match self {
            Self::Single { date } => std::iter::once(*date).collect(),
            Self::List { dates } => dates.iter().copied().collect(),
            Self::Range { start, end } => expand_range(*start, *end)?.into_iter().collect(),
            Self::Rule { rule } => rule.apply(now).into_iter().collect(),
        };
        Ok(dates.into_iter().collect())
    }
}

/// Resolves task date specifications against the run-level rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRuleEngine {
    default_rule: Option<DateRule>,
}

impl DateRuleEngine {
    /// Engine falling back to `default_rule` for tasks without a spec.
    pub const fn new(default_rule: Option<DateRule>) -> Self {
        Self { default_rule }
    }

    /// Dates for one task: its own spec, else the run rule, else today.
    pub fn resolve(
        &self,
        task_id: &str,
        spec: Option<&DateSpec>,
        now: NaiveDateTime,
    ) -> Result<Vec<NaiveDate>, ConfigError> {
        let dates = match (spec, self.default_rule) {
            (Some(spec), _) => spec.expand(now)?,
            (None, Some(rule)) => rule.apply(now).into_iter().collect(),
            (None, None) => vec![now.date()],
        };
        if dates.is_empty() {
            return Err(ConfigError::NoDates(task_id.to_string()));
        }
        Ok(dates)
    }
}
