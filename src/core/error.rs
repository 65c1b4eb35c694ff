//! Error types for configuration, transport, and resolution failures.

use chrono::NaiveDate;
use thiserror::Error;

/// Fatal problems detected before scheduling starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A date specification could not be parsed.
    #[error("invalid date specification `{0}`")]
    InvalidDateSpec(String),
    /// A date range ends before it starts.
    #[error("date range ends before it starts: {start}~{end}")]
    InvertedRange {
        /// First day of the range.
        start: NaiveDate,
        /// Last day of the range.
        end: NaiveDate,
    },
    /// A rule name is not known to the date engine.
    #[error("unknown date rule `{0}`")]
    UnknownRule(String),
    /// Resolution produced no dates at all.
    #[error("no target date could be resolved for task `{0}`")]
    NoDates(String),
    /// A task has neither keywords nor a course identifier.
    #[error("task `{0}` has no title keywords, time keywords or course id")]
    MissingFilter(String),
    /// Delay window is inverted.
    #[error("task `{task}` delay range invalid: {min_ms}ms > {max_ms}ms")]
    InvalidDelayRange {
        /// Task identifier.
        task: String,
        /// Lower bound.
        min_ms: u64,
        /// Upper bound.
        max_ms: u64,
    },
    /// `max_attempts` must be at least one.
    #[error("task `{0}` max_attempts must be at least 1")]
    InvalidMaxAttempts(String),
    /// An account has an empty credential.
    #[error("account `{0}` has no session credential")]
    MissingCredential(String),
    /// A task names an account that does not exist.
    #[error("task `{task}` is assigned to unknown account `{account}`")]
    UnknownAccount {
        /// Task identifier.
        task: String,
        /// Account name as written.
        account: String,
    },
    /// Structural or value problems in raw input.
    #[error("config invalid: {0}")]
    Invalid(String),
}

/// Failures raised by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Non-success HTTP status.
    #[error("http status {status}: {message}")]
    Status {
        /// Transport status code.
        status: u16,
        /// Short description or body excerpt.
        message: String,
    },
    /// The request did not finish in time.
    #[error("request timed out")]
    Timeout,
    /// Connection-level failure.
    #[error("connection failed: {0}")]
    Connection(String),
    /// Anything else the transport could not express more precisely.
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// HTTP status if the error carries one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
