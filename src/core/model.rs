//! Domain records: accounts, tasks, courses, cards, pages, and outcomes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::core::date_rule::DateSpec;
use crate::core::reason::ReasonCode;
use crate::util::delay::DelayRange;

/// Opaque session credential; never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw credential blob.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw value, for transports only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when nothing but whitespace was supplied.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// One configured identity on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Display name, unique within a run.
    pub name: String,
    /// Session credential handed to the transport.
    pub credential: Credential,
    /// Card label keywords in preference order.
    #[serde(default)]
    pub preferred_cards: Vec<String>,
}

const fn default_true() -> bool {
    true
}

const fn default_attempts() -> u32 {
    1
}

/// A desired course/time combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier used in logs and outcomes.
    #[serde(default)]
    pub id: String,
    /// Title keywords; any one must appear in the course title.
    #[serde(default)]
    pub title_keywords: Vec<String>,
    /// Time keywords; any one must appear in the time label.
    #[serde(default)]
    pub time_keywords: Vec<String>,
    /// Pre-supplied course (slot) identifier.
    #[serde(default)]
    pub course_id: Option<String>,
    /// Which day(s) to book; falls back to the run rule.
    #[serde(default)]
    pub date: Option<DateSpec>,
    /// Require literal keyword containment.
    #[serde(default = "default_true")]
    pub strict_match: bool,
    /// Take any available course when nothing matches.
    #[serde(default = "default_true")]
    pub allow_fallback: bool,
    /// Upper bound on submissions per unit.
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    /// Pre-submission delay window.
    #[serde(default)]
    pub delay: DelayRange,
    /// Account names this task runs for; empty means every account.
    #[serde(default)]
    pub accounts: Vec<String>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: String::new(),
            title_keywords: Vec::new(),
            time_keywords: Vec::new(),
            course_id: None,
            date: None,
            strict_match: true,
            allow_fallback: true,
            max_attempts: 1,
            delay: DelayRange::default(),
            accounts: Vec::new(),
        }
    }
}

impl Task {
    /// True when at least one filter is non-empty.
    pub fn has_filter(&self) -> bool {
        self.title_keywords.iter().any(|k| !k.trim().is_empty())
            || self.time_keywords.iter().any(|k| !k.trim().is_empty())
            || self.course_id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }

    /// Whether this task runs for `account`.
    pub fn applies_to(&self, account: &str) -> bool {
        self.accounts.is_empty() || self.accounts.iter().any(|a| a == account)
    }
}

/// Whether a course can still be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    /// Seats remain (including waitlist-style "queue" listings).
    Available,
    /// No seats, stopped, or unknown.
    Full,
}

impl Occupancy {
    /// Map a platform status label.
    pub fn from_status(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "available" | "hot" | "queue" => Self::Available,
            _ => Self::Full,
        }
    }
}

/// One listing entry for a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Slot identifier (the order link's `id`).
    pub id: String,
    /// Display title.
    pub title: String,
    /// Time-range label, e.g. `12:30 - 14:00`.
    pub time_label: String,
    /// Booking state.
    pub occupancy: Occupancy,
    /// Card labels the platform hints are required.
    #[serde(default)]
    pub required_card_hints: Vec<String>,
    /// Seats taken.
    #[serde(default)]
    pub taken: u32,
    /// Seats in total.
    #[serde(default)]
    pub total: u32,
    /// Order page link.
    #[serde(default)]
    pub href: String,
}

/// Result of a listing fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseListing {
    /// `None` when the platform returned no listing at all.
    pub courses: Option<Vec<Course>>,
    /// Platform code, if any.
    pub code: Option<i64>,
    /// Platform message, if any.
    pub message: Option<String>,
}

impl CourseListing {
    /// Listing carrying `courses`.
    pub const fn with_courses(courses: Vec<Course>) -> Self {
        Self {
            courses: Some(courses),
            code: None,
            message: None,
        }
    }
}

/// An account-scoped entitlement used to pay for a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipCard {
    /// Card identifier (`member_card_id`).
    pub id: String,
    /// Card category identifier (`card_cat_id`).
    pub category_id: String,
    /// Display label.
    pub label: String,
}

/// Order page for a selected course, pre-split by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    /// Transport status code.
    pub status: u16,
    /// URL after redirects.
    pub final_url: String,
    /// Hidden `<input>` fields by name.
    #[serde(default)]
    pub hidden_fields: BTreeMap<String, String>,
    /// Bodies of inline `<script>` elements.
    #[serde(default)]
    pub inline_scripts: Vec<String>,
    /// Raw page markup.
    #[serde(default)]
    pub markup: String,
}

/// Everything the platform needs to confirm a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    /// Slot identifier.
    pub class_id: String,
    /// Resolved course identifier.
    pub course_id: String,
    /// Membership card identifier.
    pub card_id: String,
    /// Membership card category identifier.
    pub card_category_id: String,
    /// Remaining form fields, passed through verbatim.
    pub fields: BTreeMap<String, String>,
}

/// Raw submission response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// Transport status code.
    pub status: u16,
    /// URL after redirects.
    pub final_url: String,
    /// Body text.
    pub body: String,
}

/// Success or failure of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Reason is OK.
    Success,
    /// Any other reason.
    Failure,
}

/// Course details carried on an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    /// Slot identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Time label.
    pub time_label: String,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
            time_label: course.time_label.clone(),
        }
    }
}

/// Final record for one (account, task, date) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Account name.
    pub account: String,
    /// Task identifier.
    pub task_id: String,
    /// Target date.
    pub date: NaiveDate,
    /// Success or failure.
    pub status: RunStatus,
    /// Reason code.
    pub reason: ReasonCode,
    /// Transport status of the last response.
    pub http_status: Option<u16>,
    /// Platform code of the last response.
    pub platform_code: Option<i64>,
    /// Platform message of the last response.
    pub platform_message: Option<String>,
    /// Platform request identifier.
    pub request_id: Option<String>,
    /// URL after redirects.
    pub final_url: Option<String>,
    /// Local time the outcome was recorded.
    pub timestamp: NaiveDateTime,
    /// Short sanitised diagnostic.
    pub excerpt: Option<String>,
    /// Selected course, once matching succeeded.
    pub course: Option<CourseSummary>,
    /// Number of submissions issued.
    pub submissions: u32,
    /// Resolution and attempt trail.
    pub evidence: Vec<String>,
}

impl RunOutcome {
    /// Bare outcome with `reason`; other fields filled by the caller.
    pub fn new(
        account: impl Into<String>,
        task_id: impl Into<String>,
        date: NaiveDate,
        reason: ReasonCode,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            account: account.into(),
            task_id: task_id.into(),
            date,
            status: if reason.is_ok() {
                RunStatus::Success
            } else {
                RunStatus::Failure
            },
            reason,
            http_status: None,
            platform_code: None,
            platform_message: None,
            request_id: None,
            final_url: None,
            timestamp,
            excerpt: None,
            course: None,
            submissions: 0,
            evidence: Vec::new(),
        }
    }

    /// Replace the reason, keeping `status` consistent with it.
    pub fn set_reason(&mut self, reason: ReasonCode) {
        self.reason = reason;
        self.status = if reason.is_ok() {
            RunStatus::Success
        } else {
            RunStatus::Failure
        };
    }

    /// True when the reason is OK.
    pub const fn is_ok(&self) -> bool {
        self.reason.is_ok()
    }
}
