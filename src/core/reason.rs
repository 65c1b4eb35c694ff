//! Canonical reason taxonomy shared by every stage of a unit.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a unit ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// Booking confirmed.
    Ok,
    /// The session credential was rejected.
    CookieInvalid,
    /// No course satisfied the filters.
    NoMatch,
    /// Matching courses exist but none has capacity.
    CourseFull,
    /// No usable membership card.
    CardMissing,
    /// The course identifier could not be resolved.
    CourseIdMissing,
    /// The platform stayed busy for every attempt.
    RateLimit,
    /// A submission was bounced to the login page.
    RedirectLogin,
    /// The global deadline passed before the unit could start.
    Timeout,
    /// Nothing recognisable.
    Unknown,
}

impl ReasonCode {
    /// Wire name, e.g. `COURSE_ID_MISSING`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::CookieInvalid => "COOKIE_INVALID",
            Self::NoMatch => "NO_MATCH",
            Self::CourseFull => "COURSE_FULL",
            Self::CardMissing => "CARD_MISSING",
            Self::CourseIdMissing => "COURSE_ID_MISSING",
            Self::RateLimit => "RATE_LIMIT",
            Self::RedirectLogin => "REDIRECT_LOGIN",
            Self::Timeout => "TIMEOUT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// True only for [`ReasonCode::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
