//! Tests for error types

use chrono::NaiveDate;
use slot_sniper::core::{ConfigError, ReasonCode, ResolveError, TransportError};

#[test]
fn test_inverted_range_error() {
    let err = ConfigError::InvertedRange {
        start: NaiveDate::from_ymd_opt(2024, 11, 3).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
    };
    assert_eq!(
        format!("{}", err),
        "date range ends before it starts: 2024-11-03~2024-11-01"
    );
}

#[test]
fn test_missing_filter_error() {
    let err = ConfigError::MissingFilter("task-2".to_string());
    assert_eq!(
        format!("{}", err),
        "task `task-2` has no title keywords, time keywords or course id"
    );
}

#[test]
fn test_unknown_rule_error() {
    let err = ConfigError::UnknownRule("next_friday".to_string());
    assert_eq!(format!("{}", err), "unknown date rule `next_friday`");
}

#[test]
fn test_transport_status_error() {
    let err = TransportError::Status {
        status: 502,
        message: "bad gateway".to_string(),
    };
    assert_eq!(format!("{}", err), "http status 502: bad gateway");
    assert_eq!(err.status(), Some(502));
    assert_eq!(TransportError::Timeout.status(), None);
}

#[test]
fn test_resolve_error_reasons() {
    let card = ResolveError::CardMissing("account lists no cards".to_string());
    assert_eq!(card.reason(), ReasonCode::CardMissing);
    assert_eq!(
        format!("{}", card),
        "no membership card available: account lists no cards"
    );

    let id = ResolveError::CourseIdMissing(vec![]);
    assert_eq!(id.reason(), ReasonCode::CourseIdMissing);
    assert_eq!(format!("{}", id), "course id unresolved after 0 source(s)");
}
