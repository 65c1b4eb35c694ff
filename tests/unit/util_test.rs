//! Tests for utility functions

use std::time::Duration;

use slot_sniper::util::{
    mask_identifier, sanitize_excerpt, DelayRange, DelaySampler, FixedDelay, InvertedDelay,
    UniformDelay,
};

#[test]
fn test_delay_range_default() {
    let range = DelayRange::default();
    assert_eq!(range.min_ms, 120);
    assert_eq!(range.max_ms, 300);
}

#[test]
fn test_seeded_delay_is_reproducible() {
    let range = DelayRange::new(120, 300).unwrap();
    let a = UniformDelay::seeded(42);
    let b = UniformDelay::seeded(42);
    let first: Vec<Duration> = (0..5).map(|_| a.sample(range)).collect();
    let second: Vec<Duration> = (0..5).map(|_| b.sample(range)).collect();
    assert_eq!(first, second);
}

#[test]
fn test_fixed_delay_ignores_range() {
    let sampler = FixedDelay(Duration::from_millis(7));
    assert_eq!(sampler.sample(DelayRange::default()), Duration::from_millis(7));
}

#[test]
fn test_mask_identifier() {
    let masked = mask_identifier("612773420");
    assert!(masked.starts_with("<REDACTED>_"));
    assert_eq!(mask_identifier(""), "<REDACTED>");
}

#[test]
fn test_sanitize_excerpt_redacts_sessions() {
    let text = "Cookie: PHPSESSID=abcdef\nbody token=xyz done";
    let clean = sanitize_excerpt(text, 200);
    assert!(!clean.contains("abcdef"));
    assert!(!clean.contains("xyz"));
    assert!(!clean.contains('\n'));
}

#[test]
fn test_init_tracing_is_idempotent() {
    slot_sniper::util::init_tracing();
    assert!(!slot_sniper::util::init_tracing());
    tracing::info!(target: "slot_sniper::outcome", "subscriber ready");
}

#[test]
fn test_inverted_delay_range_is_typed() {
    let err = DelayRange::new(500, 100).unwrap_err();
    assert_eq!(err, InvertedDelay { min_ms: 500, max_ms: 100 });
    let boxed: Box<dyn std::error::Error> = Box::new(err);
    assert!(boxed.to_string().contains("500ms"));
}
