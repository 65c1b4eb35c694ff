//! Outcome classification.
//!
//! Pure functions from raw transport results to the reason taxonomy. The
//! platform mixes JSON envelopes, HTML fragments and redirects, so each check
//! is a small pattern table consulted in a fixed order.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::core::error::TransportError;
use crate::core::model::{Course, CourseListing, OrderPage, SubmissionResponse};
use crate::core::reason::ReasonCode;
use crate::util::privacy::sanitize_excerpt;

/// Platform code for a confirmed operation.
pub const CODE_OK: i64 = 200;
/// Platform code for a transient overload.
pub const CODE_BUSY: i64 = -1;

const EXCERPT_CHARS: usize = 160;

const BUSY_PATTERNS: &[&str] = &["系统繁忙", "稍后再试", "操作频繁", "频繁", "too many requests"];
const FULL_PATTERNS: &[&str] = &["课程已满", "名额已满", "已满", "约满", "排队", "不在可预约时间"];
const LOGIN_PATTERNS: &[&str] = &["请先登录", "登录后访问", "手机号", "验证码"];
const CARD_PATTERNS: &[&str] = &["请选择会员卡", "会员卡"];
const SUCCESS_PATTERNS: &[&str] = &["预约成功", "成功", "success"];
const LOGIN_PATHS: &[&str] = &["/login", "/passport"];

static UNICODE_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u([0-9a-fA-F]{4})").expect("unicode escape pattern"));
static HTML_ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#(\d{1,7})|#[xX]([0-9a-fA-F]{1,6})|(amp|lt|gt|quot|apos|nbsp));")
        .expect("html entity pattern")
});

/// First pattern from `patterns` found in `text`, case-insensitively for ASCII.
fn detect(text: &str, patterns: &'static [&'static str]) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    patterns.iter().copied().find(|p| lowered.contains(p))
}

fn is_login_url(url: &str) -> bool {
    LOGIN_PATHS.iter().any(|p| url.contains(p)) && !url.contains("course/order")
}

/// Resolve `\uXXXX` escapes and HTML character references.
pub fn decode_text(raw: &str) -> String {
    let unescaped = UNICODE_ESCAPE_RE.replace_all(raw, |caps: &Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });
    HTML_ENTITY_RE
        .replace_all(&unescaped, |caps: &Captures<'_>| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                match caps.get(3).map(|m| m.as_str()) {
                    Some("amp") => Some('&'),
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("nbsp") => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Fields of the platform's JSON envelope, when the body is one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformReply {
    /// `code`, numeric or numeric string.
    pub code: Option<i64>,
    /// `msg`.
    pub message: Option<String>,
    /// `req_id`.
    pub request_id: Option<String>,
}

impl PlatformReply {
    /// Parse a body; `None` when it is not a JSON object.
    pub fn parse(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body.trim()).ok()?;
        let object = value.as_object()?;
        let code = object.get("code").and_then(|c| match c {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        let text = |key: &str| match object.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Some(Self {
            code,
            message: text("msg").or_else(|| text("message")),
            request_id: text("req_id"),
        })
    }
}

/// Interpretation of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Booking confirmed.
    Confirmed,
    /// Transient overload; retry.
    Busy,
    /// Redirected to the login flow.
    LoginRedirect,
    /// Session rejected outright.
    CookieInvalid,
    /// Permanent rejection with a specific reason.
    Rejected(ReasonCode),
    /// Nothing recognisable.
    Unknown,
}

impl Verdict {
    /// Terminal reason if this verdict ends the attempt.
    pub const fn reason(self) -> ReasonCode {
        match self {
            Self::Confirmed => ReasonCode::Ok,
            Self::Busy => ReasonCode::RateLimit,
            Self::LoginRedirect => ReasonCode::RedirectLogin,
            Self::CookieInvalid => ReasonCode::CookieInvalid,
            Self::Rejected(reason) => reason,
            Self::Unknown => ReasonCode::Unknown,
        }
    }

    /// Whether another submission may change the result.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Busy | Self::Unknown)
    }
}

/// A verdict plus the response details carried into the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Interpretation.
    pub verdict: Verdict,
    /// Transport status, when a response arrived.
    pub http_status: Option<u16>,
    /// Parsed envelope fields.
    pub reply: PlatformReply,
    /// URL after redirects.
    pub final_url: Option<String>,
    /// Sanitised body or error excerpt.
    pub excerpt: Option<String>,
    /// Pattern that decided the verdict, if any.
    pub matched: Option<&'static str>,
}

impl Classification {
    fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            http_status: None,
            reply: PlatformReply::default(),
            final_url: None,
            excerpt: None,
            matched: None,
        }
    }

    fn matched(mut self, pattern: &'static str) -> Self {
        self.matched = Some(pattern);
        self
    }
}

fn verdict_for_response(
    response: &SubmissionResponse,
    reply: Option<&PlatformReply>,
    text: &str,
) -> (Verdict, Option<&'static str>) {
    if is_login_url(&response.final_url) {
        return (Verdict::LoginRedirect, Some("login url"));
    }
    match response.status {
        401 | 403 => return (Verdict::CookieInvalid, Some("http 401/403")),
        429 => return (Verdict::Busy, Some("http 429")),
        _ => {}
    }
    match reply.and_then(|r| r.code) {
        Some(CODE_OK) => return (Verdict::Confirmed, Some("code 200")),
        Some(CODE_BUSY) => return (Verdict::Busy, Some("code -1")),
        _ => {}
    }
    if let Some(p) = detect(text, BUSY_PATTERNS) {
        return (Verdict::Busy, Some(p));
    }
    // A JSON envelope only counts its message; plain bodies count in full.
    let success_text = reply.map_or(text, |r| r.message.as_deref().unwrap_or_default());
    if let Some(p) = detect(&decode_text(success_text), SUCCESS_PATTERNS) {
        return (Verdict::Confirmed, Some(p));
    }
    if let Some(p) = detect(text, CARD_PATTERNS) {
        return (Verdict::Rejected(ReasonCode::CardMissing), Some(p));
    }
    if let Some(p) = detect(text, FULL_PATTERNS) {
        return (Verdict::Rejected(ReasonCode::CourseFull), Some(p));
    }
    if let Some(p) = detect(text, LOGIN_PATTERNS) {
        return (Verdict::LoginRedirect, Some(p));
    }
    (Verdict::Unknown, None)
}

/// Classify one submission round-trip.
pub fn classify_submission(result: &Result<SubmissionResponse, TransportError>) -> Classification {
    match result {
        Ok(response) => {
            let reply = PlatformReply::parse(&response.body);
            let text = decode_text(&response.body);
            let (verdict, matched) = verdict_for_response(response, reply.as_ref(), &text);
            let excerpt = reply
                .as_ref()
                .and_then(|r| r.message.as_deref())
                .map_or_else(|| sanitize_excerpt(&text, EXCERPT_CHARS), |m| {
                    sanitize_excerpt(&decode_text(m), EXCERPT_CHARS)
                });
            Classification {
                verdict,
                http_status: Some(response.status),
                reply: reply.unwrap_or_default(),
                final_url: Some(response.final_url.clone()).filter(|u| !u.is_empty()),
                excerpt: Some(excerpt).filter(|e| !e.is_empty()),
                matched,
            }
        }
        Err(err) => {
            let mut classification = match err.status() {
                Some(401 | 403) => Classification::new(Verdict::CookieInvalid).matched("http 401/403"),
                Some(429) => Classification::new(Verdict::Busy).matched("http 429"),
                _ => match detect(&err.to_string(), BUSY_PATTERNS) {
                    Some(p) => Classification::new(Verdict::Busy).matched(p),
                    None => Classification::new(Verdict::Unknown),
                },
            };
            classification.http_status = err.status();
            classification.excerpt = Some(sanitize_excerpt(&err.to_string(), EXCERPT_CHARS));
            classification
        }
    }
}

/// Usable courses from a listing fetch, or the reason the unit stops.
pub fn classify_listing(
    result: &Result<CourseListing, TransportError>,
) -> Result<&[Course], ReasonCode> {
    match result {
        Ok(listing) => match &listing.courses {
            Some(courses) => Ok(courses),
            None => {
                let busy = listing.code == Some(CODE_BUSY)
                    || listing
                        .message
                        .as_deref()
                        .and_then(|m| detect(m, BUSY_PATTERNS))
                        .is_some();
                Err(if busy {
                    ReasonCode::RateLimit
                } else {
                    ReasonCode::CookieInvalid
                })
            }
        },
        Err(err) => Err(match err.status() {
            Some(401 | 403) => ReasonCode::CookieInvalid,
            Some(429) => ReasonCode::RateLimit,
            _ => ReasonCode::Unknown,
        }),
    }
}

/// Check an order page before resolution.
pub fn classify_order_page(page: &OrderPage) -> Result<(), ReasonCode> {
    if page.status != 200 {
        return Err(ReasonCode::Unknown);
    }
    if is_login_url(&page.final_url) || detect(&page.markup, LOGIN_PATTERNS).is_some() {
        return Err(ReasonCode::CookieInvalid);
    }
    Ok(())
}

/// Reason for a failed order-page fetch.
pub fn classify_order_error(err: &TransportError) -> ReasonCode {
    match err.status() {
        Some(401 | 403) => ReasonCode::CookieInvalid,
        Some(429) => ReasonCode::RateLimit,
        _ => ReasonCode::Unknown,
    }
}
