//! Masking and sanitising of sensitive values before they reach logs.

use std::sync::LazyLock;

use regex::Regex;

static COOKIE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(set-cookie|cookie)\s*[:=][^\n]*").expect("cookie pattern")
});
static SESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(PHPSESSID|sass_gym_[a-z_]+|token|access_token|auth)=[^\s&;]+")
        .expect("session pattern")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Stable, non-reversible label for an identifier such as a shop id.
pub fn mask_identifier(value: &str) -> String {
    let clean: String = value.chars().filter(char::is_ascii_alphanumeric).collect();
    if clean.is_empty() {
        return "<REDACTED>".to_string();
    }
    // FNV-1a, folded to 16 bits.
    let mut hash: u32 = 0x811c_9dc5;
    for byte in clean.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("<REDACTED>_{:04x}", (hash ^ (hash >> 16)) & 0xffff)
}

/// Redact credentials from free-form text, collapse whitespace and clip to
/// `max_chars` characters.
pub fn sanitize_excerpt(text: &str, max_chars: usize) -> String {
    let text = COOKIE_RE.replace_all(text, "<REDACTED_COOKIE>");
    let text = SESSION_RE.replace_all(&text, "$1=<REDACTED>");
    let text = EMAIL_RE.replace_all(&text, "<REDACTED_EMAIL>");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut clipped: String = trimmed.chars().take(max_chars).collect();
    clipped.push('…');
    clipped
}
