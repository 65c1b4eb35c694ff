//! Membership-card and course-identifier resolution.
//!
//! The order page does not reliably carry the identifiers a submission needs,
//! so resolution walks an ordered chain of sources and keeps a record of what
//! each link produced. That record travels with the unit's outcome.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::model::{Course, MembershipCard, OrderPage};
use crate::core::reason::ReasonCode;

/// Name of the hidden form field carrying the course identifier.
pub const COURSE_ID_FIELD: &str = "course_id";
/// Hidden form field carrying the membership card identifier.
pub const MEMBER_CARD_FIELD: &str = "member_card_id";
/// Hidden form field carrying the card category identifier.
pub const CARD_CATEGORY_FIELD: &str = "card_cat_id";

static SCRIPT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?course_id["']?\s*[:=]\s*["']?([^"',;\s}]+)"#).expect("script id pattern")
});
static ATTRIBUTE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:data-course-id\s*=\s*["']([^"']*)["'])|(?:name\s*=\s*["']course_id["'][^>]*?value\s*=\s*["']([^"']*)["'])"#,
    )
    .expect("attribute id pattern")
});

/// Resolution failures, mapped onto the reason taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The account has no usable card.
    #[error("no membership card available: {0}")]
    CardMissing(String),
    /// Every link of the course-id chain came up empty.
    #[error("course id unresolved after {} source(s)", .0.len())]
    CourseIdMissing(Vec<LinkAttempt>),
}

impl ResolveError {
    /// Reason code for this failure.
    pub const fn reason(&self) -> ReasonCode {
        match self {
            Self::CardMissing(_) => ReasonCode::CardMissing,
            Self::CourseIdMissing(_) => ReasonCode::CourseIdMissing,
        }
    }
}

/// Where a course identifier may come from, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    /// Hidden `<input name="course_id">`.
    HiddenField,
    /// Assignment inside an inline script.
    InlineScript,
    /// `data-course-id` or an inline `name/value` attribute pair.
    MarkupAttribute,
    /// Configured fallback value.
    ConfiguredDefault,
}

impl fmt::Display for IdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HiddenField => "hidden_field",
            Self::InlineScript => "inline_script",
            Self::MarkupAttribute => "markup_attribute",
            Self::ConfiguredDefault => "configured_default",
        })
    }
}

/// What one chain link produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Well-formed identifier.
    Found(String),
    /// Something was there but not an identifier.
    Malformed(String),
    /// Nothing at this source.
    Absent,
}

/// Evidence entry for one chain link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAttempt {
    /// Source consulted.
    pub source: IdSource,
    /// Result.
    pub outcome: LinkOutcome,
}

impl fmt::Display for LinkAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            LinkOutcome::Found(id) => write!(f, "{}=found({id})", self.source),
            LinkOutcome::Malformed(raw) => write!(f, "{}=malformed({raw})", self.source),
            LinkOutcome::Absent => write!(f, "{}=absent", self.source),
        }
    }
}

/// Resolved course identifier plus the trail that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCourseId {
    /// The identifier.
    pub id: String,
    /// Every link consulted, in order.
    pub trail: Vec<LinkAttempt>,
}

/// Chosen card and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardChoice {
    /// The card.
    pub card: MembershipCard,
    /// Human-readable rationale.
    pub rationale: String,
}

fn well_formed(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}

fn judge(raw: Option<&str>) -> LinkOutcome {
    match raw.map(str::trim) {
        None | Some("") => LinkOutcome::Absent,
        Some(value) if well_formed(value) => LinkOutcome::Found(value.to_string()),
        Some(value) => LinkOutcome::Malformed(value.to_string()),
    }
}

/// First captured value, preferring a well-formed one.
fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    let values: Vec<&str> = re
        .captures_iter(text)
        .filter_map(|caps| caps.iter().skip(1).flatten().next())
        .map(|m| m.as_str())
        .collect();
    values
        .iter()
        .copied()
        .find(|v| well_formed(v.trim()))
        .or_else(|| values.first().copied())
}

/// Card and course-id resolution policy.
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    default_course_id: Option<String>,
    default_card: Option<MembershipCard>,
}

impl ResourceResolver {
    /// Resolver using `default_course_id` as the last chain link.
    pub fn new(default_course_id: Option<String>) -> Self {
        Self {
            default_course_id: default_course_id.filter(|v| !v.trim().is_empty()),
            default_card: None,
        }
    }

    /// Card used when neither the order page nor the card listing yields one.
    /// Ignored unless both identifiers are non-empty.
    #[must_use]
    pub fn with_default_card(
        mut self,
        card_id: impl Into<String>,
        category_id: impl Into<String>,
    ) -> Self {
        let (id, category_id): (String, String) = (card_id.into(), category_id.into());
        self.default_card = (!id.trim().is_empty() && !category_id.trim().is_empty()).then(|| {
            MembershipCard {
                id: id.trim().to_string(),
                category_id: category_id.trim().to_string(),
                label: "configured default".into(),
            }
        });
        self
    }

    /// Card identifiers the order page already carries. Both must be present.
    pub fn card_from_page(&self, page: &OrderPage) -> Option<CardChoice> {
        let field = |name: &str| {
            page.hidden_fields
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let (id, category_id) = (field(MEMBER_CARD_FIELD)?, field(CARD_CATEGORY_FIELD)?);
        Some(CardChoice {
            card: MembershipCard {
                id: id.to_string(),
                category_id: category_id.to_string(),
                label: "order page".into(),
            },
            rationale: format!("card {id}/{category_id} supplied by order page"),
        })
    }

    /// The configured default card, or `CardMissing` carrying `cause`.
    pub fn fallback_card(&self, cause: &str) -> Result<CardChoice, ResolveError> {
        self.default_card
            .as_ref()
            .map(|card| CardChoice {
                card: card.clone(),
                rationale: format!("configured default card {} used: {cause}", card.id),
            })
            .ok_or_else(|| ResolveError::CardMissing(cause.to_string()))
    }

    /// Pick a card from the account's listing.
    ///
    /// Preferred keywords are tried in order and each takes the first card
    /// whose label contains it; then the course's card hints the same way;
    /// then the first card. An empty listing falls back to the configured
    /// default card.
    pub fn choose_card(
        &self,
        cards: &[MembershipCard],
        preferred: &[String],
        course: &Course,
    ) -> Result<CardChoice, ResolveError> {
        let Some(first) = cards.first() else {
            return self.fallback_card("account lists no cards");
        };

        let find = |keywords: &[String]| {
            keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .find_map(|keyword| {
                    cards
                        .iter()
                        .find(|card| card.label.to_lowercase().contains(&keyword))
                        .map(|card| (card, keyword))
                })
        };

        if let Some((card, keyword)) = find(preferred) {
            return Ok(CardChoice {
                card: card.clone(),
                rationale: format!("card `{}` matched preferred keyword `{keyword}`", card.label),
            });
        }
        if let Some((card, hint)) = find(&course.required_card_hints) {
            return Ok(CardChoice {
                card: card.clone(),
                rationale: format!("card `{}` matched course hint `{hint}`", card.label),
            });
        }
        Ok(CardChoice {
            card: first.clone(),
            rationale: format!("card `{}` taken as first available", first.label),
        })
    }

    /// Walk the course-id chain over `page`.
    pub fn resolve_course_id(&self, page: &OrderPage) -> Result<ResolvedCourseId, ResolveError> {
        let mut trail = Vec::with_capacity(4);
        for source in [
            IdSource::HiddenField,
            IdSource::InlineScript,
            IdSource::MarkupAttribute,
            IdSource::ConfiguredDefault,
        ] {
            let raw = match source {
                IdSource::HiddenField => page.hidden_fields.get(COURSE_ID_FIELD).map(String::as_str),
                IdSource::InlineScript => page
                    .inline_scripts
                    .iter()
                    .find_map(|script| first_capture(&SCRIPT_ID_RE, script)),
                IdSource::MarkupAttribute => first_capture(&ATTRIBUTE_ID_RE, &page.markup),
                IdSource::ConfiguredDefault => self.default_course_id.as_deref(),
            };
            let outcome = judge(raw);
            let found = match &outcome {
                LinkOutcome::Found(id) => Some(id.clone()),
                LinkOutcome::Malformed(_) | LinkOutcome::Absent => None,
            };
            trail.push(LinkAttempt { source, outcome });
            if let Some(id) = found {
                tracing::debug!(%source, %id, "course id resolved");
                return Ok(ResolvedCourseId { id, trail });
            }
        }
        Err(ResolveError::CourseIdMissing(trail))
    }
}
