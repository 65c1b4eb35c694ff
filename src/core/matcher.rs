//! Course selection from a fetched listing.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::model::{Course, Occupancy, Task};
use crate::core::reason::ReasonCode;

static START_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s*[:：]\s*(\d{2})").expect("start time pattern"));

/// Why no course was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFailure {
    /// Nothing satisfied the filters and fallback was off.
    NoMatch,
    /// Candidates exist but none has capacity.
    CourseFull,
}

impl From<MatchFailure> for ReasonCode {
    fn from(value: MatchFailure) -> Self {
        match value {
            MatchFailure::NoMatch => Self::NoMatch,
            MatchFailure::CourseFull => Self::CourseFull,
        }
    }
}

/// How a course was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// It satisfied the filters.
    Filtered,
    /// Fallback picked it, ignoring keywords.
    Fallback,
}

/// A chosen course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    /// The course.
    pub course: &'a Course,
    /// How it was chosen.
    pub kind: MatchKind,
}

/// Filters and policy for one task.
#[derive(Debug, Clone)]
pub struct CourseMatcher {
    title_keywords: Vec<String>,
    time_keywords: Vec<String>,
    course_id: Option<String>,
    strict: bool,
    allow_fallback: bool,
}

/// Lowercase, alphanumerics only. Full-width punctuation and spacing vanish.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn clean(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Minutes after midnight of the first `HH:MM` in a time label.
fn start_minutes(label: &str) -> Option<u32> {
    let caps = START_TIME_RE.captures(label)?;
    let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some(hours * 60 + minutes)
}

/// Earliest start first (unparseable labels last), then title, then id.
fn schedule_order(a: &Course, b: &Course) -> Ordering {
    let key = |c: &Course| start_minutes(&c.time_label).unwrap_or(u32::MAX);
    key(a)
        .cmp(&key(b))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

impl CourseMatcher {
    /// Matcher for `task`'s filters and flags.
    pub fn for_task(task: &Task) -> Self {
        Self {
            title_keywords: clean(&task.title_keywords),
            time_keywords: clean(&task.time_keywords),
            course_id: task
                .course_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            strict: task.strict_match,
            allow_fallback: task.allow_fallback,
        }
    }

    fn contains_any(&self, haystack: &str, keywords: &[String]) -> bool {
        if keywords.is_empty() {
            return true;
        }
        if self.strict {
            let haystack = haystack.to_lowercase();
            keywords.iter().any(|k| haystack.contains(&k.to_lowercase()))
        } else {
            let haystack = normalize(haystack);
            keywords.iter().any(|k| {
                let k = normalize(k);
                !k.is_empty() && haystack.contains(&k)
            })
        }
    }

    /// Whether `course` satisfies the filters, ignoring occupancy.
    pub fn qualifies(&self, course: &Course) -> bool {
        if self.course_id.as_deref() == Some(course.id.as_str()) {
            return true;
        }
        if self.title_keywords.is_empty() && self.time_keywords.is_empty() {
            return false;
        }
        self.contains_any(&course.title, &self.title_keywords)
            && self.contains_any(&course.time_label, &self.time_keywords)
    }

    /// Pick exactly one course or explain why none fits.
    pub fn select<'a>(&self, courses: &'a [Course]) -> Result<Selection<'a>, MatchFailure> {
        if courses.is_empty() {
            return Err(MatchFailure::NoMatch);
        }
        let qualifying: Vec<&Course> = courses.iter().filter(|c| self.qualifies(c)).collect();

        if let Some(course) = qualifying
            .iter()
            .copied()
            .filter(|c| c.occupancy == Occupancy::Available)
            .min_by(|a, b| schedule_order(a, b))
        {
            return Ok(Selection {
                course,
                kind: MatchKind::Filtered,
            });
        }

        if self.allow_fallback {
            return courses
                .iter()
                .filter(|c| c.occupancy == Occupancy::Available)
                .min_by(|a, b| schedule_order(a, b))
                .map(|course| Selection {
                    course,
                    kind: MatchKind::Fallback,
                })
                .ok_or(MatchFailure::CourseFull);
        }

        if qualifying.is_empty() {
            Err(MatchFailure::NoMatch)
        } else {
            Err(MatchFailure::CourseFull)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, title: &str, time: &str, occupancy: Occupancy) -> Course {
        Course {
            id: id.into(),
            title: title.into(),
            time_label: time.into(),
            occupancy,
            required_card_hints: vec![],
            taken: 0,
            total: 0,
            href: String::new(),
        }
    }

    fn task(titles: &[&str], times: &[&str], strict: bool, fallback: bool) -> Task {
        Task {
            id: "t".into(),
            title_keywords: titles.iter().map(|s| s.to_string()).collect(),
            time_keywords: times.iter().map(|s| s.to_string()).collect(),
            strict_match: strict,
            allow_fallback: fallback,
            ..Task::default()
        }
    }

    #[test]
    fn strict_title_match_selects_course() {
        let courses = vec![course("1", "Fitness Center (Noon)", "12:30-14:00", Occupancy::Available)];
        let matcher = CourseMatcher::for_task(&task(&["Fitness Center (Noon)"], &[], true, false));
        let picked = matcher.select(&courses).unwrap();
        assert_eq!(picked.course.id, "1");
        assert_eq!(picked.kind, MatchKind::Filtered);
    }

    #[test]
    fn strict_is_case_insensitive_and_checks_time() {
        let courses = vec![
            course("1", "Swimming Hall", "19:00 - 21:00", Occupancy::Available),
            course("2", "swimming hall", "12:30 - 14:00", Occupancy::Available),
        ];
        let matcher = CourseMatcher::for_task(&task(&["SWIMMING"], &["12:30 - 14:00"], true, false));
        assert_eq!(matcher.select(&courses).unwrap().course.id, "2");
    }

    #[test]
    fn strict_rejects_formatting_variance_but_relaxed_accepts() {
        let courses = vec![course("1", "游泳馆（午）", "12:30 - 14:00", Occupancy::Available)];
        let strict = CourseMatcher::for_task(&task(&["游泳馆(午)"], &["12:30-14:00"], true, false));
        assert_eq!(strict.select(&courses), Err(MatchFailure::NoMatch));

        let relaxed = CourseMatcher::for_task(&task(&["游泳馆(午)"], &["12:30-14:00"], false, false));
        assert_eq!(relaxed.select(&courses).unwrap().course.id, "1");
    }

    #[test]
    fn fallback_picks_earliest_available() {
        let courses = vec![
            course("a", "Yoga", "19:00-20:00", Occupancy::Available),
            course("b", "Boxing", "08:00-09:00", Occupancy::Full),
            course("c", "Pilates", "09:30-10:30", Occupancy::Available),
            course("d", "Aerobics", "09:30-10:30", Occupancy::Available),
        ];
        let matcher = CourseMatcher::for_task(&task(&["Swimming"], &[], true, true));
        let picked = matcher.select(&courses).unwrap();
        assert_eq!(picked.course.id, "d");
        assert_eq!(picked.kind, MatchKind::Fallback);
    }

    #[test]
    fn empty_listing_is_no_match_even_with_fallback() {
        let matcher = CourseMatcher::for_task(&task(&["Swimming"], &[], true, true));
        assert_eq!(matcher.select(&[]), Err(MatchFailure::NoMatch));
    }

    #[test]
    fn no_match_without_fallback() {
        let courses = vec![course("a", "Yoga", "19:00-20:00", Occupancy::Available)];
        let matcher = CourseMatcher::for_task(&task(&["Swimming"], &[], true, false));
        assert_eq!(matcher.select(&courses), Err(MatchFailure::NoMatch));
        assert_eq!(matcher.select(&[]), Err(MatchFailure::NoMatch));
    }

    #[test]
    fn full_course_is_never_overridden() {
        let courses = vec![course("a", "Swimming", "12:30-14:00", Occupancy::Full)];
        let strict = CourseMatcher::for_task(&task(&["Swimming"], &[], true, false));
        assert_eq!(strict.select(&courses), Err(MatchFailure::CourseFull));

        let fallback = CourseMatcher::for_task(&task(&["Swimming"], &[], true, true));
        assert_eq!(fallback.select(&courses), Err(MatchFailure::CourseFull));
    }

    #[test]
    fn qualifying_full_course_falls_back_to_available_one() {
        let courses = vec![
            course("a", "Swimming", "12:30-14:00", Occupancy::Full),
            course("b", "Gym", "15:00-16:00", Occupancy::Available),
        ];
        let matcher = CourseMatcher::for_task(&task(&["Swimming"], &[], true, true));
        let picked = matcher.select(&courses).unwrap();
        assert_eq!(picked.course.id, "b");
        assert_eq!(picked.kind, MatchKind::Fallback);
    }

    #[test]
    fn course_id_filter_qualifies_directly() {
        let courses = vec![
            course("111", "Yoga", "08:00-09:00", Occupancy::Available),
            course("222", "Gym", "12:00-13:00", Occupancy::Available),
        ];
        let mut t = task(&[], &[], true, false);
        t.course_id = Some("222".into());
        assert_eq!(CourseMatcher::for_task(&t).select(&courses).unwrap().course.id, "222");
    }

    #[test]
    fn selection_is_deterministic() {
        let courses = vec![
            course("x", "Swimming B", "12:30-14:00", Occupancy::Available),
            course("y", "Swimming A", "12:30-14:00", Occupancy::Available),
        ];
        let matcher = CourseMatcher::for_task(&task(&["swimming"], &[], true, true));
        let first = matcher.select(&courses).unwrap().course.id.clone();
        for _ in 0..10 {
            assert_eq!(matcher.select(&courses).unwrap().course.id, first);
        }
        assert_eq!(first, "y");
    }
}
