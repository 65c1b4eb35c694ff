//! Loose-shape parsing for values arriving as env strings or untyped JSON.
//!
//! Keyword lists may be JSON arrays or strings split on `|`, `,`, `;` or a
//! newline. Delay windows may be `[min, max]`, `{"min_ms", "max_ms"}` or a
//! string such as `"120,300"`. Dates accept anything [`DateSpec::parse`] does
//! plus the tagged JSON form.

use serde_json::Value;

use crate::core::date_rule::DateSpec;
use crate::core::error::ConfigError;
use crate::core::model::{Account, Credential, Task};
use crate::util::delay::DelayRange;

static NULL: Value = Value::Null;

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Split a keyword string into trimmed, non-empty entries.
pub fn split_keywords(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<Value>>(raw) {
            return items.iter().filter_map(text).filter(|k| !k.is_empty()).collect();
        }
    }
    raw.split(['|', ',', ';', '\n'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keyword list from any supported shape.
pub fn keywords(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).filter(|k| !k.is_empty()).collect(),
        Value::String(s) => split_keywords(s),
        Value::Null => Vec::new(),
        other => text(other).into_iter().collect(),
    }
}

/// Boolean from `true/false`, `1/0`, `yes/no`, `on/off`; `default` when absent.
pub fn boolean(value: &Value, default: bool, key: &str) -> Result<bool, ConfigError> {
    match value {
        Value::Null => Ok(default),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::Invalid(format!("{key}: `{other}` is not a boolean"))),
        },
        _ => Err(ConfigError::Invalid(format!("{key}: expected a boolean"))),
    }
}

/// Non-negative integer; `None` when absent or blank.
pub fn integer(value: &Value, key: &str) -> Result<Option<u64>, ConfigError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| ConfigError::Invalid(format!("{key}: `{n}` is not a non-negative integer"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{key}: `{s}` is not a non-negative integer"))),
        _ => Err(ConfigError::Invalid(format!("{key}: expected an integer"))),
    }
}

fn bound(value: Option<&Value>, key: &str) -> Result<u64, ConfigError> {
    value
        .map(|v| integer(v, key))
        .transpose()?
        .flatten()
        .ok_or_else(|| ConfigError::Invalid(format!("{key}: delay bound missing")))
}

/// Delay window; the default window when absent.
///
/// Bounds are not ordered here so validation can name the offending task.
pub fn delay(value: &Value, key: &str) -> Result<DelayRange, ConfigError> {
    let pair = |items: &[Value]| -> Result<DelayRange, ConfigError> {
        match items {
            [min, max] => Ok(DelayRange {
                min_ms: bound(Some(min), key)?,
                max_ms: bound(Some(max), key)?,
            }),
            _ => Err(ConfigError::Invalid(format!("{key}: expected exactly two bounds"))),
        }
    };
    match value {
        Value::Null => Ok(DelayRange::default()),
        Value::Array(items) => pair(items),
        Value::Object(map) => Ok(DelayRange {
            min_ms: bound(map.get("min_ms"), key)?,
            max_ms: bound(map.get("max_ms"), key)?,
        }),
        Value::String(s) if s.trim().is_empty() => Ok(DelayRange::default()),
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with('[') {
                let items: Vec<Value> = serde_json::from_str(s)
                    .map_err(|e| ConfigError::Invalid(format!("{key}: {e}")))?;
                return pair(&items);
            }
            let items: Vec<Value> = s
                .split(|c: char| matches!(c, ',' | '|' | ';') || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(|t| Value::String(t.to_string()))
                .collect();
            pair(&items)
        }
        _ => Err(ConfigError::Invalid(format!("{key}: unsupported delay shape"))),
    }
}

/// Date specification; `None` when absent.
pub fn date_spec(value: &Value) -> Result<Option<DateSpec>, ConfigError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => DateSpec::parse(s).map(Some),
        Value::Array(_) => DateSpec::parse(&value.to_string()).map(Some),
        Value::Object(_) => {
            let spec: DateSpec = serde_json::from_value(value.clone())
                .map_err(|e| ConfigError::InvalidDateSpec(e.to_string()))?;
            spec.validate()?;
            Ok(Some(spec))
        }
        _ => Err(ConfigError::InvalidDateSpec(value.to_string())),
    }
}

fn list(raw: &str, key: &str) -> Result<Vec<Value>, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(raw) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(ConfigError::Invalid(format!("{key}: expected a JSON array"))),
        Err(e) => Err(ConfigError::Invalid(format!("{key}: {e}"))),
    }
}

/// Accounts from the `ACCOUNTS` JSON array.
///
/// Missing names become `account-<n>`; the credential may be given as
/// `cookie` or `credential`.
pub fn accounts(raw: &str) -> Result<Vec<Account>, ConfigError> {
    list(raw, "ACCOUNTS")?
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let Value::Object(map) = item else {
                return Err(ConfigError::Invalid(format!("ACCOUNTS[{idx}] is not an object")));
            };
            let name = map
                .get("name")
                .and_then(text)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("account-{}", idx + 1));
            let credential = map
                .get("cookie")
                .or_else(|| map.get("credential"))
                .and_then(text)
                .unwrap_or_default();
            if credential.is_empty() {
                return Err(ConfigError::MissingCredential(name));
            }
            Ok(Account {
                name,
                credential: Credential::new(credential),
                preferred_cards: map.get("preferred_cards").map(keywords).unwrap_or_default(),
            })
        })
        .collect()
}

/// Tasks from the `TASKS` JSON array.
pub fn tasks(raw: &str) -> Result<Vec<Task>, ConfigError> {
    list(raw, "TASKS")?
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let Value::Object(map) = item else {
                return Err(ConfigError::Invalid(format!("TASKS[{idx}] is not an object")));
            };
            let field = |key: &str| map.get(key).unwrap_or(&NULL);
            let key = |name: &str| format!("TASKS[{idx}].{name}");

            let max_attempts = match integer(field("max_attempts"), &key("max_attempts"))? {
                None => 1,
                Some(n) => u32::try_from(n)
                    .map_err(|_| ConfigError::Invalid(format!("{}: too large", key("max_attempts"))))?,
            };
            let delay_value = map.get("delay_ms").or_else(|| map.get("delay")).unwrap_or(&NULL);

            Ok(Task {
                id: field("id").as_str().map(str::trim).unwrap_or_default().to_string(),
                title_keywords: keywords(field("title_keywords")),
                time_keywords: keywords(field("time_keywords")),
                course_id: text(field("course_id")).filter(|id| !id.is_empty()),
                date: date_spec(field("date"))?,
                strict_match: boolean(field("strict_match"), true, &key("strict_match"))?,
                allow_fallback: boolean(field("allow_fallback"), true, &key("allow_fallback"))?,
                max_attempts,
                delay: delay(delay_value, &key("delay_ms"))?,
                accounts: keywords(field("accounts")),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keyword_shapes() {
        assert_eq!(split_keywords("游泳馆|健身中心"), vec!["游泳馆", "健身中心"]);
        assert_eq!(split_keywords(r#"["a", " b ", ""]"#), vec!["a", "b"]);
        assert_eq!(keywords(&json!(["x", 12])), vec!["x", "12"]);
        assert!(keywords(&Value::Null).is_empty());
    }

    #[test]
    fn delay_shapes() {
        let expected = DelayRange { min_ms: 100, max_ms: 250 };
        assert_eq!(delay(&json!([100, 250]), "d").unwrap(), expected);
        assert_eq!(delay(&json!("100,250"), "d").unwrap(), expected);
        assert_eq!(delay(&json!("100 250"), "d").unwrap(), expected);
        assert_eq!(delay(&json!("[100, 250]"), "d").unwrap(), expected);
        assert_eq!(delay(&json!({"min_ms": 100, "max_ms": 250}), "d").unwrap(), expected);
        assert_eq!(delay(&Value::Null, "d").unwrap(), DelayRange::default());
        assert!(delay(&json!([1, 2, 3]), "d").is_err());
    }

    #[test]
    fn booleans() {
        assert!(boolean(&json!("yes"), false, "b").unwrap());
        assert!(!boolean(&json!("0"), true, "b").unwrap());
        assert!(boolean(&Value::Null, true, "b").unwrap());
        assert!(boolean(&json!("maybe"), true, "b").is_err());
    }

    #[test]
    fn accounts_need_credentials() {
        let parsed = accounts(r#"[{"cookie":"PHPSESSID=1","preferred_cards":"次卡|月卡"}]"#).unwrap();
        assert_eq!(parsed[0].name, "account-1");
        assert_eq!(parsed[0].preferred_cards, vec!["次卡", "月卡"]);

        let err = accounts(r#"[{"name":"bob"}]"#).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential("bob".into()));
    }

    #[test]
    fn tasks_accept_loose_fields() {
        let parsed = tasks(
            r#"[{"title_keywords":"游泳馆","date":"2024-11-01~2024-11-02",
                 "strict_match":"false","max_attempts":"3","delay_ms":"50|80","course_id":89007443}]"#,
        )
        .unwrap();
        let task = &parsed[0];
        assert_eq!(task.title_keywords, vec!["游泳馆"]);
        assert!(!task.strict_match);
        assert!(task.allow_fallback);
        assert_eq!(task.max_attempts, 3);
        assert_eq!(task.delay, DelayRange { min_ms: 50, max_ms: 80 });
        assert_eq!(task.course_id.as_deref(), Some("89007443"));
        assert!(matches!(task.date, Some(DateSpec::Range { .. })));
    }
}
