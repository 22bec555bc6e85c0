//! Lenient readers over the calendar artifact. Missing sections read as empty.

use serde_json::{Map, Value};

use crate::domain::{CalendarError, Result};

pub(crate) fn as_object<'a>(artifact: &'a Value, gate: &str) -> Result<&'a Map<String, Value>> {
    artifact.as_object().ok_or_else(|| {
        CalendarError::MalformedArtifact(format!("{gate} expects a JSON object artifact"))
    })
}

pub(crate) fn section<'a>(artifact: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    artifact
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn schedule(artifact: &Map<String, Value>) -> &[Value] {
    section(artifact, "schedule")
}

pub(crate) fn weekly_themes(artifact: &Map<String, Value>) -> &[Value] {
    section(artifact, "weekly_themes")
}

pub(crate) fn recommendations(artifact: &Map<String, Value>) -> &[Value] {
    section(artifact, "recommendations")
}

pub(crate) fn kpis(artifact: &Map<String, Value>) -> &[Value] {
    section(artifact, "kpis")
}

/// Trimmed, non-empty string field.
pub(crate) fn text<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// `title`, else `topic`. Bare strings are their own title.
pub(crate) fn item_title(item: &Value) -> Option<&str> {
    if let Some(s) = item.as_str() {
        let s = s.trim();
        return (!s.is_empty()).then_some(s);
    }
    text(item, "title").or_else(|| text(item, "topic"))
}

/// `theme`, else `title`, for weekly theme entries.
pub(crate) fn theme_title(item: &Value) -> Option<&str> {
    if item.is_string() {
        return item_title(item);
    }
    text(item, "theme").or_else(|| text(item, "title"))
}

pub(crate) fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Numbers, or strings such as `"12%"` / `"1,500"`.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .replace(',', "")
            .parse::<f64>()
            .ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_title_falls_back_to_topic() {
        assert_eq!(item_title(&json!({ "topic": " SEO basics " })), Some("SEO basics"));
        assert_eq!(item_title(&json!("Launch week")), Some("Launch week"));
        assert_eq!(item_title(&json!({ "title": "" })), None);
    }

    #[test]
    fn test_as_number_accepts_percent_strings() {
        assert_eq!(as_number(&json!("12%")), Some(12.0));
        assert_eq!(as_number(&json!("1,500")), Some(1500.0));
        assert_eq!(as_number(&json!("many")), None);
    }

    #[test]
    fn test_missing_sections_read_empty() {
        let artifact = json!({ "schedule": "not a list" });
        let obj = as_object(&artifact, "t").unwrap();
        assert!(schedule(obj).is_empty());
        assert!(kpis(obj).is_empty());
        assert!(as_object(&json!([]), "t").is_err());
    }
}
