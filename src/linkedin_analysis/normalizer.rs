// src/linkedin_analysis/normalizer.rs
use crate::types::job::{UNKNOWN_COMPANY, UNKNOWN_TITLE};
use crate::types::{NormalizedJob, RawDescription, RawJobRecord};
use serde_json::Value;

/// Sub-fields searched, in order, when the description arrives as an object.
const TEXT_FIELDS: [&str; 2] = ["text", "content"];

/// Reduce a raw description to trimmed text. `None` means no text could be derived.
pub fn normalize_description(raw: Option<&RawDescription>) -> Option<String> {
    let text = match raw? {
        RawDescription::Text(text) => text.trim().to_string(),
        RawDescription::Structured(Value::Null) => return None,
        RawDescription::Structured(Value::String(text)) => text.trim().to_string(),
        RawDescription::Structured(value) => text_field(value).unwrap_or_else(|| value.to_string()),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn text_field(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    TEXT_FIELDS
        .iter()
        .filter_map(|field| object.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Normalize a whole record, dropping it when the description is absent or blank.
pub fn normalize_job(raw: &RawJobRecord) -> Option<NormalizedJob> {
    let description = normalize_description(raw.description.as_ref())?;

    Some(NormalizedJob {
        title: clean_label(raw.title.as_deref(), UNKNOWN_TITLE),
        company: clean_label(raw.company.as_deref(), UNKNOWN_COMPANY),
        description,
    })
}

fn clean_label(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Option<RawDescription> {
        Some(RawDescription::Text(s.to_string()))
    }

    fn structured(v: Value) -> Option<RawDescription> {
        Some(RawDescription::Structured(v))
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        assert_eq!(
            normalize_description(text("  Build APIs in Rust \n").as_ref()),
            Some("Build APIs in Rust".to_string())
        );
    }

    #[test]
    fn test_blank_or_absent_is_none() {
        assert_eq!(normalize_description(None), None);
        assert_eq!(normalize_description(text("").as_ref()), None);
        assert_eq!(normalize_description(text(" \n\t ").as_ref()), None);
        assert_eq!(normalize_description(structured(Value::Null).as_ref()), None);
    }

    #[test]
    fn test_text_field_preferred_over_content() {
        let raw = structured(json!({"content": "second", "text": " first "}));
        assert_eq!(normalize_description(raw.as_ref()), Some("first".to_string()));
    }

    #[test]
    fn test_content_used_when_text_blank() {
        let raw = structured(json!({"text": "   ", "content": "Kubernetes and Go"}));
        assert_eq!(
            normalize_description(raw.as_ref()),
            Some("Kubernetes and Go".to_string())
        );
    }

    #[test]
    fn test_object_without_text_fields_renders_whole_value() {
        let value = json!({"attributes": [], "html": "<p>hi</p>"});
        let raw = structured(value.clone());
        assert_eq!(normalize_description(raw.as_ref()), Some(value.to_string()));
    }

    #[test]
    fn test_non_string_text_field_is_ignored() {
        let value = json!({"text": {"nested": true}});
        let raw = structured(value.clone());
        assert_eq!(normalize_description(raw.as_ref()), Some(value.to_string()));
    }

    #[test]
    fn test_normalize_job_fills_missing_labels() {
        let raw = RawJobRecord {
            title: None,
            company: Some("  ".to_string()),
            description: text("Rust"),
        };
        let job = normalize_job(&raw).unwrap();
        assert_eq!(job.title, "Unknown Title");
        assert_eq!(job.company, "Unknown Company");
        assert_eq!(job.description, "Rust");
    }

    #[test]
    fn test_normalize_job_drops_empty_description() {
        let raw = RawJobRecord {
            title: Some("Engineer".to_string()),
            company: Some("Acme".to_string()),
            description: text("   "),
        };
        assert!(normalize_job(&raw).is_none());
    }
}
