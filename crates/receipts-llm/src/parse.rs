//! LLM response parsing and field validation.
//!
//! The model is asked for bare JSON but real responses arrive fenced,
//! prefixed with prose, or subtly malformed. Parsing therefore runs in two
//! layers: [`extract_json`] recovers the JSON body from whatever wrapper the
//! model used, and the per-field validators sanitize each value
//! independently. Validators never fail - they substitute a safe default so
//! the pipeline always reaches a terminal record.

use chrono::{NaiveDate, Utc};
use receipts_core::{clamp_confidence, Category};
use serde_json::Value;

/// Maximum vendor length in characters.
const MAX_VENDOR_LEN: usize = 100;

/// Maximum description length in characters.
const MAX_DESCRIPTION_LEN: usize = 500;

/// Keys a usable extraction response must carry.
const REQUIRED_KEYS: &[&str] = &[
    "vendor",
    "amount",
    "date",
    "categoryId",
    "description",
    "confidence",
];

/// Category names that mark a usable default, in preference order.
const DEFAULT_CATEGORY_MARKERS: &[&str] = &["general", "miscellaneous", "other", "business"];

/// Validated field values parsed out of one LLM response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpenseFields {
    /// Vendor name, truncated to 100 characters.
    pub vendor: String,
    /// Positive amount rounded to cents, 0 when unusable.
    pub amount: f64,
    /// Transaction date, today when unparseable.
    pub date: NaiveDate,
    /// Category ID resolved against the directory.
    pub category_id: String,
    /// Description, truncated to 500 characters.
    pub description: String,
    /// LLM confidence clamped to [0, 1], 0.5 when unparseable.
    pub confidence: f64,
}

/// Pull the JSON body out of a model response, tolerating code fences and
/// surrounding prose.
#[must_use = "returns the extracted JSON body"]
pub fn extract_json(text: &str) -> String {
    let text = text.trim();

    // ```json ... ``` wrapper: drop the fence lines
    if let Some(rest) = text.strip_prefix("```") {
        if let Some(newline) = rest.find('\n') {
            let body = &rest[newline + 1..];
            if let Some(end) = body.rfind("```") {
                return body[..end].trim().to_string();
            }
        }
    }

    // Otherwise take the outermost brace span
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    text.to_string()
}

/// Parse and validate a model response against the category directory.
///
/// # Errors
///
/// Returns a description of what went wrong when the response is not JSON or
/// misses a required key. Field-level problems do not error - each validator
/// substitutes its fallback instead.
pub fn parse_expense_fields(
    response_text: &str,
    categories: &[Category],
) -> Result<ParsedExpenseFields, String> {
    let body = extract_json(response_text);
    let value: Value =
        serde_json::from_str(&body).map_err(|e| format!("response is not valid JSON: {e}"))?;

    let object = value
        .as_object()
        .ok_or_else(|| "response JSON is not an object".to_string())?;

    for key in REQUIRED_KEYS {
        if !object.contains_key(*key) {
            return Err(format!("response is missing required key '{key}'"));
        }
    }

    Ok(ParsedExpenseFields {
        vendor: validate_text(&value["vendor"], MAX_VENDOR_LEN, "Unknown Vendor"),
        amount: validate_amount(&value["amount"]),
        date: validate_date(&value["date"]),
        category_id: validate_category(&value["categoryId"], categories),
        description: validate_text(&value["description"], MAX_DESCRIPTION_LEN, ""),
        confidence: validate_confidence(&value["confidence"]),
    })
}

/// Sanitize an amount: positive finite number, rounded half-up to cents.
/// Anything else maps to 0.
#[must_use = "returns the validated amount"]
pub fn validate_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    };

    match amount {
        Some(a) if a.is_finite() && a > 0.0 => (a * 100.0).round() / 100.0,
        _ => 0.0,
    }
}

/// Parse a date, falling back to today. Accepts ISO dates, ISO datetimes
/// and the common US slash format.
#[must_use = "returns the validated date"]
pub fn validate_date(value: &Value) -> NaiveDate {
    let Some(text) = value.as_str() else {
        return Utc::now().date_naive();
    };
    let text = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date;
    }
    // Datetime with a date prefix, e.g. 2024-03-01T12:00:00Z
    if text.len() >= 10 {
        if let Ok(date) = NaiveDate::parse_from_str(&text[..10], "%Y-%m-%d") {
            return date;
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
        return date;
    }

    Utc::now().date_naive()
}

/// Resolve a category value against the directory.
///
/// Resolution order: exact ID match, case-insensitive name match, then
/// [`default_category_id`].
#[must_use = "returns the resolved category ID"]
pub fn validate_category(value: &Value, categories: &[Category]) -> String {
    let requested = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };

    if !requested.is_empty() {
        if categories.iter().any(|c| c.id == requested) {
            return requested;
        }
        if let Some(by_name) = categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&requested))
        {
            return by_name.id.clone();
        }
    }

    default_category_id(categories)
}

/// The directory's default category: the first whose name contains a
/// general-purpose marker, else the first category, else the literal `"1"`.
#[must_use = "returns the default category ID"]
pub fn default_category_id(categories: &[Category]) -> String {
    for marker in DEFAULT_CATEGORY_MARKERS {
        if let Some(category) = categories
            .iter()
            .find(|c| c.name.to_lowercase().contains(marker))
        {
            return category.id.clone();
        }
    }
    categories
        .first()
        .map_or_else(|| "1".to_string(), |c| c.id.clone())
}

/// Clamp a confidence value, defaulting to 0.5 when unparseable.
#[must_use = "returns the validated confidence"]
pub fn validate_confidence(value: &Value) -> f64 {
    let confidence = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    confidence.map_or(0.5, clamp_confidence)
}

fn validate_text(value: &Value, max_len: usize, fallback: &str) -> String {
    let text = value.as_str().map(str::trim).unwrap_or(fallback);
    let text = if text.is_empty() { fallback } else { text };
    text.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn travel_categories() -> Vec<Category> {
        vec![
            Category { id: "5".into(), name: "Travel".into(), description: String::new() },
            Category { id: "8".into(), name: "General Business".into(), description: String::new() },
        ]
    }

    #[test]
    fn test_extract_json_passthrough() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_strips_fences() {
        let fenced = "```json\n{\"vendor\": \"Acme\"}\n```";
        assert_eq!(extract_json(fenced), "{\"vendor\": \"Acme\"}");

        let bare_fence = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(bare_fence), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_finds_object_in_prose() {
        let wrapped = "Here is the extraction: {\"a\": 1} as requested.";
        assert_eq!(extract_json(wrapped), "{\"a\": 1}");
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_amount_rejects_non_positive() {
        assert_eq!(validate_amount(&json!(-5)), 0.0);
        assert_eq!(validate_amount(&json!(0)), 0.0);
        assert_eq!(validate_amount(&json!("not a number")), 0.0);
        assert_eq!(validate_amount(&json!(null)), 0.0);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_amount_rounds_half_up_to_cents() {
        assert_eq!(validate_amount(&json!("12.345")), 12.35);
        assert_eq!(validate_amount(&json!(42.5)), 42.5);
        assert_eq!(validate_amount(&json!("$1,234.56")), 1234.56);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(validate_date(&json!("2024-03-01")), expected);
        assert_eq!(validate_date(&json!("2024-03-01T12:30:00Z")), expected);
        assert_eq!(validate_date(&json!("03/01/2024")), expected);
    }

    #[test]
    fn test_date_fallback_is_today() {
        assert_eq!(validate_date(&json!("not a date")), Utc::now().date_naive());
        assert_eq!(validate_date(&json!(null)), Utc::now().date_naive());
    }

    #[test]
    fn test_category_exact_id_match() {
        assert_eq!(validate_category(&json!("5"), &travel_categories()), "5");
    }

    #[test]
    fn test_category_name_match_is_case_insensitive() {
        assert_eq!(validate_category(&json!("travel"), &travel_categories()), "5");
        assert_eq!(validate_category(&json!("Travel"), &travel_categories()), "5");
    }

    #[test]
    fn test_category_falls_back_to_default_marker() {
        // "bogus" resolves to the category whose name contains "business"
        assert_eq!(validate_category(&json!("bogus"), &travel_categories()), "8");
    }

    #[test]
    fn test_category_empty_directory_is_literal_one() {
        assert_eq!(validate_category(&json!("bogus"), &[]), "1");
        assert_eq!(default_category_id(&[]), "1");
    }

    #[test]
    fn test_default_category_prefers_marker_over_first() {
        let cats = travel_categories();
        assert_eq!(default_category_id(&cats), "8");

        let no_marker = vec![Category {
            id: "3".into(),
            name: "Travel".into(),
            description: String::new(),
        }];
        assert_eq!(default_category_id(&no_marker), "3");
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_confidence_clamped_with_default() {
        assert_eq!(validate_confidence(&json!(0.85)), 0.85);
        assert_eq!(validate_confidence(&json!(7.0)), 1.0);
        assert_eq!(validate_confidence(&json!(-1.0)), 0.0);
        assert_eq!(validate_confidence(&json!("oops")), 0.5);
        assert_eq!(validate_confidence(&json!(null)), 0.5);
    }

    #[test]
    fn test_parse_requires_all_keys() {
        let missing = r#"{"vendor": "Acme", "amount": 1}"#;
        let err = parse_expense_fields(missing, &[]).unwrap_err();
        assert!(err.contains("missing required key"));
    }

    #[test]
    fn test_parse_happy_path() {
        let response = r#"{
            "vendor": "Acme",
            "amount": 42.5,
            "date": "2024-03-01",
            "categoryId": "5",
            "description": "lunch",
            "confidence": 0.85
        }"#;
        let fields = parse_expense_fields(response, &travel_categories()).unwrap();
        assert_eq!(fields.vendor, "Acme");
        assert_eq!(fields.amount, 42.5);
        assert_eq!(fields.category_id, "5");
        assert_eq!(fields.confidence, 0.85);
    }

    #[test]
    fn test_parse_truncates_long_text() {
        let response = format!(
            r#"{{"vendor": "{}", "amount": 1, "date": "2024-01-01", "categoryId": "5", "description": "{}", "confidence": 0.9}}"#,
            "v".repeat(300),
            "d".repeat(900),
        );
        let fields = parse_expense_fields(&response, &travel_categories()).unwrap();
        assert_eq!(fields.vendor.chars().count(), 100);
        assert_eq!(fields.description.chars().count(), 500);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(parse_expense_fields("not json at all", &[]).is_err());
        assert!(parse_expense_fields("[1, 2, 3]", &[]).is_err());
    }
}
