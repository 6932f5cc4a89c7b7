//! Type-aware value parsing and tolerance validation (spec.md §3, §4.6).

use serde_json::Value;

use crate::config::ToleranceConfig;
use crate::fuzzy::{digit_substitute, edit_distance};
use crate::types::{BoxSource, FieldType};

/// A value after type-specific parsing, ahead of tolerance validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Currency(f64),
    Percentage(f64),
    Reference(String),
    Account(String),
    Text(String),
}

impl ParsedValue {
    pub fn as_json(&self) -> Value {
        match self {
            ParsedValue::Currency(v) | ParsedValue::Percentage(v) => {
                serde_json::Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null)
            }
            ParsedValue::Reference(s) | ParsedValue::Account(s) | ParsedValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Parses raw text into a typed value per spec.md §4.6. `None` means the
/// text does not parse as this type at all, distinct from failing the
/// tolerance check afterwards.
pub fn parse(field_type: FieldType, raw: &str) -> Option<ParsedValue> {
    match field_type {
        FieldType::Currency => parse_currency(raw).map(ParsedValue::Currency),
        FieldType::Percentage => parse_percentage(raw).map(ParsedValue::Percentage),
        FieldType::Reference => parse_reference(raw).map(ParsedValue::Reference),
        FieldType::Account => parse_account(raw).map(ParsedValue::Account),
        FieldType::Text => Some(ParsedValue::Text(raw.trim().to_string())),
    }
}

fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(['R', 'r'], "");
    let substituted = digit_substitute(&cleaned);
    let has_space = substituted.contains(' ');
    let has_comma = substituted.contains(',');
    let comma_suffix_len = substituted.rfind(',').map(|idx| substituted.chars().skip(idx + 1).count());

    let normalized = if has_space && has_comma && comma_suffix_len.is_some_and(|n| n <= 2) {
        substituted.replace(' ', "").replace(',', ".")
    } else if has_comma && !has_space && comma_suffix_len == Some(2) {
        substituted.replace(',', ".")
    } else {
        substituted.replace(',', "").replace(' ', "")
    };

    normalized.trim().parse::<f64>().ok()
}

fn parse_percentage(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace('%', "").replace(' ', "");
    let substituted = digit_substitute(&cleaned).replace(',', ".");
    substituted.parse::<f64>().ok()
}

fn parse_reference(raw: &str) -> Option<String> {
    let digits: String = digit_substitute(raw).chars().filter(char::is_ascii_digit).collect();
    (10..=11).contains(&digits.len()).then_some(digits)
}

fn parse_account(raw: &str) -> Option<String> {
    let digits: String = digit_substitute(raw).chars().filter(char::is_ascii_digit).collect();
    (6..=12).contains(&digits.len()).then_some(digits)
}

fn expected_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn expected_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn numeric_match(found: f64, expected: f64, tolerance: f64) -> (bool, f64) {
    let diff = (found - expected).abs();
    let valid = diff <= tolerance;
    let confidence = (1.0 - diff / tolerance).clamp(0.0, 1.0);
    (valid, confidence)
}

/// Whether `found` matches `expected` under the type's tolerance rule
/// (spec.md §3), and the resulting confidence (spec.md §4.6).
pub fn validate(field_type: FieldType, found: &ParsedValue, expected: &Value, source: BoxSource, tolerance: &ToleranceConfig) -> (bool, f64) {
    match (field_type, found) {
        (FieldType::Currency, ParsedValue::Currency(f)) => match expected_f64(expected) {
            Some(e) => numeric_match(*f, e, tolerance.currency_abs),
            None => (false, 0.0),
        },
        (FieldType::Percentage, ParsedValue::Percentage(f)) => match expected_f64(expected) {
            Some(e) => numeric_match(*f, e, tolerance.percentage_abs),
            None => (false, 0.0),
        },
        (FieldType::Reference, ParsedValue::Reference(f)) => match expected_str(expected) {
            Some(e) => {
                let matches = f.trim() == e.trim();
                (matches, if matches { 1.0 } else { 0.0 })
            }
            None => (false, 0.0),
        },
        (FieldType::Account, ParsedValue::Account(f)) => match expected_str(expected) {
            Some(e) => {
                let dist = edit_distance(f, &e);
                let allowed = match source {
                    BoxSource::Digital => tolerance.account_edit_distance_digital,
                    BoxSource::Ocr | BoxSource::EnhancedOcr => tolerance.account_edit_distance_ocr,
                };
                let len = e.chars().count().max(1) as f64;
                let confidence = (1.0 - dist as f64 / len).clamp(0.0, 1.0);
                (dist <= allowed, confidence)
            }
            None => (false, 0.0),
        },
        (FieldType::Text, ParsedValue::Text(f)) => match expected_str(expected) {
            Some(e) => {
                let matches = f.eq_ignore_ascii_case(e.trim());
                (matches, if matches { 1.0 } else { 0.0 })
            }
            None => (false, 0.0),
        },
        _ => (false, 0.0),
    }
}

/// Whether a parsed value is substantial enough to be a plausible field
/// value rather than noise (spec.md §4.5 edge case b).
pub fn is_reasonable_value(field_type: FieldType, parsed: &ParsedValue, expected: &Value) -> bool {
    match (field_type, parsed) {
        (FieldType::Currency, ParsedValue::Currency(v)) => *v >= 100.0 || expected_f64(expected).is_some_and(|e| e < 100.0),
        (FieldType::Percentage, ParsedValue::Percentage(v)) => (0.0..=200.0).contains(v),
        (FieldType::Reference, ParsedValue::Reference(_)) | (FieldType::Account, ParsedValue::Account(_)) => true,
        (FieldType::Text, ParsedValue::Text(s)) => !(s.chars().all(|c| c.is_ascii_digit()) && s.chars().count() <= 2),
        _ => false,
    }
}

pub fn format_currency(v: f64) -> String {
    format!("R{v:.2}")
}

pub fn format_percentage(v: f64) -> String {
    format!("{v:.2}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tol() -> ToleranceConfig {
        ToleranceConfig::default()
    }

    #[test]
    fn currency_space_thousands_comma_decimal() {
        assert_eq!(parse_currency("R90 640,57"), Some(90640.57));
    }

    #[test]
    fn currency_comma_thousands_period_decimal() {
        assert_eq!(parse_currency("R90,640.57"), Some(90640.57));
    }

    #[test]
    fn currency_comma_as_decimal_two_digit_suffix() {
        assert_eq!(parse_currency("R321,46"), Some(321.46));
    }

    #[test]
    fn currency_ocr_digit_confusion() {
        assert_eq!(parse_currency("R9O640.57"), Some(90640.57));
    }

    #[test]
    fn percentage_with_comma_decimal() {
        assert_eq!(parse_percentage("29,25%"), Some(29.25));
    }

    #[test]
    fn currency_boundary_at_tolerance_is_valid() {
        let (valid, _) = numeric_match(90640.57 + 0.05, 90640.57, tol().currency_abs);
        assert!(valid);
        let (valid, _) = numeric_match(90640.57 + 0.0501, 90640.57, tol().currency_abs);
        assert!(!valid);
    }

    #[test]
    fn percentage_whole_number_matches_decimal_expected() {
        let found = ParsedValue::Percentage(29.0);
        let (valid, conf) = validate(FieldType::Percentage, &found, &json!(29.00), BoxSource::Digital, &tol());
        assert!(valid);
        assert_eq!(conf, 1.0);
    }

    #[test]
    fn account_one_digit_off_valid_under_ocr_invalid_under_digital() {
        let found = ParsedValue::Account("1148337963".to_string());
        let expected = json!("1148337962");
        let (valid_ocr, _) = validate(FieldType::Account, &found, &expected, BoxSource::Ocr, &tol());
        assert!(valid_ocr);
        let (valid_digital, _) = validate(FieldType::Account, &found, &expected, BoxSource::Digital, &tol());
        assert!(!valid_digital);
    }

    #[test]
    fn reference_requires_exact_match() {
        let found = ParsedValue::Reference("10016998899".to_string());
        let (valid, conf) = validate(FieldType::Reference, &found, &json!("10016998899"), BoxSource::Digital, &tol());
        assert!(valid);
        assert_eq!(conf, 1.0);
    }

    #[test]
    fn tiny_currency_rejected_unless_expected_is_tiny() {
        let parsed = ParsedValue::Currency(45.0);
        assert!(!is_reasonable_value(FieldType::Currency, &parsed, &json!(90640.57)));
        assert!(is_reasonable_value(FieldType::Currency, &parsed, &json!(45.0)));
    }

    #[test]
    fn format_then_parse_round_trips() {
        let v = 90640.57;
        let formatted = format_currency(v);
        let parsed = parse(FieldType::Currency, &formatted).unwrap();
        let (valid, _) = validate(FieldType::Currency, &parsed, &json!(v), BoxSource::Digital, &tol());
        assert!(valid);
    }
}
