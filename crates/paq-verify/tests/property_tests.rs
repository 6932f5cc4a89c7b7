//! Property-based tests for the invariants in spec.md §8.
//!
//! These exercise the pure, non-feature-gated core (geometry, normalize,
//! validate, locate, fuzzy) so they run in every CI configuration
//! regardless of whether the `pdf`/`ocr` features are enabled.

use std::collections::HashMap;

use proptest::prelude::*;
use serde_json::json;

use paq_verify::locate::locate_field;
use paq_verify::normalize::normalize_and_merge;
use paq_verify::types::{BoxSource, CaseModel, FieldSpec, FieldType, PageContent, SearchStrategy, TextBox};
use paq_verify::validate::{self, ParsedValue};

fn arb_box() -> impl Strategy<Value = (String, f64, f64, f64, f64)> {
    (
        "[A-Za-z0-9 ]{1,12}",
        0.0f64..900.0,
        0.0f64..1200.0,
        1.0f64..80.0,
        1.0f64..30.0,
    )
}

proptest! {
    /// Invariant 1 (spec.md §8): every TextBox stays within its page
    /// bounds no matter what out-of-range geometry an upstream engine
    /// hands it.
    #[test]
    fn box_stays_within_page_bounds((text, x, y, w, h) in arb_box()) {
        let tb = TextBox::new(text, x, y, w, h, 0, 1000.0, 1000.0, BoxSource::Digital, 1.0);
        prop_assert!(tb.x >= 0.0);
        prop_assert!(tb.y >= 0.0);
        prop_assert!(tb.right() <= tb.page_w + 1e-9);
        prop_assert!(tb.bottom() <= tb.page_h + 1e-9);
    }

    /// Invariant 2 (spec.md §8): merging a merged sequence yields the same
    /// sequence (merge is idempotent).
    #[test]
    fn merge_is_idempotent(boxes in prop::collection::vec(arb_box(), 0..20)) {
        let mut page_a = PageContent::new(0, 1000.0, 1200.0, true);
        page_a.boxes = boxes
            .iter()
            .map(|(text, x, y, w, h)| TextBox::new(text.clone(), *x, *y, *w, *h, 0, 1000.0, 1200.0, BoxSource::Digital, 1.0))
            .collect();
        normalize_and_merge(&mut page_a);
        let once = page_a.boxes.clone();

        let mut page_b = PageContent::new(0, 1000.0, 1200.0, true);
        page_b.boxes = once.clone();
        normalize_and_merge(&mut page_b);

        prop_assert_eq!(once.len(), page_b.boxes.len());
        for (a, b) in page_b.boxes.iter().zip(once.iter()) {
            prop_assert_eq!(&a.text, &b.text);
        }
    }

    /// Invariant 3 (spec.md §8): parsing is a pure function of its input —
    /// same raw text and type always produce the same parsed value.
    #[test]
    fn parsing_currency_is_pure(raw in "R?[0-9]{1,6}([,.][0-9]{2})?") {
        let a = validate::parse(FieldType::Currency, &raw);
        let b = validate::parse(FieldType::Currency, &raw);
        prop_assert_eq!(a, b);
    }

    /// Invariant 4 (spec.md §8): `validate(parse(format(v)), v)` holds for
    /// any representable currency value (round-trip law).
    #[test]
    fn currency_round_trips(v in 0.0f64..1_000_000.0) {
        let rounded = (v * 100.0).round() / 100.0;
        let formatted = validate::format_currency(rounded);
        let parsed = validate::parse(FieldType::Currency, &formatted).unwrap();
        let (valid, _) = validate::validate(FieldType::Currency, &parsed, &json!(rounded), BoxSource::Digital, &Default::default());
        prop_assert!(valid);
    }

    /// Invariant 4 for percentages.
    #[test]
    fn percentage_round_trips(v in 0.0f64..200.0) {
        let rounded = (v * 100.0).round() / 100.0;
        let formatted = validate::format_percentage(rounded);
        let parsed = validate::parse(FieldType::Percentage, &formatted).unwrap();
        let (valid, _) = validate::validate(FieldType::Percentage, &parsed, &json!(rounded), BoxSource::Digital, &Default::default());
        prop_assert!(valid);
    }

    /// Invariant 5 (spec.md §8): the Field Locator is deterministic — the
    /// same PageContent and FieldSpec always produce the same FieldResult,
    /// regardless of how many times it is invoked (no hidden dependence on
    /// hash-map iteration order).
    #[test]
    fn locator_is_deterministic(amount in 100.0f64..500_000.0) {
        let rounded = (amount * 100.0).round() / 100.0;
        let spec = FieldSpec::new("loanAmount", vec!["Loan amount"], FieldType::Currency, true, SearchStrategy::Right);
        let mut page = PageContent::new(0, 1000.0, 1000.0, true);
        page.boxes = vec![
            TextBox::new("Loan amount", 10.0, 100.0, 80.0, 12.0, 0, 1000.0, 1000.0, BoxSource::Digital, 1.0),
            TextBox::new(validate::format_currency(rounded), 120.0, 100.0, 80.0, 12.0, 0, 1000.0, 1000.0, BoxSource::Digital, 1.0),
        ];
        let pages = vec![page];

        let mut fields = HashMap::new();
        fields.insert("loanAmount".to_string(), json!(rounded));
        let case_model = CaseModel::new(fields);

        let first = locate_field(&spec, &pages, &case_model, &Default::default());
        let second = locate_field(&spec, &pages, &case_model, &Default::default());
        prop_assert_eq!(first.valid, second.valid);
        prop_assert_eq!(first.method, second.method);
        prop_assert_eq!(first.found, second.found);
    }
}

/// Invariant 3, non-currency: text parsing is the identity modulo
/// whitespace trimming, independent of how many times it runs.
#[test]
fn text_parsing_is_pure() {
    let a = validate::parse(FieldType::Text, "  Acme Bank  ");
    let b = validate::parse(FieldType::Text, "  Acme Bank  ");
    assert_eq!(a, b);
    assert_eq!(a, Some(ParsedValue::Text("Acme Bank".to_string())));
}
