//! The Field Locator (spec.md §4.5) — the core algorithm. Given a
//! [`FieldSpec`] and the normalized boxes of a document, returns the
//! best-matching [`FieldResult`].
//!
//! "Direct-value match first" is the governing rule (spec.md §9): a label
//! only qualifies *candidates*; the case-model's expected value decides
//! which candidate, if any, is the answer. This is a pure function of its
//! inputs (spec.md §8 property 5) — no hidden `HashMap` iteration order.

use crate::config::ToleranceConfig;
use crate::fuzzy::{acceptance_threshold, label_similarity};
use crate::types::{CaseModel, FieldResult, FieldSpec, Method, PageContent, TextBox};
use crate::validate::{self, ParsedValue};

struct LabelCandidate<'a> {
    label_box: &'a TextBox,
    page: &'a PageContent,
    score: f64,
}

struct ValueCandidate<'a> {
    label_box: &'a TextBox,
    value_box: &'a TextBox,
    parsed: ParsedValue,
    valid: bool,
    confidence: f64,
    same_line: bool,
    right_of: bool,
}

/// Locates and validates one field across every page of a document
/// (spec.md §4.5).
pub fn locate_field(spec: &FieldSpec, pages: &[PageContent], case_model: &CaseModel, tolerance: &ToleranceConfig) -> FieldResult {
    let Some(expected) = case_model.get(&spec.name).cloned() else {
        return FieldResult::not_found(&spec.name, None);
    };

    // Edge case (a): caseId appears verbatim anywhere in the document.
    if spec.name == "caseId" {
        if let Some(expected_str) = expected.as_str() {
            for page in pages {
                for b in &page.boxes {
                    if b.text.trim() == expected_str.trim() {
                        return direct_match(spec, &expected, b, b);
                    }
                }
            }
        }
    }

    let label_candidates = find_label_candidates(spec, pages);
    if label_candidates.is_empty() {
        return zone_fallback(spec, pages, &expected, tolerance).unwrap_or_else(|| FieldResult::not_found(&spec.name, Some(expected)));
    }

    let mut candidates = Vec::new();
    for lc in &label_candidates {
        candidates.extend(value_candidates_for_label(spec, lc, &expected, tolerance));
    }

    let is_multi_table = label_candidates.len() > 1;
    let is_staff_field = case_model.is_staff() && matches!(spec.name.as_str(), "instalment" | "insurancePremium");

    if let Some(best) = rank_candidates(candidates.iter().filter(|c| c.valid).collect()) {
        let method = if is_multi_table { Method::MultiTableExact } else { Method::SingleTable };
        return build_result(spec, &expected, best, method);
    }

    if is_staff_field {
        let plausible: Vec<&ValueCandidate> = candidates
            .iter()
            .filter(|c| validate::is_reasonable_value(spec.field_type, &c.parsed, &expected))
            .filter(|c| !matches!((spec.field_type, &c.parsed), (crate::types::FieldType::Currency, ParsedValue::Percentage(_))))
            .collect();
        if let Some(best) = rank_candidates(plausible) {
            let mut result = build_result(spec, &expected, best, Method::MultiTableStaff);
            result.valid = true;
            result.confidence = 0.85;
            return result;
        }
    }

    zone_fallback(spec, pages, &expected, tolerance).unwrap_or_else(|| FieldResult::not_found(&spec.name, Some(expected)))
}

fn direct_match(spec: &FieldSpec, expected: &serde_json::Value, label_box: &TextBox, value_box: &TextBox) -> FieldResult {
    FieldResult {
        name: spec.name.clone(),
        expected: Some(expected.clone()),
        found: Some(expected.clone()),
        valid: true,
        confidence: 1.0,
        method: Some(Method::DirectMatch),
        label_box: Some(label_box.clone()),
        value_box: Some(value_box.clone()),
    }
}

/// Step A — label candidates (spec.md §4.5).
fn find_label_candidates<'a>(spec: &FieldSpec, pages: &'a [PageContent]) -> Vec<LabelCandidate<'a>> {
    let mut out = Vec::new();
    for page in pages {
        let threshold = acceptance_threshold(page.is_digital);
        for b in &page.boxes {
            let score = spec.labels.iter().map(|label| label_similarity(&b.text, label)).fold(0.0_f64, f64::max);
            if score >= threshold {
                out.push(LabelCandidate { label_box: b, page, score });
            }
        }
    }
    out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    out
}

/// Step B — focused window + direct-value-match-first (spec.md §4.5).
fn value_candidates_for_label<'a>(
    spec: &FieldSpec,
    lc: &LabelCandidate<'a>,
    expected: &serde_json::Value,
    tolerance: &ToleranceConfig,
) -> Vec<ValueCandidate<'a>> {
    let line_spacing = lc.page.line_spacing();
    let label = lc.label_box;
    let v_min = label.y - 8.0 * line_spacing;
    let v_max = label.bottom() + 8.0 * line_spacing;
    let h_min = label.x - 50.0;
    let h_max = label.right() + 400.0;

    lc.page
        .boxes
        .iter()
        .filter(|b| b.y >= v_min && b.bottom() <= v_max && b.x >= h_min && b.x <= h_max)
        .filter_map(|b| {
            let parsed = validate::parse(spec.field_type, &b.text)?;
            if !validate::is_reasonable_value(spec.field_type, &parsed, expected) {
                return None;
            }
            let (valid, confidence) = validate::validate(spec.field_type, &parsed, expected, b.source, tolerance);
            Some(ValueCandidate {
                label_box: label,
                value_box: b,
                same_line: same_line(label, b),
                right_of: b.x >= label.x,
                parsed,
                valid,
                confidence,
            })
        })
        .collect()
}

fn same_line(a: &TextBox, b: &TextBox) -> bool {
    let threshold = a.h.max(b.h).max(5.0);
    (a.center_y() - b.center_y()).abs() <= threshold
}

/// Step B.4 ranking: same-line > right-of > higher confidence > closer
/// edge distance (spec.md §4.5).
fn rank_candidates<'a>(mut candidates: Vec<&'a ValueCandidate<'a>>) -> Option<&'a ValueCandidate<'a>> {
    candidates.sort_by(|a, b| {
        b.same_line
            .cmp(&a.same_line)
            .then(b.right_of.cmp(&a.right_of))
            .then(b.confidence.partial_cmp(&a.confidence).unwrap())
            .then(a.value_box.edge_distance(a.label_box).partial_cmp(&b.value_box.edge_distance(b.label_box)).unwrap())
    });
    candidates.into_iter().next()
}

fn build_result(spec: &FieldSpec, expected: &serde_json::Value, candidate: &ValueCandidate, method: Method) -> FieldResult {
    FieldResult {
        name: spec.name.clone(),
        expected: Some(expected.clone()),
        found: Some(candidate.parsed.as_json()),
        valid: candidate.valid,
        confidence: candidate.confidence,
        method: Some(method),
        label_box: Some(candidate.label_box.clone()),
        value_box: Some(candidate.value_box.clone()),
    }
}

/// Step C — zone fallback for a known financial field when Step B finds
/// nothing (spec.md §4.5). No per-document template is available to this
/// crate, so the "zone" is the whole page; adjacent currency fragments
/// within 30px on the same line are combined before re-testing tolerance.
fn zone_fallback(spec: &FieldSpec, pages: &[PageContent], expected: &serde_json::Value, tolerance: &ToleranceConfig) -> Option<FieldResult> {
    for page in pages {
        let mut boxes: Vec<&TextBox> = page.boxes.iter().collect();
        boxes.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap().then(a.x.partial_cmp(&b.x).unwrap()));

        let mut i = 0;
        while i < boxes.len() {
            let mut combined_text = boxes[i].text.clone();
            let mut last = boxes[i];
            let mut j = i + 1;
            while j < boxes.len() {
                let next = boxes[j];
                if same_line(last, next) && (next.x - last.right()).abs() <= 30.0 {
                    combined_text.push(' ');
                    combined_text.push_str(&next.text);
                    last = next;
                    j += 1;
                } else {
                    break;
                }
            }

            if let Some(parsed) = validate::parse(spec.field_type, &combined_text) {
                if validate::is_reasonable_value(spec.field_type, &parsed, expected) {
                    let (valid, confidence) = validate::validate(spec.field_type, &parsed, expected, boxes[i].source, tolerance);
                    if valid {
                        return Some(FieldResult {
                            name: spec.name.clone(),
                            expected: Some(expected.clone()),
                            found: Some(parsed.as_json()),
                            valid: true,
                            confidence,
                            method: Some(Method::ZoneFallback),
                            label_box: None,
                            value_box: Some(boxes[i].clone()),
                        });
                    }
                }
            }
            i += 1;
        }
    }
    None
}
