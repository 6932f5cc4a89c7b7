//! Benchmarks the Field Locator's hot path: fuzzy label scoring plus the
//! focused-window value search, over a page-sized box collection
//! (spec.md §4.5, SPEC_FULL.md §2 test tooling).

use std::collections::HashMap;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

use paq_verify::fuzzy::label_similarity;
use paq_verify::locate::locate_field;
use paq_verify::types::{BoxSource, CaseModel, FieldSpec, FieldType, PageContent, SearchStrategy, TextBox};

/// A page shaped like a busy PAQ table: one label/value pair per row,
/// plus a second staff-rate table to exercise the multi-table path.
fn sample_page() -> PageContent {
    let mut page = PageContent::new(0, 2481.0, 3508.0, true);
    let rows = [
        ("Case reference no", "10016998899"),
        ("Loan amount", "R90 640,57"),
        ("Instalment", "R3 393,49"),
        ("Interest rate (staff)", "29,25%"),
        ("Interest rate (standard)", "31,50%"),
        ("Insurance premium", "R321,46"),
        ("Collection account no", "1148337962"),
        ("Initiation fee", "R1 207,50"),
        ("Service fee", "R69,00"),
        ("Disbursement account no", "1148337962"),
    ];
    for (i, (label, value)) in rows.iter().enumerate() {
        let y = 100.0 + i as f64 * 60.0;
        page.boxes.push(TextBox::new(*label, 20.0, y, 200.0, 16.0, 0, page.page_w, page.page_h, BoxSource::Digital, 1.0));
        page.boxes.push(TextBox::new(*value, 240.0, y, 120.0, 16.0, 0, page.page_w, page.page_h, BoxSource::Digital, 1.0));
    }
    page
}

fn sample_case_model() -> CaseModel {
    let mut fields = HashMap::new();
    fields.insert("caseId".to_string(), json!("10016998899"));
    fields.insert("loanAmount".to_string(), json!(90640.57));
    fields.insert("instalment".to_string(), json!(3393.49));
    fields.insert("interestRate".to_string(), json!(29.25));
    fields.insert("insurancePremium".to_string(), json!(321.46));
    fields.insert("collectionAccountNo".to_string(), json!("1148337962"));
    fields.insert("clientIsStaff".to_string(), json!(true));
    CaseModel::new(fields)
}

fn bench_label_similarity(c: &mut Criterion) {
    c.bench_function("label_similarity/ocr_confused", |b| {
        b.iter(|| label_similarity("L0an am0unt", "Loan amount"));
    });
}

fn bench_locate_field(c: &mut Criterion) {
    let pages = vec![sample_page()];
    let case_model = sample_case_model();
    let spec = FieldSpec::new("interestRate", vec!["Interest rate"], FieldType::Percentage, true, SearchStrategy::Right);
    let tolerance = Default::default();

    c.bench_function("locate_field/staff_two_table", |b| {
        b.iter(|| locate_field(&spec, &pages, &case_model, &tolerance));
    });
}

criterion_group!(benches, bench_label_similarity, bench_locate_field);
criterion_main!(benches);
