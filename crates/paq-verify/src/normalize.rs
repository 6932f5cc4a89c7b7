//! Box Normalizer & Merger (spec.md §4.4): converts engine-native bboxes
//! into canonical [`TextBox`]es and greedily merges collinear fragments.

use crate::types::{BoxSource, PageContent, Quality, TextBox};

/// An engine-native box before normalization: left/top/right/bottom in
/// page-coordinate space, as returned by the digital text extractor or the
/// OCR adapter.
#[derive(Debug, Clone)]
pub struct RawBox {
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub source: BoxSource,
    pub confidence: f64,
}

/// Converts one raw engine box into a canonical [`TextBox`], trimming text
/// and scoring quality (spec.md §4.4).
pub fn normalize_box(raw: &RawBox, page: usize, page_w: f64, page_h: f64) -> TextBox {
    let text = raw.text.trim().to_string();
    let mut tb = TextBox::new(text, raw.left, raw.top, raw.right - raw.left, raw.bottom - raw.top, page, page_w, page_h, raw.source, raw.confidence);
    tb.quality = Some(score_quality(&tb));
    tb
}

fn score_quality(b: &TextBox) -> Quality {
    if matches!(b.source, BoxSource::Digital) {
        return Quality::Good;
    }
    let has_mixed = b.text.chars().any(|c| c.is_ascii_alphabetic()) && b.text.chars().any(|c| c.is_ascii_digit());
    if has_mixed && b.confidence < 0.85 {
        Quality::MixedChars
    } else if b.confidence >= 0.85 {
        Quality::Good
    } else if b.confidence >= 0.6 {
        Quality::Fair
    } else {
        Quality::Poor
    }
}

fn same_line_threshold(h: f64) -> f64 {
    (0.5 * h).max(5.0)
}

fn gap_threshold(h: f64) -> f64 {
    (2.0 * h).max(20.0)
}

fn mergeable(a: &TextBox, b: &TextBox) -> bool {
    if matches!(a.source, BoxSource::Ocr | BoxSource::EnhancedOcr) && a.text.contains(' ') {
        return false;
    }
    if matches!(b.source, BoxSource::Ocr | BoxSource::EnhancedOcr) && b.text.contains(' ') {
        return false;
    }
    let same_line = (a.center_y() - b.center_y()).abs() <= same_line_threshold(a.h.max(b.h));
    let gap = (b.x - a.right()).max(0.0);
    same_line && gap <= gap_threshold(a.h.max(b.h))
}

fn merge_two(a: &TextBox, b: &TextBox) -> TextBox {
    let x = a.x.min(b.x);
    let y = a.y.min(b.y);
    let right = a.right().max(b.right());
    let bottom = a.bottom().max(b.bottom());
    let text = format!("{} {}", a.text, b.text);
    let confidence = if matches!(a.source, BoxSource::Digital) && matches!(b.source, BoxSource::Digital) {
        1.0
    } else {
        (a.confidence + b.confidence) / 2.0
    };
    let source = if matches!(a.source, BoxSource::EnhancedOcr) || matches!(b.source, BoxSource::EnhancedOcr) {
        BoxSource::EnhancedOcr
    } else if matches!(a.source, BoxSource::Ocr) || matches!(b.source, BoxSource::Ocr) {
        BoxSource::Ocr
    } else {
        BoxSource::Digital
    };
    let mut merged = TextBox::new(text, x, y, right - x, bottom - y, a.page, a.page_w, a.page_h, source, confidence);
    merged.quality = Some(score_quality(&merged));
    merged
}

/// Greedy left-to-right merge of collinear, adjacent boxes (spec.md §4.4).
/// Never crosses a vertical gap larger than `1.5 * line_spacing`, and never
/// merges an OCR box whose text already contains a space.
fn merge_pass(mut boxes: Vec<TextBox>, line_spacing: f64) -> Vec<TextBox> {
    boxes.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap().then(a.x.partial_cmp(&b.x).unwrap()));
    let max_vertical_gap = line_spacing * 1.5;

    let mut merged: Vec<TextBox> = Vec::with_capacity(boxes.len());
    for current in boxes {
        match merged.last() {
            Some(last) if mergeable(last, &current) && (current.y - last.y).abs() <= max_vertical_gap => {
                let combined = merge_two(last, &current);
                *merged.last_mut().unwrap() = combined;
            }
            _ => merged.push(current),
        }
    }
    merged
}

/// Whether a page's boxes look like per-character digital fragments (mean
/// box width below a glyph-width bound), the trigger for the opt-in
/// second merge pass (spec.md §4.4, §9).
fn looks_per_character(boxes: &[TextBox]) -> bool {
    if boxes.is_empty() {
        return false;
    }
    let mean_width = boxes.iter().map(|b| b.w).sum::<f64>() / boxes.len() as f64;
    let mean_height = boxes.iter().map(|b| b.h).sum::<f64>() / boxes.len() as f64;
    mean_height > 0.0 && mean_width < mean_height * 0.9
}

/// Normalizes and merges every box on a page in place (spec.md §4.4).
pub fn normalize_and_merge(page: &mut PageContent) {
    let line_spacing = page.line_spacing();
    let boxes = std::mem::take(&mut page.boxes);
    let merged = merge_pass(boxes, line_spacing);

    page.boxes = if page.is_digital && looks_per_character(&merged) {
        merge_pass(merged, line_spacing)
    } else {
        merged
    };
}
