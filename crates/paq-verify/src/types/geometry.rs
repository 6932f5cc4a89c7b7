//! Canonical spatial text box and the page it belongs to.
//!
//! Every box produced by acquisition, OCR, or merging is normalized into
//! this shape before the Field Locator or Signature Zone Engine ever see
//! it (spec.md §3, §4.4).

use serde::{Deserialize, Serialize};

/// Where a [`TextBox`] came from. `confidence == 1.0` iff `source ==
/// Digital` (spec.md §3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxSource {
    Digital,
    Ocr,
    EnhancedOcr,
}

/// Coarse text-quality bucket assigned during normalization, used to
/// decide whether a page needs an enhancement pass (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Good,
    Fair,
    Poor,
    MixedChars,
}

/// A normalized, merged text box in page coordinates.
///
/// Invariant (checked by [`TextBox::new`]): `0 <= x <= x + w <= page_w`
/// and likewise for `y`/`h`/`page_h`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub page: usize,
    pub page_w: f64,
    pub page_h: f64,
    pub source: BoxSource,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
}

impl TextBox {
    /// Construct a box, clamping it into its page bounds so the spec.md §3
    /// invariant holds even when an upstream engine returns a slightly
    /// out-of-range bbox (common with OCR near page edges).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        text: impl Into<String>,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        page: usize,
        page_w: f64,
        page_h: f64,
        source: BoxSource,
        confidence: f64,
    ) -> Self {
        let x = x.max(0.0).min(page_w);
        let y = y.max(0.0).min(page_h);
        let w = w.max(0.0).min(page_w - x);
        let h = h.max(0.0).min(page_h - y);
        let confidence = if matches!(source, BoxSource::Digital) { 1.0 } else { confidence.clamp(0.0, 1.0) };
        Self {
            text: text.into(),
            x,
            y,
            w,
            h,
            page,
            page_w,
            page_h,
            source,
            confidence,
            quality: None,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.h / 2.0
    }

    /// Edge-to-edge distance used to break ties in the Field Locator's
    /// value ranking (spec.md §4.5 step B.4d).
    pub fn edge_distance(&self, other: &TextBox) -> f64 {
        let dx = if self.right() < other.x {
            other.x - self.right()
        } else if other.right() < self.x {
            self.x - other.right()
        } else {
            0.0
        };
        let dy = if self.bottom() < other.y {
            other.y - self.bottom()
        } else if other.bottom() < self.y {
            self.y - other.bottom()
        } else {
            0.0
        };
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_valid(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= self.page_w + 1e-6
            && self.bottom() <= self.page_h + 1e-6
            && (self.confidence == 1.0) == matches!(self.source, BoxSource::Digital)
    }
}

/// All text boxes on a single page, plus whether the page was extracted
/// digitally or rasterized and OCR'd (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub page_index: usize,
    pub page_w: f64,
    pub page_h: f64,
    pub boxes: Vec<TextBox>,
    pub is_digital: bool,
    /// Set when per-page rasterization or OCR failed but the document as a
    /// whole could still be processed (spec.md §7 `AcquisitionWarning`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_warning: Option<String>,
}

impl PageContent {
    pub fn new(page_index: usize, page_w: f64, page_h: f64, is_digital: bool) -> Self {
        Self {
            page_index,
            page_w,
            page_h,
            boxes: Vec::new(),
            is_digital,
            acquisition_warning: None,
        }
    }

    /// Median of consecutive-y gaps between boxes sorted by vertical
    /// position, falling back to 20.0 when there are too few boxes to
    /// estimate line spacing (spec.md §4.5 step B.1).
    pub fn line_spacing(&self) -> f64 {
        if self.boxes.len() < 2 {
            return 20.0;
        }
        let mut ys: Vec<f64> = self.boxes.iter().map(|b| b.y).collect();
        ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut gaps: Vec<f64> = ys.windows(2).map(|w| (w[1] - w[0]).abs()).filter(|g| *g > 0.5).collect();
        if gaps.is_empty() {
            return 20.0;
        }
        gaps.sort_by(|a, b| a.partial_cmp(b).unwrap());
        gaps[gaps.len() / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_box_respects_page_bounds() {
        let b = TextBox::new("x", -5.0, -5.0, 1000.0, 1000.0, 0, 100.0, 200.0, BoxSource::Digital, 1.0);
        assert!(b.is_valid());
        assert!(b.x >= 0.0 && b.right() <= 100.0 + 1e-6);
        assert!(b.y >= 0.0 && b.bottom() <= 200.0 + 1e-6);
    }

    #[test]
    fn digital_confidence_is_always_one() {
        let b = TextBox::new("x", 0.0, 0.0, 10.0, 10.0, 0, 100.0, 100.0, BoxSource::Digital, 0.3);
        assert_eq!(b.confidence, 1.0);
    }

    #[test]
    fn line_spacing_falls_back_to_twenty() {
        let page = PageContent::new(0, 100.0, 100.0, true);
        assert_eq!(page.line_spacing(), 20.0);
    }

    #[test]
    fn edge_distance_is_zero_for_overlapping_boxes() {
        let a = TextBox::new("a", 0.0, 0.0, 50.0, 10.0, 0, 200.0, 200.0, BoxSource::Digital, 1.0);
        let b = TextBox::new("b", 40.0, 5.0, 50.0, 10.0, 0, 200.0, 200.0, BoxSource::Digital, 1.0);
        assert_eq!(a.edge_distance(&b), 0.0);
    }
}
