//! OCR Adapter (spec.md §4.3): loads a raster into the OCR engine and
//! returns word-level boxes with confidence.
//!
//! One [`tesseract::Tesseract`] instance is owned per worker thread (it is
//! not `Send`); the adapter never shares an engine across concurrent pages
//! (spec.md §5, §9).

use crate::normalize::RawBox;
use crate::types::BoxSource;

/// Page-segmentation mode passed to the engine per call (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegMode {
    UniformBlock,
    SparseText,
    SingleLine,
}

/// Per-call OCR knobs (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub seg_mode: SegMode,
    /// Restricted character set; `None` means no whitelist restriction.
    pub whitelist: Option<String>,
    pub min_confidence: f64,
}

impl OcrRequest {
    /// Default request for a general financial-document region.
    pub fn financial() -> Self {
        Self { seg_mode: SegMode::UniformBlock, whitelist: Some("0123456789R$%(),.-/ ".to_string()), min_confidence: 0.0 }
    }

    /// Digits-only whitelist for reference/account regions (spec.md §4.3).
    pub fn digits_only() -> Self {
        Self { seg_mode: SegMode::SingleLine, whitelist: Some("0123456789".to_string()), min_confidence: 0.0 }
    }

    pub fn sparse() -> Self {
        Self { seg_mode: SegMode::SparseText, whitelist: None, min_confidence: 0.0 }
    }
}

#[cfg(feature = "ocr")]
mod tesseract_backend {
    use super::*;
    use crate::error::{Result, VerifyError};
    use tesseract::{PageSegMode, Tesseract};

    fn seg_mode_value(mode: SegMode) -> PageSegMode {
        match mode {
            SegMode::UniformBlock => PageSegMode::PsmSingleBlock,
            SegMode::SparseText => PageSegMode::PsmSparseText,
            SegMode::SingleLine => PageSegMode::PsmSingleLine,
        }
    }

    /// Runs OCR over one raster image, returning canonical raw boxes with
    /// per-word confidence (spec.md §4.3).
    ///
    /// Builds a fresh `Tesseract` instance per call so no recognition state
    /// from a previous image leaks across calls, per the non-goal in
    /// spec.md §4.3 ("must not reuse engine state across calls without
    /// explicitly resetting the image").
    pub fn run_ocr(image: &image::DynamicImage, request: &OcrRequest, tessdata_path: Option<&std::path::Path>) -> Result<Vec<RawBox>> {
        let mut png_bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut png_bytes), image::ImageFormat::Png)
            .map_err(|e| VerifyError::Other(format!("encoding page raster: {e}")))?;

        let lang_dir = tessdata_path.and_then(|p| p.to_str());
        let mut engine = Tesseract::new(lang_dir, Some("eng")).map_err(|e| VerifyError::Other(format!("initializing tesseract: {e}")))?;

        if let Some(whitelist) = &request.whitelist {
            engine = engine
                .set_variable("tessedit_char_whitelist", whitelist)
                .map_err(|e| VerifyError::Other(format!("setting whitelist: {e}")))?;
        }

        let engine = engine.set_image_from_mem(&png_bytes).map_err(|e| VerifyError::Other(format!("loading image into tesseract: {e}")))?;
        let mut engine = engine.set_page_seg_mode(seg_mode_value(request.seg_mode));

        let hocr = engine.get_hocr_text(0).map_err(|e| VerifyError::Other(format!("running OCR: {e}")))?;
        let boxes = parse_hocr_words(&hocr, request.min_confidence);
        Ok(boxes)
    }

    /// Extracts `(text, bbox, confidence)` triples from Tesseract's hOCR
    /// output by scanning `ocrx_word` spans for `bbox` and `x_wconf` in
    /// their `title` attribute; avoids pulling in a full XML parser for a
    /// handful of well-known attribute names.
    fn parse_hocr_words(hocr: &str, min_confidence: f64) -> Vec<RawBox> {
        let mut boxes = Vec::new();
        for span in hocr.split("<span").skip(1) {
            if !span.contains("ocrx_word") {
                continue;
            }
            let Some(attr_start) = span.find("title=") else { continue };
            let value_start = attr_start + 6;
            let Some(quote) = span[value_start..].chars().next() else { continue };
            if quote != '"' && quote != '\'' {
                continue;
            }
            let content_start = value_start + 1;
            let Some(rel_end) = span[content_start..].find(quote) else { continue };
            let title = &span[content_start..content_start + rel_end];
            let title_attr_end = content_start + rel_end + 1;

            let Some((left, top, right, bottom)) = parse_bbox(title) else { continue };
            let confidence = parse_confidence(title).unwrap_or(0.0) / 100.0;
            if confidence < min_confidence {
                continue;
            }

            let Some(gt) = span[title_attr_end..].find('>') else { continue };
            let rest = &span[title_attr_end + gt + 1..];
            let Some(close) = rest.find("</span>") else { continue };
            let text = strip_tags(&rest[..close]).trim().to_string();
            if text.is_empty() {
                continue;
            }

            boxes.push(RawBox {
                text,
                left: left as f64,
                top: top as f64,
                right: right as f64,
                bottom: bottom as f64,
                source: BoxSource::Ocr,
                confidence,
            });
        }
        boxes
    }

    fn parse_bbox(title: &str) -> Option<(i32, i32, i32, i32)> {
        let idx = title.find("bbox ")?;
        let nums = &title[idx + 5..];
        let end = nums.find(';').unwrap_or(nums.len());
        let mut parts = nums[..end].split_whitespace().filter_map(|n| n.parse::<i32>().ok());
        Some((parts.next()?, parts.next()?, parts.next()?, parts.next()?))
    }

    fn parse_confidence(title: &str) -> Option<f64> {
        let idx = title.find("x_wconf ")?;
        let nums = &title[idx + 8..];
        let end = nums.find(';').unwrap_or(nums.len());
        nums[..end].trim().parse::<f64>().ok()
    }

    fn strip_tags(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut in_tag = false;
        for c in s.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => out.push(c),
                _ => {}
            }
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parses_bbox_and_confidence_from_hocr_span() {
            let hocr = r#"<span class='ocrx_word' id='word_1_1' title='bbox 10 20 110 40; x_wconf 92'>Loan</span>"#;
            let boxes = parse_hocr_words(hocr, 0.0);
            assert_eq!(boxes.len(), 1);
            assert_eq!(boxes[0].text, "Loan");
            assert_eq!(boxes[0].left, 10.0);
            assert_eq!(boxes[0].bottom, 40.0);
            assert!((boxes[0].confidence - 0.92).abs() < 1e-9);
        }

        #[test]
        fn parses_double_quoted_title_attribute() {
            let hocr = r#"<span class="ocrx_word" id="word_1_1" title="bbox 10 20 110 40; x_wconf 92">Loan</span>"#;
            let boxes = parse_hocr_words(hocr, 0.0);
            assert_eq!(boxes.len(), 1);
            assert_eq!(boxes[0].text, "Loan");
            assert_eq!(boxes[0].left, 10.0);
            assert_eq!(boxes[0].bottom, 40.0);
        }

        #[test]
        fn below_min_confidence_is_dropped() {
            let hocr = r#"<span class='ocrx_word' title='bbox 0 0 10 10; x_wconf 20'>x</span>"#;
            let boxes = parse_hocr_words(hocr, 0.5);
            assert!(boxes.is_empty());
        }
    }
}

#[cfg(feature = "ocr")]
pub use tesseract_backend::run_ocr;
