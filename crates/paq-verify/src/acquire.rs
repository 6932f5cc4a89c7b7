//! Image Acquisition (spec.md §4.1): turns a PDF path into either digital
//! text boxes or per-page raster images, per page.
//!
//! The digital/scanned decision (`hasValidDigitalContent`) is made once per
//! page: a page with at least ten content items, one of which has four or
//! more non-whitespace characters and is not a watermark, is extracted
//! directly; otherwise the page is rasterized for the OCR path.

use crate::config::RenderConfig;
use crate::error::{Result, VerifyError};
use crate::normalize::RawBox;
use crate::types::BoxSource;

const MIN_CONTENT_ITEMS: usize = 10;
const MIN_TEXT_CHARS: usize = 4;

/// A decoded page, either as raw digital boxes ready for normalization or
/// as a raster image ready for the OCR path (spec.md §3 `PageContent`
/// split between `is_digital` branches).
pub enum AcquiredPage {
    /// Digitally extracted text plus a rendered raster of the same page,
    /// kept for the Signature Zone Engine's image extraction step (spec.md
    /// §4.7), which needs a crop regardless of which text path a page took.
    Digital { boxes: Vec<RawBox>, raster: image::DynamicImage, page_w: f64, page_h: f64 },
    Raster { image: image::DynamicImage, page_w: f64, page_h: f64 },
}

/// Whether `items`' text content qualifies a page for direct digital
/// extraction (spec.md §4.1 `hasValidDigitalContent`).
pub fn has_valid_digital_content(items: &[impl AsRef<str>]) -> bool {
    if items.len() < MIN_CONTENT_ITEMS {
        return false;
    }
    items.iter().any(|item| {
        let text = item.as_ref();
        let non_ws = text.chars().filter(|c| !c.is_whitespace()).count();
        non_ws >= MIN_TEXT_CHARS && !is_watermark(text)
    })
}

fn is_watermark(text: &str) -> bool {
    let upper = text.to_uppercase();
    upper.contains("WATERMARK") || upper.contains("DRAFT") || upper.contains("COPY")
}

/// Downscales a raw `(width, height)` raster so it fits the dimension and
/// byte-size bounds in `render`, preserving aspect ratio (spec.md §4.2
/// rescale bound).
pub fn clamp_to_bound(w: i32, h: i32, render: &RenderConfig) -> (i32, i32) {
    let max_dim = render.max_dimension_px as i32;
    let max_bytes = render.max_pixel_bytes;
    let bytes = (w as u64) * (h as u64) * 4;
    let dim_scale = if w.max(h) > max_dim { max_dim as f64 / w.max(h) as f64 } else { 1.0 };
    let byte_scale = if bytes > max_bytes { (max_bytes as f64 / bytes as f64).sqrt() } else { 1.0 };
    let scale = dim_scale.min(byte_scale);
    if scale < 1.0 {
        (((w as f64) * scale).max(1.0) as i32, ((h as f64) * scale).max(1.0) as i32)
    } else {
        (w, h)
    }
}

#[cfg(feature = "pdf")]
mod pdfium_backend {
    use super::*;
    use pdfium_render::prelude::*;

    /// Binds to a system-installed `pdfium` library when
    /// `PAQ_VERIFY_PDFIUM_LIB` points at one, otherwise falls back to the
    /// statically linked default (spec.md §6 configuration note).
    fn bindings() -> Result<Pdfium> {
        if let Ok(lib_path) = std::env::var("PAQ_VERIFY_PDFIUM_LIB") {
            let bindings = Pdfium::bind_to_library(&lib_path)
                .map_err(|e| VerifyError::Input { message: format!("binding pdfium library at {lib_path}: {e}") })?;
            Ok(Pdfium::new(bindings))
        } else {
            Ok(Pdfium::default())
        }
    }

    /// Acquires every page of a PDF, choosing the digital or rasterized
    /// path per page (spec.md §4.1). Per-page rasterization failures are
    /// returned inline so the orchestrator can continue with the rest of
    /// the document (spec.md §7 `AcquisitionWarning`).
    pub fn acquire_pages(pdf_path: &std::path::Path, render: &RenderConfig) -> Result<Vec<Result<AcquiredPage>>> {
        let pdfium = bindings()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| VerifyError::Input { message: format!("loading PDF {pdf_path:?}: {e}") })?;

        let pages = document.pages().iter().enumerate().map(|(index, page)| acquire_one_page(&page, index, render)).collect();
        Ok(pages)
    }

    /// Acquires one page. The page is always rasterized first so that
    /// `page_w`/`page_h` and every box coordinate this function returns
    /// live in the raster's pixel space (spec.md §6 manifest example: page
    /// width 2481 and zone bounds are raster-pixel numbers, not PDF
    /// points) — PDFium reports page dimensions in points, but the
    /// Signature Zone Engine crops the same raster that OCR boxes are
    /// already measured against, so digital boxes are scaled from points
    /// into that raster's pixel space before anything downstream ever
    /// sees them.
    fn acquire_one_page(page: &PdfPage, index: usize, render: &RenderConfig) -> Result<AcquiredPage> {
        let page_w_pts = page.width().value as f64;
        let page_h_pts = page.height().value as f64;

        let raster = rasterize(page, render).map_err(|e| VerifyError::AcquisitionWarning { page: index, message: e })?;
        let (page_w, page_h) = {
            use image::GenericImageView;
            let (w, h) = raster.dimensions();
            (w as f64, h as f64)
        };

        let items: Vec<String> = page
            .text()
            .ok()
            .map(|text| text.segments().iter().map(|seg| seg.text()).collect())
            .unwrap_or_default();

        if has_valid_digital_content(&items) {
            let scale_x = page_w / page_w_pts;
            let scale_y = page_h / page_h_pts;
            match extract_digital_boxes(page, page_h_pts, scale_x, scale_y) {
                Ok(boxes) => return Ok(AcquiredPage::Digital { boxes, raster, page_w, page_h }),
                Err(e) => {
                    tracing::warn!(page = index, error = %e, "digital extraction failed, falling back to rasterization");
                }
            }
        }

        Ok(AcquiredPage::Raster { image: raster, page_w, page_h })
    }

    /// Extracts per-character digital text boxes (spec.md §4.1, §4.4). Each
    /// PDFium character becomes one [`RawBox`]; the Box Normalizer merges
    /// adjacent ones back into words via its glyph-width second pass.
    /// PDFium's y-axis grows upward from the page bottom; boxes are flipped
    /// into the top-left-origin coordinate space used throughout spec.md §3,
    /// then scaled by `scale_x`/`scale_y` from PDF points into the raster's
    /// pixel space so digital and OCR boxes share one coordinate system.
    fn extract_digital_boxes(page: &PdfPage, page_h_pts: f64, scale_x: f64, scale_y: f64) -> Result<Vec<RawBox>> {
        let page_text = page.text().map_err(|e| VerifyError::Other(format!("reading page text: {e}")))?;
        let chars = page_text.chars();
        let mut boxes = Vec::with_capacity(chars.len());
        for i in 0..chars.len() {
            let Ok(pdf_char) = chars.get(i) else { continue };
            let Some(unicode) = pdf_char.unicode_char() else { continue };
            if unicode.is_whitespace() {
                continue;
            }
            let Ok(bounds) = pdf_char.loose_bounds() else { continue };
            let top_pts = page_h_pts - bounds.top().value as f64;
            let bottom_pts = page_h_pts - bounds.bottom().value as f64;
            boxes.push(RawBox {
                text: unicode.to_string(),
                left: bounds.left().value as f64 * scale_x,
                top: top_pts * scale_y,
                right: bounds.right().value as f64 * scale_x,
                bottom: bottom_pts * scale_y,
                source: BoxSource::Digital,
                confidence: 1.0,
            });
        }
        Ok(boxes)
    }

    /// Rasterizes a page at the configured scale, downscaling if the raw
    /// raster would exceed the dimension/byte bounds (spec.md §4.2 rescale
    /// bound).
    fn rasterize(page: &PdfPage, render: &RenderConfig) -> std::result::Result<image::DynamicImage, String> {
        let raw_width = ((page.width().value as f64) * render.scale) as i32;
        let raw_height = ((page.height().value as f64) * render.scale) as i32;
        let (target_width, target_height) = clamp_to_bound(raw_width, raw_height, render);

        let config = PdfRenderConfig::new().set_target_width(target_width).set_target_height(target_height);
        let bitmap = page.render_with_config(&config).map_err(|e| format!("rendering page: {e}"))?;
        Ok(bitmap.as_image())
    }
}

#[cfg(feature = "pdf")]
pub use pdfium_backend::acquire_pages;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_ten_items_is_not_digital() {
        let items = vec!["a", "b", "c"];
        assert!(!has_valid_digital_content(&items));
    }

    #[test]
    fn ten_items_with_substantial_text_is_digital() {
        let mut items: Vec<&str> = vec!["a"; 9];
        items.push("Loan amount");
        assert!(has_valid_digital_content(&items));
    }

    #[test]
    fn watermark_only_text_does_not_count() {
        let mut items: Vec<&str> = vec!["a"; 9];
        items.push("DRAFT COPY");
        assert!(!has_valid_digital_content(&items));
    }

    #[test]
    fn rescale_bound_preserves_aspect_ratio() {
        let render = RenderConfig { scale: 3.0, max_dimension_px: 1000, max_pixel_bytes: u64::MAX };
        let (w, h) = clamp_to_bound(2000, 1000, &render);
        assert!(w <= 1000);
        assert_eq!(w * 2, h * 4); // aspect ratio preserved (2000:1000 == 2:1)
    }

    #[test]
    fn dimensions_within_bound_are_unchanged() {
        let render = RenderConfig::default();
        let (w, h) = clamp_to_bound(500, 300, &render);
        assert_eq!((w, h), (500, 300));
    }
}
