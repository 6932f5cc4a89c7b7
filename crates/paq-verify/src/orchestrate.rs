//! Verification Orchestrator (spec.md §4.8): drives the pipeline end to
//! end — acquisition, preprocessing, OCR, normalization, the Field
//! Locator, the Signature Zone Engine, the enhancement feedback loop, and
//! final report assembly.
//!
//! Pages are processed concurrently up to a per-document fan-out
//! (spec.md §5) via `tokio::task::spawn_blocking` for CPU work, gated by a
//! `tokio::sync::Semaphore`. Results are collected by page index, not
//! completion order, so the final report is deterministic regardless of
//! scheduling (spec.md §5, §8 property 5).

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::config::VerifyConfig;
use crate::error::Result;
use crate::fields::field_catalogue;
use crate::locate::locate_field;
use crate::normalize::{self, RawBox};
use crate::signature;
use crate::types::{CaseModel, PageContent, VerificationReport, ZoneReport};

/// Processes one page to a normalized [`PageContent`] plus the rendered
/// raster kept for signature-zone extraction, choosing the digital or OCR
/// path (spec.md §4.8 path choice). Pure CPU work, intended to run inside
/// `spawn_blocking`.
#[cfg(feature = "ocr")]
fn process_page(index: usize, acquired: Result<crate::acquire::AcquiredPage>, config: &VerifyConfig) -> (PageContent, Option<image::DynamicImage>) {
    use crate::acquire::AcquiredPage;
    use crate::ocr::OcrRequest;
    use crate::preprocess;

    let acquired = match acquired {
        Ok(a) => a,
        Err(e) => {
            let mut page = PageContent::new(index, 0.0, 0.0, false);
            page.acquisition_warning = Some(e.to_string());
            return (page, None);
        }
    };

    match acquired {
        AcquiredPage::Digital { boxes, raster, page_w, page_h } => {
            let mut page = PageContent::new(index, page_w, page_h, true);
            page.boxes = boxes.iter().map(|raw| normalize::normalize_box(raw, index, page_w, page_h)).collect();
            normalize::normalize_and_merge(&mut page);
            (page, Some(raster))
        }
        AcquiredPage::Raster { image, page_w, page_h } => {
            let gray = image.to_luma8();
            let skew = preprocess::detect_skew_degrees(&gray);
            let deskewed = preprocess::deskew(&image, skew, &config.preprocess);
            let inverted = preprocess::conditional_invert(deskewed, &config.preprocess);

            let raw_boxes = crate::ocr::run_ocr(&inverted, &OcrRequest::financial(), config.ocr_model_path.as_deref()).unwrap_or_default();

            let mut page = PageContent::new(index, page_w, page_h, false);
            page.boxes = raw_boxes.iter().map(|raw| normalize::normalize_box(raw, index, page_w, page_h)).collect();
            normalize::normalize_and_merge(&mut page);
            (page, Some(inverted))
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn process_page(index: usize, acquired: Result<crate::acquire::AcquiredPage>, _config: &VerifyConfig) -> (PageContent, Option<()>) {
    use crate::acquire::AcquiredPage;
    match acquired {
        Ok(AcquiredPage::Digital { boxes, page_w, page_h, .. }) => {
            let mut page = PageContent::new(index, page_w, page_h, true);
            page.boxes = boxes.iter().map(|raw| normalize::normalize_box(raw, index, page_w, page_h)).collect();
            normalize::normalize_and_merge(&mut page);
            (page, None)
        }
        Ok(AcquiredPage::Raster { page_w, page_h, .. }) => (PageContent::new(index, page_w, page_h, false), None),
        Err(e) => {
            let mut page = PageContent::new(index, 0.0, 0.0, false);
            page.acquisition_warning = Some(e.to_string());
            (page, None)
        }
    }
}

/// Median box confidence on a page, used by the enhancement trigger
/// (spec.md §4.8).
fn median_confidence(page: &PageContent) -> f64 {
    if page.boxes.is_empty() {
        return 0.0;
    }
    let mut confidences: Vec<f64> = page.boxes.iter().map(|b| b.confidence).collect();
    confidences.sort_by(|a, b| a.partial_cmp(b).unwrap());
    confidences[confidences.len() / 2]
}

/// Merges freshly re-OCR'd boxes into a page's existing boxes, preferring
/// the higher-confidence box on positional overlap within 50x30px
/// (spec.md §4.8 enhancement feedback).
fn merge_enhanced_boxes(page: &mut PageContent, new_boxes: Vec<crate::types::TextBox>) {
    for nb in new_boxes {
        let overlap = page.boxes.iter().position(|eb| (eb.x - nb.x).abs() < 50.0 && (eb.y - nb.y).abs() < 30.0);
        match overlap {
            Some(i) if page.boxes[i].confidence < nb.confidence => page.boxes[i] = nb,
            Some(_) => {}
            None => page.boxes.push(nb),
        }
    }
}

/// Runs up to `config.enhancement.max_passes` enhancement passes over a
/// page whose median box confidence is below threshold: crop the
/// financial region (page bottom two-thirds, per spec.md §4.7-style
/// heuristic), rescale, binarize, and re-OCR with a digits whitelist
/// (spec.md §4.8 enhancement feedback).
#[cfg(feature = "ocr")]
fn enhance_page(page: &mut PageContent, raster: &image::DynamicImage, config: &VerifyConfig) {
    use crate::ocr::OcrRequest;
    use crate::preprocess;
    use image::GenericImageView;

    for _pass in 0..config.enhancement.max_passes {
        if median_confidence(page) >= config.enhancement.min_median_box_confidence {
            break;
        }
        let (w, h) = (raster.width(), raster.height());
        let crop_y = (h as f64 * 0.33) as u32;
        let cropped = raster.crop_imm(0, crop_y, w, h.saturating_sub(crop_y));
        let rescaled = cropped.resize(
            (cropped.width() as f64 * config.enhancement.rescale_factor) as u32,
            (cropped.height() as f64 * config.enhancement.rescale_factor) as u32,
            image::imageops::FilterType::Lanczos3,
        );
        let inverted = preprocess::conditional_invert(rescaled, &config.preprocess);

        let new_raw = crate::ocr::run_ocr(&inverted, &OcrRequest::digits_only(), config.ocr_model_path.as_deref()).unwrap_or_default();
        let scale_back = 1.0 / config.enhancement.rescale_factor;
        let new_boxes: Vec<_> = new_raw
            .iter()
            .map(|raw: &RawBox| {
                let shifted = RawBox {
                    text: raw.text.clone(),
                    left: raw.left * scale_back,
                    top: raw.top * scale_back + crop_y as f64,
                    right: raw.right * scale_back,
                    bottom: raw.bottom * scale_back + crop_y as f64,
                    source: crate::types::BoxSource::EnhancedOcr,
                    confidence: raw.confidence,
                };
                normalize::normalize_box(&shifted, page.page_index, page.page_w, page.page_h)
            })
            .collect();
        merge_enhanced_boxes(page, new_boxes);
    }
}

#[derive(Serialize)]
struct ManifestZone<'a> {
    name: &'a str,
    page: usize,
    bounds: crate::types::signature::ZoneBounds,
    #[serde(rename = "type")]
    zone_type: &'a str,
}

#[derive(Serialize)]
struct ManifestPage {
    index: usize,
    width: u32,
    height: u32,
    file: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    #[serde(rename = "caseId")]
    case_id: &'a str,
    scale: f64,
    pages: Vec<ManifestPage>,
    zones: Vec<ManifestZone<'a>>,
}

/// Derives and scores every signature zone across a document, writing
/// crops and a manifest under `config.extract_dir/<caseId>/` (spec.md
/// §4.7).
#[cfg(feature = "ocr")]
fn process_signature_zones(
    pages: &[PageContent],
    rasters: &[Option<image::DynamicImage>],
    case_id: &str,
    config: &VerifyConfig,
) -> Vec<ZoneReport> {
    use image::GenericImageView;

    let zones = signature::derive_zones(pages, &config.signature);
    if zones.is_empty() {
        return Vec::new();
    }

    let case_dir = config.extract_dir.join(case_id);
    let _ = std::fs::create_dir_all(&case_dir);

    let mut manifest_pages = Vec::new();
    for (raster, page) in rasters.iter().zip(pages.iter()) {
        if let Some(img) = raster {
            let file = format!("page{}_scale{}.png", page.page_index, config.render.scale as u32);
            let _ = img.save(case_dir.join(&file));
            manifest_pages.push(ManifestPage { index: page.page_index, width: img.width(), height: img.height(), file });
        }
    }

    let mut reports = Vec::with_capacity(zones.len());
    let mut manifest_zones = Vec::with_capacity(zones.len());
    for zone in &zones {
        let zone_area = zone.bounds.w * zone.bounds.h;
        let report = match rasters.get(zone.page).and_then(|r| r.as_ref()) {
            Some(raster) => {
                let crop = signature::crop_zone(raster, &zone.bounds);
                let contours = signature::contour_metrics(&crop);
                let mut report = signature::classify_mark(&contours, zone_area, &config.signature);
                report.zone = zone.name.clone();
                report
            }
            None => ZoneReport { zone: zone.name.clone(), marked: false, confidence: 0.0, features: Default::default() },
        };
        reports.push(report);
        manifest_zones.push(ManifestZone {
            name: zone.name.as_str(),
            page: zone.page,
            bounds: zone.bounds,
            zone_type: match zone.zone_type {
                crate::types::ZoneType::Initial => "initial",
                crate::types::ZoneType::Signature => "signature",
            },
        });
    }

    let manifest = Manifest { case_id, scale: config.render.scale, pages: manifest_pages, zones: manifest_zones };
    if let Ok(json) = serde_json::to_string_pretty(&manifest) {
        let _ = std::fs::write(case_dir.join("manifest.json"), json);
    }

    reports
}

#[cfg(not(feature = "ocr"))]
fn process_signature_zones(pages: &[PageContent], _rasters: &[Option<()>], _case_id: &str, config: &VerifyConfig) -> Vec<ZoneReport> {
    signature::derive_zones(pages, &config.signature)
        .into_iter()
        .map(|z| ZoneReport { zone: z.name, marked: false, confidence: 0.0, features: Default::default() })
        .collect()
}

/// Appends one timestamped line to `debug_output/processing.log` when
/// `config.debug` is set (spec.md §6); a no-op otherwise so the hot path
/// never pays for a disabled feature.
fn debug_log(config: &VerifyConfig, message: &str) {
    if !config.debug {
        return;
    }
    let _ = std::fs::create_dir_all(&config.debug_output_dir);
    let line = format!("{} {message}\n", chrono::Utc::now().to_rfc3339());
    use std::io::Write;
    if let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(config.debug_output_dir.join("processing.log")) {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Writes a per-page debug raster to `debug_output/images/page<N>.png`
/// (spec.md §6), when debug mode is on and a raster is available.
#[cfg(feature = "ocr")]
fn debug_write_page_image(config: &VerifyConfig, index: usize, raster: &image::DynamicImage) {
    if !config.debug {
        return;
    }
    let dir = config.debug_output_dir.join("images");
    let _ = std::fs::create_dir_all(&dir);
    let _ = raster.save(dir.join(format!("page{index}.png")));
}

/// The required field names and required zone names for one document,
/// used to assemble the final VALID/INVALID decision (spec.md §4.8).
fn required_names(case_model: &CaseModel, zones: &[ZoneReport]) -> (Vec<String>, Vec<String>) {
    let product = case_model.product().unwrap_or(crate::types::case_model::ProductType::PersonalLoan);
    let required_fields: Vec<String> = field_catalogue(product).into_iter().filter(|f| f.required).map(|f| f.name).collect();
    let required_zones: Vec<String> = zones.iter().map(|z| z.zone.clone()).collect();
    (required_fields, required_zones)
}

/// Runs the full verification pipeline for one document (spec.md §1, §4.8).
///
/// `cancel` is polled at every suspension point; on cancellation the
/// orchestrator returns a best-effort `ERROR` report rather than aborting
/// mid-write (spec.md §5 cancellation, §7 `Cancelled`).
pub async fn verify_document(pdf_path: &Path, case_model: &CaseModel, config: &VerifyConfig, cancel: Arc<AtomicBool>) -> Result<VerificationReport> {
    debug_log(config, &format!("verify_document start: {}", pdf_path.display()));

    #[cfg(feature = "pdf")]
    let acquired = crate::acquire::acquire_pages(pdf_path, &config.render)?;
    #[cfg(not(feature = "pdf"))]
    let acquired: Vec<Result<crate::acquire::AcquiredPage>> = {
        let _ = pdf_path;
        Vec::new()
    };

    if cancel.load(Ordering::SeqCst) {
        return Ok(VerificationReport::error("cancelled"));
    }

    let page_count = acquired.len();
    let fan_out = config.page_fan_out(page_count.max(1));
    let semaphore = Arc::new(tokio::sync::Semaphore::new(fan_out));
    let timeout = Duration::from_secs(config.page_timeout_secs);

    let mut handles = Vec::with_capacity(page_count);
    for (index, page_result) in acquired.into_iter().enumerate() {
        let sem = semaphore.clone();
        let cfg = config.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore closed");
            tokio::task::spawn_blocking(move || process_page(index, page_result, &cfg)).await
        }));
    }

    let mut pages = Vec::with_capacity(handles.len());
    let mut rasters = Vec::with_capacity(handles.len());
    let mut issues = Vec::new();
    for (index, handle) in handles.into_iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            return Ok(VerificationReport::error("cancelled"));
        }
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok((page, raster)))) => {
                debug_log(config, &format!("page {index}: is_digital={} boxes={}", page.is_digital, page.boxes.len()));
                #[cfg(feature = "ocr")]
                if let Some(raster) = &raster {
                    debug_write_page_image(config, index, raster);
                }
                pages.push(page);
                rasters.push(raster);
            }
            Ok(Ok(Err(join_err))) => {
                issues.push(format!("acquisition_failed:page{index}:{join_err}"));
                pages.push(PageContent::new(index, 0.0, 0.0, false));
                rasters.push(None);
            }
            Ok(Err(join_err)) => {
                issues.push(format!("acquisition_failed:page{index}:{join_err}"));
                pages.push(PageContent::new(index, 0.0, 0.0, false));
                rasters.push(None);
            }
            Err(_elapsed) => {
                issues.push(format!("timeout:page{index}"));
                pages.push(PageContent::new(index, 0.0, 0.0, false));
                rasters.push(None);
            }
        }
    }

    for page in &pages {
        if let Some(warning) = &page.acquisition_warning {
            issues.push(format!("acquisition_failed:page{}:{warning}", page.page_index));
        }
    }

    #[cfg(feature = "ocr")]
    for (page, raster) in pages.iter_mut().zip(rasters.iter()) {
        if let Some(raster) = raster {
            if median_confidence(page) < config.enhancement.min_median_box_confidence {
                enhance_page(page, raster, config);
            }
        }
    }

    let product = case_model.product().unwrap_or(crate::types::case_model::ProductType::PersonalLoan);
    let specs = field_catalogue(product);

    let mut fields = std::collections::BTreeMap::new();
    for spec in &specs {
        let result = locate_field(spec, &pages, case_model, &config.tolerance);
        fields.insert(spec.name.clone(), result);
    }

    let case_id = case_model.case_id().unwrap_or_else(|| "unknown".to_string());
    let zones = process_signature_zones(&pages, &rasters, &case_id, config);

    let (required_fields, required_zones) = required_names(case_model, &zones);
    let report = VerificationReport::assemble(fields, &required_fields, zones, &required_zones, issues);
    debug_log(config, &format!("verify_document done: case={case_id} status={:?} confidence={:.3}", report.status, report.overall_confidence));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoxSource, TextBox};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn cancelled_before_start_yields_error_report() {
        let case_model = CaseModel::new(HashMap::new());
        let cancel = Arc::new(AtomicBool::new(true));
        let report = verify_document(Path::new("/nonexistent.pdf"), &case_model, &VerifyConfig::default(), cancel).await.unwrap();
        assert_eq!(report.status, crate::types::VerificationStatus::Error);
        assert_eq!(report.issues, vec!["cancelled".to_string()]);
    }

    #[test]
    fn median_confidence_of_empty_page_is_zero() {
        let page = PageContent::new(0, 100.0, 100.0, true);
        assert_eq!(median_confidence(&page), 0.0);
    }

    #[test]
    fn merge_prefers_higher_confidence_on_overlap() {
        let mut page = PageContent::new(0, 1000.0, 1000.0, false);
        page.boxes = vec![TextBox::new("R9O640", 10.0, 10.0, 60.0, 12.0, 0, 1000.0, 1000.0, BoxSource::Ocr, 0.4)];
        let better = vec![TextBox::new("R90640", 12.0, 11.0, 60.0, 12.0, 0, 1000.0, 1000.0, BoxSource::EnhancedOcr, 0.9)];
        merge_enhanced_boxes(&mut page, better);
        assert_eq!(page.boxes.len(), 1);
        assert_eq!(page.boxes[0].text, "R90640");
    }

    #[test]
    fn required_names_reflects_product_catalogue() {
        let mut fields = HashMap::new();
        fields.insert("product".to_string(), json!("pl"));
        let case_model = CaseModel::new(fields);
        let zones = vec![ZoneReport { zone: "clientSignature_page0".into(), marked: true, confidence: 1.0, features: Default::default() }];
        let (req_fields, req_zones) = required_names(&case_model, &zones);
        assert!(req_fields.contains(&"initiationFee".to_string()));
        assert_eq!(req_zones, vec!["clientSignature_page0".to_string()]);
    }

    #[test]
    fn debug_log_writes_processing_log_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = VerifyConfig::default();
        config.debug_output_dir = dir.path().join("debug_output");

        debug_log(&config, "should not appear");
        assert!(!config.debug_output_dir.join("processing.log").exists());

        config.debug = true;
        debug_log(&config, "hello");
        let contents = std::fs::read_to_string(config.debug_output_dir.join("processing.log")).unwrap();
        assert!(contents.contains("hello"));
    }
}
