//! Signature Zone Engine (spec.md §4.7): derives per-page initial/signature
//! rectangles from landmark text boxes, crops regions, and scores each for
//! the presence of a hand mark.
//!
//! Dynamic zones beat fixed rectangles because the last page of a contract
//! varies; landmarks travel with the layout (spec.md §9). A fixed zone is
//! used only when landmarks cannot be located.

use crate::config::SignatureConfig;
use crate::fuzzy::label_similarity;
use crate::types::{PageContent, SignatureZone, TextBox, ZoneBounds, ZoneFeatures, ZoneReport, ZoneType};

fn find_landmark<'a>(page: &'a PageContent, text: &str, threshold: f64) -> Option<&'a TextBox> {
    page.boxes.iter().filter(|b| label_similarity(&b.text, text) >= threshold).max_by(|a, b| {
        label_similarity(&a.text, text).partial_cmp(&label_similarity(&b.text, text)).unwrap()
    })
}

/// Derives the client-initial zone on every page but the last, from the
/// "Case reference no" / "Client initial" / "Merchant/Consultant no"
/// landmarks (spec.md §4.7).
pub fn derive_initial_zone(page: &PageContent, is_last_page: bool, cfg: &SignatureConfig) -> Option<SignatureZone> {
    if is_last_page {
        return None;
    }
    let threshold = cfg.landmark_fuzzy_threshold;
    let case_ref = find_landmark(page, "Case reference no", threshold)?;
    let client_initial = find_landmark(page, "Client initial", threshold)?;
    let merchant = find_landmark(page, "Merchant/Consultant no", threshold)?;

    let w = merchant.x - case_ref.x;
    let h = (client_initial.y + client_initial.h) - case_ref.y;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }

    Some(SignatureZone {
        name: format!("clientInitial_page{}", page.page_index),
        page: page.page_index,
        bounds: ZoneBounds { x: case_ref.x, y: case_ref.y, w, h },
        zone_type: ZoneType::Initial,
        derived_from: vec!["Case reference no".to_string(), "Client initial".to_string(), "Merchant/Consultant no".to_string()],
    })
}

/// Derives the final-page signature zone from the "Client Signature"
/// landmark, honoring the "Place" proximity constraint (spec.md §4.7).
pub fn derive_signature_zone(page: &PageContent, cfg: &SignatureConfig) -> Option<SignatureZone> {
    let threshold = cfg.landmark_fuzzy_threshold;
    let signature_box = page
        .boxes
        .iter()
        .filter(|b| label_similarity(&b.text, "Client Signature") >= threshold)
        .find(|b| page.boxes.iter().any(|p| label_similarity(&p.text, "Place") >= threshold && p.edge_distance(b) <= cfg.proximity_limit_px))
        .or_else(|| find_landmark(page, "Client Signature", threshold))?;

    Some(SignatureZone {
        name: format!("clientSignature_page{}", page.page_index),
        page: page.page_index,
        bounds: ZoneBounds { x: signature_box.x, y: signature_box.bottom() + 10.0, w: page.page_w / 2.0, h: 0.12 * page.page_h },
        zone_type: ZoneType::Signature,
        derived_from: vec!["Client Signature".to_string()],
    })
}

/// Derives every signature zone across a document: an initial zone per
/// page (except the last) plus a signature zone on the last page
/// (spec.md §4.7).
pub fn derive_zones(pages: &[PageContent], cfg: &SignatureConfig) -> Vec<SignatureZone> {
    let mut zones = Vec::new();
    let last_index = pages.len().saturating_sub(1);
    for page in pages {
        let is_last = page.page_index == last_index;
        if let Some(zone) = derive_initial_zone(page, is_last, cfg) {
            zones.push(zone);
        }
        if is_last {
            if let Some(zone) = derive_signature_zone(page, cfg) {
                zones.push(zone);
            }
        }
    }
    zones
}

/// Contour-derived features used by [`classify_mark`] (spec.md §4.7).
#[derive(Debug, Clone, Copy)]
pub struct ContourMetrics {
    pub area: f64,
    pub perimeter: f64,
    pub solidity: f64,
    pub aspect_ratio: f64,
}

impl ContourMetrics {
    pub fn complexity(&self) -> f64 {
        if self.area <= 0.0 {
            0.0
        } else {
            self.perimeter * self.perimeter / self.area
        }
    }
}

/// Whether a single contour qualifies as a mark, per spec.md §4.7: area
/// within `[100, 0.1 * zone_area]`, complexity > 50, solidity in
/// `[0.2, 0.9]`, aspect ratio in `[0.2, 5.0]`.
fn qualifies(m: &ContourMetrics, zone_area: f64, cfg: &SignatureConfig) -> bool {
    let (sol_lo, sol_hi) = cfg.solidity_range;
    let (ar_lo, ar_hi) = cfg.aspect_ratio_range;
    m.area >= cfg.min_contour_area
        && m.area <= cfg.max_contour_area_fraction * zone_area
        && m.complexity() > cfg.min_complexity
        && m.solidity >= sol_lo
        && m.solidity <= sol_hi
        && m.aspect_ratio >= ar_lo
        && m.aspect_ratio <= ar_hi
}

/// Scores a zone's contours for mark presence and confidence (spec.md
/// §4.7). `marked=false` with `confidence=0.0` when no contour qualifies,
/// including an empty (all-white) zone (spec.md §8 boundary test).
pub fn classify_mark(contours: &[ContourMetrics], zone_area: f64, cfg: &SignatureConfig) -> ZoneReport {
    let qualifying: Vec<&ContourMetrics> = contours.iter().filter(|m| qualifies(m, zone_area, cfg)).collect();

    let marked = !qualifying.is_empty();
    let confidence = qualifying
        .iter()
        .map(|m| 0.7 * (m.complexity() / 200.0).min(1.0) + 0.3 * (1.0 - (m.solidity - 0.5).abs() * 2.0).max(0.0))
        .fold(0.0_f64, f64::max);

    let best = qualifying.first().copied();
    ZoneReport {
        zone: String::new(),
        marked,
        confidence: if marked { confidence } else { 0.0 },
        features: ZoneFeatures {
            contour_count: contours.len(),
            area: best.map(|m| m.area).unwrap_or(0.0),
            stroke_complexity: best.map(|m| m.complexity()).unwrap_or(0.0),
            density: if zone_area > 0.0 { contours.iter().map(|m| m.area).sum::<f64>() / zone_area } else { 0.0 },
        },
    }
}

#[cfg(feature = "ocr")]
mod imaging {
    use super::*;
    use image::{DynamicImage, GenericImageView};
    use imageproc::contours::{BorderType, find_contours};
    use imageproc::contrast::adaptive_threshold;

    /// Crops a zone out of a rendered page image, in page-coordinate
    /// pixels (spec.md §4.7 image extraction).
    pub fn crop_zone(page_image: &DynamicImage, bounds: &crate::types::signature::ZoneBounds) -> DynamicImage {
        let (img_w, img_h) = page_image.dimensions();
        let x = bounds.x.max(0.0) as u32;
        let y = bounds.y.max(0.0) as u32;
        let w = (bounds.w as u32).min(img_w.saturating_sub(x)).max(1);
        let h = (bounds.h as u32).min(img_h.saturating_sub(y)).max(1);
        page_image.crop_imm(x, y, w, h)
    }

    /// Binarizes a cropped zone and extracts contour metrics (spec.md
    /// §4.7 mark scoring: adaptive threshold block 11, external contours,
    /// per-contour area/perimeter/solidity/aspect-ratio).
    pub fn contour_metrics(zone_image: &DynamicImage) -> Vec<ContourMetrics> {
        let gray = zone_image.to_luma8();
        let binary = adaptive_threshold(&gray, 11);
        let contours = find_contours::<i32>(&binary);

        contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .filter_map(|c| {
                if c.points.len() < 3 {
                    return None;
                }
                let area = polygon_area(&c.points);
                let perimeter = polygon_perimeter(&c.points);
                let hull_area = convex_hull_area(&c.points);
                let (min_x, max_x, min_y, max_y) = bounds_of(&c.points);
                let w = (max_x - min_x).max(1) as f64;
                let h = (max_y - min_y).max(1) as f64;
                let solidity = if hull_area > 0.0 { (area / hull_area).min(1.0) } else { 0.0 };
                Some(ContourMetrics { area, perimeter, solidity, aspect_ratio: w / h })
            })
            .collect()
    }

    fn bounds_of(points: &[imageproc::point::Point<i32>]) -> (i32, i32, i32, i32) {
        let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
        let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
        let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);
        (min_x, max_x, min_y, max_y)
    }

    /// Shoelace-formula polygon area.
    fn polygon_area(points: &[imageproc::point::Point<i32>]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0_f64;
        for i in 0..points.len() {
            let p1 = points[i];
            let p2 = points[(i + 1) % points.len()];
            sum += (p1.x as f64) * (p2.y as f64) - (p2.x as f64) * (p1.y as f64);
        }
        (sum / 2.0).abs()
    }

    fn polygon_perimeter(points: &[imageproc::point::Point<i32>]) -> f64 {
        let mut total = 0.0_f64;
        for i in 0..points.len() {
            let p1 = points[i];
            let p2 = points[(i + 1) % points.len()];
            total += (((p2.x - p1.x).pow(2) + (p2.y - p1.y).pow(2)) as f64).sqrt();
        }
        total
    }

    /// Convex hull area via a simple monotone-chain hull over the contour
    /// points; used only for the solidity ratio, not the headline area.
    fn convex_hull_area(points: &[imageproc::point::Point<i32>]) -> f64 {
        let mut pts: Vec<(i64, i64)> = points.iter().map(|p| (p.x as i64, p.y as i64)).collect();
        pts.sort();
        pts.dedup();
        if pts.len() < 3 {
            return 0.0;
        }
        let cross = |o: (i64, i64), a: (i64, i64), b: (i64, i64)| (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0);
        let build = |pts: &[(i64, i64)]| -> Vec<(i64, i64)> {
            let mut hull: Vec<(i64, i64)> = Vec::new();
            for &p in pts {
                while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
                    hull.pop();
                }
                hull.push(p);
            }
            hull
        };
        let lower = build(&pts);
        pts.reverse();
        let upper = build(&pts);
        let mut hull = lower;
        hull.pop();
        hull.extend(upper);
        hull.pop();

        if hull.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0_f64;
        for i in 0..hull.len() {
            let (x1, y1) = hull[i];
            let (x2, y2) = hull[(i + 1) % hull.len()];
            sum += (x1 * y2 - x2 * y1) as f64;
        }
        (sum / 2.0).abs()
    }
}

#[cfg(feature = "ocr")]
pub use imaging::{contour_metrics, crop_zone};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoxSource, PageContent};

    fn tb(text: &str, x: f64, y: f64, w: f64, h: f64) -> TextBox {
        TextBox::new(text, x, y, w, h, 0, 2481.0, 3508.0, BoxSource::Digital, 1.0)
    }

    #[test]
    fn derives_initial_zone_from_three_landmarks() {
        let mut page = PageContent::new(0, 2481.0, 3508.0, true);
        page.boxes = vec![
            tb("Case reference no", 17.0, 761.0, 150.0, 20.0),
            tb("Client initial", 17.0, 780.0, 150.0, 26.0),
            tb("Merchant/Consultant no", 300.0, 761.0, 150.0, 20.0),
        ];
        let zone = derive_initial_zone(&page, false, &SignatureConfig::default()).unwrap();
        assert_eq!(zone.name, "clientInitial_page0");
        assert!(zone.bounds.w > 0.0 && zone.bounds.h > 0.0);
    }

    #[test]
    fn last_page_never_gets_an_initial_zone() {
        let page = PageContent::new(5, 2481.0, 3508.0, true);
        assert!(derive_initial_zone(&page, true, &SignatureConfig::default()).is_none());
    }

    #[test]
    fn missing_landmark_yields_no_zone() {
        let mut page = PageContent::new(0, 2481.0, 3508.0, true);
        page.boxes = vec![tb("Case reference no", 17.0, 761.0, 150.0, 20.0)];
        assert!(derive_initial_zone(&page, false, &SignatureConfig::default()).is_none());
    }

    #[test]
    fn all_white_zone_is_not_marked() {
        let report = classify_mark(&[], 1000.0, &SignatureConfig::default());
        assert!(!report.marked);
        assert_eq!(report.confidence, 0.0);
    }

    #[test]
    fn a_complex_qualifying_contour_is_marked() {
        let m = ContourMetrics { area: 500.0, perimeter: 400.0, solidity: 0.5, aspect_ratio: 1.2 };
        assert!(m.complexity() > 50.0);
        let report = classify_mark(&[m], 10_000.0, &SignatureConfig::default());
        assert!(report.marked);
        assert!(report.confidence > 0.0);
    }

    #[test]
    fn oversized_contour_relative_to_zone_is_rejected() {
        let m = ContourMetrics { area: 5000.0, perimeter: 1000.0, solidity: 0.5, aspect_ratio: 1.0 };
        let report = classify_mark(&[m], 10_000.0, &SignatureConfig::default());
        assert!(!report.marked);
    }
}
