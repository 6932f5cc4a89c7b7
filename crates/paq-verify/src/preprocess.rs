//! Image Preprocessor (spec.md §4.2): orientation detection, deskew,
//! brightness/contrast assessment, conditional inversion, and an
//! enhancement-trigger decision, ahead of OCR.
//!
//! Each stage is a small, independently testable free function over
//! `image::GrayImage`/`DynamicImage`, taking a `&PreprocessConfig` slice of
//! [`crate::config::VerifyConfig`] (mirrors the teacher's preference for
//! small pipeline stages over one monolithic `preprocess()`).

use image::{DynamicImage, GrayImage};

use crate::config::PreprocessConfig;

/// Brightness/contrast/noise/sharpness metrics used to decide whether a
/// page needs the enhancement retry loop (spec.md §4.2, §4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMetrics {
    pub brightness: f64,
    pub contrast: f64,
    pub noise: f64,
    pub sharpness: f64,
}

/// Mean luminance on a `[0, 1]` scale (spec.md §4.2 inversion trigger).
pub fn mean_luminance(image: &GrayImage) -> f64 {
    if image.is_empty() {
        return 1.0;
    }
    let sum: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
    (sum as f64 / image.len() as f64) / 255.0
}

/// Standard deviation of pixel intensity on a `[0, 1]` scale, used as a
/// contrast proxy (spec.md §4.2 enhancement trigger).
pub fn contrast(image: &GrayImage) -> f64 {
    if image.is_empty() {
        return 1.0;
    }
    let mean = image.pixels().map(|p| p.0[0] as f64).sum::<f64>() / image.len() as f64;
    let variance = image.pixels().map(|p| (p.0[0] as f64 - mean).powi(2)).sum::<f64>() / image.len() as f64;
    variance.sqrt() / 255.0
}

/// Noise proxy: mean absolute difference between each pixel and its
/// horizontal neighbor, on a `[0, 1]` scale.
pub fn noise_estimate(image: &GrayImage) -> f64 {
    let (w, h) = image.dimensions();
    if w < 2 || h == 0 {
        return 0.0;
    }
    let mut total = 0.0_f64;
    let mut count = 0u64;
    for y in 0..h {
        for x in 0..w - 1 {
            let a = image.get_pixel(x, y).0[0] as f64;
            let b = image.get_pixel(x + 1, y).0[0] as f64;
            total += (a - b).abs();
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        (total / count as f64) / 255.0
    }
}

/// Laplacian-variance sharpness proxy; negative/near-zero indicates a
/// blurry page (spec.md §4.2 enhancement trigger).
pub fn laplacian_sharpness(image: &GrayImage) -> f64 {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let px = |x: u32, y: u32| image.get_pixel(x, y).0[0] as f64;
    let mut responses = Vec::with_capacity(((w - 2) * (h - 2)) as usize);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let laplacian = -4.0 * px(x, y) + px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1);
            responses.push(laplacian);
        }
    }
    if responses.is_empty() {
        return 0.0;
    }
    let mean = responses.iter().sum::<f64>() / responses.len() as f64;
    responses.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / responses.len() as f64
}

/// Computes all four metrics in one pass over a grayscale page.
pub fn assess(image: &GrayImage) -> ImageMetrics {
    ImageMetrics {
        brightness: mean_luminance(image),
        contrast: contrast(image),
        noise: noise_estimate(image),
        sharpness: laplacian_sharpness(image),
    }
}

/// Whether a page's metrics justify the enhancement retry loop (spec.md
/// §4.2 enhancement trigger, reused by the orchestrator's §4.8 decision).
pub fn needs_enhancement(metrics: &ImageMetrics, cfg: &PreprocessConfig) -> bool {
    metrics.brightness < cfg.brightness_low
        || metrics.brightness > cfg.brightness_high
        || metrics.contrast < cfg.contrast_min
        || metrics.noise > cfg.noise_max
        || metrics.sharpness < 0.0
}

/// Whether a page should be inverted, and whether a second reassessment
/// pass would still call for inversion (spec.md §4.2 inversion: applied
/// once, reassessed, applied once more only if still below threshold).
pub fn should_invert(luminance: f64, cfg: &PreprocessConfig) -> bool {
    luminance < cfg.inversion_luminance_threshold
}

#[cfg(feature = "ocr")]
mod imaging {
    use super::*;
    use imageproc::contrast::adaptive_threshold;
    use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
    use imageproc::hough::{LineDetectionOptions, detect_lines};

    /// Dominant skew angle in degrees via Hough line detection on a binary
    /// edge map; `0.0` when no reliable line cluster is found (spec.md
    /// §4.2 orientation).
    pub fn detect_skew_degrees(gray: &GrayImage) -> f64 {
        let binary = adaptive_threshold(gray, 11);
        let options = LineDetectionOptions { vote_threshold: 100, suppression_radius: 8 };
        let lines = detect_lines(&binary, options);
        if lines.is_empty() {
            return 0.0;
        }
        // Lines near-horizontal (angle close to 90 degrees in Hough's polar
        // convention) dominate a well-scanned page; deviation from 90 is
        // the page's skew.
        let mut angles: Vec<f64> = lines.iter().map(|l| l.angle_in_degrees as f64 - 90.0).collect();
        angles.sort_by(|a, b| a.partial_cmp(b).unwrap());
        angles[angles.len() / 2]
    }

    /// Applies an optional rotation correction only when `|angle| > 1deg`
    /// (spec.md §4.2 orientation), returning the original image unchanged
    /// otherwise.
    pub fn deskew(image: &DynamicImage, angle_deg: f64, cfg: &PreprocessConfig) -> DynamicImage {
        if angle_deg.abs() <= cfg.orientation_deg_threshold {
            return image.clone();
        }
        let rgba = image.to_rgba8();
        let theta = angle_deg.to_radians() as f32;
        let rotated = rotate_about_center(&rgba, theta, Interpolation::Bilinear, image::Rgba([255, 255, 255, 255]));
        DynamicImage::ImageRgba8(rotated)
    }

    /// Inverts a page's luminance (spec.md §4.2 inversion), applying the
    /// post-process safeguard: reassess after inversion and invert once
    /// more only if still below threshold.
    pub fn conditional_invert(image: DynamicImage, cfg: &PreprocessConfig) -> DynamicImage {
        let gray = image.to_luma8();
        if !should_invert(mean_luminance(&gray), cfg) {
            return image;
        }
        let mut inverted = image;
        inverted.invert();
        let gray2 = inverted.to_luma8();
        if should_invert(mean_luminance(&gray2), cfg) {
            inverted.invert();
        }
        inverted
    }
}

#[cfg(feature = "ocr")]
pub use imaging::{conditional_invert, deskew, detect_skew_degrees};
