//! Runtime configuration for the verification pipeline (spec.md §6).
//!
//! A single [`VerifyConfig`] record carries every tunable named across
//! §4 of spec.md, each with an explicit default. Load precedence (highest
//! first) mirrors the teacher's CLI override pattern: CLI flags > a TOML
//! file passed via `--config` > [`VerifyConfig::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};

/// Acquisition and rendering tunables (spec.md §4.1, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub scale: f64,
    pub max_dimension_px: u32,
    pub max_pixel_bytes: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { scale: 3.0, max_dimension_px: 4096, max_pixel_bytes: 100 * 1024 * 1024 }
    }
}

/// Preprocessing decision thresholds (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub orientation_deg_threshold: f64,
    pub inversion_luminance_threshold: f64,
    pub brightness_low: f64,
    pub brightness_high: f64,
    pub contrast_min: f64,
    pub noise_max: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            orientation_deg_threshold: 1.0,
            inversion_luminance_threshold: 0.4,
            brightness_low: 0.2,
            brightness_high: 0.96,
            contrast_min: 0.3,
            noise_max: 0.15,
        }
    }
}

/// Per-type validation tolerances (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    pub currency_abs: f64,
    pub percentage_abs: f64,
    pub account_edit_distance_ocr: usize,
    pub account_edit_distance_digital: usize,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self { currency_abs: 0.05, percentage_abs: 0.01, account_edit_distance_ocr: 1, account_edit_distance_digital: 0 }
    }
}

/// Signature zone derivation and mark-scoring thresholds (spec.md §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    pub landmark_fuzzy_threshold: f64,
    pub proximity_limit_px: f64,
    pub min_contour_area: f64,
    pub max_contour_area_fraction: f64,
    pub min_complexity: f64,
    pub solidity_range: (f64, f64),
    pub aspect_ratio_range: (f64, f64),
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            landmark_fuzzy_threshold: 0.6,
            proximity_limit_px: 200.0,
            min_contour_area: 100.0,
            max_contour_area_fraction: 0.1,
            min_complexity: 50.0,
            solidity_range: (0.2, 0.9),
            aspect_ratio_range: (0.2, 5.0),
        }
    }
}

/// Enhancement feedback loop thresholds (spec.md §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub min_median_box_confidence: f64,
    pub max_passes: u8,
    pub rescale_factor: f64,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self { min_median_box_confidence: 0.75, max_passes: 2, rescale_factor: 3.0 }
    }
}

/// Top-level pipeline configuration (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub render: RenderConfig,
    pub preprocess: PreprocessConfig,
    pub tolerance: ToleranceConfig,
    pub signature: SignatureConfig,
    pub enhancement: EnhancementConfig,
    /// Path to the Tesseract `tessdata` directory. `None` uses the
    /// system-default search path.
    pub ocr_model_path: Option<PathBuf>,
    /// Per-document page fan-out cap (spec.md §5); 0 means
    /// `min(pageCount, num_cpus)`.
    pub max_page_fan_out: usize,
    /// Soft per-page timeout in seconds (spec.md §5).
    pub page_timeout_secs: u64,
    pub debug: bool,
    /// Root directory for `_extract/<caseId>/` output (spec.md §4.7, §6).
    pub extract_dir: PathBuf,
    /// Root directory for `debug_output/` (spec.md §6).
    pub debug_output_dir: PathBuf,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            preprocess: PreprocessConfig::default(),
            tolerance: ToleranceConfig::default(),
            signature: SignatureConfig::default(),
            enhancement: EnhancementConfig::default(),
            ocr_model_path: None,
            max_page_fan_out: 4,
            page_timeout_secs: 45,
            debug: false,
            extract_dir: PathBuf::from("_extract"),
            debug_output_dir: PathBuf::from("debug_output"),
        }
    }
}

impl VerifyConfig {
    /// Loads a TOML config file, falling back to defaults for any field
    /// the file does not set (`#[serde(default)]` on every sub-struct).
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| VerifyError::Other(format!("reading config {path:?}: {e}")))?;
        toml::from_str(&text).map_err(|e| VerifyError::Other(format!("parsing config {path:?}: {e}")))
    }

    pub fn page_fan_out(&self, page_count: usize) -> usize {
        let cap = if self.max_page_fan_out == 0 { num_cpus::get() } else { self.max_page_fan_out };
        page_count.min(cap).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = VerifyConfig::default();
        assert_eq!(cfg.render.scale, 3.0);
        assert_eq!(cfg.tolerance.currency_abs, 0.05);
        assert_eq!(cfg.tolerance.percentage_abs, 0.01);
        assert_eq!(cfg.enhancement.max_passes, 2);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let toml_text = "[tolerance]\ncurrency_abs = 0.10\n";
        let cfg: VerifyConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(cfg.tolerance.currency_abs, 0.10);
        assert_eq!(cfg.tolerance.percentage_abs, 0.01);
        assert_eq!(cfg.render.scale, 3.0);
    }

    #[test]
    fn page_fan_out_caps_at_page_count() {
        let cfg = VerifyConfig::default();
        assert_eq!(cfg.page_fan_out(2), 2);
        assert_eq!(cfg.page_fan_out(10), 4);
    }
}
