//! Signature/initial zones and the mark-presence reports for them
//! (spec.md §3, §4.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Initial,
    Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// A rectangle on a page where an initial or signature is expected,
/// derived from landmark text boxes (spec.md §3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureZone {
    pub name: String,
    pub page: usize,
    pub bounds: ZoneBounds,
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    pub derived_from: Vec<String>,
}

/// Per-contour features computed during mark scoring (spec.md §3, §4.7).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ZoneFeatures {
    pub contour_count: usize,
    pub area: f64,
    pub stroke_complexity: f64,
    pub density: f64,
}

/// Whether a zone carries a human mark, and why (spec.md §3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneReport {
    pub zone: String,
    pub marked: bool,
    pub confidence: f64,
    pub features: ZoneFeatures,
}
