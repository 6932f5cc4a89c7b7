//! The final verification report (spec.md §3, §6).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::field::FieldResult;
use super::signature::ZoneReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Valid,
    Invalid,
    Error,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Summary {
    pub fields_required: usize,
    pub fields_valid: usize,
    pub zones_required: usize,
    pub zones_marked: usize,
}

/// The decision handed back to the caller: `VALID` auto-disburses,
/// `INVALID`/`ERROR` route to a human operator (spec.md §1, §3).
///
/// `fields` is a `BTreeMap` rather than a `HashMap` so that serializing two
/// reports for the same document always produces byte-identical JSON,
/// independent of hash-map iteration order (spec.md §8 determinism
/// invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub status: VerificationStatus,
    pub overall_confidence: f64,
    pub fields: BTreeMap<String, FieldResult>,
    pub zones: Vec<ZoneReport>,
    pub issues: Vec<String>,
    pub summary: Summary,
}

impl VerificationReport {
    pub fn error(issue: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Error,
            overall_confidence: 0.0,
            fields: BTreeMap::new(),
            zones: Vec::new(),
            issues: vec![issue.into()],
            summary: Summary::default(),
        }
    }

    /// Assembles the final status from the per-field and per-zone results,
    /// applying the decision rule in spec.md §4.8: VALID iff every
    /// required field is valid and every required zone is marked.
    pub fn assemble(
        fields: BTreeMap<String, FieldResult>,
        required_fields: &[String],
        zones: Vec<ZoneReport>,
        required_zones: &[String],
        mut issues: Vec<String>,
    ) -> Self {
        let mut fields_valid = 0usize;
        for name in required_fields {
            match fields.get(name) {
                Some(r) if r.valid => fields_valid += 1,
                Some(r) => issues.push(format!(
                    "mismatch:{}:expected={},found={}",
                    name,
                    r.expected.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "null".into()),
                    r.found.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "null".into())
                )),
                None => issues.push(format!("field_not_found:{name}")),
            }
        }

        let mut zones_marked = 0usize;
        let zone_by_name: BTreeMap<&str, &ZoneReport> = zones.iter().map(|z| (z.zone.as_str(), z)).collect();
        for name in required_zones {
            match zone_by_name.get(name.as_str()) {
                Some(z) if z.marked => zones_marked += 1,
                _ => issues.push(format!("signature_missing:{name}")),
            }
        }

        let all_fields_valid = fields_valid == required_fields.len();
        let all_zones_marked = zones_marked == required_zones.len();
        let status =
            if all_fields_valid && all_zones_marked { VerificationStatus::Valid } else { VerificationStatus::Invalid };

        let field_confidences: Vec<f64> = required_fields.iter().filter_map(|n| fields.get(n)).map(|r| r.confidence).collect();
        let zone_confidences: Vec<f64> = zones.iter().map(|z| z.confidence).collect();
        let all_confidences: Vec<f64> = field_confidences.into_iter().chain(zone_confidences).collect();
        let overall_confidence = if all_confidences.is_empty() {
            0.0
        } else {
            all_confidences.iter().sum::<f64>() / all_confidences.len() as f64
        };

        issues.sort();
        issues.dedup();

        Self {
            status,
            overall_confidence,
            fields,
            zones,
            issues,
            summary: Summary {
                fields_required: required_fields.len(),
                fields_valid,
                zones_required: required_zones.len(),
                zones_marked,
            },
        }
    }
}
