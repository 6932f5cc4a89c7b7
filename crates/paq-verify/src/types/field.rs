//! Field specifications and the results the locator/validator produce for
//! them (spec.md §3).

use serde::{Deserialize, Serialize};

use super::geometry::TextBox;

/// The type-aware parsing/validation rule applied to a field's value
/// (spec.md §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Currency,
    Percentage,
    Reference,
    Account,
    Text,
}

/// Where, relative to its label, a field's value is expected to sit
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Right,
    Below,
    Any,
}

/// Which locator step ultimately produced a field's result (spec.md §3,
/// §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    DirectMatch,
    MultiTableExact,
    MultiTableStaff,
    ZoneFallback,
    SingleTable,
}

/// What a [`FieldSpec`] asks the Field Locator to find (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub labels: Vec<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub search_strategy: SearchStrategy,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        labels: Vec<&str>,
        field_type: FieldType,
        required: bool,
        search_strategy: SearchStrategy,
    ) -> Self {
        Self {
            name: name.into(),
            labels: labels.into_iter().map(String::from).collect(),
            field_type,
            required,
            search_strategy,
        }
    }
}

/// The outcome of locating and validating one field (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldResult {
    pub name: String,
    pub expected: Option<serde_json::Value>,
    pub found: Option<serde_json::Value>,
    pub valid: bool,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_box: Option<TextBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_box: Option<TextBox>,
}

impl FieldResult {
    /// A result for a field that no candidate could be found for
    /// (spec.md §7 `FieldNotFound`).
    pub fn not_found(name: impl Into<String>, expected: Option<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            expected,
            found: None,
            valid: false,
            confidence: 0.0,
            method: None,
            label_box: None,
            value_box: None,
        }
    }
}
