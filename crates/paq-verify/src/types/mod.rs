//! Core data types shared across the verification pipeline.
//!
//! Mirrors the shape of spec.md §3: a canonical text box, the page content
//! it lives on, the case model it is checked against, and the field/zone
//! results produced by the locator and signature engine.

pub mod case_model;
pub mod field;
pub mod geometry;
pub mod report;
pub mod signature;

pub use case_model::CaseModel;
pub use field::{FieldResult, FieldSpec, FieldType, Method, SearchStrategy};
pub use geometry::{BoxSource, PageContent, Quality, TextBox};
pub use report::{Summary, VerificationReport, VerificationStatus};
pub use signature::{SignatureZone, ZoneFeatures, ZoneReport, ZoneType};
