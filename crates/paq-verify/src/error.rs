//! The crate's error taxonomy (spec.md §7).
//!
//! Only [`VerifyError::Input`] aborts the pipeline early; every other
//! variant is caught at the orchestrator boundary and folded into
//! [`crate::types::VerificationReport::issues`] as a textual, reproducible
//! string. No variant carries a stack trace.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerifyError>;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Unreadable or malformed PDF, missing OCR model: fatal for the
    /// document.
    #[error("input error: {message}")]
    Input { message: String },

    /// A single page's extraction failed; the page is marked
    /// `acquisition_failed` but the document continues.
    #[error("acquisition warning on page {page}: {message}")]
    AcquisitionWarning { page: usize, message: String },

    /// The OCR engine returned zero boxes for a page.
    #[error("OCR warning on page {page}: {message}")]
    OcrWarning { page: usize, message: String },

    /// After all locator steps and zone fallback, a required field has no
    /// candidate.
    #[error("field_not_found:{field}")]
    FieldNotFound { field: String },

    /// A candidate was found but failed the type's tolerance rule.
    #[error("mismatch:{field}:expected={expected},found={found}")]
    FieldMismatch { field: String, expected: String, found: String },

    /// A required signature zone could not be derived or is unmarked.
    #[error("signature_missing:{zone}")]
    ZoneMissing { zone: String },

    /// Per-page soft timeout exceeded.
    #[error("timeout on page {page} after {elapsed_ms}ms")]
    Timeout { page: usize, elapsed_ms: u64 },

    /// Externally cancelled.
    #[error("cancelled")]
    Cancelled,

    /// Escape hatch for genuinely unexpected library errors (pdfium, OCR
    /// engine init, filesystem I/O for `_extract/`).
    #[error("{0}")]
    Other(String),
}

impl VerifyError {
    /// Renders the error as one of the textual issue codes from spec.md §7,
    /// for embedding in `VerificationReport.issues`.
    pub fn as_issue(&self) -> String {
        self.to_string()
    }
}

impl From<std::io::Error> for VerifyError {
    fn from(err: std::io::Error) -> Self {
        VerifyError::Other(format!("io error: {err}"))
    }
}

impl From<serde_json::Error> for VerifyError {
    fn from(err: serde_json::Error) -> Self {
        VerifyError::Other(format!("json error: {err}"))
    }
}
