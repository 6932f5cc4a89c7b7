//! Bank loan agreement verification engine (spec.md §1).
//!
//! Given a PDF (a Personal Loan/Overdraft/Credit Card PAQ or application
//! form) and a case model retrieved from the upstream workflow system,
//! [`verify_document`] returns a [`VerificationReport`] deciding whether
//! the document can be auto-disbursed (`VALID`), needs a human operator
//! (`INVALID`), or could not be processed at all (`ERROR`).
//!
//! The pipeline (spec.md §2, §4) is: acquire each page's content either
//! as digital text or a rasterized image ([`acquire`]), preprocess and OCR
//! rasterized pages ([`preprocess`], [`ocr`]), normalize and merge boxes
//! into words ([`normalize`]), locate and validate each required field
//! ([`locate`], [`validate`]), derive and score signature zones
//! ([`signature`]), and assemble the final report
//! ([`types::VerificationReport`]). [`orchestrate`] drives the whole
//! sequence with bounded page concurrency (spec.md §5).

pub mod acquire;
pub mod config;
pub mod error;
pub mod fields;
pub mod fuzzy;
pub mod locate;
pub mod normalize;
mod orchestrate;
pub mod ocr;
pub mod preprocess;
pub mod signature;
pub mod types;
pub mod validate;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub use config::VerifyConfig;
pub use error::{Result, VerifyError};
pub use types::{CaseModel, VerificationReport, VerificationStatus};

/// Verifies one document against its case model (spec.md §1, §4.8).
///
/// This is the crate's single entry point: it owns the async runtime
/// boundary so callers never construct a [`tokio::sync::Semaphore`] or
/// cancellation flag themselves. Use [`verify_document_cancellable`] to
/// supply an externally-controlled cancellation flag (spec.md §5, §7
/// `Cancelled`).
pub async fn verify_document(pdf_path: &Path, case_model: &CaseModel, config: &VerifyConfig) -> Result<VerificationReport> {
    orchestrate::verify_document(pdf_path, case_model, config, Arc::new(AtomicBool::new(false))).await
}

/// As [`verify_document`], but polling an externally-owned cancellation
/// flag at every suspension point (spec.md §5 cancellation). The CLI's
/// `Ctrl-C` handler and any future batch scheduler share this entry point.
pub async fn verify_document_cancellable(
    pdf_path: &Path,
    case_model: &CaseModel,
    config: &VerifyConfig,
    cancel: Arc<AtomicBool>,
) -> Result<VerificationReport> {
    orchestrate::verify_document(pdf_path, case_model, config, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn verify_document_on_missing_file_reports_acquisition_failure() {
        let case_model = CaseModel::new(HashMap::new());
        let config = VerifyConfig::default();
        let report = verify_document(Path::new("/nonexistent/document.pdf"), &case_model, &config).await;
        match report {
            Ok(report) => assert_eq!(report.status, VerificationStatus::Invalid),
            Err(err) => assert!(matches!(err, VerifyError::Input { .. })),
        }
    }
}
