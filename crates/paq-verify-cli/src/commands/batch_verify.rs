//! Batch-verify command - checks many documents against their case models
//! in one invocation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use paq_verify::{VerificationStatus, VerifyConfig};

use super::verify::{load_case_model, load_config, print_report};
use crate::OutputFormat;

/// Locates the case model file for a PDF inside `case_models_dir` (spec.md
/// §6): the file sharing the PDF's stem, with a `.json` extension.
pub fn case_model_path_for(pdf: &Path, case_models_dir: &Path) -> Result<PathBuf> {
    let stem = pdf
        .file_stem()
        .ok_or_else(|| anyhow!("PDF path '{}' has no file stem", pdf.display()))?;
    let candidate = case_models_dir.join(stem).with_extension("json");
    if !candidate.is_file() {
        return Err(anyhow!(
            "no case model found for '{}' (expected '{}')",
            pdf.display(),
            candidate.display()
        ));
    }
    Ok(candidate)
}

/// Runs verification over every PDF, continuing past per-document failures
/// so one bad input does not abort the whole batch (spec.md §7: only
/// `Input` errors are fatal, and only for the document that raised them).
pub async fn batch_verify_command(
    pdfs: Vec<PathBuf>,
    case_models_dir: PathBuf,
    config_path: Option<PathBuf>,
    format: OutputFormat,
) -> Result<Vec<VerificationStatus>> {
    let config = load_config(config_path.as_deref(), false)?;
    let mut statuses = Vec::with_capacity(pdfs.len());

    for pdf in &pdfs {
        match run_one(pdf, &case_models_dir, &config, format).await {
            Ok(status) => statuses.push(status),
            Err(err) => {
                eprintln!("error: {pdf:?}: {err:#}");
                statuses.push(VerificationStatus::Error);
            }
        }
    }
    Ok(statuses)
}

async fn run_one(pdf: &Path, case_models_dir: &Path, config: &VerifyConfig, format: OutputFormat) -> Result<VerificationStatus> {
    let case_model_path = case_model_path_for(pdf, case_models_dir)?;
    let case_model = load_case_model(&case_model_path)?;
    let report = paq_verify::verify_document(pdf, &case_model, config)
        .await
        .with_context(|| format!("verifying document '{}'", pdf.display()))?;
    print_report(pdf, &report, format)?;
    Ok(report.status)
}
