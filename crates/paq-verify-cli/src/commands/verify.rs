//! Verify command - checks a single document against its case model.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use paq_verify::{CaseModel, VerificationReport, VerifyConfig};

use crate::OutputFormat;

/// Loads a case model from a JSON file (spec.md §3, §6).
pub fn load_case_model(path: &Path) -> Result<CaseModel> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading case model file '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing case model JSON '{}'", path.display()))
}

/// Loads pipeline configuration, falling back to defaults when no
/// `--config` file is given (spec.md §6 precedence: CLI flags > TOML file
/// > defaults).
pub fn load_config(config_path: Option<&Path>, debug: bool) -> Result<VerifyConfig> {
    let mut config = match config_path {
        Some(path) => VerifyConfig::from_toml_file(path)
            .with_context(|| format!("loading config file '{}'", path.display()))?,
        None => VerifyConfig::default(),
    };
    if debug {
        config.debug = true;
    }
    Ok(config)
}

/// Runs the verification pipeline for one document and prints the report.
pub async fn verify_command(
    pdf: PathBuf,
    case_model_path: PathBuf,
    config_path: Option<PathBuf>,
    debug: bool,
    format: OutputFormat,
) -> Result<VerificationReport> {
    let case_model = load_case_model(&case_model_path)?;
    let config = load_config(config_path.as_deref(), debug)?;

    let report = paq_verify::verify_document(&pdf, &case_model, &config)
        .await
        .with_context(|| format!("verifying document '{}'", pdf.display()))?;

    print_report(&pdf, &report, format)?;
    Ok(report)
}

/// Prints a report in the requested [`OutputFormat`] (teacher pattern from
/// `kreuzberg-cli`'s text/JSON dispatch).
pub fn print_report(pdf: &Path, report: &VerificationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}: {:?}", pdf.display(), report.status);
            println!("  overall_confidence: {:.3}", report.overall_confidence);
            println!(
                "  fields: {}/{} valid",
                report.summary.fields_valid, report.summary.fields_required
            );
            println!(
                "  zones:  {}/{} marked",
                report.summary.zones_marked, report.summary.zones_required
            );
            for issue in &report.issues {
                println!("  issue: {issue}");
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(report).context("serializing verification report to JSON")?
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_case_model_reads_json_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"caseId": "100169", "loanAmount": 5000}}"#).unwrap();
        let model = load_case_model(file.path()).unwrap();
        assert_eq!(model.case_id(), Some("100169".to_string()));
        assert_eq!(model.get_f64("loanAmount"), Some(5000.0));
    }

    #[test]
    fn load_case_model_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_case_model(file.path()).is_err());
    }

    #[test]
    fn load_config_without_file_uses_defaults() {
        let config = load_config(None, false).unwrap();
        assert_eq!(config.tolerance.currency_abs, 0.05);
        assert!(!config.debug);
    }

    #[test]
    fn load_config_debug_flag_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "debug = false\n").unwrap();
        let config = load_config(Some(file.path()), true).unwrap();
        assert!(config.debug);
    }
}
