//! `paq-verify` - verifies bank loan agreement documents (PAQ and
//! application forms) against a case model retrieved from the upstream
//! workflow system (spec.md §1, §6).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use paq_verify::VerificationStatus;

/// Output rendering for a verification report (teacher pattern from
/// `kreuzberg-cli`'s `OutputFormat`).
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "paq-verify")]
#[command(about = "Verify bank loan agreement documents against a case model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify one PDF against its case model.
    Verify {
        /// Path to the PAQ/application form PDF.
        pdf: PathBuf,

        /// Path to the case model JSON.
        #[arg(long)]
        case_model: PathBuf,

        /// Path to a TOML file overriding `VerifyConfig` defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write `debug_output/` (per-page images, processing log).
        #[arg(long)]
        debug: bool,

        /// Output rendering.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Verify many PDFs against case models in a directory (one JSON file
    /// per PDF, matched by file stem).
    BatchVerify {
        /// Paths to the PDFs to verify.
        #[arg(required = true, num_args = 1..)]
        pdfs: Vec<PathBuf>,

        /// Directory containing one `<stem>.json` case model per PDF.
        #[arg(long)]
        case_models: PathBuf,

        /// Path to a TOML file overriding `VerifyConfig` defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output rendering.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Exit codes (spec.md §6): 0 `VALID`, 1 `INVALID`, 2 pipeline `ERROR`, 3
/// usage error (bad arguments, unreadable input files).
const EXIT_VALID: u8 = 0;
const EXIT_INVALID: u8 = 1;
const EXIT_ERROR: u8 = 2;
const EXIT_USAGE: u8 = 3;

fn status_exit_code(status: VerificationStatus) -> u8 {
    match status {
        VerificationStatus::Valid => EXIT_VALID,
        VerificationStatus::Invalid => EXIT_INVALID,
        VerificationStatus::Error => EXIT_ERROR,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify { pdf, case_model, config, debug, format } => {
            match commands::verify::verify_command(pdf, case_model, config, debug, format).await {
                Ok(report) => ExitCode::from(status_exit_code(report.status)),
                Err(err) => {
                    eprintln!("error: {err:#}");
                    ExitCode::from(EXIT_USAGE)
                }
            }
        }
        Commands::BatchVerify { pdfs, case_models, config, format } => {
            match commands::batch_verify::batch_verify_command(pdfs, case_models, config, format).await {
                Ok(statuses) => {
                    let worst = statuses
                        .iter()
                        .copied()
                        .map(status_exit_code)
                        .max()
                        .unwrap_or(EXIT_VALID);
                    ExitCode::from(worst)
                }
                Err(err) => {
                    eprintln!("error: {err:#}");
                    ExitCode::from(EXIT_USAGE)
                }
            }
        }
    }
}
