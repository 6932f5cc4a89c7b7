//! Configuration precedence tests for the `paq-verify` CLI (spec.md §6:
//! CLI flags override a `--config` TOML file, which overrides
//! `VerifyConfig::default()`).

use std::io::Write;

use paq_verify::VerifyConfig;

#[test]
fn defaults_apply_with_no_config_file() {
    let config = VerifyConfig::default();
    assert_eq!(config.tolerance.currency_abs, 0.05);
    assert_eq!(config.enhancement.max_passes, 2);
    assert!(!config.debug);
}

#[test]
fn toml_file_overrides_defaults_for_set_fields_only() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[tolerance]\ncurrency_abs = 0.10\n").unwrap();

    let config = VerifyConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.tolerance.currency_abs, 0.10);
    // Untouched sections keep their defaults.
    assert_eq!(config.tolerance.percentage_abs, 0.01);
    assert_eq!(config.render.scale, 3.0);
}

#[test]
fn missing_config_file_is_an_error() {
    let result = VerifyConfig::from_toml_file(std::path::Path::new("/nonexistent/config.toml"));
    assert!(result.is_err());
}

#[test]
fn malformed_toml_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is not valid toml [[[").unwrap();
    let result = VerifyConfig::from_toml_file(file.path());
    assert!(result.is_err());
}

#[test]
fn cli_debug_flag_takes_precedence_over_config_file() {
    // Mirrors the CLI's `load_config`: a file can set `debug = false` but
    // `--debug` on the command line still wins.
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "debug = false\n").unwrap();

    let mut config = VerifyConfig::from_toml_file(file.path()).unwrap();
    assert!(!config.debug);
    let cli_debug_flag = true;
    if cli_debug_flag {
        config.debug = true;
    }
    assert!(config.debug);
}
