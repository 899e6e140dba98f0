//! Check command: run every content file through the builder without output.

use super::build::run_build;
use super::load_config;
use anyhow::{bail, Result};
use rho_core::BuildOptions;
use std::path::Path;

pub fn check_site(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let options = BuildOptions {
        use_cache: false,
        write: false,
    };
    let report = run_build(&config, options)?;

    if report.is_success() {
        tracing::info!("✓ {} files OK", report.processed);
        return Ok(());
    }

    bail!(
        "{} of {} files have errors",
        report.failures.len(),
        report.processed
    );
}
