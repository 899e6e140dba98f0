//! Build command implementation.

use super::{build_context, load_config};
use anyhow::{bail, Context, Result};
use rho_core::{BuildOptions, Config, DrainReport, Scheduler};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Build the whole site once
pub fn build_site(config_path: &Path, clean: bool, no_cache: bool) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!("Building site: {}", config.site.title);

    if clean {
        clean_outputs(&config)?;
    }

    let options = BuildOptions {
        use_cache: !no_cache,
        write: true,
    };
    let report = run_build(&config, options)?;
    copy_static(&config)?;

    log_report(&report);
    tracing::info!("✓ Output written to {:?}", config.output_dir());

    if !report.is_success() {
        bail!("{} file(s) failed to build", report.failures.len());
    }
    Ok(())
}

/// Queue every content file and drain synchronously
pub fn run_build(config: &Config, options: BuildOptions) -> Result<DrainReport> {
    let mut scheduler = Scheduler::new(build_context(config, options)?);
    let queued = scheduler
        .enqueue_all()
        .context("Failed to scan content directory")?;
    tracing::debug!("Found {} content files", queued);

    scheduler.drain().context("Build aborted")
}

fn clean_outputs(config: &Config) -> Result<()> {
    let output_dir = config.output_dir();
    if output_dir.exists() {
        fs::remove_dir_all(&output_dir)
            .with_context(|| format!("Failed to remove {:?}", output_dir))?;
        tracing::info!("Removed {:?}", output_dir);
    }

    let cache_file = config.cache_file();
    if cache_file.exists() {
        fs::remove_file(&cache_file)
            .with_context(|| format!("Failed to remove {:?}", cache_file))?;
    }
    Ok(())
}

/// Copy the static directory over the output root
pub fn copy_static(config: &Config) -> Result<usize> {
    let static_dir = config.static_dir();
    if !static_dir.is_dir() {
        return Ok(0);
    }

    let output_dir = config.output_dir();
    let mut copied = 0;
    for entry in WalkDir::new(&static_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", static_dir))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry.path().strip_prefix(&static_dir)?;
        let dest = output_dir.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::copy(entry.path(), &dest)
            .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
        copied += 1;
    }

    tracing::debug!("Copied {} static files", copied);
    Ok(copied)
}

pub fn log_report(report: &DrainReport) {
    tracing::info!(
        "✓ Rendered {} pages, copied {} files ({} cached, {} skipped)",
        report.rendered_pages,
        report.copied,
        report.cached,
        report.skipped
    );
    for (path, message) in &report.failures {
        tracing::warn!("✗ {:?}: {}", path, message);
    }
}
