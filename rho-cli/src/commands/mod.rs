//! CLI command implementations.

pub mod build;
pub mod check;
pub mod new;
pub mod serve;
pub mod watch;

pub use build::build_site;
pub use check::check_site;
pub use new::new_post;
pub use serve::serve_site;
pub use watch::watch_site;

use anyhow::{Context, Result};
use rho_core::{BuildContext, BuildOptions, Config};
use rho_render::TemplateRegistry;
use std::path::Path;

/// Load `rho.yml`, or defaults rooted next to it when the file is absent
pub fn load_config(config_path: &Path) -> Result<Config> {
    tracing::debug!("Loading config from {:?}", config_path);
    Config::from_file_or_default(config_path).context("Failed to load configuration")
}

/// Build context backed by the MiniJinja template registry
pub fn build_context(
    config: &Config,
    options: BuildOptions,
) -> Result<BuildContext<TemplateRegistry>> {
    let templates = TemplateRegistry::from_config(config).context("Failed to load templates")?;
    Ok(BuildContext::new(config.clone(), templates, options))
}
