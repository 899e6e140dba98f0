//! Template rendering seam used by the builder.

use crate::config::Config;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template '{name}' not found")]
    NotFound { name: String },

    #[error("Failed to render template '{name}': {message}")]
    Template { name: String, message: String },

    #[error("Failed to load templates: {0}")]
    Load(String),
}

/// Something that can turn a variable bag into markup.
///
/// Layouts are looked up by file name (`default.html`); page sources are
/// compiled on the fly under their content URI.
pub trait TemplateRenderer {
    fn render_layout(&self, layout: &str, context: &Value) -> Result<String, RenderError>;

    fn render_source(&self, name: &str, source: &str, context: &Value)
        -> Result<String, RenderError>;

    /// Re-read anything loaded from disk (partials, layouts)
    fn reload(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Follow a configuration change; by default just [`reload`](Self::reload)
    fn reconfigure(&mut self, _config: &Config) -> Result<(), RenderError> {
        self.reload()
    }
}
