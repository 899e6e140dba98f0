//! MiniJinja template registry.

use minijinja::{path_loader, AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use rho_core::{Config, RenderError, TemplateRenderer};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Layouts from one directory, partials from another
pub struct TemplateRegistry {
    env: Environment<'static>,
    partials_dir: PathBuf,
}

impl TemplateRegistry {
    pub fn new(
        layouts_dir: impl Into<PathBuf>,
        partials_dir: impl Into<PathBuf>,
    ) -> Result<Self, RenderError> {
        let layouts_dir = layouts_dir.into();
        let mut env = Environment::new();
        env.set_loader(path_loader(&layouts_dir));
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        // Page bodies arrive as rendered HTML
        env.set_auto_escape_callback(|_| AutoEscape::None);

        let mut registry = Self {
            env,
            partials_dir: partials_dir.into(),
        };
        registry.load_partials()?;
        Ok(registry)
    }

    pub fn from_config(config: &Config) -> Result<Self, RenderError> {
        Self::new(config.layouts_dir(), config.partials_dir())
    }

    /// Register every partial under its relative path and its file stem
    fn load_partials(&mut self) -> Result<usize, RenderError> {
        if !self.partials_dir.is_dir() {
            tracing::debug!("No partials directory at {:?}", self.partials_dir);
            return Ok(0);
        }

        let mut count = 0;
        for entry in WalkDir::new(&self.partials_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| RenderError::Load(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let source = fs::read_to_string(path)
                .map_err(|e| RenderError::Load(format!("{:?}: {}", path, e)))?;
            let rel = path
                .strip_prefix(&self.partials_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let stem = rel
                .rsplit_once('.')
                .map(|(stem, _)| stem.to_string())
                .unwrap_or_else(|| rel.clone());

            for name in [rel.clone(), stem] {
                self.env
                    .add_template_owned(name.clone(), source.clone())
                    .map_err(|e| template_error(&name, e))?;
            }
            count += 1;
        }

        tracing::debug!("Registered {} partials", count);
        Ok(count)
    }
}

fn template_error(name: &str, err: minijinja::Error) -> RenderError {
    if err.kind() == ErrorKind::TemplateNotFound {
        return RenderError::NotFound {
            name: name.to_string(),
        };
    }
    RenderError::Template {
        name: name.to_string(),
        message: err.to_string(),
    }
}

impl TemplateRenderer for TemplateRegistry {
    fn render_layout(&self, layout: &str, context: &Value) -> Result<String, RenderError> {
        let template = self
            .env
            .get_template(layout)
            .map_err(|e| template_error(layout, e))?;
        template.render(context).map_err(|e| template_error(layout, e))
    }

    fn render_source(
        &self,
        name: &str,
        source: &str,
        context: &Value,
    ) -> Result<String, RenderError> {
        self.env
            .render_named_str(name, source, context)
            .map_err(|e| template_error(name, e))
    }

    fn reload(&mut self) -> Result<(), RenderError> {
        self.env.clear_templates();
        let count = self.load_partials()?;
        tracing::info!("Reloaded templates ({} partials)", count);
        Ok(())
    }

    fn reconfigure(&mut self, config: &Config) -> Result<(), RenderError> {
        *self = Self::from_config(config)?;
        tracing::info!("Loaded templates from {:?}", config.layouts_dir());
        Ok(())
    }
}
