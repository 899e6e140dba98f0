//! Site building logic - turns one queued content file into output files.

use crate::cache::{modified_millis, BuildCache, CacheError};
use crate::config::{ClassConfig, Config};
use crate::entrypoint::{Entrypoint, EntrypointResolver, NoEntrypointError, ResolveError};
use crate::fanout;
use crate::frontmatter::{self, FrontmatterError};
use crate::logic::{
    logic_path, logic_target, misnamed_logic_module, LogicContext, LogicError, LogicRegistry,
    NoLogic, PageLogic,
};
use crate::markdown::MarkdownProcessor;
use crate::models::{EntrypointKind, Frontmatter, Page, ProcessOutcome, Variables};
use crate::render::{RenderError, TemplateRenderer};
use crate::uri::{first_segment, UriTransformer};
use crate::walk::{is_excluded, Walker};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    NoEntrypoint(#[from] NoEntrypointError),

    #[error("Logic module {module:?} has no content file {target:?}")]
    OrphanedLogicModule { module: PathBuf, target: PathBuf },

    #[error("Did you mean to name {module:?} as {suggestion:?}?")]
    MisnamedLogicModule { module: PathBuf, suggestion: PathBuf },

    #[error("IO error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),

    #[error("Failed to render {file:?}: {source}")]
    Render { file: PathBuf, source: RenderError },

    #[error("Page logic failed for {file:?}: {source}")]
    Logic { file: PathBuf, source: LogicError },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Failed to walk content: {0}")]
    Walk(#[from] walkdir::Error),
}

impl BuildError {
    /// Fatal errors abort the whole run; the rest only fail their own file
    pub fn is_fatal(&self) -> bool {
        match self {
            BuildError::OrphanedLogicModule { .. } => true,
            BuildError::Io { source, .. } => source.kind() != io::ErrorKind::NotFound,
            BuildError::Cache(_) | BuildError::Walk(_) => true,
            BuildError::NoEntrypoint(_)
            | BuildError::MisnamedLogicModule { .. }
            | BuildError::Frontmatter(_)
            | BuildError::Render { .. }
            | BuildError::Logic { .. } => false,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        BuildError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<ResolveError> for BuildError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoEntrypoint(e) => BuildError::NoEntrypoint(e),
            ResolveError::Io { path, source } => BuildError::Io { path, source },
        }
    }
}

/// Switches for a build run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Consult and update the build cache
    pub use_cache: bool,
    /// Write output files; off for validation-only runs
    pub write: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            write: true,
        }
    }
}

/// Everything a build needs, owned in one place
pub struct BuildContext<R> {
    config: Config,
    walker: Walker,
    resolver: EntrypointResolver,
    transformer: UriTransformer,
    renderer: R,
    logic: LogicRegistry,
    cache: BuildCache,
    markdown: MarkdownProcessor,
    options: BuildOptions,
}

impl<R: TemplateRenderer> BuildContext<R> {
    pub fn new(config: Config, renderer: R, options: BuildOptions) -> Self {
        let cache = if options.use_cache {
            BuildCache::load(config.cache_file())
        } else {
            BuildCache::new(config.cache_file())
        };

        Self {
            walker: Walker::new(config.content_dir(), &config.ignore_patterns),
            resolver: EntrypointResolver::new(config.content_dir()),
            transformer: UriTransformer::from_config(&config),
            renderer,
            logic: LogicRegistry::new(),
            cache,
            markdown: MarkdownProcessor::new(),
            options,
            config,
        }
    }

    /// Replace the page logic registry
    pub fn with_logic(mut self, logic: LogicRegistry) -> Self {
        self.logic = logic;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }

    pub fn content_dir(&self) -> &Path {
        self.resolver.content_dir()
    }

    /// Every file below the content root, in walk order
    pub fn content_files(&self) -> Result<Vec<PathBuf>, BuildError> {
        Ok(self.walker.files()?)
    }

    /// Whether a full walk would pick up `path`
    pub fn admits(&self, path: &Path) -> bool {
        self.walker.admits(&self.resolver.relative_uri(path))
    }

    /// Re-read templates and forget cached modification times
    pub fn reload(&mut self) -> Result<(), RenderError> {
        self.renderer.reload()?;
        self.cache.clear();
        Ok(())
    }

    /// Switch to a freshly loaded configuration.
    ///
    /// Paths, classes and ignore patterns are rebuilt from `config`, the
    /// renderer is pointed at the new template directories and every cache
    /// entry is dropped.
    pub fn reconfigure(&mut self, config: Config) -> Result<(), RenderError> {
        self.renderer.reconfigure(&config)?;
        self.walker = Walker::new(config.content_dir(), &config.ignore_patterns);
        self.resolver = EntrypointResolver::new(config.content_dir());
        self.transformer = UriTransformer::from_config(&config);
        self.cache = BuildCache::new(config.cache_file());
        self.config = config;
        Ok(())
    }

    /// Process one file from the content tree
    pub fn process(&mut self, path: &Path) -> Result<ProcessOutcome, BuildError> {
        let uri = self.resolver.relative_uri(path);
        if is_excluded(&uri) {
            tracing::debug!("Skipping excluded {}", uri);
            return Ok(ProcessOutcome::Skipped);
        }

        let entry = self.resolver.resolve_strict(path)?;

        if let Some(target) = logic_target(path) {
            if !target.exists() {
                return Err(BuildError::OrphanedLogicModule {
                    module: path.to_path_buf(),
                    target,
                });
            }
            tracing::debug!("Skipping logic module {}", uri);
            return Ok(ProcessOutcome::Skipped);
        }

        if let Some(suggestion) = misnamed_logic_module(path) {
            return Err(BuildError::MisnamedLogicModule {
                module: path.to_path_buf(),
                suggestion,
            });
        }

        if entry.path != path {
            return self.copy_satellite(path, &uri, &entry);
        }

        self.build_entrypoint(&entry)
    }

    fn copy_satellite(
        &mut self,
        path: &Path,
        uri: &str,
        entry: &Entrypoint,
    ) -> Result<ProcessOutcome, BuildError> {
        // The output location follows the entrypoint's route slug
        let own = modified_millis(path).map_err(|e| BuildError::io(path, e))?;
        let modified = own.max(self.entrypoint_modified(entry)?);
        if self.is_cached(uri, modified) {
            tracing::debug!("Cached {}", uri);
            return Ok(ProcessOutcome::Cached);
        }

        let logic = self.load_logic_lenient(entry);
        let route_slug = self.declared_slug(entry, logic.as_ref());
        let output_uri = self.transformer.output_uri(uri, route_slug.as_deref());

        if self.options.write {
            let dest = self.config.output_dir().join(&output_uri);
            ensure_parent(&dest)?;
            fs::copy(path, &dest).map_err(|e| BuildError::io(path, e))?;
            tracing::debug!("Copied {} -> {}", uri, output_uri);
        }
        self.record(uri, modified)?;

        Ok(ProcessOutcome::Copied(output_uri))
    }

    fn build_entrypoint(&mut self, entry: &Entrypoint) -> Result<ProcessOutcome, BuildError> {
        let modified = self.entrypoint_modified(entry)?;
        if self.is_cached(&entry.uri, modified) {
            tracing::debug!("Cached {}", entry.uri);
            return Ok(ProcessOutcome::Cached);
        }

        let outputs = match EntrypointKind::from_path(&entry.uri) {
            Some(kind) => match self.render_entrypoint(entry, kind)? {
                Some(outputs) => outputs,
                None => return Ok(ProcessOutcome::Skipped),
            },
            None => {
                let logic = self.load_logic_lenient(entry);
                let route_slug = self.declared_slug(entry, logic.as_ref());
                let output_uri = self
                    .transformer
                    .output_uri(&entry.uri, route_slug.as_deref());
                let bytes = fs::read(&entry.path).map_err(|e| BuildError::io(&entry.path, e))?;
                vec![(output_uri, bytes)]
            }
        };

        let mut written = Vec::with_capacity(outputs.len());
        for (output_uri, contents) in outputs {
            if self.options.write {
                let dest = self.config.output_dir().join(&output_uri);
                ensure_parent(&dest)?;
                fs::write(&dest, contents).map_err(|e| BuildError::io(&dest, e))?;
                tracing::debug!("Wrote {} -> {}", entry.uri, output_uri);
            }
            written.push(output_uri);
        }
        self.record(&entry.uri, modified)?;

        Ok(ProcessOutcome::Rendered(written))
    }

    /// Render every page of an entrypoint; `None` when it is a draft
    fn render_entrypoint(
        &self,
        entry: &Entrypoint,
        kind: EntrypointKind,
    ) -> Result<Option<Vec<(String, Vec<u8>)>>, BuildError> {
        let logic_err = |source| BuildError::Logic {
            file: entry.path.clone(),
            source,
        };
        let render_err = |source| BuildError::Render {
            file: entry.path.clone(),
            source,
        };

        let logic = self.logic.load(entry).map_err(logic_err)?;
        let meta = logic.meta().unwrap_or_default();
        let class = self.class_of(&entry.uri);
        let source = fs::read_to_string(&entry.path).map_err(|e| BuildError::io(&entry.path, e))?;

        let (frontmatter, body) = if kind == EntrypointKind::Markdown {
            let (fm, body) =
                frontmatter::parse(&source, class, &self.config.frontmatter, &entry.path)?;
            if fm.draft {
                tracing::debug!("Skipping draft {}", entry.uri);
                return Ok(None);
            }
            (fm, body)
        } else {
            (Frontmatter::default(), source)
        };

        let route_slug = meta.slug.clone().or_else(|| frontmatter.slug.clone());
        let base = Page {
            input_uri: entry.uri.clone(),
            entrypoint_uri: entry.uri.clone(),
            output_uri: self
                .transformer
                .output_uri(&entry.uri, route_slug.as_deref()),
            content_class: class.map(|c| c.name.clone()),
            variables: Variables::new(),
        };

        let ctx = LogicContext::new(&self.config, &self.resolver, &self.transformer);
        let pages = fanout::expand(base, logic.as_ref(), &ctx).map_err(logic_err)?;

        let layout = frontmatter
            .layout
            .clone()
            .or(meta.layout)
            .or_else(|| class.and_then(|c| c.layout.clone()))
            .unwrap_or_else(|| self.config.layout.clone());

        let mut outputs = Vec::with_capacity(pages.len());
        match kind {
            EntrypointKind::Markdown => {
                let body_html = self.markdown.convert(&body);
                let title = frontmatter
                    .title
                    .clone()
                    .unwrap_or_else(|| self.config.site.title.clone());
                let fm_value = serde_json::to_value(&frontmatter).map_err(|e| {
                    logic_err(LogicError::Serialize(e))
                })?;

                for page in pages {
                    let mut vars = self.page_context(&page);
                    vars.insert("title".into(), Value::String(title.clone()));
                    vars.insert("body".into(), Value::String(body_html.clone()));
                    vars.insert("frontmatter".into(), fm_value.clone());

                    let html = self
                        .renderer
                        .render_layout(&layout, &Value::Object(vars))
                        .map_err(render_err)?;
                    outputs.push((page.output_uri, html.into_bytes()));
                }
            }
            EntrypointKind::Html => {
                let header = logic.header(&ctx).map_err(logic_err)?.unwrap_or_default();
                let header_title = header
                    .title
                    .unwrap_or_else(|| self.config.site.title.clone());
                let header_content = header.content.unwrap_or_default();

                for page in pages {
                    let vars = self.page_context(&page);
                    let inner = self
                        .renderer
                        .render_source(&entry.uri, &body, &Value::Object(vars.clone()))
                        .map_err(render_err)?;

                    let mut vars = vars;
                    vars.insert("body".into(), Value::String(inner));
                    vars.insert("header_title".into(), Value::String(header_title.clone()));
                    vars.insert(
                        "header_content".into(),
                        Value::String(header_content.clone()),
                    );

                    let html = self
                        .renderer
                        .render_layout(&layout, &Value::Object(vars))
                        .map_err(render_err)?;
                    outputs.push((page.output_uri, html.into_bytes()));
                }
            }
            EntrypointKind::Xml => {
                for page in pages {
                    let vars = self.page_context(&page);
                    let xml = self
                        .renderer
                        .render_source(&entry.uri, &body, &Value::Object(vars))
                        .map_err(render_err)?;
                    outputs.push((page.output_uri, xml.into_bytes()));
                }
            }
        }

        Ok(Some(outputs))
    }

    /// Page variables plus the keys every template can rely on
    fn page_context(&self, page: &Page) -> Variables {
        let mut vars = page.variables.clone();
        vars.insert("input_uri".into(), Value::String(page.input_uri.clone()));
        vars.insert("output_uri".into(), Value::String(page.output_uri.clone()));
        vars.insert(
            "site".into(),
            serde_json::json!({
                "title": self.config.site.title,
                "author": self.config.site.author,
            }),
        );
        vars
    }

    fn class_of(&self, uri: &str) -> Option<&ClassConfig> {
        first_segment(uri).and_then(|name| self.config.class(name))
    }

    /// Newest modification time of an entrypoint and its logic module
    fn entrypoint_modified(&self, entry: &Entrypoint) -> Result<u64, BuildError> {
        let own = modified_millis(&entry.path).map_err(|e| BuildError::io(&entry.path, e))?;
        let logic = modified_millis(&logic_path(&entry.path)).unwrap_or(0);
        Ok(own.max(logic))
    }

    fn is_cached(&self, uri: &str, modified: u64) -> bool {
        self.options.use_cache && self.cache.is_fresh(uri, modified)
    }

    fn record(&mut self, uri: &str, modified: u64) -> Result<(), BuildError> {
        if self.options.use_cache && self.options.write {
            self.cache.put(uri, modified);
            self.cache.flush()?;
        }
        Ok(())
    }

    fn load_logic_lenient(&self, entry: &Entrypoint) -> Arc<dyn PageLogic> {
        self.logic.load(entry).unwrap_or_else(|err| {
            tracing::debug!("Ignoring broken logic for {}: {}", entry.uri, err);
            Arc::new(NoLogic)
        })
    }

    /// Route slug declared by logic or frontmatter, read without validation
    fn declared_slug(&self, entry: &Entrypoint, logic: &dyn PageLogic) -> Option<String> {
        if let Some(slug) = logic.meta().and_then(|m| m.slug) {
            return Some(slug);
        }
        if EntrypointKind::from_path(&entry.uri) != Some(EntrypointKind::Markdown) {
            return None;
        }
        let source = fs::read_to_string(&entry.path).ok()?;
        let (table, _) = frontmatter::extract(&source, &entry.path).ok()?;
        table?.get("slug")?.as_str().map(String::from)
    }

    /// Output URI -> input URI for everything the content tree would produce
    pub fn content_map(&self) -> Result<BTreeMap<String, String>, BuildError> {
        let mut map = BTreeMap::new();
        let ctx = LogicContext::new(&self.config, &self.resolver, &self.transformer);

        for path in self.content_files()? {
            let uri = self.resolver.relative_uri(&path);
            if is_excluded(&uri)
                || logic_target(&path).is_some()
                || misnamed_logic_module(&path).is_some()
            {
                continue;
            }
            let Some(entry) = self.resolver.resolve(&path)? else {
                continue;
            };

            let logic = self.load_logic_lenient(&entry);
            let route_slug = self.declared_slug(&entry, logic.as_ref());
            let output_uri = self.transformer.output_uri(&uri, route_slug.as_deref());

            if entry.path != path {
                map.insert(output_uri, uri);
                continue;
            }

            let base = Page {
                input_uri: uri.clone(),
                entrypoint_uri: uri.clone(),
                output_uri: output_uri.clone(),
                content_class: None,
                variables: Variables::new(),
            };
            match fanout::expand(base, logic.as_ref(), &ctx) {
                Ok(pages) => {
                    for page in pages {
                        map.insert(page.output_uri, uri.clone());
                    }
                }
                Err(err) => {
                    tracing::debug!("Fan-out failed for {}: {}", uri, err);
                    map.insert(output_uri, uri);
                }
            }
        }

        Ok(map)
    }
}

fn ensure_parent(path: &Path) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    Ok(())
}
