//! Page logic: optional per-entrypoint capabilities.
//!
//! An entrypoint may carry logic that picks its route slug and layout, fills
//! the site header, fans the route out into several pages, and supplies
//! template variables. Logic comes from two places:
//!
//! - Rust implementations of [`PageLogic`] registered in a [`LogicRegistry`]
//! - declarative sidecar modules named `<entrypoint file>.rho.toml`
//!
//! ```toml
//! posts = true
//!
//! [meta]
//! layout = "wide.html"
//!
//! [header]
//! title = "Tags"
//!
//! [variables]
//! intro = "Posts grouped by tag."
//!
//! [routes]
//! taxonomy = "tags"
//! ```

use crate::config::Config;
use crate::entrypoint::{Entrypoint, EntrypointResolver, ResolveError};
use crate::frontmatter::{self, FrontmatterError};
use crate::models::{EntrypointKind, PostSummary, SlugCount, Variables};
use crate::slug::slugify;
use crate::uri::UriTransformer;
use crate::walk::{is_excluded, Walker};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// File name suffix of a declarative logic module
pub const LOGIC_SUFFIX: &str = ".rho.toml";

/// Content class whose entrypoints are listed by [`LogicContext::posts`]
pub const POSTS_CLASS: &str = "posts";

#[derive(Error, Debug)]
pub enum LogicError {
    #[error("Invalid logic module {file:?}: {source}")]
    Parse {
        file: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Failed to walk posts: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to serialize template variables: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Route and layout overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Meta {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
}

/// Site header shown by HTML entrypoint layouts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Header {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Which fan-out variant variables are requested for
///
/// Both fields are `None` for a route that was not fanned out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlugArgs {
    pub slug: Option<String>,
    pub count: Option<usize>,
}

impl From<&SlugCount> for SlugArgs {
    fn from(sc: &SlugCount) -> Self {
        Self {
            slug: Some(sc.slug.clone()),
            count: Some(sc.count),
        }
    }
}

/// Optional capabilities of an entrypoint.
///
/// Every method has a default that reports the capability as absent, so an
/// implementation only overrides what it provides.
pub trait PageLogic: Send + Sync {
    fn meta(&self) -> Option<Meta> {
        None
    }

    fn header(&self, _ctx: &LogicContext<'_>) -> Result<Option<Header>, LogicError> {
        Ok(None)
    }

    /// One entry per page the route should fan out into
    fn generate_slug_mapping(
        &self,
        _ctx: &LogicContext<'_>,
    ) -> Result<Option<Vec<SlugCount>>, LogicError> {
        Ok(None)
    }

    fn generate_template_variables(
        &self,
        _ctx: &LogicContext<'_>,
        _args: &SlugArgs,
    ) -> Result<Option<Variables>, LogicError> {
        Ok(None)
    }
}

/// Logic for entrypoints that have none
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogic;

impl PageLogic for NoLogic {}

/// Read-only view of the build handed to page logic
pub struct LogicContext<'a> {
    config: &'a Config,
    resolver: &'a EntrypointResolver,
    transformer: &'a UriTransformer,
    posts: OnceCell<Vec<PostSummary>>,
}

impl<'a> LogicContext<'a> {
    pub fn new(
        config: &'a Config,
        resolver: &'a EntrypointResolver,
        transformer: &'a UriTransformer,
    ) -> Self {
        Self {
            config,
            resolver,
            transformer,
            posts: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn transformer(&self) -> &UriTransformer {
        self.transformer
    }

    /// Every published post, sorted by date ascending.
    ///
    /// Collected on first use and kept for the lifetime of the context.
    pub fn posts(&self) -> Result<&[PostSummary], LogicError> {
        if let Some(posts) = self.posts.get() {
            return Ok(posts.as_slice());
        }
        let posts = self.collect_posts()?;
        Ok(self.posts.get_or_init(|| posts).as_slice())
    }

    fn collect_posts(&self) -> Result<Vec<PostSummary>, LogicError> {
        let posts_dir = self.resolver.content_dir().join(POSTS_CLASS);
        let class = self.config.class(POSTS_CLASS);
        let walker = Walker::new(&posts_dir, &self.config.ignore_patterns);

        let mut posts = Vec::new();
        for path in walker.files()? {
            let uri = self.resolver.relative_uri(&path);
            if is_excluded(&uri) || EntrypointKind::from_path(&uri) != Some(EntrypointKind::Markdown)
            {
                continue;
            }

            // Only the entrypoint of each post directory counts
            match self.resolver.resolve(&path)? {
                Some(entry) if entry.path == path => {}
                _ => continue,
            }

            let source = fs::read_to_string(&path).map_err(|source| LogicError::Io {
                path: path.clone(),
                source,
            })?;
            let (fm, _) =
                frontmatter::parse(&source, class, &self.config.frontmatter, &path)?;
            if fm.draft {
                continue;
            }

            let slug = fm
                .slug
                .clone()
                .unwrap_or_else(|| self.transformer.default_route_part(&uri));
            let url = self.transformer.output_uri(&uri, Some(&slug));
            let date_nice = fm.date.as_deref().map(nice_date).unwrap_or_default();

            posts.push(PostSummary {
                uri,
                slug,
                url,
                frontmatter: fm,
                date_nice,
            });
        }

        posts.sort_by(|a, b| a.frontmatter.date.cmp(&b.frontmatter.date));
        tracing::debug!("Collected {} posts", posts.len());
        Ok(posts)
    }
}

/// `2020-03-14` (or a full datetime) as `2020.03.14`; empty when unreadable
fn nice_date(date: &str) -> String {
    let Some(day) = date.get(..10) else {
        return String::new();
    };
    let bytes = day.as_bytes();
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if shape_ok {
        day.replace('-', ".")
    } else {
        String::new()
    }
}

/// Path of the content file a logic module belongs to
pub fn logic_target(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let target = name.strip_suffix(LOGIC_SUFFIX)?;
    if target.is_empty() {
        return None;
    }
    Some(path.with_file_name(target))
}

/// Suggested logic module name for a near miss such as `about.html.toml`
pub fn misnamed_logic_module(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(LOGIC_SUFFIX) {
        return None;
    }
    let target = name.strip_suffix(".toml")?;
    let (stem, ext) = target.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(path.with_file_name(format!("{}{}", target, LOGIC_SUFFIX)))
}

/// Sidecar logic module path for an entrypoint file
pub fn logic_path(entrypoint: &Path) -> PathBuf {
    let mut name = entrypoint
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(LOGIC_SUFFIX);
    entrypoint.with_file_name(name)
}

/// Page logic keyed by entrypoint URI, with sidecar modules as fallback
#[derive(Clone, Default)]
pub struct LogicRegistry {
    modules: HashMap<String, Arc<dyn PageLogic>>,
}

impl LogicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach logic to the entrypoint at content-relative `uri`
    pub fn register(&mut self, uri: impl Into<String>, logic: Arc<dyn PageLogic>) {
        self.modules.insert(uri.into(), logic);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.modules.contains_key(uri)
    }

    /// Logic for `entry`: registered, then sidecar, then [`NoLogic`]
    pub fn load(&self, entry: &Entrypoint) -> Result<Arc<dyn PageLogic>, LogicError> {
        if let Some(logic) = self.modules.get(&entry.uri) {
            return Ok(Arc::clone(logic));
        }

        let path = logic_path(&entry.path);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Arc::new(NoLogic)),
            Err(source) => return Err(LogicError::Io { path, source }),
        };

        tracing::debug!("Loading logic module {:?}", path);
        let logic: DeclarativeLogic =
            toml::from_str(&source).map_err(|source| LogicError::Parse { file: path, source })?;
        Ok(Arc::new(logic))
    }
}

impl std::fmt::Debug for LogicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Frontmatter list a taxonomy route fans out over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Taxonomy {
    Tags,
    Categories,
}

impl Taxonomy {
    fn terms<'p>(&self, post: &'p PostSummary) -> &'p [String] {
        match self {
            Taxonomy::Tags => &post.frontmatter.tags,
            Taxonomy::Categories => &post.frontmatter.categories,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Routes {
    pub taxonomy: Taxonomy,
}

/// Logic read from a `.rho.toml` sidecar
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarativeLogic {
    /// Inject the sorted post list as `posts`
    #[serde(default)]
    pub posts: bool,

    #[serde(default)]
    pub meta: Option<Meta>,

    #[serde(default)]
    pub header: Option<Header>,

    #[serde(default)]
    pub variables: toml::Table,

    #[serde(default)]
    pub routes: Option<Routes>,
}

impl DeclarativeLogic {
    /// Distinct terms as (slug, term, count), in first-seen order
    fn terms(&self, taxonomy: Taxonomy, posts: &[PostSummary]) -> Vec<(String, String, usize)> {
        let mut terms: Vec<(String, String, usize)> = Vec::new();
        for post in posts {
            for term in taxonomy.terms(post) {
                let slug = slugify(term);
                if slug.is_empty() {
                    continue;
                }
                match terms.iter_mut().find(|(s, _, _)| *s == slug) {
                    Some(entry) => entry.2 += 1,
                    None => terms.push((slug, term.clone(), 1)),
                }
            }
        }
        terms
    }
}

impl PageLogic for DeclarativeLogic {
    fn meta(&self) -> Option<Meta> {
        self.meta.clone()
    }

    fn header(&self, _ctx: &LogicContext<'_>) -> Result<Option<Header>, LogicError> {
        Ok(self.header.clone())
    }

    fn generate_slug_mapping(
        &self,
        ctx: &LogicContext<'_>,
    ) -> Result<Option<Vec<SlugCount>>, LogicError> {
        let Some(routes) = &self.routes else {
            return Ok(None);
        };
        let mapping = self
            .terms(routes.taxonomy, ctx.posts()?)
            .into_iter()
            .map(|(slug, _, count)| SlugCount { slug, count })
            .collect();
        Ok(Some(mapping))
    }

    fn generate_template_variables(
        &self,
        ctx: &LogicContext<'_>,
        args: &SlugArgs,
    ) -> Result<Option<Variables>, LogicError> {
        let mut vars: Variables = self
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), toml_to_json(v)))
            .collect();

        if self.posts {
            vars.insert("posts".into(), serde_json::to_value(ctx.posts()?)?);
        }

        if let (Some(routes), Some(slug)) = (&self.routes, &args.slug) {
            let posts = ctx.posts()?;
            let term = self
                .terms(routes.taxonomy, posts)
                .into_iter()
                .find(|(s, _, _)| s == slug)
                .map(|(_, term, _)| term)
                .unwrap_or_else(|| slug.clone());
            let tagged: Vec<&PostSummary> = posts
                .iter()
                .filter(|p| routes.taxonomy.terms(p).iter().any(|t| slugify(t) == *slug))
                .collect();

            vars.insert("term".into(), Value::String(term));
            vars.insert("slug".into(), Value::String(slug.clone()));
            vars.insert(
                "count".into(),
                Value::from(args.count.unwrap_or(tagged.len())),
            );
            vars.insert("posts".into(), serde_json::to_value(tagged)?);
        }

        Ok(Some(vars))
    }
}

/// TOML values as template values; datetimes become strings
pub fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}
