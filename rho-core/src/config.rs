//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Main configuration struct matching the rho.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    /// Layout used when neither the page nor its content class picks one
    #[serde(default = "default_layout")]
    pub layout: String,

    #[serde(default = "default_classes")]
    pub classes: Vec<ClassConfig>,

    #[serde(default)]
    pub frontmatter: FrontmatterRules,

    /// Historical URL migrations, applied in order as literal replacements
    #[serde(default)]
    pub redirects: Vec<Redirect>,

    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    #[serde(default)]
    pub server: ServerConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_layout() -> String {
    String::from("default.html")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub author: String,
}

fn default_title() -> String {
    String::from("Website")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            author: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_content")]
    pub content: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_layouts")]
    pub layouts: PathBuf,
    #[serde(default = "default_partials")]
    pub partials: PathBuf,
    #[serde(default = "default_static")]
    pub r#static: PathBuf,
    #[serde(default = "default_cache")]
    pub cache: PathBuf,
}

fn default_content() -> PathBuf {
    PathBuf::from("content")
}

fn default_output() -> PathBuf {
    PathBuf::from("build")
}

fn default_layouts() -> PathBuf {
    PathBuf::from("layouts")
}

fn default_partials() -> PathBuf {
    PathBuf::from("partials")
}

fn default_static() -> PathBuf {
    PathBuf::from("static")
}

fn default_cache() -> PathBuf {
    PathBuf::from(".cache/cache.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: default_content(),
            output: default_output(),
            layouts: default_layouts(),
            partials: default_partials(),
            r#static: default_static(),
            cache: default_cache(),
        }
    }
}

/// How a content class directory shows up in output URIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixMode {
    /// `pages/about/about.md` -> `about/about.md`
    Strip,
    /// `posts/2020/hello/hello.md` -> `posts/hello/hello.md`
    Collapse,
    #[default]
    Keep,
}

/// A top-level content category (first path segment under the content root)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConfig {
    pub name: String,

    #[serde(default)]
    pub prefix: PrefixMode,

    /// Frontmatter keys every entrypoint of this class must carry
    #[serde(default)]
    pub required: Vec<String>,

    #[serde(default)]
    pub layout: Option<String>,
}

fn default_classes() -> Vec<ClassConfig> {
    vec![
        ClassConfig {
            name: "pages".into(),
            prefix: PrefixMode::Strip,
            required: vec![],
            layout: None,
        },
        ClassConfig {
            name: "posts".into(),
            prefix: PrefixMode::Collapse,
            required: vec!["title".into(), "author".into(), "date".into()],
            layout: Some("markdown.html".into()),
        },
        ClassConfig {
            name: "notes".into(),
            prefix: PrefixMode::Keep,
            required: vec![],
            layout: None,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontmatterRules {
    #[serde(default = "default_allowed_keys")]
    pub allowed: Vec<String>,
}

fn default_allowed_keys() -> Vec<String> {
    [
        "title",
        "author",
        "date",
        "layout",
        "slug",
        "categories",
        "tags",
        "draft",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

impl Default for FrontmatterRules {
    fn default() -> Self {
        Self {
            allowed: default_allowed_keys(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            paths: PathsConfig::default(),
            layout: default_layout(),
            classes: default_classes(),
            frontmatter: FrontmatterRules::default(),
            redirects: Vec::new(),
            ignore_patterns: Vec::new(),
            server: ServerConfig::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Load the config file if it exists, otherwise default settings rooted next to it
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        tracing::debug!("No config at {:?}, using defaults", path);
        Ok(Self {
            config_path: Some(path.to_path_buf()),
            ..Self::default()
        })
    }

    /// Default settings with every relative path resolved against `root`
    /// File this configuration was loaded from (or would be)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            config_path: Some(root.as_ref().join("rho.yml")),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.ignore_patterns {
            regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.layouts)
    }

    pub fn partials_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.partials)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.r#static)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.resolve_path(&self.paths.cache)
    }

    /// Look up a content class by directory name
    pub fn class(&self, name: &str) -> Option<&ClassConfig> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}
