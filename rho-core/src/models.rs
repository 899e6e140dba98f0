//! Content model structs for pages, routes, and build results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Validated frontmatter metadata from a markdown entrypoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    /// Date as written in the source (TOML datetimes are stringified)
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub layout: Option<String>,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub draft: bool,
}

/// Kind of entrypoint, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrypointKind {
    Markdown,
    Html,
    Xml,
}

impl EntrypointKind {
    pub fn from_path(path: &str) -> Option<Self> {
        if path.ends_with(".md") {
            Some(EntrypointKind::Markdown)
        } else if path.ends_with(".html") {
            Some(EntrypointKind::Html)
        } else if path.ends_with(".xml") {
            Some(EntrypointKind::Xml)
        } else {
            None
        }
    }
}

/// One route variant produced by a fan-out capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugCount {
    pub slug: String,
    /// Caller-defined auxiliary number (e.g. how many posts carry a tag)
    pub count: usize,
}

/// Template variable bag
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// The unit of rendering
#[derive(Debug, Clone)]
pub struct Page {
    /// Content-relative path that was dequeued
    pub input_uri: String,

    /// Content-relative path of the route's entrypoint
    pub entrypoint_uri: String,

    /// Output-relative path, rewritten once per fan-out variant
    pub output_uri: String,

    pub content_class: Option<String>,

    pub variables: Variables,
}

/// Summary of a post, as handed to page logic and templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Content-relative path of the post entrypoint
    pub uri: String,
    /// Route-part of the post's output URI
    pub slug: String,
    /// Output URI of the post
    pub url: String,
    pub frontmatter: Frontmatter,
    /// `YYYY.MM.DD`, empty when the date cannot be read
    pub date_nice: String,
}

/// What happened to a single queued file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Entrypoint rendered to these output URIs
    Rendered(Vec<String>),
    /// Satellite copied to this output URI
    Copied(String),
    /// Cache entry is at least as new as the file
    Cached,
    /// Excluded by naming rules, drafts, or a logic module
    Skipped,
}

/// Tally of a scheduler drain
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    pub processed: usize,
    pub rendered_pages: usize,
    pub copied: usize,
    pub cached: usize,
    pub skipped: usize,
    /// Per-file failures that did not abort the run
    pub failures: Vec<(PathBuf, String)>,
}

impl DrainReport {
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        self.processed += 1;
        match outcome {
            ProcessOutcome::Rendered(pages) => self.rendered_pages += pages.len(),
            ProcessOutcome::Copied(_) => self.copied += 1,
            ProcessOutcome::Cached => self.cached += 1,
            ProcessOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn record_failure(&mut self, path: PathBuf, message: String) {
        self.processed += 1;
        self.failures.push((path, message));
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
