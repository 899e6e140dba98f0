//! # rho-core
//!
//! Core library for the rho static site generator.
//!
//! This crate turns a content tree into an output tree: it resolves
//! entrypoints, maps input paths to pretty output URIs, runs per-page logic,
//! and drives incremental builds through a file queue and a persistent
//! modification-time cache. Template engines plug in through
//! [`TemplateRenderer`].

pub mod builder;
pub mod cache;
pub mod config;
pub mod entrypoint;
pub mod fanout;
pub mod frontmatter;
pub mod logic;
pub mod markdown;
pub mod models;
pub mod queue;
pub mod render;
pub mod slug;
pub mod uri;
pub mod walk;

pub use builder::{BuildContext, BuildError, BuildOptions};
pub use cache::BuildCache;
pub use config::Config;
pub use entrypoint::{Entrypoint, EntrypointResolver, NoEntrypointError};
pub use logic::{
    DeclarativeLogic, Header, LogicContext, LogicError, LogicRegistry, Meta, PageLogic, SlugArgs,
};
pub use models::{
    DrainReport, EntrypointKind, Frontmatter, Page, PostSummary, ProcessOutcome, SlugCount,
    Variables,
};
pub use queue::{FileQueue, Scheduler, SchedulerEvent};
pub use render::{RenderError, TemplateRenderer};
pub use slug::slugify;
pub use uri::UriTransformer;
