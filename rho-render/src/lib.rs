//! # rho-render
//!
//! Template rendering library for rho.
//!
//! Layouts and page sources are rendered with MiniJinja. Layouts are loaded
//! by file name from the layouts directory, partials are registered from the
//! partials directory so any template can `{% include %}` them.

pub mod templates;

pub use templates::TemplateRegistry;
