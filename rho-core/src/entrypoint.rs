//! Entrypoint resolution: which file in a directory represents its route.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("No entrypoint found for file: {file:?}")]
pub struct NoEntrypointError {
    pub file: PathBuf,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    NoEntrypoint(#[from] NoEntrypointError),

    #[error("Failed to inspect {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

const INDEX_CANDIDATES: [&str; 3] = ["index.md", "index.html", "index.xml"];
const ENTRYPOINT_EXTENSIONS: [&str; 3] = ["md", "html", "xml"];

/// The file chosen to represent a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    /// Absolute (or content-dir-joined) path on disk
    pub path: PathBuf,
    /// Path relative to the content root, `/`-separated
    pub uri: String,
}

/// Finds the entrypoint for any file inside the content tree
#[derive(Debug, Clone)]
pub struct EntrypointResolver {
    content_dir: PathBuf,
}

impl EntrypointResolver {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Candidate file names for directory `dir`, in priority order.
    ///
    /// `index.*` always outranks `<dir>.*`, and md > html > xml within each group.
    pub fn candidates(&self, dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = INDEX_CANDIDATES.iter().map(|s| s.to_string()).collect();

        if dir != self.content_dir {
            if let Some(dirname) = dir.file_name().and_then(|n| n.to_str()) {
                for ext in ENTRYPOINT_EXTENSIONS {
                    names.push(format!("{}.{}", dirname, ext));
                }
                names.push(dirname.to_string());
            }
        }

        names
    }

    /// Lenient resolution: `Ok(None)` when the directory has no entrypoint
    pub fn resolve(&self, file: &Path) -> Result<Option<Entrypoint>, ResolveError> {
        let dir = file.parent().unwrap_or(&self.content_dir);

        for name in self.candidates(dir) {
            let candidate = dir.join(&name);
            match candidate.metadata() {
                Ok(meta) if meta.is_file() => {
                    let uri = self.relative_uri(&candidate);
                    return Ok(Some(Entrypoint {
                        path: candidate,
                        uri,
                    }));
                }
                Ok(_) => continue,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(ResolveError::Io {
                        path: candidate,
                        source,
                    })
                }
            }
        }

        Ok(None)
    }

    /// Strict resolution: a directory without an entrypoint is an error
    pub fn resolve_strict(&self, file: &Path) -> Result<Entrypoint, ResolveError> {
        self.resolve(file)?.ok_or_else(|| {
            NoEntrypointError {
                file: file.to_path_buf(),
            }
            .into()
        })
    }

    /// Content-relative, `/`-separated form of `path`
    pub fn relative_uri(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.content_dir).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "x").unwrap();
        path
    }

    #[test]
    fn test_index_md_outranks_dir_md() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "test/test.md");
        touch(dir.path(), "test/index.md");
        let style = touch(dir.path(), "test/style.css");

        let resolver = EntrypointResolver::new(dir.path());
        let entry = resolver.resolve_strict(&style).unwrap();
        assert_eq!(entry.uri, "test/index.md");
    }

    #[test]
    fn test_index_html_outranks_dir_md() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "test/test.md");
        let index = touch(dir.path(), "test/index.html");

        let resolver = EntrypointResolver::new(dir.path());
        assert_eq!(resolver.resolve_strict(&index).unwrap().uri, "test/index.html");
    }

    #[test]
    fn test_extension_order_within_group() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "feed/feed.xml");
        let html = touch(dir.path(), "feed/feed.html");

        let resolver = EntrypointResolver::new(dir.path());
        assert_eq!(resolver.resolve_strict(&html).unwrap().uri, "feed/feed.html");
    }

    #[test]
    fn test_bare_dirname_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let bare = touch(dir.path(), "robots/robots");

        let resolver = EntrypointResolver::new(dir.path());
        assert_eq!(resolver.resolve_strict(&bare).unwrap().uri, "robots/robots");
    }

    #[test]
    fn test_root_only_considers_index() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = EntrypointResolver::new(dir.path());

        let candidates = resolver.candidates(dir.path());
        assert_eq!(candidates, vec!["index.md", "index.html", "index.xml"]);
    }

    #[test]
    fn test_lenient_and_strict_missing_entrypoint() {
        let dir = tempfile::tempdir().unwrap();
        let logic = touch(dir.path(), "index.html.rho.toml");

        let resolver = EntrypointResolver::new(dir.path());
        assert!(resolver.resolve(&logic).unwrap().is_none());
        assert!(matches!(
            resolver.resolve_strict(&logic),
            Err(ResolveError::NoEntrypoint(NoEntrypointError { .. }))
        ));
    }

    #[test]
    fn test_directory_named_like_candidate_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("index.md")).unwrap();
        let html = touch(dir.path(), "index.html");

        let resolver = EntrypointResolver::new(dir.path());
        assert_eq!(resolver.resolve_strict(&html).unwrap().uri, "index.html");
    }
}
