//! Persistent modification-time cache keyed by content URI.
//!
//! On disk the cache is a JSON object:
//!
//! ```json
//! { "posts/2020/hello/hello.md": { "lastModified": 1700000000000 } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to write cache {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct CacheEntry {
    #[serde(rename = "lastModified")]
    last_modified: u64,
}

/// In-memory cache map mirrored to a JSON file
#[derive(Debug, Clone)]
pub struct BuildCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl BuildCache {
    /// Empty cache that will flush to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache file; a missing or unreadable file yields an empty cache
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Self::new(path),
            Err(err) => {
                tracing::warn!("Failed to read cache {:?}: {}", path, err);
                return Self::new(path);
            }
        };

        match serde_json::from_slice::<BTreeMap<String, CacheEntry>>(&data) {
            Ok(entries) => {
                tracing::debug!("Loaded {} cache entries from {:?}", entries.len(), path);
                Self { path, entries }
            }
            Err(err) => {
                tracing::warn!("Failed to parse cache {:?}, starting empty: {}", path, err);
                Self::new(path)
            }
        }
    }

    pub fn get(&self, uri: &str) -> Option<u64> {
        self.entries.get(uri).map(|e| e.last_modified)
    }

    pub fn put(&mut self, uri: impl Into<String>, last_modified: u64) {
        self.entries
            .insert(uri.into(), CacheEntry { last_modified });
    }

    pub fn invalidate(&mut self, uri: &str) {
        self.entries.remove(uri);
    }

    /// Forget every entry (the file is rewritten on the next flush)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `uri` was recorded at or after `modified`
    pub fn is_fresh(&self, uri: &str, modified: u64) -> bool {
        self.get(uri).is_some_and(|cached| cached >= modified)
    }

    /// Write the whole map to a temp file, then rename it over the cache file
    pub fn flush(&self) -> Result<(), CacheError> {
        let write_err = |source| CacheError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let json = serde_json::to_vec_pretty(&self.entries)?;
        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

/// Modification time of `path` in milliseconds since the epoch
pub fn modified_millis(path: &Path) -> io::Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Ok(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BuildCache::load(dir.path().join("cache.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(BuildCache::load(&path).is_empty());
    }

    #[test]
    fn test_flush_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cache/cache.json");

        let mut cache = BuildCache::new(&path);
        cache.put("index.html", 42);
        cache.put("posts/a/a.md", 7);
        cache.flush().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["index.html"]["lastModified"], 42);
        assert!(!path.with_file_name("cache.json.tmp").exists());

        let loaded = BuildCache::load(&path);
        assert_eq!(loaded.get("index.html"), Some(42));
        assert_eq!(loaded.get("posts/a/a.md"), Some(7));
    }

    #[test]
    fn test_freshness() {
        let mut cache = BuildCache::new("unused.json");
        cache.put("a.md", 100);
        assert!(cache.is_fresh("a.md", 100));
        assert!(cache.is_fresh("a.md", 99));
        assert!(!cache.is_fresh("a.md", 101));
        assert!(!cache.is_fresh("b.md", 0));

        cache.invalidate("a.md");
        assert!(cache.get("a.md").is_none());

        cache.put("c.md", 1);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_modified_millis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "x").unwrap();
        assert!(modified_millis(&path).unwrap() > 0);
        assert_eq!(
            modified_millis(&dir.path().join("missing")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
