//! Content tree enumeration and naming-based exclusion rules.

use regex::Regex;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Recursive, deterministic file listing below a root directory
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    ignore: Vec<Regex>,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>, ignore_patterns: &[String]) -> Self {
        Self {
            root: root.into(),
            ignore: compile_ignore_patterns(ignore_patterns),
        }
    }

    /// All files below the root, sorted by path, skipping hidden entries and
    /// anything matching an ignore pattern.
    pub fn files(&self) -> Result<Vec<PathBuf>, walkdir::Error> {
        if !self.root.exists() {
            tracing::warn!("Content directory {:?} does not exist", self.root);
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            if !self.admits(&rel) {
                tracing::debug!("Ignoring {}", rel);
                continue;
            }

            files.push(entry.into_path());
        }

        Ok(files)
    }

    /// Whether the walk would list the root-relative path `rel`.
    ///
    /// Hidden segments, editor backups (`name~`) and ignore-pattern matches
    /// are rejected.
    pub fn admits(&self, rel: &str) -> bool {
        let hidden = rel
            .split('/')
            .any(|segment| segment.starts_with('.') && segment != "." && segment != "..");
        !hidden && !rel.ends_with('~') && !should_ignore(rel, &self.ignore)
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn compile_ignore_patterns(patterns: &[String]) -> Vec<Regex> {
    let mut compiled = Vec::new();
    for pat in patterns {
        match Regex::new(pat) {
            Ok(re) => compiled.push(re),
            Err(err) => tracing::warn!("Invalid ignore pattern '{}': {}", pat, err),
        }
    }
    compiled
}

fn should_ignore(path: &str, ignores: &[Regex]) -> bool {
    ignores.iter().any(|re| re.is_match(path))
}

/// Naming rules that keep a content-relative path out of the output tree.
///
/// A path is excluded when any segment starts or ends with `_`, when the
/// file stem ends with `_`, or when it sits below a `drafts/` directory.
pub fn is_excluded(input_uri: &str) -> bool {
    let segments: Vec<&str> = input_uri.split('/').filter(|s| !s.is_empty()).collect();
    let Some((file_name, dirs)) = segments.split_last() else {
        return false;
    };

    if dirs
        .iter()
        .any(|d| d.starts_with('_') || d.ends_with('_') || *d == "drafts")
    {
        return true;
    }

    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    file_name.starts_with('_') || stem.ends_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_files_are_sorted_and_hidden_skipped() {
        let dir = tempfile::tempdir().unwrap();
        for rel in ["b/b.md", "a/a.md", "a/z.css", ".git/config", "a/.DS_Store"] {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }

        let walker = Walker::new(dir.path(), &[]);
        let files: Vec<String> = walker
            .files()
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(files, vec!["a/a.md", "a/z.css", "b/b.md"]);
    }

    #[test]
    fn test_ignore_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for rel in ["keep/keep.md", "scratch/notes.md"] {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }

        let walker = Walker::new(dir.path(), &["^scratch/".to_string()]);
        let files = walker.files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep/keep.md"));
    }

    #[test]
    fn test_admits_matches_walk_filters() {
        let walker = Walker::new("content", &["^scratch/".to_string()]);
        assert!(walker.admits("test/test.md"));
        assert!(!walker.admits("test/.test.md.swp"));
        assert!(!walker.admits(".git/config"));
        assert!(!walker.admits("test/test.md~"));
        assert!(!walker.admits("scratch/notes.css"));
    }

    #[test]
    fn test_editor_backups_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        for rel in ["a/a.md", "a/a.md~"] {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }

        let files = Walker::new(dir.path(), &[]).files().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a/a.md"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let walker = Walker::new(dir.path().join("nope"), &[]);
        assert!(walker.files().unwrap().is_empty());
    }

    #[test]
    fn test_exclusion_rules() {
        assert!(is_excluded("_style.css"));
        assert!(is_excluded("style_.css"));
        assert!(is_excluded("_dir/index.html"));
        assert!(is_excluded("dir_/style.css"));
        assert!(is_excluded("posts/drafts/idea/idea.md"));
        assert!(!is_excluded("index.html"));
        assert!(!is_excluded("posts/2020/snake_case/snake_case.md"));
        assert!(!is_excluded("drafts.md"));
    }
}
