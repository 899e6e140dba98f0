//! New command: scaffold a draft post.

use super::load_config;
use anyhow::{bail, Context, Result};
use chrono::Local;
use rho_core::slugify;
use std::fs;
use std::path::{Path, PathBuf};

/// Write `posts/drafts/<slug>/<slug>.md` with a frontmatter skeleton
pub fn new_post(config_path: &Path, slug: &str, title: Option<&str>) -> Result<PathBuf> {
    let config = load_config(config_path)?;

    let slug = slugify(slug);
    if slug.is_empty() {
        bail!("Slug must contain at least one letter or digit");
    }

    let dir = config.content_dir().join("posts/drafts").join(&slug);
    let path = dir.join(format!("{}.md", slug));
    if path.exists() {
        bail!("{:?} already exists", path);
    }

    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let skeleton = skeleton(
        title.unwrap_or(&slug),
        &slug,
        &config.site.author,
        &Local::now().format("%Y-%m-%d").to_string(),
    );
    fs::write(&path, skeleton).with_context(|| format!("Failed to write {:?}", path))?;

    println!("Created {:?}", path);
    println!("  - Move it out of drafts/ and drop `draft = true` to publish");
    Ok(path)
}

fn skeleton(title: &str, slug: &str, author: &str, date: &str) -> String {
    format!(
        "+++\ntitle = {}\nslug = {}\nauthor = {}\ndate = {}\ncategories = []\ntags = []\ndraft = true\n+++\n\n",
        toml_string(title),
        toml_string(slug),
        toml_string(author),
        date
    )
}

fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_is_valid_toml() {
        let text = skeleton("It's \"quoted\"", "quoted", "A. Author", "2024-01-02");
        let inner = text
            .strip_prefix("+++\n")
            .and_then(|s| s.split("+++").next())
            .unwrap();
        let table: toml::Table = toml::from_str(inner).unwrap();
        assert_eq!(table["title"].as_str(), Some("It's \"quoted\""));
        assert_eq!(table["draft"].as_bool(), Some(true));
        assert!(table["date"].is_datetime());
    }
}
