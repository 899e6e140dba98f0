//! Frontmatter extraction and validation for markdown entrypoints.
//!
//! A frontmatter block is a TOML document fenced by `+++` lines at the very
//! top of the file:
//!
//! ```text
//! +++
//! title = 'Hello'
//! author = 'First Last'
//! date = 2000-01-01
//! +++
//! Body text.
//! ```

use crate::config::{ClassConfig, FrontmatterRules};
use crate::models::Frontmatter;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use toml::{Table, Value};

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid TOML frontmatter in {file:?}: {source}")]
    Toml {
        file: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing required frontmatter property of \"{field}\" in file: {file:?}")]
    MissingRequiredField { field: String, file: PathBuf },

    #[error("Invalid frontmatter property of \"{field}\" in file: {file:?}")]
    UnknownField { field: String, file: PathBuf },

    #[error("Frontmatter property \"{field}\" must be {expected} in file: {file:?}")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
        file: PathBuf,
    },
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| {
        Regex::new(r"(?s)\A\+\+\+[ \t]*\r?\n(?:(.*?)\r?\n)?\+\+\+[ \t]*(?:\r?\n|\z)(.*)\z")
            .unwrap()
    })
}

/// Split a leading `+++` block off `content`.
///
/// Returns the parsed table (if a block was present) and the remaining body.
pub fn extract(content: &str, file: &Path) -> Result<(Option<Table>, String), FrontmatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(captures) = frontmatter_regex().captures(content) else {
        return Ok((None, content.to_string()));
    };

    let toml_src = captures.get(1).map_or("", |m| m.as_str());
    let body = captures.get(2).map_or("", |m| m.as_str());

    let table: Table = toml::from_str(toml_src).map_err(|source| FrontmatterError::Toml {
        file: file.to_path_buf(),
        source,
    })?;

    Ok((Some(table), body.to_string()))
}

/// Check a raw frontmatter table against the class and allow-list rules
pub fn validate(
    table: &Table,
    class: Option<&ClassConfig>,
    rules: &FrontmatterRules,
    file: &Path,
) -> Result<Frontmatter, FrontmatterError> {
    if let Some(class) = class {
        for required in &class.required {
            if !table.contains_key(required) {
                return Err(FrontmatterError::MissingRequiredField {
                    field: required.clone(),
                    file: file.to_path_buf(),
                });
            }
        }
    }

    for key in table.keys() {
        if !rules.allowed.iter().any(|allowed| allowed == key) {
            return Err(FrontmatterError::UnknownField {
                field: key.clone(),
                file: file.to_path_buf(),
            });
        }
    }

    let fields = FieldReader { table, file };
    Ok(Frontmatter {
        title: fields.string("title")?,
        author: fields.string("author")?,
        date: fields.date("date")?,
        layout: fields.string("layout")?,
        slug: fields.string("slug")?,
        categories: fields.string_list("categories")?,
        tags: fields.string_list("tags")?,
        draft: fields.flag("draft")?,
    })
}

/// Extract and validate in one step; the body is returned without the block.
pub fn parse(
    content: &str,
    class: Option<&ClassConfig>,
    rules: &FrontmatterRules,
    file: &Path,
) -> Result<(Frontmatter, String), FrontmatterError> {
    let (table, body) = extract(content, file)?;
    let table = table.unwrap_or_default();
    let frontmatter = validate(&table, class, rules, file)?;
    Ok((frontmatter, body))
}

struct FieldReader<'a> {
    table: &'a Table,
    file: &'a Path,
}

impl FieldReader<'_> {
    fn invalid(&self, field: &str, expected: &'static str) -> FrontmatterError {
        FrontmatterError::InvalidFieldType {
            field: field.to_string(),
            expected,
            file: self.file.to_path_buf(),
        }
    }

    fn string(&self, field: &str) -> Result<Option<String>, FrontmatterError> {
        match self.table.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(field, "a string")),
        }
    }

    fn date(&self, field: &str) -> Result<Option<String>, FrontmatterError> {
        match self.table.get(field) {
            None => Ok(None),
            Some(Value::Datetime(d)) => Ok(Some(d.to_string())),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(field, "a date")),
        }
    }

    fn string_list(&self, field: &str) -> Result<Vec<String>, FrontmatterError> {
        match self.table.get(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(self.invalid(field, "an array of strings")),
                })
                .collect(),
            Some(_) => Err(self.invalid(field, "an array of strings")),
        }
    }

    fn flag(&self, field: &str) -> Result<bool, FrontmatterError> {
        match self.table.get(field) {
            None => Ok(false),
            Some(Value::Boolean(b)) => Ok(*b),
            Some(_) => Err(self.invalid(field, "a boolean")),
        }
    }
}
