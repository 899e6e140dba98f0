//! Slugs for taxonomy terms and new post directories.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static HYPHEN_RUNS: OnceLock<Regex> = OnceLock::new();

/// Convert a term or title to a URL-safe route segment
///
/// Lowercases, turns whitespace and underscores into hyphens, drops
/// punctuation (unicode letters survive), collapses hyphen runs and trims
/// them from both ends.
///
/// # Examples
///
/// ```
/// use rho_core::slugify;
///
/// assert_eq!(slugify("Home Lab"), "home-lab");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// assert_eq!(slugify("C++"), "c");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.to_lowercase();

    let cleaned = lowercased
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if g.chars().all(char::is_whitespace) || c == '_' {
                Some("-")
            } else if c.is_ascii_alphanumeric() || c == '-' || c.is_alphabetic() {
                Some(g)
            } else {
                None
            }
        })
        .collect::<String>();

    let re = HYPHEN_RUNS.get_or_init(|| Regex::new(r"-+").unwrap());
    re.replace_all(&cleaned, "-").trim_matches('-').to_string()
}
