//! Input URI to output URI mapping.
//!
//! Every function here is a pure function of its arguments: no filesystem
//! access and no hidden state.

use crate::config::{ClassConfig, PrefixMode, Redirect};

/// Maps content-relative input URIs to output-relative URIs
#[derive(Debug, Clone, Default)]
pub struct UriTransformer {
    classes: Vec<ClassConfig>,
    redirects: Vec<Redirect>,
}

impl UriTransformer {
    pub fn new(classes: Vec<ClassConfig>, redirects: Vec<Redirect>) -> Self {
        Self { classes, redirects }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        Self::new(config.classes.clone(), config.redirects.clone())
    }

    /// Apply class prefix rules, then the redirect table.
    ///
    /// `pages/about/about.md` becomes `about/about.md`, and
    /// `posts/2020/hello/hello.md` becomes `posts/hello/hello.md`.
    pub fn transform(&self, input_uri: &str) -> String {
        let mut uri = normalize(input_uri);

        let first = uri.split('/').next().unwrap_or_default().to_string();
        if let Some(class) = self.classes.iter().find(|c| c.name == first) {
            let rest = &uri[first.len()..];
            uri = match class.prefix {
                PrefixMode::Strip => rest.trim_start_matches('/').to_string(),
                PrefixMode::Collapse => {
                    let rest = rest.trim_start_matches('/');
                    match rest.split_once('/') {
                        Some((_group, tail)) => format!("{}/{}", first, tail),
                        None => format!("{}/{}", first, rest),
                    }
                }
                PrefixMode::Keep => uri,
            };
        }

        for redirect in &self.redirects {
            if !redirect.from.is_empty() {
                uri = uri.replace(&redirect.from, &redirect.to);
            }
        }

        uri
    }

    /// Compute the output URI for `input_uri`.
    ///
    /// `route_slug` overrides the route-part (the parent directory name).
    pub fn output_uri(&self, input_uri: &str, route_slug: Option<&str>) -> String {
        let uri = self.transform(input_uri);
        let (dir, file_name) = split_last(&uri);
        let (grandparent, parent) = split_last(dir);
        let route_part = route_slug.unwrap_or(parent);

        if parent.contains('.') && parent != "." {
            return join(&[grandparent, file_name]);
        }

        if !file_name.ends_with(".html") && !file_name.ends_with(".md") {
            return join(&[grandparent, route_part, file_name]);
        }

        let stem = file_stem(file_name);
        if stem == parent {
            join(&[grandparent, route_part, "index.html"])
        } else {
            join(&[grandparent, route_part, &format!("{}.html", stem)])
        }
    }

    /// Route-part a page would get without an explicit slug
    pub fn default_route_part(&self, input_uri: &str) -> String {
        let uri = self.transform(input_uri);
        let (dir, _) = split_last(&uri);
        split_last(dir).1.to_string()
    }
}

/// Output URI of the `slug` variant of a fanned-out page
pub fn variant_output_uri(base_output_uri: &str, slug: &str) -> String {
    let (dir, _) = split_last(base_output_uri);
    join(&[dir, slug, "index.html"])
}

/// Name of the top-level content directory of `input_uri`, if it is nested
pub fn first_segment(input_uri: &str) -> Option<&str> {
    let uri = input_uri.trim_start_matches("./").trim_start_matches('/');
    uri.split_once('/').map(|(first, _)| first)
}

fn normalize(uri: &str) -> String {
    let uri = uri.replace('\\', "/");
    uri.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Split at the last `/`; the directory part of a bare name is empty
fn split_last(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(idx) => &file_name[..idx],
    }
}

fn join(parts: &[&str]) -> String {
    normalize(&parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn transformer() -> UriTransformer {
        let mut config = Config::default();
        config.redirects = vec![
            Redirect {
                from: "hugo-render-latex-with-katex".into(),
                to: "render-latex-with-katex-in-hugo-blog".into(),
            },
            Redirect {
                from: "fixing-internal-network".into(),
                to: "fixing-my-internal-network".into(),
            },
        ];
        UriTransformer::from_config(&config)
    }

    #[test]
    fn test_class_prefixes() {
        let t = transformer();
        assert_eq!(t.transform("pages/about/about.md"), "about/about.md");
        assert_eq!(t.transform("posts/2020/hello/hello.md"), "posts/hello/hello.md");
        assert_eq!(t.transform("posts/hello.md"), "posts/hello.md");
        assert_eq!(t.transform("notes/a/a.md"), "notes/a/a.md");
        assert_eq!(t.transform("test/test.md"), "test/test.md");
    }

    #[test]
    fn test_redirect_table() {
        let t = transformer();
        assert_eq!(
            t.transform("posts/2018/hugo-render-latex-with-katex/hugo-render-latex-with-katex.md"),
            "posts/render-latex-with-katex-in-hugo-blog/render-latex-with-katex-in-hugo-blog.md"
        );
        assert_eq!(
            t.output_uri("posts/2020/fixing-internal-network/fixing-internal-network.md", None),
            "posts/fixing-my-internal-network/index.html"
        );
    }

    #[test]
    fn test_transform_is_pure() {
        let t = transformer();
        let input = "posts/2020/hello/image.png";
        assert_eq!(t.transform(input), t.transform(input));
        assert_eq!(t.output_uri(input, None), t.output_uri(input, None));
    }

    #[test]
    fn test_transform_is_not_idempotent() {
        let t = transformer();
        let once = t.transform("posts/2020/a/b/b.md");
        assert_eq!(once, "posts/a/b/b.md");
        assert_eq!(t.transform(&once), "posts/b/b.md");
    }

    #[test]
    fn test_pretty_url_forms() {
        let t = transformer();
        assert_eq!(t.output_uri("test/test.md", None), "test/index.html");
        assert_eq!(t.output_uri("test/index.md", None), "test/index.html");
        assert_eq!(t.output_uri("test/test.html", None), "test/index.html");
        assert_eq!(t.output_uri("test/about.md", None), "test/about.html");
        assert_eq!(t.output_uri("index.md", None), "index.html");
        assert_eq!(t.output_uri("index.html", None), "index.html");
    }

    #[test]
    fn test_explicit_slug_replaces_route_part() {
        let t = transformer();
        assert_eq!(
            t.output_uri("test/index.md", Some("my-slug")),
            "my-slug/index.html"
        );
        assert_eq!(
            t.output_uri("test/test.html", Some("my-slug")),
            "my-slug/index.html"
        );
        assert_eq!(
            t.output_uri("posts/2020/hello/hello.md", Some("hi")),
            "posts/hi/index.html"
        );
    }

    #[test]
    fn test_satellite_moves_with_route() {
        let t = transformer();
        assert_eq!(t.output_uri("style.css", None), "style.css");
        assert_eq!(t.output_uri("links/links.css", None), "links/links.css");
        assert_eq!(
            t.output_uri("posts/2020/hello/diagram.svg", Some("hi")),
            "posts/hi/diagram.svg"
        );
    }

    #[test]
    fn test_parent_that_looks_like_a_file() {
        let t = transformer();
        assert_eq!(t.output_uri("test.html/test.html", None), "test.html");
        assert_eq!(
            t.output_uri("pages/index.html/index.html", None),
            "index.html"
        );
        assert_eq!(t.output_uri("feed/rss.xml/rss.xml", None), "feed/rss.xml");
    }

    #[test]
    fn test_pages_prefix_is_removed() {
        let t = transformer();
        assert_eq!(t.output_uri("pages/about/about.md", None), "about/index.html");
        assert_eq!(t.output_uri("pages/tag/tag.html", None), "tag/index.html");
    }

    #[test]
    fn test_variant_output_uri() {
        assert_eq!(variant_output_uri("tag/index.html", "rust"), "tag/rust/index.html");
        assert_eq!(variant_output_uri("index.html", "a"), "a/index.html");
    }

    #[test]
    fn test_first_segment() {
        assert_eq!(first_segment("posts/2020/a/a.md"), Some("posts"));
        assert_eq!(first_segment("index.md"), None);
    }
}
