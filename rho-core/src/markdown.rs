//! Markdown to HTML conversion.

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};

/// Markdown processor; every link gets an explicit `target`
pub struct MarkdownProcessor {
    options: Options,
}

impl MarkdownProcessor {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    pub fn convert(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let events = parser.map(|event| match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            }) => Event::InlineHtml(CowStr::Boxed(
                open_link(link_type, &dest_url, &title).into_boxed_str(),
            )),
            Event::End(TagEnd::Link) => Event::InlineHtml(CowStr::Borrowed("</a>")),
            other => other,
        });

        let mut html_output = String::new();
        html::push_html(&mut html_output, events);
        html_output
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Site-relative paths and fragments stay in the tab, everything else opens a new one
pub fn is_local_link(href: &str) -> bool {
    (href.starts_with('/') && !href.starts_with("//")) || href.starts_with('#')
}

fn open_link(link_type: LinkType, dest: &str, title: &str) -> String {
    let href = if link_type == LinkType::Email && !dest.starts_with("mailto:") {
        format!("mailto:{}", dest)
    } else {
        dest.to_string()
    };
    let target = if is_local_link(&href) { "_self" } else { "_blank" };

    let mut tag = format!("<a href=\"{}\"", html_escape(&href));
    if !title.is_empty() {
        tag.push_str(&format!(" title=\"{}\"", html_escape(title)));
    }
    tag.push_str(&format!(" target=\"{}\">", target));
    tag
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
