use crate::outline::collect_headings;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

/// Shown in place of empty HTML while course content has not arrived yet.
pub const LOADING_PLACEHOLDER: &str =
    r#"<span class="content-loading">Loading content...</span>"#;

/// Markdown to HTML renderer that stamps every heading (h1–h6) with a stable
/// anchor id and a hidden permalink.
///
/// Constructed explicitly by the owner; there is no process-wide renderer
/// instance. Ids come from [`crate::outline::slug::slugify`] (or an explicit
/// `{#id}` heading attribute), the same resolution the outline builder uses,
/// so the two always agree. Duplicate heading texts share an id; lookup is
/// first-match-wins and no suffix is appended.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render markdown to HTML. Empty input yields [`LOADING_PLACEHOLDER`]
    /// rather than an empty string.
    pub fn render(&self, markdown: &str) -> String {
        if markdown.is_empty() {
            return LOADING_PLACEHOLDER.to_string();
        }

        // Resolved ids for each heading occurrence, in document order. Both
        // passes walk the same event stream, so the two line up one to one.
        let headings = collect_headings(markdown);
        let mut next_heading = headings.iter();

        let parser = Parser::new_ext(markdown, Options::ENABLE_HEADING_ATTRIBUTES);
        let mut events: Vec<Event> = Vec::new();
        for event in parser {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    let id = next_heading.next().map(|h| h.id.as_str()).unwrap_or("");
                    if id.is_empty() {
                        // An empty slug is not a valid anchor; the heading
                        // renders plain.
                        events.push(Event::Html(format!("<{level}>").into()));
                    } else {
                        let id = html_escape::encode_double_quoted_attribute(id);
                        events.push(Event::Html(
                            format!(
                                "<{level} id=\"{id}\">\
                                 <a class=\"header-anchor\" href=\"#{id}\" aria-hidden=\"true\"></a>"
                            )
                            .into(),
                        ));
                    }
                }
                Event::End(TagEnd::Heading(level)) => {
                    events.push(Event::Html(format!("</{level}>\n").into()));
                }
                other => events.push(other),
            }
        }

        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }
}
