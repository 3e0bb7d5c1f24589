pub mod slug;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use slug::slugify;

/// Deepest heading level tracked by the outline (`<h6>`).
const MAX_HEADING_LEVEL: usize = 6;

/// A heading in the parsed outline forest.
///
/// `content` is the rendered heading text, not the raw markdown. `id` is the
/// anchor id shared with the rendered HTML. Items are immutable once produced;
/// a new parse replaces the whole forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineItem {
    /// Heading level, 1..=6.
    pub level: u8,
    /// Heading text.
    pub content: String,
    /// Anchor id, identical to the id stamped on the rendered heading.
    pub id: String,
    /// 0-based source line of the heading.
    pub line_number: usize,
    /// Nested child headings, in document order.
    pub children: Vec<OutlineItem>,
}

/// A heading occurrence as it appears in the event stream, before nesting.
/// The resolved `id` may be empty; [`parse_outline`] drops such headings,
/// while the renderer keeps them (without an anchor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Heading {
    pub level: u8,
    pub content: String,
    pub id: String,
    pub line_number: usize,
}

/// Parse markdown into a nested heading outline.
///
/// Returns the roots of the forest; children are nested inside. A document
/// with no headings yields an empty forest, and a heading whose resolved id is
/// empty is dropped while its siblings keep parsing.
pub fn parse_outline(markdown: &str) -> Vec<OutlineItem> {
    let headings = collect_headings(markdown)
        .into_iter()
        .filter(|h| !h.id.is_empty())
        .collect();
    build_forest(headings)
}

/// Flatten a forest into (anchor id, source line) pairs in document order.
/// This is the lookup table editor-scroll sync walks.
pub fn flatten_outline(items: &[OutlineItem]) -> Vec<(String, usize)> {
    fn walk(items: &[OutlineItem], out: &mut Vec<(String, usize)>) {
        for item in items {
            out.push((item.id.clone(), item.line_number));
            walk(&item.children, out);
        }
    }
    let mut out = Vec::new();
    walk(items, &mut out);
    out
}

/// Scan the event stream and collect every heading with its level, inline
/// text, resolved anchor id and 0-based source line. An explicit `{#id}`
/// attribute wins over recomputing the slug, matching the renderer.
pub(crate) fn collect_headings(markdown: &str) -> Vec<Heading> {
    struct Open {
        level: u8,
        explicit_id: Option<String>,
        text: String,
        line_number: usize,
    }

    let lines = LineIndex::new(markdown);
    let mut headings = Vec::new();
    let mut open: Option<Open> = None;

    let parser = Parser::new_ext(markdown, Options::ENABLE_HEADING_ATTRIBUTES);
    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                open = Some(Open {
                    level: level as u8,
                    explicit_id: id.map(|s| s.to_string()),
                    text: String::new(),
                    line_number: lines.line_of(range.start),
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(open) = open.as_mut() {
                    open.text.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(open) = open.as_mut() {
                    open.text.push(' ');
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(open) = open.take() {
                    let id = open.explicit_id.unwrap_or_else(|| slugify(&open.text));
                    headings.push(Heading {
                        level: open.level,
                        content: open.text.trim().to_string(),
                        id,
                        line_number: open.line_number,
                    });
                }
            }
            _ => {}
        }
    }

    headings
}

/// Rebuild heading nesting from the flat document-order list.
///
/// One slot per level 1..=6 remembers the most recent heading at that level,
/// stored as a child-index path from the roots:
/// - level 1 always starts a new root and clears slots 2..=6, so nothing
///   attaches across a level-1 boundary;
/// - level L>1 attaches to the nearest occupied slot below it (this is what
///   repairs skipped levels like H1 followed by H3), then occupies slot L and
///   clears everything deeper;
/// - with no occupied ancestor the heading becomes an additional root, so the
///   result is a forest rather than a strict H1-rooted tree.
fn build_forest(headings: Vec<Heading>) -> Vec<OutlineItem> {
    let mut roots: Vec<OutlineItem> = Vec::new();
    let mut slots: [Option<Vec<usize>>; MAX_HEADING_LEVEL] = Default::default();

    for heading in headings {
        let level = heading.level as usize;
        let item = OutlineItem {
            level: heading.level,
            content: heading.content,
            id: heading.id,
            line_number: heading.line_number,
            children: Vec::new(),
        };

        if level <= 1 {
            roots.push(item);
            slots = Default::default();
            slots[0] = Some(vec![roots.len() - 1]);
            continue;
        }

        let parent_path = (1..level).rev().find_map(|l| slots[l - 1].clone());
        match parent_path {
            Some(path) => {
                let parent = node_at_mut(&mut roots, &path);
                parent.children.push(item);
                let mut slot_path = path;
                slot_path.push(parent.children.len() - 1);
                slots[level - 1] = Some(slot_path);
                for deeper in level..MAX_HEADING_LEVEL {
                    slots[deeper] = None;
                }
            }
            None => {
                // Document starts below H1; the heading roots itself.
                roots.push(item);
                slots[level - 1] = Some(vec![roots.len() - 1]);
            }
        }
    }

    roots
}

fn node_at_mut<'a>(roots: &'a mut [OutlineItem], path: &[usize]) -> &'a mut OutlineItem {
    let (first, rest) = path.split_first().expect("slot paths are never empty");
    let mut node = &mut roots[*first];
    for &index in rest {
        node = &mut node.children[index];
    }
    node
}

/// Byte offset to 0-based line number mapping for one source text.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset) - 1
    }
}
