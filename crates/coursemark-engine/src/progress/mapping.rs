use crate::outline::OutlineItem;
use std::collections::HashMap;

/// Where a heading sits in the course, addressable for progress tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterInfo {
    /// Dotted positional path, e.g. "1", "1.2", "1.2.3".
    pub key: String,
    pub title: String,
    pub level: u8,
}

/// Map anchor ids to dotted positional chapter keys.
///
/// Keys reflect document order at build time, not persistent identity:
/// structural edits renumber the affected and following siblings, which is
/// why the mapping is rebuilt from scratch on every outline change. When two
/// headings share an anchor id the later occurrence wins the map slot.
pub fn build_chapter_mapping(outline: &[OutlineItem]) -> HashMap<String, ChapterInfo> {
    let mut mapping = HashMap::new();
    add_entries(outline, "", &mut mapping);
    mapping
}

fn add_entries(items: &[OutlineItem], parent_key: &str, mapping: &mut HashMap<String, ChapterInfo>) {
    for (index, item) in items.iter().enumerate() {
        let key = if parent_key.is_empty() {
            format!("{}", index + 1)
        } else {
            format!("{parent_key}.{}", index + 1)
        };
        mapping.insert(
            item.id.clone(),
            ChapterInfo {
                key: key.clone(),
                title: item.content.clone(),
                level: item.level,
            },
        );
        add_entries(&item.children, &key, mapping);
    }
}
