/// Punctuation stripped from anchor ids, in both half- and full-width forms.
/// Course headings mix English and CJK text, so the full-width variants show
/// up regularly.
const STRIPPED_PUNCTUATION: &[char] = &['?', '？', ',', '，', '。', '.'];

/// Convert heading text into a URL-safe anchor id.
///
/// Trim, lowercase, collapse internal whitespace runs into single hyphens and
/// strip a fixed punctuation set. The same function runs in the renderer when
/// it stamps heading ids and in the outline builder when it has to recompute
/// one, so the two must stay byte-identical.
///
/// Deliberately does not de-duplicate: two headings with identical text get
/// identical slugs, and anchor lookup is first-match-wins.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect()
}
