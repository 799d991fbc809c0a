//! Display snippets for search hits.

const CONTEXT_BEFORE_MATCH: usize = 50;
const MATCH_WINDOW: usize = 100;
const FALLBACK_LENGTH: usize = 400;
const ELLIPSIS: &str = "...";

/// Excerpt `text` around the first case-insensitive occurrence of `query`.
///
/// With a match, the window starts up to 50 characters before it and spans at most 100
/// characters. Without one, the first 400 characters are used. An ellipsis marks text cut off
/// after the window.
pub fn build_snippet(text: &str, query: &str) -> String {
    let chars: Vec<char> = text.chars().collect();

    let (start, length) = match find_case_insensitive(&chars, query) {
        Some(index) => {
            let start = index.saturating_sub(CONTEXT_BEFORE_MATCH);
            (start, MATCH_WINDOW.min(chars.len() - start))
        }
        None => (0, FALLBACK_LENGTH.min(chars.len())),
    };

    let mut snippet: String = chars[start..start + length].iter().collect();
    if chars.len() > start + length {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

fn find_case_insensitive(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().map(fold_case).collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    haystack.windows(needle.len()).position(|window| {
        window
            .iter()
            .zip(&needle)
            .all(|(candidate, expected)| fold_case(*candidate) == *expected)
    })
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}
