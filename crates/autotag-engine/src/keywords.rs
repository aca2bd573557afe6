//! Keyword extraction from item titles.
//!
//! Titles on the draft page are short asset descriptions like
//! "Modern Flat Shopping Cart Icon". Seeding the tag input with the most
//! specific word of the title makes the page produce a fresh suggestion set,
//! so the extractor strips filler and style words and prefers the longest
//! remaining token.

/// Words that never make useful seeds: English filler plus the style
/// vocabulary that appears in almost every asset title.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "for", "with", "by", "at", "from",
    "as", "is", "are", "icon", "vector", "logo", "design", "flat", "outline", "filled", "line",
    "color", "coloured", "colored", "minimal", "simple",
];

const MIN_KEYWORD_LEN: usize = 3;

/// Lowercase the title and split it into tokens of `[a-z0-9-]`.
fn clean_tokens(title: &str) -> Vec<String> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().map(|s| s.to_string()).collect()
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Pick the strongest seed keyword from a title.
///
/// Candidates are non-stopword tokens of at least three characters; the
/// longest wins and ties keep title order. When every token is filtered out
/// the first token is returned as a last resort. `None` only for titles with
/// no tokens at all.
pub fn pick_keyword(title: &str) -> Option<String> {
    let tokens = clean_tokens(title);
    let mut candidates: Vec<&String> = tokens
        .iter()
        .filter(|t| !is_stop_word(t) && t.len() >= MIN_KEYWORD_LEN)
        .collect();

    if candidates.is_empty() {
        return tokens.first().cloned();
    }

    // Stable sort: equal lengths keep their title order.
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));
    Some(candidates[0].clone())
}

/// All usable keywords of a title in title order, deduplicated and capped at
/// `max`. Used when one seed was not enough and the retry rounds want to try
/// several.
pub fn derive_keywords(title: &str, max: usize) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for token in clean_tokens(title) {
        if is_stop_word(&token) || token.len() < MIN_KEYWORD_LEN {
            continue;
        }
        if !unique.contains(&token) {
            unique.push(token);
        }
        if unique.len() == max {
            break;
        }
    }
    unique
}
