//! Token-level text helpers shared by the trigger policy and the
//! uncertainty detectors. Matching is word-boundary exact on normalized
//! text; no regular expressions, so every check is allocation-light and
//! sub-millisecond on conversational input.

/// Lowercases `text`, drops apostrophes, and maps every other
/// non-alphanumeric run to a single space. The result is padded with one
/// leading and one trailing space so phrase containment checks see word
/// boundaries on both ends.
pub(crate) fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for ch in text.chars() {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

/// Word-boundary phrase search. `normalized` must come from [`normalize`].
pub(crate) fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    normalized.contains(&format!(" {phrase} "))
}

/// True if any phrase of the list occurs in the text.
pub(crate) fn contains_any_phrase(normalized: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| contains_phrase(normalized, phrase))
}

/// Number of distinct phrases from the list present in the text. Repeats
/// of one phrase count once.
pub(crate) fn count_phrase_hits(normalized: &str, phrases: &[&str]) -> usize {
    phrases
        .iter()
        .filter(|phrase| contains_phrase(normalized, phrase))
        .count()
}

/// Number of words in normalized text.
pub(crate) fn word_count(normalized: &str) -> usize {
    normalized.split_whitespace().count()
}
