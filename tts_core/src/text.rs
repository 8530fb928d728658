use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("markdown link pattern is valid")
});

/// Replace markdown links `[text](url)` with their text so the URL is not read aloud.
pub fn strip_markdown_links(text: &str) -> Cow<'_, str> {
    MARKDOWN_LINK.replace_all(text, "$1")
}

/// Split `text` into pieces of at most `max_chars` characters, in reading
/// order.
///
/// Pieces break at sentence ends (`.`, `!`, `?` or a newline followed by
/// whitespace) and pack as many whole sentences as fit. A sentence longer
/// than `max_chars` is broken between words, and a single word longer than
/// that is cut at a character boundary.
pub fn split_into_pieces(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences(text) {
        for part in fit(sentence, max_chars) {
            let len = part.chars().count();
            if !current.is_empty() && current_len + 1 + len > max_chars {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(part);
            current_len += len;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let at_boundary = matches!(c, '.' | '!' | '?' | '\n')
            && chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if at_boundary {
            let end = i + c.len_utf8();
            out.push(&text[start..end]);
            start = end;
        }
    }
    out.push(&text[start..]);
    out.into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn fit(sentence: &str, max_chars: usize) -> Vec<&str> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence];
    }
    let mut parts = Vec::new();
    for word in sentence.split_whitespace() {
        let mut rest = word;
        while rest.chars().count() > max_chars {
            let cut = rest
                .char_indices()
                .nth(max_chars)
                .map_or(rest.len(), |(i, _)| i);
            parts.push(&rest[..cut]);
            rest = &rest[cut..];
        }
        if !rest.is_empty() {
            parts.push(rest);
        }
    }
    parts
}
