//! Telegram MarkdownV2 escaping.
//!
//! Escaping is applied per user-facing fragment (city names, headlines,
//! numbers formatted into text), never to the structural template around
//! them, so the template's own `*`/`_` markers survive.

const MARKDOWN_V2_SPECIALS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape all MarkdownV2-reserved characters in `text`.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIALS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
