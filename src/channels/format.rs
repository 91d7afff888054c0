//! Telegram MarkdownV2 escaping.
//!
//! Model output is rendered with `parse_mode: MarkdownV2`, whose grammar
//! reserves a large set of punctuation. Every reserved character in the raw
//! text must be backslash-escaped or Telegram rejects the whole message.

/// Characters reserved by the MarkdownV2 grammar.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape text for a MarkdownV2 message body.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\\' || RESERVED.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
