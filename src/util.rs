// src/util.rs — Text helpers for terminal status lines

use std::borrow::Cow;

const ELLIPSIS: &str = "...";

/// Longest prefix of `s` that fits in `max_len` bytes without splitting a character.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shorten `s` to `max_len` bytes of content, marking the cut with `...`.
///
/// Text that already fits is borrowed unchanged.
pub fn ellipsize(s: &str, max_len: usize) -> Cow<'_, str> {
    let kept = truncate_str(s, max_len);
    if kept.len() == s.len() {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("{}{}", kept.trim_end(), ELLIPSIS))
    }
}

/// Collapse a multi-line user message into a single status-line preview.
pub fn preview(s: &str, max_len: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    ellipsize(&flat, max_len).into_owned()
}
