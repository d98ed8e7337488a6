use std::borrow::Cow;

/// Shorten `s` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_str(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => Cow::Owned(format!("{}...", &s[..end])),
        None => Cow::Borrowed(s),
    }
}
