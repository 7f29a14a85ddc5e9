//! Character-safe truncation for log previews

/// First `max_chars` characters of `s`, never splitting a UTF-8 sequence
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &s[..byte_index],
        None => s,
    }
}

/// Like [`truncate_chars`], with `...` appended when anything was cut
pub fn preview(s: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(s, max_chars);
    if truncated.len() < s.len() {
        format!("{}...", truncated)
    } else {
        truncated.to_string()
    }
}
