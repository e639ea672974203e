//! Utility module for common functionality

/// Shorten `s` to at most `max_chars` characters for log lines, adding an ellipsis if cut
pub fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((cut, _)) if max_chars <= 3 => s[..cut].to_string(),
        Some(_) => {
            let keep = s
                .char_indices()
                .nth(max_chars - 3)
                .map_or(s.len(), |(idx, _)| idx);
            format!("{}...", &s[..keep])
        }
    }
}
