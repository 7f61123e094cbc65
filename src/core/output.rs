//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps command result output bounded and readable while preserving signal.

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Left-align `input` in a column of `width` characters, truncating with `...`.
pub fn column(input: &str, width: usize) -> String {
    let collapsed = compact_line(input, usize::MAX);
    let len = collapsed.chars().count();
    if len > width {
        compact_line(&collapsed, width.saturating_sub(3).max(1))
    } else {
        format!("{}{}", collapsed, " ".repeat(width - len))
    }
}
