//! Presentation normalization for advice text relayed to the chat

/// Trim every line, drop blank ones and separate the rest with a blank line
pub fn format_advice(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
