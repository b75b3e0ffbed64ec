//! Small shared helpers

/// Trim an optional string, mapping empty or whitespace-only values to `None`.
#[must_use]
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Collapse a response body to a single bounded line suitable for error messages.
#[must_use]
pub fn compact_text(text: &str) -> String {
    const MAX_CHARS: usize = 180;
    let compact = text
        .replace(['\n', '\r'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if compact.chars().count() > MAX_CHARS {
        let mut truncated: String = compact.chars().take(MAX_CHARS).collect();
        truncated.push('…');
        return truncated;
    }
    compact
}

/// Escape `%`, `_` and `\` in user input destined for a SQL LIKE pattern.
///
/// Callers must pair the result with `ESCAPE '\'`.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
