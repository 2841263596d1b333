// Output formatting: terminal display of results and ingestion summaries.

pub mod terminal;

/// Anomalous rows printed before the table is elided.
pub const MAX_ANOMALY_ROWS: usize = 25;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing, this respects UTF-8 character boundaries and never
/// panics on multi-byte characters in file names or feed notes.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Format an optional number with fixed precision, "-" when missing.
pub fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_opt_handles_missing() {
        assert_eq!(fmt_opt(Some(412.456), 1), "412.5");
        assert_eq!(fmt_opt(None, 2), "-");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héliosphère", 4), "héli...");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
