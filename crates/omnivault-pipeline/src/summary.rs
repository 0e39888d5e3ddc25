//! Descriptive-text summarization for documents.

/// Maximum summary length in characters.
const SUMMARY_CHARS: usize = 500;

/// Shortest acceptable sentence-truncated summary; below this the hard cut
/// is used instead.
const MIN_SENTENCE_CUT: usize = 40;

/// Build a document summary: whitespace-collapsed first ≤ 500 characters,
/// truncated at a sentence end where one lands reasonably close.
#[must_use]
pub fn build_summary(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SUMMARY_CHARS {
        return collapsed;
    }

    let head: String = collapsed.chars().take(SUMMARY_CHARS).collect();

    // Prefer ending on a sentence boundary.
    if let Some(cut) = last_sentence_end(&head) {
        if cut >= MIN_SENTENCE_CUT {
            return head[..cut].to_string();
        }
    }

    // Otherwise avoid cutting a word in half.
    match head.rfind(' ') {
        Some(space) if space >= MIN_SENTENCE_CUT => head[..space].to_string(),
        _ => head,
    }
}

/// Byte offset just past the last sentence terminator, if any.
fn last_sentence_end(s: &str) -> Option<usize> {
    s.char_indices()
        .filter(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| i + c.len_utf8())
        .next_back()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_passes_through() {
        assert_eq!(build_summary("A tidy sentence."), "A tidy sentence.");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            build_summary("spread   across\n\nlines\tand tabs"),
            "spread across lines and tabs"
        );
    }

    #[test]
    fn test_long_text_truncated_at_sentence() {
        let text = format!(
            "We propose a new caching scheme. {}",
            "Further detail follows in every direction, sentence after sentence. ".repeat(20)
        );
        let summary = build_summary(&text);
        assert!(summary.chars().count() <= 500);
        assert!(summary.ends_with('.'));
        assert!(summary.starts_with("We propose a new caching scheme."));
    }

    #[test]
    fn test_no_sentence_boundary_cuts_at_word() {
        let text = "word ".repeat(200);
        let summary = build_summary(&text);
        assert!(summary.chars().count() <= 500);
        assert!(!summary.ends_with(' '));
        assert!(summary.ends_with("word"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(build_summary(""), "");
    }

    #[test]
    fn test_unicode_truncation_is_safe() {
        let text = "é".repeat(1000);
        let summary = build_summary(&text);
        assert!(summary.chars().count() <= 500);
    }
}
