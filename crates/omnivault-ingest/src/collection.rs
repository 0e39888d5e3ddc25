//! Collection inference from descriptive text.
//!
//! Non-media files land in a bucket named after the first two significant
//! words of their descriptive text: lowercased, alphanumeric, non-stopword,
//! deduplicated, joined by `_`. Media files always land in `media_assets`.

/// Bucket for all media files.
pub const MEDIA_COLLECTION: &str = "media_assets";

/// Bucket for documents whose text yields no significant words.
pub const DEFAULT_COLLECTION: &str = "documents";

/// Common English stopwords skipped during inference.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "we", "were", "will",
    "with", "you", "your", "our", "their", "they", "he", "she", "his", "her", "new", "not", "no",
];

/// Derive the collection name from descriptive text.
#[must_use]
pub fn infer_collection(descriptive_text: &str) -> String {
    let mut words: Vec<String> = Vec::new();

    for raw in descriptive_text.split_whitespace() {
        let word: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        if word.len() < 2 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if words.contains(&word) {
            continue;
        }
        words.push(word);
        if words.len() == 2 {
            break;
        }
    }

    if words.is_empty() {
        DEFAULT_COLLECTION.to_string()
    } else {
        words.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_two_significant_words() {
        assert_eq!(
            infer_collection("We propose a new caching scheme."),
            "propose_caching"
        );
    }

    #[test]
    fn test_stopwords_skipped() {
        assert_eq!(
            infer_collection("The and of with quarterly report"),
            "quarterly_report"
        );
    }

    #[test]
    fn test_punctuation_stripped() {
        assert_eq!(infer_collection("Invoice: 2024, totals!"), "invoice_2024");
    }

    #[test]
    fn test_duplicates_removed() {
        assert_eq!(infer_collection("report report summary"), "report_summary");
    }

    #[test]
    fn test_single_word() {
        assert_eq!(infer_collection("inventory"), "inventory");
    }

    #[test]
    fn test_empty_text_defaults() {
        assert_eq!(infer_collection(""), DEFAULT_COLLECTION);
        assert_eq!(infer_collection("the of a"), DEFAULT_COLLECTION);
    }

    #[test]
    fn test_short_tokens_skipped() {
        assert_eq!(infer_collection("x y meeting minutes"), "meeting_minutes");
    }
}
