//! Fixed-size text chunking with overlap.
//!
//! Chunk sizes are expressed in approximate tokens (4 chars ≈ 1 token).
//! Break points prefer paragraph breaks, then line breaks, then sentence
//! ends near the target boundary.

use omnivault_core::ChunkConfig;

/// Approximate characters per token.
const CHARS_PER_TOKEN: usize = 4;

/// A chunk of source text with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: u32,
    pub text: String,
}

/// Whether the text is long enough to need chunk rows in addition to the
/// whole-file vector.
#[must_use]
pub fn needs_chunking(text: &str, config: &ChunkConfig) -> bool {
    text.chars().count() > config.target_tokens * CHARS_PER_TOKEN
}

/// Split text into overlapping fixed-size chunks.
///
/// Short inputs produce a single chunk; empty input produces none.
#[must_use]
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    if text.is_empty() {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let target = config.target_tokens * CHARS_PER_TOKEN;
    let overlap = config.overlap_tokens * CHARS_PER_TOKEN;
    let step = target.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0u32;

    while start < total {
        let target_end = (start + target).min(total);
        let end = find_break_point(&chars, start, target_end, total);

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                index,
                text: trimmed.to_string(),
            });
            index += 1;
        }

        if end >= total {
            break;
        }
        start += step;
    }

    chunks
}

/// Find a good break point near the target end position.
fn find_break_point(chars: &[char], start: usize, target_end: usize, total: usize) -> usize {
    if target_end >= total {
        return total;
    }

    let window = (target_end - start) / 5;
    let search_start = target_end.saturating_sub(window).max(start + 1);

    // Paragraph break first.
    for i in (search_start..target_end).rev() {
        if i + 1 < total && chars[i] == '\n' && chars[i + 1] == '\n' {
            return i + 2;
        }
    }

    // Then single newline.
    for i in (search_start..target_end).rev() {
        if chars[i] == '\n' {
            return i + 1;
        }
    }

    // Then sentence end.
    for i in (search_start..target_end).rev() {
        if matches!(chars[i], '.' | '!' | '?')
            && i + 1 < total
            && chars[i + 1].is_whitespace()
        {
            return i + 1;
        }
    }

    target_end
}
