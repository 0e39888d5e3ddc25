//! # omnivault-pipeline
//!
//! The multimodal pipeline orchestrates extraction, descriptive-text
//! generation and embedding for a single file:
//!
//! - **Image**: caption + image vector, dimensions in `extra`
//! - **Video**: per-frame captions and vectors as chunks, re-normalized
//!   mean as the whole-file vector, `"video; <middle frame caption>"`
//! - **Audio**: transcript (or generic fallback) encoded as text
//! - **Text**: ≤ 500-char summary encoded as the canonical vector, with
//!   overlapping chunk vectors for long documents

pub mod chunker;
pub mod pipeline;
pub mod summary;

pub use chunker::{chunk_text, needs_chunking, TextChunk};
pub use pipeline::MultimodalPipeline;
pub use summary::build_summary;
