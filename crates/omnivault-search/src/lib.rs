//! # omnivault-search
//!
//! Semantic retrieval over the shared embedding space, with a
//! deterministic metadata-substring fallback when the vector store or the
//! encoder is unavailable. Results are file-level: chunk candidates keep
//! recall high but are deduped to the best row per file.

pub mod engine;

pub use engine::SearchEngine;
