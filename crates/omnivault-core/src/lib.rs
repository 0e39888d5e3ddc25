//! # omnivault-core
//!
//! Core types and traits for Omnivault, a multimodal ingestion and
//! cross-modal semantic retrieval system.
//!
//! Files flow through a single pipeline:
//!
//! ```text
//! File -> Classifier -> Extractor -> Encoder -> Storage copy
//!                                        |
//!                            DocumentStore + VectorStore
//!                                        |
//!                              SearchEngine -> SearchHit
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`FileRecord`] | Durable metadata about an ingested file |
//! | [`EmbeddingRecord`] | A vector row in the shared multimodal space |
//! | [`EncodedFile`] | Pipeline output for one file |
//! | [`BatchReport`] | Aggregate ingest outcome |
//! | [`SearchHit`] | A ranked retrieval result |
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Encoder`] | Shared-space text/image embedding |
//! | [`Captioner`] / [`Transcriber`] | Descriptive-text backends |
//! | [`DocumentStore`] | Metadata persistence contract |
//! | [`VectorStore`] | Embedding persistence and ANN query contract |
//!
//! ## Related Crates
//!
//! - `omnivault-extract`: per-modality content extraction
//! - `omnivault-encode`: encoder stack and fallback backends
//! - `omnivault-classify`: media detection and SQL/NoSQL scoring
//! - `omnivault-pipeline`: multimodal orchestration
//! - `omnivault-store`: storage layout and in-memory stores
//! - `omnivault-ingest`: ingestion coordination
//! - `omnivault-search`: semantic retrieval with metadata fallback

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::VaultConfig;
pub use error::{
    ClassifyError, EncodeError, Error, ErrorCode, ExtractError, Result, SearchError, StoreError,
};
pub use traits::*;
pub use types::*;
