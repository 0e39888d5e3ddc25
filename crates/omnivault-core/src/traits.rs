//! Core traits for Omnivault components.
//!
//! These seams keep the heavy collaborators pluggable:
//!
//! - [`Encoder`], [`Captioner`], [`Transcriber`]: model backends
//! - [`DocumentStore`]: any mapping `collection -> documents` with upsert,
//!   lookup by key and substring match
//! - [`VectorStore`]: any mapping to `{id, embedding, text, metadata}` rows
//!   with approximate nearest-neighbor query
//!
//! The in-process implementations live in `omnivault-encode` and
//! `omnivault-store`; external products (MongoDB, ChromaDB, Qdrant, ...)
//! integrate behind the same contracts.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{EncodeError, StoreError};
use crate::types::{EmbeddingRecord, FileRecord, RgbFrame, ScoredEmbedding};

// ============================================================================
// Model backends
// ============================================================================

/// Shared-space encoder: all text and image vectors occupy one space of a
/// fixed dimension committed at construction time.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Model identifier recorded in embedding metadata.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Encode text into an L2-normalized vector. Inputs longer than the
    /// model's token budget are truncated, never rejected.
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, EncodeError>;

    /// Encode a decoded RGB frame into an L2-normalized vector.
    async fn encode_image(&self, frame: &RgbFrame) -> Result<Vec<f32>, EncodeError>;
}

/// Produces a short natural-language caption for an image.
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, frame: &RgbFrame) -> Result<String, EncodeError>;
}

/// Produces a transcript for an audio file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, path: &Path) -> Result<String, EncodeError>;
}

// ============================================================================
// Stores
// ============================================================================

/// Contract for the metadata document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or merge a file record by `file_id` and return the stored
    /// version.
    ///
    /// Merge semantics on an existing record: `extra` keys are merged,
    /// `descriptive_text` / `summary_preview` / `storage_uri` are replaced,
    /// `updated_at` is bumped. `file_id`, `original_name`, `size_bytes` and
    /// `created_at` are never overwritten.
    async fn upsert_file(&self, record: FileRecord) -> Result<FileRecord, StoreError>;

    /// Look up a record by key.
    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>, StoreError>;

    /// All records, in unspecified order.
    async fn all_files(&self) -> Result<Vec<FileRecord>, StoreError>;

    /// Records whose descriptive text, preview or original name contains
    /// `needle` (case-insensitive).
    async fn find_substring(&self, needle: &str) -> Result<Vec<FileRecord>, StoreError>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Contract for the embedding vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Collection this store writes into.
    fn collection(&self) -> &str;

    /// Liveness flag checked by writers and search before any call. When
    /// false, writers skip and search falls back to metadata mode.
    fn available(&self) -> bool;

    /// Insert or replace rows by `emb_id`.
    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<(), StoreError>;

    /// Remove every row belonging to `file_id`, returning the count removed.
    async fn delete_by_file_id(&self, file_id: &str) -> Result<u64, StoreError>;

    /// Approximate nearest-neighbor query, best-first. Ordering is
    /// deterministic for a fixed store state: ties break by `emb_id`.
    async fn query(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredEmbedding>, StoreError>;

    /// Number of stored rows.
    async fn count(&self) -> Result<u64, StoreError>;
}
