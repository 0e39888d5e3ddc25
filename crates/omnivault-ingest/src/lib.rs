//! # omnivault-ingest
//!
//! Ingestion coordination: the per-file driver that ties classification,
//! the multimodal pipeline and the persistence surfaces together.
//!
//! - [`compute_file_id`]: deterministic SHA-256 identity
//! - [`infer_collection`]: descriptive-text-derived bucket names
//! - [`EmbeddingWriter`]: delete-then-insert vector persistence, serialized
//!   per `file_id`
//! - [`IngestCoordinator`]: the batch loop with per-file timeouts,
//!   cancellation between files and the partial-failure policy

pub mod collection;
pub mod coordinator;
pub mod embeddings;
pub mod identity;

pub use collection::{infer_collection, DEFAULT_COLLECTION, MEDIA_COLLECTION};
pub use coordinator::{IngestCoordinator, IngestFile, IngestOptions};
pub use embeddings::{EmbeddingEntry, EmbeddingWriter, WriteOutcome};
pub use identity::{compute_file_id, file_id_from_parts};
