//! # omnivault-store
//!
//! Storage for the three persistence surfaces:
//!
//! - [`StorageLayout`]: raw files at `<root>/<modality>/<collection>/<name>`
//!   with collision suffixing and path-escape protection
//! - [`MemoryDocumentStore`]: the in-process
//!   [`DocumentStore`](omnivault_core::DocumentStore) implementation
//! - [`MemoryVectorStore`]: the in-process
//!   [`VectorStore`](omnivault_core::VectorStore) implementation with
//!   brute-force cosine search
//!
//! External database products plug in behind the same traits.

pub mod document;
pub mod layout;
pub mod vector;

pub use document::MemoryDocumentStore;
pub use layout::{sanitize_file_name, StorageLayout};
pub use vector::MemoryVectorStore;
