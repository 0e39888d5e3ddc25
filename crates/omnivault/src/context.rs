//! Process-wide application context.
//!
//! Built once at startup: the encoder stack, storage layout and stores are
//! shared; each batch gets its own coordinator over the shared pieces.

use anyhow::{Context, Result};
use std::sync::Arc;

use omnivault_core::{DocumentStore, VaultConfig, VectorStore, EMBEDDING_DIM};
use omnivault_encode::EncoderStack;
use omnivault_ingest::{EmbeddingWriter, IngestCoordinator, IngestOptions};
use omnivault_pipeline::MultimodalPipeline;
use omnivault_search::SearchEngine;
use omnivault_store::{MemoryDocumentStore, MemoryVectorStore, StorageLayout};

/// Shared application state for the CLI and the HTTP server.
pub struct AppContext {
    pub config: VaultConfig,
    pub stack: Arc<EncoderStack>,
    pub layout: Arc<StorageLayout>,
    pub documents: Arc<dyn DocumentStore>,
    pub vectors: Arc<dyn VectorStore>,
    embeddings: Arc<EmbeddingWriter>,
}

impl AppContext {
    /// Wire up the component stack from configuration.
    ///
    /// With `MONGO_URI` unset, metadata degrades to the in-memory document
    /// store; the vector store is the in-process implementation under the
    /// configured collection name.
    pub fn initialize(config: VaultConfig) -> Result<Self> {
        let stack = Arc::new(EncoderStack::initialize(&config));
        let layout = Arc::new(
            StorageLayout::new(config.storage_root.clone())
                .context("storage root could not be created")?,
        );

        let documents: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        if config.mongo_uri.is_none() {
            tracing::warn!("MONGO_URI not set; metadata persists in-memory only");
        }

        let vectors: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new(
            config.vector_collection.clone(),
            EMBEDDING_DIM,
        ));
        let embeddings = Arc::new(EmbeddingWriter::new(Arc::clone(&vectors)));

        Ok(Self {
            config,
            stack,
            layout,
            documents,
            vectors,
            embeddings,
        })
    }

    /// A fresh per-batch coordinator over the shared components.
    #[must_use]
    pub fn coordinator(&self) -> IngestCoordinator {
        let pipeline = MultimodalPipeline::new(Arc::clone(&self.stack), &self.config);
        IngestCoordinator::new(
            pipeline,
            Arc::clone(&self.layout),
            Arc::clone(&self.documents),
            Arc::clone(&self.embeddings),
            IngestOptions {
                record_without_storage: true,
                timeouts: self.config.timeouts.clone(),
            },
        )
    }

    /// The retrieval front end over the shared stores.
    #[must_use]
    pub fn search_engine(&self) -> SearchEngine {
        SearchEngine::new(
            Arc::clone(&self.stack),
            Arc::clone(&self.vectors),
            Arc::clone(&self.documents),
        )
    }
}
