//! Embedding persistence.
//!
//! Writes the canonical whole-file row plus chunk rows for a file. The
//! rewrite for one `file_id` is delete-then-insert and serialized through a
//! per-key lock, so two concurrent re-ingests of the same file can never
//! interleave into a mixed stale/new chunk set.

use omnivault_core::{
    EmbeddingKind, EmbeddingMetadata, EmbeddingRecord, EncodedChunk, Modality, StoreError,
    VectorStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// One row to be written, before ids and shared metadata are attached.
pub struct EmbeddingEntry {
    pub text: String,
    pub embedding: Vec<f32>,
    pub chunk_index: Option<u32>,
}

impl EmbeddingEntry {
    /// The canonical whole-file entry.
    #[must_use]
    pub fn file(text: String, embedding: Vec<f32>) -> Self {
        Self {
            text,
            embedding,
            chunk_index: None,
        }
    }

    /// A chunk entry.
    #[must_use]
    pub fn chunk(chunk: EncodedChunk) -> Self {
        Self {
            text: chunk.text,
            embedding: chunk.embedding,
            chunk_index: Some(chunk.chunk_index),
        }
    }
}

/// Outcome of one write: rows written, or a recorded skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(usize),
    /// The store was unavailable; nothing was written and ingestion
    /// proceeds without vectors.
    SkippedUnavailable,
}

/// Writer for the vector store.
pub struct EmbeddingWriter {
    store: Arc<dyn VectorStore>,
    /// Per-file_id write locks; entries are kept for the process lifetime.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    skipped_writes: AtomicU64,
}

impl EmbeddingWriter {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            skipped_writes: AtomicU64::new(0),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    /// Number of writes skipped because the store was unavailable.
    #[must_use]
    pub fn skipped_writes(&self) -> u64 {
        self.skipped_writes.load(Ordering::Relaxed)
    }

    /// Replace the full embedding row set for a file.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_embeddings(
        &self,
        file_id: &str,
        entries: Vec<EmbeddingEntry>,
        modality: Modality,
        collection: &str,
        original_name: &str,
        storage_uri: Option<&str>,
    ) -> Result<WriteOutcome, StoreError> {
        if !self.store.available() {
            self.skipped_writes.fetch_add(1, Ordering::Relaxed);
            warn!("Vector store unavailable; skipping embeddings for {file_id}");
            return Ok(WriteOutcome::SkippedUnavailable);
        }

        let lock = self.lock_for(file_id);
        let _guard = lock.lock().await;

        let records: Vec<EmbeddingRecord> = entries
            .into_iter()
            .map(|entry| {
                let (emb_id, kind) = match entry.chunk_index {
                    None => (file_id.to_string(), EmbeddingKind::File),
                    Some(idx) => (format!("{file_id}:c{idx}"), EmbeddingKind::Chunk),
                };
                EmbeddingRecord {
                    emb_id,
                    file_id: file_id.to_string(),
                    chunk_index: entry.chunk_index,
                    modality,
                    collection: collection.to_string(),
                    text: entry.text,
                    embedding: entry.embedding,
                    metadata: EmbeddingMetadata {
                        original_name: original_name.to_string(),
                        storage_uri: storage_uri.map(str::to_string),
                        kind,
                    },
                }
            })
            .collect();

        // Delete-then-insert keeps the chunk set atomic across re-ingests.
        let deleted = self.store.delete_by_file_id(file_id).await?;
        if deleted > 0 {
            debug!("Replaced {deleted} stale embedding rows for {file_id}");
        }

        let written = records.len();
        self.store.upsert(records).await?;
        Ok(WriteOutcome::Written(written))
    }

    fn lock_for(&self, file_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(file_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnivault_core::EMBEDDING_DIM;
    use omnivault_store::MemoryVectorStore;

    fn unit_vec(seed: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        v[seed % EMBEDDING_DIM] = 1.0;
        v
    }

    fn writer(store: Arc<MemoryVectorStore>) -> EmbeddingWriter {
        EmbeddingWriter::new(store as Arc<dyn VectorStore>)
    }

    #[tokio::test]
    async fn test_writes_file_and_chunk_rows() {
        let store = Arc::new(MemoryVectorStore::new("test", EMBEDDING_DIM));
        let writer = writer(Arc::clone(&store));

        let entries = vec![
            EmbeddingEntry::file("summary".to_string(), unit_vec(0)),
            EmbeddingEntry::chunk(EncodedChunk {
                chunk_index: 0,
                text: "chunk zero".to_string(),
                embedding: unit_vec(1),
            }),
            EmbeddingEntry::chunk(EncodedChunk {
                chunk_index: 1,
                text: "chunk one".to_string(),
                embedding: unit_vec(2),
            }),
        ];

        let outcome = writer
            .upsert_embeddings("f1", entries, Modality::Text, "documents", "a.txt", None)
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Written(3));
        assert_eq!(store.count().await.unwrap(), 3);

        let hits = store.query(&unit_vec(0), 10).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.record.emb_id.as_str()).collect();
        assert!(ids.contains(&"f1"));
        assert!(ids.contains(&"f1:c0"));
        assert!(ids.contains(&"f1:c1"));
    }

    #[tokio::test]
    async fn test_reingest_replaces_row_set() {
        let store = Arc::new(MemoryVectorStore::new("test", EMBEDDING_DIM));
        let writer = writer(Arc::clone(&store));

        let first = vec![
            EmbeddingEntry::file("v1".to_string(), unit_vec(0)),
            EmbeddingEntry::chunk(EncodedChunk {
                chunk_index: 0,
                text: "old chunk".to_string(),
                embedding: unit_vec(1),
            }),
            EmbeddingEntry::chunk(EncodedChunk {
                chunk_index: 1,
                text: "old chunk 2".to_string(),
                embedding: unit_vec(2),
            }),
        ];
        writer
            .upsert_embeddings("f1", first, Modality::Text, "documents", "a.txt", None)
            .await
            .unwrap();

        // Re-ingest with fewer chunks; stale ones must disappear.
        let second = vec![EmbeddingEntry::file("v2".to_string(), unit_vec(3))];
        writer
            .upsert_embeddings("f1", second, Modality::Text, "documents", "a.txt", None)
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.query(&unit_vec(3), 10).await.unwrap();
        assert_eq!(hits[0].record.text, "v2");
    }

    #[tokio::test]
    async fn test_unavailable_store_is_recorded_noop() {
        let store = Arc::new(MemoryVectorStore::unavailable("test", EMBEDDING_DIM));
        let writer = writer(Arc::clone(&store));

        let outcome = writer
            .upsert_embeddings(
                "f1",
                vec![EmbeddingEntry::file("t".to_string(), unit_vec(0))],
                Modality::Text,
                "documents",
                "a.txt",
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::SkippedUnavailable);
        assert_eq!(writer.skipped_writes(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reingest_serializes() {
        let store = Arc::new(MemoryVectorStore::new("test", EMBEDDING_DIM));
        let writer = Arc::new(writer(Arc::clone(&store)));

        let mut handles = Vec::new();
        for round in 0..8usize {
            let writer = Arc::clone(&writer);
            handles.push(tokio::spawn(async move {
                let entries = vec![
                    EmbeddingEntry::file(format!("round {round}"), unit_vec(round)),
                    EmbeddingEntry::chunk(EncodedChunk {
                        chunk_index: 0,
                        text: format!("chunk of round {round}"),
                        embedding: unit_vec(round + 1),
                    }),
                ];
                writer
                    .upsert_embeddings("f1", entries, Modality::Text, "documents", "a.txt", None)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whoever won last, the row set is a consistent pair.
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_metadata_rides_on_rows() {
        let store = Arc::new(MemoryVectorStore::new("test", EMBEDDING_DIM));
        let writer = writer(Arc::clone(&store));

        writer
            .upsert_embeddings(
                "f1",
                vec![EmbeddingEntry::file("caption".to_string(), unit_vec(0))],
                Modality::Image,
                "media_assets",
                "cat.jpg",
                Some("image/media_assets/cat.jpg"),
            )
            .await
            .unwrap();

        let hits = store.query(&unit_vec(0), 1).await.unwrap();
        let record = &hits[0].record;
        assert_eq!(record.metadata.original_name, "cat.jpg");
        assert_eq!(
            record.metadata.storage_uri.as_deref(),
            Some("image/media_assets/cat.jpg")
        );
        assert_eq!(record.metadata.kind, EmbeddingKind::File);
        assert_eq!(record.modality, Modality::Image);
        assert_eq!(record.collection, "media_assets");
    }
}
