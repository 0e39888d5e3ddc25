//! In-memory vector store.
//!
//! Brute-force cosine search over the embedding rows. Fine for the scales
//! this system targets in one process; external ANN stores implement the
//! same [`VectorStore`] contract. The `available` flag models a store that
//! is configured but unreachable, which the writers and search treat as a
//! signal to degrade rather than fail.

use async_trait::async_trait;
use omnivault_core::{
    cosine_similarity, EmbeddingRecord, ScoredEmbedding, StoreError, VectorStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Thread-safe in-memory embedding store.
pub struct MemoryVectorStore {
    collection: String,
    dimension: usize,
    rows: Arc<RwLock<HashMap<String, EmbeddingRecord>>>,
    available: AtomicBool,
}

impl MemoryVectorStore {
    #[must_use]
    pub fn new(collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            collection: collection.into(),
            dimension,
            rows: Arc::new(RwLock::new(HashMap::new())),
            available: AtomicBool::new(true),
        }
    }

    /// A store that reports itself unreachable; writers no-op and search
    /// falls back to metadata mode.
    #[must_use]
    pub fn unavailable(collection: impl Into<String>, dimension: usize) -> Self {
        let store = Self::new(collection, dimension);
        store.available.store(false, Ordering::SeqCst);
        store
    }

    /// Flip availability at runtime (tests, admin toggles).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<(), StoreError> {
        if !self.available() {
            return Err(StoreError::Unavailable(format!(
                "vector store {} not reachable",
                self.collection
            )));
        }

        for record in &records {
            if record.embedding.len() != self.dimension {
                return Err(StoreError::Insert(format!(
                    "embedding dimension {} does not match store dimension {}",
                    record.embedding.len(),
                    self.dimension
                )));
            }
        }

        let mut rows = self.rows.write().await;
        let count = records.len();
        for record in records {
            rows.insert(record.emb_id.clone(), record);
        }
        debug!("Upserted {count} embedding rows into {}", self.collection);
        Ok(())
    }

    async fn delete_by_file_id(&self, file_id: &str) -> Result<u64, StoreError> {
        if !self.available() {
            return Err(StoreError::Unavailable(format!(
                "vector store {} not reachable",
                self.collection
            )));
        }

        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, record| record.file_id != file_id);
        Ok((before - rows.len()) as u64)
    }

    async fn query(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredEmbedding>, StoreError> {
        if !self.available() {
            return Err(StoreError::Unavailable(format!(
                "vector store {} not reachable",
                self.collection
            )));
        }

        let rows = self.rows.read().await;
        let mut scored: Vec<ScoredEmbedding> = rows
            .values()
            .map(|record| ScoredEmbedding {
                similarity: cosine_similarity(embedding, &record.embedding),
                record: record.clone(),
            })
            .collect();

        // Deterministic order: best first, ties by emb_id.
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.emb_id.cmp(&b.record.emb_id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnivault_core::{EmbeddingKind, EmbeddingMetadata, Modality};

    const DIM: usize = 4;

    fn row(emb_id: &str, file_id: &str, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            emb_id: emb_id.to_string(),
            file_id: file_id.to_string(),
            chunk_index: None,
            modality: Modality::Text,
            collection: "documents".to_string(),
            text: "some text".to_string(),
            embedding,
            metadata: EmbeddingMetadata {
                original_name: "doc.txt".to_string(),
                storage_uri: None,
                kind: EmbeddingKind::File,
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_and_count() {
        let store = MemoryVectorStore::new("test", DIM);
        store
            .upsert(vec![
                row("a", "f1", vec![1.0, 0.0, 0.0, 0.0]),
                row("b", "f2", vec![0.0, 1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = MemoryVectorStore::new("test", DIM);
        store
            .upsert(vec![row("a", "f1", vec![1.0, 0.0, 0.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(vec![row("a", "f1", vec![0.0, 1.0, 0.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_checked() {
        let store = MemoryVectorStore::new("test", DIM);
        let result = store.upsert(vec![row("a", "f1", vec![1.0, 0.0])]).await;
        assert!(matches!(result, Err(StoreError::Insert(_))));
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let store = MemoryVectorStore::new("test", DIM);
        store
            .upsert(vec![
                row("a", "f1", vec![1.0, 0.0, 0.0, 0.0]),
                row("b", "f2", vec![0.0, 1.0, 0.0, 0.0]),
                row("c", "f3", vec![0.7, 0.7, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.emb_id, "a");
        assert!((hits[0].similarity - 1.0).abs() < 1e-5);
        assert_eq!(hits[1].record.emb_id, "c");
    }

    #[tokio::test]
    async fn test_query_ties_break_by_emb_id() {
        let store = MemoryVectorStore::new("test", DIM);
        store
            .upsert(vec![
                row("z", "f1", vec![1.0, 0.0, 0.0, 0.0]),
                row("a", "f2", vec![1.0, 0.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].record.emb_id, "a");
        assert_eq!(hits[1].record.emb_id, "z");
    }

    #[tokio::test]
    async fn test_delete_by_file_id() {
        let store = MemoryVectorStore::new("test", DIM);
        store
            .upsert(vec![
                row("f1", "f1", vec![1.0, 0.0, 0.0, 0.0]),
                row("f1:c0", "f1", vec![0.0, 1.0, 0.0, 0.0]),
                row("f2", "f2", vec![0.0, 0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let deleted = store.delete_by_file_id("f1").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_refuses_operations() {
        let store = MemoryVectorStore::unavailable("test", DIM);
        assert!(!store.available());
        assert!(matches!(
            store.upsert(vec![]).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.query(&[0.0; DIM], 1).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_available(true);
        assert!(store.upsert(vec![]).await.is_ok());
    }
}
