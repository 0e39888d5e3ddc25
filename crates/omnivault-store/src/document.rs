//! In-memory document store.
//!
//! The shipping [`DocumentStore`] implementation. Production deployments
//! point the same trait at an external document database; when none is
//! configured the system degrades to this store and keeps working.

use async_trait::async_trait;
use chrono::Utc;
use omnivault_core::{DocumentStore, FileRecord, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Thread-safe in-memory metadata store keyed by `file_id`.
pub struct MemoryDocumentStore {
    files: Arc<RwLock<HashMap<String, FileRecord>>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert_file(&self, record: FileRecord) -> Result<FileRecord, StoreError> {
        let mut files = self.files.write().await;

        let merged = match files.get(&record.file_id) {
            None => record,
            Some(existing) => {
                // Immutable fields and created_at survive; extra is merged,
                // the descriptive fields are replaced, updated_at advances.
                let mut extra = existing.extra.clone();
                for (key, value) in record.extra {
                    extra.insert(key, value);
                }
                FileRecord {
                    file_id: existing.file_id.clone(),
                    original_name: existing.original_name.clone(),
                    storage_uri: record.storage_uri.or_else(|| existing.storage_uri.clone()),
                    modality: existing.modality,
                    collection: existing.collection.clone(),
                    descriptive_text: record.descriptive_text,
                    summary_preview: record.summary_preview,
                    size_bytes: existing.size_bytes,
                    extra,
                    created_at: existing.created_at,
                    updated_at: Utc::now(),
                }
            }
        };

        debug!("Upserted file record {}", merged.file_id);
        files.insert(merged.file_id.clone(), merged.clone());
        Ok(merged)
    }

    async fn get_file(&self, file_id: &str) -> Result<Option<FileRecord>, StoreError> {
        let files = self.files.read().await;
        Ok(files.get(file_id).cloned())
    }

    async fn all_files(&self) -> Result<Vec<FileRecord>, StoreError> {
        let files = self.files.read().await;
        Ok(files.values().cloned().collect())
    }

    async fn find_substring(&self, needle: &str) -> Result<Vec<FileRecord>, StoreError> {
        let needle = needle.to_lowercase();
        let files = self.files.read().await;
        Ok(files
            .values()
            .filter(|record| {
                record.descriptive_text.to_lowercase().contains(&needle)
                    || record.summary_preview.to_lowercase().contains(&needle)
                    || record.original_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let files = self.files.read().await;
        Ok(files.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnivault_core::Modality;
    use serde_json::{json, Map};

    fn record(file_id: &str, text: &str) -> FileRecord {
        FileRecord::new(
            file_id.to_string(),
            "doc.txt".to_string(),
            Some("text/documents/doc.txt".to_string()),
            Modality::Text,
            "documents".to_string(),
            text.to_string(),
            17,
            Map::new(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryDocumentStore::new();
        store.upsert_file(record("f1", "hello")).await.unwrap();

        let fetched = store.get_file("f1").await.unwrap().unwrap();
        assert_eq!(fetched.descriptive_text, "hello");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryDocumentStore::new();
        assert!(store.get_file("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_merges_and_preserves_immutables() {
        let store = MemoryDocumentStore::new();

        let mut first = record("f1", "first text");
        first.extra.insert("width".to_string(), json!(640));
        let stored_first = store.upsert_file(first).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let mut second = record("f1", "second text");
        second.size_bytes = 9999; // must not win
        second.extra.insert("height".to_string(), json!(480));
        let stored_second = store.upsert_file(second).await.unwrap();

        assert_eq!(stored_second.descriptive_text, "second text");
        assert_eq!(stored_second.size_bytes, 17);
        assert_eq!(stored_second.created_at, stored_first.created_at);
        assert!(stored_second.updated_at > stored_first.updated_at);
        assert_eq!(stored_second.extra["width"], json!(640));
        assert_eq!(stored_second.extra["height"], json!(480));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_existing_storage_uri_when_absent() {
        let store = MemoryDocumentStore::new();
        store.upsert_file(record("f1", "text")).await.unwrap();

        let mut update = record("f1", "new text");
        update.storage_uri = None;
        let merged = store.upsert_file(update).await.unwrap();
        assert_eq!(
            merged.storage_uri.as_deref(),
            Some("text/documents/doc.txt")
        );
    }

    #[tokio::test]
    async fn test_find_substring_case_insensitive() {
        let store = MemoryDocumentStore::new();
        store
            .upsert_file(record("f1", "A paper about Caching schemes"))
            .await
            .unwrap();
        store
            .upsert_file(record("f2", "holiday photos"))
            .await
            .unwrap();

        let hits = store.find_substring("caching").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_id, "f1");

        // Also matches on original_name.
        let hits = store.find_substring("DOC.TXT").await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
