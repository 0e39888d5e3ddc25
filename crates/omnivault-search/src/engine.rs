//! The search engine: vector path plus metadata fallback.
//!
//! The vector path encodes the query into the shared space, over-fetches
//! `3k` candidates, dedupes them to one (best) row per file and attaches
//! the metadata record. When the vector store or encoder is unavailable
//! the fallback ranks metadata records by term overlap; with a fixed
//! metadata table the fallback is a pure function of its input.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use omnivault_core::{
    DocumentStore, FileRecord, Modality, ScoredEmbedding, SearchError, SearchHit, SearchResponse,
    SearchSource, VectorStore,
};
use omnivault_encode::EncoderStack;

/// Over-fetch factor for the ANN candidate set, preserving chunk-level
/// recall before dedupe collapses candidates to file-level answers.
const CANDIDATE_FACTOR: usize = 3;

/// Cross-store retrieval front end.
pub struct SearchEngine {
    stack: Arc<EncoderStack>,
    vectors: Arc<dyn VectorStore>,
    documents: Arc<dyn DocumentStore>,
}

impl SearchEngine {
    #[must_use]
    pub fn new(
        stack: Arc<EncoderStack>,
        vectors: Arc<dyn VectorStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            stack,
            vectors,
            documents,
        }
    }

    /// Retrieve up to `k` ranked hits for a natural-language query.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        modality_filter: Option<Modality>,
    ) -> Result<SearchResponse, SearchError> {
        let k = k.max(1);

        if self.vectors.available() && self.stack.available() {
            match self.semantic_search(query, k, modality_filter).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Semantic search failed, falling back to metadata: {e}");
                }
            }
        }

        self.metadata_search(query, k, modality_filter).await
    }

    // ------------------------------------------------------------- semantic

    async fn semantic_search(
        &self,
        query: &str,
        k: usize,
        modality_filter: Option<Modality>,
    ) -> Result<SearchResponse, SearchError> {
        let embedding = self
            .stack
            .encode_text(query)
            .await
            .map_err(|e| SearchError::Embed(e.to_string()))?;

        let candidates = self
            .vectors
            .query(&embedding, k * CANDIDATE_FACTOR)
            .await
            .map_err(|e| SearchError::Query(e.to_string()))?;

        debug!("Semantic search: {} candidates for k={k}", candidates.len());

        // Keep the best-scoring row per file. Candidates arrive best-first,
        // so the first row seen for a file wins.
        let mut best_per_file: Vec<ScoredEmbedding> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for candidate in candidates {
            if modality_filter.is_some_and(|m| candidate.record.modality != m) {
                continue;
            }
            if seen.insert(candidate.record.file_id.clone()) {
                best_per_file.push(candidate);
            }
            if best_per_file.len() == k {
                break;
            }
        }

        // Deterministic ordering: score descending, file_id ascending.
        best_per_file.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.file_id.cmp(&b.record.file_id))
        });

        let mut results = Vec::with_capacity(best_per_file.len());
        for scored in best_per_file {
            let record = self
                .documents
                .get_file(&scored.record.file_id)
                .await
                .map_err(|e| SearchError::Query(e.to_string()))?;
            results.push(semantic_hit(scored, record));
        }

        Ok(SearchResponse {
            results,
            source: SearchSource::Semantic,
        })
    }

    // ------------------------------------------------------------- fallback

    async fn metadata_search(
        &self,
        query: &str,
        k: usize,
        modality_filter: Option<Modality>,
    ) -> Result<SearchResponse, SearchError> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(SearchResponse {
                results: vec![],
                source: SearchSource::Metadata,
            });
        }

        let records = self
            .documents
            .all_files()
            .await
            .map_err(|e| SearchError::Query(e.to_string()))?;

        let mut scored: Vec<(f32, FileRecord)> = records
            .into_iter()
            .filter(|record| modality_filter.map_or(true, |m| record.modality == m))
            .filter_map(|record| {
                let haystack = format!(
                    "{} {} {}",
                    record.descriptive_text, record.summary_preview, record.original_name
                )
                .to_lowercase();
                let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                if matched == 0 {
                    None
                } else {
                    // Normalized term overlap stands in for similarity.
                    Some((matched as f32 / terms.len() as f32, record))
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.file_id.cmp(&b.1.file_id))
        });
        scored.truncate(k);

        debug!("Metadata fallback: {} hits for {:?}", scored.len(), query);

        let results = scored.into_iter().map(|(similarity, record)| {
            metadata_hit(similarity, record)
        });

        Ok(SearchResponse {
            results: results.collect(),
            source: SearchSource::Metadata,
        })
    }
}

/// Lowercase alphanumeric query terms.
fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn semantic_hit(scored: ScoredEmbedding, record: Option<FileRecord>) -> SearchHit {
    let row = scored.record;
    let (description, path, name) = match &record {
        Some(r) => (
            r.descriptive_text.clone(),
            r.storage_uri.clone(),
            r.original_name.clone(),
        ),
        None => (
            row.text.clone(),
            row.metadata.storage_uri.clone(),
            row.metadata.original_name.clone(),
        ),
    };

    let metadata = json!({
        "file_id": row.file_id.clone(),
        "emb_id": row.emb_id.clone(),
        "collection": row.collection.clone(),
        "chunk_index": row.chunk_index,
        "storage_uri": path.clone(),
        "extra": record.map(|r| serde_json::Value::Object(r.extra)),
    });

    SearchHit {
        id: row.file_id,
        name,
        path,
        modality: row.modality,
        similarity: scored.similarity,
        description,
        metadata,
        is_chunk: row.chunk_index.is_some(),
        text: row.text,
    }
}

fn metadata_hit(similarity: f32, record: FileRecord) -> SearchHit {
    let metadata = json!({
        "file_id": record.file_id.clone(),
        "collection": record.collection,
        "storage_uri": record.storage_uri.clone(),
        "extra": record.extra,
    });

    SearchHit {
        id: record.file_id,
        name: record.original_name,
        path: record.storage_uri,
        modality: record.modality,
        similarity,
        description: record.descriptive_text,
        metadata,
        is_chunk: false,
        text: record.summary_preview,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnivault_core::{
        EmbeddingKind, EmbeddingMetadata, EmbeddingRecord, VaultConfig, EMBEDDING_DIM,
    };
    use omnivault_store::{MemoryDocumentStore, MemoryVectorStore};
    use serde_json::Map;

    fn stack() -> Arc<EncoderStack> {
        Arc::new(EncoderStack::initialize(&VaultConfig::default()))
    }

    fn record(file_id: &str, name: &str, text: &str) -> FileRecord {
        FileRecord::new(
            file_id.to_string(),
            name.to_string(),
            Some(format!("text/documents/{name}")),
            Modality::Text,
            "documents".to_string(),
            text.to_string(),
            10,
            Map::new(),
        )
    }

    async fn seed_row(
        stack: &EncoderStack,
        vectors: &MemoryVectorStore,
        file_id: &str,
        text: &str,
        chunk_index: Option<u32>,
    ) {
        let embedding = stack.encode_text(text).await.unwrap();
        let emb_id = match chunk_index {
            None => file_id.to_string(),
            Some(i) => format!("{file_id}:c{i}"),
        };
        vectors
            .upsert(vec![EmbeddingRecord {
                emb_id,
                file_id: file_id.to_string(),
                chunk_index,
                modality: Modality::Text,
                collection: "documents".to_string(),
                text: text.to_string(),
                embedding,
                metadata: EmbeddingMetadata {
                    original_name: format!("{file_id}.txt"),
                    storage_uri: None,
                    kind: if chunk_index.is_some() {
                        EmbeddingKind::Chunk
                    } else {
                        EmbeddingKind::File
                    },
                },
            }])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_semantic_exact_text_is_top_hit() {
        let stack = stack();
        let vectors = Arc::new(MemoryVectorStore::new("test", EMBEDDING_DIM));
        let documents = Arc::new(MemoryDocumentStore::new());

        documents
            .upsert_file(record("f1", "paper.txt", "We propose a new caching scheme."))
            .await
            .unwrap();
        documents
            .upsert_file(record("f2", "cats.txt", "Photos of cats playing outside."))
            .await
            .unwrap();

        seed_row(&stack, &vectors, "f1", "We propose a new caching scheme.", None).await;
        seed_row(&stack, &vectors, "f2", "Photos of cats playing outside.", None).await;

        let engine = SearchEngine::new(
            Arc::clone(&stack),
            vectors as Arc<dyn VectorStore>,
            documents as Arc<dyn DocumentStore>,
        );

        let response = engine
            .search("We propose a new caching scheme.", 1, None)
            .await
            .unwrap();

        assert_eq!(response.source, SearchSource::Semantic);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "f1");
        assert!(response.results[0].similarity >= 0.9);
        assert!(!response.results[0].is_chunk);
    }

    #[tokio::test]
    async fn test_semantic_dedupes_chunks_to_file_level() {
        let stack = stack();
        let vectors = Arc::new(MemoryVectorStore::new("test", EMBEDDING_DIM));
        let documents = Arc::new(MemoryDocumentStore::new());

        documents
            .upsert_file(record("f1", "long.txt", "A long report about caching."))
            .await
            .unwrap();

        seed_row(&stack, &vectors, "f1", "A long report about caching.", None).await;
        seed_row(&stack, &vectors, "f1", "caching layers explained", Some(0)).await;
        seed_row(&stack, &vectors, "f1", "unrelated appendix text", Some(1)).await;

        let engine = SearchEngine::new(
            Arc::clone(&stack),
            vectors as Arc<dyn VectorStore>,
            documents as Arc<dyn DocumentStore>,
        );

        let response = engine.search("caching", 5, None).await.unwrap();
        // Three rows collapse to one file-level hit.
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "f1");
    }

    #[tokio::test]
    async fn test_fallback_when_vectors_unavailable() {
        let stack = stack();
        let vectors = Arc::new(MemoryVectorStore::unavailable("test", EMBEDDING_DIM));
        let documents = Arc::new(MemoryDocumentStore::new());

        documents
            .upsert_file(record("f1", "paper.pdf", "We propose a new caching scheme."))
            .await
            .unwrap();
        documents
            .upsert_file(record("f2", "cats.txt", "Photos of cats."))
            .await
            .unwrap();

        let engine = SearchEngine::new(
            stack,
            vectors as Arc<dyn VectorStore>,
            documents as Arc<dyn DocumentStore>,
        );

        let response = engine.search("caching scheme", 3, None).await.unwrap();
        assert_eq!(response.source, SearchSource::Metadata);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "f1");
        assert!((response.results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let stack = stack();
        let vectors = Arc::new(MemoryVectorStore::unavailable("test", EMBEDDING_DIM));
        let documents = Arc::new(MemoryDocumentStore::new());

        for (id, text) in [
            ("f3", "caching and retrieval"),
            ("f1", "caching and retrieval"),
            ("f2", "caching and retrieval"),
        ] {
            documents
                .upsert_file(record(id, &format!("{id}.txt"), text))
                .await
                .unwrap();
        }

        let engine = SearchEngine::new(
            stack,
            vectors as Arc<dyn VectorStore>,
            documents as Arc<dyn DocumentStore>,
        );

        let first = engine.search("caching", 3, None).await.unwrap();
        let second = engine.search("caching", 3, None).await.unwrap();

        let ids: Vec<&str> = first.results.iter().map(|h| h.id.as_str()).collect();
        // Equal scores break ties by file_id ascending, every time.
        assert_eq!(ids, vec!["f1", "f2", "f3"]);
        let ids_again: Vec<&str> = second.results.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ids_again);
    }

    #[tokio::test]
    async fn test_fallback_partial_term_overlap() {
        let stack = stack();
        let vectors = Arc::new(MemoryVectorStore::unavailable("test", EMBEDDING_DIM));
        let documents = Arc::new(MemoryDocumentStore::new());

        documents
            .upsert_file(record("f1", "a.txt", "only caching here"))
            .await
            .unwrap();

        let engine = SearchEngine::new(
            stack,
            vectors as Arc<dyn VectorStore>,
            documents as Arc<dyn DocumentStore>,
        );

        let response = engine
            .search("caching pyramids", 3, None)
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
        assert!((response.results[0].similarity - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_modality_filter() {
        let stack = stack();
        let vectors = Arc::new(MemoryVectorStore::unavailable("test", EMBEDDING_DIM));
        let documents = Arc::new(MemoryDocumentStore::new());

        documents
            .upsert_file(record("f1", "doc.txt", "caching notes"))
            .await
            .unwrap();
        let mut media = record("f2", "cat.jpg", "a cat image about caching");
        media.modality = Modality::Image;
        documents.upsert_file(media).await.unwrap();

        let engine = SearchEngine::new(
            stack,
            vectors as Arc<dyn VectorStore>,
            documents as Arc<dyn DocumentStore>,
        );

        let response = engine
            .search("caching", 5, Some(Modality::Image))
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "f2");
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let stack = stack();
        let vectors = Arc::new(MemoryVectorStore::unavailable("test", EMBEDDING_DIM));
        let documents = Arc::new(MemoryDocumentStore::new());

        let engine = SearchEngine::new(
            stack,
            vectors as Arc<dyn VectorStore>,
            documents as Arc<dyn DocumentStore>,
        );

        let response = engine.search("  !!  ", 3, None).await.unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.source, SearchSource::Metadata);
    }

    #[test]
    fn test_query_terms() {
        assert_eq!(query_terms("Caching, Scheme!"), vec!["caching", "scheme"]);
        assert!(query_terms("...").is_empty());
    }
}
