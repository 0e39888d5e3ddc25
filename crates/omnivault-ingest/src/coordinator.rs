//! The ingestion coordinator: the per-file driver and batch loop.
//!
//! Per file: classify, route, extract and encode, copy into storage,
//! persist metadata, persist embeddings, emit a structured result. A
//! failure in any step is appended to the file's `errors[]` and later
//! steps still run where they remain meaningful; the metadata upsert is
//! the commit point, so nothing is persisted for a file that dies before
//! it.

use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use omnivault_classify::triage;
use omnivault_core::{
    BatchReport, DocumentStore, EncodedFile, Error, ErrorCode, ExtractError, FileError,
    FileRecord, FileResult, FileTriage, Modality, TimeoutConfig,
};
use omnivault_pipeline::MultimodalPipeline;
use omnivault_store::StorageLayout;

use crate::collection::{infer_collection, DEFAULT_COLLECTION, MEDIA_COLLECTION};
use crate::embeddings::{EmbeddingEntry, EmbeddingWriter, WriteOutcome};
use crate::identity::compute_file_id;

/// One file queued for ingestion. The original name is tracked separately
/// because uploads are staged under temporary paths.
#[derive(Debug, Clone)]
pub struct IngestFile {
    pub path: PathBuf,
    pub original_name: String,
}

impl IngestFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, original_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
        }
    }

    /// Use the path's file name as the original name.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        Self {
            path,
            original_name,
        }
    }
}

/// Coordinator policy knobs.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// When the storage copy fails, record metadata with a null
    /// `storage_uri` instead of dropping the file. Off unless the caller
    /// opts in.
    pub record_without_storage: bool,
    pub timeouts: TimeoutConfig,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            record_without_storage: false,
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Drives files through classification, encoding and persistence.
///
/// Files in one batch are processed sequentially; results are emitted in
/// input order. Share one coordinator per batch; the encoder stack behind
/// the pipeline is safe to share across coordinators.
pub struct IngestCoordinator {
    pipeline: MultimodalPipeline,
    layout: Arc<StorageLayout>,
    documents: Arc<dyn DocumentStore>,
    /// Shared across coordinators so per-`file_id` write locks are
    /// process-wide.
    embeddings: Arc<EmbeddingWriter>,
    options: IngestOptions,
    cancelled: Arc<AtomicBool>,
}

impl IngestCoordinator {
    #[must_use]
    pub fn new(
        pipeline: MultimodalPipeline,
        layout: Arc<StorageLayout>,
        documents: Arc<dyn DocumentStore>,
        embeddings: Arc<EmbeddingWriter>,
        options: IngestOptions,
    ) -> Self {
        Self {
            pipeline,
            layout,
            documents,
            embeddings,
            options,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked before each file; flip it to cancel between files. A
    /// file already in progress runs to completion.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Process a batch, emitting per-file results in input order.
    pub async fn process_batch(
        &self,
        files: &[IngestFile],
        upload_metadata: Option<&str>,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        report.total_files = files.len();

        info!("Processing batch of {} files", files.len());

        for (position, file) in files.iter().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                let skipped = files.len() - position;
                warn!("Batch cancelled; skipping {skipped} remaining files");
                report.errors.push(FileError::new(
                    ErrorCode::ExtractFailed,
                    format!("batch cancelled; {skipped} files not processed"),
                ));
                break;
            }

            let result = self.process_file(file, upload_metadata).await;
            if result.modality.is_media() {
                report.media_count += 1;
            } else {
                report.text_count += 1;
            }
            report.results.push(result);
        }

        info!(
            "Batch {} complete: {} media, {} text, {} results",
            report.batch_id, report.media_count, report.text_count, report.results.len()
        );
        report
    }

    /// Drive one file through every step, accumulating structured errors.
    pub async fn process_file(
        &self,
        file: &IngestFile,
        upload_metadata: Option<&str>,
    ) -> FileResult {
        let mut errors: Vec<FileError> = Vec::new();

        // 1. Classify.
        let triage = match triage(&file.path).await {
            Ok(triage) => triage,
            Err(e) => {
                // Classification is advisory; a parse failure routes the
                // file down the document path.
                warn!("Classification failed for {}: {e}", file.original_name);
                FileTriage {
                    modality: Modality::Text,
                    is_media: false,
                    report: None,
                }
            }
        };
        let modality = triage.modality;

        // 2/3. Extract and encode, under the per-modality soft timeout.
        let budget = if modality.is_media() {
            self.options.timeouts.media
        } else {
            self.options.timeouts.text
        };
        let encoded =
            match tokio::time::timeout(budget, self.pipeline.encode_path(&file.path, modality))
                .await
            {
                Ok(Ok(encoded)) => encoded,
                Ok(Err(e)) => {
                    errors.push(encode_failure(&e));
                    degraded_encoding(modality, &file.original_name)
                }
                Err(_) => {
                    let timeout = ExtractError::Timeout(budget.as_secs());
                    errors.push(FileError::new(ErrorCode::ExtractFailed, timeout.to_string()));
                    degraded_encoding(modality, &file.original_name)
                }
            };

        // Collection: media goes to the media bucket, documents to a
        // bucket named from their descriptive text.
        let collection = if modality.is_media() {
            MEDIA_COLLECTION.to_string()
        } else {
            infer_collection(&encoded.descriptive_text)
        };

        // 4. Copy into storage.
        let storage_uri = match self
            .layout
            .copy_into_storage(&file.path, modality, &collection, &file.original_name)
            .await
        {
            Ok(uri) => Some(uri),
            Err(e) => {
                error!("Storage copy failed for {}: {e}", file.original_name);
                errors.push(FileError::new(ErrorCode::StorageWriteFailed, e.to_string()));
                if !self.options.record_without_storage {
                    return FileResult {
                        file_id: None,
                        original_name: file.original_name.clone(),
                        modality,
                        collection: Some(collection),
                        descriptive_text: encoded.descriptive_text,
                        storage_uri: None,
                        embedding_count: 0,
                        errors,
                    };
                }
                None
            }
        };

        // 5. Identity and metadata.
        let file_id = match compute_file_id(&file.path, &file.original_name).await {
            Ok(id) => id,
            Err(e) => {
                errors.push(FileError::new(
                    ErrorCode::ExtractFailed,
                    format!("could not read file for identity hash: {e}"),
                ));
                return FileResult {
                    file_id: None,
                    original_name: file.original_name.clone(),
                    modality,
                    collection: Some(collection),
                    descriptive_text: encoded.descriptive_text,
                    storage_uri,
                    embedding_count: 0,
                    errors,
                };
            }
        };

        let size_bytes = tokio::fs::metadata(&file.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        let extra = build_extra(&encoded, &triage, upload_metadata);
        let descriptive_text = if encoded.descriptive_text.is_empty() {
            // A record is never persisted with an empty description.
            file.original_name.clone()
        } else {
            encoded.descriptive_text.clone()
        };

        let record = FileRecord::new(
            file_id.clone(),
            file.original_name.clone(),
            storage_uri.clone(),
            modality,
            collection.clone(),
            descriptive_text.clone(),
            size_bytes,
            extra,
        );

        let metadata_written = match self.documents.upsert_file(record).await {
            Ok(_) => true,
            Err(e) => {
                error!("Metadata write failed for {file_id}: {e}");
                errors.push(FileError::new(ErrorCode::MetadataWriteFailed, e.to_string()));
                false
            }
        };

        // 6. Embeddings. Skipped when metadata did not land: every vector
        // row must reference an existing file record.
        let mut embedding_count = 0usize;
        if metadata_written {
            if let Some(embedding) = encoded.embedding.clone() {
                let canonical_text = canonical_embedding_text(&encoded, modality);
                let mut entries = vec![EmbeddingEntry::file(canonical_text, embedding)];
                entries.extend(encoded.chunks.iter().cloned().map(EmbeddingEntry::chunk));

                match self
                    .embeddings
                    .upsert_embeddings(
                        &file_id,
                        entries,
                        modality,
                        &collection,
                        &file.original_name,
                        storage_uri.as_deref(),
                    )
                    .await
                {
                    Ok(WriteOutcome::Written(count)) => embedding_count = count,
                    Ok(WriteOutcome::SkippedUnavailable) => {
                        errors.push(FileError::new(
                            ErrorCode::VectorWriteFailed,
                            "vector store unavailable; embeddings skipped",
                        ));
                    }
                    Err(e) => {
                        errors.push(FileError::new(ErrorCode::VectorWriteFailed, e.to_string()));
                    }
                }
            }
        }

        info!(
            "Ingested {} as {} ({}, {} embedding rows, {} errors)",
            file.original_name,
            file_id,
            collection,
            embedding_count,
            errors.len()
        );

        FileResult {
            file_id: Some(file_id),
            original_name: file.original_name.clone(),
            modality,
            collection: Some(collection),
            descriptive_text,
            storage_uri,
            embedding_count,
            errors,
        }
    }
}

/// Map a pipeline error to its taxonomy code.
fn encode_failure(error: &Error) -> FileError {
    let code = match error {
        Error::Encoding(_) => ErrorCode::EncodeFailed,
        _ => ErrorCode::ExtractFailed,
    };
    FileError::new(code, error.to_string())
}

/// The stand-in pipeline output when extraction or encoding failed
/// entirely: the file is still described, stored and recorded, just
/// without vectors.
fn degraded_encoding(modality: Modality, original_name: &str) -> EncodedFile {
    let descriptive_text = if modality.is_media() {
        let mut label = modality.as_str().to_string();
        if let Some(first) = label.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        format!("{label} file {original_name}")
    } else {
        original_name.to_string()
    };

    let mut extra = Map::new();
    if modality.is_media() {
        extra.insert("clip_status".to_string(), json!("unavailable"));
    }

    EncodedFile {
        modality,
        descriptive_text,
        embedding: None,
        chunks: vec![],
        extra,
        clip_generated: false,
    }
}

/// Merge pipeline extras with the classification report and upload
/// metadata.
fn build_extra(
    encoded: &EncodedFile,
    triage: &FileTriage,
    upload_metadata: Option<&str>,
) -> Map<String, Value> {
    let mut extra = encoded.extra.clone();
    if encoded.clip_generated {
        extra.insert("clip_generated".to_string(), json!(true));
    }
    if let Some(report) = &triage.report {
        if let Ok(value) = serde_json::to_value(report) {
            extra.insert("classification".to_string(), value);
        }
    }
    if let Some(metadata) = upload_metadata {
        if !metadata.is_empty() {
            extra.insert("upload_metadata".to_string(), json!(metadata));
        }
    }
    extra
}

/// The text actually encoded into the canonical vector. Matches the
/// descriptive text except for audio without a transcript, where the
/// generic fallback string was encoded.
fn canonical_embedding_text(encoded: &EncodedFile, modality: Modality) -> String {
    if modality == Modality::Audio && encoded.descriptive_text.trim().is_empty() {
        "audio file".to_string()
    } else {
        encoded.descriptive_text.clone()
    }
}
