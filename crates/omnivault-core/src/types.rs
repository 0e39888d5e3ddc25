//! Core types for Omnivault.
//!
//! This module contains the shared data structures used across the system:
//!
//! ## Records
//! - [`FileRecord`]: Durable metadata about an ingested file
//! - [`EmbeddingRecord`]: A vector row persisted in the vector store
//!
//! ## Triage
//! - [`Modality`]: image / video / audio / text / unknown
//! - [`FileTriage`]: Output of the two-stage file classifier
//! - [`ClassificationReport`]: SQL-vs-NoSQL scoring detail
//!
//! ## Pipeline
//! - [`EncodedFile`]: Output of the multimodal pipeline for one file
//! - [`EncodedChunk`]: A per-chunk (or per-frame) embedding
//! - [`RgbFrame`]: A decoded RGB image buffer handed to encoders
//!
//! ## Ingestion & search
//! - [`FileResult`] / [`BatchReport`]: Per-file and per-batch ingest outcome
//! - [`SearchHit`] / [`SearchResponse`]: Ranked retrieval results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::error::ErrorCode;

/// Dimension of the shared multimodal embedding space.
///
/// All image and text vectors live in one space of this size; the value is
/// committed process-wide and checked by stores on insert.
pub const EMBEDDING_DIM: usize = 512;

/// Hard ceiling on persisted descriptive text, in bytes.
pub const MAX_DESCRIPTIVE_TEXT_BYTES: usize = 8 * 1024;

/// Length of the derived `summary_preview` field, in characters.
pub const SUMMARY_PREVIEW_CHARS: usize = 500;

// ============================================================================
// Modality
// ============================================================================

/// Content modality assigned during triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Image,
    Video,
    Audio,
    Text,
    Unknown,
}

impl Modality {
    /// Stable lowercase name, used in storage paths and record fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Video => "video",
            Modality::Audio => "audio",
            Modality::Text => "text",
            Modality::Unknown => "unknown",
        }
    }

    /// Whether this modality routes to the media (CLIP-style) encoders.
    #[must_use]
    pub fn is_media(&self) -> bool {
        matches!(self, Modality::Image | Modality::Video | Modality::Audio)
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// File records
// ============================================================================

/// Durable metadata document, keyed by `file_id` in the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Deterministic identifier: SHA-256 over name, size and leading content.
    pub file_id: String,
    /// Name as uploaded. Immutable across re-ingests.
    pub original_name: String,
    /// Path relative to the storage root, set once on successful copy.
    pub storage_uri: Option<String>,
    /// Modality assigned during triage. Set once.
    pub modality: Modality,
    /// Logical bucket, scoping the storage sub-directory. Set once.
    pub collection: String,
    /// Caption, transcript or summary. Non-empty on success, capped at 8 KiB.
    pub descriptive_text: String,
    /// First 500 characters of `descriptive_text`.
    pub summary_preview: String,
    /// File size in bytes. Immutable.
    pub size_bytes: u64,
    /// Modality-specific metadata (dimensions, duration, page_count, ...).
    pub extra: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build a record, deriving `summary_preview` and clamping the
    /// descriptive text to its persisted ceiling.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        file_id: String,
        original_name: String,
        storage_uri: Option<String>,
        modality: Modality,
        collection: String,
        descriptive_text: String,
        size_bytes: u64,
        extra: Map<String, Value>,
    ) -> Self {
        let descriptive_text = clamp_chars_to_bytes(&descriptive_text, MAX_DESCRIPTIVE_TEXT_BYTES);
        let summary_preview = descriptive_text
            .chars()
            .take(SUMMARY_PREVIEW_CHARS)
            .collect();
        let now = Utc::now();
        Self {
            file_id,
            original_name,
            storage_uri,
            modality,
            collection,
            descriptive_text,
            summary_preview,
            size_bytes,
            extra,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Truncate a string to at most `max_bytes`, respecting char boundaries.
fn clamp_chars_to_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

// ============================================================================
// Embedding records
// ============================================================================

/// Whether an embedding row covers the whole file or a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    File,
    Chunk,
}

/// Metadata carried on every vector row so search can explain hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    pub original_name: String,
    pub storage_uri: Option<String>,
    #[serde(rename = "type")]
    pub kind: EmbeddingKind,
}

/// A row persisted in the vector store.
///
/// Invariants: `embedding` is L2-unit-normalized with length
/// [`EMBEDDING_DIM`]; `text` equals the text actually encoded into the
/// vector; `modality` and `collection` match the referenced [`FileRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// `file_id` for the canonical row, `file_id:c<idx>` for chunks.
    pub emb_id: String,
    pub file_id: String,
    pub chunk_index: Option<u32>,
    pub modality: Modality,
    pub collection: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: EmbeddingMetadata,
}

/// A vector row paired with its similarity to a query embedding.
#[derive(Debug, Clone)]
pub struct ScoredEmbedding {
    pub record: EmbeddingRecord,
    pub similarity: f32,
}

// ============================================================================
// Triage / classification
// ============================================================================

/// SQL-vs-NoSQL decision for a non-media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "SQL")]
    Sql,
    #[serde(rename = "NoSQL")]
    NoSql,
}

/// Detailed output of the structural scoring stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classification: Classification,
    pub sql_score: f32,
    pub nosql_score: f32,
    /// `|sql - nosql| / max(sql, nosql, 1)`.
    pub confidence: f32,
    /// One human-readable line per signal that fired.
    pub reasons: Vec<String>,
    /// Parser bucket the file was evaluated through (json, csv, xml, ...).
    pub file_type: String,
}

/// Combined output of the two-stage classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTriage {
    pub modality: Modality,
    pub is_media: bool,
    /// Present for non-media files only.
    pub report: Option<ClassificationReport>,
}

// ============================================================================
// Pipeline output
// ============================================================================

/// A decoded RGB8 image buffer, the unit handed to image encoders.
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB8 pixel data, `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

impl RgbFrame {
    /// Mean luminance of a rectangular region, in `[0, 255]`.
    ///
    /// Out-of-bounds coordinates are clamped; an empty region returns 0.
    #[must_use]
    pub fn region_luminance(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> f32 {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return 0.0;
        }
        let mut sum = 0.0f64;
        let mut count = 0u64;
        for y in y0..y1 {
            for x in x0..x1 {
                let idx = ((y * self.width + x) * 3) as usize;
                let r = f64::from(self.pixels[idx]);
                let g = f64::from(self.pixels[idx + 1]);
                let b = f64::from(self.pixels[idx + 2]);
                sum += 0.299 * r + 0.587 * g + 0.114 * b;
                count += 1;
            }
        }
        (sum / count as f64) as f32
    }
}

/// A per-chunk embedding: a text passage for documents, a sampled frame for
/// video.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub chunk_index: u32,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Output of the multimodal pipeline for a single file.
#[derive(Debug, Clone)]
pub struct EncodedFile {
    pub modality: Modality,
    pub descriptive_text: String,
    /// Whole-file vector. Absent only when encoding failed entirely.
    pub embedding: Option<Vec<f32>>,
    pub chunks: Vec<EncodedChunk>,
    /// Modality-specific metadata merged into the file record's `extra`.
    pub extra: Map<String, Value>,
    /// True when the vector came from the image or audio encoder path.
    pub clip_generated: bool,
}

// ============================================================================
// Ingestion results
// ============================================================================

/// A structured error surfaced in `errors[]` entries and API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileError {
    pub code: ErrorCode,
    pub message: String,
}

impl FileError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Per-file outcome emitted by the ingestion coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub file_id: Option<String>,
    pub original_name: String,
    pub modality: Modality,
    pub collection: Option<String>,
    pub descriptive_text: String,
    pub storage_uri: Option<String>,
    /// Canonical row plus chunk rows actually written.
    pub embedding_count: usize,
    pub errors: Vec<FileError>,
}

/// Aggregate outcome of one `process_batch` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub total_files: usize,
    pub media_count: usize,
    pub text_count: usize,
    pub results: Vec<FileResult>,
    /// Batch-level errors (files that could not start processing).
    pub errors: Vec<FileError>,
}

impl BatchReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            total_files: 0,
            media_count: 0,
            text_count: 0,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Search
// ============================================================================

/// Which retrieval path produced a set of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Semantic,
    Metadata,
}

/// A ranked retrieval hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// `file_id` of the matched file (chunk hits are deduped to file level).
    pub id: String,
    pub name: String,
    /// Storage URI relative to the storage root.
    pub path: Option<String>,
    pub modality: Modality,
    /// Cosine similarity, or normalized term overlap in fallback mode.
    pub similarity: f32,
    /// The file's descriptive text.
    pub description: String,
    pub metadata: Value,
    #[serde(rename = "isChunk")]
    pub is_chunk: bool,
    /// The text of the best-matching row (chunk text for chunk hits).
    pub text: String,
}

/// Results plus the path that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub source: SearchSource,
}

// ============================================================================
// Configuration fragments
// ============================================================================

/// Text chunking parameters (approximate tokens).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Target chunk size in tokens.
    pub target_tokens: usize,
    /// Overlap between consecutive chunks in tokens.
    pub overlap_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            target_tokens: 512,
            overlap_tokens: 64,
        }
    }
}

/// Video frame sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Frames sampled per second of source footage.
    pub fps_factor: f64,
    /// Optional hard cap on sampled frames.
    pub max_frames: Option<usize>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps_factor: 0.3,
            max_frames: None,
        }
    }
}

/// Per-file soft timeouts applied by the ingestion coordinator.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub media: Duration,
    pub text: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            media: Duration::from_secs(120),
            text: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Vector math helpers
// ============================================================================

/// L2-normalize a vector in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two vectors of equal length.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Element-wise mean of equal-length vectors, re-normalized to unit length.
///
/// Returns `None` for an empty input. Re-normalization after averaging is
/// mandatory: the mean of unit vectors is not itself unit length.
#[must_use]
pub fn mean_pool(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dim = first.len();
    let mut out = vec![0.0f32; dim];
    for v in vectors {
        for (o, x) in out.iter_mut().zip(v.iter()) {
            *o += x;
        }
    }
    let n = vectors.len() as f32;
    for o in out.iter_mut() {
        *o /= n;
    }
    l2_normalize(&mut out);
    Some(out)
}
