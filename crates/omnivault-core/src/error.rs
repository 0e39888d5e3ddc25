//! Error types for Omnivault.
//!
//! Component errors are captured at component boundaries and converted into
//! structured [`FileError`](crate::types::FileError) entries carrying an
//! [`ErrorCode`]; they are never allowed to cross a boundary as a panic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error taxonomy surfaced in `errors[]` entries and API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Extension unrecognized and no fallback succeeded.
    UnsupportedType,
    /// Extractor raised or timed out.
    ExtractFailed,
    /// Encoder unavailable or raised.
    EncodeFailed,
    /// Copy failed, disk full, path invalid.
    StorageWriteFailed,
    /// Document store unreachable or constraint violation.
    MetadataWriteFailed,
    /// Vector store unavailable; logged and skipped.
    VectorWriteFailed,
    /// Semantic search could neither embed nor fall back.
    QueryFailed,
    /// Download path escapes the storage root.
    InvalidPath,
}

impl ErrorCode {
    /// Stable wire form of the code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedType => "UNSUPPORTED_TYPE",
            ErrorCode::ExtractFailed => "EXTRACT_FAILED",
            ErrorCode::EncodeFailed => "ENCODE_FAILED",
            ErrorCode::StorageWriteFailed => "STORAGE_WRITE_FAILED",
            ErrorCode::MetadataWriteFailed => "METADATA_WRITE_FAILED",
            ErrorCode::VectorWriteFailed => "VECTOR_WRITE_FAILED",
            ErrorCode::QueryFailed => "QUERY_FAILED",
            ErrorCode::InvalidPath => "INVALID_PATH",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for Omnivault operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Content extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// Encoding failed
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodeError),

    /// Classification failed
    #[error("classification error: {0}")]
    Classification(#[from] ClassifyError),

    /// Store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Search failed
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Content extraction errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("sidecar process failed: {0}")]
    Sidecar(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction timed out after {0}s")]
    Timeout(u64),

    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Encoder errors.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("encoder not available: {0}")]
    Unavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Classifier errors.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Document and vector store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store initialization failed: {0}")]
    Init(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Retrieval errors.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embed(String),

    #[error("query failed: {0}")]
    Query(String),
}

/// Result type alias for Omnivault operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_forms() {
        assert_eq!(ErrorCode::UnsupportedType.as_str(), "UNSUPPORTED_TYPE");
        assert_eq!(ErrorCode::ExtractFailed.as_str(), "EXTRACT_FAILED");
        assert_eq!(ErrorCode::EncodeFailed.as_str(), "ENCODE_FAILED");
        assert_eq!(ErrorCode::StorageWriteFailed.as_str(), "STORAGE_WRITE_FAILED");
        assert_eq!(ErrorCode::MetadataWriteFailed.as_str(), "METADATA_WRITE_FAILED");
        assert_eq!(ErrorCode::VectorWriteFailed.as_str(), "VECTOR_WRITE_FAILED");
        assert_eq!(ErrorCode::QueryFailed.as_str(), "QUERY_FAILED");
        assert_eq!(ErrorCode::InvalidPath.as_str(), "INVALID_PATH");
    }

    #[test]
    fn test_error_code_serde_matches_as_str() {
        for code in [
            ErrorCode::UnsupportedType,
            ErrorCode::ExtractFailed,
            ErrorCode::EncodeFailed,
            ErrorCode::StorageWriteFailed,
            ErrorCode::MetadataWriteFailed,
            ErrorCode::VectorWriteFailed,
            ErrorCode::QueryFailed,
            ErrorCode::InvalidPath,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_extract_error_display() {
        let err = ExtractError::UnsupportedType("application/octet-stream".to_string());
        assert_eq!(
            err.to_string(),
            "unsupported file type: application/octet-stream"
        );

        let err = ExtractError::Timeout(30);
        assert_eq!(err.to_string(), "extraction timed out after 30s");
    }

    #[test]
    fn test_encode_error_display() {
        let err = EncodeError::DimensionMismatch {
            expected: 512,
            actual: 384,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 512, got 384");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("vector store disabled".to_string());
        assert_eq!(err.to_string(), "store unavailable: vector store disabled");
    }

    #[test]
    fn test_error_from_component_errors() {
        let err: Error = ExtractError::Failed("bad pdf".to_string()).into();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.to_string().contains("bad pdf"));

        let err: Error = StoreError::Insert("dup".to_string()).into();
        assert!(matches!(err, Error::Store(_)));

        let err: Error = EncodeError::Inference("oom".to_string()).into();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_error_chain_io_to_extract_to_main() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.txt");
        let extract_err: ExtractError = io_err.into();
        let main_err: Error = extract_err.into();
        assert!(matches!(main_err, Error::Extraction(ExtractError::Io(_))));
        assert!(main_err.to_string().contains("extraction error"));
    }
}
