//! # omnivault-classify
//!
//! Two-stage file triage.
//!
//! 1. **Media detection** ([`detect_modality`]): MIME hint, then the
//!    extension tables. Unknown extensions are treated as text.
//! 2. **SQL-vs-NoSQL scoring** ([`FileClassifier`]): non-media files are
//!    parsed by a format bucket and scored against independent structural
//!    signals, producing a [`ClassificationReport`] with per-signal
//!    reasons.
//!
//! The SQL branch is disabled downstream: the report is carried into file
//! metadata, but every non-media file routes to document ingestion.

pub mod media;
pub mod scoring;

use std::path::Path;

use omnivault_core::{ClassifyError, FileTriage};

pub use media::{detect_modality, is_media};
pub use scoring::FileClassifier;

/// Run both triage stages for one file.
pub async fn triage(path: &Path) -> Result<FileTriage, ClassifyError> {
    let modality = detect_modality(path);
    if modality.is_media() {
        return Ok(FileTriage {
            modality,
            is_media: true,
            report: None,
        });
    }

    let report = FileClassifier::new().classify(path).await?;
    Ok(FileTriage {
        modality,
        is_media: false,
        report: Some(report),
    })
}
