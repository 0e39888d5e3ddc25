//! # omnivault-extract
//!
//! Per-modality content extractors.
//!
//! Given a path, each extractor produces the raw material its modality's
//! encoder consumes:
//!
//! - [`ImageExtractor`]: RGB8 frame plus dimensions
//! - [`VideoExtractor`]: evenly sampled RGB frames via the ffmpeg sidecar
//! - [`AudioExtractor`]: path pass-through plus best-effort duration
//! - [`TextExtractor`]: a Unicode string (PDF text layer, DOCX runs, or the
//!   UTF-8 / UTF-16 / Latin-1 decode ladder)
//!
//! Extractors return `Result`; the pipeline boundary converts failures into
//! empty payloads plus an error string so nothing raises across components.

pub mod audio;
pub mod image;
pub mod sidecar;
pub mod text;
pub mod video;

pub use audio::{AudioExtractor, AudioPayload, AUDIO_EXTENSIONS};
pub use image::{ImageExtractor, ImagePayload, IMAGE_EXTENSIONS};
pub use sidecar::{probe_media, MediaProbe};
pub use text::{TextExtractor, TextPayload, TEXT_EXTENSIONS};
pub use video::{VideoExtractor, VideoPayload, VIDEO_EXTENSIONS};
