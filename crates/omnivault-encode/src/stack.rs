//! Process-wide encoder handles.
//!
//! Model backends are expensive to load, so they are treated as explicit
//! process-wide state: one [`EncoderStack`] is constructed at startup and
//! shared behind an `Arc` by every pipeline and search instance. There are
//! no lazy module-load singletons; callers must check [`EncoderStack::available`]
//! before relying on vectors.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use omnivault_core::{
    Captioner, EncodeError, Encoder, RgbFrame, Transcriber, VaultConfig,
};

use crate::caption::StubCaptioner;
use crate::hashed::FeatureHashEncoder;
use crate::transcribe::StubTranscriber;

/// The process-wide bundle of model backends.
pub struct EncoderStack {
    encoder: Option<Arc<dyn Encoder>>,
    captioner: Option<Arc<dyn Captioner>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    /// Encoder identifier from configuration, recorded in metadata.
    model_label: String,
}

impl EncoderStack {
    /// Build the stack from configuration. Always succeeds: the shipping
    /// backends are the deterministic fallbacks, and audio transcription is
    /// toggled by `enable_audio`.
    #[must_use]
    pub fn initialize(config: &VaultConfig) -> Self {
        let model_label = format!("{}/{}", config.encoder_model, config.encoder_pretrained);
        info!("Initializing encoder stack ({model_label})");

        let transcriber: Option<Arc<dyn Transcriber>> = if config.enable_audio {
            Some(Arc::new(StubTranscriber::new()))
        } else {
            info!("Audio transcription disabled by configuration");
            None
        };

        Self {
            encoder: Some(Arc::new(FeatureHashEncoder::new())),
            captioner: Some(Arc::new(StubCaptioner::new())),
            transcriber,
            model_label,
        }
    }

    /// Build a stack with explicit backends (tests, custom models).
    #[must_use]
    pub fn with_backends(
        encoder: Arc<dyn Encoder>,
        captioner: Arc<dyn Captioner>,
        transcriber: Option<Arc<dyn Transcriber>>,
    ) -> Self {
        let model_label = encoder.model_name().to_string();
        Self {
            encoder: Some(encoder),
            captioner: Some(captioner),
            transcriber,
            model_label,
        }
    }

    /// A stack with no backends at all: every encode call fails and media
    /// ingestion takes its degraded path.
    #[must_use]
    pub fn unavailable() -> Self {
        warn!("Encoder stack constructed unavailable; vectors will be skipped");
        Self {
            encoder: None,
            captioner: None,
            transcriber: None,
            model_label: "unavailable".to_string(),
        }
    }

    /// Whether the embedding encoder is loaded.
    #[must_use]
    pub fn available(&self) -> bool {
        self.encoder.is_some()
    }

    /// Whether audio transcription is loaded.
    #[must_use]
    pub fn audio_available(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Configured model identifier.
    #[must_use]
    pub fn model_label(&self) -> &str {
        &self.model_label
    }

    /// Embedding dimension, when an encoder is loaded.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.encoder.as_ref().map(|e| e.dimension())
    }

    /// Encode text into the shared space.
    pub async fn encode_text(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        let encoder = self
            .encoder
            .as_ref()
            .ok_or_else(|| EncodeError::Unavailable("no encoder loaded".to_string()))?;
        encoder.encode_text(text).await
    }

    /// Encode an image frame into the shared space.
    pub async fn encode_image(&self, frame: &RgbFrame) -> Result<Vec<f32>, EncodeError> {
        let encoder = self
            .encoder
            .as_ref()
            .ok_or_else(|| EncodeError::Unavailable("no encoder loaded".to_string()))?;
        encoder.encode_image(frame).await
    }

    /// Caption an image, falling back to `"image (WxH)"` when the caption
    /// backend is missing or fails.
    pub async fn caption_or_fallback(&self, frame: &RgbFrame) -> String {
        if let Some(captioner) = &self.captioner {
            match captioner.caption(frame).await {
                Ok(caption) if !caption.trim().is_empty() => return caption,
                Ok(_) => {}
                Err(e) => warn!("Captioning failed, using fallback: {e}"),
            }
        }
        format!("image ({}x{})", frame.width, frame.height)
    }

    /// Transcribe audio, returning an empty transcript when the backend is
    /// missing or fails.
    pub async fn transcribe_or_empty(&self, path: &Path) -> String {
        if let Some(transcriber) = &self.transcriber {
            match transcriber.transcribe(path).await {
                Ok(transcript) => return transcript,
                Err(e) => warn!("Transcription failed for {path:?}: {e}"),
            }
        }
        String::new()
    }
}
