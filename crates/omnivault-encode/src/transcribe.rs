//! Audio transcription backends.

use async_trait::async_trait;
use omnivault_core::{EncodeError, Transcriber};
use std::path::Path;

/// Fallback transcriber used when no ASR model is loaded.
///
/// Returns an empty transcript; the audio pipeline substitutes a generic
/// description so ingestion still succeeds.
pub struct StubTranscriber;

impl StubTranscriber {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _path: &Path) -> Result<String, EncodeError> {
        Ok(String::new())
    }
}
