//! Audio extraction.
//!
//! Audio is not decoded here: the path is handed through to the
//! transcriber. Duration is recorded when the probe sidecar can supply it
//! cheaply.

use omnivault_core::ExtractError;
use std::path::{Path, PathBuf};

use crate::sidecar::probe_media;

/// Extensions handled by the audio extractor.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a"];

/// The pass-through payload for audio files.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub path: PathBuf,
    pub duration_s: Option<f64>,
}

/// Extractor for audio files.
pub struct AudioExtractor;

impl AudioExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether this extractor handles the given path's extension.
    #[must_use]
    pub fn handles(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Verify the file exists and probe its duration when possible.
    pub async fn extract(&self, path: &Path) -> Result<AudioPayload, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::Failed(format!(
                "audio file not found: {}",
                path.display()
            )));
        }

        // Duration is best-effort; a missing probe sidecar is not an error
        // for audio.
        let duration_s = probe_media(path).await.ok().and_then(|p| p.duration_s);

        Ok(AudioPayload {
            path: path.to_path_buf(),
            duration_s,
        })
    }
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_handles_audio_extensions() {
        assert!(AudioExtractor::handles(Path::new("song.mp3")));
        assert!(AudioExtractor::handles(Path::new("voice.WAV")));
        assert!(!AudioExtractor::handles(Path::new("clip.mp4")));
    }

    #[tokio::test]
    async fn test_extract_passes_path_through() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("voice.wav");
        std::fs::write(&file_path, b"RIFF....").unwrap();

        let extractor = AudioExtractor::new();
        let payload = extractor.extract(&file_path).await.unwrap();
        assert_eq!(payload.path, file_path);
    }

    #[tokio::test]
    async fn test_extract_missing_audio_fails() {
        let extractor = AudioExtractor::new();
        let result = extractor.extract(Path::new("/nonexistent/a.mp3")).await;
        assert!(result.is_err());
    }
}
