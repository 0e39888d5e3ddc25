//! Video frame extraction.
//!
//! Frames are sampled at `fps_factor * source_fps` (effectively
//! `duration * fps_factor` frames spread evenly), capped by `max_frames`,
//! and decoded to RGB for the image encoder.

use omnivault_core::{ExtractError, RgbFrame, VideoConfig};
use std::path::Path;
use tracing::debug;

use crate::image::decode_rgb;
use crate::sidecar::{probe_media, sample_frames};

/// Extensions handled by the video extractor.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Sampled frames plus stream facts.
#[derive(Debug, Clone)]
pub struct VideoPayload {
    /// Frames in temporal order.
    pub frames: Vec<RgbFrame>,
    pub duration_s: f64,
    pub frame_count_sampled: usize,
}

/// Extractor for video files.
pub struct VideoExtractor {
    config: VideoConfig,
}

impl VideoExtractor {
    #[must_use]
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    /// Whether this extractor handles the given path's extension.
    #[must_use]
    pub fn handles(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Probe the stream and extract evenly spaced RGB frames.
    pub async fn extract(&self, path: &Path) -> Result<VideoPayload, ExtractError> {
        let probe = probe_media(path).await?;

        let duration_s = probe
            .duration_s
            .or_else(|| {
                // Fall back to frame count at an assumed 30 fps.
                probe.frame_count.map(|n| n as f64 / 30.0)
            })
            .ok_or_else(|| ExtractError::Failed("video has no measurable duration".to_string()))?;

        if duration_s <= 0.0 {
            return Err(ExtractError::Failed("video has no frames".to_string()));
        }

        let mut count = ((duration_s * self.config.fps_factor).floor() as usize).max(1);
        if let Some(cap) = self.config.max_frames {
            count = count.min(cap.max(1));
        }
        if let Some(total) = probe.frame_count {
            count = count.min(total.max(1) as usize);
        }

        debug!(
            "Sampling {} frames over {:.1}s from {:?}",
            count, duration_s, path
        );

        let frame_dir = tempfile::tempdir()?;
        let frame_paths = sample_frames(path, count, duration_s, frame_dir.path()).await?;
        if frame_paths.is_empty() {
            return Err(ExtractError::Failed(format!(
                "no frames could be read from video: {}",
                path.display()
            )));
        }

        let mut frames = Vec::with_capacity(frame_paths.len());
        for frame_path in &frame_paths {
            let bytes = tokio::fs::read(frame_path).await?;
            let frame = tokio::task::spawn_blocking(move || decode_rgb(&bytes))
                .await
                .map_err(|e| ExtractError::Failed(format!("frame decode join error: {e}")))??;
            frames.push(frame);
        }

        let frame_count_sampled = frames.len();
        Ok(VideoPayload {
            frames,
            duration_s,
            frame_count_sampled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_video_extensions() {
        assert!(VideoExtractor::handles(Path::new("clip.mp4")));
        assert!(VideoExtractor::handles(Path::new("clip.MKV")));
        assert!(!VideoExtractor::handles(Path::new("clip.mp3")));
        assert!(!VideoExtractor::handles(Path::new("clip.txt")));
    }

    #[tokio::test]
    async fn test_extract_missing_video_fails() {
        let extractor = VideoExtractor::new(VideoConfig::default());
        let result = extractor.extract(Path::new("/nonexistent/clip.mp4")).await;
        assert!(result.is_err());
    }
}
