//! The multimodal pipeline: one public operation, `encode_path`.
//!
//! Dispatch is a tagged union over [`Modality`] with one handler per
//! variant; every handler returns the same [`EncodedFile`] shape.

use serde_json::{json, Map};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use omnivault_core::{
    mean_pool, ChunkConfig, EncodedChunk, EncodedFile, Error, Modality, VaultConfig, VideoConfig,
};
use omnivault_encode::EncoderStack;
use omnivault_extract::{AudioExtractor, ImageExtractor, TextExtractor, VideoExtractor};

use crate::chunker::{chunk_text, needs_chunking};
use crate::summary::build_summary;

/// Orchestrates extraction, description and embedding for one file.
pub struct MultimodalPipeline {
    stack: Arc<EncoderStack>,
    chunk_config: ChunkConfig,
    images: ImageExtractor,
    videos: VideoExtractor,
    audio: AudioExtractor,
    text: TextExtractor,
}

impl MultimodalPipeline {
    #[must_use]
    pub fn new(stack: Arc<EncoderStack>, config: &VaultConfig) -> Self {
        Self {
            stack,
            chunk_config: config.chunk.clone(),
            images: ImageExtractor::new(),
            videos: VideoExtractor::new(config.video.clone()),
            audio: AudioExtractor::new(),
            text: TextExtractor::new(),
        }
    }

    /// Build with explicit sub-configs (tests).
    #[must_use]
    pub fn with_configs(
        stack: Arc<EncoderStack>,
        chunk_config: ChunkConfig,
        video_config: VideoConfig,
    ) -> Self {
        Self {
            stack,
            chunk_config,
            images: ImageExtractor::new(),
            videos: VideoExtractor::new(video_config),
            audio: AudioExtractor::new(),
            text: TextExtractor::new(),
        }
    }

    /// The encoder stack shared with search.
    #[must_use]
    pub fn stack(&self) -> Arc<EncoderStack> {
        Arc::clone(&self.stack)
    }

    /// Extract, describe and embed one file.
    pub async fn encode_path(&self, path: &Path, modality: Modality) -> Result<EncodedFile, Error> {
        debug!("encode_path {:?} as {modality}", path.file_name());
        match modality {
            Modality::Image => self.encode_image_file(path).await,
            Modality::Video => self.encode_video_file(path).await,
            Modality::Audio => self.encode_audio_file(path).await,
            Modality::Text | Modality::Unknown => self.encode_text_file(path, modality).await,
        }
    }

    // ------------------------------------------------------------------ image

    async fn encode_image_file(&self, path: &Path) -> Result<EncodedFile, Error> {
        let payload = self.images.extract(path).await?;
        let caption = self.stack.caption_or_fallback(&payload.frame).await;
        let embedding = self.stack.encode_image(&payload.frame).await?;

        let mut extra = Map::new();
        extra.insert("width".to_string(), json!(payload.frame.width));
        extra.insert("height".to_string(), json!(payload.frame.height));

        Ok(EncodedFile {
            modality: Modality::Image,
            descriptive_text: caption,
            embedding: Some(embedding),
            chunks: vec![],
            extra,
            clip_generated: true,
        })
    }

    // ------------------------------------------------------------------ video

    async fn encode_video_file(&self, path: &Path) -> Result<EncodedFile, Error> {
        let payload = self.videos.extract(path).await?;

        let mut frame_vectors = Vec::with_capacity(payload.frames.len());
        let mut chunks = Vec::with_capacity(payload.frames.len());
        for (idx, frame) in payload.frames.iter().enumerate() {
            let caption = self.stack.caption_or_fallback(frame).await;
            let vector = self.stack.encode_image(frame).await?;
            frame_vectors.push(vector.clone());
            chunks.push(EncodedChunk {
                chunk_index: idx as u32,
                text: caption,
                embedding: vector,
            });
        }

        // The whole-file vector is the re-normalized mean of frame vectors.
        let embedding = mean_pool(&frame_vectors)
            .ok_or_else(|| Error::Other("video produced no frame vectors".to_string()))?;

        let middle = &payload.frames[payload.frames.len() / 2];
        let middle_caption = self.stack.caption_or_fallback(middle).await;
        let descriptive_text = format!("video; {middle_caption}");

        let mut extra = Map::new();
        extra.insert("duration_s".to_string(), json!(payload.duration_s));
        extra.insert(
            "frame_count_sampled".to_string(),
            json!(payload.frame_count_sampled),
        );

        info!(
            "Encoded video {:?}: {} frames over {:.1}s",
            path.file_name(),
            payload.frame_count_sampled,
            payload.duration_s
        );

        Ok(EncodedFile {
            modality: Modality::Video,
            descriptive_text,
            embedding: Some(embedding),
            chunks,
            extra,
            clip_generated: true,
        })
    }

    // ------------------------------------------------------------------ audio

    async fn encode_audio_file(&self, path: &Path) -> Result<EncodedFile, Error> {
        let payload = self.audio.extract(path).await?;
        let transcript = self.stack.transcribe_or_empty(&payload.path).await;

        let embed_text = if transcript.trim().is_empty() {
            "audio file"
        } else {
            transcript.as_str()
        };
        let embedding = self.stack.encode_text(embed_text).await?;

        let mut extra = Map::new();
        if let Some(duration) = payload.duration_s {
            extra.insert("duration_s".to_string(), json!(duration));
        }

        Ok(EncodedFile {
            modality: Modality::Audio,
            descriptive_text: transcript,
            embedding: Some(embedding),
            chunks: vec![],
            extra,
            clip_generated: true,
        })
    }

    // ------------------------------------------------------------------- text

    async fn encode_text_file(&self, path: &Path, modality: Modality) -> Result<EncodedFile, Error> {
        let payload = self.text.extract(path).await?;
        let descriptive_text = build_summary(&payload.text);
        let embedding = self.stack.encode_text(&descriptive_text).await?;

        let mut chunks = Vec::new();
        if needs_chunking(&payload.text, &self.chunk_config) {
            for chunk in chunk_text(&payload.text, &self.chunk_config) {
                let vector = self.stack.encode_text(&chunk.text).await?;
                chunks.push(EncodedChunk {
                    chunk_index: chunk.index,
                    text: chunk.text,
                    embedding: vector,
                });
            }
        }

        let mut extra = Map::new();
        if let Some(pages) = payload.page_count {
            extra.insert("page_count".to_string(), json!(pages));
        }
        if !chunks.is_empty() {
            extra.insert("chunk_count".to_string(), json!(chunks.len()));
        }

        Ok(EncodedFile {
            modality: if modality == Modality::Unknown {
                Modality::Text
            } else {
                modality
            },
            descriptive_text,
            embedding: Some(embedding),
            chunks,
            extra,
            clip_generated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use omnivault_core::{cosine_similarity, VaultConfig};
    use tempfile::tempdir;

    fn test_stack() -> Arc<EncoderStack> {
        Arc::new(EncoderStack::initialize(&VaultConfig::default()))
    }

    fn pipeline() -> MultimodalPipeline {
        MultimodalPipeline::with_configs(
            test_stack(),
            ChunkConfig::default(),
            VideoConfig::default(),
        )
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, _| Rgb([(x % 256) as u8, 80, 160]));
        img.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_encode_image_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cat.png");
        write_png(&path, 64, 48);

        let encoded = pipeline()
            .encode_path(&path, Modality::Image)
            .await
            .unwrap();

        assert_eq!(encoded.modality, Modality::Image);
        assert!(!encoded.descriptive_text.is_empty());
        assert!(encoded.clip_generated);
        assert_eq!(encoded.extra["width"], json!(64));
        assert_eq!(encoded.extra["height"], json!(48));

        let v = encoded.embedding.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(encoded.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_encode_text_path_short() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "We propose a new caching scheme.").unwrap();

        let encoded = pipeline().encode_path(&path, Modality::Text).await.unwrap();

        assert_eq!(encoded.modality, Modality::Text);
        assert!(encoded
            .descriptive_text
            .starts_with("We propose a new caching scheme."));
        assert!(!encoded.clip_generated);
        assert!(encoded.chunks.is_empty());
        assert!(encoded.embedding.is_some());
    }

    #[tokio::test]
    async fn test_encode_text_path_long_produces_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.txt");
        let text = "Sentences about caching and retrieval systems. ".repeat(200);
        std::fs::write(&path, &text).unwrap();

        let encoded = pipeline().encode_path(&path, Modality::Text).await.unwrap();

        assert!(!encoded.chunks.is_empty());
        assert_eq!(encoded.extra["chunk_count"], json!(encoded.chunks.len()));
        // Chunk indexes are contiguous from zero.
        for (i, chunk) in encoded.chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            let norm: f32 = chunk.embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_text_embedding_matches_descriptive_text() {
        // The canonical vector must be the encoding of the descriptive
        // text itself, so search can explain hits.
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "Quarterly revenue grew by twelve percent.").unwrap();

        let pipe = pipeline();
        let encoded = pipe.encode_path(&path, Modality::Text).await.unwrap();
        let reencoded = pipe
            .stack()
            .encode_text(&encoded.descriptive_text)
            .await
            .unwrap();
        let sim = cosine_similarity(encoded.embedding.as_ref().unwrap(), &reencoded);
        assert!(sim > 0.999);
    }

    #[tokio::test]
    async fn test_encode_audio_without_transcript() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        std::fs::write(&path, b"RIFFxxxxWAVE").unwrap();

        let encoded = pipeline()
            .encode_path(&path, Modality::Audio)
            .await
            .unwrap();

        // Stub transcriber yields an empty transcript; the vector comes
        // from the generic fallback text and the pipeline still succeeds.
        assert_eq!(encoded.modality, Modality::Audio);
        assert!(encoded.descriptive_text.is_empty());
        assert!(encoded.embedding.is_some());
        assert!(encoded.clip_generated);
    }

    #[tokio::test]
    async fn test_encode_missing_file_is_error() {
        let result = pipeline()
            .encode_path(Path::new("/nonexistent/x.txt"), Modality::Text)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_modality_routes_to_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, "readable content after all").unwrap();

        let encoded = pipeline()
            .encode_path(&path, Modality::Unknown)
            .await
            .unwrap();
        assert_eq!(encoded.modality, Modality::Text);
    }
}
