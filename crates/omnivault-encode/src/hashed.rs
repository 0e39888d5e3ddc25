//! Deterministic feature-hashing encoder.
//!
//! This is the always-available encoder backend: tokens (for text) and
//! coarse luminance statistics (for images) are hashed with blake3 into a
//! fixed number of signed buckets, then L2-normalized. The output is stable
//! across processes and platforms, which the identity and idempotency
//! guarantees of the ingestion pipeline rely on.
//!
//! It is not a learned model: vectors are only comparable within a
//! modality in any semantically meaningful way. CLIP-class backends plug in
//! behind the same [`Encoder`] trait for real cross-modal retrieval; this
//! backend keeps the rest of the system fully functional and testable
//! without model weights.

use async_trait::async_trait;
use omnivault_core::{l2_normalize, EncodeError, Encoder, RgbFrame, EMBEDDING_DIM};

/// Maximum number of tokens folded into one text embedding.
const MAX_TEXT_TOKENS: usize = 512;

/// Side length of the luminance grid sampled from images.
const IMAGE_GRID: u32 = 16;

/// Deterministic feature-hashing encoder over the shared space.
pub struct FeatureHashEncoder {
    dimension: usize,
}

impl FeatureHashEncoder {
    /// Create an encoder with the process-wide dimension.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
        }
    }

    /// Create an encoder with a custom dimension (tests).
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Fold one named feature into the accumulator with the given weight.
    fn fold(&self, acc: &mut [f32], feature: &str, weight: f32) {
        let hash = blake3::hash(feature.as_bytes());
        let bytes = hash.as_bytes();
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&bytes[..8]);
        let index = u64::from_le_bytes(index_bytes) as usize % self.dimension;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        acc[index] += sign * weight;
    }
}

impl Default for FeatureHashEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Encoder for FeatureHashEncoder {
    fn model_name(&self) -> &str {
        "feature-hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode_text(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        let mut acc = vec![0.0f32; self.dimension];

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .take(MAX_TEXT_TOKENS)
            .collect();

        if tokens.is_empty() {
            // Degenerate input still gets a unit vector so downstream
            // normalization invariants hold.
            self.fold(&mut acc, "∅text", 1.0);
        } else {
            for token in &tokens {
                self.fold(&mut acc, token, 1.0);
            }
            // Bigrams capture a little word order.
            for pair in tokens.windows(2) {
                self.fold(&mut acc, &format!("{}+{}", pair[0], pair[1]), 0.5);
            }
        }

        l2_normalize(&mut acc);
        Ok(acc)
    }

    async fn encode_image(&self, frame: &RgbFrame) -> Result<Vec<f32>, EncodeError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(EncodeError::Inference("empty image".to_string()));
        }

        let mut acc = vec![0.0f32; self.dimension];

        // Sample a coarse luminance grid and hash each cell's quantized
        // level; nearby levels share a bucket so small pixel noise does not
        // flip features.
        let cell_w = (frame.width / IMAGE_GRID).max(1);
        let cell_h = (frame.height / IMAGE_GRID).max(1);
        for gy in 0..IMAGE_GRID {
            for gx in 0..IMAGE_GRID {
                let x0 = gx * cell_w;
                let y0 = gy * cell_h;
                if x0 >= frame.width || y0 >= frame.height {
                    continue;
                }
                let lum = frame.region_luminance(x0, y0, x0 + cell_w, y0 + cell_h);
                let level = (lum / 16.0).round() as u32;
                self.fold(&mut acc, &format!("cell:{gx}:{gy}:{level}"), 1.0);
            }
        }

        // Aspect ratio bucket, so shape survives downsampling.
        let aspect = (f64::from(frame.width) / f64::from(frame.height) * 4.0).round() as i64;
        self.fold(&mut acc, &format!("aspect:{aspect}"), 1.0);

        l2_normalize(&mut acc);
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_text_embedding_is_normalized() {
        let encoder = FeatureHashEncoder::new();
        let v = encoder.encode_text("a caching scheme for uploads").await.unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!((unit_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_text_embedding_is_deterministic() {
        let encoder = FeatureHashEncoder::new();
        let a = encoder.encode_text("same input text").await.unwrap();
        let b = encoder.encode_text("same input text").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let encoder = FeatureHashEncoder::new();
        let a = encoder.encode_text("neural caching systems").await.unwrap();
        let b = encoder.encode_text("holiday photos of cats").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_empty_text_still_normalized() {
        let encoder = FeatureHashEncoder::new();
        let v = encoder.encode_text("").await.unwrap();
        assert!((unit_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_exact_text_self_similarity() {
        let encoder = FeatureHashEncoder::new();
        let text = "We propose a new caching scheme.";
        let a = encoder.encode_text(text).await.unwrap();
        let b = encoder.encode_text(text).await.unwrap();
        let sim = omnivault_core::cosine_similarity(&a, &b);
        assert!(sim >= 0.999);
    }

    #[tokio::test]
    async fn test_image_embedding_is_normalized() {
        let encoder = FeatureHashEncoder::new();
        let frame = RgbFrame {
            width: 32,
            height: 32,
            pixels: vec![128; 32 * 32 * 3],
        };
        let v = encoder.encode_image(&frame).await.unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!((unit_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let encoder = FeatureHashEncoder::new();
        let frame = RgbFrame {
            width: 0,
            height: 0,
            pixels: vec![],
        };
        assert!(encoder.encode_image(&frame).await.is_err());
    }

    #[tokio::test]
    async fn test_custom_dimension() {
        let encoder = FeatureHashEncoder::with_dimension(64);
        let v = encoder.encode_text("small space").await.unwrap();
        assert_eq!(v.len(), 64);
    }

    #[tokio::test]
    async fn test_token_truncation_bounds_work() {
        let encoder = FeatureHashEncoder::new();
        let long = "word ".repeat(5000);
        let v = encoder.encode_text(&long).await.unwrap();
        assert!((unit_norm(&v) - 1.0).abs() < 1e-5);
    }
}
