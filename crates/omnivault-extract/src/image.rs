//! Image content extractor.

use image::GenericImageView;
use omnivault_core::{ExtractError, RgbFrame};
use std::path::Path;
use tracing::debug;

/// Extensions handled by the image extractor.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// A decoded image plus its recorded dimensions.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub frame: RgbFrame,
}

/// Extractor for raster image files.
pub struct ImageExtractor;

impl ImageExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether this extractor handles the given path's extension.
    #[must_use]
    pub fn handles(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Decode the file to an RGB8 frame.
    pub async fn extract(&self, path: &Path) -> Result<ImagePayload, ExtractError> {
        debug!("Extracting image: {:?}", path);
        let bytes = tokio::fs::read(path).await?;

        // Decoding is CPU-bound; keep it off the async scheduler.
        let frame = tokio::task::spawn_blocking(move || decode_rgb(&bytes))
            .await
            .map_err(|e| ExtractError::Failed(format!("decode task join error: {e}")))??;

        Ok(ImagePayload { frame })
    }
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode raw bytes into an RGB8 frame.
pub(crate) fn decode_rgb(bytes: &[u8]) -> Result<RgbFrame, ExtractError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ExtractError::Decode(format!("image decode failed: {e}")))?;
    let (width, height) = img.dimensions();
    let rgb = img.to_rgb8();
    Ok(RgbFrame {
        width,
        height,
        pixels: rgb.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
        use image::{ImageBuffer, Rgb};
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 255, 0])
            }
        });
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[test]
    fn test_handles_image_extensions() {
        assert!(ImageExtractor::handles(Path::new("photo.jpg")));
        assert!(ImageExtractor::handles(Path::new("photo.JPEG")));
        assert!(ImageExtractor::handles(Path::new("icon.webp")));
        assert!(!ImageExtractor::handles(Path::new("doc.pdf")));
        assert!(!ImageExtractor::handles(Path::new("no_extension")));
    }

    #[tokio::test]
    async fn test_extract_records_dimensions() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test.png");
        std::fs::write(&file_path, test_png(4, 2)).unwrap();

        let extractor = ImageExtractor::new();
        let payload = extractor.extract(&file_path).await.unwrap();

        assert_eq!(payload.frame.width, 4);
        assert_eq!(payload.frame.height, 2);
        assert_eq!(payload.frame.pixels.len(), 4 * 2 * 3);
    }

    #[tokio::test]
    async fn test_extract_invalid_image_fails() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("fake.png");
        std::fs::write(&file_path, b"not an image").unwrap();

        let extractor = ImageExtractor::new();
        let result = extractor.extract(&file_path).await;
        assert!(matches!(result, Err(ExtractError::Decode(_))));
    }

    #[tokio::test]
    async fn test_extract_missing_file_fails() {
        let extractor = ImageExtractor::new();
        let result = extractor.extract(Path::new("/nonexistent/x.png")).await;
        assert!(result.is_err());
    }
}
