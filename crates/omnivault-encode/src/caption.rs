//! Image captioning backends.

use async_trait::async_trait;
use omnivault_core::{Captioner, EncodeError, RgbFrame};

/// Fallback captioner used when no vision-language model is loaded.
///
/// Returns `"image (WxH)"` so the rest of the pipeline can proceed; the
/// system degrades, it does not fail.
pub struct StubCaptioner;

impl StubCaptioner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubCaptioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Captioner for StubCaptioner {
    async fn caption(&self, frame: &RgbFrame) -> Result<String, EncodeError> {
        Ok(format!("image ({}x{})", frame.width, frame.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_caption_includes_dimensions() {
        let captioner = StubCaptioner::new();
        let frame = RgbFrame {
            width: 640,
            height: 480,
            pixels: vec![0; 640 * 480 * 3],
        };
        let caption = captioner.caption(&frame).await.unwrap();
        assert_eq!(caption, "image (640x480)");
    }
}
