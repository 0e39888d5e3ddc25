//! Stage one: media detection by MIME hint and extension.

use omnivault_core::Modality;
use std::path::Path;

use omnivault_extract::{AUDIO_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};

/// Detect a file's modality.
///
/// The MIME hint from the file name is consulted first, then the extension
/// tables. Unknown extensions are treated as text.
#[must_use]
pub fn detect_modality(path: &Path) -> Modality {
    if let Some(mime) = mime_guess::from_path(path).first() {
        match mime.type_().as_str() {
            "image" => return Modality::Image,
            "video" => return Modality::Video,
            "audio" => return Modality::Audio,
            _ => {}
        }
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Modality::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Modality::Video
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Modality::Audio
    } else {
        Modality::Text
    }
}

/// Whether the path routes to the media encoders.
#[must_use]
pub fn is_media(path: &Path) -> bool {
    detect_modality(path).is_media()
}
