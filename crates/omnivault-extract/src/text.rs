//! Text and document extraction.
//!
//! PDFs use the text layer only (no OCR); DOCX is a ZIP of XML read via the
//! `w:t` runs in `word/document.xml`; everything else goes through an
//! encoding ladder: strict UTF-8, then UTF-16, then Latin-1.

use omnivault_core::ExtractError;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Extensions routed through the text extractor.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "txt", "md", "log", "json", "csv", "xml", "yaml", "yml", "html", "htm",
    "ini", "cfg", "conf",
];

/// Extracted text plus document-level metadata.
#[derive(Debug, Clone, Default)]
pub struct TextPayload {
    pub text: String,
    pub page_count: Option<u32>,
}

/// Extractor for textual and document formats.
pub struct TextExtractor;

impl TextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether this extractor handles the given path's extension. Unknown
    /// extensions are treated as text by the triage stage, so this covers
    /// routing of the known buckets only.
    #[must_use]
    pub fn handles(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Extract a Unicode string from the file.
    ///
    /// A PDF with a missing or empty text layer yields an empty string; the
    /// caller decides how to degrade.
    pub async fn extract(&self, path: &Path) -> Result<TextPayload, ExtractError> {
        debug!("Extracting text: {:?}", path);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => {
                let bytes = tokio::fs::read(path).await?;
                tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
                    .await
                    .map_err(|e| ExtractError::Failed(format!("pdf task join error: {e}")))?
            }
            "docx" | "doc" => {
                let owned = path.to_path_buf();
                tokio::task::spawn_blocking(move || extract_docx_text(&owned))
                    .await
                    .map_err(|e| ExtractError::Failed(format!("docx task join error: {e}")))?
            }
            _ => {
                let bytes = tokio::fs::read(path).await?;
                Ok(TextPayload {
                    text: decode_text(&bytes),
                    page_count: None,
                })
            }
        }
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the PDF text layer.
///
/// `pdf-extract` panics on some malformed font encodings, so the call is
/// fenced with `catch_unwind`.
fn extract_pdf_text(bytes: &[u8]) -> Result<TextPayload, ExtractError> {
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match result {
        Ok(Ok(text)) => {
            let page_count = estimate_page_count(&text);
            Ok(TextPayload {
                text,
                page_count: Some(page_count),
            })
        }
        Ok(Err(e)) => Err(ExtractError::Decode(format!("pdf extraction failed: {e}"))),
        Err(_) => Err(ExtractError::Decode(
            "pdf parsing panicked (malformed font encoding)".to_string(),
        )),
    }
}

/// Extract text runs from a DOCX archive.
fn extract_docx_text(path: &Path) -> Result<TextPayload, ExtractError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ExtractError::Decode(format!("docx archive error: {e}")))?;

    let mut xml = String::new();
    match archive.by_name("word/document.xml") {
        Ok(mut entry) => {
            entry.read_to_string(&mut xml)?;
        }
        Err(e) => {
            return Err(ExtractError::Decode(format!(
                "docx missing word/document.xml: {e}"
            )));
        }
    }

    Ok(TextPayload {
        text: docx_xml_text(&xml),
        page_count: None,
    })
}

/// Pull the `w:t` text runs out of DOCX body XML, inserting a newline per
/// paragraph (`w:p`).
fn docx_xml_text(xml: &str) -> String {
    let mut text = String::new();
    let mut in_text_run = false;

    for part in xml.split('<') {
        if part.starts_with("w:t") {
            in_text_run = true;
            if let Some(start) = part.find('>') {
                text.push_str(unescape_xml(&part[start + 1..]).as_ref());
            }
        } else if part.starts_with("/w:t") {
            in_text_run = false;
        } else if part.starts_with("w:p ") || part == "w:p>" || part.starts_with("w:p>") {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
        } else if in_text_run {
            if let Some(start) = part.find('>') {
                text.push_str(unescape_xml(&part[start + 1..]).as_ref());
            }
        }
    }

    text
}

/// Minimal XML entity unescape for text runs.
fn unescape_xml(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Decode raw bytes: strict UTF-8, then UTF-16 (BOM or NUL heuristic), then
/// Latin-1, which never fails.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    // NUL bytes are valid UTF-8 but almost always mean the buffer is really
    // UTF-16; only accept a strict UTF-8 decode that contains none.
    if let Ok(text) = std::str::from_utf8(bytes) {
        if !text.contains('\0') {
            return text.to_string();
        }
    }

    if let Some(text) = decode_utf16(bytes) {
        return text;
    }

    warn!("Falling back to Latin-1 decoding ({} bytes)", bytes.len());
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}

/// Try UTF-16: an explicit BOM wins; otherwise a high density of NUL bytes
/// in an even-length buffer suggests UTF-16LE.
fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let encoding = if bytes.starts_with(&[0xFF, 0xFE]) {
        encoding_rs::UTF_16LE
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        encoding_rs::UTF_16BE
    } else if bytes.len() >= 4
        && bytes.len() % 2 == 0
        && bytes.iter().filter(|&&b| b == 0).count() > bytes.len() / 4
    {
        encoding_rs::UTF_16LE
    } else {
        return None;
    };

    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(decoded.into_owned())
    }
}

/// Estimate page count from form feeds, falling back to character volume.
fn estimate_page_count(text: &str) -> u32 {
    let form_feeds = text.matches('\x0C').count();
    if form_feeds > 0 {
        return (form_feeds + 1) as u32;
    }
    std::cmp::max(1, (text.len() / 3000) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_handles_document_extensions() {
        assert!(TextExtractor::handles(Path::new("paper.pdf")));
        assert!(TextExtractor::handles(Path::new("notes.MD")));
        assert!(TextExtractor::handles(Path::new("data.yaml")));
        assert!(TextExtractor::handles(Path::new("settings.conf")));
        assert!(!TextExtractor::handles(Path::new("photo.png")));
    }

    #[tokio::test]
    async fn test_extract_utf8_text() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("notes.txt");
        std::fs::write(&file_path, "plain utf-8 content").unwrap();

        let extractor = TextExtractor::new();
        let payload = extractor.extract(&file_path).await.unwrap();
        assert_eq!(payload.text, "plain utf-8 content");
        assert!(payload.page_count.is_none());
    }

    #[tokio::test]
    async fn test_extract_unicode_text() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("unicode.txt");
        let text = "Résumé 世界 données";
        std::fs::write(&file_path, text).unwrap();

        let extractor = TextExtractor::new();
        let payload = extractor.extract(&file_path).await.unwrap();
        assert_eq!(payload.text, text);
    }

    #[tokio::test]
    async fn test_extract_empty_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("empty.txt");
        std::fs::write(&file_path, "").unwrap();

        let extractor = TextExtractor::new();
        let payload = extractor.extract(&file_path).await.unwrap();
        assert!(payload.text.is_empty());
    }

    #[test]
    fn test_decode_utf16_le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hello".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        // The BOM is sniffed and stripped by the decoder.
        assert_eq!(decode_text(&bytes), "hello");
    }

    #[test]
    fn test_decode_utf16_without_bom() {
        let mut bytes = Vec::new();
        for unit in "abcd".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode_text(&bytes);
        assert_eq!(decoded, "abcd");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // 0xE9 is 'é' in Latin-1 and invalid as a lone UTF-8 byte.
        let bytes = vec![b'c', b'a', b'f', 0xE9];
        let decoded = decode_text(&bytes);
        assert_eq!(decoded, "café");
    }

    #[test]
    fn test_docx_xml_text_runs() {
        let xml = r#"<w:document><w:body><w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p><w:p><w:r><w:t>Second &amp; last</w:t></w:r></w:p></w:body></w:document>"#;
        let text = docx_xml_text(xml);
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second & last"));
        assert!(text.contains('\n'));
    }

    #[test]
    fn test_estimate_page_count() {
        assert_eq!(estimate_page_count("short"), 1);
        assert_eq!(estimate_page_count(&"x".repeat(6500)), 2);
        assert_eq!(estimate_page_count("a\x0Cb\x0Cc"), 3);
    }

    #[tokio::test]
    async fn test_extract_invalid_docx_fails() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("fake.docx");
        std::fs::write(&file_path, b"not a zip archive").unwrap();

        let extractor = TextExtractor::new();
        let result = extractor.extract(&file_path).await;
        assert!(matches!(result, Err(ExtractError::Decode(_))));
    }
}
