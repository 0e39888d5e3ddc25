//! Environment-driven configuration.
//!
//! Every deployment knob is an environment variable with a documented
//! default; [`VaultConfig::from_env`] reads them once at startup and
//! resolves all paths to absolute form.
//!
//! | Key | Effect | Default |
//! |---|---|---|
//! | `LOCAL_ROOT_REPO` | storage root | `../storage` |
//! | `MONGO_URI`, `MONGO_DB` | document store location | unset (in-memory) |
//! | `CHROMA_PERSIST_PATH` | vector store directory | `./chroma_db` |
//! | `CHROMA_NOSQL_COLLECTION` | vector collection name | `nosql_graph_embeddings` |
//! | `ENABLE_AUDIO` | load the transcription backend | `true` |
//! | `CLIP_MODEL_NAME`, `CLIP_PRETRAINED` | encoder identifiers | `ViT-B-32` / `openai` |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::types::{ChunkConfig, TimeoutConfig, VideoConfig};

/// Resolved process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Absolute storage root. Created at startup if missing.
    pub storage_root: PathBuf,
    /// Document store location; unset degrades metadata to in-memory.
    pub mongo_uri: Option<String>,
    pub mongo_db: Option<String>,
    /// Absolute vector store directory.
    pub vector_persist_path: PathBuf,
    /// Vector collection name.
    pub vector_collection: String,
    /// Whether to load the audio transcription backend.
    pub enable_audio: bool,
    /// Encoder identifiers recorded in embedding metadata.
    pub encoder_model: String,
    pub encoder_pretrained: String,
    #[serde(default)]
    pub chunk: ChunkConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(skip, default)]
    pub timeouts: TimeoutConfig,
}

impl VaultConfig {
    /// Read configuration from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let storage_root = env::var("LOCAL_ROOT_REPO")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from("../storage"), PathBuf::from);

        let vector_persist_path = sanitize_path_value(
            &env::var("CHROMA_PERSIST_PATH").unwrap_or_else(|_| "./chroma_db".to_string()),
        );

        Self {
            storage_root: resolve_absolute(&storage_root),
            mongo_uri: env::var("MONGO_URI").ok().filter(|v| !v.is_empty()),
            mongo_db: env::var("MONGO_DB").ok().filter(|v| !v.is_empty()),
            vector_persist_path: resolve_absolute(&vector_persist_path),
            vector_collection: env::var("CHROMA_NOSQL_COLLECTION")
                .unwrap_or_else(|_| "nosql_graph_embeddings".to_string()),
            enable_audio: env::var("ENABLE_AUDIO")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            encoder_model: env::var("CLIP_MODEL_NAME").unwrap_or_else(|_| "ViT-B-32".to_string()),
            encoder_pretrained: env::var("CLIP_PRETRAINED")
                .unwrap_or_else(|_| "openai".to_string()),
            chunk: ChunkConfig::default(),
            video: VideoConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            storage_root: resolve_absolute(Path::new("../storage")),
            mongo_uri: None,
            mongo_db: None,
            vector_persist_path: resolve_absolute(Path::new("./chroma_db")),
            vector_collection: "nosql_graph_embeddings".to_string(),
            enable_audio: true,
            encoder_model: "ViT-B-32".to_string(),
            encoder_pretrained: "openai".to_string(),
            chunk: ChunkConfig::default(),
            video: VideoConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Strip shell placeholder artifacts (`<...>`) that occasionally leak from
/// copy-pasted env files, falling back to the default when nothing is left.
fn sanitize_path_value(raw: &str) -> PathBuf {
    let cleaned = raw.replace(['<', '>'], "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        PathBuf::from("./chroma_db")
    } else {
        PathBuf::from(cleaned)
    }
}

/// Resolve a possibly-relative path against the current working directory.
/// Purely lexical: the path does not need to exist yet.
fn resolve_absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
