//! Content-addressed storage layout.
//!
//! Files are copied byte-for-byte into `<root>/<modality>/<collection>/<name>`
//! with `_1`, `_2`, ... collision suffixes before the extension. All
//! returned URIs are forward-slash separated paths relative to the root.
//! Derived paths that would escape the root are rejected.

use omnivault_core::{Modality, StoreError};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Windows reserved device names, refused as bare file stems.
const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// The storage root and the operations on it.
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    /// Resolve the root to an absolute path and create it if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root: PathBuf = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .map_err(|e| StoreError::Init(format!("cannot resolve storage root: {e}")))?
                .join(root)
        };
        std::fs::create_dir_all(&root)
            .map_err(|e| StoreError::Init(format!("cannot create storage root: {e}")))?;
        info!("Storage root at {:?}", root);
        Ok(Self { root })
    }

    /// The absolute storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy a file into `<root>/<modality>/<collection>/<name>`, suffixing
    /// the name on collision, and return the relative URI.
    pub async fn copy_into_storage(
        &self,
        source: &Path,
        modality: Modality,
        collection: &str,
        desired_name: &str,
    ) -> Result<String, StoreError> {
        let name = sanitize_file_name(desired_name);
        let collection_dir = sanitize_path_segment(collection);

        let dir = self.root.join(modality.as_str()).join(&collection_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let target_name = next_free_name(&dir, &name).await?;
        let target = dir.join(&target_name);

        tokio::fs::copy(source, &target).await?;
        debug!("Copied {:?} -> {:?}", source, target);

        Ok(format!(
            "{}/{}/{}",
            modality.as_str(),
            collection_dir,
            target_name
        ))
    }

    /// Resolve a relative URI for download, rejecting anything that would
    /// escape the root: absolute paths, `..` segments, drive prefixes.
    pub fn resolve_download(&self, relative_uri: &str) -> Result<PathBuf, StoreError> {
        let candidate = Path::new(relative_uri);
        if candidate.is_absolute() {
            return Err(StoreError::InvalidPath(format!(
                "absolute path rejected: {relative_uri}"
            )));
        }
        for component in candidate.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(StoreError::InvalidPath(format!(
                        "path escapes storage root: {relative_uri}"
                    )))
                }
            }
        }
        Ok(self.root.join(candidate))
    }
}

/// Drop control characters, angle brackets, path separators and NUL from a
/// file name; refuse reserved device stems and empty results.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '<' | '>' | '/' | '\\' | ':' | '"' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').to_string();

    if cleaned.is_empty() {
        return "unnamed".to_string();
    }

    let stem = cleaned
        .rsplit_once('.')
        .map_or(cleaned.as_str(), |(stem, _)| stem);
    if RESERVED_NAMES.contains(&stem.to_lowercase().as_str()) {
        return format!("_{cleaned}");
    }

    cleaned
}

/// Sanitize a path segment (collection or similar), mapping anything
/// unusable to `_`.
fn sanitize_path_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        "general".to_string()
    } else {
        cleaned
    }
}

/// Find the first free `<stem>_<n><ext>` variant of `name` in `dir`.
async fn next_free_name(dir: &Path, name: &str) -> Result<String, StoreError> {
    if !tokio::fs::try_exists(dir.join(name)).await? {
        return Ok(name.to_string());
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
        _ => (name.to_string(), String::new()),
    };

    for n in 1u32.. {
        let candidate = format!("{stem}_{n}{ext}");
        if !tokio::fs::try_exists(dir.join(&candidate)).await? {
            return Ok(candidate);
        }
    }
    unreachable!("collision counter exhausted")
}
