//! Database-state and visualization payloads.
//!
//! `databaseState` always carries all three arrays; `tables` stays empty
//! because the SQL branch is disabled downstream. The visualization tree
//! is built from document-store records grouped into their
//! descriptive-text-derived buckets, falling back to a walk of the
//! physical storage tree when the store has no records.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use omnivault_core::{DocumentStore, FileRecord, StoreError};

use crate::context::AppContext;

/// The `databaseState` payload shared by upload and state endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseState {
    /// Always empty: the SQL branch is disabled downstream.
    pub tables: Vec<serde_json::Value>,
    pub collections: Vec<String>,
    #[serde(rename = "mediaDirectories")]
    pub media_directories: Vec<MediaDirectory>,
}

/// One media storage directory and the files inside it.
#[derive(Debug, Clone, Serialize)]
pub struct MediaDirectory {
    pub path: String,
    pub files: Vec<String>,
}

/// A node of the visualization tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "storagePath", skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

impl TreeNode {
    fn folder(name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            name: name.into(),
            kind: "folder",
            children: Some(children),
            size: None,
            mime_type: None,
            storage_path: None,
        }
    }

    fn file(name: impl Into<String>, size: String, mime_type: String, storage_path: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: "file",
            children: None,
            size: Some(size),
            mime_type: Some(mime_type),
            storage_path,
        }
    }
}

/// Build the `databaseState` payload from the document store.
pub async fn database_state(ctx: &AppContext) -> Result<DatabaseState, StoreError> {
    let records = ctx.documents.all_files().await?;

    let mut collections: Vec<String> = records.iter().map(|r| r.collection.clone()).collect();
    collections.sort();
    collections.dedup();

    let mut by_dir: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.modality.is_media()) {
        let Some(uri) = &record.storage_uri else {
            continue;
        };
        if let Some((dir, name)) = uri.rsplit_once('/') {
            by_dir.entry(dir.to_string()).or_default().push(name.to_string());
        }
    }
    let media_directories = by_dir
        .into_iter()
        .map(|(path, mut files)| {
            files.sort();
            MediaDirectory { path, files }
        })
        .collect();

    Ok(DatabaseState {
        tables: vec![],
        collections,
        media_directories,
    })
}

/// Build the visualization tree: metadata records first, physical storage
/// tree as the fallback.
pub async fn visualization_tree(ctx: &AppContext) -> Result<TreeNode, StoreError> {
    let records = ctx.documents.all_files().await?;
    if records.is_empty() {
        return Ok(storage_tree(ctx.layout.root()));
    }
    Ok(records_tree(&records))
}

/// Group records into nested folders along their storage URIs; records
/// without a URI land directly under their collection bucket.
fn records_tree(records: &[FileRecord]) -> TreeNode {
    #[derive(Default)]
    struct Dir {
        dirs: BTreeMap<String, Dir>,
        files: Vec<TreeNode>,
    }

    fn insert(dir: &mut Dir, segments: &[&str], node: TreeNode) {
        match segments {
            [] => dir.files.push(node),
            [head, rest @ ..] => {
                insert(dir.dirs.entry((*head).to_string()).or_default(), rest, node);
            }
        }
    }

    fn collapse(dir: Dir) -> Vec<TreeNode> {
        let mut children: Vec<TreeNode> = dir
            .dirs
            .into_iter()
            .map(|(name, sub)| TreeNode::folder(name, collapse(sub)))
            .collect();
        children.extend(dir.files);
        children
    }

    let mut root = Dir::default();
    for record in records {
        let mime_type = mime_guess::from_path(&record.original_name)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_default();
        let leaf_name = record
            .storage_uri
            .as_deref()
            .and_then(|uri| uri.rsplit('/').next())
            .unwrap_or(&record.original_name)
            .to_string();
        let node = TreeNode::file(
            leaf_name,
            format_size(record.size_bytes),
            mime_type,
            record.storage_uri.clone(),
        );

        match &record.storage_uri {
            Some(uri) => {
                let segments: Vec<&str> = uri.split('/').collect();
                let dirs = &segments[..segments.len().saturating_sub(1)];
                insert(&mut root, dirs, node);
            }
            None => insert(&mut root, &[record.collection.as_str()], node),
        }
    }

    TreeNode::folder("Root", collapse(root))
}

/// Walk the physical storage root into tree form. Hidden entries are
/// skipped; unreadable directories yield empty folders.
fn storage_tree(root: &Path) -> TreeNode {
    fn walk(dir: &Path, root: &Path) -> Vec<TreeNode> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return vec![];
        };

        let mut items: Vec<_> = entries
            .flatten()
            .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        items.sort_by_key(|e| (e.path().is_file(), e.file_name()));

        items
            .into_iter()
            .map(|entry| {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                if path.is_dir() {
                    TreeNode::folder(name, walk(&path, root))
                } else {
                    let size = path.metadata().map(|m| m.len()).unwrap_or(0);
                    let mime_type = mime_guess::from_path(&path)
                        .first()
                        .map(|m| m.to_string())
                        .unwrap_or_default();
                    let storage_path = path
                        .strip_prefix(root)
                        .ok()
                        .map(|p| p.to_string_lossy().replace('\\', "/"));
                    TreeNode::file(name, format_size(size), mime_type, storage_path)
                }
            })
            .collect()
    }

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Storage".to_string());
    TreeNode::folder(name, walk(root, root))
}

/// Human-readable byte size.
#[must_use]
pub fn format_size(size_bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let size = size_bytes as f64;
    if size < KIB {
        format!("{size_bytes} B")
    } else if size < KIB * KIB {
        format!("{:.2} KB", size / KIB)
    } else if size < KIB * KIB * KIB {
        format!("{:.2} MB", size / (KIB * KIB))
    } else {
        format!("{:.2} GB", size / (KIB * KIB * KIB))
    }
}
