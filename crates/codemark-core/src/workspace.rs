//! Workspace path helpers.
//!
//! The stores persist their JSON under a `.codemark/` directory at the
//! workspace root; scan results report paths relative to the scanned root.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Name of the per-workspace data directory.
pub const DATA_DIR: &str = ".codemark";

/// Path of the data directory under a workspace root.
pub fn data_dir(root: &Path) -> PathBuf {
    root.join(DATA_DIR)
}

/// Create the data directory if missing and return its path.
pub fn ensure_data_dir(root: &Path) -> Result<PathBuf> {
    let dir = data_dir(root);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Compute a root-relative path string. Falls back to the file name when
/// the path is not under the root (mirrors how an editor labels files
/// outside the workspace).
pub fn relative_to(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned()),
    }
}
