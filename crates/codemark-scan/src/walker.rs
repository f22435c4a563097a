//! Directory traversal with exclusion pruning and an extension allow-list.
//!
//! Traversal order is undefined (directory-entry order); callers sort the
//! extracted occurrences afterwards. Per-node errors are logged and skipped,
//! never fatal to the walk.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Directory names pruned entirely — never descended into. Exact,
/// case-sensitive basename matches.
pub const EXCLUDED_DIRS: [&str; 5] = ["node_modules", ".git", "out", "dist", ".vscode"];

/// File extensions considered source code, compared case-insensitively.
pub const SOURCE_EXTENSIONS: [&str; 12] = [
    "ts", "js", "tsx", "jsx", "py", "java", "cpp", "c", "cs", "php", "go", "rs",
];

/// Whether a directory basename is in the exclusion set.
pub fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name)
}

/// Whether a file path has an eligible source extension.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.as_str()))
}

/// Recursively enumerate eligible source files under the given roots.
///
/// Excluded directories are pruned, non-source files skipped, and any
/// unreadable node contributes nothing.
pub async fn collect_source_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack: Vec<PathBuf> = roots.to_vec();

    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "skipping unreadable directory");
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(dir = %dir.display(), %err, "error while listing directory");
                    break;
                }
            };

            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(err) => {
                    warn!(path = %entry.path().display(), %err, "skipping unreadable entry");
                    continue;
                }
            };

            if file_type.is_dir() {
                let name = entry.file_name();
                if !is_excluded_dir(&name.to_string_lossy()) {
                    stack.push(entry.path());
                }
            } else if file_type.is_file() && is_source_file(&entry.path()) {
                files.push(entry.path());
            }
        }
    }

    files
}
