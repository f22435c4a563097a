//! Per-file workflow status store.
//!
//! Statuses live in `.codemark/file-statuses.json` as a JSON array keyed
//! by workspace-relative path. A file not yet in the store defaults to
//! DRAFT and is persisted on first access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use codemark_core::workspace::{ensure_data_dir, relative_to};
use codemark_core::{CodemarkError, Result};

const STATUS_FILE: &str = "file-statuses.json";

/// Workflow status of a file. Cycles DRAFT → ONGOING → DONE → DRAFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkStatus {
    Draft,
    Ongoing,
    Done,
}

impl WorkStatus {
    /// The next status in the cycle.
    pub fn next(self) -> Self {
        match self {
            WorkStatus::Draft => WorkStatus::Ongoing,
            WorkStatus::Ongoing => WorkStatus::Done,
            WorkStatus::Done => WorkStatus::Draft,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkStatus::Draft => "DRAFT",
            WorkStatus::Ongoing => "ONGOING",
            WorkStatus::Done => "DONE",
        }
    }

    /// Single-character badge for decorations.
    pub fn badge(self) -> &'static str {
        match self {
            WorkStatus::Draft => "D",
            WorkStatus::Ongoing => "O",
            WorkStatus::Done => "✓",
        }
    }

    /// Icon hint for UI surfaces.
    pub fn icon(self) -> &'static str {
        match self {
            WorkStatus::Draft => "edit",
            WorkStatus::Ongoing => "clock",
            WorkStatus::Done => "check",
        }
    }

    /// Color hint for UI surfaces.
    pub fn color(self) -> &'static str {
        match self {
            WorkStatus::Draft => "blue",
            WorkStatus::Ongoing => "yellow",
            WorkStatus::Done => "green",
        }
    }
}

impl FromStr for WorkStatus {
    type Err = CodemarkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(WorkStatus::Draft),
            "ONGOING" => Ok(WorkStatus::Ongoing),
            "DONE" => Ok(WorkStatus::Done),
            other => Err(CodemarkError::Store(format!("unknown status: {other}"))),
        }
    }
}

impl std::fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted status record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatusEntry {
    /// Workspace-relative path.
    pub file_path: String,
    pub status: WorkStatus,
    /// Unix milliseconds of the last status change.
    pub last_modified: i64,
}

/// JSON-backed store of per-file workflow statuses.
pub struct StatusStore {
    root: PathBuf,
    statuses: HashMap<String, FileStatusEntry>,
}

impl StatusStore {
    /// Load the store from the workspace root. A missing or unreadable
    /// status file yields an empty store; parse failures are logged.
    pub fn load(root: &Path) -> Self {
        let mut store = Self {
            root: root.to_path_buf(),
            statuses: HashMap::new(),
        };

        let path = store.storage_path();
        if !path.exists() {
            return store;
        }
        match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Vec<FileStatusEntry>>(&data) {
                Ok(entries) => {
                    for mut entry in entries {
                        // Legacy entries may carry absolute paths.
                        if Path::new(&entry.file_path).is_absolute() {
                            entry.file_path = relative_to(root, Path::new(&entry.file_path));
                        }
                        store.statuses.insert(entry.file_path.clone(), entry);
                    }
                }
                Err(err) => warn!(%err, "could not parse file statuses, starting empty"),
            },
            Err(err) => warn!(%err, "could not read file statuses, starting empty"),
        }
        store
    }

    fn storage_path(&self) -> PathBuf {
        codemark_core::workspace::data_dir(&self.root).join(STATUS_FILE)
    }

    /// Current status of a file, defaulting a new file to DRAFT and
    /// persisting that default.
    pub fn status_of(&mut self, path: &Path) -> WorkStatus {
        let rel = relative_to(&self.root, path);
        if !self.statuses.contains_key(&rel) {
            self.statuses.insert(
                rel.clone(),
                FileStatusEntry {
                    file_path: rel.clone(),
                    status: WorkStatus::Draft,
                    last_modified: Utc::now().timestamp_millis(),
                },
            );
            if let Err(err) = self.save() {
                warn!(%err, "could not persist default file status");
            }
        }
        self.statuses[&rel].status
    }

    /// Set a file's status explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written back.
    pub fn set(&mut self, path: &Path, status: WorkStatus) -> Result<()> {
        let rel = relative_to(&self.root, path);
        let entry = self
            .statuses
            .entry(rel.clone())
            .or_insert_with(|| FileStatusEntry {
                file_path: rel,
                status: WorkStatus::Draft,
                last_modified: 0,
            });
        entry.status = status;
        entry.last_modified = Utc::now().timestamp_millis();
        self.save()
    }

    /// Advance a file's status one step along the cycle and return the
    /// new status.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written back.
    pub fn cycle(&mut self, path: &Path) -> Result<WorkStatus> {
        let next = self.status_of(path).next();
        self.set(path, next)?;
        Ok(next)
    }

    /// All persisted entries, sorted by path for stable listings.
    pub fn entries(&self) -> Vec<&FileStatusEntry> {
        let mut entries: Vec<&FileStatusEntry> = self.statuses.values().collect();
        entries.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        entries
    }

    fn save(&self) -> Result<()> {
        ensure_data_dir(&self.root)?;
        let mut entries: Vec<&FileStatusEntry> = self.statuses.values().collect();
        entries.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| CodemarkError::Serialization(e.to_string()))?;
        std::fs::write(self.storage_path(), json)?;
        Ok(())
    }
}
