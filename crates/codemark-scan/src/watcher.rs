//! File system watcher for triggering marker rescans.
//!
//! Uses the `notify` crate for cross-platform file system events
//! (FSEvents on macOS, inotify on Linux, ReadDirectoryChanges on Windows).
//! Events are filtered to the source-extension allow-list and to paths
//! outside the excluded directories; consumers feed them through a
//! [`Debouncer`](crate::Debouncer) before rescanning.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use codemark_core::CodemarkError;

use crate::walker::{is_excluded_dir, is_source_file};

/// Events emitted by the marker watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A source file was created or modified.
    Changed(PathBuf),
    /// A source file was deleted.
    Removed(PathBuf),
}

/// Watches a root directory for source-file changes and emits events.
pub struct MarkerWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::Receiver<ChangeEvent>,
}

impl MarkerWatcher {
    /// Start watching a root directory for changes.
    ///
    /// # Errors
    ///
    /// Returns [`CodemarkError::Io`] if the watcher cannot be created.
    pub fn start(root: &Path) -> Result<Self, CodemarkError> {
        let (tx, rx) = mpsc::channel();
        let root_owned = root.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                for path in &event.paths {
                    if !is_source_file(path) {
                        continue;
                    }
                    // Events under pruned directories are not interesting.
                    if path
                        .strip_prefix(&root_owned)
                        .ok()
                        .is_some_and(|rel| {
                            rel.components()
                                .any(|c| is_excluded_dir(&c.as_os_str().to_string_lossy()))
                        })
                    {
                        continue;
                    }

                    let change = match event.kind {
                        EventKind::Create(_) | EventKind::Modify(_) => {
                            ChangeEvent::Changed(path.clone())
                        }
                        EventKind::Remove(_) => ChangeEvent::Removed(path.clone()),
                        _ => continue,
                    };
                    let _ = tx.send(change);
                }
            }
        })
        .map_err(|e| CodemarkError::Io(std::io::Error::other(e)))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| CodemarkError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Try to receive the next event with a timeout.
    ///
    /// Returns `None` if no event is available within the timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Try to receive the next event without blocking.
    ///
    /// Returns `None` if no event is immediately available.
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }
}
