//! # codemark-scan
//!
//! The marker scanner and toggle engine. Recursively walks source trees,
//! extracts inline marker comments (`// TODO: ...` and friends) via the
//! fixed pattern table, partitions them into pending and completed views,
//! and flips an occurrence's resolved state by rewriting its source line
//! in place.
//!
//! The occurrence set is derived, never persisted: every rescan re-reads
//! every eligible file and replaces the cached set wholesale. All
//! filesystem work is async on one cooperative runtime; the only
//! suspension points are directory enumeration, file reads and writes,
//! and the debounce/settle timers.

pub mod debounce;
pub mod scanner;
pub mod toggle;
pub mod walker;
pub mod watcher;

pub use debounce::Debouncer;
pub use scanner::{extract_occurrences, MarkerScanner, Partition, DEBOUNCE_WINDOW, SETTLE_DELAY};
pub use toggle::toggle_occurrence;
pub use watcher::{ChangeEvent, MarkerWatcher};
