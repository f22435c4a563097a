//! # codemark-store
//!
//! CRUD-over-JSON stores persisted under the workspace `.codemark/`
//! directory:
//! - [`StatusStore`] — per-file workflow status (DRAFT/ONGOING/DONE)
//! - [`RuleStore`] — checkable rules, global or per-file
//!
//! Both stores are plain derived-state wrappers: load on construction,
//! rewrite the whole JSON file on every mutation. Load failures are
//! logged and treated as an empty store, never fatal.

pub mod rules;
pub mod status;

pub use rules::{FilterMode, RuleEntry, RuleKind, RuleStore, SortMode};
pub use status::{FileStatusEntry, StatusStore, WorkStatus};
