//! # codemark-core
//!
//! Core types shared across the codemark crates:
//! - [`MarkerPattern`] — the fixed, data-driven table of recognized marker tags
//! - [`Occurrence`] — one recognized inline marker annotation in a source file
//! - Workspace path helpers ([`workspace`])
//! - Error hierarchy ([`CodemarkError`])

pub mod error;
pub mod occurrence;
pub mod pattern;
pub mod workspace;

pub use error::{CodemarkError, Result};
pub use occurrence::Occurrence;
pub use pattern::{pattern_for, MarkerPattern, MARKER_PATTERNS};
