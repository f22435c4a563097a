//! Occurrence type — one recognized inline marker annotation.

use std::path::PathBuf;

use serde::Serialize;

use crate::pattern::pattern_for;

/// A single marker found in a source file. Derived on every scan, never
/// persisted; the resolved flag comes from the presence of the
/// `@DONE-<TAG>:` token in the source line itself.
///
/// Identity for toggle purposes is `(abs_path, line, tag)` as of scan
/// time. If the file changes between scan and toggle, the toggle targets
/// whatever still matches at that location, or quietly does nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Canonical upper-case tag, e.g. `"TODO"`.
    pub tag: String,
    /// Free-text message after the tag, trimmed.
    pub message: String,
    /// Path relative to the scanned root.
    pub rel_path: String,
    /// Absolute path of the containing file.
    pub abs_path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// Whether the source line carries the resolution prefix.
    pub resolved: bool,
}

impl Occurrence {
    /// Primary display text: `TAG: message`.
    pub fn label(&self) -> String {
        format!("{}: {}", self.tag, self.message)
    }

    /// Secondary display text: `path:line`.
    pub fn description(&self) -> String {
        format!("{}:{}", self.rel_path, self.line)
    }

    /// Multi-line hover text.
    pub fn tooltip(&self) -> String {
        format!(
            "{}: {}\nFile: {}\nLine: {}",
            self.tag, self.message, self.rel_path, self.line
        )
    }

    /// Icon hint for UI surfaces: a check mark once resolved, otherwise
    /// the tag's icon from the marker table.
    pub fn icon(&self) -> &'static str {
        if self.resolved {
            "check"
        } else {
            pattern_for(&self.tag).map_or("comment", |p| p.icon)
        }
    }
}
