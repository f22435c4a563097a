//! In-place toggling of one marker occurrence.
//!
//! The file is always read fresh, one line is rewritten, and the whole
//! file is written back joined with `\n`. There is no locking against
//! external editors; a concurrent write is last-writer-wins.

use tokio::fs;
use tracing::debug;

use codemark_core::pattern::pattern_for;
use codemark_core::{Occurrence, Result};

/// Flip an occurrence between pending and resolved by editing its source
/// line. Returns `true` when the file was rewritten.
///
/// Structural mismatches are absorbed quietly: if the file has shrunk
/// below the occurrence's line, or the line no longer carries the expected
/// tag shape, nothing is written and no error is raised — this is expected
/// under concurrent external edits.
///
/// # Errors
///
/// Returns [`codemark_core::CodemarkError::Io`] when the file cannot be
/// read or written back.
pub async fn toggle_occurrence(occ: &Occurrence) -> Result<bool> {
    let Some(pattern) = pattern_for(&occ.tag) else {
        debug!(tag = %occ.tag, "toggle requested for unknown tag");
        return Ok(false);
    };

    let content = fs::read_to_string(&occ.abs_path).await?;
    let mut lines: Vec<&str> = content.split('\n').collect();

    if occ.line == 0 || occ.line > lines.len() {
        debug!(
            path = %occ.abs_path.display(),
            line = occ.line,
            "toggle target line out of bounds, skipping"
        );
        return Ok(false);
    }

    let current = lines[occ.line - 1];
    let rewritten = if occ.resolved {
        pattern.unresolve_line(current)
    } else {
        pattern.resolve_line(current)
    };

    if rewritten == current {
        return Ok(false);
    }

    lines[occ.line - 1] = &rewritten;
    fs::write(&occ.abs_path, lines.join("\n")).await?;
    Ok(true)
}
