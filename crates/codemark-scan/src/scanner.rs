//! The partitioned marker scanner.
//!
//! One [`MarkerScanner`] instance serves one partition view — pending or
//! completed — fixed at construction. Each instance owns its full cached
//! occurrence set and rebuilds it wholesale on every rescan; the visible
//! subset is derived in memory from the cached set and never re-reads the
//! filesystem.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use codemark_core::workspace::relative_to;
use codemark_core::{Occurrence, Result, MARKER_PATTERNS};

use crate::toggle::toggle_occurrence;
use crate::walker::collect_source_files;

/// Quiet window for coalescing filesystem change events before a rescan.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Delay between a toggle write and the reconciling rescan, letting the
/// filesystem write settle. A latency trade-off, not a correctness one:
/// any later rescan re-establishes consistency regardless.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Which half of the resolved/pending partition a scanner serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Pending,
    Completed,
}

impl Partition {
    /// Whether an occurrence with the given resolved flag belongs to this
    /// partition. Every occurrence belongs to exactly one partition.
    pub fn keeps(self, resolved: bool) -> bool {
        match self {
            Partition::Pending => !resolved,
            Partition::Completed => resolved,
        }
    }
}

/// Scans root directories for marker comments and maintains a filtered,
/// sorted view over them.
pub struct MarkerScanner {
    roots: Vec<PathBuf>,
    partition: Partition,
    all: Vec<Occurrence>,
    visible: Vec<Occurrence>,
    active_file: Option<PathBuf>,
    tag_filter: Option<String>,
    changed_tx: watch::Sender<u64>,
}

impl MarkerScanner {
    /// Construct a scanner over the given roots serving one partition.
    /// The occurrence set starts empty; call [`rescan`](Self::rescan) to
    /// populate it.
    pub fn new(roots: Vec<PathBuf>, partition: Partition) -> Self {
        let (changed_tx, _) = watch::channel(0);
        Self {
            roots,
            partition,
            all: Vec::new(),
            visible: Vec::new(),
            active_file: None,
            tag_filter: None,
            changed_tx,
        }
    }

    /// The partition this instance was constructed for.
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Subscribe to change notifications. The value is a generation
    /// counter bumped whenever the visible set may have changed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed_tx.subscribe()
    }

    /// Rebuild the full occurrence set from the filesystem.
    ///
    /// The cached set is replaced by a single assignment after the fully
    /// awaited traversal, so readers never observe a partially built set.
    pub async fn rescan(&mut self) {
        let mut all = Vec::new();
        for root in self.roots.clone() {
            let files = collect_source_files(std::slice::from_ref(&root)).await;
            for file in files {
                match tokio::fs::read_to_string(&file).await {
                    Ok(content) => extract_occurrences(&content, &root, &file, &mut all),
                    Err(err) => {
                        warn!(path = %file.display(), %err, "skipping unreadable file");
                    }
                }
            }
        }

        all.sort_by(|a, b| a.tag.cmp(&b.tag).then_with(|| a.rel_path.cmp(&b.rel_path)));
        debug!(count = all.len(), "rescan complete");

        self.all = all;
        self.apply_filter();
    }

    /// Set (or clear) the active document. The visible set is restricted
    /// to the active document's absolute path; with none, it is empty.
    pub fn set_active_file(&mut self, path: Option<PathBuf>) {
        self.active_file = path;
        self.apply_filter();
    }

    /// Restrict the visible set to one tag, or pass `None` for all tags.
    pub fn set_tag_filter(&mut self, tag: Option<String>) {
        self.tag_filter = tag.map(|t| t.to_ascii_uppercase());
        self.apply_filter();
    }

    /// The distinct tags present in the full set, in sorted order.
    pub fn available_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for occ in &self.all {
            if tags.last().map(String::as_str) != Some(occ.tag.as_str()) {
                tags.push(occ.tag.clone());
            }
        }
        tags
    }

    /// The full sorted occurrence set, both partitions.
    pub fn all(&self) -> &[Occurrence] {
        &self.all
    }

    /// The current visible subset: this partition, restricted to the
    /// active document, optionally restricted to one tag.
    pub fn visible(&self) -> &[Occurrence] {
        &self.visible
    }

    /// Flip one occurrence's resolved state, then rescan after a short
    /// settle delay so both partition views reflect the new state.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the underlying rewrite; the cached
    /// sets are left untouched in that case.
    pub async fn toggle(&mut self, occ: &Occurrence) -> Result<()> {
        toggle_occurrence(occ).await?;
        tokio::time::sleep(SETTLE_DELAY).await;
        self.rescan().await;
        Ok(())
    }

    /// Recompute the visible subset from the cached full set. Purely
    /// in-memory; never touches the filesystem and never re-sorts.
    fn apply_filter(&mut self) {
        self.visible = match &self.active_file {
            None => Vec::new(),
            Some(active) => self
                .all
                .iter()
                .filter(|occ| self.partition.keeps(occ.resolved))
                .filter(|occ| occ.abs_path == *active)
                .filter(|occ| {
                    self.tag_filter
                        .as_deref()
                        .is_none_or(|tag| occ.tag == tag)
                })
                .cloned()
                .collect(),
        };
        self.changed_tx.send_modify(|g| *g = g.wrapping_add(1));
    }
}

/// Extract every marker occurrence from one file's content.
///
/// Content is split on `\n` only; a trailing `\r` stays attached to the
/// line (Windows line endings are not normalized). Each line is matched,
/// trimmed, against every pattern in the table; one line can yield several
/// occurrences and no cross-pattern dedup is performed. The resolved flag
/// is taken from the untrimmed line.
pub fn extract_occurrences(content: &str, root: &Path, path: &Path, out: &mut Vec<Occurrence>) {
    let rel_path = relative_to(root, path);
    for (index, line) in content.split('\n').enumerate() {
        let trimmed = line.trim();
        for pattern in MARKER_PATTERNS.iter() {
            if let Some(message) = pattern.try_match(trimmed) {
                out.push(Occurrence {
                    tag: pattern.tag.to_string(),
                    message,
                    rel_path: rel_path.clone(),
                    abs_path: path.to_path_buf(),
                    line: index + 1,
                    resolved: pattern.is_resolved_in(line),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extract(content: &str) -> Vec<Occurrence> {
        let mut out = Vec::new();
        extract_occurrences(content, Path::new("/work"), Path::new("/work/a.ts"), &mut out);
        out
    }

    #[test]
    fn canonical_line_yields_one_pending_occurrence() {
        let occs = extract("const x = 1;\nconst y = 2;\n// FIXME: null check missing\n");
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].tag, "FIXME");
        assert_eq!(occs[0].message, "null check missing");
        assert_eq!(occs[0].line, 3);
        assert!(!occs[0].resolved);
        assert_eq!(occs[0].rel_path, "a.ts");
    }

    #[test]
    fn done_prefix_marks_occurrence_resolved() {
        let occs = extract("// @DONE-TODO: already handled\n");
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].tag, "TODO");
        assert_eq!(occs[0].message, "already handled");
        assert!(occs[0].resolved);
    }

    #[test]
    fn indented_markers_match_via_trimming() {
        let occs = extract("    \t// NOTE: indentation is irrelevant\n");
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].message, "indentation is irrelevant");
    }

    #[test]
    fn one_line_can_yield_multiple_occurrences() {
        // Adversarial: two comment openers, two tags, no dedup.
        let occs = extract("// FIXME: first half // TODO: second half\n");
        let tags: Vec<&str> = occs.iter().map(|o| o.tag.as_str()).collect();
        assert!(tags.contains(&"FIXME"));
        assert!(tags.contains(&"TODO"));
    }

    #[test]
    fn lowercase_tag_scans_as_canonical_tag() {
        let occs = extract("// todo: lower case still counts\n");
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].tag, "TODO");
        assert!(!occs[0].resolved);
    }

    #[tokio::test]
    async fn rescan_sorts_by_tag_then_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(root.join("b.ts"), "// TODO: beta\n// FIXME: beta\n").unwrap();
        fs::write(root.join("a.ts"), "// TODO: alpha\n").unwrap();

        let mut scanner = MarkerScanner::new(vec![root], Partition::Pending);
        scanner.rescan().await;

        let keys: Vec<(String, String)> = scanner
            .all()
            .iter()
            .map(|o| (o.tag.clone(), o.rel_path.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("FIXME".to_string(), "b.ts".to_string()),
                ("TODO".to_string(), "a.ts".to_string()),
                ("TODO".to_string(), "b.ts".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn partition_law_holds_across_both_views() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let file = root.join("a.ts");
        fs::write(&file, "// TODO: open\n// @DONE-TODO: closed\n// BUG: open too\n").unwrap();

        let mut pending = MarkerScanner::new(vec![root.clone()], Partition::Pending);
        let mut completed = MarkerScanner::new(vec![root], Partition::Completed);
        pending.rescan().await;
        completed.rescan().await;
        pending.set_active_file(Some(file.clone()));
        completed.set_active_file(Some(file));

        assert_eq!(pending.visible().len(), 2);
        assert_eq!(completed.visible().len(), 1);
        assert!(pending.visible().iter().all(|o| !o.resolved));
        assert!(completed.visible().iter().all(|o| o.resolved));
        assert_eq!(
            pending.visible().len() + completed.visible().len(),
            pending.all().len()
        );
    }

    #[tokio::test]
    async fn no_active_file_means_empty_visible_set() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(root.join("a.ts"), "// TODO: something\n").unwrap();

        let mut scanner = MarkerScanner::new(vec![root], Partition::Pending);
        scanner.rescan().await;

        assert_eq!(scanner.all().len(), 1);
        assert!(scanner.visible().is_empty());
    }

    #[tokio::test]
    async fn active_file_filter_restricts_to_that_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let a = root.join("a.ts");
        let b = root.join("b.ts");
        fs::write(&a, "// TODO: in a\n").unwrap();
        fs::write(&b, "// TODO: in b\n").unwrap();

        let mut scanner = MarkerScanner::new(vec![root], Partition::Pending);
        scanner.rescan().await;
        scanner.set_active_file(Some(a.clone()));

        assert_eq!(scanner.visible().len(), 1);
        assert_eq!(scanner.visible()[0].abs_path, a);
    }

    #[tokio::test]
    async fn tag_filter_narrows_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let file = root.join("a.ts");
        fs::write(&file, "// TODO: one\n// FIXME: two\n// HACK: three\n").unwrap();

        let mut scanner = MarkerScanner::new(vec![root], Partition::Pending);
        scanner.rescan().await;
        scanner.set_active_file(Some(file));

        scanner.set_tag_filter(Some("fixme".to_string()));
        assert_eq!(scanner.visible().len(), 1);
        assert_eq!(scanner.visible()[0].tag, "FIXME");

        scanner.set_tag_filter(None);
        assert_eq!(scanner.visible().len(), 3);
    }

    #[tokio::test]
    async fn excluded_directories_never_contribute() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        fs::write(root.join("node_modules/foo.ts"), "// TODO: hidden\n").unwrap();
        fs::write(root.join("visible.ts"), "// TODO: shown\n").unwrap();

        let mut scanner = MarkerScanner::new(vec![root], Partition::Pending);
        scanner.rescan().await;

        assert_eq!(scanner.all().len(), 1);
        assert!(scanner
            .all()
            .iter()
            .all(|o| !o.rel_path.contains("node_modules")));
    }

    #[tokio::test]
    async fn toggle_moves_occurrence_between_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let file = root.join("a.ts");
        fs::write(&file, "line1\nline2\n// FIXME: null check missing\n").unwrap();

        let mut scanner = MarkerScanner::new(vec![root.clone()], Partition::Pending);
        scanner.rescan().await;
        scanner.set_active_file(Some(file.clone()));
        assert_eq!(scanner.visible().len(), 1);

        let occ = scanner.visible()[0].clone();
        scanner.toggle(&occ).await.unwrap();

        // The pending view no longer shows it...
        assert!(scanner.visible().is_empty());
        // ...and a completed-view scan of the same tree does.
        let mut completed = MarkerScanner::new(vec![root], Partition::Completed);
        completed.rescan().await;
        completed.set_active_file(Some(file.clone()));
        assert_eq!(completed.visible().len(), 1);
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "line1\nline2\n// @DONE-FIXME: null check missing\n"
        );
    }

    #[tokio::test]
    async fn change_notification_fires_on_rescan_and_filter_changes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(root.join("a.ts"), "// TODO: one\n").unwrap();

        let mut scanner = MarkerScanner::new(vec![root], Partition::Pending);
        let rx = scanner.subscribe();
        let start = *rx.borrow();

        scanner.rescan().await;
        scanner.set_tag_filter(Some("TODO".to_string()));
        scanner.set_active_file(None);

        assert!(*rx.borrow() > start);
    }

    #[tokio::test]
    async fn available_tags_are_distinct_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(
            root.join("a.ts"),
            "// TODO: one\n// TODO: two\n// BUG: three\n",
        )
        .unwrap();

        let mut scanner = MarkerScanner::new(vec![root], Partition::Pending);
        scanner.rescan().await;
        assert_eq!(scanner.available_tags(), vec!["BUG", "TODO"]);
    }
}
