//! Checkable rules, global or per-file.
//!
//! Global rules apply to every file; each file records which global rules
//! it has checked off in its own `rules-<basename>.json` state file.
//! Local rules belong to a single file and carry their checked flag
//! directly. All persistence is pretty-printed JSON under `.codemark/`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use codemark_core::workspace::{data_dir, ensure_data_dir, relative_to};
use codemark_core::{CodemarkError, Result};

const GLOBAL_RULES_FILE: &str = "global-rules.json";
const LOCAL_RULES_FILE: &str = "local-rules.json";

/// A rule that applies to every file in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalRule {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A rule scoped to one file, carrying its own checked flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRule {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Workspace-relative path of the owning file.
    pub file_path: String,
    pub is_checked: bool,
}

/// Per-file checked state for one global rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRuleState {
    pub rule_id: String,
    pub is_checked: bool,
}

/// On-disk shape of a `rules-<basename>.json` state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileRulesData {
    file_path: String,
    rules: Vec<FileRuleState>,
}

/// Whether a rule is global or file-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Global,
    Local,
}

/// Listing sort order, cycled by repeated sort requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Default,
    CheckedFirst,
    UncheckedFirst,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            SortMode::Default => SortMode::CheckedFirst,
            SortMode::CheckedFirst => SortMode::UncheckedFirst,
            SortMode::UncheckedFirst => SortMode::Default,
        }
    }
}

/// Listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    All,
    Global,
    Local,
}

/// One row of a rule listing for the current file.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: RuleKind,
    pub is_checked: bool,
}

impl RuleEntry {
    /// Icon hint for UI surfaces.
    pub fn icon(&self) -> &'static str {
        if self.is_checked {
            "check"
        } else {
            "circle-outline"
        }
    }
}

/// JSON-backed store of global and local rules plus per-file states.
pub struct RuleStore {
    root: PathBuf,
    global: Vec<GlobalRule>,
    local: Vec<LocalRule>,
    sort_mode: SortMode,
    filter_mode: FilterMode,
}

fn new_id(prefix: &str) -> String {
    format!(
        "{prefix}_{}_{}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

impl RuleStore {
    /// Load both rule files from the workspace root. Missing or corrupt
    /// files yield empty rule lists; parse failures are logged.
    pub fn load(root: &Path) -> Self {
        let mut store = Self {
            root: root.to_path_buf(),
            global: Vec::new(),
            local: Vec::new(),
            sort_mode: SortMode::default(),
            filter_mode: FilterMode::default(),
        };
        store.global = store.read_json_list(GLOBAL_RULES_FILE);
        store.local = store.read_json_list(LOCAL_RULES_FILE);

        // Legacy local rules may carry absolute paths.
        let mut migrated = false;
        for rule in &mut store.local {
            if Path::new(&rule.file_path).is_absolute() {
                rule.file_path = relative_to(root, Path::new(&rule.file_path));
                migrated = true;
            }
        }
        if migrated {
            if let Err(err) = store.save_local() {
                warn!(%err, "could not rewrite migrated local rules");
            }
        }
        store
    }

    fn read_json_list<T: serde::de::DeserializeOwned>(&self, file: &str) -> Vec<T> {
        let path = data_dir(&self.root).join(file);
        if !path.exists() {
            return Vec::new();
        }
        match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(list) => list,
                Err(err) => {
                    warn!(file, %err, "could not parse rules file, starting empty");
                    Vec::new()
                }
            },
            Err(err) => {
                warn!(file, %err, "could not read rules file, starting empty");
                Vec::new()
            }
        }
    }

    /// Add a workspace-wide rule. Returns the generated rule id.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written back.
    pub fn add_global(&mut self, name: &str, description: Option<&str>) -> Result<String> {
        let rule = GlobalRule {
            id: new_id("global_rule"),
            name: name.to_string(),
            description: description.unwrap_or("Custom rule").to_string(),
        };
        let id = rule.id.clone();
        self.global.push(rule);
        self.save_global()?;
        Ok(id)
    }

    /// Add a rule scoped to one file. Returns the generated rule id.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written back.
    pub fn add_local(&mut self, file: &Path, name: &str, description: Option<&str>) -> Result<String> {
        let rule = LocalRule {
            id: new_id("local_rule"),
            name: name.to_string(),
            description: description.unwrap_or("Custom rule").to_string(),
            file_path: relative_to(&self.root, file),
            is_checked: false,
        };
        let id = rule.id.clone();
        self.local.push(rule);
        self.save_local()?;
        Ok(id)
    }

    /// Rename or re-describe a global rule. Returns `false` when the id
    /// is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be written back.
    pub fn edit_global(
        &mut self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let Some(rule) = self.global.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        if let Some(name) = name {
            rule.name = name.trim().to_string();
        }
        if let Some(description) = description {
            let trimmed = description.trim();
            rule.description = if trimmed.is_empty() {
                "Custom rule".to_string()
            } else {
                trimmed.to_string()
            };
        }
        self.save_global()?;
        Ok(true)
    }

    /// Remove a rule (global or local) and purge its id from every
    /// per-file state file. Returns `false` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error when a store file cannot be written back.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let global_len = self.global.len();
        self.global.retain(|r| r.id != id);
        if self.global.len() != global_len {
            self.save_global()?;
            self.purge_rule_from_states(id)?;
            return Ok(true);
        }

        let local_len = self.local.len();
        self.local.retain(|r| r.id != id);
        if self.local.len() != local_len {
            self.save_local()?;
            self.purge_rule_from_states(id)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Flip a rule's checked state for the current file. Local rules flip
    /// their own flag; global rules flip (or insert as checked) the
    /// per-file state. Returns `false` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error when a store file cannot be written back.
    pub fn toggle(&mut self, id: &str, current_file: &Path) -> Result<bool> {
        if let Some(rule) = self.local.iter_mut().find(|r| r.id == id) {
            rule.is_checked = !rule.is_checked;
            self.save_local()?;
            return Ok(true);
        }

        if self.global.iter().any(|r| r.id == id) {
            let mut states = self.file_states(current_file);
            match states.iter_mut().find(|s| s.rule_id == id) {
                Some(state) => state.is_checked = !state.is_checked,
                None => states.push(FileRuleState {
                    rule_id: id.to_string(),
                    is_checked: true,
                }),
            }
            self.save_file_states(current_file, states)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Advance the listing sort order one step and return it.
    pub fn cycle_sort(&mut self) -> SortMode {
        self.sort_mode = self.sort_mode.next();
        self.sort_mode
    }

    pub fn set_sort(&mut self, mode: SortMode) {
        self.sort_mode = mode;
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter_mode = filter;
    }

    /// Rules applicable to the current file, filtered and sorted by the
    /// store's current modes. With no current file the listing is empty.
    pub fn list(&self, current_file: Option<&Path>) -> Vec<RuleEntry> {
        let Some(current_file) = current_file else {
            return Vec::new();
        };
        let states = self.file_states(current_file);
        let rel = relative_to(&self.root, current_file);

        let global_entries = self.global.iter().map(|rule| RuleEntry {
            id: rule.id.clone(),
            name: rule.name.clone(),
            description: rule.description.clone(),
            kind: RuleKind::Global,
            is_checked: states
                .iter()
                .find(|s| s.rule_id == rule.id)
                .is_some_and(|s| s.is_checked),
        });
        let local_entries = self
            .local
            .iter()
            .filter(|rule| rule.file_path == rel)
            .map(|rule| RuleEntry {
                id: rule.id.clone(),
                name: rule.name.clone(),
                description: rule.description.clone(),
                kind: RuleKind::Local,
                is_checked: rule.is_checked,
            });

        let mut entries: Vec<RuleEntry> = match self.filter_mode {
            FilterMode::All => global_entries.chain(local_entries).collect(),
            FilterMode::Global => global_entries.collect(),
            FilterMode::Local => local_entries.collect(),
        };

        match self.sort_mode {
            SortMode::Default => {}
            SortMode::CheckedFirst => entries.sort_by_key(|e| !e.is_checked),
            SortMode::UncheckedFirst => entries.sort_by_key(|e| e.is_checked),
        }
        entries
    }

    fn file_rules_path(&self, file: &Path) -> PathBuf {
        let basename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        data_dir(&self.root).join(format!("rules-{basename}.json"))
    }

    fn file_states(&self, file: &Path) -> Vec<FileRuleState> {
        let path = self.file_rules_path(file);
        if !path.exists() {
            return Vec::new();
        }
        match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<FileRulesData>(&data) {
                Ok(parsed) => parsed.rules,
                Err(err) => {
                    warn!(path = %path.display(), %err, "could not parse file rule states");
                    Vec::new()
                }
            },
            Err(err) => {
                warn!(path = %path.display(), %err, "could not read file rule states");
                Vec::new()
            }
        }
    }

    fn save_file_states(&self, file: &Path, states: Vec<FileRuleState>) -> Result<()> {
        ensure_data_dir(&self.root)?;
        let data = FileRulesData {
            file_path: relative_to(&self.root, file),
            rules: states,
        };
        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| CodemarkError::Serialization(e.to_string()))?;
        std::fs::write(self.file_rules_path(file), json)?;
        Ok(())
    }

    /// Drop a removed rule's id from every `rules-*.json` state file,
    /// rewriting only files that actually referenced it.
    fn purge_rule_from_states(&self, id: &str) -> Result<()> {
        let dir = data_dir(&self.root);
        if !dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("rules-") || !name.ends_with(".json") {
                continue;
            }
            let path = entry.path();
            let data = match std::fs::read_to_string(&path) {
                Ok(data) => data,
                Err(err) => {
                    warn!(path = %path.display(), %err, "could not read state file during purge");
                    continue;
                }
            };
            let mut parsed: FileRulesData = match serde_json::from_str(&data) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(path = %path.display(), %err, "could not parse state file during purge");
                    continue;
                }
            };
            let before = parsed.rules.len();
            parsed.rules.retain(|s| s.rule_id != id);
            if parsed.rules.len() != before {
                let json = serde_json::to_string_pretty(&parsed)
                    .map_err(|e| CodemarkError::Serialization(e.to_string()))?;
                std::fs::write(&path, json)?;
            }
        }
        Ok(())
    }

    fn save_global(&self) -> Result<()> {
        self.write_json_list(GLOBAL_RULES_FILE, &self.global)
    }

    fn save_local(&self) -> Result<()> {
        self.write_json_list(LOCAL_RULES_FILE, &self.local)
    }

    fn write_json_list<T: Serialize>(&self, file: &str, list: &[T]) -> Result<()> {
        ensure_data_dir(&self.root)?;
        let json = serde_json::to_string_pretty(list)
            .map_err(|e| CodemarkError::Serialization(e.to_string()))?;
        std::fs::write(data_dir(&self.root).join(file), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_rules_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::load(dir.path());
        let id = store.add_global("No unwrap in prod code", None).unwrap();

        let reloaded = RuleStore::load(dir.path());
        let entries = reloaded.list(Some(&dir.path().join("a.rs")));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].description, "Custom rule");
        assert_eq!(entries[0].kind, RuleKind::Global);
        assert!(!entries[0].is_checked);
    }

    #[test]
    fn local_rules_are_scoped_to_their_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ts");
        let b = dir.path().join("b.ts");

        let mut store = RuleStore::load(dir.path());
        store.add_local(&a, "Keep exports sorted", Some("a only")).unwrap();

        assert_eq!(store.list(Some(&a)).len(), 1);
        assert!(store.list(Some(&b)).is_empty());
        assert!(store.list(None).is_empty());
    }

    #[test]
    fn toggling_a_global_rule_is_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ts");
        let b = dir.path().join("b.ts");

        let mut store = RuleStore::load(dir.path());
        let id = store.add_global("Review error paths", None).unwrap();
        assert!(store.toggle(&id, &a).unwrap());

        assert!(store.list(Some(&a))[0].is_checked);
        assert!(!store.list(Some(&b))[0].is_checked);

        // Flipping back unchecks it for that file only.
        store.toggle(&id, &a).unwrap();
        assert!(!store.list(Some(&a))[0].is_checked);
    }

    #[test]
    fn toggling_a_local_rule_flips_its_own_flag() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ts");

        let mut store = RuleStore::load(dir.path());
        let id = store.add_local(&a, "Document invariants", None).unwrap();
        store.toggle(&id, &a).unwrap();

        let reloaded = RuleStore::load(dir.path());
        assert!(reloaded.list(Some(&a))[0].is_checked);
    }

    #[test]
    fn toggle_of_unknown_rule_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::load(dir.path());
        assert!(!store.toggle("missing", &dir.path().join("a.ts")).unwrap());
    }

    #[test]
    fn removing_a_rule_purges_per_file_states() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ts");

        let mut store = RuleStore::load(dir.path());
        let keep = store.add_global("keep", None).unwrap();
        let drop = store.add_global("drop", None).unwrap();
        store.toggle(&keep, &a).unwrap();
        store.toggle(&drop, &a).unwrap();

        assert!(store.remove(&drop).unwrap());

        let reloaded = RuleStore::load(dir.path());
        let entries = reloaded.list(Some(&a));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, keep);
        assert!(entries[0].is_checked);

        // The state file no longer references the removed id.
        let state = std::fs::read_to_string(dir.path().join(".codemark/rules-a.ts.json")).unwrap();
        assert!(!state.contains(&drop));
    }

    #[test]
    fn edit_updates_name_and_description() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::load(dir.path());
        let id = store.add_global("old name", Some("old desc")).unwrap();

        assert!(store.edit_global(&id, Some("new name"), Some("  ")).unwrap());
        let entry = &store.list(Some(&dir.path().join("x.ts")))[0];
        assert_eq!(entry.name, "new name");
        // Blank descriptions fall back to the default.
        assert_eq!(entry.description, "Custom rule");

        assert!(!store.edit_global("missing", Some("x"), None).unwrap());
    }

    #[test]
    fn sort_modes_cycle_and_reorder() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ts");

        let mut store = RuleStore::load(dir.path());
        let first = store.add_global("first", None).unwrap();
        let second = store.add_global("second", None).unwrap();
        store.toggle(&second, &a).unwrap();

        assert_eq!(store.cycle_sort(), SortMode::CheckedFirst);
        let entries = store.list(Some(&a));
        assert_eq!(entries[0].id, second);

        assert_eq!(store.cycle_sort(), SortMode::UncheckedFirst);
        let entries = store.list(Some(&a));
        assert_eq!(entries[0].id, first);

        assert_eq!(store.cycle_sort(), SortMode::Default);
    }

    #[test]
    fn set_sort_applies_an_order_directly() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ts");

        let mut store = RuleStore::load(dir.path());
        store.add_global("first", None).unwrap();
        let second = store.add_global("second", None).unwrap();
        store.toggle(&second, &a).unwrap();

        store.set_sort(SortMode::CheckedFirst);
        assert_eq!(store.list(Some(&a))[0].id, second);
    }

    #[test]
    fn filter_modes_select_rule_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ts");

        let mut store = RuleStore::load(dir.path());
        store.add_global("global one", None).unwrap();
        store.add_local(&a, "local one", None).unwrap();

        assert_eq!(store.list(Some(&a)).len(), 2);
        store.set_filter(FilterMode::Global);
        assert_eq!(store.list(Some(&a))[0].kind, RuleKind::Global);
        assert_eq!(store.list(Some(&a)).len(), 1);
        store.set_filter(FilterMode::Local);
        assert_eq!(store.list(Some(&a))[0].kind, RuleKind::Local);
    }
}
