//! codemark CLI — inline marker tracking, file statuses, and rules.
//!
//! Commands: scan, toggle, watch, status, rules

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use codemark_core::Occurrence;
use codemark_scan::{
    extract_occurrences, toggle_occurrence, Debouncer, MarkerScanner, MarkerWatcher, Partition,
    DEBOUNCE_WINDOW,
};
use codemark_store::{FilterMode, RuleEntry, RuleKind, RuleStore, SortMode, StatusStore, WorkStatus};

#[derive(Parser)]
#[command(name = "codemark")]
#[command(version)]
#[command(about = "Inline marker tracking, file statuses, and rules for a source tree")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for marker comments and print the matching occurrences
    #[command(alias = "ls")]
    Scan {
        /// Root directory to scan (defaults to the current directory)
        root: Option<PathBuf>,
        /// Show the completed view instead of the pending view
        #[arg(long)]
        completed: bool,
        /// Restrict to one tag (FIXME, TODO, HACK, ...)
        #[arg(long)]
        tag: Option<String>,
        /// Active document: restrict to occurrences in this file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print occurrences as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip one marker between pending and resolved by editing its line
    Toggle {
        /// File containing the marker
        file: PathBuf,
        /// 1-based line number from a scan listing
        line: usize,
        /// Marker tag at that line
        tag: String,
    },
    /// Watch for file changes and reprint the visible set on every rescan
    Watch {
        /// Root directory to watch (defaults to the current directory)
        root: Option<PathBuf>,
        /// Show the completed view instead of the pending view
        #[arg(long)]
        completed: bool,
        /// Restrict to one tag
        #[arg(long)]
        tag: Option<String>,
        /// Active document: restrict to occurrences in this file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// File workflow status (DRAFT/ONGOING/DONE)
    #[command(subcommand)]
    Status(StatusCommand),
    /// Checkable rules, global or per-file
    #[command(subcommand)]
    Rules(RulesCommand),
}

#[derive(Subcommand)]
enum StatusCommand {
    /// Print a file's status (new files default to DRAFT)
    Get { file: PathBuf },
    /// Set a file's status explicitly
    Set { file: PathBuf, status: String },
    /// Advance a file's status one step along the cycle
    Cycle { file: PathBuf },
    /// List every file with a recorded status
    List,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Add a rule; global unless --file scopes it to one file
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Scope the rule to this file instead of the whole workspace
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List rules applicable to a file
    List {
        file: PathBuf,
        /// Restrict to "global" or "local" rules
        #[arg(long)]
        filter: Option<String>,
        /// Order by checked state: "checked-first" or "unchecked-first"
        #[arg(long)]
        sort: Option<String>,
    },
    /// Remove a rule by id
    Rm { id: String },
    /// Edit a global rule's name or description
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Flip a rule's checked state for a file
    Toggle { id: String, file: PathBuf },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            root,
            completed,
            tag,
            file,
            json,
        } => run_scan(root, completed, tag, file, json).await,
        Commands::Toggle { file, line, tag } => run_toggle(file, line, tag).await,
        Commands::Watch {
            root,
            completed,
            tag,
            file,
        } => run_watch(root, completed, tag, file).await,
        Commands::Status(cmd) => run_status(cmd),
        Commands::Rules(cmd) => run_rules(cmd),
    }
}

fn resolve_root(root: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    root.canonicalize()
        .with_context(|| format!("cannot resolve root {}", root.display()))
}

/// Join a possibly-relative user path onto the workspace root. The path
/// does not have to exist (statuses can be recorded ahead of the file).
fn absolutize(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

fn partition_for(completed: bool) -> Partition {
    if completed {
        Partition::Completed
    } else {
        Partition::Pending
    }
}

async fn run_scan(
    root: Option<PathBuf>,
    completed: bool,
    tag: Option<String>,
    file: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let root = resolve_root(root)?;
    let partition = partition_for(completed);
    let tag_filter = tag.map(|t| t.to_ascii_uppercase());

    tracing::debug!(root = %root.display(), ?partition, "scanning");
    let mut scanner = MarkerScanner::new(vec![root], partition);
    scanner.rescan().await;

    let occurrences: Vec<Occurrence> = match file {
        // With an active document the engine's own view derivation applies.
        Some(file) => {
            let file = file
                .canonicalize()
                .with_context(|| format!("cannot resolve file {}", file.display()))?;
            scanner.set_tag_filter(tag_filter);
            scanner.set_active_file(Some(file));
            scanner.visible().to_vec()
        }
        // Without one, list the whole partition for usability; the editor
        // surface always narrows to the active file instead.
        None => scanner
            .all()
            .iter()
            .filter(|o| partition.keeps(o.resolved))
            .filter(|o| tag_filter.as_deref().is_none_or(|t| o.tag == t))
            .cloned()
            .collect(),
    };

    print_occurrences(&occurrences, json)
}

async fn run_toggle(file: PathBuf, line: usize, tag: String) -> anyhow::Result<()> {
    let abs = file
        .canonicalize()
        .with_context(|| format!("cannot resolve file {}", file.display()))?;
    let root = std::env::current_dir()?;
    let wanted = tag.to_ascii_uppercase();

    // Scan the file fresh so the toggle targets current content.
    let content = tokio::fs::read_to_string(&abs)
        .await
        .with_context(|| format!("cannot read {}", abs.display()))?;
    let mut occurrences = Vec::new();
    extract_occurrences(&content, &root, &abs, &mut occurrences);

    let Some(occurrence) = occurrences
        .into_iter()
        .find(|o| o.line == line && o.tag == wanted)
    else {
        anyhow::bail!(
            "no matching occurrence at {}:{line} for tag {wanted}",
            file.display()
        );
    };

    let was_resolved = occurrence.resolved;
    toggle_occurrence(&occurrence)
        .await
        .context("could not update marker")?;
    println!(
        "{} {}",
        if was_resolved { "reopened" } else { "resolved" },
        occurrence.label()
    );
    Ok(())
}

async fn run_watch(
    root: Option<PathBuf>,
    completed: bool,
    tag: Option<String>,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let root = resolve_root(root)?;
    let scanner = Arc::new(Mutex::new(MarkerScanner::new(
        vec![root.clone()],
        partition_for(completed),
    )));

    let mut changes = {
        let mut s = scanner.lock().await;
        if let Some(file) = file {
            let file = file
                .canonicalize()
                .with_context(|| format!("cannot resolve file {}", file.display()))?;
            s.set_active_file(Some(file));
        }
        s.set_tag_filter(tag);
        s.rescan().await;
        print_occurrences(s.visible(), false)?;
        s.subscribe()
    };

    let watcher = MarkerWatcher::start(&root)?;
    let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let s = scanner.lock().await;
                println!("--- rescan: {} visible", s.visible().len());
                print_occurrences(s.visible(), false)?;
            }
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                let mut saw_event = false;
                while watcher.try_recv().is_some() {
                    saw_event = true;
                }
                if saw_event {
                    tracing::debug!("change burst, rescan scheduled");
                    let scanner = Arc::clone(&scanner);
                    debouncer.trigger(move || async move {
                        scanner.lock().await.rescan().await;
                    });
                }
            }
        }
    }
    Ok(())
}

fn run_status(cmd: StatusCommand) -> anyhow::Result<()> {
    let root = std::env::current_dir()?;
    let mut store = StatusStore::load(&root);
    match cmd {
        StatusCommand::Get { file } => {
            let status = store.status_of(&absolutize(&root, file));
            println!("{status}");
        }
        StatusCommand::Set { file, status } => {
            let status: WorkStatus = status.parse()?;
            store.set(&absolutize(&root, file), status)?;
            println!("{status}");
        }
        StatusCommand::Cycle { file } => {
            let status = store.cycle(&absolutize(&root, file))?;
            println!("{status}");
        }
        StatusCommand::List => {
            for entry in store.entries() {
                println!("{} {} - {}", entry.status.badge(), entry.file_path, entry.status);
            }
        }
    }
    Ok(())
}

fn run_rules(cmd: RulesCommand) -> anyhow::Result<()> {
    let root = std::env::current_dir()?;
    let mut store = RuleStore::load(&root);
    match cmd {
        RulesCommand::Add {
            name,
            description,
            file,
        } => {
            let id = match file {
                Some(file) => {
                    store.add_local(&absolutize(&root, file), &name, description.as_deref())?
                }
                None => store.add_global(&name, description.as_deref())?,
            };
            println!("{id}");
        }
        RulesCommand::List { file, filter, sort } => {
            if let Some(filter) = filter {
                store.set_filter(parse_filter(&filter)?);
            }
            if let Some(sort) = sort {
                store.set_sort(parse_sort(&sort)?);
            }
            for entry in store.list(Some(&absolutize(&root, file))) {
                print_rule(&entry);
            }
        }
        RulesCommand::Rm { id } => {
            if !store.remove(&id)? {
                anyhow::bail!("no rule with id {id}");
            }
        }
        RulesCommand::Edit {
            id,
            name,
            description,
        } => {
            if !store.edit_global(&id, name.as_deref(), description.as_deref())? {
                anyhow::bail!("no global rule with id {id}");
            }
        }
        RulesCommand::Toggle { id, file } => {
            if !store.toggle(&id, &absolutize(&root, file))? {
                anyhow::bail!("no rule with id {id}");
            }
        }
    }
    Ok(())
}

fn parse_sort(sort: &str) -> anyhow::Result<SortMode> {
    match sort.to_ascii_lowercase().as_str() {
        "default" => Ok(SortMode::Default),
        "checked-first" => Ok(SortMode::CheckedFirst),
        "unchecked-first" => Ok(SortMode::UncheckedFirst),
        other => anyhow::bail!("unknown sort {other}, expected default|checked-first|unchecked-first"),
    }
}

fn parse_filter(filter: &str) -> anyhow::Result<FilterMode> {
    match filter.to_ascii_lowercase().as_str() {
        "all" => Ok(FilterMode::All),
        "global" => Ok(FilterMode::Global),
        "local" => Ok(FilterMode::Local),
        other => anyhow::bail!("unknown filter {other}, expected all|global|local"),
    }
}

fn print_rule(entry: &RuleEntry) {
    let checked = if entry.is_checked { "x" } else { " " };
    let kind = match entry.kind {
        RuleKind::Global => "global",
        RuleKind::Local => "local",
    };
    println!(
        "[{checked}] {kind:6} {}  {}: {}",
        entry.id, entry.name, entry.description
    );
}

fn print_occurrences(occurrences: &[Occurrence], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(occurrences)?);
        return Ok(());
    }
    if occurrences.is_empty() {
        println!("no markers found");
        return Ok(());
    }
    for occurrence in occurrences {
        println!("{}  {}", occurrence.label(), occurrence.description());
    }
    Ok(())
}
