use anyhow::{Context, Result};
use clap::Parser;
use jmodel::cli::{Cli, Commands, OutputFormat};
use jmodel::config::{clear_db, resolve_db_path};
use jmodel::context::ModelContext;
use jmodel::delta_builder::{JavaElementDeltaBuilder, TreeSnapshot};
use jmodel::delta::DeltaRecord;
use jmodel::element::{ElementType, JavaElement};
use jmodel::javadoc::{self, Javadoc, ParserOptions, Problem};
use jmodel::manager::ElementManager;
use jmodel::modifiers::Modifiers;
use jmodel::scan;
use jmodel::snapshot::{SnapshotStore, StoredSnapshot};
use jmodel::structure::content_hash;
use jmodel::workspace::{ProjectConfig, RootEntry, Workspace, locate_source_file};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

const PROJECT: &str = "standalone";
const ROOT: &str = ".";

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command.clone() {
        Commands::Clear => {
            let db_path = resolve_db_path(&cli)?;
            clear_db(&db_path)?;
        }
        Commands::Stats => {
            let db_path = resolve_db_path(&cli)?;
            let store = SnapshotStore::open(db_path)?;
            let stats = store.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Javadoc { file, dom } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let options = if dom { ParserOptions::dom() } else { ParserOptions::default() };
            let comments: Vec<CommentOutput> = javadoc::parse_all(&text, options)
                .into_iter()
                .map(|(javadoc, problems)| CommentOutput { javadoc, problems })
                .collect();
            println!("{}", serde_json::to_string_pretty(&comments)?);
        }
        Commands::Outline { file, format } => {
            let session = Session::open(&file)?;
            let outline = outline(&session.manager, &session.unit)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outline)?),
                OutputFormat::Text => {
                    let mut out = String::new();
                    write_outline(&outline, 0, &mut out);
                    print!("{out}");
                }
            }
        }
        Commands::Snapshot { file } => {
            let session = Session::open(&file)?;
            let store = SnapshotStore::open(resolve_db_path(&cli)?)?;
            let snapshot = TreeSnapshot::record(&session.manager, &session.unit, usize::MAX);
            let stored = StoredSnapshot {
                content_hash: content_hash(session.source.as_bytes()),
                recorded_at: now_secs(),
                record: snapshot.to_record(),
            };
            store.put(&session.key, &stored)?;
            let output = SnapshotOutput {
                file: session.key,
                element: session.unit.handle_memento(),
                nodes: snapshot.len(),
                content_hash: stored.content_hash,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Diff {
            file,
            format,
            update,
        } => {
            let session = Session::open(&file)?;
            let store = SnapshotStore::open(resolve_db_path(&cli)?)?;
            let output = diff(&session, &store, update)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => match &output.text {
                    Some(text) => println!("{text}"),
                    None => println!("unchanged"),
                },
            }
        }
        Commands::Index { dir } => {
            let output = index(&dir)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("JMODEL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn manager_for_root(root: &Path) -> ElementManager {
    let workspace = Arc::new(Workspace::on_filesystem());
    workspace.add_project(ProjectConfig::new(PROJECT, root).with_root(RootEntry::folder(ROOT)));
    ElementManager::new(Arc::new(ModelContext::from_env()), workspace)
}

/// A single source file opened in a one-project workspace rooted at the
/// file's source folder.
struct Session {
    manager: ElementManager,
    unit: JavaElement,
    source: String,
    key: String,
}

impl Session {
    fn open(file: &Path) -> Result<Self> {
        let path = file
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", file.display()))?;
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let (root, package) = locate_source_file(&path, &source);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Source file name is not valid UTF-8")?;

        let manager = manager_for_root(&root);
        let unit = manager
            .model()
            .project(PROJECT)
            .package_fragment_root(ROOT, false)
            .package_fragment(&package)
            .compilation_unit(name);
        manager
            .open(&unit)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        Ok(Self {
            manager,
            unit,
            source,
            key: path.to_string_lossy().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct CommentOutput {
    javadoc: Javadoc,
    problems: Vec<Problem>,
}

#[derive(Debug, Serialize)]
struct OutlineNode {
    label: String,
    element_type: ElementType,
    memento: String,
    #[serde(skip_serializing_if = "Modifiers::is_empty")]
    flags: Modifiers,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<OutlineNode>,
}

fn outline(manager: &ElementManager, element: &JavaElement) -> Result<OutlineNode> {
    let info = manager.element_info(element)?;
    let children = info
        .children()
        .iter()
        .map(|child| outline(manager, child))
        .collect::<Result<Vec<_>>>()?;
    Ok(OutlineNode {
        label: element.label(),
        element_type: element.element_type(),
        memento: element.handle_memento(),
        flags: info.modifiers(),
        children,
    })
}

fn write_outline(node: &OutlineNode, indent: usize, out: &mut String) {
    out.push_str(&"  ".repeat(indent));
    out.push_str(&node.label);
    if !node.flags.is_empty() {
        out.push_str(&format!(" [{:?}]", node.flags));
    }
    out.push_str(&format!("  {}\n", node.memento));
    for child in &node.children {
        write_outline(child, indent + 1, out);
    }
}

#[derive(Debug, Serialize)]
struct SnapshotOutput {
    file: String,
    element: String,
    nodes: usize,
    content_hash: String,
}

#[derive(Debug, Serialize)]
struct DiffOutput {
    file: String,
    unchanged: bool,
    updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    delta: Option<DeltaRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

fn diff(session: &Session, store: &SnapshotStore, update: bool) -> Result<DiffOutput> {
    let stored = store
        .get(&session.key)?
        .with_context(|| format!("No snapshot recorded for {}", session.key))?;
    let hash = content_hash(session.source.as_bytes());
    if hash == stored.content_hash {
        return Ok(DiffOutput {
            file: session.key.clone(),
            unchanged: true,
            updated: false,
            delta: None,
            text: None,
        });
    }

    let old = TreeSnapshot::from_record(session.manager.model(), &stored.record)
        .with_context(|| format!("Unreadable snapshot for {}", session.key))?;
    let new = TreeSnapshot::record(&session.manager, &session.unit, usize::MAX);
    let delta = JavaElementDeltaBuilder::from_snapshot(&session.unit, old, usize::MAX).diff(&new);

    if update {
        store.put(
            &session.key,
            &StoredSnapshot {
                content_hash: hash,
                recorded_at: now_secs(),
                record: new.to_record(),
            },
        )?;
    }

    Ok(DiffOutput {
        file: session.key.clone(),
        unchanged: false,
        updated: update,
        delta: Some(delta.to_record()),
        text: Some(delta.to_string()),
    })
}

#[derive(Debug, Serialize)]
struct IndexOutput {
    root: String,
    files: usize,
    opened: usize,
    failed: Vec<String>,
    duration_ms: u64,
    cache: jmodel::cache::CacheStats,
}

fn index(dir: &Path) -> Result<IndexOutput> {
    let start = Instant::now();
    let root = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", dir.display()))?;
    let manager = manager_for_root(&root);
    let root_element = manager
        .model()
        .project(PROJECT)
        .package_fragment_root(ROOT, false);

    let files = scan::find_files(&root, "java");
    let units: Vec<(PathBuf, JavaElement)> = files
        .iter()
        .filter_map(|file| {
            let relative = file.strip_prefix(&root).ok()?;
            let name = relative.file_name()?.to_str()?;
            let package: Vec<&str> = relative
                .parent()?
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect();
            let unit = root_element
                .package_fragment(&package.join("."))
                .compilation_unit(name);
            Some((file.clone(), unit))
        })
        .collect();

    let failed: Vec<String> = units
        .par_iter()
        .filter_map(|(file, unit)| match manager.open(unit) {
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(target: "jmodel.model", file = %file.display(), error = %err, "index skipped file");
                Some(file.to_string_lossy().to_string())
            }
        })
        .collect();

    Ok(IndexOutput {
        root: root.to_string_lossy().to_string(),
        files: files.len(),
        opened: units.len() - failed.len(),
        failed,
        duration_ms: start.elapsed().as_millis() as u64,
        cache: manager.stats(),
    })
}
