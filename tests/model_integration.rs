use anyhow::Result;
use jmodel::buffer::BufferManager;
use jmodel::cache::ModelCache;
use jmodel::config::CacheConfig;
use jmodel::context::ModelContext;
use jmodel::delta::{DeltaFlags, DeltaKind, GenericFlags, JavaElementDelta};
use jmodel::delta_builder::{JavaElementDeltaBuilder, SnapshotRecord, TreeSnapshot};
use jmodel::element::JavaElement;
use jmodel::info::{ElementInfo, InfoDetail, OpenableDetail};
use jmodel::javadoc::{self, ParserOptions, ProblemKind};
use jmodel::manager::ElementManager;
use jmodel::workspace::{FsContentProvider, ProjectConfig, RootEntry, Workspace};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn manager_for(location: &Path) -> ElementManager {
    let workspace = Arc::new(Workspace::on_filesystem());
    workspace.add_project(ProjectConfig::new("P", location).with_root(RootEntry::folder("src")));
    let context = Arc::new(ModelContext::new(CacheConfig::default().with_memory_ratio(1.0)));
    ElementManager::new(context, workspace)
}

fn unit(model: &JavaElement, name: &str) -> JavaElement {
    model
        .project("P")
        .package_fragment_root("src", false)
        .package_fragment("p")
        .compilation_unit(name)
}

fn openable_info() -> Arc<ElementInfo> {
    Arc::new(ElementInfo::new(InfoDetail::Openable(OpenableDetail::default())))
}

#[test]
fn javadoc_tags_and_problems_per_comment() {
    let text = "package p;\n\
        /**\n * Adds things.\n * @param x the input\n * @deprecated use {@link Other#add(int)}\n * @return one\n * @return two\n */\n\
        class A { int add(int x) { return x; } }\n";
    let comments = javadoc::parse_all(text, ParserOptions::default());
    assert_eq!(comments.len(), 1);

    let (doc, problems) = &comments[0];
    assert!(doc.deprecated);
    assert!(doc.has_tag("param"));
    assert_eq!(doc.params.len(), 1);
    assert_eq!(doc.params[0].name, "x");
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].kind, ProblemKind::DuplicatedReturnTag);
}

#[test]
fn dirty_buffers_survive_cache_pressure() {
    let buffers = BufferManager::new(Arc::new(FsContentProvider));
    let mut cache = ModelCache::new(&CacheConfig::default().with_memory_ratio(0.04));
    assert_eq!(cache.openable_cache_size(), 10);

    let model = JavaElement::model();
    let dirty = unit(&model, "U0.java");
    buffers.open_buffer_with(&dirty, &PathBuf::from("/w/src/p/U0.java"), "class U0 {}".to_string(), false);
    buffers
        .set_contents(&dirty, "class U0 { int x; }")
        .expect("buffer is writable");
    let clean = unit(&model, "U1.java");
    buffers.open_buffer_with(&clean, &PathBuf::from("/w/src/p/U1.java"), "class U1 {}".to_string(), false);

    cache.put(dirty.clone(), openable_info(), &buffers);
    cache.put(clean.clone(), openable_info(), &buffers);
    let mut closed = Vec::new();
    for i in 2..30 {
        closed.extend(cache.put(unit(&model, &format!("U{i}.java")), openable_info(), &buffers));
    }

    assert!(cache.peek(&dirty).is_some());
    assert!(buffers.buffer(&dirty).is_some_and(|b| b.is_dirty()));
    assert!(closed.contains(&clean));
    assert!(cache.peek(&clean).is_none());
    assert!(buffers.buffer(&clean).is_none());
}

#[test]
fn editing_a_buffer_yields_a_sparse_delta() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_file(
        &dir.path().join("src/p/A.java"),
        "package p;\npublic class A {\n  int x;\n  int y;\n  void run() {}\n}\n",
    )?;
    let manager = manager_for(dir.path());
    let unit = unit(manager.model(), "A.java");
    manager.open(&unit)?;

    let builder = JavaElementDeltaBuilder::new(&manager, &unit);
    manager.open_buffer(&unit)?;
    manager
        .buffers()
        .set_contents(&unit, "package p;\npublic class A {\n  int x;\n  void run() {}\n}\n")?;
    manager.make_consistent(&unit)?;
    let delta = builder.build_deltas(&manager);

    let ty = unit.type_("A");
    assert_eq!(delta.element(), &unit);
    assert_eq!(delta.kind(), DeltaKind::Changed);
    assert_eq!(delta.affected_children().len(), 1);
    let type_delta = &delta.affected_children()[0];
    assert_eq!(type_delta.element(), &ty);
    assert_eq!(type_delta.affected_children().len(), 1);
    assert_eq!(type_delta.removed_children().len(), 1);
    assert_eq!(type_delta.removed_children()[0].element(), &ty.field("y"));
    assert!(delta.find(&ty.field("x")).is_none());
    assert!(delta.find(&ty.method("run", &[])).is_none());

    // The edit is unsaved, so closing keeps the new structure.
    manager.close(&unit)?;
    assert!(manager.is_open(&unit));
    assert!(!manager.children(&ty)?.contains(&ty.field("y")));
    Ok(())
}

#[test]
fn unchanged_rebuild_reports_only_content() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_file(
        &dir.path().join("src/p/B.java"),
        "package p;\nimport java.util.List;\nclass B { List<String> names; }\n",
    )?;
    let manager = manager_for(dir.path());
    let unit = unit(manager.model(), "B.java");
    manager.open(&unit)?;

    let builder = JavaElementDeltaBuilder::new(&manager, &unit);
    manager.make_consistent(&unit)?;
    let delta = builder.build_deltas(&manager);
    assert!(delta.affected_children().is_empty());
    assert_eq!(delta.flags(), DeltaFlags::CONTENT | DeltaFlags::FINE_GRAINED);
    Ok(())
}

#[test]
fn stored_snapshot_diffs_sparsely_against_the_live_model() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("src/p/C.java");
    write_file(&path, "package p;\nclass C { int a; int b; }\n")?;
    let manager = manager_for(dir.path());
    let unit = unit(manager.model(), "C.java");
    manager.open(&unit)?;

    let json = serde_json::to_string(&TreeSnapshot::record(&manager, &unit, usize::MAX).to_record())?;
    let record: SnapshotRecord = serde_json::from_str(&json)?;
    let old = TreeSnapshot::from_record(manager.model(), &record)?;
    assert!(old.contains(&unit));

    write_file(&path, "package p;\nclass C { int a; }\n")?;
    manager.make_consistent(&unit)?;
    let new = TreeSnapshot::record(&manager, &unit, usize::MAX);
    let delta = JavaElementDeltaBuilder::from_snapshot(&unit, old, usize::MAX).diff(&new);

    let ty = unit.type_("C");
    assert_eq!(delta.kind(), DeltaKind::Changed);
    assert!(delta.added_children().is_empty());
    assert_eq!(delta.find(&ty.field("b")).map(JavaElementDelta::kind), Some(DeltaKind::Removed));
    assert!(delta.find(&ty.field("a")).is_none());
    Ok(())
}

#[test]
fn open_flag_follows_project_accessibility() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let workspace = Workspace::on_filesystem();
    workspace.add_project(ProjectConfig::new("P", dir.path()));
    workspace.add_project(ProjectConfig::new("Gone", dir.path().join("missing")));

    let model = JavaElement::model();
    let mut present = JavaElementDelta::new(model.project("P"));
    present.set_generic_flags(GenericFlags::OPEN | GenericFlags::CHILDREN, &workspace);
    assert!(present.flags().contains(DeltaFlags::OPENED | DeltaFlags::CHILDREN));
    assert!(!present.flags().contains(DeltaFlags::CLOSED));
    assert_eq!(present.generic_flags(), GenericFlags::OPEN | GenericFlags::CHILDREN);

    let mut gone = JavaElementDelta::new(model.project("Gone"));
    gone.set_generic_flags(GenericFlags::OPEN, &workspace);
    assert_eq!(gone.flags(), DeltaFlags::CLOSED);
    assert_eq!(gone.generic_flags(), GenericFlags::OPEN);
    Ok(())
}
