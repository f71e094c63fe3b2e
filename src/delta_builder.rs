//! Tree diff between two recorded states of an element subtree.
//!
//! The builder records the bodies below an element when it is created. The
//! caller then changes the model (edits a buffer and rebuilds the unit, for
//! example) and asks for the deltas: the subtree is recorded again and both
//! recordings are walked by handle, not by position.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

use crate::delta::{DeltaFlags, DeltaKind, JavaElementDelta};
use crate::element::{ElementType, JavaElement};
use crate::error::Result;
use crate::info::{AnnotationInfo, InfoDetail};
use crate::manager::ElementManager;
use crate::structure::Bodies;

/// Body contents at the time of recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInfo {
    pub detail: InfoDetail,
    pub children: Vec<JavaElement>,
}

/// The bodies of a subtree, down to a maximum depth.
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    root: Option<JavaElement>,
    order: Vec<JavaElement>,
    infos: HashMap<JavaElement, RecordedInfo>,
}

impl TreeSnapshot {
    /// Records `element` and its descendants from the manager. Elements that
    /// cannot be opened are left out.
    pub fn record(manager: &ElementManager, element: &JavaElement, max_depth: usize) -> Self {
        let mut snapshot = TreeSnapshot {
            root: Some(element.clone()),
            ..Default::default()
        };
        snapshot.record_with(element, 0, max_depth, &mut |el| {
            match manager.element_info(el) {
                Ok(info) => Some(RecordedInfo {
                    detail: info.detail().clone(),
                    children: info.children().to_vec(),
                }),
                Err(err) => {
                    trace!(target: "jmodel.delta", element = %el, error = %err, "not recorded");
                    None
                }
            }
        });
        snapshot
    }

    /// Records from freshly built bodies rather than from the cache.
    pub fn from_bodies(root: &JavaElement, bodies: &Bodies, max_depth: usize) -> Self {
        let by_handle: HashMap<&JavaElement, _> = bodies.iter().map(|(el, info)| (el, info)).collect();
        let mut snapshot = TreeSnapshot {
            root: Some(root.clone()),
            ..Default::default()
        };
        snapshot.record_with(root, 0, max_depth, &mut |el| {
            by_handle.get(el).map(|info| RecordedInfo {
                detail: info.detail().clone(),
                children: info.children().to_vec(),
            })
        });
        snapshot
    }

    fn record_with(
        &mut self,
        element: &JavaElement,
        depth: usize,
        max_depth: usize,
        lookup: &mut dyn FnMut(&JavaElement) -> Option<RecordedInfo>,
    ) {
        if depth >= max_depth {
            return;
        }
        let Some(info) = lookup(element) else {
            return;
        };
        let children = info.children.clone();
        self.order.push(element.clone());
        self.infos.insert(element.clone(), info);
        for child in &children {
            self.record_with(child, depth + 1, max_depth, lookup);
        }
    }

    pub fn root(&self) -> Option<&JavaElement> {
        self.root.as_ref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, element: &JavaElement) -> bool {
        self.infos.contains_key(element)
    }

    pub fn info(&self, element: &JavaElement) -> Option<&RecordedInfo> {
        self.infos.get(element)
    }

    /// Elements in the order they were recorded (parents before children).
    pub fn elements(&self) -> &[JavaElement] {
        &self.order
    }

    pub fn to_record(&self) -> SnapshotRecord {
        SnapshotRecord {
            root: self.root.as_ref().map(JavaElement::handle_memento).unwrap_or_default(),
            nodes: self
                .order
                .iter()
                .filter_map(|el| {
                    let info = self.infos.get(el)?;
                    Some(SnapshotNode {
                        element: el.handle_memento(),
                        detail: info.detail.clone(),
                        children: info.children.iter().map(node_key).collect(),
                    })
                })
                .collect(),
        }
    }

    /// Rebuilds a snapshot written by [`TreeSnapshot::to_record`]. Handles are
    /// parsed under `model`, which must be the root of the live elements the
    /// snapshot is compared with.
    pub fn from_record(model: &JavaElement, record: &SnapshotRecord) -> Result<Self> {
        let root = JavaElement::from_memento(model, &record.root)?;
        let mut snapshot = TreeSnapshot {
            root: Some(root),
            ..Default::default()
        };
        for node in &record.nodes {
            let mut element = JavaElement::from_memento(model, &node.element)?;
            if matches!(node.detail, InfoDetail::ImportContainer) {
                element = element.import_container();
            }
            let children = node
                .children
                .iter()
                .map(|key| parse_node_key(model, key))
                .collect::<Result<Vec<_>>>()?;
            snapshot.order.push(element.clone());
            snapshot.infos.insert(
                element,
                RecordedInfo {
                    detail: node.detail.clone(),
                    children,
                },
            );
        }
        Ok(snapshot)
    }
}

/// The import container shares its unit's memento, so child references to
/// it carry a marker.
const IMPORT_CONTAINER_KEY: &str = "<import container>";

fn node_key(element: &JavaElement) -> String {
    if element.element_type() == ElementType::ImportContainer {
        format!("{}{IMPORT_CONTAINER_KEY}", element.handle_memento())
    } else {
        element.handle_memento()
    }
}

fn parse_node_key(model: &JavaElement, key: &str) -> Result<JavaElement> {
    match key.strip_suffix(IMPORT_CONTAINER_KEY) {
        Some(unit) => Ok(JavaElement::from_memento(model, unit)?.import_container()),
        None => JavaElement::from_memento(model, key),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub root: String,
    pub nodes: Vec<SnapshotNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub element: String,
    pub detail: InfoDetail,
    pub children: Vec<String>,
}

/// Computes the delta of a subtree between the time the builder was created
/// and the time [`JavaElementDeltaBuilder::build_deltas`] is called.
pub struct JavaElementDeltaBuilder {
    element: JavaElement,
    max_depth: usize,
    old: TreeSnapshot,
}

struct DiffState<'a> {
    old: &'a TreeSnapshot,
    new: &'a TreeSnapshot,
    delta: JavaElementDelta,
    /// Old elements not yet matched with a new one.
    unmatched: HashSet<JavaElement>,
    added: HashSet<JavaElement>,
    removed: HashSet<JavaElement>,
}

impl JavaElementDeltaBuilder {
    pub fn new(manager: &ElementManager, element: &JavaElement) -> Self {
        Self::with_max_depth(manager, element, usize::MAX)
    }

    pub fn with_max_depth(manager: &ElementManager, element: &JavaElement, max_depth: usize) -> Self {
        let old = TreeSnapshot::record(manager, element, max_depth);
        Self::from_snapshot(element, old, max_depth)
    }

    /// Starts from an earlier recording, e.g. one loaded from disk.
    pub fn from_snapshot(element: &JavaElement, old: TreeSnapshot, max_depth: usize) -> Self {
        Self {
            element: element.clone(),
            max_depth,
            old,
        }
    }

    pub fn old_snapshot(&self) -> &TreeSnapshot {
        &self.old
    }

    /// Records the subtree again and diffs it against the first recording.
    pub fn build_deltas(self, manager: &ElementManager) -> JavaElementDelta {
        let new = TreeSnapshot::record(manager, &self.element, self.max_depth);
        self.diff(&new)
    }

    pub fn diff(self, new: &TreeSnapshot) -> JavaElementDelta {
        let mut delta = JavaElementDelta::new(self.element.clone());
        if self.element.element_type() >= ElementType::CompilationUnit {
            delta.fine_grained();
        }
        let mut state = DiffState {
            old: &self.old,
            new,
            delta,
            unmatched: self.old.infos.keys().cloned().collect(),
            added: HashSet::new(),
            removed: HashSet::new(),
        };

        state.find_additions(&self.element, 0, self.max_depth);
        state.find_deletions();
        state.find_changes_in_positioning(&self.element, 0, self.max_depth);

        let mut delta = state.delta;
        if delta.affected_children().is_empty()
            && matches!(delta.kind(), DeltaKind::Changed | DeltaKind::None)
        {
            delta.content_changed();
        }
        debug!(
            target: "jmodel.delta",
            element = %self.element,
            affected = delta.affected_children().len(),
            "built delta"
        );
        delta
    }
}

impl DiffState<'_> {
    fn find_additions(&mut self, element: &JavaElement, depth: usize, max_depth: usize) {
        let old_info = self.old.info(element);
        if old_info.is_none() && depth < max_depth {
            self.delta.added(element);
            self.added.insert(element.clone());
        } else {
            self.unmatched.remove(element);
        }

        if depth >= max_depth {
            self.delta.changed(element, DeltaFlags::CONTENT);
            return;
        }

        let Some(new_info) = self.new.info(element) else {
            return;
        };
        let Some(old_info) = old_info else {
            return;
        };
        self.find_content_change(&old_info.detail, &new_info.detail, element);
        for child in &new_info.children {
            self.find_additions(child, depth + 1, max_depth);
        }
    }

    /// Old elements left unmatched were removed. Only the top-most of each
    /// removed subtree is reported.
    fn find_deletions(&mut self) {
        let removed: Vec<JavaElement> = self
            .old
            .elements()
            .iter()
            .filter(|el| self.unmatched.contains(*el))
            .cloned()
            .collect();
        for element in removed {
            self.removed.insert(element.clone());
            if element.parent().is_some_and(|p| self.removed.contains(p)) {
                continue;
            }
            self.delta.removed(&element);
        }
    }

    fn find_changes_in_positioning(&mut self, element: &JavaElement, depth: usize, max_depth: usize) {
        if depth >= max_depth || self.added.contains(element) || self.removed.contains(element) {
            return;
        }
        if !self.is_positioned_correctly(element) {
            self.delta.changed(element, DeltaFlags::REORDER);
        }
        let children = match self.new.info(element) {
            Some(info) => info.children.clone(),
            None => return,
        };
        for child in &children {
            self.find_changes_in_positioning(child, depth + 1, max_depth);
        }
    }

    /// Whether `element` follows the same sibling as before, ignoring added
    /// and removed siblings.
    fn is_positioned_correctly(&self, element: &JavaElement) -> bool {
        if self.old.root() == Some(element) {
            return true;
        }
        let Some(parent) = element.parent() else {
            return true;
        };
        let old_previous = previous_sibling(self.old.info(parent), element, &self.removed);
        let new_previous = previous_sibling(self.new.info(parent), element, &self.added);
        match (old_previous, new_previous) {
            (Some(old), Some(new)) => old == new,
            _ => false,
        }
    }

    fn find_content_change(&mut self, old: &InfoDetail, new: &InfoDetail, element: &JavaElement) {
        if !element.element_type().is_member() {
            return;
        }
        if old.modifiers() != new.modifiers() {
            self.delta.changed(element, DeltaFlags::MODIFIERS);
        }
        if let (Some(old_annotations), Some(new_annotations)) = (old.annotations(), new.annotations()) {
            self.find_annotation_changes(old_annotations, new_annotations, element);
        }
        match (old, new) {
            (InfoDetail::Method(old), InfoDetail::Method(new)) => {
                if old.return_type != new.return_type || old.type_parameters != new.type_parameters {
                    self.delta.changed(element, DeltaFlags::CONTENT);
                }
            }
            (InfoDetail::Field(old), InfoDetail::Field(new)) => {
                if old.type_name != new.type_name {
                    self.delta.changed(element, DeltaFlags::CONTENT);
                }
            }
            (InfoDetail::Type(old), InfoDetail::Type(new)) => {
                if old.superclass != new.superclass || old.interfaces != new.interfaces {
                    self.delta.changed(element, DeltaFlags::SUPER_TYPES);
                }
                if old.type_parameters != new.type_parameters {
                    self.delta.changed(element, DeltaFlags::CONTENT);
                }
                let keys: BTreeSet<&String> = old.categories.keys().chain(new.categories.keys()).collect();
                for key in keys {
                    if old.categories.get(key) == new.categories.get(key) {
                        continue;
                    }
                    match JavaElement::from_memento(&element.model_root(), key) {
                        Ok(member) => {
                            self.delta.changed(&member, DeltaFlags::CATEGORIES);
                        }
                        Err(err) => {
                            trace!(target: "jmodel.delta", key = %key, error = %err, "skipping category change");
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn find_annotation_changes(
        &mut self,
        old: &[AnnotationInfo],
        new: &[AnnotationInfo],
        parent: &JavaElement,
    ) {
        let mut remaining: HashMap<JavaElement, &AnnotationInfo> =
            old.iter().map(|info| (info.handle(parent), info)).collect();
        let mut deltas = Vec::new();

        for info in new {
            let handle = info.handle(parent);
            match remaining.remove(&handle) {
                None => {
                    let mut delta = JavaElementDelta::new(handle);
                    delta.set_added();
                    deltas.push(delta);
                }
                Some(previous) if previous.members != info.members => {
                    let mut delta = JavaElementDelta::new(handle);
                    delta.set_changed(DeltaFlags::CONTENT);
                    deltas.push(delta);
                }
                Some(_) => {}
            }
        }
        for info in old {
            let handle = info.handle(parent);
            if remaining.remove(&handle).is_some() {
                let mut delta = JavaElementDelta::new(handle);
                delta.set_removed();
                deltas.push(delta);
            }
        }

        if deltas.is_empty() {
            return;
        }
        if let Some(parent_delta) = self.delta.changed(parent, DeltaFlags::ANNOTATIONS) {
            parent_delta.set_annotation_deltas(deltas);
        }
    }
}

/// The sibling before `element` in `parent`'s child list, skipping `skip`.
/// `Some(None)` means `element` comes first; `None` means it is not listed.
fn previous_sibling<'a>(
    parent: Option<&'a RecordedInfo>,
    element: &JavaElement,
    skip: &HashSet<JavaElement>,
) -> Option<Option<&'a JavaElement>> {
    let mut previous = None;
    for child in &parent?.children {
        if skip.contains(child) {
            continue;
        }
        if child == element {
            return Some(previous);
        }
        previous = Some(child);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::build_compilation_unit;
    use anyhow::Result;

    fn unit() -> JavaElement {
        JavaElement::model()
            .project("P")
            .package_fragment_root("src", false)
            .package_fragment("p")
            .compilation_unit("X.java")
    }

    fn diff(cu: &JavaElement, before: &str, after: &str) -> Result<JavaElementDelta> {
        let old = TreeSnapshot::from_bodies(cu, &build_compilation_unit(cu, before)?, usize::MAX);
        let new = TreeSnapshot::from_bodies(cu, &build_compilation_unit(cu, after)?, usize::MAX);
        Ok(JavaElementDeltaBuilder::from_snapshot(cu, old, usize::MAX).diff(&new))
    }

    #[test]
    fn identical_trees_only_mark_content() -> Result<()> {
        let source = "package p;\nimport java.util.List;\npublic class X { int a; void m() {} }\n";
        let cu = unit();
        let delta = diff(&cu, source, source)?;
        assert!(delta.affected_children().is_empty());
        assert_eq!(delta.kind(), DeltaKind::Changed);
        assert_eq!(delta.flags(), DeltaFlags::FINE_GRAINED | DeltaFlags::CONTENT);
        Ok(())
    }

    #[test]
    fn removing_one_member_yields_one_removed_delta() -> Result<()> {
        let cu = unit();
        let delta = diff(
            &cu,
            "package p; class X { int a; int b; void m() {} }",
            "package p; class X { int a; void m() {} }",
        )?;
        let ty = cu.type_("X");
        assert_eq!(delta.affected_children().len(), 1);
        let type_delta = &delta.affected_children()[0];
        assert_eq!(type_delta.element(), &ty);
        assert_eq!(type_delta.affected_children().len(), 1);
        let removed = type_delta.removed_children();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].element(), &ty.field("b"));
        Ok(())
    }

    #[test]
    fn removed_type_hides_its_members() -> Result<()> {
        let cu = unit();
        let delta = diff(&cu, "package p; class X {} class Y { int a; }", "package p; class X {}")?;
        assert_eq!(delta.to_string(), "X.java[*]: {CHILDREN | FINE GRAINED}\n\tY[-]: {}");
        Ok(())
    }

    #[test]
    fn modifier_supertype_and_signature_changes() -> Result<()> {
        let cu = unit();
        let delta = diff(
            &cu,
            "package p; class X extends A { int a; String m() { return null; } }",
            "package p; public class X extends B { long a; Object m() { return null; } }",
        )?;
        let ty = cu.type_("X");
        let type_flags = delta.find(&ty).map(JavaElementDelta::flags).unwrap_or_default();
        assert!(type_flags.contains(DeltaFlags::MODIFIERS | DeltaFlags::SUPER_TYPES));
        assert_eq!(
            delta.find(&ty.field("a")).map(JavaElementDelta::flags),
            Some(DeltaFlags::CONTENT)
        );
        assert_eq!(
            delta.find(&ty.method("m", &[])).map(JavaElementDelta::flags),
            Some(DeltaFlags::CONTENT)
        );
        Ok(())
    }

    #[test]
    fn added_member_and_reorder() -> Result<()> {
        let cu = unit();
        let delta = diff(
            &cu,
            "package p; class X { int a; int b; }",
            "package p; class X { int b; int a; int c; }",
        )?;
        let ty = cu.type_("X");
        let type_delta = delta.find(&ty).expect("type delta");
        assert_eq!(type_delta.added_children().len(), 1);
        assert_eq!(type_delta.added_children()[0].element(), &ty.field("c"));
        let reordered: Vec<_> = type_delta
            .changed_children()
            .into_iter()
            .filter(|d| d.flags().contains(DeltaFlags::REORDER))
            .collect();
        assert_eq!(reordered.len(), 2);
        Ok(())
    }

    #[test]
    fn annotation_changes_go_to_the_side_channel() -> Result<()> {
        let cu = unit();
        let delta = diff(
            &cu,
            "package p; class X { @A(1) @B void m() {} }",
            "package p; class X { @A(2) @C void m() {} }",
        )?;
        let method = cu.type_("X").method("m", &[]);
        let method_delta = delta.find(&method).expect("method delta");
        assert_eq!(method_delta.flags(), DeltaFlags::ANNOTATIONS);
        assert!(method_delta.affected_children().is_empty());
        let kinds: Vec<(String, DeltaKind)> = method_delta
            .annotation_deltas()
            .iter()
            .map(|d| (d.element().name().to_string(), d.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("A".to_string(), DeltaKind::Changed),
                ("C".to_string(), DeltaKind::Added),
                ("B".to_string(), DeltaKind::Removed),
            ]
        );
        Ok(())
    }

    #[test]
    fn category_changes_are_reported_on_the_member() -> Result<()> {
        let cu = unit();
        let delta = diff(
            &cu,
            "package p; class X { /** @category a */ int f; }",
            "package p; class X { /** @category b */ int f; }",
        )?;
        let field = cu.type_("X").field("f");
        assert_eq!(
            delta.find(&field).map(JavaElementDelta::flags),
            Some(DeltaFlags::CATEGORIES)
        );
        Ok(())
    }

    #[test]
    fn depth_limit_reports_content_at_the_boundary() -> Result<()> {
        let cu = unit();
        let source = "package p; class X { int a; }";
        let old = TreeSnapshot::from_bodies(&cu, &build_compilation_unit(&cu, source)?, 1);
        let new = TreeSnapshot::from_bodies(&cu, &build_compilation_unit(&cu, source)?, 1);
        assert_eq!(old.len(), 1);
        let delta = JavaElementDeltaBuilder::from_snapshot(&cu, old, 1).diff(&new);
        let ty_delta = delta.find(&cu.type_("X")).map(|d| (d.kind(), d.flags()));
        assert_eq!(ty_delta, Some((DeltaKind::Changed, DeltaFlags::CONTENT)));
        Ok(())
    }

    #[test]
    fn snapshot_record_survives_json() -> Result<()> {
        let cu = unit();
        let source = "package p;\nimport java.util.*;\nclass X<T> { @Deprecated int a; }\n";
        let snapshot = TreeSnapshot::from_bodies(&cu, &build_compilation_unit(&cu, source)?, usize::MAX);
        let json = serde_json::to_string(&snapshot.to_record())?;
        let restored = TreeSnapshot::from_record(&cu.model_root(), &serde_json::from_str(&json)?)?;
        assert_eq!(restored.len(), snapshot.len());
        assert!(restored.contains(&cu.import_container()));
        assert_eq!(restored.info(&cu), snapshot.info(&cu));

        let delta = JavaElementDeltaBuilder::from_snapshot(&cu, restored, usize::MAX).diff(&snapshot);
        assert!(delta.affected_children().is_empty());
        assert_eq!(delta.kind(), DeltaKind::Changed);
        assert_eq!(delta.flags(), DeltaFlags::FINE_GRAINED | DeltaFlags::CONTENT);
        Ok(())
    }

    #[test]
    fn restoring_under_another_root_matches_nothing() -> Result<()> {
        let cu = unit();
        let snapshot = TreeSnapshot::from_bodies(
            &cu,
            &build_compilation_unit(&cu, "package p; class X { int a; }")?,
            usize::MAX,
        );
        let foreign = TreeSnapshot::from_record(&JavaElement::model(), &snapshot.to_record())?;
        assert_eq!(foreign.len(), snapshot.len());
        assert!(!foreign.contains(&cu));
        Ok(())
    }

    #[test]
    fn root_missing_from_the_old_recording_is_added_without_flags() -> Result<()> {
        let cu = unit();
        let new = TreeSnapshot::from_bodies(
            &cu,
            &build_compilation_unit(&cu, "package p; class X { int a; }")?,
            usize::MAX,
        );
        let delta = JavaElementDeltaBuilder::from_snapshot(&cu, TreeSnapshot::default(), usize::MAX)
            .diff(&new);
        assert_eq!(delta.kind(), DeltaKind::Added);
        assert_eq!(delta.flags(), DeltaFlags::empty());
        assert!(delta.affected_children().is_empty());
        assert_eq!(delta.to_string(), "X.java[+]: {}");
        Ok(())
    }
}
