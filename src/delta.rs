//! Element deltas.
//!
//! A [`JavaElementDelta`] is a tree of changes rooted at one element. Sub-deltas
//! are inserted with [`JavaElementDelta::insert_delta_tree`], which creates the
//! intermediate CHANGED nodes between the root and the inserted element and
//! merges with whatever is already recorded for the same handle.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::trace;

use crate::element::{ElementType, JavaElement};

bitflags! {
    /// Kind-specific change flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DeltaFlags: u32 {
        const CONTENT = 0x1;
        const MODIFIERS = 0x2;
        const CHILDREN = 0x8;
        const MOVED_FROM = 0x10;
        const MOVED_TO = 0x20;
        const ADDED_TO_CLASSPATH = 0x40;
        const REMOVED_FROM_CLASSPATH = 0x80;
        const REORDER = 0x100;
        const OPENED = 0x200;
        const CLOSED = 0x400;
        const SUPER_TYPES = 0x800;
        const SOURCE_ATTACHED = 0x1000;
        const SOURCE_DETACHED = 0x2000;
        const FINE_GRAINED = 0x4000;
        const ARCHIVE_CONTENT_CHANGED = 0x8000;
        const PRIMARY_WORKING_COPY = 0x1_0000;
        const CLASSPATH_CHANGED = 0x2_0000;
        const PRIMARY_RESOURCE = 0x4_0000;
        const AST_AFFECTED = 0x8_0000;
        const CATEGORIES = 0x10_0000;
        const RESOLVED_CLASSPATH_CHANGED = 0x20_0000;
        const ANNOTATIONS = 0x40_0000;
    }
}

bitflags! {
    /// Flags for listeners that do not care about element kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GenericFlags: u32 {
        const CONTENT = 0x1;
        const CHILDREN = 0x2;
        const FINE_GRAINED = 0x4;
        const MOVED_FROM = 0x8;
        const MOVED_TO = 0x10;
        const OPEN = 0x20;
        const REORDER = 0x40;
        const UNDERLYING_RESOURCE = 0x80;
        const WORKING_COPY = 0x100;
    }
}

/// Generic flag and the kind-specific flag it stands for. `OPEN` is handled
/// apart since it maps to either OPENED or CLOSED.
const FLAG_PAIRS: [(GenericFlags, DeltaFlags); 8] = [
    (GenericFlags::CONTENT, DeltaFlags::CONTENT),
    (GenericFlags::CHILDREN, DeltaFlags::CHILDREN),
    (GenericFlags::FINE_GRAINED, DeltaFlags::FINE_GRAINED),
    (GenericFlags::MOVED_FROM, DeltaFlags::MOVED_FROM),
    (GenericFlags::MOVED_TO, DeltaFlags::MOVED_TO),
    (GenericFlags::REORDER, DeltaFlags::REORDER),
    (GenericFlags::UNDERLYING_RESOURCE, DeltaFlags::PRIMARY_RESOURCE),
    (GenericFlags::WORKING_COPY, DeltaFlags::PRIMARY_WORKING_COPY),
];

impl DeltaFlags {
    pub fn to_generic(self) -> GenericFlags {
        let mut generic = GenericFlags::empty();
        for (g, j) in FLAG_PAIRS {
            if self.contains(j) {
                generic |= g;
            }
        }
        if self.intersects(DeltaFlags::OPENED | DeltaFlags::CLOSED) {
            generic |= GenericFlags::OPEN;
        }
        generic
    }

    fn names(self, delta: &JavaElementDelta) -> Vec<String> {
        let mut names = Vec::new();
        let mut push = |flag: DeltaFlags, name: &str| {
            if self.contains(flag) {
                names.push(name.to_string());
            }
        };
        push(DeltaFlags::CHILDREN, "CHILDREN");
        push(DeltaFlags::CONTENT, "CONTENT");
        if self.contains(DeltaFlags::MOVED_FROM) {
            let from = delta.moved_from.as_ref().map(JavaElement::to_string_with_ancestors);
            names.push(format!("MOVED_FROM({})", from.unwrap_or_default()));
        }
        if self.contains(DeltaFlags::MOVED_TO) {
            let to = delta.moved_to.as_ref().map(JavaElement::to_string_with_ancestors);
            names.push(format!("MOVED_TO({})", to.unwrap_or_default()));
        }
        let mut push = |flag: DeltaFlags, name: &str| {
            if self.contains(flag) {
                names.push(name.to_string());
            }
        };
        push(DeltaFlags::ADDED_TO_CLASSPATH, "ADDED TO CLASSPATH");
        push(DeltaFlags::REMOVED_FROM_CLASSPATH, "REMOVED FROM CLASSPATH");
        push(DeltaFlags::REORDER, "REORDERED");
        push(DeltaFlags::ARCHIVE_CONTENT_CHANGED, "ARCHIVE CONTENT CHANGED");
        push(DeltaFlags::SOURCE_ATTACHED, "SOURCE ATTACHED");
        push(DeltaFlags::SOURCE_DETACHED, "SOURCE DETACHED");
        push(DeltaFlags::FINE_GRAINED, "FINE GRAINED");
        push(DeltaFlags::PRIMARY_WORKING_COPY, "PRIMARY WORKING COPY");
        push(DeltaFlags::CLASSPATH_CHANGED, "RAW CLASSPATH CHANGED");
        push(DeltaFlags::RESOLVED_CLASSPATH_CHANGED, "RESOLVED CLASSPATH CHANGED");
        push(DeltaFlags::PRIMARY_RESOURCE, "PRIMARY RESOURCE");
        push(DeltaFlags::OPENED, "OPENED");
        push(DeltaFlags::CLOSED, "CLOSED");
        push(DeltaFlags::AST_AFFECTED, "AST AFFECTED");
        push(DeltaFlags::CATEGORIES, "CATEGORIES");
        push(DeltaFlags::ANNOTATIONS, "ANNOTATIONS");
        push(DeltaFlags::MODIFIERS, "MODIFIERS CHANGED");
        push(DeltaFlags::SUPER_TYPES, "SUPER TYPES CHANGED");
        names
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    #[default]
    None,
    Added,
    Removed,
    Changed,
}

impl DeltaKind {
    fn marker(self) -> &'static str {
        match self {
            DeltaKind::Added => "[+]",
            DeltaKind::Removed => "[-]",
            DeltaKind::Changed => "[*]",
            DeltaKind::None => "[?]",
        }
    }
}

/// Answers whether an element can currently be reached, so that a generic
/// OPEN flag can be turned into OPENED or CLOSED.
pub trait Accessibility {
    fn is_accessible(&self, element: &JavaElement) -> bool;
}

pub struct AlwaysAccessible;

impl Accessibility for AlwaysAccessible {
    fn is_accessible(&self, _element: &JavaElement) -> bool {
        true
    }
}

pub type DeltaComparator<'a> = &'a dyn Fn(&JavaElementDelta, &JavaElementDelta) -> Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaElementDelta {
    element: JavaElement,
    kind: DeltaKind,
    flags: DeltaFlags,
    affected_children: Vec<JavaElementDelta>,
    annotation_deltas: Vec<JavaElementDelta>,
    moved_from: Option<JavaElement>,
    moved_to: Option<JavaElement>,
}

impl JavaElementDelta {
    pub fn new(element: JavaElement) -> Self {
        Self {
            element,
            kind: DeltaKind::None,
            flags: DeltaFlags::empty(),
            affected_children: Vec::new(),
            annotation_deltas: Vec::new(),
            moved_from: None,
            moved_to: None,
        }
    }

    pub fn element(&self) -> &JavaElement {
        &self.element
    }

    pub fn kind(&self) -> DeltaKind {
        self.kind
    }

    pub fn flags(&self) -> DeltaFlags {
        self.flags
    }

    pub fn generic_flags(&self) -> GenericFlags {
        self.flags.to_generic()
    }

    pub fn moved_from_element(&self) -> Option<&JavaElement> {
        self.moved_from.as_ref()
    }

    pub fn moved_to_element(&self) -> Option<&JavaElement> {
        self.moved_to.as_ref()
    }

    pub fn affected_children(&self) -> &[JavaElementDelta] {
        &self.affected_children
    }

    pub fn added_children(&self) -> Vec<&JavaElementDelta> {
        self.children_of_kind(DeltaKind::Added)
    }

    pub fn removed_children(&self) -> Vec<&JavaElementDelta> {
        self.children_of_kind(DeltaKind::Removed)
    }

    pub fn changed_children(&self) -> Vec<&JavaElementDelta> {
        self.children_of_kind(DeltaKind::Changed)
    }

    fn children_of_kind(&self, kind: DeltaKind) -> Vec<&JavaElementDelta> {
        self.affected_children.iter().filter(|d| d.kind == kind).collect()
    }

    pub fn annotation_deltas(&self) -> &[JavaElementDelta] {
        &self.annotation_deltas
    }

    pub fn set_annotation_deltas(&mut self, deltas: Vec<JavaElementDelta>) {
        self.annotation_deltas = deltas;
    }

    /// Sets the kind-specific bits from generic ones. Pairs missing from
    /// `generic` are cleared; OPEN becomes OPENED or CLOSED depending on
    /// whether the element is reachable right now.
    pub fn set_generic_flags(&mut self, generic: GenericFlags, oracle: &dyn Accessibility) {
        for (g, j) in FLAG_PAIRS {
            self.flags.set(j, generic.contains(g));
        }
        self.flags.remove(DeltaFlags::OPENED | DeltaFlags::CLOSED);
        if generic.contains(GenericFlags::OPEN) {
            if oracle.is_accessible(&self.element) {
                self.flags |= DeltaFlags::OPENED;
            } else {
                self.flags |= DeltaFlags::CLOSED;
            }
        }
    }

    pub fn set_flags(&mut self, flags: DeltaFlags) {
        self.flags = flags;
    }

    /// Marks this node as an addition.
    pub fn set_added(&mut self) {
        self.kind = DeltaKind::Added;
        self.flags = DeltaFlags::empty();
    }

    /// Marks this node as a removal.
    pub fn set_removed(&mut self) {
        self.kind = DeltaKind::Removed;
        self.flags = DeltaFlags::empty();
    }

    pub fn set_changed(&mut self, flags: DeltaFlags) {
        self.kind = DeltaKind::Changed;
        self.flags |= flags;
    }

    /// Adds CONTENT without touching the kind.
    pub fn content_changed(&mut self) {
        self.flags |= DeltaFlags::CONTENT;
    }

    pub fn fine_grained(&mut self) {
        self.set_changed(DeltaFlags::FINE_GRAINED);
    }

    pub fn added(&mut self, element: &JavaElement) {
        self.added_with_flags(element, DeltaFlags::empty());
    }

    pub fn added_with_flags(&mut self, element: &JavaElement, flags: DeltaFlags) {
        let mut delta = JavaElementDelta::new(element.clone());
        delta.set_added();
        delta.flags = flags;
        self.insert_delta_tree(delta);
    }

    pub fn removed(&mut self, element: &JavaElement) {
        self.removed_with_flags(element, DeltaFlags::empty());
    }

    pub fn removed_with_flags(&mut self, element: &JavaElement, flags: DeltaFlags) {
        let mut delta = JavaElementDelta::new(element.clone());
        delta.set_removed();
        delta.flags = flags;
        self.insert_delta_tree(delta);
    }

    /// Records a CHANGED delta for `element` and returns the node now in the
    /// tree. `None` when an enclosing node was already added or removed.
    pub fn changed(&mut self, element: &JavaElement, flags: DeltaFlags) -> Option<&mut JavaElementDelta> {
        let mut delta = JavaElementDelta::new(element.clone());
        delta.set_changed(flags);
        self.insert_delta_tree(delta);
        self.find_mut(element)
    }

    /// `from` was moved to `to`: a REMOVED delta on `from`.
    pub fn moved_from(&mut self, from: &JavaElement, to: &JavaElement) {
        let mut delta = JavaElementDelta::new(from.clone());
        delta.kind = DeltaKind::Removed;
        delta.flags = DeltaFlags::MOVED_TO;
        delta.moved_to = Some(to.clone());
        self.insert_delta_tree(delta);
    }

    /// `to` was moved here from `from`: an ADDED delta on `to`.
    pub fn moved_to(&mut self, to: &JavaElement, from: &JavaElement) {
        let mut delta = JavaElementDelta::new(to.clone());
        delta.kind = DeltaKind::Added;
        delta.flags = DeltaFlags::MOVED_FROM;
        delta.moved_from = Some(from.clone());
        self.insert_delta_tree(delta);
    }

    pub fn opened(&mut self, element: &JavaElement) {
        self.changed(element, DeltaFlags::OPENED);
    }

    pub fn closed(&mut self, element: &JavaElement) {
        self.changed(element, DeltaFlags::CLOSED);
    }

    pub fn source_attached(&mut self, element: &JavaElement) {
        self.changed(element, DeltaFlags::SOURCE_ATTACHED);
    }

    pub fn source_detached(&mut self, element: &JavaElement) {
        self.changed(element, DeltaFlags::SOURCE_DETACHED);
    }

    /// The delta for `element` in this tree, searching depth first.
    pub fn find(&self, element: &JavaElement) -> Option<&JavaElementDelta> {
        if &self.element == element {
            return Some(self);
        }
        self.affected_children.iter().find_map(|child| child.find(element))
    }

    fn find_mut(&mut self, element: &JavaElement) -> Option<&mut JavaElementDelta> {
        if &self.element == element {
            return Some(self);
        }
        self.affected_children
            .iter_mut()
            .find_map(|child| child.find_mut(element))
    }

    /// Places `delta` in this tree, building the CHANGED chain between this
    /// node and the delta's element.
    pub fn insert_delta_tree(&mut self, delta: JavaElementDelta) {
        if delta.element == self.element {
            self.merge_with(delta);
            return;
        }
        let mut chain = delta;
        let mut current = chain.element.parent().cloned();
        while let Some(ancestor) = current {
            if ancestor == self.element {
                break;
            }
            current = ancestor.parent().cloned();
            let mut wrapper = JavaElementDelta::new(ancestor);
            wrapper.add_affected_child(chain);
            chain = wrapper;
        }
        self.add_affected_child(chain);
    }

    /// Folds a delta for this same element into this node.
    fn merge_with(&mut self, delta: JavaElementDelta) {
        let old_flags = self.flags;
        match delta.kind {
            DeltaKind::None => self.flags |= delta.flags,
            DeltaKind::Changed => {
                self.kind = DeltaKind::Changed;
                self.flags |= delta.flags;
            }
            DeltaKind::Added | DeltaKind::Removed => {
                self.kind = delta.kind;
                self.flags = delta.flags;
                self.affected_children.clear();
            }
        }
        if delta.moved_from.is_some() {
            self.moved_from = delta.moved_from;
        }
        if delta.moved_to.is_some() {
            self.moved_to = delta.moved_to;
        }
        if !delta.annotation_deltas.is_empty() {
            assert!(
                self.annotation_deltas.is_empty(),
                "annotation deltas of {} merged twice",
                self.element
            );
            self.annotation_deltas = delta.annotation_deltas;
        }
        if delta.flags.contains(DeltaFlags::CONTENT)
            && !delta.flags.contains(DeltaFlags::FINE_GRAINED)
            && old_flags.contains(DeltaFlags::FINE_GRAINED)
            && !old_flags.contains(DeltaFlags::CONTENT)
        {
            self.flags.remove(DeltaFlags::CONTENT);
        }
        for child in delta.affected_children {
            self.add_affected_child(child);
        }
    }

    /// Adds `child` to the affected children, merging with an existing entry
    /// for the same element.
    pub fn add_affected_child(&mut self, mut child: JavaElementDelta) {
        match self.kind {
            DeltaKind::Added | DeltaKind::Removed => return,
            DeltaKind::Changed => self.flags |= DeltaFlags::CHILDREN,
            DeltaKind::None => {
                self.kind = DeltaKind::Changed;
                self.flags |= DeltaFlags::CHILDREN;
            }
        }
        if self.element.element_type() >= ElementType::CompilationUnit {
            self.fine_grained();
        }

        let Some(index) = self
            .affected_children
            .iter()
            .position(|existing| existing.element == child.element)
        else {
            self.affected_children.push(child);
            return;
        };

        let existing = &mut self.affected_children[index];
        trace!(target: "jmodel.delta", element = %child.element, existing = ?existing.kind, incoming = ?child.kind, "merging child delta");
        match (existing.kind, child.kind) {
            (DeltaKind::Added, DeltaKind::Removed) => {
                self.affected_children.remove(index);
            }
            (DeltaKind::Added, _) => {}
            (DeltaKind::Removed, DeltaKind::Added) => {
                child.kind = DeltaKind::Changed;
                *existing = child;
            }
            (DeltaKind::Removed, _) => {}
            (DeltaKind::Changed, DeltaKind::Changed) => {
                for grandchild in std::mem::take(&mut child.affected_children) {
                    existing.add_affected_child(grandchild);
                }
                let child_had_content = child.flags.contains(DeltaFlags::CONTENT);
                let existing_had_children = existing.flags.contains(DeltaFlags::CHILDREN);
                existing.flags |= child.flags;
                if child_had_content && existing_had_children {
                    existing.flags.remove(DeltaFlags::CONTENT);
                }
                if !child.annotation_deltas.is_empty() {
                    assert!(
                        existing.annotation_deltas.is_empty(),
                        "annotation deltas of {} merged twice",
                        existing.element
                    );
                    existing.annotation_deltas = child.annotation_deltas;
                }
            }
            (DeltaKind::Changed, DeltaKind::None) => {
                for grandchild in child.affected_children {
                    existing.add_affected_child(grandchild);
                }
            }
            (DeltaKind::Changed, _) => *existing = child,
            (DeltaKind::None, _) => {
                child.flags |= existing.flags;
                *existing = child;
            }
        }
    }

    /// Renders the tree, sorting children and annotation deltas with
    /// `comparator` when given.
    pub fn to_string_with(&self, comparator: Option<DeltaComparator<'_>>) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0, comparator);
        out
    }

    fn write_tree(&self, out: &mut String, indent: usize, comparator: Option<DeltaComparator<'_>>) {
        for _ in 0..indent {
            out.push('\t');
        }
        out.push_str(&self.element.label());
        out.push_str(self.kind.marker());
        out.push_str(": {");
        out.push_str(&self.flags.names(self).join(" | "));
        out.push('}');

        for group in [&self.affected_children, &self.annotation_deltas] {
            let mut nodes: Vec<&JavaElementDelta> = group.iter().collect();
            if let Some(cmp) = comparator {
                nodes.sort_by(|a, b| cmp(a, b));
            }
            for node in nodes {
                out.push('\n');
                node.write_tree(out, indent + 1, comparator);
            }
        }
    }

    /// Serializable form, with elements written as mementos.
    pub fn to_record(&self) -> DeltaRecord {
        DeltaRecord {
            element: self.element.handle_memento(),
            label: self.element.label(),
            element_type: self.element.element_type(),
            kind: self.kind,
            flags: self.flags,
            moved_from: self.moved_from.as_ref().map(JavaElement::handle_memento),
            moved_to: self.moved_to.as_ref().map(JavaElement::handle_memento),
            children: self.affected_children.iter().map(Self::to_record).collect(),
            annotations: self.annotation_deltas.iter().map(Self::to_record).collect(),
        }
    }
}

impl fmt::Display for JavaElementDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(None))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub element: String,
    pub label: String,
    pub element_type: ElementType,
    pub kind: DeltaKind,
    pub flags: DeltaFlags,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub moved_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub moved_to: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<DeltaRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub annotations: Vec<DeltaRecord>,
}

/// A kind plus flags, without an element or children. Used where only the
/// shape of a change to a single type matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimpleDelta {
    kind: DeltaKind,
    flags: DeltaFlags,
}

impl SimpleDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn added(&mut self) {
        self.kind = DeltaKind::Added;
    }

    pub fn removed(&mut self) {
        self.kind = DeltaKind::Removed;
        self.flags = DeltaFlags::empty();
    }

    pub fn changed(&mut self, flags: DeltaFlags) {
        self.kind = DeltaKind::Changed;
        self.flags |= flags;
    }

    pub fn modifiers(&mut self) {
        self.changed(DeltaFlags::MODIFIERS);
    }

    pub fn super_types(&mut self) {
        self.changed(DeltaFlags::SUPER_TYPES);
    }

    pub fn kind(&self) -> DeltaKind {
        self.kind
    }

    pub fn flags(&self) -> DeltaFlags {
        self.flags
    }
}

impl fmt::Display for SimpleDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.flags.contains(DeltaFlags::MODIFIERS) {
            names.push("MODIFIERS CHANGED");
        }
        if self.flags.contains(DeltaFlags::SUPER_TYPES) {
            names.push("SUPER TYPES CHANGED");
        }
        write!(f, "{}: {{{}}}", self.kind.marker(), names.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> JavaElement {
        JavaElement::model()
            .project("P")
            .package_fragment_root("src", false)
            .package_fragment("p")
            .compilation_unit("X.java")
    }

    struct Inaccessible;

    impl Accessibility for Inaccessible {
        fn is_accessible(&self, _element: &JavaElement) -> bool {
            false
        }
    }

    #[test]
    fn inserting_builds_the_changed_chain() {
        let cu = unit();
        let ty = cu.type_("X");
        let field = ty.field("f");
        let mut delta = JavaElementDelta::new(cu.clone());
        delta.added(&field);

        assert_eq!(delta.kind(), DeltaKind::Changed);
        assert_eq!(delta.flags(), DeltaFlags::CHILDREN | DeltaFlags::FINE_GRAINED);
        let type_delta = &delta.affected_children()[0];
        assert_eq!(type_delta.element(), &ty);
        assert_eq!(type_delta.changed_children().len(), 0);
        assert_eq!(type_delta.added_children().len(), 1);
        assert_eq!(delta.find(&field).map(JavaElementDelta::kind), Some(DeltaKind::Added));
        assert_eq!(
            delta.to_string(),
            "X.java[*]: {CHILDREN | FINE GRAINED}\n\tX[*]: {CHILDREN | FINE GRAINED}\n\t\tf[+]: {}"
        );
    }

    #[test]
    fn merge_rules_for_affected_children() {
        let ty = unit().type_("X");
        let a = ty.field("a");
        let b = ty.field("b");
        let c = ty.field("c");
        let mut delta = JavaElementDelta::new(ty.clone());

        delta.added(&a);
        delta.removed(&a);
        assert!(delta.find(&a).is_none());

        delta.removed(&b);
        delta.added(&b);
        assert_eq!(delta.find(&b).map(JavaElementDelta::kind), Some(DeltaKind::Changed));

        delta.added(&c);
        delta.changed(&c, DeltaFlags::MODIFIERS);
        let c_delta = delta.find(&c).map(|d| (d.kind(), d.flags()));
        assert_eq!(c_delta, Some((DeltaKind::Added, DeltaFlags::empty())));
    }

    #[test]
    fn changed_into_changed_drops_content_when_children_changed() {
        let cu = unit();
        let ty = cu.type_("X");
        let method = ty.method("m", &[]);
        let mut delta = JavaElementDelta::new(cu.clone());
        delta.added(&method);
        delta.changed(&ty, DeltaFlags::CONTENT);

        let type_delta = delta.find(&ty).map(JavaElementDelta::flags);
        assert_eq!(type_delta, Some(DeltaFlags::CHILDREN | DeltaFlags::FINE_GRAINED));
    }

    #[test]
    fn content_on_fine_grained_root_is_dropped_by_self_merge() {
        let cu = unit();
        let mut delta = JavaElementDelta::new(cu.clone());
        delta.fine_grained();
        let mut incoming = JavaElementDelta::new(cu.clone());
        incoming.set_changed(DeltaFlags::CONTENT);
        delta.insert_delta_tree(incoming);
        assert_eq!(delta.flags(), DeltaFlags::FINE_GRAINED);

        delta.content_changed();
        assert!(delta.flags().contains(DeltaFlags::CONTENT));
    }

    #[test]
    fn generic_flags_stay_paired() {
        let project = JavaElement::model().project("P");
        let mut delta = JavaElementDelta::new(project.clone());
        delta.set_generic_flags(GenericFlags::OPEN | GenericFlags::CHILDREN, &AlwaysAccessible);
        assert_eq!(delta.flags(), DeltaFlags::OPENED | DeltaFlags::CHILDREN);
        assert_eq!(delta.generic_flags(), GenericFlags::OPEN | GenericFlags::CHILDREN);

        delta.set_generic_flags(GenericFlags::OPEN, &Inaccessible);
        assert_eq!(delta.flags(), DeltaFlags::CLOSED);

        delta.set_flags(DeltaFlags::PRIMARY_RESOURCE | DeltaFlags::MODIFIERS);
        assert_eq!(delta.generic_flags(), GenericFlags::UNDERLYING_RESOURCE);
    }

    #[test]
    fn moves_record_the_other_element() {
        let pkg = unit().parent().cloned().expect("package");
        let from = pkg.compilation_unit("A.java");
        let to = pkg.compilation_unit("B.java");
        let mut delta = JavaElementDelta::new(pkg.clone());
        delta.moved_from(&from, &to);
        delta.moved_to(&to, &from);

        let removed = delta.removed_children();
        assert_eq!(removed[0].flags(), DeltaFlags::MOVED_TO);
        assert_eq!(removed[0].moved_to_element(), Some(&to));
        let added = delta.added_children();
        assert_eq!(added[0].flags(), DeltaFlags::MOVED_FROM);
        assert!(delta.to_string().contains("B.java[+]: {MOVED_FROM(A.java [in p"));
    }

    #[test]
    fn annotation_deltas_print_after_children_and_sort() {
        let ty = unit().type_("X");
        let method = ty.method("foo", &[]);
        let mut delta = JavaElementDelta::new(ty.clone());
        let mut added = JavaElementDelta::new(method.annotation("B"));
        added.set_added();
        let mut removed = JavaElementDelta::new(method.annotation("A"));
        removed.set_removed();
        if let Some(changed) = delta.changed(&method, DeltaFlags::ANNOTATIONS) {
            changed.set_annotation_deltas(vec![added, removed]);
        }

        let by_name = |a: &JavaElementDelta, b: &JavaElementDelta| a.element().name().cmp(b.element().name());
        assert_eq!(
            delta.to_string_with(Some(&by_name)),
            "X[*]: {CHILDREN | FINE GRAINED}\n\tfoo()[*]: {ANNOTATIONS}\n\t\t@A[-]: {}\n\t\t@B[+]: {}"
        );
        assert_eq!(delta.to_record().children[0].annotations.len(), 2);
    }

    #[test]
    #[should_panic(expected = "merged twice")]
    fn merging_two_annotation_sets_is_a_bug() {
        let ty = unit().type_("X");
        let mut delta = JavaElementDelta::new(ty.clone());
        for name in ["A", "B"] {
            let mut annotation = JavaElementDelta::new(ty.annotation(name));
            annotation.set_added();
            let mut incoming = JavaElementDelta::new(ty.clone());
            incoming.set_changed(DeltaFlags::ANNOTATIONS);
            incoming.set_annotation_deltas(vec![annotation]);
            delta.insert_delta_tree(incoming);
        }
    }

    #[test]
    fn simple_delta_format() {
        let mut delta = SimpleDelta::new();
        delta.modifiers();
        delta.super_types();
        assert_eq!(delta.to_string(), "[*]: {MODIFIERS CHANGED | SUPER TYPES CHANGED}");
        delta.removed();
        assert_eq!(delta.to_string(), "[-]: {}");
        delta.added();
        assert_eq!(delta.kind(), DeltaKind::Added);
    }
}
