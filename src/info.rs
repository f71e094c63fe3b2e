//! Element bodies.
//!
//! An [`ElementInfo`] is the mutable record the cache keeps for an open
//! handle. Child lists are copy-on-write: readers take an `Arc` snapshot and
//! never observe a half-updated list. The kind detail is plain data so a
//! body tree can be persisted and compared later.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::element::JavaElement;
use crate::modifiers::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub offset: usize,
    pub length: usize,
}

impl SourceRange {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberValuePair {
    pub name: String,
    pub value: String,
}

/// Annotations are kept beside a member's children, not among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationInfo {
    pub name: String,
    pub occurrence: u32,
    pub members: Vec<MemberValuePair>,
}

impl AnnotationInfo {
    pub fn handle(&self, parent: &JavaElement) -> JavaElement {
        parent.annotation(&self.name).with_occurrence(self.occurrence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeParameterInfo {
    pub name: String,
    pub bounds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeDetail {
    pub modifiers: Modifiers,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub type_parameters: Vec<TypeParameterInfo>,
    /// Category tags of children, keyed by the child's handle memento.
    pub categories: BTreeMap<String, Vec<String>>,
    pub annotations: Vec<AnnotationInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodDetail {
    pub modifiers: Modifiers,
    /// `None` for constructors.
    pub return_type: Option<String>,
    pub parameter_names: Vec<String>,
    pub parameter_types: Vec<String>,
    pub exceptions: Vec<String>,
    pub type_parameters: Vec<TypeParameterInfo>,
    pub annotations: Vec<AnnotationInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldDetail {
    pub modifiers: Modifiers,
    pub type_name: String,
    pub constant: Option<String>,
    pub annotations: Vec<AnnotationInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenableDetail {
    /// sha256 of the content the structure was built from.
    pub content_hash: Option<String>,
    pub source_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoDetail {
    Model,
    Project { location: String },
    Root { archive: bool, non_java_resources: usize },
    Package { non_java_resources: usize },
    Openable(OpenableDetail),
    Type(TypeDetail),
    Method(MethodDetail),
    Field(FieldDetail),
    Initializer { modifiers: Modifiers },
    Annotation(AnnotationInfo),
    Import { modifiers: Modifiers },
    PackageDeclaration,
    ImportContainer,
    TypeParameter(TypeParameterInfo),
}

impl InfoDetail {
    pub fn modifiers(&self) -> Option<Modifiers> {
        match self {
            InfoDetail::Type(t) => Some(t.modifiers),
            InfoDetail::Method(m) => Some(m.modifiers),
            InfoDetail::Field(f) => Some(f.modifiers),
            InfoDetail::Initializer { modifiers } | InfoDetail::Import { modifiers } => {
                Some(*modifiers)
            }
            _ => None,
        }
    }

    pub fn annotations(&self) -> Option<&[AnnotationInfo]> {
        match self {
            InfoDetail::Type(t) => Some(&t.annotations),
            InfoDetail::Method(m) => Some(&m.annotations),
            InfoDetail::Field(f) => Some(&f.annotations),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ElementInfo {
    children: RwLock<Arc<[JavaElement]>>,
    structure_known: AtomicBool,
    detail: InfoDetail,
    source_range: Option<SourceRange>,
    name_range: Option<SourceRange>,
}

impl ElementInfo {
    pub fn new(detail: InfoDetail) -> Self {
        Self {
            children: RwLock::new(Arc::from(Vec::new())),
            structure_known: AtomicBool::new(false),
            detail,
            source_range: None,
            name_range: None,
        }
    }

    pub fn with_children(self, children: Vec<JavaElement>) -> Self {
        *self.children.write() = Arc::from(children);
        self
    }

    pub fn with_ranges(mut self, source: Option<SourceRange>, name: Option<SourceRange>) -> Self {
        self.source_range = source;
        self.name_range = name;
        self
    }

    pub fn known(self) -> Self {
        self.set_structure_known(true);
        self
    }

    pub fn children(&self) -> Arc<[JavaElement]> {
        self.children.read().clone()
    }

    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    pub fn add_child(&self, child: JavaElement) {
        let mut guard = self.children.write();
        if guard.contains(&child) {
            return;
        }
        let mut next = guard.to_vec();
        next.push(child);
        *guard = Arc::from(next);
    }

    pub fn remove_child(&self, child: &JavaElement) {
        let mut guard = self.children.write();
        if let Some(index) = guard.iter().position(|c| c == child) {
            let mut next = guard.to_vec();
            next.remove(index);
            *guard = Arc::from(next);
        }
    }

    pub fn set_children(&self, children: Vec<JavaElement>) {
        *self.children.write() = Arc::from(children);
    }

    pub fn is_structure_known(&self) -> bool {
        self.structure_known.load(Ordering::Acquire)
    }

    pub fn set_structure_known(&self, known: bool) {
        self.structure_known.store(known, Ordering::Release);
    }

    pub fn detail(&self) -> &InfoDetail {
        &self.detail
    }

    pub fn modifiers(&self) -> Modifiers {
        self.detail.modifiers().unwrap_or_default()
    }

    pub fn source_range(&self) -> Option<SourceRange> {
        self.source_range
    }

    pub fn name_range(&self) -> Option<SourceRange> {
        self.name_range
    }
}
