//! Element handles.
//!
//! A [`JavaElement`] is an immutable, cheaply cloned descriptor of a program
//! element. Handles never hold model state: they are created freely and used
//! as cache keys, while the mutable bodies live in the model cache. Parent
//! links only point from child to parent, so a handle chain never forms a
//! cycle; child lists live in the bodies.
//!
//! Equality is structural (kind, name, occurrence count and parent chain)
//! except for the model root, which compares by identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::signature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Model = 1,
    Project,
    PackageFragmentRoot,
    PackageFragment,
    CompilationUnit,
    ClassFile,
    Type,
    Field,
    Method,
    Initializer,
    PackageDeclaration,
    ImportContainer,
    ImportDeclaration,
    TypeParameter,
    Annotation,
}

impl ElementType {
    pub fn is_openable(self) -> bool {
        matches!(
            self,
            ElementType::Model
                | ElementType::Project
                | ElementType::PackageFragmentRoot
                | ElementType::PackageFragment
                | ElementType::CompilationUnit
                | ElementType::ClassFile
        )
    }

    pub fn is_member(self) -> bool {
        matches!(
            self,
            ElementType::Type | ElementType::Field | ElementType::Method | ElementType::Initializer
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Kind {
    Model,
    Project,
    PackageFragmentRoot { archive: bool },
    PackageFragment,
    CompilationUnit,
    ClassFile,
    Type,
    Field,
    Method { parameter_types: Vec<String> },
    Initializer,
    PackageDeclaration,
    ImportContainer,
    ImportDeclaration { on_demand: bool },
    TypeParameter,
    Annotation,
}

impl Kind {
    fn element_type(&self) -> ElementType {
        match self {
            Kind::Model => ElementType::Model,
            Kind::Project => ElementType::Project,
            Kind::PackageFragmentRoot { .. } => ElementType::PackageFragmentRoot,
            Kind::PackageFragment => ElementType::PackageFragment,
            Kind::CompilationUnit => ElementType::CompilationUnit,
            Kind::ClassFile => ElementType::ClassFile,
            Kind::Type => ElementType::Type,
            Kind::Field => ElementType::Field,
            Kind::Method { .. } => ElementType::Method,
            Kind::Initializer => ElementType::Initializer,
            Kind::PackageDeclaration => ElementType::PackageDeclaration,
            Kind::ImportContainer => ElementType::ImportContainer,
            Kind::ImportDeclaration { .. } => ElementType::ImportDeclaration,
            Kind::TypeParameter => ElementType::TypeParameter,
            Kind::Annotation => ElementType::Annotation,
        }
    }
}

#[derive(Debug)]
struct ElementData {
    kind: Kind,
    name: String,
    parent: Option<JavaElement>,
    occurrence: u32,
    binary: bool,
    key: Option<String>,
}

/// The opaque semantic binding of an element; absence means unresolved.
pub trait Binding {
    fn compute_unique_key(&self) -> String;
}

#[derive(Clone)]
pub struct JavaElement(Arc<ElementData>);

pub const MODEL_NAME: &str = "";
pub const IMPORT_CONTAINER_NAME: &str = "<import container>";

impl JavaElement {
    pub fn model() -> Self {
        JavaElement(Arc::new(ElementData {
            kind: Kind::Model,
            name: MODEL_NAME.to_string(),
            parent: None,
            occurrence: 1,
            binary: false,
            key: None,
        }))
    }

    fn child(&self, kind: Kind, name: impl Into<String>) -> Self {
        let binary = self.0.binary || matches!(kind, Kind::ClassFile);
        JavaElement(Arc::new(ElementData {
            kind,
            name: name.into(),
            parent: Some(self.clone()),
            occurrence: 1,
            binary,
            key: None,
        }))
    }

    pub fn project(&self, name: &str) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::Model);
        self.child(Kind::Project, name)
    }

    /// Folder roots are named by their path; archive roots by the archive path.
    pub fn package_fragment_root(&self, path: &str, archive: bool) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::Project);
        self.child(Kind::PackageFragmentRoot { archive }, path)
    }

    pub fn package_fragment(&self, name: &str) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::PackageFragmentRoot);
        self.child(Kind::PackageFragment, name)
    }

    pub fn compilation_unit(&self, name: &str) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::PackageFragment);
        self.child(Kind::CompilationUnit, name)
    }

    pub fn class_file(&self, name: &str) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::PackageFragment);
        self.child(Kind::ClassFile, name)
    }

    pub fn type_(&self, name: &str) -> Self {
        self.child(Kind::Type, name)
    }

    pub fn field(&self, name: &str) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::Type);
        self.child(Kind::Field, name)
    }

    pub fn method(&self, name: &str, parameter_types: &[&str]) -> Self {
        self.method_with_signatures(
            name,
            parameter_types.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn method_with_signatures(&self, name: &str, parameter_types: Vec<String>) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::Type);
        self.child(Kind::Method { parameter_types }, name)
    }

    /// Initializers are identified by their 1-based position among the
    /// initializers of the declaring type.
    pub fn initializer(&self, count: u32) -> Result<Self> {
        if count < 1 {
            return Err(ModelError::IndexOutOfBounds(format!(
                "initializer occurrence count must be at least 1, got {count}"
            )));
        }
        Ok(self.child(Kind::Initializer, "").with_occurrence(count))
    }

    pub fn package_declaration(&self, name: &str) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::CompilationUnit);
        self.child(Kind::PackageDeclaration, name)
    }

    pub fn import_container(&self) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::CompilationUnit);
        self.child(Kind::ImportContainer, IMPORT_CONTAINER_NAME)
    }

    /// Accepts `a.b.C` or `a.b.*`; the trailing `.*` marks an on-demand import.
    pub fn import(&self, import_name: &str) -> Self {
        debug_assert_eq!(self.element_type(), ElementType::ImportContainer);
        match import_name.find(".*") {
            Some(index) => self.child(
                Kind::ImportDeclaration { on_demand: true },
                &import_name[..index],
            ),
            None => self.child(Kind::ImportDeclaration { on_demand: false }, import_name),
        }
    }

    pub fn annotation(&self, name: &str) -> Self {
        self.child(Kind::Annotation, name)
    }

    pub fn type_parameter(&self, name: &str) -> Self {
        self.child(Kind::TypeParameter, name)
    }

    pub fn with_occurrence(&self, occurrence: u32) -> Self {
        JavaElement(Arc::new(ElementData {
            kind: self.0.kind.clone(),
            name: self.0.name.clone(),
            parent: self.0.parent.clone(),
            occurrence: occurrence.max(1),
            binary: self.0.binary,
            key: self.0.key.clone(),
        }))
    }

    fn with_key(&self, key: Option<String>) -> Self {
        JavaElement(Arc::new(ElementData {
            kind: self.0.kind.clone(),
            name: self.0.name.clone(),
            parent: self.0.parent.clone(),
            occurrence: self.0.occurrence,
            binary: self.0.binary,
            key,
        }))
    }

    pub fn element_type(&self) -> ElementType {
        self.0.kind.element_type()
    }

    /// Raw name as stored in the handle; on-demand imports omit `.*`.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn element_name(&self) -> String {
        match &self.0.kind {
            Kind::ImportDeclaration { on_demand: true } => format!("{}.*", self.0.name),
            _ => self.0.name.clone(),
        }
    }

    pub fn parent(&self) -> Option<&JavaElement> {
        self.0.parent.as_ref()
    }

    pub fn occurrence_count(&self) -> u32 {
        self.0.occurrence
    }

    pub fn parameter_types(&self) -> &[String] {
        match &self.0.kind {
            Kind::Method { parameter_types } => parameter_types,
            _ => &[],
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self.0.kind, Kind::PackageFragmentRoot { archive: true })
    }

    pub fn is_on_demand(&self) -> bool {
        matches!(self.0.kind, Kind::ImportDeclaration { on_demand: true })
    }

    pub fn is_binary(&self) -> bool {
        self.0.binary
    }

    pub fn is_model(&self) -> bool {
        matches!(self.0.kind, Kind::Model)
    }

    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            next: self.parent(),
        }
    }

    pub fn ancestor(&self, element_type: ElementType) -> Option<JavaElement> {
        if self.element_type() == element_type {
            return Some(self.clone());
        }
        self.ancestors()
            .find(|a| a.element_type() == element_type)
            .cloned()
    }

    pub fn is_ancestor_of(&self, other: &JavaElement) -> bool {
        other.ancestors().any(|a| a == self)
    }

    pub fn model_root(&self) -> JavaElement {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current.clone()
    }

    /// Nearest enclosing element (self included) whose body is opened from a
    /// content source.
    pub fn openable(&self) -> JavaElement {
        if self.element_type().is_openable() {
            return self.clone();
        }
        self.ancestors()
            .find(|a| a.element_type().is_openable())
            .cloned()
            .unwrap_or_else(|| self.model_root())
    }

    pub fn openable_parent(&self) -> Option<JavaElement> {
        self.ancestors()
            .find(|a| a.element_type().is_openable())
            .cloned()
    }

    pub fn package_fragment_root_of(&self) -> Option<JavaElement> {
        self.ancestor(ElementType::PackageFragmentRoot)
    }

    pub fn declaring_type_of(&self) -> Option<JavaElement> {
        self.parent()
            .filter(|p| p.element_type() == ElementType::Type)
            .cloned()
    }

    /// `Outer$Inner` style name relative to the enclosing openable.
    pub fn type_qualified_name(&self, separator: char) -> String {
        match self.declaring_type_of() {
            Some(outer) => format!(
                "{}{}{}",
                outer.type_qualified_name(separator),
                separator,
                self.name()
            ),
            None => self.name().to_string(),
        }
    }

    pub fn fully_qualified_name(&self, separator: char) -> String {
        let package = self
            .ancestor(ElementType::PackageFragment)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        let qualified = self.type_qualified_name(separator);
        if package.is_empty() {
            qualified
        } else {
            format!("{package}.{qualified}")
        }
    }

    pub fn label(&self) -> String {
        let base = match &self.0.kind {
            Kind::Model => "<java model>".to_string(),
            Kind::PackageFragment if self.0.name.is_empty() => "<default>".to_string(),
            Kind::Method { parameter_types } => {
                let params: Vec<String> = parameter_types
                    .iter()
                    .map(|p| signature::to_readable(p, false))
                    .collect();
                format!("{}({})", self.0.name, params.join(", "))
            }
            Kind::Initializer => format!("<initializer #{}>", self.0.occurrence),
            Kind::PackageDeclaration => format!("package {}", self.0.name),
            Kind::ImportDeclaration { .. } => format!("import {}", self.element_name()),
            Kind::Annotation => format!("@{}", self.0.name),
            _ => self.0.name.clone(),
        };
        if self.0.occurrence > 1 && !matches!(self.0.kind, Kind::Initializer) {
            format!("{base}#{}", self.0.occurrence)
        } else {
            base
        }
    }

    /// `bar() [in Foo [in Foo.java [in p [in src [in P]]]]]`; the model root
    /// is never printed as an ancestor.
    pub fn to_string_with_ancestors(&self) -> String {
        let mut out = self.label();
        self.append_ancestors(&mut out);
        out
    }

    fn append_ancestors(&self, out: &mut String) {
        if let Some(parent) = self.parent()
            && parent.parent().is_some()
        {
            out.push_str(" [in ");
            out.push_str(&parent.label());
            parent.append_ancestors(out);
            out.push(']');
        }
    }

    pub(crate) fn same_kind_data(&self, other: &JavaElement) -> bool {
        self.0.kind == other.0.kind && self.0.binary == other.0.binary
    }

    pub(crate) fn key_field(&self) -> Option<&str> {
        self.0.key.as_deref()
    }
}

pub struct Ancestors<'a> {
    next: Option<&'a JavaElement>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a JavaElement;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

impl PartialEq for JavaElement {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.is_model() || other.is_model() {
            return false;
        }
        self.same_kind_data(other)
            && self.0.occurrence == other.0.occurrence
            && self.0.name == other.0.name
            && self.0.parent == other.0.parent
    }
}

impl Eq for JavaElement {}

impl Hash for JavaElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_model() {
            (Arc::as_ptr(&self.0) as usize).hash(state);
            return;
        }
        self.element_type().hash(state);
        self.0.name.hash(state);
        if self.0.occurrence > 1 || self.element_type() == ElementType::Initializer {
            self.0.occurrence.hash(state);
        }
        if let Some(parent) = &self.0.parent {
            parent.hash(state);
        }
    }
}

impl fmt::Debug for JavaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.element_type(), self.to_string_with_ancestors())
    }
}

impl fmt::Display for JavaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Resolved/unresolved variants of the same element. Structural equality
/// ignores the key; the key is a separate identity used for lookups.
pub trait Resolvable {
    fn is_resolved(&self) -> bool;
    fn unique_key(&self) -> Option<&str>;
    fn resolved(&self, binding: Option<&dyn Binding>) -> JavaElement;
    fn unresolved(&self) -> JavaElement;
}

impl Resolvable for JavaElement {
    fn is_resolved(&self) -> bool {
        self.0.key.is_some()
    }

    fn unique_key(&self) -> Option<&str> {
        self.key_field()
    }

    fn resolved(&self, binding: Option<&dyn Binding>) -> JavaElement {
        match binding {
            Some(binding) => self.with_key(Some(binding.compute_unique_key())),
            None => self.clone(),
        }
    }

    fn unresolved(&self) -> JavaElement {
        if self.0.key.is_none() {
            return self.clone();
        }
        self.with_key(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FixedBinding(&'static str);

    impl Binding for FixedBinding {
        fn compute_unique_key(&self) -> String {
            self.0.to_string()
        }
    }

    fn foo_type(model: &JavaElement) -> JavaElement {
        model
            .project("P")
            .package_fragment_root("src", false)
            .package_fragment("p")
            .compilation_unit("Foo.java")
            .type_("Foo")
    }

    #[test]
    fn structural_equality_and_hash() {
        let model = JavaElement::model();
        let a = foo_type(&model).method("bar", &["I", "QString;"]);
        let b = foo_type(&model).method("bar", &["I", "QString;"]);
        let c = foo_type(&model).method("bar", &["I"]);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn model_root_compares_by_identity() {
        let first = JavaElement::model();
        let second = JavaElement::model();
        assert_eq!(first, first.clone());
        assert_ne!(first, second);
        assert_ne!(first.project("P"), second.project("P"));
    }

    #[test]
    fn occurrence_count_and_kind_separate_elements() {
        let model = JavaElement::model();
        let ty = foo_type(&model);
        assert_ne!(ty.field("x"), ty.field("x").with_occurrence(2));
        assert_ne!(ty.field("x"), ty.type_("x"));
        assert!(ty.initializer(0).is_err());
        assert_eq!(ty.initializer(2).unwrap(), ty.initializer(2).unwrap());
        assert_ne!(ty.initializer(1).unwrap(), ty.initializer(2).unwrap());
    }

    #[test]
    fn resolved_variant_keeps_structural_identity() {
        let model = JavaElement::model();
        let method = foo_type(&model).method("bar", &[]).with_occurrence(3);
        let resolved = method.resolved(Some(&FixedBinding("Lp/Foo;.bar()V")));
        assert!(resolved.is_resolved());
        assert_eq!(resolved.unique_key(), Some("Lp/Foo;.bar()V"));
        assert_eq!(resolved, method);

        let back = resolved.unresolved();
        assert!(!back.is_resolved());
        assert_eq!(back.occurrence_count(), 3);
        assert!(!method.resolved(None).is_resolved());
    }

    #[test]
    fn import_container_strips_on_demand_suffix() {
        let model = JavaElement::model();
        let cu = foo_type(&model).parent().unwrap().clone();
        let container = cu.import_container();
        assert_eq!(container.name(), "<import container>");
        let import = container.import("java.util.*");
        assert!(import.is_on_demand());
        assert_eq!(import.name(), "java.util");
        assert_eq!(import.element_name(), "java.util.*");
        assert_ne!(import, container.import("java.util"));
    }

    #[test]
    fn labels_and_ancestor_rendering() {
        let model = JavaElement::model();
        let ty = foo_type(&model);
        let method = ty.method("bar", &["I", "Ljava.lang.String;"]);
        assert_eq!(
            method.to_string_with_ancestors(),
            "bar(int, String) [in Foo [in Foo.java [in p [in src [in P]]]]]"
        );
        let cu = ty.parent().unwrap();
        assert_eq!(cu.package_declaration("p").label(), "package p");
        assert_eq!(ty.initializer(2).unwrap().label(), "<initializer #2>");
        assert_eq!(ty.field("x").with_occurrence(2).label(), "x#2");
    }

    #[test]
    fn ancestors_and_openables() {
        let model = JavaElement::model();
        let ty = foo_type(&model);
        let field = ty.type_("Inner").field("x");
        assert_eq!(field.openable().element_type(), ElementType::CompilationUnit);
        let inner = field.parent().unwrap();
        assert_eq!(inner.type_qualified_name('$'), "Foo$Inner");
        assert_eq!(inner.fully_qualified_name('.'), "p.Foo.Inner");
        assert!(ty.is_ancestor_of(&field));
        assert!(!field.is_ancestor_of(&ty));
        assert_eq!(
            field.ancestor(ElementType::Project).unwrap(),
            model.project("P")
        );
    }

    #[test]
    fn binary_elements_are_distinct_from_source() {
        let model = JavaElement::model();
        let pkg = model
            .project("P")
            .package_fragment_root("lib.jar", true)
            .package_fragment("p");
        let binary = pkg.class_file("Foo.class").type_("Foo");
        assert!(binary.is_binary());
        assert!(binary.field("x").is_binary());
        assert!(!pkg.compilation_unit("Foo.java").type_("Foo").is_binary());
    }
}
