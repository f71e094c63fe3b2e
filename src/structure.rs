//! Building element bodies for openables.
//!
//! Source units are parsed with tree-sitter and walked declaration by
//! declaration; class files are read with [`crate::classfile`]. Either way the
//! result is a flat list of `(handle, body)` pairs with the openable first,
//! ready to be inserted into the cache in one step. Source and name ranges
//! are byte offsets into the unit's text.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use tracing::trace;
use tree_sitter::{Node, Parser};

use crate::classfile::{self, ClassFile};
use crate::element::{ElementType, JavaElement};
use crate::error::{ModelError, Result};
use crate::info::{
    AnnotationInfo, ElementInfo, FieldDetail, InfoDetail, MemberValuePair, MethodDetail,
    OpenableDetail, SourceRange, TypeDetail, TypeParameterInfo,
};
use crate::javadoc::{CommentParser, IgnoreProblems, Javadoc, ParserKind, ParserOptions};
use crate::modifiers::Modifiers;
use crate::signature::{create_type_signature, field_descriptor_to_signature, parse_method_descriptor};

pub type Bodies = Vec<(JavaElement, ElementInfo)>;

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Bodies of a compilation unit and everything declared in it.
///
/// Syntax errors do not fail the build: the unit's structure is then marked
/// unknown and whatever tree-sitter recovered is kept.
pub fn build_compilation_unit(unit: &JavaElement, source: &str) -> Result<Bodies> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| ModelError::invalid_contents(unit.to_string_with_ancestors(), e.to_string()))?;
    let tree = parser.parse(source, None).ok_or_else(|| {
        ModelError::invalid_contents(unit.to_string_with_ancestors(), "parser produced no tree")
    })?;
    let root = tree.root_node();

    let mut builder = SourceBuilder::new(source);
    let mut children = Vec::new();
    let mut imports: Vec<JavaElement> = Vec::new();
    let mut import_range: Option<SourceRange> = None;
    let container = unit.import_container();
    let mut doc: Option<Node> = None;

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        let kind = child.kind();
        if kind == "block_comment" {
            doc = is_doc_comment(&child, source.as_bytes()).then_some(child);
            continue;
        }
        if kind == "line_comment" {
            continue;
        }
        match kind {
            "package_declaration" => {
                if let Some(name) = first_named_text(&child, source.as_bytes(), &["scoped_identifier", "identifier"]) {
                    let handle = unit.package_declaration(name);
                    builder.push(
                        handle.clone(),
                        ElementInfo::new(InfoDetail::PackageDeclaration)
                            .with_ranges(Some(range(&child)), None)
                            .known(),
                    );
                    children.push(handle);
                }
            }
            "import_declaration" => {
                if let Some((name, modifiers)) = import_name(&child, source.as_bytes()) {
                    if imports.is_empty() {
                        children.push(container.clone());
                    }
                    let handle = builder.unique(container.import(&name));
                    builder.push(
                        handle.clone(),
                        ElementInfo::new(InfoDetail::Import { modifiers })
                            .with_ranges(Some(range(&child)), None)
                            .known(),
                    );
                    imports.push(handle);
                    let current = range(&child);
                    import_range = Some(match import_range {
                        Some(first) => SourceRange::new(first.offset, current.end() - first.offset),
                        None => current,
                    });
                }
            }
            k if TYPE_DECLARATIONS.contains(&k) => {
                let (handle, _) = builder.build_type(unit, child, doc);
                children.push(handle);
            }
            _ => {}
        }
        doc = None;
    }

    if !imports.is_empty() {
        builder.push(
            container,
            ElementInfo::new(InfoDetail::ImportContainer)
                .with_children(imports)
                .with_ranges(import_range, None)
                .known(),
        );
    }

    let unit_info = ElementInfo::new(InfoDetail::Openable(OpenableDetail {
        content_hash: Some(content_hash(source.as_bytes())),
        source_length: source.len(),
    }))
    .with_children(children)
    .with_ranges(Some(SourceRange::new(0, source.len())), None);
    unit_info.set_structure_known(!root.has_error());

    let mut bodies = builder.bodies;
    bodies.insert(0, (unit.clone(), unit_info));
    trace!(target: "jmodel.model", unit = %unit, elements = bodies.len(), "source structure built");
    Ok(bodies)
}

struct SourceBuilder<'s> {
    source: &'s str,
    seen: HashSet<JavaElement>,
    bodies: Bodies,
}

#[derive(Default)]
struct Members {
    children: Vec<JavaElement>,
    categories: BTreeMap<String, Vec<String>>,
    initializers: u32,
}

impl<'s> SourceBuilder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            seen: HashSet::new(),
            bodies: Vec::new(),
        }
    }

    fn bytes(&self) -> &'s [u8] {
        self.source.as_bytes()
    }

    fn text(&self, node: &Node) -> &'s str {
        node_text(node, self.bytes())
    }

    fn push(&mut self, handle: JavaElement, info: ElementInfo) {
        self.bodies.push((handle, info));
    }

    /// Bumps the occurrence count until the handle is new in this unit.
    fn unique(&mut self, handle: JavaElement) -> JavaElement {
        let mut candidate = handle;
        while self.seen.contains(&candidate) {
            candidate = candidate.with_occurrence(candidate.occurrence_count() + 1);
        }
        self.seen.insert(candidate.clone());
        candidate
    }

    fn javadoc(&self, comment: Option<Node>) -> Option<Javadoc> {
        let comment = comment?;
        let chars: Vec<char> = self.text(&comment).chars().collect();
        if chars.len() < 5 {
            return None;
        }
        let options = ParserOptions {
            kind: ParserKind::Source,
            store_text: false,
            report_problems: false,
        };
        let mut parser = CommentParser::new(&chars, IgnoreProblems, options);
        Some(parser.parse_comment(0, chars.len() - 1))
    }

    fn build_type(&mut self, parent: &JavaElement, node: Node, doc: Option<Node>) -> (JavaElement, Vec<String>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(&n))
            .unwrap_or_default();
        let handle = self.unique(parent.type_(name));
        let javadoc = self.javadoc(doc);

        let (mut modifiers, annotations) = self.modifiers(&node);
        let annotations = self.annotate(&handle, &annotations);
        modifiers |= match node.kind() {
            "interface_declaration" => Modifiers::INTERFACE,
            "enum_declaration" => Modifiers::ENUM,
            "annotation_type_declaration" => Modifiers::ANNOTATION | Modifiers::INTERFACE,
            "record_declaration" => Modifiers::RECORD,
            _ => Modifiers::empty(),
        };
        if javadoc.as_ref().is_some_and(|d| d.deprecated) {
            modifiers |= Modifiers::DEPRECATED;
        }

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|s| s.named_child(0))
            .map(|t| normalize_whitespace(self.text(&t)));
        let interfaces = self.super_interfaces(&node);
        let type_parameters = self.type_parameters(&node, &handle);

        let categories = javadoc.map(|d| d.categories).unwrap_or_default();
        let mut members = Members::default();
        // a top-level type has no enclosing type to hold its categories
        if parent.element_type() == ElementType::CompilationUnit && !categories.is_empty() {
            members.categories.insert(handle.handle_memento(), categories.clone());
        }
        if node.kind() == "record_declaration"
            && let Some(parameters) = node.child_by_field_name("parameters")
        {
            self.record_components(&handle, parameters, &mut members);
        }
        if let Some(body) = find_body(&node) {
            self.collect_members(&handle, body, &mut members);
        }

        let detail = TypeDetail {
            modifiers,
            superclass,
            interfaces,
            type_parameters,
            categories: members.categories,
            annotations,
        };
        let info = ElementInfo::new(InfoDetail::Type(detail))
            .with_children(members.children)
            .with_ranges(Some(range(&node)), name_range(&node))
            .known();
        self.push(handle.clone(), info);
        (handle, categories)
    }

    fn collect_members(&mut self, ty: &JavaElement, body: Node, members: &mut Members) {
        let mut doc: Option<Node> = None;
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            match child.kind() {
                "block_comment" => {
                    doc = is_doc_comment(&child, self.bytes()).then_some(child);
                    continue;
                }
                "line_comment" => continue,
                "enum_body_declarations" => self.collect_members(ty, child, members),
                "field_declaration" | "constant_declaration" => {
                    let javadoc = self.javadoc(doc);
                    for handle in self.build_fields(ty, child, javadoc.as_ref()) {
                        record_categories(members, &handle, javadoc.as_ref());
                        members.children.push(handle);
                    }
                }
                "enum_constant" => {
                    let javadoc = self.javadoc(doc);
                    let handle = self.build_enum_constant(ty, child, javadoc.as_ref());
                    record_categories(members, &handle, javadoc.as_ref());
                    members.children.push(handle);
                }
                "method_declaration" | "constructor_declaration" | "annotation_type_element_declaration" => {
                    let javadoc = self.javadoc(doc);
                    let handle = self.build_method(ty, child, javadoc.as_ref());
                    record_categories(members, &handle, javadoc.as_ref());
                    members.children.push(handle);
                }
                "static_initializer" | "block" => {
                    members.initializers += 1;
                    let Ok(handle) = ty.initializer(members.initializers) else {
                        continue;
                    };
                    let modifiers = if child.kind() == "static_initializer" {
                        Modifiers::STATIC
                    } else {
                        Modifiers::empty()
                    };
                    self.seen.insert(handle.clone());
                    self.push(
                        handle.clone(),
                        ElementInfo::new(InfoDetail::Initializer { modifiers })
                            .with_ranges(Some(range(&child)), None)
                            .known(),
                    );
                    members.children.push(handle);
                }
                k if TYPE_DECLARATIONS.contains(&k) => {
                    let (handle, categories) = self.build_type(ty, child, doc);
                    if !categories.is_empty() {
                        members.categories.insert(handle.handle_memento(), categories);
                    }
                    members.children.push(handle);
                }
                _ => {}
            }
            doc = None;
        }
    }

    fn build_fields(&mut self, ty: &JavaElement, node: Node, javadoc: Option<&Javadoc>) -> Vec<JavaElement> {
        let type_text = node
            .child_by_field_name("type")
            .map(|t| normalize_whitespace(self.text(&t)))
            .unwrap_or_default();
        let (mut modifiers, annotations) = self.modifiers(&node);
        if javadoc.is_some_and(|d| d.deprecated) {
            modifiers |= Modifiers::DEPRECATED;
        }

        // every declarator gets its own annotation bodies
        let mut handles = Vec::new();
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();
        for declarator in declarators {
            let Some(name) = declarator.child_by_field_name("name").map(|n| self.text(&n)) else {
                continue;
            };
            let dims = declarator
                .child_by_field_name("dimensions")
                .map(|d| self.text(&d).split_whitespace().collect::<String>())
                .unwrap_or_default();
            let constant = if modifiers.contains(Modifiers::FINAL) {
                declarator
                    .child_by_field_name("value")
                    .map(|v| normalize_whitespace(self.text(&v)))
            } else {
                None
            };
            let handle = self.unique(ty.field(name));
            let annotations = self.annotate(&handle, &annotations);
            let detail = FieldDetail {
                modifiers,
                type_name: format!("{type_text}{dims}"),
                constant,
                annotations,
            };
            self.push(
                handle.clone(),
                ElementInfo::new(InfoDetail::Field(detail))
                    .with_ranges(Some(range(&node)), name_range(&declarator))
                    .known(),
            );
            handles.push(handle);
        }
        handles
    }

    fn build_enum_constant(&mut self, ty: &JavaElement, node: Node, javadoc: Option<&Javadoc>) -> JavaElement {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(&n))
            .unwrap_or_default();
        let handle = self.unique(ty.field(name));
        let (mut modifiers, annotations) = self.modifiers(&node);
        let annotations = self.annotate(&handle, &annotations);
        modifiers |= Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL | Modifiers::ENUM;
        if javadoc.is_some_and(|d| d.deprecated) {
            modifiers |= Modifiers::DEPRECATED;
        }
        let detail = FieldDetail {
            modifiers,
            type_name: ty.name().to_string(),
            constant: None,
            annotations,
        };
        self.push(
            handle.clone(),
            ElementInfo::new(InfoDetail::Field(detail))
                .with_ranges(Some(range(&node)), name_range(&node))
                .known(),
        );
        handle
    }

    fn record_components(&mut self, ty: &JavaElement, parameters: Node, members: &mut Members) {
        let mut cursor = parameters.walk();
        for parameter in parameters.named_children(&mut cursor) {
            let Some((type_text, name)) = self.parameter(&parameter) else {
                continue;
            };
            let handle = self.unique(ty.field(&name));
            let (_, annotations) = self.modifiers(&parameter);
            let annotations = self.annotate(&handle, &annotations);
            let detail = FieldDetail {
                modifiers: Modifiers::PRIVATE | Modifiers::FINAL,
                type_name: type_text,
                constant: None,
                annotations,
            };
            self.push(
                handle.clone(),
                ElementInfo::new(InfoDetail::Field(detail))
                    .with_ranges(Some(range(&parameter)), name_range(&parameter))
                    .known(),
            );
            members.children.push(handle);
        }
    }

    fn build_method(&mut self, ty: &JavaElement, node: Node, javadoc: Option<&Javadoc>) -> JavaElement {
        let constructor = node.kind() == "constructor_declaration";
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(&n))
            .unwrap_or_default();

        let mut parameter_names = Vec::new();
        let mut parameter_types = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for parameter in parameters.named_children(&mut cursor) {
                if let Some((type_text, name)) = self.parameter(&parameter) {
                    parameter_types.push(type_text);
                    parameter_names.push(name);
                }
            }
        }
        let signatures = parameter_types.iter().map(|t| create_type_signature(t)).collect();
        let handle = self.unique(ty.method_with_signatures(name, signatures));

        let (mut modifiers, annotations) = self.modifiers(&node);
        let annotations = self.annotate(&handle, &annotations);
        if javadoc.is_some_and(|d| d.deprecated) {
            modifiers |= Modifiers::DEPRECATED;
        }
        let return_type = if constructor {
            None
        } else {
            let base = node
                .child_by_field_name("type")
                .map(|t| normalize_whitespace(self.text(&t)))
                .unwrap_or_default();
            let dims = node
                .child_by_field_name("dimensions")
                .map(|d| self.text(&d).split_whitespace().collect::<String>())
                .unwrap_or_default();
            Some(format!("{base}{dims}"))
        };

        let mut exceptions = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "throws" {
                let mut inner = child.walk();
                for exception in child.named_children(&mut inner) {
                    exceptions.push(normalize_whitespace(self.text(&exception)));
                }
            }
        }
        let type_parameters = self.type_parameters(&node, &handle);

        let detail = MethodDetail {
            modifiers,
            return_type,
            parameter_names,
            parameter_types,
            exceptions,
            type_parameters,
            annotations,
        };
        self.push(
            handle.clone(),
            ElementInfo::new(InfoDetail::Method(detail))
                .with_ranges(Some(range(&node)), name_range(&node))
                .known(),
        );
        handle
    }

    /// Type text and name of a formal, spread or record parameter.
    fn parameter(&self, parameter: &Node) -> Option<(String, String)> {
        match parameter.kind() {
            "formal_parameter" => {
                let type_text = normalize_whitespace(self.text(&parameter.child_by_field_name("type")?));
                let name = self.text(&parameter.child_by_field_name("name")?).to_string();
                let dims = parameter
                    .child_by_field_name("dimensions")
                    .map(|d| self.text(&d).split_whitespace().collect::<String>())
                    .unwrap_or_default();
                Some((format!("{type_text}{dims}"), name))
            }
            "spread_parameter" => {
                let mut cursor = parameter.walk();
                let mut type_text = None;
                let mut name = None;
                for child in parameter.named_children(&mut cursor) {
                    match child.kind() {
                        "modifiers" => {}
                        "variable_declarator" => {
                            name = child
                                .child_by_field_name("name")
                                .map(|n| self.text(&n).to_string());
                        }
                        _ if type_text.is_none() => {
                            type_text = Some(normalize_whitespace(self.text(&child)));
                        }
                        _ => {}
                    }
                }
                Some((format!("{}...", type_text?), name?))
            }
            _ => None,
        }
    }

    fn super_interfaces(&self, node: &Node) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                let mut inner = child.walk();
                for list in child.named_children(&mut inner) {
                    if list.kind() == "type_list" {
                        let mut types = list.walk();
                        for ty in list.named_children(&mut types) {
                            out.push(normalize_whitespace(self.text(&ty)));
                        }
                    }
                }
            }
        }
        out
    }

    fn type_parameters(&mut self, node: &Node, owner: &JavaElement) -> Vec<TypeParameterInfo> {
        let Some(list) = node.child_by_field_name("type_parameters").or_else(|| {
            let mut cursor = node.walk();
            node.children(&mut cursor).find(|c| c.kind() == "type_parameters")
        }) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut cursor = list.walk();
        for parameter in list.named_children(&mut cursor) {
            if parameter.kind() != "type_parameter" {
                continue;
            }
            let mut name = None;
            let mut bounds = Vec::new();
            let mut inner = parameter.walk();
            for child in parameter.named_children(&mut inner) {
                match child.kind() {
                    "type_identifier" | "identifier" if name.is_none() => {
                        name = Some(self.text(&child).to_string());
                    }
                    "type_bound" => {
                        let mut types = child.walk();
                        for bound in child.named_children(&mut types) {
                            bounds.push(normalize_whitespace(self.text(&bound)));
                        }
                    }
                    _ => {}
                }
            }
            let Some(name) = name else { continue };
            let info = TypeParameterInfo { name, bounds };
            self.push(
                owner.type_parameter(&info.name),
                ElementInfo::new(InfoDetail::TypeParameter(info.clone()))
                    .with_ranges(Some(range(&parameter)), None)
                    .known(),
            );
            out.push(info);
        }
        out
    }

    /// Keyword modifiers and annotations from the declaration's `modifiers`
    /// node.
    fn modifiers(&self, node: &Node) -> (Modifiers, Vec<(AnnotationInfo, SourceRange)>) {
        let mut modifiers = Modifiers::empty();
        let mut annotations: Vec<(AnnotationInfo, SourceRange)> = Vec::new();
        let mut cursor = node.walk();
        let Some(list) = node.children(&mut cursor).find(|c| c.kind() == "modifiers") else {
            return (modifiers, annotations);
        };

        let mut inner = list.walk();
        for child in list.children(&mut inner) {
            match child.kind() {
                "marker_annotation" | "annotation" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(&n).to_string())
                        .unwrap_or_default();
                    let occurrence =
                        1 + annotations.iter().filter(|(a, _)| a.name == name).count() as u32;
                    let members = child
                        .child_by_field_name("arguments")
                        .map(|args| self.member_value_pairs(&args))
                        .unwrap_or_default();
                    let info = AnnotationInfo {
                        name,
                        occurrence,
                        members,
                    };
                    annotations.push((info, range(&child)));
                }
                keyword => {
                    if let Some(flag) = Modifiers::from_keyword(keyword) {
                        modifiers |= flag;
                    }
                }
            }
        }
        (modifiers, annotations)
    }

    /// Records annotation bodies under `owner`.
    fn annotate(&mut self, owner: &JavaElement, annotations: &[(AnnotationInfo, SourceRange)]) -> Vec<AnnotationInfo> {
        annotations
            .iter()
            .map(|(info, source_range)| {
                self.push(
                    info.handle(owner),
                    ElementInfo::new(InfoDetail::Annotation(info.clone()))
                        .with_ranges(Some(*source_range), None)
                        .known(),
                );
                info.clone()
            })
            .collect()
    }

    fn member_value_pairs(&self, arguments: &Node) -> Vec<MemberValuePair> {
        let mut pairs = Vec::new();
        let mut cursor = arguments.walk();
        for argument in arguments.named_children(&mut cursor) {
            if argument.kind() == "element_value_pair" {
                let name = argument.child_by_field_name("key").map(|k| self.text(&k));
                let value = argument.child_by_field_name("value").map(|v| self.text(&v));
                if let (Some(name), Some(value)) = (name, value) {
                    pairs.push(MemberValuePair {
                        name: name.to_string(),
                        value: normalize_whitespace(value),
                    });
                }
            } else if !matches!(argument.kind(), "line_comment" | "block_comment") {
                pairs.push(MemberValuePair {
                    name: "value".to_string(),
                    value: normalize_whitespace(self.text(&argument)),
                });
            }
        }
        pairs
    }
}

fn record_categories(members: &mut Members, handle: &JavaElement, javadoc: Option<&Javadoc>) {
    if let Some(doc) = javadoc
        && !doc.categories.is_empty()
    {
        members.categories.insert(handle.handle_memento(), doc.categories.clone());
    }
}

/// Bodies of a class file: the openable and its single top-level type with
/// fields and methods. Synthetic members and the class initializer are
/// skipped; constructors are named after the type.
pub fn build_class_file(class_file: &JavaElement, bytes: &[u8]) -> Result<Bodies> {
    let parsed = ClassFile::parse(bytes)?;
    let type_name = parsed.simple_name().to_string();
    let ty = class_file.type_(&type_name);
    let mut bodies = Vec::new();
    let mut children = Vec::new();

    for field in &parsed.fields {
        if field.access_flags & 0x1000 != 0 {
            continue;
        }
        let handle = ty.field(&field.name);
        let detail = FieldDetail {
            modifiers: classfile::field_modifiers(field.access_flags, field.deprecated),
            type_name: field_descriptor_to_signature(&field.descriptor),
            constant: field.constant.clone(),
            annotations: Vec::new(),
        };
        bodies.push((handle.clone(), ElementInfo::new(InfoDetail::Field(detail)).known()));
        children.push(handle);
    }

    for method in &parsed.methods {
        if method.access_flags & 0x1000 != 0 || method.is_class_initializer() {
            continue;
        }
        let Some((parameter_types, return_type)) = parse_method_descriptor(&method.descriptor) else {
            return Err(ModelError::invalid_contents(
                class_file.to_string_with_ancestors(),
                format!("malformed method descriptor {}", method.descriptor),
            ));
        };
        let name = if method.is_constructor() {
            type_name.as_str()
        } else {
            method.name.as_str()
        };
        let handle = ty.method_with_signatures(name, parameter_types.clone());
        let detail = MethodDetail {
            modifiers: classfile::method_modifiers(method.access_flags, method.deprecated),
            return_type: (!method.is_constructor()).then_some(return_type),
            parameter_names: (0..parameter_types.len()).map(|i| format!("arg{i}")).collect(),
            parameter_types,
            exceptions: method.exceptions.iter().map(|e| classfile::internal_to_dotted(e)).collect(),
            type_parameters: Vec::new(),
            annotations: Vec::new(),
        };
        bodies.push((handle.clone(), ElementInfo::new(InfoDetail::Method(detail)).known()));
        children.push(handle);
    }

    let detail = TypeDetail {
        modifiers: classfile::type_modifiers(parsed.access_flags, parsed.deprecated),
        superclass: parsed.super_class.as_deref().map(classfile::internal_to_dotted),
        interfaces: parsed.interfaces.iter().map(|i| classfile::internal_to_dotted(i)).collect(),
        ..TypeDetail::default()
    };
    bodies.insert(
        0,
        (ty.clone(), ElementInfo::new(InfoDetail::Type(detail)).with_children(children).known()),
    );
    bodies.insert(
        0,
        (
            class_file.clone(),
            ElementInfo::new(InfoDetail::Openable(OpenableDetail {
                content_hash: Some(content_hash(bytes)),
                source_length: 0,
            }))
            .with_children(vec![ty])
            .known(),
        ),
    );
    Ok(bodies)
}

fn find_body<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "class_body" | "interface_body" | "enum_body" | "annotation_type_body" => {
                return Some(child);
            }
            _ => {}
        }
    }
    None
}

fn import_name(node: &Node, source: &[u8]) -> Option<(String, Modifiers)> {
    let mut path = String::new();
    let mut modifiers = Modifiers::empty();
    let mut on_demand = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "static" => modifiers |= Modifiers::STATIC,
            "scoped_identifier" | "identifier" => {
                path = node_text(&child, source).to_string();
            }
            "asterisk" => on_demand = true,
            _ => {}
        }
    }

    if path.is_empty() {
        return None;
    }
    if on_demand {
        path.push_str(".*");
    }
    Some((path, modifiers))
}

fn first_named_text<'a>(node: &Node, source: &'a [u8], kinds: &[&str]) -> Option<&'a str> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| kinds.contains(&c.kind()));
    found.map(|c| node_text(&c, source))
}

fn is_doc_comment(node: &Node, source: &[u8]) -> bool {
    let text = node_text(node, source);
    text.starts_with("/**") && text != "/**/"
}

fn range(node: &Node) -> SourceRange {
    SourceRange::new(node.start_byte(), node.end_byte() - node.start_byte())
}

fn name_range(node: &Node) -> Option<SourceRange> {
    node.child_by_field_name("name").map(|n| range(&n))
}

fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
