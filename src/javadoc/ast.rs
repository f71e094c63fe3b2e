//! Parsed comment structure.
//!
//! All positions are character offsets into the source buffer the comment
//! was parsed from; span ends are inclusive.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagValue {
    None,
    Param,
    Return,
    Throws,
    See,
    Link,
    Value,
    Deprecated,
    InheritDoc,
    Category,
    Other,
}

/// A simple or qualified type name as written in a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRef {
    pub tokens: Vec<String>,
    pub positions: Vec<Span>,
    pub primitive: bool,
}

impl TypeRef {
    pub fn qualified_name(&self) -> String {
        self.tokens.join(".")
    }

    pub fn span(&self) -> Span {
        match (self.positions.first(), self.positions.last()) {
            (Some(first), Some(last)) => Span::new(first.start, last.end),
            _ => Span::new(0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentRef {
    pub type_ref: TypeRef,
    pub dimensions: usize,
    pub varargs: bool,
    pub dim_positions: Vec<Span>,
    pub name: String,
    pub name_position: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reference {
    Type(TypeRef),
    Field {
        /// `None` when the member is written as `#name` and implicitly
        /// refers to the enclosing type.
        receiver: Option<TypeRef>,
        name: String,
        position: Span,
    },
    Method {
        receiver: Option<TypeRef>,
        name: String,
        position: Span,
        /// `None` for `#m()` without any argument list content.
        arguments: Option<Vec<ArgumentRef>>,
    },
}

impl Reference {
    pub fn label(&self) -> String {
        let receiver = |r: &Option<TypeRef>| {
            r.as_ref().map(TypeRef::qualified_name).unwrap_or_default()
        };
        match self {
            Reference::Type(t) => t.qualified_name(),
            Reference::Field { receiver: r, name, .. } => format!("{}#{name}", receiver(r)),
            Reference::Method {
                receiver: r,
                name,
                arguments,
                ..
            } => {
                let args = arguments
                    .iter()
                    .flatten()
                    .map(|a| {
                        let mut s = a.type_ref.qualified_name();
                        for _ in 0..a.dimensions {
                            s.push_str(if a.varargs { "..." } else { "[]" });
                        }
                        s
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{}#{name}({args})", receiver(r))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeeRef {
    pub tag: TagValue,
    pub reference: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamRef {
    pub name: String,
    pub position: Span,
    pub type_parameter: bool,
}

/// Any tag encountered, valid or not, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagElement {
    pub name: String,
    pub span: Span,
    pub inline: bool,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Javadoc {
    pub start: usize,
    pub end: usize,
    pub valid: bool,
    pub deprecated: bool,
    pub inherit_doc: Option<Span>,
    pub return_tag: Option<Span>,
    pub params: Vec<ParamRef>,
    pub type_params: Vec<ParamRef>,
    pub throws: Vec<TypeRef>,
    pub references: Vec<SeeRef>,
    pub categories: Vec<String>,
    pub tags: Vec<TagElement>,
    pub problem_count: usize,
    /// Text fragments between tags; only filled when text storage is on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<Span>,
}

impl Javadoc {
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }
}
