//! Handle memento strings.
//!
//! A memento is the parent's memento followed by one delimiter character for
//! the element kind and the escaped element name. Any delimiter character
//! occurring inside a name is preceded by [`ESCAPE`]. The format must stay
//! byte-for-byte stable since mementos are persisted by clients.

use crate::element::{ElementType, JavaElement};
use crate::error::{ModelError, Result};

pub const ESCAPE: char = '\\';
pub const JAVAPROJECT: char = '=';
pub const PACKAGEFRAGMENTROOT: char = '/';
pub const PACKAGEFRAGMENT: char = '<';
pub const FIELD: char = '^';
pub const METHOD: char = '~';
pub const INITIALIZER: char = '|';
pub const COMPILATIONUNIT: char = '{';
pub const CLASSFILE: char = '(';
pub const TYPE: char = '[';
pub const PACKAGEDECLARATION: char = '%';
pub const IMPORTDECLARATION: char = '#';
pub const COUNT: char = '!';
pub const LOCALVARIABLE: char = '@';
pub const TYPE_PARAMETER: char = ']';
pub const ANNOTATION: char = '}';
pub const LAMBDA_EXPRESSION: char = ')';
pub const LAMBDA_METHOD: char = '&';
pub const STRING: char = '"';

const DELIMITERS: [char; 19] = [
    ESCAPE,
    JAVAPROJECT,
    PACKAGEFRAGMENTROOT,
    PACKAGEFRAGMENT,
    FIELD,
    METHOD,
    INITIALIZER,
    COMPILATIONUNIT,
    CLASSFILE,
    TYPE,
    PACKAGEDECLARATION,
    IMPORTDECLARATION,
    COUNT,
    LOCALVARIABLE,
    TYPE_PARAMETER,
    ANNOTATION,
    LAMBDA_EXPRESSION,
    LAMBDA_METHOD,
    STRING,
];

pub fn is_delimiter(c: char) -> bool {
    DELIMITERS.contains(&c)
}

pub fn escape_memento_name(out: &mut String, name: &str) {
    for c in name.chars() {
        if is_delimiter(c) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

fn delimiter_for(element_type: ElementType) -> Option<char> {
    Some(match element_type {
        ElementType::Model | ElementType::ImportContainer => return None,
        ElementType::Project => JAVAPROJECT,
        ElementType::PackageFragmentRoot => PACKAGEFRAGMENTROOT,
        ElementType::PackageFragment => PACKAGEFRAGMENT,
        ElementType::CompilationUnit => COMPILATIONUNIT,
        ElementType::ClassFile => CLASSFILE,
        ElementType::Type => TYPE,
        ElementType::Field => FIELD,
        ElementType::Method => METHOD,
        ElementType::Initializer => INITIALIZER,
        ElementType::PackageDeclaration => PACKAGEDECLARATION,
        ElementType::ImportDeclaration => IMPORTDECLARATION,
        ElementType::TypeParameter => TYPE_PARAMETER,
        ElementType::Annotation => ANNOTATION,
    })
}

impl JavaElement {
    pub fn handle_memento(&self) -> String {
        let mut out = String::new();
        self.append_memento(&mut out);
        out
    }

    fn append_memento(&self, out: &mut String) {
        if let Some(parent) = self.parent() {
            parent.append_memento(out);
        }
        let Some(delimiter) = delimiter_for(self.element_type()) else {
            return;
        };
        out.push(delimiter);
        match self.element_type() {
            ElementType::Initializer => {
                out.push_str(&self.occurrence_count().to_string());
                return;
            }
            ElementType::ImportDeclaration => escape_memento_name(out, &self.element_name()),
            _ => escape_memento_name(out, self.name()),
        }
        if self.element_type() == ElementType::Method {
            for param in self.parameter_types() {
                out.push(METHOD);
                escape_memento_name(out, param);
            }
        }
        if self.occurrence_count() > 1 {
            out.push(COUNT);
            out.push_str(&self.occurrence_count().to_string());
        }
    }

    /// Rebuilds a handle below `model` from a memento string.
    pub fn from_memento(model: &JavaElement, memento: &str) -> Result<JavaElement> {
        let tokens = tokenize(memento);
        let mut cursor = Tokens {
            tokens: &tokens,
            pos: 0,
        };
        let mut current = model.clone();
        while let Some(token) = cursor.next() {
            let &Token::Delimiter(delimiter) = token else {
                return Err(invalid(memento, "expected a delimiter"));
            };
            current = match delimiter {
                JAVAPROJECT => expect_kind(memento, &current, ElementType::Model)
                    .map(|_| current.project(&cursor.name()))?,
                PACKAGEFRAGMENTROOT => {
                    expect_kind(memento, &current, ElementType::Project)?;
                    let path = cursor.name();
                    let archive = is_archive_path(&path);
                    current.package_fragment_root(&path, archive)
                }
                PACKAGEFRAGMENT => expect_kind(memento, &current, ElementType::PackageFragmentRoot)
                    .map(|_| current.package_fragment(&cursor.name()))?,
                COMPILATIONUNIT => expect_kind(memento, &current, ElementType::PackageFragment)
                    .map(|_| current.compilation_unit(&cursor.name()))?,
                CLASSFILE => expect_kind(memento, &current, ElementType::PackageFragment)
                    .map(|_| current.class_file(&cursor.name()))?,
                TYPE => {
                    expect_container(memento, &current)?;
                    current.type_(&cursor.name())
                }
                FIELD => expect_kind(memento, &current, ElementType::Type)
                    .map(|_| current.field(&cursor.name()))?,
                METHOD => {
                    expect_kind(memento, &current, ElementType::Type)?;
                    let name = cursor.name();
                    let mut params = Vec::new();
                    while cursor.peek() == Some(&Token::Delimiter(METHOD)) {
                        cursor.next();
                        params.push(cursor.name());
                    }
                    current.method_with_signatures(&name, params)
                }
                INITIALIZER => {
                    expect_kind(memento, &current, ElementType::Type)?;
                    let count = cursor
                        .name()
                        .parse::<u32>()
                        .map_err(|_| invalid(memento, "initializer count is not a number"))?;
                    current.initializer(count)?
                }
                PACKAGEDECLARATION => expect_kind(memento, &current, ElementType::CompilationUnit)
                    .map(|_| current.package_declaration(&cursor.name()))?,
                IMPORTDECLARATION => {
                    expect_kind(memento, &current, ElementType::CompilationUnit)?;
                    current.import_container().import(&cursor.name())
                }
                TYPE_PARAMETER => current.type_parameter(&cursor.name()),
                ANNOTATION => current.annotation(&cursor.name()),
                COUNT => {
                    let count = cursor
                        .name()
                        .parse::<u32>()
                        .map_err(|_| invalid(memento, "occurrence count is not a number"))?;
                    current.with_occurrence(count)
                }
                other => {
                    return Err(invalid(
                        memento,
                        &format!("unsupported delimiter {other:?}"),
                    ));
                }
            };
        }
        Ok(current)
    }
}

fn is_archive_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".jar") || lower.ends_with(".zip")
}

fn invalid(memento: &str, message: &str) -> ModelError {
    ModelError::InvalidMemento {
        memento: memento.to_string(),
        message: message.to_string(),
    }
}

fn expect_kind(memento: &str, current: &JavaElement, expected: ElementType) -> Result<()> {
    if current.element_type() == expected {
        Ok(())
    } else {
        Err(invalid(
            memento,
            &format!(
                "expected a {expected:?} parent, found {:?}",
                current.element_type()
            ),
        ))
    }
}

fn expect_container(memento: &str, current: &JavaElement) -> Result<()> {
    match current.element_type() {
        ElementType::CompilationUnit
        | ElementType::ClassFile
        | ElementType::Type
        | ElementType::Method
        | ElementType::Field
        | ElementType::Initializer => Ok(()),
        other => Err(invalid(
            memento,
            &format!("a type cannot be declared in {other:?}"),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Delimiter(char),
    Name(String),
}

fn tokenize(memento: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut name = String::new();
    let mut chars = memento.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            if let Some(escaped) = chars.next() {
                name.push(escaped);
            }
            continue;
        }
        if is_delimiter(c) {
            if !name.is_empty() {
                tokens.push(Token::Name(std::mem::take(&mut name)));
            }
            tokens.push(Token::Delimiter(c));
        } else {
            name.push(c);
        }
    }
    if !name.is_empty() {
        tokens.push(Token::Name(name));
    }
    tokens
}

struct Tokens<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// Name following a delimiter; an immediately following delimiter means
    /// the empty name (the default package, for instance).
    fn name(&mut self) -> String {
        match self.peek() {
            Some(Token::Name(name)) => {
                let name = name.clone();
                self.pos += 1;
                name
            }
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memento_layout_matches_delimiters() {
        let model = JavaElement::model();
        let ty = model
            .project("P")
            .package_fragment_root("src", false)
            .package_fragment("p")
            .compilation_unit("Foo.java")
            .type_("Foo");
        assert_eq!(ty.handle_memento(), "=P/src<p{Foo.java[Foo");
        assert_eq!(
            ty.method("bar", &["I", "QString;"]).handle_memento(),
            "=P/src<p{Foo.java[Foo~bar~I~QString;"
        );
        assert_eq!(
            ty.initializer(2).unwrap().handle_memento(),
            "=P/src<p{Foo.java[Foo|2"
        );
        assert_eq!(
            ty.field("x").with_occurrence(3).handle_memento(),
            "=P/src<p{Foo.java[Foo^x!3"
        );
        let cu = ty.parent().unwrap();
        assert_eq!(
            cu.import_container().import("java.util.*").handle_memento(),
            "=P/src<p{Foo.java#java.util.*"
        );
    }

    #[test]
    fn names_with_delimiters_are_escaped() {
        let model = JavaElement::model();
        let project = model.project("a=b");
        assert_eq!(project.handle_memento(), "=a\\=b");
        let parsed = JavaElement::from_memento(&model, &project.handle_memento()).unwrap();
        assert_eq!(parsed, project);
    }

    #[test]
    fn mementos_parse_back_to_equal_handles() {
        let model = JavaElement::model();
        let pkg = model
            .project("P")
            .package_fragment_root("lib/rt.jar", true)
            .package_fragment("");
        let method = pkg
            .class_file("Foo.class")
            .type_("Foo")
            .method("run", &["[Ljava.lang.String;"]);
        let parsed = JavaElement::from_memento(&model, &method.handle_memento()).unwrap();
        assert_eq!(parsed, method);
        assert!(parsed.is_binary());
        assert!(parsed.package_fragment_root_of().unwrap().is_archive());

        let field = model
            .project("P")
            .package_fragment_root("src", false)
            .package_fragment("p")
            .compilation_unit("A.java")
            .type_("A")
            .field("f")
            .with_occurrence(2);
        let parsed = JavaElement::from_memento(&model, &field.handle_memento()).unwrap();
        assert_eq!(parsed, field);
    }

    #[test]
    fn malformed_mementos_are_rejected() {
        let model = JavaElement::model();
        assert!(JavaElement::from_memento(&model, "^x").is_err());
        assert!(JavaElement::from_memento(&model, "=P/src<p{A.java[A|x").is_err());
    }
}
