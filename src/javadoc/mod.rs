//! Documentation comment parsing.
//!
//! [`CommentParser`] validates `/** ... */` comments: tag placement, `@param`
//! names, `@throws` types and `@see`/`{@link}` references. Problems go to a
//! caller-supplied [`ProblemReporter`]; the structural result is a
//! [`Javadoc`].

pub mod ast;
pub mod parser;
pub mod problem;
pub mod scanner;
mod stack;

pub use ast::{ArgumentRef, Javadoc, ParamRef, Reference, SeeRef, Span, TagElement, TagValue, TypeRef};
pub use parser::{CommentParser, ParserKind, ParserOptions};
pub use problem::{IgnoreProblems, Problem, ProblemKind, ProblemReporter};

/// Raised by the scanner on malformed input (an unterminated string) and by
/// sub-parsers that cannot make sense of a reference. Never leaves the
/// parser: the tag is reported invalid instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid input in comment")]
pub struct InvalidInput;

/// Locates documentation comments in a source buffer, skipping string and
/// character literals and ordinary comments. Returns inclusive
/// `(start, end)` character offsets of each `/** ... */`.
pub fn find_doc_comments(source: &[char]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut i = 0;
    let at = |i: usize| source.get(i).copied().unwrap_or('\0');
    while i < source.len() {
        match source[i] {
            '"' | '\'' => {
                let quote = source[i];
                i += 1;
                while i < source.len() && source[i] != quote && source[i] != '\n' {
                    if source[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            '/' if at(i + 1) == '/' => {
                while i < source.len() && source[i] != '\n' {
                    i += 1;
                }
            }
            '/' if at(i + 1) == '*' => {
                let start = i;
                let is_doc = at(i + 2) == '*' && at(i + 3) != '/';
                i += 2;
                while i < source.len() && !(source[i] == '*' && at(i + 1) == '/') {
                    i += 1;
                }
                if i >= source.len() {
                    break;
                }
                let end = i + 1;
                if is_doc {
                    out.push((start, end));
                }
                i = end + 1;
            }
            _ => i += 1,
        }
    }
    out
}

/// Parses every documentation comment of `text`.
pub fn parse_all(text: &str, options: ParserOptions) -> Vec<(Javadoc, Vec<Problem>)> {
    let source: Vec<char> = text.chars().collect();
    let mut parser = CommentParser::new(&source, Vec::new(), options);
    let mut out = Vec::new();
    for (start, end) in find_doc_comments(&source) {
        let doc = parser.parse_comment(start, end);
        let problems = std::mem::take(parser.reporter_mut());
        out.push((doc, problems));
    }
    out
}
