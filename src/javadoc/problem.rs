use serde::Serialize;

use crate::modifiers::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    UnterminatedInlineTag,
    UnexpectedTag,
    InvalidTag,
    DuplicatedReturnTag,
    MissingParamName,
    InvalidParamTagName,
    InvalidParamTypeParameter,
    MissingThrowsClassName,
    InvalidThrowsClass,
    MissingReference,
    InvalidReference,
    MalformedSeeReference,
    InvalidSeeReferenceArgs,
    InvalidSeeUrlReference,
    InvalidValueReference,
    MissingHashCharacter,
    MissingIdentifier,
    UnexpectedText,
}

/// A diagnostic raised while parsing a comment. `end` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub start: usize,
    pub end: usize,
    pub modifiers: Modifiers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

pub trait ProblemReporter {
    fn report(&mut self, problem: Problem);
}

impl ProblemReporter for Vec<Problem> {
    fn report(&mut self, problem: Problem) {
        self.push(problem);
    }
}

impl<T: ProblemReporter + ?Sized> ProblemReporter for &mut T {
    fn report(&mut self, problem: Problem) {
        (**self).report(problem);
    }
}

/// Discards everything; used when only the parsed structure matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreProblems;

impl ProblemReporter for IgnoreProblems {
    fn report(&mut self, _problem: Problem) {}
}
