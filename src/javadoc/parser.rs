//! Documentation comment parser.
//!
//! A character-level state machine walks the comment looking for tags at
//! line starts and inline tags after `{`. Tag bodies (parameter names,
//! references, thrown types) are parsed with the token [`Scanner`]. The
//! parser and the scanner share one cursor: whenever a sub-parser gives up
//! on a token it rewinds both to the position before that token.

use tracing::trace;

use super::InvalidInput;
use super::ast::{
    ArgumentRef, Javadoc, ParamRef, Reference, SeeRef, Span, TagElement, TagValue, TypeRef,
};
use super::problem::{Problem, ProblemKind, ProblemReporter};
use super::scanner::{Scanner, Token, char_at, decode_char, is_java_whitespace};
use super::stack::{IdentifierStack, NodeStack, ORDERED_TAGS, PARAM_GROUP, SEE_GROUP, THROWS_GROUP};
use crate::modifiers::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserKind {
    /// Validates tags and reports problems; keeps only structural results.
    #[default]
    Compiler,
    /// Also keeps every text fragment and records invalid tags as text.
    Dom,
    /// Used while building element structure: collects categories and the
    /// deprecated flag, never reports.
    Source,
}

#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    pub kind: ParserKind,
    pub store_text: bool,
    pub report_problems: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            kind: ParserKind::Compiler,
            store_text: false,
            report_problems: true,
        }
    }
}

impl ParserOptions {
    pub fn dom() -> Self {
        Self {
            kind: ParserKind::Dom,
            store_text: true,
            report_problems: true,
        }
    }
}

#[derive(Debug)]
enum DocNode {
    Param(ParamRef),
    Throws(TypeRef),
    See(SeeRef),
}

/// Parses comments of one source buffer. A parser is reusable: each call
/// to [`CommentParser::parse_comment`] starts from a clean state.
pub struct CommentParser<'s, R> {
    source: &'s [char],
    scanner: Scanner<'s>,
    reporter: R,
    options: ParserOptions,
    modifiers: Modifiers,

    javadoc_start: usize,
    javadoc_end: usize,
    index: usize,
    line_end: usize,
    line_ptr: usize,
    last_line_ptr: usize,
    line_started: bool,
    text_start: Option<usize>,
    star_position: Option<usize>,
    token_previous_position: usize,
    last_identifier_end_position: usize,
    current_token: Option<Token>,

    inline_tag_started: bool,
    inline_tag_start: Option<usize>,
    tag_source_start: usize,
    tag_source_end: usize,
    tag_value: TagValue,

    identifiers: IdentifierStack,
    nodes: NodeStack<DocNode>,

    deprecated: bool,
    inherit_doc: Option<Span>,
    return_tag: Option<Span>,
    categories: Vec<String>,
    tags: Vec<TagElement>,
    texts: Vec<Span>,
    problem_count: usize,
}

impl<'s, R: ProblemReporter> CommentParser<'s, R> {
    pub fn new(source: &'s [char], reporter: R, options: ParserOptions) -> Self {
        Self {
            source,
            scanner: Scanner::new(source),
            reporter,
            options,
            modifiers: Modifiers::empty(),
            javadoc_start: 0,
            javadoc_end: 0,
            index: 0,
            line_end: 0,
            line_ptr: 1,
            last_line_ptr: 1,
            line_started: false,
            text_start: None,
            star_position: None,
            token_previous_position: 0,
            last_identifier_end_position: 0,
            current_token: None,
            inline_tag_started: false,
            inline_tag_start: None,
            tag_source_start: 0,
            tag_source_end: 0,
            tag_value: TagValue::None,
            identifiers: IdentifierStack::new(),
            nodes: NodeStack::new(),
            deprecated: false,
            inherit_doc: None,
            return_tag: None,
            categories: Vec::new(),
            tags: Vec::new(),
            texts: Vec::new(),
            problem_count: 0,
        }
    }

    /// Modifiers of the documented declaration, attached to every problem.
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Parses the comment spanning `start` (the `/` of `/**`) to `end`
    /// (the `/` of `*/`), both inclusive.
    pub fn parse_comment(&mut self, start: usize, end: usize) -> Javadoc {
        self.javadoc_start = start;
        self.javadoc_end = end.min(self.source.len().saturating_sub(1));
        let valid = self.comment_parse();
        trace!(
            target: "jmodel.javadoc",
            start,
            end,
            valid,
            tags = self.tags.len(),
            "parsed comment"
        );
        self.build_result(valid)
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.identifiers.clear();
        self.current_token = None;
        self.inline_tag_started = false;
        self.inline_tag_start = None;
        self.line_started = false;
        self.text_start = None;
        self.star_position = None;
        self.tag_value = TagValue::None;
        self.deprecated = false;
        self.inherit_doc = None;
        self.return_tag = None;
        self.categories.clear();
        self.tags.clear();
        self.texts.clear();
        self.problem_count = 0;
        self.scanner.tokenize_white_space = false;
    }

    fn comment_parse(&mut self) -> bool {
        self.reset();
        let mut valid_comment = true;
        let javadoc_start = self.javadoc_start;
        let javadoc_end = self.javadoc_end;

        self.line_ptr = self.scanner.line_number(javadoc_start);
        self.last_line_ptr = self.scanner.line_number(javadoc_end);
        self.scanner.reset_to(javadoc_start, javadoc_end);
        self.index = javadoc_start;
        // skip the opening `/*`
        self.read_char();
        self.read_char();
        let mut previous_position = self.index;
        let mut next_character = self.read_char();
        self.line_end = if self.line_ptr == self.last_line_ptr {
            javadoc_end
        } else {
            self.scanner.line_end(self.line_ptr).saturating_sub(1)
        };

        let mut invalid_tag_line_end: Option<usize> = None;
        let mut invalid_inline_tag_line_end: Option<usize> = None;
        let push_text = self.options.store_text;
        let is_dom = self.options.kind == ParserKind::Dom;

        while self.index < javadoc_end {
            previous_position = self.index;
            let previous_char = next_character;

            if self.index > self.line_end + 1 {
                self.update_line_end();
            }

            match self.current_token {
                None => next_character = self.read_char(),
                Some(token) => {
                    previous_position = self.scanner.current_token_start();
                    next_character = match token {
                        Token::RBrace => '}',
                        Token::Multiply => '*',
                        _ => self.scanner.current_character,
                    };
                    self.consume_token();
                }
            }

            if self.index >= javadoc_end {
                break;
            }

            match next_character {
                '@' => {
                    if !self.line_started || previous_char == '{' {
                        if self.inline_tag_started {
                            self.inline_tag_started = false;
                            let end = invalid_inline_tag_line_end
                                .map_or(previous_position, |e| previous_position.min(e));
                            self.report_unterminated_inline_tag(end);
                            valid_comment = false;
                            if push_text {
                                self.push_text_before(self.text_start, previous_position);
                            }
                        }
                        if previous_char == '{' {
                            if push_text && let Some(inline_start) = self.inline_tag_start {
                                self.push_text_before(self.text_start, inline_start);
                            }
                            self.inline_tag_started = true;
                            invalid_inline_tag_line_end = Some(self.line_end);
                        } else if push_text && let Some(invalid_end) = invalid_tag_line_end {
                            self.push_text_before(self.text_start, invalid_end);
                        }
                        self.scanner.reset_to(self.index, javadoc_end);
                        self.current_token = None;
                        match self.parse_tag(previous_position) {
                            Ok(true) => {}
                            Ok(false) => {
                                valid_comment = false;
                                if is_dom {
                                    self.text_start = Some(self.tag_source_end + 1);
                                    invalid_tag_line_end = Some(self.line_end);
                                }
                            }
                            Err(InvalidInput) => self.consume_token(),
                        }
                    }
                    self.line_started = true;
                }
                '\r' | '\n' => {
                    if self.line_started && push_text {
                        self.push_text_before(self.text_start, previous_position);
                    }
                    self.line_started = false;
                    self.text_start = None;
                }
                '}' => {
                    if self.inline_tag_started {
                        if push_text && self.line_started {
                            self.push_text_before(self.text_start, previous_position);
                        }
                        self.text_start = Some(self.index);
                        self.inline_tag_started = false;
                    } else if !self.line_started {
                        self.text_start = Some(previous_position);
                    }
                    self.line_started = true;
                }
                '{' => {
                    if self.inline_tag_started {
                        self.inline_tag_started = false;
                        let end = invalid_inline_tag_line_end
                            .map_or(previous_position, |e| previous_position.min(e));
                        self.report_unterminated_inline_tag(end);
                        if push_text && self.line_started {
                            self.push_text_before(self.text_start, previous_position);
                        }
                    }
                    if !self.line_started {
                        self.text_start = Some(previous_position);
                    }
                    self.line_started = true;
                    self.inline_tag_start = Some(previous_position);
                }
                '*' | '\u{000c}' | ' ' | '\t' => {}
                _ => {
                    if !self.line_started {
                        self.text_start = Some(previous_position);
                    }
                    self.line_started = true;
                }
            }
        }

        if self.inline_tag_started {
            self.inline_tag_started = false;
            let mut end = invalid_inline_tag_line_end
                .map_or(previous_position, |e| previous_position.min(e));
            if self.index >= javadoc_end
                && let Some(e) = invalid_inline_tag_line_end
            {
                end = e;
            }
            self.report_unterminated_inline_tag(end);
            valid_comment = false;
            if push_text && self.line_started {
                self.push_text_before(self.text_start, previous_position);
            }
        } else if push_text && self.line_started {
            self.push_text_before(self.text_start, previous_position);
        }
        valid_comment
    }

    fn report_unterminated_inline_tag(&mut self, end: usize) {
        let start = self.inline_tag_start.unwrap_or(end);
        self.report(ProblemKind::UnterminatedInlineTag, start, end);
    }

    fn push_text_before(&mut self, start: Option<usize>, end: usize) {
        if let Some(start) = start
            && start < end
        {
            self.texts.push(Span::new(start, end - 1));
        }
    }

    fn report(&mut self, kind: ProblemKind, start: usize, end: usize) {
        self.report_with(kind, start, end, None);
    }

    fn report_with(&mut self, kind: ProblemKind, start: usize, end: usize, argument: Option<String>) {
        self.problem_count += 1;
        if !self.options.report_problems || self.options.kind == ParserKind::Source {
            return;
        }
        trace!(target: "jmodel.javadoc", ?kind, start, end, "comment problem");
        self.reporter.report(Problem {
            kind,
            start,
            end,
            modifiers: self.modifiers,
            argument,
        });
    }

    // -- cursor ------------------------------------------------------------

    fn read_char(&mut self) -> char {
        let (c, next) = decode_char(self.source, self.index);
        self.index = next;
        c
    }

    fn peek_char(&self) -> char {
        decode_char(self.source, self.index).0
    }

    fn read_token(&mut self) -> Result<Token, InvalidInput> {
        if let Some(token) = self.current_token {
            return Ok(token);
        }
        self.token_previous_position = self.scanner.current_position;
        let mut token = self.scanner.get_next_token()?;
        if self.scanner.current_position > self.line_end + 1 {
            self.line_started = false;
            while token == Token::Multiply {
                token = self.scanner.get_next_token()?;
            }
        }
        self.index = self.scanner.current_position;
        self.line_started = true;
        self.current_token = Some(token);
        Ok(token)
    }

    fn read_token_safely(&mut self) -> Token {
        match self.read_token() {
            Ok(token) => token,
            Err(InvalidInput) => Token::Error,
        }
    }

    fn read_token_and_consume(&mut self) -> Result<Token, InvalidInput> {
        let token = self.read_token()?;
        self.consume_token();
        Ok(token)
    }

    fn consume_token(&mut self) {
        self.current_token = None;
        self.update_line_end();
    }

    /// Rewinds parser and scanner to just before the pending token.
    fn rescan_last_token(&mut self) {
        self.index = self.token_previous_position;
        self.scanner.current_position = self.token_previous_position;
        self.current_token = None;
    }

    fn update_line_end(&mut self) {
        while self.index > self.line_end + 1 {
            if self.line_ptr < self.last_line_ptr {
                self.line_ptr += 1;
                self.line_end = self.scanner.line_end(self.line_ptr).saturating_sub(1);
            } else {
                self.line_end = self.javadoc_end;
                return;
            }
        }
    }

    fn token_end_position(&self) -> usize {
        self.scanner.current_token_end().min(self.line_end)
    }

    fn index_position(&self) -> usize {
        if self.index > self.line_end {
            self.line_end
        } else {
            self.index.saturating_sub(1)
        }
    }

    fn star_or_line_end(&self) -> usize {
        let end = self.star_position.unwrap_or(self.line_end);
        if char_at(self.source, end) == '\n' {
            end.saturating_sub(1)
        } else {
            end
        }
    }

    fn push_identifier(&mut self, new_length: bool, is_token: bool) {
        let name = if is_token {
            self.scanner.current_token_source()
        } else {
            self.scanner.current_identifier_source().to_string()
        };
        let position = Span::new(
            self.scanner.start_position,
            self.scanner.current_position.saturating_sub(1),
        );
        self.identifiers.push(name, position, new_length);
    }

    // -- tags --------------------------------------------------------------

    fn parse_tag(&mut self, previous_position: usize) -> Result<bool, InvalidInput> {
        let token = self.read_token_and_consume()?;
        self.tag_source_start = self.scanner.current_token_start();
        self.tag_source_end = self.scanner.current_token_end();
        let name = if token == Token::Identifier {
            self.scanner.current_identifier_source().to_string()
        } else {
            self.scanner.current_token_source()
        };
        self.tag_value = TagValue::None;

        let valid = match name.as_str() {
            "param" => {
                self.tag_value = TagValue::Param;
                let saved = self.scanner.tokenize_white_space;
                let result = self.parse_param();
                self.scanner.tokenize_white_space = saved;
                result?
            }
            "return" => {
                self.tag_value = TagValue::Return;
                self.parse_return()
            }
            "throws" | "exception" => {
                self.tag_value = TagValue::Throws;
                self.parse_throws()
            }
            "see" => {
                if self.inline_tag_started {
                    self.report(ProblemKind::UnexpectedTag, self.tag_source_start, self.tag_source_end);
                    false
                } else {
                    self.tag_value = TagValue::See;
                    self.parse_reference()
                }
            }
            "link" | "linkplain" | "value" => {
                if self.inline_tag_started {
                    self.tag_value = if name == "value" {
                        TagValue::Value
                    } else {
                        TagValue::Link
                    };
                    self.parse_reference()
                } else {
                    self.report(ProblemKind::UnexpectedTag, self.tag_source_start, self.tag_source_end);
                    false
                }
            }
            "deprecated" => {
                self.tag_value = TagValue::Deprecated;
                self.deprecated = true;
                true
            }
            "inheritDoc" => {
                self.tag_value = TagValue::InheritDoc;
                // only meaningful before any structural tag
                if self.nodes.is_empty() {
                    self.inherit_doc = Some(Span::new(self.tag_source_start, self.tag_source_end));
                }
                true
            }
            "category" => {
                self.tag_value = TagValue::Category;
                self.parse_category()
            }
            _ => {
                self.tag_value = TagValue::Other;
                true
            }
        };
        self.text_start = Some(self.index);
        self.tags.push(TagElement {
            name,
            span: Span::new(previous_position, self.index_position().max(self.tag_source_end)),
            inline: self.inline_tag_started,
            valid,
        });
        Ok(valid)
    }

    fn parse_return(&mut self) -> bool {
        if self.return_tag.is_some() {
            self.report(ProblemKind::DuplicatedReturnTag, self.tag_source_start, self.tag_source_end);
            return false;
        }
        self.return_tag = Some(Span::new(self.tag_source_start, self.tag_source_end));
        true
    }

    fn parse_identifier_tag(&mut self, report: bool) -> bool {
        if self.read_token_safely() == Token::Identifier {
            self.push_identifier(true, false);
            return true;
        }
        if report {
            self.report(ProblemKind::MissingIdentifier, self.tag_source_start, self.tag_source_end);
        }
        false
    }

    /// `@category a b c`: names up to the end of the tag line.
    fn parse_category(&mut self) -> bool {
        self.identifiers.clear();
        let mut found = false;
        loop {
            if !self.parse_identifier_tag(!found) {
                if self.current_token.is_some() {
                    self.rescan_last_token();
                }
                return found;
            }
            if self.scanner.current_token_start() > self.line_end {
                self.rescan_last_token();
                return found;
            }
            self.consume_token();
            if let Some(name) = self.identifiers.top_group().0.last() {
                self.categories.push(name.clone());
            }
            found = true;
        }
    }

    fn parse_throws(&mut self) -> bool {
        let start = self.scanner.current_position;
        match self.parse_qualified_name(true) {
            Ok(None) => {
                self.report(
                    ProblemKind::MissingThrowsClassName,
                    self.tag_source_start,
                    self.tag_source_end,
                );
                false
            }
            Ok(Some(type_ref)) => self.push_throw_name(type_ref),
            Err(InvalidInput) => {
                let end = self.token_end_position();
                self.report(ProblemKind::InvalidThrowsClass, start, end);
                false
            }
        }
    }

    fn parse_param(&mut self) -> Result<bool, InvalidInput> {
        let mut start = self.tag_source_start;
        let mut end = self.tag_source_end;
        self.scanner.tokenize_white_space = true;

        if !is_java_whitespace(self.scanner.current_character) {
            let end = self.scanner.current_token_end();
            self.report(ProblemKind::InvalidTag, start, end);
            self.scanner.current_position = start;
            self.index = start;
            self.current_token = None;
            return Ok(false);
        }

        self.identifiers.clear();
        let mut has_multi_lines = self.scanner.current_position > self.line_end + 1;
        let mut is_type_param = false;
        let mut valid = true;
        let mut empty = true;
        let mut token: Option<Token> = None;

        // parameter name or opening `<`
        loop {
            self.current_token = None;
            match self.read_token() {
                Ok(t) => token = Some(t),
                Err(InvalidInput) => valid = false,
            }
            match token {
                Some(Token::Identifier) if valid => {
                    self.push_identifier(true, false);
                    start = self.scanner.current_token_start();
                    end = self.param_end(has_multi_lines);
                    break;
                }
                Some(Token::Less) if valid => {
                    self.push_identifier(true, true);
                    start = self.scanner.current_token_start();
                    end = self.param_end(has_multi_lines);
                    is_type_param = true;
                    break;
                }
                Some(Token::Whitespace) => {
                    if self.scanner.current_position > self.line_end + 1 {
                        has_multi_lines = true;
                    }
                    if valid {
                        continue;
                    }
                }
                Some(Token::Eof) => {}
                _ => {
                    if token == Some(Token::LeftShift) {
                        is_type_param = true;
                    }
                    if valid && !has_multi_lines {
                        start = self.scanner.current_token_start();
                    }
                    valid = false;
                    if !has_multi_lines {
                        empty = false;
                        end = self.param_end(false);
                        continue;
                    }
                    end = self.line_end;
                }
            }
            let kind = if empty {
                ProblemKind::MissingParamName
            } else if is_type_param {
                ProblemKind::InvalidParamTypeParameter
            } else {
                ProblemKind::InvalidParamTagName
            };
            self.report(kind, start, end);
            self.rewind_to(start);
            return Ok(false);
        }

        if is_type_param {
            // type parameter name
            loop {
                self.current_token = None;
                match self.read_token() {
                    Ok(t) => token = Some(t),
                    Err(InvalidInput) => valid = false,
                }
                match token {
                    Some(Token::Whitespace)
                        if valid && self.scanner.current_position <= self.line_end + 1 => {}
                    Some(Token::Whitespace) | Some(Token::Eof) => {
                        self.report(ProblemKind::InvalidParamTypeParameter, start, end);
                        self.rewind_to(start);
                        return Ok(false);
                    }
                    Some(Token::Identifier) => {
                        end = self.param_end(has_multi_lines);
                        if valid {
                            self.push_identifier(false, false);
                            break;
                        }
                    }
                    _ => {
                        end = self.param_end(has_multi_lines);
                        valid = false;
                    }
                }
            }

            // closing `>`
            let mut spaces = false;
            loop {
                self.current_token = None;
                match self.read_token() {
                    Ok(t) => token = Some(t),
                    Err(InvalidInput) => valid = false,
                }
                match token {
                    Some(Token::Whitespace) => {
                        if self.scanner.current_position > self.line_end + 1 {
                            has_multi_lines = true;
                            valid = false;
                        }
                        spaces = true;
                        if !valid {
                            self.report(ProblemKind::InvalidParamTypeParameter, start, end);
                            self.rewind_to(start);
                            return Ok(false);
                        }
                    }
                    Some(Token::Eof) => {
                        self.report(ProblemKind::InvalidParamTypeParameter, start, end);
                        self.rewind_to(start);
                        return Ok(false);
                    }
                    Some(Token::Greater) => {
                        end = self.param_end(has_multi_lines);
                        if valid {
                            self.push_identifier(false, true);
                            break;
                        }
                    }
                    _ => {
                        if !spaces {
                            end = self.param_end(has_multi_lines);
                        }
                        valid = false;
                    }
                }
            }
        }

        // the name must be followed by whitespace
        if valid {
            self.current_token = None;
            let restart = self.scanner.current_position;
            match self.read_token_and_consume() {
                Ok(t) => token = Some(t),
                Err(InvalidInput) => valid = false,
            }
            if valid && token == Some(Token::Whitespace) {
                self.scanner.current_position = restart;
                self.index = restart;
                return Ok(self.push_param_name(is_type_param));
            }
        }

        self.current_token = None;
        end = self.param_end(has_multi_lines);
        loop {
            let t = self.read_token()?;
            if t == Token::Whitespace || t == Token::Eof {
                break;
            }
            self.current_token = None;
            end = self.param_end(has_multi_lines);
        }
        let kind = if is_type_param {
            ProblemKind::InvalidParamTypeParameter
        } else {
            ProblemKind::InvalidParamTagName
        };
        self.report(kind, start, end);
        self.rewind_to(start);
        Ok(false)
    }

    fn param_end(&self, has_multi_lines: bool) -> usize {
        if has_multi_lines {
            self.line_end
        } else {
            self.scanner.current_token_end()
        }
    }

    fn rewind_to(&mut self, position: usize) {
        self.scanner.current_position = position;
        self.index = position;
        self.current_token = None;
    }

    // -- references --------------------------------------------------------

    fn parse_reference(&mut self) -> bool {
        let current_position = self.scanner.current_position;
        match self.parse_reference_inner() {
            Ok(valid) => valid,
            Err(InvalidInput) => {
                let end = self.token_end_position();
                self.report(ProblemKind::InvalidReference, current_position, end);
                self.rescan_last_token();
                false
            }
        }
    }

    fn parse_reference_inner(&mut self) -> Result<bool, InvalidInput> {
        let mut type_ref: Option<TypeRef> = None;
        let mut type_ref_start = self.scanner.current_position;

        while self.index < self.scanner.eof_position {
            let previous_position = self.index;
            match self.read_token_safely() {
                Token::StringLiteral if type_ref.is_none() => {
                    self.consume_token();
                    let start = self.scanner.current_token_start();
                    if self.tag_value == TagValue::Value {
                        let end = self.token_end_position();
                        self.report(ProblemKind::InvalidValueReference, start, end);
                        return Ok(false);
                    }
                    if self.verify_end_line(previous_position) {
                        return Ok(true);
                    }
                    let from = self.scanner.current_position;
                    self.report(ProblemKind::UnexpectedText, from, self.line_end);
                    return Ok(false);
                }
                Token::Less if type_ref.is_none() => {
                    self.consume_token();
                    let start = self.scanner.current_token_start();
                    if self.parse_href()? {
                        self.consume_token();
                        if self.tag_value == TagValue::Value {
                            let end = self.index_position();
                            self.report(ProblemKind::InvalidValueReference, start, end);
                            return Ok(false);
                        }
                        if self.verify_end_line(previous_position) {
                            return Ok(true);
                        }
                        let from = self.scanner.current_position;
                        self.report(ProblemKind::UnexpectedText, from, self.line_end);
                    } else if self.tag_value == TagValue::Value {
                        let end = self.index_position();
                        self.report(ProblemKind::InvalidValueReference, start, end);
                    }
                    return Ok(false);
                }
                Token::Error => {
                    self.consume_token();
                    if self.scanner.current_character == '#' {
                        return Ok(match self.parse_member(type_ref.take())? {
                            Some(reference) => self.push_see_ref(reference),
                            None => false,
                        });
                    }
                    if self.scanner.current_identifier_source().starts_with('"') {
                        let start = self.scanner.current_token_start();
                        let end = self.token_end_position();
                        self.report(ProblemKind::InvalidReference, start, end);
                        return Ok(false);
                    }
                    break;
                }
                Token::Identifier if type_ref.is_none() => {
                    type_ref_start = self.scanner.current_token_start();
                    type_ref = self.parse_qualified_name(true)?;
                }
                _ => break,
            }
        }

        let Some(type_ref) = type_ref else {
            if self.current_token.is_some() {
                self.rescan_last_token();
            }
            if self.tag_value == TagValue::Value {
                return Ok(true);
            }
            self.report(ProblemKind::MissingReference, self.tag_source_start, self.tag_source_end);
            return Ok(false);
        };

        if self.last_identifier_end_position > self.javadoc_start {
            self.index = self.last_identifier_end_position + 1;
            self.scanner.current_position = self.index;
        }
        self.current_token = None;

        if self.tag_value == TagValue::Value {
            self.report(ProblemKind::InvalidReference, type_ref_start, self.line_end);
            return Ok(false);
        }

        if self.peek_char() == '(' {
            let end = self.line_end.min(self.source.len().saturating_sub(1));
            let written: String = self.source[type_ref_start..=end].iter().collect();
            self.report_with(
                ProblemKind::MissingHashCharacter,
                type_ref_start,
                self.line_end,
                Some(written.trim_end().to_string()),
            );
            return Ok(false);
        }

        if !self.verify_space_or_end_comment() {
            self.index = self.token_previous_position;
            self.scanner.current_position = self.token_previous_position;
            self.current_token = None;
            let end = self.star_or_line_end();
            self.report(ProblemKind::MalformedSeeReference, type_ref_start, end);
            return Ok(false);
        }

        Ok(self.push_see_ref(Reference::Type(type_ref)))
    }

    fn parse_qualified_name(&mut self, reset: bool) -> Result<Option<TypeRef>, InvalidInput> {
        if reset {
            self.identifiers.clear();
        }
        let mut primitive = false;
        let mut i_token = 0usize;
        loop {
            let token = self.read_token_safely();
            match token {
                Token::Identifier => {
                    if i_token % 2 > 0 {
                        break;
                    }
                    self.push_identifier(i_token == 0, false);
                    self.consume_token();
                }
                Token::Dot => {
                    if i_token % 2 == 0 {
                        return Err(InvalidInput);
                    }
                    self.consume_token();
                }
                t if t.is_primitive() => {
                    if i_token > 0 {
                        return Err(InvalidInput);
                    }
                    self.push_identifier(true, false);
                    self.consume_token();
                    primitive = true;
                    break;
                }
                _ => {
                    if i_token == 0 {
                        if let Some(top) = self.identifiers.top_position() {
                            self.last_identifier_end_position = top.end;
                        }
                        return Ok(None);
                    }
                    if i_token % 2 == 0 {
                        if self.options.kind == ParserKind::Dom && self.current_token.is_some() {
                            self.rescan_last_token();
                        }
                        return Err(InvalidInput);
                    }
                    break;
                }
            }
            i_token += 1;
        }
        if self.current_token.is_some() {
            self.rescan_last_token();
        }
        if let Some(top) = self.identifiers.top_position() {
            self.last_identifier_end_position = top.end;
        }
        Ok(Some(self.create_type_reference(primitive)))
    }

    fn create_type_reference(&self, primitive: bool) -> TypeRef {
        let (names, positions) = self.identifiers.top_group();
        TypeRef {
            tokens: names.to_vec(),
            positions: positions.to_vec(),
            primitive,
        }
    }

    fn member_name(&self) -> (String, Span) {
        (
            self.identifiers.name(0).unwrap_or_default().to_string(),
            self.identifiers.position(0).unwrap_or(Span::new(0, 0)),
        )
    }

    fn parse_member(&mut self, receiver: Option<TypeRef>) -> Result<Option<Reference>, InvalidInput> {
        self.identifiers.clear();
        let start = self.scanner.current_token_start();

        if self.read_token()? != Token::Identifier {
            let end = self.token_end_position().saturating_sub(1).max(start);
            self.report(ProblemKind::InvalidReference, start, end);
            self.rescan_last_token();
            return Ok(None);
        }

        self.consume_token();
        self.push_identifier(true, false);
        let previous_position = self.index;

        if self.read_token()? == Token::LParen {
            self.consume_token();
            let start = self.scanner.current_token_start();
            match self.parse_arguments(receiver) {
                Ok(reference) => return Ok(reference),
                Err(InvalidInput) => {
                    let token_end = self.scanner.current_token_end();
                    let end = if token_end < self.line_end {
                        token_end
                    } else {
                        self.scanner.current_token_start()
                    };
                    let end = end.min(self.line_end);
                    self.report(ProblemKind::InvalidSeeReferenceArgs, start, end);
                    return Ok(None);
                }
            }
        }

        self.index = previous_position;
        self.scanner.current_position = previous_position;
        self.current_token = None;

        if !self.verify_space_or_end_comment() {
            let end = self.star_or_line_end();
            self.report(ProblemKind::MalformedSeeReference, start, end);
            return Ok(None);
        }
        let (name, position) = self.member_name();
        Ok(Some(Reference::Field {
            receiver,
            name,
            position,
        }))
    }

    fn parse_arguments(&mut self, receiver: Option<TypeRef>) -> Result<Option<Reference>, InvalidInput> {
        let mut modulo = 0usize;
        let mut i_token = 0usize;
        let mut arg_name: Option<String> = None;
        let mut arguments: Vec<ArgumentRef> = Vec::new();
        let start = self.scanner.current_token_start();

        'next_arg: while self.index < self.scanner.eof_position {
            let type_ref = match self.parse_qualified_name(false) {
                Ok(t) => t,
                Err(InvalidInput) => break,
            };
            let first_arg = modulo == 0;
            if first_arg {
                if i_token != 0 {
                    break;
                }
            } else if i_token % modulo != 0 {
                break;
            }

            let Some(type_ref) = type_ref else {
                if first_arg && self.current_token == Some(Token::RParen) {
                    if !self.verify_space_or_end_comment() {
                        let end = self.star_or_line_end();
                        self.report(ProblemKind::MalformedSeeReference, start, end);
                        return Ok(None);
                    }
                    self.line_started = true;
                    let (name, position) = self.member_name();
                    return Ok(Some(Reference::Method {
                        receiver,
                        name,
                        position,
                        arguments: None,
                    }));
                }
                break;
            };
            i_token += 1;

            let mut dim_positions = Vec::new();
            let mut varargs = false;
            match self.read_token()? {
                Token::LBracket => {
                    let dim_start = self.scanner.current_token_start();
                    while self.read_token()? == Token::LBracket {
                        self.consume_token();
                        if self.read_token()? != Token::RBracket {
                            break 'next_arg;
                        }
                        self.consume_token();
                        dim_positions.push(Span::new(dim_start, self.scanner.current_token_end()));
                    }
                }
                Token::Ellipsis => {
                    let dim_start = self.scanner.current_token_start();
                    dim_positions.push(Span::new(dim_start, self.scanner.current_token_end()));
                    self.consume_token();
                    varargs = true;
                }
                _ => {}
            }

            let mut name_position = None;
            if self.read_token()? == Token::Identifier {
                self.consume_token();
                if first_arg {
                    if i_token != 1 {
                        break;
                    }
                } else if i_token % modulo != 1 {
                    break;
                }
                if arg_name.is_none() && !first_arg {
                    break;
                }
                arg_name = Some(self.scanner.current_identifier_source().to_string());
                name_position = Some(Span::new(
                    self.scanner.current_token_start(),
                    self.scanner.current_token_end(),
                ));
                i_token += 1;
            } else if arg_name.is_some() {
                break;
            }

            if first_arg {
                modulo = i_token + 1;
            } else if i_token % modulo != modulo - 1 {
                break;
            }

            let token = self.read_token()?;
            let argument = ArgumentRef {
                type_ref,
                dimensions: dim_positions.len(),
                varargs,
                dim_positions,
                name: arg_name.clone().unwrap_or_default(),
                name_position,
            };
            match token {
                Token::Comma => {
                    arguments.push(argument);
                    self.consume_token();
                    i_token += 1;
                }
                Token::RParen => {
                    if !self.verify_space_or_end_comment() {
                        let end = self.star_or_line_end();
                        self.report(ProblemKind::MalformedSeeReference, start, end);
                        return Ok(None);
                    }
                    arguments.push(argument);
                    self.consume_token();
                    let (name, position) = self.member_name();
                    return Ok(Some(Reference::Method {
                        receiver,
                        name,
                        position,
                        arguments: Some(arguments),
                    }));
                }
                _ => break,
            }
        }
        Err(InvalidInput)
    }

    fn parse_href(&mut self) -> Result<bool, InvalidInput> {
        let mut start = self.scanner.current_token_start();
        if self.read_char().to_ascii_lowercase() == 'a' {
            self.scanner.current_position = self.index;
            if self.read_token()? == Token::Identifier {
                self.consume_token();
                match self.parse_href_body(&mut start) {
                    Ok(Some(valid)) => return Ok(valid),
                    Ok(None) | Err(InvalidInput) => {}
                }
            }
        }
        self.rescan_last_token();
        if self.tag_value != TagValue::Value {
            self.report(ProblemKind::InvalidSeeUrlReference, start, self.line_end);
        }
        Ok(false)
    }

    fn href_aborted(&self) -> bool {
        self.scanner.current_position >= self.scanner.eof_position
            || self.scanner.current_character == '@'
            || (self.inline_tag_started && self.scanner.current_character == '}')
    }

    fn abort_href(&mut self, start: usize) -> Option<bool> {
        self.rescan_last_token();
        if self.tag_value != TagValue::Value {
            self.report(ProblemKind::InvalidSeeUrlReference, start, self.line_end);
        }
        Some(false)
    }

    fn parse_href_body(&mut self, start: &mut usize) -> Result<Option<bool>, InvalidInput> {
        if !self.scanner.current_identifier_source().eq_ignore_ascii_case("href")
            || self.read_token()? != Token::Equal
        {
            return Ok(None);
        }
        self.consume_token();
        if self.read_token()? != Token::StringLiteral {
            return Ok(None);
        }
        self.consume_token();
        while self.read_token()? != Token::Greater {
            if self.href_aborted() {
                return Ok(self.abort_href(*start));
            }
            self.current_token = None;
        }
        self.consume_token();
        while self.read_token()? != Token::Less {
            if self.href_aborted() {
                return Ok(self.abort_href(*start));
            }
            self.consume_token();
        }
        self.consume_token();
        *start = self.scanner.current_token_start();
        if self.read_char() == '/'
            && self.read_char().to_ascii_lowercase() == 'a'
            && self.read_char() == '>'
        {
            return Ok(Some(true));
        }
        Ok(None)
    }

    /// True if only whitespace (or the comment end) follows on this line.
    fn verify_end_line(&mut self, text_position: usize) -> bool {
        if self.inline_tag_started {
            return self.peek_char() == '}';
        }
        let start_position = self.index;
        let mut previous_position = self.index;
        self.star_position = None;
        let mut ch = self.read_char();
        loop {
            match ch {
                '\r' | '\n' => {
                    self.index = previous_position;
                    return true;
                }
                '\u{000c}' | ' ' | '\t' => {
                    if self.star_position.is_some() {
                        break;
                    }
                }
                '*' => self.star_position = Some(previous_position),
                '/' if self.star_position.is_some_and(|s| s >= text_position) => return true,
                _ => break,
            }
            if self.index >= self.source.len() {
                break;
            }
            previous_position = self.index;
            ch = self.read_char();
        }
        self.index = start_position;
        false
    }

    /// True if the next character is whitespace, the end of an inline tag,
    /// or the comment end.
    fn verify_space_or_end_comment(&mut self) -> bool {
        let start_position = self.index;
        let ch = self.peek_char();
        if ch == '}' {
            return self.inline_tag_started;
        }
        if is_java_whitespace(ch) {
            return true;
        }
        let mut previous_position = self.index;
        self.star_position = None;
        let mut ch = self.read_char();
        loop {
            match ch {
                '*' => self.star_position = Some(previous_position),
                '/' if self.star_position.is_some_and(|s| s >= start_position) => return true,
                _ => {
                    self.index = start_position;
                    return false;
                }
            }
            if self.index >= self.source.len() {
                break;
            }
            previous_position = self.index;
            ch = self.read_char();
        }
        self.index = start_position;
        false
    }

    // -- node stack --------------------------------------------------------

    fn push_param_name(&mut self, is_type_param: bool) -> bool {
        let index = if is_type_param { 1 } else { 0 };
        let node = DocNode::Param(ParamRef {
            name: self.identifiers.name(index).unwrap_or_default().to_string(),
            position: self.identifiers.position(index).unwrap_or(Span::new(0, 0)),
            type_parameter: is_type_param,
        });
        let Some(group) = self.nodes.group() else {
            self.nodes.push(Some(node), true);
            return true;
        };
        if !is_type_param {
            let throws_seen = (THROWS_GROUP..=group)
                .step_by(ORDERED_TAGS)
                .any(|g| self.nodes.group_len(g) != 0);
            if throws_seen {
                self.report(ProblemKind::UnexpectedTag, self.tag_source_start, self.tag_source_end);
                return false;
            }
        }
        match group % ORDERED_TAGS {
            PARAM_GROUP => self.nodes.push(Some(node), false),
            SEE_GROUP => self.nodes.push(Some(node), true),
            _ => return false,
        }
        true
    }

    fn push_throw_name(&mut self, type_ref: TypeRef) -> bool {
        let node = Some(DocNode::Throws(type_ref));
        let Some(group) = self.nodes.group() else {
            self.nodes.push(None, true);
            self.nodes.push(node, true);
            return true;
        };
        match group % ORDERED_TAGS {
            PARAM_GROUP => self.nodes.push(node, true),
            THROWS_GROUP => self.nodes.push(node, false),
            SEE_GROUP => {
                self.nodes.push(None, true);
                self.nodes.push(node, true);
            }
            _ => return false,
        }
        true
    }

    fn push_see_ref(&mut self, reference: Reference) -> bool {
        let node = Some(DocNode::See(SeeRef {
            tag: self.tag_value,
            reference,
        }));
        let Some(group) = self.nodes.group() else {
            self.nodes.push(None, true);
            self.nodes.push(None, true);
            self.nodes.push(node, true);
            return true;
        };
        match group % ORDERED_TAGS {
            PARAM_GROUP => {
                self.nodes.push(None, true);
                self.nodes.push(node, true);
            }
            THROWS_GROUP => self.nodes.push(node, true),
            SEE_GROUP => self.nodes.push(node, false),
            _ => return false,
        }
        true
    }

    fn build_result(&mut self, valid: bool) -> Javadoc {
        let mut doc = Javadoc {
            start: self.javadoc_start,
            end: self.javadoc_end,
            valid,
            deprecated: self.deprecated,
            inherit_doc: self.inherit_doc,
            return_tag: self.return_tag,
            categories: std::mem::take(&mut self.categories),
            tags: std::mem::take(&mut self.tags),
            texts: std::mem::take(&mut self.texts),
            problem_count: self.problem_count,
            ..Javadoc::default()
        };
        for (_, node) in self.nodes.drain_groups() {
            match node {
                DocNode::Param(p) if p.type_parameter => doc.type_params.push(p),
                DocNode::Param(p) => doc.params.push(p),
                DocNode::Throws(t) => doc.throws.push(t),
                DocNode::See(s) => doc.references.push(s),
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::javadoc::problem::Problem;

    fn parse(text: &str) -> (Javadoc, Vec<Problem>) {
        parse_with(text, ParserOptions::default())
    }

    fn parse_with(text: &str, options: ParserOptions) -> (Javadoc, Vec<Problem>) {
        let source: Vec<char> = text.chars().collect();
        let start = text.find("/**").expect("comment start");
        let end = text.rfind("*/").expect("comment end") + 1;
        let start = text[..start].chars().count();
        let end = text[..end].chars().count();
        let mut parser = CommentParser::new(&source, Vec::new(), options);
        let doc = parser.parse_comment(start, end);
        (doc, parser.into_reporter())
    }

    fn kinds(problems: &[Problem]) -> Vec<ProblemKind> {
        problems.iter().map(|p| p.kind).collect()
    }

    #[test]
    fn params_and_return_are_collected() {
        let (doc, problems) = parse("/**\n * Adds.\n * @param a first\n * @param b second\n * @return sum\n */");
        assert!(problems.is_empty(), "{problems:?}");
        assert!(doc.valid);
        let names: Vec<_> = doc.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(doc.return_tag.is_some());
    }

    #[test]
    fn type_parameter_param() {
        let (doc, problems) = parse("/**\n * @param <T> element type\n */");
        assert!(problems.is_empty(), "{problems:?}");
        assert_eq!(doc.type_params.len(), 1);
        assert_eq!(doc.type_params[0].name, "T");
        assert!(doc.params.is_empty());
    }

    #[test]
    fn param_without_name() {
        let (doc, problems) = parse("/**\n * @param\n */");
        assert_eq!(kinds(&problems), [ProblemKind::MissingParamName]);
        assert!(!doc.valid);
    }

    #[test]
    fn param_glued_to_tag_is_invalid() {
        let (_, problems) = parse("/**\n * @param: x\n */");
        assert_eq!(kinds(&problems), [ProblemKind::InvalidTag]);
    }

    #[test]
    fn method_reference_with_arguments() {
        let (doc, problems) = parse("/**\n * @see java.util.List#add(int, Object)\n */");
        assert!(problems.is_empty(), "{problems:?}");
        assert_eq!(doc.references.len(), 1);
        match &doc.references[0].reference {
            Reference::Method {
                receiver,
                name,
                arguments,
                ..
            } => {
                assert_eq!(receiver.as_ref().unwrap().qualified_name(), "java.util.List");
                assert_eq!(name, "add");
                let args = arguments.as_ref().unwrap();
                assert_eq!(args.len(), 2);
                assert!(args[0].type_ref.primitive);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mixed_named_and_unnamed_arguments_fail() {
        let (_, problems) = parse("/**\n * @see #m(int, int j)\n */");
        assert_eq!(kinds(&problems), [ProblemKind::InvalidSeeReferenceArgs]);
    }

    #[test]
    fn named_arguments_and_arrays() {
        let (doc, problems) = parse("/**\n * @see #m(String[] names, int... rest)\n */");
        assert!(problems.is_empty(), "{problems:?}");
        let Reference::Method { arguments, .. } = &doc.references[0].reference else {
            panic!("expected a method reference");
        };
        let args = arguments.as_ref().unwrap();
        assert_eq!(args[0].dimensions, 1);
        assert_eq!(args[0].name, "names");
        assert!(args[1].varargs);
    }

    #[test]
    fn empty_argument_list() {
        let (doc, problems) = parse("/**\n * @see #run()\n */");
        assert!(problems.is_empty(), "{problems:?}");
        assert!(matches!(
            &doc.references[0].reference,
            Reference::Method { arguments: None, name, .. } if name == "run"
        ));
    }

    #[test]
    fn field_reference() {
        let (doc, problems) = parse("/**\n * @see Foo#bar\n */");
        assert!(problems.is_empty(), "{problems:?}");
        assert_eq!(doc.references[0].reference.label(), "Foo#bar");
    }

    #[test]
    fn unterminated_inline_tag() {
        let (doc, problems) = parse("/**\n * {@link Foo\n */");
        assert_eq!(kinds(&problems), [ProblemKind::UnterminatedInlineTag]);
        assert!(!doc.valid);
    }

    #[test]
    fn inline_link_is_a_reference() {
        let (doc, problems) = parse("/** Use {@link Bar} instead. */");
        assert!(problems.is_empty(), "{problems:?}");
        assert_eq!(doc.references[0].tag, TagValue::Link);
        assert!(doc.tags[0].inline);
    }

    #[test]
    fn missing_hash_before_arguments() {
        let (_, problems) = parse("/**\n * @see Foo(int)\n */");
        assert_eq!(kinds(&problems), [ProblemKind::MissingHashCharacter]);
        assert_eq!(problems[0].argument.as_deref(), Some("Foo(int)"));
    }

    #[test]
    fn see_with_nothing() {
        let (_, problems) = parse("/**\n * @see\n */");
        assert_eq!(kinds(&problems), [ProblemKind::MissingReference]);
    }

    #[test]
    fn see_string_and_href() {
        let (doc, problems) = parse(
            "/**\n * @see \"The Book\"\n * @see <a href=\"http://x\">x</a>\n */",
        );
        assert!(problems.is_empty(), "{problems:?}");
        assert!(doc.valid);
        assert!(doc.references.is_empty());
    }

    #[test]
    fn broken_href() {
        let (_, problems) = parse("/**\n * @see <a href=\"http://x\">x\n */");
        assert_eq!(kinds(&problems), [ProblemKind::InvalidSeeUrlReference]);
    }

    #[test]
    fn value_tag_rejects_type_reference() {
        let (_, problems) = parse("/** {@value Foo} */");
        assert_eq!(kinds(&problems), [ProblemKind::InvalidReference]);
        let (doc, problems) = parse("/** {@value #MAX} */");
        assert!(problems.is_empty(), "{problems:?}");
        assert_eq!(doc.references[0].tag, TagValue::Value);
    }

    #[test]
    fn throws_and_ordering() {
        let (doc, problems) = parse("/**\n * @throws java.io.IOException on failure\n * @param x late\n */");
        assert_eq!(doc.throws[0].qualified_name(), "java.io.IOException");
        assert_eq!(kinds(&problems), [ProblemKind::UnexpectedTag]);

        let (_, problems) = parse("/**\n * @throws\n */");
        assert_eq!(kinds(&problems), [ProblemKind::MissingThrowsClassName]);
    }

    fn parse_keeping_stacks(text: &str) -> (Javadoc, Vec<Problem>, bool) {
        let source: Vec<char> = text.chars().collect();
        let end = text.chars().count() - 1;
        let mut parser = CommentParser::new(&source, Vec::new(), ParserOptions::default());
        let doc = parser.parse_comment(0, end);
        let consistent = parser.identifiers.is_consistent();
        (doc, parser.into_reporter(), consistent)
    }

    #[test]
    fn qualified_throws_name_keeps_each_segment() {
        let text = "/**\n * @throws com.example.Foo if bad\n */";
        let (doc, problems, consistent) = parse_keeping_stacks(text);
        assert!(problems.is_empty(), "{problems:?}");
        assert!(consistent);
        assert_eq!(doc.throws.len(), 1);
        let name = &doc.throws[0];
        assert_eq!(name.tokens, ["com", "example", "Foo"]);
        let at = text.find("com.example").expect("name in text");
        assert_eq!(
            name.positions,
            [
                Span::new(at, at + 2),
                Span::new(at + 4, at + 10),
                Span::new(at + 12, at + 14),
            ]
        );
        assert_eq!(name.qualified_name(), "com.example.Foo");
        assert_eq!(name.span(), Span::new(at, at + 14));
    }

    #[test]
    fn identifier_stack_stays_consistent_after_aborted_references() {
        for text in [
            "/**\n * @throws com.example.\n */",
            "/**\n * @param\n * @see java.util.List#add(int\n */",
            "/**\n * {@link a.b.C#m(String[] x, y)} @category\n */",
        ] {
            let (_, _, consistent) = parse_keeping_stacks(text);
            assert!(consistent, "{text}");
        }
        let (_, problems, consistent) = parse_keeping_stacks("/**\n * @see #m(int, int j)\n */");
        assert_eq!(kinds(&problems), [ProblemKind::InvalidSeeReferenceArgs]);
        assert!(consistent);
    }

    #[test]
    fn duplicated_return() {
        let (_, problems) = parse("/**\n * @return a\n * @return b\n */");
        assert_eq!(kinds(&problems), [ProblemKind::DuplicatedReturnTag]);
    }

    #[test]
    fn deprecated_and_categories() {
        let (doc, problems) = parse("/**\n * @deprecated use other\n * @category io net\n * @param x v\n */");
        assert!(problems.is_empty(), "{problems:?}");
        assert!(doc.deprecated);
        assert_eq!(doc.categories, ["io", "net"]);
        assert_eq!(doc.params.len(), 1);
    }

    #[test]
    fn inherit_doc_only_before_structural_tags() {
        let (doc, _) = parse("/** {@inheritDoc} */");
        assert!(doc.inherit_doc.is_some());
        let (doc, _) = parse("/**\n * @param x v\n * {@inheritDoc}\n */");
        assert!(doc.inherit_doc.is_none());
    }

    #[test]
    fn at_sign_inside_text_is_not_a_tag() {
        let (doc, problems) = parse("/** mail me at a@b.c */");
        assert!(problems.is_empty());
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn dom_kind_keeps_text() {
        let (doc, _) = parse_with("/**\n * Hello world.\n * @return x\n */", ParserOptions::dom());
        assert!(!doc.texts.is_empty());
        let first = doc.texts[0];
        let text: String = "/**\n * Hello world.\n * @return x\n */"
            .chars()
            .skip(first.start)
            .take(first.end - first.start + 1)
            .collect();
        assert_eq!(text, "Hello world.");
    }

    #[test]
    fn source_kind_counts_without_reporting() {
        let options = ParserOptions {
            kind: ParserKind::Source,
            ..ParserOptions::default()
        };
        let (doc, problems) = parse_with("/**\n * @category\n * @deprecated\n */", options);
        assert!(problems.is_empty());
        assert_eq!(doc.problem_count, 1);
        assert!(doc.deprecated);
    }

    #[test]
    fn problems_carry_declaration_modifiers() {
        let text = "/**\n * @param\n */";
        let source: Vec<char> = text.chars().collect();
        let mut parser = CommentParser::new(&source, Vec::new(), ParserOptions::default());
        parser.set_modifiers(Modifiers::PUBLIC);
        parser.parse_comment(0, source.len() - 1);
        assert_eq!(parser.reporter()[0].modifiers, Modifiers::PUBLIC);
    }
}
