//! Token scanner for documentation comments.
//!
//! Works on a `&[char]` buffer so that positions are absolute character
//! offsets into the original source. `\uXXXX` escapes are decoded while
//! scanning; the parser drives the scanner directly by position.

use super::InvalidInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Identifier,
    Void,
    Boolean,
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Dot,
    Ellipsis,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Less,
    LeftShift,
    Greater,
    Equal,
    Multiply,
    Divide,
    At,
    StringLiteral,
    NumberLiteral,
    Whitespace,
    Error,
    Eof,
}

impl Token {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Token::Void
                | Token::Boolean
                | Token::Byte
                | Token::Char
                | Token::Double
                | Token::Float
                | Token::Int
                | Token::Long
                | Token::Short
        )
    }
}

pub(crate) fn char_at(source: &[char], index: usize) -> char {
    source.get(index).copied().unwrap_or('\0')
}

/// Reads the character at `index`, resolving a unicode escape. Returns the
/// character and the index just past it. A malformed escape yields the
/// backslash itself and resumes right after it.
pub(crate) fn decode_char(source: &[char], index: usize) -> (char, usize) {
    let c = char_at(source, index);
    let next = index + 1;
    if c != '\\' || char_at(source, next) != 'u' {
        return (c, next);
    }
    let mut i = next + 1;
    while char_at(source, i) == 'u' {
        i += 1;
    }
    let mut value = 0u32;
    for offset in 0..4 {
        match char_at(source, i + offset).to_digit(16) {
            Some(d) => value = value * 16 + d,
            None => return ('\\', next),
        }
    }
    match char::from_u32(value) {
        Some(decoded) => (decoded, i + 4),
        None => ('\\', next),
    }
}

pub fn is_java_whitespace(c: char) -> bool {
    match c {
        ' ' | '\t' | '\n' | '\u{000B}' | '\u{000C}' | '\r' | '\u{001C}'..='\u{001F}' => true,
        '\u{00A0}' | '\u{2007}' | '\u{202F}' => false,
        _ => c.is_whitespace(),
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_numeric()
}

/// Offsets of line terminators; `\r\n` counts once, at the `\n`.
pub fn compute_line_ends(source: &[char]) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut i = 0;
    while i < source.len() {
        match source[i] {
            '\r' if source.get(i + 1) == Some(&'\n') => {
                ends.push(i + 1);
                i += 1;
            }
            '\r' | '\n' => ends.push(i),
            _ => {}
        }
        i += 1;
    }
    ends
}

#[derive(Debug)]
pub struct Scanner<'s> {
    source: &'s [char],
    line_ends: Vec<usize>,
    pub start_position: usize,
    pub current_position: usize,
    pub eof_position: usize,
    pub current_character: char,
    pub tokenize_white_space: bool,
    token_source: String,
}

impl<'s> Scanner<'s> {
    pub fn new(source: &'s [char]) -> Self {
        Self {
            source,
            line_ends: compute_line_ends(source),
            start_position: 0,
            current_position: 0,
            eof_position: source.len(),
            current_character: '\0',
            tokenize_white_space: false,
            token_source: String::new(),
        }
    }

    pub fn source(&self) -> &'s [char] {
        self.source
    }

    /// `end` is inclusive.
    pub fn reset_to(&mut self, begin: usize, end: usize) {
        self.start_position = begin;
        self.current_position = begin;
        self.eof_position = (end + 1).min(self.source.len());
        self.token_source.clear();
    }

    pub fn current_token_start(&self) -> usize {
        self.start_position
    }

    pub fn current_token_end(&self) -> usize {
        self.current_position.saturating_sub(1)
    }

    /// Decoded text of the last token (identifiers have escapes resolved).
    pub fn current_identifier_source(&self) -> &str {
        &self.token_source
    }

    /// Raw text of the last token as it appears in the buffer.
    pub fn current_token_source(&self) -> String {
        let end = self.current_position.min(self.source.len());
        self.source[self.start_position.min(end)..end].iter().collect()
    }

    /// End offset of a 1-based line; the last line ends at the scan limit.
    pub fn line_end(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        match self.line_ends.get(line - 1) {
            Some(&end) => end,
            None => self.eof_position,
        }
    }

    /// 1-based line containing `position`.
    pub fn line_number(&self, position: usize) -> usize {
        let ends = &self.line_ends;
        if ends.is_empty() {
            return 1;
        }
        let (mut g, mut d) = (0isize, ends.len() as isize - 1);
        let mut m = 0isize;
        while g <= d {
            m = (g + d) / 2;
            let end = ends[m as usize];
            if position < end {
                d = m - 1;
            } else if position > end {
                g = m + 1;
            } else {
                return m as usize + 1;
            }
        }
        if position < ends[m as usize] {
            m as usize + 1
        } else {
            m as usize + 2
        }
    }

    fn peek(&self) -> Option<(char, usize)> {
        if self.current_position >= self.eof_position {
            return None;
        }
        Some(decode_char(self.source, self.current_position))
    }

    fn advance(&mut self) -> Option<char> {
        let (c, next) = self.peek()?;
        self.current_position = next;
        self.current_character = c;
        Some(c)
    }

    pub fn get_next_token(&mut self) -> Result<Token, InvalidInput> {
        self.token_source.clear();

        if let Some((c, _)) = self.peek()
            && is_java_whitespace(c)
        {
            self.start_position = self.current_position;
            while let Some((c, next)) = self.peek() {
                if !is_java_whitespace(c) {
                    break;
                }
                self.current_position = next;
                self.current_character = c;
            }
            if self.tokenize_white_space {
                return Ok(Token::Whitespace);
            }
        }

        self.start_position = self.current_position;
        let Some(c) = self.advance() else {
            return Ok(Token::Eof);
        };
        self.token_source.push(c);

        if is_identifier_start(c) {
            while let Some((c, next)) = self.peek() {
                self.current_character = c;
                if !is_identifier_part(c) {
                    break;
                }
                self.current_position = next;
                self.token_source.push(c);
            }
            return Ok(keyword(&self.token_source).unwrap_or(Token::Identifier));
        }

        if c.is_ascii_digit() {
            while let Some((c, next)) = self.peek() {
                if !(is_identifier_part(c) || c == '.') {
                    break;
                }
                self.current_position = next;
                self.token_source.push(c);
            }
            return Ok(Token::NumberLiteral);
        }

        let token = match c {
            '.' => {
                let rest = (
                    char_at(self.source, self.current_position),
                    char_at(self.source, self.current_position + 1),
                );
                if rest == ('.', '.') && self.current_position + 2 <= self.eof_position {
                    self.current_position += 2;
                    self.token_source.push_str("..");
                    Token::Ellipsis
                } else {
                    Token::Dot
                }
            }
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '<' => {
                if let Some(('<', next)) = self.peek() {
                    self.current_position = next;
                    self.token_source.push('<');
                    Token::LeftShift
                } else {
                    Token::Less
                }
            }
            '>' => Token::Greater,
            '=' => Token::Equal,
            '*' => Token::Multiply,
            '/' => Token::Divide,
            '@' => Token::At,
            '"' => return self.scan_string(),
            _ => Token::Error,
        };
        Ok(token)
    }

    fn scan_string(&mut self) -> Result<Token, InvalidInput> {
        loop {
            let Some(c) = self.advance() else {
                return Err(InvalidInput);
            };
            match c {
                '"' => {
                    self.token_source.push(c);
                    return Ok(Token::StringLiteral);
                }
                '\r' | '\n' => {
                    self.current_position -= 1;
                    return Err(InvalidInput);
                }
                '\\' => {
                    self.token_source.push(c);
                    if let Some(escaped) = self.advance() {
                        self.token_source.push(escaped);
                    }
                }
                _ => self.token_source.push(c),
            }
        }
    }
}

fn keyword(ident: &str) -> Option<Token> {
    Some(match ident {
        "void" => Token::Void,
        "boolean" => Token::Boolean,
        "byte" => Token::Byte,
        "char" => Token::Char,
        "double" => Token::Double,
        "float" => Token::Float,
        "int" => Token::Int,
        "long" => Token::Long,
        "short" => Token::Short,
        _ => return None,
    })
}
