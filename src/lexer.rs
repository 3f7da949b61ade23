//! Tokenizer for Atto source text.
//!
//! Tokens are separated by whitespace. A quoted run is a single string token,
//! `#` starts a comment that runs to the end of the line, and every other run is
//! classified as a number, a symbol (punctuation only) or an identifier.

use std::fmt;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_till1},
    character::complete::{char, digit0, multispace1, one_of},
    combinator::{all_consuming, recognize},
    error::ErrorKind,
    multi::many0_count,
    sequence::{pair, preceded},
};

use crate::{ParseError, ParseErrorKind};

/// A 1-based line and column in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }

    fn advance(&mut self, consumed: &str) {
        for ch in consumed.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text; for strings this is the decoded contents without quotes
    pub text: String,
    pub position: Position,
}

impl Token {
    /// True for a bare (unquoted) token spelling `word`
    pub fn is_word(&self, word: &str) -> bool {
        self.kind != TokenKind::String && self.text == word
    }
}

/// Whitespace and comments between tokens
fn trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((
        multispace1,
        recognize(preceded(char('#'), take_till(|c: char| c == '\n'))),
    )))
    .parse(input)
}

/// A run of non-whitespace characters that is not a string or comment
fn word(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace() || c == '"' || c == '#').parse(input)
}

/// `0` or a non-zero digit followed by any digits
fn decimal(input: &str) -> IResult<&str, &str> {
    alt((recognize(pair(one_of("123456789"), digit0)), tag("0"))).parse(input)
}

/// Parse a string literal, decoding escape sequences
fn string_literal(input: &str) -> IResult<&str, String> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut text = String::new();

    loop {
        let mut chars = remaining.chars();
        match chars.next() {
            Some('"') => return Ok((chars.as_str(), text)),
            Some('\\') => {
                match chars.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    Some(_) => {
                        return Err(nom::Err::Failure(nom::error::Error::new(
                            remaining,
                            ErrorKind::Escaped,
                        )));
                    }
                    None => {
                        return Err(nom::Err::Failure(nom::error::Error::new(
                            remaining,
                            ErrorKind::Eof,
                        )));
                    }
                }
                remaining = chars.as_str();
            }
            Some(ch) => {
                text.push(ch);
                remaining = chars.as_str();
            }
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    remaining,
                    ErrorKind::Eof,
                )));
            }
        }
    }
}

fn classify(text: &str) -> Result<TokenKind, &'static str> {
    if text.starts_with(|c: char| c.is_ascii_digit()) {
        if all_consuming(decimal).parse(text).is_err() {
            return Err("malformed number literal");
        }
        if text.parse::<i64>().is_err() {
            return Err("number literal out of range");
        }
        Ok(TokenKind::Number)
    } else if text.chars().all(|c| c.is_ascii_punctuation()) {
        Ok(TokenKind::Symbol)
    } else {
        Ok(TokenKind::Identifier)
    }
}

/// Lazy token stream over a source text.
///
/// Yields at most one error, after which the stream ends.
pub struct Lexer<'a> {
    rest: &'a str,
    position: Position,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            rest: source,
            position: Position::default(),
            failed: false,
        }
    }

    fn consume(&mut self, remaining: &'a str) {
        let used = &self.rest[..self.rest.len() - remaining.len()];
        self.position.advance(used);
        self.rest = remaining;
    }

    fn string_error(&self, start: Position, error: nom::error::Error<&str>) -> ParseError {
        match error.code {
            ErrorKind::Escaped => {
                let mut at = self.position;
                at.advance(&self.rest[..self.rest.len() - error.input.len()]);
                let found: String = error.input.chars().take(2).collect();
                ParseError::new(ParseErrorKind::Lex, "unknown escape sequence")
                    .at(at)
                    .with_found(found)
            }
            _ => ParseError::new(ParseErrorKind::Lex, "unterminated string literal").at(start),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        if let Ok((rest, _)) = trivia(self.rest) {
            self.consume(rest);
        }
        if self.rest.is_empty() {
            return Ok(None);
        }

        let start = self.position;
        let token = if self.rest.starts_with('"') {
            match string_literal(self.rest) {
                Ok((rest, text)) => {
                    self.consume(rest);
                    Token {
                        kind: TokenKind::String,
                        text,
                        position: start,
                    }
                }
                Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                    return Err(self.string_error(start, e));
                }
                Err(nom::Err::Incomplete(_)) => {
                    return Err(
                        ParseError::new(ParseErrorKind::Lex, "unterminated string literal")
                            .at(start),
                    );
                }
            }
        } else {
            let (rest, text) = word(self.rest).map_err(|_| {
                ParseError::new(ParseErrorKind::Lex, "unexpected character").at(start)
            })?;
            let kind = classify(text).map_err(|message| {
                ParseError::new(ParseErrorKind::Lex, message)
                    .at(start)
                    .with_found(text)
            })?;
            self.consume(rest);
            Token {
                kind,
                text: text.to_owned(),
                position: start,
            }
        };

        if let Some(next) = self.rest.chars().next()
            && !next.is_whitespace()
            && next != '#'
        {
            return Err(ParseError::new(
                ParseErrorKind::Lex,
                "tokens must be separated by whitespace",
            )
            .at(self.position)
            .with_found(next.to_string()));
        }

        Ok(Some(token))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Split source text into its full token sequence.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).collect()
}
