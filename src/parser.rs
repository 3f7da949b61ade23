//! Arity-driven parser.
//!
//! Source has no delimiters, so the extent of every expression follows from
//! arities alone: a name with arity `k` owns the next `k` complete expressions.
//! Parsing a source text takes two passes over its tokens:
//!
//! 1. Every `fn name params is` header is scanned and its arity registered, so
//!    bodies can call functions defined later in the text (or themselves)
//! 2. Each definition's body is parsed as exactly one expression
//!
//! Expression parsing keeps its pending calls on a heap stack, so nesting depth
//! is limited by memory rather than by the native call stack.

use std::rc::Rc;

use log::debug;

use crate::arity::{ArityTable, is_keyword};
use crate::ast::{Expr, FunctionDef};
use crate::builtinops::{BuiltinOp, find_builtin_op};
use crate::lexer::{Position, Token, TokenKind, tokenize};
use crate::value::{NumberType, Value};
use crate::{ParseError, ParseErrorKind};

/// Definitions parsed from one source text, with the arity table extended by
/// their headers. Nothing is registered anywhere until the caller commits it.
#[derive(Debug)]
pub struct ParsedSource {
    pub definitions: Vec<FunctionDef>,
    pub arities: ArityTable,
}

/// Parse a sequence of `fn` definitions on top of the arities already known.
pub fn parse_source(source: &str, arities: &ArityTable) -> Result<ParsedSource, ParseError> {
    let tokens = tokenize(source)?;
    let mut arities = arities.clone();

    let mut scanner = Parser::new(&tokens);
    scanner.scan_headers(&mut arities)?;

    let mut parser = Parser::new(&tokens);
    let mut definitions = Vec::new();
    while let Some(header) = parser.header()? {
        let body = parser.expression(&header.params, &arities, header.body_position)?;
        if let Some(token) = parser.peek()
            && !token.is_word("fn")
        {
            return Err(unexpected(
                token,
                format!("'{}' already has a complete body", header.name),
            ));
        }
        definitions.push(FunctionDef {
            name: header.name,
            params: header.params,
            body,
            position: header.position,
        });
    }

    debug!("parsed {} definitions from {} tokens", definitions.len(), tokens.len());
    Ok(ParsedSource {
        definitions,
        arities,
    })
}

/// Parse a single stand-alone expression with no parameters in scope.
pub fn parse_expression(source: &str, arities: &ArityTable) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.expression(&[], arities, Position::default())?;
    if let Some(token) = parser.next() {
        return Err(unexpected(token, "expected end of input after the expression"));
    }
    Ok(expr)
}

fn unexpected(token: &Token, message: impl Into<String>) -> ParseError {
    ParseError::new(ParseErrorKind::UnexpectedToken, message)
        .at(token.position)
        .with_found(token.text.as_str())
}

fn end_of_expression(position: Position, message: impl Into<String>) -> ParseError {
    ParseError::new(ParseErrorKind::UnexpectedEndOfExpression, message).at(position)
}

struct Header {
    name: String,
    params: Vec<String>,
    /// Position of `fn`
    position: Position,
    name_position: Position,
    /// Position of `is`
    body_position: Position,
}

#[derive(Debug, Clone)]
enum Callee {
    Builtin(&'static BuiltinOp),
    Function(Rc<str>),
}

/// A call whose arguments are still being parsed
struct PendingCall<'t> {
    callee: Callee,
    arity: usize,
    args: Vec<Expr>,
    token: &'t Token,
}

impl PendingCall<'_> {
    fn finish(self) -> Expr {
        let position = self.token.position;
        match self.callee {
            Callee::Builtin(op) => Expr::Builtin {
                op,
                args: self.args,
                position,
            },
            Callee::Function(name) => Expr::Call {
                name,
                args: self.args,
                position,
            },
        }
    }
}

/// Result of reading one token in expression position
enum Step<'t> {
    Complete(Expr),
    Call(PendingCall<'t>),
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn scan_headers(&mut self, arities: &mut ArityTable) -> Result<(), ParseError> {
        while let Some(header) = self.header()? {
            arities.register(&header.name, header.params.len(), header.name_position)?;
            while let Some(token) = self.peek()
                && !token.is_word("fn")
            {
                self.pos += 1;
            }
        }
        Ok(())
    }

    /// Parse `fn name params is`, or return `None` at the end of input
    fn header(&mut self) -> Result<Option<Header>, ParseError> {
        let Some(fn_token) = self.next() else {
            return Ok(None);
        };
        if !fn_token.is_word("fn") {
            return Err(unexpected(fn_token, "expected 'fn' to start a definition"));
        }

        let name_token = self.next().ok_or_else(|| {
            end_of_expression(fn_token.position, "definition is missing its name")
        })?;
        if matches!(name_token.kind, TokenKind::Number | TokenKind::String) {
            return Err(unexpected(name_token, "function name must be an identifier or symbol"));
        }
        let name = name_token.text.clone();

        let mut params: Vec<String> = Vec::new();
        let body_position = loop {
            let token = self.next().ok_or_else(|| {
                end_of_expression(name_token.position, format!("header of '{name}' is missing 'is'"))
            })?;
            if token.is_word("is") {
                break token.position;
            }
            if token.is_word("fn") {
                return Err(unexpected(token, format!("header of '{name}' is missing 'is'")));
            }
            if matches!(token.kind, TokenKind::Number | TokenKind::String) {
                return Err(unexpected(token, "parameter name must be an identifier or symbol"));
            }
            if is_keyword(&token.text) {
                return Err(ParseError::new(
                    ParseErrorKind::ReservedName,
                    format!("'{}' cannot be used as a parameter name", token.text),
                )
                .at(token.position)
                .with_found(token.text.as_str()));
            }
            if params.contains(&token.text) {
                return Err(ParseError::new(
                    ParseErrorKind::DuplicateParameter,
                    format!("parameter '{}' appears twice in '{name}'", token.text),
                )
                .at(token.position)
                .with_found(token.text.as_str()));
            }
            params.push(token.text.clone());
        };

        Ok(Some(Header {
            name,
            params,
            position: fn_token.position,
            name_position: name_token.position,
            body_position,
        }))
    }

    /// Parse exactly one expression.
    ///
    /// `start` locates the error when no expression is present at all.
    fn expression(
        &mut self,
        params: &[String],
        arities: &ArityTable,
        start: Position,
    ) -> Result<Expr, ParseError> {
        let mut pending: Vec<PendingCall<'t>> = Vec::new();

        'tokens: loop {
            let token = match self.peek() {
                Some(token) if !token.is_word("fn") => token,
                _ => {
                    return Err(match pending.last() {
                        Some(call) => end_of_expression(
                            call.token.position,
                            format!(
                                "'{}' expects {} arguments but got {}",
                                call.token.text,
                                call.arity,
                                call.args.len()
                            ),
                        )
                        .with_found(call.token.text.as_str()),
                        None => end_of_expression(start, "expected an expression"),
                    });
                }
            };
            self.pos += 1;

            let mut done = match self.step(token, params, arities)? {
                Step::Complete(expr) => expr,
                Step::Call(call) if call.arity == 0 => call.finish(),
                Step::Call(call) => {
                    pending.push(call);
                    continue;
                }
            };

            while let Some(mut call) = pending.pop() {
                call.args.push(done);
                if call.args.len() < call.arity {
                    pending.push(call);
                    continue 'tokens;
                }
                done = call.finish();
            }
            return Ok(done);
        }
    }

    fn step(
        &self,
        token: &'t Token,
        params: &[String],
        arities: &ArityTable,
    ) -> Result<Step<'t>, ParseError> {
        let text = token.text.as_str();
        let literal = |value| Ok(Step::Complete(Expr::Literal(value)));

        match token.kind {
            TokenKind::String => literal(Value::String(token.text.clone())),
            TokenKind::Number => match text.parse::<NumberType>() {
                Ok(n) => literal(Value::Number(n)),
                Err(_) => Err(ParseError::new(ParseErrorKind::Lex, "number literal out of range")
                    .at(token.position)
                    .with_found(text)),
            },
            TokenKind::Identifier | TokenKind::Symbol => match text {
                "true" => literal(Value::Bool(true)),
                "false" => literal(Value::Bool(false)),
                "null" => literal(Value::Null),
                "is" => Err(unexpected(token, "'is' is only allowed in a definition header")),
                name => {
                    if let Some(slot) = params.iter().position(|p| p == name) {
                        return Ok(Step::Complete(Expr::Variable {
                            name: name.to_owned(),
                            slot,
                        }));
                    }
                    let (callee, arity) = if let Some(op) = find_builtin_op(name) {
                        (Callee::Builtin(op), op.arity)
                    } else if let Some(arity) = arities.lookup(name) {
                        (Callee::Function(Rc::from(name)), arity)
                    } else {
                        return Err(ParseError::new(
                            ParseErrorKind::UnknownFunction,
                            format!("unknown function '{name}'"),
                        )
                        .at(token.position)
                        .with_found(name));
                    };
                    Ok(Step::Call(PendingCall {
                        callee,
                        arity,
                        args: Vec::with_capacity(arity),
                        token,
                    }))
                }
            },
        }
    }
}
