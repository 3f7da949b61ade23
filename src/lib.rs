//! Atto - an interpreter for a delimiter-free prefix language
//!
//! Atto programs are flat sequences of whitespace separated tokens. There are no
//! parentheses, commas or block markers: every name has a fixed arity, and the
//! parser works out where each sub-expression ends by consuming exactly as many
//! child expressions as the name demands.
//!
//! ```text
//! # Sum the numbers of a list
//! fn sum l is
//!     if = null l
//!         0
//!         + head l sum tail l
//!
//! fn main is
//!     print sum fuse 1 fuse 2 3
//! ```
//!
//! ## Evaluation
//!
//! - Builtins and user functions evaluate their arguments strictly, left to right
//! - `if` evaluates its condition and then exactly one branch, which is what lets
//!   recursion terminate
//! - Recursion is the only loop; the evaluator runs on an explicit work stack so
//!   recursion depth is bounded by memory rather than by the host stack
//!
//! ## Modules
//!
//! - `lexer`: source text to tokens
//! - `arity`: the name to arity table that drives parsing
//! - `parser`: arity-driven construction of function definitions
//! - `evaluator`: trampolined tree-walking evaluation
//! - `builtinops`: registry of native operations
//! - `value`: runtime values, equality and rendering
//! - `prelude`: library of ordinary definitions loaded before user code
//! - `console`: the injected line-based I/O capability
//! - `interpreter`: session holding the function registry

use std::fmt;

pub mod arity;
pub mod ast;
pub mod builtinops;
pub mod console;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod prelude;
pub mod value;

pub use console::{Console, ScriptedConsole, StdConsole};
pub use interpreter::{Config, Interpreter};
pub use lexer::Position;
pub use value::Value;

/// Name of the function a program run starts from
pub const ENTRY_POINT: &str = "main";

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Malformed literal (unterminated string, bad escape, bad number)
    Lex,
    /// A call names something that is neither a parameter, a builtin nor a definition
    UnknownFunction,
    /// The token stream ran out before a call received all of its arguments
    UnexpectedEndOfExpression,
    /// A redefinition changes the established arity of a name
    ArityConflict,
    /// Attempt to define a keyword or builtin
    ReservedName,
    /// The same parameter name appears twice in one definition
    DuplicateParameter,
    /// A token appeared where the grammar does not allow it
    UnexpectedToken,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ParseErrorKind::Lex => "LexError",
            ParseErrorKind::UnknownFunction => "UnknownFunction",
            ParseErrorKind::UnexpectedEndOfExpression => "UnexpectedEndOfExpression",
            ParseErrorKind::ArityConflict => "ArityConflict",
            ParseErrorKind::ReservedName => "ReservedName",
            ParseErrorKind::DuplicateParameter => "DuplicateParameter",
            ParseErrorKind::UnexpectedToken => "UnexpectedToken",
        };
        f.write_str(name)
    }
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Where the offending token starts, if there is one
    pub position: Option<Position>,
    /// The problematic token text, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    /// Create a ParseError with a kind and message but no location
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            position: None,
            found: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }
}

/// Categorizes runtime failures.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EvalErrorKind {
    UnboundVariable,
    /// A call reached a name with no definition in the program
    UnknownFunction,
    TypeMismatch,
    DivisionByZero,
    EmptyList,
    /// Integer overflow in arithmetic
    Overflow,
    /// The configured call depth limit was exceeded
    RecursionLimit,
    /// The console failed to read or write
    Io,
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EvalErrorKind::UnboundVariable => "UnboundVariable",
            EvalErrorKind::UnknownFunction => "UnknownFunction",
            EvalErrorKind::TypeMismatch => "TypeMismatch",
            EvalErrorKind::DivisionByZero => "DivisionByZero",
            EvalErrorKind::EmptyList => "EmptyList",
            EvalErrorKind::Overflow => "Overflow",
            EvalErrorKind::RecursionLimit => "RecursionLimit",
            EvalErrorKind::Io => "Io",
        };
        f.write_str(name)
    }
}

/// A runtime failure, naming the innermost operation that failed.
#[derive(Debug, PartialEq, Clone)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Builtin or function name that failed
    pub operation: String,
    pub message: String,
    /// Call site of the failing operation
    pub position: Option<Position>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, operation: &str, message: impl Into<String>) -> Self {
        EvalError {
            kind,
            operation: operation.to_owned(),
            message: message.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach a position unless a more precise one is already recorded
    pub(crate) fn or_at(mut self, position: Option<Position>) -> Self {
        if self.position.is_none() {
            self.position = position;
        }
        self
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError(ParseError),
    EvalError(EvalError),
    /// The program has no definition for the requested entry point
    MissingEntry(String),
    /// The entry point was invoked with the wrong number of arguments
    EntryArity {
        name: String,
        expected: usize,
        got: usize,
    },
}

impl Error {
    /// The parse error category, if this is a parse error
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            Error::ParseError(e) => Some(e.kind),
            _ => None,
        }
    }

    /// The runtime error category, if this is a runtime error
    pub fn eval_kind(&self) -> Option<EvalErrorKind> {
        match self {
            Error::EvalError(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::ParseError(e)
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Error::EvalError(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "{}: {}", e.kind, e.message)?;
                if let Some(found) = &e.found {
                    write!(f, " (found '{found}')")?;
                }
                if let Some(position) = e.position {
                    write!(f, " at {position}")?;
                }
                Ok(())
            }
            Error::EvalError(e) => {
                write!(f, "{} in '{}': {}", e.kind, e.operation, e.message)?;
                if let Some(position) = e.position {
                    write!(f, " at {position}")?;
                }
                Ok(())
            }
            Error::MissingEntry(name) => write!(f, "MissingEntry: no function named '{name}'"),
            Error::EntryArity {
                name,
                expected,
                got,
            } => write!(
                f,
                "EntryArity: '{name}' expects {expected} arguments but got {got}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Load `source` on top of the prelude and run its `main` with no arguments.
pub fn run(source: &str, console: &mut dyn Console) -> Result<Value, Error> {
    let mut interpreter = Interpreter::new()?;
    interpreter.load(source)?;
    interpreter.run_main(Vec::new(), console)
}
