//! Name to arity mapping that drives parsing.
//!
//! Builtin arities come from the builtin registry and can never change. User
//! arities are registered from `fn` headers; a name keeps the arity it was
//! first registered with for the lifetime of the table.

use std::collections::HashMap;

use crate::builtinops::find_builtin_op;
use crate::lexer::Position;
use crate::{ParseError, ParseErrorKind};

/// Words with fixed meaning that can name neither functions nor parameters
pub const KEYWORDS: [&str; 5] = ["fn", "is", "true", "false", "null"];

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArityTable {
    user: HashMap<String, usize>,
}

impl ArityTable {
    pub fn new() -> Self {
        ArityTable::default()
    }

    /// Arity of a builtin or registered function
    pub fn lookup(&self, name: &str) -> Option<usize> {
        find_builtin_op(name)
            .map(|op| op.arity)
            .or_else(|| self.user.get(name).copied())
    }

    /// Record `name -> arity` for a user definition.
    ///
    /// Re-registering an existing name with the same arity is allowed.
    pub fn register(
        &mut self,
        name: &str,
        arity: usize,
        position: Position,
    ) -> Result<(), ParseError> {
        if is_keyword(name) || find_builtin_op(name).is_some() {
            return Err(ParseError::new(
                ParseErrorKind::ReservedName,
                format!("'{name}' is reserved and cannot be defined"),
            )
            .at(position)
            .with_found(name));
        }

        match self.user.get(name) {
            Some(&existing) if existing != arity => Err(ParseError::new(
                ParseErrorKind::ArityConflict,
                format!("'{name}' was defined with {existing} parameters, redefined with {arity}"),
            )
            .at(position)
            .with_found(name)),
            Some(_) => Ok(()),
            None => {
                self.user.insert(name.to_owned(), arity);
                Ok(())
            }
        }
    }
}
