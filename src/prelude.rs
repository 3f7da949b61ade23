//! Library of ordinary Atto definitions loaded ahead of user code.
//!
//! The prelude goes through the same lexer and parser as any program, so it
//! obeys the same rules: a program may redefine any prelude function as long
//! as the arity stays the same, and the redefinition then serves every call
//! site, including the ones inside the prelude itself.

/// Source text of the prelude
pub const PRELUDE: &str = include_str!("prelude.at");
