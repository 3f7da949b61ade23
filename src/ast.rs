//! Syntax tree produced by the parser and walked by the evaluator.
//!
//! Every call node holds exactly as many children as its callee's arity.
//! Calls to user functions refer to their callee by name and are resolved
//! against the [`Program`] when they run, so the last definition of a name
//! serves every call site, including those that appear before it.

use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use crate::builtinops::BuiltinOp;
use crate::lexer::Position;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A parameter of the enclosing definition, by position
    Variable { name: String, slot: usize },
    Builtin {
        op: &'static BuiltinOp,
        args: Vec<Expr>,
        position: Position,
    },
    Call {
        name: Rc<str>,
        args: Vec<Expr>,
        position: Position,
    },
}

impl Expr {
    /// Child expressions, empty for leaves
    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::Builtin { args, .. } | Expr::Call { args, .. } => args,
            Expr::Literal(_) | Expr::Variable { .. } => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Expr>> {
        match self {
            Expr::Builtin { args, .. } | Expr::Call { args, .. } => Some(args),
            Expr::Literal(_) | Expr::Variable { .. } => None,
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let Some(args) = self.children_mut() else {
            return;
        };
        if args.iter().all(|arg| arg.children().is_empty()) {
            return;
        }
        // Deeply nested bodies (long `fuse` chains) are torn down iteratively
        let mut pending = mem::take(args);
        while let Some(mut expr) = pending.pop() {
            if let Some(args) = expr.children_mut() {
                pending.append(args);
            }
        }
    }
}

/// A user function: `fn name params is body`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    /// Position of the defining `fn`
    pub position: Position,
}

impl FunctionDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Immutable snapshot of the function registry used by one evaluation
#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: HashMap<String, Rc<FunctionDef>>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn get(&self, name: &str) -> Option<&Rc<FunctionDef>> {
        self.functions.get(name)
    }

    /// Add or replace a definition, returning the one it replaced
    pub fn define(&mut self, def: FunctionDef) -> Option<Rc<FunctionDef>> {
        self.functions.insert(def.name.clone(), Rc::new(def))
    }

    /// Defined function names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
