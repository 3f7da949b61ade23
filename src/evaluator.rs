//! Tree-walking evaluator running on an explicit work stack.
//!
//! Instead of recursing through `eval` for every sub-expression, evaluation is
//! driven by three heap stacks:
//!
//! - a work stack of pending steps (evaluate an expression, apply a builtin,
//!   enter or leave a function, pick an `if` branch)
//! - a value stack holding results of evaluated sub-expressions
//! - a frame stack with the arguments of every active call
//!
//! Program recursion therefore consumes heap, never native stack. A call whose
//! continuation is nothing but leaving the current function reuses the current
//! frame, so tail recursion runs in constant frame space.

use std::rc::Rc;

use log::trace;

use crate::ast::{Expr, FunctionDef, Program};
use crate::builtinops::BuiltinOp;
use crate::console::Console;
use crate::lexer::Position;
use crate::value::Value;
use crate::{EvalError, EvalErrorKind};

/// Arguments of one active call
#[derive(Debug)]
struct Frame<'a> {
    name: &'a str,
    args: Vec<Value>,
}

#[derive(Debug)]
enum Work<'a> {
    Eval(&'a Expr),
    /// Apply a builtin to the values on top of the value stack
    Apply {
        op: &'static BuiltinOp,
        position: Position,
    },
    /// Bind the values on top of the value stack and run the function body
    Enter {
        def: &'a FunctionDef,
        position: Position,
    },
    /// Continue with one branch depending on the condition on the value stack
    Branch {
        then: &'a Expr,
        otherwise: &'a Expr,
        position: Position,
    },
    /// Discard the current frame once its body has produced a value
    Leave,
}

/// Evaluates expressions against an immutable program snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    program: &'a Program,
    max_call_depth: Option<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(program: &'a Program) -> Self {
        Evaluator {
            program,
            max_call_depth: None,
        }
    }

    /// Limit the number of simultaneously active (non-tail) calls
    pub fn with_max_call_depth(mut self, limit: Option<usize>) -> Self {
        self.max_call_depth = limit;
        self
    }

    /// Call `def` with already evaluated arguments, one per parameter.
    pub fn call(
        &self,
        def: &'a FunctionDef,
        args: Vec<Value>,
        console: &mut dyn Console,
    ) -> Result<Value, EvalError> {
        if args.len() != def.arity() {
            return Err(EvalError::new(
                EvalErrorKind::TypeMismatch,
                &def.name,
                format!("expected {} arguments, got {}", def.arity(), args.len()),
            )
            .at(def.position));
        }
        let frame = Frame {
            name: &def.name,
            args,
        };
        Machine::new(*self, frame, &def.body).run(console)
    }

    /// Evaluate a stand-alone expression with no parameters in scope.
    pub fn eval(&self, expr: &'a Expr, console: &mut dyn Console) -> Result<Value, EvalError> {
        let frame = Frame {
            name: "<expression>",
            args: Vec::new(),
        };
        Machine::new(*self, frame, expr).run(console)
    }
}

/// State of one evaluation
struct Machine<'a> {
    evaluator: Evaluator<'a>,
    work: Vec<Work<'a>>,
    values: Vec<Value>,
    frames: Vec<Frame<'a>>,
}

impl<'a> Machine<'a> {
    fn new(evaluator: Evaluator<'a>, frame: Frame<'a>, body: &'a Expr) -> Self {
        Machine {
            evaluator,
            work: vec![Work::Leave, Work::Eval(body)],
            values: Vec::new(),
            frames: vec![frame],
        }
    }

    fn run(mut self, console: &mut dyn Console) -> Result<Value, EvalError> {
        while let Some(work) = self.work.pop() {
            match work {
                Work::Eval(expr) => self.eval(expr)?,
                Work::Apply { op, position } => {
                    let args = self.take_values(op.arity);
                    let result = op.apply(&args, console).map_err(|e| e.or_at(Some(position)))?;
                    self.values.push(result);
                }
                Work::Enter { def, position } => self.enter(def, position)?,
                Work::Branch {
                    then,
                    otherwise,
                    position,
                } => match self.values.pop() {
                    Some(Value::Bool(true)) => self.work.push(Work::Eval(then)),
                    Some(Value::Bool(false)) => self.work.push(Work::Eval(otherwise)),
                    other => {
                        let got = other.as_ref().map_or("nothing", Value::type_name);
                        return Err(EvalError::new(
                            EvalErrorKind::TypeMismatch,
                            "if",
                            format!("condition must be a bool, got {got}"),
                        )
                        .at(position));
                    }
                },
                Work::Leave => {
                    self.frames.pop();
                }
            }
        }
        Ok(self.values.pop().unwrap_or_default())
    }

    fn take_values(&mut self, count: usize) -> Vec<Value> {
        let start = self.values.len().saturating_sub(count);
        self.values.split_off(start)
    }

    fn eval(&mut self, expr: &'a Expr) -> Result<(), EvalError> {
        match expr {
            Expr::Literal(value) => self.values.push(value.clone()),
            Expr::Variable { name, slot } => {
                let value = self
                    .frames
                    .last()
                    .and_then(|frame| frame.args.get(*slot))
                    .ok_or_else(|| {
                        EvalError::new(
                            EvalErrorKind::UnboundVariable,
                            name,
                            format!("'{name}' is not bound in this call"),
                        )
                    })?;
                self.values.push(value.clone());
            }
            Expr::Builtin { op, args, position } => {
                if op.is_special_form() {
                    // `if` is the only special form: condition first, then one branch
                    let [condition, then, otherwise] = args.as_slice() else {
                        return Err(EvalError::new(
                            EvalErrorKind::TypeMismatch,
                            op.id,
                            format!("expected {} arguments, got {}", op.arity, args.len()),
                        )
                        .at(*position));
                    };
                    self.work.push(Work::Branch {
                        then,
                        otherwise,
                        position: *position,
                    });
                    self.work.push(Work::Eval(condition));
                } else {
                    self.work.push(Work::Apply {
                        op: *op,
                        position: *position,
                    });
                    self.push_args(args);
                }
            }
            Expr::Call {
                name,
                args,
                position,
            } => {
                let program = self.evaluator.program;
                let def = program.get(name).map(Rc::as_ref).ok_or_else(|| {
                    EvalError::new(
                        EvalErrorKind::UnknownFunction,
                        name,
                        format!("no function named '{name}' is defined"),
                    )
                    .at(*position)
                })?;
                self.work.push(Work::Enter {
                    def,
                    position: *position,
                });
                self.push_args(args);
            }
        }
        Ok(())
    }

    /// Schedule arguments so that they evaluate left to right
    fn push_args(&mut self, args: &'a [Expr]) {
        self.work.extend(args.iter().rev().map(Work::Eval));
    }

    fn enter(&mut self, def: &'a FunctionDef, position: Position) -> Result<(), EvalError> {
        let args = self.take_values(def.arity());
        let frame = Frame {
            name: &def.name,
            args,
        };

        if matches!(self.work.last(), Some(Work::Leave)) {
            // Tail call: nothing of the caller remains to run
            trace!("tail call {} at {position}", def.name);
            if let Some(current) = self.frames.last_mut() {
                *current = frame;
            }
        } else {
            if let Some(limit) = self.evaluator.max_call_depth
                && self.frames.len() >= limit
            {
                return Err(EvalError::new(
                    EvalErrorKind::RecursionLimit,
                    &def.name,
                    format!("call depth limit of {limit} exceeded"),
                )
                .at(position));
            }
            trace!(
                "call {} at {position} from {} (depth {})",
                def.name,
                self.frames.last().map_or("?", |f| f.name),
                self.frames.len()
            );
            self.frames.push(frame);
            self.work.push(Work::Leave);
        }

        self.work.push(Work::Eval(&def.body));
        Ok(())
    }
}
