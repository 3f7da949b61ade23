//! Built-in operations registry.
//!
//! Every builtin has a fixed arity, which the parser uses to decide how many
//! of the following expressions belong to a call.
//!
//! ```text
//! + 5 7              # 12
//! fuse 1 pair 2 3    # [1, 2, 3]
//! if < 1 2 "yes" "no"
//! ```
//!
//! ## Functions vs Special Forms
//!
//! - **Functions**: Evaluate all arguments left to right before application
//!   (e.g., `+`, `head`, `fuse`)
//! - **Effects**: Functions that additionally need the console (`input`, `print`)
//! - **Special Forms**: Control evaluation of their arguments (`if`); the
//!   evaluator handles them directly
//!
//! ## Error Handling
//!
//! Operations are strict about types. Numbers never become strings, there is
//! no truthiness, and arithmetic reports overflow instead of wrapping. Every
//! error names the operation that raised it.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::console::Console;
use crate::value::{NumberType, Value};
use crate::{EvalError, EvalErrorKind};

/// Represents the implementation of a built-in operation
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Regular function that takes evaluated arguments and returns a value
    Function(fn(&[Value]) -> Result<Value, EvalError>),
    /// Function that also reads or writes the console
    Effect(fn(&[Value], &mut dyn Console) -> Result<Value, EvalError>),
    /// Special form; the evaluator decides which arguments get evaluated
    SpecialForm,
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::Effect(_) => write!(f, "Effect(<fn>)"),
            OpKind::SpecialForm => write!(f, "SpecialForm"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The identifier this operation is called by
    pub id: &'static str,
    pub op_kind: OpKind,
    /// Exact number of arguments
    pub arity: usize,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BuiltinOp {
    pub(crate) fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm)
    }

    /// Apply a non-special operation to already evaluated arguments
    pub(crate) fn apply(&self, args: &[Value], console: &mut dyn Console) -> Result<Value, EvalError> {
        match self.op_kind {
            OpKind::Function(f) => f(args),
            OpKind::Effect(f) => f(args, console),
            OpKind::SpecialForm => Err(EvalError::new(
                EvalErrorKind::TypeMismatch,
                self.id,
                "special form cannot be applied to evaluated arguments",
            )),
        }
    }
}

fn type_mismatch(op: &str, expected: &str, got: &[&Value]) -> EvalError {
    let got: Vec<&str> = got.iter().map(|v| v.type_name()).collect();
    EvalError::new(
        EvalErrorKind::TypeMismatch,
        op,
        format!("expected {expected}, got {}", got.join(" and ")),
    )
}

fn overflow(op: &str) -> EvalError {
    EvalError::new(EvalErrorKind::Overflow, op, "integer overflow")
}

//
// Builtin Function Implementations
//

fn builtin_head(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Pair(cell) => Ok(cell.head.clone()),
        Value::String(s) => match s.chars().next() {
            Some(first) => Ok(Value::String(first.to_string())),
            None => Err(EvalError::new(EvalErrorKind::EmptyList, "head", "head of empty string")),
        },
        Value::Null => Err(EvalError::new(EvalErrorKind::EmptyList, "head", "head of empty list")),
        other => Err(type_mismatch("head", "list or string", &[other])),
    }
}

fn builtin_tail(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Pair(cell) => Ok(cell.tail.clone()),
        Value::String(s) => {
            let mut chars = s.chars();
            match chars.next() {
                Some(_) if chars.as_str().is_empty() => Ok(Value::Null),
                Some(_) => Ok(Value::String(chars.as_str().to_owned())),
                None => Err(EvalError::new(EvalErrorKind::EmptyList, "tail", "tail of empty string")),
            }
        }
        Value::Null => Err(EvalError::new(EvalErrorKind::EmptyList, "tail", "tail of empty list")),
        other => Err(type_mismatch("tail", "list or string", &[other])),
    }
}

fn builtin_pair(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::list([args[0].clone(), args[1].clone()]))
}

fn builtin_fuse(args: &[Value]) -> Result<Value, EvalError> {
    Ok(args[0].fuse(&args[1]))
}

fn builtin_litr(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::String(s) => Ok(Value::litr(s)),
        other => Err(type_mismatch("litr", "string", &[other])),
    }
}

fn builtin_str(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(args[0].render()))
}

fn builtin_words(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::String(s) => Ok(Value::words(s)),
        other => Err(type_mismatch("words", "string", &[other])),
    }
}

fn builtin_input(args: &[Value], console: &mut dyn Console) -> Result<Value, EvalError> {
    console
        .read_line(&args[0].render())
        .map(Value::String)
        .map_err(|e| EvalError::new(EvalErrorKind::Io, "input", e.to_string()))
}

fn builtin_print(args: &[Value], console: &mut dyn Console) -> Result<Value, EvalError> {
    console
        .write_line(&args[0].render())
        .map_err(|e| EvalError::new(EvalErrorKind::Io, "print", e.to_string()))?;
    Ok(args[0].clone())
}

fn builtin_equal(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args[0] == args[1]))
}

fn builtin_add(args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => {
            a.checked_add(*b).map(Value::Number).ok_or_else(|| overflow("+"))
        }
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (a, b) => Err(type_mismatch("+", "two numbers or two strings", &[a, b])),
    }
}

fn numbers(op: &str, args: &[Value]) -> Result<(NumberType, NumberType), EvalError> {
    match (&args[0], &args[1]) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        (a, b) => Err(type_mismatch(op, "two numbers", &[a, b])),
    }
}

// Macro to generate checked arithmetic on two numbers
macro_rules! checked_arithmetic {
    ($name:ident, $method:ident, $op_str:expr) => {
        fn $name(args: &[Value]) -> Result<Value, EvalError> {
            let (a, b) = numbers($op_str, args)?;
            a.$method(b).map(Value::Number).ok_or_else(|| overflow($op_str))
        }
    };
}

checked_arithmetic!(builtin_sub, checked_sub, "-");
checked_arithmetic!(builtin_mul, checked_mul, "*");

// Division and remainder truncate toward zero
macro_rules! checked_division {
    ($name:ident, $method:ident, $op_str:expr) => {
        fn $name(args: &[Value]) -> Result<Value, EvalError> {
            let (a, b) = numbers($op_str, args)?;
            if b == 0 {
                return Err(EvalError::new(
                    EvalErrorKind::DivisionByZero,
                    $op_str,
                    "division by zero",
                ));
            }
            a.$method(b).map(Value::Number).ok_or_else(|| overflow($op_str))
        }
    };
}

checked_division!(builtin_div, checked_div, "/");
checked_division!(builtin_rem, checked_rem, "%");

// Macro to generate ordering comparisons over numbers or strings
macro_rules! ordering_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(args: &[Value]) -> Result<Value, EvalError> {
            match (&args[0], &args[1]) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a $op b)),
                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a $op b)),
                (a, b) => Err(type_mismatch($op_str, "two numbers or two strings", &[a, b])),
            }
        }
    };
}

ordering_comparison!(builtin_lt, <, "<");
ordering_comparison!(builtin_le, <=, "<=");

/// Global registry of all built-in operations.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    vec![
        // Control flow
        BuiltinOp {
            id: "if",
            op_kind: OpKind::SpecialForm,
            arity: 3,
        },
        // List operations
        BuiltinOp {
            id: "head",
            op_kind: OpKind::Function(builtin_head),
            arity: 1,
        },
        BuiltinOp {
            id: "tail",
            op_kind: OpKind::Function(builtin_tail),
            arity: 1,
        },
        BuiltinOp {
            id: "pair",
            op_kind: OpKind::Function(builtin_pair),
            arity: 2,
        },
        BuiltinOp {
            id: "fuse",
            op_kind: OpKind::Function(builtin_fuse),
            arity: 2,
        },
        // Conversions
        BuiltinOp {
            id: "litr",
            op_kind: OpKind::Function(builtin_litr),
            arity: 1,
        },
        BuiltinOp {
            id: "str",
            op_kind: OpKind::Function(builtin_str),
            arity: 1,
        },
        BuiltinOp {
            id: "words",
            op_kind: OpKind::Function(builtin_words),
            arity: 1,
        },
        // Console
        BuiltinOp {
            id: "input",
            op_kind: OpKind::Effect(builtin_input),
            arity: 1,
        },
        BuiltinOp {
            id: "print",
            op_kind: OpKind::Effect(builtin_print),
            arity: 1,
        },
        // Comparison
        BuiltinOp {
            id: "=",
            op_kind: OpKind::Function(builtin_equal),
            arity: 2,
        },
        BuiltinOp {
            id: "<",
            op_kind: OpKind::Function(builtin_lt),
            arity: 2,
        },
        BuiltinOp {
            id: "<=",
            op_kind: OpKind::Function(builtin_le),
            arity: 2,
        },
        // Arithmetic
        BuiltinOp {
            id: "+",
            op_kind: OpKind::Function(builtin_add),
            arity: 2,
        },
        BuiltinOp {
            id: "-",
            op_kind: OpKind::Function(builtin_sub),
            arity: 2,
        },
        BuiltinOp {
            id: "*",
            op_kind: OpKind::Function(builtin_mul),
            arity: 2,
        },
        BuiltinOp {
            id: "/",
            op_kind: OpKind::Function(builtin_div),
            arity: 2,
        },
        BuiltinOp {
            id: "%",
            op_kind: OpKind::Function(builtin_rem),
            arity: 2,
        },
    ]
});

/// Lazy static map from id to BuiltinOp (private - use find_builtin_op)
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.id, op)).collect()
});

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by its identifier
pub fn find_builtin_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(id).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::value::{nil, val};
    use pretty_assertions::assert_eq;

    /// Invoke a builtin through the registry with a throwaway console
    fn call_builtin(name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let op = find_builtin_op(name).unwrap();
        assert_eq!(op.arity, args.len(), "wrong argument count for {name}");
        op.apply(args, &mut ScriptedConsole::default())
    }

    #[test]
    fn test_builtin_ops_registry() {
        let expected_arities = [
            ("if", 3),
            ("head", 1),
            ("tail", 1),
            ("pair", 2),
            ("fuse", 2),
            ("litr", 1),
            ("str", 1),
            ("words", 1),
            ("input", 1),
            ("print", 1),
            ("=", 2),
            ("+", 2),
            ("-", 2),
            ("*", 2),
            ("/", 2),
            ("%", 2),
            ("<", 2),
            ("<=", 2),
        ];
        assert_eq!(get_builtin_ops().len(), expected_arities.len());
        for (id, arity) in expected_arities {
            let op = find_builtin_op(id).unwrap();
            assert_eq!(op.arity, arity, "arity of {id}");
            assert_eq!(op.is_special_form(), id == "if");
        }

        assert!(find_builtin_op("unknown").is_none());
        assert!(find_builtin_op(">").is_none()); // defined in the prelude
    }

    #[test]
    fn test_builtin_function_implementations() {
        use EvalErrorKind::*;
        type TestCase = (&'static str, Vec<Value>, Result<Value, EvalErrorKind>);

        let test_cases: Vec<TestCase> = vec![
            // Arithmetic
            ("+", vec![val(5), val(7)], Ok(val(12))),
            ("+", vec![val("ab"), val("cd")], Ok(val("abcd"))),
            ("+", vec![val(1), val("2")], Err(TypeMismatch)),
            ("+", vec![val(NumberType::MAX), val(1)], Err(Overflow)),
            ("-", vec![val(9), val(5)], Ok(val(4))),
            ("-", vec![val(NumberType::MIN), val(1)], Err(Overflow)),
            ("-", vec![val("a"), val("b")], Err(TypeMismatch)),
            ("*", vec![val(6), val(-7)], Ok(val(-42))),
            ("*", vec![val(NumberType::MAX), val(2)], Err(Overflow)),
            ("/", vec![val(7), val(2)], Ok(val(3))),
            ("/", vec![val(-7), val(2)], Ok(val(-3))),
            ("/", vec![val(1), val(0)], Err(DivisionByZero)),
            ("/", vec![val(NumberType::MIN), val(-1)], Err(Overflow)),
            ("%", vec![val(7), val(3)], Ok(val(1))),
            ("%", vec![val(-7), val(3)], Ok(val(-1))),
            ("%", vec![val(7), val(0)], Err(DivisionByZero)),
            // Comparison
            ("=", vec![val([1, 2]), val([1, 2])], Ok(val(true))),
            ("=", vec![nil(), val(0)], Ok(val(false))),
            ("=", vec![val("3"), val(3)], Ok(val(false))),
            ("<", vec![val(1), val(2)], Ok(val(true))),
            ("<", vec![val(2), val(2)], Ok(val(false))),
            ("<=", vec![val(2), val(2)], Ok(val(true))),
            ("<", vec![val("apple"), val("banana")], Ok(val(true))),
            ("<=", vec![val("b"), val("a")], Ok(val(false))),
            ("<", vec![val(1), val("a")], Err(TypeMismatch)),
            ("<", vec![nil(), nil()], Err(TypeMismatch)),
            // Lists
            ("pair", vec![val(3), val(17)], Ok(val([3, 17]))),
            ("fuse", vec![val([3, 17]), val([5, 8])], Ok(val([3, 17, 5, 8]))),
            ("head", vec![val([3, 17])], Ok(val(3))),
            ("tail", vec![val([17, 9, 4])], Ok(val([9, 4]))),
            ("tail", vec![val([9])], Ok(nil())),
            ("head", vec![nil()], Err(EmptyList)),
            ("tail", vec![nil()], Err(EmptyList)),
            ("head", vec![val(5)], Err(TypeMismatch)),
            ("tail", vec![val(true)], Err(TypeMismatch)),
            // Strings behave as character sequences for head and tail
            ("head", vec![val("abc")], Ok(val("a"))),
            ("tail", vec![val("abc")], Ok(val("bc"))),
            ("tail", vec![val("c")], Ok(nil())),
            ("head", vec![val("")], Err(EmptyList)),
            // Conversions
            ("litr", vec![val("3")], Ok(val(3))),
            ("litr", vec![val("false")], Ok(val(false))),
            ("litr", vec![val(3)], Err(TypeMismatch)),
            ("str", vec![val(4)], Ok(val("4"))),
            ("str", vec![val([1, 2])], Ok(val("[1, 2]"))),
            ("str", vec![nil()], Ok(val("null"))),
            ("words", vec![val("a  b")], Ok(val(["a", "b"]))),
            ("words", vec![val(1)], Err(TypeMismatch)),
        ];

        for (i, (name, args, expected)) in test_cases.into_iter().enumerate() {
            let result = call_builtin(name, &args).map_err(|e| e.kind);
            assert_eq!(
                result,
                expected,
                "Test case #{} failed: {name} {args:?}",
                i + 1
            );
        }
    }

    #[test]
    fn test_errors_name_operation() {
        let err = call_builtin("/", &[val(1), val(0)]).unwrap_err();
        assert_eq!(err.operation, "/");
        assert_eq!(err.message, "division by zero");

        let err = call_builtin("head", &[val(5)]).unwrap_err();
        assert_eq!(err.operation, "head");
        assert_eq!(err.message, "expected list or string, got number");
    }

    #[test]
    fn test_console_builtins() {
        let mut console = ScriptedConsole::new(["  42 "]);

        let print = find_builtin_op("print").unwrap();
        let printed = print.apply(&[val([1, 2])], &mut console).unwrap();
        assert_eq!(printed, val([1, 2]));

        let input = find_builtin_op("input").unwrap();
        let line = input.apply(&[val("n? ")], &mut console).unwrap();
        assert_eq!(line, val("  42 "));

        let err = input.apply(&[val(1)], &mut console).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::Io);

        assert_eq!(console.output(), ["[1, 2]"]);
        assert_eq!(console.prompts(), ["n? ", "1"]);
    }
}
