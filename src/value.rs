//! Runtime values of the interpreter. The main enum, [`Value`], is closed over
//! five variants: `Null`, booleans, integers, strings and cons cells. `Null`
//! doubles as the empty list, so a proper list is a chain of pairs ending in
//! `Null`. Cells are shared through `Rc`, so copying a value is cheap and lists
//! may share their tails.
//!
//! Long and deeply nested lists are common (recursion is the only loop), so
//! equality, rendering and dropping keep their own work stacks instead of
//! recursing per cell, whether the nesting runs along the tail or the head.
//! Ergonomic helpers [`val`] and [`nil`] build values in code and tests.

use std::fmt;
use std::mem;
use std::rc::Rc;

use nom::{
    IResult, Parser,
    character::complete::{char, digit1},
    combinator::{all_consuming, opt, recognize},
    sequence::pair,
};

/// Type alias for number values in interpreter
pub type NumberType = i64;

/// Core value type of the interpreter
#[derive(Clone, Default)]
pub enum Value {
    /// The unit value and the empty list
    #[default]
    Null,
    Bool(bool),
    Number(NumberType),
    String(String),
    /// A cons cell; lists are `Pair` chains ending in `Null`
    Pair(Rc<Cell>),
}

/// The two halves of a cons cell
pub struct Cell {
    pub head: Value,
    pub tail: Value,
}

impl Drop for Cell {
    fn drop(&mut self) {
        if !matches!(self.head, Value::Pair(_)) && !matches!(self.tail, Value::Pair(_)) {
            return;
        }
        // Unlink uniquely owned cells one at a time so that dropping a long
        // list does not recurse once per element.
        let mut pending = vec![mem::take(&mut self.head), mem::take(&mut self.tail)];
        while let Some(value) = pending.pop() {
            if let Value::Pair(cell) = value
                && let Ok(mut cell) = Rc::try_unwrap(cell)
            {
                pending.push(mem::take(&mut cell.head));
                pending.push(mem::take(&mut cell.tail));
            }
        }
    }
}

impl Value {
    /// Construct a cons cell
    pub fn cons(head: Value, tail: Value) -> Value {
        Value::Pair(Rc::new(Cell { head, tail }))
    }

    /// Build a proper list from elements in order
    pub fn list<I>(elements: I) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        elements
            .into_iter()
            .rev()
            .fold(Value::Null, |tail, head| Value::cons(head, tail))
    }

    /// `Null` or a pair; atoms are everything else
    pub fn is_list(&self) -> bool {
        matches!(self, Value::Null | Value::Pair(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Pair(_) => "list",
        }
    }

    /// Iterate over the heads of a list spine
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { rest: self }
    }

    /// Textual form used by `str` and `print`
    ///
    /// Strings render without quotes, lists as `[e1, e2, ...]`.
    pub fn render(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Concatenate two values as lists.
    ///
    /// Lists are joined, an atom on either side is appended or prepended as a
    /// single element, and two atoms form a two-element list.
    pub fn fuse(&self, other: &Value) -> Value {
        let tail = if other.is_list() {
            other.clone()
        } else {
            Value::cons(other.clone(), Value::Null)
        };
        if self.is_list() {
            let heads: Vec<Value> = self.iter().cloned().collect();
            heads
                .into_iter()
                .rev()
                .fold(tail, |tail, head| Value::cons(head, tail))
        } else {
            Value::cons(self.clone(), tail)
        }
    }

    /// Read a literal back from text.
    ///
    /// After trimming, `null`, `true`, `false` and signed decimal integers are
    /// recognized; anything else is returned as the original string.
    pub fn litr(text: &str) -> Value {
        let trimmed = text.trim();
        match trimmed {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => match all_consuming(signed_integer).parse(trimmed) {
                Ok((_, digits)) => match digits.parse::<NumberType>() {
                    Ok(n) => Value::Number(n),
                    Err(_) => Value::String(text.to_owned()),
                },
                Err(_) => Value::String(text.to_owned()),
            },
        }
    }

    /// Split text on runs of whitespace into a list of strings
    pub fn words(text: &str) -> Value {
        Value::list(
            text.split_whitespace()
                .map(|word| Value::String(word.to_owned()))
                .collect::<Vec<_>>(),
        )
    }
}

fn signed_integer(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(char('-')), digit1)).parse(input)
}

/// Iterator over list elements; stops at `Null` or at a non-list tail
pub struct ListIter<'a> {
    rest: &'a Value,
}

impl<'a> ListIter<'a> {
    /// The part of the spine not yet visited
    pub fn rest(&self) -> &'a Value {
        self.rest
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        match self.rest {
            Value::Pair(cell) => {
                self.rest = &cell.tail;
                Some(&cell.head)
            }
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((left, right)) = pending.pop() {
            let same = match (left, right) {
                (Value::Null, Value::Null) => true,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Number(a), Value::Number(b)) => a == b,
                (Value::String(a), Value::String(b)) => a == b,
                (Value::Pair(a), Value::Pair(b)) => {
                    if !Rc::ptr_eq(a, b) {
                        pending.push((&a.tail, &b.tail));
                        pending.push((&a.head, &b.head));
                    }
                    true
                }
                _ => false, // Different variants are never equal
            };
            if !same {
                return false;
            }
        }
        true
    }
}

impl Eq for Value {}

/// Pending output while rendering a value
enum Piece<'a> {
    Value(&'a Value),
    Text(&'static str),
}

/// Render `value` with an explicit stack, so nesting in head position costs
/// heap rather than native stack. `atom` writes every non-pair value.
fn write_nested(
    f: &mut fmt::Formatter<'_>,
    value: &Value,
    open: &'static str,
    close: &'static str,
    atom: fn(&Value, &mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    let mut pending = vec![Piece::Value(value)];
    while let Some(piece) = pending.pop() {
        match piece {
            Piece::Text(text) => f.write_str(text)?,
            Piece::Value(value) if !matches!(value, Value::Pair(_)) => atom(value, f)?,
            Piece::Value(list) => {
                f.write_str(open)?;
                let mut elements = list.iter();
                let heads: Vec<&Value> = elements.by_ref().collect();

                pending.push(Piece::Text(close));
                if !elements.rest().is_null() {
                    pending.push(Piece::Value(elements.rest()));
                    pending.push(Piece::Text(" | "));
                }
                for (i, head) in heads.into_iter().enumerate().rev() {
                    pending.push(Piece::Value(head));
                    if i > 0 {
                        pending.push(Piece::Text(", "));
                    }
                }
            }
        }
    }
    Ok(())
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nested(f, self, "List(", ")", |value, f| match value {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Pair(_) => write!(f, "List(..)"),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nested(f, self, "[", "]", |value, f| match value {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Pair(_) => write!(f, "[..]"),
        })
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(NumberType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::list(arr.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

/// Helper function for creating Values - works great in mixed lists!
/// Accepts any type that can be converted to Value
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for the empty list
pub fn nil() -> Value {
    Value::Null
}
