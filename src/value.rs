//! Runtime values for C-Lesh

use std::collections::BTreeMap;
use std::fmt;

use crate::token::is_number;

/// Runtime values in C-Lesh
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Passed into a memory access to request a read; never stored
    #[default]
    Empty,

    /// Integer value
    Number(i32),

    /// String value
    String(String),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Numeric view of a value. Strings count as 0.
    pub fn as_number(&self) -> i32 {
        match self {
            Value::Number(n) => *n,
            _ => 0,
        }
    }

    /// Text view of a value. Numbers are formatted in decimal.
    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Empty => String::new(),
        }
    }

    /// Parse a value the way records store them: integers become numbers,
    /// everything else stays text.
    pub fn parse(text: &str) -> Value {
        if is_number(text) {
            if let Ok(n) = text.parse() {
                return Value::Number(n);
            }
        }
        Value::String(text.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "<empty>"),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Named fields of a block
pub type Fields = BTreeMap<String, Value>;

/// Read a field the way programs see it: unset fields read as `"null"`.
pub fn get_field(fields: &Fields, name: &str) -> Value {
    fields
        .get(name)
        .cloned()
        .unwrap_or_else(|| Value::String("null".to_string()))
}

/// Read a numeric field, treating unset fields as 0.
pub fn field_number(fields: &Fields, name: &str) -> i32 {
    fields.get(name).map(Value::as_number).unwrap_or(0)
}

/// Write a numeric field, creating it if needed.
pub fn set_field_number(fields: &mut Fields, name: &str, number: i32) {
    fields.insert(name.to_string(), Value::Number(number));
}
