//! Expression trees for C-Lesh
//!
//! Expressions are flat: an operand followed by `(operator, operand)` pairs
//! that fold strictly left to right. Conditionals are built the same way out
//! of conditions and logic joins.

use std::fmt;

/// The type an operand was parsed as. It never changes, even when a symbolic
/// operand is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Number,
    String,
    Address,
    Field,
    List,
    Hash,
}

/// One term of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(i32),
    String(String),
    /// `#<addr>`: a block's scalar value
    Address(i32),
    /// `#<addr>:<field>`: a named field of a block
    Field(i32, String),
    /// `#<base>:<index>:<field>`: field of block `base + value at #index`
    List { base: i32, index: i32, field: String },
    /// `#<base>:<key>`: field of `base` named by the string at `#key`
    Hash { base: i32, key: i32 },

    // Unresolved forms, replaced once every declaration has been seen
    /// `[name]`
    NumberSymbol(String),
    /// `#[name]`
    AddressSymbol(String),
    /// `#[name]:<field>`
    FieldSymbol(String, String),
    /// `#[base]:[index]:<field>`
    ListSymbol { base: String, index: String, field: String },
    /// `#[base]:[key]`
    HashSymbol { base: String, key: String },
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Number(_) | Operand::NumberSymbol(_) => OperandKind::Number,
            Operand::String(_) => OperandKind::String,
            Operand::Address(_) | Operand::AddressSymbol(_) => OperandKind::Address,
            Operand::Field(..) | Operand::FieldSymbol(..) => OperandKind::Field,
            Operand::List { .. } | Operand::ListSymbol { .. } => OperandKind::List,
            Operand::Hash { .. } | Operand::HashSymbol { .. } => OperandKind::Hash,
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(
            self,
            Operand::NumberSymbol(_)
                | Operand::AddressSymbol(_)
                | Operand::FieldSymbol(..)
                | Operand::ListSymbol { .. }
                | Operand::HashSymbol { .. }
        )
    }

    /// Whether a `set` may write through this operand
    pub fn is_writable(&self) -> bool {
        matches!(
            self.kind(),
            OperandKind::Address | OperandKind::Field | OperandKind::List | OperandKind::Hash
        )
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{}", n),
            Operand::String(s) => {
                write!(f, "\"{}\"", s.replace('"', "\\\"").replace(' ', "\\s"))
            }
            Operand::Address(a) => write!(f, "#{}", a),
            Operand::Field(a, field) => write!(f, "#{}:{}", a, field),
            Operand::List { base, index, field } => write!(f, "#{}:{}:{}", base, index, field),
            Operand::Hash { base, key } => write!(f, "#{}:{}", base, key),
            Operand::NumberSymbol(name) => write!(f, "[{}]", name),
            Operand::AddressSymbol(name) => write!(f, "#[{}]", name),
            Operand::FieldSymbol(name, field) => write!(f, "#[{}]:{}", name, field),
            Operand::ListSymbol { base, index, field } => {
                write!(f, "#[{}]:[{}]:{}", base, index, field)
            }
            Operand::HashSymbol { base, key } => write!(f, "#[{}]:[{}]", base, key),
        }
    }
}

/// Binary operators, all of equal precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Concat,
    Random,
    Cosine,
    Sine,
}

impl Operator {
    pub fn lookup(text: &str) -> Option<Operator> {
        match text {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Subtract),
            "*" => Some(Operator::Multiply),
            "/" => Some(Operator::Divide),
            "rem" => Some(Operator::Remainder),
            "cat" => Some(Operator::Concat),
            "rand" => Some(Operator::Random),
            "cos" => Some(Operator::Cosine),
            "sin" => Some(Operator::Sine),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Remainder => "rem",
            Operator::Concat => "cat",
            Operator::Random => "rand",
            Operator::Cosine => "cos",
            Operator::Sine => "sin",
        };
        write!(f, "{}", s)
    }
}

/// Comparison tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Test {
    pub fn lookup(text: &str) -> Option<Test> {
        match text {
            "eq" => Some(Test::Eq),
            "ne" => Some(Test::Ne),
            "lt" => Some(Test::Lt),
            "gt" => Some(Test::Gt),
            "le" => Some(Test::Le),
            "ge" => Some(Test::Ge),
            _ => None,
        }
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Test::Eq => "eq",
            Test::Ne => "ne",
            Test::Lt => "lt",
            Test::Gt => "gt",
            Test::Le => "le",
            Test::Ge => "ge",
        };
        write!(f, "{}", s)
    }
}

/// Joins between conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub fn lookup(text: &str) -> Option<Logic> {
        match text {
            "and" => Some(Logic::And),
            "or" => Some(Logic::Or),
            _ => None,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => write!(f, "and"),
            Logic::Or => write!(f, "or"),
        }
    }
}

/// `operand (operator operand)*`
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub first: Operand,
    pub rest: Vec<(Operator, Operand)>,
}

impl Expression {
    pub fn new(first: Operand) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }

    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.first).chain(self.rest.iter_mut().map(|(_, o)| o))
    }

    /// The lone operand of an expression without operators
    pub fn single(&self) -> Option<&Operand> {
        if self.rest.is_empty() {
            Some(&self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        for (op, operand) in &self.rest {
            write!(f, " {} {}", op, operand)?;
        }
        Ok(())
    }
}

/// A comparison between two of a block's expressions, referenced by index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub left: usize,
    pub test: Test,
    pub right: usize,
}

/// `condition (logic condition)*`
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub first: Condition,
    pub rest: Vec<(Logic, Condition)>,
}

impl Conditional {
    pub fn new(first: Condition) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_kind_is_fixed() {
        let symbol = Operand::ListSymbol {
            base: "enemies".into(),
            index: "i".into(),
            field: "x".into(),
        };
        let resolved = Operand::List {
            base: 10,
            index: 4,
            field: "x".into(),
        };
        assert!(symbol.is_symbolic());
        assert_eq!(symbol.kind(), resolved.kind());
        assert!(resolved.is_writable());
        assert!(!Operand::NumberSymbol("W".into()).is_writable());
    }

    #[test]
    fn test_display_round_trips_syntax() {
        let mut expr = Expression::new(Operand::Field(3, "x".into()));
        expr.rest.push((Operator::Add, Operand::NumberSymbol("SPEED".into())));
        expr.rest.push((Operator::Concat, Operand::String("a b".into())));
        assert_eq!(expr.to_string(), r#"#3:x + [SPEED] cat "a\sb""#);
    }
}
