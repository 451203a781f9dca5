//! Blocks and command codes for the C-Lesh VM
//!
//! Every memory cell is a block. A compiled command fills in the opcode and
//! its expressions; a data block only uses its scalar value and fields.

use std::fmt;

use crate::ast::{Conditional, Expression};
use crate::value::{Fields, Value};

/// Command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum OpCode {
    #[default]
    Data,
    Test,
    Move,
    Call,
    Return,
    Stop,
    Set,
    Output,
    Load,
    Save,
    Draw,
    Play,
    Music,
    Input,
    Collision,
    Focus,
    Update,
    Timeout,
    Resource,
    Upload,
}

/// Every command keyword with its operand pattern. `<e>` is an expression,
/// `<c>` a conditional, `<s>` a string literal; other entries are keywords
/// that must appear verbatim.
const GRAMMAR: &[(&str, OpCode, &str)] = &[
    ("test", OpCode::Test, "<c>"),
    ("move", OpCode::Move, "<e>"),
    ("call", OpCode::Call, "<e>"),
    ("return", OpCode::Return, ""),
    ("stop", OpCode::Stop, ""),
    ("set", OpCode::Set, "<e> to <e>"),
    ("output", OpCode::Output, "<e> at <e> <e> color <e> <e> <e>"),
    ("load", OpCode::Load, "<e> from <e>"),
    ("save", OpCode::Save, "<e> count <e> to <e>"),
    (
        "draw",
        OpCode::Draw,
        "<e> at <e> <e> scale <e> angle <e> layer <e> flip-x <e> flip-y <e>",
    ),
    ("play", OpCode::Play, "<e> mode <e>"),
    ("music", OpCode::Music, "<e> mode <e>"),
    ("input", OpCode::Input, "<e> player <e>"),
    ("collision", OpCode::Collision, "<e> other <e> results <e>"),
    ("focus", OpCode::Focus, "<e> sprite <e>"),
    ("update", OpCode::Update, ""),
    ("timeout", OpCode::Timeout, "<e>"),
    ("resource", OpCode::Resource, "<e>"),
    ("upload", OpCode::Upload, ""),
];

impl OpCode {
    /// Look up a command keyword in the grammar table.
    pub fn lookup(keyword: &str) -> Option<(OpCode, &'static str)> {
        GRAMMAR
            .iter()
            .find(|(name, _, _)| *name == keyword)
            .map(|(_, op, pattern)| (*op, *pattern))
    }

    /// The keyword a command was written with; `data` for plain blocks.
    pub fn name(self) -> &'static str {
        GRAMMAR
            .iter()
            .find(|(_, op, _)| *op == self)
            .map(|(name, _, _)| *name)
            .unwrap_or("data")
    }

    pub fn pattern(self) -> &'static str {
        GRAMMAR
            .iter()
            .find(|(_, op, _)| *op == self)
            .map(|(_, _, pattern)| *pattern)
            .unwrap_or("")
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One addressable memory cell
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub opcode: OpCode,
    pub expressions: Vec<Expression>,
    pub conditional: Option<Conditional>,
    pub fields: Fields,
    pub value: Value,
    pub strings: Vec<String>,
}

impl Block {
    pub fn new() -> Self {
        Self {
            opcode: OpCode::Data,
            expressions: Vec::new(),
            conditional: None,
            fields: Fields::new(),
            value: Value::Number(0),
            strings: Vec::new(),
        }
    }

    /// Copy of the executable part: opcode, expressions, conditional and
    /// strings. The value and fields stay behind.
    pub fn instruction(&self) -> Block {
        Block {
            opcode: self.opcode,
            expressions: self.expressions.clone(),
            conditional: self.conditional.clone(),
            strings: self.strings.clone(),
            ..Block::new()
        }
    }

    pub fn is_command(&self) -> bool {
        self.opcode != OpCode::Data
    }

    /// Reconstruct the command as source text.
    pub fn disassemble(&self) -> String {
        if !self.is_command() {
            let mut s = format!("data {}", self.value);
            for (name, value) in &self.fields {
                s.push_str(&format!(" {}={}", name, value));
            }
            return s;
        }

        let mut parts = vec![self.opcode.name().to_string()];
        let mut expressions = self.expressions.iter();
        let mut strings = self.strings.iter();
        for entry in self.opcode.pattern().split_whitespace() {
            match entry {
                "<c>" => {
                    parts.push(self.disassemble_conditional());
                    // The conditional owns two expressions per condition.
                    let used = self
                        .conditional
                        .as_ref()
                        .map(|c| 2 * (c.rest.len() + 1))
                        .unwrap_or(0);
                    for _ in 0..used {
                        expressions.next();
                    }
                }
                "<e>" => match expressions.next() {
                    Some(expr) => parts.push(expr.to_string()),
                    None => parts.push("?".to_string()),
                },
                "<s>" => match strings.next() {
                    Some(s) => parts.push(format!("\"{}\"", s)),
                    None => parts.push("?".to_string()),
                },
                keyword => parts.push(keyword.to_string()),
            }
        }
        parts.join(" ")
    }

    fn disassemble_conditional(&self) -> String {
        let Some(conditional) = &self.conditional else {
            return "?".to_string();
        };
        let expr = |idx: usize| {
            self.expressions
                .get(idx)
                .map(|e| e.to_string())
                .unwrap_or_else(|| "?".to_string())
        };
        let cond = |c: &crate::ast::Condition| format!("{} {} {}", expr(c.left), c.test, expr(c.right));
        let mut s = cond(&conditional.first);
        for (logic, c) in &conditional.rest {
            s.push_str(&format!(" {} {}", logic, cond(c)));
        }
        s
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.disassemble())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Condition, Logic, Operand, Test};

    #[test]
    fn test_grammar_lookup() {
        assert_eq!(OpCode::lookup("set"), Some((OpCode::Set, "<e> to <e>")));
        assert_eq!(OpCode::lookup("label"), None);
        assert_eq!(OpCode::Collision.name(), "collision");
        assert_eq!(OpCode::Data.name(), "data");
        assert_eq!(OpCode::Upload as u8, 19);
    }

    #[test]
    fn test_disassemble_set() {
        let mut block = Block::new();
        block.opcode = OpCode::Set;
        block.expressions.push(Expression::new(Operand::Address(3)));
        block.expressions.push(Expression::new(Operand::Number(5)));
        assert_eq!(block.to_string(), "set #3 to 5");
    }

    #[test]
    fn test_disassemble_test() {
        let mut block = Block::new();
        block.opcode = OpCode::Test;
        for n in 1..=4 {
            block.expressions.push(Expression::new(Operand::Number(n)));
        }
        let mut conditional = Conditional::new(Condition {
            left: 0,
            test: Test::Eq,
            right: 1,
        });
        conditional.rest.push((
            Logic::Or,
            Condition {
                left: 2,
                test: Test::Lt,
                right: 3,
            },
        ));
        block.conditional = Some(conditional);
        assert_eq!(block.to_string(), "test 1 eq 2 or 3 lt 4");
    }

    #[test]
    fn test_instruction_leaves_data_behind() {
        let mut block = Block::new();
        block.opcode = OpCode::Output;
        block.strings.push("score".into());
        block.expressions.push(Expression::new(Operand::Number(1)));
        block.value = Value::Number(9);
        block.fields.insert("hp".into(), Value::Number(3));

        let instruction = block.instruction();
        assert_eq!(instruction.opcode, OpCode::Output);
        assert_eq!(instruction.strings, block.strings);
        assert_eq!(instruction.expressions, block.expressions);
        assert_eq!(instruction.value, Value::Number(0));
        assert!(instruction.fields.is_empty());
    }

    #[test]
    fn test_disassemble_data() {
        let mut block = Block::new();
        block.fields.insert("hp".into(), Value::Number(3));
        assert_eq!(block.to_string(), "data 0 hp=3");
    }
}
