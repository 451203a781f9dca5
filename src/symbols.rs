//! Symbol table and forward-reference resolution
//!
//! Declarations bind names to numbers while compiling. Operands that name a
//! symbol in brackets stay symbolic until [`resolve`] runs over the finished
//! memory image, which is what makes forward jumps possible.

use std::collections::BTreeMap;

use crate::ast::{Expression, Operand};
use crate::error::{CleshError, ErrorKind, Result};
use crate::memory::Memory;

/// Layer ids understood by `draw`
pub const LAYERS: [(&str, i32); 5] = [
    ("BACKGROUND", 1),
    ("PLATFORM", 2),
    ("CHARACTER", 3),
    ("FOREGROUND", 4),
    ("OVERLAY", 5),
];

/// Player id of the keyboard for `input`
pub const KEYBOARD: i32 = -1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    symbols: BTreeMap<String, i32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the language's built-in constants.
    pub fn with_builtins(screen_w: i32, screen_h: i32) -> Self {
        let mut table = Self::new();
        table.define("SCREEN_W", screen_w);
        table.define("SCREEN_H", screen_h);
        for (name, id) in LAYERS {
            table.define(name, id);
        }
        table.define("NONE", 0);
        table.define("PRESSED", 1);
        table.define("TRUE", 1);
        table.define("FALSE", 0);
        table.define("KEYBOARD", KEYBOARD);
        table
    }

    /// Bind or rebind a name.
    pub fn define(&mut self, name: &str, value: i32) {
        self.symbols.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.symbols.get(name).copied()
    }

    pub fn lookup(&self, name: &str) -> Result<i32> {
        self.get(name)
            .ok_or_else(|| CleshError::new(ErrorKind::UndefinedSymbol(name.to_string())))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Replace a symbolic operand with its resolved form. Resolved operands
    /// are returned unchanged.
    pub fn resolve_operand(&self, operand: &Operand) -> Result<Operand> {
        Ok(match operand {
            Operand::NumberSymbol(name) => Operand::Number(self.lookup(name)?),
            Operand::AddressSymbol(name) => Operand::Address(self.lookup(name)?),
            Operand::FieldSymbol(name, field) => Operand::Field(self.lookup(name)?, field.clone()),
            Operand::ListSymbol { base, index, field } => Operand::List {
                base: self.lookup(base)?,
                index: self.lookup(index)?,
                field: field.clone(),
            },
            Operand::HashSymbol { base, key } => Operand::Hash {
                base: self.lookup(base)?,
                key: self.lookup(key)?,
            },
            other => other.clone(),
        })
    }

    pub fn resolve_expression(&self, expression: &mut Expression) -> Result<()> {
        for operand in expression.operands_mut() {
            if operand.is_symbolic() {
                *operand = self.resolve_operand(operand)?;
            }
        }
        Ok(())
    }
}

/// Resolve every symbolic operand in the first `used` blocks of memory.
///
/// Blocks past `used` hold no compiled commands. Running this twice is a no-op
/// the second time.
pub fn resolve(memory: &mut Memory, symbols: &SymbolTable, used: usize) -> Result<()> {
    let used = used.min(memory.len());
    for (address, block) in memory.blocks_mut()[..used].iter_mut().enumerate() {
        let name = block.opcode.name();
        for expression in &mut block.expressions {
            symbols
                .resolve_expression(expression)
                .map_err(|e| e.in_command(name, address))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let table = SymbolTable::with_builtins(400, 300);
        assert_eq!(table.get("SCREEN_W"), Some(400));
        assert_eq!(table.get("OVERLAY"), Some(5));
        assert_eq!(table.get("KEYBOARD"), Some(-1));
        assert_eq!(table.get("TRUE"), Some(1));
        assert_eq!(table.get("missing"), None);
    }

    #[test]
    fn test_resolve_operands() {
        let mut table = SymbolTable::new();
        table.define("enemies", 40);
        table.define("i", 12);
        let list = Operand::ListSymbol {
            base: "enemies".into(),
            index: "i".into(),
            field: "x".into(),
        };
        assert_eq!(
            table.resolve_operand(&list).unwrap(),
            Operand::List {
                base: 40,
                index: 12,
                field: "x".into()
            }
        );
        assert_eq!(
            table.resolve_operand(&Operand::Number(3)).unwrap(),
            Operand::Number(3)
        );
    }

    #[test]
    fn test_undefined_symbol() {
        let table = SymbolTable::new();
        let err = table
            .resolve_operand(&Operand::AddressSymbol("later".into()))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedSymbol("later".into()));
    }
}
