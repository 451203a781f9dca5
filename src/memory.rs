//! Fixed-size block memory and the addressing model
//!
//! All reads and writes go through one primitive, [`Memory::read_write`].
//! Composite operands are first reduced to a [`Location`].

use crate::ast::Operand;
use crate::bytecode::Block;
use crate::error::{ErrorKind, Result};
use crate::value::{get_field, Value};

/// A resolved memory target: a block and optionally one of its fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub index: usize,
    pub field: Option<String>,
}

impl Location {
    pub fn scalar(index: usize) -> Self {
        Self { index, field: None }
    }

    pub fn field(index: usize, name: &str) -> Self {
        Self {
            index,
            field: Some(name.to_string()),
        }
    }
}

/// The block array. Its length is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    blocks: Vec<Block>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            blocks: vec![Block::new(); size],
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_valid(&self, address: i32) -> bool {
        address >= 0 && (address as usize) < self.blocks.len()
    }

    /// Convert an address to an index, failing outside `[0, len)`.
    pub fn check(&self, address: i32) -> Result<usize> {
        if self.is_valid(address) {
            Ok(address as usize)
        } else {
            Err(ErrorKind::InvalidAddress(address).into())
        }
    }

    pub fn block(&self, address: i32) -> Result<&Block> {
        let index = self.check(address)?;
        Ok(&self.blocks[index])
    }

    pub fn block_mut(&mut self, address: i32) -> Result<&mut Block> {
        let index = self.check(address)?;
        Ok(&mut self.blocks[index])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// Read when `data` is `Empty`, otherwise write `data`.
    ///
    /// Reading an unset field yields `"null"`; writing a field creates it.
    pub fn read_write(&mut self, location: &Location, data: &mut Value) -> Result<()> {
        let block = self
            .blocks
            .get_mut(location.index)
            .ok_or(ErrorKind::InvalidAddress(location.index as i32))?;
        match (&location.field, data.is_empty()) {
            (None, true) => *data = block.value.clone(),
            (Some(name), true) => *data = get_field(&block.fields, name),
            (None, false) => block.value = data.clone(),
            (Some(name), false) => {
                block.fields.insert(name.clone(), data.clone());
            }
        }
        Ok(())
    }

    pub fn read(&mut self, location: &Location) -> Result<Value> {
        let mut data = Value::Empty;
        self.read_write(location, &mut data)?;
        Ok(data)
    }

    pub fn write(&mut self, location: &Location, value: Value) -> Result<()> {
        let mut data = value;
        if data.is_empty() {
            return Ok(());
        }
        self.read_write(location, &mut data)
    }

    /// Reduce an addressing operand to the block and field it designates.
    ///
    /// List operands read their index pointer and hash operands their key
    /// pointer, so this depends on the current memory contents.
    pub fn locate(&mut self, operand: &Operand) -> Result<Location> {
        match operand {
            Operand::Address(addr) => Ok(Location::scalar(self.check(*addr)?)),
            Operand::Field(addr, field) => Ok(Location::field(self.check(*addr)?, field)),
            Operand::List { base, index, field } => {
                let pointer = Location::scalar(self.check(*index)?);
                let offset = self.read(&pointer)?.as_number();
                let address = self.check(base.wrapping_add(offset))?;
                Ok(Location::field(address, field))
            }
            Operand::Hash { base, key } => {
                let pointer = Location::scalar(self.check(*key)?);
                let key = self.read(&pointer)?.as_text();
                let address = self.check(*base)?;
                if key.is_empty() {
                    Ok(Location::scalar(address))
                } else {
                    Ok(Location::field(address, &key))
                }
            }
            _ => Err(ErrorKind::InvalidDestination.into()),
        }
    }

    /// Disassemble `count` blocks starting at `start`, clamped to memory.
    pub fn disassemble(&self, start: usize, count: usize) -> String {
        let end = start.saturating_add(count).min(self.blocks.len());
        let mut out = String::new();
        for index in start.min(end)..end {
            out.push_str(&format!("{:04} {}\n", index, self.blocks[index]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_read_write() {
        let mut memory = Memory::new(8);
        let loc = Location::scalar(3);
        assert_eq!(memory.read(&loc).unwrap(), Value::Number(0));
        memory.write(&loc, Value::Number(5)).unwrap();
        assert_eq!(memory.read(&loc).unwrap(), Value::Number(5));
    }

    #[test]
    fn test_unset_field_reads_null() {
        let mut memory = Memory::new(4);
        let loc = Location::field(1, "name");
        assert_eq!(memory.read(&loc).unwrap(), Value::from("null"));
        memory.write(&loc, Value::from("hero")).unwrap();
        assert_eq!(memory.read(&loc).unwrap(), Value::from("hero"));
        assert_eq!(memory.block(1).unwrap().fields.len(), 1);
    }

    #[test]
    fn test_bounds() {
        let mut memory = Memory::new(4);
        assert!(memory.is_valid(0));
        assert!(!memory.is_valid(4));
        assert!(!memory.is_valid(-1));
        let err = memory.locate(&Operand::Address(4)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAddress(4));
    }

    #[test]
    fn test_list_location() {
        let mut memory = Memory::new(16);
        memory.write(&Location::scalar(2), Value::Number(3)).unwrap();
        let operand = Operand::List {
            base: 10,
            index: 2,
            field: "x".into(),
        };
        assert_eq!(memory.locate(&operand).unwrap(), Location::field(13, "x"));

        memory.write(&Location::scalar(2), Value::Number(6)).unwrap();
        let err = memory.locate(&operand).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAddress(16));
    }

    #[test]
    fn test_hash_location() {
        let mut memory = Memory::new(8);
        let operand = Operand::Hash { base: 5, key: 1 };
        assert_eq!(memory.locate(&operand).unwrap(), Location::field(5, "0"));
        memory.write(&Location::scalar(1), Value::from("gold")).unwrap();
        assert_eq!(memory.locate(&operand).unwrap(), Location::field(5, "gold"));
        memory.write(&Location::scalar(1), Value::from("")).unwrap();
        assert_eq!(memory.locate(&operand).unwrap(), Location::scalar(5));
    }
}
