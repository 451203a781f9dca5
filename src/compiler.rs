//! Compiler: Tokens → Memory image
//!
//! Each command fills the block at the program counter and advances it.
//! Declarations bind names in the symbol table; operands that refer to names
//! in brackets are left symbolic and resolved once the whole source has been
//! read.

use std::collections::{BTreeMap, VecDeque};

use crate::ast::{Condition, Conditional, Expression, Logic, Operand, Operator, Test};
use crate::bytecode::{Block, OpCode};
use crate::device::Device;
use crate::error::{ErrorKind, Result};
use crate::lexer::Lexer;
use crate::memory::Memory;
use crate::symbols::{self, SymbolTable};
use crate::token::{is_number, is_string, is_unsigned, is_word, placeholder_name, unquote, Token};

/// A compiled program ready for the VM
#[derive(Debug, Clone)]
pub struct Program {
    pub memory: Memory,
    pub symbols: SymbolTable,
    /// First block after the program (the final program counter)
    pub used: usize,
    /// Source line of every command, by address
    pub lines: BTreeMap<usize, (usize, String)>,
}

impl Program {
    /// The source line a command was compiled from
    pub fn source_line(&self, address: usize) -> Option<(usize, &str)> {
        self.lines
            .get(&address)
            .map(|(number, text)| (*number, text.as_str()))
    }

    /// Disassembly of every block the program occupies
    pub fn disassemble(&self) -> String {
        self.memory.disassemble(0, self.used)
    }
}

/// The C-Lesh compiler
pub struct Compiler {
    tokens: VecDeque<Token>,
    last_token: Token,
    pc: usize,
    memory: Memory,
    symbols: SymbolTable,
    lines: BTreeMap<usize, (usize, String)>,
}

impl Compiler {
    /// A compiler for a memory of `memory_size` blocks. `screen` seeds
    /// `SCREEN_W` and `SCREEN_H`.
    pub fn new(memory_size: usize, screen: (i32, i32)) -> Self {
        Self {
            tokens: VecDeque::new(),
            last_token: Token::default(),
            pc: 0,
            memory: Memory::new(memory_size),
            symbols: SymbolTable::with_builtins(screen.0, screen.1),
            lines: BTreeMap::new(),
        }
    }

    /// Compile preprocessed source and resolve every symbolic operand.
    pub fn compile(mut self, source: &str, device: &mut dyn Device) -> Result<Program> {
        self.tokens = Lexer::new(source).tokenize().into();

        while !self.tokens.is_empty() {
            self.parse_statement(device)
                .map_err(|e| e.at_line(self.last_token.line, &self.last_token.source_line))?;
        }

        let lines = &self.lines;
        symbols::resolve(&mut self.memory, &self.symbols, self.pc).map_err(|e| {
            let line = e
                .command
                .as_ref()
                .and_then(|(_, address)| lines.get(address))
                .cloned();
            match line {
                Some((number, text)) => e.at_line(number, &text),
                None => e,
            }
        })?;

        Ok(Program {
            memory: self.memory,
            symbols: self.symbols,
            used: self.pc,
            lines: self.lines,
        })
    }

    fn parse_statement(&mut self, device: &mut dyn Device) -> Result<()> {
        let token = self.advance()?;
        match token.text.as_str() {
            "remark" => {
                while self.advance()?.text != "end" {}
            }
            "define" => {
                let name = self.advance()?.text;
                self.expect("as")?;
                let value = self.parse_number()?;
                self.symbols.define(&name, value);
            }
            "label" => {
                let name = self.advance()?.text;
                self.symbols.define(&name, self.pc as i32);
            }
            "var" => {
                let name = self.advance()?.text;
                self.allocate(&name, 1)?;
            }
            "list" => {
                let name = self.advance()?.text;
                self.expect("alloc")?;
                let count = self.parse_count()?;
                self.allocate(&name, count)?;
            }
            "screen" => {
                let width = self.parse_number()?;
                let height = self.parse_number()?;
                device.create_screen(width, height)?;
                self.symbols.define("SCREEN_W", width);
                self.symbols.define("SCREEN_H", height);
            }
            keyword => match OpCode::lookup(keyword) {
                Some((opcode, pattern)) => self.parse_command(&token, opcode, pattern)?,
                None => return Err(ErrorKind::InvalidCommand(keyword.to_string()).into()),
            },
        }
        Ok(())
    }

    /// Bind `name` to the program counter and reserve `count` blocks.
    fn allocate(&mut self, name: &str, count: usize) -> Result<()> {
        let end = self
            .pc
            .checked_add(count)
            .filter(|end| *end <= self.memory.len())
            .ok_or(ErrorKind::ProgramTooBig)?;
        self.symbols.define(name, self.pc as i32);
        self.pc = end;
        Ok(())
    }

    fn parse_command(&mut self, token: &Token, opcode: OpCode, pattern: &str) -> Result<()> {
        if self.pc >= self.memory.len() {
            return Err(ErrorKind::ProgramTooBig.into());
        }
        let mut block = Block::new();
        block.opcode = opcode;
        for entry in pattern.split_whitespace() {
            match entry {
                "<c>" => {
                    let conditional = self.parse_conditional(&mut block)?;
                    block.conditional = Some(conditional);
                }
                "<e>" => {
                    let expression = self.parse_expression()?;
                    block.expressions.push(expression);
                }
                "<s>" => {
                    let text = self.advance()?.text;
                    if !is_string(&text) {
                        return Err(ErrorKind::InvalidString(text).into());
                    }
                    block.strings.push(unquote(&text));
                }
                keyword => self.expect(keyword)?,
            }
        }
        self.memory.blocks_mut()[self.pc] = block;
        self.lines
            .insert(self.pc, (token.line, token.source_line.clone()));
        self.pc += 1;
        Ok(())
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        let mut expression = Expression::new(self.parse_operand()?);
        while let Some(op) = self.peek().and_then(|t| Operator::lookup(&t.text)) {
            self.advance()?;
            let operand = self.parse_operand()?;
            expression.rest.push((op, operand));
        }
        Ok(expression)
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let text = self.advance()?.text;
        if is_number(&text) {
            return text
                .parse()
                .map(Operand::Number)
                .map_err(|_| ErrorKind::InvalidNumber(text.clone()).into());
        }
        recognize_operand(&text).ok_or_else(|| ErrorKind::InvalidOperand(text).into())
    }

    /// Parse conditions, storing their expressions in `block`.
    fn parse_conditional(&mut self, block: &mut Block) -> Result<Conditional> {
        let mut conditional = Conditional::new(self.parse_condition(block)?);
        while let Some(logic) = self.peek().and_then(|t| Logic::lookup(&t.text)) {
            self.advance()?;
            let condition = self.parse_condition(block)?;
            conditional.rest.push((logic, condition));
        }
        Ok(conditional)
    }

    fn parse_condition(&mut self, block: &mut Block) -> Result<Condition> {
        block.expressions.push(self.parse_expression()?);
        let left = block.expressions.len() - 1;
        let text = self.advance()?.text;
        let test = Test::lookup(&text).ok_or(ErrorKind::InvalidTest(text))?;
        block.expressions.push(self.parse_expression()?);
        let right = block.expressions.len() - 1;
        Ok(Condition { left, test, right })
    }

    fn parse_number(&mut self) -> Result<i32> {
        let text = self.advance()?.text;
        if is_number(&text) {
            if let Ok(n) = text.parse() {
                return Ok(n);
            }
        }
        Err(ErrorKind::InvalidNumber(text).into())
    }

    fn parse_count(&mut self) -> Result<usize> {
        let text = self.advance()?.text;
        if is_unsigned(&text) {
            if let Ok(n) = text.parse() {
                return Ok(n);
            }
        }
        Err(ErrorKind::InvalidNumber(text).into())
    }

    fn expect(&mut self, keyword: &str) -> Result<()> {
        if self.advance()?.text == keyword {
            Ok(())
        } else {
            Err(ErrorKind::MissingKeyword(keyword.to_string()).into())
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    fn advance(&mut self) -> Result<Token> {
        let token = self.tokens.pop_front().ok_or(ErrorKind::OutOfTokens)?;
        self.last_token = token.clone();
        Ok(token)
    }
}

/// Classify an operand token, first match wins:
/// `#n`, `#n:field`, `#n:n:field`, `#n:n`, `"string"`, then the bracketed
/// forms `[name]`, `#[name]`, `#[name]:field`, `#[name]:[name]:field` and
/// `#[name]:[name]`. Number literals are handled by the caller.
///
/// A field name may be all digits, so `#n:field` also takes `#n:n`; hashes
/// are written with placeholders.
pub fn recognize_operand(text: &str) -> Option<Operand> {
    if let Some(rest) = text.strip_prefix('#') {
        let parts: Vec<&str> = rest.split(':').collect();
        match parts.as_slice() {
            [addr] if is_unsigned(addr) => return Some(Operand::Address(addr.parse().ok()?)),
            [addr, field] if is_unsigned(addr) && is_word(field) => {
                return Some(Operand::Field(addr.parse().ok()?, field.to_string()))
            }
            [base, index, field] if is_unsigned(base) && is_unsigned(index) && is_word(field) => {
                return Some(Operand::List {
                    base: base.parse().ok()?,
                    index: index.parse().ok()?,
                    field: field.to_string(),
                })
            }
            [base, key] if is_unsigned(base) && is_unsigned(key) => {
                return Some(Operand::Hash {
                    base: base.parse().ok()?,
                    key: key.parse().ok()?,
                })
            }
            _ => {}
        }
    }
    if is_string(text) {
        return Some(Operand::String(unquote(text)));
    }
    if let Some(name) = placeholder_name(text) {
        return Some(Operand::NumberSymbol(name.to_string()));
    }
    let (base, rest) = split_placeholder(text.strip_prefix('#')?)?;
    if rest.is_empty() {
        return Some(Operand::AddressSymbol(base.to_string()));
    }
    let rest = rest.strip_prefix(':')?;
    if is_word(rest) {
        return Some(Operand::FieldSymbol(base.to_string(), rest.to_string()));
    }
    let (index, rest) = split_placeholder(rest)?;
    if rest.is_empty() {
        return Some(Operand::HashSymbol {
            base: base.to_string(),
            key: index.to_string(),
        });
    }
    let field = rest.strip_prefix(':')?;
    if is_word(field) {
        Some(Operand::ListSymbol {
            base: base.to_string(),
            index: index.to_string(),
            field: field.to_string(),
        })
    } else {
        None
    }
}

/// Split `[name]rest` into `name` and `rest`.
fn split_placeholder(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix('[')?;
    let end = inner.find(']')?;
    if end == 0 {
        return None;
    }
    Some((&inner[..end], &inner[end + 1..]))
}
