//! Time-sliced Virtual Machine for C-Lesh
//!
//! Interprets compiled blocks in place. [`VM::execute`] runs until the program
//! halts or its quantum is used up, then returns so the host can present a
//! frame and call it again.

use std::time::{Duration, Instant};

use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ast::{Condition, Expression, Logic, Operand, Operator, Test};
use crate::bytecode::{Block, OpCode};
use crate::compiler::Program;
use crate::device::{Color, Device, SoundMode, Sprite};
use crate::error::{ErrorKind, Result};
use crate::memory::{Location, Memory};
use crate::symbols::SymbolTable;
use crate::value::{Fields, Value};

/// Time a single call to [`VM::execute`] may run for
pub const DEFAULT_QUANTUM: Duration = Duration::from_millis(20);

/// Why [`VM::execute`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The program counter left memory; nothing more will run
    Halted,
    /// The quantum ran out; call again to continue
    Yielded,
}

/// The Virtual Machine
#[derive(Debug)]
pub struct VM {
    memory: Memory,
    symbols: SymbolTable,
    pc: usize,
    /// Return addresses pushed by `call`
    stack: Vec<usize>,
    /// Set by `stop`
    done: bool,
    quantum: Duration,
    rng: StdRng,
    trace: bool,
}

impl VM {
    pub fn new(program: Program) -> Self {
        Self {
            memory: program.memory,
            symbols: program.symbols,
            pc: 0,
            stack: Vec::new(),
            done: false,
            quantum: DEFAULT_QUANTUM,
            rng: StdRng::from_entropy(),
            trace: false,
        }
    }

    pub fn with_quantum(mut self, quantum: Duration) -> Self {
        self.quantum = quantum;
        self
    }

    /// Seed `rand` for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Print every interpreted block to stderr.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn stack(&self) -> &[usize] {
        &self.stack
    }

    /// Whether the program ran `stop`
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.memory.len()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Read the scalar value of a block.
    pub fn value_at(&self, address: i32) -> Result<Value> {
        Ok(self.memory.block(address)?.value.clone())
    }

    /// Run until halted or the quantum is spent. At least one block is
    /// interpreted per call unless the program has already halted.
    pub fn execute(&mut self, device: &mut dyn Device) -> Result<Status> {
        let deadline = Instant::now() + self.quantum;
        while !self.is_halted() {
            self.interpret(device)?;
            if Instant::now() >= deadline {
                break;
            }
        }
        Ok(self.status())
    }

    /// Interpret exactly one block.
    pub fn step(&mut self, device: &mut dyn Device) -> Result<Status> {
        if !self.is_halted() {
            self.interpret(device)?;
        }
        Ok(self.status())
    }

    fn status(&self) -> Status {
        if self.is_halted() {
            Status::Halted
        } else {
            Status::Yielded
        }
    }

    fn interpret(&mut self, device: &mut dyn Device) -> Result<()> {
        let pc = self.pc;
        if self.trace {
            eprintln!("{} {:04} {}", "trace".dimmed(), pc, self.memory.blocks()[pc]);
        }
        let block = self.memory.blocks()[pc].instruction();
        self.pc += 1;
        self.dispatch(&block, device)
            .map_err(|e| e.in_command(block.opcode.name(), pc))
    }

    fn dispatch(&mut self, block: &Block, device: &mut dyn Device) -> Result<()> {
        match block.opcode {
            OpCode::Data => {}

            OpCode::Test => {
                if !self.eval_conditional(block)? {
                    self.pc = (self.pc + 1).min(self.memory.len());
                }
            }

            OpCode::Move => {
                let target = self.eval_number(block, 0)?;
                self.jump(target)?;
            }

            OpCode::Call => {
                let target = self.eval_number(block, 0)?;
                let ret = self.pc;
                self.jump(target)?;
                self.stack.push(ret);
            }

            OpCode::Return => {
                self.pc = self.stack.pop().ok_or(ErrorKind::StackUnderflow)?;
            }

            OpCode::Stop => {
                self.pc = self.memory.len();
                self.done = true;
            }

            OpCode::Set => {
                let dest = block
                    .expressions
                    .first()
                    .and_then(Expression::single)
                    .filter(|operand| operand.is_writable())
                    .ok_or(ErrorKind::InvalidDestination)?;
                let data = self.eval_expression(block, 1)?;
                let location = self.memory.locate(dest)?;
                self.memory.write(&location, data)?;
            }

            OpCode::Output => {
                let text = self.eval_expression(block, 0)?.as_text();
                let x = self.eval_number(block, 1)?;
                let y = self.eval_number(block, 2)?;
                let color = Color::new(
                    self.eval_number(block, 3)? as u8,
                    self.eval_number(block, 4)? as u8,
                    self.eval_number(block, 5)? as u8,
                );
                device.queue_text(&text, x, y, color);
            }

            OpCode::Load => {
                let offset = self.eval_number(block, 0)?;
                let name = self.eval_expression(block, 1)?.as_text();
                let records = device.load_records(&name)?;
                for (index, record) in records.into_iter().enumerate() {
                    let address = record_address(&self.memory, offset, index)?;
                    self.memory.blocks_mut()[address].fields.extend(record);
                }
            }

            OpCode::Save => {
                let offset = self.eval_number(block, 0)?;
                let count = self.eval_number(block, 1)?;
                let name = self.eval_expression(block, 2)?.as_text();
                let mut records = Vec::new();
                for index in 0..count.max(0) as usize {
                    let address = record_address(&self.memory, offset, index)?;
                    records.push(self.memory.blocks()[address].fields.clone());
                }
                device.save_records(&name, &records)?;
            }

            OpCode::Draw => {
                let sprite = Sprite {
                    name: self.eval_expression(block, 0)?.as_text(),
                    x: self.eval_number(block, 1)?,
                    y: self.eval_number(block, 2)?,
                    scale: self.eval_number(block, 3)?,
                    angle: self.eval_number(block, 4)?,
                    layer: self.eval_number(block, 5)?,
                    flip_x: self.eval_number(block, 6)? != 0,
                    flip_y: self.eval_number(block, 7)? != 0,
                };
                device.queue_draw(sprite);
            }

            OpCode::Play | OpCode::Music => {
                let name = self.eval_expression(block, 0)?.as_text();
                let mode = SoundMode::parse(&self.eval_expression(block, 1)?.as_text())?;
                if block.opcode == OpCode::Play {
                    device.queue_sound(&name, mode);
                } else {
                    device.queue_track(&name, mode);
                }
            }

            OpCode::Input => {
                let address = self.eval_number(block, 0)?;
                let player = self.eval_number(block, 1)?;
                self.memory.check(address)?;
                let buttons = device.read_input(player)?;
                buttons.write_to(&mut self.memory.block_mut(address)?.fields);
            }

            OpCode::Collision => {
                let sprite = self.eval_number(block, 0)?;
                let other = self.eval_number(block, 1)?;
                let results = self.eval_number(block, 2)?;
                for address in [sprite, other, results] {
                    self.memory.check(address)?;
                }
                let sprite = self.fields(sprite)?;
                let other = self.fields(other)?;
                let mut fields = self.fields(results)?;
                device.detect_collision(&sprite, &other, &mut fields)?;
                self.memory.block_mut(results)?.fields = fields;
            }

            OpCode::Focus => {
                let sprite = self.eval_number(block, 0)?;
                let camera = self.eval_number(block, 1)?;
                self.memory.check(sprite)?;
                self.memory.check(camera)?;
                let sprite = self.fields(sprite)?;
                let mut fields = self.fields(camera)?;
                device.focus_camera(&mut fields, &sprite)?;
                self.memory.block_mut(camera)?.fields = fields;
            }

            OpCode::Update => device.flush_output()?,

            OpCode::Timeout => {
                let millis = self.eval_number(block, 0)?;
                device.pause(millis);
            }

            OpCode::Resource => {
                let name = self.eval_expression(block, 0)?.as_text();
                device.load_resource(&name);
            }

            OpCode::Upload => device.upload_resources()?,
        }
        Ok(())
    }

    /// Jump to `target`. Jumping to the end of memory halts.
    fn jump(&mut self, target: i32) -> Result<()> {
        if target < 0 || target as usize > self.memory.len() {
            return Err(ErrorKind::InvalidJump(target).into());
        }
        self.pc = target as usize;
        Ok(())
    }

    fn fields(&self, address: i32) -> Result<Fields> {
        Ok(self.memory.block(address)?.fields.clone())
    }

    // ==================== Evaluation ====================

    fn eval_number(&mut self, block: &Block, index: usize) -> Result<i32> {
        Ok(self.eval_expression(block, index)?.as_number())
    }

    /// Fold an expression strictly left to right.
    fn eval_expression(&mut self, block: &Block, index: usize) -> Result<Value> {
        let expression = block
            .expressions
            .get(index)
            .ok_or(ErrorKind::MissingExpression(index))?;
        let mut result = self.eval_operand(&expression.first)?;
        for (op, operand) in &expression.rest {
            let rhs = self.eval_operand(operand)?;
            result = self.apply(*op, result, rhs);
        }
        Ok(result)
    }

    fn eval_operand(&mut self, operand: &Operand) -> Result<Value> {
        match operand {
            Operand::Number(n) => Ok(Value::Number(*n)),
            Operand::String(s) => Ok(Value::String(s.clone())),
            _ if operand.is_symbolic() => {
                Err(ErrorKind::UndefinedSymbol(operand.to_string()).into())
            }
            _ => {
                let location: Location = self.memory.locate(operand)?;
                self.memory.read(&location)
            }
        }
    }

    fn apply(&mut self, op: Operator, lhs: Value, rhs: Value) -> Value {
        let (a, b) = (lhs.as_number(), rhs.as_number());
        let n = match op {
            Operator::Add => a.wrapping_add(b),
            Operator::Subtract => a.wrapping_sub(b),
            Operator::Multiply => a.wrapping_mul(b),
            Operator::Divide if b == 0 => 0,
            Operator::Divide => a.wrapping_div(b),
            Operator::Remainder if b == 0 => 0,
            Operator::Remainder => a.wrapping_rem(b),
            Operator::Concat => {
                return Value::String(format!("{}{}", lhs.as_text(), rhs.as_text()))
            }
            Operator::Random if b < 1 => a,
            Operator::Random => a.wrapping_add(self.rng.gen_range(1..=b)),
            Operator::Cosine => (a as f64 * (b as f64).to_radians().cos()) as i32,
            Operator::Sine => (a as f64 * (b as f64).to_radians().sin()) as i32,
        };
        Value::Number(n)
    }

    fn eval_condition(&mut self, block: &Block, condition: &Condition) -> Result<bool> {
        let left = self.eval_expression(block, condition.left)?;
        let right = self.eval_expression(block, condition.right)?;
        let (a, b) = (left.as_number(), right.as_number());
        Ok(match condition.test {
            Test::Eq => match &left {
                Value::String(s) => *s == right.as_text(),
                _ => a == b,
            },
            Test::Ne => match &left {
                Value::String(s) => *s != right.as_text(),
                _ => a != b,
            },
            Test::Lt => a < b,
            Test::Gt => a > b,
            Test::Le => a <= b,
            Test::Ge => a >= b,
        })
    }

    /// Every condition is evaluated. `and` multiplies the running result,
    /// `or` adds to it; the conditional holds when the total is positive.
    fn eval_conditional(&mut self, block: &Block) -> Result<bool> {
        let conditional = block
            .conditional
            .as_ref()
            .ok_or(ErrorKind::MalformedConditional)?;
        let mut result = self.eval_condition(block, &conditional.first)? as i32;
        for (logic, condition) in &conditional.rest {
            let value = self.eval_condition(block, condition)? as i32;
            result = match logic {
                Logic::And => result * value,
                Logic::Or => result + value,
            };
        }
        Ok(result > 0)
    }
}

/// Address of record `index` loaded or saved at `offset`. Record files may
/// not touch block 0.
fn record_address(memory: &Memory, offset: i32, index: usize) -> Result<usize> {
    let address = offset.wrapping_add(index as i32);
    if address > 0 && memory.is_valid(address) {
        Ok(address as usize)
    } else {
        Err(ErrorKind::InvalidAddress(address).into())
    }
}
