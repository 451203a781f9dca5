//! C-Lesh - a block-addressed game scripting language
//!
//! Source is compiled into a fixed-size memory of blocks and interpreted by a
//! cooperative, time-sliced VM that talks to the outside world through a
//! [`Device`].

pub mod token;
pub mod lexer;
pub mod ast;
pub mod value;
pub mod error;
pub mod bytecode;
pub mod memory;
pub mod symbols;
pub mod compiler;
pub mod vm;
pub mod device;
pub mod console;
pub mod records;
pub mod config;

pub use compiler::{Compiler, Program};
pub use config::Settings;
pub use console::Console;
pub use device::Device;
pub use error::{CleshError, ErrorKind, Result};
pub use lexer::{Lexer, Preprocessor};
pub use memory::Memory;
pub use value::Value;
pub use vm::{Status, VM};

/// Compile source text (without imports) for a memory of `memory_size` blocks.
pub fn compile(source: &str, memory_size: usize, device: &mut dyn Device) -> Result<Program> {
    Compiler::new(memory_size, device.screen_size()).compile(source, device)
}

/// Preprocess and compile the main file of a game.
pub fn load(settings: &Settings, device: &mut dyn Device) -> Result<Program> {
    let source = Preprocessor::new(&settings.root).load(&settings.source_file())?;
    compile(&source, settings.memory_size, device)
}

/// Convenience function to run C-Lesh code on a headless console until it
/// halts. Returns the VM so its memory can be inspected.
pub fn run(source: &str, memory_size: usize) -> Result<VM> {
    let mut console = Console::new(".");
    let program = compile(source, memory_size, &mut console)?;
    let mut vm = VM::new(program);
    while vm.execute(&mut console)? == Status::Yielded {}
    Ok(vm)
}

/// Version of the C-Lesh toolchain
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
