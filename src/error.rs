//! Error types for C-Lesh
//!
//! Compile errors carry the offending source line, runtime errors carry the
//! command being executed and the program counter.

use std::fmt;

/// Error kinds in C-Lesh
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Compile errors
    OutOfTokens,
    MissingKeyword(String),
    InvalidCommand(String),
    InvalidOperand(String),
    InvalidNumber(String),
    InvalidString(String),
    InvalidTest(String),
    ProgramTooBig,
    UndefinedSymbol(String),
    ImportNotFound(String),

    // Runtime errors
    InvalidAddress(i32),
    InvalidJump(i32),
    StackUnderflow,
    MalformedConditional,
    MissingExpression(usize),
    InvalidDestination,
    UnknownPlayer(i32),

    // Device errors
    MissingField(String, String),
    InvalidRecord(String),
    InvalidMode(String),
    ResourceNotFound(String),
    Io(String),
    Device(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::OutOfTokens => write!(f, "out of tokens"),
            ErrorKind::MissingKeyword(k) => write!(f, "missing keyword '{}'", k),
            ErrorKind::InvalidCommand(c) => write!(f, "invalid command '{}'", c),
            ErrorKind::InvalidOperand(t) => write!(f, "operand is invalid ({})", t),
            ErrorKind::InvalidNumber(t) => write!(f, "'{}' is not a valid number", t),
            ErrorKind::InvalidString(t) => write!(f, "'{}' is not a valid string", t),
            ErrorKind::InvalidTest(t) => write!(f, "'{}' is not a valid test", t),
            ErrorKind::ProgramTooBig => write!(f, "program too big for memory"),
            ErrorKind::UndefinedSymbol(name) => write!(f, "label '{}' was not declared", name),
            ErrorKind::ImportNotFound(name) => write!(f, "cannot import '{}'", name),
            ErrorKind::InvalidAddress(addr) => write!(f, "invalid memory access at #{}", addr),
            ErrorKind::InvalidJump(addr) => write!(f, "jump outside of memory to #{}", addr),
            ErrorKind::StackUnderflow => write!(f, "too many returns"),
            ErrorKind::MalformedConditional => write!(f, "condition not formatted correctly"),
            ErrorKind::MissingExpression(idx) => write!(f, "no expression {} to process", idx),
            ErrorKind::InvalidDestination => write!(
                f,
                "destination needs to be a single address, field, list, or hash"
            ),
            ErrorKind::UnknownPlayer(p) => write!(f, "player number {} is out of bounds", p),
            ErrorKind::MissingField(object, field) => {
                write!(f, "{} object is missing field '{}'", object, field)
            }
            ErrorKind::InvalidRecord(msg) => write!(f, "invalid record: {}", msg),
            ErrorKind::InvalidMode(mode) => write!(f, "unknown mode '{}'", mode),
            ErrorKind::ResourceNotFound(name) => write!(f, "could not load resource '{}'", name),
            ErrorKind::Io(msg) => write!(f, "i/o error: {}", msg),
            ErrorKind::Device(msg) => write!(f, "{}", msg),
        }
    }
}

/// A C-Lesh error with source or execution context
#[derive(Debug, Clone, PartialEq)]
pub struct CleshError {
    pub kind: ErrorKind,
    /// Line number and text of the last token read (compile errors)
    pub line: Option<(usize, String)>,
    /// Command name and program counter (runtime errors)
    pub command: Option<(String, usize)>,
}

impl CleshError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            line: None,
            command: None,
        }
    }

    /// Attach the source line a compile error was raised on.
    pub fn at_line(mut self, number: usize, text: &str) -> Self {
        if self.line.is_none() {
            self.line = Some((number, text.to_string()));
        }
        self
    }

    /// Attach the command being interpreted when a runtime error was raised.
    pub fn in_command(mut self, name: &str, pc: usize) -> Self {
        if self.command.is_none() {
            self.command = Some((name.to_string(), pc));
        }
        self
    }

    pub fn is_compile_error(&self) -> bool {
        self.line.is_some()
    }
}

impl From<ErrorKind> for CleshError {
    fn from(kind: ErrorKind) -> Self {
        CleshError::new(kind)
    }
}

impl From<std::io::Error> for CleshError {
    fn from(e: std::io::Error) -> Self {
        CleshError::new(ErrorKind::Io(e.to_string()))
    }
}

impl fmt::Display for CleshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((number, text)) = &self.line {
            write!(f, "[line {}] Error: {}", number, self.kind)?;
            write!(f, "\n  | {}", text)?;
        } else if let Some((name, pc)) = &self.command {
            write!(f, "[pc {}: {}] Error: {}", pc, name, self.kind)?;
        } else {
            write!(f, "Error: {}", self.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for CleshError {}

/// Result type for C-Lesh operations
pub type Result<T> = std::result::Result<T, CleshError>;
