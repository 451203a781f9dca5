//! Run settings for the `clesh` binary

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compiler::Program;
use crate::lexer::SOURCE_EXTENSION;
use crate::vm::{DEFAULT_QUANTUM, VM};

/// How a game is loaded and run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Game directory; imports, resources and records resolve against it
    pub root: PathBuf,
    /// Name of the main source file without extension
    pub game: String,
    pub memory_size: usize,
    pub quantum: Duration,
    pub seed: Option<u64>,
    pub trace: bool,
    /// Print each frame's text output
    pub echo: bool,
}

impl Settings {
    /// Settings for the game in directory `root`. The main file is named
    /// after the directory.
    pub fn new(root: impl Into<PathBuf>, memory_size: usize) -> Self {
        let root = root.into();
        let game = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string());
        Self {
            root,
            game,
            memory_size,
            quantum: DEFAULT_QUANTUM,
            seed: None,
            trace: false,
            echo: false,
        }
    }

    /// Parse `<game> <memory> [--quantum ms] [--seed n] [--trace] [--echo]`.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let (game, memory) = match args {
            [game, memory, ..] => (game, memory),
            [_] => return Err("missing memory size".to_string()),
            [] => return Err("missing game directory".to_string()),
        };
        let memory_size = memory
            .parse::<usize>()
            .map_err(|_| format!("invalid memory size '{}'", memory))?;
        if memory_size == 0 {
            return Err("memory size must be positive".to_string());
        }
        let mut settings = Settings::new(game, memory_size);

        let mut rest = args[2..].iter();
        while let Some(arg) = rest.next() {
            match arg.as_str() {
                "--quantum" => {
                    let value = rest.next().ok_or("--quantum needs a value")?;
                    let millis = value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid quantum '{}'", value))?;
                    settings.quantum = Duration::from_millis(millis);
                }
                "--seed" => {
                    let value = rest.next().ok_or("--seed needs a value")?;
                    let seed = value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid seed '{}'", value))?;
                    settings.seed = Some(seed);
                }
                "--trace" => settings.trace = true,
                "--echo" => settings.echo = true,
                other => return Err(format!("unknown option '{}'", other)),
            }
        }
        Ok(settings)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name of the main source, relative to the root
    pub fn source_file(&self) -> String {
        format!("{}.{}", self.game, SOURCE_EXTENSION)
    }

    /// A VM for `program` configured with these settings.
    pub fn build_vm(&self, program: Program) -> VM {
        let vm = VM::new(program)
            .with_quantum(self.quantum)
            .with_trace(self.trace);
        match self.seed {
            Some(seed) => vm.with_seed(seed),
            None => vm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_args(&args(&["games/pong", "1024"])).unwrap();
        assert_eq!(settings.game, "pong");
        assert_eq!(settings.source_file(), "pong.clsh");
        assert_eq!(settings.memory_size, 1024);
        assert_eq!(settings.quantum, DEFAULT_QUANTUM);
        assert_eq!(settings.seed, None);
        assert!(!settings.trace);
    }

    #[test]
    fn test_options() {
        let settings = Settings::from_args(&args(&[
            "pong", "64", "--quantum", "5", "--seed", "42", "--trace", "--echo",
        ]))
        .unwrap();
        assert_eq!(settings.quantum, Duration::from_millis(5));
        assert_eq!(settings.seed, Some(42));
        assert!(settings.trace);
        assert!(settings.echo);
    }

    #[test]
    fn test_bad_args() {
        assert!(Settings::from_args(&args(&["pong"])).is_err());
        assert!(Settings::from_args(&args(&["pong", "lots"])).is_err());
        assert!(Settings::from_args(&args(&["pong", "0"])).is_err());
        assert!(Settings::from_args(&args(&["pong", "64", "--seed"])).is_err());
        assert!(Settings::from_args(&args(&["pong", "64", "--fast"])).is_err());
    }
}
