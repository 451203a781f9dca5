//! Lexer and preprocessor for C-Lesh
//!
//! The preprocessor inlines `import "name"` lines with the contents of
//! `name.clsh`; the lexer then splits each line on whitespace.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CleshError, ErrorKind, Result};
use crate::token::{is_word, Token};

/// Extension of C-Lesh source files
pub const SOURCE_EXTENSION: &str = "clsh";

/// The lexer state
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from (preprocessed) source code
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the entire source
    pub fn tokenize(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        for (index, line) in self.source.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            for word in line.split_whitespace() {
                tokens.push(Token::new(word, index + 1, line));
            }
        }
        tokens
    }
}

/// Rewrites source text by inlining imports found under a root directory
pub struct Preprocessor {
    root: PathBuf,
}

impl Preprocessor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read `name` under the root and preprocess it.
    pub fn load(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        let source = fs::read_to_string(&path).map_err(|e| {
            CleshError::new(ErrorKind::Io(format!("{}: {}", path.display(), e)))
        })?;
        self.preprocess(&source)
    }

    /// Replace every import line with the verbatim text of the imported file.
    /// Imported text is not preprocessed again.
    pub fn preprocess(&self, source: &str) -> Result<String> {
        let mut code = String::with_capacity(source.len());
        for (index, line) in source.lines().enumerate() {
            match import_name(line) {
                Some(name) => {
                    let path = self.root.join(format!("{}.{}", name, SOURCE_EXTENSION));
                    let data = fs::read_to_string(&path).map_err(|_| {
                        CleshError::new(ErrorKind::ImportNotFound(name.to_string()))
                            .at_line(index + 1, line)
                    })?;
                    code.push_str(&data);
                    if !data.ends_with('\n') {
                        code.push('\n');
                    }
                }
                None => {
                    code.push_str(line);
                    code.push('\n');
                }
            }
        }
        Ok(code)
    }
}

/// Match `^\s*import\s+"(\w*)".*$` and return the module name.
fn import_name(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("import")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    let name = &rest[..end];
    if name.is_empty() || is_word(name) {
        Some(name)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<String> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_whitespace_split() {
        assert_eq!(
            tokenize("set #3   to\t5\n\nstop"),
            vec!["set", "#3", "to", "5", "stop"]
        );
    }

    #[test]
    fn test_line_numbers() {
        let tokens = Lexer::new("var x\r\n\nmove #[x]\n").tokenize();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].line, 3);
        assert_eq!(tokens[2].source_line, "move #[x]");
    }

    #[test]
    fn test_import_line() {
        assert_eq!(import_name(r#"import "sprites""#), Some("sprites"));
        assert_eq!(import_name(r#"   import   "lib_2" trailing"#), Some("lib_2"));
        assert_eq!(import_name(r#"imports "x""#), None);
        assert_eq!(import_name(r#"import "a-b""#), None);
        assert_eq!(import_name("set #1 to 2"), None);
    }

    #[test]
    fn test_missing_import() {
        let pre = Preprocessor::new(std::env::temp_dir().join("clesh-no-such-dir"));
        let err = pre.preprocess("stop\nimport \"nothing\"\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ImportNotFound("nothing".into()));
        assert_eq!(err.line, Some((2, "import \"nothing\"".into())));
    }

    #[test]
    fn test_import_inlined() {
        let dir = std::env::temp_dir().join(format!("clesh-lexer-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("util.clsh"), "label util\nreturn").unwrap();
        let code = Preprocessor::new(&dir)
            .preprocess("call #[util]\nimport \"util\"\nstop")
            .unwrap();
        assert_eq!(code, "call #[util]\nlabel util\nreturn\nstop\n");
        fs::remove_dir_all(&dir).ok();
    }
}
