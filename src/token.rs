//! Token definitions for C-Lesh
//!
//! Source text is split on whitespace, so a token is just a word with the line
//! it came from. The predicates here classify token text for the compiler.

use std::fmt;

/// A whitespace-delimited word with its location for error reporting
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Token {
    pub text: String,
    /// 1-based line number in the preprocessed source
    pub line: usize,
    /// The full text of that line
    pub source_line: String,
}

impl Token {
    pub fn new(text: &str, line: usize, source_line: &str) -> Self {
        Self {
            text: text.to_string(),
            line,
            source_line: source_line.to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// `\w+`: letters, digits and underscores
pub fn is_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `0|[1-9][0-9]*`
pub fn is_unsigned(text: &str) -> bool {
    match text.as_bytes() {
        [b'0'] => true,
        [first, rest @ ..] => {
            (b'1'..=b'9').contains(first) && rest.iter().all(|b| b.is_ascii_digit())
        }
        [] => false,
    }
}

/// `0|-?[1-9][0-9]*`
pub fn is_number(text: &str) -> bool {
    match text.strip_prefix('-') {
        Some(rest) => rest != "0" && is_unsigned(rest),
        None => is_unsigned(text),
    }
}

/// `[name]` where name is non-empty and holds no `]`; returns the name
pub fn placeholder_name(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() || inner.contains(']') {
        None
    } else {
        Some(inner)
    }
}

/// A double-quoted string token. Inner quotes must be escaped as `\"`.
pub fn is_string(text: &str) -> bool {
    if text.len() < 2 || !text.starts_with('"') || !text.ends_with('"') {
        return false;
    }
    let inner = &text[1..text.len() - 1];
    let mut escaped = false;
    for c in inner.chars() {
        match c {
            '"' if !escaped => return false,
            '\\' => escaped = !escaped,
            _ => escaped = false,
        }
    }
    !escaped
}

/// Strip quotes and expand the `\"` and `\s` entities.
pub fn unquote(text: &str) -> String {
    text[1..text.len() - 1]
        .replace("\\\"", "\"")
        .replace("\\s", " ")
}
