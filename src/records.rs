//! Record files for `load` and `save`
//!
//! One record per line, `name=value` pairs separated by commas. Whitespace
//! around `,` and `=` is ignored and integer-looking values become numbers.

use crate::error::{ErrorKind, Result};
use crate::value::{Fields, Value};

/// Parse a single record line.
pub fn parse_record(line: &str) -> Result<Fields> {
    let mut fields = Fields::new();
    for pair in line.trim().split(',') {
        let parts: Vec<&str> = pair.split('=').map(str::trim).collect();
        match parts.as_slice() {
            [name, value] => {
                fields.insert(name.to_string(), Value::parse(value));
            }
            _ => {
                return Err(
                    ErrorKind::InvalidRecord(format!("'{}' is not a name=value pair", pair.trim()))
                        .into(),
                )
            }
        }
    }
    Ok(fields)
}

/// Parse a whole record file, skipping blank lines.
pub fn parse_records(text: &str) -> Result<Vec<Fields>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_record)
        .collect()
}

pub fn write_record(fields: &Fields) -> String {
    fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("{}={}", name, value.as_text()))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn write_records(records: &[Fields]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&write_record(record));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let fields = parse_record("name = hero , hp=10,  level=-2").unwrap();
        assert_eq!(fields["name"], Value::from("hero"));
        assert_eq!(fields["hp"], Value::Number(10));
        assert_eq!(fields["level"], Value::Number(-2));
    }

    #[test]
    fn test_bad_pairs() {
        assert!(parse_record("name").is_err());
        assert!(parse_record("a=1=2").is_err());
        assert!(parse_record("a=1,,b=2").is_err());
    }

    #[test]
    fn test_blank_lines_skipped() {
        let records = parse_records("x=1\n\n   \ny=2\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["y"], Value::Number(2));
    }

    #[test]
    fn test_write_record() {
        let fields = parse_record("y=2,x=1,name=door").unwrap();
        assert_eq!(write_record(&fields), "name=door,x=1,y=2");
        assert_eq!(write_records(&[fields.clone(), Fields::new()]), "name=door,x=1,y=2\n\n");
    }
}
