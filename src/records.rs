//! Short-link record parsing.
//!
//! Records are `short,target` lines: the short code on the left, the
//! redirect target on the right. Parsing builds the lookup map the server
//! serves from and rejects the whole file on the first bad record, so a
//! deploy with a broken record file fails loudly instead of dropping links.

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::OnceLock;

use regex::Regex;

/// Global regex for short code validation (compiled once)
static SHORT_CODE_REGEX: OnceLock<Regex> = OnceLock::new();

fn short_code_regex() -> &'static Regex {
    SHORT_CODE_REGEX.get_or_init(|| Regex::new("^[-A-Za-z0-9]+$").expect("Invalid regex"))
}

/// Error type for record parsing. All variants carry the 1-based line
/// number of the offending record.
#[derive(Debug)]
pub enum RecordError {
    /// Failed to read the input.
    Read { error: io::Error },
    /// Line does not have exactly two comma-separated fields.
    FieldCount { line: usize, record: String },
    /// Short code seen earlier in the file.
    Duplicate { line: usize, short: String },
    /// Short code contains characters outside letters, digits and "-".
    InvalidShort { line: usize, short: String },
    /// Target does not start with "http".
    InvalidTarget { line: usize, target: String },
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::Read { error } => {
                write!(f, "failed to read records: {}", error)
            }
            RecordError::FieldCount { line, record } => {
                write!(f, "line {}: record does not have 2 fields: '{}'", line, record)
            }
            RecordError::Duplicate { line, short } => {
                write!(f, "line {}: short url '{}' already exists", line, short)
            }
            RecordError::InvalidShort { line, short } => {
                write!(f, "line {}: short url '{}' has invalid characters", line, short)
            }
            RecordError::InvalidTarget { line, target } => {
                write!(f, "line {}: target '{}' does not start with http", line, target)
            }
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Read { error } => Some(error),
            _ => None,
        }
    }
}

/// Parse `short,target` records into a lookup map.
///
/// Short code operations: surrounding whitespace trimmed, trailing `/`
/// removed. Short code checks: only letters, digits and `-`; no
/// duplicates. Target operations: surrounding whitespace trimmed. Target
/// checks: must start with `http`. Empty lines are skipped; quoting is
/// not supported.
pub fn parse<R: Read>(mut r: R) -> Result<HashMap<String, String>, RecordError> {
    let mut input = String::new();
    r.read_to_string(&mut input)
        .map_err(|error| RecordError::Read { error })?;

    let mut map = HashMap::new();
    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }

        let mut fields = raw.split(',');
        let (short, target) = match (fields.next(), fields.next(), fields.next()) {
            (Some(short), Some(target), None) => (short, target),
            _ => {
                return Err(RecordError::FieldCount {
                    line,
                    record: raw.to_string(),
                })
            }
        };

        let short = short.trim().trim_end_matches('/').to_string();
        if map.contains_key(&short) {
            return Err(RecordError::Duplicate { line, short });
        }
        if !short_code_regex().is_match(&short) {
            return Err(RecordError::InvalidShort { line, short });
        }

        let target = target.trim().to_string();
        if !target.starts_with("http") {
            return Err(RecordError::InvalidTarget { line, target });
        }

        map.insert(short, target);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        struct Case {
            input: &'static str,
            is_err: bool,
            count: usize,
        }

        let cases = [
            Case {
                input: "abc,http://def",
                is_err: false,
                count: 1,
            },
            Case {
                input: " abc, http://def",
                is_err: false,
                count: 1,
            },
            Case {
                // record does not have two fields
                input: " abc|http://def",
                is_err: true,
                count: 0,
            },
            Case {
                // three fields
                input: "abc,http://def,extra",
                is_err: true,
                count: 0,
            },
            Case {
                // duplicate abc
                input: "abc, http://def\n abc,http://deg",
                is_err: true,
                count: 0,
            },
            Case {
                // short code has non alphanumeric/- chars
                input: "abc#, http://def",
                is_err: true,
                count: 0,
            },
            Case {
                // short code has a space
                input: "a bc, http://def",
                is_err: true,
                count: 0,
            },
            Case {
                // target does not start with http
                input: "abc, def",
                is_err: true,
                count: 0,
            },
            Case {
                input: "abc, https://def\nghi,https://xyz",
                is_err: false,
                count: 2,
            },
            Case {
                // trailing blank lines
                input: "abc, https://def\nghi,https://xyz\n\n",
                is_err: false,
                count: 2,
            },
        ];

        for (i, case) in cases.iter().enumerate() {
            let result = parse(case.input.as_bytes());
            match result {
                Ok(map) => {
                    assert!(!case.is_err, "case {}: expected error, got {:?}", i, map);
                    assert_eq!(map.len(), case.count, "case {}: wrong record count", i);
                }
                Err(err) => {
                    assert!(case.is_err, "case {}: unexpected error {}", i, err);
                }
            }
        }
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let map = parse("abc/,http://def".as_bytes()).unwrap();
        assert_eq!(map.get("abc").map(String::as_str), Some("http://def"));
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = parse("abc,http://def\n\nbad line".as_bytes()).unwrap_err();
        match err {
            RecordError::FieldCount { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {}", other),
        }
    }

    // Tests the record file shipped with the binary.
    #[test]
    fn test_bundled_records() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/short-urls.csv");
        let file = std::fs::File::open(path).expect("bundled record file");
        let map = parse(file).expect("bundled records should parse");
        assert!(!map.is_empty());
    }
}
