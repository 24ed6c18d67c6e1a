//! JSON with comments.
//!
//! Layout descriptions are hand-edited, so they carry `//` line comments and
//! `/* ... */` block comments. [`strip_comments`] removes both with a single
//! left-to-right scan that never looks inside quoted strings, and the result
//! is handed to `serde_json`.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsoncError {
    #[error("invalid JSON at line {line}, column {column}: {source}")]
    Syntax {
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl From<serde_json::Error> for JsoncError {
    fn from(source: serde_json::Error) -> Self {
        JsoncError::Syntax {
            line: source.line(),
            column: source.column(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString { quote: char, escaped: bool },
    LineComment,
    BlockComment { saw_star: bool },
}

/// Removes `//` and `/* */` comments that appear outside quoted strings.
///
/// Both `"` and `'` open a string; a backslash escapes the next character
/// inside one. Line comments end before the line break, which is kept. An
/// unterminated block comment swallows the rest of the input.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut state = ScanState::Normal;

    while let Some(ch) = chars.next() {
        state = match state {
            ScanState::Normal => match ch {
                '"' | '\'' => {
                    out.push(ch);
                    ScanState::InString {
                        quote: ch,
                        escaped: false,
                    }
                }
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    ScanState::LineComment
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    ScanState::BlockComment { saw_star: false }
                }
                _ => {
                    out.push(ch);
                    ScanState::Normal
                }
            },
            ScanState::InString { quote, escaped } => {
                out.push(ch);
                if escaped {
                    ScanState::InString {
                        quote,
                        escaped: false,
                    }
                } else if ch == '\\' {
                    ScanState::InString {
                        quote,
                        escaped: true,
                    }
                } else if ch == quote {
                    ScanState::Normal
                } else {
                    state
                }
            }
            ScanState::LineComment => {
                if ch == '\n' || ch == '\r' {
                    out.push(ch);
                    ScanState::Normal
                } else {
                    ScanState::LineComment
                }
            }
            ScanState::BlockComment { saw_star } => {
                if saw_star && ch == '/' {
                    ScanState::Normal
                } else {
                    ScanState::BlockComment {
                        saw_star: ch == '*',
                    }
                }
            }
        };
    }

    out
}

/// Strips comments and parses the remainder into a JSON value.
pub fn parse_str(text: &str) -> Result<Value, JsoncError> {
    Ok(serde_json::from_str(&strip_comments(text))?)
}
