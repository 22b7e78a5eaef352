//! Argument capture and the `#`/`##` substitution primitives.

use crate::preprocessor::store::{BodyPiece, Macro};

pub enum CaptureError {
    /// No `(` followed the macro name (whitespace/newlines were skipped
    /// looking for it). `ARGS_NON`.
    NoOpenParen,
    /// The matching `)` was never found. `ARGS_UNTERMINATED`.
    Unterminated,
}

/// Parses a comma-separated, parenthesis- and string-literal-aware argument
/// list starting at `input[pos..]`, which must begin (after whitespace)
/// with `(`. Returns the raw text of each argument and the byte offset
/// just past the matching `)`.
pub fn capture_arguments(input: &str, pos: usize) -> Result<(Vec<String>, usize), CaptureError> {
    let bytes = input.as_bytes();
    let mut i = pos;
    while i < bytes.len() && (bytes[i] as char).is_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'(' {
        return Err(CaptureError::NoOpenParen);
    }
    i += 1;

    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut any_token_seen = false;

    loop {
        if i >= bytes.len() {
            return Err(CaptureError::Unterminated);
        }
        let ch = input[i..].chars().next().unwrap();
        match ch {
            '"' | '\'' => {
                let quote = ch;
                let lit_start = i;
                i += ch.len_utf8();
                let mut escaped = false;
                loop {
                    if i >= bytes.len() {
                        return Err(CaptureError::Unterminated);
                    }
                    let c = input[i..].chars().next().unwrap();
                    i += c.len_utf8();
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == quote {
                        break;
                    }
                }
                current.push_str(&input[lit_start..i]);
                any_token_seen = true;
                continue;
            }
            '(' => {
                depth += 1;
                current.push(ch);
                any_token_seen = true;
            }
            ')' => {
                if depth == 0 {
                    args.push(std::mem::take(&mut current).trim().to_string());
                    i += 1;
                    break;
                }
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(std::mem::take(&mut current).trim().to_string());
                any_token_seen = false;
            }
            _ => {
                current.push(ch);
                if !ch.is_whitespace() {
                    any_token_seen = true;
                }
            }
        }
        i += ch.len_utf8();
    }

    // A call with no actual text between `(` and `)`, e.g. `F()`, is zero
    // arguments, not one empty argument.
    if args.len() == 1 && !any_token_seen && args[0].trim().is_empty() {
        args.clear();
    }

    Ok((args, i))
}

/// The `#` stringification operator: wraps raw argument text in quotes,
/// escaping embedded `"` and `\`.
pub fn stringify(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len() + 2);
    out.push('"');
    for ch in trimmed.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Builds the macro body with every marker replaced, given the already
/// macro-expanded form of each actual argument (`expanded_args`, used for
/// plain `Arg` references) and its raw form (`raw_args`, used for `#`/`##`).
/// The result still needs to be rescanned by the caller: this step only
/// performs marker substitution, never re-expansion.
pub fn substitute(mac: &Macro, raw_args: &[String], expanded_args: &[String]) -> String {
    let mut out = String::new();
    let mut prev_was_paste = false;
    for piece in &mac.body {
        match piece {
            BodyPiece::Text(t) => {
                if prev_was_paste {
                    out.push_str(t.trim_start());
                } else {
                    out.push_str(t);
                }
                prev_was_paste = false;
            }
            BodyPiece::Arg(i) => {
                out.push_str(&expanded_args[*i]);
                prev_was_paste = false;
            }
            BodyPiece::Str(i) => {
                out.push_str(&stringify(&raw_args[*i]));
                prev_was_paste = false;
            }
            BodyPiece::TokenPaste(i) => {
                while out.ends_with(|c: char| c.is_whitespace()) {
                    out.pop();
                }
                out.push_str(raw_args[*i].trim());
                prev_was_paste = true;
            }
        }
    }
    out
}
