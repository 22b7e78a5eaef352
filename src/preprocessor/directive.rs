//! `#define` / `#set` body parsing: lowers `#param` and `param1 ## param2`
//! into the marker vocabulary, and the parameter-list grammar shared
//! by `#define`/`#set`.

use crate::preprocessor::error::ErrorKind;
use crate::preprocessor::store::BodyPiece;

#[derive(Clone, Debug)]
enum Piece2 {
    Text(String),
    Ident(String),
    Str(usize),
    HashHash,
}

fn tokenize_body(body: &str) -> Vec<Piece2> {
    let chars: Vec<char> = body.chars().collect();
    let mut toks = Vec::new();
    let mut text_buf = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_alphabetic() || c == '_' {
            if !text_buf.is_empty() {
                toks.push(Piece2::Text(std::mem::take(&mut text_buf)));
            }
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            toks.push(Piece2::Ident(chars[start..i].iter().collect()));
        } else if c == '#' && chars.get(i + 1) == Some(&'#') {
            if !text_buf.is_empty() {
                toks.push(Piece2::Text(std::mem::take(&mut text_buf)));
            }
            toks.push(Piece2::HashHash);
            i += 2;
        } else if c == '#' {
            if !text_buf.is_empty() {
                toks.push(Piece2::Text(std::mem::take(&mut text_buf)));
            }
            toks.push(Piece2::Ident("#".to_string())); // placeholder, resolved below
            i += 1;
        } else {
            text_buf.push(c);
            i += 1;
        }
    }
    if !text_buf.is_empty() {
        toks.push(Piece2::Text(text_buf));
    }
    toks
}

/// Lowers the raw text of a `#define`/`#set` body into the marker sequence
/// given the macro's parameter names.
pub fn parse_define_body(params: &[String], raw_body: &str) -> Result<Vec<BodyPiece>, ErrorKind> {
    let param_index = |name: &str| params.iter().position(|p| p == name);
    let toks = tokenize_body(raw_body);

    // Pass 1: resolve bare '#' (tokenized above as a sentinel Ident("#"))
    // into a stringify marker on the following parameter.
    let mut pass1: Vec<Piece2> = Vec::new();
    let mut i = 0;
    while i < toks.len() {
        if let Piece2::Ident(s) = &toks[i] {
            if s == "#" {
                let mut j = i + 1;
                while let Some(Piece2::Text(t)) = toks.get(j) {
                    if t.trim().is_empty() {
                        j += 1;
                        continue;
                    }
                    break;
                }
                if let Some(Piece2::Ident(name)) = toks.get(j) {
                    if let Some(idx) = param_index(name) {
                        pass1.push(Piece2::Str(idx));
                        i = j + 1;
                        continue;
                    }
                }
                return Err(ErrorKind::HashNotFollowed);
            }
        }
        pass1.push(toks[i].clone());
        i += 1;
    }

    // Drop whitespace-only text immediately touching a '##', so the paste
    // below sees its true neighbouring token.
    let mut cleaned: Vec<Piece2> = Vec::new();
    for (k, tok) in pass1.iter().enumerate() {
        if let Piece2::Text(t) = tok {
            if t.trim().is_empty() {
                let touches_paste = (k > 0 && matches!(pass1[k - 1], Piece2::HashHash))
                    || (k + 1 < pass1.len() && matches!(pass1[k + 1], Piece2::HashHash));
                if touches_paste {
                    continue;
                }
            }
        }
        cleaned.push(tok.clone());
    }

    if matches!(cleaned.first(), Some(Piece2::HashHash)) || matches!(cleaned.last(), Some(Piece2::HashHash)) {
        return Err(ErrorKind::HashOnEdge);
    }

    let mut out: Vec<BodyPiece> = Vec::new();
    let mut k = 0;
    while k < cleaned.len() {
        match &cleaned[k] {
            Piece2::HashHash => {
                match out.pop() {
                    Some(BodyPiece::Arg(idx)) => out.push(BodyPiece::TokenPaste(idx)),
                    Some(BodyPiece::Text(t)) => out.push(BodyPiece::Text(t.trim_end().to_string())),
                    Some(other) => out.push(other),
                    None => return Err(ErrorKind::HashOnEdge),
                }
                k += 1;
                match cleaned.get(k) {
                    Some(Piece2::Ident(name)) => {
                        if let Some(idx) = param_index(name) {
                            out.push(BodyPiece::TokenPaste(idx));
                        } else {
                            out.push(BodyPiece::Text(name.clone()));
                        }
                    }
                    Some(Piece2::Text(t)) => out.push(BodyPiece::Text(t.trim_start().to_string())),
                    Some(Piece2::Str(idx)) => out.push(BodyPiece::Str(*idx)),
                    Some(Piece2::HashHash) => return Err(ErrorKind::HashOnEdge),
                    None => return Err(ErrorKind::HashOnEdge),
                }
                k += 1;
            }
            Piece2::Ident(name) => {
                if let Some(idx) = param_index(name) {
                    out.push(BodyPiece::Arg(idx));
                } else {
                    push_text(&mut out, name);
                }
                k += 1;
            }
            Piece2::Str(idx) => {
                out.push(BodyPiece::Str(*idx));
                k += 1;
            }
            Piece2::Text(t) => {
                push_text(&mut out, t);
                k += 1;
            }
        }
    }

    Ok(out)
}

fn push_text(out: &mut Vec<BodyPiece>, text: &str) {
    if let Some(BodyPiece::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(BodyPiece::Text(text.to_string()));
    }
}

/// Parses a `#define NAME(p1, p2, ...)` / `#define NAME()` parameter list,
/// starting right after the `(` the caller already consumed. Returns the
/// parameter names in order and the byte offset in `input` just past the
/// closing `)`.
pub fn parse_param_list(input: &str) -> Result<(Vec<String>, usize), ErrorKind> {
    let mut params = Vec::new();
    let mut pos = 0;
    // Only spaces/tabs are skipped here -- a newline ends the directive
    // line and must terminate the scan, not be treated as filler.
    let skip_ws = |s: &str| s.len() - s.trim_start_matches([' ', '\t']).len();
    pos += skip_ws(&input[pos..]);
    match input[pos..].chars().next() {
        Some(')') => return Ok((params, pos + 1)),
        Some('\n') | None => return Err(ErrorKind::ArgsExpectedBracket),
        _ => {}
    }
    loop {
        pos += skip_ws(&input[pos..]);
        let rest = &input[pos..];
        match rest.chars().next() {
            Some('\n') | None => return Err(ErrorKind::ArgsExpectedBracket),
            _ => {}
        }
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 || rest.as_bytes()[0].is_ascii_digit() {
            return Err(ErrorKind::ArgsExpectedName);
        }
        let name = rest[..end].to_string();
        if params.contains(&name) {
            return Err(ErrorKind::ArgsDuplicate(name));
        }
        params.push(name);
        pos += end;
        pos += skip_ws(&input[pos..]);
        match input[pos..].chars().next() {
            Some(',') => {
                pos += 1;
                continue;
            }
            Some(')') => {
                pos += 1;
                break;
            }
            Some('\n') | None => return Err(ErrorKind::ArgsExpectedBracket),
            _ => return Err(ErrorKind::ArgsExpectedComma),
        }
    }
    Ok((params, pos))
}
