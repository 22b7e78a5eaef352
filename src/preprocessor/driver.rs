//! The preprocessor driver: directive dispatch, comment/whitespace
//! policy, and the character-level scan that feeds macro recognition.

use crate::preprocessor::directive;
use crate::preprocessor::error::{Diagnostic, ErrorKind};
use crate::preprocessor::expand::{self, CaptureError};
use crate::preprocessor::location::Location;
use crate::preprocessor::store::{Macro, MacroStore};

/// Depth limits for nested expansion and inclusion.
pub const INCLUDE_DEPTH_LIMIT: u32 = 32;
pub const CALL_DEPTH_LIMIT: u32 = 256;

/// The linker collaborator this module consumes: resolving
/// `#include` paths to header text is out of scope here.
pub trait IncludeResolver {
    fn search_internal(&self, path: &str) -> Option<usize>;
    fn search_external(&self, path: &str) -> Option<usize>;
    fn header_text(&self, index: usize) -> &str;
}

/// An `IncludeResolver` that resolves nothing; useful for preprocessing a
/// translation unit known not to use `#include`.
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn search_internal(&self, _path: &str) -> Option<usize> {
        None
    }
    fn search_external(&self, _path: &str) -> Option<usize> {
        None
    }
    fn header_text(&self, _index: usize) -> &str {
        ""
    }
}

/// Preprocesses `input` (the contents of file `file_id`) to completion,
/// returning the expanded text and any diagnostics raised along the way.
pub fn preprocess(input: &str, file_id: usize, resolver: &dyn IncludeResolver) -> (String, Vec<Diagnostic>) {
    let mut store = MacroStore::new();
    let mut diags = Vec::new();
    let mut out = String::new();
    let mut scanner = Scanner {
        input,
        pos: 0,
        loc: Location::start(file_id),
        store: &mut store,
        resolver,
        diags: &mut diags,
        include_depth: 0,
        call_depth: 0,
    };
    scanner.run(&mut out);
    (out, diags)
}

struct Scanner<'a, 'b> {
    input: &'a str,
    pos: usize,
    loc: Location,
    store: &'b mut MacroStore,
    resolver: &'b dyn IncludeResolver,
    diags: &'b mut Vec<Diagnostic>,
    include_depth: u32,
    call_depth: u32,
}

impl<'a, 'b> Scanner<'a, 'b> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.loc.line += 1;
            self.loc.column = 1;
            self.loc.begin_of_line_offset = self.pos;
        } else {
            self.loc.column += 1;
        }
        Some(ch)
    }

    fn error(&mut self, kind: ErrorKind) {
        self.diags.push(Diagnostic::error(kind, self.loc));
    }

    fn warning(&mut self, kind: ErrorKind) {
        self.diags.push(Diagnostic::warning(kind, self.loc));
    }

    /// Runs a nested scan over `text` sharing this scanner's store,
    /// resolver, diagnostics and depth counters (already bumped by the
    /// caller as appropriate), writing its output into `out`.
    fn rescan(&mut self, text: &str, out: &mut String) {
        let mut inner = Scanner {
            input: text,
            pos: 0,
            loc: self.loc,
            store: &mut *self.store,
            resolver: self.resolver,
            diags: &mut *self.diags,
            include_depth: self.include_depth,
            call_depth: self.call_depth,
        };
        inner.run(out);
    }

    fn run(&mut self, out: &mut String) {
        let mut line_start = true;
        loop {
            if self.at_end() {
                break;
            }
            if line_start {
                while matches!(self.peek(), Some(' ') | Some('\t')) {
                    out.push(self.bump().unwrap());
                }
                if self.peek() == Some('#') {
                    self.bump();
                    self.handle_directive(out);
                    line_start = true;
                    continue;
                }
                line_start = false;
            }
            match self.peek() {
                None => break,
                Some('\n') => {
                    out.push('\n');
                    self.bump();
                    line_start = true;
                }
                Some('/') if self.peek2() == Some('/') => self.skip_line_comment(out),
                Some('/') if self.peek2() == Some('*') => self.skip_block_comment(out),
                Some(q @ '"') | Some(q @ '\'') => self.copy_literal(out, q),
                Some('\\') if self.peek2() == Some('\n') => {
                    self.bump();
                    self.bump();
                    out.push('\n');
                }
                Some(c) if c.is_alphabetic() || c == '_' => self.scan_identifier(out),
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
    }

    fn skip_line_comment(&mut self, out: &mut String) {
        while !matches!(self.peek(), None | Some('\n')) {
            out.push(' ');
            self.bump();
        }
    }

    fn skip_block_comment(&mut self, out: &mut String) {
        self.bump();
        self.bump();
        let mut terminated = false;
        loop {
            if self.at_end() {
                break;
            }
            if self.peek() == Some('*') && self.peek2() == Some('/') {
                self.bump();
                self.bump();
                terminated = true;
                break;
            }
            let ch = self.bump().unwrap();
            out.push(if ch == '\n' { '\n' } else { ' ' });
        }
        if !terminated {
            self.error(ErrorKind::CommentUnterminated);
        }
    }

    fn copy_literal(&mut self, out: &mut String, quote: char) {
        out.push(self.bump().unwrap());
        let mut terminated = false;
        loop {
            if self.at_end() {
                break;
            }
            let ch = self.peek().unwrap();
            if ch == '\\' {
                out.push(self.bump().unwrap());
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
                continue;
            }
            if ch == '\n' {
                break;
            }
            out.push(self.bump().unwrap());
            if ch == quote {
                terminated = true;
                break;
            }
        }
        if !terminated {
            self.error(ErrorKind::StringUnterminated);
        }
    }

    fn read_raw_identifier(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        self.input[start..self.pos].to_string()
    }

    fn scan_identifier(&mut self, out: &mut String) {
        let name = self.read_raw_identifier();
        let mac = match self.store.get(&name) {
            Some(m) => m.clone(),
            None => {
                out.push_str(&name);
                return;
            }
        };
        if self.call_depth >= CALL_DEPTH_LIMIT {
            self.error(ErrorKind::CallDepth);
            out.push_str(&name);
            return;
        }
        if mac.object_like {
            self.expand_object_like(&name, &mac, out);
        } else {
            self.expand_function_like(&name, &mac, out);
        }
    }

    fn expand_object_like(&mut self, name: &str, mac: &Macro, out: &mut String) {
        let body = expand::substitute(mac, &[], &[]);
        self.call_depth += 1;
        self.rescan(&body, out);
        self.call_depth -= 1;
        let _ = name;
    }

    fn expand_function_like(&mut self, name: &str, mac: &Macro, out: &mut String) {
        let (raw_args, consumed_end) = match expand::capture_arguments(self.input, self.pos) {
            Ok(v) => v,
            Err(CaptureError::NoOpenParen) => {
                self.error(ErrorKind::ArgsNon(name.to_string()));
                out.push_str(name);
                return;
            }
            Err(CaptureError::Unterminated) => {
                self.error(ErrorKind::ArgsUnterminated);
                out.push_str(name);
                out.push_str(self.rest());
                self.pos = self.input.len();
                return;
            }
        };

        if raw_args.len() != mac.arg_count() {
            if raw_args.len() < mac.arg_count() {
                self.error(ErrorKind::ArgsRequires(name.to_string()));
            } else {
                self.error(ErrorKind::ArgsPassed(name.to_string()));
            }
            out.push_str(&self.input[self.pos - name.len()..consumed_end]);
            self.pos = consumed_end;
            return;
        }

        self.call_depth += 1;
        let mut expanded_args = Vec::with_capacity(raw_args.len());
        for raw in &raw_args {
            let mut piece = String::new();
            self.rescan(raw, &mut piece);
            expanded_args.push(piece);
        }
        let body = expand::substitute(mac, &raw_args, &expanded_args);
        self.pos = consumed_end;
        self.rescan(&body, out);
        self.call_depth -= 1;
    }

    fn consume_to_eol(&mut self, out: &mut String) {
        let mut extra = false;
        while !matches!(self.peek(), None | Some('\n')) {
            if !self.peek().unwrap().is_whitespace() {
                extra = true;
            }
            self.bump();
        }
        if extra {
            self.warning(ErrorKind::DirectiveExtraTokens);
        }
        if self.peek() == Some('\n') {
            self.bump();
        }
        out.push('\n');
    }

    fn skip_inline_spaces(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.bump();
        }
    }

    fn line_text(&self) -> &'a str {
        let end = self.rest().find('\n').unwrap_or(self.rest().len());
        &self.rest()[..end]
    }

    fn handle_directive(&mut self, out: &mut String) {
        self.skip_inline_spaces();
        match self.peek() {
            Some(c) if c.is_alphabetic() => {}
            Some('\n') | None => {
                self.error(ErrorKind::DirectiveNameNon);
                self.consume_to_eol(out);
                return;
            }
            Some(c) => {
                self.error(ErrorKind::CharacterStray(c));
                self.consume_to_eol(out);
                return;
            }
        }
        let name = self.read_raw_identifier();
        match name.as_str() {
            "define" => self.handle_define(false, out),
            "set" => self.handle_define(true, out),
            "undef" => self.handle_undef(out),
            "include" => self.handle_include(out),
            "line" => {
                self.warning(ErrorKind::DirectiveLineSkipped);
                self.consume_to_eol(out);
            }
            _ => {
                self.error(ErrorKind::DirectiveInvalid(name));
                self.consume_to_eol(out);
            }
        }
    }

    fn handle_define(&mut self, allow_redefine: bool, out: &mut String) {
        self.skip_inline_spaces();
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            Some('\n') | None => {
                self.error(ErrorKind::DirectiveNameNon);
                self.consume_to_eol(out);
                return;
            }
            Some(_) => {
                self.error(ErrorKind::MacroNameFirstCharacter);
                self.consume_to_eol(out);
                return;
            }
        }
        let name = self.read_raw_identifier();

        let mut object_like = true;
        let mut params = Vec::new();
        if self.peek() == Some('(') {
            object_like = false;
            self.bump();
            match directive::parse_param_list(self.rest()) {
                Ok((p, consumed)) => {
                    params = p;
                    for _ in 0..consumed {
                        self.bump();
                    }
                }
                Err(e) => {
                    self.error(e);
                    self.consume_to_eol(out);
                    return;
                }
            }
        }

        self.skip_inline_spaces();
        let body_text = self.line_text().to_string();

        match directive::parse_define_body(&params, &body_text) {
            Ok(pieces) => {
                let mac = Macro { params, body: pieces, object_like };
                let existed = if allow_redefine {
                    self.store.set(name.clone(), mac)
                } else {
                    self.store.define(name.clone(), mac)
                };
                if existed && !allow_redefine {
                    self.error(ErrorKind::MacroNameRedefine(name));
                } else if !existed && allow_redefine {
                    self.warning(ErrorKind::MacroNameUndefined(name));
                }
            }
            Err(e) => self.error(e),
        }
        for _ in 0..body_text.chars().count() {
            self.bump();
        }
        self.consume_to_eol(out);
    }

    fn handle_undef(&mut self, out: &mut String) {
        self.skip_inline_spaces();
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            Some('\n') | None => {
                self.error(ErrorKind::DirectiveNameNon);
                self.consume_to_eol(out);
                return;
            }
            Some(_) => {
                self.error(ErrorKind::MacroNameFirstCharacter);
                self.consume_to_eol(out);
                return;
            }
        }
        let name = self.read_raw_identifier();
        self.store.undef(&name);
        self.consume_to_eol(out);
    }

    fn handle_include(&mut self, out: &mut String) {
        self.skip_inline_spaces();
        let (path, external) = match self.peek() {
            Some('"') => {
                self.bump();
                let start = self.pos;
                while !matches!(self.peek(), None | Some('"') | Some('\n')) {
                    self.bump();
                }
                let path = self.input[start..self.pos].to_string();
                if self.peek() == Some('"') {
                    self.bump();
                }
                (path, false)
            }
            Some('<') => {
                self.bump();
                let start = self.pos;
                while !matches!(self.peek(), None | Some('>') | Some('\n')) {
                    self.bump();
                }
                let path = self.input[start..self.pos].to_string();
                if self.peek() == Some('>') {
                    self.bump();
                }
                (path, true)
            }
            _ => {
                self.error(ErrorKind::IncludeExpectsFilename);
                self.consume_to_eol(out);
                return;
            }
        };

        if self.include_depth + 1 > INCLUDE_DEPTH_LIMIT {
            self.error(ErrorKind::IncludeDepth);
            self.consume_to_eol(out);
            return;
        }

        let index = if external {
            self.resolver.search_external(&path)
        } else {
            self.resolver.search_internal(&path)
        };
        match index {
            Some(idx) => {
                let text = self.resolver.header_text(idx).to_string();
                let mut inner = Scanner {
                    input: &text,
                    pos: 0,
                    loc: Location::start(idx),
                    store: &mut *self.store,
                    resolver: self.resolver,
                    diags: &mut *self.diags,
                    include_depth: self.include_depth + 1,
                    call_depth: self.call_depth,
                };
                inner.run(out);
            }
            None => self.error(ErrorKind::IncludeNoSuchFile(path)),
        }
        self.consume_to_eol(out);
    }
}
