//! The lexer.
//!
//! Runs over text that has already passed through [`crate::preprocessor`] --
//! directives, macros and comments are gone by the time this sees it, so
//! the matcher table only has to know about the C-like language itself.

use derive_more::Display;
use regex::Regex;

/// Tokens in the program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("kind: '{kind}', part of input: '{text}'")]
pub struct Token<'src> {
    /// What token class this token belongs to.
    pub kind: TokenKind,
    /// What part of the input this token carries.
    pub text: &'src str,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display, Debug)]
pub enum TokenKind {
    #[display("id")]
    Id,
    #[display("int-literal")]
    IntLiteral,
    #[display("float-literal")]
    FloatLiteral,
    #[display("char-literal")]
    CharLiteral,
    #[display("string-literal")]
    StringLiteral,

    #[display("void")]
    Void,
    #[display("bool")]
    Bool,
    #[display("char")]
    Char,
    #[display("int")]
    Int,
    #[display("float")]
    Float,
    #[display("struct")]
    Struct,
    #[display("true")]
    True,
    #[display("false")]
    False,
    #[display("if")]
    If,
    #[display("else")]
    Else,
    #[display("switch")]
    Switch,
    #[display("case")]
    Case,
    #[display("default")]
    Default,
    #[display("while")]
    While,
    #[display("do")]
    Do,
    #[display("for")]
    For,
    #[display("break")]
    Break,
    #[display("continue")]
    Continue,
    #[display("return")]
    Return,
    #[display("abs")]
    Abs,

    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,
    #[display("[")]
    LBracket,
    #[display("]")]
    RBracket,
    #[display(";")]
    Semi,
    #[display(",")]
    Comma,
    #[display(".")]
    Dot,
    #[display("->")]
    Arrow,
    #[display("?")]
    Question,
    #[display(":")]
    Colon,

    #[display("=")]
    Assign,
    #[display("+=")]
    AddAssign,
    #[display("-=")]
    SubAssign,
    #[display("*=")]
    MulAssign,
    #[display("/=")]
    DivAssign,
    #[display("%=")]
    RemAssign,
    #[display("<<=")]
    ShlAssign,
    #[display(">>=")]
    ShrAssign,
    #[display("&=")]
    AndAssign,
    #[display("|=")]
    OrAssign,
    #[display("^=")]
    XorAssign,

    #[display("++")]
    Inc,
    #[display("--")]
    Dec,

    #[display("&&")]
    AndAnd,
    #[display("||")]
    OrOr,
    #[display("!")]
    Not,

    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<=")]
    Le,
    #[display(">=")]
    Ge,
    #[display("<<")]
    Shl,
    #[display(">>")]
    Shr,
    #[display("<")]
    Lt,
    #[display(">")]
    Gt,

    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Star,
    #[display("/")]
    Slash,
    #[display("%")]
    Percent,
    #[display("&")]
    Amp,
    #[display("|")]
    Pipe,
    #[display("^")]
    Caret,
    #[display("~")]
    Tilde,
}

pub struct LexError(pub usize, pub char);

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

impl std::fmt::Debug for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Matchers are tried in order; earlier entries win ties, which is how
/// keywords (`int`) get to shadow the looser identifier pattern.
fn build_matchers() -> Vec<(Regex, TokenKind)> {
    use TokenKind::*;
    let pat = |re: &str, kind: TokenKind| (Regex::new(&format!(r"\A(?:{re})")).unwrap(), kind);
    vec![
        pat(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+", FloatLiteral),
        pat(r"0[xX][0-9a-fA-F]+|[0-9]+", IntLiteral),
        pat(r#"'(\\.|[^'\\])'"#, CharLiteral),
        pat(r#""(\\.|[^"\\])*""#, StringLiteral),
        pat(r"void\b", Void),
        pat(r"bool\b", Bool),
        pat(r"char\b", Char),
        pat(r"int\b", Int),
        pat(r"float\b", Float),
        pat(r"struct\b", Struct),
        pat(r"true\b", True),
        pat(r"false\b", False),
        pat(r"if\b", If),
        pat(r"else\b", Else),
        pat(r"switch\b", Switch),
        pat(r"case\b", Case),
        pat(r"default\b", Default),
        pat(r"while\b", While),
        pat(r"do\b", Do),
        pat(r"for\b", For),
        pat(r"break\b", Break),
        pat(r"continue\b", Continue),
        pat(r"return\b", Return),
        pat(r"abs\b", Abs),
        pat(r"[A-Za-z_][A-Za-z0-9_]*", Id),
        pat(r"->", Arrow),
        pat(r"\+\+", Inc),
        pat(r"--", Dec),
        pat(r"<<=", ShlAssign),
        pat(r">>=", ShrAssign),
        pat(r"<<", Shl),
        pat(r">>", Shr),
        pat(r"&&", AndAnd),
        pat(r"\|\|", OrOr),
        pat(r"==", Eq),
        pat(r"!=", Ne),
        pat(r"<=", Le),
        pat(r">=", Ge),
        pat(r"\+=", AddAssign),
        pat(r"-=", SubAssign),
        pat(r"\*=", MulAssign),
        pat(r"/=", DivAssign),
        pat(r"%=", RemAssign),
        pat(r"&=", AndAssign),
        pat(r"\|=", OrAssign),
        pat(r"\^=", XorAssign),
        pat(r"\(", LParen),
        pat(r"\)", RParen),
        pat(r"\{", LBrace),
        pat(r"\}", RBrace),
        pat(r"\[", LBracket),
        pat(r"\]", RBracket),
        pat(r";", Semi),
        pat(r",", Comma),
        pat(r"\.", Dot),
        pat(r"\?", Question),
        pat(r":", Colon),
        pat(r"=", Assign),
        pat(r"!", Not),
        pat(r"<", Lt),
        pat(r">", Gt),
        pat(r"\+", Plus),
        pat(r"-", Minus),
        pat(r"\*", Star),
        pat(r"/", Slash),
        pat(r"%", Percent),
        pat(r"&", Amp),
        pat(r"\|", Pipe),
        pat(r"\^", Caret),
        pat(r"~", Tilde),
    ]
}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    whitespace: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Lexer {
            input,
            pos: 0,
            whitespace: Regex::new(r"\A(?:[ \t\f\r\n\v])*").unwrap(),
            matchers: build_matchers(),
        }
    }

    /// Has the lexer reached the end of input?
    pub fn end_of_input(&self) -> bool {
        self.pos == self.input.len()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn skip_whitespace(&mut self) {
        if let Some(m) = self.whitespace.find(&self.input[self.pos..]) {
            self.pos += m.end()
        }
    }

    /// Get the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, LexError> {
        self.skip_whitespace();
        if self.end_of_input() {
            return Ok(None);
        }

        for (re, kind) in &self.matchers {
            if let Some(m) = re.find(&self.input[self.pos..]) {
                let text = &self.input[self.pos..self.pos + m.end()];
                self.pos += m.end();
                return Ok(Some(Token { kind: *kind, text }));
            }
        }

        let bad = self.input[self.pos..].chars().next().unwrap();
        Err(LexError(self.pos, bad))
    }
}
