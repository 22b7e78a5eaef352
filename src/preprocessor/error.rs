//! Preprocessor diagnostics: every error or warning carries the
//! location it was raised at, which is the *previous* location when raised
//! from inside a macro rescan that has no real file position of its own.

use derive_more::Display;

use crate::preprocessor::location::Location;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, PartialEq, Eq, Display, Debug)]
pub enum ErrorKind {
    #[display("unterminated comment")]
    CommentUnterminated,
    #[display("unterminated string literal")]
    StringUnterminated,
    #[display("stray character {:?}", _0)]
    CharacterStray(char),

    #[display("invalid directive {:?}", _0)]
    DirectiveInvalid(String),
    #[display("'#' must be followed by a directive name")]
    DirectiveNameNon,
    #[display("#line directive skipped")]
    DirectiveLineSkipped,
    #[display("extra tokens after directive")]
    DirectiveExtraTokens,

    #[display("#include expects a filename")]
    IncludeExpectsFilename,
    #[display("no such file: {}", _0)]
    IncludeNoSuchFile(String),
    #[display("include depth exceeded")]
    IncludeDepth,

    #[display("macro name must start with a letter or underscore")]
    MacroNameFirstCharacter,
    #[display("macro {} redefined", _0)]
    MacroNameRedefine(String),
    #[display("macro {} is not defined", _0)]
    MacroNameUndefined(String),
    #[display("unterminated macro parameter list: expected ')'")]
    ArgsExpectedBracket,
    #[display("expected a parameter name")]
    ArgsExpectedName,
    #[display("expected ',' between parameters")]
    ArgsExpectedComma,
    #[display("duplicate parameter name {}", _0)]
    ArgsDuplicate(String),
    #[display("macro {} is function-like but was referenced without arguments", _0)]
    ArgsNon(String),
    #[display("too few arguments to macro {}", _0)]
    ArgsRequires(String),
    #[display("too many arguments to macro {}", _0)]
    ArgsPassed(String),
    #[display("unterminated macro argument list")]
    ArgsUnterminated,
    #[display("macro call depth exceeded")]
    CallDepth,

    #[display("'##' may not appear at the start or end of a macro body")]
    HashOnEdge,
    #[display("'#' must be followed by a parameter name")]
    HashNotFollowed,
}

#[derive(Clone, Display, Debug)]
#[display("{severity:?}: {kind} at {location}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub location: Location,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, location: Location) -> Self {
        Diagnostic { severity: Severity::Error, kind, location }
    }

    pub fn warning(kind: ErrorKind, location: Location) -> Self {
        Diagnostic { severity: Severity::Warning, kind, location }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
