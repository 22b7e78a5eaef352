//! Assembly labels.
//!
//! A label is a kind tag plus a number, rendered textually as `<kind><num>`.
//! Numbers for `Next`/`Else`/`End`/`BeginCycle` come from one counter
//! shared across the whole translation unit (`Context::next_label`), so
//! two labels are never emitted with the same name even when the same
//! statement kind recurs (nested `if`s, a `while` inside a `for`, ...) or
//! when two different functions both happen to contain an `if`.

use derive_more::Display;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LabelKind {
    Func,
    FuncEnd,
    Next,
    String,
    Else,
    End,
    BeginCycle,
}

impl std::fmt::Display for LabelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LabelKind::Func => "FUNC",
            LabelKind::FuncEnd => "FUNCEND",
            LabelKind::Next => "NEXT",
            LabelKind::String => "STRING",
            LabelKind::Else => "ELSE",
            LabelKind::End => "END",
            LabelKind::BeginCycle => "BEGIN",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display)]
#[display("{kind}{num}")]
pub struct Label {
    pub kind: LabelKind,
    pub num: u32,
}

impl Label {
    pub fn new(kind: LabelKind, num: u32) -> Self {
        Label { kind, num }
    }
}
