//! The macro table: name -> (parameter count, replacement body with marker
//! tokens already substituted in for `#`/`##`/plain parameter references).

use crate::common::Map;

/// A macro body parameter reference, as recorded by `#define` parsing --
/// the marker vocabulary, modelled as a type instead of a string
/// so that expansion never has to re-parse its own markers.
#[derive(Clone, Debug)]
pub enum BodyPiece {
    /// Literal text copied verbatim.
    Text(String),
    /// `__ARG_<macro>_<i>__`: the i-th actual argument, macro-expanded.
    Arg(usize),
    /// `__STR_<macro>_<i>__`: the i-th actual argument, stringified.
    Str(usize),
    /// `#__TKP_<macro>_<i>__`: a token-paste fragment -- concatenate
    /// without an intervening space.
    TokenPaste(usize),
}

#[derive(Clone, Debug)]
pub struct Macro {
    pub params: Vec<String>,
    pub body: Vec<BodyPiece>,
    /// Object-like macros (`#define X body`, no parameter list) have
    /// `params.is_empty()` *and* `object_like = true`; a function-like
    /// macro declared with an empty parameter list (`#define X() body`)
    /// also has an empty `params` but `object_like = false`.
    pub object_like: bool,
}

impl Macro {
    pub fn arg_count(&self) -> usize {
        self.params.len()
    }
}

/// `Storage`: macro name -> definition.
#[derive(Clone, Debug, Default)]
pub struct MacroStore {
    macros: Map<String, Macro>,
}

impl MacroStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// `#define`: redefinition of an existing name is an error, reported by
    /// the caller (this only reports whether the name already existed).
    pub fn define(&mut self, name: String, mac: Macro) -> bool {
        let existed = self.macros.contains_key(&name);
        self.macros.insert(name, mac);
        existed
    }

    /// `#set`: redefinition is allowed; returns whether the name already
    /// existed (used by the caller only to decide diagnostics, never to
    /// refuse the assignment).
    pub fn set(&mut self, name: String, mac: Macro) -> bool {
        let existed = self.macros.contains_key(&name);
        self.macros.insert(name, mac);
        existed
    }

    /// `#undef`: returns whether the name was actually removed.
    pub fn undef(&mut self, name: &str) -> bool {
        self.macros.remove(name).is_some()
    }
}
