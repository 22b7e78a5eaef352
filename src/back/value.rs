//! Lvalues and rvalues: the algebra expression lowering is built on.
//!
//! Keeping "where it lives" (an [Lvalue]) distinct from "what it is" (an
//! [Rvalue]) is what lets the same identifier be read, written, or have its
//! address taken without three separate code paths duplicating the
//! displacement-table lookup.

use crate::back::registers::{FReg, Register};
use crate::front::tables::TypeId;

/// An addressable location: somewhere a value can be stored to or loaded
/// from.
#[derive(Clone, Copy, Debug)]
pub enum Lvalue {
    /// Address is `base_reg + displ`.
    Stack { base_reg: Register, displ: i32, ty: TypeId },
    /// The value lives directly in a named register (a register-resident
    /// variable -- currently only parameters passed in `$a0..$a3`).
    Register { reg: Register, ty: TypeId },
}

impl Lvalue {
    pub fn ty(&self) -> TypeId {
        match self {
            Lvalue::Stack { ty, .. } => *ty,
            Lvalue::Register { ty, .. } => *ty,
        }
    }
}

/// A value ready to be consumed: already materialised in a register, or
/// still a compile-time constant, or nothing at all (a `void` expression).
#[derive(Clone, Copy, Debug)]
pub enum Rvalue {
    Const(Const),
    Register {
        reg: Register,
        ty: TypeId,
        /// This register is borrowed from a register-resident variable
        /// ([`Lvalue::Register`]); the allocator must never free it.
        from_lvalue: bool,
    },
    /// Single-precision float, materialised in the float temp file
    /// instead of a general-purpose register.
    Float {
        reg: FReg,
        ty: TypeId,
        from_lvalue: bool,
    },
    /// No value (the result of a `void` call or assignment-as-statement).
    Void,
}

#[derive(Clone, Copy, Debug)]
pub enum Const {
    Int { ty: TypeId, value: i64 },
    Float { ty: TypeId, value: f32 },
    /// Index into the string pool.
    Str { ty: TypeId, index: usize },
}

impl Rvalue {
    pub fn ty(&self) -> TypeId {
        match self {
            Rvalue::Const(Const::Int { ty, .. })
            | Rvalue::Const(Const::Float { ty, .. })
            | Rvalue::Const(Const::Str { ty, .. })
            | Rvalue::Register { ty, .. }
            | Rvalue::Float { ty, .. } => *ty,
            Rvalue::Void => crate::front::tables::TypeTable::VOID,
        }
    }

    /// Whether freeing this value's register (if it has one) is legal.
    /// `Const` and `Void` carry no register to free in the first place.
    pub fn is_freeable_register(&self) -> bool {
        matches!(self, Rvalue::Register { from_lvalue: false, .. })
    }

    /// The float-register analogue of [`is_freeable_register`].
    pub fn is_freeable_float(&self) -> bool {
        matches!(self, Rvalue::Float { from_lvalue: false, .. })
    }
}
