//! The MIPS32 register file and the temp-register pool allocator.
//!
//! Unlike the RISC-V teacher backend (which never allocates -- everything
//! lives on the stack), this backend fuses a tiny bump-style allocator into
//! expression lowering: `T0..T7` and even-paired `FT0..FT11` are the only
//! registers the code generator itself ever claims and frees. Everything
//! else (`S0..S7`, `FS0..FS10`, argument/return registers) is addressed
//! directly by name, the way a human writing MIPS by hand would.

use derive_more::Display;

/// Integer registers, in register-file order.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Register {
    #[display("$zero")]
    Zero,
    #[display("$at")]
    At,
    #[display("$v0")]
    V0,
    #[display("$v1")]
    V1,
    #[display("$a0")]
    A0,
    #[display("$a1")]
    A1,
    #[display("$a2")]
    A2,
    #[display("$a3")]
    A3,
    #[display("$t0")]
    T0,
    #[display("$t1")]
    T1,
    #[display("$t2")]
    T2,
    #[display("$t3")]
    T3,
    #[display("$t4")]
    T4,
    #[display("$t5")]
    T5,
    #[display("$t6")]
    T6,
    #[display("$t7")]
    T7,
    #[display("$s0")]
    S0,
    #[display("$s1")]
    S1,
    #[display("$s2")]
    S2,
    #[display("$s3")]
    S3,
    #[display("$s4")]
    S4,
    #[display("$s5")]
    S5,
    #[display("$s6")]
    S6,
    #[display("$s7")]
    S7,
    #[display("$t8")]
    T8,
    #[display("$t9")]
    T9,
    #[display("$k0")]
    K0,
    #[display("$k1")]
    K1,
    #[display("$gp")]
    Gp,
    #[display("$sp")]
    Sp,
    #[display("$fp")]
    Fp,
    #[display("$ra")]
    Ra,
}

/// The eight integer temps the allocator may hand out, in allocation order.
pub const INT_TEMPS: [Register; 8] = [
    Register::T0,
    Register::T1,
    Register::T2,
    Register::T3,
    Register::T4,
    Register::T5,
    Register::T6,
    Register::T7,
];

/// Callee-saved registers, in the order they are pushed by the prologue.
pub const SAVED: [Register; 8] = [
    Register::S0,
    Register::S1,
    Register::S2,
    Register::S3,
    Register::S4,
    Register::S5,
    Register::S6,
    Register::S7,
];

/// Integer argument registers, in ABI order.
pub const ARG_REGISTERS: [Register; 4] = [Register::A0, Register::A1, Register::A2, Register::A3];

/// Floating-point registers actually produced by this backend. Only
/// single precision is emitted (per the Non-goals), so every location
/// here names exactly one physical register, never a pair: the return/
/// cast-destination register `$f0`, the first two argument registers
/// `$fa0`/`$fa2`, and the even-numbered temp pool `$f4, $f6, .., $f24`.
/// Callee-saved `$fs0, $fs2, .., $fs10` are addressed directly by name in
/// `func.rs`'s prologue/epilogue, not through this type, the same way
/// `$s0..$s7` are addressed through `Register` rather than a pool slot.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FReg {
    /// A temp-pool slot (0..FLOAT_TEMP_COUNT), physical `$f4, $f6, ..`.
    Temp(u8),
    /// `$f0`: float return value and `cvt.s.w`'s destination.
    Ret,
    /// `$f12` (`$fa0`): first float argument register.
    Arg0,
    /// `$f14` (`$fa2`): second float argument register.
    Arg2,
}

/// The float temp pool base: `$f4, $f6, .., $f24` (the pairs between the
/// return and argument registers and the saved ones), matching
/// `get_float_register`'s even-stride scan.
pub const FLOAT_TEMP_BASE: u8 = 4;
pub const FLOAT_TEMP_COUNT: u8 = 12;

impl std::fmt::Display for FReg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FReg::Temp(i) => write!(f, "$f{}", FLOAT_TEMP_BASE + i * 2),
            FReg::Ret => write!(f, "$f0"),
            FReg::Arg0 => write!(f, "$f12"),
            FReg::Arg2 => write!(f, "$f14"),
        }
    }
}

/// Bitset tracking which temporary registers (8 integer, 12 float-pair)
/// are currently claimed. Exceeding either pool is a compiler bug: the
/// lowering discipline guarantees at most a handful of live temps at once.
#[derive(Clone, Debug, Default)]
pub struct RegisterPool {
    int_busy: u8,
    float_busy: u16,
}

impl RegisterPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get_register`: scan `T0..T7` for the first free slot.
    pub fn get_register(&mut self) -> Register {
        for (i, reg) in INT_TEMPS.iter().enumerate() {
            let bit = 1 << i;
            if self.int_busy & bit == 0 {
                self.int_busy |= bit;
                return *reg;
            }
        }
        panic!("register pool exhausted: no free integer temp");
    }

    /// `free_register`: clears the bit for a temp register. Non-temp
    /// registers (saved, argument, special) are not tracked and are
    /// silently ignored, matching the source's permissive behaviour.
    pub fn free_register(&mut self, reg: Register) {
        if let Some(i) = INT_TEMPS.iter().position(|r| *r == reg) {
            self.int_busy &= !(1 << i);
        }
    }

    /// `get_float_register`: scan the 12 even-paired float temp slots.
    pub fn get_float_register(&mut self) -> FReg {
        for i in 0..FLOAT_TEMP_COUNT {
            let bit = 1 << i;
            if self.float_busy & bit == 0 {
                self.float_busy |= bit;
                return FReg::Temp(i);
            }
        }
        panic!("register pool exhausted: no free float temp");
    }

    /// Non-temp float registers (`Ret`/`Arg0`/`Arg2`) are not tracked and
    /// are silently ignored, matching `free_register`'s int-side behaviour.
    pub fn free_float_register(&mut self, reg: FReg) {
        if let FReg::Temp(index) = reg {
            if index < FLOAT_TEMP_COUNT {
                self.float_busy &= !(1 << index);
            }
        }
    }

    /// Holds for the universal invariant that the temp pool is empty at
    /// the start and end of every statement emission.
    pub fn is_empty(&self) -> bool {
        self.int_busy == 0 && self.float_busy == 0
    }
}
