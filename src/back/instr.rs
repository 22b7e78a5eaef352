//! MIPS32 instruction mnemonics and their textual encoding.
//!
//! One variant per instruction shape actually emitted by this backend --
//! this is not a full ISA encoder, just enough of one to print valid GNU
//! `as` input. Registers print via their own `Display` impl (`registers.rs`),
//! so the instruction printer never builds register names by hand.

use crate::back::label::Label;
use crate::back::registers::Register;

#[derive(Clone, Debug)]
pub enum Instruction {
    Li { dst: Register, imm: i64 },
    LiFloat { dst: String, imm: f32 },
    La { dst: Register, sym: String },
    Lui { dst: Register, hi: String },
    Move { dst: Register, src: Register },
    /// `lw dst, displ(base)`
    Lw { dst: Register, displ: i32, base: Register },
    Sw { src: Register, displ: i32, base: Register },
    Addi { dst: Register, src: Register, imm: i32 },
    Addiu { dst: Register, src: Register, imm_sym: String },
    BinReg { op: &'static str, dst: Register, lhs: Register, rhs: Register },
    Mult { lhs: Register, rhs: Register },
    Div { lhs: Register, rhs: Register },
    Mflo { dst: Register },
    Mfhi { dst: Register },
    Branch { op: &'static str, lhs: Register, rhs: Register, target: Label },
    BranchZ { op: &'static str, reg: Register, target: Label },
    Jump { target: Label },
    JumpAndLink { target: String },
    JumpRegister { reg: Register },
    Jr { reg: Register },
    Nop,
    /// Float move/convert family, operands passed through verbatim since
    /// they address both the named `$fN` registers and the paired temps.
    FRaw(String),
    Label(Label),
    FuncLabel(String),
    Comment(String),
    Directive(String),
    /// `.ascii "..."` string pool entries.
    Ascii(String),
    Blank,
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Instruction::*;
        match self {
            Li { dst, imm } => write!(f, "\tli {dst}, {imm}"),
            LiFloat { dst, imm } => write!(f, "\tli.s {dst}, {imm}"),
            La { dst, sym } => write!(f, "\tla {dst}, {sym}"),
            Lui { dst, hi } => write!(f, "\tlui {dst}, %hi({hi})"),
            Move { dst, src } => write!(f, "\tmove {dst}, {src}"),
            Lw { dst, displ, base } => write!(f, "\tlw {dst}, {displ}({base})"),
            Sw { src, displ, base } => write!(f, "\tsw {src}, {displ}({base})"),
            Addi { dst, src, imm } => write!(f, "\taddi {dst}, {src}, {imm}"),
            Addiu { dst, src, imm_sym } => write!(f, "\taddiu {dst}, {src}, {imm_sym}"),
            BinReg { op, dst, lhs, rhs } => write!(f, "\t{op} {dst}, {lhs}, {rhs}"),
            Mult { lhs, rhs } => write!(f, "\tmult {lhs}, {rhs}"),
            Div { lhs, rhs } => write!(f, "\tdiv {lhs}, {rhs}"),
            Mflo { dst } => write!(f, "\tmflo {dst}"),
            Mfhi { dst } => write!(f, "\tmfhi {dst}"),
            Branch { op, lhs, rhs, target } => write!(f, "\t{op} {lhs}, {rhs}, {target}"),
            BranchZ { op, reg, target } => write!(f, "\t{op} {reg}, {target}"),
            Jump { target } => write!(f, "\tj {target}"),
            JumpAndLink { target } => write!(f, "\tjal {target}"),
            JumpRegister { reg } => write!(f, "\tjalr {reg}"),
            Jr { reg } => write!(f, "\tjr {reg}"),
            Nop => write!(f, "\tnop"),
            FRaw(s) => write!(f, "\t{s}"),
            Label(l) => write!(f, "{l}:"),
            FuncLabel(s) => write!(f, "{s}:"),
            Comment(s) => write!(f, "\t# {s}"),
            Directive(s) => write!(f, "\t{s}"),
            Ascii(s) => write!(f, "\t.ascii {s:?}"),
            Blank => write!(f, ""),
        }
    }
}
