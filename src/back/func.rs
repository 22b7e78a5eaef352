//! Function prologue/epilogue emission.
//!
//! The function body is lowered into a local buffer first, then the
//! prologue is computed from the body's `max_displ` and prepended, and
//! the epilogue is appended. No instruction list is ever spliced
//! mid-stream.

use crate::back::context::{Context, Slot};
use crate::back::instr::Instruction;
use crate::back::label::{Label, LabelKind};
use crate::back::registers::{Register, ARG_REGISTERS, SAVED};
use crate::front::ast::*;

/// Fixed bytes spent by the prologue saving `$ra`, `$sp`, `$s0..$s7`,
/// `$fs0..$fs10` (even), `$a0..$a3`. See the glossary: this is the frame
/// math constant, not a literal sum of the per-slot widths below (the
/// original `mipsgen.c` frame layout reserves a little slack beyond the
/// per-slot widths).
const FUNC_DISPL_PRESERVED: i32 = 84;

fn align8(n: i32) -> i32 {
    (n + 7) & !7
}

pub fn lower_function(ctx: &mut Context, ast: &Program, func_id: usize, params: &[usize], body: StmtId) -> Vec<Instruction> {
    ctx.begin_function(func_id);

    let func_label = Label::new(LabelKind::Func, func_id as u32);
    let funcend_label = Label::new(LabelKind::FuncEnd, func_id as u32);

    // Parameters are register-resident on entry.
    for (i, &param_id) in params.iter().enumerate().take(ARG_REGISTERS.len()) {
        ctx.add_register_resident(param_id, ARG_REGISTERS[i]);
    }

    let mut body_buf = Vec::new();
    crate::back::stmt::lower_stmt(ctx, ast, &mut body_buf, body);
    body_buf.push(Instruction::Label(funcend_label));

    let max_displ = align8(ctx.max_displ);
    let frame_size = max_displ + FUNC_DISPL_PRESERVED + 4;

    let mut out = Vec::new();
    out.push(Instruction::Blank);
    out.push(Instruction::Directive(format!(".globl {func_label}")));
    out.push(Instruction::Directive(format!(".ent {func_label}")));
    out.push(Instruction::FuncLabel(func_label.to_string()));

    // Save the preserved set at negative offsets from the incoming `$fp`,
    // before the frame pointer itself moves.
    let mut displ = 0;
    displ -= 4;
    out.push(Instruction::Sw { src: Register::Ra, displ, base: Register::Fp });
    displ -= 4;
    out.push(Instruction::Sw { src: Register::Sp, displ, base: Register::Fp });
    for i in 0..5 {
        displ -= 4;
        out.push(Instruction::FRaw(format!("s.s $f{}, {displ}($fp)", 20 + i * 2)));
    }
    for reg in SAVED {
        displ -= 4;
        out.push(Instruction::Sw { src: reg, displ, base: Register::Fp });
    }
    for (i, reg) in ARG_REGISTERS.iter().enumerate().take(params.len().min(4)) {
        let _ = i;
        displ -= 4;
        out.push(Instruction::Sw { src: *reg, displ, base: Register::Fp });
    }

    out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: -frame_size });
    out.push(Instruction::Move { dst: Register::Sp, src: Register::Fp });
    out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: -4 });

    out.extend(body_buf);

    // Epilogue: restore in reverse order, then `jr $ra`.
    out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: 4 });
    out.push(Instruction::Move { dst: Register::Fp, src: Register::Sp });
    out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: frame_size });

    // Restore in the exact reverse order of the saves above.
    let mut d = 0;
    d -= 4;
    let ra_displ = d;
    d -= 4;
    let sp_displ = d;
    let mut fs_displs = [0i32; 5];
    for slot in fs_displs.iter_mut() {
        d -= 4;
        *slot = d;
    }
    let mut s_displs = [0i32; 8];
    for slot in s_displs.iter_mut() {
        d -= 4;
        *slot = d;
    }
    let mut a_displs = Vec::new();
    for _ in 0..params.len().min(4) {
        d -= 4;
        a_displs.push(d);
    }

    for (i, displ) in a_displs.iter().enumerate().rev() {
        out.push(Instruction::Lw { dst: ARG_REGISTERS[i], displ: *displ, base: Register::Fp });
    }
    for (i, reg) in SAVED.iter().enumerate().rev() {
        out.push(Instruction::Lw { dst: *reg, displ: s_displs[i], base: Register::Fp });
    }
    for (i, displ) in fs_displs.iter().enumerate().rev() {
        out.push(Instruction::FRaw(format!("l.s $f{}, {displ}($fp)", 20 + i * 2)));
    }
    out.push(Instruction::Lw { dst: Register::Sp, displ: sp_displ, base: Register::Fp });
    out.push(Instruction::Lw { dst: Register::Ra, displ: ra_displ, base: Register::Fp });
    out.push(Instruction::Jr { reg: Register::Ra });
    out.push(Instruction::Directive(format!(".end {func_label}")));

    out
}

pub fn slot_displ_base(slot: Slot) -> (Register, i32) {
    match slot {
        Slot::Stack { base_reg, displ } => (base_reg, displ),
        Slot::Register { reg } => (reg, 0),
    }
}
