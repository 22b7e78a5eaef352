//! Expression lowering: the lvalue/rvalue algebra.
//!
//! Every function here takes the context, the arena, and the instruction
//! buffer the current function body is being accumulated into (see the
//! module doc on `func.rs` for why this is a plain `Vec` and not an IO
//! handle being swapped in and out). Lowering never holds a live borrow of
//! the arena across a register allocation, so the order of operations
//! below mirrors the order instructions actually get pushed.

use crate::back::context::{Context, Slot};
use crate::back::instr::Instruction;
use crate::back::label::LabelKind;
use crate::back::registers::{FReg, Register};
use crate::back::value::{Const, Lvalue, Rvalue};
use crate::front::ast::*;
use crate::front::tables::TypeTable;

/// Lowers an expression in address-of position. Panics on any class that
/// cannot denote a location -- the accessor surface guarantees the parser
/// never hands MIPSgen an rvalue-only node here.
pub fn lower_lvalue(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, id: ExprId) -> Lvalue {
    let expr = ast.expr(id);
    match &expr.kind {
        ExprKind::Ident(ident_id) => match ctx.slot(*ident_id) {
            Slot::Stack { base_reg, displ } => Lvalue::Stack {
                base_reg,
                displ,
                ty: expr.ty,
            },
            Slot::Register { reg } => Lvalue::Register { reg, ty: expr.ty },
        },
        ExprKind::Subscript { base, index } => {
            let base_rv = lower_rvalue(ctx, ast, out, *base);
            let elem_ty = expr.ty;
            let elem_size = ctx.tables.types.size(elem_ty).max(1) as i64;
            let index_rv = lower_rvalue(ctx, ast, out, *index);
            let base_reg = ensure_register(ctx, out, base_rv);
            let scaled = scale_by_constant(ctx, out, index_rv, elem_size);
            let offset_reg = ensure_register(ctx, out, scaled);
            out.push(Instruction::BinReg {
                op: "addu",
                dst: base_reg,
                lhs: base_reg,
                rhs: offset_reg,
            });
            ctx.pool.free_register(offset_reg);
            Lvalue::Stack {
                base_reg,
                displ: 0,
                ty: elem_ty,
            }
        }
        ExprKind::Member { base, member, is_arrow } if !*is_arrow => {
            let base_lv = lower_lvalue(ctx, ast, out, *base);
            let base_ty = ast.expr(*base).ty;
            let offset = ctx.tables.types.structure_member_offset(base_ty, *member) as i32;
            match base_lv {
                Lvalue::Stack { base_reg, displ, .. } => Lvalue::Stack {
                    base_reg,
                    displ: displ + offset,
                    ty: expr.ty,
                },
                Lvalue::Register { .. } => panic!("struct member of a register-resident aggregate"),
            }
        }
        ExprKind::Member { base, member, .. } => {
            let base_rv = lower_rvalue(ctx, ast, out, *base);
            let struct_ty = ctx.tables.types.pointer_element(ast.expr(*base).ty);
            let offset = ctx.tables.types.structure_member_offset(struct_ty, *member) as i32;
            let reg = ensure_register(ctx, out, base_rv);
            Lvalue::Stack {
                base_reg: reg,
                displ: offset,
                ty: expr.ty,
            }
        }
        ExprKind::Unary { op: UnOp::Indirection, operand } => {
            let rv = lower_rvalue(ctx, ast, out, *operand);
            let reg = ensure_register(ctx, out, rv);
            Lvalue::Stack {
                base_reg: reg,
                displ: 0,
                ty: expr.ty,
            }
        }
        _ => panic!("node_unexpected: expression class cannot be used as an lvalue"),
    }
}

/// Loads the value an [Lvalue] denotes into a fresh (or reused, for
/// register-resident locations) register.
fn load_lvalue(ctx: &mut Context, out: &mut Vec<Instruction>, lv: Lvalue) -> Rvalue {
    match lv {
        Lvalue::Register { reg, ty } => Rvalue::Register {
            reg,
            ty,
            from_lvalue: true,
        },
        Lvalue::Stack { base_reg, displ, ty } if ctx.tables.types.is_floating(ty) => {
            let dst = ctx.pool.get_float_register();
            out.push(Instruction::FRaw(format!("l.s {dst}, {displ}({base_reg})")));
            Rvalue::Float {
                reg: dst,
                ty,
                from_lvalue: false,
            }
        }
        Lvalue::Stack { base_reg, displ, ty } => {
            let dst = ctx.pool.get_register();
            out.push(Instruction::Lw { dst, displ, base: base_reg });
            Rvalue::Register {
                reg: dst,
                ty,
                from_lvalue: false,
            }
        }
    }
}

/// Materialises `value` into the register file appropriate for `lv`'s type
/// (float file for a floating lvalue, general-purpose otherwise) and writes
/// it to `lv`. Returns the materialised value, re-tagged as not
/// `from_lvalue`, so an assignment's result can be reused as the
/// assignment expression's own value without re-loading from memory.
pub(crate) fn store_lvalue(ctx: &mut Context, out: &mut Vec<Instruction>, lv: Lvalue, value: Rvalue) -> Rvalue {
    if ctx.tables.types.is_floating(lv.ty()) {
        let src = ensure_float_register(ctx, out, value);
        match lv {
            Lvalue::Stack { base_reg, displ, .. } => {
                out.push(Instruction::FRaw(format!("s.s {src}, {displ}({base_reg})")));
            }
            Lvalue::Register { .. } => panic!("cannot store a float value into an integer-resident register"),
        }
        Rvalue::Float { reg: src, ty: lv.ty(), from_lvalue: false }
    } else {
        let src = ensure_register(ctx, out, value);
        match lv {
            Lvalue::Register { reg, .. } => {
                if reg != src {
                    out.push(Instruction::Move { dst: reg, src });
                }
            }
            Lvalue::Stack { base_reg, displ, .. } => {
                out.push(Instruction::Sw { src, displ, base: base_reg });
            }
        }
        Rvalue::Register { reg: src, ty: lv.ty(), from_lvalue: false }
    }
}

/// Materialises any integer/pointer rvalue into a register, loading
/// constants with `li`/`la` first. Returns the register holding the
/// value; the caller is responsible for freeing it via
/// [`free_if_freeable`] once done, unless it came from a register-resident
/// variable. Panics on a float-typed value -- callers must route those
/// through [`ensure_float_register`] instead.
pub(crate) fn ensure_register(ctx: &mut Context, out: &mut Vec<Instruction>, rv: Rvalue) -> Register {
    match rv {
        Rvalue::Register { reg, .. } => reg,
        Rvalue::Const(Const::Int { value, .. }) => {
            let dst = ctx.pool.get_register();
            out.push(Instruction::Li { dst, imm: value });
            dst
        }
        Rvalue::Const(Const::Str { index, .. }) => {
            let dst = ctx.pool.get_register();
            let label = ctx.strings.label(index, 0);
            out.push(Instruction::La {
                dst,
                sym: label.to_string(),
            });
            dst
        }
        Rvalue::Const(Const::Float { .. }) | Rvalue::Float { .. } => {
            panic!("EXPR_INVALID: float value used where an integer register was expected")
        }
        Rvalue::Void => panic!("EXPR_INVALID: attempted to use a void value"),
    }
}

/// The float-register analogue of [`ensure_register`]: materialises a
/// float rvalue into the float temp file, loading constants with `li.s`.
pub(crate) fn ensure_float_register(ctx: &mut Context, out: &mut Vec<Instruction>, rv: Rvalue) -> FReg {
    match rv {
        Rvalue::Float { reg, .. } => reg,
        Rvalue::Const(Const::Float { value, .. }) => {
            let dst = ctx.pool.get_float_register();
            out.push(Instruction::LiFloat { dst: dst.to_string(), imm: value });
            dst
        }
        Rvalue::Const(_) | Rvalue::Register { .. } => {
            panic!("EXPR_INVALID: integer value used where a float register was expected")
        }
        Rvalue::Void => panic!("EXPR_INVALID: attempted to use a void value"),
    }
}

/// Frees an [`Lvalue::Stack`]'s `base_reg` once every load/store against
/// the lvalue has been emitted -- callers must invoke this exactly once,
/// after the lvalue's last use, whether that's a single load, a single
/// store, or a load followed by a store (pre/post inc-dec, compound
/// assignment). A no-op for `Lvalue::Register` and for any non-temp
/// `base_reg` (`$sp`/`$gp`/`$fp`), since `free_register` silently ignores
/// registers it doesn't track.
pub(crate) fn free_lvalue(ctx: &mut Context, lv: Lvalue) {
    if let Lvalue::Stack { base_reg, .. } = lv {
        ctx.pool.free_register(base_reg);
    }
}

fn free_if_freeable(ctx: &mut Context, rv: Rvalue) {
    if rv.is_freeable_register() {
        if let Rvalue::Register { reg, .. } = rv {
            ctx.pool.free_register(reg);
        }
    } else if rv.is_freeable_float() {
        if let Rvalue::Float { reg, .. } = rv {
            ctx.pool.free_float_register(reg);
        }
    }
}

/// Multiplies a dynamic index value by a compile-time-known element size,
/// skipping the multiply entirely when the size is 1.
fn scale_by_constant(ctx: &mut Context, out: &mut Vec<Instruction>, rv: Rvalue, factor: i64) -> Rvalue {
    if factor == 1 {
        return rv;
    }
    if let Rvalue::Const(Const::Int { ty, value }) = rv {
        return Rvalue::Const(Const::Int { ty, value: value * factor });
    }
    let reg = ensure_register(ctx, out, rv);
    out.push(Instruction::Li {
        dst: Register::At,
        imm: factor,
    });
    out.push(Instruction::Mult { lhs: reg, rhs: Register::At });
    out.push(Instruction::Mflo { dst: reg });
    Rvalue::Register {
        reg,
        ty: rv.ty(),
        from_lvalue: false,
    }
}

pub fn lower_rvalue(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, id: ExprId) -> Rvalue {
    let expr = ast.expr(id);
    match &expr.kind {
        ExprKind::Literal(lit) => lower_literal(*lit, expr.ty),
        ExprKind::Ident(_) => {
            let lv = lower_lvalue(ctx, ast, out, id);
            let rv = load_lvalue(ctx, out, lv);
            free_lvalue(ctx, lv);
            rv
        }
        ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => lower_comparison(ctx, ast, out, *op, *lhs, *rhs),
        ExprKind::Binary { op, lhs, rhs } => lower_arithmetic(ctx, ast, out, *op, *lhs, *rhs),
        ExprKind::LogicalAnd(lhs, rhs) => lower_short_circuit(ctx, ast, out, true, *lhs, *rhs),
        ExprKind::LogicalOr(lhs, rhs) => lower_short_circuit(ctx, ast, out, false, *lhs, *rhs),
        ExprKind::Unary { op, operand } => lower_unary(ctx, ast, out, *op, *operand, expr.ty),
        ExprKind::Assign { op, lhs, rhs } => lower_assign(ctx, ast, out, *op, *lhs, *rhs),
        ExprKind::Cast { target, operand } => lower_cast(ctx, ast, out, *target, *operand),
        ExprKind::Ternary {
            cond,
            then_branch,
            else_branch,
        } => lower_ternary(ctx, ast, out, *cond, *then_branch, *else_branch),
        ExprKind::Call { callee, args } => crate::back::call::lower_call(ctx, ast, out, *callee, args),
        ExprKind::Subscript { .. } | ExprKind::Member { .. } => {
            let lv = lower_lvalue(ctx, ast, out, id);
            let rv = load_lvalue(ctx, out, lv);
            free_lvalue(ctx, lv);
            rv
        }
        ExprKind::InitializerList(_) | ExprKind::EmptyBound => Rvalue::Void,
    }
}

fn lower_literal(lit: Literal, ty: crate::front::tables::TypeId) -> Rvalue {
    match lit {
        Literal::Bool(b) => Rvalue::Const(Const::Int { ty, value: b as i64 }),
        Literal::Char(c) => Rvalue::Const(Const::Int { ty, value: c as i64 }),
        Literal::Int(v) => Rvalue::Const(Const::Int { ty, value: v }),
        Literal::Float(v) => Rvalue::Const(Const::Float { ty, value: v }),
        Literal::Str(index) => Rvalue::Const(Const::Str { ty, index }),
    }
}

/// Picks the lower-numbered register as the result and frees the other,
/// per the allocation discipline for binaries where neither operand is
/// `from_lvalue`. When one side is `from_lvalue`, a fresh temp is used so
/// the variable's register is preserved.
fn combine_registers(ctx: &mut Context, lhs: Rvalue, rhs: Rvalue) -> (Register, Register, Register) {
    let (Rvalue::Register { reg: lreg, from_lvalue: lfl, .. }, Rvalue::Register { reg: rreg, from_lvalue: rfl, .. }) =
        (lhs, rhs)
    else {
        unreachable!("combine_registers called on a non-register rvalue")
    };
    if !lfl && !rfl {
        let (keep, drop) = if lreg <= rreg { (lreg, rreg) } else { (rreg, lreg) };
        ctx.pool.free_register(drop);
        (keep, lreg, rreg)
    } else {
        let dst = ctx.pool.get_register();
        (dst, lreg, rreg)
    }
}

fn binop_mnemonic(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "addu",
        BinOp::Sub => "subu",
        BinOp::Mul => "__mul__",
        BinOp::Div => "__div__",
        BinOp::Rem => "__rem__",
        BinOp::Shl => "sllv",
        BinOp::Shr => "srav",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Xor => "xor",
        _ => unreachable!("comparison operators go through lower_comparison"),
    }
}

/// Picks the immediate form when one operand is a constant, except
/// for `SUB`/`MUL`/`DIV`/`REM` which the source never emits in immediate
/// form. Subtraction by a constant uses `addi` with the negated immediate;
/// the original `mipsgen.c` instead multiplies the constant by -1 first.
fn lower_arithmetic(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, op: BinOp, lhs: ExprId, rhs: ExprId) -> Rvalue {
    let lhs_rv = lower_rvalue(ctx, ast, out, lhs);
    let rhs_rv = lower_rvalue(ctx, ast, out, rhs);
    let ty = ast.expr(lhs).ty;

    if ctx.tables.types.is_floating(ty) {
        return lower_float_arithmetic(ctx, out, op, lhs_rv, rhs_rv, ty);
    }

    if let (Rvalue::Const(Const::Int { value: a, .. }), Rvalue::Const(Const::Int { value: b, .. })) = (lhs_rv, rhs_rv)
    {
        let folded = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Rem => a % b,
            BinOp::Shl => a << b,
            BinOp::Shr => a >> b,
            BinOp::And => a & b,
            BinOp::Or => a | b,
            BinOp::Xor => a ^ b,
            _ => unreachable!(),
        };
        return Rvalue::Const(Const::Int { ty, value: folded });
    }

    let can_use_immediate = matches!(op, BinOp::Add | BinOp::Shl | BinOp::Shr | BinOp::And | BinOp::Or | BinOp::Xor);
    if can_use_immediate {
        if let (Rvalue::Register { reg, from_lvalue, .. }, Rvalue::Const(Const::Int { value: imm, .. })) =
            (lhs_rv, rhs_rv)
        {
            let dst = if from_lvalue { ctx.pool.get_register() } else { reg };
            emit_immediate(out, op, dst, reg, imm as i32);
            return Rvalue::Register { reg: dst, ty, from_lvalue: false };
        }
        if let (Rvalue::Const(Const::Int { value: imm, .. }), Rvalue::Register { reg, from_lvalue, .. }) =
            (lhs_rv, rhs_rv)
        {
            if matches!(op, BinOp::Add | BinOp::And | BinOp::Or | BinOp::Xor) {
                let dst = if from_lvalue { ctx.pool.get_register() } else { reg };
                emit_immediate(out, op, dst, reg, imm as i32);
                return Rvalue::Register { reg: dst, ty, from_lvalue: false };
            }
        }
    }
    if op == BinOp::Sub {
        if let (Rvalue::Register { reg, from_lvalue, .. }, Rvalue::Const(Const::Int { value: imm, .. })) =
            (lhs_rv, rhs_rv)
        {
            let dst = if from_lvalue { ctx.pool.get_register() } else { reg };
            out.push(Instruction::Addi { dst, src: reg, imm: -(imm as i32) });
            return Rvalue::Register { reg: dst, ty, from_lvalue: false };
        }
    }

    let lhs_reg = ensure_register(ctx, out, lhs_rv);
    let rhs_reg = ensure_register(ctx, out, rhs_rv);
    let (dst, a, b) = combine_registers(
        ctx,
        Rvalue::Register { reg: lhs_reg, ty, from_lvalue: matches!(lhs_rv, Rvalue::Register { from_lvalue: true, .. }) },
        Rvalue::Register { reg: rhs_reg, ty, from_lvalue: matches!(rhs_rv, Rvalue::Register { from_lvalue: true, .. }) },
    );
    match op {
        BinOp::Mul => {
            out.push(Instruction::Mult { lhs: a, rhs: b });
            out.push(Instruction::Mflo { dst });
        }
        BinOp::Div => {
            out.push(Instruction::Div { lhs: a, rhs: b });
            out.push(Instruction::Mflo { dst });
        }
        BinOp::Rem => {
            out.push(Instruction::Div { lhs: a, rhs: b });
            out.push(Instruction::Mfhi { dst });
        }
        _ => out.push(Instruction::BinReg { op: binop_mnemonic(op), dst, lhs: a, rhs: b }),
    }
    Rvalue::Register { reg: dst, ty, from_lvalue: false }
}

/// Single-precision float arithmetic: `add.s`/`sub.s`/`mul.s`/`div.s`. The
/// float allocator mirrors `combine_registers`' keep-the-lower-numbered-
/// temp discipline, but over the float temp file instead of `T0..T7`.
fn lower_float_arithmetic(
    ctx: &mut Context,
    out: &mut Vec<Instruction>,
    op: BinOp,
    lhs_rv: Rvalue,
    rhs_rv: Rvalue,
    ty: crate::front::tables::TypeId,
) -> Rvalue {
    let lhs_reg = ensure_float_register(ctx, out, lhs_rv);
    let rhs_reg = ensure_float_register(ctx, out, rhs_rv);
    let (dst, a, b) = combine_float_registers(ctx, lhs_rv, rhs_rv, lhs_reg, rhs_reg);
    let mnemonic = match op {
        BinOp::Add => "add.s",
        BinOp::Sub => "sub.s",
        BinOp::Mul => "mul.s",
        BinOp::Div => "div.s",
        _ => panic!("EXPR_INVALID: operator not supported on float operands"),
    };
    out.push(Instruction::FRaw(format!("{mnemonic} {dst}, {a}, {b}")));
    Rvalue::Float { reg: dst, ty, from_lvalue: false }
}

/// The float-file analogue of [`combine_registers`].
fn combine_float_registers(ctx: &mut Context, lhs_rv: Rvalue, rhs_rv: Rvalue, lreg: FReg, rreg: FReg) -> (FReg, FReg, FReg) {
    let lfl = matches!(lhs_rv, Rvalue::Float { from_lvalue: true, .. });
    let rfl = matches!(rhs_rv, Rvalue::Float { from_lvalue: true, .. });
    if !lfl && !rfl {
        let keep_left = match (lreg, rreg) {
            (FReg::Temp(a), FReg::Temp(b)) => a <= b,
            _ => true,
        };
        let (keep, drop) = if keep_left { (lreg, rreg) } else { (rreg, lreg) };
        ctx.pool.free_float_register(drop);
        (keep, lreg, rreg)
    } else {
        let dst = ctx.pool.get_float_register();
        (dst, lreg, rreg)
    }
}

fn emit_immediate(out: &mut Vec<Instruction>, op: BinOp, dst: Register, src: Register, imm: i32) {
    match op {
        BinOp::Add => out.push(Instruction::Addi { dst, src, imm }),
        BinOp::Shl | BinOp::Shr | BinOp::Or | BinOp::Xor | BinOp::And => {
            let mnemonic = match op {
                BinOp::Shl => "sll",
                BinOp::Shr => "sra",
                BinOp::Or => "ori",
                BinOp::Xor => "xori",
                BinOp::And => "andi",
                _ => unreachable!(),
            };
            out.push(Instruction::FRaw(format!("{mnemonic} {dst}, {src}, {imm}")));
        }
        _ => unreachable!(),
    }
}

/// `SUB result, a, b` followed by a single
/// branch bracketing exactly two `li` instructions (0 and 1).
fn lower_comparison(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, op: BinOp, lhs: ExprId, rhs: ExprId) -> Rvalue {
    let lhs_rv = lower_rvalue(ctx, ast, out, lhs);
    let rhs_rv = lower_rvalue(ctx, ast, out, rhs);
    let lhs_reg = ensure_register(ctx, out, lhs_rv);
    let rhs_reg = ensure_register(ctx, out, rhs_rv);
    let (dst, a, b) = combine_registers(
        ctx,
        Rvalue::Register { reg: lhs_reg, ty: TypeTable::BOOL, from_lvalue: matches!(lhs_rv, Rvalue::Register { from_lvalue: true, .. }) },
        Rvalue::Register { reg: rhs_reg, ty: TypeTable::BOOL, from_lvalue: matches!(rhs_rv, Rvalue::Register { from_lvalue: true, .. }) },
    );
    out.push(Instruction::BinReg { op: "subu", dst, lhs: a, rhs: b });

    let end = ctx.new_label(LabelKind::End);
    // Direct mapping observed in the original `mipsgen.c`: GT -> BGTZ, LT ->
    // BLTZ, paired at call sites with `reverse_logic_command` when the
    // surrounding context needs the negated sense. This mapping itself is
    // internally consistent, so it's preserved here as-is.
    let branch_op = match op {
        BinOp::Gt => "bgtz",
        BinOp::Lt => "bltz",
        BinOp::Ge => "bgez",
        BinOp::Le => "blez",
        BinOp::Eq => "beqz",
        BinOp::Ne => "bnez",
        _ => unreachable!(),
    };
    out.push(Instruction::BranchZ { op: branch_op, reg: dst, target: end });
    out.push(Instruction::Li { dst, imm: 0 });
    let after = ctx.new_label(LabelKind::Next);
    out.push(Instruction::Jump { target: after });
    out.push(Instruction::Label(end));
    out.push(Instruction::Li { dst, imm: 1 });
    out.push(Instruction::Label(after));
    Rvalue::Register { reg: dst, ty: TypeTable::BOOL, from_lvalue: false }
}

fn lower_short_circuit(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, is_and: bool, lhs: ExprId, rhs: ExprId) -> Rvalue {
    let lhs_rv = lower_rvalue(ctx, ast, out, lhs);
    let result = ensure_register(ctx, out, lhs_rv);
    let end = ctx.new_label(LabelKind::End);
    let branch_op = if is_and { "beqz" } else { "bnez" };
    out.push(Instruction::BranchZ { op: branch_op, reg: result, target: end });
    let rhs_rv = lower_rvalue(ctx, ast, out, rhs);
    let rhs_reg = ensure_register(ctx, out, rhs_rv);
    if rhs_reg != result {
        out.push(Instruction::Move { dst: result, src: rhs_reg });
        ctx.pool.free_register(rhs_reg);
    }
    out.push(Instruction::Label(end));
    Rvalue::Register { reg: result, ty: TypeTable::BOOL, from_lvalue: false }
}

fn lower_unary(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, op: UnOp, operand: ExprId, ty: crate::front::tables::TypeId) -> Rvalue {
    match op {
        UnOp::Neg => {
            let rv = lower_rvalue(ctx, ast, out, operand);
            let src = ensure_register(ctx, out, rv);
            let dst = if matches!(rv, Rvalue::Register { from_lvalue: true, .. }) {
                ctx.pool.get_register()
            } else {
                src
            };
            out.push(Instruction::BinReg { op: "subu", dst, lhs: Register::Zero, rhs: src });
            Rvalue::Register { reg: dst, ty, from_lvalue: false }
        }
        UnOp::BitNot => {
            let rv = lower_rvalue(ctx, ast, out, operand);
            let src = ensure_register(ctx, out, rv);
            let dst = if matches!(rv, Rvalue::Register { from_lvalue: true, .. }) {
                ctx.pool.get_register()
            } else {
                src
            };
            out.push(Instruction::Li { dst: Register::At, imm: -1 });
            out.push(Instruction::BinReg { op: "xor", dst, lhs: src, rhs: Register::At });
            Rvalue::Register { reg: dst, ty, from_lvalue: false }
        }
        UnOp::LogNot => {
            let rv = lower_rvalue(ctx, ast, out, operand);
            let src = ensure_register(ctx, out, rv);
            let dst = ctx.pool.get_register();
            free_if_freeable(ctx, rv);
            let else_label = ctx.new_label(LabelKind::Else);
            let end_label = ctx.new_label(LabelKind::End);
            out.push(Instruction::BranchZ { op: "bnez", reg: src, target: else_label });
            out.push(Instruction::Li { dst, imm: 1 });
            out.push(Instruction::Jump { target: end_label });
            out.push(Instruction::Label(else_label));
            out.push(Instruction::Li { dst, imm: 0 });
            out.push(Instruction::Label(end_label));
            Rvalue::Register { reg: dst, ty: TypeTable::BOOL, from_lvalue: false }
        }
        UnOp::Abs => {
            let rv = lower_rvalue(ctx, ast, out, operand);
            let src = ensure_register(ctx, out, rv);
            let dst = if matches!(rv, Rvalue::Register { from_lvalue: true, .. }) {
                ctx.pool.get_register()
            } else {
                src
            };
            let positive = ctx.new_label(LabelKind::Else);
            out.push(Instruction::Move { dst, src });
            out.push(Instruction::BranchZ { op: "bgez", reg: dst, target: positive });
            out.push(Instruction::BinReg { op: "subu", dst, lhs: Register::Zero, rhs: dst });
            out.push(Instruction::Label(positive));
            Rvalue::Register { reg: dst, ty, from_lvalue: false }
        }
        UnOp::Address => {
            let lv = lower_lvalue(ctx, ast, out, operand);
            let rv = match lv {
                Lvalue::Stack { base_reg, displ, .. } => {
                    let dst = ctx.pool.get_register();
                    out.push(Instruction::Addi { dst, src: base_reg, imm: displ });
                    Rvalue::Register { reg: dst, ty, from_lvalue: false }
                }
                Lvalue::Register { .. } => panic!("cannot take the address of a register-resident variable"),
            };
            free_lvalue(ctx, lv);
            rv
        }
        UnOp::Indirection => {
            let lv = lower_lvalue(ctx, ast, out, operand);
            let rv = load_lvalue(ctx, out, lv);
            free_lvalue(ctx, lv);
            rv
        }
        UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
            let lv = lower_lvalue(ctx, ast, out, operand);
            let loaded = load_lvalue(ctx, out, lv);
            let old = ensure_register(ctx, out, loaded);
            let is_post = matches!(op, UnOp::PostInc | UnOp::PostDec);
            let is_register_resident = matches!(lv, Lvalue::Register { .. });
            let result_reg = if is_post {
                let saved = ctx.pool.get_register();
                out.push(Instruction::Move { dst: saved, src: old });
                saved
            } else {
                old
            };
            let delta = if matches!(op, UnOp::PreInc | UnOp::PostInc) { 1 } else { -1 };
            out.push(Instruction::Addi { dst: old, src: old, imm: delta });
            store_lvalue(ctx, out, lv, Rvalue::Register { reg: old, ty, from_lvalue: false });
            if is_post && !is_register_resident {
                ctx.pool.free_register(old);
            }
            free_lvalue(ctx, lv);
            // Pre-inc/dec hands back the same register the variable lives
            // in, so a register-resident operand's result must keep
            // `from_lvalue: true` -- otherwise a caller like
            // `lower_arithmetic`'s immediate-add path can reuse that
            // register for an unrelated value, clobbering the variable.
            // Post-inc/dec always returns a disjoint `saved` register, so
            // it's never `from_lvalue` regardless of `lv`'s shape.
            let from_lvalue = !is_post && is_register_resident;
            Rvalue::Register { reg: result_reg, ty, from_lvalue }
        }
    }
}

/// int <-> char is a type-tag-only no-op; int -> float loads through the
/// coprocessor (`mtc1` then `cvt.s.w`).
fn lower_cast(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, target: crate::front::tables::TypeId, operand: ExprId) -> Rvalue {
    let rv = lower_rvalue(ctx, ast, out, operand);
    if ctx.tables.types.is_floating(target) {
        let src = ensure_register(ctx, out, rv);
        out.push(Instruction::FRaw(format!("mtc1 {src}, $f0")));
        out.push(Instruction::FRaw("cvt.s.w $f0, $f0".to_string()));
        free_if_freeable(ctx, rv);
        return Rvalue::Float { reg: FReg::Ret, ty: target, from_lvalue: false };
    }
    match rv {
        Rvalue::Register { reg, from_lvalue, .. } => Rvalue::Register { reg, ty: target, from_lvalue },
        Rvalue::Const(Const::Int { value, .. }) => Rvalue::Const(Const::Int { ty: target, value }),
        other => other,
    }
}

fn lower_ternary(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, cond: ExprId, then_branch: ExprId, else_branch: ExprId) -> Rvalue {
    let cond_rv = lower_rvalue(ctx, ast, out, cond);
    let cond_reg = ensure_register(ctx, out, cond_rv);
    free_if_freeable(ctx, cond_rv);
    let else_label = ctx.new_label(LabelKind::Else);
    let end_label = ctx.new_label(LabelKind::End);
    out.push(Instruction::BranchZ { op: "beqz", reg: cond_reg, target: else_label });

    let then_rv = lower_rvalue(ctx, ast, out, then_branch);
    let result = ctx.pool.get_register();
    let then_reg = ensure_register(ctx, out, then_rv);
    out.push(Instruction::Move { dst: result, src: then_reg });
    free_if_freeable(ctx, then_rv);
    out.push(Instruction::Jump { target: end_label });

    out.push(Instruction::Label(else_label));
    let else_rv = lower_rvalue(ctx, ast, out, else_branch);
    let else_reg = ensure_register(ctx, out, else_rv);
    out.push(Instruction::Move { dst: result, src: else_reg });
    free_if_freeable(ctx, else_rv);
    out.push(Instruction::Label(end_label));

    Rvalue::Register { reg: result, ty: ast.expr(then_branch).ty, from_lvalue: false }
}

fn lower_assign(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, op: AssignOp, lhs: ExprId, rhs: ExprId) -> Rvalue {
    let lv = lower_lvalue(ctx, ast, out, lhs);
    let rhs_rv = lower_rvalue(ctx, ast, out, rhs);
    let new_value = match op.as_binop() {
        None => rhs_rv,
        Some(binop) if ctx.tables.types.is_floating(lv.ty()) => {
            let current = load_lvalue(ctx, out, lv);
            lower_float_arithmetic(ctx, out, binop, current, rhs_rv, lv.ty())
        }
        Some(binop) => {
            let current = load_lvalue(ctx, out, lv);
            let current_reg = ensure_register(ctx, out, current);
            let rhs_reg = ensure_register(ctx, out, rhs_rv);
            let (dst, a, b) = combine_registers(ctx, Rvalue::Register { reg: current_reg, ty: lv.ty(), from_lvalue: matches!(current, Rvalue::Register { from_lvalue: true, .. }) }, Rvalue::Register { reg: rhs_reg, ty: lv.ty(), from_lvalue: false });
            match binop {
                BinOp::Mul => {
                    out.push(Instruction::Mult { lhs: a, rhs: b });
                    out.push(Instruction::Mflo { dst });
                }
                BinOp::Div => {
                    out.push(Instruction::Div { lhs: a, rhs: b });
                    out.push(Instruction::Mflo { dst });
                }
                BinOp::Rem => {
                    out.push(Instruction::Div { lhs: a, rhs: b });
                    out.push(Instruction::Mfhi { dst });
                }
                _ => out.push(Instruction::BinReg { op: binop_mnemonic(binop), dst, lhs: a, rhs: b }),
            }
            Rvalue::Register { reg: dst, ty: lv.ty(), from_lvalue: false }
        }
    };
    let result = store_lvalue(ctx, out, lv, new_value);
    free_lvalue(ctx, lv);
    result
}
