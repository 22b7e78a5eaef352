//! Statement lowering.
//!
//! Control flow is built entirely out of `beq $0`/`bne $0`-style branches
//! and the label kinds in `label.rs`; there is no separate basic-block
//! graph; labels are simply textual markers in the output buffer.

use crate::back::context::Context;
use crate::back::instr::Instruction;
use crate::back::label::LabelKind;
use crate::back::registers::Register;
use crate::back::value::{Lvalue, Rvalue};
use crate::front::ast::*;

pub fn lower_stmt(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, id: StmtId) {
    debug_assert!(ctx.pool.is_empty(), "temp pool must be empty between statements");
    let stmt = ast.stmt(id);
    match &stmt.kind {
        StmtKind::Compound(items) => {
            for &item in items {
                lower_stmt(ctx, ast, out, item);
            }
        }
        StmtKind::Decl(decl_id) => lower_decl(ctx, ast, out, *decl_id),
        StmtKind::Expr(expr_id) => {
            let rv = crate::back::expr::lower_rvalue(ctx, ast, out, *expr_id);
            free_rvalue(ctx, rv);
        }
        StmtKind::Null => {}
        StmtKind::If { cond, then_branch, else_branch } => {
            lower_if(ctx, ast, out, *cond, *then_branch, *else_branch)
        }
        StmtKind::Switch { guard, body } => lower_switch(ctx, ast, out, *guard, *body),
        StmtKind::Case { body, .. } | StmtKind::Default { body } => lower_stmt(ctx, ast, out, *body),
        StmtKind::While { cond, body } => lower_while(ctx, ast, out, *cond, *body),
        StmtKind::DoWhile { body, cond } => lower_do_while(ctx, ast, out, *body, *cond),
        StmtKind::For { init, cond, step, body } => lower_for(ctx, ast, out, init, *cond, *step, *body),
        StmtKind::Continue => {
            let target = ctx.continue_target();
            out.push(Instruction::Jump { target });
        }
        StmtKind::Break => {
            let target = ctx.break_target();
            out.push(Instruction::Jump { target });
        }
        StmtKind::Return(value) => lower_return(ctx, ast, out, *value),
    }
    debug_assert!(ctx.pool.is_empty(), "temp pool must be empty between statements");
}

fn free_rvalue(ctx: &mut Context, rv: Rvalue) {
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

/// `cond -> beq $0 -> ELSE or END; then; j END; ELSE: else; END:`
fn lower_if(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, cond: ExprId, then_branch: StmtId, else_branch: Option<StmtId>) {
    let cond_rv = crate::back::expr::lower_rvalue(ctx, ast, out, cond);
    let cond_reg = crate::back::expr::ensure_register(ctx, out, cond_rv);
    free_rvalue(ctx, cond_rv);

    match else_branch {
        None => {
            let end = ctx.new_label(LabelKind::End);
            out.push(Instruction::BranchZ { op: "beqz", reg: cond_reg, target: end });
            lower_stmt(ctx, ast, out, then_branch);
            out.push(Instruction::Label(end));
        }
        Some(else_stmt) => {
            let else_label = ctx.new_label(LabelKind::Else);
            let end = ctx.new_label(LabelKind::End);
            out.push(Instruction::BranchZ { op: "beqz", reg: cond_reg, target: else_label });
            lower_stmt(ctx, ast, out, then_branch);
            out.push(Instruction::Jump { target: end });
            out.push(Instruction::Label(else_label));
            lower_stmt(ctx, ast, out, else_stmt);
            out.push(Instruction::Label(end));
        }
    }
}

/// A linear compare-and-branch chain: each `case` value is checked in
/// source order, `default` (if present) catches the rest. `switch` isn't
/// detailed beyond its accessor surface; this is the straightforward
/// lowering consistent with how `if`/`else if` chains are already built.
fn lower_switch(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, guard: ExprId, body: StmtId) {
    let guard_rv = crate::back::expr::lower_rvalue(ctx, ast, out, guard);
    let guard_reg = crate::back::expr::ensure_register(ctx, out, guard_rv);
    let end = ctx.new_label(LabelKind::End);
    // `switch` introduces a new `break` target but must not shadow the
    // enclosing loop's `continue` target -- a `continue` nested inside a
    // `switch` inside a `while`/`for`/`do-while` continues that loop, not
    // the switch.
    let continue_target = ctx.current_continue_target().unwrap_or(end);
    ctx.push_loop(continue_target, end);

    let StmtKind::Compound(items) = &ast.stmt(body).kind else {
        panic!("node_unexpected: switch body must be a compound statement");
    };
    let mut case_labels = Vec::new();
    let mut default_label = None;
    for &item in items {
        let label = ctx.new_label(LabelKind::Next);
        match &ast.stmt(item).kind {
            StmtKind::Case { value, .. } => case_labels.push((*value, label)),
            StmtKind::Default { .. } => default_label = Some(label),
            _ => {}
        }
    }
    for (i, &(value_expr, label)) in case_labels.iter().enumerate() {
        let _ = i;
        let value_rv = crate::back::expr::lower_rvalue(ctx, ast, out, value_expr);
        let value_reg = crate::back::expr::ensure_register(ctx, out, value_rv);
        out.push(Instruction::Branch { op: "beq", lhs: guard_reg, rhs: value_reg, target: label });
        free_rvalue(ctx, value_rv);
    }
    if let Some(label) = default_label {
        out.push(Instruction::Jump { target: label });
    } else {
        out.push(Instruction::Jump { target: end });
    }
    free_rvalue(ctx, guard_rv);

    for &item in items {
        if let Some(label) = case_or_default_label(ast, item, &case_labels, default_label) {
            out.push(Instruction::Label(label));
        }
        lower_stmt(ctx, ast, out, item);
    }
    out.push(Instruction::Label(end));
    ctx.pop_loop();
}

fn case_or_default_label(
    ast: &Program,
    item: StmtId,
    case_labels: &[(ExprId, crate::back::label::Label)],
    default_label: Option<crate::back::label::Label>,
) -> Option<crate::back::label::Label> {
    match &ast.stmt(item).kind {
        StmtKind::Case { value, .. } => Some(case_labels.iter().find(|(v, _)| v.0 == value.0).unwrap().1),
        StmtKind::Default { .. } => Some(default_label.expect("default label was assigned during the first pass")),
        _ => None,
    }
}

/// `BEGIN: cond -> beq $0 -> END; body; j BEGIN; END:`
fn lower_while(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, cond: ExprId, body: StmtId) {
    let begin = ctx.new_label(LabelKind::BeginCycle);
    let end = ctx.new_label(LabelKind::End);
    out.push(Instruction::Label(begin));
    let cond_rv = crate::back::expr::lower_rvalue(ctx, ast, out, cond);
    let cond_reg = crate::back::expr::ensure_register(ctx, out, cond_rv);
    free_rvalue(ctx, cond_rv);
    out.push(Instruction::BranchZ { op: "beqz", reg: cond_reg, target: end });
    ctx.push_loop(begin, end);
    lower_stmt(ctx, ast, out, body);
    ctx.pop_loop();
    out.push(Instruction::Jump { target: begin });
    out.push(Instruction::Label(end));
}

/// `BEGIN: body; NEXT: cond -> branch-if-true BEGIN; END:`
fn lower_do_while(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, body: StmtId, cond: ExprId) {
    let begin = ctx.new_label(LabelKind::BeginCycle);
    let next = ctx.new_label(LabelKind::Next);
    let end = ctx.new_label(LabelKind::End);
    out.push(Instruction::Label(begin));
    ctx.push_loop(next, end);
    lower_stmt(ctx, ast, out, body);
    ctx.pop_loop();
    out.push(Instruction::Label(next));
    let cond_rv = crate::back::expr::lower_rvalue(ctx, ast, out, cond);
    let cond_reg = crate::back::expr::ensure_register(ctx, out, cond_rv);
    free_rvalue(ctx, cond_rv);
    out.push(Instruction::BranchZ { op: "bnez", reg: cond_reg, target: begin });
    out.push(Instruction::Label(end));
}

/// `init; BEGIN: optional-cond -> END; body; increment; j BEGIN; END:`
fn lower_for(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, init: &ForInit, cond: Option<ExprId>, step: Option<ExprId>, body: StmtId) {
    if let Some(decl) = init.decl {
        lower_decl(ctx, ast, out, decl);
    } else if let Some(expr) = init.expr {
        let rv = crate::back::expr::lower_rvalue(ctx, ast, out, expr);
        free_rvalue(ctx, rv);
    }
    let begin = ctx.new_label(LabelKind::BeginCycle);
    let next = ctx.new_label(LabelKind::Next);
    let end = ctx.new_label(LabelKind::End);
    out.push(Instruction::Label(begin));
    if let Some(cond) = cond {
        let cond_rv = crate::back::expr::lower_rvalue(ctx, ast, out, cond);
        let cond_reg = crate::back::expr::ensure_register(ctx, out, cond_rv);
        free_rvalue(ctx, cond_rv);
        out.push(Instruction::BranchZ { op: "beqz", reg: cond_reg, target: end });
    }
    ctx.push_loop(next, end);
    lower_stmt(ctx, ast, out, body);
    ctx.pop_loop();
    out.push(Instruction::Label(next));
    if let Some(step) = step {
        let rv = crate::back::expr::lower_rvalue(ctx, ast, out, step);
        free_rvalue(ctx, rv);
    }
    out.push(Instruction::Jump { target: begin });
    out.push(Instruction::Label(end));
}

fn lower_return(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, value: Option<ExprId>) {
    if let Some(value) = value {
        let rv = crate::back::expr::lower_rvalue(ctx, ast, out, value);
        if ctx.tables.types.is_floating(rv.ty()) {
            let reg = crate::back::expr::ensure_float_register(ctx, out, rv);
            if reg != crate::back::registers::FReg::Ret {
                out.push(Instruction::FRaw(format!("mov.s $f0, {reg}")));
            }
        } else {
            let reg = crate::back::expr::ensure_register(ctx, out, rv);
            if reg != Register::V0 {
                out.push(Instruction::Move { dst: Register::V0, src: reg });
            }
        }
        free_rvalue(ctx, rv);
    }
    let func_id = ctx.cur_func.expect("return statement outside a function body");
    let target = crate::back::label::Label::new(LabelKind::FuncEnd, func_id as u32);
    out.push(Instruction::Jump { target });
}

/// Array declaration: `$fp` is stored as the base address, each
/// dimension's size is stored ahead of it, and `$fp` is walked down by
/// `4*(size+1)` per dimension; an initializer list (if present) is stored
/// contiguously below the base.
fn lower_array_decl(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, id: usize, bounds: &[ExprId], init: Option<ExprId>) {
    let slot = ctx.add_local(id, 4);
    let crate::back::context::Slot::Stack { base_reg, displ } = slot else {
        unreachable!("array locals are always stack-resident")
    };
    out.push(Instruction::Sw { src: Register::Fp, displ, base: base_reg });

    for &bound in bounds {
        if matches!(ast.expr(bound).kind, ExprKind::EmptyBound) {
            continue;
        }
        let rv = crate::back::expr::lower_rvalue(ctx, ast, out, bound);
        let reg = crate::back::expr::ensure_register(ctx, out, rv);
        out.push(Instruction::Sw { src: reg, displ: 0, base: Register::Fp });
        free_rvalue(ctx, rv);
        out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: -4 });
        ctx.max_displ += 4;
    }

    if let Some(init_expr) = init {
        if let ExprKind::InitializerList(elems) = &ast.expr(init_expr).kind {
            for (i, &elem) in elems.iter().enumerate() {
                let rv = crate::back::expr::lower_rvalue(ctx, ast, out, elem);
                let reg = crate::back::expr::ensure_register(ctx, out, rv);
                out.push(Instruction::Sw {
                    src: reg,
                    displ: -4 * (i as i32 + 1),
                    base: Register::Fp,
                });
                free_rvalue(ctx, rv);
                ctx.max_displ += 4;
            }
        }
    }
}

fn lower_decl(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, id: DeclId) {
    let decl = ast.decl(id);
    match &decl.kind {
        DeclKind::Var { id, ty, bounds, init } => {
            // the original `mipsgen.c` inverts this branch (array
            // declarations go through the *scalar* path and vice versa).
            // This rewrite uses the non-inverted, corrected dispatch.
            if ctx.tables.types.is_array(*ty) {
                lower_array_decl(ctx, ast, out, *id, bounds, *init);
            } else {
                let size = ctx.tables.types.size(*ty).max(4) as i32;
                let slot = ctx.add_local(*id, size);
                if let Some(init_expr) = init {
                    let rv = crate::back::expr::lower_rvalue(ctx, ast, out, *init_expr);
                    let crate::back::context::Slot::Stack { base_reg, displ } = slot else {
                        unreachable!("scalar locals are always stack-resident")
                    };
                    let lv = Lvalue::Stack { base_reg, displ, ty: *ty };
                    crate::back::expr::store_lvalue(ctx, out, lv, rv);
                    free_rvalue(ctx, rv);
                    crate::back::expr::free_lvalue(ctx, lv);
                }
            }
        }
        DeclKind::Func { .. } => {
            // Nested function definitions are not part of this language
            // subset; top-level functions are handled by `func.rs`.
        }
        DeclKind::Type => {}
    }
}
