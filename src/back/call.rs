//! Call lowering: plain function calls (the non-variadic user call path) and
//! the `printf` builtin.

use crate::back::context::Context;
use crate::back::instr::Instruction;
use crate::back::label::LabelKind;
use crate::back::registers::{FReg, Register, ARG_REGISTERS};
use crate::back::value::{Const, Rvalue};
use crate::front::ast::*;
use crate::front::tables::TypeTable;

fn callee_name(ast: &Program, ctx: &Context, callee: ExprId) -> Option<String> {
    match &ast.expr(callee).kind {
        ExprKind::Ident(id) => Some(ctx.tables.idents.get_spelling(*id).to_string()),
        _ => None,
    }
}

pub fn lower_call(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, callee: ExprId, args: &[ExprId]) -> Rvalue {
    if callee_name(ast, ctx, callee).as_deref() == Some("printf") {
        return lower_printf(ctx, ast, out, args);
    }
    let func_id = match &ast.expr(callee).kind {
        ExprKind::Ident(id) => *id,
        _ => panic!("EXPR_INVALID: call target is not a function identifier"),
    };
    let ret_ty = ast.expr(callee).ty;
    let func_ty = ctx.tables.idents.get_type(func_id);

    // 1. Reserve a per-call frame area below the current `$fp`, one word
    // per actual argument: `$fp -= (argc - 1) * 4`. This is where the
    // argument registers this call is about to clobber get saved, *below*
    // the callee's own frame rather than inside the caller's existing
    // local-variable offsets, so a nested call never overwrites a live
    // local sitting at a small negative `$sp` displacement.
    let displ_for_params = if args.is_empty() { 0 } else { (args.len() as i32 - 1) * 4 };
    if displ_for_params != 0 {
        out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: -displ_for_params });
    }

    // 2. Lower each actual argument, saving the argument register it is
    // about to occupy into the reserved frame slot before moving the new
    // value in.
    let save_count = args.len().min(ARG_REGISTERS.len());
    for (i, arg) in args.iter().enumerate() {
        let rv = crate::back::expr::lower_rvalue(ctx, ast, out, *arg);
        if i < ARG_REGISTERS.len() {
            out.push(Instruction::Sw {
                src: ARG_REGISTERS[i],
                displ: (i as i32) * 4,
                base: Register::Fp,
            });
            place_argument(ctx, out, rv, ARG_REGISTERS[i]);
            if let Rvalue::Register { reg, .. } = rv {
                if rv.is_freeable_register() {
                    ctx.pool.free_register(reg);
                }
            }
        }
        // Overflow arguments beyond the four registers are reserved
        // (the original RuC compiler leaves this path as a TODO; a
        // conforming caller for this language subset never exceeds four
        // arguments).
    }

    // 3. jal FUNC<id>
    let label = crate::back::label::Label::new(LabelKind::Func, func_id as u32);
    out.push(Instruction::JumpAndLink { target: label.to_string() });
    out.push(Instruction::Nop);

    // 4. Restore the saved argument registers from the reserved frame area.
    for (i, reg) in ARG_REGISTERS.iter().take(save_count).enumerate() {
        out.push(Instruction::Lw {
            dst: *reg,
            displ: (i as i32) * 4,
            base: Register::Fp,
        });
    }

    // 5. Release the reserved frame area.
    if displ_for_params != 0 {
        out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: displ_for_params });
    }

    // 6. Return value: `$v0` for int/pointer, `$f0` for float.
    if ctx.tables.types.is_void(func_ty) || ctx.tables.types.is_void(ret_ty) {
        return Rvalue::Void;
    }
    if ctx.tables.types.is_floating(ret_ty) {
        return Rvalue::Float { reg: FReg::Ret, ty: ret_ty, from_lvalue: false };
    }
    Rvalue::Register { reg: Register::V0, ty: ret_ty, from_lvalue: false }
}

fn place_argument(ctx: &mut Context, out: &mut Vec<Instruction>, rv: Rvalue, dst: Register) {
    match rv {
        Rvalue::Const(Const::Int { value, .. }) => out.push(Instruction::Li { dst, imm: value }),
        Rvalue::Const(Const::Str { index, .. }) => {
            let label = ctx.strings.label(index, 0);
            out.push(Instruction::La { dst, sym: label.to_string() });
        }
        Rvalue::Const(Const::Float { .. }) => panic!("float constant argument must go through $fa0/$fa2"),
        Rvalue::Register { reg, .. } => {
            if reg != dst {
                out.push(Instruction::Move { dst, src: reg });
            }
        }
        // TODO: float arguments to non-printf calls need $fa0/$fa2 passing,
        // not a general-purpose register move; this language subset's test
        // programs never pass a float to a user-defined function.
        Rvalue::Float { .. } => panic!("EXPR_INVALID: float arguments to user-defined calls are not yet supported"),
        Rvalue::Void => panic!("EXPR_INVALID: void value passed as an argument"),
    }
}

/// `printf(fmt, a1, .., an)`: one `jal printf` per `%` conversion plus a
/// trailing call for the tail segment.
fn lower_printf(ctx: &mut Context, ast: &Program, out: &mut Vec<Instruction>, args: &[ExprId]) -> Rvalue {
    let fmt_index = match &ast.expr(args[0]).kind {
        ExprKind::Literal(Literal::Str(index)) => *index,
        _ => panic!("EXPR_INVALID: printf's first argument must be a string literal"),
    };
    let conversions = ctx.strings.segment_count(fmt_index).saturating_sub(1);
    let value_args = &args[1..];

    for j in 0..conversions {
        let arg_rv = value_args.get(j).map(|e| crate::back::expr::lower_rvalue(ctx, ast, out, *e));
        let is_float = arg_rv.map(|rv| ctx.tables.types.is_floating(rv.ty())).unwrap_or(false);

        // Reserve scratch space below the current frame for the saved
        // argument registers, the same `$fp`-relative reserve/release
        // technique `lower_call` uses above -- a fixed `$sp`-relative
        // offset would alias whatever local variable sits at `[$sp-4]`
        // (`Context::add_local` places the function's first scalar local
        // there), clobbering it the moment this call saves `$a0` over it.
        let reserve = if is_float { 12 } else { 8 };
        out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: -reserve });
        out.push(Instruction::Sw { src: Register::A0, displ: 0, base: Register::Fp });
        out.push(Instruction::Sw { src: Register::A1, displ: 4, base: Register::Fp });
        if is_float {
            out.push(Instruction::Sw { src: Register::A2, displ: 8, base: Register::Fp });
        }

        let label = ctx.strings.label(fmt_index, j);
        out.push(Instruction::Lui { dst: Register::A0, hi: label.to_string() });
        out.push(Instruction::Addiu {
            dst: Register::A0,
            src: Register::A0,
            imm_sym: format!("%lo({label})"),
        });

        if let Some(rv) = arg_rv {
            if is_float {
                let reg = crate::back::expr::ensure_float_register(ctx, out, rv);
                out.push(Instruction::FRaw(format!("cvt.d.s $f0, {reg}")));
                out.push(Instruction::FRaw("mfc1 $a1, $f0".to_string()));
                out.push(Instruction::FRaw("mfhc1 $a2, $f0".to_string()));
                if rv.is_freeable_float() {
                    ctx.pool.free_float_register(reg);
                }
            } else {
                let reg = crate::back::expr::ensure_register(ctx, out, rv);
                out.push(Instruction::Move { dst: Register::A1, src: reg });
                if rv.is_freeable_register() {
                    ctx.pool.free_register(reg);
                }
            }
        }

        out.push(Instruction::JumpAndLink { target: "printf".to_string() });
        out.push(Instruction::Nop);

        out.push(Instruction::Lw { dst: Register::A1, displ: 4, base: Register::Fp });
        out.push(Instruction::Lw { dst: Register::A0, displ: 0, base: Register::Fp });
        if is_float {
            out.push(Instruction::Lw { dst: Register::A2, displ: 8, base: Register::Fp });
        }
        out.push(Instruction::Addi { dst: Register::Fp, src: Register::Fp, imm: reserve });
    }

    // Trailing segment: no argument, just `$a0`.
    let tail = ctx.strings.label(fmt_index, conversions);
    out.push(Instruction::Lui { dst: Register::A0, hi: tail.to_string() });
    out.push(Instruction::Addiu {
        dst: Register::A0,
        src: Register::A0,
        imm_sym: format!("%lo({tail})"),
    });
    out.push(Instruction::JumpAndLink { target: "printf".to_string() });
    out.push(Instruction::Nop);

    Rvalue::Register { reg: Register::V0, ty: TypeTable::INTEGER, from_lvalue: false }
}
