//! The top-level driver: preamble, the `main` trampoline, string pool,
//! and per-function emission, assembled into one assembly text.
//!
//! Redesign note: the original `mipsgen.c` defers `jal FUNC<main>` until
//! after every function body has been emitted in `.text`, so the
//! trampoline's prologue falls through into whatever function happens to
//! follow it. This rewrite keeps the trampoline's setup, call, and
//! epilogue contiguous -- safe, since the trampoline returns via `jr $ra`
//! before any other code -- and emits strings and function bodies after it.

use crate::back::context::Context;
use crate::back::instr::Instruction;
use crate::back::label::{Label, LabelKind};
use crate::back::registers::Register;
use crate::back::strings::StringPool;
use crate::front::ast::*;
use crate::front::tables::Tables;

/// Lower bound of dynamic ("heap") memory, and its displacement relative
/// to `$gp`. Matches the original `mipsgen.c`'s `LOW_DYN_BORDER` /
/// `-(HEAP_DISPL + 60)` constants exactly.
const LOW_DYN_BORDER: i64 = 0x10010000;
const HEAP_DISPL: i32 = 8000;

fn preamble() -> Vec<Instruction> {
    vec![
        Instruction::Directive(".mdebug.abi32".to_string()),
        Instruction::Directive(".previous".to_string()),
        Instruction::Directive(".nan legacy".to_string()),
        Instruction::Directive(".module fp=xx".to_string()),
        Instruction::Directive(".module nooddspreg".to_string()),
        Instruction::Directive(".abicalls".to_string()),
        Instruction::Directive(".option pic0".to_string()),
        Instruction::Directive(".text".to_string()),
        Instruction::Directive(".align 2".to_string()),
    ]
}

/// Emits the `main` symbol: sets up `$gp`/`$fp`/`$sp`, calls the user's
/// `main` function (`FUNC<main_id>`), and returns.
fn main_trampoline(main_id: usize) -> Vec<Instruction> {
    let mut out = Vec::new();
    out.push(Instruction::Blank);
    out.push(Instruction::Directive(".globl main".to_string()));
    out.push(Instruction::Directive(".ent main".to_string()));
    out.push(Instruction::FuncLabel("main".to_string()));
    out.push(Instruction::La { dst: Register::Gp, sym: "__gnu_local_gp".to_string() });
    out.push(Instruction::Move { dst: Register::Fp, src: Register::Sp });
    out.push(Instruction::Addi { dst: Register::Sp, src: Register::Sp, imm: -4 });
    out.push(Instruction::Sw { src: Register::Ra, displ: 0, base: Register::Sp });
    out.push(Instruction::Li { dst: Register::T0, imm: LOW_DYN_BORDER });
    out.push(Instruction::Sw {
        src: Register::T0,
        displ: -HEAP_DISPL - 60,
        base: Register::Gp,
    });

    let func_label = Label::new(LabelKind::Func, main_id as u32);
    out.push(Instruction::JumpAndLink { target: func_label.to_string() });
    out.push(Instruction::Nop);

    out.push(Instruction::Lw { dst: Register::Ra, displ: 0, base: Register::Sp });
    out.push(Instruction::Addi { dst: Register::Sp, src: Register::Sp, imm: 4 });
    out.push(Instruction::Jr { reg: Register::Ra });
    out.push(Instruction::Directive(".end main".to_string()));
    out
}

/// Walks the translation unit's top-level declarations, lowering every
/// function body and registering every file-scope variable, then
/// assembles the preamble, trampoline, string pool and function bodies
/// into one assembly text.
pub fn compile(ast: &Program, tables: &Tables) -> String {
    let string_pool = StringPool::build(&tables.strings);
    let mut ctx = Context::new(tables, &string_pool);

    for &decl in ast.root() {
        if let DeclKind::Var { id, ty, .. } = &ast.decl(decl).kind {
            let size = tables.types.size(*ty).max(4) as i32;
            ctx.add_global(*id, size);
        }
    }

    let mut main_id = None;
    let mut function_bodies = Vec::new();
    for &decl in ast.root() {
        if let DeclKind::Func { id, params, body } = &ast.decl(decl).kind {
            if tables.idents.get_spelling(*id) == "main" {
                main_id = Some(*id);
            }
            function_bodies.push(crate::back::func::lower_function(&mut ctx, ast, *id, params, *body));
        }
    }
    let main_id = main_id.expect("a translation unit must define `main`");

    let mut out = String::new();
    for instr in preamble() {
        out.push_str(&format!("{instr}\n"));
    }
    for instr in main_trampoline(main_id) {
        out.push_str(&format!("{instr}\n"));
    }
    out.push_str(&string_pool.emit_rdata());
    out.push_str("\t.text\n");
    for body in function_bodies {
        for instr in body {
            out.push_str(&format!("{instr}\n"));
        }
    }
    out
}
