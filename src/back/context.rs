//! The codegen context: the one mutable-state owner per translation unit.
//!
//! Everything expression and statement lowering needs to share -- the
//! displacement table, the label counter, the register pool, the
//! enclosing loop's `continue`/`break` targets -- lives here, borrowed
//! mutably by whichever lowering function is running. Nothing below this
//! struct keeps its own copy of mutable state.

use crate::common::Map;
use crate::back::label::{Label, LabelKind};
use crate::back::registers::{Register, RegisterPool};
use crate::back::strings::StringPool;
use crate::front::tables::Tables;

/// Where an identifier's value currently lives, for the duration of the
/// enclosing function.
#[derive(Clone, Copy, Debug)]
pub enum Slot {
    /// `base_reg + displ`. `displ` is negative for locals (below `$sp`)
    /// and for globals it is relative to `$gp`.
    Stack { base_reg: Register, displ: i32 },
    /// A register-resident variable: a parameter still sitting in its
    /// incoming argument register.
    Register { reg: Register },
}

pub struct Context<'a> {
    pub tables: &'a Tables,
    pub strings: &'a StringPool,
    pub pool: RegisterPool,
    displs: Map<usize, Slot>,
    /// Largest (positive) stack displacement used by the current function,
    /// before the final alignment to 8 bytes.
    pub max_displ: i32,
    /// Displacement counter for file-scope (`$gp`-relative) variables.
    pub global_displ: i32,
    next_label: u32,
    pub cur_func: Option<usize>,
    loop_labels: Vec<LoopLabels>,
}

#[derive(Clone, Copy, Debug)]
struct LoopLabels {
    continue_target: Label,
    break_target: Label,
}

impl<'a> Context<'a> {
    pub fn new(tables: &'a Tables, strings: &'a StringPool) -> Self {
        Context {
            tables,
            strings,
            pool: RegisterPool::new(),
            displs: Map::new(),
            max_displ: 0,
            global_displ: 0,
            next_label: 0,
            cur_func: None,
            loop_labels: Vec::new(),
        }
    }

    pub fn new_label(&mut self, kind: LabelKind) -> Label {
        let num = self.next_label;
        self.next_label += 1;
        Label::new(kind, num)
    }

    /// `displacements_add`: records a new local at the next stack slot
    /// (growing downward from `$sp`) and advances `max_displ` by `size`
    /// bytes.
    pub fn add_local(&mut self, id: usize, size: i32) -> Slot {
        self.max_displ += size;
        let slot = Slot::Stack {
            base_reg: Register::Sp,
            displ: -self.max_displ,
        };
        self.displs.insert(id, slot);
        slot
    }

    /// Same as [`Context::add_local`] but relative to `$gp`, for file-scope
    /// declarations.
    pub fn add_global(&mut self, id: usize, size: i32) -> Slot {
        self.global_displ += size;
        let slot = Slot::Stack {
            base_reg: Register::Gp,
            displ: -self.global_displ,
        };
        self.displs.insert(id, slot);
        slot
    }

    /// Records a parameter as register-resident.
    pub fn add_register_resident(&mut self, id: usize, reg: Register) {
        self.displs.insert(id, Slot::Register { reg });
    }

    pub fn slot(&self, id: usize) -> Slot {
        self.displs[&id]
    }

    /// Clears the displacement table for the function about to start, and
    /// resets the per-function stack-growth counter. `next_label` is
    /// deliberately *not* reset here: `Next`/`Else`/`End`/`BeginCycle`
    /// labels share one counter across the whole translation unit, so two
    /// functions never emit a same-named label (the assembly namespace is
    /// global, not per-function). The global entries installed by
    /// file-scope declarations are re-added by the caller (`program.rs`)
    /// before each function body is lowered, so they stay visible.
    pub fn begin_function(&mut self, func_id: usize) {
        self.displs.retain(|_, slot| matches!(slot, Slot::Stack { base_reg: Register::Gp, .. }));
        self.max_displ = 0;
        self.cur_func = Some(func_id);
        debug_assert!(self.pool.is_empty());
    }

    pub fn push_loop(&mut self, continue_target: Label, break_target: Label) {
        self.loop_labels.push(LoopLabels {
            continue_target,
            break_target,
        });
    }

    pub fn pop_loop(&mut self) {
        self.loop_labels.pop();
    }

    pub fn continue_target(&self) -> Label {
        self.loop_labels.last().expect("continue outside a loop").continue_target
    }

    /// The enclosing loop's `continue` target, if any. `switch` uses this
    /// to inherit rather than shadow it, since `switch` only introduces a
    /// new `break` scope.
    pub fn current_continue_target(&self) -> Option<Label> {
        self.loop_labels.last().map(|l| l.continue_target)
    }

    pub fn break_target(&self) -> Label {
        self.loop_labels.last().expect("break outside a loop").break_target
    }
}
