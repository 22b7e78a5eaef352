//! The abstract syntax tree.
//!
//! The tree is an arena of three flat vectors (expressions, statements,
//! declarations) addressed by index handles. MIPSgen never holds a raw
//! reference into the tree across a call that might grow it -- handles, not
//! borrows, are what gets passed around, which is the representation the
//! design notes ask for instead of a boxed, parent-pointing tree.

use crate::front::tables::TypeId;

/// Handle to an [Expr] stored in a [Program] arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ExprId(pub u32);

/// Handle to a [Stmt] stored in a [Program] arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StmtId(pub u32);

/// Handle to a [Decl] stored in a [Program] arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DeclId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    /// Whether this is one of the six relational/equality operators that
    /// MIPSgen materialises via a branch and two `li` instructions rather
    /// than a single arithmetic instruction.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }

    /// The logically negated comparison (`a < b` negated is `a >= b`).
    /// Only meaningful for comparison operators.
    pub fn negated(self) -> BinOp {
        match self {
            BinOp::Lt => BinOp::Ge,
            BinOp::Gt => BinOp::Le,
            BinOp::Le => BinOp::Gt,
            BinOp::Ge => BinOp::Lt,
            BinOp::Eq => BinOp::Ne,
            BinOp::Ne => BinOp::Eq,
            op => op,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    Or,
    Xor,
}

impl AssignOp {
    /// The plain binary operator performing the compound update, or `None`
    /// for a bare `=`.
    pub fn as_binop(self) -> Option<BinOp> {
        Some(match self {
            AssignOp::Assign => return None,
            AssignOp::Add => BinOp::Add,
            AssignOp::Sub => BinOp::Sub,
            AssignOp::Mul => BinOp::Mul,
            AssignOp::Div => BinOp::Div,
            AssignOp::Rem => BinOp::Rem,
            AssignOp::Shl => BinOp::Shl,
            AssignOp::Shr => BinOp::Shr,
            AssignOp::And => BinOp::And,
            AssignOp::Or => BinOp::Or,
            AssignOp::Xor => BinOp::Xor,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnOp {
    /// Unary `-`.
    Neg,
    /// Unary `~`.
    BitNot,
    /// Unary `!`.
    LogNot,
    /// Builtin `abs(x)`.
    Abs,
    /// `++x`.
    PreInc,
    /// `--x`.
    PreDec,
    /// `x++`.
    PostInc,
    /// `x--`.
    PostDec,
    /// Unary `&x` (address-of).
    Address,
    /// Unary `*x` (indirection).
    Indirection,
}

#[derive(Clone, Copy, Debug)]
pub enum Literal {
    Bool(bool),
    Char(i8),
    Int(i64),
    Float(f32),
    /// Index into the string pool.
    Str(usize),
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Literal(Literal),
    /// Reference to an identifier table entry.
    Ident(usize),
    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    LogicalAnd(ExprId, ExprId),
    LogicalOr(ExprId, ExprId),
    Unary {
        op: UnOp,
        operand: ExprId,
    },
    Assign {
        op: AssignOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Subscript {
        base: ExprId,
        index: ExprId,
    },
    Member {
        base: ExprId,
        member: usize,
        is_arrow: bool,
    },
    Cast {
        target: TypeId,
        operand: ExprId,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    Ternary {
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    },
    InitializerList(Vec<ExprId>),
    /// `a[]` in a declarator: legal only in the outermost dimension.
    EmptyBound,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
}

#[derive(Clone, Debug, Default)]
pub struct ForInit {
    pub decl: Option<DeclId>,
    pub expr: Option<ExprId>,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Compound(Vec<StmtId>),
    Decl(DeclId),
    Expr(ExprId),
    Null,
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    Switch {
        guard: ExprId,
        body: StmtId,
    },
    Case {
        value: ExprId,
        body: StmtId,
    },
    Default {
        body: StmtId,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    For {
        init: ForInit,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    Continue,
    Break,
    Return(Option<ExprId>),
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
}

#[derive(Clone, Debug)]
pub enum DeclKind {
    Var {
        id: usize,
        ty: TypeId,
        /// One entry per array dimension, outermost first. Empty for scalars.
        bounds: Vec<ExprId>,
        init: Option<ExprId>,
    },
    Func {
        id: usize,
        params: Vec<usize>,
        body: StmtId,
    },
    /// A type-only declaration (e.g. a `struct` tag introduction). Codegen
    /// never has to lower these; they exist so the declaration-class query
    /// and the top-level declaration list stay complete per the accessor
    /// surface the backend is specified against.
    Type,
}

#[derive(Clone, Debug)]
pub struct Decl {
    pub kind: DeclKind,
}

/// The whole translation unit: three arenas plus the ordered list of
/// top-level declarations (the AST's root).
#[derive(Clone, Debug, Default)]
pub struct Program {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    decls: Vec<Decl>,
    pub root: Vec<DeclId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr);
        ExprId((self.exprs.len() - 1) as u32)
    }

    pub fn push_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.push(stmt);
        StmtId((self.stmts.len() - 1) as u32)
    }

    pub fn push_decl(&mut self, decl: Decl) -> DeclId {
        self.decls.push(decl);
        DeclId((self.decls.len() - 1) as u32)
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize]
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0 as usize]
    }

    /// `node_get_root`: the translation unit's top-level declaration list.
    pub fn root(&self) -> &[DeclId] {
        &self.root
    }
}
