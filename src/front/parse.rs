//! The parser.
//!
//! A plain recursive-descent/precedence-climbing parser over [`Lexer`]
//! tokens, producing an [`ast::Program`] plus the [`Tables`] it references.
//! MIPSgen only ever sees the tree through the accessors on
//! [`ast::Program`] and [`Tables`] -- this module exists so the backend
//! has something real to run against end to end.

use std::fmt::Debug;

use derive_more::derive::Display;

use crate::common::Map;
use crate::front::ast::*;
use crate::front::lex::{LexError, Lexer, Token, TokenKind};
use crate::front::tables::{Tables, TypeId, TypeKind, TypeTable};

#[derive(Display)]
#[display("Parse error: {}", self.0)]
pub struct ParseError(String);

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError(e.to_string())
    }
}

type PResult<T> = Result<T, ParseError>;

struct Parser<'src> {
    toks: Vec<Token<'src>>,
    pos: usize,
    tables: Tables,
    ast: Program,
    scopes: Vec<Map<String, usize>>,
    struct_types: Map<String, TypeId>,
    struct_fields: Map<u32, Vec<String>>,
}

impl<'src> Parser<'src> {
    fn new(toks: Vec<Token<'src>>) -> Self {
        Parser {
            toks,
            pos: 0,
            tables: Tables::new(),
            ast: Program::new(),
            scopes: vec![Map::new()],
            struct_types: Map::new(),
            struct_fields: Map::new(),
        }
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.toks.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<TokenKind> {
        self.toks.get(self.pos + offset).map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<Token<'src>> {
        let t = self.toks.get(self.pos).copied();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        let where_ = match self.peek() {
            Some(t) => format!("near '{}'", t.text),
            None => "at end of input".to_string(),
        };
        ParseError(format!("{} {where_}", msg.into()))
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token<'src>> {
        match self.peek_kind() {
            Some(k) if k == kind => Ok(self.bump().unwrap()),
            _ => Err(self.error(format!("expected {kind:?}"))),
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_type_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(TokenKind::Void)
                | Some(TokenKind::Bool)
                | Some(TokenKind::Char)
                | Some(TokenKind::Int)
                | Some(TokenKind::Float)
                | Some(TokenKind::Struct)
        )
    }

    // ---- scopes ---------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(Map::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, ty: TypeId) -> usize {
        let is_local = self.scopes.len() > 1;
        let id = self.tables.idents.add(name, ty, is_local);
        self.scopes.last_mut().unwrap().insert(name.to_string(), id);
        id
    }

    fn resolve(&self, name: &str) -> PResult<usize> {
        for scope in self.scopes.iter().rev() {
            if let Some(id) = scope.get(name) {
                return Ok(*id);
            }
        }
        Err(ParseError(format!("use of undeclared identifier '{name}'")))
    }

    // ---- types ------------------------------------------------------------

    fn parse_base_type(&mut self) -> PResult<TypeId> {
        match self.peek_kind() {
            Some(TokenKind::Void) => {
                self.bump();
                Ok(TypeTable::VOID)
            }
            Some(TokenKind::Bool) => {
                self.bump();
                Ok(TypeTable::BOOL)
            }
            Some(TokenKind::Char) => {
                self.bump();
                Ok(TypeTable::CHAR)
            }
            Some(TokenKind::Int) => {
                self.bump();
                Ok(TypeTable::INTEGER)
            }
            Some(TokenKind::Float) => {
                self.bump();
                Ok(TypeTable::FLOATING)
            }
            Some(TokenKind::Struct) => {
                self.bump();
                let name = self.expect(TokenKind::Id)?.text.to_string();
                if self.eat(TokenKind::LBrace) {
                    let mut members = Vec::new();
                    let mut names = Vec::new();
                    while !self.eat(TokenKind::RBrace) {
                        let member_base = self.parse_base_type()?;
                        loop {
                            let (mname, mty, bounds) = self.parse_declarator(member_base)?;
                            if !bounds.is_empty() {
                                return Err(self.error("array members are not supported in structures"));
                            }
                            names.push(mname);
                            members.push(mty);
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                        self.expect(TokenKind::Semi)?;
                    }
                    self.expect(TokenKind::Semi)?;
                    let ty = self.tables.types.add(TypeKind::Structure(members));
                    self.struct_types.insert(name, ty);
                    self.struct_fields.insert(ty.0, names);
                    Ok(ty)
                } else {
                    self.struct_types
                        .get(&name)
                        .copied()
                        .ok_or_else(|| ParseError(format!("unknown structure '{name}'")))
                }
            }
            _ => Err(self.error("expected a type")),
        }
    }

    fn member_index(&self, ty: TypeId, name: &str) -> PResult<usize> {
        self.struct_fields
            .get(&ty.0)
            .and_then(|fields| fields.iter().position(|f| f == name))
            .ok_or_else(|| ParseError(format!("no member named '{name}'")))
    }

    /// `('*')* id ('[' expr? ']')*`; returns the declared name, its full
    /// type (pointer/array wrapping applied around `base`), and the raw
    /// bound expressions (outermost dimension first, `EmptyBound` nodes for
    /// `[]`).
    fn parse_declarator(&mut self, base: TypeId) -> PResult<(String, TypeId, Vec<ExprId>)> {
        let mut ty = base;
        while self.eat(TokenKind::Star) {
            ty = self.tables.types.pointer_to(ty);
        }
        let name = self.expect(TokenKind::Id)?.text.to_string();

        let mut dims = Vec::new();
        while self.eat(TokenKind::LBracket) {
            if self.eat(TokenKind::RBracket) {
                let id = self.ast.push_expr(Expr {
                    kind: ExprKind::EmptyBound,
                    ty: TypeTable::INTEGER,
                });
                dims.push(id);
            } else {
                let e = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                dims.push(e);
            }
        }
        for _ in &dims {
            ty = self.tables.types.array_of(ty);
        }
        // `array_of` wraps innermost-out; since we wrapped once per
        // dimension starting from `base`, the resulting nesting already
        // reads outer-dimension-first when walked top down, matching
        // `bounds[0]` being the outermost dimension.
        Ok((name, ty, dims))
    }

    // ---- top level ----------------------------------------------------

    fn parse_program(mut self) -> PResult<(Program, Tables)> {
        while self.peek().is_some() {
            let decl = self.parse_external_declaration()?;
            self.ast.root.push(decl);
        }
        Ok((self.ast, self.tables))
    }

    fn parse_external_declaration(&mut self) -> PResult<DeclId> {
        let base = self.parse_base_type()?;
        // A lone `struct Foo { ... };` with no declarator.
        if self.eat(TokenKind::Semi) {
            return Ok(self.ast.push_decl(Decl { kind: DeclKind::Type }));
        }

        let mut ptr_ty = base;
        while self.eat(TokenKind::Star) {
            ptr_ty = self.tables.types.pointer_to(ptr_ty);
        }
        let name = self.expect(TokenKind::Id)?.text.to_string();

        if self.eat(TokenKind::LParen) {
            // Function declaration or definition.
            self.push_scope();
            let mut param_ids = Vec::new();
            let mut param_types = Vec::new();
            if self.peek_kind() != Some(TokenKind::RParen) {
                loop {
                    let pbase = self.parse_base_type()?;
                    let (pname, pty, _) = self.parse_declarator(pbase)?;
                    param_types.push(pty);
                    param_ids.push(self.declare(&pname, pty));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
            let func_ty = self.tables.types.add(TypeKind::Function {
                ret: ptr_ty,
                params: param_types,
            });
            self.pop_scope();
            let func_id = self.declare(&name, func_ty);
            // Re-enter a scope that already has the parameters bound to the
            // same ids used for the signature, then parse the body.
            self.push_scope();
            for (i, &pid) in param_ids.iter().enumerate() {
                let pname = self.tables.idents.get_spelling(pid).to_string();
                let _ = i;
                self.scopes.last_mut().unwrap().insert(pname, pid);
            }
            self.expect(TokenKind::LBrace)?;
            let body = self.parse_compound_tail()?;
            self.pop_scope();
            return Ok(self.ast.push_decl(Decl {
                kind: DeclKind::Func {
                    id: func_id,
                    params: param_ids,
                    body,
                },
            }));
        }

        // Variable declaration(s).
        let mut first = true;
        let mut last_decl = None;
        let mut ty = ptr_ty;
        let mut nm = name;
        loop {
            if !first {
                let (n, t, _) = self.parse_declarator(base)?;
                nm = n;
                ty = t;
            }
            first = false;
            let mut bounds = Vec::new();
            while self.eat(TokenKind::LBracket) {
                if self.eat(TokenKind::RBracket) {
                    bounds.push(self.ast.push_expr(Expr {
                        kind: ExprKind::EmptyBound,
                        ty: TypeTable::INTEGER,
                    }));
                } else {
                    let e = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    bounds.push(e);
                }
            }
            for _ in &bounds {
                ty = self.tables.types.array_of(ty);
            }
            let init = if self.eat(TokenKind::Assign) {
                Some(self.parse_initializer()?)
            } else {
                None
            };
            let id = self.declare(&nm, ty);
            last_decl = Some(self.ast.push_decl(Decl {
                kind: DeclKind::Var { id, ty, bounds, init },
            }));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi)?;
        Ok(last_decl.unwrap())
    }

    fn parse_initializer(&mut self) -> PResult<ExprId> {
        if self.eat(TokenKind::LBrace) {
            let mut elems = Vec::new();
            if self.peek_kind() != Some(TokenKind::RBrace) {
                loop {
                    elems.push(self.parse_assignment()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RBrace)?;
            Ok(self.ast.push_expr(Expr {
                kind: ExprKind::InitializerList(elems),
                ty: TypeTable::VOID,
            }))
        } else {
            self.parse_assignment()
        }
    }

    // ---- statements -----------------------------------------------------

    fn parse_statement(&mut self) -> PResult<StmtId> {
        match self.peek_kind() {
            Some(TokenKind::LBrace) => {
                self.bump();
                self.push_scope();
                let s = self.parse_compound_tail()?;
                self.pop_scope();
                Ok(s)
            }
            Some(TokenKind::Semi) => {
                self.bump();
                Ok(self.ast.push_stmt(Stmt { kind: StmtKind::Null }))
            }
            Some(TokenKind::If) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let then_branch = self.parse_statement()?;
                let else_branch = if self.eat(TokenKind::Else) {
                    Some(self.parse_statement()?)
                } else {
                    None
                };
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                }))
            }
            Some(TokenKind::Switch) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let guard = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = self.parse_statement()?;
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::Switch { guard, body },
                }))
            }
            Some(TokenKind::Case) => {
                self.bump();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Colon)?;
                let body = self.parse_statement()?;
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::Case { value, body },
                }))
            }
            Some(TokenKind::Default) => {
                self.bump();
                self.expect(TokenKind::Colon)?;
                let body = self.parse_statement()?;
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::Default { body },
                }))
            }
            Some(TokenKind::While) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = self.parse_statement()?;
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::While { cond, body },
                }))
            }
            Some(TokenKind::Do) => {
                self.bump();
                let body = self.parse_statement()?;
                self.expect(TokenKind::While)?;
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semi)?;
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::DoWhile { body, cond },
                }))
            }
            Some(TokenKind::For) => {
                self.bump();
                self.expect(TokenKind::LParen)?;
                self.push_scope();
                let init = if self.is_type_start() {
                    let decl = self.parse_local_decl()?;
                    ForInit {
                        decl: Some(decl),
                        expr: None,
                    }
                } else if self.peek_kind() == Some(TokenKind::Semi) {
                    self.bump();
                    ForInit::default()
                } else {
                    let e = self.parse_expr()?;
                    self.expect(TokenKind::Semi)?;
                    ForInit {
                        decl: None,
                        expr: Some(e),
                    }
                };
                let cond = if self.peek_kind() == Some(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semi)?;
                let step = if self.peek_kind() == Some(TokenKind::RParen) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::RParen)?;
                let body = self.parse_statement()?;
                self.pop_scope();
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::For { init, cond, step, body },
                }))
            }
            Some(TokenKind::Break) => {
                self.bump();
                self.expect(TokenKind::Semi)?;
                Ok(self.ast.push_stmt(Stmt { kind: StmtKind::Break }))
            }
            Some(TokenKind::Continue) => {
                self.bump();
                self.expect(TokenKind::Semi)?;
                Ok(self.ast.push_stmt(Stmt { kind: StmtKind::Continue }))
            }
            Some(TokenKind::Return) => {
                self.bump();
                let value = if self.peek_kind() == Some(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semi)?;
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::Return(value),
                }))
            }
            _ if self.is_type_start() => {
                let decl = self.parse_local_decl()?;
                Ok(self.ast.push_stmt(Stmt {
                    kind: StmtKind::Decl(decl),
                }))
            }
            _ => {
                let e = self.parse_expr()?;
                self.expect(TokenKind::Semi)?;
                Ok(self.ast.push_stmt(Stmt { kind: StmtKind::Expr(e) }))
            }
        }
    }

    /// One `type_spec declarator (',' declarator)* ';'` local declaration.
    /// Only the last declared identifier is returned, matching the external
    /// declaration helper: callers that need every name (e.g. a `for`-init
    /// with a single declarator) only ever use one anyway.
    fn parse_local_decl(&mut self) -> PResult<DeclId> {
        let base = self.parse_base_type()?;
        let mut last = None;
        loop {
            let (name, mut ty, mut bounds) = self.parse_declarator(base)?;
            while self.eat(TokenKind::LBracket) {
                if self.eat(TokenKind::RBracket) {
                    bounds.push(self.ast.push_expr(Expr {
                        kind: ExprKind::EmptyBound,
                        ty: TypeTable::INTEGER,
                    }));
                } else {
                    let e = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    bounds.push(e);
                }
                ty = self.tables.types.array_of(ty);
            }
            let init = if self.eat(TokenKind::Assign) {
                Some(self.parse_initializer()?)
            } else {
                None
            };
            let id = self.declare(&name, ty);
            last = Some(self.ast.push_decl(Decl {
                kind: DeclKind::Var { id, ty, bounds, init },
            }));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semi)?;
        Ok(last.unwrap())
    }

    /// Parses block items until the matching `}`, which this consumes.
    /// Expects the opening `{` to already have been consumed by the caller.
    fn parse_compound_tail(&mut self) -> PResult<StmtId> {
        let mut items = Vec::new();
        while self.peek_kind() != Some(TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(self.error("unexpected end of input in compound statement"));
            }
            items.push(self.parse_statement()?);
        }
        self.bump();
        Ok(self.ast.push_stmt(Stmt {
            kind: StmtKind::Compound(items),
        }))
    }

    // ---- expressions ------------------------------------------------------

    fn parse_expr(&mut self) -> PResult<ExprId> {
        // No comma operator in this subset; `expression` and
        // `assignment-expression` coincide.
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<ExprId> {
        let lhs = self.parse_ternary()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Assign) => Some(AssignOp::Assign),
            Some(TokenKind::AddAssign) => Some(AssignOp::Add),
            Some(TokenKind::SubAssign) => Some(AssignOp::Sub),
            Some(TokenKind::MulAssign) => Some(AssignOp::Mul),
            Some(TokenKind::DivAssign) => Some(AssignOp::Div),
            Some(TokenKind::RemAssign) => Some(AssignOp::Rem),
            Some(TokenKind::ShlAssign) => Some(AssignOp::Shl),
            Some(TokenKind::ShrAssign) => Some(AssignOp::Shr),
            Some(TokenKind::AndAssign) => Some(AssignOp::And),
            Some(TokenKind::OrAssign) => Some(AssignOp::Or),
            Some(TokenKind::XorAssign) => Some(AssignOp::Xor),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let rhs = self.parse_assignment()?;
            let ty = self.ast.expr(lhs).ty;
            return Ok(self.ast.push_expr(Expr {
                kind: ExprKind::Assign { op, lhs, rhs },
                ty,
            }));
        }
        Ok(lhs)
    }

    fn parse_ternary(&mut self) -> PResult<ExprId> {
        let cond = self.parse_logical_or()?;
        if self.eat(TokenKind::Question) {
            let then_branch = self.parse_expr()?;
            self.expect(TokenKind::Colon)?;
            let else_branch = self.parse_assignment()?;
            let ty = self.ast.expr(then_branch).ty;
            return Ok(self.ast.push_expr(Expr {
                kind: ExprKind::Ternary {
                    cond,
                    then_branch,
                    else_branch,
                },
                ty,
            }));
        }
        Ok(cond)
    }

    fn parse_logical_or(&mut self) -> PResult<ExprId> {
        let mut lhs = self.parse_logical_and()?;
        while self.eat(TokenKind::OrOr) {
            let rhs = self.parse_logical_and()?;
            lhs = self.ast.push_expr(Expr {
                kind: ExprKind::LogicalOr(lhs, rhs),
                ty: TypeTable::BOOL,
            });
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> PResult<ExprId> {
        let mut lhs = self.parse_bitor()?;
        while self.eat(TokenKind::AndAnd) {
            let rhs = self.parse_bitor()?;
            lhs = self.ast.push_expr(Expr {
                kind: ExprKind::LogicalAnd(lhs, rhs),
                ty: TypeTable::BOOL,
            });
        }
        Ok(lhs)
    }

    fn parse_binop_level(
        &mut self,
        mut next: impl FnMut(&mut Self) -> PResult<ExprId>,
        ops: &[(TokenKind, BinOp)],
    ) -> PResult<ExprId> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (tok, op) in ops {
                if self.peek_kind() == Some(*tok) {
                    self.bump();
                    let rhs = next(self)?;
                    let ty = if op.is_comparison() {
                        TypeTable::BOOL
                    } else {
                        self.ast.expr(lhs).ty
                    };
                    lhs = self.ast.push_expr(Expr {
                        kind: ExprKind::Binary { op: *op, lhs, rhs },
                        ty,
                    });
                    continue 'outer;
                }
            }
            break;
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> PResult<ExprId> {
        self.parse_binop_level(Self::parse_bitxor, &[(TokenKind::Pipe, BinOp::Or)])
    }

    fn parse_bitxor(&mut self) -> PResult<ExprId> {
        self.parse_binop_level(Self::parse_bitand, &[(TokenKind::Caret, BinOp::Xor)])
    }

    fn parse_bitand(&mut self) -> PResult<ExprId> {
        self.parse_binop_level(Self::parse_equality, &[(TokenKind::Amp, BinOp::And)])
    }

    fn parse_equality(&mut self) -> PResult<ExprId> {
        self.parse_binop_level(
            Self::parse_relational,
            &[(TokenKind::Eq, BinOp::Eq), (TokenKind::Ne, BinOp::Ne)],
        )
    }

    fn parse_relational(&mut self) -> PResult<ExprId> {
        self.parse_binop_level(
            Self::parse_shift,
            &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::Le, BinOp::Le),
                (TokenKind::Ge, BinOp::Ge),
            ],
        )
    }

    fn parse_shift(&mut self) -> PResult<ExprId> {
        self.parse_binop_level(
            Self::parse_additive,
            &[(TokenKind::Shl, BinOp::Shl), (TokenKind::Shr, BinOp::Shr)],
        )
    }

    fn parse_additive(&mut self) -> PResult<ExprId> {
        self.parse_binop_level(
            Self::parse_multiplicative,
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
        )
    }

    fn parse_multiplicative(&mut self) -> PResult<ExprId> {
        self.parse_binop_level(
            Self::parse_unary,
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Rem),
            ],
        )
    }

    fn parse_unary(&mut self) -> PResult<ExprId> {
        let unop = match self.peek_kind() {
            Some(TokenKind::Minus) => Some(UnOp::Neg),
            Some(TokenKind::Tilde) => Some(UnOp::BitNot),
            Some(TokenKind::Not) => Some(UnOp::LogNot),
            Some(TokenKind::Amp) => Some(UnOp::Address),
            Some(TokenKind::Star) => Some(UnOp::Indirection),
            Some(TokenKind::Inc) => Some(UnOp::PreInc),
            Some(TokenKind::Dec) => Some(UnOp::PreDec),
            _ => None,
        };
        if let Some(op) = unop {
            self.bump();
            let operand = self.parse_unary()?;
            let ty = match op {
                UnOp::Address => {
                    let inner = self.ast.expr(operand).ty;
                    self.tables.types.pointer_to(inner)
                }
                UnOp::Indirection => {
                    let inner = self.ast.expr(operand).ty;
                    self.tables.types.pointer_element(inner)
                }
                UnOp::LogNot => TypeTable::BOOL,
                _ => self.ast.expr(operand).ty,
            };
            return Ok(self.ast.push_expr(Expr {
                kind: ExprKind::Unary { op, operand },
                ty,
            }));
        }
        if self.eat(TokenKind::Abs) {
            self.expect(TokenKind::LParen)?;
            let operand = self.parse_expr()?;
            self.expect(TokenKind::RParen)?;
            let ty = self.ast.expr(operand).ty;
            return Ok(self.ast.push_expr(Expr {
                kind: ExprKind::Unary { op: UnOp::Abs, operand },
                ty,
            }));
        }
        // Cast: `(` type-name `)` unary-expression.
        if self.peek_kind() == Some(TokenKind::LParen) {
            let save = self.pos;
            self.bump();
            let looks_like_type = matches!(
                self.peek_kind(),
                Some(TokenKind::Void)
                    | Some(TokenKind::Bool)
                    | Some(TokenKind::Char)
                    | Some(TokenKind::Int)
                    | Some(TokenKind::Float)
                    | Some(TokenKind::Struct)
            );
            if looks_like_type {
                let target = self.parse_base_type()?;
                if self.eat(TokenKind::RParen) {
                    let operand = self.parse_unary()?;
                    return Ok(self.ast.push_expr(Expr {
                        kind: ExprKind::Cast { target, operand },
                        ty: target,
                    }));
                }
            }
            self.pos = save;
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<ExprId> {
        let mut e = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::LBracket) => {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    let base_ty = self.ast.expr(e).ty;
                    let elem_ty = self.tables.types.array_element(base_ty);
                    e = self.ast.push_expr(Expr {
                        kind: ExprKind::Subscript { base: e, index },
                        ty: elem_ty,
                    });
                }
                Some(TokenKind::Dot) => {
                    self.bump();
                    let name = self.expect(TokenKind::Id)?.text.to_string();
                    let base_ty = self.ast.expr(e).ty;
                    let member = self.member_index(base_ty, &name)?;
                    let member_ty = self.tables.types.structure_member_type(base_ty, member);
                    e = self.ast.push_expr(Expr {
                        kind: ExprKind::Member {
                            base: e,
                            member,
                            is_arrow: false,
                        },
                        ty: member_ty,
                    });
                }
                Some(TokenKind::Arrow) => {
                    self.bump();
                    let name = self.expect(TokenKind::Id)?.text.to_string();
                    let base_ty = self.ast.expr(e).ty;
                    let struct_ty = self.tables.types.pointer_element(base_ty);
                    let member = self.member_index(struct_ty, &name)?;
                    let member_ty = self.tables.types.structure_member_type(struct_ty, member);
                    e = self.ast.push_expr(Expr {
                        kind: ExprKind::Member {
                            base: e,
                            member,
                            is_arrow: true,
                        },
                        ty: member_ty,
                    });
                }
                Some(TokenKind::LParen) => {
                    self.bump();
                    let mut args = Vec::new();
                    if self.peek_kind() != Some(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_assignment()?);
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    let ret_ty = {
                        let callee_ty = self.ast.expr(e).ty;
                        if self.tables.types.is_function(callee_ty) {
                            self.tables.types.function_return(callee_ty)
                        } else {
                            TypeTable::INTEGER
                        }
                    };
                    e = self.ast.push_expr(Expr {
                        kind: ExprKind::Call { callee: e, args },
                        ty: ret_ty,
                    });
                }
                Some(TokenKind::Inc) => {
                    self.bump();
                    let ty = self.ast.expr(e).ty;
                    e = self.ast.push_expr(Expr {
                        kind: ExprKind::Unary {
                            op: UnOp::PostInc,
                            operand: e,
                        },
                        ty,
                    });
                }
                Some(TokenKind::Dec) => {
                    self.bump();
                    let ty = self.ast.expr(e).ty;
                    e = self.ast.push_expr(Expr {
                        kind: ExprKind::Unary {
                            op: UnOp::PostDec,
                            operand: e,
                        },
                        ty,
                    });
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_primary(&mut self) -> PResult<ExprId> {
        match self.peek_kind() {
            Some(TokenKind::IntLiteral) => {
                let t = self.bump().unwrap();
                let v: i64 = if let Some(hex) = t.text.strip_prefix("0x").or_else(|| t.text.strip_prefix("0X")) {
                    i64::from_str_radix(hex, 16).map_err(|e| ParseError(e.to_string()))?
                } else {
                    t.text.parse().map_err(|e: std::num::ParseIntError| ParseError(e.to_string()))?
                };
                Ok(self.ast.push_expr(Expr {
                    kind: ExprKind::Literal(Literal::Int(v)),
                    ty: TypeTable::INTEGER,
                }))
            }
            Some(TokenKind::FloatLiteral) => {
                let t = self.bump().unwrap();
                let v: f32 = t.text.parse().map_err(|e: std::num::ParseFloatError| ParseError(e.to_string()))?;
                Ok(self.ast.push_expr(Expr {
                    kind: ExprKind::Literal(Literal::Float(v)),
                    ty: TypeTable::FLOATING,
                }))
            }
            Some(TokenKind::CharLiteral) => {
                let t = self.bump().unwrap();
                let inner = &t.text[1..t.text.len() - 1];
                let ch = unescape_one(inner);
                Ok(self.ast.push_expr(Expr {
                    kind: ExprKind::Literal(Literal::Char(ch as i8)),
                    ty: TypeTable::CHAR,
                }))
            }
            Some(TokenKind::StringLiteral) => {
                let t = self.bump().unwrap();
                let inner = &t.text[1..t.text.len() - 1];
                let idx = self.tables.strings.intern(unescape_string(inner));
                Ok(self.ast.push_expr(Expr {
                    kind: ExprKind::Literal(Literal::Str(idx)),
                    ty: TypeTable::INTEGER,
                }))
            }
            Some(TokenKind::True) => {
                self.bump();
                Ok(self.ast.push_expr(Expr {
                    kind: ExprKind::Literal(Literal::Bool(true)),
                    ty: TypeTable::BOOL,
                }))
            }
            Some(TokenKind::False) => {
                self.bump();
                Ok(self.ast.push_expr(Expr {
                    kind: ExprKind::Literal(Literal::Bool(false)),
                    ty: TypeTable::BOOL,
                }))
            }
            Some(TokenKind::Id) => {
                let t = self.bump().unwrap();
                let id = self.resolve(t.text)?;
                let ty = self.tables.idents.get_type(id);
                Ok(self.ast.push_expr(Expr {
                    kind: ExprKind::Ident(id),
                    ty,
                }))
            }
            Some(TokenKind::LParen) => {
                self.bump();
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            _ => Err(self.error("expected an expression")),
        }
    }
}

fn unescape_one(s: &str) -> u8 {
    let mut chars = s.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            Some('n') => b'\n',
            Some('t') => b'\t',
            Some('0') => 0,
            Some(c) => c as u8,
            None => b'\\',
        },
        Some(c) => c as u8,
        None => 0,
    }
}

fn unescape_string(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Tokenizes `input` (already preprocessed) and parses a whole translation
/// unit, returning the AST and the tables it references.
pub fn parse(input: &str) -> PResult<(Program, Tables)> {
    let mut lexer = Lexer::new(input);
    let mut toks = Vec::new();
    while let Some(tok) = lexer.next()? {
        toks.push(tok);
    }
    Parser::new(toks).parse_program()
}
