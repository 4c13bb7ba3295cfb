//! Programmatic AST construction.
//!
//! The concrete-syntax parser lives outside this workspace; it hands the core
//! an already-validated tree. This builder is the in-repo way to produce such
//! trees (tests, generated programs, LLM feedback harnesses). It owns the
//! `ExprId` counter so every expression gets a unique id, the same contract
//! the external parser honors.

use crate::{
    BinOp, Block, Decl, DeclareStmt, EnumDecl, Expr, ExprId, ExprKind, FieldDecl, FunctionDecl,
    Ident, IfStmt, MatchArm, MatchStmt, Param, Pattern, Program, RecordDecl, ReturnKind,
    ReturnStmt, SetStmt, Span, Spanned, Stmt, TypeRef, TypeRefKind, UnaryOp, VariantDecl,
    WhileStmt,
};

#[derive(Debug, Default)]
pub struct AstBuilder {
    next_expr: u32,
    next_line: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_expr);
        self.next_expr += 1;
        id
    }

    /// Each call yields a span on a fresh line, so diagnostics in tests can
    /// be told apart by position.
    pub fn span(&mut self) -> Span {
        self.next_line += 1;
        Span::new(self.next_line, 1, self.next_line, 40)
    }

    pub fn ident(&mut self, name: &str) -> Ident {
        Spanned::new(self.span(), name.to_string())
    }

    // -- type references --

    pub fn ty(&mut self, name: &str) -> TypeRef {
        TypeRef {
            span: self.span(),
            kind: TypeRefKind::Named(name.to_string()),
        }
    }

    pub fn ty_list(&mut self, elem: TypeRef) -> TypeRef {
        TypeRef {
            span: self.span(),
            kind: TypeRefKind::List(Box::new(elem)),
        }
    }

    pub fn ty_map(&mut self, key: TypeRef, value: TypeRef) -> TypeRef {
        TypeRef {
            span: self.span(),
            kind: TypeRefKind::Map(Box::new(key), Box::new(value)),
        }
    }

    pub fn ty_result(&mut self, ok: TypeRef, err: TypeRef) -> TypeRef {
        TypeRef {
            span: self.span(),
            kind: TypeRefKind::Result(Box::new(ok), Box::new(err)),
        }
    }

    // -- expressions --

    fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            id: self.fresh_id(),
            span: self.span(),
            kind,
        }
    }

    pub fn int(&mut self, n: i64) -> Expr {
        self.expr(ExprKind::IntLit(n))
    }

    pub fn float(&mut self, f: f64) -> Expr {
        self.expr(ExprKind::FloatLit(f))
    }

    pub fn boolean(&mut self, b: bool) -> Expr {
        self.expr(ExprKind::BoolLit(b))
    }

    pub fn text(&mut self, s: &str) -> Expr {
        self.expr(ExprKind::TextLit(s.to_string()))
    }

    pub fn name(&mut self, n: &str) -> Expr {
        let id = self.ident(n);
        self.expr(ExprKind::Name(id))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(&mut self, lhs: Expr, op: BinOp, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn call(&mut self, callee: &str, args: Vec<Expr>) -> Expr {
        let callee = self.ident(callee);
        self.expr(ExprKind::Call { callee, args })
    }

    pub fn record_lit(&mut self, name: &str, fields: Vec<(&str, Expr)>) -> Expr {
        let name = self.ident(name);
        let fields = fields
            .into_iter()
            .map(|(f, e)| (self.ident_keep_line(f), e))
            .collect();
        self.expr(ExprKind::RecordLit { name, fields })
    }

    pub fn field(&mut self, base: Expr, field: &str) -> Expr {
        let field = self.ident(field);
        self.expr(ExprKind::FieldAccess {
            base: Box::new(base),
            field,
        })
    }

    pub fn enum_ctor(&mut self, enum_name: &str, variant: &str, args: Vec<Expr>) -> Expr {
        let enum_name = self.ident(enum_name);
        let variant = self.ident(variant);
        self.expr(ExprKind::EnumCtor {
            enum_name,
            variant,
            args,
        })
    }

    fn ident_keep_line(&mut self, name: &str) -> Ident {
        Spanned::new(Span::point(self.next_line, 1), name.to_string())
    }

    // -- statements --

    pub fn declare(&mut self, name: &str, mutable: bool, ty: TypeRef, value: Expr) -> Stmt {
        Stmt::Declare(DeclareStmt {
            span: self.span(),
            name: self.ident_keep_line(name),
            mutable,
            ty,
            value,
        })
    }

    pub fn set(&mut self, target: &str, value: Expr) -> Stmt {
        Stmt::Set(SetStmt {
            span: self.span(),
            target: self.ident_keep_line(target),
            value,
        })
    }

    pub fn if_stmt(&mut self, cond: Expr, then_block: Block, else_block: Option<Block>) -> Stmt {
        Stmt::If(IfStmt {
            span: self.span(),
            cond,
            then_block,
            else_block,
        })
    }

    pub fn while_stmt(&mut self, cond: Expr, body: Block) -> Stmt {
        Stmt::While(WhileStmt {
            span: self.span(),
            cond,
            body,
        })
    }

    pub fn match_stmt(&mut self, scrutinee: Expr, arms: Vec<MatchArm>) -> Stmt {
        Stmt::Match(MatchStmt {
            span: self.span(),
            scrutinee,
            arms,
        })
    }

    pub fn arm(&mut self, pattern: Pattern, body: Block) -> MatchArm {
        MatchArm {
            span: pattern.span(),
            pattern,
            body,
        }
    }

    pub fn pat_variant(&mut self, name: &str, binders: Vec<&str>) -> Pattern {
        Pattern::Variant {
            span: self.span(),
            name: self.ident_keep_line(name),
            binders: binders
                .into_iter()
                .map(|b| self.ident_keep_line(b))
                .collect(),
        }
    }

    pub fn pat_success(&mut self, binder: Option<&str>) -> Pattern {
        Pattern::Success {
            span: self.span(),
            binder: binder.map(|b| self.ident_keep_line(b)),
        }
    }

    pub fn pat_failure(&mut self, binder: Option<&str>) -> Pattern {
        Pattern::Failure {
            span: self.span(),
            binder: binder.map(|b| self.ident_keep_line(b)),
        }
    }

    pub fn pat_catch_all(&mut self, binder: &str) -> Pattern {
        Pattern::CatchAll {
            span: self.span(),
            binder: self.ident_keep_line(binder),
        }
    }

    pub fn ret(&mut self, value: Expr) -> Stmt {
        Stmt::Return(ReturnStmt {
            span: self.span(),
            kind: ReturnKind::Plain,
            value: Some(value),
        })
    }

    pub fn ret_nothing(&mut self) -> Stmt {
        Stmt::Return(ReturnStmt {
            span: self.span(),
            kind: ReturnKind::Plain,
            value: None,
        })
    }

    pub fn ret_success(&mut self, value: Expr) -> Stmt {
        Stmt::Return(ReturnStmt {
            span: self.span(),
            kind: ReturnKind::Success,
            value: Some(value),
        })
    }

    pub fn ret_failure(&mut self, value: Expr) -> Stmt {
        Stmt::Return(ReturnStmt {
            span: self.span(),
            kind: ReturnKind::Failure,
            value: Some(value),
        })
    }

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        Stmt::Expr(expr)
    }

    pub fn block(&mut self, stmts: Vec<Stmt>) -> Block {
        Block {
            span: self.span(),
            stmts,
        }
    }

    // -- declarations --

    pub fn param(&mut self, name: &str, ty: TypeRef) -> Param {
        Param {
            span: self.span(),
            name: self.ident_keep_line(name),
            mutable: false,
            ty,
        }
    }

    pub fn function(&mut self, name: &str, params: Vec<Param>, ret: TypeRef, body: Block) -> Decl {
        Decl::Function(FunctionDecl {
            span: self.span(),
            name: self.ident_keep_line(name),
            params,
            ret,
            body,
        })
    }

    pub fn record(&mut self, name: &str, fields: Vec<(&str, TypeRef)>) -> Decl {
        Decl::Record(RecordDecl {
            span: self.span(),
            name: self.ident_keep_line(name),
            fields: fields
                .into_iter()
                .map(|(f, ty)| FieldDecl {
                    span: ty.span,
                    name: self.ident_keep_line(f),
                    ty,
                })
                .collect(),
        })
    }

    pub fn enum_decl(&mut self, name: &str, variants: Vec<(&str, Vec<TypeRef>)>) -> Decl {
        Decl::Enum(EnumDecl {
            span: self.span(),
            name: self.ident_keep_line(name),
            variants: variants
                .into_iter()
                .map(|(v, payload)| VariantDecl {
                    span: Span::point(self.next_line, 1),
                    name: self.ident_keep_line(v),
                    payload,
                })
                .collect(),
        })
    }

    pub fn program(&mut self, decls: Vec<Decl>) -> Program {
        Program { decls }
    }
}
