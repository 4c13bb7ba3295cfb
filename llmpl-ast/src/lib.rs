#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod build;

/// Source span as delivered by the external parser. Lines and columns are
/// 1-based; the end position is inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Zero-width span at a single position.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub type Ident = Spanned<String>;

/// Identity of an expression node, assigned by the parser. The checker keys
/// its resolved-type table on these, so they must be unique per program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExprId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Function(FunctionDecl),
    Record(RecordDecl),
    Enum(EnumDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Param>,
    pub ret: TypeRef,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub span: Span,
    pub name: Ident,
    pub mutable: bool,
    pub ty: TypeRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordDecl {
    pub span: Span,
    pub name: Ident,
    /// Field order is significant: canonical IR emission lists fields in
    /// declaration order.
    pub fields: Vec<FieldDecl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub span: Span,
    pub name: Ident,
    pub ty: TypeRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDecl {
    pub span: Span,
    pub name: Ident,
    /// Variant order is significant for dispatch-table canonicalization.
    pub variants: Vec<VariantDecl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariantDecl {
    pub span: Span,
    pub name: Ident,
    pub payload: Vec<TypeRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub span: Span,
    pub kind: TypeRefKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeRefKind {
    /// `Integer`, `Float`, `Boolean`, `Text`, `Date`, `Nothing`, or a
    /// declared record/enum name.
    Named(String),
    /// `List of T`
    List(Box<TypeRef>),
    /// `Map from K to V`
    Map(Box<TypeRef>, Box<TypeRef>),
    /// `Result of A or B`
    Result(Box<TypeRef>, Box<TypeRef>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Declare(DeclareStmt),
    Set(SetStmt),
    If(IfStmt),
    While(WhileStmt),
    Match(MatchStmt),
    Return(ReturnStmt),
    Expr(Expr),
}

/// `declare variable x as Integer with value 5`
#[derive(Clone, Debug, PartialEq)]
pub struct DeclareStmt {
    pub span: Span,
    pub name: Ident,
    pub mutable: bool,
    pub ty: TypeRef,
    pub value: Expr,
}

/// `set x to <expr>`
#[derive(Clone, Debug, PartialEq)]
pub struct SetStmt {
    pub span: Span,
    pub target: Ident,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub span: Span,
    pub cond: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
}

/// `loop while <cond>` — the one loop construct.
#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub span: Span,
    pub cond: Expr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchStmt {
    pub span: Span,
    pub scrutinee: Expr,
    pub arms: Vec<MatchArm>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchArm {
    pub span: Span,
    pub pattern: Pattern,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    /// `when Ok` / `when Error holding reason`
    Variant {
        span: Span,
        name: Ident,
        binders: Vec<Ident>,
    },
    /// `when success holding value`
    Success { span: Span, binder: Option<Ident> },
    /// `when failure holding error`
    Failure { span: Span, binder: Option<Ident> },
    /// `otherwise as other` — the explicitly annotated catch-all arm.
    CatchAll { span: Span, binder: Ident },
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Variant { span, .. }
            | Pattern::Success { span, .. }
            | Pattern::Failure { span, .. }
            | Pattern::CatchAll { span, .. } => *span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnKind {
    /// `return <expr>` / bare `return`
    Plain,
    /// `return success <expr>`
    Success,
    /// `return failure <expr>`
    Failure,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub kind: ReturnKind,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    TextLit(String),
    Name(Ident),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `call join with parts, separator`
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    /// `new Point with x 1 and y 2` — fields in source order; lowering
    /// re-orders them into declaration order.
    RecordLit {
        name: Ident,
        fields: Vec<(Ident, Expr)>,
    },
    FieldAccess {
        base: Box<Expr>,
        field: Ident,
    },
    /// `Status Pending` / `Shape Circle holding radius`
    EnumCtor {
        enum_name: Ident,
        variant: Ident,
        args: Vec<Expr>,
    },
}

/// Keyword-spelled binary operators. Each resolves to exactly one operator
/// with an exact type signature; there is no overloading across types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    /// `plus`
    Plus,
    /// `minus`
    Minus,
    /// `times`
    Times,
    /// `divided by`
    DividedBy,
    /// `equals`
    Equals,
    /// `does not equal`
    NotEquals,
    /// `is less than`
    LessThan,
    /// `is greater than`
    GreaterThan,
    /// `is at most`
    AtMost,
    /// `is at least`
    AtLeast,
    /// `and`
    And,
    /// `or`
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `negative of`
    Negate,
    /// `not`
    Not,
}
