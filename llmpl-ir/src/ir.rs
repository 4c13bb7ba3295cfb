#![forbid(unsafe_code)]

use llmpl_ast::Span;
use serde::{Deserialize, Serialize};

/// Bumped whenever the schema changes shape. Deserialization refuses any
/// other version rather than guessing.
pub const SCHEMA_VERSION: u32 = 1;

/// Dispatch tables over `Result` use this pseudo-enum name; variant 0 is
/// `success`, variant 1 is `failure`.
pub const RESULT_ENUM: &str = "Result";
pub const RESULT_SUCCESS: u32 = 0;
pub const RESULT_FAILURE: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Value-level types carried by IR signatures and type declarations.
/// Mirrors the checker's type language minus function types, which never
/// appear in value position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrType {
    Unit,
    Integer,
    Float,
    Boolean,
    Text,
    Date,
    Named(String),
    List(Box<IrType>),
    Map { key: Box<IrType>, value: Box<IrType> },
    Result { ok: Box<IrType>, err: Box<IrType> },
}

impl IrType {
    pub fn display(&self) -> String {
        match self {
            IrType::Unit => "Nothing".to_string(),
            IrType::Integer => "Integer".to_string(),
            IrType::Float => "Float".to_string(),
            IrType::Boolean => "Boolean".to_string(),
            IrType::Text => "Text".to_string(),
            IrType::Date => "Date".to_string(),
            IrType::Named(n) => n.clone(),
            IrType::List(elem) => format!("List of {}", elem.display()),
            IrType::Map { key, value } => {
                format!("Map from {} to {}", key.display(), value.display())
            }
            IrType::Result { ok, err } => {
                format!("Result of {} or {}", ok.display(), err.display())
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// The canonical, serializable compilation artifact. Emission order matches
/// source declaration order everywhere; nothing in here depends on map
/// iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrModule {
    pub schema_version: u32,
    /// sha-256 hex digest of the unit's source text; keys build caching.
    pub source_hash: String,
    pub types: Vec<IrTypeDecl>,
    pub functions: Vec<IrFunction>,
}

impl IrModule {
    pub fn new(source_hash: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            source_hash,
            types: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn type_decl(&self, name: &str) -> Option<&IrTypeDecl> {
        self.types.iter().find(|t| t.name() == name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IrTypeDecl {
    Record {
        name: String,
        span: Span,
        fields: Vec<IrField>,
    },
    Enum {
        name: String,
        span: Span,
        variants: Vec<IrVariant>,
    },
}

impl IrTypeDecl {
    pub fn name(&self) -> &str {
        match self {
            IrTypeDecl::Record { name, .. } | IrTypeDecl::Enum { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrField {
    pub name: String,
    pub ty: IrType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrVariant {
    pub name: String,
    pub payload: Vec<IrType>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrFunction {
    pub name: String,
    pub span: Span,
    pub params: Vec<IrParam>,
    pub ret: IrType,
    pub entry: BlockId,
    pub blocks: Vec<IrBlock>,
}

/// A parameter defines both an incoming `ValueId` and a named local slot
/// initialized from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrParam {
    pub name: String,
    pub ty: IrType,
    pub span: Span,
    pub value: ValueId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrBlock {
    pub id: BlockId,
    pub span: Span,
    pub instrs: Vec<IrInstr>,
    pub term: Terminator,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrInstr {
    pub span: Span,
    pub dest: Option<ValueId>,
    pub kind: InstrKind,
}

/// Who a call instruction targets. Intrinsic callees reference an external
/// symbol whose signature contract the runtime provides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Callee {
    Function(String),
    Intrinsic(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InstrKind {
    ConstInt(i64),
    ConstFloat(f64),
    ConstBool(bool),
    ConstText(String),

    /// Assign a named local slot. Slots are mutable; re-binding the same
    /// name models `set`.
    BindLocal { name: String, value: ValueId },

    /// Read the current value of a named local slot.
    LoadLocal { name: String },

    Unary { op: UnaryOp, operand: ValueId },

    Binary {
        op: BinOp,
        lhs: ValueId,
        rhs: ValueId,
    },

    Call { callee: Callee, args: Vec<ValueId> },

    /// Structured record literal; `fields` are in declaration order, never
    /// source order.
    MakeRecord { name: String, fields: Vec<ValueId> },

    /// Record field read by declaration index.
    GetField { base: ValueId, field_index: u32 },

    /// Enum construction with the variant's declaration index as tag.
    MakeEnum {
        enum_name: String,
        variant_index: u32,
        args: Vec<ValueId>,
    },

    /// `success(value)` / `failure(error)`.
    MakeResult { is_success: bool, value: ValueId },

    /// Payload field read of an enum variant or Result, valid only on the
    /// dispatch edge that proved the variant.
    GetVariantPayload { base: ValueId, index: u32 },
}

/// Closed set of block terminators. Every block ends in exactly one of
/// these; there is no fallthrough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Terminator {
    Return(Option<ValueId>),

    Jump(BlockId),

    Branch {
        cond: ValueId,
        then_to: BlockId,
        else_to: BlockId,
    },

    /// Variant dispatch. Arms are ordered by variant declaration index and
    /// cover every variant of `enum_name` (`Result` dispatches over
    /// `[success, failure]`).
    MatchDispatch {
        discr: ValueId,
        enum_name: String,
        arms: Vec<DispatchArm>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchArm {
    pub variant_index: u32,
    pub to: BlockId,
}

#[derive(Default, Debug)]
pub struct IdGen {
    next_block: u32,
    next_value: u32,
}

impl IdGen {
    pub fn fresh_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        id
    }

    pub fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }
}
