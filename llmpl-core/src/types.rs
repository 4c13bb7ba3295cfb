#![forbid(unsafe_code)]

use llmpl_ir::IrType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prim {
    Integer,
    Float,
    Boolean,
    Text,
    Date,
    /// The `Nothing` type of value-less functions and bare returns.
    Unit,
}

impl Prim {
    pub fn name(self) -> &'static str {
        match self {
            Prim::Integer => "Integer",
            Prim::Float => "Float",
            Prim::Boolean => "Boolean",
            Prim::Text => "Text",
            Prim::Date => "Date",
            Prim::Unit => "Nothing",
        }
    }
}

/// Resolved types. Derived equality gives the required semantics:
/// structural for compounds, nominal (by name) for declared records and
/// enums. Two types are either identical or need an explicit conversion
/// intrinsic — there is no widening, narrowing, or coercion anywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Primitive(Prim),
    /// A declared record or enum, by name.
    Named(String),
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Result(Box<Type>, Box<Type>),
    /// Function signatures in the symbol table; never a value type.
    Function(Vec<Type>, Box<Type>),
}

impl Type {
    pub const INTEGER: Type = Type::Primitive(Prim::Integer);
    pub const FLOAT: Type = Type::Primitive(Prim::Float);
    pub const BOOLEAN: Type = Type::Primitive(Prim::Boolean);
    pub const TEXT: Type = Type::Primitive(Prim::Text);
    pub const DATE: Type = Type::Primitive(Prim::Date);
    pub const UNIT: Type = Type::Primitive(Prim::Unit);

    pub fn display(&self) -> String {
        match self {
            Type::Primitive(p) => p.name().to_string(),
            Type::Named(n) => n.clone(),
            Type::List(elem) => format!("List of {}", elem.display()),
            Type::Map(k, v) => format!("Map from {} to {}", k.display(), v.display()),
            Type::Result(ok, err) => format!("Result of {} or {}", ok.display(), err.display()),
            Type::Function(params, ret) => {
                let ps = params
                    .iter()
                    .map(Type::display)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("function({ps}) returning {}", ret.display())
            }
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Type::Result(..))
    }

    /// IR projection of a value type. Function types never appear in value
    /// position (no first-class functions), so the arm is unreachable in
    /// checked programs and maps to Unit.
    pub fn to_ir(&self) -> IrType {
        match self {
            Type::Primitive(Prim::Integer) => IrType::Integer,
            Type::Primitive(Prim::Float) => IrType::Float,
            Type::Primitive(Prim::Boolean) => IrType::Boolean,
            Type::Primitive(Prim::Text) => IrType::Text,
            Type::Primitive(Prim::Date) => IrType::Date,
            Type::Primitive(Prim::Unit) => IrType::Unit,
            Type::Named(n) => IrType::Named(n.clone()),
            Type::List(elem) => IrType::List(Box::new(elem.to_ir())),
            Type::Map(k, v) => IrType::Map {
                key: Box::new(k.to_ir()),
                value: Box::new(v.to_ir()),
            },
            Type::Result(ok, err) => IrType::Result {
                ok: Box::new(ok.to_ir()),
                err: Box::new(err.to_ir()),
            },
            Type::Function(..) => IrType::Unit,
        }
    }

    pub fn from_ir(ty: &IrType) -> Type {
        match ty {
            IrType::Unit => Type::UNIT,
            IrType::Integer => Type::INTEGER,
            IrType::Float => Type::FLOAT,
            IrType::Boolean => Type::BOOLEAN,
            IrType::Text => Type::TEXT,
            IrType::Date => Type::DATE,
            IrType::Named(n) => Type::Named(n.clone()),
            IrType::List(elem) => Type::List(Box::new(Type::from_ir(elem))),
            IrType::Map { key, value } => Type::Map(
                Box::new(Type::from_ir(key)),
                Box::new(Type::from_ir(value)),
            ),
            IrType::Result { ok, err } => Type::Result(
                Box::new(Type::from_ir(ok)),
                Box::new(Type::from_ir(err)),
            ),
        }
    }
}
