#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ir::IrType;

/// Signature contract for one runtime-provided operation. The runtime owns
/// the body; the compiler only ever sees this shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntrinsicSig {
    pub params: Vec<IrType>,
    pub ret: IrType,
    /// Fallible intrinsics return a `Result` type and participate in the
    /// checker's Result-handling rules.
    pub may_fail: bool,
}

/// Read-only signature table threaded explicitly through checking, lowering
/// and validation — never ambient global state, so compilation units stay
/// independently testable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntrinsicTable {
    sigs: BTreeMap<String, IntrinsicSig>,
}

impl IntrinsicTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, params: Vec<IrType>, ret: IrType, may_fail: bool) {
        self.sigs.insert(
            name.to_string(),
            IntrinsicSig {
                params,
                ret,
                may_fail,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&IntrinsicSig> {
        self.sigs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IntrinsicSig)> {
        self.sigs.iter()
    }
}

/// The signatures the standard runtime exports: text, conversion and date
/// primitives. Every conversion between primitive types goes through one of
/// these — the type checker never converts implicitly.
pub fn runtime_intrinsics() -> IntrinsicTable {
    use IrType::*;

    let mut t = IntrinsicTable::empty();

    // text
    t.insert("concat", vec![Text, Text], Text, false);
    t.insert("length_of_text", vec![Text], Integer, false);
    t.insert("contains", vec![Text, Text], Boolean, false);
    t.insert("join", vec![List(Box::new(Text)), Text], Text, false);
    t.insert("split", vec![Text, Text], List(Box::new(Text)), false);

    // explicit conversions
    t.insert("integer_to_float", vec![Integer], Float, false);
    t.insert("float_to_integer", vec![Float], Integer, false);
    t.insert("integer_to_text", vec![Integer], Text, false);
    t.insert("float_to_text", vec![Float], Text, false);
    t.insert("boolean_to_text", vec![Boolean], Text, false);
    t.insert(
        "text_to_integer",
        vec![Text],
        Result {
            ok: Box::new(Integer),
            err: Box::new(Text),
        },
        true,
    );
    t.insert(
        "text_to_float",
        vec![Text],
        Result {
            ok: Box::new(Float),
            err: Box::new(Text),
        },
        true,
    );

    // dates
    t.insert("today", vec![], Date, false);
    t.insert("date_to_text", vec![Date], Text, false);
    t.insert("days_between", vec![Date, Date], Integer, false);
    t.insert(
        "parse_date",
        vec![Text],
        Result {
            ok: Box::new(Date),
            err: Box::new(Text),
        },
        true,
    );

    t
}
