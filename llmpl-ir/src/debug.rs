#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use llmpl_ast::Span;
use serde::{Deserialize, Serialize};

use crate::ir::IrModule;

/// Stable per-node source-span map for one function, keyed the way a code
/// generator walks the artifact: block id, then instruction index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpans {
    pub span: Span,
    pub blocks: BTreeMap<u32, BlockSpans>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockSpans {
    pub span: Span,
    pub instrs: Vec<Span>,
}

/// Debug-info companion to a validated module. Backends emit line tables
/// from this instead of re-walking the IR, so both produce the same
/// source attribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpanIndex {
    pub functions: BTreeMap<String, FunctionSpans>,
}

impl SpanIndex {
    pub fn of(module: &IrModule) -> Self {
        let mut functions = BTreeMap::new();
        for f in &module.functions {
            let mut blocks = BTreeMap::new();
            for b in &f.blocks {
                blocks.insert(
                    b.id.0,
                    BlockSpans {
                        span: b.span,
                        instrs: b.instrs.iter().map(|i| i.span).collect(),
                    },
                );
            }
            functions.insert(
                f.name.clone(),
                FunctionSpans {
                    span: f.span,
                    blocks,
                },
            );
        }
        Self { functions }
    }

    pub fn instr_span(&self, function: &str, block: u32, instr: usize) -> Option<Span> {
        self.functions
            .get(function)?
            .blocks
            .get(&block)?
            .instrs
            .get(instr)
            .copied()
    }
}
