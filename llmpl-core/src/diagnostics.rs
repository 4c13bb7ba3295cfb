#![forbid(unsafe_code)]

use llmpl_ast::Span;
use serde::{Deserialize, Serialize};

/// Stable diagnostic codes, keyed to the requirement each enforces. These
/// are part of the machine-readable interface: compliance tooling matches
/// on them, so they never change once published.
pub mod codes {
    pub const DUPLICATE_BINDING: &str = "SR01-DUPLICATE-BINDING";
    pub const UNBOUND_NAME: &str = "SR02-UNBOUND-NAME";
    pub const SHADOWED_BINDING: &str = "SR03-SHADOWED-BINDING";
    pub const TYPE_MISMATCH: &str = "SR04-TYPE-MISMATCH";
    pub const ARITY_MISMATCH: &str = "SR05-ARITY-MISMATCH";
    pub const IMMUTABLE_ASSIGNMENT: &str = "SR06-IMMUTABLE-ASSIGNMENT";
    pub const UNKNOWN_FIELD: &str = "SR07-UNKNOWN-FIELD";
    pub const NONEXHAUSTIVE_RETURN: &str = "SR08-NONEXHAUSTIVE-RETURN";
    pub const NONEXHAUSTIVE_MATCH: &str = "SR11-NONEXHAUSTIVE";
    pub const UNREACHABLE_ARM: &str = "SR12-UNREACHABLE-ARM";
    pub const UNDECLARED_INTRINSIC: &str = "SR13-UNDECLARED-INTRINSIC";
    pub const INTRINSIC_SIGNATURE: &str = "SR14-INTRINSIC-SIGNATURE";
    pub const IR_INTEGRITY: &str = "SR15-IR-INTEGRITY";
    pub const IR_DESERIALIZE: &str = "SR16-IR-DESERIALIZE";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelatedSpan {
    pub span: Span,
    pub message: String,
}

/// One structured diagnostic record. Rendering for humans happens outside
/// the core; this is the full contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub primary: Span,
    pub related: Vec<RelatedSpan>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>, primary: Span) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            primary,
            related: Vec::new(),
            severity: Severity::Error,
        }
    }

    pub fn info(code: &str, message: impl Into<String>, primary: Span) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::error(code, message, primary)
        }
    }

    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(RelatedSpan {
            span,
            message: message.into(),
        });
        self
    }
}

/// Accumulator for one pass. Diagnostics pile up so a single run reports
/// every problem it can see, but an error still hard-stops the unit at the
/// end of the pass — later passes never run on an errored unit.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.records.extend(other.records);
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn into_records(self) -> Vec<Diagnostic> {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
