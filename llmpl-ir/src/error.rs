#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

use llmpl_ast::Span;

/// Failures originating in the IR layer. Both fail closed: a module that
/// trips either never reaches a code generator.
#[derive(Debug, Error, Diagnostic)]
pub enum IrError {
    #[error("IR integrity violation: {detail}")]
    #[diagnostic(code(llmpl::ir::integrity))]
    IntegrityViolation { detail: String, span: Option<Span> },

    #[error("IR deserialization failed: {detail}")]
    #[diagnostic(code(llmpl::ir::deserialize))]
    Deserialize { detail: String },
}

impl IrError {
    pub fn integrity(detail: impl Into<String>, span: Option<Span>) -> Self {
        IrError::IntegrityViolation {
            detail: detail.into(),
            span,
        }
    }

    /// Stable machine-readable code for structured diagnostic records.
    pub fn code_str(&self) -> &'static str {
        match self {
            IrError::IntegrityViolation { .. } => "SR15-IR-INTEGRITY",
            IrError::Deserialize { .. } => "SR16-IR-DESERIALIZE",
        }
    }
}
