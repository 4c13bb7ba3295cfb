#![forbid(unsafe_code)]

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use llmpl_ast::Span;

use crate::diagnostics::{codes, Diagnostic};

#[derive(Debug, Error, MietteDiagnostic)]
pub enum NameResolutionError {
    #[error("duplicate binding '{name}' in the same scope")]
    #[diagnostic(code(llmpl::name::duplicate_binding))]
    DuplicateBinding {
        name: String,
        span: Span,
        previous: Span,
    },

    #[error("'{name}' is a built-in type name and cannot be redeclared")]
    #[diagnostic(code(llmpl::name::reserved))]
    ReservedTypeName { name: String, span: Span },

    #[error("unbound name '{name}'")]
    #[diagnostic(code(llmpl::name::unbound))]
    UnboundName { name: String, span: Span },
}

#[derive(Debug, Error, MietteDiagnostic)]
pub enum TypeError {
    #[error("type mismatch: expected {expected}, got {found}")]
    #[diagnostic(code(llmpl::ty::mismatch))]
    TypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("'{callee}' expects {expected} argument(s), got {found}")]
    #[diagnostic(code(llmpl::ty::arity))]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("cannot set immutable variable '{name}'")]
    #[diagnostic(code(llmpl::ty::immutable_assignment))]
    ImmutableAssignment {
        name: String,
        span: Span,
        declared: Span,
    },

    #[error("record '{record}' has no field '{field}'")]
    #[diagnostic(code(llmpl::ty::unknown_field))]
    UnknownField {
        record: String,
        field: String,
        span: Span,
    },
}

#[derive(Debug, Error, MietteDiagnostic)]
pub enum ControlFlowError {
    #[error("function '{function}' returns {ret} but a control path ends without an explicit success/failure return")]
    #[diagnostic(code(llmpl::flow::nonexhaustive_return))]
    NonExhaustiveReturn {
        function: String,
        ret: String,
        span: Span,
    },
}

#[derive(Debug, Error, MietteDiagnostic)]
pub enum MatchError {
    #[error("non-exhaustive match: uncovered variant(s) {}", missing.join(", "))]
    #[diagnostic(code(llmpl::match_::nonexhaustive))]
    NonExhaustiveMatch { missing: Vec<String>, span: Span },

    #[error("unreachable match arm: {reason}")]
    #[diagnostic(code(llmpl::match_::unreachable_arm))]
    UnreachableArm {
        reason: String,
        span: Span,
        covered_at: Option<Span>,
    },
}

#[derive(Debug, Error, MietteDiagnostic)]
pub enum IntrinsicError {
    #[error("intrinsic '{name}' is not declared in the runtime signature table")]
    #[diagnostic(code(llmpl::intrinsic::undeclared))]
    Undeclared { name: String, span: Span },

    #[error("call to intrinsic '{name}' does not match its declared signature: {detail}")]
    #[diagnostic(code(llmpl::intrinsic::signature))]
    SignatureMismatch {
        name: String,
        detail: String,
        span: Span,
    },
}

/// Umbrella over the checking-side taxonomy. Every variant converts to one
/// structured [`Diagnostic`] record with its stable code.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum SemaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Name(#[from] NameResolutionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ControlFlow(#[from] ControlFlowError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Intrinsic(#[from] IntrinsicError),
}

impl SemaError {
    pub fn code_str(&self) -> &'static str {
        match self {
            SemaError::Name(NameResolutionError::DuplicateBinding { .. }) => {
                codes::DUPLICATE_BINDING
            }
            SemaError::Name(NameResolutionError::ReservedTypeName { .. }) => {
                codes::DUPLICATE_BINDING
            }
            SemaError::Name(NameResolutionError::UnboundName { .. }) => codes::UNBOUND_NAME,
            SemaError::Type(TypeError::TypeMismatch { .. }) => codes::TYPE_MISMATCH,
            SemaError::Type(TypeError::ArityMismatch { .. }) => codes::ARITY_MISMATCH,
            SemaError::Type(TypeError::ImmutableAssignment { .. }) => codes::IMMUTABLE_ASSIGNMENT,
            SemaError::Type(TypeError::UnknownField { .. }) => codes::UNKNOWN_FIELD,
            SemaError::ControlFlow(ControlFlowError::NonExhaustiveReturn { .. }) => {
                codes::NONEXHAUSTIVE_RETURN
            }
            SemaError::Match(MatchError::NonExhaustiveMatch { .. }) => codes::NONEXHAUSTIVE_MATCH,
            SemaError::Match(MatchError::UnreachableArm { .. }) => codes::UNREACHABLE_ARM,
            SemaError::Intrinsic(IntrinsicError::Undeclared { .. }) => codes::UNDECLARED_INTRINSIC,
            SemaError::Intrinsic(IntrinsicError::SignatureMismatch { .. }) => {
                codes::INTRINSIC_SIGNATURE
            }
        }
    }

    pub fn primary_span(&self) -> Span {
        match self {
            SemaError::Name(NameResolutionError::DuplicateBinding { span, .. })
            | SemaError::Name(NameResolutionError::ReservedTypeName { span, .. })
            | SemaError::Name(NameResolutionError::UnboundName { span, .. })
            | SemaError::Type(TypeError::TypeMismatch { span, .. })
            | SemaError::Type(TypeError::ArityMismatch { span, .. })
            | SemaError::Type(TypeError::ImmutableAssignment { span, .. })
            | SemaError::Type(TypeError::UnknownField { span, .. })
            | SemaError::ControlFlow(ControlFlowError::NonExhaustiveReturn { span, .. })
            | SemaError::Match(MatchError::NonExhaustiveMatch { span, .. })
            | SemaError::Match(MatchError::UnreachableArm { span, .. })
            | SemaError::Intrinsic(IntrinsicError::Undeclared { span, .. })
            | SemaError::Intrinsic(IntrinsicError::SignatureMismatch { span, .. }) => *span,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let code = self.code_str();
        let primary = self.primary_span();
        let message = self.to_string();
        let record = Diagnostic::error(code, message, primary);

        match self {
            SemaError::Name(NameResolutionError::DuplicateBinding { name, previous, .. }) => {
                record.with_related(previous, format!("'{name}' first bound here"))
            }
            SemaError::Type(TypeError::ImmutableAssignment { name, declared, .. }) => {
                record.with_related(declared, format!("'{name}' declared immutable here"))
            }
            SemaError::Match(MatchError::UnreachableArm {
                covered_at: Some(at),
                ..
            }) => record.with_related(at, "variant already covered by this arm"),
            _ => record,
        }
    }
}
