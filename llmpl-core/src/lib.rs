#![forbid(unsafe_code)]

mod check;
mod diagnostics;
mod error;
mod exhaustiveness;
mod lower;
mod scope;
mod types;
mod unit;

pub use check::{check_program, CheckArtifacts, FnSig, TypeTable};
pub use diagnostics::{codes, Diagnostic, Diagnostics, RelatedSpan, Severity};
pub use error::{
    ControlFlowError, IntrinsicError, MatchError, NameResolutionError, SemaError, TypeError,
};
pub use exhaustiveness::check_exhaustiveness;
pub use lower::lower_program;
pub use scope::{Frame, ScopeArena, ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind};
pub use types::{Prim, Type};
pub use unit::{compile_unit, CompiledUnit};
