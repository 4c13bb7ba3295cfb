#![forbid(unsafe_code)]

//! The per-unit pipeline: check, exhaustiveness, lower, validate. Passes
//! run strictly in that order and any accumulated error stops the unit
//! before the next pass; informational records ride along on success.

use llmpl_ast::{Program, Span};
use llmpl_ir::{serialize, IntrinsicTable, IrError, IrModule};

use crate::check::check_program;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::exhaustiveness::check_exhaustiveness;
use crate::lower::lower_program;

/// A unit that made it through every pass. The module has already been
/// validated; callers may serialize it as-is.
#[derive(Debug)]
pub struct CompiledUnit {
    pub module: IrModule,
    /// Non-error records (shadowing notices) produced along the way.
    pub notes: Vec<Diagnostic>,
}

/// Compile one unit end to end. `source_text` is hashed into the module
/// for build caching; the tree itself arrives pre-parsed.
pub fn compile_unit(
    source_text: &str,
    program: &Program,
    intrinsics: &IntrinsicTable,
) -> Result<CompiledUnit, Diagnostics> {
    let artifacts = check_program(program, intrinsics)?;
    let mut notes = artifacts.notes.clone();

    let match_diags = check_exhaustiveness(program, &artifacts);
    if match_diags.has_errors() {
        return Err(match_diags);
    }
    notes.extend(match_diags.into_records());

    let source_hash = serialize::source_hash(source_text);
    let module = lower_program(program, &artifacts, source_hash).map_err(into_diagnostics)?;

    llmpl_ir::validate(&module, intrinsics).map_err(into_diagnostics)?;

    Ok(CompiledUnit { module, notes })
}

fn into_diagnostics(err: IrError) -> Diagnostics {
    let span = match &err {
        IrError::IntegrityViolation { span, .. } => span.unwrap_or(Span::point(1, 1)),
        IrError::Deserialize { .. } => Span::point(1, 1),
    };
    let mut diags = Diagnostics::new();
    diags.push(Diagnostic::error(err.code_str(), err.to_string(), span));
    diags
}
