#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use llmpl_ast::Span;

use crate::error::IrError;
use crate::intrinsics::IntrinsicTable;
use crate::ir::{
    Callee, DispatchArm, InstrKind, IrFunction, IrModule, IrType, IrTypeDecl, Terminator,
    BlockId, ValueId, RESULT_ENUM, SCHEMA_VERSION,
};

/// Re-derives every structural and type invariant directly from the IR,
/// trusting nothing from the lowering step. This is the single gate in
/// front of code generation: both backends consume the same validated
/// artifact, so any IR this accepts must be sound.
///
/// Fails closed on the first anomaly with `IrIntegrityViolation`.
pub fn validate(module: &IrModule, intrinsics: &IntrinsicTable) -> Result<(), IrError> {
    if module.schema_version != SCHEMA_VERSION {
        return Err(IrError::integrity(
            format!(
                "module schema v{} does not match compiler schema v{}",
                module.schema_version, SCHEMA_VERSION
            ),
            None,
        ));
    }

    let ctx = ModuleContext::build(module)?;

    for function in &module.functions {
        validate_function(function, &ctx, intrinsics)?;
    }

    Ok(())
}

/// Declaration-level facts the per-function checks consult.
struct ModuleContext {
    record_field_counts: BTreeMap<String, usize>,
    enum_variants: BTreeMap<String, Vec<usize>>,
    function_arities: BTreeMap<String, usize>,
}

impl ModuleContext {
    fn build(module: &IrModule) -> Result<Self, IrError> {
        let mut record_field_counts = BTreeMap::new();
        let mut enum_variants: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for decl in &module.types {
            let name = decl.name();
            if record_field_counts.contains_key(name) || enum_variants.contains_key(name) {
                return Err(IrError::integrity(
                    format!("duplicate type declaration '{name}'"),
                    None,
                ));
            }
            match decl {
                IrTypeDecl::Record { fields, .. } => {
                    record_field_counts.insert(name.to_string(), fields.len());
                }
                IrTypeDecl::Enum { variants, .. } => {
                    enum_variants.insert(
                        name.to_string(),
                        variants.iter().map(|v| v.payload.len()).collect(),
                    );
                }
            }
        }

        let mut function_arities = BTreeMap::new();
        for f in &module.functions {
            if function_arities
                .insert(f.name.clone(), f.params.len())
                .is_some()
            {
                return Err(IrError::integrity(
                    format!("duplicate function '{}'", f.name),
                    Some(f.span),
                ));
            }
        }

        Ok(Self {
            record_field_counts,
            enum_variants,
            function_arities,
        })
    }

    /// Variant payload arities for a dispatchable type. A declared enum
    /// wins over the built-in two-variant `Result` sum, matching the
    /// `MakeEnum` check, which always consults the declaration.
    fn variants_of(&self, enum_name: &str) -> Option<Vec<usize>> {
        if let Some(variants) = self.enum_variants.get(enum_name) {
            return Some(variants.clone());
        }
        (enum_name == RESULT_ENUM).then(|| vec![1, 1])
    }
}

fn validate_function(
    function: &IrFunction,
    ctx: &ModuleContext,
    intrinsics: &IntrinsicTable,
) -> Result<(), IrError> {
    let fname = &function.name;

    let mut block_ids: BTreeSet<BlockId> = BTreeSet::new();
    for block in &function.blocks {
        if !block_ids.insert(block.id) {
            return Err(IrError::integrity(
                format!("function '{fname}': duplicate block id {:?}", block.id),
                Some(block.span),
            ));
        }
    }
    if !block_ids.contains(&function.entry) {
        return Err(IrError::integrity(
            format!("function '{fname}': entry block {:?} does not exist", function.entry),
            Some(function.span),
        ));
    }

    // Every name read by LoadLocal must be a slot some param or BindLocal
    // introduces; flow-sensitive initialization is the front-end's job.
    let mut slots: BTreeSet<&str> = function.params.iter().map(|p| p.name.as_str()).collect();
    for block in &function.blocks {
        for instr in &block.instrs {
            if let InstrKind::BindLocal { name, .. } = &instr.kind {
                slots.insert(name.as_str());
            }
        }
    }

    let mut defined: BTreeSet<ValueId> = BTreeSet::new();
    for p in &function.params {
        if !defined.insert(p.value) {
            return Err(IrError::integrity(
                format!("function '{fname}': duplicate param value {:?}", p.value),
                Some(p.span),
            ));
        }
    }

    // Blocks are emitted in control-flow order, so a use is legal when its
    // definition appears earlier in block order (or earlier in the same
    // block).
    for block in &function.blocks {
        for instr in &block.instrs {
            for used in instr_uses(&instr.kind) {
                require_defined(fname, &defined, used, instr.span)?;
            }

            match &instr.kind {
                InstrKind::LoadLocal { name } => {
                    if !slots.contains(name.as_str()) {
                        return Err(IrError::integrity(
                            format!("function '{fname}': load of unbound local '{name}'"),
                            Some(instr.span),
                        ));
                    }
                }
                InstrKind::Call { callee, args } => {
                    let expected = match callee {
                        Callee::Function(name) => {
                            ctx.function_arities.get(name).copied().ok_or_else(|| {
                                IrError::integrity(
                                    format!("function '{fname}': call to unknown function '{name}'"),
                                    Some(instr.span),
                                )
                            })?
                        }
                        Callee::Intrinsic(name) => {
                            let sig = intrinsics.get(name).ok_or_else(|| {
                                IrError::integrity(
                                    format!(
                                        "function '{fname}': call to undeclared intrinsic '{name}'"
                                    ),
                                    Some(instr.span),
                                )
                            })?;
                            sig.params.len()
                        }
                    };
                    if args.len() != expected {
                        return Err(IrError::integrity(
                            format!(
                                "function '{fname}': call arity {} does not match signature arity {expected}",
                                args.len()
                            ),
                            Some(instr.span),
                        ));
                    }
                }
                InstrKind::MakeRecord { name, fields } => {
                    let expected =
                        ctx.record_field_counts.get(name).copied().ok_or_else(|| {
                            IrError::integrity(
                                format!("function '{fname}': literal of unknown record '{name}'"),
                                Some(instr.span),
                            )
                        })?;
                    if fields.len() != expected {
                        return Err(IrError::integrity(
                            format!(
                                "function '{fname}': record '{name}' literal has {} fields, declaration has {expected}",
                                fields.len()
                            ),
                            Some(instr.span),
                        ));
                    }
                }
                InstrKind::MakeEnum {
                    enum_name,
                    variant_index,
                    args,
                } => {
                    let variants = ctx.enum_variants.get(enum_name).ok_or_else(|| {
                        IrError::integrity(
                            format!("function '{fname}': constructor of unknown enum '{enum_name}'"),
                            Some(instr.span),
                        )
                    })?;
                    let arity = variants.get(*variant_index as usize).copied().ok_or_else(|| {
                        IrError::integrity(
                            format!(
                                "function '{fname}': enum '{enum_name}' has no variant index {variant_index}"
                            ),
                            Some(instr.span),
                        )
                    })?;
                    if args.len() != arity {
                        return Err(IrError::integrity(
                            format!(
                                "function '{fname}': variant payload arity {} does not match declaration arity {arity}",
                                args.len()
                            ),
                            Some(instr.span),
                        ));
                    }
                }
                _ => {}
            }

            if let Some(dest) = instr.dest {
                if !defined.insert(dest) {
                    return Err(IrError::integrity(
                        format!("function '{fname}': value {dest:?} defined twice"),
                        Some(instr.span),
                    ));
                }
            }
        }

        validate_terminator(function, block.span, &block.term, &block_ids, &defined, ctx)?;
    }

    Ok(())
}

fn validate_terminator(
    function: &IrFunction,
    span: Span,
    term: &Terminator,
    block_ids: &BTreeSet<BlockId>,
    defined: &BTreeSet<ValueId>,
    ctx: &ModuleContext,
) -> Result<(), IrError> {
    let fname = &function.name;

    let require_target = |target: BlockId| -> Result<(), IrError> {
        if block_ids.contains(&target) {
            Ok(())
        } else {
            Err(IrError::integrity(
                format!("function '{fname}': dangling block reference {target:?}"),
                Some(span),
            ))
        }
    };

    match term {
        Terminator::Return(value) => {
            match value {
                Some(v) => {
                    require_defined(fname, defined, *v, span)?;
                    if function.ret == IrType::Unit {
                        return Err(IrError::integrity(
                            format!("function '{fname}' returns a value but is declared Nothing"),
                            Some(span),
                        ));
                    }
                }
                None => {
                    if function.ret != IrType::Unit {
                        return Err(IrError::integrity(
                            format!(
                                "function '{fname}' returns no value but is declared {}",
                                function.ret.display()
                            ),
                            Some(span),
                        ));
                    }
                }
            }
            Ok(())
        }
        Terminator::Jump(target) => require_target(*target),
        Terminator::Branch {
            cond,
            then_to,
            else_to,
        } => {
            require_defined(fname, defined, *cond, span)?;
            require_target(*then_to)?;
            require_target(*else_to)
        }
        Terminator::MatchDispatch {
            discr,
            enum_name,
            arms,
        } => {
            require_defined(fname, defined, *discr, span)?;
            let variants = ctx.variants_of(enum_name).ok_or_else(|| {
                IrError::integrity(
                    format!("function '{fname}': dispatch over unknown enum '{enum_name}'"),
                    Some(span),
                )
            })?;
            validate_dispatch_arms(fname, enum_name, arms, variants.len(), span)?;
            for arm in arms {
                require_target(arm.to)?;
            }
            Ok(())
        }
    }
}

/// Arm tables must cover variant indices `0..n` exactly once each, in
/// ascending order — the canonicalized layout both backends rely on.
fn validate_dispatch_arms(
    fname: &str,
    enum_name: &str,
    arms: &[DispatchArm],
    variant_count: usize,
    span: Span,
) -> Result<(), IrError> {
    if arms.len() != variant_count {
        return Err(IrError::integrity(
            format!(
                "function '{fname}': dispatch over '{enum_name}' has {} arms, enum has {variant_count} variants",
                arms.len()
            ),
            Some(span),
        ));
    }
    for (i, arm) in arms.iter().enumerate() {
        if arm.variant_index as usize != i {
            return Err(IrError::integrity(
                format!(
                    "function '{fname}': dispatch over '{enum_name}' arm {i} targets variant {}; arm table must be in declaration order",
                    arm.variant_index
                ),
                Some(span),
            ));
        }
    }
    Ok(())
}

fn require_defined(
    fname: &str,
    defined: &BTreeSet<ValueId>,
    value: ValueId,
    span: Span,
) -> Result<(), IrError> {
    if defined.contains(&value) {
        Ok(())
    } else {
        Err(IrError::integrity(
            format!("function '{fname}': use of undefined value {value:?}"),
            Some(span),
        ))
    }
}

fn instr_uses(kind: &InstrKind) -> Vec<ValueId> {
    match kind {
        InstrKind::ConstInt(_)
        | InstrKind::ConstFloat(_)
        | InstrKind::ConstBool(_)
        | InstrKind::ConstText(_)
        | InstrKind::LoadLocal { .. } => Vec::new(),
        InstrKind::BindLocal { value, .. } => vec![*value],
        InstrKind::Unary { operand, .. } => vec![*operand],
        InstrKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
        InstrKind::Call { args, .. } => args.clone(),
        InstrKind::MakeRecord { fields, .. } => fields.clone(),
        InstrKind::GetField { base, .. } => vec![*base],
        InstrKind::MakeEnum { args, .. } => args.clone(),
        InstrKind::MakeResult { value, .. } => vec![*value],
        InstrKind::GetVariantPayload { base, .. } => vec![*base],
    }
}
