#![forbid(unsafe_code)]

//! AST → canonical IR. Lowering is purely structural: it runs only on
//! programs the checker and exhaustiveness pass accepted, and it never
//! invents semantics — evaluation order, dispatch order and field order are
//! all fixed here so the emitted module is identical across runs.

use std::collections::HashMap;

use llmpl_ast::{
    Block, Decl, Expr, ExprKind, FunctionDecl, MatchStmt, Pattern, Program, ReturnKind, Span,
    Stmt, TypeRef, TypeRefKind,
};
use llmpl_ir::{
    BlockId, Callee, DispatchArm, IdGen, InstrKind, IrBlock, IrError, IrField, IrFunction,
    IrInstr, IrModule, IrParam, IrType, IrTypeDecl, IrVariant, Terminator, ValueId,
    RESULT_ENUM,
};

use crate::check::CheckArtifacts;
use crate::types::Type;

/// Lower a fully-checked program. `source_hash` is the unit's source
/// digest, recorded in the module for build caching.
pub fn lower_program(
    program: &Program,
    artifacts: &CheckArtifacts,
    source_hash: String,
) -> Result<IrModule, IrError> {
    let mut module = IrModule::new(source_hash);

    // Type declarations first, in source order.
    for decl in &program.decls {
        match decl {
            Decl::Record(r) => module.types.push(IrTypeDecl::Record {
                name: r.name.node.clone(),
                span: r.span,
                fields: r
                    .fields
                    .iter()
                    .map(|f| IrField {
                        name: f.name.node.clone(),
                        ty: type_ref_to_ir(&f.ty),
                    })
                    .collect(),
            }),
            Decl::Enum(e) => module.types.push(IrTypeDecl::Enum {
                name: e.name.node.clone(),
                span: e.span,
                variants: e
                    .variants
                    .iter()
                    .map(|v| IrVariant {
                        name: v.name.node.clone(),
                        payload: v.payload.iter().map(type_ref_to_ir).collect(),
                    })
                    .collect(),
            }),
            Decl::Function(_) => {}
        }
    }

    for decl in &program.decls {
        if let Decl::Function(f) = decl {
            module.functions.push(Lowerer::new(artifacts).lower_function(f)?);
        }
    }

    Ok(module)
}

/// Checked type references map directly; no validation happens here.
fn type_ref_to_ir(tr: &TypeRef) -> IrType {
    match &tr.kind {
        TypeRefKind::Named(name) => match name.as_str() {
            "Integer" => IrType::Integer,
            "Float" => IrType::Float,
            "Boolean" => IrType::Boolean,
            "Text" => IrType::Text,
            "Date" => IrType::Date,
            "Nothing" => IrType::Unit,
            other => IrType::Named(other.to_string()),
        },
        TypeRefKind::List(elem) => IrType::List(Box::new(type_ref_to_ir(elem))),
        TypeRefKind::Map(k, v) => IrType::Map {
            key: Box::new(type_ref_to_ir(k)),
            value: Box::new(type_ref_to_ir(v)),
        },
        TypeRefKind::Result(ok, err) => IrType::Result {
            ok: Box::new(type_ref_to_ir(ok)),
            err: Box::new(type_ref_to_ir(err)),
        },
    }
}

/// An [`IrBlock`] under construction; the terminator lands last.
struct BlockBuilder {
    id: BlockId,
    span: Span,
    instrs: Vec<IrInstr>,
    term: Option<Terminator>,
}

struct Lowerer<'a> {
    artifacts: &'a CheckArtifacts,
    ids: IdGen,
    blocks: Vec<BlockBuilder>,
    current: usize,
    /// Lexical frames mapping source names to slot names; the innermost
    /// frame wins, mirroring the checker's scope rules.
    frames: Vec<HashMap<String, String>>,
    slot_seq: HashMap<String, u32>,
}

impl<'a> Lowerer<'a> {
    fn new(artifacts: &'a CheckArtifacts) -> Self {
        Self {
            artifacts,
            ids: IdGen::default(),
            blocks: Vec::new(),
            current: 0,
            frames: vec![HashMap::new()],
            slot_seq: HashMap::new(),
        }
    }

    fn lower_function(mut self, f: &FunctionDecl) -> Result<IrFunction, IrError> {
        let sig = self
            .artifacts
            .functions
            .get(&f.name.node)
            .ok_or_else(|| missing("function signature", &f.name.node, f.span))?
            .clone();

        let params: Vec<IrParam> = f
            .params
            .iter()
            .zip(sig.params.iter())
            .map(|(p, (name, ty))| IrParam {
                name: self.declare_slot(name),
                ty: ty.to_ir(),
                span: p.span,
                value: self.ids.fresh_value(),
            })
            .collect();

        let entry = self.start_block(f.body.span);
        self.lower_block(&f.body)?;

        Ok(IrFunction {
            name: f.name.node.clone(),
            span: f.span,
            params,
            ret: sig.ret.to_ir(),
            entry,
            blocks: self.finish(entry),
        })
    }

    /// Seal every builder. A builder left without a terminator is either a
    /// join block nothing jumps to (dropped) or the open end of a control
    /// path in a Nothing-returning function (sealed with a bare return).
    fn finish(self, entry: BlockId) -> Vec<IrBlock> {
        let mut referenced = vec![entry];
        for b in &self.blocks {
            match &b.term {
                Some(Terminator::Jump(to)) => referenced.push(*to),
                Some(Terminator::Branch { then_to, else_to, .. }) => {
                    referenced.push(*then_to);
                    referenced.push(*else_to);
                }
                Some(Terminator::MatchDispatch { arms, .. }) => {
                    referenced.extend(arms.iter().map(|a| a.to));
                }
                Some(Terminator::Return(_)) | None => {}
            }
        }

        self.blocks
            .into_iter()
            .filter(|b| b.term.is_some() || referenced.contains(&b.id))
            .map(|b| IrBlock {
                id: b.id,
                span: b.span,
                instrs: b.instrs,
                term: b.term.unwrap_or(Terminator::Return(None)),
            })
            .collect()
    }

    // -- block plumbing --

    fn start_block(&mut self, span: Span) -> BlockId {
        let id = self.ids.fresh_block();
        self.blocks.push(BlockBuilder {
            id,
            span,
            instrs: Vec::new(),
            term: None,
        });
        self.current = self.blocks.len() - 1;
        id
    }

    fn switch_to(&mut self, id: BlockId) {
        self.current = self
            .blocks
            .iter()
            .position(|b| b.id == id)
            .unwrap_or(self.current);
    }

    fn emit(&mut self, span: Span, kind: InstrKind) -> ValueId {
        let dest = self.ids.fresh_value();
        self.blocks[self.current].instrs.push(IrInstr {
            span,
            dest: Some(dest),
            kind,
        });
        dest
    }

    fn emit_void(&mut self, span: Span, kind: InstrKind) {
        self.blocks[self.current].instrs.push(IrInstr {
            span,
            dest: None,
            kind,
        });
    }

    /// First terminator wins; statements after a return lower into an
    /// already-sealed block and are dropped with it.
    fn terminate(&mut self, term: Terminator) {
        let builder = &mut self.blocks[self.current];
        if builder.term.is_none() {
            builder.term = Some(term);
        }
    }

    fn is_sealed(&self) -> bool {
        self.blocks[self.current].term.is_some()
    }

    // -- slots --

    /// Slot names are alpha-renamed: the first declaration of a name owns
    /// the bare name, each shadowing declaration after it gets a fresh
    /// `name.N` slot. Lexically distinct bindings never share storage.
    fn declare_slot(&mut self, name: &str) -> String {
        let seq = self.slot_seq.entry(name.to_string()).or_insert(0);
        let slot = if *seq == 0 {
            name.to_string()
        } else {
            format!("{name}.{seq}")
        };
        *seq += 1;
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), slot.clone());
        }
        slot
    }

    fn resolve_slot(&self, name: &str) -> String {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn ty_of(&self, expr: &Expr) -> Result<&Type, IrError> {
        self.artifacts
            .types
            .get(expr.id)
            .ok_or_else(|| missing("expression type", &format!("{:?}", expr.id), expr.span))
    }

    // -- statements --

    fn lower_block(&mut self, block: &Block) -> Result<(), IrError> {
        self.frames.push(HashMap::new());
        let result = self.lower_stmts(block);
        self.frames.pop();
        result
    }

    fn lower_stmts(&mut self, block: &Block) -> Result<(), IrError> {
        for stmt in &block.stmts {
            if self.is_sealed() {
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), IrError> {
        match stmt {
            Stmt::Declare(d) => {
                // The initializer lowers before the slot exists, so a
                // shadowing initializer still reads the outer binding.
                let value = self.lower_expr(&d.value)?;
                let name = self.declare_slot(&d.name.node);
                self.emit_void(d.span, InstrKind::BindLocal { name, value });
            }
            Stmt::Set(s) => {
                let value = self.lower_expr(&s.value)?;
                let name = self.resolve_slot(&s.target.node);
                self.emit_void(s.span, InstrKind::BindLocal { name, value });
            }
            Stmt::If(i) => {
                let cond = self.lower_expr(&i.cond)?;
                let then_to = self.start_block_detached(i.then_block.span);
                let else_to = i
                    .else_block
                    .as_ref()
                    .map(|b| self.start_block_detached(b.span));
                let join = self.start_block_detached(i.span);

                self.terminate(Terminator::Branch {
                    cond,
                    then_to,
                    else_to: else_to.unwrap_or(join),
                });

                self.switch_to(then_to);
                self.lower_block(&i.then_block)?;
                self.terminate(Terminator::Jump(join));

                if let (Some(else_to), Some(else_block)) = (else_to, &i.else_block) {
                    self.switch_to(else_to);
                    self.lower_block(else_block)?;
                    self.terminate(Terminator::Jump(join));
                }

                self.switch_to(join);
            }
            Stmt::While(w) => {
                let header = self.start_block_detached(w.cond.span);
                self.terminate(Terminator::Jump(header));

                self.switch_to(header);
                let cond = self.lower_expr(&w.cond)?;
                let body = self.start_block_detached(w.body.span);
                let exit = self.start_block_detached(w.span);
                self.terminate(Terminator::Branch {
                    cond,
                    then_to: body,
                    else_to: exit,
                });

                self.switch_to(body);
                self.lower_block(&w.body)?;
                self.terminate(Terminator::Jump(header));

                self.switch_to(exit);
            }
            Stmt::Match(m) => self.lower_match(m)?,
            Stmt::Return(r) => {
                let term = match r.kind {
                    ReturnKind::Plain => match &r.value {
                        Some(value) => Terminator::Return(Some(self.lower_expr(value)?)),
                        None => Terminator::Return(None),
                    },
                    ReturnKind::Success | ReturnKind::Failure => {
                        let value = r
                            .value
                            .as_ref()
                            .ok_or_else(|| missing("return value", "success/failure", r.span))?;
                        let value = self.lower_expr(value)?;
                        let wrapped = self.emit(
                            r.span,
                            InstrKind::MakeResult {
                                is_success: r.kind == ReturnKind::Success,
                                value,
                            },
                        );
                        Terminator::Return(Some(wrapped))
                    }
                };
                self.terminate(term);
            }
            Stmt::Expr(e) => {
                self.lower_expr(e)?;
            }
        }
        Ok(())
    }

    /// New builder without moving the cursor; control-flow lowering creates
    /// its target blocks before sealing the block it is in.
    fn start_block_detached(&mut self, span: Span) -> BlockId {
        let keep = self.current;
        let id = self.start_block(span);
        self.current = keep;
        id
    }

    /// Dispatch lowering. Arm order in the terminator is variant
    /// declaration order regardless of source arm order; a catch-all arm's
    /// block is the target of every variant no explicit arm covers.
    fn lower_match(&mut self, m: &MatchStmt) -> Result<(), IrError> {
        let discr = self.lower_expr(&m.scrutinee)?;
        let scrut_ty = self.ty_of(&m.scrutinee)?.clone();

        let (enum_name, variant_count) = match &scrut_ty {
            Type::Named(name) => {
                let decl = self
                    .artifacts
                    .enums
                    .get(name)
                    .ok_or_else(|| missing("enum", name, m.span))?;
                (name.clone(), decl.variants.len())
            }
            Type::Result(..) => (RESULT_ENUM.to_string(), 2),
            other => {
                return Err(missing("sum-typed scrutinee", &other.display(), m.span));
            }
        };

        // Targets keyed by variant index; filled from explicit arms first,
        // remaining slots from the catch-all.
        let mut targets: Vec<Option<BlockId>> = vec![None; variant_count];
        let mut lowered_arms: Vec<(BlockId, &llmpl_ast::MatchArm, ArmBinding)> = Vec::new();

        for arm in &m.arms {
            let block = self.start_block_detached(arm.body.span);
            let binding = match &arm.pattern {
                Pattern::Variant { name, binders, .. } => {
                    let (index, _) = self
                        .artifacts
                        .enum_variant(&enum_name, &name.node)
                        .ok_or_else(|| missing("variant", &name.node, arm.span))?;
                    if targets[index as usize].is_none() {
                        targets[index as usize] = Some(block);
                    }
                    ArmBinding::Payload(binders.clone())
                }
                Pattern::Success { binder, .. } => {
                    if targets[0].is_none() {
                        targets[0] = Some(block);
                    }
                    ArmBinding::Payload(binder.iter().cloned().collect())
                }
                Pattern::Failure { binder, .. } => {
                    if targets[1].is_none() {
                        targets[1] = Some(block);
                    }
                    ArmBinding::Payload(binder.iter().cloned().collect())
                }
                Pattern::CatchAll { binder, .. } => {
                    for slot in targets.iter_mut().filter(|s| s.is_none()) {
                        *slot = Some(block);
                    }
                    ArmBinding::Whole(binder.clone())
                }
            };
            lowered_arms.push((block, arm, binding));
        }

        let join = self.start_block_detached(m.span);

        let mut arms = Vec::with_capacity(variant_count);
        for (index, target) in targets.iter().enumerate() {
            let to = target.ok_or_else(|| {
                missing("dispatch target for variant index", &index.to_string(), m.span)
            })?;
            arms.push(DispatchArm {
                variant_index: index as u32,
                to,
            });
        }
        self.terminate(Terminator::MatchDispatch {
            discr,
            enum_name,
            arms,
        });

        for (block, arm, binding) in lowered_arms {
            self.switch_to(block);
            self.frames.push(HashMap::new());
            match binding {
                ArmBinding::Payload(binders) => {
                    for (i, binder) in binders.iter().enumerate() {
                        let payload = self.emit(
                            binder.span,
                            InstrKind::GetVariantPayload {
                                base: discr,
                                index: i as u32,
                            },
                        );
                        let name = self.declare_slot(&binder.node);
                        self.emit_void(
                            binder.span,
                            InstrKind::BindLocal { name, value: payload },
                        );
                    }
                }
                ArmBinding::Whole(binder) => {
                    let name = self.declare_slot(&binder.node);
                    self.emit_void(
                        binder.span,
                        InstrKind::BindLocal { name, value: discr },
                    );
                }
            }
            self.lower_block(&arm.body)?;
            self.terminate(Terminator::Jump(join));
            self.frames.pop();
        }

        self.switch_to(join);
        Ok(())
    }

    // -- expressions --

    fn lower_expr(&mut self, expr: &Expr) -> Result<ValueId, IrError> {
        let value = match &expr.kind {
            ExprKind::IntLit(n) => self.emit(expr.span, InstrKind::ConstInt(*n)),
            ExprKind::FloatLit(f) => self.emit(expr.span, InstrKind::ConstFloat(*f)),
            ExprKind::BoolLit(b) => self.emit(expr.span, InstrKind::ConstBool(*b)),
            ExprKind::TextLit(s) => self.emit(expr.span, InstrKind::ConstText(s.clone())),

            ExprKind::Name(id) => {
                let name = self.resolve_slot(&id.node);
                self.emit(expr.span, InstrKind::LoadLocal { name })
            }

            ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand)?;
                self.emit(
                    expr.span,
                    InstrKind::Unary {
                        op: lower_unary_op(*op),
                        operand,
                    },
                )
            }

            ExprKind::Binary { op, lhs, rhs } => {
                // Operands evaluate left to right, unconditionally; `and`
                // and `or` are strict, not short-circuiting.
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;
                self.emit(
                    expr.span,
                    InstrKind::Binary {
                        op: lower_bin_op(*op),
                        lhs,
                        rhs,
                    },
                )
            }

            ExprKind::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|a| self.lower_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let callee = if self.artifacts.functions.contains_key(&callee.node) {
                    Callee::Function(callee.node.clone())
                } else {
                    Callee::Intrinsic(callee.node.clone())
                };
                self.emit(expr.span, InstrKind::Call { callee, args })
            }

            ExprKind::RecordLit { name, fields } => {
                let decl = self
                    .artifacts
                    .records
                    .get(&name.node)
                    .ok_or_else(|| missing("record", &name.node, expr.span))?
                    .clone();

                // Field expressions evaluate in declaration order, which is
                // also the order MakeRecord stores them in.
                let mut values = Vec::with_capacity(decl.fields.len());
                for field_decl in &decl.fields {
                    let (_, value_expr) = fields
                        .iter()
                        .find(|(f, _)| f.node == field_decl.name.node)
                        .ok_or_else(|| missing("field", &field_decl.name.node, expr.span))?;
                    values.push(self.lower_expr(value_expr)?);
                }
                self.emit(
                    expr.span,
                    InstrKind::MakeRecord {
                        name: name.node.clone(),
                        fields: values,
                    },
                )
            }

            ExprKind::FieldAccess { base, field } => {
                let base_ty = self.ty_of(base)?.clone();
                let Type::Named(record_name) = &base_ty else {
                    return Err(missing("record-typed base", &base_ty.display(), expr.span));
                };
                let decl = self
                    .artifacts
                    .records
                    .get(record_name)
                    .ok_or_else(|| missing("record", record_name, expr.span))?;
                let field_index = decl
                    .fields
                    .iter()
                    .position(|f| f.name.node == field.node)
                    .ok_or_else(|| missing("field", &field.node, field.span))?;

                let base = self.lower_expr(base)?;
                self.emit(
                    expr.span,
                    InstrKind::GetField {
                        base,
                        field_index: field_index as u32,
                    },
                )
            }

            ExprKind::EnumCtor {
                enum_name,
                variant,
                args,
            } => {
                let (variant_index, _) = self
                    .artifacts
                    .enum_variant(&enum_name.node, &variant.node)
                    .ok_or_else(|| missing("variant", &variant.node, expr.span))?;
                let args = args
                    .iter()
                    .map(|a| self.lower_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.emit(
                    expr.span,
                    InstrKind::MakeEnum {
                        enum_name: enum_name.node.clone(),
                        variant_index,
                        args,
                    },
                )
            }
        };
        Ok(value)
    }
}

enum ArmBinding {
    Payload(Vec<llmpl_ast::Ident>),
    Whole(llmpl_ast::Ident),
}

fn lower_bin_op(op: llmpl_ast::BinOp) -> llmpl_ir::BinOp {
    use llmpl_ast::BinOp as A;
    use llmpl_ir::BinOp as I;
    match op {
        A::Plus => I::Add,
        A::Minus => I::Sub,
        A::Times => I::Mul,
        A::DividedBy => I::Div,
        A::Equals => I::Eq,
        A::NotEquals => I::Ne,
        A::LessThan => I::Lt,
        A::GreaterThan => I::Gt,
        A::AtMost => I::Le,
        A::AtLeast => I::Ge,
        A::And => I::And,
        A::Or => I::Or,
    }
}

fn lower_unary_op(op: llmpl_ast::UnaryOp) -> llmpl_ir::UnaryOp {
    match op {
        llmpl_ast::UnaryOp::Negate => llmpl_ir::UnaryOp::Neg,
        llmpl_ast::UnaryOp::Not => llmpl_ir::UnaryOp::Not,
    }
}

/// Lowering runs on checked programs only; a failed lookup here is an
/// internal invariant break, surfaced as an integrity violation rather
/// than a panic.
fn missing(what: &str, which: &str, span: Span) -> IrError {
    IrError::integrity(format!("lowering could not resolve {what} '{which}'"), Some(span))
}
