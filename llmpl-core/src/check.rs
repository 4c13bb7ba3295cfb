#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::collections::HashMap;

use llmpl_ast::{
    BinOp, Block, DeclareStmt, EnumDecl, Expr, ExprId, ExprKind, FunctionDecl, IfStmt, MatchStmt,
    Pattern, Program, RecordDecl, ReturnKind, ReturnStmt, SetStmt, Stmt, TypeRef, TypeRefKind,
    UnaryOp, WhileStmt,
};
use llmpl_ir::IntrinsicTable;

use crate::diagnostics::{codes, Diagnostic, Diagnostics};
use crate::error::{
    ControlFlowError, IntrinsicError, NameResolutionError, SemaError, TypeError,
};
use crate::scope::{ScopeArena, ScopeId, ScopeKind, Symbol, SymbolKind};
use crate::types::Type;

/// Resolved type of every checked expression, keyed by the parser-assigned
/// `ExprId`. This is the "typed AST": the tree itself stays untouched.
#[derive(Debug, Default)]
pub struct TypeTable {
    map: HashMap<ExprId, Type>,
}

impl TypeTable {
    pub fn get(&self, id: ExprId) -> Option<&Type> {
        self.map.get(&id)
    }

    fn insert(&mut self, id: ExprId, ty: Type) {
        self.map.insert(id, ty);
    }
}

#[derive(Clone, Debug)]
pub struct FnSig {
    pub params: Vec<(String, Type)>,
    pub ret: Type,
}

/// Everything later passes need from checking. Lives for one compilation
/// unit; nothing here is shared across units.
#[derive(Debug)]
pub struct CheckArtifacts {
    pub types: TypeTable,
    pub functions: BTreeMap<String, FnSig>,
    pub records: BTreeMap<String, RecordDecl>,
    pub enums: BTreeMap<String, EnumDecl>,
    /// Informational records (shadowing) that accompany a successful check.
    pub notes: Vec<Diagnostic>,
}

impl CheckArtifacts {
    /// Declaration index and payload arity of an enum variant.
    pub fn enum_variant(&self, enum_name: &str, variant: &str) -> Option<(u32, usize)> {
        let decl = self.enums.get(enum_name)?;
        decl.variants
            .iter()
            .position(|v| v.name.node == variant)
            .map(|i| (i as u32, decl.variants[i].payload.len()))
    }
}

/// Check one compilation unit. Diagnostics accumulate across the whole
/// pass so a single run reports everything; any error fails the unit at
/// pass end — lowering never sees an errored program.
pub fn check_program(
    program: &Program,
    intrinsics: &IntrinsicTable,
) -> Result<CheckArtifacts, Diagnostics> {
    let mut checker = Checker::new(intrinsics);

    // First pass: register every top-level header so functions may call
    // forward within the module.
    checker.register_headers(program);

    // Second pass: check bodies.
    if !checker.diags.has_errors() {
        for decl in &program.decls {
            if let llmpl_ast::Decl::Function(f) = decl {
                checker.check_function(f);
            }
        }
    }

    if checker.diags.has_errors() {
        return Err(checker.diags);
    }

    Ok(CheckArtifacts {
        types: checker.types,
        functions: checker.functions,
        records: checker.records,
        enums: checker.enums,
        notes: checker.diags.into_records(),
    })
}

/// Per-function context threaded through body checking.
struct FnCtx {
    name: String,
    ret: Type,
}

struct Checker<'a> {
    intrinsics: &'a IntrinsicTable,
    scopes: ScopeArena,
    module_scope: ScopeId,
    records: BTreeMap<String, RecordDecl>,
    enums: BTreeMap<String, EnumDecl>,
    functions: BTreeMap<String, FnSig>,
    types: TypeTable,
    diags: Diagnostics,
}

impl<'a> Checker<'a> {
    fn new(intrinsics: &'a IntrinsicTable) -> Self {
        let mut scopes = ScopeArena::new();
        let module_scope = scopes.push(ScopeKind::Module, None);
        Self {
            intrinsics,
            scopes,
            module_scope,
            records: BTreeMap::new(),
            enums: BTreeMap::new(),
            functions: BTreeMap::new(),
            types: TypeTable::default(),
            diags: Diagnostics::new(),
        }
    }

    fn report(&mut self, err: impl Into<SemaError>) {
        self.diags.push(err.into().into_diagnostic());
    }

    // -- pass 1: headers --

    fn register_headers(&mut self, program: &Program) {
        // Type names first, so signatures may reference any declared type
        // regardless of order.
        for decl in &program.decls {
            match decl {
                llmpl_ast::Decl::Record(r) => {
                    if self.reject_reserved_type_name(&r.name) {
                        continue;
                    }
                    self.declare_module_symbol(
                        &r.name.node,
                        Type::Named(r.name.node.clone()),
                        r.name.span,
                        SymbolKind::Type,
                    );
                    self.records.insert(r.name.node.clone(), r.clone());
                }
                llmpl_ast::Decl::Enum(e) => {
                    if self.reject_reserved_type_name(&e.name) {
                        continue;
                    }
                    self.declare_module_symbol(
                        &e.name.node,
                        Type::Named(e.name.node.clone()),
                        e.name.span,
                        SymbolKind::Type,
                    );
                    self.enums.insert(e.name.node.clone(), e.clone());
                }
                llmpl_ast::Decl::Function(_) => {}
            }
        }

        // Field and payload types must themselves resolve.
        for decl in &program.decls {
            match decl {
                llmpl_ast::Decl::Record(r) => {
                    for field in &r.fields {
                        if let Err(err) = self.resolve_type_ref(&field.ty) {
                            self.report(err);
                        }
                    }
                }
                llmpl_ast::Decl::Enum(e) => {
                    for variant in &e.variants {
                        for ty in &variant.payload {
                            if let Err(err) = self.resolve_type_ref(ty) {
                                self.report(err);
                            }
                        }
                    }
                }
                llmpl_ast::Decl::Function(_) => {}
            }
        }

        // Function signatures.
        for decl in &program.decls {
            if let llmpl_ast::Decl::Function(f) = decl {
                let sig = self.signature_of(f);
                self.declare_module_symbol(
                    &f.name.node,
                    Type::Function(
                        sig.params.iter().map(|(_, t)| t.clone()).collect(),
                        Box::new(sig.ret.clone()),
                    ),
                    f.name.span,
                    SymbolKind::Function,
                );
                self.functions.insert(f.name.node.clone(), sig);
            }
        }
    }

    /// Built-in type names, `Result` included, cannot be redeclared; a user
    /// enum named `Result` would collide with the built-in sum every match
    /// and `success`/`failure` return dispatches over.
    fn reject_reserved_type_name(&mut self, name: &llmpl_ast::Ident) -> bool {
        let reserved = matches!(
            name.node.as_str(),
            "Integer" | "Float" | "Boolean" | "Text" | "Date" | "Nothing" | "Result"
        );
        if reserved {
            self.report(NameResolutionError::ReservedTypeName {
                name: name.node.clone(),
                span: name.span,
            });
        }
        reserved
    }

    fn declare_module_symbol(&mut self, name: &str, ty: Type, span: llmpl_ast::Span, kind: SymbolKind) {
        let result = self.scopes.declare(
            self.module_scope,
            Symbol {
                name: name.to_string(),
                ty,
                mutable: false,
                span,
                kind,
            },
        );
        if let Err(err) = result {
            self.report(err);
        }
    }

    fn signature_of(&mut self, f: &FunctionDecl) -> FnSig {
        let mut params = Vec::new();
        for p in &f.params {
            let ty = match self.resolve_type_ref(&p.ty) {
                Ok(ty) => ty,
                Err(err) => {
                    self.report(err);
                    Type::UNIT
                }
            };
            params.push((p.name.node.clone(), ty));
        }
        let ret = match self.resolve_type_ref(&f.ret) {
            Ok(ty) => ty,
            Err(err) => {
                self.report(err);
                Type::UNIT
            }
        };
        FnSig { params, ret }
    }

    fn resolve_type_ref(&self, tr: &TypeRef) -> Result<Type, SemaError> {
        match &tr.kind {
            TypeRefKind::Named(name) => match name.as_str() {
                "Integer" => Ok(Type::INTEGER),
                "Float" => Ok(Type::FLOAT),
                "Boolean" => Ok(Type::BOOLEAN),
                "Text" => Ok(Type::TEXT),
                "Date" => Ok(Type::DATE),
                "Nothing" => Ok(Type::UNIT),
                other => {
                    if self.records.contains_key(other) || self.enums.contains_key(other) {
                        Ok(Type::Named(other.to_string()))
                    } else {
                        Err(NameResolutionError::UnboundName {
                            name: other.to_string(),
                            span: tr.span,
                        }
                        .into())
                    }
                }
            },
            TypeRefKind::List(elem) => Ok(Type::List(Box::new(self.resolve_type_ref(elem)?))),
            TypeRefKind::Map(k, v) => Ok(Type::Map(
                Box::new(self.resolve_type_ref(k)?),
                Box::new(self.resolve_type_ref(v)?),
            )),
            TypeRefKind::Result(ok, err) => Ok(Type::Result(
                Box::new(self.resolve_type_ref(ok)?),
                Box::new(self.resolve_type_ref(err)?),
            )),
        }
    }

    // -- pass 2: bodies --

    fn check_function(&mut self, f: &FunctionDecl) {
        let Some(sig) = self.functions.get(&f.name.node).cloned() else {
            return;
        };

        let fn_scope = self.scopes.push(ScopeKind::Function, Some(self.module_scope));
        for (p, (name, ty)) in f.params.iter().zip(sig.params.iter()) {
            let result = self.scopes.declare(
                fn_scope,
                Symbol {
                    name: name.clone(),
                    ty: ty.clone(),
                    mutable: p.mutable,
                    span: p.span,
                    kind: SymbolKind::Variable,
                },
            );
            match result {
                Ok(declared) => self.note_shadow(&p.name.node, p.span, declared.shadows),
                Err(err) => self.report(err),
            }
        }

        let ctx = FnCtx {
            name: f.name.node.clone(),
            ret: sig.ret.clone(),
        };
        self.check_block(&f.body, fn_scope, &ctx);

        // Every control path of a value-returning function must end in an
        // explicit return; for Result functions that explicit return is
        // `success`/`failure` (checked per return site above).
        if ctx.ret != Type::UNIT && !block_terminates(&f.body) {
            self.report(ControlFlowError::NonExhaustiveReturn {
                function: ctx.name,
                ret: ctx.ret.display(),
                span: f.span,
            });
        }
    }

    fn check_block(&mut self, block: &Block, parent: ScopeId, ctx: &FnCtx) {
        let scope = self.scopes.push(ScopeKind::Block, Some(parent));
        for stmt in &block.stmts {
            self.check_stmt(stmt, scope, ctx);
        }
    }

    /// Statement-level accumulation: an error inside one statement is
    /// recorded and checking continues with the next.
    fn check_stmt(&mut self, stmt: &Stmt, scope: ScopeId, ctx: &FnCtx) {
        let result = match stmt {
            Stmt::Declare(d) => self.check_declare(d, scope),
            Stmt::Set(s) => self.check_set(s, scope),
            Stmt::If(i) => self.check_if(i, scope, ctx),
            Stmt::While(w) => self.check_while(w, scope, ctx),
            Stmt::Match(m) => self.check_match(m, scope, ctx),
            Stmt::Return(r) => self.check_return(r, scope, ctx),
            Stmt::Expr(e) => self.infer_expr(e, scope).map(|_| ()),
        };
        if let Err(err) = result {
            self.report(err);
        }
    }

    fn check_declare(&mut self, d: &DeclareStmt, scope: ScopeId) -> Result<(), SemaError> {
        let declared_ty = self.resolve_type_ref(&d.ty)?;
        let value_ty = self.infer_expr(&d.value, scope)?;
        if value_ty != declared_ty {
            return Err(TypeError::TypeMismatch {
                expected: declared_ty.display(),
                found: value_ty.display(),
                span: d.value.span,
            }
            .into());
        }

        let declared = self.scopes.declare(
            scope,
            Symbol {
                name: d.name.node.clone(),
                ty: declared_ty,
                mutable: d.mutable,
                span: d.name.span,
                kind: SymbolKind::Variable,
            },
        )?;
        self.note_shadow(&d.name.node, d.name.span, declared.shadows);
        Ok(())
    }

    fn note_shadow(
        &mut self,
        name: &str,
        span: llmpl_ast::Span,
        shadows: Option<crate::scope::SymbolId>,
    ) {
        if let Some(outer) = shadows {
            let outer_span = self.scopes.symbol(outer).span;
            self.diags.push(
                Diagnostic::info(
                    codes::SHADOWED_BINDING,
                    format!("binding '{name}' shadows an outer binding of the same name"),
                    span,
                )
                .with_related(outer_span, "outer binding declared here"),
            );
        }
    }

    fn check_set(&mut self, s: &SetStmt, scope: ScopeId) -> Result<(), SemaError> {
        let symbol_id = self.scopes.resolve(scope, &s.target.node, s.target.span)?;
        let symbol = self.scopes.symbol(symbol_id);
        let (target_ty, target_span, assignable) =
            (symbol.ty.clone(), symbol.span, symbol.mutable && symbol.kind == SymbolKind::Variable);

        if !assignable {
            return Err(TypeError::ImmutableAssignment {
                name: s.target.node.clone(),
                span: s.target.span,
                declared: target_span,
            }
            .into());
        }

        let value_ty = self.infer_expr(&s.value, scope)?;
        if value_ty != target_ty {
            return Err(TypeError::TypeMismatch {
                expected: target_ty.display(),
                found: value_ty.display(),
                span: s.value.span,
            }
            .into());
        }
        Ok(())
    }

    fn check_if(&mut self, i: &IfStmt, scope: ScopeId, ctx: &FnCtx) -> Result<(), SemaError> {
        let cond_ty = self.infer_expr(&i.cond, scope)?;
        if cond_ty != Type::BOOLEAN {
            self.report(TypeError::TypeMismatch {
                expected: Type::BOOLEAN.display(),
                found: cond_ty.display(),
                span: i.cond.span,
            });
        }
        self.check_block(&i.then_block, scope, ctx);
        if let Some(else_block) = &i.else_block {
            self.check_block(else_block, scope, ctx);
        }
        Ok(())
    }

    fn check_while(&mut self, w: &WhileStmt, scope: ScopeId, ctx: &FnCtx) -> Result<(), SemaError> {
        let cond_ty = self.infer_expr(&w.cond, scope)?;
        if cond_ty != Type::BOOLEAN {
            self.report(TypeError::TypeMismatch {
                expected: Type::BOOLEAN.display(),
                found: cond_ty.display(),
                span: w.cond.span,
            });
        }
        self.check_block(&w.body, scope, ctx);
        Ok(())
    }

    /// Pattern typing and binder scoping. Coverage, duplicate arms and
    /// catch-all placement are the exhaustiveness pass's job.
    fn check_match(&mut self, m: &MatchStmt, scope: ScopeId, ctx: &FnCtx) -> Result<(), SemaError> {
        let scrut_ty = self.infer_expr(&m.scrutinee, scope)?;

        enum SumShape {
            Enum(String),
            Result(Type, Type),
        }

        let shape = match &scrut_ty {
            Type::Named(name) if self.enums.contains_key(name) => SumShape::Enum(name.clone()),
            Type::Result(ok, err) => SumShape::Result((**ok).clone(), (**err).clone()),
            other => {
                return Err(TypeError::TypeMismatch {
                    expected: "an enum or Result value".to_string(),
                    found: other.display(),
                    span: m.scrutinee.span,
                }
                .into());
            }
        };

        for arm in &m.arms {
            let arm_scope = self.scopes.push(ScopeKind::Block, Some(scope));
            let bind_result = match (&arm.pattern, &shape) {
                (Pattern::Variant { name, binders, span }, SumShape::Enum(enum_name)) => {
                    self.bind_variant_pattern(enum_name, name, binders, *span, arm_scope)
                }
                (Pattern::Variant { name, span, .. }, SumShape::Result(..)) => {
                    Err(TypeError::TypeMismatch {
                        expected: "a success/failure or catch-all pattern".to_string(),
                        found: format!("variant pattern '{}'", name.node),
                        span: *span,
                    }
                    .into())
                }
                (Pattern::Success { binder, .. }, SumShape::Result(ok, _)) => {
                    self.bind_optional(binder.as_ref(), ok.clone(), arm_scope)
                }
                (Pattern::Failure { binder, .. }, SumShape::Result(_, err)) => {
                    self.bind_optional(binder.as_ref(), err.clone(), arm_scope)
                }
                (Pattern::Success { span, .. }, SumShape::Enum(enum_name))
                | (Pattern::Failure { span, .. }, SumShape::Enum(enum_name)) => {
                    Err(TypeError::TypeMismatch {
                        expected: format!("a variant pattern of enum '{enum_name}'"),
                        found: "a success/failure pattern".to_string(),
                        span: *span,
                    }
                    .into())
                }
                (Pattern::CatchAll { binder, .. }, _) => {
                    self.bind_optional(Some(binder), scrut_ty.clone(), arm_scope)
                }
            };
            if let Err(err) = bind_result {
                self.report(err);
            }

            for stmt in &arm.body.stmts {
                self.check_stmt(stmt, arm_scope, ctx);
            }
        }
        Ok(())
    }

    fn bind_variant_pattern(
        &mut self,
        enum_name: &str,
        variant: &llmpl_ast::Ident,
        binders: &[llmpl_ast::Ident],
        span: llmpl_ast::Span,
        arm_scope: ScopeId,
    ) -> Result<(), SemaError> {
        let decl = self.enums.get(enum_name).cloned();
        let Some(decl) = decl else {
            return Err(NameResolutionError::UnboundName {
                name: enum_name.to_string(),
                span,
            }
            .into());
        };
        let Some(var_decl) = decl.variants.iter().find(|v| v.name.node == variant.node) else {
            return Err(NameResolutionError::UnboundName {
                name: format!("{enum_name}::{}", variant.node),
                span: variant.span,
            }
            .into());
        };

        if binders.len() != var_decl.payload.len() {
            return Err(TypeError::ArityMismatch {
                callee: format!("{enum_name}::{}", variant.node),
                expected: var_decl.payload.len(),
                found: binders.len(),
                span,
            }
            .into());
        }

        for (binder, payload_ty) in binders.iter().zip(var_decl.payload.iter()) {
            let ty = self.resolve_type_ref(payload_ty)?;
            self.bind_optional(Some(binder), ty, arm_scope)?;
        }
        Ok(())
    }

    fn bind_optional(
        &mut self,
        binder: Option<&llmpl_ast::Ident>,
        ty: Type,
        arm_scope: ScopeId,
    ) -> Result<(), SemaError> {
        if let Some(binder) = binder {
            let declared = self.scopes.declare(
                arm_scope,
                Symbol {
                    name: binder.node.clone(),
                    ty,
                    mutable: false,
                    span: binder.span,
                    kind: SymbolKind::Variable,
                },
            )?;
            self.note_shadow(&binder.node, binder.span, declared.shadows);
        }
        Ok(())
    }

    fn check_return(&mut self, r: &ReturnStmt, scope: ScopeId, ctx: &FnCtx) -> Result<(), SemaError> {
        match r.kind {
            ReturnKind::Plain => {
                match &r.value {
                    // A plain return in a Result function is legal only when
                    // it forwards an already-wrapped value of the exact
                    // declared type (a matching call, typically recursive).
                    Some(value) => {
                        let value_ty = self.infer_expr(value, scope)?;
                        if value_ty != ctx.ret {
                            let expected = if ctx.ret.is_result() {
                                format!(
                                    "an explicit success/failure return, or a {} value to forward",
                                    ctx.ret.display()
                                )
                            } else {
                                ctx.ret.display()
                            };
                            return Err(TypeError::TypeMismatch {
                                expected,
                                found: value_ty.display(),
                                span: value.span,
                            }
                            .into());
                        }
                    }
                    None => {
                        if ctx.ret != Type::UNIT {
                            return Err(TypeError::TypeMismatch {
                                expected: ctx.ret.display(),
                                found: Type::UNIT.display(),
                                span: r.span,
                            }
                            .into());
                        }
                    }
                }
                Ok(())
            }
            ReturnKind::Success | ReturnKind::Failure => {
                let Type::Result(ok, err) = &ctx.ret else {
                    return Err(TypeError::TypeMismatch {
                        expected: format!("a plain return ({} function)", ctx.ret.display()),
                        found: "a success/failure return".to_string(),
                        span: r.span,
                    }
                    .into());
                };
                let expected = if r.kind == ReturnKind::Success {
                    (**ok).clone()
                } else {
                    (**err).clone()
                };
                let Some(value) = &r.value else {
                    return Err(TypeError::TypeMismatch {
                        expected: expected.display(),
                        found: Type::UNIT.display(),
                        span: r.span,
                    }
                    .into());
                };
                let value_ty = self.infer_expr(value, scope)?;
                if value_ty != expected {
                    return Err(TypeError::TypeMismatch {
                        expected: expected.display(),
                        found: value_ty.display(),
                        span: value.span,
                    }
                    .into());
                }
                Ok(())
            }
        }
    }

    // -- expressions --

    fn infer_expr(&mut self, expr: &Expr, scope: ScopeId) -> Result<Type, SemaError> {
        let ty = self.infer_expr_inner(expr, scope)?;
        self.types.insert(expr.id, ty.clone());
        Ok(ty)
    }

    fn infer_expr_inner(&mut self, expr: &Expr, scope: ScopeId) -> Result<Type, SemaError> {
        match &expr.kind {
            ExprKind::IntLit(_) => Ok(Type::INTEGER),
            ExprKind::FloatLit(_) => Ok(Type::FLOAT),
            ExprKind::BoolLit(_) => Ok(Type::BOOLEAN),
            ExprKind::TextLit(_) => Ok(Type::TEXT),

            ExprKind::Name(id) => {
                let symbol_id = self.scopes.resolve(scope, &id.node, id.span)?;
                let symbol = self.scopes.symbol(symbol_id);
                if symbol.kind != SymbolKind::Variable {
                    return Err(TypeError::TypeMismatch {
                        expected: "a value".to_string(),
                        found: format!("{} name '{}'", kind_word(symbol.kind), id.node),
                        span: id.span,
                    }
                    .into());
                }
                Ok(symbol.ty.clone())
            }

            ExprKind::Unary { op, operand } => {
                let ty = self.infer_expr(operand, scope)?;
                match op {
                    UnaryOp::Negate => {
                        if ty == Type::INTEGER || ty == Type::FLOAT {
                            Ok(ty)
                        } else {
                            Err(TypeError::TypeMismatch {
                                expected: "Integer or Float".to_string(),
                                found: ty.display(),
                                span: operand.span,
                            }
                            .into())
                        }
                    }
                    UnaryOp::Not => {
                        if ty == Type::BOOLEAN {
                            Ok(ty)
                        } else {
                            Err(TypeError::TypeMismatch {
                                expected: Type::BOOLEAN.display(),
                                found: ty.display(),
                                span: operand.span,
                            }
                            .into())
                        }
                    }
                }
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let lt = self.infer_expr(lhs, scope)?;
                let rt = self.infer_expr(rhs, scope)?;
                self.check_binary(*op, &lt, &rt, expr.span)
            }

            ExprKind::Call { callee, args } => self.check_call(callee, args, scope),

            ExprKind::RecordLit { name, fields } => {
                let Some(decl) = self.records.get(&name.node).cloned() else {
                    return Err(NameResolutionError::UnboundName {
                        name: name.node.clone(),
                        span: name.span,
                    }
                    .into());
                };

                let mut provided: Vec<&str> = Vec::with_capacity(fields.len());
                for (field_name, value) in fields {
                    let Some(field_decl) =
                        decl.fields.iter().find(|f| f.name.node == field_name.node)
                    else {
                        return Err(TypeError::UnknownField {
                            record: name.node.clone(),
                            field: field_name.node.clone(),
                            span: field_name.span,
                        }
                        .into());
                    };
                    if provided.contains(&field_name.node.as_str()) {
                        return Err(NameResolutionError::DuplicateBinding {
                            name: field_name.node.clone(),
                            span: field_name.span,
                            previous: field_decl.span,
                        }
                        .into());
                    }
                    provided.push(&field_name.node);

                    let expected = self.resolve_type_ref(&field_decl.ty)?;
                    let found = self.infer_expr(value, scope)?;
                    if found != expected {
                        return Err(TypeError::TypeMismatch {
                            expected: expected.display(),
                            found: found.display(),
                            span: value.span,
                        }
                        .into());
                    }
                }

                if provided.len() != decl.fields.len() {
                    return Err(TypeError::ArityMismatch {
                        callee: name.node.clone(),
                        expected: decl.fields.len(),
                        found: provided.len(),
                        span: expr.span,
                    }
                    .into());
                }

                Ok(Type::Named(name.node.clone()))
            }

            ExprKind::FieldAccess { base, field } => {
                let base_ty = self.infer_expr(base, scope)?;
                let Type::Named(record_name) = &base_ty else {
                    return Err(TypeError::UnknownField {
                        record: base_ty.display(),
                        field: field.node.clone(),
                        span: field.span,
                    }
                    .into());
                };
                let Some(decl) = self.records.get(record_name) else {
                    return Err(TypeError::UnknownField {
                        record: record_name.clone(),
                        field: field.node.clone(),
                        span: field.span,
                    }
                    .into());
                };
                let Some(field_decl) = decl.fields.iter().find(|f| f.name.node == field.node)
                else {
                    return Err(TypeError::UnknownField {
                        record: record_name.clone(),
                        field: field.node.clone(),
                        span: field.span,
                    }
                    .into());
                };
                self.resolve_type_ref(&field_decl.ty)
            }

            ExprKind::EnumCtor {
                enum_name,
                variant,
                args,
            } => {
                let Some(decl) = self.enums.get(&enum_name.node).cloned() else {
                    return Err(NameResolutionError::UnboundName {
                        name: enum_name.node.clone(),
                        span: enum_name.span,
                    }
                    .into());
                };
                let Some(var_decl) =
                    decl.variants.iter().find(|v| v.name.node == variant.node)
                else {
                    return Err(NameResolutionError::UnboundName {
                        name: format!("{}::{}", enum_name.node, variant.node),
                        span: variant.span,
                    }
                    .into());
                };

                if args.len() != var_decl.payload.len() {
                    return Err(TypeError::ArityMismatch {
                        callee: format!("{}::{}", enum_name.node, variant.node),
                        expected: var_decl.payload.len(),
                        found: args.len(),
                        span: expr.span,
                    }
                    .into());
                }
                for (arg, payload_ty) in args.iter().zip(var_decl.payload.iter()) {
                    let expected = self.resolve_type_ref(payload_ty)?;
                    let found = self.infer_expr(arg, scope)?;
                    if found != expected {
                        return Err(TypeError::TypeMismatch {
                            expected: expected.display(),
                            found: found.display(),
                            span: arg.span,
                        }
                        .into());
                    }
                }
                Ok(Type::Named(enum_name.node.clone()))
            }
        }
    }

    /// Operand types must match the operator's declared signature exactly —
    /// mixing Integer and Float is the canonical rejected case.
    fn check_binary(
        &self,
        op: BinOp,
        lt: &Type,
        rt: &Type,
        span: llmpl_ast::Span,
    ) -> Result<Type, SemaError> {
        let numeric = |t: &Type| *t == Type::INTEGER || *t == Type::FLOAT;
        let orderable = |t: &Type| numeric(t) || *t == Type::DATE;

        match op {
            BinOp::Plus | BinOp::Minus | BinOp::Times | BinOp::DividedBy => {
                if numeric(lt) && lt == rt {
                    Ok(lt.clone())
                } else {
                    Err(TypeError::TypeMismatch {
                        expected: format!("matching numeric operands, left is {}", lt.display()),
                        found: rt.display(),
                        span,
                    }
                    .into())
                }
            }
            BinOp::Equals | BinOp::NotEquals => {
                if lt == rt {
                    Ok(Type::BOOLEAN)
                } else {
                    Err(TypeError::TypeMismatch {
                        expected: lt.display(),
                        found: rt.display(),
                        span,
                    }
                    .into())
                }
            }
            BinOp::LessThan | BinOp::GreaterThan | BinOp::AtMost | BinOp::AtLeast => {
                if orderable(lt) && lt == rt {
                    Ok(Type::BOOLEAN)
                } else {
                    Err(TypeError::TypeMismatch {
                        expected: format!("matching orderable operands, left is {}", lt.display()),
                        found: rt.display(),
                        span,
                    }
                    .into())
                }
            }
            BinOp::And | BinOp::Or => {
                if *lt == Type::BOOLEAN && *rt == Type::BOOLEAN {
                    Ok(Type::BOOLEAN)
                } else {
                    Err(TypeError::TypeMismatch {
                        expected: "Boolean operands".to_string(),
                        found: format!("{}, {}", lt.display(), rt.display()),
                        span,
                    }
                    .into())
                }
            }
        }
    }

    /// Callee resolution: a declared function wins; otherwise the name is
    /// taken as an intrinsic and checked against the runtime signature
    /// table. Intrinsic disagreements get their own codes so tooling can
    /// tell a bad runtime contract from an ordinary type error.
    fn check_call(
        &mut self,
        callee: &llmpl_ast::Ident,
        args: &[Expr],
        scope: ScopeId,
    ) -> Result<Type, SemaError> {
        if let Some(sig) = self.functions.get(&callee.node).cloned() {
            if args.len() != sig.params.len() {
                return Err(TypeError::ArityMismatch {
                    callee: callee.node.clone(),
                    expected: sig.params.len(),
                    found: args.len(),
                    span: callee.span,
                }
                .into());
            }
            for (arg, (_, expected)) in args.iter().zip(sig.params.iter()) {
                let found = self.infer_expr(arg, scope)?;
                if found != *expected {
                    return Err(TypeError::TypeMismatch {
                        expected: expected.display(),
                        found: found.display(),
                        span: arg.span,
                    }
                    .into());
                }
            }
            return Ok(sig.ret);
        }

        let Some(sig) = self.intrinsics.get(&callee.node).cloned() else {
            return Err(IntrinsicError::Undeclared {
                name: callee.node.clone(),
                span: callee.span,
            }
            .into());
        };

        if args.len() != sig.params.len() {
            return Err(IntrinsicError::SignatureMismatch {
                name: callee.node.clone(),
                detail: format!(
                    "declared with {} parameter(s), called with {}",
                    sig.params.len(),
                    args.len()
                ),
                span: callee.span,
            }
            .into());
        }
        for (i, (arg, expected_ir)) in args.iter().zip(sig.params.iter()).enumerate() {
            let expected = Type::from_ir(expected_ir);
            let found = self.infer_expr(arg, scope)?;
            if found != expected {
                return Err(IntrinsicError::SignatureMismatch {
                    name: callee.node.clone(),
                    detail: format!(
                        "parameter {} is declared {}, argument is {}",
                        i + 1,
                        expected.display(),
                        found.display()
                    ),
                    span: arg.span,
                }
                .into());
            }
        }

        Ok(Type::from_ir(&sig.ret))
    }
}

fn kind_word(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Variable => "variable",
        SymbolKind::Function => "function",
        SymbolKind::Type => "type",
        SymbolKind::Intrinsic => "intrinsic",
    }
}

/// Conservative all-paths-terminate walk. A `while` never guarantees
/// termination; a `match` counts when every arm body terminates (coverage
/// itself is verified by the exhaustiveness pass, and a coverage gap fails
/// the unit regardless).
pub(crate) fn block_terminates(block: &Block) -> bool {
    block.stmts.iter().any(stmt_terminates)
}

fn stmt_terminates(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::If(i) => {
            i.else_block.as_ref().is_some_and(block_terminates) && block_terminates(&i.then_block)
        }
        Stmt::Match(m) => !m.arms.is_empty() && m.arms.iter().all(|a| block_terminates(&a.body)),
        Stmt::Declare(_) | Stmt::Set(_) | Stmt::While(_) | Stmt::Expr(_) => false,
    }
}
