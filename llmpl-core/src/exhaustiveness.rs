#![forbid(unsafe_code)]

//! Match coverage analysis. Runs after checking, so every scrutinee already
//! has a resolved type and every variant pattern names a real variant; this
//! pass only decides coverage, duplicate arms and catch-all placement.

use llmpl_ast::{Block, Decl, MatchStmt, Pattern, Program, Span, Stmt};

use crate::check::CheckArtifacts;
use crate::diagnostics::Diagnostics;
use crate::error::{MatchError, SemaError};
use crate::types::Type;

pub fn check_exhaustiveness(program: &Program, artifacts: &CheckArtifacts) -> Diagnostics {
    let mut pass = Pass {
        artifacts,
        diags: Diagnostics::new(),
    };
    for decl in &program.decls {
        if let Decl::Function(f) = decl {
            pass.walk_block(&f.body);
        }
    }
    pass.diags
}

struct Pass<'a> {
    artifacts: &'a CheckArtifacts,
    diags: Diagnostics,
}

impl Pass<'_> {
    fn walk_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            match stmt {
                Stmt::If(i) => {
                    self.walk_block(&i.then_block);
                    if let Some(else_block) = &i.else_block {
                        self.walk_block(else_block);
                    }
                }
                Stmt::While(w) => self.walk_block(&w.body),
                Stmt::Match(m) => {
                    self.check_match(m);
                    for arm in &m.arms {
                        self.walk_block(&arm.body);
                    }
                }
                Stmt::Declare(_) | Stmt::Set(_) | Stmt::Return(_) | Stmt::Expr(_) => {}
            }
        }
    }

    fn check_match(&mut self, m: &MatchStmt) {
        let Some(scrut_ty) = self.artifacts.types.get(m.scrutinee.id) else {
            return;
        };

        // Variant names of the sum type, in declaration order. Result is a
        // fixed two-variant sum.
        let variants: Vec<String> = match scrut_ty {
            Type::Named(name) => match self.artifacts.enums.get(name) {
                Some(decl) => decl.variants.iter().map(|v| v.name.node.clone()).collect(),
                None => return,
            },
            Type::Result(..) => vec!["success".to_string(), "failure".to_string()],
            _ => return,
        };

        // First covering span per variant; None means still uncovered.
        let mut covered: Vec<Option<Span>> = vec![None; variants.len()];
        let mut catch_all: Option<Span> = None;

        for arm in &m.arms {
            let arm_span = arm.pattern.span();

            if let Some(previous) = catch_all {
                self.report(MatchError::UnreachableArm {
                    reason: "it follows a catch-all arm".to_string(),
                    span: arm_span,
                    covered_at: Some(previous),
                });
                continue;
            }

            match &arm.pattern {
                Pattern::Variant { name, .. } => {
                    self.cover_one(&variants, &mut covered, &name.node, arm_span);
                }
                Pattern::Success { .. } => {
                    self.cover_one(&variants, &mut covered, "success", arm_span);
                }
                Pattern::Failure { .. } => {
                    self.cover_one(&variants, &mut covered, "failure", arm_span);
                }
                Pattern::CatchAll { .. } => {
                    if covered.iter().all(Option::is_some) {
                        self.report(MatchError::UnreachableArm {
                            reason: "every variant is already covered".to_string(),
                            span: arm_span,
                            covered_at: None,
                        });
                    }
                    catch_all = Some(arm_span);
                }
            }
        }

        if catch_all.is_none() {
            let missing: Vec<String> = variants
                .iter()
                .zip(&covered)
                .filter(|(_, c)| c.is_none())
                .map(|(name, _)| name.clone())
                .collect();
            if !missing.is_empty() {
                self.report(MatchError::NonExhaustiveMatch {
                    missing,
                    span: m.span,
                });
            }
        }
    }

    fn cover_one(
        &mut self,
        variants: &[String],
        covered: &mut [Option<Span>],
        name: &str,
        arm_span: Span,
    ) {
        let Some(index) = variants.iter().position(|v| v == name) else {
            return;
        };
        match covered[index] {
            Some(first) => self.report(MatchError::UnreachableArm {
                reason: format!("variant '{name}' is already covered"),
                span: arm_span,
                covered_at: Some(first),
            }),
            None => covered[index] = Some(arm_span),
        }
    }

    fn report(&mut self, err: MatchError) {
        self.diags.push(SemaError::from(err).into_diagnostic());
    }
}
