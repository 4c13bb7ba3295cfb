#![forbid(unsafe_code)]

use std::collections::HashMap;

use llmpl_ast::Span;

use crate::error::NameResolutionError;
use crate::types::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Type,
    Intrinsic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

/// One declared name. Owned by its declaring frame; use sites hold the id.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
    pub span: Span,
    pub kind: SymbolKind,
}

#[derive(Debug)]
pub struct Frame {
    pub kind: ScopeKind,
    /// Index into the arena, not a pointer — no ownership cycles, and the
    /// whole tree clones cheaply for speculative analysis.
    pub parent: Option<ScopeId>,
    bindings: HashMap<String, SymbolId>,
}

/// Result of a successful declaration. Shadowing across frames is legal but
/// surfaced so the checker can emit an informational diagnostic.
#[derive(Debug)]
pub struct Declared {
    pub symbol: SymbolId,
    pub shadows: Option<SymbolId>,
}

/// Arena of lexical scope frames plus the symbols they own. Both live for
/// one compilation unit and are discarded with it.
#[derive(Debug, Default)]
pub struct ScopeArena {
    frames: Vec<Frame>,
    symbols: Vec<Symbol>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.frames.len() as u32);
        self.frames.push(Frame {
            kind,
            parent,
            bindings: HashMap::new(),
        });
        id
    }

    pub fn frame(&self, scope: ScopeId) -> &Frame {
        &self.frames[scope.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    /// Fails only on a same-frame collision; an identical name in an outer
    /// frame is shadowing, reported through `Declared::shadows`.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        symbol: Symbol,
    ) -> Result<Declared, NameResolutionError> {
        if let Some(&existing) = self.frames[scope.0 as usize].bindings.get(&symbol.name) {
            return Err(NameResolutionError::DuplicateBinding {
                name: symbol.name,
                span: symbol.span,
                previous: self.symbols[existing.0 as usize].span,
            });
        }

        let shadows = self.frames[scope.0 as usize]
            .parent
            .and_then(|parent| self.lookup(parent, &symbol.name));

        let id = SymbolId(self.symbols.len() as u32);
        let name = symbol.name.clone();
        self.symbols.push(symbol);
        self.frames[scope.0 as usize].bindings.insert(name, id);

        Ok(Declared {
            symbol: id,
            shadows,
        })
    }

    /// Nearest-enclosing-frame resolution: the innermost binding wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = &self.frames[id.0 as usize];
            if let Some(&sym) = frame.bindings.get(name) {
                return Some(sym);
            }
            current = frame.parent;
        }
        None
    }

    pub fn resolve(
        &self,
        scope: ScopeId,
        name: &str,
        use_span: Span,
    ) -> Result<SymbolId, NameResolutionError> {
        self.lookup(scope, name)
            .ok_or_else(|| NameResolutionError::UnboundName {
                name: name.to_string(),
                span: use_span,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, line: u32) -> Symbol {
        Symbol {
            name: name.to_string(),
            ty: Type::INTEGER,
            mutable: false,
            span: Span::point(line, 1),
            kind: SymbolKind::Variable,
        }
    }

    #[test]
    fn same_frame_duplicate_is_rejected() {
        let mut arena = ScopeArena::new();
        let root = arena.push(ScopeKind::Module, None);
        arena.declare(root, sym("x", 1)).expect("first binding");
        let err = arena.declare(root, sym("x", 2)).expect_err("duplicate");
        assert!(matches!(
            err,
            NameResolutionError::DuplicateBinding { ref name, .. } if name == "x"
        ));
    }

    #[test]
    fn inner_frame_shadows_and_reports_it() {
        let mut arena = ScopeArena::new();
        let root = arena.push(ScopeKind::Module, None);
        let outer = arena.declare(root, sym("x", 1)).expect("outer");
        let inner_scope = arena.push(ScopeKind::Block, Some(root));
        let inner = arena.declare(inner_scope, sym("x", 2)).expect("shadow");
        assert_eq!(inner.shadows, Some(outer.symbol));
        assert_eq!(arena.lookup(inner_scope, "x"), Some(inner.symbol));
        assert_eq!(arena.lookup(root, "x"), Some(outer.symbol));
    }

    #[test]
    fn resolution_walks_parents_then_fails() {
        let mut arena = ScopeArena::new();
        let root = arena.push(ScopeKind::Module, None);
        let func = arena.push(ScopeKind::Function, Some(root));
        let block = arena.push(ScopeKind::Block, Some(func));
        arena.declare(root, sym("top", 1)).expect("decl");
        assert!(arena.lookup(block, "top").is_some());
        let err = arena
            .resolve(block, "missing", Span::point(9, 9))
            .expect_err("unbound");
        assert!(matches!(err, NameResolutionError::UnboundName { .. }));
    }
}
