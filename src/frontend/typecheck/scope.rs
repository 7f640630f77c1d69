//! Symbols and lexical scopes

use indexmap::IndexMap;

use super::super::parser::ast::Type;
use crate::util::span::Span;

/// What a name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Var,
    Const,
    Function,
    Struct,
    TypeAlias,
    GenericParam,
}

/// A named entity and where it was declared
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Missing for kinds that lack one (struct, alias, generic param)
    pub ty: Option<Type>,
    /// Number of generic parameters on a generic function
    pub generic_arity: usize,
    /// Position of the defining AST node
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Option<Type>, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            generic_arity: 0,
            span,
        }
    }

    pub fn with_generics(mut self, arity: usize) -> Self {
        self.generic_arity = arity;
        self
    }
}

/// One lexical scope: a name-to-symbol map. The outer link lives in
/// [`ScopeStack`]; resolution walks the stack outward on miss.
#[derive(Debug, Default)]
pub struct Scope {
    symbols: IndexMap<String, Symbol>,
}

/// Stack of scopes, innermost last
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    /// New stack holding only the program root scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Enter a nested scope
    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Leave the innermost scope
    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the root scope");
        self.scopes.pop();
    }

    /// Define a symbol in the innermost scope. Fails when the name is
    /// already taken in that same scope; shadowing outer scopes is
    /// allowed.
    pub fn define(&mut self, symbol: Symbol) -> Result<(), Symbol> {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if let Some(existing) = scope.symbols.get(&symbol.name) {
            return Err(existing.clone());
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Resolve a name, walking outward
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.symbols.get(name))
    }

    /// Resolve only in the innermost scope
    pub fn resolve_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .last()
            .and_then(|scope| scope.symbols.get(name))
    }

    /// Current nesting depth (1 = program root)
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
