//! Scoped symbol tables.
//!
//! A stack of hash-map frames; the bottom frame is the global scope. A
//! lookup walks from the innermost frame outward. Shadowing across frames
//! is permitted; redefining a name within the same frame is an error,
//! except for global registration, which silently shadows (module loading
//! relies on this).

use crate::types::Type;
use rustc_hash::FxHashMap;
use vegac_util::{Span, Symbol};

/// What a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Agent,
    Tool,
}

/// A resolved symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRecord {
    pub name: Symbol,
    pub kind: SymbolKind,
    pub ty: Type,
    pub span: Span,
    /// Declared return type, for functions and tools.
    pub ret: Option<Type>,
    /// Parameter types in declaration order, for functions and tools.
    pub params: Vec<Type>,
    /// Tool names, for agents.
    pub tools: Vec<Symbol>,
}

impl SymbolRecord {
    /// A plain variable or parameter record.
    pub fn variable(name: Symbol, kind: SymbolKind, ty: Type, span: Span) -> Self {
        Self {
            name,
            kind,
            ty,
            span,
            ret: None,
            params: Vec::new(),
            tools: Vec::new(),
        }
    }
}

/// The scope stack. Frame 0 is the global scope.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<FxHashMap<Symbol, SymbolRecord>>,
}

impl ScopeStack {
    /// A stack holding only the global scope.
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
        }
    }

    /// Enter a new innermost scope.
    pub fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Leave the innermost scope, releasing its symbols.
    ///
    /// The global scope is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of live frames, including the global scope.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Define a symbol in the innermost scope.
    ///
    /// Returns `false` when the name is already defined in that scope.
    pub fn define(&mut self, record: SymbolRecord) -> bool {
        let frame = self.frames.last_mut().expect("scope stack is never empty");
        if frame.contains_key(&record.name) {
            return false;
        }
        frame.insert(record.name, record);
        true
    }

    /// Register a symbol in the global scope, silently shadowing any
    /// earlier registration of the same name.
    pub fn define_global(&mut self, record: SymbolRecord) {
        self.frames[0].insert(record.name, record);
    }

    /// Look a name up, walking from the innermost scope outward.
    pub fn lookup(&self, name: Symbol) -> Option<&SymbolRecord> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(&name))
    }

    /// Look a name up in the innermost scope only.
    pub fn lookup_local(&self, name: Symbol) -> Option<&SymbolRecord> {
        self.frames.last().and_then(|frame| frame.get(&name))
    }

    /// The global symbols, sorted by name for stable comparison.
    pub fn globals(&self) -> Vec<&SymbolRecord> {
        let mut records: Vec<_> = self.frames[0].values().collect();
        records.sort_by_key(|r| r.name.as_str());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, kind: SymbolKind, ty: Type) -> SymbolRecord {
        SymbolRecord::variable(Symbol::intern(name), kind, ty, Span::DUMMY)
    }

    #[test]
    fn test_define_and_lookup() {
        let mut scopes = ScopeStack::new();
        assert!(scopes.define(record("x", SymbolKind::Variable, Type::Int)));

        let found = scopes.lookup(Symbol::intern("x")).unwrap();
        assert_eq!(found.ty, Type::Int);
        assert!(scopes.lookup(Symbol::intern("y")).is_none());
    }

    #[test]
    fn test_redefinition_in_same_scope_fails() {
        let mut scopes = ScopeStack::new();
        assert!(scopes.define(record("x", SymbolKind::Variable, Type::Int)));
        assert!(!scopes.define(record("x", SymbolKind::Variable, Type::Str)));
    }

    #[test]
    fn test_shadowing_across_scopes() {
        let mut scopes = ScopeStack::new();
        scopes.define(record("x", SymbolKind::Variable, Type::Int));
        scopes.push();
        assert!(scopes.define(record("x", SymbolKind::Variable, Type::Str)));
        assert_eq!(scopes.lookup(Symbol::intern("x")).unwrap().ty, Type::Str);

        scopes.pop();
        assert_eq!(scopes.lookup(Symbol::intern("x")).unwrap().ty, Type::Int);
    }

    #[test]
    fn test_pop_releases_symbols() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.define(record("inner", SymbolKind::Variable, Type::Bool));
        scopes.pop();
        assert!(scopes.lookup(Symbol::intern("inner")).is_none());
    }

    #[test]
    fn test_global_scope_never_popped() {
        let mut scopes = ScopeStack::new();
        scopes.define(record("g", SymbolKind::Function, Type::Unknown));
        scopes.pop();
        scopes.pop();
        assert!(scopes.lookup(Symbol::intern("g")).is_some());
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn test_define_global_shadows_silently() {
        let mut scopes = ScopeStack::new();
        scopes.define_global(record("f", SymbolKind::Function, Type::Int));
        scopes.define_global(record("f", SymbolKind::Function, Type::Str));
        assert_eq!(scopes.lookup(Symbol::intern("f")).unwrap().ty, Type::Str);
    }

    #[test]
    fn test_outer_scope_visible_from_inner() {
        let mut scopes = ScopeStack::new();
        scopes.define(record("outer", SymbolKind::Variable, Type::Int));
        scopes.push();
        scopes.push();
        assert!(scopes.lookup(Symbol::intern("outer")).is_some());
        assert!(scopes.lookup_local(Symbol::intern("outer")).is_none());
    }
}
