// marmoset-vm - Symbol table for the Marmoset compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Scoped symbol resolution with free-variable promotion.
//!
//! Scopes nest as a tree: each enclosed table owns its outer table and
//! hands it back when the compiler leaves the scope. Resolving a name
//! that lives in an enclosing function's locals promotes it into the
//! current scope as a `Free` symbol, which the compiler later turns into
//! a closure capture.

use std::collections::HashMap;

/// Where a symbol lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// A slot in the VM's globals array.
    Global,
    /// A local slot of the current frame.
    Local,
    /// An entry in the built-in function table.
    Builtin,
    /// A captured variable of the current closure.
    Free,
}

/// A resolved name: where it lives and at which index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// A single scope's name map, linked to its outer scope.
#[derive(Debug, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,

    /// Number of `define` calls in this scope; doubles as the next local
    /// or global index.
    pub num_definitions: usize,

    /// Symbols captured from enclosing scopes, in capture order. The
    /// compiler consumes this list when it leaves a function scope.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Create a root (global) symbol table.
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Create a table enclosed in `outer`. Ownership of the outer table
    /// moves in; [`take_outer`] gives it back.
    ///
    /// [`take_outer`]: SymbolTable::take_outer
    pub fn enclosed(outer: SymbolTable) -> Self {
        SymbolTable {
            outer: Some(Box::new(outer)),
            ..SymbolTable::default()
        }
    }

    /// Detach and return the outer table, if any.
    pub fn take_outer(&mut self) -> Option<SymbolTable> {
        self.outer.take().map(|boxed| *boxed)
    }

    /// Define a name in this scope. Global scope if this is the root
    /// table, local otherwise.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: self.num_definitions,
        };
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    /// Register a built-in at a fixed index. Does not count as a
    /// definition.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Record `original` as captured by this scope and return the `Free`
    /// symbol that replaces it here.
    pub fn define_free(&mut self, original: Symbol) -> Symbol {
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: self.free_symbols.len(),
        };
        self.free_symbols.push(original);
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Resolve a name, searching enclosing scopes. Non-global,
    /// non-builtin hits from an outer scope are promoted to `Free` in
    /// this scope.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }

        let outer = self.outer.as_mut()?;
        let symbol = outer.resolve(name)?;
        match symbol.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(symbol),
            SymbolScope::Local | SymbolScope::Free => Some(self.define_free(symbol)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, scope: SymbolScope, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope,
            index,
        }
    }

    #[test]
    fn define_assigns_sequential_indices() {
        let mut global = SymbolTable::new();
        assert_eq!(global.define("a"), symbol("a", SymbolScope::Global, 0));
        assert_eq!(global.define("b"), symbol("b", SymbolScope::Global, 1));

        let mut local = SymbolTable::enclosed(global);
        assert_eq!(local.define("c"), symbol("c", SymbolScope::Local, 0));
        assert_eq!(local.define("d"), symbol("d", SymbolScope::Local, 1));
    }

    #[test]
    fn resolve_global() {
        let mut global = SymbolTable::new();
        global.define("a");
        global.define("b");

        assert_eq!(
            global.resolve("a"),
            Some(symbol("a", SymbolScope::Global, 0))
        );
        assert_eq!(
            global.resolve("b"),
            Some(symbol("b", SymbolScope::Global, 1))
        );
        assert_eq!(global.resolve("c"), None);
    }

    #[test]
    fn resolve_local_and_outer_global() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut local = SymbolTable::enclosed(global);
        local.define("b");

        assert_eq!(local.resolve("a"), Some(symbol("a", SymbolScope::Global, 0)));
        assert_eq!(local.resolve("b"), Some(symbol("b", SymbolScope::Local, 0)));
    }

    #[test]
    fn resolve_promotes_outer_locals_to_free() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut first = SymbolTable::enclosed(global);
        first.define("c");

        let mut second = SymbolTable::enclosed(first);
        second.define("e");

        // c lives in the enclosing function: promoted to a free symbol.
        assert_eq!(second.resolve("c"), Some(symbol("c", SymbolScope::Free, 0)));
        assert_eq!(second.resolve("e"), Some(symbol("e", SymbolScope::Local, 0)));
        // Globals are never promoted.
        assert_eq!(
            second.resolve("a"),
            Some(symbol("a", SymbolScope::Global, 0))
        );
        // The captured original keeps its own scope and index.
        assert_eq!(
            second.free_symbols,
            vec![symbol("c", SymbolScope::Local, 0)]
        );
    }

    #[test]
    fn transitive_free_capture() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut outer_fn = SymbolTable::enclosed(global);
        outer_fn.define("b");

        let mid_fn = SymbolTable::enclosed(outer_fn);
        let mut inner_fn = SymbolTable::enclosed(mid_fn);

        // b is two function scopes up: the middle scope captures the
        // outer local, and the inner scope captures the middle scope's
        // free symbol.
        assert_eq!(
            inner_fn.resolve("b"),
            Some(symbol("b", SymbolScope::Free, 0))
        );
        assert_eq!(
            inner_fn.free_symbols,
            vec![symbol("b", SymbolScope::Free, 0)]
        );

        let mid_fn = inner_fn.take_outer().expect("outer scope");
        assert_eq!(
            mid_fn.free_symbols,
            vec![symbol("b", SymbolScope::Local, 0)]
        );
    }

    #[test]
    fn builtins_resolve_from_any_depth() {
        let mut global = SymbolTable::new();
        global.define_builtin(0, "len");

        let mut nested = SymbolTable::enclosed(SymbolTable::enclosed(global));
        assert_eq!(
            nested.resolve("len"),
            Some(symbol("len", SymbolScope::Builtin, 0))
        );
        assert!(nested.free_symbols.is_empty());
    }

    #[test]
    fn unresolvable_free_stays_unresolved() {
        let global = SymbolTable::new();
        let mut local = SymbolTable::enclosed(global);
        assert_eq!(local.resolve("missing"), None);
        assert!(local.free_symbols.is_empty());
    }
}
