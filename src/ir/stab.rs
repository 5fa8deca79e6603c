use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::Type;
use crate::token::Token;

/// A leaf entry in a symbol table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: Token,
    pub owned: bool,
    pub mutable: bool,
}

impl Symbol {
    pub fn new(name: Token, owned: bool, mutable: bool) -> Self {
        Symbol {
            name,
            owned,
            mutable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SymbolValue {
    #[serde(rename = "symbol")]
    Symbol(Symbol),

    /// A nested table, referenced by arena id.
    #[serde(rename = "table")]
    Table { id: usize },
}

/// One scope node. Tables link up and down through arena ids rather than
/// pointers; the arena owns every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inner: Vec<usize>,
    #[serde(default)]
    pub types: HashMap<String, Type>,
    #[serde(default)]
    pub symbols: HashMap<String, SymbolValue>,
    #[serde(rename = "symbolSet", default)]
    pub symbol_set: Vec<String>,
}

impl SymbolTable {
    fn new(id: usize, outer: Option<usize>) -> Self {
        SymbolTable {
            id,
            outer,
            inner: Vec::new(),
            types: HashMap::new(),
            symbols: HashMap::new(),
            symbol_set: Vec::new(),
        }
    }

    /// Registers a symbol in this table. Returns false if the name is
    /// already taken in this scope.
    pub fn register(&mut self, name: &str, sym: SymbolValue) -> bool {
        if self.symbols.contains_key(name) {
            return false;
        }
        self.symbol_set.push(name.to_string());
        self.symbols.insert(name.to_string(), sym);
        true
    }

    pub fn register_type(&mut self, name: &str, t: Type) {
        self.types.insert(name.to_string(), t);
    }

    pub fn lookup_local(&self, name: &str) -> Option<&SymbolValue> {
        self.symbols.get(name)
    }
}

/// Arena of symbol tables with integer handles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StabArena {
    pub tables: Vec<SymbolTable>,
}

impl StabArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, outer: Option<usize>) -> usize {
        let id = self.tables.len();
        self.tables.push(SymbolTable::new(id, outer));
        if let Some(outer_id) = outer {
            if let Some(parent) = self.tables.get_mut(outer_id) {
                parent.inner.push(id);
            }
        }
        id
    }

    pub fn get(&self, id: usize) -> Option<&SymbolTable> {
        self.tables.get(id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut SymbolTable> {
        self.tables.get_mut(id)
    }

    /// Looks up `name` starting at `from` and walking the outer chain.
    pub fn lookup(&self, from: usize, name: &str) -> Option<&SymbolValue> {
        let mut curr = Some(from);
        while let Some(id) = curr {
            let table = self.tables.get(id)?;
            if let Some(sym) = table.symbols.get(name) {
                return Some(sym);
            }
            curr = table.outer;
        }
        None
    }

    /// Looks up a registered type for `name` walking the outer chain.
    pub fn lookup_type(&self, from: usize, name: &str) -> Option<&Type> {
        let mut curr = Some(from);
        while let Some(id) = curr {
            let table = self.tables.get(id)?;
            if let Some(t) = table.types.get(name) {
                return Some(t);
            }
            curr = table.outer;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Span, TokenKind};

    fn sym(name: &str, mutable: bool) -> SymbolValue {
        SymbolValue::Symbol(Symbol::new(
            Token::new(name, TokenKind::Iden, Span::default()),
            false,
            mutable,
        ))
    }

    #[test]
    fn register_rejects_duplicates_in_one_scope() {
        let mut arena = StabArena::new();
        let id = arena.alloc(None);
        let table = arena.get_mut(id).unwrap();
        assert!(table.register("x", sym("x", false)));
        assert!(!table.register("x", sym("x", true)));
    }

    #[test]
    fn lookup_walks_the_outer_chain() {
        let mut arena = StabArena::new();
        let root = arena.alloc(None);
        let inner = arena.alloc(Some(root));

        arena.get_mut(root).unwrap().register("outer_sym", sym("outer_sym", true));
        arena.get_mut(inner).unwrap().register("inner_sym", sym("inner_sym", false));

        assert!(arena.lookup(inner, "inner_sym").is_some());
        assert!(arena.lookup(inner, "outer_sym").is_some());
        assert!(arena.lookup(root, "inner_sym").is_none());
    }

    #[test]
    fn alloc_wires_parent_and_child_links() {
        let mut arena = StabArena::new();
        let root = arena.alloc(None);
        let a = arena.alloc(Some(root));
        let b = arena.alloc(Some(root));

        assert_eq!(arena.get(root).unwrap().inner, vec![a, b]);
        assert_eq!(arena.get(a).unwrap().outer, Some(root));
        assert_eq!(arena.get(b).unwrap().outer, Some(root));
    }

    #[test]
    fn shadowing_resolves_to_the_innermost_table() {
        let mut arena = StabArena::new();
        let root = arena.alloc(None);
        let inner = arena.alloc(Some(root));

        arena.get_mut(root).unwrap().register("x", sym("x", false));
        arena.get_mut(inner).unwrap().register("x", sym("x", true));

        match arena.lookup(inner, "x") {
            Some(SymbolValue::Symbol(s)) => assert!(s.mutable),
            other => panic!("expected symbol, got {:?}", other),
        }
    }
}
