use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::stab::StabArena;
use super::types::Type;

/// Per-module index from function and structure names to their root
/// symbol tables. Purely about symbols; type information lives in the
/// [`TypeMap`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeMap {
    pub functions: HashMap<String, usize>,
    pub structures: HashMap<String, usize>,
    pub arena: StabArena,
}

impl ScopeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_function(&mut self, name: &str, stab: usize) -> bool {
        if self.functions.contains_key(name) {
            return false;
        }
        self.functions.insert(name.to_string(), stab);
        true
    }

    pub fn register_structure(&mut self, name: &str, stab: usize) -> bool {
        if self.structures.contains_key(name) {
            return false;
        }
        self.structures.insert(name.to_string(), stab);
        true
    }
}

/// A [`ScopeMap`] plus a precomputed index from block ids to symbol
/// tables, for the passes that walk the IR and need to recover a scope
/// from a block handle alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeDict {
    pub functions: HashMap<String, usize>,
    pub structures: HashMap<String, usize>,
    pub blocks: HashMap<u64, usize>,
    pub arena: StabArena,
}

impl ScopeDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, block_id: u64, stab: usize) {
        self.blocks.insert(block_id, stab);
    }

    pub fn scope_of_block(&self, block_id: u64) -> Option<usize> {
        self.blocks.get(&block_id).copied()
    }
}

/// Declared types keyed by `"<stab-id>:<binding-name>"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeMap {
    pub data: HashMap<String, Type>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(stab: usize, name: &str) -> String {
        format!("{}:{}", stab, name)
    }

    pub fn insert(&mut self, stab: usize, name: &str, t: Type) {
        self.data.insert(Self::key(stab, name), t);
    }

    pub fn get(&self, stab: usize, name: &str) -> Option<&Type> {
        self.data.get(&Self::key(stab, name))
    }
}
