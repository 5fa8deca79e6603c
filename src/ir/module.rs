use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::instr::{Block, Local};
use super::types::Type;
use crate::token::Token;

/// An ordered map of named bindings. Insertion order is preserved from the
/// source, which structure field layout and deterministic emission depend
/// on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeDict {
    pub data: HashMap<String, Local>,
    pub order: Vec<Token>,
}

impl TypeDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, local: Local) {
        self.order.push(local.name.clone());
        self.data.insert(local.name.value.clone(), local);
    }

    pub fn get(&self, name: &str) -> Option<&Local> {
        self.data.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Local> {
        self.data.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Local> {
        self.order.iter().filter_map(|tok| self.data.get(&tok.value))
    }

    /// Binding names in insertion order, for callers that need to mutate
    /// entries one at a time.
    pub fn names(&self) -> Vec<String> {
        self.order.iter().map(|t| t.value.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub name: Token,
    pub fields: TypeDict,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub methods: HashMap<String, Function>,
    #[serde(rename = "methodOrder", default, skip_serializing_if = "Vec::is_empty")]
    pub method_order: Vec<Token>,
}

impl Structure {
    pub fn new(name: Token) -> Self {
        Structure {
            name,
            fields: TypeDict::new(),
            methods: HashMap::new(),
            method_order: Vec::new(),
        }
    }

    pub fn register_method(&mut self, func: Function) -> bool {
        if self.methods.contains_key(&func.name.value) {
            return false;
        }
        self.method_order.push(func.name.clone());
        self.methods.insert(func.name.value.clone(), func);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: Token,
    pub params: TypeDict,
    #[serde(rename = "returnType")]
    pub return_type: Type,
    pub body: Block,
}

/// A bundle of methods to be merged into the structure of the same name
/// during type resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impl {
    pub name: Token,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub methods: HashMap<String, Function>,
    #[serde(rename = "methodOrder", default, skip_serializing_if = "Vec::is_empty")]
    pub method_order: Vec<Token>,
}

impl Impl {
    pub fn new(name: Token) -> Self {
        Impl {
            name,
            methods: HashMap::new(),
            method_order: Vec::new(),
        }
    }

    pub fn register_method(&mut self, func: Function) -> bool {
        if self.methods.contains_key(&func.name.value) {
            return false;
        }
        self.method_order.push(func.name.clone());
        self.methods.insert(func.name.value.clone(), func);
        true
    }
}

/// A single krug source file lowered to IR: structures, functions and
/// impls in insertion order, plus a global block for module-level
/// declarations such as type aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub structures: HashMap<String, Structure>,
    #[serde(rename = "structureOrder", default)]
    pub structure_order: Vec<Token>,
    #[serde(default)]
    pub functions: HashMap<String, Function>,
    #[serde(rename = "functionOrder", default)]
    pub function_order: Vec<Token>,
    #[serde(default)]
    pub impls: HashMap<String, Impl>,
    #[serde(rename = "implOrder", default)]
    pub impl_order: Vec<Token>,
    pub global: Block,
}

impl Module {
    pub fn new(name: impl Into<String>, global: Block) -> Self {
        Module {
            name: name.into(),
            structures: HashMap::new(),
            structure_order: Vec::new(),
            functions: HashMap::new(),
            function_order: Vec::new(),
            impls: HashMap::new(),
            impl_order: Vec::new(),
            global,
        }
    }

    pub fn register_structure(&mut self, s: Structure) -> bool {
        if self.structures.contains_key(&s.name.value) {
            return false;
        }
        self.structure_order.push(s.name.clone());
        self.structures.insert(s.name.value.clone(), s);
        true
    }

    pub fn register_function(&mut self, f: Function) -> bool {
        if self.functions.contains_key(&f.name.value) {
            return false;
        }
        self.function_order.push(f.name.clone());
        self.functions.insert(f.name.value.clone(), f);
        true
    }

    /// Returns true when an impl with the same name was already registered.
    pub fn register_impl(&mut self, i: Impl) -> bool {
        if self.impls.contains_key(&i.name.value) {
            return true;
        }
        self.impl_order.push(i.name.clone());
        self.impls.insert(i.name.value.clone(), i);
        false
    }

    pub fn get_structure(&self, name: &str) -> Option<&Structure> {
        self.structures.get(name)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &Token> {
        self.function_order.iter()
    }
}
