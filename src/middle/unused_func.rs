use std::collections::{HashMap, HashSet};

use crate::error::CompilerError;
use crate::ir::instr::{Block, Instruction};
use crate::ir::value::Value;
use crate::ir::Module;

/// Builds the module's call graph and reports every function that nothing
/// calls. `main` is exempt: it is invoked from outside the language.
pub fn unused_func(module: &Module) -> Vec<CompilerError> {
    let nodes: HashSet<String> = module.functions.keys().cloned().collect();

    let mut visitor = CallGraphVisitor {
        nodes: &nodes,
        in_edges: HashMap::new(),
        curr: String::new(),
    };

    for name in module.function_names() {
        if let Some(func) = module.functions.get(&name.value) {
            visitor.curr = name.value.clone();
            visitor.visit_block(&func.body);
        }
    }

    let mut errs = Vec::new();
    for name in module.function_names() {
        if name.value == "main" {
            continue;
        }
        let called = visitor
            .in_edges
            .get(&name.value)
            .map(|froms| !froms.is_empty())
            .unwrap_or(false);
        if !called {
            errs.push(CompilerError::unused_function(&name.value, vec![name.span]));
        }
    }
    errs
}

struct CallGraphVisitor<'a> {
    nodes: &'a HashSet<String>,
    /// edge `from -> to`, keyed by callee.
    in_edges: HashMap<String, Vec<String>>,
    curr: String,
}

impl<'a> CallGraphVisitor<'a> {
    fn resolve_call(&mut self, left: &Value, params: &[Value]) {
        if let Value::Identifier { name } = left {
            if self.nodes.contains(&name.value) {
                self.in_edges
                    .entry(name.value.clone())
                    .or_default()
                    .push(self.curr.clone());
            }
        } else {
            self.visit_value(left);
        }
        for param in params {
            self.visit_value(param);
        }
    }

    fn visit_value(&mut self, value: &Value) {
        match value {
            Value::Call { left, params } => self.resolve_call(left, params),
            Value::Binary { lhand, rhand, .. } => {
                self.visit_value(lhand);
                self.visit_value(rhand);
            }
            Value::Unary { value, .. } => self.visit_value(value),
            Value::Grouping { value } => self.visit_value(value),
            Value::Index { left, sub } => {
                self.visit_value(left);
                self.visit_value(sub);
            }
            Value::Assign { lhand, rhand, .. } => {
                self.visit_value(lhand);
                self.visit_value(rhand);
            }
            Value::Path { values } => {
                for val in values {
                    self.visit_value(val);
                }
            }
            Value::Builtin { args, .. } => {
                for arg in args {
                    self.visit_value(arg);
                }
            }
            Value::Init { values, .. } => {
                for val in values {
                    self.visit_value(val);
                }
            }
            // a bare reference to a function counts as a use: it may be
            // called through the binding later.
            Value::Identifier { name } => {
                if self.nodes.contains(&name.value) && name.value != self.curr {
                    self.in_edges
                        .entry(name.value.clone())
                        .or_default()
                        .push(self.curr.clone());
                }
            }
            Value::Integer { .. }
            | Value::Floating { .. }
            | Value::Str { .. }
            | Value::Char { .. } => {}
        }
    }

    fn visit_instr(&mut self, instr: &Instruction) {
        match instr {
            Instruction::Expression { value } => self.visit_value(value),
            Instruction::Local(local) => {
                if let Some(val) = &local.val {
                    self.visit_value(val);
                }
            }
            Instruction::Alloca(alloca) => {
                if let Some(val) = &alloca.val {
                    self.visit_value(val);
                }
            }
            Instruction::Assign { lhand, rhand, .. } => {
                self.visit_value(lhand);
                self.visit_value(rhand);
            }
            Instruction::Return { val } => {
                if let Some(val) = val {
                    self.visit_value(val);
                }
            }
            Instruction::Block(block) => self.visit_block(block),
            Instruction::Loop { body } => self.visit_block(body),
            Instruction::WhileLoop { cond, post, body } => {
                self.visit_value(cond);
                if let Some(post) = post {
                    self.visit_value(post);
                }
                self.visit_block(body);
            }
            Instruction::If(iff) => {
                self.visit_value(&iff.cond);
                self.visit_block(&iff.true_block);
                for elif in &iff.else_ifs {
                    self.visit_value(&elif.cond);
                    self.visit_block(&elif.body);
                }
                if let Some(else_block) = &iff.else_block {
                    self.visit_block(else_block);
                }
            }
            Instruction::Defer(def) => {
                if let Some(stat) = &def.stat {
                    self.visit_instr(stat);
                }
                if let Some(inner) = &def.block {
                    self.visit_block(inner);
                }
            }

            Instruction::Label { .. }
            | Instruction::Jump { .. }
            | Instruction::Next
            | Instruction::Break
            | Instruction::TypeAlias(_) => {}
        }
    }

    fn visit_block(&mut self, block: &Block) {
        for instr in &block.instr {
            self.visit_instr(instr);
        }
        for def in &block.defer_stack {
            if let Some(stat) = &def.stat {
                self.visit_instr(stat);
            }
            if let Some(inner) = &def.block {
                self.visit_block(inner);
            }
        }
        if let Some(ret) = &block.return_instr {
            self.visit_instr(ret);
        }
    }
}
