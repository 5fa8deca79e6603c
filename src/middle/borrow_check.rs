use std::collections::HashMap;

use crate::error::CompilerError;
use crate::ir::instr::{Block, Instruction};
use crate::ir::value::Value;
use crate::ir::Module;
use crate::token::Token;

/// Move-semantics check for owned bindings.
///
/// Each function is scanned in one linear forward walk. Owned locals and
/// parameters are tracked per lexical lifetime; moving one into a loan
/// sink (a call argument, a return value, or a binding initializer) twice
/// reports `MovedValueError`. The `ref!` builtin borrows instead of
/// moving, and borrowers are unlimited - every borrow is immutable in
/// this model.
pub fn borrow_check(module: &Module) -> Vec<CompilerError> {
    let mut checker = BorrowChecker {
        lifetimes: Vec::new(),
        errors: Vec::new(),
    };

    for name in module.function_names() {
        if let Some(func) = module.functions.get(&name.value) {
            checker.check_func(func);
        }
    }

    checker.errors
}

#[derive(Debug, Default)]
struct OwnedBinding {
    /// Sinks this binding has been moved into.
    loans: Vec<String>,
    /// Holders of non-owning references via `ref!`.
    borrowers: Vec<String>,
}

struct BorrowChecker {
    lifetimes: Vec<HashMap<String, OwnedBinding>>,
    errors: Vec<CompilerError>,
}

impl BorrowChecker {
    fn error(&mut self, err: CompilerError) {
        self.errors.push(err);
    }

    fn push_lifetime(&mut self) {
        self.lifetimes.push(HashMap::new());
    }

    fn pop_lifetime(&mut self) {
        self.lifetimes.pop();
    }

    fn declare(&mut self, name: &str) {
        if let Some(top) = self.lifetimes.last_mut() {
            top.insert(name.to_string(), OwnedBinding::default());
        }
    }

    fn find_binding(&mut self, name: &str) -> Option<&mut OwnedBinding> {
        for lifetime in self.lifetimes.iter_mut().rev() {
            if let Some(binding) = lifetime.get_mut(name) {
                return Some(binding);
            }
        }
        None
    }

    fn check_func(&mut self, func: &crate::ir::Function) {
        self.push_lifetime();

        // parameters of an owned flavor live in the function's root
        // lifetime.
        for name in func.params.names() {
            if let Some(param) = func.params.get(&name) {
                if param.owned {
                    self.declare(&name);
                }
            }
        }

        self.visit_block_contents(&func.body);
        self.pop_lifetime();
    }

    fn visit_block(&mut self, block: &Block) {
        self.push_lifetime();
        self.visit_block_contents(block);
        self.pop_lifetime();
    }

    fn visit_block_contents(&mut self, block: &Block) {
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

    fn visit_instr(&mut self, instr: &Instruction) {
        match instr {
            Instruction::Local(local) => {
                if let Some(val) = &local.val {
                    self.visit_sink(val, &format!("binding '{}'", local.name.value));
                }
                if local.owned {
                    self.declare(&local.name.value);
                }
            }
            Instruction::Alloca(alloca) => {
                if let Some(val) = &alloca.val {
                    self.visit_sink(val, &format!("binding '{}'", alloca.name.value));
                }
                if alloca.owned {
                    self.declare(&alloca.name.value);
                }
            }
            Instruction::Return { val } => {
                if let Some(val) = val {
                    self.visit_sink(val, "return value");
                }
            }
            Instruction::Expression { value } => self.visit_expr(value),
            Instruction::Assign { lhand, rhand, .. } => {
                self.visit_expr(lhand);
                self.visit_expr(rhand);
            }
            Instruction::If(iff) => {
                self.visit_expr(&iff.cond);
                self.visit_block(&iff.true_block);
                for elif in &iff.else_ifs {
                    self.visit_expr(&elif.cond);
                    self.visit_block(&elif.body);
                }
                if let Some(else_block) = &iff.else_block {
                    self.visit_block(else_block);
                }
            }
            Instruction::WhileLoop { cond, post, body } => {
                self.visit_expr(cond);
                if let Some(post) = post {
                    self.visit_expr(post);
                }
                self.visit_block(body);
            }
            Instruction::Loop { body } => self.visit_block(body),
            Instruction::Block(block) => self.visit_block(block),
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

    /// Walks an expression in non-sink position, descending into calls
    /// whose argument positions are loan sinks.
    fn visit_expr(&mut self, value: &Value) {
        match value {
            Value::Call { left, params } => {
                let callee = describe_callee(left);
                self.visit_expr(left);
                for param in params {
                    self.visit_sink(param, &callee);
                }
            }
            Value::Builtin { name, args, .. } => {
                if name == "ref" {
                    for arg in args {
                        self.borrow(arg);
                    }
                } else {
                    for arg in args {
                        self.visit_expr(arg);
                    }
                }
            }
            Value::Grouping { value } => self.visit_expr(value),
            Value::Unary { value, .. } => self.visit_expr(value),
            Value::Binary { lhand, rhand, .. } => {
                self.visit_expr(lhand);
                self.visit_expr(rhand);
            }
            Value::Index { left, sub } => {
                self.visit_expr(left);
                self.visit_expr(sub);
            }
            Value::Assign { lhand, rhand, .. } => {
                self.visit_expr(lhand);
                self.visit_expr(rhand);
            }
            Value::Path { values } => {
                for val in values {
                    self.visit_expr(val);
                }
            }
            Value::Init { values, .. } => {
                for val in values {
                    self.visit_expr(val);
                }
            }
            Value::Identifier { .. }
            | Value::Integer { .. }
            | Value::Floating { .. }
            | Value::Str { .. }
            | Value::Char { .. } => {}
        }
    }

    /// Evaluates a value in loan-sink position: a bare owned identifier
    /// moves into `to`.
    fn visit_sink(&mut self, value: &Value, to: &str) {
        match value {
            Value::Identifier { name } => self.try_loan(name, to),
            Value::Grouping { value } => self.visit_sink(value, to),
            Value::Path { values } => {
                if let Some(Value::Identifier { name }) = values.first() {
                    self.try_loan(name, to);
                }
            }
            other => self.visit_expr(other),
        }
    }

    fn try_loan(&mut self, name: &Token, to: &str) {
        let mut moved = false;
        if let Some(binding) = self.find_binding(&name.value) {
            if binding.loans.is_empty() {
                binding.loans.push(to.to_string());
            } else {
                moved = true;
            }
        }
        if moved {
            self.error(CompilerError::moved_value(&name.value, vec![name.span]));
        }
    }

    fn borrow(&mut self, value: &Value) {
        match value {
            Value::Identifier { name } => {
                let name = name.value.clone();
                if let Some(binding) = self.find_binding(&name) {
                    binding.borrowers.push("ref".to_string());
                }
            }
            Value::Grouping { value } => self.borrow(value),
            other => self.visit_expr(other),
        }
    }
}

fn describe_callee(left: &Value) -> String {
    match left {
        Value::Identifier { name } => format!("call to '{}'", name.value),
        Value::Path { values } => values
            .last()
            .map(describe_callee)
            .unwrap_or_else(|| "call".to_string()),
        _ => "call".to_string(),
    }
}
