use crate::error::CompilerError;
use crate::ir::instr::{Block, Instruction};
use crate::ir::sema::ScopeDict;
use crate::ir::stab::SymbolValue;
use crate::ir::value::Value;
use crate::ir::Module;

/// Checks every assignment target: the ultimate bound name behind the LHS
/// (identifier, path head, deref target, or index base) must be a mutable
/// binding.
pub fn mut_check(module: &Module, dict: &ScopeDict) -> Vec<CompilerError> {
    let mut checker = MutChecker {
        dict,
        errors: Vec::new(),
    };

    for name in module.function_names() {
        if let Some(func) = module.functions.get(&name.value) {
            let scope = dict.functions.get(&name.value).copied();
            checker.visit_block(&func.body, scope);
        }
    }

    checker.errors
}

struct MutChecker<'a> {
    dict: &'a ScopeDict,
    errors: Vec<CompilerError>,
}

impl<'a> MutChecker<'a> {
    fn error(&mut self, err: CompilerError) {
        self.errors.push(err);
    }

    fn visit_block(&mut self, block: &Block, outer_scope: Option<usize>) {
        let scope = self.dict.scope_of_block(block.id).or(outer_scope);

        for instr in &block.instr {
            self.visit_instr(instr, scope);
        }
        for def in &block.defer_stack {
            if let Some(stat) = &def.stat {
                self.visit_instr(stat, scope);
            }
            if let Some(inner) = &def.block {
                self.visit_block(inner, scope);
            }
        }
        if let Some(ret) = &block.return_instr {
            self.visit_instr(ret, scope);
        }
    }

    fn visit_instr(&mut self, instr: &Instruction, scope: Option<usize>) {
        match instr {
            Instruction::Assign { lhand, rhand, .. } => {
                self.check_mutable(lhand, scope);
                self.visit_expr(rhand, scope);
            }
            Instruction::Expression { value } => self.visit_expr(value, scope),
            Instruction::Local(local) => {
                if let Some(val) = &local.val {
                    self.visit_expr(val, scope);
                }
            }
            Instruction::Alloca(alloca) => {
                if let Some(val) = &alloca.val {
                    self.visit_expr(val, scope);
                }
            }
            Instruction::Return { val } => {
                if let Some(val) = val {
                    self.visit_expr(val, scope);
                }
            }
            Instruction::If(iff) => {
                self.visit_expr(&iff.cond, scope);
                self.visit_block(&iff.true_block, scope);
                for elif in &iff.else_ifs {
                    self.visit_expr(&elif.cond, scope);
                    self.visit_block(&elif.body, scope);
                }
                if let Some(else_block) = &iff.else_block {
                    self.visit_block(else_block, scope);
                }
            }
            Instruction::WhileLoop { cond, post, body } => {
                self.visit_expr(cond, scope);
                // the step expression runs inside the loop body's scope.
                let body_scope = self.dict.scope_of_block(body.id).or(scope);
                if let Some(post) = post {
                    self.visit_expr(post, body_scope);
                }
                self.visit_block(body, scope);
            }
            Instruction::Loop { body } => self.visit_block(body, scope),
            Instruction::Block(block) => self.visit_block(block, scope),
            Instruction::Defer(def) => {
                if let Some(stat) = &def.stat {
                    self.visit_instr(stat, scope);
                }
                if let Some(inner) = &def.block {
                    self.visit_block(inner, scope);
                }
            }

            Instruction::Label { .. }
            | Instruction::Jump { .. }
            | Instruction::Next
            | Instruction::Break
            | Instruction::TypeAlias(_) => {}
        }
    }

    /// Walks an expression looking for embedded assignments.
    fn visit_expr(&mut self, value: &Value, scope: Option<usize>) {
        match value {
            Value::Assign { lhand, rhand, .. } => {
                self.check_mutable(lhand, scope);
                self.visit_expr(rhand, scope);
            }
            Value::Grouping { value } => self.visit_expr(value, scope),
            Value::Unary { value, .. } => self.visit_expr(value, scope),
            Value::Binary { lhand, rhand, .. } => {
                self.visit_expr(lhand, scope);
                self.visit_expr(rhand, scope);
            }
            Value::Call { left, params } => {
                self.visit_expr(left, scope);
                for param in params {
                    self.visit_expr(param, scope);
                }
            }
            Value::Index { left, sub } => {
                self.visit_expr(left, scope);
                self.visit_expr(sub, scope);
            }
            Value::Path { values } => {
                for val in values {
                    self.visit_expr(val, scope);
                }
            }
            Value::Builtin { args, .. } => {
                for arg in args {
                    self.visit_expr(arg, scope);
                }
            }
            Value::Init { values, .. } => {
                for val in values {
                    self.visit_expr(val, scope);
                }
            }
            Value::Identifier { .. }
            | Value::Integer { .. }
            | Value::Floating { .. }
            | Value::Str { .. }
            | Value::Char { .. } => {}
        }
    }

    /// Classifies the assignment target down to its bound name.
    fn check_mutable(&mut self, value: &Value, scope: Option<usize>) {
        match value {
            Value::Identifier { name } => {
                let Some(scope) = scope else { return };
                match self.dict.arena.lookup(scope, &name.value) {
                    Some(SymbolValue::Symbol(sym)) => {
                        if !sym.mutable {
                            self.error(CompilerError::mutability(&name.value, vec![name.span]));
                        }
                    }
                    // unresolved names are the symbol resolver's problem.
                    _ => {}
                }
            }
            // a path assignment mutates through its head binding.
            Value::Path { values } => {
                if let Some(head) = values.first() {
                    self.check_mutable(head, scope);
                }
            }
            Value::Unary { op, value } if op == "@" => self.check_mutable(value, scope),
            Value::Index { left, .. } => self.check_mutable(left, scope),
            Value::Grouping { value } => self.check_mutable(value, scope),
            _ => {}
        }
    }
}
