use std::collections::HashSet;

use crate::error::CompilerError;
use crate::ir::instr::{Block, Instruction};
use crate::ir::sema::{ScopeDict, TypeMap};
use crate::ir::types::Type;
use crate::ir::Module;
use crate::token::Span;

/// The declare sub-pass: registers every binding's declared type into its
/// enclosing symbol table, substituting reference types that name a known
/// structure. Unresolved references stay in place and produce an error;
/// the resolve pass gets another look at them later.
pub fn decl_type(dict: &mut ScopeDict, module: &mut Module) -> (TypeMap, Vec<CompilerError>) {
    let struct_names: HashSet<String> = module.structures.keys().cloned().collect();

    let mut pass = DeclPass {
        dict,
        struct_names,
        errors: Vec::new(),
        tmap: TypeMap::new(),
        curr: None,
    };

    for name in module.structure_order.clone() {
        let stab = pass.dict.structures.get(&name.value).copied();
        if let (Some(structure), Some(stab)) = (module.structures.get_mut(&name.value), stab) {
            for field_name in structure.fields.names() {
                if let Some(field) = structure.fields.get_mut(&field_name) {
                    let span = field.name.span;
                    if let Some(t) = &mut field.type_node {
                        pass.substitute(t, span);
                        pass.register(stab, &field_name, t.clone());
                    }
                }
            }
        }
    }

    for name in module.function_order.clone() {
        let stab = pass.dict.functions.get(&name.value).copied();
        let Some(func) = module.functions.get_mut(&name.value) else {
            continue;
        };
        let Some(stab) = stab else { continue };
        pass.curr = Some(stab);

        for param_name in func.params.names() {
            if let Some(param) = func.params.get_mut(&param_name) {
                let span = param.name.span;
                if let Some(t) = &mut param.type_node {
                    pass.substitute(t, span);
                    pass.register(stab, &param_name, t.clone());
                }
            }
        }

        pass.substitute(&mut func.return_type, name.span);
        let ret = func.return_type.clone();
        pass.register(stab, &name.value, ret);

        pass.visit_block_contents(&mut func.body);
        pass.curr = None;
    }

    (pass.tmap, pass.errors)
}

struct DeclPass<'a> {
    dict: &'a mut ScopeDict,
    struct_names: HashSet<String>,
    errors: Vec<CompilerError>,
    tmap: TypeMap,
    curr: Option<usize>,
}

impl<'a> DeclPass<'a> {
    fn error(&mut self, err: CompilerError) {
        self.errors.push(err);
    }

    /// Swaps a reference type for the structure it names, when the module
    /// declares one.
    fn substitute(&mut self, t: &mut Type, span: Span) {
        if let Type::Reference { name } = t {
            if self.struct_names.contains(name.as_str()) {
                *t = Type::Structure { name: name.clone() };
            } else {
                let name = name.clone();
                self.error(CompilerError::unresolved_type(&name, vec![span]));
            }
        }
    }

    fn register(&mut self, stab: usize, name: &str, t: Type) {
        if let Some(table) = self.dict.arena.get_mut(stab) {
            table.register_type(name, t.clone());
        }
        self.tmap.insert(stab, name, t);
    }

    fn visit_block(&mut self, block: &mut Block) {
        let saved = self.curr;
        if let Some(id) = self.dict.scope_of_block(block.id) {
            self.curr = Some(id);
        }
        self.visit_block_contents(block);
        self.curr = saved;
    }

    fn visit_block_contents(&mut self, block: &mut Block) {
        for instr in &mut block.instr {
            self.visit_instr(instr);
        }
        for def in &mut block.defer_stack {
            if let Some(inner) = &mut def.block {
                self.visit_block(inner);
            }
        }
    }

    fn visit_instr(&mut self, instr: &mut Instruction) {
        match instr {
            Instruction::Local(local) => {
                let span = local.name.span;
                let name = local.name.value.clone();
                match &mut local.type_node {
                    Some(t) => {
                        self.substitute(t, span);
                        if let Some(curr) = self.curr {
                            let t = t.clone();
                            self.register(curr, &name, t);
                        }
                    }
                    None => {
                        self.error(CompilerError::unimplemented("type inference", vec![span]));
                    }
                }
            }
            Instruction::Alloca(alloca) => {
                let span = alloca.name.span;
                let name = alloca.name.value.clone();
                match &mut alloca.type_node {
                    Some(t) => {
                        self.substitute(t, span);
                        if let Some(curr) = self.curr {
                            let t = t.clone();
                            self.register(curr, &name, t);
                        }
                    }
                    None => {
                        self.error(CompilerError::unimplemented("type inference", vec![span]));
                    }
                }
            }

            Instruction::Block(block) => self.visit_block(block),
            Instruction::Loop { body } => self.visit_block(body),
            Instruction::WhileLoop { body, .. } => self.visit_block(body),
            Instruction::If(iff) => {
                self.visit_block(&mut iff.true_block);
                for elif in &mut iff.else_ifs {
                    self.visit_block(&mut elif.body);
                }
                if let Some(else_block) = &mut iff.else_block {
                    self.visit_block(else_block);
                }
            }
            Instruction::Defer(def) => {
                if let Some(stat) = &mut def.stat {
                    self.visit_instr(stat);
                }
                if let Some(inner) = &mut def.block {
                    self.visit_block(inner);
                }
            }
            Instruction::TypeAlias(alias) => {
                let span = alias.name.span;
                self.substitute(&mut alias.type_node, span);
            }

            Instruction::Assign { .. }
            | Instruction::Expression { .. }
            | Instruction::Return { .. }
            | Instruction::Label { .. }
            | Instruction::Jump { .. }
            | Instruction::Next
            | Instruction::Break => {}
        }
    }
}
