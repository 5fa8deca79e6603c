use std::collections::HashMap;

use crate::error::CompilerError;
use crate::ir::instr::{Block, Instruction};
use crate::ir::module::{Function, Module, Structure};
use crate::ir::sema::{ScopeDict, ScopeMap};
use crate::ir::stab::{StabArena, Symbol, SymbolValue};

/// Builds the scope map: every function and structure gets a root symbol
/// table with its parameters or fields pre-registered, and every nested
/// block pushes a child table.
pub fn build_scope(module: &mut Module) -> (ScopeMap, Vec<CompilerError>) {
    let (dict, errs) = build_scope_dict(module);
    (
        ScopeMap {
            functions: dict.functions,
            structures: dict.structures,
            arena: dict.arena,
        },
        errs,
    )
}

/// Builds the scope dict: the scope map plus a block-id index, so later
/// passes can recover a scope given only an IR block.
pub fn build_scope_dict(module: &mut Module) -> (ScopeDict, Vec<CompilerError>) {
    let mut builder = ScopeBuilder {
        arena: StabArena::new(),
        curr: None,
        errs: Vec::new(),
        blocks: HashMap::new(),
    };

    let mut dict = ScopeDict::new();

    for name in module.structure_order.clone() {
        if let Some(structure) = module.structures.get(&name.value) {
            let stab = builder.visit_structure(structure);
            if !dict_register_structure(&mut dict, &name.value, stab) {
                builder.errs.push(CompilerError::symbol(&name.value, vec![name.span]));
            }
        }
    }

    for name in module.function_order.clone() {
        if let Some(func) = module.functions.get_mut(&name.value) {
            let stab = builder.visit_func(func);
            if !dict_register_function(&mut dict, &name.value, stab) {
                builder.errs.push(CompilerError::symbol(&name.value, vec![name.span]));
            }
        }
    }

    dict.blocks = builder.blocks;
    dict.arena = builder.arena;
    (dict, builder.errs)
}

fn dict_register_function(dict: &mut ScopeDict, name: &str, stab: usize) -> bool {
    if dict.functions.contains_key(name) {
        return false;
    }
    dict.functions.insert(name.to_string(), stab);
    true
}

fn dict_register_structure(dict: &mut ScopeDict, name: &str, stab: usize) -> bool {
    if dict.structures.contains_key(name) {
        return false;
    }
    dict.structures.insert(name.to_string(), stab);
    true
}

struct ScopeBuilder {
    arena: StabArena,
    curr: Option<usize>,
    errs: Vec<CompilerError>,
    blocks: HashMap<u64, usize>,
}

impl ScopeBuilder {
    fn error(&mut self, err: CompilerError) {
        self.errs.push(err);
    }

    fn push_stab(&mut self) -> usize {
        let id = self.arena.alloc(self.curr);
        self.curr = Some(id);
        id
    }

    fn pop_stab(&mut self) {
        self.curr = self
            .curr
            .and_then(|id| self.arena.get(id))
            .and_then(|t| t.outer);
    }

    fn register(&mut self, symbol: Symbol) {
        let name = symbol.name.clone();
        let Some(curr) = self.curr else {
            return;
        };
        let ok = self
            .arena
            .get_mut(curr)
            .map(|t| t.register(&name.value, SymbolValue::Symbol(symbol)))
            .unwrap_or(false);
        if !ok {
            self.error(CompilerError::symbol(&name.value, vec![name.span]));
        }
    }

    fn visit_block(&mut self, block: &mut Block) -> usize {
        let id = self.push_stab();
        block.stab = Some(id);
        self.blocks.insert(block.id, id);

        self.visit_block_contents(block);

        self.pop_stab();
        id
    }

    fn visit_block_contents(&mut self, block: &mut Block) {
        for instr in &mut block.instr {
            self.visit_instr(instr);
        }
        // deferred blocks run inside the owning block's scope; they still
        // get their own tables for the bindings they introduce.
        for def in &mut block.defer_stack {
            if let Some(inner) = &mut def.block {
                self.visit_block(inner);
            }
        }
    }

    fn visit_instr(&mut self, instr: &mut Instruction) {
        match instr {
            Instruction::Local(local) => {
                self.register(Symbol::new(local.name.clone(), local.owned, local.mutable));
            }
            Instruction::Alloca(alloca) => {
                self.register(Symbol::new(
                    alloca.name.clone(),
                    alloca.owned,
                    alloca.mutable,
                ));
            }

            Instruction::If(iff) => {
                self.visit_block(&mut iff.true_block);
                for elif in &mut iff.else_ifs {
                    self.visit_block(&mut elif.body);
                }
                if let Some(else_block) = &mut iff.else_block {
                    self.visit_block(else_block);
                }
            }
            Instruction::WhileLoop { body, .. } => {
                self.visit_block(body);
            }
            Instruction::Loop { body } => {
                self.visit_block(body);
            }
            Instruction::Block(block) => {
                self.visit_block(block);
            }
            Instruction::Defer(def) => {
                if let Some(inner) = &mut def.block {
                    self.visit_block(inner);
                }
            }

            Instruction::Assign { .. }
            | Instruction::Expression { .. }
            | Instruction::Return { .. }
            | Instruction::Label { .. }
            | Instruction::Jump { .. }
            | Instruction::Next
            | Instruction::Break
            | Instruction::TypeAlias(_) => {}
        }
    }

    fn visit_func(&mut self, func: &mut Function) -> usize {
        // function roots hang off nothing; reset the chain.
        self.curr = None;
        let root = self.push_stab();
        func.body.stab = Some(root);
        self.blocks.insert(func.body.id, root);

        // introduce params into the function scope.
        for name in func.params.names() {
            if let Some(param) = func.params.get(&name) {
                let symbol = Symbol::new(param.name.clone(), param.owned, param.mutable);
                self.register(symbol);
            }
        }

        // the body shares the root table, so walk its contents directly.
        self.visit_block_contents(&mut func.body);

        self.pop_stab();
        root
    }

    fn visit_structure(&mut self, structure: &Structure) -> usize {
        self.curr = None;
        let stab = self.push_stab();

        for field in structure.fields.iter() {
            // structure fields are mutable and do not own their memory.
            self.register(Symbol::new(field.name.clone(), false, true));
        }

        self.pop_stab();
        stab
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::build;
    use crate::lexer::tokenize;
    use crate::parser::parse_token_stream;

    fn module_for(src: &str) -> Module {
        let (toks, errs) = tokenize(src, true);
        assert!(errs.is_empty());
        let (nodes, errs) = parse_token_stream(&toks);
        assert!(errs.is_empty(), "parse errors: {:?}", errs);
        let (module, errs) = build(&[nodes]);
        assert!(errs.is_empty(), "build errors: {:?}", errs);
        module
    }

    #[test]
    fn params_are_registered_in_the_function_root() {
        let mut module = module_for("fn f(a int, b f64) void { }");
        let (scope, errs) = build_scope(&mut module);
        assert!(errs.is_empty());

        let root = scope.functions["f"];
        assert!(scope.arena.lookup(root, "a").is_some());
        assert!(scope.arena.lookup(root, "b").is_some());
    }

    #[test]
    fn structure_fields_are_registered() {
        let mut module = module_for("struct P { x int, y int, }");
        let (scope, errs) = build_scope(&mut module);
        assert!(errs.is_empty());

        let stab = scope.structures["P"];
        assert!(scope.arena.lookup(stab, "x").is_some());
        assert!(scope.arena.lookup(stab, "y").is_some());
    }

    #[test]
    fn duplicate_binding_in_one_block_is_a_symbol_error() {
        let mut module = module_for("fn f() void { let x = 5; mut x = 6; }");
        let (_, errs) = build_scope(&mut module);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].title.contains("'x'"));
        assert!(errs[0].title.contains("already exists"));
    }

    #[test]
    fn duplicate_error_span_points_at_second_occurrence() {
        let src = "fn f() void { let x = 5; mut x = 6; }";
        let mut module = module_for(src);
        let (_, errs) = build_scope(&mut module);
        let span = errs[0].spans[0];
        // the second `x`
        assert_eq!(&src[span.start..span.end], "x");
        assert!(span.start > src.find('x').unwrap());
    }

    #[test]
    fn shadowing_in_a_nested_block_is_allowed() {
        let mut module = module_for("fn f() void { let x = 1; { let x = 2; } }");
        let (_, errs) = build_scope(&mut module);
        assert!(errs.is_empty());
    }

    #[test]
    fn scope_dict_covers_every_block_id() {
        let mut module =
            module_for("fn f() void { if a { } else { } while b { { } } loop { } } fn g() void { }");
        let (dict, _) = build_scope_dict(&mut module);

        fn check(block: &Block, dict: &ScopeDict) {
            assert!(
                dict.scope_of_block(block.id).is_some(),
                "block {} missing from scope dict",
                block.id
            );
            for i in &block.instr {
                match i {
                    Instruction::Block(b) => check(b, dict),
                    Instruction::Loop { body } => check(body, dict),
                    Instruction::WhileLoop { body, .. } => check(body, dict),
                    Instruction::If(iff) => {
                        check(&iff.true_block, dict);
                        for e in &iff.else_ifs {
                            check(&e.body, dict);
                        }
                        if let Some(e) = &iff.else_block {
                            check(e, dict);
                        }
                    }
                    _ => {}
                }
            }
        }
        for f in module.functions.values() {
            check(&f.body, &dict);
        }
    }

    #[test]
    fn blocks_attach_their_stab_ids() {
        let mut module = module_for("fn f() void { { let y = 1; } }");
        let (dict, _) = build_scope_dict(&mut module);
        let body = &module.functions["f"].body;
        assert_eq!(body.stab, Some(dict.functions["f"]));
        match &body.instr[0] {
            Instruction::Block(inner) => {
                assert!(inner.stab.is_some());
                assert_ne!(inner.stab, body.stab);
            }
            other => panic!("expected block, got {:?}", other),
        }
    }
}
