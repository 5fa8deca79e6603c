use std::collections::HashSet;

use crate::error::CompilerError;
use crate::ir::instr::{Block, Instruction};
use crate::ir::module::{Function, Module};
use crate::ir::types::Type;
use crate::token::Span;

/// The resolve sub-pass: normalizes every type reachable from the module.
/// Primitives pass through, references become structures (or diagnostics),
/// compound types resolve element-wise. Impl method bundles are merged
/// into their named structure here. Resolution is idempotent.
pub fn type_resolve(module: &mut Module) -> Vec<CompilerError> {
    let mut pass = ResolvePass {
        struct_names: module.structures.keys().cloned().collect(),
        errors: Vec::new(),
    };

    // merge impls into their structures first so methods resolve with
    // everything else.
    for impl_name in module.impl_order.clone() {
        if !pass.struct_names.contains(&impl_name.value) {
            pass.errors.push(CompilerError {
                title: format!(
                    "Couldn't resolve structure '{}' being implemented",
                    impl_name.value
                ),
                desc: String::new(),
                fatal: false,
                spans: vec![impl_name.span],
            });
            continue;
        }

        let methods: Vec<Function> = module
            .impls
            .get(&impl_name.value)
            .map(|imp| {
                imp.method_order
                    .iter()
                    .filter_map(|tok| imp.methods.get(&tok.value).cloned())
                    .collect()
            })
            .unwrap_or_default();

        if let Some(structure) = module.structures.get_mut(&impl_name.value) {
            for mut method in methods {
                pass.resolve_func(&mut method);
                structure.register_method(method);
            }
        }
    }

    for name in module.structure_order.clone() {
        if let Some(structure) = module.structures.get_mut(&name.value) {
            for field_name in structure.fields.names() {
                if let Some(field) = structure.fields.get_mut(&field_name) {
                    let span = field.name.span;
                    if let Some(t) = &mut field.type_node {
                        pass.resolve_type(t, span);
                    }
                }
            }

            let method_names: Vec<String> =
                structure.methods.keys().cloned().collect();
            for method_name in method_names {
                if let Some(method) = structure.methods.get_mut(&method_name) {
                    pass.resolve_func(method);
                }
            }
        }
    }

    for name in module.function_order.clone() {
        if let Some(func) = module.functions.get_mut(&name.value) {
            pass.resolve_func(func);
        }
    }

    for instr in &mut module.global.instr {
        if let Instruction::TypeAlias(alias) = instr {
            let span = alias.name.span;
            pass.resolve_type(&mut alias.type_node, span);
        }
    }

    pass.errors
}

struct ResolvePass {
    struct_names: HashSet<String>,
    errors: Vec<CompilerError>,
}

impl ResolvePass {
    fn error(&mut self, err: CompilerError) {
        self.errors.push(err);
    }

    fn resolve_type(&mut self, t: &mut Type, span: Span) {
        match t {
            Type::Reference { name } => {
                if self.struct_names.contains(name.as_str()) {
                    *t = Type::Structure { name: name.clone() };
                } else {
                    let name = name.clone();
                    self.error(CompilerError::unresolved_type(&name, vec![span]));
                }
            }
            Type::Pointer { base } => self.resolve_type(base, span),
            Type::Array { base, .. } => self.resolve_type(base, span),
            Type::Tuple { types } => {
                for elem in types {
                    self.resolve_type(elem, span);
                }
            }
            Type::Function { params, ret } => {
                for param in params {
                    self.resolve_type(param, span);
                }
                self.resolve_type(ret, span);
            }
            Type::Void | Type::Integer { .. } | Type::Float { .. } | Type::Structure { .. } => {}
        }
    }

    fn resolve_func(&mut self, func: &mut Function) {
        for param_name in func.params.names() {
            if let Some(param) = func.params.get_mut(&param_name) {
                let span = param.name.span;
                if let Some(t) = &mut param.type_node {
                    self.resolve_type(t, span);
                }
            }
        }

        let span = func.name.span;
        self.resolve_type(&mut func.return_type, span);
        self.resolve_block(&mut func.body);
    }

    fn resolve_block(&mut self, block: &mut Block) {
        for instr in &mut block.instr {
            self.resolve_instr(instr);
        }
        for def in &mut block.defer_stack {
            if let Some(stat) = &mut def.stat {
                self.resolve_instr(stat);
            }
            if let Some(inner) = &mut def.block {
                self.resolve_block(inner);
            }
        }
    }

    fn resolve_instr(&mut self, instr: &mut Instruction) {
        match instr {
            Instruction::Local(local) => {
                let span = local.name.span;
                if let Some(t) = &mut local.type_node {
                    self.resolve_type(t, span);
                }
            }
            Instruction::Alloca(alloca) => {
                let span = alloca.name.span;
                if let Some(t) = &mut alloca.type_node {
                    self.resolve_type(t, span);
                }
            }
            Instruction::Block(block) => self.resolve_block(block),
            Instruction::Loop { body } => self.resolve_block(body),
            Instruction::WhileLoop { body, .. } => self.resolve_block(body),
            Instruction::If(iff) => {
                self.resolve_block(&mut iff.true_block);
                for elif in &mut iff.else_ifs {
                    self.resolve_block(&mut elif.body);
                }
                if let Some(else_block) = &mut iff.else_block {
                    self.resolve_block(else_block);
                }
            }
            Instruction::Defer(def) => {
                if let Some(stat) = &mut def.stat {
                    self.resolve_instr(stat);
                }
                if let Some(inner) = &mut def.block {
                    self.resolve_block(inner);
                }
            }
            Instruction::TypeAlias(alias) => {
                let span = alias.name.span;
                self.resolve_type(&mut alias.type_node, span);
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
    fn references_resolve_to_structures() {
        let mut module = module_for("struct P { x int, } fn f(a P) void { let b P = {1}; }");
        let errs = type_resolve(&mut module);
        assert!(errs.is_empty(), "resolve errors: {:?}", errs);

        let param = module.functions["f"].params.get("a").unwrap();
        assert_eq!(
            param.type_node,
            Some(Type::Structure { name: "P".into() })
        );
    }

    #[test]
    fn pointer_and_array_bases_resolve_elementwise() {
        let mut module = module_for("struct P { x int, } fn f(a ^P, b [P; 4]) void { }");
        let errs = type_resolve(&mut module);
        assert!(errs.is_empty(), "resolve errors: {:?}", errs);

        let a = module.functions["f"].params.get("a").unwrap();
        match a.type_node.as_ref().unwrap() {
            Type::Pointer { base } => {
                assert_eq!(**base, Type::Structure { name: "P".into() });
            }
            other => panic!("expected pointer, got {:?}", other),
        }
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let mut module = module_for("fn f(a Ghost) void { }");
        let errs = type_resolve(&mut module);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].title.contains("Ghost"));
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut module = module_for("struct P { x int, } fn f(a P) void { }");
        assert!(type_resolve(&mut module).is_empty());
        let first = module.clone();
        assert!(type_resolve(&mut module).is_empty());
        assert_eq!(module, first);
    }

    #[test]
    fn impl_methods_merge_into_their_structure() {
        let mut module = module_for(
            "struct P { x int, } impl P { fn get_x(self ^P) int { return 0; } }",
        );
        let errs = type_resolve(&mut module);
        assert!(errs.is_empty(), "resolve errors: {:?}", errs);
        assert!(module.structures["P"].methods.contains_key("get_x"));
    }

    #[test]
    fn impl_without_structure_is_reported() {
        let mut module = module_for("impl Ghost { fn m() void { } }");
        let errs = type_resolve(&mut module);
        assert!(errs
            .iter()
            .any(|e| e.title.contains("being implemented")));
    }

    #[test]
    fn merged_methods_resolve_idempotently() {
        let mut module = module_for("struct P { x int, } impl P { fn m(self ^P) void { } }");
        assert!(type_resolve(&mut module).is_empty());
        let count = module.structures["P"].methods.len();
        assert!(type_resolve(&mut module).is_empty());
        // re-registering the same method is a no-op.
        assert_eq!(module.structures["P"].methods.len(), count);
    }
}
