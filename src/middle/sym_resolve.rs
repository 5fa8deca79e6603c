use crate::error::CompilerError;
use crate::ir::instr::{Block, Instruction};
use crate::ir::sema::ScopeDict;
use crate::ir::types::Type;
use crate::ir::value::Value;
use crate::ir::Module;
use crate::token::Token;

/// Checks that every identifier used in an expression resolves: plain
/// names walk the scope chain outward (then fall back to module functions
/// and structures), path expressions resolve stepwise against the type
/// produced by the prior element.
pub fn sym_resolve(module: &Module, dict: &ScopeDict) -> Vec<CompilerError> {
    let mut resolver = SymResolver {
        module,
        dict,
        errors: Vec::new(),
        curr: None,
    };

    for name in module.function_names() {
        if let Some(func) = module.functions.get(&name.value) {
            resolver.curr = dict.functions.get(&name.value).copied();
            resolver.visit_block(&func.body);
            resolver.curr = None;
        }
    }

    resolver.errors
}

struct SymResolver<'a> {
    module: &'a Module,
    dict: &'a ScopeDict,
    errors: Vec<CompilerError>,
    curr: Option<usize>,
}

impl<'a> SymResolver<'a> {
    fn error(&mut self, err: CompilerError) {
        self.errors.push(err);
    }

    fn visit_block(&mut self, block: &Block) {
        let saved = self.curr;
        if let Some(id) = self.dict.scope_of_block(block.id) {
            self.curr = Some(id);
        }

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

        self.curr = saved;
    }

    fn visit_instr(&mut self, instr: &Instruction) {
        match instr {
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
            Instruction::Expression { value } => self.visit_value(value),
            Instruction::Assign { lhand, rhand, .. } => {
                self.visit_value(lhand);
                self.visit_value(rhand);
            }
            Instruction::Return { val } => {
                if let Some(val) = val {
                    self.visit_value(val);
                }
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
            Instruction::WhileLoop { cond, post, body } => {
                self.visit_value(cond);
                if let Some(post) = post {
                    self.visit_value(post);
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

    fn visit_value(&mut self, value: &Value) {
        match value {
            Value::Identifier { name } => self.resolve_name(name),
            Value::Grouping { value } => self.visit_value(value),
            Value::Unary { value, .. } => self.visit_value(value),
            Value::Binary { lhand, rhand, .. } => {
                self.visit_value(lhand);
                self.visit_value(rhand);
            }
            Value::Call { left, params } => {
                // the callee and each argument resolve independently.
                self.visit_value(left);
                for param in params {
                    self.visit_value(param);
                }
            }
            Value::Index { left, sub } => {
                self.visit_value(left);
                self.visit_value(sub);
            }
            Value::Assign { lhand, rhand, .. } => {
                self.visit_value(lhand);
                self.visit_value(rhand);
            }
            Value::Path { values } => self.resolve_path(values),
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
            Value::Integer { .. }
            | Value::Floating { .. }
            | Value::Str { .. }
            | Value::Char { .. } => {}
        }
    }

    fn resolve_name(&mut self, name: &Token) {
        if self.is_resolvable(name) {
            return;
        }
        self.error(CompilerError::unresolved_symbol(
            &name.value,
            vec![name.span],
        ));
    }

    fn is_resolvable(&self, name: &Token) -> bool {
        if let Some(curr) = self.curr {
            if self.dict.arena.lookup(curr, &name.value).is_some() {
                return true;
            }
        }
        self.module.functions.contains_key(&name.value)
            || self.module.structures.contains_key(&name.value)
    }

    /// The head of a path resolves in the current scope; each subsequent
    /// element resolves relative to the type produced by the one before
    /// it. When the chain leaves typed territory the walk degrades to a
    /// best-effort visit.
    fn resolve_path(&mut self, values: &[Value]) {
        let module = self.module;
        let Some(head) = values.first() else {
            return;
        };

        let mut curr_type: Option<Type> = match head {
            Value::Identifier { name } => {
                self.resolve_name(name);
                self.curr
                    .and_then(|id| self.dict.arena.lookup_type(id, &name.value))
                    .cloned()
            }
            other => {
                self.visit_value(other);
                None
            }
        };

        for elem in &values[1..] {
            // pointers step through transparently.
            while let Some(Type::Pointer { base }) = curr_type {
                curr_type = Some(*base);
            }

            let struct_name = match &curr_type {
                Some(Type::Structure { name }) | Some(Type::Reference { name }) => {
                    Some(name.clone())
                }
                _ => None,
            };

            match elem {
                Value::Identifier { name } => {
                    match struct_name.as_ref().and_then(|s| module.structures.get(s)) {
                        Some(structure) => {
                            if let Some(field) = structure.fields.get(&name.value) {
                                curr_type = field.type_node.clone();
                            } else if structure.methods.contains_key(&name.value) {
                                curr_type = None;
                            } else {
                                self.error(CompilerError::unresolved_symbol(
                                    &name.value,
                                    vec![name.span],
                                ));
                                curr_type = None;
                            }
                        }
                        // untyped head: nothing to check against.
                        None => curr_type = None,
                    }
                }
                Value::Call { left, params } => {
                    if let Value::Identifier { name } = left.as_ref() {
                        if let Some(structure) =
                            struct_name.as_ref().and_then(|s| module.structures.get(s))
                        {
                            match structure.methods.get(&name.value) {
                                Some(method) => curr_type = Some(method.return_type.clone()),
                                None => {
                                    self.error(CompilerError::unresolved_symbol(
                                        &name.value,
                                        vec![name.span],
                                    ));
                                    curr_type = None;
                                }
                            }
                        } else {
                            curr_type = None;
                        }
                    } else {
                        self.visit_value(left);
                        curr_type = None;
                    }
                    for param in params {
                        self.visit_value(param);
                    }
                }
                other => {
                    self.visit_value(other);
                    curr_type = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::build;
    use crate::lexer::tokenize;
    use crate::middle::decl_type::decl_type;
    use crate::middle::scope::build_scope_dict;
    use crate::parser::parse_token_stream;

    fn resolve(src: &str) -> Vec<CompilerError> {
        let (toks, errs) = tokenize(src, true);
        assert!(errs.is_empty());
        let (nodes, errs) = parse_token_stream(&toks);
        assert!(errs.is_empty(), "parse errors: {:?}", errs);
        let (mut module, errs) = build(&[nodes]);
        assert!(errs.is_empty(), "build errors: {:?}", errs);
        let (mut dict, errs) = build_scope_dict(&mut module);
        assert!(errs.is_empty(), "scope errors: {:?}", errs);
        let (_, _) = decl_type(&mut dict, &mut module);
        sym_resolve(&module, &dict)
    }

    #[test]
    fn locals_and_params_resolve() {
        let errs = resolve("fn f(a int) int { let b = 1; return a + b; }");
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
    }

    #[test]
    fn unknown_identifier_is_reported() {
        let src = "fn f() int { return ghost; }";
        let errs = resolve(src);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].title.contains("ghost"));
        let span = errs[0].spans[0];
        assert_eq!(&src[span.start..span.end], "ghost");
    }

    #[test]
    fn function_names_resolve_as_callees() {
        let errs = resolve("fn g() void { } fn f() void { g(); }");
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
    }

    #[test]
    fn outer_scope_symbols_resolve_from_nested_blocks() {
        let errs = resolve("fn f() void { let x = 1; { let y = x; } }");
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
    }

    #[test]
    fn struct_field_paths_resolve_stepwise() {
        let errs = resolve(
            "struct P { age int, } fn f(p P) int { return p.age; }",
        );
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
    }

    #[test]
    fn unknown_struct_field_is_reported() {
        let errs = resolve(
            "struct P { age int, } fn f(p P) int { return p.height; }",
        );
        assert!(errs.iter().any(|e| e.title.contains("height")));
    }

    #[test]
    fn nested_field_chains_resolve() {
        let errs = resolve(
            "struct Inner { v int, } struct Outer { inner Inner, } \
             fn f(o Outer) int { return o.inner.v; }",
        );
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
    }

    #[test]
    fn call_arguments_resolve_independently() {
        let errs = resolve("fn g(a int) void { } fn f() void { g(missing); }");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].title.contains("missing"));
    }
}
