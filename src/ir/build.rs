use super::instr::{Alloca, Block, Defer, ElseIf, IfStatement, Instruction, Local, TypeAlias};
use super::module::{Function, Impl, Module, Structure, TypeDict};
use super::types::{Type, PRIMITIVES};
use super::value::Value;
use crate::ast::{
    ExpressionKind, ExpressionNode, FunctionPrototype, InitializerForm, StatementKind,
    StatementNode, TypeKind, TypeNode,
};
use crate::error::CompilerError;
use crate::token::{Span, Token, TokenKind};

/// Builds a single IR module from one parse tree per compilation unit.
pub fn build(trees: &[Vec<StatementNode>]) -> (Module, Vec<CompilerError>) {
    let mut builder = Builder {
        errors: Vec::new(),
        next_block: 0,
        lambda_count: 0,
        lifted: Vec::new(),
    };

    let global = builder.new_block();
    let mut module = Module::new("main", global);

    for tree in trees {
        builder.build_tree(&mut module, tree);
    }

    // lambdas lifted out of expression position become module functions.
    for func in std::mem::take(&mut builder.lifted) {
        if !module.register_function(func.clone()) {
            builder
                .errors
                .push(CompilerError::symbol(&func.name.value, vec![func.name.span]));
        }
    }

    (module, builder.errors)
}

struct Builder {
    errors: Vec<CompilerError>,
    next_block: u64,
    lambda_count: usize,
    lifted: Vec<Function>,
}

impl Builder {
    fn error(&mut self, err: CompilerError) {
        self.errors.push(err);
    }

    fn new_block(&mut self) -> Block {
        let block = Block::new(self.next_block);
        self.next_block += 1;
        block
    }

    // ------------------------------------------------------------------
    // types
    // ------------------------------------------------------------------

    fn build_type(&mut self, node: &TypeNode) -> Type {
        match &node.kind {
            TypeKind::Unresolved { name } => match PRIMITIVES.get(name.as_str()) {
                Some(t) => t.clone(),
                None => Type::reference(name.clone()),
            },
            TypeKind::Pointer { base } => Type::pointer(self.build_type(base)),
            TypeKind::Array { base, size } => {
                let base = self.build_type(base);
                let size = self.build_expr(size);
                Type::Array {
                    base: Box::new(base),
                    size: Box::new(size),
                }
            }
            TypeKind::Tuple { types } => Type::Tuple {
                types: types.iter().map(|t| self.build_type(t)).collect(),
            },
        }
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    fn build_expr(&mut self, node: &ExpressionNode) -> Value {
        match &node.kind {
            ExpressionKind::IntegerConst { value } => Value::Integer {
                value: value.clone(),
            },
            ExpressionKind::FloatingConst { value } => Value::Floating { value: *value },
            ExpressionKind::StringConst { value } => Value::Str {
                value: value.clone(),
            },
            ExpressionKind::CharConst { value } => Value::Char {
                value: value.clone(),
            },
            ExpressionKind::Variable { name } => Value::Identifier { name: name.clone() },
            ExpressionKind::Grouping { value } => Value::Grouping {
                value: Box::new(self.build_expr(value)),
            },
            ExpressionKind::Unary { op, value } => Value::Unary {
                op: op.clone(),
                value: Box::new(self.build_expr(value)),
            },
            ExpressionKind::Binary { lhand, op, rhand } => Value::Binary {
                lhand: Box::new(self.build_expr(lhand)),
                op: op.clone(),
                rhand: Box::new(self.build_expr(rhand)),
            },
            ExpressionKind::Call { left, params } => Value::Call {
                left: Box::new(self.build_expr(left)),
                params: params.iter().map(|p| self.build_expr(p)).collect(),
            },
            ExpressionKind::Index { left, value } => Value::Index {
                left: Box::new(self.build_expr(left)),
                sub: Box::new(self.build_expr(value)),
            },
            ExpressionKind::Path { values } => self.build_path(values),
            ExpressionKind::Assign { lhand, op, rhand } => Value::Assign {
                lhand: Box::new(self.build_expr(lhand)),
                op: op.clone(),
                rhand: Box::new(self.build_expr(rhand)),
            },
            ExpressionKind::Builtin {
                name,
                type_node,
                args,
            } => self.build_builtin(name, type_node.as_ref(), args),
            ExpressionKind::Initializer {
                form,
                lhand,
                values,
            } => Value::Init {
                form: *form,
                lhand: lhand.clone(),
                values: values.iter().map(|v| self.build_expr(v)).collect(),
            },
            ExpressionKind::Lambda { proto, body } => self.lift_lambda(proto, body, node.span),
        }
    }

    fn build_path(&mut self, values: &[ExpressionNode]) -> Value {
        let mut flat = Vec::with_capacity(values.len());
        for node in values {
            let val = self.build_expr(node);
            // nested paths are spliced into one flat list.
            if let Value::Path { values: nested } = val {
                flat.extend(nested);
            } else {
                flat.push(val);
            }
        }
        Value::Path { values: flat }
    }

    fn build_builtin(
        &mut self,
        name: &str,
        type_node: Option<&TypeNode>,
        args: &[ExpressionNode],
    ) -> Value {
        let mut type_node = type_node.map(|t| self.build_type(t));
        let mut values: Vec<Value> = args.iter().map(|a| self.build_expr(a)).collect();

        // `alloc!(Foo)` spells its subject type as the first argument; pull
        // it out so the emitter always finds the type in one place.
        if type_node.is_none() && matches!(name, "alloc" | "make" | "sizeof") {
            if let Some(Value::Identifier { name: first }) = values.first() {
                let t = match PRIMITIVES.get(first.value.as_str()) {
                    Some(t) => t.clone(),
                    None => Type::reference(first.value.clone()),
                };
                type_node = Some(t);
                values.remove(0);
            }
        }

        Value::Builtin {
            name: name.to_string(),
            type_node,
            args: values,
        }
    }

    /// Lambdas have no IR value form; they are lifted into module
    /// functions and referenced by their generated name.
    fn lift_lambda(
        &mut self,
        proto: &FunctionPrototype,
        body: &[StatementNode],
        span: Span,
    ) -> Value {
        let name = format!("__lambda_{}", self.lambda_count);
        self.lambda_count += 1;

        let mut lifted_proto = proto.clone();
        lifted_proto.name = Token::new(name.clone(), TokenKind::Iden, span);

        let func = self.build_func(&lifted_proto, body);
        self.lifted.push(func);

        Value::Identifier {
            name: Token::new(name, TokenKind::Iden, span),
        }
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn build_block(&mut self, stats: &[StatementNode]) -> Block {
        let mut block = self.new_block();
        for stat in stats {
            match &stat.kind {
                StatementKind::Return { value } => {
                    let val = value.as_ref().map(|v| self.build_expr(v));
                    block.set_return(Instruction::Return { val });
                }
                StatementKind::Defer {
                    stat: deferred,
                    block: deferred_block,
                } => {
                    let def = Defer {
                        stat: deferred
                            .as_ref()
                            .and_then(|s| self.build_stat(s))
                            .map(Box::new),
                        block: deferred_block.as_ref().map(|b| self.build_block(b)),
                    };
                    block.push_defer(def);
                }
                _ => {
                    if let Some(instr) = self.build_stat(stat) {
                        block.add_instr(instr);
                    }
                }
            }
        }
        block
    }

    fn build_stat(&mut self, stat: &StatementNode) -> Option<Instruction> {
        match &stat.kind {
            StatementKind::Let {
                name,
                type_node,
                value,
                owned,
            } => Some(self.build_binding(name, type_node.as_ref(), value.as_ref(), *owned, false, stat.span)),

            StatementKind::Mut {
                name,
                type_node,
                value,
                owned,
            } => Some(self.build_binding(name, type_node.as_ref(), value.as_ref(), *owned, true, stat.span)),

            StatementKind::Return { value } => {
                let val = value.as_ref().map(|v| self.build_expr(v));
                Some(Instruction::Return { val })
            }

            StatementKind::Break => Some(Instruction::Break),
            StatementKind::Next => Some(Instruction::Next),

            StatementKind::Block { statements } => {
                Some(Instruction::Block(self.build_block(statements)))
            }

            StatementKind::Expression { value } => match &value.kind {
                ExpressionKind::Assign { lhand, op, rhand } => Some(Instruction::Assign {
                    lhand: self.build_expr(lhand),
                    op: op.clone(),
                    rhand: self.build_expr(rhand),
                }),
                _ => Some(Instruction::Expression {
                    value: self.build_expr(value),
                }),
            },

            StatementKind::If {
                cond,
                block,
                else_ifs,
                else_block,
            } => {
                let cond = self.build_expr(cond);
                let true_block = self.build_block(block);
                let else_ifs = else_ifs
                    .iter()
                    .map(|e| ElseIf {
                        cond: self.build_expr(&e.cond),
                        body: self.build_block(&e.block),
                    })
                    .collect();
                let else_block = else_block.as_ref().map(|b| self.build_block(b));
                Some(Instruction::If(IfStatement {
                    cond,
                    true_block,
                    else_ifs,
                    else_block,
                }))
            }

            StatementKind::While { cond, post, block } => {
                let cond = self.build_expr(cond);
                let post = post.as_ref().map(|p| self.build_expr(p));
                let body = self.build_block(block);
                Some(Instruction::WhileLoop { cond, post, body })
            }

            StatementKind::Loop { block } => Some(Instruction::Loop {
                body: self.build_block(block),
            }),

            StatementKind::Defer {
                stat: deferred,
                block,
            } => Some(Instruction::Defer(Defer {
                stat: deferred
                    .as_ref()
                    .and_then(|s| self.build_stat(s))
                    .map(Box::new),
                block: block.as_ref().map(|b| self.build_block(b)),
            })),

            StatementKind::Label { name } => Some(Instruction::Label { name: name.clone() }),

            StatementKind::Jump { location } => Some(Instruction::Jump {
                location: location.clone(),
            }),

            StatementKind::TypeAlias { name, type_node } => {
                let type_node = self.build_type(type_node);
                Some(Instruction::TypeAlias(TypeAlias {
                    name: name.clone(),
                    type_node,
                }))
            }

            // declarations are handled by the tree walk, not here.
            StatementKind::Structure { .. }
            | StatementKind::Trait { .. }
            | StatementKind::Impl { .. }
            | StatementKind::Function { .. }
            | StatementKind::FunctionProto { .. } => None,
        }
    }

    /// Lowers `let`/`mut`. An `alloc!<T>` initializer without a count
    /// argument becomes a heap `Alloca` of `^T`; everything else is a
    /// `Local`. Missing annotations fall back to trivial inference.
    fn build_binding(
        &mut self,
        name: &Token,
        type_node: Option<&TypeNode>,
        value: Option<&ExpressionNode>,
        owned: bool,
        mutable: bool,
        span: Span,
    ) -> Instruction {
        let mut val = value.map(|v| self.build_expr(v));
        let mut declared = type_node.map(|t| self.build_type(t));

        // refine brace-literal initializers against the declared type.
        if let (Some(Value::Init { form, lhand, .. }), Some(decl)) = (val.as_mut(), declared.as_ref())
        {
            match decl {
                Type::Array { .. } => *form = InitializerForm::Array,
                Type::Tuple { .. } => *form = InitializerForm::Tuple,
                Type::Reference { name } | Type::Structure { name } => {
                    *form = InitializerForm::Struct;
                    *lhand = Some(Token::new(name.clone(), TokenKind::Iden, span));
                }
                _ => {}
            }
        }

        if let Some(Value::Builtin {
            name: builtin,
            type_node: Some(subject),
            args,
        }) = &val
        {
            if matches!(builtin.as_str(), "alloc" | "make") && args.is_empty() {
                let alloca_type = declared.take().unwrap_or_else(|| Type::pointer(subject.clone()));
                return Instruction::Alloca(Alloca {
                    name: name.clone(),
                    type_node: Some(alloca_type),
                    mutable,
                    owned,
                    val,
                });
            }
        }

        // a lambda initializer carries its own signature.
        let lambda_type = value.and_then(|v| match &v.kind {
            ExpressionKind::Lambda { proto, .. } => {
                let params = proto
                    .arguments
                    .iter()
                    .map(|a| self.build_type(&a.type_node))
                    .collect();
                let ret = proto
                    .return_type
                    .as_ref()
                    .map(|t| self.build_type(t))
                    .unwrap_or(Type::Void);
                Some(Type::Function {
                    params,
                    ret: Box::new(ret),
                })
            }
            _ => None,
        });

        let type_node = match declared.or(lambda_type) {
            Some(t) => Some(t),
            None => match val.as_ref().and_then(|v| v.inferred_type()) {
                Some(t) => Some(t),
                None => {
                    if val.is_some() {
                        self.error(CompilerError::unimplemented("type inference", vec![span]));
                    }
                    None
                }
            },
        };

        let mut local = Local::new(name.clone(), type_node, owned);
        local.mutable = mutable;
        local.val = val;
        Instruction::Local(local)
    }

    // ------------------------------------------------------------------
    // declarations
    // ------------------------------------------------------------------

    fn build_func(&mut self, proto: &FunctionPrototype, body: &[StatementNode]) -> Function {
        let mut params = TypeDict::new();
        for arg in &proto.arguments {
            let t = self.build_type(&arg.type_node);
            params.add(Local::new(arg.name.clone(), Some(t), arg.owned));
        }

        let return_type = match &proto.return_type {
            Some(t) => self.build_type(t),
            None => Type::Void,
        };

        Function {
            name: proto.name.clone(),
            params,
            return_type,
            body: self.build_block(body),
        }
    }

    fn build_tree(&mut self, module: &mut Module, nodes: &[StatementNode]) {
        // declare structures and impls before anything refers to them.
        for node in nodes {
            match &node.kind {
                StatementKind::Structure { name, .. } => {
                    if !module.register_structure(Structure::new(name.clone())) {
                        self.error(CompilerError::symbol(&name.value, vec![name.span]));
                    }
                }
                StatementKind::Impl { name, .. } => {
                    if module.register_impl(Impl::new(name.clone())) {
                        self.error(CompilerError {
                            title: format!("Duplicate implementation for '{}'", name.value),
                            desc: String::new(),
                            fatal: false,
                            spans: vec![name.span],
                        });
                    }
                }
                _ => {}
            }
        }

        // second pass over the structures to process the fields.
        for node in nodes {
            if let StatementKind::Structure { name, fields } = &node.kind {
                let mut built = Vec::with_capacity(fields.len());
                for field in fields {
                    let t = self.build_type(&field.type_node);
                    // structure fields are mutable and never own memory.
                    let mut local = Local::new(field.name.clone(), Some(t), false);
                    local.mutable = true;
                    built.push(local);
                }

                if let Some(structure) = module.structures.get_mut(&name.value) {
                    for local in built {
                        if structure.fields.contains(&local.name.value) {
                            self.errors
                                .push(CompilerError::symbol(&local.name.value, vec![local.name.span]));
                            continue;
                        }
                        structure.fields.add(local);
                    }
                }
            }
        }

        for node in nodes {
            if let StatementKind::Impl { name, functions } = &node.kind {
                let mut built = Vec::with_capacity(functions.len());
                for func in functions {
                    built.push(self.build_func(&func.proto, &func.body));
                }

                if let Some(imp) = module.impls.get_mut(&name.value) {
                    let mut duplicates = Vec::new();
                    for method in built {
                        let method_name = method.name.clone();
                        if !imp.register_method(method) {
                            duplicates.push(method_name);
                        }
                    }
                    for dup in duplicates {
                        self.error(CompilerError::symbol(&dup.value, vec![dup.span]));
                    }
                }
            }
        }

        // then we do all the functions, plus module-level declarations
        // that live in the global block.
        for node in nodes {
            match &node.kind {
                StatementKind::Function { proto, body } => {
                    let func = self.build_func(proto, body);
                    if !module.register_function(func) {
                        self.error(CompilerError::symbol(&proto.name.value, vec![proto.name.span]));
                    }
                }
                StatementKind::TypeAlias { .. } => {
                    if let Some(instr) = self.build_stat(node) {
                        module.global.add_instr(instr);
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_token_stream;

    fn build_source(src: &str) -> (Module, Vec<CompilerError>) {
        let (toks, lex_errs) = tokenize(src, true);
        assert!(lex_errs.is_empty(), "lex errors: {:?}", lex_errs);
        let (nodes, parse_errs) = parse_token_stream(&toks);
        assert!(parse_errs.is_empty(), "parse errors: {:?}", parse_errs);
        build(&[nodes])
    }

    fn build_clean(src: &str) -> Module {
        let (module, errs) = build_source(src);
        assert!(errs.is_empty(), "build errors: {:?}", errs);
        module
    }

    #[test]
    fn primitives_map_to_concrete_types() {
        let module = build_clean("fn f(a i8, b u64, c f32, d bool, e rune) int { return 0; }");
        let func = &module.functions["f"];
        let types: Vec<Type> = func
            .params
            .iter()
            .map(|l| l.type_node.clone().unwrap())
            .collect();
        assert_eq!(
            types,
            vec![
                Type::signed(8),
                Type::unsigned(64),
                Type::float(32),
                Type::unsigned(32),
                Type::signed(32),
            ]
        );
        assert_eq!(func.return_type, Type::signed(32));
    }

    #[test]
    fn unknown_names_become_references() {
        let module = build_clean("fn f(p Person) void { }");
        let func = &module.functions["f"];
        assert_eq!(
            func.params.get("p").unwrap().type_node,
            Some(Type::reference("Person"))
        );
    }

    #[test]
    fn let_is_immutable_and_mut_is_mutable() {
        let module = build_clean("fn f() void { let x = 1; mut y = 2; }");
        let body = &module.functions["f"].body;
        match (&body.instr[0], &body.instr[1]) {
            (Instruction::Local(x), Instruction::Local(y)) => {
                assert!(!x.mutable);
                assert!(y.mutable);
            }
            other => panic!("expected two locals, got {:?}", other),
        }
    }

    #[test]
    fn literal_types_are_inferred() {
        let module = build_clean(r#"fn f() void { let a = 1; let b = 2.5; let c = "s"; let d = 'x'; }"#);
        let body = &module.functions["f"].body;
        let types: Vec<Option<Type>> = body
            .instr
            .iter()
            .map(|i| match i {
                Instruction::Local(l) => l.type_node.clone(),
                other => panic!("expected local, got {:?}", other),
            })
            .collect();
        assert_eq!(types[0], Some(Type::signed(32)));
        assert_eq!(types[1], Some(Type::float(64)));
        assert_eq!(types[2], Some(Type::pointer(Type::signed(32))));
        assert_eq!(types[3], Some(Type::signed(8)));
    }

    #[test]
    fn unresolvable_inference_is_reported() {
        let (_, errs) = build_source("fn f(a int) void { let x = g(a); }");
        assert!(errs.iter().any(|e| e.title.contains("type inference")));
    }

    #[test]
    fn alloc_initializer_lowers_to_alloca() {
        let module = build_clean("fn f() void { let p = alloc!<Foo>; }");
        let body = &module.functions["f"].body;
        match &body.instr[0] {
            Instruction::Alloca(a) => {
                assert_eq!(a.name.value, "p");
                assert_eq!(a.type_node, Some(Type::pointer(Type::reference("Foo"))));
            }
            other => panic!("expected alloca, got {:?}", other),
        }
    }

    #[test]
    fn alloc_with_count_stays_a_local() {
        let module = build_clean("fn f() void { let p = alloc!<i32>(8); }");
        let body = &module.functions["f"].body;
        assert!(matches!(&body.instr[0], Instruction::Local(_)));
    }

    #[test]
    fn return_fills_the_block_slot() {
        let module = build_clean("fn f() int { let x = 1; return x; }");
        let body = &module.functions["f"].body;
        assert_eq!(body.instr.len(), 1);
        assert!(matches!(
            body.return_instr.as_deref(),
            Some(Instruction::Return { val: Some(_) })
        ));
    }

    #[test]
    fn defer_statements_land_on_the_defer_stack() {
        let module = build_clean("fn f() void { defer free!(p); defer { g(); } let p = 1; }");
        let body = &module.functions["f"].body;
        assert_eq!(body.defer_stack.len(), 2);
        assert!(body.defer_stack[0].stat.is_some());
        assert!(body.defer_stack[1].block.is_some());
        // the non-defer statement still lands in the instruction list.
        assert_eq!(body.instr.len(), 1);
    }

    #[test]
    fn block_ids_are_unique_within_a_module() {
        let module = build_clean(
            "fn f() void { if a { } else if b { } else { } while c { { } } loop { } } fn g() void { }",
        );
        let mut ids = Vec::new();
        fn collect(block: &Block, ids: &mut Vec<u64>) {
            ids.push(block.id);
            for i in &block.instr {
                match i {
                    Instruction::Block(b) => collect(b, ids),
                    Instruction::Loop { body } => collect(body, ids),
                    Instruction::WhileLoop { body, .. } => collect(body, ids),
                    Instruction::If(iff) => {
                        collect(&iff.true_block, ids);
                        for e in &iff.else_ifs {
                            collect(&e.body, ids);
                        }
                        if let Some(e) = &iff.else_block {
                            collect(e, ids);
                        }
                    }
                    _ => {}
                }
            }
        }
        collect(&module.global, &mut ids);
        for f in module.functions.values() {
            collect(&f.body, &mut ids);
        }
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
    }

    #[test]
    fn structure_field_order_survives_lowering() {
        let module = build_clean("struct V { z f64, y f64, x f64, }");
        let fields: Vec<String> = module.structures["V"]
            .fields
            .iter()
            .map(|l| l.name.value.clone())
            .collect();
        assert_eq!(fields, vec!["z", "y", "x"]);
    }

    #[test]
    fn duplicate_impl_is_reported() {
        let (_, errs) = build_source("impl Foo { } impl Foo { }");
        assert!(errs
            .iter()
            .any(|e| e.title.contains("Duplicate implementation")));
    }

    #[test]
    fn duplicate_method_in_impl_is_reported() {
        let (module, errs) = build_source("impl Foo { fn m() void { } fn m() void { } }");
        assert_eq!(module.impls["Foo"].methods.len(), 1);
        assert!(errs.iter().any(|e| e.title.contains("already exists")));
    }

    #[test]
    fn paths_flatten_in_ir() {
        let module = build_clean("fn f() void { let x int = 0; x.y.z; }");
        let body = &module.functions["f"].body;
        match &body.instr[1] {
            Instruction::Expression {
                value: Value::Path { values },
            } => assert_eq!(values.len(), 3),
            other => panic!("expected path expression, got {:?}", other),
        }
    }

    #[test]
    fn type_alias_lands_in_the_global_block() {
        let module = build_clean("type Buffer = [u8; 64];");
        assert_eq!(module.global.instr.len(), 1);
        assert!(matches!(
            module.global.instr[0],
            Instruction::TypeAlias(_)
        ));
    }

    #[test]
    fn lambdas_are_lifted_to_module_functions() {
        let module = build_clean("fn f() void { let g = fn (a int) int { return a; }; }");
        assert!(module.functions.keys().any(|k| k.starts_with("__lambda_")));
    }

    #[test]
    fn assignment_statement_lowers_to_assign_instr() {
        let module = build_clean("fn f() void { mut x = 1; x = 2; }");
        let body = &module.functions["f"].body;
        assert!(matches!(&body.instr[1], Instruction::Assign { op, .. } if op == "="));
    }
}
