use super::parse_token_stream;
use crate::ast::{ExpressionKind, ExpressionNode, StatementKind, StatementNode, TypeKind};
use crate::lexer::tokenize;

fn parse_source(src: &str) -> (Vec<StatementNode>, Vec<crate::error::CompilerError>) {
    let (toks, errs) = tokenize(src, true);
    assert!(errs.is_empty(), "lex errors: {:?}", errs);
    parse_token_stream(&toks)
}

fn parse_clean(src: &str) -> Vec<StatementNode> {
    let (nodes, errs) = parse_source(src);
    assert!(errs.is_empty(), "parse errors: {:?}", errs);
    nodes
}

fn body_of(node: &StatementNode) -> &[StatementNode] {
    match &node.kind {
        StatementKind::Function { body, .. } => body,
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn parses_empty_function() {
    let nodes = parse_clean("fn main() int { }");
    assert_eq!(nodes.len(), 1);
    match &nodes[0].kind {
        StatementKind::Function { proto, body } => {
            assert_eq!(proto.name.value, "main");
            assert!(proto.arguments.is_empty());
            assert!(body.is_empty());
            match &proto.return_type.as_ref().unwrap().kind {
                TypeKind::Unresolved { name } => assert_eq!(name, "int"),
                other => panic!("unexpected return type {:?}", other),
            }
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn parses_let_statement() {
    let nodes = parse_clean("fn f() void { let x = 5; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Let {
            name,
            type_node,
            value,
            owned,
        } => {
            assert_eq!(name.value, "x");
            assert!(type_node.is_none());
            assert!(matches!(
                value.as_ref().unwrap().kind,
                ExpressionKind::IntegerConst { .. }
            ));
            assert!(!owned);
        }
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn parses_mut_statement_with_type() {
    let nodes = parse_clean("fn f() void { mut total i64 = 0; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Mut {
            name, type_node, ..
        } => {
            assert_eq!(name.value, "total");
            assert!(type_node.is_some());
        }
        other => panic!("expected mut, got {:?}", other),
    }
}

#[test]
fn binding_without_type_or_value_is_an_error() {
    let (_, errs) = parse_source("fn f() void { let x; }");
    assert!(errs
        .iter()
        .any(|e| e.title.contains("value or type in binding")));
}

#[test]
fn parses_owned_bindings_and_params() {
    let nodes = parse_clean("fn f(owned a Foo) void { let owned b = a; }");
    match &nodes[0].kind {
        StatementKind::Function { proto, body } => {
            assert!(proto.arguments[0].owned);
            assert_eq!(proto.arguments[0].name.value, "a");
            match &body[0].kind {
                StatementKind::Let { owned, name, .. } => {
                    assert!(*owned);
                    assert_eq!(name.value, "b");
                }
                other => panic!("expected let, got {:?}", other),
            }
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn parses_struct_with_trailing_commas() {
    let nodes = parse_clean("struct Person { name ^rune, age int, }");
    match &nodes[0].kind {
        StatementKind::Structure { name, fields } => {
            assert_eq!(name.value, "Person");
            assert_eq!(fields.len(), 2);
            assert_eq!(fields[0].name.value, "name");
            assert!(matches!(fields[0].type_node.kind, TypeKind::Pointer { .. }));
        }
        other => panic!("expected struct, got {:?}", other),
    }
}

#[test]
fn struct_field_order_is_preserved() {
    let nodes = parse_clean("struct V { z int, y int, x int, }");
    match &nodes[0].kind {
        StatementKind::Structure { fields, .. } => {
            let names: Vec<&str> = fields.iter().map(|f| f.name.value.as_str()).collect();
            assert_eq!(names, vec!["z", "y", "x"]);
        }
        other => panic!("expected struct, got {:?}", other),
    }
}

#[test]
fn parses_trait_with_prototypes() {
    let nodes = parse_clean("trait Shape { fn area(self ^Shape) f64; fn name(self ^Shape) ^rune; }");
    match &nodes[0].kind {
        StatementKind::Trait { name, members } => {
            assert_eq!(name.value, "Shape");
            assert_eq!(members.len(), 2);
            assert_eq!(members[0].name.value, "area");
        }
        other => panic!("expected trait, got {:?}", other),
    }
}

#[test]
fn parses_impl_with_methods() {
    let nodes = parse_clean("impl Person { fn greet(self ^Person) void { } }");
    match &nodes[0].kind {
        StatementKind::Impl { name, functions } => {
            assert_eq!(name.value, "Person");
            assert_eq!(functions.len(), 1);
            assert_eq!(functions[0].proto.name.value, "greet");
        }
        other => panic!("expected impl, got {:?}", other),
    }
}

#[test]
fn parses_type_alias() {
    let nodes = parse_clean("type Buffer = [u8; 256];");
    match &nodes[0].kind {
        StatementKind::TypeAlias { name, type_node } => {
            assert_eq!(name.value, "Buffer");
            assert!(matches!(type_node.kind, TypeKind::Array { .. }));
        }
        other => panic!("expected type alias, got {:?}", other),
    }
}

#[test]
fn precedence_mul_binds_tighter_than_add() {
    let nodes = parse_clean("fn f() int { return 1 + 2 * 3; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Return { value } => match &value.as_ref().unwrap().kind {
            ExpressionKind::Binary { lhand, op, rhand } => {
                assert_eq!(op, "+");
                assert!(matches!(lhand.kind, ExpressionKind::IntegerConst { .. }));
                match &rhand.kind {
                    ExpressionKind::Binary { op, .. } => assert_eq!(op, "*"),
                    other => panic!("expected nested mul, got {:?}", other),
                }
            }
            other => panic!("expected binary, got {:?}", other),
        },
        other => panic!("expected return, got {:?}", other),
    }
}

#[test]
fn comparisons_bind_looser_than_arithmetic() {
    let nodes = parse_clean("fn f() bool { return a + 1 < b * 2; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Return { value } => match &value.as_ref().unwrap().kind {
            ExpressionKind::Binary { op, .. } => assert_eq!(op, "<"),
            other => panic!("expected comparison at root, got {:?}", other),
        },
        other => panic!("expected return, got {:?}", other),
    }
}

#[test]
fn logical_or_is_loosest() {
    let nodes = parse_clean("fn f() bool { return a && b || c; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Return { value } => match &value.as_ref().unwrap().kind {
            ExpressionKind::Binary { op, lhand, .. } => {
                assert_eq!(op, "||");
                assert!(matches!(&lhand.kind, ExpressionKind::Binary { op, .. } if op == "&&"));
            }
            other => panic!("expected binary, got {:?}", other),
        },
        other => panic!("expected return, got {:?}", other),
    }
}

#[test]
fn parses_unary_deref_and_not() {
    let nodes = parse_clean("fn f() void { let a = @ptr; let b = !flag; }");
    let body = body_of(&nodes[0]);
    for (stat, expected) in body.iter().zip(["@", "!"]) {
        match &stat.kind {
            StatementKind::Let { value, .. } => match &value.as_ref().unwrap().kind {
                ExpressionKind::Unary { op, .. } => assert_eq!(op, expected),
                other => panic!("expected unary, got {:?}", other),
            },
            other => panic!("expected let, got {:?}", other),
        }
    }
}

#[test]
fn dot_chain_flattens_to_path() {
    let nodes = parse_clean("fn f() void { a.b.c; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Expression { value } => match &value.kind {
            ExpressionKind::Path { values } => {
                assert_eq!(values.len(), 3);
                for v in values {
                    assert!(matches!(v.kind, ExpressionKind::Variable { .. }));
                }
            }
            other => panic!("expected path, got {:?}", other),
        },
        other => panic!("expected expression stat, got {:?}", other),
    }
}

#[test]
fn path_with_trailing_binary_rewrites_to_binary_of_path() {
    let nodes = parse_clean("fn f() int { return a.b + 1; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Return { value } => match &value.as_ref().unwrap().kind {
            ExpressionKind::Binary { lhand, op, .. } => {
                assert_eq!(op, "+");
                assert!(matches!(lhand.kind, ExpressionKind::Path { .. }));
            }
            other => panic!("expected binary over path, got {:?}", other),
        },
        other => panic!("expected return, got {:?}", other),
    }
}

#[test]
fn path_assignment_targets_the_path() {
    let nodes = parse_clean("fn f() void { p.age = 20; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Expression { value } => match &value.kind {
            ExpressionKind::Assign { lhand, op, .. } => {
                assert_eq!(op, "=");
                assert!(matches!(lhand.kind, ExpressionKind::Path { .. }));
            }
            other => panic!("expected assign, got {:?}", other),
        },
        other => panic!("expected expression stat, got {:?}", other),
    }
}

#[test]
fn parses_calls_and_indexing() {
    let nodes = parse_clean("fn f() void { g(1, 2)[0]; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Expression { value } => match &value.kind {
            ExpressionKind::Index { left, .. } => match &left.kind {
                ExpressionKind::Call { params, .. } => assert_eq!(params.len(), 2),
                other => panic!("expected call under index, got {:?}", other),
            },
            other => panic!("expected index, got {:?}", other),
        },
        other => panic!("expected expression stat, got {:?}", other),
    }
}

#[test]
fn parses_builtin_forms() {
    let nodes = parse_clean(
        "fn f() void { let a = sizeof!<i32>; let b = alloc!<Foo>(4); let c = ref!(x); }",
    );
    let body = body_of(&nodes[0]);

    let builtin = |stat: &StatementNode| match &stat.kind {
        StatementKind::Let { value, .. } => match &value.as_ref().unwrap().kind {
            ExpressionKind::Builtin {
                name,
                type_node,
                args,
            } => (name.clone(), type_node.is_some(), args.len()),
            other => panic!("expected builtin, got {:?}", other),
        },
        other => panic!("expected let, got {:?}", other),
    };

    assert_eq!(builtin(&body[0]), ("sizeof".to_string(), true, 0));
    assert_eq!(builtin(&body[1]), ("alloc".to_string(), true, 1));
    assert_eq!(builtin(&body[2]), ("ref".to_string(), false, 1));
}

#[test]
fn parses_if_elif_else_chain() {
    let nodes =
        parse_clean("fn f() void { if a { } else if b { } else if c { } else { let x = 1; } }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::If {
            else_ifs,
            else_block,
            ..
        } => {
            assert_eq!(else_ifs.len(), 2);
            assert_eq!(else_block.as_ref().unwrap().len(), 1);
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn parses_while_with_post_expression() {
    let nodes = parse_clean("fn f() void { while i < 10; i += 1 { } }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::While { cond, post, .. } => {
            assert!(matches!(cond.kind, ExpressionKind::Binary { .. }));
            assert!(matches!(
                post.as_ref().unwrap().kind,
                ExpressionKind::Assign { .. }
            ));
        }
        other => panic!("expected while, got {:?}", other),
    }
}

#[test]
fn parses_loop_and_break_and_next() {
    let nodes = parse_clean("fn f() void { loop { break; next; } }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Loop { block } => {
            assert!(matches!(block[0].kind, StatementKind::Break));
            assert!(matches!(block[1].kind, StatementKind::Next));
        }
        other => panic!("expected loop, got {:?}", other),
    }
}

#[test]
fn parses_defer_statement_and_block() {
    let nodes = parse_clean("fn f() void { defer free!(p); defer { a(); b(); } }");
    let body = body_of(&nodes[0]);
    match &body[0].kind {
        StatementKind::Defer { stat, block } => {
            assert!(stat.is_some());
            assert!(block.is_none());
        }
        other => panic!("expected defer, got {:?}", other),
    }
    match &body[1].kind {
        StatementKind::Defer { stat, block } => {
            assert!(stat.is_none());
            assert_eq!(block.as_ref().unwrap().len(), 2);
        }
        other => panic!("expected defer, got {:?}", other),
    }
}

#[test]
fn parses_labels_and_jumps() {
    let nodes = parse_clean("fn f() void { top: jump top; }");
    let body = body_of(&nodes[0]);
    assert!(matches!(&body[0].kind, StatementKind::Label { name } if name.value == "top"));
    assert!(matches!(&body[1].kind, StatementKind::Jump { location } if location.value == "top"));
}

#[test]
fn parses_initializer_literal() {
    let nodes = parse_clean("fn f() void { let v (int, int) = {1, 2}; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Let { value, .. } => match &value.as_ref().unwrap().kind {
            ExpressionKind::Initializer { values, .. } => assert_eq!(values.len(), 2),
            other => panic!("expected initializer, got {:?}", other),
        },
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn parses_lambda_expression() {
    let nodes = parse_clean("fn f() void { let g = fn (a int) int { return a; }; }");
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Let { value, .. } => match &value.as_ref().unwrap().kind {
            ExpressionKind::Lambda { proto, body } => {
                assert_eq!(proto.arguments.len(), 1);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected lambda, got {:?}", other),
        },
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn unexpected_token_recovers_and_reports() {
    let (nodes, errs) = parse_source("fn f() void { let = 5; } fn g() void { }");
    assert!(!errs.is_empty());
    // parsing continued to the second function.
    assert!(nodes
        .iter()
        .any(|n| matches!(&n.kind, StatementKind::Function { proto, .. } if proto.name.value == "g")));
}

#[test]
fn every_node_carries_a_span() {
    let src = "fn f() void { let x = 1 + 2; }";
    let nodes = parse_clean(src);
    assert!(nodes[0].span.len() > 0);
    let body = body_of(&nodes[0]);
    let let_span = body[0].span;
    assert_eq!(&src[let_span.start..let_span.end], "let x = 1 + 2");
}

#[test]
fn parse_serialize_parse_is_structurally_equal() {
    let src = "struct P { x int, } fn main() int { let p P = {1}; return p.x; }";
    let nodes = parse_clean(src);
    let json = serde_json::to_string(&nodes).unwrap();
    let back: Vec<StatementNode> = serde_json::from_str(&json).unwrap();
    assert_eq!(nodes, back);
}

#[test]
fn directive_blocks_are_skipped_by_the_main_parser() {
    let (nodes, errs) = parse_source("#{include(\"stdio.h\")} fn main() int { return 0; }");
    assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
    assert_eq!(nodes.len(), 1);
}

#[test]
fn top_level_prototype_parses_without_body() {
    let nodes = parse_clean("fn printf(fmt ^rune) void;");
    assert!(matches!(nodes[0].kind, StatementKind::FunctionProto { .. }));
}

fn expr_of(src: &str) -> ExpressionNode {
    let nodes = parse_clean(src);
    match &body_of(&nodes[0])[0].kind {
        StatementKind::Expression { value } => value.clone(),
        other => panic!("expected expression stat, got {:?}", other),
    }
}

#[test]
fn equal_precedence_associates_left() {
    let expr = expr_of("fn f() void { a - b - c; }");
    match &expr.kind {
        ExpressionKind::Binary { lhand, op, rhand } => {
            assert_eq!(op, "-");
            assert!(matches!(&lhand.kind, ExpressionKind::Binary { .. }));
            assert!(matches!(&rhand.kind, ExpressionKind::Variable { .. }));
        }
        other => panic!("expected binary, got {:?}", other),
    }
}
