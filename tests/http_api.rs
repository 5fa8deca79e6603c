//! Endpoint-level tests: drive the handlers with the JSON envelope the
//! wire protocol uses, chaining one stage's `data` into the next.

use std::io::Write;

use axum::Json;
use caasper::api::{back, front, ir as ir_routes, middle, KrugRequest, KrugResponse};
use caasper::ast::StatementNode;
use caasper::token::{Token, TokenKind};

fn request(data: impl Into<String>) -> Json<KrugRequest> {
    Json(KrugRequest { data: data.into() })
}

async fn lex(source: &str) -> KrugResponse {
    let payload = serde_json::json!({ "input": source }).to_string();
    let Json(resp) = front::lex(request(payload)).await;
    resp
}

async fn parse(tokens_json: &str) -> KrugResponse {
    let Json(resp) = front::parse_ast(request(tokens_json)).await;
    resp
}

async fn build_module(nodes_json: &str) -> KrugResponse {
    // one inner array per compilation unit.
    let Json(resp) = ir_routes::build(request(format!("[{}]", nodes_json))).await;
    resp
}

#[tokio::test]
async fn lex_endpoint_emits_tokens_with_spans() {
    let resp = lex("let x = 1;").await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);

    let tokens: Vec<Token> = serde_json::from_str(&resp.data).unwrap();
    assert_eq!(tokens[0].value, "let");
    assert_eq!(tokens[0].kind, TokenKind::Iden);
    assert_eq!(tokens[0].span.start, 0);
    assert_eq!(tokens[0].span.end, 3);
}

#[tokio::test]
async fn lex_endpoint_reads_at_prefixed_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "fn disk() void {{}}").unwrap();

    let resp = lex(&format!("@{}", file.path().display())).await;
    assert!(resp.errors.is_empty());
    let tokens: Vec<Token> = serde_json::from_str(&resp.data).unwrap();
    assert_eq!(tokens[0].value, "fn");
    assert_eq!(tokens[1].value, "disk");
}

#[tokio::test]
async fn comments_endpoint_yields_only_comments() {
    let payload =
        serde_json::json!({ "input": "// one\nlet x = 1; /* two */" }).to_string();
    let Json(resp) = front::comments(request(payload)).await;
    assert!(resp.errors.is_empty());

    let tokens: Vec<Token> = serde_json::from_str(&resp.data).unwrap();
    assert_eq!(tokens.len(), 2);
    assert!(tokens.iter().all(|t| t.is_comment()));
}

#[tokio::test]
async fn directive_endpoint_parses_annotation_blocks() {
    let resp = lex(r#"#{include("stdio.h"), no_mangle}"#).await;
    let Json(resp) = front::parse_directive(request(resp.data)).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);

    let directives: serde_json::Value = serde_json::from_str(&resp.data).unwrap();
    assert_eq!(directives[0]["kind"], "include");
    assert_eq!(directives[0]["path"], "stdio.h");
    assert_eq!(directives[1]["kind"], "no_mangle");
}

#[tokio::test]
async fn malformed_payloads_come_back_as_fatal_diagnostics() {
    let Json(resp) = front::parse_ast(request("this is not json")).await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].fatal);
    assert_eq!(resp.errors[0].title, "Malformed request payload");
}

#[tokio::test]
async fn pipeline_chains_through_the_endpoints() {
    let src = "fn main() int { let x int = 3; x = 4; return x; }";

    // front
    let lexed = lex(src).await;
    assert!(lexed.errors.is_empty());
    let parsed = parse(&lexed.data).await;
    assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);

    let nodes: Vec<StatementNode> = serde_json::from_str(&parsed.data).unwrap();
    assert_eq!(nodes.len(), 1);

    // ir
    let built = build_module(&parsed.data).await;
    assert!(built.errors.is_empty(), "build errors: {:?}", built.errors);

    // scope dict
    let scope_payload = serde_json::json!({ "ir_module": built.data }).to_string();
    let Json(dict_resp) = middle::build_scope_dict(request(scope_payload)).await;
    assert!(dict_resp.errors.is_empty());

    // mutability check: assigning to a let binding.
    let sema_payload = serde_json::json!({
        "ir_module": built.data,
        "scope_map": dict_resp.data,
    })
    .to_string();
    let Json(mut_resp) = middle::mut_check(request(sema_payload)).await;
    assert_eq!(mut_resp.errors.len(), 1);
    assert!(mut_resp.errors[0].title.contains("'x'"));

    // backend
    let gen_payload = serde_json::json!({
        "ir_module": built.data,
        "tab_size": 4,
        "minify": false,
    })
    .to_string();
    let Json(gen_resp) = back::gen(request(gen_payload)).await;
    assert!(gen_resp.errors.is_empty());

    let generated: serde_json::Value = serde_json::from_str(&gen_resp.data).unwrap();
    let code = generated["code"].as_str().unwrap();
    assert!(code.contains("krug_main"));
    assert!(code.contains("#include <stdint.h>"));
}

#[tokio::test]
async fn unused_function_endpoint_flags_helpers() {
    let lexed = lex("fn helper() void {} fn main() int { return 0; }").await;
    let parsed = parse(&lexed.data).await;
    let built = build_module(&parsed.data).await;

    let payload = serde_json::json!({
        "ir_module": built.data,
        "scope_map": "{}",
    })
    .to_string();
    let Json(resp) = middle::unused_func(request(payload)).await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].title.contains("'helper'"));
}

#[tokio::test]
async fn borrow_check_endpoint_reports_double_moves() {
    let src = "fn g(owned x Foo) void { } fn h(owned x Foo) void { } \
               fn f(owned a Foo) void { g(a); h(a); }";
    let lexed = lex(src).await;
    let parsed = parse(&lexed.data).await;
    let built = build_module(&parsed.data).await;

    let payload = serde_json::json!({
        "ir_module": built.data,
        "scope_map": "{}",
    })
    .to_string();
    let Json(resp) = middle::borrow_check(request(payload)).await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].title.contains("moved value 'a'"));
}

#[tokio::test]
async fn resolve_type_endpoint_returns_the_annotated_module() {
    let lexed = lex("struct P { x int, } fn f(a P) void { }").await;
    let parsed = parse(&lexed.data).await;
    let built = build_module(&parsed.data).await;

    let payload = serde_json::json!({ "ir_module": built.data }).to_string();
    let Json(resp) = middle::resolve_type(request(payload)).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);

    let module: serde_json::Value = serde_json::from_str(&resp.data).unwrap();
    let param_type = &module["functions"]["f"]["params"]["data"]["a"]["type"];
    assert_eq!(param_type["kind"], "struct");
    assert_eq!(param_type["name"], "P");
}
