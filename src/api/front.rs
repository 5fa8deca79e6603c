use axum::Json;
use tracing::debug;

use super::entity::LexRequest;
use super::{respond, KrugRequest, KrugResponse};
use crate::directive::parse_directives;
use crate::lexer::tokenize;
use crate::parser::parse_token_stream;
use crate::token::Token;
use crate::unit::resolve_input;

pub async fn lex(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: LexRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let source = match resolve_input(&payload.input) {
        Ok(s) => s,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let (tokens, errors) = tokenize(&source, true);
    debug!(count = tokens.len(), "lexed token stream");
    respond(&tokens, errors)
}

/// Like `lex`, but yields only the comment tokens.
pub async fn comments(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: LexRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let source = match resolve_input(&payload.input) {
        Ok(s) => s,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let (tokens, errors) = tokenize(&source, false);
    let comments: Vec<Token> = tokens.into_iter().filter(|t| t.is_comment()).collect();
    respond(&comments, errors)
}

pub async fn parse_ast(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let tokens: Vec<Token> = match serde_json::from_str(&req.data) {
        Ok(t) => t,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let (nodes, errors) = parse_token_stream(&tokens);
    debug!(nodes = nodes.len(), errors = errors.len(), "parsed tree");
    respond(&nodes, errors)
}

pub async fn parse_directive(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let tokens: Vec<Token> = match serde_json::from_str(&req.data) {
        Ok(t) => t,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let (directives, errors) = parse_directives(&tokens);
    respond(&directives, errors)
}
