//! The HTTP façade: one endpoint per pipeline stage.
//!
//! Handlers are thin: decode the [`KrugRequest`] envelope, run the pure
//! core function, encode the artifact and accumulated diagnostics into a
//! [`KrugResponse`]. Malformed payloads never panic; they come back as a
//! fatal diagnostic in the envelope.

pub mod back;
pub mod entity;
pub mod front;
pub mod ir;
pub mod middle;

use std::env;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::CompilerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KrugRequest {
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KrugResponse {
    pub data: String,
    pub errors: Vec<CompilerError>,
}

impl KrugResponse {
    pub fn new(data: impl Into<String>, errors: Vec<CompilerError>) -> Self {
        KrugResponse {
            data: data.into(),
            errors,
        }
    }

    /// Envelope for a request whose payload could not be decoded.
    pub fn malformed(detail: impl ToString) -> Self {
        KrugResponse {
            data: String::new(),
            errors: vec![CompilerError {
                title: "Malformed request payload".to_string(),
                desc: detail.to_string(),
                fatal: true,
                spans: Vec::new(),
            }],
        }
    }
}

/// Serializes a stage artifact into the response envelope.
pub(crate) fn respond<T: Serialize>(artifact: &T, errors: Vec<CompilerError>) -> Json<KrugResponse> {
    match serde_json::to_string_pretty(artifact) {
        Ok(data) => Json(KrugResponse::new(data, errors)),
        Err(err) => Json(KrugResponse::malformed(err)),
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Environment-driven configuration for the service binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
    pub sentry_key: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let ip = env::var("IP").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8001);
        let sentry_key = env::var("SENTRY_KEY").ok().filter(|k| !k.is_empty());
        ServerConfig {
            ip,
            port,
            sentry_key,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            ip: "localhost".to_string(),
            port: 8001,
            sentry_key: None,
        }
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "version": crate::VERSION }))
}

pub fn router() -> Router {
    Router::new()
        .route("/version", get(version))
        // compiler frontend, handles lexing/parsing
        .route("/front/lex", post(front::lex))
        .route("/front/comments", post(front::comments))
        .route("/front/parse/ast", post(front::parse_ast))
        .route("/front/parse/directive", post(front::parse_directive))
        // conversion of the parse trees into a single IR module
        .route("/ir/build", post(ir::build))
        // the middle of the compiler: scopes, types, the analyses
        .route("/mid/build/scope", post(middle::build_scope))
        .route("/mid/build/scope_dict", post(middle::build_scope_dict))
        .route("/mid/build/type", post(middle::build_type))
        .route("/mid/resolve/type", post(middle::resolve_type))
        .route("/mid/resolve/symbol", post(middle::resolve_symbol))
        .route("/mid/borrow_check", post(middle::borrow_check))
        .route("/mid/mut_check", post(middle::mut_check))
        .route("/mid/unused_func", post(middle::unused_func))
        // the backend takes the IR and generates C from it
        .route("/back/gen", post(back::gen))
}

pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "caasper listening");
    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wire_names_are_lowercase() {
        let resp = KrugResponse::new("payload", Vec::new());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["data"], "payload");
        assert!(json["errors"].as_array().unwrap().is_empty());

        let req: KrugRequest = serde_json::from_str(r#"{"data":"{}"}"#).unwrap();
        assert_eq!(req.data, "{}");
    }

    #[test]
    fn malformed_payloads_become_fatal_diagnostics() {
        let resp = KrugResponse::malformed("expected value at line 1");
        assert_eq!(resp.errors.len(), 1);
        assert!(resp.errors[0].fatal);
        assert!(resp.errors[0].desc.contains("line 1"));
    }

    #[test]
    fn config_defaults_match_the_service_contract() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "localhost:8001");
        assert!(config.sentry_key.is_none());
    }
}
