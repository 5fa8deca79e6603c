//! Per-endpoint payload records carried inside the request envelope's
//! `data` field. Field names are part of the wire contract.

use serde::{Deserialize, Serialize};

/// `POST /front/lex` and `POST /front/comments`. An `input` starting with
/// `@` names an absolute file path to read the source from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexRequest {
    pub input: String,
}

/// Payloads that carry just the serialized IR module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRequest {
    pub ir_module: String,
}

/// Payloads that carry the IR module plus a scope index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemaRequest {
    pub ir_module: String,
    pub scope_map: String,
}

/// `POST /mid/build/type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTypeRequest {
    pub scope_map: String,
    pub ir_module: String,
}

/// `POST /back/gen`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeGenRequest {
    pub ir_module: String,
    pub tab_size: usize,
    #[serde(default)]
    pub minify: bool,
}

/// `POST /back/gen` response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub code: String,
}
