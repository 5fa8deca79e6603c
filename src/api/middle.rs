use axum::Json;

use super::entity::{BuildTypeRequest, ModuleRequest, SemaRequest};
use super::{respond, KrugRequest, KrugResponse};
use crate::ir::{Module, ScopeDict};
use crate::middle;

fn decode_module(data: &str) -> Result<Module, serde_json::Error> {
    serde_json::from_str(data)
}

fn decode_dict(data: &str) -> Result<ScopeDict, serde_json::Error> {
    serde_json::from_str(data)
}

pub async fn build_scope(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: ModuleRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let mut module = match decode_module(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let (scope_map, errors) = middle::build_scope(&mut module);
    respond(&scope_map, errors)
}

pub async fn build_scope_dict(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: ModuleRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let mut module = match decode_module(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let (dict, errors) = middle::build_scope_dict(&mut module);
    respond(&dict, errors)
}

pub async fn build_type(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: BuildTypeRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let mut module = match decode_module(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let mut dict = match decode_dict(&payload.scope_map) {
        Ok(d) => d,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let (type_map, errors) = middle::decl_type(&mut dict, &mut module);
    respond(&type_map, errors)
}

/// `POST /mid/resolve/type` - returns the module with references rewritten
/// to concrete types.
pub async fn resolve_type(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: ModuleRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let mut module = match decode_module(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let errors = middle::type_resolve(&mut module);
    respond(&module, errors)
}

pub async fn resolve_symbol(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: SemaRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let module = match decode_module(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let dict = match decode_dict(&payload.scope_map) {
        Ok(d) => d,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let errors = middle::sym_resolve(&module, &dict);
    Json(KrugResponse::new("", errors))
}

pub async fn borrow_check(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: SemaRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let module = match decode_module(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let errors = middle::borrow_check(&module);
    Json(KrugResponse::new("", errors))
}

pub async fn mut_check(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: SemaRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let module = match decode_module(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let dict = match decode_dict(&payload.scope_map) {
        Ok(d) => d,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let errors = middle::mut_check(&module, &dict);
    Json(KrugResponse::new("", errors))
}

pub async fn unused_func(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: SemaRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let module = match decode_module(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let errors = middle::unused_func(&module);
    Json(KrugResponse::new("", errors))
}
