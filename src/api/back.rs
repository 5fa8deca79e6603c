use axum::Json;

use super::entity::{CodeGenRequest, GeneratedCode};
use super::{respond, KrugRequest, KrugResponse};
use crate::codegen::{codegen, CodegenOptions};
use crate::ir::Module;

/// `POST /back/gen` - renders the IR module into one big C file.
pub async fn gen(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let payload: CodeGenRequest = match serde_json::from_str(&req.data) {
        Ok(p) => p,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };
    let module: Module = match serde_json::from_str(&payload.ir_module) {
        Ok(m) => m,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let opts = CodegenOptions {
        tab_size: payload.tab_size,
        minify: payload.minify,
    };
    let code = codegen(&module, &opts);
    respond(&GeneratedCode { code }, Vec::new())
}
