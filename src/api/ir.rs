use axum::Json;
use tracing::debug;

use super::{respond, KrugRequest, KrugResponse};
use crate::ast::StatementNode;
use crate::ir;

/// `POST /ir/build` - takes one parse-node array per compilation unit and
/// builds a single IR module from them.
pub async fn build(Json(req): Json<KrugRequest>) -> Json<KrugResponse> {
    let trees: Vec<Vec<StatementNode>> = match serde_json::from_str(&req.data) {
        Ok(t) => t,
        Err(err) => return Json(KrugResponse::malformed(err)),
    };

    let (module, errors) = ir::build(&trees);
    debug!(
        functions = module.functions.len(),
        structures = module.structures.len(),
        "built ir module"
    );
    respond(&module, errors)
}
