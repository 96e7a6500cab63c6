use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
};

use impactline_auth::permissions::planning;
use impactline_core::OutputId;
use impactline_planning::{OutputDraft, OutputPatch};

use crate::app::routes::common::{CmdAuth, parse_id, respond, respond_list};
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_outputs).post(create_output))
        .route("/:id", get(get_output).put(update_output).delete(delete_output))
}

pub async fn list_outputs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> Response {
    respond_list(services.planning.list_outputs(tenant.tenant_id()).await)
}

pub async fn get_output(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Response {
    let id: OutputId = match parse_id(&id, "output") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.planning.get_output(tenant.tenant_id(), id).await)
}

pub async fn create_output(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<OutputDraft>,
) -> Response {
    let draft = match CmdAuth::new(body, planning::OUTPUTS_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::CREATED,
        services.planning.create_output(tenant.tenant_id(), draft).await,
    )
}

/// Re-runs impact propagation; see `impact` in the response.
pub async fn update_output(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<OutputPatch>,
) -> Response {
    let id: OutputId = match parse_id(&id, "output") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match CmdAuth::new(body, planning::OUTPUTS_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.planning.update_output(tenant.tenant_id(), id, patch).await,
    )
}

pub async fn delete_output(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: OutputId = match parse_id(&id, "output") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = CmdAuth::new(id, planning::OUTPUTS_WRITE).authorize(&tenant, &principal) {
        return resp;
    }
    respond(
        StatusCode::OK,
        services.planning.delete_output(tenant.tenant_id(), id).await,
    )
}
