use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
};

use impactline_auth::permissions::planning;
use impactline_core::OutcomeId;
use impactline_planning::{OutcomeDraft, OutcomePatch};

use crate::app::routes::common::{CmdAuth, parse_id, respond, respond_list};
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_outcomes).post(create_outcome))
        .route("/:id", get(get_outcome).put(update_outcome).delete(delete_outcome))
}

pub async fn list_outcomes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> Response {
    respond_list(services.planning.list_outcomes(tenant.tenant_id()).await)
}

pub async fn get_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Response {
    let id: OutcomeId = match parse_id(&id, "outcome") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.planning.get_outcome(tenant.tenant_id(), id).await)
}

pub async fn create_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<OutcomeDraft>,
) -> Response {
    let draft = match CmdAuth::new(body, planning::OUTCOMES_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::CREATED,
        services.planning.create_outcome(tenant.tenant_id(), draft).await,
    )
}

pub async fn update_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<OutcomePatch>,
) -> Response {
    let id: OutcomeId = match parse_id(&id, "outcome") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match CmdAuth::new(body, planning::OUTCOMES_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.planning.update_outcome(tenant.tenant_id(), id, patch).await,
    )
}

pub async fn delete_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: OutcomeId = match parse_id(&id, "outcome") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = CmdAuth::new(id, planning::OUTCOMES_WRITE).authorize(&tenant, &principal) {
        return resp;
    }
    respond(
        StatusCode::OK,
        services.planning.delete_outcome(tenant.tenant_id(), id).await,
    )
}
