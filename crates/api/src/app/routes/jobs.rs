use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
};

use impactline_auth::permissions::planning;
use impactline_core::JobId;
use impactline_planning::{JobDraft, JobPatch};

use crate::app::routes::common::{CmdAuth, parse_id, respond, respond_list};
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/ranked", get(ranked_jobs))
        .route("/:id", get(get_job).put(update_job).delete(delete_job))
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> Response {
    respond_list(services.planning.list_jobs(tenant.tenant_id()).await)
}

/// Open jobs ordered by impact, highest first.
pub async fn ranked_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> Response {
    respond_list(services.planning.ranked_jobs(tenant.tenant_id()).await)
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Response {
    let id: JobId = match parse_id(&id, "job") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.planning.get_job(tenant.tenant_id(), id).await)
}

pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<JobDraft>,
) -> Response {
    let draft = match CmdAuth::new(body, planning::JOBS_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::CREATED,
        services.planning.create_job(tenant.tenant_id(), draft).await,
    )
}

pub async fn update_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<JobPatch>,
) -> Response {
    let id: JobId = match parse_id(&id, "job") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match CmdAuth::new(body, planning::JOBS_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.planning.update_job(tenant.tenant_id(), id, patch).await,
    )
}

pub async fn delete_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: JobId = match parse_id(&id, "job") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = CmdAuth::new(id, planning::JOBS_WRITE).authorize(&tenant, &principal) {
        return resp;
    }
    respond(
        StatusCode::OK,
        services.planning.delete_job(tenant.tenant_id(), id).await,
    )
}
