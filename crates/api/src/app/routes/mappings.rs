//! Weighted edges between Jobs, Outputs and Outcomes.
//!
//! Every successful mutation here re-runs impact propagation for the tenant;
//! the response carries the recomputation result under `impact`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
};

use impactline_auth::permissions::planning;
use impactline_core::MappingId;
use impactline_infra::MappingFilter;
use impactline_planning::{
    JobOutputMappingDraft, JobOutputMappingPatch, OutputOutcomeMappingDraft,
    OutputOutcomeMappingPatch,
};

use crate::app::routes::common::{CmdAuth, parse_id, respond, respond_list};
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn job_outputs_router() -> Router {
    Router::new()
        .route("/", get(list_job_outputs).post(create_job_output))
        .route(
            "/:id",
            get(get_job_output).put(update_job_output).delete(delete_job_output),
        )
}

pub fn output_outcomes_router() -> Router {
    Router::new()
        .route("/", get(list_output_outcomes).post(create_output_outcome))
        .route(
            "/:id",
            get(get_output_outcome)
                .put(update_output_outcome)
                .delete(delete_output_outcome),
        )
}

// ----- job → output -----

/// Optional `?jobId=` / `?piId=` filters.
pub async fn list_job_outputs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(filter): Query<MappingFilter>,
) -> Response {
    respond_list(
        services
            .planning
            .list_job_outputs(tenant.tenant_id(), filter)
            .await,
    )
}

pub async fn get_job_output(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Response {
    let id: MappingId = match parse_id(&id, "mapping") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.planning.get_job_output(tenant.tenant_id(), id).await,
    )
}

pub async fn create_job_output(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<JobOutputMappingDraft>,
) -> Response {
    let draft = match CmdAuth::new(body, planning::MAPPINGS_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::CREATED,
        services
            .planning
            .create_job_output(tenant.tenant_id(), draft)
            .await,
    )
}

pub async fn update_job_output(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<JobOutputMappingPatch>,
) -> Response {
    let id: MappingId = match parse_id(&id, "mapping") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match CmdAuth::new(body, planning::MAPPINGS_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services
            .planning
            .update_job_output(tenant.tenant_id(), id, patch)
            .await,
    )
}

pub async fn delete_job_output(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: MappingId = match parse_id(&id, "mapping") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = CmdAuth::new(id, planning::MAPPINGS_WRITE).authorize(&tenant, &principal) {
        return resp;
    }
    respond(
        StatusCode::OK,
        services
            .planning
            .delete_job_output(tenant.tenant_id(), id)
            .await,
    )
}

// ----- output → outcome -----

/// Optional `?piId=` / `?qboId=` filters.
pub async fn list_output_outcomes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(filter): Query<MappingFilter>,
) -> Response {
    respond_list(
        services
            .planning
            .list_output_outcomes(tenant.tenant_id(), filter)
            .await,
    )
}

pub async fn get_output_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> Response {
    let id: MappingId = match parse_id(&id, "mapping") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services
            .planning
            .get_output_outcome(tenant.tenant_id(), id)
            .await,
    )
}

pub async fn create_output_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<OutputOutcomeMappingDraft>,
) -> Response {
    let draft = match CmdAuth::new(body, planning::MAPPINGS_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::CREATED,
        services
            .planning
            .create_output_outcome(tenant.tenant_id(), draft)
            .await,
    )
}

pub async fn update_output_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<OutputOutcomeMappingPatch>,
) -> Response {
    let id: MappingId = match parse_id(&id, "mapping") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch = match CmdAuth::new(body, planning::MAPPINGS_WRITE).authorize(&tenant, &principal) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services
            .planning
            .update_output_outcome(tenant.tenant_id(), id, patch)
            .await,
    )
}

pub async fn delete_output_outcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: MappingId = match parse_id(&id, "mapping") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = CmdAuth::new(id, planning::MAPPINGS_WRITE).authorize(&tenant, &principal) {
        return resp;
    }
    respond(
        StatusCode::OK,
        services
            .planning
            .delete_output_outcome(tenant.tenant_id(), id)
            .await,
    )
}
