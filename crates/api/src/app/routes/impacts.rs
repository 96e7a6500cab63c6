use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use impactline_auth::permissions::planning;

use crate::app::dto::ImpactStatusResponse;
use crate::app::errors;
use crate::app::routes::common::{CmdAuth, respond};
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/preview", get(preview))
        .route("/status", get(status))
        .route("/recompute", post(recompute))
}

/// Derived values as they would be after a recomputation; nothing is written.
pub async fn preview(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> Response {
    respond(StatusCode::OK, services.planning.preview(tenant.tenant_id()).await)
}

pub async fn status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> Json<ImpactStatusResponse> {
    let last_run = services.planning.impact_status(tenant.tenant_id());
    let stale = last_run.as_ref().is_some_and(|r| r.is_stale());
    Json(ImpactStatusResponse { last_run, stale })
}

pub async fn recompute(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = CmdAuth::new((), planning::IMPACTS_RECOMPUTE).authorize(&tenant, &principal) {
        return resp;
    }

    let result = services.planning.recompute(tenant.tenant_id()).await;
    if result.success {
        Json(result).into_response()
    } else {
        let message = result.message.unwrap_or_else(|| "impact recomputation failed".to_string());
        errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "recompute_failed", message)
    }
}
