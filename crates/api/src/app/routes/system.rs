use axum::{Extension, Json, http::StatusCode};

use crate::app::dto::WhoAmIResponse;
use crate::context::{PrincipalContext, TenantContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        tenant_id: tenant.tenant_id().to_string(),
        principal_id: principal.principal_id().to_string(),
        roles: principal.role_names(),
    })
}
