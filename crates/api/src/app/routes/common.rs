use std::str::FromStr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use impactline_auth::{CommandAuthorization, Permission};
use impactline_infra::ServiceResult;

use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

/// Small helper wrapper to associate required permissions with a request body.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CmdAuth<C> {
    pub fn new(inner: C, required: Permission) -> Self {
        Self {
            inner,
            required: vec![required],
        }
    }

    /// Authorize the wrapped request, yielding it back on success.
    pub fn authorize(self, tenant: &TenantContext, principal: &PrincipalContext) -> Result<C, Response> {
        match crate::authz::authorize_command(tenant, principal, &self) {
            Ok(()) => Ok(self.inner),
            Err(e) => Err(errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())),
        }
    }
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

pub fn parse_id<T: FromStr>(raw: &str, what: &'static str) -> Result<T, Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

/// Serialize a service result with `status`, or map its error.
pub fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub fn respond_list<T: Serialize>(result: ServiceResult<Vec<T>>) -> Response {
    respond(StatusCode::OK, result.map(dto::ListResponse::new))
}
