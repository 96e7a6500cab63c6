use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use impactline_core::DomainError;
use impactline_infra::{ImpactError, ServiceError, StoreError};

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Impact(ImpactError::InvalidTenant(t)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_tenant", format!("invalid tenant id `{t}`"))
        }
        ServiceError::Impact(ImpactError::Store(e)) | ServiceError::Store(e) => store_error_to_response(e),
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation { .. } => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvariantViolation(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message),
    }
}

fn store_error_to_response(err: StoreError) -> axum::response::Response {
    error!(error = %err, "store operation failed");
    let status = match err {
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, "store_error", "storage operation failed")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_statuses() {
        let cases = [
            (DomainError::validation("title", "blank"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("nope"), StatusCode::BAD_REQUEST),
            (DomainError::invariant("cross tenant"), StatusCode::CONFLICT),
            (DomainError::not_found("job"), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(service_error_to_response(err.into()).status(), status);
        }
    }

    #[test]
    fn store_failures_hide_backend_details() {
        let resp = service_error_to_response(StoreError::Backend("secret dsn".into()).into());
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = service_error_to_response(StoreError::Unavailable("down".into()).into());
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
