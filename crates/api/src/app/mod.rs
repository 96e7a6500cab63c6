//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the shared planning service
//! - `routes/`: HTTP routes + handlers (one file per planning area)
//! - `dto.rs`: response envelopes
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use impactline_infra::{AppConfig, StoreError};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router from process configuration (used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, StoreError> {
    let services = services::build_services(&config.store).await?;
    Ok(router_with(config.jwt_secret.clone(), services))
}

/// Build the router over already-wired services.
pub fn router_with(jwt_secret: String, services: AppServices) -> Router {
    let jwt = Arc::new(impactline_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require auth + tenant context.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
