use axum::{Router, routing::get};

pub mod common;
pub mod impacts;
pub mod jobs;
pub mod mappings;
pub mod outcomes;
pub mod outputs;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/jobs", jobs::router())
        .nest("/outputs", outputs::router())
        .nest("/outcomes", outcomes::router())
        .nest("/job-output-mappings", mappings::job_outputs_router())
        .nest("/output-outcome-mappings", mappings::output_outcomes_router())
        .nest("/impacts", impacts::router())
}
