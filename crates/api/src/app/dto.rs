use serde::Serialize;

use impactline_infra::ImpactRun;

/// Envelope for collection responses.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub tenant_id: String,
    pub principal_id: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactStatusResponse {
    /// `None` until a recomputation ran in this process.
    pub last_run: Option<ImpactRun>,
    pub stale: bool,
}
