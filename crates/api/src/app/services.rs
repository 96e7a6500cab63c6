use std::sync::Arc;

use tracing::info;

use impactline_infra::{
    InMemoryPlanningStore, PlanningService, PlanningStore, PostgresPlanningStore, StoreBackend,
    StoreError,
};

/// Store handle shared by every request.
pub type SharedStore = Arc<dyn PlanningStore>;

pub struct AppServices {
    pub planning: PlanningService<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            planning: PlanningService::new(store),
        }
    }

    /// Process-local stores; data is lost on restart.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryPlanningStore::new()))
    }
}

pub async fn build_services(backend: &StoreBackend) -> Result<AppServices, StoreError> {
    match backend {
        StoreBackend::InMemory => {
            info!("using in-memory planning store");
            Ok(AppServices::in_memory())
        }
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresPlanningStore::connect(database_url, *max_connections).await?;
            store.migrate().await?;
            info!(max_connections, "using postgres planning store");
            Ok(AppServices::new(Arc::new(store)))
        }
    }
}
