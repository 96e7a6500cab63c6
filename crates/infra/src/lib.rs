//! Infrastructure layer: storage, impact recomputation, services and config.

pub mod config;
pub mod impact;
pub mod service;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use impact::{ImpactAggregator, ImpactError, ImpactRun, RecomputeResult, TenantLocks};
pub use service::{MappingFilter, Mutation, PlanningService, ServiceError, ServiceResult};
pub use store::{
    ImpactWriteSummary, InMemoryPlanningStore, InMemoryTenantStore, PlanningStore,
    PostgresDocumentStore, PostgresPlanningStore, StoreError, StoreResult, TenantStore,
};
