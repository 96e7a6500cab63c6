//! Tenant-isolated storage for planning records.
//!
//! Every collection is addressed by `(TenantId, key)`; there is no API that
//! reads or writes across tenants.

mod memory;
mod planning;
mod postgres;
mod tenant_store;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

pub use memory::InMemoryPlanningStore;
pub use planning::{ImpactWriteSummary, PlanningStore};
pub use postgres::{PostgresDocumentStore, PostgresPlanningStore};
pub use tenant_store::{InMemoryTenantStore, TenantStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// An in-memory lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}
