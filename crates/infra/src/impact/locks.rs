use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use impactline_core::TenantId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per tenant.
///
/// Recomputations of the same tenant queue behind each other; different
/// tenants never contend. A slot lives only while someone holds or waits for
/// it: idle slots are dropped on the next acquire, so the map is bounded by
/// the number of tenants with work in flight.
#[derive(Debug, Default)]
pub struct TenantLocks {
    slots: Mutex<HashMap<TenantId, Arc<AsyncMutex<()>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `tenant_id` is free and hold it until the guard drops.
    pub async fn acquire(&self, tenant_id: TenantId) -> OwnedMutexGuard<()> {
        self.slot(tenant_id).lock_owned().await
    }

    fn slot(&self, tenant_id: TenantId) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map references an idle slot; clones are made under this lock.
        slots.retain(|id, slot| *id == tenant_id || Arc::strong_count(slot) > 1);
        slots.entry(tenant_id).or_default().clone()
    }
}
