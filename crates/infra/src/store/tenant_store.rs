use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use impactline_core::TenantId;

use super::{StoreError, StoreResult};

/// Tenant-isolated key/value collection.
#[async_trait]
pub trait TenantStore<K, V>: Send + Sync
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn get(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>>;

    async fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> StoreResult<()>;

    /// Remove a record, returning it if it existed.
    async fn remove(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>>;

    async fn list(&self, tenant_id: TenantId) -> StoreResult<Vec<V>>;
}

#[async_trait]
impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn get(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>> {
        (**self).get(tenant_id, key).await
    }

    async fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> StoreResult<()> {
        (**self).upsert(tenant_id, key, value).await
    }

    async fn remove(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>> {
        (**self).remove(tenant_id, key).await
    }

    async fn list(&self, tenant_id: TenantId) -> StoreResult<Vec<V>> {
        (**self).list(tenant_id).await
    }
}

/// In-memory tenant-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<(TenantId, K), V>>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    /// Exclusive access to the whole collection, used for batch writes.
    pub(crate) fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<(TenantId, K), V>>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>> {
        Ok(self.read()?.get(&(tenant_id, key.clone())).cloned())
    }

    async fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> StoreResult<()> {
        self.write()?.insert((tenant_id, key), value);
        Ok(())
    }

    async fn remove(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>> {
        Ok(self.write()?.remove(&(tenant_id, key.clone())))
    }

    async fn list(&self, tenant_id: TenantId) -> StoreResult<Vec<V>> {
        let map = self.read()?;
        Ok(map
            .iter()
            .filter_map(|((t, _k), v)| if *t == tenant_id { Some(v.clone()) } else { None })
            .collect())
    }
}
