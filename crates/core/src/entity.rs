//! Entity traits: identity + tenant ownership.

use crate::id::TenantId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity that lives inside exactly one tenant scope.
///
/// Storage and aggregation code uses this to enforce that records never cross
/// tenant boundaries, even when a backend hands back something unexpected.
pub trait TenantOwned: Entity {
    fn tenant_id(&self) -> TenantId;

    fn belongs_to(&self, tenant_id: TenantId) -> bool {
        self.tenant_id() == tenant_id
    }
}
