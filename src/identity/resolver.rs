//! Maps a principal (or an entity id) to its numeric id and owning tenant.
//!
//! Every answer is `Option`: `None` means "unknown", whether the row is absent
//! or the store failed. The two cases are logged differently and both make the
//! guard deny.

use std::sync::Arc;

use tracing::{debug, warn};

use super::principal::{EntityId, Role, TenantId};
use crate::storage::{IdentityRecord, IdentityStore, StoreResult};

/// What owns a guarded resource: an identity row of some role, a company, or
/// a job (owned by the company of the manager who posted it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerRole {
    Identity(Role),
    Company,
    Job,
}

impl OwnerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerRole::Identity(r) => r.as_str(),
            OwnerRole::Company => "company",
            OwnerRole::Job => "job",
        }
    }
}

impl From<Role> for OwnerRole {
    fn from(r: Role) -> Self { OwnerRole::Identity(r) }
}

/// What the access guard needs from resolution.
pub trait TenantResolver {
    fn tenant_of(&self, role: Role, id: EntityId) -> Option<TenantId>;
    fn tenant_of_job(&self, job: EntityId) -> Option<TenantId>;

    /// Tenant of a resource owner. A company owner is its own tenant and
    /// nothing is looked up.
    fn owner_tenant(&self, owner_role: OwnerRole, owner_id: EntityId) -> Option<TenantId> {
        match owner_role {
            OwnerRole::Company => Some(TenantId(owner_id.0)),
            OwnerRole::Identity(role) => self.tenant_of(role, owner_id),
            OwnerRole::Job => self.tenant_of_job(owner_id),
        }
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self { Self { store } }

    pub fn store(&self) -> &Arc<dyn IdentityStore> { &self.store }

    /// Identity row of the principal, with its tenant when the role has one.
    pub fn resolve_identity(&self, principal: &str, role: Role) -> Option<IdentityRecord> {
        let res = self.store.lookup_identity_by_principal(role, principal);
        settle(res, role.as_str(), "principal", &principal)
    }

    pub fn resolve_entity_id(&self, principal: &str, role: Role) -> Option<EntityId> {
        self.resolve_identity(principal, role).map(|r| r.entity_id)
    }

    pub fn resolve_tenant_id(&self, principal: &str, role: Role) -> Option<TenantId> {
        self.resolve_identity(principal, role).and_then(|r| r.tenant_id)
    }

    pub fn resolve_tenant_for_entity(&self, id: EntityId, role: Role) -> Option<TenantId> {
        let res = self.store.lookup_tenant_by_entity_id(role, id);
        settle(res, role.as_str(), "entity_id", &id)
    }

    pub fn resolve_tenant_for_job(&self, job: EntityId) -> Option<TenantId> {
        let res = self.store.lookup_tenant_by_job_id(job);
        settle(res, "job", "id", &job)
    }
}

impl TenantResolver for IdentityResolver {
    fn tenant_of(&self, role: Role, id: EntityId) -> Option<TenantId> {
        self.resolve_tenant_for_entity(id, role)
    }

    fn tenant_of_job(&self, job: EntityId) -> Option<TenantId> {
        self.resolve_tenant_for_job(job)
    }
}

fn settle<T>(res: StoreResult<Option<T>>, table: &str, key_name: &str, key: &dyn std::fmt::Display) -> Option<T> {
    match res {
        Ok(Some(v)) => Some(v),
        Ok(None) => {
            debug!(target: "tenantgate::resolver", "no {} row for {}={}", table, key_name, key);
            None
        }
        Err(e) => {
            warn!(target: "tenantgate::resolver", "store failed resolving {} {}={}: {}", table, key_name, key, e);
            None
        }
    }
}
