//! One identity table per role.
//!
//! Each implementation knows where its role's rows live and how to reach the
//! owning company. Selection is by `Role`, never by building a table name.

use super::{IdentityRecord, StoreData};
use crate::identity::{EntityId, Role, TenantId};

pub trait IdentityTable: Send + Sync {
    fn role(&self) -> Role;
    /// Join the login table with this role's table on email.
    fn find_by_principal(&self, data: &StoreData, principal: &str) -> Option<IdentityRecord>;
    /// Primary-key lookup of the owning company.
    fn tenant_of(&self, data: &StoreData, id: EntityId) -> Option<TenantId>;
}

/// Admins are identified by their login row and belong to no company.
pub struct AdminTable;
pub struct ManagerTable;
pub struct ContractorTable;

impl IdentityTable for AdminTable {
    fn role(&self) -> Role { Role::Admin }

    fn find_by_principal(&self, data: &StoreData, principal: &str) -> Option<IdentityRecord> {
        let user = data.user(principal).filter(|u| u.role == Role::Admin)?;
        Some(IdentityRecord { entity_id: user.id, tenant_id: None })
    }

    fn tenant_of(&self, _data: &StoreData, _id: EntityId) -> Option<TenantId> { None }
}

impl IdentityTable for ManagerTable {
    fn role(&self) -> Role { Role::Manager }

    fn find_by_principal(&self, data: &StoreData, principal: &str) -> Option<IdentityRecord> {
        data.user(principal)?;
        data.managers
            .values()
            .find(|m| m.email == principal)
            .map(|m| IdentityRecord { entity_id: m.id, tenant_id: Some(m.company_id) })
    }

    fn tenant_of(&self, data: &StoreData, id: EntityId) -> Option<TenantId> {
        data.managers.get(&id).map(|m| m.company_id)
    }
}

impl IdentityTable for ContractorTable {
    fn role(&self) -> Role { Role::Contractor }

    fn find_by_principal(&self, data: &StoreData, principal: &str) -> Option<IdentityRecord> {
        data.user(principal)?;
        data.contractors
            .values()
            .find(|c| c.email == principal)
            .map(|c| IdentityRecord { entity_id: c.id, tenant_id: Some(c.company_id) })
    }

    fn tenant_of(&self, data: &StoreData, id: EntityId) -> Option<TenantId> {
        data.contractors.get(&id).map(|c| c.company_id)
    }
}

pub fn table_for(role: Role) -> &'static dyn IdentityTable {
    match role {
        Role::Admin => &AdminTable,
        Role::Manager => &ManagerTable,
        Role::Contractor => &ContractorTable,
    }
}
