//!
//! tenantgate storage module
//! -------------------------
//! Persistence is an external collaborator of the auth engine. This module
//! fixes the interface the engine needs (`IdentityStore`) and ships an
//! in-memory implementation (`SharedStore`) seeded from a JSON file.
//!
//! Key responsibilities:
//! - Login table lookups by email (`users`).
//! - Per-role identity lookups, routed through `tables::IdentityTable`.
//! - Read-only entity getters used by the guarded HTTP routes, including the
//!   job joins (job -> manager -> company) that decide who owns a job.
//!
//! Every lookup returns `Result<Option<_>, StoreError>` so that "no such row"
//! and "the store failed" stay distinct for the caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::identity::{EntityId, Role, TenantId};

pub mod seed;
pub mod tables;

pub use tables::{table_for, AdminTable, ContractorTable, IdentityTable, ManagerTable};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid seed data: {0}")]
    Seed(String),
    #[error("seed file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("seed file json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row of the login table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: EntityId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Result of a per-role identity lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityRecord {
    pub entity_id: EntityId,
    pub tenant_id: Option<TenantId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub company_id: TenantId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contractor {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub charge_rate: String,
    pub email: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub phone: String,
    pub company_id: TenantId,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub due_back: Option<DateTime<Utc>>,
}

fn default_true() -> bool { true }

/// A job is posted by a manager and belongs to that manager's company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub effort: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub status: String,
    #[serde(default)]
    pub description: String,
    pub manager_id: EntityId,
}

/// Assignment of a contractor to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractorJob {
    pub id: EntityId,
    pub contractor_id: EntityId,
    pub status: String,
    #[serde(default)]
    pub state_seen: bool,
    pub job_id: EntityId,
}

/// Which jobs a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobScope {
    All,
    Company(TenantId),
    Manager(EntityId),
}

fn status_matches(statuses: &[String], status: &str) -> bool {
    statuses.is_empty() || statuses.iter().any(|s| s == status)
}

/// Everything the auth engine reads from persistence.
pub trait IdentityStore: Send + Sync {
    fn lookup_user(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    fn lookup_identity_by_principal(&self, role: Role, principal: &str) -> StoreResult<Option<IdentityRecord>>;
    fn lookup_tenant_by_entity_id(&self, role: Role, id: EntityId) -> StoreResult<Option<TenantId>>;
    /// Company of the manager who posted the job.
    fn lookup_tenant_by_job_id(&self, job: EntityId) -> StoreResult<Option<TenantId>>;

    fn company(&self, id: EntityId) -> StoreResult<Option<Company>>;
    fn manager(&self, id: EntityId) -> StoreResult<Option<Manager>>;
    fn contractor(&self, id: EntityId) -> StoreResult<Option<Contractor>>;
    fn companies(&self) -> StoreResult<Vec<Company>>;
    /// `tenant = None` lists every tenant's rows.
    fn managers(&self, tenant: Option<TenantId>) -> StoreResult<Vec<Manager>>;
    fn contractors(&self, tenant: Option<TenantId>) -> StoreResult<Vec<Contractor>>;

    fn job(&self, id: EntityId) -> StoreResult<Option<Job>>;
    /// Empty `statuses` matches every status.
    fn jobs(&self, scope: JobScope, statuses: &[String]) -> StoreResult<Vec<Job>>;
    fn job_contractors(&self, job: EntityId) -> StoreResult<Vec<Contractor>>;
    fn contractor_jobs(&self, contractor: EntityId, statuses: &[String]) -> StoreResult<Vec<ContractorJob>>;
    fn contractor_job(&self, contractor: EntityId, job: EntityId) -> StoreResult<Option<ContractorJob>>;
}

/// Tables backing `SharedStore`.
#[derive(Debug, Default)]
pub struct StoreData {
    pub(crate) users: HashMap<String, UserRecord>,
    pub(crate) companies: BTreeMap<EntityId, Company>,
    pub(crate) managers: BTreeMap<EntityId, Manager>,
    pub(crate) contractors: BTreeMap<EntityId, Contractor>,
    pub(crate) jobs: BTreeMap<EntityId, Job>,
    pub(crate) contractor_jobs: BTreeMap<EntityId, ContractorJob>,
}

impl StoreData {
    pub fn user(&self, email: &str) -> Option<&UserRecord> { self.users.get(email) }

    /// jobs JOIN managers ON jobs.manager_id = managers.id
    pub fn job_company(&self, job: EntityId) -> Option<TenantId> {
        let job = self.jobs.get(&job)?;
        self.managers.get(&job.manager_id).map(|m| m.company_id)
    }
}

/// Thread-safe in-memory store; clones share the same tables.
#[derive(Clone, Default)]
pub struct SharedStore(pub Arc<RwLock<StoreData>>);

impl SharedStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert_user(&self, user: UserRecord) {
        self.0.write().users.insert(user.email.clone(), user);
    }

    pub fn insert_company(&self, company: Company) {
        self.0.write().companies.insert(company.id, company);
    }

    pub fn insert_manager(&self, manager: Manager) {
        self.0.write().managers.insert(manager.id, manager);
    }

    pub fn insert_contractor(&self, contractor: Contractor) {
        self.0.write().contractors.insert(contractor.id, contractor);
    }

    pub fn insert_job(&self, job: Job) {
        self.0.write().jobs.insert(job.id, job);
    }

    pub fn insert_contractor_job(&self, cj: ContractorJob) {
        self.0.write().contractor_jobs.insert(cj.id, cj);
    }

    pub fn remove_user(&self, email: &str) -> Option<UserRecord> {
        self.0.write().users.remove(email)
    }

    /// Row counts as (users, companies, managers, contractors).
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let d = self.0.read();
        (d.users.len(), d.companies.len(), d.managers.len(), d.contractors.len())
    }

    /// Row counts as (jobs, contractor jobs).
    pub fn job_counts(&self) -> (usize, usize) {
        let d = self.0.read();
        (d.jobs.len(), d.contractor_jobs.len())
    }
}

impl IdentityStore for SharedStore {
    fn lookup_user(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.0.read().users.get(email).cloned())
    }

    fn lookup_identity_by_principal(&self, role: Role, principal: &str) -> StoreResult<Option<IdentityRecord>> {
        let data = self.0.read();
        Ok(table_for(role).find_by_principal(&data, principal))
    }

    fn lookup_tenant_by_entity_id(&self, role: Role, id: EntityId) -> StoreResult<Option<TenantId>> {
        let data = self.0.read();
        Ok(table_for(role).tenant_of(&data, id))
    }

    fn lookup_tenant_by_job_id(&self, job: EntityId) -> StoreResult<Option<TenantId>> {
        Ok(self.0.read().job_company(job))
    }

    fn company(&self, id: EntityId) -> StoreResult<Option<Company>> {
        Ok(self.0.read().companies.get(&id).cloned())
    }

    fn manager(&self, id: EntityId) -> StoreResult<Option<Manager>> {
        Ok(self.0.read().managers.get(&id).cloned())
    }

    fn contractor(&self, id: EntityId) -> StoreResult<Option<Contractor>> {
        Ok(self.0.read().contractors.get(&id).cloned())
    }

    fn companies(&self) -> StoreResult<Vec<Company>> {
        Ok(self.0.read().companies.values().cloned().collect())
    }

    fn managers(&self, tenant: Option<TenantId>) -> StoreResult<Vec<Manager>> {
        let d = self.0.read();
        Ok(d.managers.values().filter(|m| tenant.map_or(true, |t| m.company_id == t)).cloned().collect())
    }

    fn contractors(&self, tenant: Option<TenantId>) -> StoreResult<Vec<Contractor>> {
        let d = self.0.read();
        Ok(d.contractors.values().filter(|c| tenant.map_or(true, |t| c.company_id == t)).cloned().collect())
    }

    fn job(&self, id: EntityId) -> StoreResult<Option<Job>> {
        Ok(self.0.read().jobs.get(&id).cloned())
    }

    fn jobs(&self, scope: JobScope, statuses: &[String]) -> StoreResult<Vec<Job>> {
        let d = self.0.read();
        Ok(d.jobs
            .values()
            .filter(|j| match scope {
                JobScope::All => true,
                JobScope::Company(t) => d.job_company(j.id) == Some(t),
                JobScope::Manager(m) => j.manager_id == m,
            })
            .filter(|j| status_matches(statuses, &j.status))
            .cloned()
            .collect())
    }

    fn job_contractors(&self, job: EntityId) -> StoreResult<Vec<Contractor>> {
        let d = self.0.read();
        Ok(d.contractor_jobs
            .values()
            .filter(|cj| cj.job_id == job)
            .filter_map(|cj| d.contractors.get(&cj.contractor_id).cloned())
            .collect())
    }

    fn contractor_jobs(&self, contractor: EntityId, statuses: &[String]) -> StoreResult<Vec<ContractorJob>> {
        let d = self.0.read();
        Ok(d.contractor_jobs
            .values()
            .filter(|cj| cj.contractor_id == contractor && status_matches(statuses, &cj.status))
            .cloned()
            .collect())
    }

    fn contractor_job(&self, contractor: EntityId, job: EntityId) -> StoreResult<Option<ContractorJob>> {
        let d = self.0.read();
        Ok(d.contractor_jobs.values().find(|cj| cj.contractor_id == contractor && cj.job_id == job).cloned())
    }
}

#[cfg(test)]
mod storage_tests;
