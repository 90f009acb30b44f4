//! JSON seed files for `SharedStore`.
//!
//! Shape: `{users, admins, companies, managers, contractors, jobs,
//! contractor_jobs}`, every list optional. Seed users carry either a plain `password` (hashed on load) or a
//! ready `password_hash`.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{Company, Contractor, ContractorJob, Job, Manager, SharedStore, StoreData, StoreError, StoreResult, UserRecord};
use crate::identity::{EntityId, Role};
use crate::security::CredentialVerifier;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub users: Vec<SeedUser>,
    /// Shorthand for users with role `admin`.
    pub admins: Vec<SeedAdmin>,
    pub companies: Vec<Company>,
    pub managers: Vec<Manager>,
    pub contractors: Vec<Contractor>,
    pub jobs: Vec<Job>,
    pub contractor_jobs: Vec<ContractorJob>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: EntityId,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedAdmin {
    pub id: EntityId,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
}

impl From<SeedAdmin> for SeedUser {
    fn from(a: SeedAdmin) -> Self {
        SeedUser { id: a.id, email: a.email, role: Role::Admin, password: a.password, password_hash: a.password_hash }
    }
}

pub fn load_seed_file(path: &Path, verifier: &dyn CredentialVerifier) -> StoreResult<SharedStore> {
    let text = std::fs::read_to_string(path)?;
    let seed: SeedFile = serde_json::from_str(&text)?;
    let store = SharedStore::from_seed(seed, verifier)?;
    let (u, c, m, k) = store.counts();
    let (j, cj) = store.job_counts();
    info!(target: "tenantgate::storage", "seed loaded from {}: users={} companies={} managers={} contractors={} jobs={} contractor_jobs={}",
        path.display(), u, c, m, k, j, cj);
    Ok(store)
}

impl SharedStore {
    /// Validates the whole seed before anything is visible to readers.
    pub fn from_seed(seed: SeedFile, verifier: &dyn CredentialVerifier) -> StoreResult<SharedStore> {
        let SeedFile { users, admins, companies, managers, contractors, jobs, contractor_jobs } = seed;
        let mut data = StoreData::default();

        for c in companies {
            let id = c.id;
            if data.companies.insert(id, c).is_some() {
                return Err(StoreError::Seed(format!("duplicate company id {}", id)));
            }
        }

        let mut ids = HashSet::new();
        for u in users.into_iter().chain(admins.into_iter().map(SeedUser::from)) {
            let email = u.email.trim().to_string();
            if email.is_empty() { return Err(StoreError::Seed(format!("user {} has an empty email", u.id))); }
            if !ids.insert(u.id) { return Err(StoreError::Seed(format!("duplicate user id {}", u.id))); }
            if data.users.contains_key(&email) { return Err(StoreError::Seed(format!("duplicate user email '{}'", email))); }
            let password_hash = match (u.password, u.password_hash) {
                (_, Some(h)) => h,
                (Some(p), None) => verifier.hash(&p).map_err(|e| StoreError::Seed(format!("hashing password for '{}': {}", email, e)))?,
                (None, None) => return Err(StoreError::Seed(format!("user '{}' has neither password nor password_hash", email))),
            };
            data.users.insert(email.clone(), UserRecord { id: u.id, email, password_hash, role: u.role });
        }

        // A principal has exactly one identity row.
        let mut principals = HashSet::new();
        for m in managers {
            check_identity_row(&data, Role::Manager, &m.email, m.company_id.0)?;
            if !principals.insert(m.email.clone()) {
                return Err(StoreError::Seed(format!("manager '{}' has more than one identity row", m.email)));
            }
            let id = m.id;
            if data.managers.insert(id, m).is_some() {
                return Err(StoreError::Seed(format!("duplicate manager id {}", id)));
            }
        }
        for c in contractors {
            check_identity_row(&data, Role::Contractor, &c.email, c.company_id.0)?;
            if !principals.insert(c.email.clone()) {
                return Err(StoreError::Seed(format!("contractor '{}' has more than one identity row", c.email)));
            }
            let id = c.id;
            if data.contractors.insert(id, c).is_some() {
                return Err(StoreError::Seed(format!("duplicate contractor id {}", id)));
            }
        }

        for j in jobs {
            if !data.managers.contains_key(&j.manager_id) {
                return Err(StoreError::Seed(format!("job {} references unknown manager {}", j.id, j.manager_id)));
            }
            let id = j.id;
            if data.jobs.insert(id, j).is_some() {
                return Err(StoreError::Seed(format!("duplicate job id {}", id)));
            }
        }
        let mut assignments = HashSet::new();
        for cj in contractor_jobs {
            if !data.contractors.contains_key(&cj.contractor_id) {
                return Err(StoreError::Seed(format!("contractor job {} references unknown contractor {}", cj.id, cj.contractor_id)));
            }
            if !data.jobs.contains_key(&cj.job_id) {
                return Err(StoreError::Seed(format!("contractor job {} references unknown job {}", cj.id, cj.job_id)));
            }
            if !assignments.insert((cj.contractor_id, cj.job_id)) {
                return Err(StoreError::Seed(format!("contractor {} is assigned to job {} twice", cj.contractor_id, cj.job_id)));
            }
            let id = cj.id;
            if data.contractor_jobs.insert(id, cj).is_some() {
                return Err(StoreError::Seed(format!("duplicate contractor job id {}", id)));
            }
        }

        Ok(SharedStore(std::sync::Arc::new(parking_lot::RwLock::new(data))))
    }
}

fn check_identity_row(data: &StoreData, role: Role, email: &str, company: u64) -> StoreResult<()> {
    let Some(user) = data.user(email) else {
        return Err(StoreError::Seed(format!("{} '{}' has no user row", role, email)));
    };
    if user.role != role {
        return Err(StoreError::Seed(format!("{} '{}' has a user row with role {}", role, email, user.role)));
    }
    if !data.companies.contains_key(&EntityId(company)) {
        return Err(StoreError::Seed(format!("{} '{}' references unknown company {}", role, email, company)));
    }
    Ok(())
}
