//! Access guard against a real identity store, and token tamper resistance.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use tenantgate::identity::{
    AccessCheck, AccessGuard, EntityId, IdentityResolver, OwnerRole, Principal, Role, TenantId, TokenCodec, TokenError,
};
use tenantgate::storage::{
    Company, Contractor, ContractorJob, IdentityRecord, IdentityStore, Job, JobScope, Manager, SharedStore, StoreError,
    StoreResult, UserRecord,
};

fn contractor(id: u64, email: &str, company: u64) -> Contractor {
    Contractor {
        id: EntityId(id),
        name: format!("contractor {}", id),
        charge_rate: String::new(),
        email: email.to_string(),
        enabled: true,
        notes: String::new(),
        phone: String::new(),
        company_id: TenantId(company),
        available: true,
        due_back: None,
    }
}

fn user(id: u64, email: &str, role: Role) -> UserRecord {
    UserRecord { id: EntityId(id), email: email.to_string(), password_hash: String::new(), role }
}

fn store() -> SharedStore {
    let s = SharedStore::new();
    s.insert_company(Company { id: EntityId(1), name: "Acme".into() });
    s.insert_company(Company { id: EntityId(2), name: "Globex".into() });
    s.insert_user(user(1, "manager@test.com", Role::Manager));
    s.insert_user(user(2, "contractor@test.com", Role::Contractor));
    s.insert_manager(Manager { id: EntityId(1), name: "bob".into(), email: "manager@test.com".into(), phone: "02040490234".into(), company_id: TenantId(1) });
    s.insert_contractor(contractor(1, "contractor@test.com", 1));
    s.insert_contractor(contractor(2, "c2@test.com", 2));
    s.insert_job(Job {
        id: EntityId(5),
        name: "fit out".into(),
        effort: String::new(),
        start_date: chrono::Utc::now(),
        end_date: None,
        status: "open".into(),
        description: String::new(),
        manager_id: EntityId(1),
    });
    s
}

fn check(accessor_role: Role, accessor_id: Option<u64>, owner_role: OwnerRole, owner_id: u64) -> AccessCheck {
    AccessCheck { accessor_role, accessor_id: accessor_id.map(EntityId), owner_role, owner_id: EntityId(owner_id) }
}

const CONTRACTOR: OwnerRole = OwnerRole::Identity(Role::Contractor);

#[test]
fn guard_same_user() {
    let r = IdentityResolver::new(Arc::new(store()));
    assert!(AccessGuard::contractor_owned().can_access(&r, &check(Role::Contractor, Some(1), CONTRACTOR, 1)));
}

#[test]
fn guard_same_user_type_different_user() {
    let r = IdentityResolver::new(Arc::new(store()));
    assert!(!AccessGuard::contractor_owned().can_access(&r, &check(Role::Contractor, Some(2), CONTRACTOR, 1)));
}

#[test]
fn guard_same_company() {
    let r = IdentityResolver::new(Arc::new(store()));
    let g = AccessGuard::contractor_owned();
    assert!(g.can_access(&r, &check(Role::Manager, Some(1), CONTRACTOR, 1)));
    assert!(!g.can_access(&r, &check(Role::Manager, Some(1), CONTRACTOR, 2)));
}

#[test]
fn guard_overriding() {
    let r = IdentityResolver::new(Arc::new(store()));
    assert!(AccessGuard::contractor_owned().can_access(&r, &check(Role::Admin, None, CONTRACTOR, 1)));
}

#[test]
fn guard_company_owner() {
    let r = IdentityResolver::new(Arc::new(store()));
    let g = AccessGuard::company_scoped();
    assert!(g.can_access(&r, &check(Role::Manager, Some(1), OwnerRole::Company, 1)));
    assert!(!g.can_access(&r, &check(Role::Manager, Some(1), OwnerRole::Company, 2)));
    assert!(!g.can_access(&r, &check(Role::Contractor, Some(1), OwnerRole::Company, 1)));
}

#[test]
fn guard_company_record_self_tier_matches_on_id() {
    let r = IdentityResolver::new(Arc::new(store()));
    let g = AccessGuard::company_record();
    // contractor #1 and company #1 share an id
    assert!(g.can_access(&r, &check(Role::Contractor, Some(1), OwnerRole::Company, 1)));
    assert!(!g.can_access(&r, &check(Role::Contractor, Some(2), OwnerRole::Company, 1)));
    assert!(g.can_access(&r, &check(Role::Manager, Some(1), OwnerRole::Company, 1)));
}

#[test]
fn guard_job_owner_joins_through_manager() {
    let r = IdentityResolver::new(Arc::new(store()));
    let g = AccessGuard::company_scoped();
    assert!(g.can_access(&r, &check(Role::Manager, Some(1), OwnerRole::Job, 5)));
    assert!(!g.can_access(&r, &check(Role::Manager, Some(1), OwnerRole::Job, 6)));
    assert!(!g.can_access(&r, &check(Role::Contractor, Some(1), OwnerRole::Job, 5)));
}

/// Store that fails every call.
struct FailingStore;

fn down<T>() -> StoreResult<T> { Err(StoreError::Unavailable("connection refused".into())) }

impl IdentityStore for FailingStore {
    fn lookup_user(&self, _: &str) -> StoreResult<Option<UserRecord>> { down() }
    fn lookup_identity_by_principal(&self, _: Role, _: &str) -> StoreResult<Option<IdentityRecord>> { down() }
    fn lookup_tenant_by_entity_id(&self, _: Role, _: EntityId) -> StoreResult<Option<TenantId>> { down() }
    fn company(&self, _: EntityId) -> StoreResult<Option<Company>> { down() }
    fn manager(&self, _: EntityId) -> StoreResult<Option<Manager>> { down() }
    fn contractor(&self, _: EntityId) -> StoreResult<Option<Contractor>> { down() }
    fn companies(&self) -> StoreResult<Vec<Company>> { down() }
    fn managers(&self, _: Option<TenantId>) -> StoreResult<Vec<Manager>> { down() }
    fn contractors(&self, _: Option<TenantId>) -> StoreResult<Vec<Contractor>> { down() }
    fn lookup_tenant_by_job_id(&self, _: EntityId) -> StoreResult<Option<TenantId>> { down() }
    fn job(&self, _: EntityId) -> StoreResult<Option<Job>> { down() }
    fn jobs(&self, _: JobScope, _: &[String]) -> StoreResult<Vec<Job>> { down() }
    fn job_contractors(&self, _: EntityId) -> StoreResult<Vec<Contractor>> { down() }
    fn contractor_jobs(&self, _: EntityId, _: &[String]) -> StoreResult<Vec<ContractorJob>> { down() }
    fn contractor_job(&self, _: EntityId, _: EntityId) -> StoreResult<Option<ContractorJob>> { down() }
}

#[test]
fn store_failure_denies_same_company_tier() {
    let r = IdentityResolver::new(Arc::new(FailingStore));
    let g = AccessGuard::contractor_owned();
    assert!(!g.can_access(&r, &check(Role::Manager, Some(1), CONTRACTOR, 1)));
    assert!(!AccessGuard::company_scoped().can_access(&r, &check(Role::Manager, Some(1), OwnerRole::Company, 1)));
    assert!(!AccessGuard::company_scoped().can_access(&r, &check(Role::Manager, Some(1), OwnerRole::Job, 5)));
    // tiers that need no lookup are unaffected
    assert!(g.can_access(&r, &check(Role::Contractor, Some(1), CONTRACTOR, 1)));
    assert!(g.can_access(&r, &check(Role::Admin, None, CONTRACTOR, 1)));
}

fn codec() -> TokenCodec { TokenCodec::new(b"tamper-secret", Duration::from_secs(3600)).unwrap() }

#[test]
fn every_single_byte_alteration_is_rejected() {
    let c = codec();
    let token = c.issue(&Principal::new("contractor@test.com", Role::Contractor)).unwrap();
    let bytes = token.as_bytes();
    for i in 0..bytes.len() {
        let mut altered = bytes.to_vec();
        altered[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let altered = String::from_utf8(altered).unwrap();
        assert!(c.verify(&altered).is_err(), "alteration at byte {} accepted", i);
    }
}

#[test]
fn forged_payload_keeps_old_signature_and_fails() {
    let c = codec();
    let token = c.issue(&Principal::new("contractor@test.com", Role::Contractor)).unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);

    let mut claims: serde_json::Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
    assert_eq!(claims["authRole"], "contractor");
    claims["authRole"] = serde_json::Value::from("admin");
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
    assert_eq!(c.verify(&forged), Err(TokenError::InvalidSignature));
}

#[test]
fn alg_none_is_rejected() {
    let c = codec();
    let token = c.issue(&Principal::new("a@test.com", Role::Manager)).unwrap();
    let payload = token.split('.').nth(1).unwrap();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    assert!(c.verify(&format!("{}.{}.", header, payload)).is_err());
}
