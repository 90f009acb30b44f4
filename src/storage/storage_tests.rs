use super::*;

fn store() -> SharedStore {
    let s = SharedStore::new();
    s.insert_company(Company { id: EntityId(1), name: "Acme".into() });
    s.insert_company(Company { id: EntityId(2), name: "Globex".into() });
    s.insert_user(UserRecord { id: EntityId(10), email: "boss@acme.com".into(), password_hash: String::new(), role: Role::Manager });
    s.insert_user(UserRecord { id: EntityId(11), email: "dev@acme.com".into(), password_hash: String::new(), role: Role::Contractor });
    s.insert_user(UserRecord { id: EntityId(12), email: "root@ops.com".into(), password_hash: String::new(), role: Role::Admin });
    s.insert_manager(Manager { id: EntityId(3), name: "Boss".into(), email: "boss@acme.com".into(), phone: String::new(), company_id: TenantId(1) });
    s.insert_manager(Manager { id: EntityId(4), name: "Other".into(), email: "other@globex.com".into(), phone: String::new(), company_id: TenantId(2) });
    s.insert_contractor(Contractor {
        id: EntityId(7),
        name: "Dev".into(),
        charge_rate: "50".into(),
        email: "dev@acme.com".into(),
        enabled: true,
        notes: String::new(),
        phone: String::new(),
        company_id: TenantId(1),
        available: true,
        due_back: None,
    });
    s
}

#[test]
fn identity_lookup_joins_users_and_role_table() {
    let s = store();
    let m = s.lookup_identity_by_principal(Role::Manager, "boss@acme.com").unwrap().unwrap();
    assert_eq!(m, IdentityRecord { entity_id: EntityId(3), tenant_id: Some(TenantId(1)) });
    let c = s.lookup_identity_by_principal(Role::Contractor, "dev@acme.com").unwrap().unwrap();
    assert_eq!(c.entity_id, EntityId(7));
    // manager row exists but there is no login row for it
    assert_eq!(s.lookup_identity_by_principal(Role::Manager, "other@globex.com").unwrap(), None);
    // wrong table for this principal
    assert_eq!(s.lookup_identity_by_principal(Role::Contractor, "boss@acme.com").unwrap(), None);
}

#[test]
fn admin_lookup_uses_login_row() {
    let s = store();
    let a = s.lookup_identity_by_principal(Role::Admin, "root@ops.com").unwrap().unwrap();
    assert_eq!(a, IdentityRecord { entity_id: EntityId(12), tenant_id: None });
    assert_eq!(s.lookup_identity_by_principal(Role::Admin, "boss@acme.com").unwrap(), None);
}

#[test]
fn tenant_by_entity_id() {
    let s = store();
    assert_eq!(s.lookup_tenant_by_entity_id(Role::Manager, EntityId(4)).unwrap(), Some(TenantId(2)));
    assert_eq!(s.lookup_tenant_by_entity_id(Role::Contractor, EntityId(7)).unwrap(), Some(TenantId(1)));
    assert_eq!(s.lookup_tenant_by_entity_id(Role::Contractor, EntityId(99)).unwrap(), None);
    assert_eq!(s.lookup_tenant_by_entity_id(Role::Admin, EntityId(12)).unwrap(), None);
}

#[test]
fn listings_filter_by_tenant() {
    let s = store();
    assert_eq!(s.managers(None).unwrap().len(), 2);
    let acme = s.managers(Some(TenantId(1))).unwrap();
    assert_eq!(acme.len(), 1);
    assert_eq!(acme[0].name, "Boss");
    assert!(s.contractors(Some(TenantId(2))).unwrap().is_empty());
    assert_eq!(s.companies().unwrap().iter().map(|c| c.id.0).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn clones_share_tables() {
    let s = store();
    let other = s.clone();
    other.remove_user("dev@acme.com");
    assert_eq!(s.lookup_user("dev@acme.com").unwrap(), None);
    assert_eq!(s.counts(), (2, 2, 2, 1));
}

#[test]
fn contractor_defaults_from_json() {
    let c: Contractor = serde_json::from_str(r#"{"id":1,"name":"n","email":"e@x.com","company_id":1}"#).unwrap();
    assert!(c.enabled);
    assert!(c.available);
    assert_eq!(c.due_back, None);
}

fn job(id: u64, manager: u64, status: &str) -> Job {
    Job {
        id: EntityId(id),
        name: format!("job {}", id),
        effort: "2w".into(),
        start_date: "2024-03-01T00:00:00Z".parse().unwrap(),
        end_date: None,
        status: status.into(),
        description: String::new(),
        manager_id: EntityId(manager),
    }
}

fn with_jobs() -> SharedStore {
    let s = store();
    s.insert_job(job(1, 3, "open"));
    s.insert_job(job(2, 3, "closed"));
    s.insert_job(job(3, 4, "open"));
    // posted by a manager that no longer exists
    s.insert_job(job(4, 99, "open"));
    s.insert_contractor_job(ContractorJob { id: EntityId(1), contractor_id: EntityId(7), status: "accepted".into(), state_seen: false, job_id: EntityId(1) });
    s.insert_contractor_job(ContractorJob { id: EntityId(2), contractor_id: EntityId(7), status: "offered".into(), state_seen: true, job_id: EntityId(3) });
    s
}

#[test]
fn job_tenant_goes_through_manager() {
    let s = with_jobs();
    assert_eq!(s.lookup_tenant_by_job_id(EntityId(1)).unwrap(), Some(TenantId(1)));
    assert_eq!(s.lookup_tenant_by_job_id(EntityId(3)).unwrap(), Some(TenantId(2)));
    assert_eq!(s.lookup_tenant_by_job_id(EntityId(4)).unwrap(), None);
    assert_eq!(s.lookup_tenant_by_job_id(EntityId(42)).unwrap(), None);
}

#[test]
fn job_listings_by_scope_and_status() {
    let s = with_jobs();
    let ids = |jobs: Vec<Job>| jobs.iter().map(|j| j.id.0).collect::<Vec<_>>();
    assert_eq!(ids(s.jobs(JobScope::All, &[]).unwrap()), vec![1, 2, 3, 4]);
    assert_eq!(ids(s.jobs(JobScope::Company(TenantId(1)), &[]).unwrap()), vec![1, 2]);
    assert_eq!(ids(s.jobs(JobScope::Company(TenantId(1)), &["open".to_string()]).unwrap()), vec![1]);
    assert_eq!(ids(s.jobs(JobScope::Manager(EntityId(4)), &[]).unwrap()), vec![3]);
    assert_eq!(s.job_counts(), (4, 2));
}

#[test]
fn contractor_job_lookups() {
    let s = with_jobs();
    assert_eq!(s.contractor_jobs(EntityId(7), &[]).unwrap().len(), 2);
    let offered = s.contractor_jobs(EntityId(7), &["offered".to_string(), "rejected".to_string()]).unwrap();
    assert_eq!(offered.len(), 1);
    assert_eq!(offered[0].job_id, EntityId(3));
    assert_eq!(s.contractor_job(EntityId(7), EntityId(1)).unwrap().map(|cj| cj.id), Some(EntityId(1)));
    assert_eq!(s.contractor_job(EntityId(7), EntityId(2)).unwrap(), None);
    let on_job: Vec<_> = s.job_contractors(EntityId(1)).unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(on_job, vec![EntityId(7)]);
    assert!(s.job_contractors(EntityId(2)).unwrap().is_empty());
}
