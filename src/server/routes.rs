//! HTTP handlers. Guarded handlers take the `RequestIdentity` inserted by the
//! middleware, run their access check first, then read the store.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use crate::error::{AppError, AppResult, AuthError};
use crate::identity::{
    require_admin, require_manager_or_admin, AccessCheck, AccessGuard, EntityId, LoginRequest, OwnerRole,
    RequestIdentity, Role, TenantId,
};
use crate::storage::{Company, Contractor, ContractorJob, Job, JobScope, Manager};

/// Logs how long a handler took when dropped.
struct RequestTimer {
    resource: &'static str,
    started: Instant,
}

impl RequestTimer {
    fn start(resource: &'static str) -> Self { Self { resource, started: Instant::now() } }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        debug!(target: "tenantgate::http", "Executed {} request in {}ms", self.resource, self.started.elapsed().as_millis());
    }
}

fn parse_id(raw: &str, what: &str) -> Result<EntityId, AuthError> {
    raw.parse::<EntityId>().map_err(|_| AuthError::BadRequest(format!("Invalid {} ID", what)))
}

fn check_access(state: &AppState, identity: &RequestIdentity, guard: &AccessGuard, owner_role: OwnerRole, owner_id: EntityId) -> Result<(), AuthError> {
    let check = AccessCheck { accessor_role: identity.role(), accessor_id: identity.entity_id, owner_role, owner_id };
    guard.authorize(state.resolver(), &check).map(|_| ())
}

/// Listing scope: admins see every tenant, everyone else only their own.
fn tenant_scope(identity: &RequestIdentity) -> Result<Option<TenantId>, AuthError> {
    if identity.role().is_override() { return Ok(None); }
    identity.tenant_id.map(Some).ok_or_else(|| AuthError::AccessDenied("No company resolved for caller".into()))
}

/// `?status=open,closed`; absent or empty matches every status.
#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusFilter {
    pub fn statuses(&self) -> Vec<String> {
        self.status
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

fn company_of(state: &AppState, tenant: TenantId, missing: &str) -> AppResult<Company> {
    state.store.company(EntityId(tenant.0))?.ok_or_else(|| AppError::not_found("not_found", missing))
}

pub async fn authorize(State(state): State<AppState>, body: Bytes) -> AppResult<impl IntoResponse> {
    let _timer = RequestTimer::start("authorize");
    // A body that is not a JSON object counts as empty fields.
    let req: LoginRequest = serde_json::from_slice(&body).unwrap_or_default();
    // Runs Argon2; must not block an async worker.
    let auth = state.auth.clone();
    let resp = tokio::task::spawn_blocking(move || auth.login(&req))
        .await
        .map_err(|e| AppError::internal("internal".to_string(), format!("login task failed: {}", e)))??;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", resp.token))
        .map_err(|_| AppError::internal("internal", "token is not a valid header value"))?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    Ok((StatusCode::OK, headers, format!("Token: {}", resp.token)))
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: EntityId,
    pub email: String,
    pub role: Role,
}

pub async fn current_user(State(state): State<AppState>, identity: RequestIdentity) -> AppResult<Json<UserView>> {
    let _timer = RequestTimer::start("get user");
    let user = state.store.lookup_user(identity.email())?.ok_or_else(|| AppError::not_found("not_found", "User not found"))?;
    Ok(Json(UserView { id: user.id, email: user.email, role: user.role }))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RoleRecord {
    Manager(Manager),
    Contractor(Contractor),
}

pub async fn current_user_role(State(state): State<AppState>, identity: RequestIdentity) -> AppResult<Json<RoleRecord>> {
    let _timer = RequestTimer::start("get user role");
    match identity.role() {
        Role::Admin => Err(AuthError::BadRequest("Admin has no role record".into()).into()),
        Role::Manager => {
            let m = identity.entity_id.map(|id| state.store.manager(id)).transpose()?.flatten();
            m.map(|m| Json(RoleRecord::Manager(m))).ok_or_else(|| AppError::not_found("not_found", "Manager not found"))
        }
        Role::Contractor => {
            let c = identity.entity_id.map(|id| state.store.contractor(id)).transpose()?.flatten();
            c.map(|c| Json(RoleRecord::Contractor(c))).ok_or_else(|| AppError::not_found("not_found", "Contractor not found"))
        }
    }
}

pub async fn list_companies(State(state): State<AppState>, identity: RequestIdentity) -> AppResult<Json<Vec<Company>>> {
    let _timer = RequestTimer::start("get companies");
    require_admin(&identity)?;
    Ok(Json(state.store.companies()?))
}

pub async fn get_company(State(state): State<AppState>, identity: RequestIdentity, Path(id): Path<String>) -> AppResult<Json<Company>> {
    let _timer = RequestTimer::start("get company");
    let id = parse_id(&id, "company")?;
    check_access(&state, &identity, &AccessGuard::company_record(), OwnerRole::Company, id)?;
    let company = state.store.company(id)?.ok_or_else(|| AppError::not_found("not_found", "Company not found"))?;
    Ok(Json(company))
}

pub async fn get_company_contractors(State(state): State<AppState>, identity: RequestIdentity, Path(id): Path<String>) -> AppResult<Json<Vec<Contractor>>> {
    let _timer = RequestTimer::start("get company contractors");
    let id = parse_id(&id, "company")?;
    check_access(&state, &identity, &AccessGuard::company_scoped(), OwnerRole::Company, id)?;
    Ok(Json(state.store.contractors(Some(TenantId(id.0)))?))
}

pub async fn get_company_jobs(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<String>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<Job>>> {
    let _timer = RequestTimer::start("get company jobs");
    let id = parse_id(&id, "company")?;
    check_access(&state, &identity, &AccessGuard::company_scoped(), OwnerRole::Company, id)?;
    Ok(Json(state.store.jobs(JobScope::Company(TenantId(id.0)), &filter.statuses())?))
}

pub async fn list_managers(State(state): State<AppState>, identity: RequestIdentity) -> AppResult<Json<Vec<Manager>>> {
    let _timer = RequestTimer::start("get managers");
    require_manager_or_admin(&identity)?;
    let scope = tenant_scope(&identity)?;
    Ok(Json(state.store.managers(scope)?))
}

pub async fn get_manager(State(state): State<AppState>, identity: RequestIdentity, Path(id): Path<String>) -> AppResult<Json<Manager>> {
    let _timer = RequestTimer::start("get manager");
    let id = parse_id(&id, "manager")?;
    // Owner is the manager's company, reached through the manager row.
    check_access(&state, &identity, &AccessGuard::company_scoped(), OwnerRole::Identity(Role::Manager), id)?;
    let manager = state.store.manager(id)?.ok_or_else(|| AppError::not_found("not_found", "Manager not found"))?;
    Ok(Json(manager))
}

pub async fn get_manager_company(State(state): State<AppState>, identity: RequestIdentity, Path(id): Path<String>) -> AppResult<Json<Company>> {
    let _timer = RequestTimer::start("get manager company");
    let id = parse_id(&id, "manager")?;
    check_access(&state, &identity, &AccessGuard::company_scoped(), OwnerRole::Identity(Role::Manager), id)?;
    let manager = state.store.manager(id)?.ok_or_else(|| AppError::not_found("not_found", "Manager company not found"))?;
    Ok(Json(company_of(&state, manager.company_id, "Manager company not found")?))
}

pub async fn get_manager_jobs(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<String>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<Job>>> {
    let _timer = RequestTimer::start("get manager jobs");
    let id = parse_id(&id, "manager")?;
    check_access(&state, &identity, &AccessGuard::company_scoped(), OwnerRole::Identity(Role::Manager), id)?;
    Ok(Json(state.store.jobs(JobScope::Manager(id), &filter.statuses())?))
}

pub async fn list_contractors(State(state): State<AppState>, identity: RequestIdentity) -> AppResult<Json<Vec<Contractor>>> {
    let _timer = RequestTimer::start("get contractors");
    require_manager_or_admin(&identity)?;
    let scope = tenant_scope(&identity)?;
    Ok(Json(state.store.contractors(scope)?))
}

pub async fn get_contractor(State(state): State<AppState>, identity: RequestIdentity, Path(id): Path<String>) -> AppResult<Json<Contractor>> {
    let _timer = RequestTimer::start("get contractor");
    let id = parse_id(&id, "contractor")?;
    check_access(&state, &identity, &AccessGuard::contractor_owned(), OwnerRole::Identity(Role::Contractor), id)?;
    let contractor = state.store.contractor(id)?.ok_or_else(|| AppError::not_found("not_found", "Contractor not found"))?;
    Ok(Json(contractor))
}

pub async fn get_contractor_company(State(state): State<AppState>, identity: RequestIdentity, Path(id): Path<String>) -> AppResult<Json<Company>> {
    let _timer = RequestTimer::start("get contractor company");
    let id = parse_id(&id, "contractor")?;
    check_access(&state, &identity, &AccessGuard::contractor_owned(), OwnerRole::Identity(Role::Contractor), id)?;
    let contractor = state.store.contractor(id)?.ok_or_else(|| AppError::not_found("not_found", "Contractor company not found"))?;
    Ok(Json(company_of(&state, contractor.company_id, "Contractor company not found")?))
}

pub async fn get_contractor_jobs(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(id): Path<String>,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<ContractorJob>>> {
    let _timer = RequestTimer::start("get contractor jobs");
    let id = parse_id(&id, "contractor")?;
    check_access(&state, &identity, &AccessGuard::contractor_owned(), OwnerRole::Identity(Role::Contractor), id)?;
    Ok(Json(state.store.contractor_jobs(id, &filter.statuses())?))
}

pub async fn get_contractor_job(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path((id, job_id)): Path<(String, String)>,
) -> AppResult<Json<ContractorJob>> {
    let _timer = RequestTimer::start("get contractor job");
    let id = parse_id(&id, "contractor")?;
    let job_id = parse_id(&job_id, "job")?;
    check_access(&state, &identity, &AccessGuard::contractor_owned(), OwnerRole::Identity(Role::Contractor), id)?;
    let cj = state.store.contractor_job(id, job_id)?.ok_or_else(|| AppError::not_found("not_found", "ContractorJob not found"))?;
    Ok(Json(cj))
}

pub async fn list_jobs(State(state): State<AppState>, identity: RequestIdentity) -> AppResult<Json<Vec<Job>>> {
    let _timer = RequestTimer::start("get jobs");
    require_manager_or_admin(&identity)?;
    let scope = match tenant_scope(&identity)? {
        Some(tenant) => JobScope::Company(tenant),
        None => JobScope::All,
    };
    Ok(Json(state.store.jobs(scope, &[])?))
}

pub async fn get_job(State(state): State<AppState>, identity: RequestIdentity, Path(id): Path<String>) -> AppResult<Json<Job>> {
    let _timer = RequestTimer::start("get job");
    let id = parse_id(&id, "job")?;
    check_access(&state, &identity, &AccessGuard::company_scoped(), OwnerRole::Job, id)?;
    let job = state.store.job(id)?.ok_or_else(|| AppError::not_found("not_found", "job not found"))?;
    Ok(Json(job))
}

pub async fn get_job_contractors(State(state): State<AppState>, identity: RequestIdentity, Path(id): Path<String>) -> AppResult<Json<Vec<Contractor>>> {
    let _timer = RequestTimer::start("get job contractors");
    let id = parse_id(&id, "job")?;
    check_access(&state, &identity, &AccessGuard::company_scoped(), OwnerRole::Job, id)?;
    Ok(Json(state.store.job_contractors(id)?))
}
