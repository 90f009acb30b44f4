//! Declarative access policy for a single resource access.
//!
//! A policy names up to three tiers, tried in order:
//! 1. self access: the accessor has the policy's self role and its id equals
//!    the owner id. The owner role is not consulted;
//! 2. override: the accessor's role grants access unconditionally;
//! 3. same tenant: the accessor's role is listed and both sides resolve to
//!    the same company.
//!
//! Tiers 1 and 2 never consult the resolver. An unresolved tenant on either
//! side of tier 3 denies.

use tracing::debug;

use super::principal::{EntityId, Role};
use super::resolver::{OwnerRole, TenantResolver};
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessCheck {
    pub accessor_role: Role,
    /// `None` when the accessor's identity row could not be resolved.
    pub accessor_id: Option<EntityId>,
    pub owner_role: OwnerRole,
    pub owner_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGuard {
    pub same_user_role: Option<Role>,
    pub same_company_roles: Vec<Role>,
    pub overriding_roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTier {
    SameUser,
    Overriding,
    SameCompany,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow(AccessTier),
    Deny { explanation: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool { matches!(self, AccessDecision::Allow(_)) }
}

impl AccessGuard {
    /// Contractor records and everything hanging off them.
    pub fn contractor_owned() -> Self {
        Self { same_user_role: Some(Role::Contractor), same_company_roles: vec![Role::Manager], overriding_roles: vec![Role::Admin] }
    }

    /// Company-owned resources: company listings, manager records, jobs.
    pub fn company_scoped() -> Self {
        Self { same_user_role: None, same_company_roles: vec![Role::Manager], overriding_roles: vec![Role::Admin] }
    }

    /// The company record itself. The contractor self tier compares the
    /// contractor's id with the company id.
    pub fn company_record() -> Self {
        Self { same_user_role: Some(Role::Contractor), same_company_roles: vec![Role::Manager], overriding_roles: vec![Role::Admin] }
    }

    pub fn can_access<R: TenantResolver + ?Sized>(&self, resolver: &R, check: &AccessCheck) -> bool {
        self.decide(resolver, check).is_allowed()
    }

    pub fn authorize<R: TenantResolver + ?Sized>(&self, resolver: &R, check: &AccessCheck) -> Result<AccessTier, AuthError> {
        match self.decide(resolver, check) {
            AccessDecision::Allow(tier) => Ok(tier),
            AccessDecision::Deny { explanation } => Err(AuthError::AccessDenied(explanation)),
        }
    }

    pub fn decide<R: TenantResolver + ?Sized>(&self, resolver: &R, check: &AccessCheck) -> AccessDecision {
        let decision = self.evaluate(resolver, check);
        match &decision {
            AccessDecision::Allow(tier) => debug!(target: "tenantgate::guard", "allow {:?}: {} #{:?} -> {} #{}",
                tier, check.accessor_role, check.accessor_id.map(|i| i.0), check.owner_role.as_str(), check.owner_id),
            AccessDecision::Deny { .. } => debug!(target: "tenantgate::guard", "deny: {} #{:?} -> {} #{}",
                check.accessor_role, check.accessor_id.map(|i| i.0), check.owner_role.as_str(), check.owner_id),
        }
        decision
    }

    fn evaluate<R: TenantResolver + ?Sized>(&self, resolver: &R, check: &AccessCheck) -> AccessDecision {
        if let Some(self_role) = self.same_user_role {
            if check.accessor_role == self_role && check.accessor_id == Some(check.owner_id) {
                return AccessDecision::Allow(AccessTier::SameUser);
            }
        }
        if self.overriding_roles.contains(&check.accessor_role) {
            return AccessDecision::Allow(AccessTier::Overriding);
        }
        if !self.same_company_roles.contains(&check.accessor_role) {
            return self.deny();
        }
        let Some(accessor_id) = check.accessor_id else { return self.deny() };
        let Some(accessor_tenant) = resolver.tenant_of(check.accessor_role, accessor_id) else { return self.deny() };
        match resolver.owner_tenant(check.owner_role, check.owner_id) {
            Some(owner_tenant) if owner_tenant == accessor_tenant => AccessDecision::Allow(AccessTier::SameCompany),
            _ => self.deny(),
        }
    }

    fn deny(&self) -> AccessDecision { AccessDecision::Deny { explanation: self.explain() } }

    /// Human-readable statement of what this policy requires.
    pub fn explain(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(r) = self.same_user_role {
            parts.push(format!("same user of type {}", r));
        }
        if !self.same_company_roles.is_empty() {
            parts.push(format!("same company with user type/s {}", join_roles(&self.same_company_roles)));
        }
        if !self.overriding_roles.is_empty() {
            let prefix = if parts.is_empty() { "" } else { "or " };
            parts.push(format!("{}user type/s {}", prefix, join_roles(&self.overriding_roles)));
        }
        if parts.is_empty() { return "You need to meet the following auth: none.".to_string(); }
        format!("You need to meet the following auth: {}.", parts.join(", "))
    }
}

fn join_roles(roles: &[Role]) -> String {
    roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(" ")
}
