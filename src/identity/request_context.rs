use std::collections::BTreeMap;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;

use super::principal::{EntityId, Principal, Role, TenantId};
use crate::error::AuthError;

/// Verified caller of the current request. Built once by the middleware and
/// read-only afterwards. Admins carry no tenant and no entity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestIdentity {
    pub principal: Principal,
    pub tenant_id: Option<TenantId>,
    pub entity_id: Option<EntityId>,
}

impl RequestIdentity {
    pub fn role(&self) -> Role { self.principal.role }

    pub fn email(&self) -> &str { &self.principal.email }

    /// Attribute map `authEmail`, `authRole`, plus `authCompanyID` and
    /// `authId` for tenant-bound roles (unresolved ids render as `0`).
    pub fn attributes(&self) -> BTreeMap<&'static str, String> {
        let mut m = BTreeMap::new();
        m.insert("authEmail", self.principal.email.clone());
        m.insert("authRole", self.principal.role.to_string());
        if !self.principal.role.is_override() {
            m.insert("authCompanyID", self.tenant_id.map_or(0, |t| t.0).to_string());
            m.insert("authId", self.entity_id.map_or(0, |i| i.0).to_string());
        }
        m
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestIdentity {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestIdentity>().cloned().ok_or(AuthError::MissingCredential)
    }
}

pub fn require_admin(identity: &RequestIdentity) -> Result<(), AuthError> {
    if identity.role() == Role::Admin { return Ok(()); }
    Err(AuthError::AccessDenied("Admin access required".into()))
}

pub fn require_manager_or_admin(identity: &RequestIdentity) -> Result<(), AuthError> {
    if matches!(identity.role(), Role::Admin | Role::Manager) { return Ok(()); }
    Err(AuthError::AccessDenied("Admin or manager access required".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(role: Role, tenant: Option<u64>, id: Option<u64>) -> RequestIdentity {
        RequestIdentity { principal: Principal::new("x@test.com", role), tenant_id: tenant.map(TenantId), entity_id: id.map(EntityId) }
    }

    #[test]
    fn attributes_for_tenant_bound_role() {
        let a = ident(Role::Manager, Some(1), Some(3)).attributes();
        assert_eq!(a["authEmail"], "x@test.com");
        assert_eq!(a["authRole"], "manager");
        assert_eq!(a["authCompanyID"], "1");
        assert_eq!(a["authId"], "3");
    }

    #[test]
    fn attributes_render_unresolved_as_zero() {
        let a = ident(Role::Contractor, None, None).attributes();
        assert_eq!(a["authCompanyID"], "0");
        assert_eq!(a["authId"], "0");
    }

    #[test]
    fn admin_attributes_have_no_ids() {
        let a = ident(Role::Admin, None, None).attributes();
        assert_eq!(a.len(), 2);
        assert!(!a.contains_key("authCompanyID"));
    }

    #[test]
    fn role_gates() {
        assert!(require_admin(&ident(Role::Admin, None, None)).is_ok());
        assert_eq!(
            require_admin(&ident(Role::Manager, Some(1), Some(1))).unwrap_err(),
            AuthError::AccessDenied("Admin access required".into())
        );
        assert!(require_manager_or_admin(&ident(Role::Manager, Some(1), Some(1))).is_ok());
        assert!(require_manager_or_admin(&ident(Role::Admin, None, None)).is_ok());
        assert_eq!(
            require_manager_or_admin(&ident(Role::Contractor, Some(1), Some(1))).unwrap_err(),
            AuthError::AccessDenied("Admin or manager access required".into())
        );
    }
}
