use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::principal::Principal;
use super::token::{Token, TokenCodec};
use crate::error::{AuthError, MISSING_LOGIN_FIELDS_MSG};
use crate::security::CredentialVerifier;
use crate::storage::IdentityStore;
use crate::tprintln;

/// Login body. Missing fields deserialize as empty and are rejected by `login`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub token: Token,
    pub principal: Principal,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AuthError>;
}

/// Checks credentials against the store's login table and issues a token.
pub struct LocalAuthProvider {
    pub store: Arc<dyn IdentityStore>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub codec: TokenCodec,
}

impl LocalAuthProvider {
    pub fn new(store: Arc<dyn IdentityStore>, verifier: Arc<dyn CredentialVerifier>, codec: TokenCodec) -> Self {
        Self { store, verifier, codec }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AuthError> {
        if req.email.is_empty() || req.password.is_empty() {
            return Err(AuthError::BadRequest(MISSING_LOGIN_FIELDS_MSG.to_string()));
        }
        let user = match self.store.lookup_user(&req.email) {
            Ok(Some(u)) => u,
            Ok(None) => {
                info!(target: "tenantgate::auth", "login for unknown email {}", req.email);
                return Err(AuthError::IdentityNotFound);
            }
            Err(e) => {
                warn!(target: "tenantgate::auth", "login lookup failed for {}: {}", req.email, e);
                return Err(AuthError::Internal("login lookup failed".into()));
            }
        };
        if !self.verifier.verify(&user.password_hash, &req.password) {
            info!(target: "tenantgate::auth", "password mismatch for {}", req.email);
            return Err(AuthError::CredentialMismatch);
        }
        let principal = Principal::new(user.email, user.role);
        let token = self.codec.issue(&principal).map_err(|e| {
            warn!(target: "tenantgate::auth", "token signing failed: {}", e);
            AuthError::Internal("failed to issue token".into())
        })?;
        tprintln!("auth.login email={} role={}", principal.email, principal.role);
        info!(target: "tenantgate::auth", "login ok email={} role={}", principal.email, principal.role);
        Ok(LoginResponse { token, principal })
    }
}
