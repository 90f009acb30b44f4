//! Request identity middleware.
//!
//! Per request: read `Authorization`, strip `Bearer `, verify the token,
//! resolve tenant and entity id for non-admin roles, and insert one immutable
//! `RequestIdentity` into the request extensions before dispatching. Any
//! failure short-circuits with a 401.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info, Instrument};

use super::principal::Role;
use super::request_context::RequestIdentity;
use super::resolver::IdentityResolver;
use super::token::{TokenCodec, TokenError};
use crate::error::AuthError;

/// State the middleware needs: a verifier for tokens and a resolver for ids.
#[derive(Clone)]
pub struct IdentityLayer {
    pub codec: TokenCodec,
    pub resolver: IdentityResolver,
}

impl IdentityLayer {
    pub fn new(codec: TokenCodec, resolver: IdentityResolver) -> Self { Self { codec, resolver } }

    /// Turn the raw `Authorization` value into a resolved identity.
    pub fn authenticate(&self, header: Option<&str>) -> Result<RequestIdentity, AuthError> {
        let raw = header.map(str::trim).unwrap_or("");
        if raw.is_empty() { return Err(AuthError::MissingCredential); }
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        let principal = self.codec.verify(token).map_err(|e| {
            info!(target: "tenantgate::auth", "rejected token: {}", e);
            AuthError::InvalidCredential(e)
        })?;
        let (tenant_id, entity_id) = match principal.role {
            Role::Admin => (None, None),
            role => match self.resolver.resolve_identity(&principal.email, role) {
                Some(rec) => (rec.tenant_id, Some(rec.entity_id)),
                None => (None, None),
            },
        };
        Ok(RequestIdentity { principal, tenant_id, entity_id })
    }
}

/// A present header that is not visible ASCII is a malformed credential, not a missing one.
fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| {
            info!(target: "tenantgate::auth", "rejected token: Authorization header is not visible ASCII");
            AuthError::InvalidCredential(TokenError::Malformed)
        }))
        .transpose()
}

pub async fn require_identity(State(layer): State<IdentityLayer>, mut req: Request, next: Next) -> Result<Response, AuthError> {
    let identity = layer.authenticate(authorization_header(req.headers())?)?;
    let span = tracing::info_span!(
        "request",
        request_id = %uuid::Uuid::new_v4(),
        email = %identity.principal.email,
        role = %identity.principal.role,
    );
    debug!(target: "tenantgate::auth", "identity {} {} tenant={:?} id={:?}",
        identity.principal.email, identity.principal.role, identity.tenant_id.map(|t| t.0), identity.entity_id.map(|i| i.0));
    req.extensions_mut().insert(identity);
    Ok(next.run(req).instrument(span).await)
}
