//! Stateless bearer tokens.
//!
//! A token is an HS256 JWT carrying `authEmail`, `authRole`, `iat` and `exp`.
//! Nothing else about the caller (tenant, numeric id) is ever put in the token;
//! those are re-resolved on every request. There is no server-side record of
//! issued tokens, so a token stays valid until `exp` passes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::principal::{Principal, Role};
use crate::tprintln;

pub type Token = String;

/// Default validity window for issued tokens.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenIssueError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("token lifetime must be at least one second")]
    ZeroLifetime,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "authEmail")]
    auth_email: String,
    #[serde(rename = "authRole")]
    auth_role: String,
    iat: i64,
    exp: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies tokens with a secret handed in at construction.
#[derive(Clone)]
pub struct TokenCodec {
    keys: Arc<Keys>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, TokenIssueError> {
        if secret.is_empty() { return Err(TokenIssueError::EmptySecret); }
        if ttl.as_secs() == 0 { return Err(TokenIssueError::ZeroLifetime); }
        let keys = Keys { encoding: EncodingKey::from_secret(secret), decoding: DecodingKey::from_secret(secret) };
        Ok(Self { keys: Arc::new(keys), ttl })
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    pub fn issue(&self, principal: &Principal) -> Result<Token, TokenIssueError> {
        self.issue_at(principal, Utc::now())
    }

    pub fn issue_at(&self, principal: &Principal, now: DateTime<Utc>) -> Result<Token, TokenIssueError> {
        let iat = now.timestamp();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            auth_email: principal.email.clone(),
            auth_role: principal.role.as_str().to_string(),
            iat,
            exp: iat.saturating_add(ttl_secs),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| TokenIssueError::Signing(e.to_string()))?;
        tprintln!("token.issue email={} role={} exp={}", principal.email, principal.role, claims.exp);
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Any failure rejects the whole token; no claim is trusted on its own.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the supplied clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.keys.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;
        let claims = data.claims;
        if now.timestamp() >= claims.exp { return Err(TokenError::Expired); }
        let role = claims.auth_role.parse::<Role>().map_err(|_| TokenError::Malformed)?;
        if claims.auth_email.is_empty() { return Err(TokenError::Malformed); }
        Ok(Principal { email: claims.auth_email, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn codec() -> TokenCodec { TokenCodec::new(b"unit-test-secret", Duration::from_secs(3600)).unwrap() }

    fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() }

    #[test]
    fn verify_returns_issued_principal() {
        let c = codec();
        for role in Role::ALL {
            let p = Principal::new("joshhhunt@gmail.com", role);
            let tok = c.issue_at(&p, t0()).unwrap();
            assert_eq!(c.verify_at(&tok, t0()).unwrap(), p);
        }
    }

    #[test]
    fn verify_with_wall_clock() {
        let c = codec();
        let p = Principal::new("a@x.com", Role::Manager);
        let tok = c.issue(&p).unwrap();
        assert_eq!(c.verify(&tok).unwrap(), p);
    }

    #[test]
    fn expiry_boundary() {
        let c = codec();
        let tok = c.issue_at(&Principal::new("a@x.com", Role::Contractor), t0()).unwrap();
        let just_before = t0() + chrono::Duration::seconds(3599);
        let at_exp = t0() + chrono::Duration::seconds(3600);
        assert!(c.verify_at(&tok, just_before).is_ok());
        assert_eq!(c.verify_at(&tok, at_exp), Err(TokenError::Expired));
        assert_eq!(c.verify_at(&tok, at_exp + chrono::Duration::days(30)), Err(TokenError::Expired));
    }

    #[test]
    fn other_secret_is_rejected() {
        let tok = codec().issue_at(&Principal::new("a@x.com", Role::Admin), t0()).unwrap();
        let other = TokenCodec::new(b"another-secret", Duration::from_secs(3600)).unwrap();
        assert_eq!(other.verify_at(&tok, t0()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn expired_token_with_foreign_signature_still_rejected() {
        let tok = codec().issue_at(&Principal::new("a@x.com", Role::Admin), t0()).unwrap();
        let other = TokenCodec::new(b"another-secret", Duration::from_secs(3600)).unwrap();
        assert!(other.verify_at(&tok, t0() + chrono::Duration::days(2)).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        let c = codec();
        for bad in ["", "abc", "a.b", "a.b.c", "Bearer", "...."] {
            assert_eq!(c.verify_at(bad, t0()), Err(TokenError::Malformed), "input {:?}", bad);
        }
    }

    #[test]
    fn unknown_role_claim_is_malformed() {
        let secret = b"unit-test-secret";
        let claims = Claims { auth_email: "a@x.com".into(), auth_role: "superuser".into(), iat: t0().timestamp(), exp: t0().timestamp() + 60 };
        let tok = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret)).unwrap();
        assert_eq!(codec().verify_at(&tok, t0()), Err(TokenError::Malformed));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let secret = b"unit-test-secret";
        let claims = Claims { auth_email: "a@x.com".into(), auth_role: "admin".into(), iat: t0().timestamp(), exp: t0().timestamp() + 60 };
        let tok = jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, &EncodingKey::from_secret(secret)).unwrap();
        assert_eq!(codec().verify_at(&tok, t0()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn construction_rejects_bad_config() {
        assert_eq!(TokenCodec::new(b"", Duration::from_secs(60)).unwrap_err(), TokenIssueError::EmptySecret);
        assert_eq!(TokenCodec::new(b"k", Duration::from_millis(500)).unwrap_err(), TokenIssueError::ZeroLifetime);
    }
}
