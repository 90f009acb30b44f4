use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{SaltString, PasswordHash};

/// Opaque secret hashing capability. Login only ever calls `verify`; seeding and
/// tests call `hash`.
pub trait CredentialVerifier: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String>;
    fn verify(&self, digest: &str, secret: &str) -> bool;
}

/// Argon2id with default parameters, digests stored as PHC strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, secret: &str) -> Result<String> { hash_password(secret) }
    fn verify(&self, digest: &str, secret: &str) -> bool { verify_password(digest, secret) }
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

/// A digest that does not parse as PHC never matches.
pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        tracing::warn!(target: "tenantgate::security", "stored password digest is not a PHC string");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let v = Argon2Verifier;
        let phc = v.hash("123456").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(v.verify(&phc, "123456"));
        assert!(!v.verify(&phc, "111"));
        assert!(!v.verify(&phc, ""));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("pw").unwrap(), hash_password("pw").unwrap());
    }

    #[test]
    fn non_phc_digest_never_matches() {
        assert!(!verify_password("pw", "pw"));
        assert!(!verify_password("", ""));
        assert!(!verify_password("$2a$04$notbcryptreally", "pw"));
    }
}
