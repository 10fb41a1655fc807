use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::utils::error::{ApiError, ApiResult};

// Argon2id with the crate's recommended cost; `secret` is an optional pepper (HASH_SECRET).
fn hasher(secret: &str) -> ApiResult<Argon2<'_>> {
    if secret.is_empty() {
        return Ok(Argon2::default());
    }
    Argon2::new_with_secret(
        secret.as_bytes(),
        Algorithm::Argon2id,
        Version::V0x13,
        Params::default(),
    )
    .map_err(|e| ApiError::server(format!("Invalid hash secret: {e}")))
}

pub fn hash_password(password: &str, secret: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher(secret)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::server(format!("Failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; an unparseable stored hash is a server error.
pub fn verify_password(password: &str, hash: &str, secret: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::server(format!("Stored password hash is malformed: {e}")))?;
    Ok(hasher(secret)?
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("secret1", "").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash, "").unwrap());
        assert!(!verify_password("secret2", &hash, "").unwrap());
    }

    #[test]
    fn pepper_must_match() {
        let hash = hash_password("secret1", "pepper").unwrap();
        assert!(verify_password("secret1", &hash, "pepper").unwrap());
        assert!(!verify_password("secret1", &hash, "other").unwrap());
    }

    #[test]
    fn salts_differ() {
        assert_ne!(
            hash_password("secret1", "").unwrap(),
            hash_password("secret1", "").unwrap()
        );
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("secret1", "not-a-hash", "").is_err());
    }
}
