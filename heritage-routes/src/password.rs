//! Argon2id hashing on the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use error_stack::{Report, ResultExt};

#[derive(Debug, thiserror::Error)]
pub enum PasswordErr {
    #[error("failed to hash password")]
    Hash,
    #[error("stored password hash is malformed")]
    MalformedHash,
    #[error("password task was cancelled")]
    Join,
}

pub async fn hash(password: String) -> Result<String, Report<PasswordErr>> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| Report::new(PasswordErr::Hash).attach(e.to_string()))
    })
    .await
    .change_context(PasswordErr::Join)?
}

/// `Ok(false)` when the password does not match.
pub async fn verify(password: String, hash: String) -> Result<bool, Report<PasswordErr>> {
    tokio::task::spawn_blocking(move || -> Result<bool, Report<PasswordErr>> {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| Report::new(PasswordErr::MalformedHash).attach(e.to_string()))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .change_context(PasswordErr::Join)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashed_password_verifies() {
        let hashed = hash("namaste123".into()).await.unwrap();

        assert!(hashed.starts_with("$argon2id$"));
        assert!(verify("namaste123".into(), hashed.clone()).await.unwrap());
        assert!(!verify("namaste124".into(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(verify("pw".into(), "not-a-hash".into()).await.is_err());
    }
}
