//! Argon2 hashing and verification.
//!
//! Both operations are deliberately slow, so they run on the blocking pool.

use argon2::{
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct PasswordHasher {
    /// Verified against when the username is unknown, so that path costs the
    /// same as a wrong password.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new() -> Result<Self> {
        let dummy_hash = hash_blocking("sweeter-than-fiction-dummy")?;
        Ok(Self { dummy_hash })
    }

    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(&password)).await?
    }

    pub async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        let ok = tokio::task::spawn_blocking(move || verify_blocking(&password, &stored_hash)).await?;
        Ok(ok)
    }

    /// Burns one verification against the dummy hash. The result is always
    /// false.
    pub async fn verify_dummy(&self, password: &str) -> Result<bool> {
        self.verify(password, &self.dummy_hash).await?;
        Ok(false)
    }
}

fn hash_blocking(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_blocking(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is not a valid PHC string: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new().unwrap();
        let hash = hasher.hash("abc12345").await.unwrap();

        assert_ne!(hash, "abc12345");
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("abc12345", &hash).await.unwrap());
        assert!(!hasher.verify("abc12346", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new().unwrap();
        let a = hasher.hash("abc12345").await.unwrap();
        let b = hasher.hash("abc12345").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_never_verifies() {
        let hasher = PasswordHasher::new().unwrap();
        assert!(!hasher.verify("abc12345", "not-a-hash").await.unwrap());
        assert!(!hasher.verify_dummy("sweeter-than-fiction-dummy").await.unwrap());
    }
}
