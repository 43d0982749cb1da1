use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::core::config::AuthSettings;

/// Argon2id hashing with the cost parameters from `[auth]`.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    min_length: usize,
}

impl PasswordHasher {
    pub fn new(settings: &AuthSettings) -> Result<Self> {
        let params = Params::new(
            settings.hash_memory_kib,
            settings.hash_iterations,
            settings.hash_parallelism,
            None,
        )
        .map_err(|e| anyhow!("Invalid Argon2 parameters: {e}"))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            min_length: settings.min_password_length,
        })
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn is_acceptable(&self, password: &str) -> bool {
        password.chars().count() >= self.min_length
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash format: {e}"))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("Password verification failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&AuthSettings {
            hash_memory_kib: 1024,
            hash_iterations: 1,
            ..AuthSettings::default()
        })
        .expect("Failed to create hasher")
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse").expect("Failed to hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).expect("Failed to verify"));
        assert!(!hasher.verify("wrong horse", &hash).expect("Failed to verify"));
    }

    #[test]
    fn test_invalid_hash_is_an_error() {
        assert!(hasher().verify("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_min_length() {
        let hasher = hasher();
        assert!(!hasher.is_acceptable("short"));
        assert!(hasher.is_acceptable("long enough"));
    }
}
