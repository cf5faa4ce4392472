/// Password hashing and verification using Argon2id
use crate::config::PasswordSettings;
use crate::error::{IdentityError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Argon2id hasher with tuned cost parameters
///
/// Holds a pre-computed hash of a throwaway password so that logins for
/// unknown emails still pay for one full verification.
#[derive(Clone)]
pub struct PasswordHasherService {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl PasswordHasherService {
    pub fn new(settings: PasswordSettings) -> Result<Self> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| IdentityError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let dummy_hash = hash_with(&argon2, "timing-equalizer-not-a-password")?;

        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a password with a fresh random salt
    ///
    /// Returns a PHC-formatted string safe for database storage.
    pub fn hash(&self, password: &str) -> Result<String> {
        hash_with(&self.argon2, password)
    }

    /// Verify a password against its stored hash
    ///
    /// Parameters are read from the PHC string, so hashes made with older
    /// cost settings still verify.
    pub fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| IdentityError::Internal(format!("Invalid password hash format: {}", e)))?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(IdentityError::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }

    /// Burn one verification against the dummy hash. Result is ignored.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| IdentityError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    Ok(password_hash)
}
