//! Credential hashing with Argon2id.
//!
//! Stored credentials are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`),
//! so verification always uses the salt and cost parameters the credential was
//! created with, even after the configured cost changes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::fmt;
use thiserror::Error;

/// Plaintext passwords must be at least this many characters to be hashed
pub const MIN_PLAINTEXT_CHARS: usize = 1;
/// Plaintext passwords longer than this are refused before hashing
pub const MAX_PLAINTEXT_CHARS: usize = 256;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    /// Time cost (passes over memory)
    pub iterations: u32,
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for HashingConfig {
    /// OWASP's baseline for Argon2id: 19 MiB, 2 iterations, 1 lane.
    fn default() -> Self {
        Self {
            iterations: 2,
            memory_kib: 19 * 1024,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Password must be between 1 and 256 characters")]
    InvalidLength,

    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Salted one-way credential as persisted in the store
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCredential(String);

impl StoredCredential {
    /// Wrap a value read back from the store. It is not checked here;
    /// [`CredentialHasher::verify`] rejects anything malformed.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoredCredential(<redacted>)")
    }
}

/// Hashes and verifies passwords.
///
/// Both operations are CPU and memory heavy by design; async callers should
/// run them on a blocking thread.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy: StoredCredential,
}

impl CredentialHasher {
    /// Build a hasher and precompute the dummy credential used by
    /// [`verify_dummy`](Self::verify_dummy) with the same parameters.
    pub fn new(config: HashingConfig) -> Result<Self, HashError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| HashError::InvalidParams(e.to_string()))?;

        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy: StoredCredential(String::new()),
        };

        // Random throwaway plaintext: nobody can ever match the dummy.
        let throwaway = SaltString::generate(&mut OsRng);
        hasher.dummy = hasher.hash(throwaway.as_str())?;

        Ok(hasher)
    }

    /// Hash `plaintext` with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<StoredCredential, HashError> {
        if !within_bounds(plaintext) {
            return Err(HashError::InvalidLength);
        }

        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| StoredCredential(hash.to_string()))
            .map_err(|e| HashError::Hashing(e.to_string()))
    }

    /// Check `plaintext` against a stored credential.
    ///
    /// Malformed credentials and out-of-bounds plaintexts yield `false`.
    /// The digest comparison inside argon2 is constant time.
    pub fn verify(&self, plaintext: &str, stored: &StoredCredential) -> bool {
        let parsed = match PasswordHash::new(stored.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored credential could not be parsed");
                return false;
            }
        };

        if !within_bounds(plaintext) {
            return false;
        }

        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend the same effort as a real verification, then reject.
    ///
    /// Used when the login identifier does not exist so that the response
    /// time does not reveal it.
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        let _ = self.verify(plaintext, &self.dummy);
        false
    }
}

fn within_bounds(plaintext: &str) -> bool {
    let chars = plaintext.chars().count();
    (MIN_PLAINTEXT_CHARS..=MAX_PLAINTEXT_CHARS).contains(&chars)
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    // Minimum cost keeps the test suite fast.
    CredentialHasher::new(HashingConfig {
        iterations: 1,
        memory_kib: 8,
        parallelism: 1,
    })
    .unwrap()
}
