use core_config::{env_parse, ConfigError, FromEnv};
use std::time::Duration;

use crate::hasher::{HashingConfig, MAX_PLAINTEXT_CHARS, MIN_PLAINTEXT_CHARS};
use crate::validation::{InputValidator, UnknownFieldPolicy};

/// Settings for the user service
#[derive(Debug, Clone)]
pub struct UserConfig {
    pub hashing: HashingConfig,
    /// Shortest password accepted on create and update
    pub min_password_length: usize,
    /// Ignore payload keys a schema does not declare instead of rejecting them
    pub allow_unknown_fields: bool,
    /// Upper bound for each store operation
    pub operation_timeout: Duration,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            hashing: HashingConfig::default(),
            min_password_length: 8,
            allow_unknown_fields: false,
            operation_timeout: Duration::from_millis(5000),
        }
    }
}

impl UserConfig {
    pub fn unknown_field_policy(&self) -> UnknownFieldPolicy {
        UnknownFieldPolicy::from_allow_flag(self.allow_unknown_fields)
    }

    pub fn validator(&self) -> InputValidator {
        InputValidator::new(self.min_password_length, self.unknown_field_policy())
    }
}

/// Environment variables:
/// - `HASH_COST` Argon2 iterations (default: 2)
/// - `HASH_MEMORY_KIB` (default: 19456)
/// - `HASH_PARALLELISM` (default: 1)
/// - `MIN_PASSWORD_LENGTH` (default: 8, between 1 and 256)
/// - `ALLOW_UNKNOWN_FIELDS` (default: false)
/// - `DB_OPERATION_TIMEOUT_MS` (default: 5000)
impl FromEnv for UserConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let min_password_length = env_parse("MIN_PASSWORD_LENGTH", defaults.min_password_length)?;
        if !(MIN_PLAINTEXT_CHARS..=MAX_PLAINTEXT_CHARS).contains(&min_password_length) {
            return Err(ConfigError::ParseError {
                key: "MIN_PASSWORD_LENGTH".to_string(),
                details: format!(
                    "must be between {} and {}, got {}",
                    MIN_PLAINTEXT_CHARS, MAX_PLAINTEXT_CHARS, min_password_length
                ),
            });
        }

        let timeout_ms: u64 = env_parse(
            "DB_OPERATION_TIMEOUT_MS",
            defaults.operation_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            hashing: HashingConfig {
                iterations: env_parse("HASH_COST", defaults.hashing.iterations)?,
                memory_kib: env_parse("HASH_MEMORY_KIB", defaults.hashing.memory_kib)?,
                parallelism: env_parse("HASH_PARALLELISM", defaults.hashing.parallelism)?,
            },
            min_password_length,
            allow_unknown_fields: env_parse("ALLOW_UNKNOWN_FIELDS", defaults.allow_unknown_fields)?,
            operation_timeout: Duration::from_millis(timeout_ms),
        })
    }
}
