use thiserror::Error;

use crate::hasher::HashError;
use crate::models::UserId;
use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("User not found: {0}")]
    NotFound(UserId),

    #[error("Login identifier already in use")]
    Conflict,

    /// Deliberately uninformative: unknown login and wrong password look alike
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Operation timed out")]
    Timeout,

    /// Details are logged where the failure happens, never carried here
    #[error("Internal error in {0}")]
    Internal(&'static str),
}

pub type UserResult<T> = Result<T, UserError>;

/// Stable category of a [`UserError`], for transport layers to map onto
/// status codes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    ValidationFailed,
    NotFound,
    Conflict,
    Unauthorized,
    Timeout,
    #[strum(serialize = "internal_error")]
    Internal,
}

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::Validation(_) => ErrorKind::ValidationFailed,
            UserError::NotFound(_) => ErrorKind::NotFound,
            UserError::Conflict => ErrorKind::Conflict,
            UserError::Unauthorized => ErrorKind::Unauthorized,
            UserError::Timeout => ErrorKind::Timeout,
            UserError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only a timeout may succeed when the same call is repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UserError::Timeout)
    }

    /// Field errors of a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            UserError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FieldErrors> for UserError {
    fn from(errors: FieldErrors) -> Self {
        UserError::Validation(errors)
    }
}

impl From<HashError> for UserError {
    fn from(err: HashError) -> Self {
        tracing::error!(error = %err, "Credential hashing failed");
        UserError::Internal("credential hasher")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Reason;

    #[test]
    fn test_kinds_are_stable_codes() {
        assert_eq!(UserError::Conflict.kind().to_string(), "conflict");
        assert_eq!(UserError::NotFound(UserId(7)).kind().to_string(), "not_found");
        assert_eq!(UserError::Internal("user store").kind().to_string(), "internal_error");
        assert_eq!(
            UserError::from(FieldErrors::single("login", Reason::Required))
                .kind()
                .to_string(),
            "validation_failed"
        );
    }

    #[test]
    fn test_only_timeout_is_retryable() {
        assert!(UserError::Timeout.is_retryable());
        assert!(!UserError::Conflict.is_retryable());
        assert!(!UserError::Internal("user store").is_retryable());
        assert!(!UserError::Unauthorized.is_retryable());
    }

    #[test]
    fn test_messages_carry_no_detail() {
        assert_eq!(UserError::Unauthorized.to_string(), "Invalid credentials");
        assert_eq!(
            UserError::from(HashError::Hashing("argon2 internals".to_string())).to_string(),
            "Internal error in credential hasher"
        );
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = UserError::Validation(FieldErrors::single("name", Reason::Blank));
        assert_eq!(err.to_string(), "Validation failed: name: blank");
        assert!(err.field_errors().unwrap().contains("name", Reason::Blank));
        assert!(UserError::Conflict.field_errors().is_none());
    }
}
