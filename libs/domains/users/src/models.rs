use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::hasher::StoredCredential;

/// Store-assigned user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Display name that passed validation (trimmed, non-empty, length-bounded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserName(String);

impl UserName {
    pub(crate) fn new_validated(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Login identifier that passed validation: a syntactically valid email
/// address, trimmed and lower-cased
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoginId(String);

impl LoginId {
    pub(crate) fn new_validated(login: String) -> Self {
        Self(login)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plaintext password held only long enough to hash or verify it.
///
/// The buffer is wiped on drop and never printed.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    pub(crate) fn new_validated(password: String) -> Self {
        Self(Zeroizing::new(password))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Name prefix for searches (may be empty, length-bounded)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePrefix(String);

impl NamePrefix {
    pub(crate) fn new_validated(prefix: String) -> Self {
        Self(prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validated payload for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: UserName,
    pub login: LoginId,
    pub password: Password,
}

/// Validated partial payload for updating a user; at least one field is set
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: Option<UserName>,
    pub login: Option<LoginId>,
    pub password: Option<Password>,
}

/// Validated login attempt
#[derive(Debug, Clone)]
pub struct Credentials {
    pub login: LoginId,
    pub password: Password,
}

/// Row to insert; the credential is already hashed
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub name: UserName,
    pub login: LoginId,
    pub credential: StoredCredential,
}

/// Columns to change on an existing row; `None` leaves a column as is
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<UserName>,
    pub login: Option<LoginId>,
    pub credential: Option<StoredCredential>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.login.is_none() && self.credential.is_none()
    }
}

/// User entity - matches the `users` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Unique, lower-cased email address
    pub login: String,
    /// Argon2 PHC string (never exposed in responses)
    pub credential: StoredCredential,
}

/// Public view of a user, safe to hand to any caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub login: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            login: user.login,
        }
    }
}
