use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::config::UserConfig;
use crate::error::{UserError, UserResult};
use crate::hasher::{CredentialHasher, HashError, StoredCredential};
use crate::models::{NewUserRecord, Password, UserChanges, UserId, UserResponse};
use crate::repository::UserRepository;
use crate::validation::InputValidator;

/// Service layer for user management and authentication.
///
/// Holds no per-request state; clones share the repository and hasher.
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    hasher: Arc<CredentialHasher>,
    validator: InputValidator,
    operation_timeout: Duration,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R, config: &UserConfig) -> Result<Self, HashError> {
        Ok(Self {
            repository: Arc::new(repository),
            hasher: Arc::new(CredentialHasher::new(config.hashing)?),
            validator: config.validator(),
            operation_timeout: config.operation_timeout,
        })
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Create a user from an untrusted payload
    #[instrument(skip_all)]
    pub async fn create_user(&self, raw: &Value) -> UserResult<UserResponse> {
        let input = self.validator.validate_create(raw)?;

        // Advisory only: the unique constraint decides concurrent creates
        if self
            .bounded("find_by_login", self.repository.find_by_login(&input.login))
            .await?
            .is_some()
        {
            return Err(UserError::Conflict);
        }

        let credential = self.hash_password(input.password).await?;
        let record = NewUserRecord {
            name: input.name,
            login: input.login,
            credential,
        };

        let user = self
            .bounded("insert", self.repository.insert(record))
            .await?;
        Ok(user.into())
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: UserId) -> UserResult<UserResponse> {
        let user = self
            .bounded("find_by_id", self.repository.find_by_id(id))
            .await?
            .ok_or(UserError::NotFound(id))?;

        Ok(user.into())
    }

    /// Every user when `name_prefix` is `None`, otherwise the users whose
    /// name starts with it. Both ordered by id.
    #[instrument(skip(self))]
    pub async fn list_or_search_users(&self, name_prefix: Option<&str>) -> UserResult<Vec<UserResponse>> {
        let users = match name_prefix {
            None => self.bounded("list_all", self.repository.list_all()).await?,
            Some(raw) => {
                let prefix = self.validator.validate_name_prefix(raw)?;
                self.bounded(
                    "search_by_name_prefix",
                    self.repository.search_by_name_prefix(&prefix),
                )
                .await?
            }
        };

        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    #[instrument(skip(self, raw), fields(user_id = %id))]
    pub async fn update_user(&self, id: UserId, raw: &Value) -> UserResult<UserResponse> {
        let input = self.validator.validate_update(raw)?;

        let credential = match input.password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };
        let changes = UserChanges {
            name: input.name,
            login: input.login,
            credential,
        };

        let user = self
            .bounded("update", self.repository.update(id, changes))
            .await?;
        Ok(user.into())
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: UserId) -> UserResult<()> {
        let deleted = self
            .bounded("delete_by_id", self.repository.delete_by_id(id))
            .await?;

        if !deleted {
            return Err(UserError::NotFound(id));
        }

        Ok(())
    }

    /// Check a login attempt.
    ///
    /// Unknown logins and wrong passwords both cost one full verification
    /// and both yield [`UserError::Unauthorized`].
    #[instrument(skip_all)]
    pub async fn authenticate(&self, raw: &Value) -> UserResult<UserResponse> {
        let credentials = self.validator.validate_credentials(raw)?;

        let user = self
            .bounded("find_by_login", self.repository.find_by_login(&credentials.login))
            .await?;

        match user {
            Some(user) => {
                let stored = user.credential.clone();
                if self.verify_password(credentials.password, Some(stored)).await? {
                    tracing::info!(user_id = %user.id, "User authenticated");
                    Ok(user.into())
                } else {
                    tracing::info!(user_id = %user.id, "Authentication rejected");
                    Err(UserError::Unauthorized)
                }
            }
            None => {
                self.verify_password(credentials.password, None).await?;
                tracing::info!("Authentication rejected");
                Err(UserError::Unauthorized)
            }
        }
    }

    /// Bound a store call by the configured operation timeout.
    async fn bounded<T, F>(&self, op: &'static str, operation: F) -> UserResult<T>
    where
        F: Future<Output = UserResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    op,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "User store operation timed out"
                );
                Err(UserError::Timeout)
            }
        }
    }

    // Argon2 is deliberately slow, so it runs on the blocking pool.

    async fn hash_password(&self, password: Password) -> UserResult<StoredCredential> {
        let hasher = Arc::clone(&self.hasher);

        let result = tokio::task::spawn_blocking(move || hasher.hash(password.expose()))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Hashing task failed");
                UserError::Internal("credential hasher")
            })?;

        Ok(result?)
    }

    /// Verify against `stored`, or against the dummy credential when there is none.
    async fn verify_password(&self, password: Password, stored: Option<StoredCredential>) -> UserResult<bool> {
        let hasher = Arc::clone(&self.hasher);

        tokio::task::spawn_blocking(move || match stored {
            Some(stored) => hasher.verify(password.expose(), &stored),
            None => hasher.verify_dummy(password.expose()),
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Verification task failed");
            UserError::Internal("credential hasher")
        })
    }
}
