//! PostgreSQL implementation of [`UserRepository`].
//!
//! Each operation runs exactly one statement from the constants below. User
//! supplied values only ever travel as bound parameters; no SQL is assembled
//! at runtime.

use async_trait::async_trait;
use database::{DatabaseConnection, DatabaseError, DbErr};
use sea_orm::{ConnectionTrait, DbBackend, FromQueryResult, Statement, Value};

use crate::error::{UserError, UserResult};
use crate::hasher::StoredCredential;
use crate::models::{LoginId, NamePrefix, NewUserRecord, User, UserChanges, UserId};
use crate::repository::UserRepository;

pub(crate) const SELECT_BY_ID: &str =
    "SELECT id, name, login_identifier, credential_hash FROM users WHERE id = $1";

pub(crate) const SELECT_BY_LOGIN: &str =
    "SELECT id, name, login_identifier, credential_hash FROM users WHERE login_identifier = $1";

pub(crate) const SEARCH_BY_NAME_PREFIX: &str = "SELECT id, name, login_identifier, credential_hash FROM users \
     WHERE starts_with(lower(name), lower($1)) ORDER BY id ASC";

pub(crate) const SELECT_ALL: &str =
    "SELECT id, name, login_identifier, credential_hash FROM users ORDER BY id ASC";

pub(crate) const INSERT: &str = "INSERT INTO users (name, login_identifier, credential_hash) VALUES ($1, $2, $3) \
     RETURNING id, name, login_identifier, credential_hash";

pub(crate) const UPDATE: &str = "UPDATE users SET name = COALESCE($2, name), \
     login_identifier = COALESCE($3, login_identifier), \
     credential_hash = COALESCE($4, credential_hash) \
     WHERE id = $1 RETURNING id, name, login_identifier, credential_hash";

pub(crate) const DELETE_BY_ID: &str = "DELETE FROM users WHERE id = $1";

#[derive(Clone)]
pub struct PostgresUserRepository {
    db: DatabaseConnection,
}

impl PostgresUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, op: &'static str, sql: &str, values: Vec<Value>) -> UserResult<Option<User>> {
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);

        let row = UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| store_error(op, e))?;

        Ok(row.map(User::from))
    }

    async fn fetch_all(&self, op: &'static str, sql: &str, values: Vec<Value>) -> UserResult<Vec<User>> {
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);

        let rows = UserRow::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(|e| store_error(op, e))?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}

/// Columns read back from the `users` table.
/// No Debug: the credential hash must not end up in logs.
#[derive(FromQueryResult)]
struct UserRow {
    id: i64,
    name: String,
    login_identifier: String,
    credential_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            name: row.name,
            login: row.login_identifier,
            credential: StoredCredential::from_stored(row.credential_hash),
        }
    }
}

/// Classify a store failure. The raw error is logged here and goes no further.
fn store_error(op: &'static str, err: DbErr) -> UserError {
    match DatabaseError::classify(err) {
        DatabaseError::UniqueViolation => UserError::Conflict,
        transient if transient.is_transient() => {
            tracing::warn!(op, error = %transient, "Transient user store failure");
            UserError::Timeout
        }
        other => {
            tracing::error!(op, error = %other, "User store operation failed");
            UserError::Internal("user store")
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> UserResult<Option<User>> {
        self.fetch_one("find_by_id", SELECT_BY_ID, vec![id.0.into()]).await
    }

    async fn find_by_login(&self, login: &LoginId) -> UserResult<Option<User>> {
        self.fetch_one("find_by_login", SELECT_BY_LOGIN, vec![login.as_str().into()])
            .await
    }

    async fn search_by_name_prefix(&self, prefix: &NamePrefix) -> UserResult<Vec<User>> {
        // starts_with('x', '') is true in PostgreSQL
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        self.fetch_all(
            "search_by_name_prefix",
            SEARCH_BY_NAME_PREFIX,
            vec![prefix.as_str().into()],
        )
        .await
    }

    async fn list_all(&self) -> UserResult<Vec<User>> {
        self.fetch_all("list_all", SELECT_ALL, Vec::new()).await
    }

    async fn insert(&self, record: NewUserRecord) -> UserResult<User> {
        let values = vec![
            record.name.as_str().into(),
            record.login.as_str().into(),
            record.credential.as_str().into(),
        ];

        let user = self
            .fetch_one("insert", INSERT, values)
            .await?
            .ok_or(UserError::Internal("user store"))?;

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> UserResult<User> {
        let values: Vec<Value> = vec![
            id.0.into(),
            changes.name.map(|n| n.as_str().to_string()).into(),
            changes.login.map(|l| l.as_str().to_string()).into(),
            changes.credential.map(|c| c.as_str().to_string()).into(),
        ];

        let user = self
            .fetch_one("update", UPDATE, values)
            .await?
            .ok_or(UserError::NotFound(id))?;

        tracing::info!(user_id = %id, "Updated user");
        Ok(user)
    }

    async fn delete_by_id(&self, id: UserId) -> UserResult<bool> {
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, DELETE_BY_ID, [id.0.into()]);

        let result = self
            .db
            .execute_raw(stmt)
            .await
            .map_err(|e| store_error("delete_by_id", e))?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(user_id = %id, "Deleted user");
        }
        Ok(deleted)
    }
}
