use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::{LoginId, NamePrefix, NewUserRecord, User, UserChanges, UserId};

/// Data access for users.
///
/// Every operation is a single atomic statement against the store. Listing
/// operations return users ordered by id ascending.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> UserResult<Option<User>>;

    async fn find_by_login(&self, login: &LoginId) -> UserResult<Option<User>>;

    /// Users whose name starts with `prefix`, ignoring case. An empty prefix
    /// matches nothing.
    async fn search_by_name_prefix(&self, prefix: &NamePrefix) -> UserResult<Vec<User>>;

    async fn list_all(&self) -> UserResult<Vec<User>>;

    /// Insert a row; [`UserError::Conflict`] if the login is taken.
    async fn insert(&self, record: NewUserRecord) -> UserResult<User>;

    /// Apply `changes`; [`UserError::NotFound`] if the id is absent,
    /// [`UserError::Conflict`] if the new login is taken.
    async fn update(&self, id: UserId, changes: UserChanges) -> UserResult<User>;

    /// Returns whether a row was deleted.
    async fn delete_by_id(&self, id: UserId) -> UserResult<bool>;
}

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<UserId, User>,
}

impl Table {
    fn login_taken(&self, login: &LoginId, except: Option<UserId>) -> bool {
        self.rows
            .values()
            .any(|u| u.login == login.as_str() && Some(u.id) != except)
    }
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_login(&self, login: &LoginId) -> UserResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|u| u.login == login.as_str())
            .cloned())
    }

    async fn search_by_name_prefix(&self, prefix: &NamePrefix) -> UserResult<Vec<User>> {
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        let needle = prefix.as_str().to_lowercase();
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|u| u.name.to_lowercase().starts_with(&needle))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> UserResult<Vec<User>> {
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn insert(&self, record: NewUserRecord) -> UserResult<User> {
        let mut table = self.table.write().await;

        if table.login_taken(&record.login, None) {
            return Err(UserError::Conflict);
        }

        table.next_id += 1;
        let user = User {
            id: UserId(table.next_id),
            name: record.name.as_str().to_string(),
            login: record.login.as_str().to_string(),
            credential: record.credential,
        };
        table.rows.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    async fn update(&self, id: UserId, changes: UserChanges) -> UserResult<User> {
        let mut table = self.table.write().await;

        if !table.rows.contains_key(&id) {
            return Err(UserError::NotFound(id));
        }
        if let Some(login) = &changes.login
            && table.login_taken(login, Some(id))
        {
            return Err(UserError::Conflict);
        }

        let user = table.rows.get_mut(&id).ok_or(UserError::NotFound(id))?;
        if let Some(name) = changes.name {
            user.name = name.as_str().to_string();
        }
        if let Some(login) = changes.login {
            user.login = login.as_str().to_string();
        }
        if let Some(credential) = changes.credential {
            user.credential = credential;
        }

        tracing::info!(user_id = %id, "Updated user");
        Ok(user.clone())
    }

    async fn delete_by_id(&self, id: UserId) -> UserResult<bool> {
        let mut table = self.table.write().await;
        let deleted = table.rows.remove(&id).is_some();

        if deleted {
            tracing::info!(user_id = %id, "Deleted user");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::StoredCredential;
    use crate::models::UserName;

    fn record(name: &str, login: &str) -> NewUserRecord {
        NewUserRecord {
            name: UserName::new_validated(name.to_string()),
            login: LoginId::new_validated(login.to_string()),
            credential: StoredCredential::from_stored("$argon2id$stub".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let repo = InMemoryUserRepository::new();
        let ada = repo.insert(record("Ada", "ada@example.com")).await.unwrap();
        let grace = repo.insert(record("Grace", "grace@example.com")).await.unwrap();

        assert_eq!(ada.id, UserId(1));
        assert_eq!(grace.id, UserId(2));
        assert_eq!(repo.find_by_id(grace.id).await.unwrap().unwrap().name, "Grace");
    }

    #[tokio::test]
    async fn test_insert_duplicate_login_conflicts() {
        let repo = InMemoryUserRepository::new();
        repo.insert(record("Ada", "ada@example.com")).await.unwrap();

        let err = repo.insert(record("Other", "ada@example.com")).await.unwrap_err();
        assert!(matches!(err, UserError::Conflict));
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_ordered() {
        let repo = InMemoryUserRepository::new();
        repo.insert(record("Jane", "jane@example.com")).await.unwrap();
        repo.insert(record("Bob", "bob@example.com")).await.unwrap();
        repo.insert(record("jasper", "jasper@example.com")).await.unwrap();

        let found = repo
            .search_by_name_prefix(&NamePrefix::new_validated("JA".to_string()))
            .await
            .unwrap();
        let names: Vec<&str> = found.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Jane", "jasper"]);

        let none = repo
            .search_by_name_prefix(&NamePrefix::new_validated(String::new()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_and_conflicting() {
        let repo = InMemoryUserRepository::new();
        let ada = repo.insert(record("Ada", "ada@example.com")).await.unwrap();
        repo.insert(record("Grace", "grace@example.com")).await.unwrap();

        let err = repo.update(UserId(99), UserChanges::default()).await.unwrap_err();
        assert!(matches!(err, UserError::NotFound(UserId(99))));

        let taken = UserChanges {
            login: Some(LoginId::new_validated("grace@example.com".to_string())),
            ..Default::default()
        };
        assert!(matches!(repo.update(ada.id, taken).await, Err(UserError::Conflict)));

        // Keeping one's own login is not a conflict
        let same = UserChanges {
            login: Some(LoginId::new_validated("ada@example.com".to_string())),
            name: Some(UserName::new_validated("Ada L.".to_string())),
            ..Default::default()
        };
        let updated = repo.update(ada.id, same).await.unwrap();
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.credential, ada.credential);
    }

    #[tokio::test]
    async fn test_update_missing_id_wins_over_taken_login() {
        let repo = InMemoryUserRepository::new();
        repo.insert(record("Grace", "grace@example.com")).await.unwrap();

        let changes = UserChanges {
            login: Some(LoginId::new_validated("grace@example.com".to_string())),
            ..Default::default()
        };
        let err = repo.update(UserId(99), changes).await.unwrap_err();
        assert!(matches!(err, UserError::NotFound(UserId(99))));
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let repo = InMemoryUserRepository::new();
        let ada = repo.insert(record("Ada", "ada@example.com")).await.unwrap();

        assert!(repo.delete_by_id(ada.id).await.unwrap());
        assert!(!repo.delete_by_id(ada.id).await.unwrap());
        assert!(repo.find_by_id(ada.id).await.unwrap().is_none());
    }
}
