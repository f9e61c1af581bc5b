//! Shared test utilities for domain testing
//!
//! - `TestDatabase`: PostgreSQL container with the workspace schema applied
//! - `TestDataBuilder`: Deterministic test data generation
//! - `assertions`: Custom assertion helpers
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let login = builder.login("main");
//!     let name = builder.name("user", "main");
//! }
//! ```

mod postgres;

pub use postgres::TestDatabase;

/// Builder for test data with deterministic randomization
///
/// Values derive from the seed only, so a test produces the same data on
/// every run and different tests do not collide on unique columns.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_user");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Unique display name, e.g. `test-user-12345-main`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Unique, already normalised email login
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let login = TestDataBuilder::new(7).login("Admin");
    /// assert_eq!(login, "test-7-admin@example.com");
    /// ```
    pub fn login(&self, suffix: &str) -> String {
        format!("test-{}-{}@example.com", self.seed, suffix.to_lowercase())
    }

    /// Password long enough for the default policy
    pub fn password(&self, suffix: &str) -> String {
        format!("pw-{:016x}-{}", self.seed, suffix)
    }
}

/// Test assertion helpers
pub mod assertions {
    use std::fmt::Debug;

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that keys are strictly increasing
    pub fn assert_strictly_ascending<K: Ord + Debug>(keys: &[K], context: &str) {
        for pair in keys.windows(2) {
            assert!(
                pair[0] < pair[1],
                "{}: {:?} is not before {:?}",
                context,
                pair[0],
                pair[1]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.login("main"), builder2.login("main"));
        assert_eq!(builder1.name("user", "test"), builder2.name("user", "test"));
        assert_eq!(builder1.password("a"), builder2.password("a"));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        // Different test names should generate different data
        assert_ne!(builder1.login("main"), builder2.login("main"));
    }

    #[test]
    fn test_password_meets_default_policy() {
        assert!(TestDataBuilder::new(0).password("x").chars().count() >= 8);
    }

    #[test]
    fn test_assert_strictly_ascending() {
        assertions::assert_strictly_ascending(&[1, 2, 5], "ids");
        assertions::assert_strictly_ascending::<i64>(&[], "empty");
    }

    #[test]
    #[should_panic(expected = "ids")]
    fn test_assert_strictly_ascending_rejects_duplicates() {
        assertions::assert_strictly_ascending(&[1, 1], "ids");
    }
}
