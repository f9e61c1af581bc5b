//! PostgreSQL connection management and store error classification.
//!
//! Repositories hold a [`DatabaseConnection`] (a pooled handle; every statement
//! checks a connection out and returns it when the statement completes) and
//! run [`DatabaseError::classify`] on every [`DbErr`] so that constraint
//! violations and timeouts can be told apart from everything else without
//! passing raw driver text upward.
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::{connect_with_retry, PostgresConfig, RetryPolicy};
//!
//! let config = PostgresConfig::from_env()?;
//! let db = connect_with_retry(&config, &RetryPolicy::default()).await?;
//! ```

pub mod error;
pub mod postgres;
pub mod retry;

pub use error::{DatabaseError, DatabaseResult};
pub use postgres::{connect, connect_with_retry, PostgresConfig};
pub use retry::{retry_with_backoff, RetryPolicy};

// Re-export SeaORM types for convenience
pub use sea_orm::{DatabaseConnection, DbErr};
