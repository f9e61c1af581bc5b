//! Users Domain
//!
//! User CRUD and password authentication over a relational store.
//!
//! # Architecture
//!
//! ```text
//! raw JSON payload
//!        │
//! ┌──────▼──────┐
//! │  Validator  │  ← Schema checks, typed value objects, field errors
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Orchestration, hashing, timeouts, error mapping
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Constant parameterised statements (trait + implementations)
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{InMemoryUserRepository, UserConfig, UserService};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = UserService::new(InMemoryUserRepository::new(), &UserConfig::default())?;
//!
//! let ada = service
//!     .create_user(&json!({
//!         "name": "Ada",
//!         "login": "ada@example.com",
//!         "password": "correct-horse-1"
//!     }))
//!     .await?;
//!
//! let same = service
//!     .authenticate(&json!({ "login": "ada@example.com", "password": "correct-horse-1" }))
//!     .await?;
//! assert_eq!(ada.id, same.id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hasher;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use config::UserConfig;
pub use error::{ErrorKind, UserError, UserResult};
pub use hasher::{CredentialHasher, HashError, HashingConfig, StoredCredential};
pub use models::{Credentials, LoginId, NamePrefix, NewUser, User, UserId, UserResponse, UserUpdate};
pub use postgres::PostgresUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
pub use validation::{FieldError, FieldErrors, InputValidator, Payload, Reason, Schema, UnknownFieldPolicy};
