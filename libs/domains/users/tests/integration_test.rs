//! Integration tests for the Users domain
//!
//! These run the service against real PostgreSQL via testcontainers to check
//! that the statements parse, the unique constraint resolves races and ids
//! come back in order. They need a container runtime, hence `#[ignore]`:
//!
//! ```text
//! cargo test -p domain_users -- --ignored
//! ```

use core_config::{tracing::init_tracing, Environment};
use domain_users::*;
use serde_json::json;
use test_utils::{assertions::*, TestDataBuilder, TestDatabase};

fn test_config() -> UserConfig {
    UserConfig {
        hashing: HashingConfig {
            iterations: 1,
            memory_kib: 8,
            parallelism: 1,
        },
        ..Default::default()
    }
}

fn service(db: &TestDatabase) -> UserService<PostgresUserRepository> {
    init_tracing(&Environment::Development);
    UserService::new(PostgresUserRepository::new(db.connection()), &test_config()).unwrap()
}

#[tokio::test]
#[ignore]
async fn test_create_get_authenticate() {
    let db = TestDatabase::new().await;
    let service = service(&db);
    let builder = TestDataBuilder::from_test_name("create_get_authenticate");

    let login = builder.login("ada");
    let password = builder.password("ada");

    let created = service
        .create_user(&json!({ "name": "Ada", "login": login, "password": password }))
        .await
        .unwrap();
    assert_eq!(created.login, login);

    let fetched = service.get_user(created.id).await.unwrap();
    assert_eq!(fetched, created);

    let ok = service
        .authenticate(&json!({ "login": login, "password": password }))
        .await
        .unwrap();
    assert_eq!(ok.id, created.id);

    let wrong = service
        .authenticate(&json!({ "login": login, "password": "wrong" }))
        .await;
    assert!(matches!(wrong, Err(UserError::Unauthorized)));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_creates_one_winner() {
    let db = TestDatabase::new().await;
    let service = service(&db);
    let builder = TestDataBuilder::from_test_name("concurrent_creates");

    let payload = json!({
        "name": "Racer",
        "login": builder.login("racer"),
        "password": builder.password("racer"),
    });

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let payload = payload.clone();
            tokio::spawn(async move { service.create_user(&payload).await })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => created += 1,
            Err(UserError::Conflict) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(service.list_or_search_users(None).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_search_is_ordered_and_parameterised() {
    let db = TestDatabase::new().await;
    let service = service(&db);
    let builder = TestDataBuilder::from_test_name("search_ordered");

    for name in ["Jane", "Bob", "jack", "Janet"] {
        service
            .create_user(&json!({
                "name": name,
                "login": builder.login(name),
                "password": builder.password(name),
            }))
            .await
            .unwrap();
    }

    let found = service.list_or_search_users(Some("JA")).await.unwrap();
    let names: Vec<&str> = found.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Jane", "jack", "Janet"]);
    assert_strictly_ascending(&found.iter().map(|u| u.id).collect::<Vec<_>>(), "search");

    // Pattern characters are matched literally
    assert!(service.list_or_search_users(Some("%")).await.unwrap().is_empty());
    assert!(service.list_or_search_users(Some("_")).await.unwrap().is_empty());
    assert!(
        service
            .list_or_search_users(Some("' OR '1'='1"))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(service.list_or_search_users(Some("")).await.unwrap().is_empty());

    let all = service.list_or_search_users(None).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_strictly_ascending(&all.iter().map(|u| u.id).collect::<Vec<_>>(), "list");
}

#[tokio::test]
#[ignore]
async fn test_update_and_delete() {
    let db = TestDatabase::new().await;
    let service = service(&db);
    let builder = TestDataBuilder::from_test_name("update_and_delete");

    let ada = service
        .create_user(&json!({
            "name": "Ada",
            "login": builder.login("ada"),
            "password": builder.password("ada"),
        }))
        .await
        .unwrap();
    let grace = service
        .create_user(&json!({
            "name": "Grace",
            "login": builder.login("grace"),
            "password": builder.password("grace"),
        }))
        .await
        .unwrap();

    let renamed = service
        .update_user(ada.id, &json!({ "name": "Ada Lovelace" }))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Ada Lovelace");
    assert_eq!(renamed.login, ada.login);

    let taken = service
        .update_user(ada.id, &json!({ "login": grace.login }))
        .await;
    assert!(matches!(taken, Err(UserError::Conflict)));

    let missing = service
        .update_user(UserId(i64::MAX), &json!({ "name": "Nobody" }))
        .await;
    assert!(matches!(missing, Err(UserError::NotFound(_))));

    service.delete_user(grace.id).await.unwrap();
    let again = service.delete_user(grace.id).await;
    assert!(matches!(again, Err(UserError::NotFound(_))));

    let remaining = service.list_or_search_users(None).await.unwrap();
    let remaining = assert_some(remaining.first().cloned(), "ada should remain");
    assert_eq!(remaining.id, ada.id);
}
