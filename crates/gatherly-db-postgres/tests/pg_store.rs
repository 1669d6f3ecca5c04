//! Integration tests against a real PostgreSQL instance.
//!
//! Skipped unless `GATHERLY_TEST_DATABASE_URL` points at a database the test
//! may freely write to. Each run uses fresh IDs so reruns do not collide.

use std::sync::Arc;

use gatherly_core::{Event, EventStatus, User, generate_id, now_utc};
use gatherly_db_postgres::{PostgresConfig, create_registry_store};
use gatherly_registration::{RegistrationService, RetryPolicy};
use gatherly_storage::{DynRegistryStore, RegistryStore};
use time::macros::date;

async fn test_store() -> Option<DynRegistryStore> {
    let url = match std::env::var("GATHERLY_TEST_DATABASE_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            eprintln!("GATHERLY_TEST_DATABASE_URL not set; skipping PostgreSQL tests");
            return None;
        }
    };
    let store = create_registry_store(&PostgresConfig::new(url))
        .await
        .expect("connect to test database");
    Some(store)
}

fn fresh_event(capacity: u32) -> Event {
    Event {
        event_id: format!("evt-{}", generate_id()),
        title: "Integration Test Event".to_string(),
        description: None,
        date: date!(2025 - 12 - 01),
        location: "Test Hall".to_string(),
        capacity,
        organizer: "Tests".to_string(),
        status: EventStatus::Published,
        waitlist_enabled: true,
        confirmed_count: 0,
    }
}

fn fresh_user() -> User {
    User {
        user_id: format!("user-{}", generate_id()),
        name: "Test User".to_string(),
        created_at: now_utc(),
    }
}

#[tokio::test]
async fn registration_flow_against_postgres() {
    let Some(store) = test_store().await else {
        return;
    };

    let event = fresh_event(1);
    let event_id = event.event_id.clone();
    store.create_event(&event).await.unwrap();

    let users: Vec<User> = (0..3).map(|_| fresh_user()).collect();
    for user in &users {
        store.create_user(user).await.unwrap();
    }

    let service = RegistrationService::new(store.clone());

    let first = service
        .register(&event_id, &users[0].user_id)
        .await
        .unwrap();
    assert!(first.is_confirmed());

    let second = service
        .register(&event_id, &users[1].user_id)
        .await
        .unwrap();
    assert_eq!(second.waitlist_position, Some(1));

    let third = service
        .register(&event_id, &users[2].user_id)
        .await
        .unwrap();
    assert_eq!(third.waitlist_position, Some(2));

    // Confirmed departure promotes the head; count is unchanged.
    service
        .unregister(&event_id, &users[0].user_id)
        .await
        .unwrap();
    let record = store.get_event(&event_id).await.unwrap().unwrap();
    assert_eq!(record.event.confirmed_count, 1);

    let promoted = store
        .get_registration(&event_id, &users[1].user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(promoted.is_confirmed());

    store.delete_event(&event_id).await.unwrap();
}

#[tokio::test]
async fn stale_commit_conflicts_against_postgres() {
    let Some(store) = test_store().await else {
        return;
    };

    let event = fresh_event(5);
    let event_id = event.event_id.clone();
    let record = store.create_event(&event).await.unwrap();

    let user = fresh_user();
    store.create_user(&user).await.unwrap();

    let commit = gatherly_storage::EventCommit::keep(&record)
        .with_confirmed_count(1)
        .insert(gatherly_core::Registration::confirmed(
            &event_id,
            &user.user_id,
            now_utc(),
        ));
    store
        .commit_event(&event_id, record.revision, commit)
        .await
        .unwrap();

    // Re-running the same commit with the stale revision must conflict.
    let stale = gatherly_storage::EventCommit::keep(&record).with_confirmed_count(2);
    let err = store
        .commit_event(&event_id, record.revision, stale)
        .await
        .unwrap_err();
    assert!(err.is_revision_conflict());

    store.delete_event(&event_id).await.unwrap();
}

#[tokio::test]
async fn concurrent_admissions_against_postgres() {
    let Some(store) = test_store().await else {
        return;
    };

    let event = fresh_event(2);
    let event_id = event.event_id.clone();
    store.create_event(&event).await.unwrap();

    let users: Vec<User> = (0..10).map(|_| fresh_user()).collect();
    for user in &users {
        store.create_user(user).await.unwrap();
    }

    let service = Arc::new(RegistrationService::with_retry_policy(
        store.clone(),
        RetryPolicy {
            max_retries: 50,
            ..RetryPolicy::default()
        },
    ));
    let mut handles = Vec::new();
    for user in &users {
        let service = service.clone();
        let event_id = event_id.clone();
        let user_id = user.user_id.clone();
        handles.push(tokio::spawn(
            async move { service.register(&event_id, &user_id).await },
        ));
    }

    let mut confirmed = 0;
    let mut waitlisted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(r) if r.is_confirmed() => confirmed += 1,
            Ok(_) => waitlisted += 1,
            Err(err) => panic!("registration failed: {err}"),
        }
    }
    assert_eq!(confirmed, 2);
    assert_eq!(waitlisted, 8);

    let record = store.get_event(&event_id).await.unwrap().unwrap();
    assert_eq!(record.event.confirmed_count, 2);

    store.delete_event(&event_id).await.unwrap();
}
