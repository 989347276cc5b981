//! Overdue checker against the test database

use libris_server::{
    repository::Repository,
    services::{events::EventBus, overdue::OverdueChecker},
    AppConfig,
};
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::api_tests::{admin_token, create_book, current_user_id, post_json};

#[tokio::test]
#[ignore]
async fn test_run_once_emits_one_event_per_overdue_reservation() {
    let config = AppConfig::load().expect("Failed to load configuration");
    let repository = Repository::connect(&config.database)
        .await
        .expect("Failed to connect to database");

    let client = Client::new();
    let token = admin_token(&client).await;
    let user_id = current_user_id(&client, &token).await;
    let book_id = create_book(&client, &token, 1).await;

    let (status, reservation) = post_json(
        &client,
        &token,
        "/reservations",
        json!({ "user_id": user_id, "book_id": book_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let reservation_id = reservation["data"]["id"].as_i64().expect("reservation id") as i32;

    sqlx::query("UPDATE reservations SET due_date = NOW() - INTERVAL '2 days' WHERE id = $1")
        .bind(reservation_id)
        .execute(&repository.pool)
        .await
        .expect("Failed to backdate reservation");

    let (events, mut received) = EventBus::new();
    let checker = OverdueChecker::new(repository, events);
    let count = checker.run_once().await.expect("Overdue check failed");

    let mut ids = Vec::new();
    while let Ok(event) = received.try_recv() {
        assert_eq!(event.name(), "reservation_overdue");
        ids.push(event.reservation().id);
    }

    assert!(count >= 1);
    assert_eq!(ids.len(), count);
    assert_eq!(ids.iter().filter(|id| **id == reservation_id).count(), 1);
}
