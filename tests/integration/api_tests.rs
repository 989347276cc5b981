//! API integration tests

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

fn base_url() -> String {
    std::env::var("LIBRIS_TEST_URL").unwrap_or_else(|_| "http://localhost:8080/api/v1".to_string())
}

fn admin_credentials() -> (String, String) {
    (
        std::env::var("LIBRIS_ADMIN__EMAIL").unwrap_or_else(|_| "admin@libris.local".to_string()),
        std::env::var("LIBRIS_ADMIN__PASSWORD").unwrap_or_else(|_| "change-me-please".to_string()),
    )
}

/// Unique suffix so repeated runs don't collide on unique columns
fn unique() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Helper to get an administrator token
pub async fn admin_token(client: &Client) -> String {
    let (email, password) = admin_credentials();
    let response = client
        .post(format!("{}/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["data"]["token"].as_str().expect("No token in response").to_string()
}

pub async fn post_json(client: &Client, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}{}", base_url(), path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    (status, response.json().await.expect("Failed to parse response"))
}

async fn put_json(client: &Client, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .put(format!("{}{}", base_url(), path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    (status, response.json().await.expect("Failed to parse response"))
}

async fn get_json(client: &Client, token: &str, path: &str) -> (StatusCode, Value) {
    let response = client
        .get(format!("{}{}", base_url(), path))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    (status, response.json().await.expect("Failed to parse response"))
}

/// Create an author and a book with the given number of copies; returns the book id
pub async fn create_book(client: &Client, token: &str, copies: i32) -> i64 {
    let (status, author) = post_json(
        client,
        token,
        "/authors",
        json!({ "name": format!("Author {}", unique()) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, book) = post_json(
        client,
        token,
        "/books",
        json!({
            "title": "Integration Book",
            "isbn": unique(),
            "published_year": 2001,
            "total_copies": copies,
            "available_copies": copies,
            "author_id": author["data"]["id"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    book["data"]["id"].as_i64().expect("book id")
}

pub async fn current_user_id(client: &Client, token: &str) -> i64 {
    let body: Value = client
        .get(format!("{}/me", base_url()))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    body["data"]["id"].as_i64().expect("user id")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_login() {
    let client = Client::new();
    let email = format!("reader-{}@example.com", unique());

    let response = client
        .post(format!("{}/register", base_url()))
        .json(&json!({
            "name": "Reader",
            "email": email,
            "password": "password123",
            "password_confirmation": "password123"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "201");
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert!(body["data"]["user"].get("password").is_none());

    let response = client
        .post(format!("{}/login", base_url()))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/login", base_url()))
        .json(&json!({ "email": "nobody@example.com", "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
#[ignore]
async fn test_protected_route_requires_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", base_url()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_logout_revokes_token() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .post(format!("{}/logout", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/me", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_book_validation_errors() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let (status, body) = post_json(
        &client,
        &token,
        "/books",
        json!({
            "title": "",
            "isbn": unique(),
            "published_year": 999,
            "total_copies": 1,
            "available_copies": 2,
            "author_id": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["published_year"].is_array());
    assert!(body["errors"]["available_copies"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_search_requires_query() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/books/search", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Search query is required");
}

#[tokio::test]
#[ignore]
async fn test_reserve_and_return_cycle() {
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
    assert_eq!(reservation["data"]["status"], "borrowed");
    assert_eq!(reservation["data"]["is_overdue"], false);
    assert_eq!(reservation["data"]["book"]["available_copies"], 0);

    // Last copy is gone
    let (status, body) = post_json(
        &client,
        &token,
        "/reservations",
        json!({ "user_id": user_id, "book_id": book_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Book is not available for reservation");

    let id = reservation["data"]["id"].as_i64().expect("reservation id");
    let response = client
        .patch(format!("{}/reservations/{}/return", base_url(), id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["data"]["status"], "returned");
    assert!(returned["data"]["returned_at"].is_string());

    let response = client
        .patch(format!("{}/reservations/{}/return", base_url(), id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let book: Value = client
        .get(format!("{}/books/{}", base_url(), book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["data"]["available_copies"], 1);
    assert_eq!(book["data"]["is_available"], true);
}

#[tokio::test]
#[ignore]
async fn test_delete_book_with_reservations_refused() {
    let client = Client::new();
    let token = admin_token(&client).await;
    let user_id = current_user_id(&client, &token).await;
    let book_id = create_book(&client, &token, 2).await;

    let (status, _) = post_json(
        &client,
        &token,
        "/reservations",
        json!({ "user_id": user_id, "book_id": book_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let response = client
        .delete(format!("{}/books/{}", base_url(), book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_stats() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/stats/dashboard", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"]["total_books"].is_i64());
    assert!(body["data"]["overdue_reservations"].is_i64());
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_create_books() {
    let client = Client::new();
    let email = format!("member-{}@example.com", unique());

    let response = client
        .post(format!("{}/register", base_url()))
        .json(&json!({
            "name": "Member",
            "email": email,
            "password": "password123",
            "password_confirmation": "password123"
        }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let (status, _) = post_json(
        &client,
        &token,
        "/books",
        json!({
            "title": "Nope",
            "isbn": unique(),
            "published_year": 2000,
            "total_copies": 1,
            "available_copies": 1,
            "author_id": 1
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_rejected() {
    let client = Client::new();
    let token = admin_token(&client).await;
    let first = create_book(&client, &token, 1).await;
    let second = create_book(&client, &token, 1).await;

    let (_, book) = get_json(&client, &token, &format!("/books/{}", first)).await;
    let isbn = book["data"]["isbn"].as_str().expect("isbn").to_string();
    let author_id = book["data"]["author_id"].clone();

    let (status, body) = post_json(
        &client,
        &token,
        "/books",
        json!({
            "title": "Same ISBN",
            "isbn": isbn,
            "published_year": 2001,
            "total_copies": 1,
            "available_copies": 1,
            "author_id": author_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["isbn"].is_array());

    let (status, body) =
        put_json(&client, &token, &format!("/books/{}", second), json!({ "isbn": isbn })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["isbn"].is_array());

    // Keeping its own ISBN is fine
    let (status, _) =
        put_json(&client, &token, &format!("/books/{}", first), json!({ "isbn": isbn })).await;
    assert!(status.is_success());
}

#[tokio::test]
#[ignore]
async fn test_duplicate_category_name_rejected() {
    let client = Client::new();
    let token = admin_token(&client).await;
    let name = format!("Category {}", unique());

    let (status, _) = post_json(&client, &token, "/categories", json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(&client, &token, "/categories", json!({ "name": name })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_array());

    let (status, body) =
        post_json(&client, &token, "/categories", json!({ "name": name.to_uppercase() })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_array());

    let (status, other) = post_json(
        &client,
        &token,
        "/categories",
        json!({ "name": format!("Category {}", unique()) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let other_id = other["data"]["id"].as_i64().expect("category id");

    let (status, body) = put_json(
        &client,
        &token,
        &format!("/categories/{}", other_id),
        json!({ "name": name.to_lowercase() }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_title_update_keeps_reserved_copies() {
    let client = Client::new();
    let token = admin_token(&client).await;
    let user_id = current_user_id(&client, &token).await;

    for _ in 0..5 {
        let book_id = create_book(&client, &token, 1).await;
        let path = format!("/books/{}", book_id);

        let (reserved, updated) = tokio::join!(
            post_json(
                &client,
                &token,
                "/reservations",
                json!({ "user_id": user_id, "book_id": book_id }),
            ),
            put_json(&client, &token, &path, json!({ "title": "Renamed" })),
        );
        assert!(updated.0.is_success());

        let (_, book) = get_json(&client, &token, &path).await;
        assert_eq!(book["data"]["title"], "Renamed");
        let expected = if reserved.0 == StatusCode::CREATED { 0 } else { 1 };
        assert_eq!(book["data"]["available_copies"], expected);

        // Sequential rename after the reservation settled
        let (status, body) = put_json(&client, &token, &path, json!({ "title": "Again" })).await;
        assert!(status.is_success());
        assert_eq!(body["data"]["available_copies"], expected);
    }
}

#[tokio::test]
#[ignore]
async fn test_role_change_and_deletion_apply_to_issued_tokens() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let email = format!("librarian-{}@example.com", unique());

    let (status, user) = post_json(
        &client,
        &admin,
        "/users",
        json!({
            "name": "Librarian",
            "email": email,
            "password": "password123",
            "role": "librarian"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["data"]["id"].as_i64().expect("user id");

    let response = client
        .post(format!("{}/login", base_url()))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let (status, _) = post_json(
        &client,
        &token,
        "/categories",
        json!({ "name": format!("Category {}", unique()) }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) =
        put_json(&client, &admin, &format!("/users/{}", user_id), json!({ "role": "member" })).await;
    assert!(status.is_success());

    // Same token, demoted role
    let (status, _) = post_json(
        &client,
        &token,
        "/categories",
        json!({ "name": format!("Category {}", unique()) }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = client
        .delete(format!("{}/users/{}", base_url(), user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/me", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_user_reservations_are_paginated() {
    let client = Client::new();
    let token = admin_token(&client).await;
    let user_id = current_user_id(&client, &token).await;

    for _ in 0..2 {
        let book_id = create_book(&client, &token, 1).await;
        let (status, _) = post_json(
            &client,
            &token,
            "/reservations",
            json!({ "user_id": user_id, "book_id": book_id }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get_json(
        &client,
        &token,
        &format!("/reservations/user/{}?per_page=1&page=2", user_id),
    )
    .await;
    assert!(status.is_success());
    assert_eq!(body["data"]["items"].as_array().expect("items").len(), 1);
    assert!(body["data"]["total"].as_i64().expect("total") >= 2);
    assert_eq!(body["data"]["page"], 2);

    let book_id = create_book(&client, &token, 1).await;
    let (status, body) = get_json(
        &client,
        &token,
        &format!("/reservations/book/{}?per_page=1", book_id),
    )
    .await;
    assert!(status.is_success());
    assert_eq!(body["data"]["total"], 0);
    assert!(body["data"]["items"].as_array().expect("items").is_empty());
}
