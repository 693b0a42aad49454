//! API integration tests
//!
//! Need a running server, database and identity provider:
//! `cargo test --test api_tests -- --ignored`. The librarian account is
//! read from LIBRARY_TEST_USERNAME / LIBRARY_TEST_PASSWORD.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn credentials() -> (String, String) {
    (
        std::env::var("LIBRARY_TEST_USERNAME").unwrap_or_else(|_| "librarian".to_string()),
        std::env::var("LIBRARY_TEST_PASSWORD").unwrap_or_else(|_| "librarian".to_string()),
    )
}

/// Helper to get a librarian token
async fn get_auth_token(client: &Client) -> String {
    let (username, password) = credentials();
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["access_token"].as_str().expect("No token in response").to_string()
}

/// A fresh, checksum-valid ISBN-13 so repeated runs do not collide
fn unique_isbn() -> String {
    let seed = uuid::Uuid::new_v4().as_u128();
    let mut digits: Vec<u32> = vec![9, 7, 8];
    digits.extend((0..9).map(|i| ((seed >> (i * 8)) % 10) as u32));
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    digits.push((10 - sum % 10) % 10);
    digits.iter().map(|d| d.to_string()).collect()
}

async fn create_book(client: &Client, token: &str, copies: i32) -> String {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "name": "Integration Test Book",
            "amount_of_copies": copies,
            "author": "Test Author",
            "category": "Testing",
            "description": "A book created by the integration suite.",
            "isbn": unique_isbn(),
            "publisher": "Test House"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_str().expect("No book ID").to_string()
}

async fn rent(client: &Client, token: &str, book_id: &str) -> reqwest::Response {
    rent_as(client, token, book_id, "integration@example.pt").await
}

async fn rent_as(client: &Client, token: &str, book_id: &str, email: &str) -> reqwest::Response {
    let now = Utc::now();
    client
        .post(format!("{}/rentals", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "book_id": book_id,
            "start_date": (now + Duration::hours(1)).to_rfc3339(),
            "end_date": (now + Duration::days(7)).to_rfc3339(),
            "user_email": email
        }))
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_ready_checks_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
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
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": "nobody", "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_books_require_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_invalid_isbn_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Bad Isbn",
            "amount_of_copies": 1,
            "author": "Test Author",
            "category": "Testing",
            "description": "Checksum does not hold.",
            "isbn": "9783161484109",
            "publisher": "Test House"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
#[ignore]
async fn test_last_copy_rental_flow() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let book_id = create_book(&client, &token, 1).await;

    // First rental takes the only copy
    let response = rent(&client, &token, &book_id).await;
    assert_eq!(response.status(), 201);
    let rental: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(rental["status"], "Active");
    let rental_id = rental["id"].as_str().expect("No rental ID").to_string();

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["amount_of_copies"], 0);

    // Nothing left for another reader
    let response = rent_as(&client, &token, &book_id, "second.reader@example.pt").await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NotAvailable");

    // Same reader, same window
    let response = rent(&client, &token, &book_id).await;
    assert_eq!(response.status(), 409);

    // Cancel, then the rental is terminal
    let response = client
        .post(format!("{}/rentals/{}/cancel", BASE_URL, rental_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/rentals/{}/activate", BASE_URL, rental_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "InvalidTransition");

    // Soft delete twice
    for _ in 0..2 {
        let response = client
            .delete(format!("{}/books/{}", BASE_URL, book_id))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 204);
    }
}

#[tokio::test]
#[ignore]
async fn test_filter_rentals_by_status() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/rentals?status=Active&user_email=integration@example.pt", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let rentals = body.as_array().expect("Expected an array");
    assert!(rentals.iter().all(|r| r["status"] == "Active"));
}

#[tokio::test]
#[ignore]
async fn test_availability_window() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let book_id = create_book(&client, &token, 3).await;
    assert_eq!(rent(&client, &token, &book_id).await.status(), 201);

    let now = Utc::now();
    let response = client
        .get(format!("{}/books/{}/availability", BASE_URL, book_id))
        .query(&[
            ("start_date", (now + Duration::days(1)).to_rfc3339()),
            ("end_date", (now + Duration::days(2)).to_rfc3339()),
        ])
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["amount_of_copies"], 2);
    assert_eq!(body["overlapping_rentals"], 1);
    assert_eq!(body["available"], true);
}

async fn stock_of(client: &Client, token: &str, book_id: &str) -> i64 {
    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    book["amount_of_copies"].as_i64().expect("No stock count")
}

#[tokio::test]
#[ignore]
async fn test_concurrent_bookings_of_last_copy() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let book_id = create_book(&client, &token, 1).await;

    let (first, second) = tokio::join!(
        rent_as(&client, &token, &book_id, "first.reader@example.pt"),
        rent_as(&client, &token, &book_id, "second.reader@example.pt"),
    );

    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![201, 409]);
    assert_eq!(stock_of(&client, &token, &book_id).await, 0);
}

/// Follows the server's `rentals.restock_on_close`, read from the same
/// environment variable the server uses
#[tokio::test]
#[ignore]
async fn test_closing_rental_restock() {
    let restock = std::env::var("LIBRARY_RENTALS__RESTOCK_ON_CLOSE")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let client = Client::new();
    let token = get_auth_token(&client).await;
    let book_id = create_book(&client, &token, 3).await;

    let response = rent(&client, &token, &book_id).await;
    assert_eq!(response.status(), 201);
    let rental: Value = response.json().await.expect("Failed to parse response");
    let rental_id = rental["id"].as_str().expect("No rental ID").to_string();
    assert_eq!(stock_of(&client, &token, &book_id).await, 2);

    let response = client
        .post(format!("{}/rentals/{}/complete", BASE_URL, rental_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let expected = if restock { 3 } else { 2 };
    assert_eq!(stock_of(&client, &token, &book_id).await, expected);

    // Closing twice never returns a second copy
    let response = client
        .post(format!("{}/rentals/{}/cancel", BASE_URL, rental_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
    assert_eq!(stock_of(&client, &token, &book_id).await, expected);
}
