//! API integration tests against a running server

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn create_author(client: &Client) -> i64 {
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .json(&json!({ "name": "Test Author", "biography": "Writes tests." }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No id in response")
}

async fn create_book(client: &Client, author_id: i64) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({ "title": "Test Book", "author_id": author_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], true);
    body["id"].as_i64().expect("No id in response")
}

async fn create_user(client: &Client, tag: &str) -> i64 {
    let nonce = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "name": format!("Test {}", tag),
            "email": format!("{}.{}@example.com", tag, nonce)
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No id in response")
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
async fn test_readiness_check() {
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
async fn test_get_missing_book() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/{}", BASE_URL, i32::MAX))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_create_user_rejects_invalid_email() {
    let client = Client::new();

    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({ "name": "Nobody", "email": "not-an-email" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_top_authors() {
    let client = Client::new();

    let response = client
        .get(format!("{}/authors/top?limit=3", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.as_array().map_or(false, |a| a.len() <= 3));
}

#[tokio::test]
#[ignore]
async fn test_rent_and_return_flow() {
    let client = Client::new();
    let author_id = create_author(&client).await;
    let book_id = create_book(&client, author_id).await;
    let first = create_user(&client, "first").await;
    let second = create_user(&client, "second").await;

    let response = client
        .post(format!("{}/rentals/{}/{}", BASE_URL, book_id, first))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    // Already rented
    let response = client
        .post(format!("{}/rentals/{}/{}", BASE_URL, book_id, second))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BookNotAvailable");

    let rentals: Value = client
        .get(format!("{}/users/{}/rentals", BASE_URL, first))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(rentals.as_array().map(Vec::len), Some(1));

    let response = client
        .delete(format!("{}/rentals/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    // Not rented any more
    let response = client
        .delete(format!("{}/rentals/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BookNotRented");

    // Rental history keeps the book in the catalog
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_rents_of_same_book() {
    let client = Client::new();
    let author_id = create_author(&client).await;
    let book_id = create_book(&client, author_id).await;
    let first = create_user(&client, "racer.one").await;
    let second = create_user(&client, "racer.two").await;

    let (a, b) = tokio::join!(
        client
            .post(format!("{}/rentals/{}/{}", BASE_URL, book_id, first))
            .send(),
        client
            .post(format!("{}/rentals/{}/{}", BASE_URL, book_id, second))
            .send(),
    );
    let a = a.expect("Failed to send request");
    let b = b.expect("Failed to send request");

    let (won, lost) = match (a.status(), b.status()) {
        (StatusCode::CREATED, StatusCode::CONFLICT) => (a, b),
        (StatusCode::CONFLICT, StatusCode::CREATED) => (b, a),
        other => panic!("expected one 201 and one 409, got {:?}", other),
    };

    let body: Value = lost.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BookNotAvailable");

    let body: Value = won.json().await.expect("Failed to parse response");
    let winner = body["rental"]["user_id"].as_i64().expect("No user_id in rental");
    assert!(winner == first || winner == second);

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["available"], false);
}

#[tokio::test]
#[ignore]
async fn test_rent_unknown_user() {
    let client = Client::new();
    let author_id = create_author(&client).await;
    let book_id = create_book(&client, author_id).await;

    let response = client
        .post(format!("{}/rentals/{}/{}", BASE_URL, book_id, i32::MAX))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NoSuchUser");
}
