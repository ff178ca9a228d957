//! API integration tests
//!
//! These run against a live server with a seeded database.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Create a user and return its id
async fn create_user(client: &Client, identification: &str) -> i64 {
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "first_name": "Test",
            "last_name": "Reader",
            "identification": identification,
            "password": "testpass",
            "email": format!("{}@example.org", identification),
        }))
        .send()
        .await
        .expect("Failed to create user");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse user");
    body["id"].as_i64().expect("No user ID")
}

/// Create a book with the given copy counts and return its id
async fn create_book(client: &Client, code: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/materials", BASE_URL))
        .json(&json!({
            "material_type": "book",
            "title": "Integration Test Book",
            "author": "Test Author",
            "code": code,
            "category": "Testing",
            "total_copies": copies,
            "available_copies": copies,
            "edition": "1st",
        }))
        .send()
        .await
        .expect("Failed to create material");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse material");
    body["id"].as_i64().expect("No material ID")
}

fn due_in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days)).to_rfc3339()
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
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "nobody@example.org",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_loan_round_trip_on_time() {
    let client = Client::new();
    let user_id = create_user(&client, "RT-0001").await;
    let material_id = create_book(&client, "RT-BOOK-1", 2).await;

    // Create the loan
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": user_id,
            "material_id": material_id,
            "expected_return_date": due_in_days(7),
        }))
        .send()
        .await
        .expect("Failed to create loan");

    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().expect("No loan ID");

    // Key format and initial state
    let key = loan["loan_key"].as_str().expect("No loan key");
    let re = regex::Regex::new(r"^P\d{6}-\d{4}$").unwrap();
    assert!(re.is_match(key), "bad loan key: {}", key);
    assert_eq!(loan["status"], "active");
    assert_eq!(loan["is_late"], false);

    // Copy count went down by one
    let material: Value = client
        .get(format!("{}/materials/{}", BASE_URL, material_id))
        .send()
        .await
        .expect("Failed to fetch material")
        .json()
        .await
        .expect("Failed to parse material");
    assert_eq!(material["available_copies"], 1);

    // Key lookup finds the same loan
    let by_key: Value = client
        .get(format!("{}/loans/key/{}", BASE_URL, key))
        .send()
        .await
        .expect("Failed to fetch loan by key")
        .json()
        .await
        .expect("Failed to parse loan");
    assert_eq!(by_key["id"].as_i64(), Some(loan_id));

    // Return before the due date: no late days, no fine
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({ "notes": "returned on time", "condition": "good" }))
        .send()
        .await
        .expect("Failed to return loan");

    assert!(response.status().is_success());
    let returned: Value = response.json().await.expect("Failed to parse loan");
    assert_eq!(returned["status"], "returned");
    assert_eq!(returned["late_days"], 0);
    assert_eq!(returned["fine"].as_str(), Some("0"));

    // User counters are back to zero, no fine accrued
    let user: Value = client
        .get(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to fetch user")
        .json()
        .await
        .expect("Failed to parse user");
    assert_eq!(user["active_loans"], 0);
    assert_eq!(user["accumulated_fine"].as_str(), Some("0"));

    // Material availability restored
    let material: Value = client
        .get(format!("{}/materials/{}", BASE_URL, material_id))
        .send()
        .await
        .expect("Failed to fetch material")
        .json()
        .await
        .expect("Failed to parse material");
    assert_eq!(material["available_copies"], 2);
    assert_eq!(material["status"], "available");
}

#[tokio::test]
#[ignore]
async fn test_magazines_are_rejected() {
    let client = Client::new();
    let user_id = create_user(&client, "MAG-0001").await;

    let response = client
        .post(format!("{}/materials", BASE_URL))
        .json(&json!({
            "material_type": "magazine",
            "title": "Monthly Review",
            "author": "Various",
            "code": "MAG-TEST-1",
            "category": "Periodicals",
            "total_copies": 3,
            "available_copies": 3,
            "volume": 12,
            "number": 4,
            "periodicity": "monthly",
        }))
        .send()
        .await
        .expect("Failed to create magazine");
    assert_eq!(response.status(), 201);
    let magazine: Value = response.json().await.expect("Failed to parse material");

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": user_id,
            "material_id": magazine["id"],
            "expected_return_date": due_in_days(7),
        }))
        .send()
        .await
        .expect("Failed to send loan request");

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "NotLoanable");
}

#[tokio::test]
#[ignore]
async fn test_loan_limit_is_enforced() {
    let client = Client::new();
    let user_id = create_user(&client, "LIM-0001").await;
    let first = create_book(&client, "LIM-BOOK-1", 1).await;
    let second = create_book(&client, "LIM-BOOK-2", 1).await;
    let third = create_book(&client, "LIM-BOOK-3", 1).await;

    for material_id in [first, second] {
        let response = client
            .post(format!("{}/loans", BASE_URL))
            .json(&json!({
                "user_id": user_id,
                "material_id": material_id,
                "expected_return_date": due_in_days(7),
            }))
            .send()
            .await
            .expect("Failed to create loan");
        assert_eq!(response.status(), 201);
    }

    // Third loan pushes past the limit of 2
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": user_id,
            "material_id": third,
            "expected_return_date": due_in_days(7),
        }))
        .send()
        .await
        .expect("Failed to send loan request");

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "MaxLoansReached");

    // The rejected loan must not have touched the third book
    let material: Value = client
        .get(format!("{}/materials/{}", BASE_URL, third))
        .send()
        .await
        .expect("Failed to fetch material")
        .json()
        .await
        .expect("Failed to parse material");
    assert_eq!(material["available_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_past_due_date_is_rejected() {
    let client = Client::new();
    let user_id = create_user(&client, "DATE-0001").await;
    let material_id = create_book(&client, "DATE-BOOK-1", 1).await;

    for bad_date in ["yesterday", &due_in_days(-1)] {
        let response = client
            .post(format!("{}/loans", BASE_URL))
            .json(&json!({
                "user_id": user_id,
                "material_id": material_id,
                "expected_return_date": bad_date,
            }))
            .send()
            .await
            .expect("Failed to send loan request");

        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.expect("Failed to parse error");
        assert_eq!(body["error"], "BadDate");
    }
}

#[tokio::test]
#[ignore]
async fn test_double_return_is_rejected() {
    let client = Client::new();
    let user_id = create_user(&client, "DBL-0001").await;
    let material_id = create_book(&client, "DBL-BOOK-1", 1).await;

    let loan: Value = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": user_id,
            "material_id": material_id,
            "expected_return_date": due_in_days(7),
        }))
        .send()
        .await
        .expect("Failed to create loan")
        .json()
        .await
        .expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().expect("No loan ID");

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to return loan");
    assert!(response.status().is_success());

    // Second return: the loan is no longer active or late
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send return request");

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "BadLoanState");

    // Counters did not move again
    let user: Value = client
        .get(format!("{}/users/{}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to fetch user")
        .json()
        .await
        .expect("Failed to parse user");
    assert_eq!(user["active_loans"], 0);
}

#[tokio::test]
#[ignore]
async fn test_no_copies_available() {
    let client = Client::new();
    let first_user = create_user(&client, "CPY-0001").await;
    let second_user = create_user(&client, "CPY-0002").await;
    let material_id = create_book(&client, "CPY-BOOK-1", 1).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": first_user,
            "material_id": material_id,
            "expected_return_date": due_in_days(7),
        }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": second_user,
            "material_id": material_id,
            "expected_return_date": due_in_days(7),
        }))
        .send()
        .await
        .expect("Failed to send loan request");

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "NoCopiesAvailable");

    // The single copy is out, so the material shows as loaned
    let material: Value = client
        .get(format!("{}/materials/{}", BASE_URL, material_id))
        .send()
        .await
        .expect("Failed to fetch material")
        .json()
        .await
        .expect("Failed to parse material");
    assert_eq!(material["available_copies"], 0);
    assert_eq!(material["status"], "loaned");
}

#[tokio::test]
#[ignore]
async fn test_loan_filters() {
    let client = Client::new();
    let user_id = create_user(&client, "FLT-0001").await;
    let material_id = create_book(&client, "FLT-BOOK-1", 1).await;

    let loan: Value = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": user_id,
            "material_id": material_id,
            "expected_return_date": due_in_days(7),
        }))
        .send()
        .await
        .expect("Failed to create loan")
        .json()
        .await
        .expect("Failed to parse loan");
    let key = loan["loan_key"].as_str().expect("No loan key");

    // By user
    let loans: Value = client
        .get(format!("{}/loans?user_id={}", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to list loans")
        .json()
        .await
        .expect("Failed to parse loans");
    assert!(loans.as_array().expect("not an array").len() >= 1);

    // By exact key
    let loans: Value = client
        .get(format!("{}/loans?loan_key={}", BASE_URL, key))
        .send()
        .await
        .expect("Failed to list loans")
        .json()
        .await
        .expect("Failed to parse loans");
    assert_eq!(loans.as_array().expect("not an array").len(), 1);

    // By partial user name (snapshot search)
    let loans: Value = client
        .get(format!("{}/loans?user_name=Test", BASE_URL))
        .send()
        .await
        .expect("Failed to list loans")
        .json()
        .await
        .expect("Failed to parse loans");
    assert!(!loans.as_array().expect("not an array").is_empty());
}

#[tokio::test]
#[ignore]
async fn test_user_loan_summary_and_clear_debt() {
    let client = Client::new();
    let user_id = create_user(&client, "SUM-0001").await;
    let material_id = create_book(&client, "SUM-BOOK-1", 1).await;

    let _ = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "user_id": user_id,
            "material_id": material_id,
            "expected_return_date": due_in_days(7),
        }))
        .send()
        .await
        .expect("Failed to create loan");

    let summary: Value = client
        .get(format!("{}/users/{}/loans", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to fetch summary")
        .json()
        .await
        .expect("Failed to parse summary");
    assert_eq!(summary["active"].as_array().expect("not an array").len(), 1);
    assert_eq!(summary["history"].as_array().expect("not an array").len(), 0);

    let cleared: Value = client
        .post(format!("{}/users/{}/clear-debt", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to clear debt")
        .json()
        .await
        .expect("Failed to parse user");
    assert_eq!(cleared["accumulated_fine"].as_str(), Some("0"));
}
