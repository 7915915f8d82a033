//! End-to-end tests for the overview grid and its blocks

mod common;

use common::{TestClient, TestServer, SHORT_ALBUM, TEST_USER, TEST_USER_START_YEAR, UNKNOWN_USER};
use reqwest::StatusCode;
use serde_json::Value;

// ============================================================================
// Grid
// ============================================================================

#[tokio::test]
async fn test_overview_lists_complete_years() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_overview(&format!("username={}", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    let periods = body["periods"].as_array().unwrap();
    let years: Vec<i64> = periods
        .iter()
        .map(|p| p["year"].as_i64().unwrap())
        .collect();
    let expected: Vec<i64> = (TEST_USER_START_YEAR as i64..2025).collect();
    assert_eq!(years, expected);
    assert!(periods.iter().all(|p| p["complete"] == true));
    assert!(periods.iter().all(|p| p.get("month").is_none()));

    // The grid itself never touches the charts
    assert_eq!(server.charts.request_count(), 0);
}

#[tokio::test]
async fn test_overview_of_a_year_by_month() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_overview(&format!("username={}&year=2024", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["year"], 2024);
    assert_eq!(body["per_week"], false);
    let periods = body["periods"].as_array().unwrap();
    assert_eq!(periods.len(), 12);
    assert_eq!(periods[11]["month"], 12);
    assert!(periods.iter().all(|p| p["complete"] == true));
}

#[tokio::test]
async fn test_overview_of_current_year_by_week() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_overview(&format!("username={}&year=2025&per_week=true", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    let periods = body["periods"].as_array().unwrap();
    assert_eq!(periods.len(), 52);
    // Week 1 of 2025 ended on January 5th, week 2 is still going
    assert_eq!(periods[0]["complete"], true);
    assert_eq!(periods[1]["complete"], false);
}

#[tokio::test]
async fn test_overview_errors() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let unknown = client
        .get_overview(&format!("username={}", UNKNOWN_USER))
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let before_start = client
        .get_overview(&format!("username={}&year=2001", TEST_USER))
        .await;
    assert_eq!(before_start.status(), StatusCode::BAD_REQUEST);

    let missing_user = client.get_overview("year=2024").await;
    assert_eq!(missing_user.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Blocks
// ============================================================================

#[tokio::test]
async fn test_block_has_top_album() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_overview_block(&format!("username={}&year=2024&month=3", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["year"], 2024);
    assert_eq!(body["month"], 3);
    assert_eq!(body["top_album"]["album_name"], SHORT_ALBUM);
}

#[tokio::test]
async fn test_block_of_running_period_is_empty() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_overview_block(&format!("username={}&year=2025&month=1", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert!(body["top_album"].is_null());
    assert_eq!(server.charts.request_count(), 0);
}

#[tokio::test]
async fn test_block_requires_year() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_overview_block(&format!("username={}&month=3", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
