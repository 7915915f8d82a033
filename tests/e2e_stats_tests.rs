//! End-to-end tests for the stats endpoints
//!
//! Tests the corrected album ranking, range parsing, caching of upstream
//! charts and the error responses.

mod common;

use common::{
    TestClient, TestServer, LONG_ALBUM, MISSING_ALBUM, NEW_USER, SHORT_ALBUM, SHORT_ALBUM_COVER,
    TEST_USER, UNKNOWN_USER,
};
use reqwest::StatusCode;
use serde_json::Value;

// ============================================================================
// Server Info
// ============================================================================

#[tokio::test]
async fn test_home_reports_build_hash() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_home().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["hash"], "test-hash");
    assert!(body["uptime"].as_str().unwrap().starts_with("0d "));
}

#[tokio::test]
async fn test_metrics_exposes_http_requests() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.get_stats(TEST_USER, "7").await;

    let response = client.get_metrics().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("albumscrobbles_http_requests_total"));
}

// ============================================================================
// Corrected Ranking
// ============================================================================

#[tokio::test]
async fn test_stats_ranked_by_album_plays() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_stats(TEST_USER, "30").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], TEST_USER);

    let stats = body["stats"].as_array().unwrap();
    let names: Vec<&str> = stats
        .iter()
        .map(|s| s["album_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec![SHORT_ALBUM, LONG_ALBUM, MISSING_ALBUM]);

    let plays: Vec<f64> = stats
        .iter()
        .map(|s| s["album_scrobble_count"].as_f64().unwrap())
        .collect();
    assert_eq!(plays, vec![100.0, 50.0, 25.0]);

    assert_eq!(stats[0]["cover_url"], SHORT_ALBUM_COVER);
    assert_eq!(stats[0]["original_position"], 2);
    assert_eq!(stats[1]["scrobble_count"], 1200);
    assert_eq!(stats[2]["track_count"], 12);

    // The raw chart leader is still reported
    assert_eq!(body["original_top_album"]["album_name"], LONG_ALBUM);
    assert_eq!(body["original_top_album"]["scrobble_count"], "1,200");
    assert!(body.get("blast").is_none());
}

#[tokio::test]
async fn test_stats_without_range_is_all_time() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_stats_query(&format!("username={}", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["stats"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_stats_custom_range() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_stats_query(&format!(
            "username={}&from=2024-03-01&to=2024-03-31",
            TEST_USER
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let reversed = client
        .get_stats_query(&format!(
            "username={}&from=2024-03-31&to=2024-03-01",
            TEST_USER
        ))
        .await;
    assert_eq!(reversed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stat_for_calendar_month() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_stat(&format!("username={}&year=2024&month=6", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["stats"][0]["album_name"], SHORT_ALBUM);

    let both = client
        .get_stat(&format!("username={}&year=2024&month=6&week=3", TEST_USER))
        .await;
    assert_eq!(both.status(), StatusCode::BAD_REQUEST);

    let before_start = client
        .get_stat(&format!("username={}&year=2010", TEST_USER))
        .await;
    assert_eq!(before_start.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Random Periods
// ============================================================================

#[tokio::test]
async fn test_random_stats_report_the_chosen_period() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_stats(TEST_USER, "random").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert!(body["blast"]["name"].is_string());
    assert_eq!(body["stats"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_random_stats_need_a_full_year() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_stats(NEW_USER, "random").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn test_repeated_stats_use_cached_chart() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let first = client.get_stats(TEST_USER, "7").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(server.charts.request_count(), 1);

    let second = client.get_stats(TEST_USER, "7").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(server.charts.request_count(), 1);
}

#[tokio::test]
async fn test_successful_responses_are_cacheable() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let ok = client.get_stats(TEST_USER, "7").await;
    assert_eq!(
        ok.headers().get("cache-control").unwrap(),
        "max-age=60"
    );

    let error = client.get_stats(UNKNOWN_USER, "7").await;
    assert!(error.headers().get("cache-control").is_none());
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_stats_require_username() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_stats_query("range=7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Username required");
}

#[tokio::test]
async fn test_unknown_user_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_stats(UNKNOWN_USER, "7").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_range_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_stats(TEST_USER, "14").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_future_year_rejected_without_upstream_call() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_stat(&format!("username={}&year=2030", TEST_USER))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.charts.request_count(), 0);
}
