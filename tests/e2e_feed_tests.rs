//! End-to-end tests for the RSS digest feed

mod common;

use common::{
    TestClient, TestServer, LASTFM_URL, PUBLIC_URL, SHORT_ALBUM, SILENT_USER, TEST_USER,
    UNKNOWN_USER,
};
use reqwest::StatusCode;

#[tokio::test]
async fn test_feed_content_type() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_feed(TEST_USER).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/rss+xml; charset=utf-8"
    );
}

#[tokio::test]
async fn test_feed_has_recent_digests() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body = client.get_feed(TEST_USER).await.text().await.unwrap();
    assert!(body.starts_with("<?xml"));

    // Published January 1st, 2025
    assert!(body.contains("Testuser, here are your real album stats for 2024"));
    assert!(body.contains("Testuser, here are your real album stats for December"));
    // Published on the Mondays since December 11th, 2024
    for week in [50, 51, 52, 1] {
        assert!(
            body.contains(&format!("real album stats for week {}</title>", week)),
            "missing week {}",
            week
        );
    }
    assert_eq!(body.matches("<item>").count(), 6);

    assert!(body.contains(SHORT_ALBUM));
    assert!(body.contains(&format!(
        "{}/v1/stat?username={}&amp;year=2024&amp;month=12",
        PUBLIC_URL, TEST_USER
    )));
    assert!(body.contains(&format!("{}/user/{}/listening-report/year", LASTFM_URL, TEST_USER)));
}

#[tokio::test]
async fn test_feed_for_silent_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_feed(SILENT_USER).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("listen to any music last month"));
}

#[tokio::test]
async fn test_feed_for_unknown_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_feed(UNKNOWN_USER).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
