//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all albumscrobbles endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

/// HTTP test client
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn get(&self, path_and_query: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path_and_query))
            .send()
            .await
            .expect("GET request failed")
    }

    // ========================================================================
    // Server Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    /// GET /metrics
    pub async fn get_metrics(&self) -> Response {
        self.get("/metrics").await
    }

    // ========================================================================
    // Stats Endpoints
    // ========================================================================

    /// GET /v1/stats with a raw query string
    pub async fn get_stats_query(&self, query: &str) -> Response {
        self.get(&format!("/v1/stats?{}", query)).await
    }

    /// GET /v1/stats?username=&range=
    pub async fn get_stats(&self, username: &str, range: &str) -> Response {
        self.get_stats_query(&format!("username={}&range={}", username, range))
            .await
    }

    /// GET /v1/stat with a raw query string
    pub async fn get_stat(&self, query: &str) -> Response {
        self.get(&format!("/v1/stat?{}", query)).await
    }

    /// GET /v1/recent
    pub async fn get_recent(&self) -> Response {
        self.get("/v1/recent").await
    }

    /// GET /v1/overview with a raw query string
    pub async fn get_overview(&self, query: &str) -> Response {
        self.get(&format!("/v1/overview?{}", query)).await
    }

    /// GET /v1/overview/block with a raw query string
    pub async fn get_overview_block(&self, query: &str) -> Response {
        self.get(&format!("/v1/overview/block?{}", query)).await
    }

    // ========================================================================
    // Corrections and Feed
    // ========================================================================

    /// POST /v1/corrections
    pub async fn post_correction(&self, body: &Value) -> Response {
        self.client
            .post(format!("{}/v1/corrections", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Correction request failed")
    }

    /// GET /v1/feed/{username}
    pub async fn get_feed(&self, username: &str) -> Response {
        self.get(&format!("/v1/feed/{}", username)).await
    }
}
