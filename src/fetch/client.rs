use super::{FetchError, HttpFetcher, RetryPolicy};
use crate::config::UpstreamSettings;
use crate::server::metrics;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// reqwest-backed fetcher with a fixed timeout and transport-level retries.
///
/// Only requests that produced no response are retried; any HTTP status is
/// handed back to the caller on the first attempt.
#[derive(Clone)]
pub struct FetchClient {
    client: Client,
    retry_policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            retry_policy: RetryPolicy::new(settings),
        })
    }

    async fn send(&self, method: Method, url: &str) -> Result<Response, FetchError> {
        let mut attempt = 0;
        loop {
            debug!("{} {} (attempt {})", method, url, attempt + 1);
            let error = match self.client.request(method.clone(), url).send().await {
                Ok(response) => return Ok(response),
                Err(e) => FetchError::Transient {
                    url: url.to_string(),
                    message: e.to_string(),
                },
            };

            if !self.retry_policy.should_retry(&error, attempt) {
                metrics::record_upstream_request("transient_error");
                return Err(error);
            }

            let backoff = self.retry_policy.backoff(attempt);
            warn!("{}; retrying in {:?}", error, backoff);
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl HttpFetcher for FetchClient {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.send(Method::GET, url).await?;
        let status = response.status();
        if !status.is_success() {
            metrics::record_upstream_request("http_error");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        metrics::record_upstream_request("ok");
        response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_status(&self, url: &str) -> Result<u16, FetchError> {
        let response = self.send(Method::HEAD, url).await?;
        metrics::record_upstream_request("ok");
        Ok(response.status().as_u16())
    }
}
