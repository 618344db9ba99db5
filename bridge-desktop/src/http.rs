//! Reqwest-backed [`HttpClient`]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpRequest, HttpResponse},
};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("favicon-core/", env!("CARGO_PKG_VERSION"));

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts per request, including the first
const MAX_ATTEMPTS: u32 = 3;
const BASE_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Fetches icons and home pages over HTTPS
///
/// Transport errors, 5xx and 429 responses are retried with exponential
/// backoff. Any other response is returned as-is on the first attempt.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Falls back to reqwest's default client if the tuned one cannot be built
    pub fn with_timeout(timeout: Duration) -> Self {
        match Self::try_with_timeout(timeout) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Falling back to default HTTP client");
                Self::with_client(Client::new())
            }
        }
    }

    pub fn try_with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send_once(&self, request: &HttpRequest) -> Attempt {
        let mut builder = self.client.get(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(BridgeError::OperationFailed(e.to_string())),
        };

        let status = response.status();
        if is_retryable(status) {
            return Attempt::Retry(BridgeError::HttpStatus {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        match response.bytes().await {
            Ok(body) => Attempt::Done(HttpResponse {
                status: status.as_u16(),
                headers,
                body,
            }),
            Err(e) => Attempt::Retry(BridgeError::OperationFailed(e.to_string())),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

enum Attempt {
    Done(HttpResponse),
    Retry(BridgeError),
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Delay before retry number `retry` (1-based)
fn backoff_delay(retry: u32) -> Duration {
    BASE_RETRY_DELAY
        .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
        .min(MAX_RETRY_DELAY)
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 1;
        loop {
            let error = match self.send_once(&request).await {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(error) => error,
            };

            if attempt >= MAX_ATTEMPTS {
                warn!(
                    url = %request.url,
                    error = %error,
                    attempts = attempt,
                    "HTTP request failed"
                );
                return Err(error);
            }

            let delay = backoff_delay(attempt);
            debug!(
                url = %request.url,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "Retrying HTTP request"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
