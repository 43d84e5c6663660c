//! Catalog fetching over reqwest.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("mplayer-core/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One round trip: either a final response or a failure worth retrying.
enum Attempt {
    Done(HttpResponse),
    Retry(BridgeError),
}

/// Reqwest-backed [`HttpClient`].
///
/// Server errors (5xx), throttling (429) and transport failures are retried
/// according to the request's [`RetryPolicy`]; every other status is handed
/// back to the caller untouched.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Client whose requests time out after `timeout` unless the request
    /// carries its own.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map(Self::with_client)
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e)))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn should_retry(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<Attempt> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Retry(transport_error(&e))),
        };

        let status = response.status().as_u16();
        if Self::should_retry(status) {
            return Ok(Attempt::Retry(BridgeError::OperationFailed(format!(
                "Server answered HTTP {}",
                status
            ))));
        }

        into_response(status, response).await.map(Attempt::Done)
    }
}

fn transport_error(error: &reqwest::Error) -> BridgeError {
    if error.is_timeout() {
        BridgeError::OperationFailed("Request timed out".to_string())
    } else if error.is_connect() {
        BridgeError::OperationFailed(format!("Connection failed: {}", error))
    } else {
        BridgeError::OperationFailed(error.to_string())
    }
}

async fn into_response(status: u16, response: Response) -> Result<HttpResponse> {
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    let body = response
        .bytes()
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to read body: {}", e)))?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);
        let mut failure = None;

        for attempt in 1..=attempts {
            debug!(attempt, attempts, "Fetching {}", request.url);

            match self.attempt(&request).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(error) => {
                    warn!(attempt, error = %error, "HTTP attempt failed");
                    failure = Some(error);
                }
            }

            if attempt < attempts {
                sleep(policy.delay_for(attempt)).await;
            }
        }

        Err(failure.unwrap_or_else(|| {
            BridgeError::OperationFailed("All retry attempts exhausted".to_string())
        }))
    }
}
