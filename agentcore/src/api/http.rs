use super::error::ApiError;
use super::signer::sign_request;
use super::{ApiRequest, Transport};
use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::{Duration, SystemTime};

const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";
const JSON: &str = "application/json";

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl RetryConfig {
    /// Delay before retry `attempt` (1-based), doubling up to `max_backoff_ms`
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 1_u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

/// SigV4-signed JSON over HTTPS
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
    region: String,
    credentials: SharedCredentialsProvider,
    retry_config: RetryConfig,
}

impl HttpTransport {
    pub fn new(
        endpoint: &str,
        region: &str,
        credentials: SharedCredentialsProvider,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            region: region.to_string(),
            credentials,
            retry_config,
        })
    }

    async fn resolve_credentials(&self) -> Result<Credentials, ApiError> {
        self.credentials
            .provide_credentials()
            .await
            .map_err(|e| ApiError::Credentials(e.to_string()))
    }

    async fn signed_send(
        &self,
        method: &reqwest::Method,
        url: &str,
        body: &[u8],
    ) -> Result<reqwest::Response, ApiError> {
        let credentials = self.resolve_credentials().await?;
        let signed = sign_request(
            &credentials,
            &self.region,
            method.as_str(),
            url,
            &[("content-type", JSON)],
            body,
            SystemTime::now(),
        )?;

        let mut builder = self
            .http_client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, JSON);
        for (name, value) in signed {
            builder = builder.header(name, value);
        }
        if !body.is_empty() {
            builder = builder.body(body.to_vec());
        }

        Ok(builder.send().await?)
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F, Fut>(&self, request_fn: F, path: &str) -> Result<Value, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, ApiError>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.retry_config.max_retries {
            if attempt > 0 {
                let backoff = self.retry_config.backoff_ms(attempt);
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return self.parse_success_response(response).await;
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
                    {
                        last_error = Some(self.handle_error_response(response).await);
                    } else {
                        return Err(self.handle_error_response(response).await);
                    }
                }
                Err(ApiError::RequestError(e)) => {
                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(self.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
                Err(e) => return Err(e),
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response
    async fn parse_success_response(&self, response: reqwest::Response) -> Result<Value, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(e.to_string())
        })
    }

    /// Handle error response
    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let error_type = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        tracing::debug!("API error response ({}): {}", status, text);
        ApiError::from_response(status, error_type.as_deref(), &text)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let body = match &request.body {
            Some(body) => {
                serde_json::to_vec(body).map_err(|e| ApiError::ParseError(e.to_string()))?
            }
            None => Vec::new(),
        };

        tracing::debug!("{} request to: {}", request.method, url);

        let (this, method, url, body) = (self, &request.method, url.as_str(), body.as_slice());
        self.execute_with_retry(
            move || async move { this.signed_send(method, url, body).await },
            &request.path,
        )
        .await
    }
}
