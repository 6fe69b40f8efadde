//! Payment provider trait and common HTTP transport

use crate::error::{PaymentError, PaymentResult};
use crate::types::{PaymentChannel, PaymentRequest, PaymentResponse, TransactionInquiry};
use crate::webhook::WebhookPayload;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Payment provider trait
///
/// Implement this trait for each payment service. Provider-side failures
/// come back as a failed [`PaymentResponse`]; `Err` is reserved for
/// configuration and validation problems found before any I/O.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Stable service identifier
    fn service_name(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str {
        self.service_name()
    }

    /// Start a hosted payment
    async fn initiate(&self, request: &PaymentRequest) -> PaymentResult<PaymentResponse>;

    /// Start a payment on a specific channel
    async fn initiate_channel(
        &self,
        request: &PaymentRequest,
        channel: &PaymentChannel,
    ) -> PaymentResult<PaymentResponse>;

    /// Query the current status of an order
    async fn check(&self, order_id: &str) -> PaymentResult<WebhookPayload>;

    /// Query status by transaction or merchant order id
    async fn inquiry(&self, inquiry: &TransactionInquiry) -> PaymentResult<PaymentResponse> {
        let payload = self.check(inquiry.id()).await?;
        Ok(response_from_payload(self.service_name(), payload))
    }

    /// Cancel a transaction
    async fn cancel(&self, transaction_id: &str) -> PaymentResult<PaymentResponse> {
        debug!(
            service = self.service_name(),
            transaction_id, "Cancellation not supported"
        );
        Ok(PaymentResponse::failed(
            self.service_name(),
            format!("Cancellation is not supported by {}", self.display_name()),
            Some("unsupported".to_string()),
            Value::Object(Default::default()),
        ))
    }
}

/// Express a status query result as a [`PaymentResponse`]
pub fn response_from_payload(via: &str, payload: WebhookPayload) -> PaymentResponse {
    if let Some(error) = payload
        .metadata_field("transport_error")
        .and_then(Value::as_str)
    {
        return PaymentResponse::failed(
            via,
            error.to_string(),
            Some("transport_error".to_string()),
            payload.raw_payload,
        );
    }

    let mut response = PaymentResponse::success(via);
    response.transaction_id = payload.transaction_id;
    response.merchant_order_id = payload.merchant_order_id;
    response.status = payload.status;
    response.amount = payload.amount;
    response.currency = payload.currency;
    response.raw_response = payload.raw_payload;
    response
}

/// Bounded retry with linear backoff: attempt `n` waits `n * delay_unit`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub delay_unit: Duration,
    /// Status codes treated as transient
    pub retry_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_unit: Duration::from_millis(1000),
            retry_status_codes: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Linear policy
    pub fn linear(max_attempts: u32, delay_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay_unit,
            ..Default::default()
        }
    }

    /// Single attempt
    pub fn none() -> Self {
        Self::linear(1, Duration::ZERO)
    }

    /// Delay before retrying after `attempt` (1-based) failed
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.delay_unit * attempt
    }

    /// Whether a response status is transient
    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        self.retry_status_codes.contains(&status.as_u16())
    }
}

/// Outcome of one logical provider call
#[derive(Debug, Clone)]
pub struct ProviderReply {
    /// HTTP status of the last attempt; `None` when nothing came back
    pub status: Option<u16>,
    /// Parsed body, `{}` when empty
    pub body: Value,
    /// Transport error of the last attempt
    pub error: Option<String>,
}

impl ProviderReply {
    fn transport_failure(error: String) -> Self {
        Self {
            status: None,
            body: Value::Object(Default::default()),
            error: Some(error),
        }
    }

    /// No response at all
    pub fn is_transport_failure(&self) -> bool {
        self.status.is_none()
    }

    /// 2xx transport status
    pub fn is_http_success(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// Connection settings for [`ProviderClient`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub retry: RetryPolicy,
    /// Log request and response bodies
    pub log_bodies: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            verify_ssl: true,
            retry: RetryPolicy::default(),
            log_bodies: false,
        }
    }
}

/// HTTP client for providers using Basic authentication
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: SecretString,
    settings: ClientSettings,
}

impl ProviderClient {
    /// Create a new provider client
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        settings: ClientSettings,
    ) -> PaymentResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret,
            settings,
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET request
    pub async fn get(&self, path: &str) -> ProviderReply {
        self.send(Method::GET, path, None).await
    }

    /// POST request with JSON body
    pub async fn post(&self, path: &str, body: &Value) -> ProviderReply {
        self.send(Method::POST, path, Some(body)).await
    }

    /// Send with retries; never fails, the reply carries what happened
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ProviderReply {
        let url = format!("{}{}", self.base_url, path);
        let retry = &self.settings.retry;
        let mut attempt = 0;

        if self.settings.log_bodies {
            info!(%method, %url, body = ?body, "Provider request");
        }

        loop {
            attempt += 1;
            let mut request = self
                .client
                .request(method.clone(), &url)
                .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
                .header(reqwest::header::ACCEPT, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            let reply = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if retry.should_retry_status(status) && attempt < retry.max_attempts {
                        debug!(attempt, status = %status, "Retrying request due to status code");
                        tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
                        continue;
                    }
                    let text = response.text().await.unwrap_or_default();
                    ProviderReply {
                        status: Some(status.as_u16()),
                        body: parse_body(&text),
                        error: None,
                    }
                }
                Err(e) => {
                    if attempt < retry.max_attempts {
                        debug!(attempt, error = %e, "Retrying request after transport error");
                        tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
                        continue;
                    }
                    warn!(%url, attempts = attempt, error = %e, "Provider unreachable");
                    ProviderReply::transport_failure(e.to_string())
                }
            };

            if self.settings.log_bodies {
                info!(%url, status = ?reply.status, body = %reply.body, "Provider response");
            }
            return reply;
        }
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
