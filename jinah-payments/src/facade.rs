//! Application-facing payment entry point

use crate::config::JinahConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentProvider;
use crate::router::{ProviderAvailability, ProviderRouter};
use crate::types::{PaymentChannel, PaymentRequest, PaymentResponse, TransactionInquiry};
use crate::webhook::WebhookPayload;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Payment facade bound to one service
///
/// Switching services produces a new facade; the original keeps its binding.
#[derive(Clone)]
pub struct Jinah {
    router: ProviderRouter,
    provider: Arc<dyn PaymentProvider>,
}

impl Jinah {
    /// Bind to the configured default service
    pub fn new(router: ProviderRouter) -> PaymentResult<Self> {
        let provider = router.resolve(None)?;
        Ok(Self { router, provider })
    }

    /// Bind to a named service
    pub fn with_service(router: ProviderRouter, service: &str) -> PaymentResult<Self> {
        let provider = router.resolve(Some(service))?;
        Ok(Self { router, provider })
    }

    /// Build a router over the configuration and bind to its default service
    pub fn from_config(config: JinahConfig) -> PaymentResult<Self> {
        Self::new(ProviderRouter::new(config))
    }

    /// Start a payment on the bound service
    pub async fn charge(&self, request: &PaymentRequest) -> PaymentResult<PaymentResponse> {
        request.validate()?;
        info!(
            service = %self.current_service_name(),
            order_id = %request.order_id,
            amount = %request.amount,
            "Charging"
        );
        self.provider.initiate(request).await
    }

    /// Start a payment on a specific channel
    pub async fn charge_channel(
        &self,
        request: &PaymentRequest,
        channel: impl Into<PaymentChannel>,
    ) -> PaymentResult<PaymentResponse> {
        request.validate()?;
        let channel = channel.into();
        info!(
            service = %self.current_service_name(),
            order_id = %request.order_id,
            channel = %channel.code,
            "Charging on channel"
        );
        self.provider.initiate_channel(request, &channel).await
    }

    /// Shorthand charge from bare values
    pub async fn charge_with(
        &self,
        order_id: &str,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> PaymentResult<PaymentResponse> {
        let request = PaymentRequest::new(order_id, amount, description).currency_code(currency)?;
        self.charge(&request).await
    }

    /// Current status of an order
    pub async fn check(&self, order_id: &str) -> PaymentResult<WebhookPayload> {
        if order_id.trim().is_empty() {
            return Err(PaymentError::missing_field("order_id"));
        }
        debug!(service = %self.current_service_name(), order_id, "Checking status");
        self.provider.check(order_id).await
    }

    pub async fn inquiry_by_transaction_id(&self, id: &str) -> PaymentResult<PaymentResponse> {
        let inquiry = TransactionInquiry::by_transaction_id(id)?;
        self.provider.inquiry(&inquiry).await
    }

    pub async fn inquiry_by_merchant_order_id(&self, id: &str) -> PaymentResult<PaymentResponse> {
        let inquiry = TransactionInquiry::by_merchant_order_id(id)?;
        self.provider.inquiry(&inquiry).await
    }

    /// Cancel a transaction
    pub async fn cancel(&self, transaction_id: &str) -> PaymentResult<PaymentResponse> {
        if transaction_id.trim().is_empty() {
            return Err(PaymentError::missing_field("transaction_id"));
        }
        self.provider.cancel(transaction_id).await
    }

    /// A facade bound to another service
    pub fn switch_service(&self, service: &str) -> PaymentResult<Jinah> {
        Self::with_service(self.router.clone(), service)
    }

    pub fn current_service_name(&self) -> &str {
        self.provider.service_name()
    }

    pub fn current_provider(&self) -> Arc<dyn PaymentProvider> {
        self.provider.clone()
    }

    pub fn available_services(&self) -> Vec<ProviderAvailability> {
        self.router.list_available()
    }

    pub fn config(&self) -> &JinahConfig {
        self.router.config()
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }
}

impl std::fmt::Debug for Jinah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jinah")
            .field("service", &self.current_service_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::types::PaymentStatus;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: &str) -> JinahConfig {
        let mut config = JinahConfig::default();
        config.default_service = "finpay".into();
        config.services.insert(
            "finpay".into(),
            ServiceConfig {
                development_url: Some(url.to_string()),
                client_id: Some("merchant".into()),
                client_secret: Some(SecretString::new("secret".into())),
                retry_attempts: 1,
                ..ServiceConfig::default()
            },
        );
        config
    }

    #[test]
    fn test_binds_default_service() {
        let jinah = Jinah::from_config(config("http://127.0.0.1:9")).unwrap();
        assert_eq!(jinah.current_service_name(), "finpay");
    }

    #[test]
    fn test_switch_service_leaves_original_bound() {
        let jinah = Jinah::from_config(config("http://127.0.0.1:9")).unwrap();
        let meta = jinah.switch_service("jinah").unwrap();
        assert_eq!(meta.current_service_name(), "jinah");
        assert_eq!(jinah.current_service_name(), "finpay");
    }

    #[test]
    fn test_switch_to_unknown_service_fails() {
        let jinah = Jinah::from_config(config("http://127.0.0.1:9")).unwrap();
        assert!(matches!(
            jinah.switch_service("paypal"),
            Err(PaymentError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_charge_rejects_invalid_request() {
        let jinah = Jinah::from_config(config("http://127.0.0.1:9")).unwrap();
        let request = PaymentRequest::new("ORD-1", Decimal::ZERO, "Nothing");
        assert!(matches!(
            jinah.charge(&request).await,
            Err(PaymentError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_charge_with_unknown_currency() {
        let jinah = Jinah::from_config(config("http://127.0.0.1:9")).unwrap();
        let result = jinah.charge_with("ORD-1", Decimal::from(1000), "XYZ", "Tea").await;
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }

    #[tokio::test]
    async fn test_check_requires_order_id() {
        let jinah = Jinah::from_config(config("http://127.0.0.1:9")).unwrap();
        let err = jinah.check("  ").await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Missing required field: order_id");
    }

    #[tokio::test]
    async fn test_inquiry_by_merchant_order_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pg/payment/card/check/ORD-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "order": {"id": "ORD-9", "amount": 50000},
                    "result": {"payment": {"status": "PAID", "reference": "TRX-9"}}
                }
            })))
            .mount(&server)
            .await;

        let jinah = Jinah::from_config(config(&server.uri())).unwrap();
        let response = jinah.inquiry_by_merchant_order_id("ORD-9").await.unwrap();
        assert!(response.success);
        assert_eq!(response.status, Some(PaymentStatus::Completed));
        assert_eq!(response.merchant_order_id.as_deref(), Some("ORD-9"));
    }

    #[tokio::test]
    async fn test_cancel_unsupported_for_finpay() {
        let jinah = Jinah::from_config(config("http://127.0.0.1:9")).unwrap();
        let response = jinah.cancel("TRX-1").await.unwrap();
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some("unsupported"));
    }
}
