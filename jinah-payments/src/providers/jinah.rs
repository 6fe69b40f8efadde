//! Jinah meta provider
//!
//! Hosts its own checkout page and routes each payment channel to the
//! service configured for it in `services.<name>.channels`.

use crate::config::ChannelRoute;
use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentProvider;
use crate::router::ProviderRouter;
use crate::store::{PayloadStore, load_value, store_value};
use crate::types::{CustomerDetails, PaymentChannel, PaymentRequest, PaymentResponse, PaymentStatus};
use crate::webhook::WebhookPayload;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How long a hosted checkout keeps the original request
pub const PAYLOAD_TTL: Duration = Duration::from_secs(20 * 60);
/// How long the service handling an order is remembered
pub const ROUTE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Expiry advertised for a hosted checkout, in seconds
pub const CHECKOUT_EXPIRY_SECS: i64 = 60 * 60;

const DEFAULT_FALLBACK_SERVICE: &str = "finpay";
const META_DRIVER: &str = "jinah";

/// Store key of the cached request for an order
pub fn payload_key(order_id: &str) -> String {
    format!("jinah_payload_{}", order_id)
}

/// Store key of the recorded route for an order
pub fn route_key(order_id: &str) -> String {
    format!("jinah_route_{}", order_id)
}

/// Channel-routing meta provider
pub struct JinahProvider {
    name: String,
    display_name: String,
    router: ProviderRouter,
    store: Arc<dyn PayloadStore>,
    channels: BTreeMap<String, ChannelRoute>,
    fallback_service: String,
    checkout_url: String,
}

impl JinahProvider {
    /// Build from the `services.<name>` section
    pub fn from_router(name: &str, router: ProviderRouter) -> PaymentResult<Self> {
        let config = router.config();
        let section = config.service(name)?;

        let checkout_url = format!("{}/jinah/payment", config.app_url.trim_end_matches('/'));
        let channels = section.channels.clone();
        let fallback_service = section
            .fallback_service
            .clone()
            .unwrap_or_else(|| DEFAULT_FALLBACK_SERVICE.to_string());
        let display_name = section.name.clone().unwrap_or_else(|| "Jinah".to_string());

        Ok(Self {
            name: name.to_string(),
            display_name,
            store: router.store(),
            router,
            channels,
            fallback_service,
            checkout_url,
        })
    }

    /// Route configured for a channel
    pub fn channel_route(&self, channel: &str) -> PaymentResult<&ChannelRoute> {
        let route = self.channels.get(channel).ok_or_else(|| {
            PaymentError::Configuration(format!("Payment channel '{}' is not configured", channel))
        })?;
        if self.is_meta_service(&route.service) {
            return Err(PaymentError::Configuration(format!(
                "Payment channel '{}' routes to meta service '{}'",
                channel, route.service
            )));
        }
        Ok(route)
    }

    /// Whether `service` is driven by a meta provider, which would route again
    fn is_meta_service(&self, service: &str) -> bool {
        let driver = self
            .router
            .config()
            .services
            .get(service)
            .and_then(|section| section.driver.as_deref())
            .unwrap_or(service);
        service == self.name || driver == META_DRIVER
    }

    /// Configured channel codes
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Continue a hosted checkout on the channel the customer picked
    pub async fn resume(
        &self,
        order_id: &str,
        channel: &PaymentChannel,
        customer: CustomerDetails,
    ) -> PaymentResult<PaymentResponse> {
        let mut request: PaymentRequest = load_value(self.store.as_ref(), &payload_key(order_id))
            .await?
            .ok_or_else(|| {
                PaymentError::Validation(format!(
                    "Checkout for order '{}' has expired or does not exist",
                    order_id
                ))
            })?;
        request.customer.merge(customer);
        self.initiate_channel(&request, channel).await
    }

    async fn routed_provider(&self, order_id: &str) -> PaymentResult<Arc<dyn PaymentProvider>> {
        let service: Option<String> = load_value(self.store.as_ref(), &route_key(order_id)).await?;
        let service = service.unwrap_or_else(|| self.fallback_service.clone());
        debug!(order_id, service = %service, "Resolved order route");
        if self.is_meta_service(&service) {
            return Err(PaymentError::Configuration(format!(
                "Order '{}' routes to meta service '{}'",
                order_id, service
            )));
        }
        self.router.resolve(Some(&service))
    }
}

#[async_trait]
impl PaymentProvider for JinahProvider {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn initiate(&self, request: &PaymentRequest) -> PaymentResult<PaymentResponse> {
        request.validate()?;
        store_value(
            self.store.as_ref(),
            &payload_key(&request.order_id),
            request,
            Some(PAYLOAD_TTL),
        )
        .await?;
        info!(service = %self.name, order_id = %request.order_id, "Hosted checkout created");

        let redirect = url::Url::parse_with_params(&self.checkout_url, &[("order_id", &request.order_id)])
            .map_err(|e| PaymentError::Configuration(format!("Invalid app_url: {}", e)))?;

        Ok(PaymentResponse::success(&self.name)
            .ids(&request.order_id, &request.order_id)
            .status(PaymentStatus::Pending)
            .amount(request.payable_amount()?, request.currency.code())
            .redirect_url(redirect.to_string())
            .expiry_time(Utc::now() + chrono::Duration::seconds(CHECKOUT_EXPIRY_SECS))
            .raw(json!({})))
    }

    async fn initiate_channel(
        &self,
        request: &PaymentRequest,
        channel: &PaymentChannel,
    ) -> PaymentResult<PaymentResponse> {
        request.validate()?;
        let route = self.channel_route(&channel.code)?;
        let provider = self.router.resolve(Some(&route.service))?;
        let delegated = PaymentChannel {
            code: route.code.clone(),
            kind: route.kind.or(channel.kind),
        };
        info!(
            order_id = %request.order_id,
            channel = %channel.code,
            service = %route.service,
            "Routing channel payment"
        );

        let response = provider.initiate_channel(request, &delegated).await?;
        if response.success {
            store_value(
                self.store.as_ref(),
                &route_key(&request.order_id),
                &route.service,
                Some(ROUTE_TTL),
            )
            .await?;
        }
        Ok(response)
    }

    async fn check(&self, order_id: &str) -> PaymentResult<WebhookPayload> {
        self.routed_provider(order_id).await?.check(order_id).await
    }

    async fn cancel(&self, transaction_id: &str) -> PaymentResult<PaymentResponse> {
        self.routed_provider(transaction_id)
            .await?
            .cancel(transaction_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JinahConfig, ServiceConfig};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn finpay_section(url: &str) -> ServiceConfig {
        ServiceConfig {
            driver: Some("finpay".into()),
            development_url: Some(url.to_string()),
            client_id: Some("merchant".into()),
            client_secret: Some(SecretString::new("secret".into())),
            retry_attempts: 1,
            ..ServiceConfig::default()
        }
    }

    fn router(primary: &str, alternate: &str) -> ProviderRouter {
        let mut config = JinahConfig::default();
        config.default_service = "finpay".into();
        config.app_url = "https://shop.test".into();
        config.services.insert("finpay".into(), finpay_section(primary));
        config.services.insert("finpay-alt".into(), finpay_section(alternate));
        if let Some(jinah) = config.services.get_mut("jinah") {
            jinah.channels.insert("qris".into(), ChannelRoute::new("finpay-alt", "qris"));
            jinah.channels.insert("loop".into(), ChannelRoute::new("jinah", "loop"));
        }
        ProviderRouter::with_store(Arc::new(config), Arc::new(MemoryStore::new()))
    }

    fn meta(router: &ProviderRouter) -> JinahProvider {
        JinahProvider::from_router("jinah", router.clone()).unwrap()
    }

    fn request() -> PaymentRequest {
        PaymentRequest::new("ORD-7", Decimal::from(25000), "Tea").customer_name("Sari")
    }

    fn ok_initiate() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": "2000000",
            "stringQr": "00020101021226590013ID.CO.QRIS.WWW"
        }))
    }

    #[tokio::test]
    async fn test_initiate_caches_request() {
        let router = router("http://127.0.0.1:9", "http://127.0.0.1:9");
        let jinah = meta(&router);

        let response = jinah.initiate(&request()).await.unwrap();
        assert!(response.success);
        assert_eq!(response.via.as_deref(), Some("jinah"));
        assert_eq!(
            response.redirect_url.as_deref(),
            Some("https://shop.test/jinah/payment?order_id=ORD-7")
        );
        assert!(response.expiry_time.unwrap() > Utc::now());
        assert_eq!(response.raw_response, json!({}));

        let cached: Option<PaymentRequest> =
            load_value(router.store().as_ref(), &payload_key("ORD-7")).await.unwrap();
        assert_eq!(cached, Some(request()));
    }

    #[tokio::test]
    async fn test_channel_routing_ignores_default_service() {
        let primary = MockServer::start().await;
        let alternate = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ok_initiate())
            .expect(0)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/pg/payment/card/initiate"))
            .and(body_partial_json(json!({"sourceOfFunds": {"type": "qris"}})))
            .respond_with(ok_initiate())
            .expect(1)
            .mount(&alternate)
            .await;

        let router = router(&primary.uri(), &alternate.uri());
        let response = meta(&router)
            .initiate_channel(&request(), &PaymentChannel::new("qris"))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.via.as_deref(), Some("finpay-alt"));
        let recorded: Option<String> =
            load_value(router.store().as_ref(), &route_key("ORD-7")).await.unwrap();
        assert_eq!(recorded.as_deref(), Some("finpay-alt"));
    }

    #[tokio::test]
    async fn test_unknown_channel_is_configuration_error() {
        let router = router("http://127.0.0.1:9", "http://127.0.0.1:9");
        let result = meta(&router)
            .initiate_channel(&request(), &PaymentChannel::new("gopay"))
            .await;
        assert!(matches!(result, Err(PaymentError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_route_back_to_meta_is_rejected() {
        let router = router("http://127.0.0.1:9", "http://127.0.0.1:9");
        let result = meta(&router)
            .initiate_channel(&request(), &PaymentChannel::new("loop"))
            .await;
        assert!(matches!(result, Err(PaymentError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_route_between_meta_services_is_rejected() {
        let mut config = JinahConfig::default();
        config.services.insert(
            "jinah-b".into(),
            ServiceConfig {
                driver: Some("jinah".into()),
                ..ServiceConfig::default()
            },
        );
        if let Some(jinah) = config.services.get_mut("jinah") {
            jinah.channels.insert("qris".into(), ChannelRoute::new("jinah-b", "qris"));
        }
        if let Some(other) = config.services.get_mut("jinah-b") {
            other.channels.insert("qris".into(), ChannelRoute::new("jinah", "qris"));
        }
        let router = ProviderRouter::with_store(Arc::new(config), Arc::new(MemoryStore::new()));

        for name in ["jinah", "jinah-b"] {
            let meta = JinahProvider::from_router(name, router.clone()).unwrap();
            let result = meta.initiate_channel(&request(), &PaymentChannel::new("qris")).await;
            assert!(matches!(result, Err(PaymentError::Configuration(_))));
        }
    }

    #[tokio::test]
    async fn test_check_with_meta_fallback_is_rejected() {
        let mut config = JinahConfig::default();
        if let Some(jinah) = config.services.get_mut("jinah") {
            jinah.fallback_service = Some("jinah".into());
        }
        let router = ProviderRouter::with_store(Arc::new(config), Arc::new(MemoryStore::new()));
        let result = meta(&router).check("ORD-404").await;
        assert!(matches!(result, Err(PaymentError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_resume_applies_customer_overrides() {
        let alternate = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"customer": {"email": "sari@example.com"}})))
            .respond_with(ok_initiate())
            .expect(1)
            .mount(&alternate)
            .await;

        let router = router("http://127.0.0.1:9", &alternate.uri());
        let jinah = meta(&router);
        jinah.initiate(&request()).await.unwrap();

        let customer = CustomerDetails {
            email: Some("sari@example.com".into()),
            ..CustomerDetails::default()
        };
        let response = jinah
            .resume("ORD-7", &PaymentChannel::new("qris"), customer)
            .await
            .unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_resume_without_checkout() {
        let router = router("http://127.0.0.1:9", "http://127.0.0.1:9");
        let result = meta(&router)
            .resume("ORD-404", &PaymentChannel::new("qris"), CustomerDetails::default())
            .await;
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }

    #[tokio::test]
    async fn test_check_follows_recorded_route() {
        let alternate = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pg/payment/card/check/ORD-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"order": {"id": "ORD-7"}, "result": {"payment": {"status": "PENDING"}}}
            })))
            .expect(1)
            .mount(&alternate)
            .await;

        let router = router("http://127.0.0.1:9", &alternate.uri());
        store_value(router.store().as_ref(), &route_key("ORD-7"), &"finpay-alt", None)
            .await
            .unwrap();

        let payload = meta(&router).check("ORD-7").await.unwrap();
        assert_eq!(payload.status, Some(PaymentStatus::Pending));
    }
}
