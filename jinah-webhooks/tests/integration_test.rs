//! Integration tests for jinah-webhooks

use async_trait::async_trait;
use jinah_payments::config::{JinahConfig, WebhookServiceSettings};
use jinah_payments::types::PaymentStatus;
use jinah_webhooks::signature::{finpay_signature, midtrans_signature, stripe_signature};
use jinah_webhooks::*;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn secret(value: &str) -> Option<SecretString> {
    Some(SecretString::new(value.into()))
}

fn config() -> Arc<JinahConfig> {
    let mut config = JinahConfig::default();
    config.webhook.services.insert(
        "finpay".into(),
        WebhookServiceSettings {
            secret: secret("finpay-secret"),
            ip_whitelist: Some("103.10.128.0/24".into()),
            ..WebhookServiceSettings::default()
        },
    );
    config.webhook.services.insert(
        "stripe".into(),
        WebhookServiceSettings {
            endpoint_secret: secret("whsec_live"),
            ..WebhookServiceSettings::default()
        },
    );
    config.webhook.services.insert(
        "midtrans".into(),
        WebhookServiceSettings {
            server_key: secret("SB-Mid-server"),
            ..WebhookServiceSettings::default()
        },
    );
    Arc::new(config)
}

#[derive(Default)]
struct Captured {
    events: Mutex<Vec<(PaymentEventKind, Option<String>, Option<PaymentStatus>)>>,
}

/// Local newtype so the listener impl satisfies the orphan rule
struct SharedCapture(Arc<Captured>);

#[async_trait]
impl PaymentEventListener for SharedCapture {
    async fn on_event(&self, event: &PaymentEvent) -> std::result::Result<(), ListenerError> {
        if let Ok(mut events) = self.0.events.lock() {
            events.push((
                event.kind,
                event.payload.merchant_order_id.clone(),
                event.payload.status.clone(),
            ));
        }
        Ok(())
    }
}

fn receiver_with_capture() -> (WebhookReceiver, Arc<Captured>) {
    let captured = Arc::new(Captured::default());
    let receiver = WebhookReceiver::new(config());
    receiver.dispatcher().subscribe_all(SharedCapture(captured.clone()));
    (receiver, captured)
}

// ============================================================================
// Stripe
// ============================================================================

#[tokio::test]
async fn test_stripe_header_auto_detect_end_to_end() {
    let (receiver, captured) = receiver_with_capture();
    // Body also carries FinPay-looking fields
    let body = json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "transaction_id": "T-1",
        "merchant_order_id": "ORD-9",
        "event_type": "payment",
        "data": {"object": {
            "id": "pi_1",
            "status": "succeeded",
            "amount": 259900,
            "currency": "usd",
            "created": 1700000000,
            "metadata": {"merchant_order_id": "ORD-9"}
        }}
    })
    .to_string();
    let now = 1_700_000_100;
    let request = WebhookRequest::post("/payment-webhook", body.clone())
        .with_header("Stripe-Signature", stripe_signature(body.as_bytes(), "whsec_live", now).unwrap());

    let response = receiver.handle_at(&request, None, now).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["service"], "stripe");
    assert_eq!(response.body["auto_detected"], true);

    let events = captured.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].0, PaymentEventKind::Successful);
    assert_eq!(events[1].1.as_deref(), Some("ORD-9"));
}

#[tokio::test]
async fn test_stripe_replay_is_rejected() {
    let (receiver, captured) = receiver_with_capture();
    let body = r#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
    let signed_at = 1_700_000_000;
    let request = WebhookRequest::post("/payment-webhook/stripe", body)
        .with_header("Stripe-Signature", stripe_signature(body.as_bytes(), "whsec_live", signed_at).unwrap());

    let response = receiver.handle_at(&request, Some("stripe"), signed_at + 301).await;
    assert_eq!(response.status, 401);
    assert!(captured.events.lock().unwrap().is_empty());
}

// ============================================================================
// FinPay
// ============================================================================

fn finpay_request(ip: &str) -> WebhookRequest {
    let mut payload = json!({
        "merchant": {"id": "FP-MERCHANT"},
        "order": {"id": "INV-77", "reference": "FP-REF-77", "amount": 150000, "currency": "IDR"},
        "result": {"payment": {"status": "PAID", "datetime": "2024-05-01 10:15:00", "channel": "vabca"}},
        "sourceOfFunds": {"type": "vabca"}
    });
    payload["signature"] = json!(finpay_signature(&payload, "finpay-secret").unwrap());
    WebhookRequest::post("/payment-webhook/finpay", payload.to_string())
        .with_client_ip(ip)
        .with_header("Client-Id", "FINPAY")
        .with_header("User-Agent", "FinPay-Callback/2.0")
}

#[tokio::test]
async fn test_finpay_notification_is_normalized() {
    let receiver = WebhookReceiver::new(config());
    let processed = receiver
        .process(&finpay_request("103.10.128.9"), Some("finpay"), 0)
        .await
        .unwrap();

    let payload = &processed.payload;
    assert_eq!(payload.service, "finpay");
    assert_eq!(payload.merchant_order_id.as_deref(), Some("INV-77"));
    assert_eq!(payload.transaction_id.as_deref(), Some("FP-REF-77"));
    assert_eq!(payload.status, Some(PaymentStatus::Completed));
    assert_eq!(payload.amount, Some(Decimal::from(150_000)));
    assert_eq!(payload.payment_method.as_deref(), Some("vabca"));
    assert_eq!(payload.metadata["ip"], "103.10.128.9");
    assert_eq!(payload.metadata["merchant_id"], "FP-MERCHANT");
    assert!(processed.report.is_clean());
}

#[tokio::test]
async fn test_finpay_outside_allow_list() {
    let receiver = WebhookReceiver::new(config());
    let response = receiver.handle(&finpay_request("198.51.100.20"), Some("finpay")).await;
    assert_eq!(response.status, 401);
    assert_eq!(response.body, json!({"error": "Invalid signature"}));
}

// ============================================================================
// Midtrans
// ============================================================================

#[tokio::test]
async fn test_midtrans_hint_overridden_by_shape() {
    let (receiver, captured) = receiver_with_capture();
    let body = json!({
        "transaction_id": "mt-1",
        "order_id": "ORD1",
        "status_code": "200",
        "gross_amount": "10000.00",
        "transaction_status": "expire",
        "transaction_time": "2024-05-01 10:00:00",
        "payment_type": "qris",
        "signature_key": midtrans_signature("ORD1", "200", "10000.00", "SB-Mid-server")
    });
    let request = WebhookRequest::post("/payment-webhook/finpay", body.to_string());

    let response = receiver.handle(&request, Some("finpay")).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["service"], "midtrans");

    let events = captured.events.lock().unwrap();
    assert_eq!(events[1].0, PaymentEventKind::Failed);
}

// ============================================================================
// Health
// ============================================================================

#[test]
fn test_health_lists_configured_services() {
    let health = WebhookReceiver::new(config()).health();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["supported_services"], json!(["finpay", "midtrans", "stripe"]));
    assert!(health["timestamp"].as_str().is_some());
}
