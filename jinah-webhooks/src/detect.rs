//! Provider auto-detection
//!
//! Evidence is checked in order and the first match wins:
//! a provider signature header, the FinPay `client-id` header, then the
//! shape of the JSON body. Without evidence the configured default applies.

use crate::request::WebhookRequest;
use crate::signature::STRIPE_SIGNATURE_HEADER;
use jinah_payments::webhook::{WebhookSource, lookup};
use serde_json::Value;

/// What identified the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    SignatureHeader,
    ClientIdHeader,
    PayloadShape,
    /// Nothing matched; the configured default was used
    Default,
}

/// Outcome of auto-detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub service: String,
    pub evidence: Evidence,
}

impl Detection {
    /// Whether something in the request identified the service
    pub fn has_evidence(&self) -> bool {
        self.evidence != Evidence::Default
    }
}

fn present(body: &Value, path: &str) -> bool {
    lookup(body, path).is_some()
}

/// Match the request against known providers
pub fn detect_evidence(request: &WebhookRequest, body: Option<&Value>) -> Option<(WebhookSource, Evidence)> {
    if request.has_header(STRIPE_SIGNATURE_HEADER) {
        return Some((WebhookSource::Stripe, Evidence::SignatureHeader));
    }
    if request.header("client-id") == Some("FINPAY") {
        return Some((WebhookSource::FinPay, Evidence::ClientIdHeader));
    }

    let body = body?;
    if present(body, "type") && present(body, "data.object") && present(body, "api_version") {
        return Some((WebhookSource::Stripe, Evidence::PayloadShape));
    }
    if present(body, "transaction_status") && present(body, "order_id") && present(body, "signature_key") {
        return Some((WebhookSource::Midtrans, Evidence::PayloadShape));
    }
    let finpay_flat = present(body, "transaction_id")
        && present(body, "merchant_order_id")
        && (present(body, "event_type") || present(body, "transaction_status"));
    let finpay_nested = present(body, "order.id") && present(body, "result.payment");
    if finpay_flat || finpay_nested {
        return Some((WebhookSource::FinPay, Evidence::PayloadShape));
    }
    None
}

/// Detect the service, falling back to `default_service`
pub fn detect_service(request: &WebhookRequest, body: Option<&Value>, default_service: &str) -> Detection {
    match detect_evidence(request, body) {
        Some((source, evidence)) => Detection {
            service: source.name().to_string(),
            evidence,
        },
        None => Detection {
            service: default_service.to_string(),
            evidence: Evidence::Default,
        },
    }
}
