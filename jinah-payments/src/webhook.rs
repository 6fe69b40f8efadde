//! Canonical inbound payment event

use crate::types::{PaymentStatus, status_in};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

const SUCCESSFUL_STATUSES: &[&str] = &["completed", "success", "paid", "settlement", "capture"];
const FAILED_STATUSES: &[&str] = &["failed", "cancelled", "expired", "deny", "cancel", "expire"];
const PENDING_STATUSES: &[&str] = &["pending", "waiting", "processing"];

/// Provider a webhook originates from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookSource {
    FinPay,
    Stripe,
    Midtrans,
    /// Any other service, normalized with the generic field lookup
    Generic(String),
}

impl WebhookSource {
    /// Map a service name to a source
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "finpay" => Self::FinPay,
            "stripe" => Self::Stripe,
            "midtrans" => Self::Midtrans,
            other => Self::Generic(other.to_string()),
        }
    }

    /// Service name
    pub fn name(&self) -> &str {
        match self {
            Self::FinPay => "finpay",
            Self::Stripe => "stripe",
            Self::Midtrans => "midtrans",
            Self::Generic(name) => name,
        }
    }
}

impl fmt::Display for WebhookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome bucket of a payment event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Successful,
    Failed,
    Pending,
    /// Status outside every known bucket
    Unclassified,
}

/// Canonical event built from a provider webhook or status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub service: String,
    pub event_type: String,
    pub transaction_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Client IP, user agent, headers and provider extras
    pub metadata: Map<String, Value>,
    /// Provider body, untouched
    pub raw_payload: Value,
    pub payment_method: Option<String>,
}

impl WebhookPayload {
    fn status_matches(&self, set: &[&str]) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| status_in(s.as_str(), set))
    }

    /// Completed, success, paid, settlement or capture
    pub fn is_payment_successful(&self) -> bool {
        self.status_matches(SUCCESSFUL_STATUSES)
    }

    /// Failed, cancelled, expired, deny, cancel or expire
    pub fn is_payment_failed(&self) -> bool {
        self.status_matches(FAILED_STATUSES)
    }

    /// Pending, waiting or processing
    pub fn is_payment_pending(&self) -> bool {
        self.status_matches(PENDING_STATUSES)
    }

    /// Exactly one outcome bucket; success is checked first
    pub fn outcome(&self) -> PaymentOutcome {
        if self.is_payment_successful() {
            PaymentOutcome::Successful
        } else if self.is_payment_failed() {
            PaymentOutcome::Failed
        } else if self.is_payment_pending() {
            PaymentOutcome::Pending
        } else {
            PaymentOutcome::Unclassified
        }
    }

    /// Look up a dotted path such as `result.payment.channel` in the raw payload
    pub fn raw_field(&self, path: &str) -> Option<&Value> {
        lookup(&self.raw_payload, path)
    }

    /// Metadata entry
    pub fn metadata_field(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Dotted-path lookup through objects and array indices
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() { None } else { Some(current) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(status: Option<&str>) -> WebhookPayload {
        WebhookPayload {
            service: "finpay".into(),
            event_type: "payment.notification".into(),
            transaction_id: Some("T1".into()),
            merchant_order_id: Some("ORD1".into()),
            status: status.map(PaymentStatus::parse),
            amount: None,
            currency: Some("IDR".into()),
            timestamp: Utc::now(),
            metadata: Map::new(),
            raw_payload: json!({"result": {"payment": {"channel": "qris"}}, "items": [{"sku": "A"}]}),
            payment_method: None,
        }
    }

    #[test]
    fn test_outcome_buckets() {
        assert_eq!(payload(Some("completed")).outcome(), PaymentOutcome::Successful);
        assert_eq!(payload(Some("SETTLEMENT")).outcome(), PaymentOutcome::Successful);
        assert_eq!(payload(Some("deny")).outcome(), PaymentOutcome::Failed);
        assert_eq!(payload(Some("cancelled")).outcome(), PaymentOutcome::Failed);
        assert_eq!(payload(Some("processing")).outcome(), PaymentOutcome::Pending);
        assert_eq!(payload(Some("refunded")).outcome(), PaymentOutcome::Unclassified);
        assert_eq!(payload(None).outcome(), PaymentOutcome::Unclassified);
    }

    #[test]
    fn test_raw_field_dotted_path() {
        let p = payload(None);
        assert_eq!(p.raw_field("result.payment.channel"), Some(&json!("qris")));
        assert_eq!(p.raw_field("items.0.sku"), Some(&json!("A")));
        assert!(p.raw_field("result.missing").is_none());
        assert!(p.raw_field("items.x").is_none());
    }

    #[test]
    fn test_source_from_name() {
        assert_eq!(WebhookSource::from_name("Stripe"), WebhookSource::Stripe);
        assert_eq!(
            WebhookSource::from_name("xendit"),
            WebhookSource::Generic("xendit".into())
        );
        assert_eq!(WebhookSource::Midtrans.to_string(), "midtrans");
    }
}
