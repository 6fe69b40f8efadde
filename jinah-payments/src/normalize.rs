//! Provider webhook bodies to canonical [`WebhookPayload`]
//!
//! Each provider gets a typed view over its JSON body and a fixed status
//! table. Status values a table does not know are passed through verbatim.
//! Every field decodes leniently, so one mistyped field never hides the rest.

use crate::money::{decimal_from_json, minor_to_major};
use crate::types::PaymentStatus;
use crate::webhook::{WebhookPayload, WebhookSource, lookup};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

const DEFAULT_EVENT_TYPE: &str = "payment.notification";

/// Request facts recorded in the payload metadata
#[derive(Debug, Clone, Default)]
pub struct NormalizeContext {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub headers: Map<String, Value>,
}

impl NormalizeContext {
    fn base_metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        if self.client_ip.is_none() && self.user_agent.is_none() && self.headers.is_empty() {
            return metadata;
        }
        metadata.insert("ip".into(), opt_string(&self.client_ip));
        metadata.insert("user_agent".into(), opt_string(&self.user_agent));
        metadata.insert("headers".into(), Value::Object(self.headers.clone()));
        metadata
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

/// Accepts strings and numbers, yielding a string
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accepts integers and integral strings
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Nested object; `null` or a mistyped value yields the default
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(decimal_from_json))
}

/// Parse the timestamp shapes providers send
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

fn decode<T: for<'de> Deserialize<'de> + Default>(source: &str, raw: &Value) -> T {
    match serde_json::from_value(raw.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(source, error = %e, "Webhook body did not match the expected shape");
            T::default()
        }
    }
}

// ========== FinPay ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FinPayBody {
    #[serde(deserialize_with = "lenient_string")]
    event_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    transaction_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    merchant_order_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    transaction_status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(deserialize_with = "lenient_decimal")]
    amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient_string")]
    currency: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    timestamp: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    signature: Option<String>,
    #[serde(deserialize_with = "lenient")]
    order: FinPayOrder,
    #[serde(deserialize_with = "lenient")]
    result: FinPayResult,
    #[serde(rename = "sourceOfFunds", deserialize_with = "lenient")]
    source_of_funds: FinPaySourceOfFunds,
    #[serde(deserialize_with = "lenient")]
    merchant: FinPayMerchant,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FinPayOrder {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    reference: Option<String>,
    #[serde(deserialize_with = "lenient_decimal")]
    amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient_string")]
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FinPayResult {
    #[serde(deserialize_with = "lenient")]
    payment: FinPayPaymentResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FinPayPaymentResult {
    #[serde(deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    datetime: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    channel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FinPaySourceOfFunds {
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FinPayMerchant {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
}

/// FinPay status table
pub fn map_finpay_status(raw: &str) -> PaymentStatus {
    match raw {
        "PAID" | "CAPTURED" => PaymentStatus::Completed,
        "PENDING" => PaymentStatus::Pending,
        "FAILED" | "EXPIRED" => PaymentStatus::Failed,
        "CANCELLED" => PaymentStatus::Cancelled,
        other => PaymentStatus::Other(other.to_string()),
    }
}

/// Normalize a FinPay notification or status-check `data` object
pub fn from_finpay(raw: &Value, context: &NormalizeContext) -> WebhookPayload {
    let body: FinPayBody = decode("finpay", raw);

    let status = body
        .result
        .payment
        .status
        .or(body.transaction_status)
        .or(body.status)
        .map(|s| map_finpay_status(&s));

    let timestamp = body
        .result
        .payment
        .datetime
        .or(body.timestamp)
        .and_then(|t| parse_timestamp(&t))
        .unwrap_or_else(Utc::now);

    let mut metadata = context.base_metadata();
    if !metadata.is_empty() {
        metadata.insert("merchant_id".into(), opt_string(&body.merchant.id));
        metadata.insert("payment_type".into(), opt_string(&body.source_of_funds.kind));
        metadata.insert("channel".into(), opt_string(&body.result.payment.channel));
        metadata.insert("signature".into(), opt_string(&body.signature));
    }

    WebhookPayload {
        service: WebhookSource::FinPay.name().to_string(),
        event_type: body
            .event_type
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
        transaction_id: body.order.reference.or(body.transaction_id),
        merchant_order_id: body.order.id.or(body.merchant_order_id),
        status,
        amount: body.order.amount.or(body.amount),
        currency: Some(
            body.order
                .currency
                .or(body.currency)
                .unwrap_or_else(|| "IDR".to_string()),
        ),
        timestamp,
        metadata,
        raw_payload: raw.clone(),
        payment_method: body.source_of_funds.kind,
    }
}

// ========== Stripe ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StripeEvent {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    kind: Option<String>,
    #[serde(deserialize_with = "lenient")]
    data: StripeEventData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StripeEventData {
    #[serde(deserialize_with = "lenient")]
    object: StripeObject,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StripeObject {
    #[serde(deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    amount: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    currency: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    created: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    metadata: StripeMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StripeMetadata {
    #[serde(deserialize_with = "lenient_string")]
    merchant_order_id: Option<String>,
}

/// Stripe status table
pub fn map_stripe_status(raw: &str) -> PaymentStatus {
    match raw {
        "succeeded" => PaymentStatus::Completed,
        "pending" | "requires_payment_method" | "requires_confirmation" | "requires_action" => {
            PaymentStatus::Pending
        }
        "failed" => PaymentStatus::Failed,
        "canceled" => PaymentStatus::Cancelled,
        "processing" => PaymentStatus::Processing,
        other => PaymentStatus::Other(other.to_string()),
    }
}

/// Normalize a Stripe event; amounts arrive in minor units
pub fn from_stripe(raw: &Value, context: &NormalizeContext) -> WebhookPayload {
    let event: StripeEvent = decode("stripe", raw);
    let object = event.data.object;

    let mut metadata = context.base_metadata();
    metadata.insert("stripe_event_id".into(), opt_string(&event.id));

    WebhookPayload {
        service: WebhookSource::Stripe.name().to_string(),
        event_type: event.kind.unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
        transaction_id: object.id,
        merchant_order_id: object.metadata.merchant_order_id,
        status: object.status.map(|s| map_stripe_status(&s)),
        amount: object.amount.map(minor_to_major),
        currency: Some(
            object
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
        ),
        timestamp: object
            .created
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now),
        metadata,
        raw_payload: raw.clone(),
        payment_method: None,
    }
}

// ========== Midtrans ==========

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MidtransNotification {
    #[serde(deserialize_with = "lenient_string")]
    transaction_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    order_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    transaction_status: Option<String>,
    #[serde(deserialize_with = "lenient_decimal")]
    gross_amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient_string")]
    transaction_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    payment_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    fraud_status: Option<String>,
}

/// Midtrans status table
pub fn map_midtrans_status(raw: &str) -> PaymentStatus {
    match raw {
        "capture" | "settlement" => PaymentStatus::Completed,
        "pending" => PaymentStatus::Pending,
        "deny" | "cancel" | "expire" => PaymentStatus::Failed,
        "refund" => PaymentStatus::Refunded,
        "partial_refund" => PaymentStatus::PartialRefund,
        other => PaymentStatus::Other(other.to_string()),
    }
}

/// Normalize a Midtrans notification
pub fn from_midtrans(raw: &Value, context: &NormalizeContext) -> WebhookPayload {
    let body: MidtransNotification = decode("midtrans", raw);

    let mut metadata = context.base_metadata();
    metadata.insert("payment_type".into(), opt_string(&body.payment_type));
    metadata.insert("fraud_status".into(), opt_string(&body.fraud_status));

    WebhookPayload {
        service: WebhookSource::Midtrans.name().to_string(),
        event_type: DEFAULT_EVENT_TYPE.to_string(),
        transaction_id: body.transaction_id,
        merchant_order_id: body.order_id,
        status: body.transaction_status.map(|s| map_midtrans_status(&s)),
        amount: body.gross_amount,
        currency: Some("IDR".to_string()),
        timestamp: body
            .transaction_time
            .and_then(|t| parse_timestamp(&t))
            .unwrap_or_else(Utc::now),
        metadata,
        raw_payload: raw.clone(),
        payment_method: body.payment_type,
    }
}

// ========== Generic ==========

fn string_at(raw: &Value, path: &str) -> Option<String> {
    match lookup(raw, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize a body from any other service with common field names
pub fn from_generic(service: &str, raw: &Value, context: &NormalizeContext) -> WebhookPayload {
    WebhookPayload {
        service: service.to_string(),
        event_type: string_at(raw, "event_type").unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
        transaction_id: string_at(raw, "transaction_id").or_else(|| string_at(raw, "id")),
        merchant_order_id: string_at(raw, "merchant_order_id")
            .or_else(|| string_at(raw, "order_id")),
        status: string_at(raw, "status")
            .or_else(|| string_at(raw, "transaction_status"))
            .map(|s| PaymentStatus::parse(&s)),
        amount: lookup(raw, "amount").and_then(decimal_from_json),
        currency: Some(string_at(raw, "currency").unwrap_or_else(|| "IDR".to_string())),
        timestamp: string_at(raw, "timestamp")
            .and_then(|t| parse_timestamp(&t))
            .unwrap_or_else(Utc::now),
        metadata: context.base_metadata(),
        raw_payload: raw.clone(),
        payment_method: None,
    }
}

/// Dispatch to the mapping for `source`
pub fn normalize(source: &WebhookSource, raw: &Value, context: &NormalizeContext) -> WebhookPayload {
    match source {
        WebhookSource::FinPay => from_finpay(raw, context),
        WebhookSource::Stripe => from_stripe(raw, context),
        WebhookSource::Midtrans => from_midtrans(raw, context),
        WebhookSource::Generic(name) => from_generic(name, raw, context),
    }
}
