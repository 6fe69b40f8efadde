//! Webhook signature schemes
//!
//! | Scheme  | Services          | Input                                         |
//! |---------|-------------------|-----------------------------------------------|
//! | FinPay  | `finpay`          | HMAC-SHA512 over the payload minus `signature` |
//! | Stripe  | `stripe`          | HMAC-SHA256 over `t.body`, 5 minute tolerance |
//! | Midtrans| `midtrans`        | SHA512 over order id, status code, amount, key |
//! | Generic | everything else   | HMAC-SHA256/SHA1/MD5 over the raw body        |
//!
//! The FinPay signer hashes PHP's `json_encode` output, so the payload is
//! re-encoded with PHP escaping rules and the sender's key order. Any
//! difference in formatting on the sender side breaks verification.

use crate::{Result, WebhookError};
use hmac::{Hmac, Mac};
use md5::Md5;
use serde_json::Value;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt::Write;
use subtle::ConstantTimeEq;

/// Maximum age of a Stripe signature timestamp, in seconds
pub const STRIPE_TOLERANCE_SECS: i64 = 300;

/// Signature header sent by Stripe
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Verification scheme for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    FinPay,
    Stripe,
    Midtrans,
    Generic,
}

impl SignatureScheme {
    pub fn for_service(service: &str) -> Self {
        match service.to_ascii_lowercase().as_str() {
            "finpay" => Self::FinPay,
            "stripe" => Self::Stripe,
            "midtrans" => Self::Midtrans,
            _ => Self::Generic,
        }
    }
}

/// HMAC algorithms tried by the generic scheme, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Sha256,
    Sha1,
    Md5,
    Sha512,
}

impl HmacAlgorithm {
    pub const GENERIC: [HmacAlgorithm; 3] = [Self::Sha256, Self::Sha1, Self::Md5];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
            Self::Sha512 => "sha512",
        }
    }
}

macro_rules! hmac_hex {
    ($digest:ty, $key:expr, $data:expr) => {{
        let mut mac = <Hmac<$digest> as Mac>::new_from_slice($key)
            .map_err(|e| WebhookError::SignatureInvalid(format!("Invalid HMAC key: {}", e)))?;
        mac.update($data);
        hex::encode(mac.finalize().into_bytes())
    }};
}

/// Hex-encoded HMAC of `data`
pub fn hmac_hex(algorithm: HmacAlgorithm, secret: &[u8], data: &[u8]) -> Result<String> {
    Ok(match algorithm {
        HmacAlgorithm::Sha256 => hmac_hex!(Sha256, secret, data),
        HmacAlgorithm::Sha1 => hmac_hex!(Sha1, secret, data),
        HmacAlgorithm::Md5 => hmac_hex!(Md5, secret, data),
        HmacAlgorithm::Sha512 => hmac_hex!(Sha512, secret, data),
    })
}

/// Hex-encoded plain SHA512
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

/// Constant-time string comparison
pub fn secure_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

// ============================================================================
// FinPay
// ============================================================================

/// Encode a JSON value the way PHP's `json_encode` does with default flags
///
/// Slashes are escaped, non-ASCII characters become `\uXXXX` escapes and
/// empty objects encode as `[]`.
pub fn php_json_encode(value: &Value) -> String {
    let mut out = String::new();
    write_php_json(&mut out, value);
    out
}

fn write_php_json(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_php_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_php_json(out, item);
            }
            out.push(']');
        }
        Value::Object(map) if map.is_empty() => out.push_str("[]"),
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_php_string(out, key);
                out.push(':');
                write_php_json(out, item);
            }
            out.push('}');
        }
    }
}

fn write_php_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// FinPay signature for a payload, ignoring any `signature` field
pub fn finpay_signature(payload: &Value, secret: &str) -> Result<String> {
    let Value::Object(map) = payload else {
        return Err(WebhookError::SignatureInvalid(
            "FinPay payload is not an object".to_string(),
        ));
    };
    let mut fields = map.clone();
    fields.shift_remove("signature");
    let encoded = php_json_encode(&Value::Object(fields));
    hmac_hex(HmacAlgorithm::Sha512, secret.as_bytes(), encoded.as_bytes())
}

/// Verify the `signature` field of a FinPay notification
pub fn verify_finpay(payload: &Value, secret: &str) -> Result<()> {
    if payload.as_object().is_none_or(|map| map.is_empty()) {
        return Err(WebhookError::SignatureInvalid(
            "Empty FinPay payload".to_string(),
        ));
    }
    let received = payload
        .get("signature")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::SignatureMissing)?;

    let expected = finpay_signature(payload, secret)?;
    if secure_compare(&expected, received) {
        Ok(())
    } else {
        Err(WebhookError::SignatureInvalid(
            "FinPay signature mismatch".to_string(),
        ))
    }
}

// ============================================================================
// Stripe
// ============================================================================

/// Parsed `Stripe-Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeSignatureHeader {
    pub timestamp: String,
    pub signatures: Vec<String>,
}

impl StripeSignatureHeader {
    /// Parse `t=<ts>,v1=<hex>[,v1=<hex>...]`
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", t)) => timestamp = Some(t.to_string()),
                Some(("v1", v)) => signatures.push(v.to_string()),
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self {
                timestamp,
                signatures,
            }),
            _ => Err(WebhookError::SignatureInvalid(
                "Missing timestamp or signature".to_string(),
            )),
        }
    }
}

/// Build a `Stripe-Signature` header value
pub fn stripe_signature(body: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let signature = hmac_hex(
        HmacAlgorithm::Sha256,
        secret.as_bytes(),
        &stripe_signed_payload(&timestamp.to_string(), body),
    )?;
    Ok(format!("t={},v1={}", timestamp, signature))
}

fn stripe_signed_payload(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut signed = Vec::with_capacity(timestamp.len() + 1 + body.len());
    signed.extend_from_slice(timestamp.as_bytes());
    signed.push(b'.');
    signed.extend_from_slice(body);
    signed
}

/// Verify a `Stripe-Signature` header against the raw body at time `now`
pub fn verify_stripe(body: &[u8], header: &str, secret: &str, now: i64) -> Result<()> {
    let parsed = StripeSignatureHeader::parse(header)?;

    let timestamp: i64 = parsed
        .timestamp
        .parse()
        .map_err(|_| WebhookError::TimestampInvalid("Invalid timestamp format".to_string()))?;
    let age = (now - timestamp).abs();
    if age > STRIPE_TOLERANCE_SECS {
        return Err(WebhookError::TimestampInvalid(format!(
            "Timestamp outside tolerance: {} seconds (tolerance: {} seconds)",
            age, STRIPE_TOLERANCE_SECS
        )));
    }

    let expected = hmac_hex(
        HmacAlgorithm::Sha256,
        secret.as_bytes(),
        &stripe_signed_payload(&parsed.timestamp, body),
    )?;
    if parsed
        .signatures
        .iter()
        .any(|candidate| secure_compare(&expected, candidate))
    {
        Ok(())
    } else {
        Err(WebhookError::SignatureInvalid(
            "Stripe signature mismatch".to_string(),
        ))
    }
}

// ============================================================================
// Midtrans
// ============================================================================

/// `SHA512(order_id + status_code + gross_amount + server_key)`
pub fn midtrans_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let input = format!("{}{}{}{}", order_id, status_code, gross_amount, server_key);
    sha512_hex(input.as_bytes())
}

fn field_text(payload: &Value, key: &str) -> String {
    match payload.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Verify the `signature_key` field of a Midtrans notification
pub fn verify_midtrans(payload: &Value, server_key: &str) -> Result<()> {
    let received = payload
        .get("signature_key")
        .and_then(Value::as_str)
        .ok_or(WebhookError::SignatureMissing)?;

    let expected = midtrans_signature(
        &field_text(payload, "order_id"),
        &field_text(payload, "status_code"),
        &field_text(payload, "gross_amount"),
        server_key,
    );
    if secure_compare(&expected, received) {
        Ok(())
    } else {
        Err(WebhookError::SignatureInvalid(
            "Midtrans signature mismatch".to_string(),
        ))
    }
}

// ============================================================================
// Generic
// ============================================================================

/// Header names searched for a generic signature, in order
pub fn generic_signature_headers(service: &str) -> [String; 4] {
    [
        "x-signature".to_string(),
        "x-hub-signature".to_string(),
        format!("x-{}-signature", service.to_ascii_lowercase()),
        "signature".to_string(),
    ]
}

fn strip_prefixes(signature: &str, algorithm: HmacAlgorithm) -> String {
    let name = algorithm.name();
    [
        format!("{}=", name),
        format!("hmac-{}=", name),
        "sha256=".to_string(),
        "sha1=".to_string(),
    ]
    .iter()
    .fold(signature.to_string(), |acc, prefix| acc.replace(prefix.as_str(), ""))
}

/// Verify a raw-body HMAC trying SHA256, SHA1 and MD5
pub fn verify_generic(body: &[u8], signature: &str, secret: &str) -> Result<HmacAlgorithm> {
    for algorithm in HmacAlgorithm::GENERIC {
        let expected = hmac_hex(algorithm, secret.as_bytes(), body)?;
        if secure_compare(&expected, &strip_prefixes(signature, algorithm)) {
            return Ok(algorithm);
        }
    }
    Err(WebhookError::SignatureInvalid(
        "No supported algorithm matched".to_string(),
    ))
}
