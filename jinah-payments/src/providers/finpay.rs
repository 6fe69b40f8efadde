//! FinPay payment gateway
//!
//! Card/VA/QRIS gateway authenticated with HTTP Basic over the merchant's
//! client id and secret.

use crate::config::JinahConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::money::to_wire_amount;
use crate::normalize::{NormalizeContext, from_finpay, parse_timestamp};
use crate::provider::{ClientSettings, PaymentProvider, ProviderClient, ProviderReply, RetryPolicy};
use crate::qr::qr_data_uri;
use crate::types::{ContentType, PaymentChannel, PaymentRequest, PaymentResponse, PaymentStatus};
use crate::webhook::{WebhookPayload, lookup};
use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{info, warn};

const INITIATE_PATH: &str = "/pg/payment/card/initiate";
const CHECK_PATH: &str = "/pg/payment/card/check";
const PHONE_PAD_WIDTH: usize = 10;

/// FinPay provider
pub struct FinPayProvider {
    name: String,
    display_name: String,
    client: ProviderClient,
    callback_url: String,
    return_url: Option<String>,
}

impl FinPayProvider {
    /// Create a provider around an existing client
    pub fn new(name: impl Into<String>, client: ProviderClient, callback_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: "FinPay".to_string(),
            client,
            callback_url: callback_url.into(),
            return_url: None,
        }
    }

    /// Build from the `services.<name>` section
    pub fn from_config(name: &str, config: &JinahConfig) -> PaymentResult<Self> {
        let section = config.service(name)?;
        let not_configured =
            |what: &str| PaymentError::Configuration(format!("FinPay {} is not configured", what));

        let base_url = section
            .base_url(config.environment)
            .ok_or_else(|| not_configured("base URL"))?;
        let client_id = section
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| not_configured("client_id"))?;
        let client_secret = section
            .client_secret
            .as_ref()
            .ok_or_else(|| not_configured("client_secret"))?;

        let settings = ClientSettings {
            connect_timeout: Duration::from_secs(section.connect_timeout),
            timeout: Duration::from_secs(section.timeout),
            verify_ssl: section.verify_ssl,
            retry: RetryPolicy::linear(
                section.retry_attempts,
                Duration::from_millis(section.retry_delay_ms),
            ),
            log_bodies: config.logging.enabled,
        };
        let client = ProviderClient::new(
            base_url,
            client_id,
            SecretString::new(client_secret.expose_secret().into()),
            settings,
        )?;

        let callback_url = config.payment.callback_url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}/{}",
                config.app_url.trim_end_matches('/'),
                config.webhook.route_prefix.trim_matches('/'),
                name
            )
        });

        let mut provider = Self::new(name, client, callback_url);
        if let Some(display_name) = &section.name {
            provider.display_name = display_name.clone();
        }
        provider.return_url = config.payment.return_url.clone();
        Ok(provider)
    }

    /// Request body for an initiate call
    pub fn build_payload(&self, request: &PaymentRequest, channel: Option<&PaymentChannel>) -> PaymentResult<Value> {
        let amount = to_wire_amount(request.amount);
        let (first_name, last_name) = split_name(request.customer.name.as_deref());
        let return_url = request.return_url.clone().or_else(|| self.return_url.clone());
        let failure_url = request.cancel_url.clone().or_else(|| return_url.clone());

        let mut order = Map::new();
        order.insert("id".into(), json!(request.order_id));
        order.insert("amount".into(), json!(amount));
        order.insert("description".into(), json!(request.description));

        let mut items: Vec<Value> = request
            .items
            .iter()
            .map(|item| {
                let mut entry = Map::new();
                entry.insert("name".into(), json!(item.name));
                entry.insert("quantity".into(), json!(item.quantity));
                entry.insert("unitPrice".into(), json!(to_wire_amount(item.price)));
                for (key, value) in [
                    ("sku", &item.sku),
                    ("brand", &item.brand),
                    ("category", &item.category),
                    ("description", &item.description),
                ] {
                    if let Some(value) = value {
                        entry.insert(key.into(), json!(value));
                    }
                }
                Value::Object(entry)
            })
            .collect();
        if !items.is_empty() {
            order.insert("itemAmount".into(), json!(amount));
        }

        let fee = to_wire_amount(request.admin_fee_value()?);
        if fee > 0 {
            let total = amount.checked_add(fee).ok_or_else(|| {
                PaymentError::Validation("Payable amount is out of range".to_string())
            })?;
            order.insert("amount".into(), json!(total));
            order.insert("itemAmount".into(), json!(total));
            items.push(json!({
                "name": request.admin_fee_label(),
                "quantity": 1,
                "unitPrice": fee,
            }));
        }
        if !items.is_empty() {
            order.insert("item".into(), Value::Array(items));
        }

        let mut payload = json!({
            "order": order,
            "url": {
                "callbackUrl": request.callback_url.clone().unwrap_or_else(|| self.callback_url.clone()),
                "successUrl": return_url,
                "failureUrl": failure_url,
                "backUrl": return_url,
            },
            "customer": {
                "firstName": first_name,
                "lastName": last_name,
                "email": request.customer.email,
                "mobilePhone": normalize_phone(request.customer.phone.as_deref()),
            },
        });
        if let (Some(channel), Value::Object(map)) = (channel, &mut payload) {
            map.insert("sourceOfFunds".into(), json!({ "type": channel.code }));
        }
        Ok(payload)
    }

    async fn send_initiate(
        &self,
        request: &PaymentRequest,
        channel: Option<&PaymentChannel>,
    ) -> PaymentResult<PaymentResponse> {
        request.validate()?;
        info!(
            service = %self.name,
            order_id = %request.order_id,
            channel = channel.map(|c| c.code.as_str()),
            "Initiating payment"
        );

        let payable = request.payable_amount()?;
        let payload = self.build_payload(request, channel)?;
        let reply = self.client.post(INITIATE_PATH, &payload).await;
        Ok(self.parse_initiate(request, payable, reply, channel))
    }

    fn parse_initiate(
        &self,
        request: &PaymentRequest,
        payable: Decimal,
        reply: ProviderReply,
        channel: Option<&PaymentChannel>,
    ) -> PaymentResponse {
        if reply.is_transport_failure() {
            let error = reply.error.unwrap_or_default();
            return PaymentResponse::failed(
                &self.name,
                format!("FinPay request failed: {}", error),
                Some("transport_error".to_string()),
                reply.body,
            );
        }

        let body = reply.body;
        let code = string_field(&body, &["responseCode"]);
        if !code.as_deref().is_some_and(|c| c.starts_with('2')) {
            let message = string_field(&body, &["responseMessage"])
                .unwrap_or_else(|| "Payment initiation failed".to_string());
            warn!(service = %self.name, order_id = %request.order_id, code = ?code, %message, "Payment rejected");
            return PaymentResponse::failed(&self.name, message, code, body)
                .ids(&request.order_id, &request.order_id);
        }

        let mut response = PaymentResponse::success(&self.name)
            .ids(&request.order_id, &request.order_id)
            .status(PaymentStatus::Pending)
            .amount(payable, request.currency.code());

        if let Some(message) = string_field(&body, &["responseMessage"]) {
            response = response.message(message);
        }
        if let Some(url) = string_field(&body, &["redirectUrl", "redirecturl"]) {
            response = response.redirect_url(url);
        }
        if let Some(expiry) = string_field(&body, &["expiryTime"]).and_then(|t| parse_timestamp(&t)) {
            response = response.expiry_time(expiry);
        }

        if let Some(channel) = channel {
            response = self.attach_content(response, channel, &body);
        }
        response.raw(body)
    }

    fn attach_content(&self, response: PaymentResponse, channel: &PaymentChannel, body: &Value) -> PaymentResponse {
        match channel.content_type() {
            Some(ContentType::Va) => {
                match string_field(body, &["paymentCode", "vaNumber", "data.paymentCode"]) {
                    Some(code) => response.content(ContentType::Va, code),
                    None => response,
                }
            }
            Some(ContentType::Qr) => {
                let Some(qr) = string_field(body, &["stringQr", "qrString", "qrCode", "data.stringQr"])
                else {
                    return response;
                };
                match qr_data_uri(&qr) {
                    Ok(uri) => response.content(ContentType::Qr, uri),
                    Err(e) => {
                        warn!(service = %self.name, error = %e, "Could not render QR content");
                        response
                    }
                }
            }
            Some(ContentType::Cc) => match response.redirect_url.clone() {
                Some(url) => response.content(ContentType::Cc, url),
                None => response,
            },
            None => response,
        }
    }
}

#[async_trait]
impl PaymentProvider for FinPayProvider {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn initiate(&self, request: &PaymentRequest) -> PaymentResult<PaymentResponse> {
        self.send_initiate(request, None).await
    }

    async fn initiate_channel(
        &self,
        request: &PaymentRequest,
        channel: &PaymentChannel,
    ) -> PaymentResult<PaymentResponse> {
        self.send_initiate(request, Some(channel)).await
    }

    async fn check(&self, order_id: &str) -> PaymentResult<WebhookPayload> {
        if order_id.trim().is_empty() {
            return Err(PaymentError::missing_field("order_id"));
        }

        let path = format!("{}/{}", CHECK_PATH, encode_segment(order_id));
        let reply = self.client.get(&path).await;

        let data = reply.body.get("data").cloned().unwrap_or(Value::Null);
        let mut payload = from_finpay(&data, &NormalizeContext::default());
        if payload.merchant_order_id.is_none() {
            payload.merchant_order_id = Some(order_id.to_string());
        }
        if let Some(error) = reply.error {
            payload.metadata.insert("transport_error".into(), json!(error));
        }
        for (key, field) in [("response_code", "responseCode"), ("response_message", "responseMessage")] {
            if let Some(value) = reply.body.get(field) {
                payload.metadata.insert(key.into(), value.clone());
            }
        }
        Ok(payload)
    }
}

/// First string (or number) among `paths`
fn string_field(body: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| match lookup(body, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Split on the first space; the last name repeats the first when absent
pub fn split_name(name: Option<&str>) -> (String, String) {
    let name = name.unwrap_or_default();
    match name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (name.to_string(), name.to_string()),
    }
}

/// Normalize a phone number the way FinPay expects it.
///
/// A leading `0` becomes `+62`, the result is right-padded with `0` to ten
/// characters, then `+` is prepended if still missing. Short numbers without
/// a country code come out padded, e.g. `12345` becomes `+1234500000`.
pub fn normalize_phone(phone: Option<&str>) -> String {
    let raw = phone.unwrap_or("0");
    let mut phone = match raw.strip_prefix('0') {
        Some(rest) => format!("+62{}", rest),
        None => raw.to_string(),
    };
    if phone.len() < PHONE_PAD_WIDTH {
        phone.push_str(&"0".repeat(PHONE_PAD_WIDTH - phone.len()));
    }
    if !phone.starts_with('+') {
        phone.insert(0, '+');
    }
    phone
}
