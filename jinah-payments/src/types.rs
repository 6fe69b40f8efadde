//! Payment types and data structures

use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, format_decimal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Longest merchant order id providers accept
pub const MAX_ORDER_ID_LEN: usize = 100;

const PENDING_STATUSES: &[&str] = &["pending", "waiting", "processing"];
const COMPLETED_STATUSES: &[&str] = &["completed", "success", "paid"];
const FAILED_STATUSES: &[&str] = &["failed", "cancelled", "expired"];

/// Case-insensitive membership in a status vocabulary
pub(crate) fn status_in(status: &str, set: &[&str]) -> bool {
    let status = status.to_lowercase();
    set.iter().any(|s| *s == status)
}

/// Canonical payment status
///
/// Values a provider table does not recognize are carried verbatim in
/// [`PaymentStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Processing,
    Failed,
    Cancelled,
    Refunded,
    PartialRefund,
    Other(String),
}

impl PaymentStatus {
    /// Canonical string form
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::PartialRefund => "partial_refund",
            Self::Other(raw) => raw,
        }
    }

    /// Parse a canonical name; anything else becomes `Other`
    pub fn parse(value: &str) -> Self {
        match value {
            "completed" => Self::Completed,
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "partial_refund" => Self::PartialRefund,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this value came from outside the canonical vocabulary
    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer contact details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerDetails {
    /// Overlay non-empty fields from `other`
    pub fn merge(&mut self, other: CustomerDetails) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.email.is_some() {
            self.email = other.email;
        }
        if other.phone.is_some() {
            self.phone = other.phone;
        }
    }
}

/// Line item on a payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentItem {
    pub name: String,
    pub quantity: u32,
    /// Unit price
    pub price: Decimal,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub sku: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl PaymentItem {
    /// Create an item
    pub fn new(name: impl Into<String>, quantity: u32, price: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
            discount: None,
            tax: None,
            sku: None,
            brand: None,
            category: None,
            description: None,
        }
    }

    /// With SKU
    pub fn sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    /// With brand
    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// With category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// With description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With discount
    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    /// With tax
    pub fn tax(mut self, tax: Decimal) -> Self {
        self.tax = Some(tax);
        self
    }

    /// Quantity times unit price; `None` when out of range
    pub fn total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Merchant charge request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    #[serde(default)]
    pub customer: CustomerDetails,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
    /// Flat admin fee
    pub admin_fee: Option<Decimal>,
    /// Admin fee as a percentage of `amount`
    pub admin_fee_percentage: Option<Decimal>,
    pub callback_url: Option<String>,
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub items: Vec<PaymentItem>,
}

impl PaymentRequest {
    /// Create a request in the default currency
    pub fn new(order_id: impl Into<String>, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            amount,
            currency: Currency::default(),
            description: description.into(),
            customer: CustomerDetails::default(),
            discount: None,
            tax: None,
            admin_fee: None,
            admin_fee_percentage: None,
            callback_url: None,
            return_url: None,
            cancel_url: None,
            items: Vec::new(),
        }
    }

    /// With currency
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// With currency parsed from a code
    pub fn currency_code(self, code: &str) -> PaymentResult<Self> {
        Ok(self.currency(Currency::from_code(code)?))
    }

    /// With customer name
    pub fn customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer.name = Some(name.into());
        self
    }

    /// With customer email
    pub fn customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer.email = Some(email.into());
        self
    }

    /// With customer phone
    pub fn customer_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer.phone = Some(phone.into());
        self
    }

    /// With discount
    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    /// With tax
    pub fn tax(mut self, tax: Decimal) -> Self {
        self.tax = Some(tax);
        self
    }

    /// With flat admin fee
    pub fn admin_fee(mut self, fee: Decimal) -> Self {
        self.admin_fee = Some(fee);
        self
    }

    /// With percentage admin fee
    pub fn admin_fee_percentage(mut self, percentage: Decimal) -> Self {
        self.admin_fee_percentage = Some(percentage);
        self
    }

    /// With callback URL
    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    /// With return URL
    pub fn return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    /// With cancel URL
    pub fn cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = Some(url.into());
        self
    }

    /// Add a line item
    pub fn item(mut self, item: PaymentItem) -> Self {
        self.items.push(item);
        self
    }

    /// Check the request before it reaches any provider
    pub fn validate(&self) -> PaymentResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(PaymentError::Validation(format!(
                "Invalid amount: {}. Amount must be greater than 0",
                self.amount
            )));
        }

        let order_id = self.order_id.trim();
        if order_id.is_empty() {
            return Err(PaymentError::missing_field("order_id"));
        }
        if order_id.chars().count() > MAX_ORDER_ID_LEN {
            return Err(PaymentError::Validation(format!(
                "Order ID too long (max {} characters)",
                MAX_ORDER_ID_LEN
            )));
        }

        for item in &self.items {
            if item.quantity == 0 {
                return Err(PaymentError::Validation(format!(
                    "Item '{}' must have a positive quantity",
                    item.name
                )));
            }
            if item.price < Decimal::ZERO {
                return Err(PaymentError::Validation(format!(
                    "Item '{}' has a negative unit price",
                    item.name
                )));
            }
            if item.total().is_none() {
                return Err(PaymentError::Validation(format!(
                    "Item '{}' total is out of range",
                    item.name
                )));
            }
        }

        self.payable_amount()?;
        Ok(())
    }

    /// `amount * percentage / 100 + flat`
    pub fn admin_fee_value(&self) -> PaymentResult<Decimal> {
        let percentage = self.admin_fee_percentage.unwrap_or_default();
        let flat = self.admin_fee.unwrap_or_default();
        self.amount
            .checked_mul(percentage / Decimal::ONE_HUNDRED)
            .and_then(|fee| fee.checked_add(flat))
            .ok_or_else(|| PaymentError::Validation("Admin fee is out of range".to_string()))
    }

    /// Label for the synthesized admin fee line, e.g. `Admin Fee (2%+1500)`
    pub fn admin_fee_label(&self) -> String {
        let mut parts = Vec::new();
        if let Some(percentage) = self.admin_fee_percentage.filter(|p| !p.is_zero()) {
            parts.push(format!("{}%", format_decimal(percentage)));
        }
        if let Some(flat) = self.admin_fee.filter(|f| !f.is_zero()) {
            parts.push(format_decimal(flat));
        }
        format!("Admin Fee ({})", parts.join("+"))
    }

    /// Amount including the admin fee
    pub fn payable_amount(&self) -> PaymentResult<Decimal> {
        self.amount
            .checked_add(self.admin_fee_value()?)
            .ok_or_else(|| PaymentError::Validation("Payable amount is out of range".to_string()))
    }
}

/// Kind of rendered payment content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    /// Virtual account number
    #[serde(alias = "va")]
    Va,
    /// QR image data URI
    #[serde(alias = "qr")]
    Qr,
    /// Iframe-embeddable card form URL
    #[serde(alias = "cc")]
    Cc,
}

/// Rendered payment content for a channel charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentContent {
    pub content_type: ContentType,
    pub value: String,
}

/// Payment channel addressed by a channel charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentChannel {
    /// Channel code understood by the handling provider, e.g. `vabca`
    pub code: String,
    /// Rendering kind; inferred from `code` when absent
    pub kind: Option<ContentType>,
}

impl PaymentChannel {
    /// Channel with an inferred kind
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: None,
        }
    }

    /// Channel with an explicit kind
    pub fn with_kind(code: impl Into<String>, kind: ContentType) -> Self {
        Self {
            code: code.into(),
            kind: Some(kind),
        }
    }

    /// Explicit kind, else inferred: `va*` is VA, `*qr*` is QR, `cc` is CC
    pub fn content_type(&self) -> Option<ContentType> {
        if self.kind.is_some() {
            return self.kind;
        }
        let code = self.code.to_lowercase();
        if code.starts_with("va") {
            Some(ContentType::Va)
        } else if code.contains("qr") {
            Some(ContentType::Qr)
        } else if code == "cc" || code == "credit_card" {
            Some(ContentType::Cc)
        } else {
            None
        }
    }
}

impl From<&str> for PaymentChannel {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Canonical result of a charge, inquiry or cancel call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub success: bool,
    /// Service that produced the response
    pub via: Option<String>,
    pub transaction_id: Option<String>,
    pub merchant_order_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_url: Option<String>,
    pub redirect_url: Option<String>,
    pub content: Option<PaymentContent>,
    pub message: Option<String>,
    pub error_code: Option<String>,
    pub expiry_time: Option<DateTime<Utc>>,
    /// Raw provider response kept for audit
    pub raw_response: Value,
}

impl PaymentResponse {
    fn empty(success: bool, via: impl Into<String>) -> Self {
        Self {
            success,
            via: Some(via.into()),
            transaction_id: None,
            merchant_order_id: None,
            status: None,
            amount: None,
            currency: None,
            payment_url: None,
            redirect_url: None,
            content: None,
            message: None,
            error_code: None,
            expiry_time: None,
            raw_response: Value::Object(Default::default()),
        }
    }

    /// Successful response from `via`
    pub fn success(via: impl Into<String>) -> Self {
        Self::empty(true, via)
    }

    /// Failed response from `via`
    pub fn failed(
        via: impl Into<String>,
        message: impl Into<String>,
        error_code: Option<String>,
        raw_response: Value,
    ) -> Self {
        let mut response = Self::empty(false, via);
        response.status = Some(PaymentStatus::Failed);
        response.message = Some(message.into());
        response.error_code = error_code;
        response.raw_response = raw_response;
        response
    }

    /// Set transaction and merchant order ids
    pub fn ids(mut self, transaction_id: impl Into<String>, merchant_order_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self.merchant_order_id = Some(merchant_order_id.into());
        self
    }

    /// Set status
    pub fn status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set amount and currency
    pub fn amount(mut self, amount: Decimal, currency: impl Into<String>) -> Self {
        self.amount = Some(amount);
        self.currency = Some(currency.into());
        self
    }

    /// Set redirect URL
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Set rendered content
    pub fn content(mut self, content_type: ContentType, value: impl Into<String>) -> Self {
        self.content = Some(PaymentContent {
            content_type,
            value: value.into(),
        });
        self
    }

    /// Set message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set expiry
    pub fn expiry_time(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_time = Some(expiry);
        self
    }

    /// Set raw response
    pub fn raw(mut self, raw: Value) -> Self {
        self.raw_response = raw;
        self
    }

    /// Pending, waiting or processing
    pub fn is_pending(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| status_in(s.as_str(), PENDING_STATUSES))
    }

    /// Completed, success or paid
    pub fn is_completed(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| status_in(s.as_str(), COMPLETED_STATUSES))
    }

    /// Failed, cancelled or expired
    pub fn is_failed(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| status_in(s.as_str(), FAILED_STATUSES))
    }
}

/// Status query key; exactly one id is populated by construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "id", rename_all = "snake_case")]
pub enum TransactionInquiry {
    TransactionId(String),
    MerchantOrderId(String),
}

impl TransactionInquiry {
    /// Inquire by provider transaction id
    pub fn by_transaction_id(id: impl Into<String>) -> PaymentResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PaymentError::missing_field("transaction_id"));
        }
        Ok(Self::TransactionId(id))
    }

    /// Inquire by merchant order id
    pub fn by_merchant_order_id(id: impl Into<String>) -> PaymentResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PaymentError::missing_field("merchant_order_id"));
        }
        Ok(Self::MerchantOrderId(id))
    }

    /// The populated id
    pub fn id(&self) -> &str {
        match self {
            Self::TransactionId(id) | Self::MerchantOrderId(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: i64) -> PaymentRequest {
        PaymentRequest::new("ORDER-1", Decimal::from(amount), "Test order")
    }

    #[test]
    fn test_valid_request_passes() {
        for currency in Currency::ALL {
            assert!(request(10000).currency(currency).validate().is_ok());
        }
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(matches!(
            request(0).validate(),
            Err(PaymentError::Validation(_))
        ));
        assert!(matches!(
            request(-5).validate(),
            Err(PaymentError::Validation(_))
        ));
    }

    #[test]
    fn test_currency_outside_allow_list_rejected() {
        assert!(matches!(
            request(100).currency_code("JPY"),
            Err(PaymentError::Validation(_))
        ));
        assert_eq!(
            request(100).currency_code("sgd").unwrap().currency,
            Currency::SGD
        );
    }

    #[test]
    fn test_order_id_rules() {
        let mut req = request(100);
        req.order_id = "  ".to_string();
        assert!(req.validate().is_err());

        req.order_id = "x".repeat(MAX_ORDER_ID_LEN);
        assert!(req.validate().is_ok());

        req.order_id = "x".repeat(MAX_ORDER_ID_LEN + 1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_item_quantity_must_be_positive() {
        let req = request(100).item(PaymentItem::new("Widget", 0, Decimal::from(10)));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_admin_fee_combined() {
        let req = request(100000)
            .admin_fee_percentage(Decimal::from(2))
            .admin_fee(Decimal::from(1500));

        assert_eq!(req.admin_fee_value().unwrap(), Decimal::from(3500));
        assert_eq!(req.admin_fee_label(), "Admin Fee (2%+1500)");
        assert_eq!(req.payable_amount().unwrap(), Decimal::from(103500));
    }

    #[test]
    fn test_admin_fee_single_component_labels() {
        let pct = request(1000).admin_fee_percentage(Decimal::new(25, 1));
        assert_eq!(pct.admin_fee_label(), "Admin Fee (2.5%)");
        assert_eq!(pct.admin_fee_value().unwrap(), Decimal::from(25));

        let flat = request(1000).admin_fee(Decimal::from(500));
        assert_eq!(flat.admin_fee_label(), "Admin Fee (500)");
    }

    #[test]
    fn test_no_admin_fee() {
        let req = request(1000);
        assert!(req.admin_fee_value().unwrap().is_zero());
        assert_eq!(req.payable_amount().unwrap(), Decimal::from(1000));
    }

    #[test]
    fn test_admin_fee_overflow_is_rejected() {
        let req = PaymentRequest::new("ORD-1", Decimal::MAX, "Huge")
            .admin_fee_percentage(Decimal::from(200));
        assert!(matches!(req.admin_fee_value(), Err(PaymentError::Validation(_))));
        assert!(matches!(req.payable_amount(), Err(PaymentError::Validation(_))));
        assert!(matches!(req.validate(), Err(PaymentError::Validation(_))));

        let flat = PaymentRequest::new("ORD-2", Decimal::MAX, "Huge").admin_fee(Decimal::ONE);
        assert!(matches!(flat.validate(), Err(PaymentError::Validation(_))));
    }

    #[test]
    fn test_item_total() {
        let item = PaymentItem::new("Coffee", 3, Decimal::new(125, 1));
        assert_eq!(item.total(), Some(Decimal::new(375, 1)));

        let huge = PaymentItem::new("Yacht", 2, Decimal::MAX);
        assert!(huge.total().is_none());
        assert!(request(100).item(huge).validate().is_err());
    }

    #[test]
    fn test_status_roundtrip_and_passthrough() {
        assert_eq!(PaymentStatus::parse("partial_refund"), PaymentStatus::PartialRefund);
        let other = PaymentStatus::parse("ON_HOLD");
        assert_eq!(other, PaymentStatus::Other("ON_HOLD".to_string()));
        assert!(other.is_passthrough());

        let json = serde_json::to_string(&PaymentStatus::Refunded).unwrap();
        assert_eq!(json, "\"refunded\"");
    }

    #[test]
    fn test_response_predicates_case_insensitive() {
        let paid = PaymentResponse::success("finpay").status(PaymentStatus::Other("PAID".into()));
        assert!(paid.is_completed());
        assert!(!paid.is_pending());

        let waiting = PaymentResponse::success("finpay").status(PaymentStatus::Other("Waiting".into()));
        assert!(waiting.is_pending());

        let failed = PaymentResponse::failed("finpay", "boom", None, Value::Null);
        assert!(failed.is_failed());
        assert!(!failed.success);
    }

    #[test]
    fn test_response_without_status_matches_nothing() {
        let response = PaymentResponse::success("jinah");
        assert!(!response.is_pending());
        assert!(!response.is_completed());
        assert!(!response.is_failed());
    }

    #[test]
    fn test_inquiry_requires_id() {
        assert!(TransactionInquiry::by_transaction_id("").is_err());
        let inquiry = TransactionInquiry::by_merchant_order_id("ORD-9").unwrap();
        assert_eq!(inquiry.id(), "ORD-9");
    }

    #[test]
    fn test_channel_kind_inference() {
        assert_eq!(PaymentChannel::new("vabca").content_type(), Some(ContentType::Va));
        assert_eq!(PaymentChannel::new("qris").content_type(), Some(ContentType::Qr));
        assert_eq!(PaymentChannel::new("cc").content_type(), Some(ContentType::Cc));
        assert_eq!(PaymentChannel::new("ovo").content_type(), None);
        assert_eq!(
            PaymentChannel::with_kind("ovo", ContentType::Qr).content_type(),
            Some(ContentType::Qr)
        );
    }

    #[test]
    fn test_customer_merge() {
        let mut customer = CustomerDetails {
            name: Some("Budi".into()),
            email: Some("old@example.com".into()),
            phone: None,
        };
        customer.merge(CustomerDetails {
            name: None,
            email: Some("new@example.com".into()),
            phone: Some("0812".into()),
        });
        assert_eq!(customer.name.as_deref(), Some("Budi"));
        assert_eq!(customer.email.as_deref(), Some("new@example.com"));
        assert_eq!(customer.phone.as_deref(), Some("0812"));
    }
}
