//! Webhook Ingestion for Jinah Payments
//!
//! Verifies, normalizes and dispatches asynchronous payment notifications
//! from FinPay, Stripe, Midtrans and generic HMAC-signed providers.
//!
//! # Features
//!
//! - **Signature Verification**: HMAC-SHA512 over re-encoded JSON (FinPay),
//!   timestamped HMAC-SHA256 (Stripe), SHA512 field concatenation (Midtrans)
//!   and a multi-algorithm fallback for everything else
//! - **IP Allow-Lists**: literal addresses and CIDR blocks, per service or global
//! - **Auto-Detection**: identifies the provider from headers or body shape
//! - **Event Dispatch**: received/successful/failed/pending listeners
//!
//! # Example
//!
//! ```rust,no_run
//! use jinah_payments::JinahConfig;
//! use jinah_webhooks::{LoggingListener, WebhookReceiver, WebhookRequest};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let receiver = WebhookReceiver::new(Arc::new(JinahConfig::from_env()));
//! receiver.dispatcher().subscribe_all(LoggingListener);
//!
//! let request = WebhookRequest::post("/payment-webhook", r#"{"order":{"id":"ORD-1"}}"#)
//!     .with_header("Client-Id", "FINPAY")
//!     .with_client_ip("103.10.128.4");
//!
//! let response = receiver.handle(&request, None).await;
//! println!("{} {}", response.status, response.body);
//! # });
//! ```

pub mod detect;
pub mod dispatch;
pub mod error;
pub mod ip;
pub mod receiver;
pub mod request;
pub mod signature;
pub mod verifier;

pub use detect::{Detection, Evidence, detect_service};
pub use dispatch::{
    DispatchReport, EventDispatcher, ListenerError, ListenerFailure, LoggingListener,
    PaymentEvent, PaymentEventKind, PaymentEventListener,
};
pub use error::{Result, WebhookError};
pub use ip::IpAllowList;
pub use receiver::{ProcessedWebhook, WebhookReceiver, WebhookResponse};
pub use request::WebhookRequest;
pub use signature::SignatureScheme;
pub use verifier::WebhookVerifier;
