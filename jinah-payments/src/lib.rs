//! Payment Orchestration for Jinah
//!
//! Provides a unified interface for starting, querying and cancelling
//! payments against FinPay, plus a `jinah` meta provider that hosts its own
//! checkout page and routes each payment channel to the service configured
//! for it.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Jinah facade                             │
//! │  charge() | charge_channel() | check() | inquiry() | cancel()   │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                    ┌─────────┴─────────┐
//!                    │  ProviderRouter   │  services.<name>.driver
//!                    └─────────┬─────────┘
//!             ┌────────────────┴───────────────┐
//!             ▼                                ▼
//!      ┌────────────┐                  ┌───────────────┐
//!      │   FinPay   │ ◄── channels ─── │ Jinah (meta)  │
//!      └────────────┘                  └───────────────┘
//!                                              │
//!                                       ┌──────┴──────┐
//!                                       │ PayloadStore │
//!                                       └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jinah_payments::{Jinah, JinahConfig, PaymentRequest};
//! use rust_decimal::Decimal;
//!
//! let jinah = Jinah::from_config(JinahConfig::load(None)?)?;
//!
//! let request = PaymentRequest::new("ORD-1001", Decimal::from(150_000), "Coffee beans")
//!     .customer_name("Sari Dewi")
//!     .customer_email("sari@example.com");
//!
//! // Hosted checkout
//! let response = jinah.charge(&request).await?;
//!
//! // Or straight to a channel
//! let response = jinah.charge_channel(&request, "vabca").await?;
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod money;
pub mod normalize;
pub mod provider;
pub mod qr;
pub mod router;
pub mod store;
pub mod types;
pub mod webhook;

pub mod providers;

pub use config::*;
pub use error::*;
pub use facade::Jinah;
pub use money::*;
pub use provider::*;
pub use router::*;
pub use store::*;
pub use types::*;
pub use webhook::*;

pub use providers::{FinPayProvider, JinahProvider};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::JinahConfig;
    pub use crate::error::{PaymentError, PaymentResult};
    pub use crate::facade::Jinah;
    pub use crate::money::Currency;
    pub use crate::provider::PaymentProvider;
    pub use crate::router::ProviderRouter;
    pub use crate::types::{
        PaymentChannel, PaymentRequest, PaymentResponse, PaymentStatus, TransactionInquiry,
    };
    pub use crate::webhook::{WebhookPayload, WebhookSource};
}
