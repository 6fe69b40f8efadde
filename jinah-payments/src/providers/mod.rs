//! Payment provider implementations

pub mod finpay;
pub mod jinah;

pub use finpay::FinPayProvider;
pub use jinah::JinahProvider;
