//! Money and currency types

use crate::error::{PaymentError, PaymentResult};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Currencies accepted for outbound charges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    IDR,
    USD,
    EUR,
    SGD,
}

impl Currency {
    /// Every accepted currency
    pub const ALL: [Currency; 4] = [Self::IDR, Self::USD, Self::EUR, Self::SGD];

    /// Get currency code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::IDR => "IDR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::SGD => "SGD",
        }
    }

    /// Get currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::IDR => "Rp",
            Self::USD => "$",
            Self::EUR => "€",
            Self::SGD => "S$",
        }
    }

    /// Parse from a case-insensitive code, rejecting anything outside the allow-list
    pub fn from_code(code: &str) -> PaymentResult<Self> {
        match code.trim().to_uppercase().as_str() {
            "IDR" => Ok(Self::IDR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "SGD" => Ok(Self::SGD),
            other => Err(PaymentError::Validation(format!(
                "Invalid currency: {}. Supported currencies: IDR, USD, EUR, SGD",
                other
            ))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Convert a minor-unit amount (cents) to major units
pub fn minor_to_major(minor: i64) -> Decimal {
    Decimal::new(minor, 2).normalize()
}

/// Truncate to the integer amount providers expect on the wire
pub fn to_wire_amount(amount: Decimal) -> i64 {
    amount.trunc().to_i64().unwrap_or(0)
}

/// Shortest decimal rendering: `2`, `2.5`, `1500`
pub fn format_decimal(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Read an amount that a provider may send as a number or a numeric string
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}
