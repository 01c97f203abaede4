//! Monetary amounts as reported by the commerce backend.
//!
//! The storefront never computes prices. Amounts are carried exactly as the
//! backend returns them and only formatted for display.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A gross amount with its ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "USD").
    pub currency: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: String) -> Self {
        Self { amount, currency }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub fn zero(currency: impl Into<String>) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: currency.into(),
        }
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        let money = Money::new(Decimal::new(199, 1), "USD".to_string());
        assert_eq!(money.to_string(), "19.90 USD");
    }

    #[test]
    fn test_zero() {
        let money = Money::zero("EUR");
        assert!(money.is_zero());
        assert_eq!(money.to_string(), "0.00 EUR");
    }

    #[test]
    fn test_deserialize_from_backend_float() {
        // Saleor reports amounts as JSON floats
        let money: Money = serde_json::from_str(r#"{"amount": 25.5, "currency": "USD"}"#).unwrap();
        assert_eq!(money.amount, Decimal::new(255, 1));
    }
}
