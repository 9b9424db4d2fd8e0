//! Monetary types for ExchangeDesk.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary amount with currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount value (high precision decimal).
    pub value: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money instance.
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            value: Decimal::ZERO,
            currency,
        }
    }

    /// Check if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }

    /// Round to the currency's standard decimal places.
    pub fn round(&self) -> Self {
        let places = self.currency.decimal_places();
        Self {
            value: self.value.round_dp(places),
            currency: self.currency.clone(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// ISO 4217 currency code, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the standard decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "XOF" | "XAF" => 0,
            "BHD" | "KWD" | "OMR" | "TND" | "LYD" => 3,
            _ => 2,
        }
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

/// A directed currency pair: amounts in `base` are priced in `quote`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Base currency (being bought/sold).
    pub base: Currency,
    /// Quote currency (pricing currency).
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}
