//! Type-safe price representation using decimal arithmetic.
//!
//! Shopify owns pricing. Amounts arrive as decimal strings (`"19.99"`) and are
//! only ever multiplied by a quantity or summed for display, never rounded
//! through floating point.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid currency code: {0:?}")]
pub struct CurrencyCodeError(pub String);

/// Errors building a [`Price`] from wire data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("invalid decimal amount {0:?}")]
    InvalidAmount(String),
    #[error(transparent)]
    InvalidCurrency(#[from] CurrencyCodeError),
    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(CurrencyCode, CurrencyCode),
    #[error("amount out of range")]
    Overflow,
}

/// ISO 4217 currency code (three upper-case ASCII letters).
///
/// Defaults to `USD`, which is what an empty cart reports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const USD: Self = Self(*b"USD");
    pub const EUR: Self = Self(*b"EUR");
    pub const GBP: Self = Self(*b"GBP");
    pub const CAD: Self = Self(*b"CAD");
    pub const AUD: Self = Self(*b"AUD");

    /// Parse a currency code, accepting any letter case.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyCodeError` unless the input is exactly three ASCII letters.
    pub fn parse(code: &str) -> Result<Self, CurrencyCodeError> {
        let bytes = code.trim().as_bytes();
        match bytes {
            [a, b, c] if bytes.iter().all(u8::is_ascii_alphabetic) => Ok(Self([
                a.to_ascii_uppercase(),
                b.to_ascii_uppercase(),
                c.to_ascii_uppercase(),
            ])),
            _ => Err(CurrencyCodeError(code.to_string())),
        }
    }

    /// The three-letter code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII letters
        std::str::from_utf8(&self.0).unwrap_or("XXX")
    }

    /// Display symbol, if the currency has a common one.
    #[must_use]
    pub fn symbol(&self) -> Option<&'static str> {
        match &self.0 {
            b"USD" | b"CAD" | b"AUD" | b"NZD" => Some("$"),
            b"EUR" => Some("€"),
            b"GBP" => Some("£"),
            b"JPY" => Some("¥"),
            _ => None,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::USD
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.as_str())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Parse a Shopify `MoneyV2` pair (`amount` string + `currencyCode`).
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if the amount is not a decimal or the currency is invalid.
    pub fn parse(amount: &str, currency_code: &str) -> Result<Self, PriceError> {
        let value = Decimal::from_str(amount.trim())
            .map_err(|_| PriceError::InvalidAmount(amount.to_string()))?;
        Ok(Self::new(value, CurrencyCode::parse(currency_code)?))
    }

    /// This price multiplied by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` when the product does not fit a `Decimal`.
    pub fn times(&self, quantity: u32) -> Result<Self, PriceError> {
        self.amount
            .checked_mul(Decimal::from(quantity))
            .map(|amount| Self::new(amount, self.currency_code))
            .ok_or(PriceError::Overflow)
    }

    /// Add two prices of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::CurrencyMismatch` when the currencies differ, or
    /// `PriceError::Overflow` when the sum does not fit a `Decimal`.
    pub fn checked_add(&self, other: &Self) -> Result<Self, PriceError> {
        if self.currency_code != other.currency_code {
            return Err(PriceError::CurrencyMismatch(
                self.currency_code,
                other.currency_code,
            ));
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency_code))
            .ok_or(PriceError::Overflow)
    }

    /// Format for display (e.g., "$19.99", or "19.99 CHF" without a known symbol).
    #[must_use]
    pub fn display(&self) -> String {
        let amount = self.amount.round_dp(2);
        match self.currency_code.symbol() {
            Some(symbol) => format!("{symbol}{amount:.2}"),
            None => format!("{amount:.2} {}", self.currency_code),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_parse_normalizes_case() {
        assert_eq!(CurrencyCode::parse("usd").unwrap(), CurrencyCode::USD);
        assert_eq!(CurrencyCode::parse(" Eur ").unwrap(), CurrencyCode::EUR);
    }

    #[test]
    fn test_currency_code_rejects_garbage() {
        assert!(CurrencyCode::parse("").is_err());
        assert!(CurrencyCode::parse("US").is_err());
        assert!(CurrencyCode::parse("USDX").is_err());
        assert!(CurrencyCode::parse("U$D").is_err());
    }

    #[test]
    fn test_currency_code_default_is_usd() {
        assert_eq!(CurrencyCode::default().as_str(), "USD");
    }

    #[test]
    fn test_currency_code_serde_as_string() {
        let json = serde_json::to_string(&CurrencyCode::GBP).unwrap();
        assert_eq!(json, "\"GBP\"");
        let back: CurrencyCode = serde_json::from_str("\"cad\"").unwrap();
        assert_eq!(back, CurrencyCode::CAD);
        assert!(serde_json::from_str::<CurrencyCode>("\"dollars\"").is_err());
    }

    #[test]
    fn test_price_times_is_exact() {
        let price = Price::parse("10.00", "USD").unwrap();
        let total = price.times(3).unwrap();
        assert_eq!(total.amount, Decimal::new(3000, 2));
        assert_eq!(total.display(), "$30.00");
    }

    #[test]
    fn test_price_parse_rejects_non_decimal() {
        assert!(matches!(
            Price::parse("ten", "USD"),
            Err(PriceError::InvalidAmount(_))
        ));
        assert!(matches!(
            Price::parse("1.00", "??"),
            Err(PriceError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_price_checked_add() {
        let a = Price::parse("0.10", "USD").unwrap();
        let b = Price::parse("0.20", "USD").unwrap();
        assert_eq!(a.checked_add(&b).unwrap().amount, Decimal::new(30, 2));

        let eur = Price::parse("1", "EUR").unwrap();
        assert!(matches!(
            a.checked_add(&eur),
            Err(PriceError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn test_price_arithmetic_reports_overflow() {
        let huge = Price::parse("100000000000000000000", "USD").unwrap();
        assert_eq!(huge.times(4_000_000_000), Err(PriceError::Overflow));

        let max = Price::new(Decimal::MAX, CurrencyCode::USD);
        let one = Price::parse("1", "USD").unwrap();
        assert_eq!(max.checked_add(&one), Err(PriceError::Overflow));
    }

    #[test]
    fn test_price_display_without_symbol() {
        let price = Price::parse("12.5", "CHF").unwrap();
        assert_eq!(price.display(), "12.50 CHF");
        assert_eq!(Price::zero(CurrencyCode::EUR).display(), "€0.00");
    }
}
