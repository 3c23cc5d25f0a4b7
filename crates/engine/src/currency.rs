use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO-4217-like currency code used as a group's base currency.
///
/// Codes are three ASCII letters, stored upper-case. Every group starts in
/// `SGD`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub const DEFAULT: &'static str = "SGD";

    /// Canonical currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let code = value.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EngineError::InvalidCurrency(format!(
                "invalid currency code: {}",
                value.trim()
            )));
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

/// A group's base currency together with its rate against the reference
/// currency of the rate provider.
///
/// `rate` is "units of `base` per 1 unit of the reference currency". Balances
/// are rescaled with the old and new rates whenever `base` changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySetting {
    pub base: CurrencyCode,
    pub rate: Decimal,
}

impl Default for CurrencySetting {
    fn default() -> Self {
        Self {
            base: CurrencyCode::default(),
            rate: Decimal::ONE,
        }
    }
}

/// Parse a rate stored as decimal text.
pub(crate) fn parse_rate(raw: &str) -> Result<Decimal, EngineError> {
    Decimal::from_str(raw.trim())
        .map_err(|_| EngineError::InvalidRate(format!("invalid stored rate: {raw}")))
}
