use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (balances, expense
/// amounts, split amounts) to avoid floating-point drift. Every currency is
/// tracked with two fractional digits.
///
/// The value is signed. For a balance:
/// - positive = the member owes money
/// - negative = the member is owed money
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (rejects more than 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
/// assert_eq!("10.5".parse::<Money>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Exact decimal value with two fractional digits.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Rounds `value` half-up (away from zero) to two decimals and converts it
    /// to cents.
    pub fn from_decimal_rounded(value: Decimal) -> ResultEngine<Self> {
        let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Self)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))
    }

    /// Uniform share of `self` across `parts` beneficiaries, rounded half-up to
    /// two decimals.
    ///
    /// The shares do not necessarily add back up to `self` (`10.00 / 3` gives
    /// `3.33` each).
    pub fn split_equal(self, parts: usize) -> ResultEngine<Self> {
        if parts == 0 {
            return Err(EngineError::InvalidAmount(
                "cannot split among zero beneficiaries".to_string(),
            ));
        }
        let share = self
            .to_decimal()
            .checked_div(Decimal::from(parts))
            .ok_or_else(|| EngineError::InvalidAmount("invalid split".to_string()))?;
        Self::from_decimal_rounded(share)
    }

    /// Converts a balance denominated at `old_rate` into one denominated at
    /// `new_rate`: `round(self / old_rate * new_rate, 2)`.
    pub fn rescale(self, old_rate: Decimal, new_rate: Decimal) -> ResultEngine<Self> {
        if old_rate <= Decimal::ZERO {
            return Err(EngineError::InvalidRate(format!(
                "old rate must be > 0, got {old_rate}"
            )));
        }
        if new_rate <= Decimal::ZERO {
            return Err(EngineError::InvalidRate(format!(
                "new rate must be > 0, got {new_rate}"
            )));
        }
        let value = self
            .to_decimal()
            .checked_div(old_rate)
            .and_then(|v| v.checked_mul(new_rate))
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
        Self::from_decimal_rounded(value)
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let (units_str, frac_str) = match rest.split_once('.') {
            Some((units, frac)) => (units, Some(frac)),
            None => (rest, None),
        };

        // Accept ".5" as 0.50.
        let units: i64 = if units_str.is_empty() && frac_str.is_some_and(|f| !f.is_empty()) {
            0
        } else {
            if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            units_str.parse().map_err(|_| overflow())?
        };

        let cents: i64 = match frac_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => return Err(EngineError::InvalidAmount("too many decimals".to_string())),
                }
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(10).to_string(), "0.10");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_common_forms() {
        assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("10.50".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!(".5".parse::<Money>().unwrap().cents(), 50);
        assert_eq!("-0.01".parse::<Money>().unwrap().cents(), -1);
        assert_eq!("+1.00".parse::<Money>().unwrap().cents(), 100);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_rejects_garbage_and_extra_decimals() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("0.001".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("10,50".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
    }

    #[test]
    fn split_equal_rounds_half_up() {
        assert_eq!(Money::new(3000).split_equal(3).unwrap(), Money::new(1000));
        assert_eq!(Money::new(1000).split_equal(3).unwrap(), Money::new(333));
        // 0.05 / 2 = 0.025 -> 0.03
        assert_eq!(Money::new(5).split_equal(2).unwrap(), Money::new(3));
        assert!(Money::new(1000).split_equal(0).is_err());
    }

    #[test]
    fn rescale_converts_between_rates() {
        assert_eq!(
            Money::new(1000).rescale(dec!(1.00), dec!(0.75)).unwrap(),
            Money::new(750)
        );
        assert_eq!(
            Money::new(-1000).rescale(dec!(1.00), dec!(0.75)).unwrap(),
            Money::new(-750)
        );
        // 10.00 / 0.75 * 1 = 13.3333.. -> 13.33
        assert_eq!(
            Money::new(1000).rescale(dec!(0.75), dec!(1)).unwrap(),
            Money::new(1333)
        );
        // -0.005 rounds away from zero
        assert_eq!(
            Money::new(-1).rescale(dec!(2), dec!(1)).unwrap(),
            Money::new(-1)
        );
        assert!(Money::new(1).rescale(dec!(0), dec!(1)).is_err());
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [Money::new(100), Money::new(-40), Money::new(5)]
            .iter()
            .sum();
        assert_eq!(total, Money::new(65));
    }
}
