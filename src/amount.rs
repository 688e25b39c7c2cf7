//! Dollar amounts with exactly 2 decimal places.
//!
//! ACH records carry amounts as whole cents in fixed-width numeric fields.
//! `Amount` keeps the dollar representation for arithmetic and display and
//! converts to cents only when a record is rendered.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A non-negative dollar amount with 2 decimal places of precision.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use ach_merge::Amount;
///
/// let amount = Amount::from_str("10.5").unwrap();
/// assert_eq!(amount.to_string(), "10.50");
/// assert_eq!(amount.to_cents(), Some(1050));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Amount(Decimal::ZERO);

    fn new(value: Decimal) -> Self {
        let mut normalized = value;
        normalized.rescale(Self::SCALE);
        Amount(normalized)
    }

    /// Creates an amount from a whole number of cents.
    pub fn from_cents(cents: u64) -> Self {
        Amount(Decimal::from_i128_with_scale(i128::from(cents), Self::SCALE))
    }

    /// Returns the amount in whole cents, or `None` if it is negative or
    /// too large for a `u64`.
    pub fn to_cents(&self) -> Option<u64> {
        let mut scaled = self.0;
        scaled.rescale(Self::SCALE);
        u64::try_from(scaled.mantissa()).ok()
    }

    /// Adds `rhs`, returning `None` if the sum overflows.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Amount::new)
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        if decimal.is_sign_negative() && !decimal.is_zero() {
            return Err(rust_decimal::Error::ErrorString(format!(
                "negative amount {}",
                decimal
            )));
        }
        if decimal.normalize().scale() > Self::SCALE {
            return Err(rust_decimal::Error::ErrorString(format!(
                "amount {} has fractional cents",
                decimal
            )));
        }
        Ok(Amount::new(decimal))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount::new(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.0.rescale(Self::SCALE);
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}
