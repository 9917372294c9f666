//! Stake amounts and coins.
//!
//! Amounts are unbounded non-negative integers, so a stake and the bond
//! ceiling compare exactly no matter how many digits either has.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A non-negative integer amount of the smallest token unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(BigUint);

/// Why a string is not an [`Amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountParseError {
    /// Empty, signed, or containing non-digit characters.
    #[error("not a base-10 integer")]
    NotAnInteger,
}

impl Amount {
    /// Returns true if this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `BigUint` alone would also accept a leading `+` and `_` separators.
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountParseError::NotAnInteger);
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or(AmountParseError::NotAnInteger)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e| de::Error::custom(format!("invalid amount {raw:?}: {e}")))
    }
}

/// An amount paired with its denomination, written `<amount><denom>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coin {
    /// Amount in the smallest unit.
    pub amount: Amount,
    /// Denomination symbol.
    pub denom: String,
}

/// Why a string is not a [`Coin`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinParseError {
    /// No leading digits.
    #[error("missing amount")]
    MissingAmount,
    /// Nothing after the digits.
    #[error("missing denomination")]
    MissingDenom,
    /// The digits did not form a valid amount.
    #[error("invalid amount: {0}")]
    Amount(#[from] AmountParseError),
}

impl Coin {
    /// Create a coin.
    pub fn new(amount: Amount, denom: impl Into<String>) -> Self {
        Self {
            amount,
            denom: denom.into(),
        }
    }
}

impl FromStr for Coin {
    type Err = CoinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (amount, denom) = s.split_at(split);

        if amount.is_empty() {
            return Err(CoinParseError::MissingAmount);
        }
        if denom.is_empty() {
            return Err(CoinParseError::MissingDenom);
        }

        Ok(Self::new(amount.parse()?, denom))
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl<'de> Deserialize<'de> for Coin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e| de::Error::custom(format!("invalid coin {raw:?}: {e}")))
    }
}
