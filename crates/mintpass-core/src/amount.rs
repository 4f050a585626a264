//! # Wei Amounts and Payment Policy
//!
//! All payment values are integers in the smallest denomination (wei).
//! There are no floats anywhere in the payment path: prices, attached
//! payments and charges are `Wei`, and every arithmetic step is checked.
//!
//! ## Text Format
//!
//! Configuration files may write amounts as a bare integer (`100000`), an
//! integer string (`"100000"`), or a decimal with a unit suffix
//! (`"0.0001 ether"`, `"5 gwei"`, `"7 wei"`). Decimals are only accepted
//! when they resolve to a whole number of wei.

use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MintError, ParseAmountError};

/// Wei per gwei.
pub const GWEI: u128 = 1_000_000_000;

/// Wei per ether.
pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// An amount of the native payment currency, in wei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Wei(pub u128);

impl Wei {
    /// Zero wei.
    pub const ZERO: Wei = Wei(0);

    /// Whole ether. Any `u64` count fits in `u128` wei without overflow.
    pub const fn ether(n: u64) -> Self {
        Self(n as u128 * ETHER)
    }

    /// The raw wei value.
    pub fn get(&self) -> u128 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Wei) -> Option<Wei> {
        self.0.checked_add(rhs.0).map(Wei)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Wei) -> Option<Wei> {
        self.0.checked_sub(rhs.0).map(Wei)
    }

    /// Total cost of `quantity` units at this unit price.
    ///
    /// Overflow maps to [`MintError::ArithmeticOverflow`].
    pub fn times(self, quantity: u64) -> Result<Wei, MintError> {
        self.0
            .checked_mul(u128::from(quantity))
            .map(Wei)
            .ok_or(MintError::ArithmeticOverflow("price * quantity"))
    }
}

impl std::fmt::Display for Wei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

impl FromStr for Wei {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (number, unit) = match trimmed.split_once(char::is_whitespace) {
            Some((n, u)) => (n.trim(), u.trim()),
            None => (trimmed, "wei"),
        };
        let scale = match unit.to_ascii_lowercase().as_str() {
            "wei" => 1,
            "gwei" => GWEI,
            "ether" | "eth" => ETHER,
            other => return Err(ParseAmountError::UnknownUnit(other.to_string())),
        };
        parse_scaled(number, scale).map(Wei)
    }
}

/// Parse a non-negative decimal and scale it to an integer.
fn parse_scaled(number: &str, scale: u128) -> Result<u128, ParseAmountError> {
    let invalid = || ParseAmountError::Invalid(number.to_string());
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_value: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let mut value = whole_value
        .checked_mul(scale)
        .ok_or_else(|| ParseAmountError::Overflow(number.to_string()))?;

    let frac = frac.trim_end_matches('0');
    if !frac.is_empty() {
        let mut unit = scale;
        let mut frac_value: u128 = 0;
        for digit in frac.bytes() {
            if unit % 10 != 0 {
                return Err(ParseAmountError::FractionalWei(number.to_string()));
            }
            unit /= 10;
            frac_value += u128::from(digit - b'0') * unit;
        }
        value = value
            .checked_add(frac_value)
            .ok_or_else(|| ParseAmountError::Overflow(number.to_string()))?;
    }
    Ok(value)
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // u128 does not survive every JSON/YAML consumer; a decimal string does.
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WeiVisitor;

        impl<'de> Visitor<'de> for WeiVisitor {
            type Value = Wei;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a non-negative integer or an amount string such as \"1 ether\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Wei, E> {
                Ok(Wei(u128::from(v)))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Wei, E> {
                Ok(Wei(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Wei, E> {
                u128::try_from(v)
                    .map(Wei)
                    .map_err(|_| E::custom(format!("negative amount: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Wei, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(WeiVisitor)
    }
}

/// How an attached payment is compared against the charge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPolicy {
    /// Payment must equal the charge exactly. Over- and underpayment are rejected.
    #[default]
    Exact,
    /// Underpayment is rejected. Only the charge is captured; the excess
    /// never leaves the payer.
    RefundExcess,
}

impl PaymentPolicy {
    /// Settle an attached payment against a charge.
    ///
    /// Returns the amount to capture from the payer.
    pub fn settle(&self, charge: Wei, attached: Wei) -> Result<Wei, MintError> {
        let accepted = match self {
            Self::Exact => attached == charge,
            Self::RefundExcess => attached >= charge,
        };
        if accepted {
            Ok(charge)
        } else {
            Err(MintError::IncorrectPayment {
                expected: charge,
                received: attached,
            })
        }
    }
}

impl std::fmt::Display for PaymentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => f.write_str("EXACT"),
            Self::RefundExcess => f.write_str("REFUND_EXCESS"),
        }
    }
}
