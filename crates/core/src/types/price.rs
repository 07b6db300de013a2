//! Type-safe price representation using decimal arithmetic.
//!
//! The bookstore API reports prices as bare numbers in the store currency.
//! Older clients persisted them as strings, and some records carry `null`
//! for a missing discount, so the [`lenient`] serde helpers accept all of
//! those encodings.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
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
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.currency_code.decimal_places();
        let rounded = self.amount.round_dp(places);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let plain = format!("{:.*}", places as usize, rounded.abs());
        let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), ""));
        let grouped = group_thousands(whole, self.currency_code.group_separator());

        let number = if fraction.is_empty() {
            grouped
        } else {
            format!("{grouped}.{fraction}")
        };

        match self.currency_code {
            CurrencyCode::VND => write!(f, "{sign}{number} ₫"),
            CurrencyCode::USD => write!(f, "{sign}${number}"),
            CurrencyCode::EUR => write!(f, "{sign}€{number}"),
        }
    }
}

/// Insert `separator` between every group of three digits.
fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// ISO 4217 currency codes supported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    VND,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Number of decimal places shown for this currency.
    #[must_use]
    pub const fn decimal_places(self) -> u32 {
        match self {
            Self::VND => 0,
            Self::USD | Self::EUR => 2,
        }
    }

    const fn group_separator(self) -> char {
        match self {
            Self::VND => '.',
            Self::USD | Self::EUR => ',',
        }
    }
}

/// Error returned when parsing an unsupported currency code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unsupported currency code: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for CurrencyCode {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VND" => Ok(Self::VND),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            _ => Err(UnknownCurrency(s.to_owned())),
        }
    }
}

/// Serde helpers for prices that may arrive as numbers, numeric strings,
/// or `null`.
///
/// Use with `#[serde(default, with = "bookstore_core::price::lenient")]` for
/// a required price (missing or invalid reads as zero) and
/// `#[serde(default, with = "bookstore_core::price::lenient::option")]` for an
/// optional one (missing or invalid reads as `None`).
pub mod lenient {
    use rust_decimal::Decimal;
    use rust_decimal::prelude::ToPrimitive;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use super::parse_amount;

    /// Deserialize a price, coercing missing or invalid values to zero.
    ///
    /// # Errors
    ///
    /// Only fails if the underlying deserializer fails.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        option::deserialize(deserializer).map(Option::unwrap_or_default)
    }

    /// Serialize a price as a JSON number when it is integral, else as a string.
    ///
    /// # Errors
    ///
    /// Only fails if the underlying serializer fails.
    pub fn serialize<S>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match amount.is_integer().then(|| amount.to_i64()).flatten() {
            Some(whole) => serializer.serialize_i64(whole),
            None => serializer.collect_str(amount),
        }
    }

    /// Optional variant of the lenient price helpers.
    pub mod option {
        use super::{Decimal, Deserialize, Deserializer, Serializer, Value, parse_amount};

        /// Deserialize an optional price, mapping invalid values to `None`.
        ///
        /// # Errors
        ///
        /// Only fails if the underlying deserializer fails.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Option::<Value>::deserialize(deserializer)?;
            Ok(value.as_ref().and_then(parse_amount))
        }

        /// Serialize an optional price, writing `null` for `None`.
        ///
        /// # Errors
        ///
        /// Only fails if the underlying serializer fails.
        #[allow(clippy::ref_option)] // serde's `with` passes `&Option<T>`
        pub fn serialize<S>(amount: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match amount {
                Some(amount) => super::serialize(amount, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}

/// Interpret a JSON value as a non-negative amount.
fn parse_amount(value: &serde_json::Value) -> Option<Decimal> {
    let amount = match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        serde_json::Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    }?;

    (!amount.is_sign_negative()).then_some(amount)
}
