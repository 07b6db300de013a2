//! Cart line quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// A positive item count.
///
/// A cart line never holds a zero quantity: callers convert a requested
/// count with [`Quantity::new`] or [`Quantity::from_signed`] and treat `None`
/// as "remove the line".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single item.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(count: u32) -> Option<Self> {
        match NonZeroU32::new(count) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Create a quantity from a signed count.
    ///
    /// Returns `None` for zero and negative values. Counts above `u32::MAX`
    /// are clamped.
    #[must_use]
    pub fn from_signed(count: i64) -> Option<Self> {
        if count <= 0 {
            return None;
        }
        Self::new(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Get the count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0.get()))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_not_a_quantity() {
        assert!(Quantity::new(0).is_none());
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
    }

    #[test]
    fn test_from_signed() {
        assert!(Quantity::from_signed(0).is_none());
        assert!(Quantity::from_signed(-1).is_none());
        assert_eq!(Quantity::from_signed(5).unwrap().get(), 5);
        assert_eq!(Quantity::from_signed(i64::MAX).unwrap().get(), u32::MAX);
    }

    #[test]
    fn test_saturating_add() {
        let two = Quantity::new(2).unwrap();
        assert_eq!(two.saturating_add(Quantity::ONE).get(), 3);

        let max = Quantity::new(u32::MAX).unwrap();
        assert_eq!(max.saturating_add(two).get(), u32::MAX);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
    }
}
