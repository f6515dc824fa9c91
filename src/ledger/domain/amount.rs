//! Credit amounts with checked arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative quantity of credits.
///
/// Balances and escrow amounts may be zero; transaction amounts and task
/// prices must be positive and are validated where they are constructed.
/// All arithmetic is checked so credits are never created or destroyed by
/// overflow or wrap-around.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Credits(u64);

impl Credits {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates a credit amount from a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `true` when the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts `other`, returning `None` when the result would go
    /// negative.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(rest) => Some(Self(rest)),
            None => None,
        }
    }

    /// Splits the amount into two halves for dispute resolution.
    ///
    /// Returns `(floor(self / 2), remainder)` so the two parts always sum
    /// back to the original amount, odd values included.
    #[must_use]
    #[expect(
        clippy::integer_division,
        clippy::integer_division_remainder_used,
        reason = "floor division is intended; the remainder share preserves conservation"
    )]
    pub const fn split_half(self) -> (Self, Self) {
        let half = self.0 / 2;
        (Self(half), Self(self.0 - half))
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
