//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The shop trades in pesos, which have no minor unit in practice.        │
//! │                                                                         │
//! │  Every price, line total and ticket total is a whole number of pesos    │
//! │  held in an i64. Percentages are expressed in basis points so that     │
//! │  gain calculations never touch floating point.                         │
//! │                                                                         │
//! │    2 × $1.500 = $3.000          (exact)                                │
//! │    35% of $2.500 = $875         (3500 bps, integer math)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use taproom_core::money::Money;
//!
//! let price = Money::from_units(2500);
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.units(), 7500);
//! assert_eq!(line.to_string(), "$7.500");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: profit can be negative when a product sells below cost
/// - **Single field tuple struct**: zero-cost wrapper over the stored integer
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in whole units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, saturating at the `i64`
    /// bounds instead of overflowing.
    ///
    /// Validated prices and quantities never get near the bounds; see
    /// [`crate::MAX_PRICE`] and [`crate::MAX_ITEM_QUANTITY`].
    ///
    /// ## Example
    /// ```rust
    /// use taproom_core::money::Money;
    ///
    /// let unit_price = Money::from_units(1000);
    /// assert_eq!(unit_price.multiply_quantity(5).units(), 5000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies a unit price by a quantity, or `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(units) => Some(Money(units)),
            None => None,
        }
    }

    /// Returns `bps` basis points of this amount, truncated toward zero.
    ///
    /// Truncation matches how the till has always priced the gain on
    /// common products: 33% of $1.001 is $330, not $331.
    ///
    /// ```rust
    /// use taproom_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(2000).percentage_of(10_000).units(), 2000);
    /// assert_eq!(Money::from_units(1001).percentage_of(3_300).units(), 330);
    /// ```
    pub fn percentage_of(&self, bps: u32) -> Money {
        // i128 keeps large peso amounts from overflowing before the division
        let value = self.0 as i128 * bps as i128 / 10_000;
        Money(value as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money the way the shop prints it: `$1.234.567`, dots as
/// thousands separators, no decimals.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}${}", sign, grouped)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Money(units)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
