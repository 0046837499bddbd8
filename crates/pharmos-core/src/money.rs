//! # Money Module
//!
//! Provides the `Money` and `DiscountRate` types for handling monetary values.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A bill of 37 strips × 12.35 summed as floats drifts by fractions of   │
//! │  a paisa, and the drift compounds once a discount is applied.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    1235 × 37 = 45695 (exact)                                            │
//! │    Rounding happens once, when the discount is taken.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharmos_core::money::{DiscountRate, Money};
//!
//! let price = Money::from_cents(1235); // 12.35
//! let line = price.multiply_quantity(3); // 37.05
//! let discount = line.discount(DiscountRate::from_percentage(10.0));
//! assert_eq!(discount.cents(), 371);   // 3.705 → 3.71
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents, paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences (e.g. total − discount) can be expressed
///   without a second type
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as a bare integer** so the frontend receives `…Cents` numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use pharmos_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use pharmos_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns the discount amount for this value at the given rate.
    ///
    /// ## Rounding
    /// This is the single rounding point of a bill. Integer math with
    /// half-up rounding: `(amount * bps + 5000) / 10000`, widened to i128
    /// so large bills cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use pharmos_core::money::{DiscountRate, Money};
    ///
    /// let subtotal = Money::from_cents(10000); // 100.00
    /// let discount = subtotal.discount(DiscountRate::from_bps(1000)); // 10%
    /// assert_eq!(discount.cents(), 1000);
    /// ```
    pub fn discount(&self, rate: DiscountRate) -> Money {
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }
}

/// Display shows a plain two-decimal amount (`12.34`, `-5.50`).
///
/// ## Note
/// No currency symbol; that is a presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Bill-level discount represented in basis points (bps).
///
/// 1 basis point = 0.01%; 1000 bps = 10%; 10000 bps = 100%.
/// The counter enters a percentage, which is converted once on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Upper bound: a 100% discount.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a discount rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount rate from a percentage (12.5 → 1250 bps).
    ///
    /// Negative input clamps to zero; callers validate the range first.
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// No discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply_quantity(3).cents(), 3000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_discount_ten_percent() {
        let subtotal = Money::from_cents(10000);
        let rate = DiscountRate::from_percentage(10.0);

        assert_eq!(subtotal.discount(rate).cents(), 1000);
        assert_eq!((subtotal - subtotal.discount(rate)).cents(), 9000);
    }

    #[test]
    fn test_discount_rounds_half_up_once() {
        // 37.05 at 10% = 3.705 → 3.71
        let amount = Money::from_cents(3705);
        assert_eq!(amount.discount(DiscountRate::from_bps(1000)).cents(), 371);

        // 0.04 at 12.5% = 0.005 → 0.01
        let tiny = Money::from_cents(4);
        assert_eq!(tiny.discount(DiscountRate::from_bps(1250)).cents(), 1);
    }

    #[test]
    fn test_zero_and_full_discount() {
        let amount = Money::from_cents(4599);
        assert!(amount.discount(DiscountRate::zero()).is_zero());
        assert_eq!(
            amount.discount(DiscountRate::from_bps(DiscountRate::MAX_BPS)),
            amount
        );
    }

    #[test]
    fn test_discount_rate_from_percentage() {
        assert_eq!(DiscountRate::from_percentage(12.5).bps(), 1250);
        assert_eq!(DiscountRate::from_percentage(0.0).bps(), 0);
        assert_eq!(DiscountRate::from_percentage(-3.0).bps(), 0);
        assert!((DiscountRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }
}
