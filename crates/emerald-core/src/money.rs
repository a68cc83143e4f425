//! # Money Module
//!
//! Monetary values as integer cents (`i64`). Floating point is never
//! used for money: the database, calculations, and API all work in
//! cents, and only the UI converts to dollars for display.
//!
//! ## Tax rounding
//! Tax is computed per line at the line's category rate, but the sum is
//! rounded exactly once at the aggregate, using round-half-to-even
//! (bankers rounding). Rounding per line would compound the error over
//! multi-line carts; rounding half-up would drift upward over millions
//! of transactions. Lines therefore accumulate an *unrounded* tax
//! numerator ([`Money::tax_numerator`], in cents × basis points) that is
//! divided once by [`Money::round_tax_sum`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// Signed so refunds and discounts can be represented as negatives.
///
/// ## Example
/// ```rust
/// use emerald_core::money::Money;
///
/// let price = Money::from_cents(4500); // $45.00
/// let line = price * 2;
/// assert_eq!(line.cents(), 9000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a quantity (line total = unit price × quantity).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Unrounded tax for this amount at `rate`, in cents × basis points.
    ///
    /// The caller sums numerators across lines and converts the sum to
    /// cents exactly once with [`Money::round_tax_sum`]. `i128` keeps
    /// the product exact for any realistic cart.
    #[inline]
    pub fn tax_numerator(&self, rate: TaxRate) -> i128 {
        self.0 as i128 * rate.bps() as i128
    }

    /// Converts a summed tax numerator (cents × bps) to cents, rounding
    /// half to even.
    ///
    /// ## Example
    /// ```rust
    /// use emerald_core::money::Money;
    /// use emerald_core::types::TaxRate;
    ///
    /// // $90.00 at 15.5% = $13.95 exactly
    /// let n = Money::from_cents(9000).tax_numerator(TaxRate::from_bps(1550));
    /// assert_eq!(Money::round_tax_sum(n).cents(), 1395);
    ///
    /// // $10.00 at 8.25% = $0.825 -> 82 cents (ties go to even)
    /// let n = Money::from_cents(1000).tax_numerator(TaxRate::from_bps(825));
    /// assert_eq!(Money::round_tax_sum(n).cents(), 82);
    /// ```
    pub fn round_tax_sum(numerator: i128) -> Money {
        Money(div_half_even(numerator, 10_000) as i64)
    }
}

/// Integer division rounding half to even. Inputs are non-negative
/// (tax numerators never go below zero; line totals are validated).
fn div_half_even(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let twice = remainder * 2;

    if twice > denominator || (twice == denominator && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. UI formatting (localization) happens client-side.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!(a.multiply_quantity(4).cents(), 4000);
    }

    #[test]
    fn test_tax_exact() {
        // $90.00 at 15.5% = $13.95 with no rounding needed
        let n = Money::from_cents(9000).tax_numerator(TaxRate::from_bps(1550));
        assert_eq!(Money::round_tax_sum(n).cents(), 1395);
    }

    #[test]
    fn test_tax_half_even_ties() {
        // 82.5 -> 82 (down to even)
        let n = Money::from_cents(1000).tax_numerator(TaxRate::from_bps(825));
        assert_eq!(Money::round_tax_sum(n).cents(), 82);

        // 83.5 -> 84 (up to even): 8350000 / 10000
        assert_eq!(Money::round_tax_sum(835_000).cents(), 84);
    }

    #[test]
    fn test_tax_non_tie_rounds_nearest() {
        // 82.6 -> 83
        assert_eq!(Money::round_tax_sum(826_000).cents(), 83);
        // 82.4 -> 82
        assert_eq!(Money::round_tax_sum(824_000).cents(), 82);
    }

    #[test]
    fn test_tax_summed_once_not_per_line() {
        // Two lines of $10.00 at 8.25%: per-line rounding would give
        // 82 + 82 = 164; a single aggregate rounding of 165.0 gives 165.
        let rate = TaxRate::from_bps(825);
        let sum = Money::from_cents(1000).tax_numerator(rate)
            + Money::from_cents(1000).tax_numerator(rate);
        assert_eq!(Money::round_tax_sum(sum).cents(), 165);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-550).abs().cents(), 550);
    }
}
