//! # Loyalty Math
//!
//! Pure point arithmetic for the customer loyalty accumulator. The
//! database-side accumulator (emerald-db) computes the deltas here and
//! applies them in the sale's unit of work.
//!
//! The points rate is a fraction of the purchase amount in *dollars*
//! (0.05 ⇒ 5 points per $100). It comes from the settings store, not
//! from a constant baked into the engine; [`DEFAULT_POINTS_RATE_BPS`]
//! is only the fallback when the setting is absent.

use crate::money::Money;

/// Fallback `loyalty_points_rate` (0.05) in basis points of a dollar.
pub const DEFAULT_POINTS_RATE_BPS: u32 = 500;

/// Parses a settings value like `"0.05"` into a rate in basis points.
/// Returns `None` for non-numeric or out-of-range (negative, > 1.0)
/// values so the caller can fall back to the default.
pub fn parse_points_rate(value: &str) -> Option<u32> {
    let rate: f64 = value.trim().parse().ok()?;
    if !(0.0..=1.0).contains(&rate) {
        return None;
    }
    Some((rate * 10_000.0).round() as u32)
}

/// Points earned (or clawed back on refund) for a purchase amount:
/// `floor(dollars × rate)`, computed in integers.
///
/// ## Example
/// ```rust
/// use emerald_core::loyalty::points_for_amount;
/// use emerald_core::money::Money;
///
/// // $100.00 at rate 0.05 (500 bps) -> 5 points
/// assert_eq!(points_for_amount(Money::from_cents(10_000), 500), 5);
/// ```
pub fn points_for_amount(amount: Money, rate_bps: u32) -> i64 {
    // cents × bps / (100 cents/dollar × 10_000 bps) = dollars × rate
    (amount.cents() as i128 * rate_bps as i128 / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_points_rate() {
        assert_eq!(parse_points_rate("0.05"), Some(500));
        assert_eq!(parse_points_rate("0.1"), Some(1000));
        assert_eq!(parse_points_rate(" 0.02 "), Some(200));
        assert_eq!(parse_points_rate("1.0"), Some(10_000));

        assert_eq!(parse_points_rate("-0.05"), None);
        assert_eq!(parse_points_rate("1.5"), None);
        assert_eq!(parse_points_rate("five percent"), None);
        assert_eq!(parse_points_rate(""), None);
    }

    #[test]
    fn test_points_floor() {
        // $100.00 at 0.05 -> exactly 5
        assert_eq!(points_for_amount(Money::from_cents(10_000), 500), 5);
        // $99.99 at 0.05 -> 4.9995 -> 4 (floored)
        assert_eq!(points_for_amount(Money::from_cents(9_999), 500), 4);
        // $19.99 at 0.05 -> 0.9995 -> 0
        assert_eq!(points_for_amount(Money::from_cents(1_999), 500), 0);
    }

    #[test]
    fn test_zero_rate_earns_nothing() {
        assert_eq!(points_for_amount(Money::from_cents(100_000), 0), 0);
    }
}
