//! # Pricing & Tax Calculator
//!
//! Pure function from a cart plus a catalog snapshot to priced totals.
//! No I/O, deterministic, and the only place sale money math lives.
//!
//! Per line: `line_total = price × quantity − line_discount`, taxed at
//! the line's category rate (multi-category carts get mixed rates, by
//! design - there is no blended aggregate rate). The tax sum is rounded
//! once at the aggregate, half to even (see [`crate::money`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::CatalogEntry;
use crate::validation::validate_quantity;

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// One requested line of a cart: what the caller sends.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    /// Per-line discount in cents.
    #[serde(default)]
    pub discount_cents: i64,
}

/// A line after pricing: quantity plus the frozen unit price and the
/// computed line total.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents, snapshotted from the catalog at pricing
    /// time.
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// `unit_price × quantity − discount`.
    pub total_cents: i64,
}

/// Aggregate pricing for a cart.
///
/// Invariants (all cents):
/// - `subtotal == Σ line.total`
/// - `total == subtotal + tax − discount`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub lines: Vec<PricedLine>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    /// Order-level discount (line discounts are already inside
    /// `subtotal`).
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl PricingResult {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// The Calculator
// =============================================================================

/// Prices a cart against a catalog snapshot.
///
/// ## Errors
/// - [`CoreError::InvalidLineItem`] - empty cart, or a line quantity
///   outside `1..=MAX_LINE_QUANTITY`;
/// - [`CoreError::UnknownProduct`] - a line's product id has no
///   catalog entry;
/// - [`CoreError::InvalidDiscount`] - negative discount, a line
///   discount above the line subtotal, or an order discount above
///   `subtotal + tax` (would produce a negative total).
pub fn price_cart(
    lines: &[CartLine],
    catalog: &HashMap<String, CatalogEntry>,
    order_discount_cents: i64,
) -> CoreResult<PricingResult> {
    if lines.is_empty() {
        return Err(CoreError::InvalidLineItem {
            reason: "cart has no line items".to_string(),
        });
    }

    if order_discount_cents < 0 {
        return Err(CoreError::InvalidDiscount {
            reason: "order discount cannot be negative".to_string(),
        });
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero();
    let mut tax_numerator: i128 = 0;

    for line in lines {
        validate_quantity(line.quantity).map_err(|e| CoreError::InvalidLineItem {
            reason: e.to_string(),
        })?;

        let entry = catalog
            .get(&line.product_id)
            .ok_or_else(|| CoreError::UnknownProduct(line.product_id.clone()))?;

        let line_subtotal = entry.price().multiply_quantity(line.quantity);

        if line.discount_cents < 0 || line.discount_cents > line_subtotal.cents() {
            return Err(CoreError::InvalidDiscount {
                reason: format!(
                    "line discount {} outside 0..={} for product {}",
                    line.discount_cents,
                    line_subtotal.cents(),
                    line.product_id
                ),
            });
        }

        let line_total = line_subtotal - Money::from_cents(line.discount_cents);

        subtotal += line_total;
        tax_numerator += line_total.tax_numerator(entry.tax_rate());

        priced.push(PricedLine {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_cents: entry.price_cents,
            discount_cents: line.discount_cents,
            total_cents: line_total.cents(),
        });
    }

    let tax = Money::round_tax_sum(tax_numerator);
    let order_discount = Money::from_cents(order_discount_cents);

    if order_discount > subtotal + tax {
        return Err(CoreError::InvalidDiscount {
            reason: format!(
                "order discount {} exceeds subtotal + tax ({})",
                order_discount,
                subtotal + tax
            ),
        });
    }

    let total = subtotal + tax - order_discount;

    Ok(PricingResult {
        lines: priced,
        subtotal_cents: subtotal.cents(),
        tax_cents: tax.cents(),
        discount_cents: order_discount.cents(),
        total_cents: total.cents(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(product_id: &str, price_cents: i64, tax_rate_bps: u32) -> CatalogEntry {
        CatalogEntry {
            product_id: product_id.to_string(),
            price_cents,
            tax_rate_bps,
            is_active: true,
        }
    }

    fn catalog(entries: Vec<CatalogEntry>) -> HashMap<String, CatalogEntry> {
        entries
            .into_iter()
            .map(|e| (e.product_id.clone(), e))
            .collect()
    }

    fn line(product_id: &str, quantity: i64) -> CartLine {
        CartLine {
            product_id: product_id.to_string(),
            quantity,
            discount_cents: 0,
        }
    }

    #[test]
    fn test_single_line_with_tax() {
        // 2 × $45.00 at 15.5%: subtotal $90.00, tax $13.95, total $103.95
        let catalog = catalog(vec![entry("p1", 4500, 1550)]);
        let result = price_cart(&[line("p1", 2)], &catalog, 0).unwrap();

        assert_eq!(result.subtotal_cents, 9000);
        assert_eq!(result.tax_cents, 1395);
        assert_eq!(result.total_cents, 10395);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].unit_price_cents, 4500);
        assert_eq!(result.lines[0].total_cents, 9000);
    }

    #[test]
    fn test_mixed_category_rates() {
        // Flower at 15.5%, edibles at 10%: each line taxed at its own
        // category rate, summed, no blended rate.
        let catalog = catalog(vec![entry("flower", 2000, 1550), entry("edible", 1000, 1000)]);
        let result = price_cart(&[line("flower", 1), line("edible", 1)], &catalog, 0).unwrap();

        assert_eq!(result.subtotal_cents, 3000);
        // 2000×15.5% + 1000×10% = 310 + 100 = 410
        assert_eq!(result.tax_cents, 410);
        assert_eq!(result.total_cents, 3410);
    }

    #[test]
    fn test_line_discount_applied_before_tax() {
        let catalog = catalog(vec![entry("p1", 1000, 1000)]);
        let lines = [CartLine {
            product_id: "p1".to_string(),
            quantity: 2,
            discount_cents: 500,
        }];
        let result = price_cart(&lines, &catalog, 0).unwrap();

        // 2000 − 500 = 1500 subtotal, taxed at 10% = 150
        assert_eq!(result.subtotal_cents, 1500);
        assert_eq!(result.tax_cents, 150);
        assert_eq!(result.total_cents, 1650);
    }

    #[test]
    fn test_order_discount_subtracted_from_total() {
        let catalog = catalog(vec![entry("p1", 1000, 0)]);
        let result = price_cart(&[line("p1", 1)], &catalog, 200).unwrap();

        assert_eq!(result.subtotal_cents, 1000);
        assert_eq!(result.discount_cents, 200);
        assert_eq!(result.total_cents, 800);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let catalog = catalog(vec![]);
        let err = price_cart(&[], &catalog, 0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidLineItem { .. }));
    }

    #[test]
    fn test_zero_and_negative_quantity_rejected() {
        let catalog = catalog(vec![entry("p1", 1000, 0)]);
        assert!(matches!(
            price_cart(&[line("p1", 0)], &catalog, 0),
            Err(CoreError::InvalidLineItem { .. })
        ));
        assert!(matches!(
            price_cart(&[line("p1", -3)], &catalog, 0),
            Err(CoreError::InvalidLineItem { .. })
        ));
    }

    #[test]
    fn test_unknown_product_rejected() {
        let catalog = catalog(vec![entry("p1", 1000, 0)]);
        let err = price_cart(&[line("ghost", 1)], &catalog, 0).unwrap_err();
        match err {
            CoreError::UnknownProduct(id) => assert_eq!(id, "ghost"),
            other => panic!("expected UnknownProduct, got {other:?}"),
        }
    }

    #[test]
    fn test_excessive_order_discount_rejected() {
        // $10.00 + 10% tax = $11.00; a $11.01 discount would go negative
        let catalog = catalog(vec![entry("p1", 1000, 1000)]);
        assert!(price_cart(&[line("p1", 1)], &catalog, 1100).is_ok());
        let err = price_cart(&[line("p1", 1)], &catalog, 1101).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscount { .. }));
    }

    #[test]
    fn test_negative_discounts_rejected() {
        let catalog = catalog(vec![entry("p1", 1000, 0)]);
        assert!(matches!(
            price_cart(&[line("p1", 1)], &catalog, -1),
            Err(CoreError::InvalidDiscount { .. })
        ));

        let lines = [CartLine {
            product_id: "p1".to_string(),
            quantity: 1,
            discount_cents: -50,
        }];
        assert!(matches!(
            price_cart(&lines, &catalog, 0),
            Err(CoreError::InvalidDiscount { .. })
        ));
    }

    #[test]
    fn test_line_discount_above_line_subtotal_rejected() {
        let catalog = catalog(vec![entry("p1", 1000, 0)]);
        let lines = [CartLine {
            product_id: "p1".to_string(),
            quantity: 1,
            discount_cents: 1001,
        }];
        assert!(matches!(
            price_cart(&lines, &catalog, 0),
            Err(CoreError::InvalidDiscount { .. })
        ));
    }

    #[test]
    fn test_result_invariants_hold() {
        let catalog = catalog(vec![entry("a", 333, 825), entry("b", 777, 1550)]);
        let lines = [line("a", 3), line("b", 2)];
        let result = price_cart(&lines, &catalog, 100).unwrap();

        let line_sum: i64 = result.lines.iter().map(|l| l.total_cents).sum();
        assert_eq!(result.subtotal_cents, line_sum);
        assert_eq!(
            result.total_cents,
            result.subtotal_cents + result.tax_cents - result.discount_cents
        );
    }
}
