//! # Profit Math
//!
//! Per-line profit and margin used by the sales summary report.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  gain_per_unit ≠ 0  →  profit = qty × gain_per_unit   (ad-hoc)   │
//! │  gain_per_unit = 0  →  profit = qty × (price − cost)  (catalog)  │
//! │                                                                  │
//! │  margin = profit / revenue, averaged over lines with revenue > 0 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use crate::money::Money;

/// Profit of one sold line.
///
/// A catalog product whose purchase price was never entered has cost zero,
/// so its whole revenue counts as profit.
///
/// ```rust
/// use taproom_core::profit::line_profit;
///
/// assert_eq!(line_profit(3, 1000, 600, 0).units(), 1200);
/// assert_eq!(line_profit(2, 2000, 0, 2000).units(), 4000);
/// ```
pub fn line_profit(qty: i64, unit_price: i64, purchase_price: i64, gain_per_unit: i64) -> Money {
    if gain_per_unit != 0 {
        Money::from_units(gain_per_unit).multiply_quantity(qty)
    } else {
        Money::from_units(unit_price - purchase_price).multiply_quantity(qty)
    }
}

/// Arithmetic mean of per-line margins.
///
/// Lines with no revenue are left out of the mean rather than counted as a
/// zero margin.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarginAccumulator {
    sum: f64,
    lines: u64,
}

impl MarginAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, profit: Money, revenue: Money) {
        if revenue.is_positive() {
            self.sum += profit.units() as f64 / revenue.units() as f64;
            self.lines += 1;
        }
    }

    /// Number of lines that entered the mean.
    pub fn counted(&self) -> u64 {
        self.lines
    }

    /// Mean margin as a fraction (0.4 is 40%). Zero when nothing was counted.
    pub fn average(&self) -> f64 {
        if self.lines == 0 {
            0.0
        } else {
            self.sum / self.lines as f64
        }
    }
}

/// `total / count` rounded to the nearest unit, halves away from zero.
/// Zero when `count` is zero.
///
/// ```rust
/// use taproom_core::profit::average_rounded;
///
/// assert_eq!(average_rounded(5000, 2), 2500);
/// assert_eq!(average_rounded(1001, 2), 501);
/// assert_eq!(average_rounded(1000, 0), 0);
/// ```
pub fn average_rounded(total: i64, count: i64) -> i64 {
    if count == 0 {
        return 0;
    }

    let total = total as i128;
    let count = count as i128;
    let half = count.abs() / 2;
    let adjusted = if (total < 0) != (count < 0) {
        total - half * count.signum()
    } else {
        total + half * count.signum()
    };

    (adjusted / count) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_profit_uses_purchase_price() {
        assert_eq!(line_profit(3, 1000, 600, 0).units(), 1200);
        assert_eq!(line_profit(1, 500, 800, 0).units(), -300);
    }

    #[test]
    fn test_adhoc_profit_ignores_purchase_price() {
        assert_eq!(line_profit(2, 2000, 9999, 2000).units(), 4000);
    }

    #[test]
    fn test_margin_skips_zero_revenue() {
        let mut acc = MarginAccumulator::new();
        acc.push(Money::from_units(400), Money::from_units(1000));
        acc.push(Money::from_units(0), Money::from_units(0));
        acc.push(Money::from_units(1000), Money::from_units(1000));

        assert_eq!(acc.counted(), 2);
        assert!((acc.average() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_margin_empty_is_zero() {
        assert_eq!(MarginAccumulator::new().average(), 0.0);
    }

    #[test]
    fn test_average_rounded() {
        assert_eq!(average_rounded(3000, 1), 3000);
        assert_eq!(average_rounded(1000, 3), 333);
        assert_eq!(average_rounded(2000, 3), 667);
        assert_eq!(average_rounded(-1001, 2), -501);
        assert_eq!(average_rounded(0, 0), 0);
    }
}
