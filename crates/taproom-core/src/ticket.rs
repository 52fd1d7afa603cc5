//! # Ticket Math
//!
//! The pure half of the ticket engine: totals, line merging and the gain
//! rule for common products. The repository in taproom-db owns the I/O and
//! calls into here for every decision.
//!
//! ## Recompute Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item / remove_item / update_item_qty / clear_items                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load current lines (same transaction)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  recompute(lines) ← THIS MODULE                                        │
//! │       │   subtotal = Σ qty × unit_price                                 │
//! │       │   discount = 0                                                  │
//! │       │   total    = subtotal                                           │
//! │       ▼                                                                 │
//! │  UPDATE open_tickets SET pending_total, updated_at                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge Rule
//! Adding to a ticket first looks for a line that sells the same thing at
//! the same price:
//! - catalog lines match on `(product_id, unit_price)`
//! - ad-hoc lines match on `(display_name, unit_price, gain_per_unit)`
//!
//! A match has its quantity increased; anything else becomes a new line.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::types::{LineKind, PayMethod, TicketLine, TicketTotals};
use crate::validation::{parse_amount, validate_gain_percent, validate_price};

/// Pay method recorded when a ticket is charged without one.
pub const DEFAULT_PAY_METHOD: PayMethod = PayMethod::Cash;

/// Resolves the pay method a sale is recorded with.
#[inline]
pub fn resolve_pay_method(method: Option<PayMethod>) -> PayMethod {
    method.unwrap_or(DEFAULT_PAY_METHOD)
}

// =============================================================================
// Line Amounts
// =============================================================================

/// Anything with a quantity and a captured unit price.
pub trait LineAmount {
    fn qty(&self) -> i64;
    fn unit_price(&self) -> i64;

    fn line_total(&self) -> Money {
        Money::from_units(self.unit_price()).multiply_quantity(self.qty())
    }
}

impl LineAmount for TicketLine {
    fn qty(&self) -> i64 {
        self.qty
    }

    fn unit_price(&self) -> i64 {
        self.unit_price
    }
}

/// `(qty, unit_price)`
impl LineAmount for (i64, i64) {
    fn qty(&self) -> i64 {
        self.0
    }

    fn unit_price(&self) -> i64 {
        self.1
    }
}

/// Computes the totals of a ticket from its current lines.
///
/// This is the only place ticket totals are decided. An empty ticket totals
/// zero; the discount slot is always zero.
///
/// ```rust
/// use taproom_core::ticket::recompute;
///
/// let totals = recompute(&[(2, 1000), (1, 2500)]);
/// assert_eq!(totals.as_tuple(), (4500, 0, 4500));
/// ```
pub fn recompute<'a, L, I>(lines: I) -> TicketTotals
where
    L: LineAmount + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let subtotal: Money = lines.into_iter().map(LineAmount::line_total).sum();

    TicketTotals {
        subtotal: subtotal.units(),
        discount: 0,
        total: subtotal.units(),
    }
}

// =============================================================================
// Merging
// =============================================================================

/// Finds the existing line that a new `(kind, unit_price)` addition should
/// merge into. Lines are expected in insertion order; the earliest match wins.
pub fn find_merge_target<'a>(
    lines: &'a [TicketLine],
    kind: &LineKind,
    unit_price: i64,
) -> Option<&'a TicketLine> {
    lines
        .iter()
        .find(|line| line.unit_price == unit_price && same_goods(&line.kind, kind))
}

fn same_goods(a: &LineKind, b: &LineKind) -> bool {
    match (a, b) {
        (LineKind::Catalog { product_id: a }, LineKind::Catalog { product_id: b }) => a == b,
        (
            LineKind::AdHoc {
                display_name: name_a,
                gain_per_unit: gain_a,
            },
            LineKind::AdHoc {
                display_name: name_b,
                gain_per_unit: gain_b,
            },
        ) => name_a == name_b && gain_a == gain_b,
        _ => false,
    }
}

// =============================================================================
// Gain Rule
// =============================================================================

/// How the profit of a common (ad-hoc) product is declared at add time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum GainRule {
    /// Whole percent of the unit price, truncated.
    Percent(u32),
    /// Fixed amount per unit.
    Flat(i64),
    /// No declared profit; the line does not contribute to profit reports.
    #[default]
    None,
}

impl GainRule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            GainRule::Percent(percent) => validate_gain_percent(percent),
            GainRule::Flat(amount) => validate_price("gain", amount),
            GainRule::None => Ok(()),
        }
    }

    /// Profit per unit for a line sold at `unit_price`.
    ///
    /// ```rust
    /// use taproom_core::ticket::GainRule;
    ///
    /// assert_eq!(GainRule::Percent(100).gain_per_unit(2000), 2000);
    /// assert_eq!(GainRule::Percent(35).gain_per_unit(2500), 875);
    /// assert_eq!(GainRule::Flat(300).gain_per_unit(2500), 300);
    /// assert_eq!(GainRule::None.gain_per_unit(2500), 0);
    /// ```
    pub fn gain_per_unit(&self, unit_price: i64) -> i64 {
        match *self {
            GainRule::Percent(percent) => Money::from_units(unit_price)
                .percentage_of(percent.saturating_mul(100))
                .units(),
            GainRule::Flat(amount) => amount,
            GainRule::None => 0,
        }
    }
}

/// `35%` is a percentage, `$500` or `500` a flat amount, `none` or an
/// empty string no gain.
impl FromStr for GainRule {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(GainRule::None);
        }

        let rule = match s.strip_suffix('%') {
            Some(percent) => {
                let percent = percent.trim().parse::<u32>().map_err(|_| {
                    ValidationError::InvalidFormat {
                        field: "gain".to_string(),
                        reason: format!("'{}' is not a whole percentage", s),
                    }
                })?;
                GainRule::Percent(percent)
            }
            None => GainRule::Flat(parse_amount(s)?),
        };

        rule.validate()?;
        Ok(rule)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
