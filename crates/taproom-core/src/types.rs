//! # Domain Types
//!
//! Core domain types used throughout Taproom POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   OpenTicket    │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  name           │   │  name?          │   │  created_at     │       │
//! │  │  sale_price     │   │  pay_method?    │   │  subtotal/total │       │
//! │  │  purchase_price │   │  pending_total  │   │  pay_method     │       │
//! │  │  barcode?       │   │  1──* TicketLine│   │  1──* SaleItem  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌──────────────────────────────┐   ┌─────────────────┐                 │
//! │  │          LineKind            │   │   PayMethod     │                 │
//! │  │  ──────────────────────────  │   │  ─────────────  │                 │
//! │  │  Catalog { product_id }      │   │  Cash (default) │                 │
//! │  │  AdHoc { display_name,       │   │  Debit, Credit  │                 │
//! │  │          gain_per_unit }     │   │  Transfer       │                 │
//! │  └──────────────────────────────┘   └─────────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! An open ticket is OPEN until it is either deleted (abandoned) or converted
//! by checkout into a Sale, after which the ticket no longer exists. Sales
//! and their items are never updated.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name shown to the cashier.
    pub name: String,

    /// Current sale price. Ticket lines capture their own copy.
    pub sale_price: i64,

    /// Cost, used for profit reporting. Zero when never entered.
    pub purchase_price: i64,

    /// Unique when present.
    pub barcode: Option<String>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_units(self.sale_price)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_units(self.purchase_price)
    }
}

/// Fields for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub sale_price: i64,
    #[serde(default)]
    pub purchase_price: i64,
    #[serde(default)]
    pub barcode: Option<String>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, sale_price: i64) -> Self {
        NewProduct {
            name: name.into(),
            sale_price,
            ..Default::default()
        }
    }

    pub fn purchase_price(mut self, purchase_price: i64) -> Self {
        self.purchase_price = purchase_price;
        self
    }

    pub fn barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }
}

/// Partial product update. `None` leaves a field untouched.
///
/// `barcode: Some(None)` clears the barcode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sale_price: Option<i64>,
    pub purchase_price: Option<i64>,
    #[ts(type = "string | null")]
    pub barcode: Option<Option<String>>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sale_price.is_none()
            && self.purchase_price.is_none()
            && self.barcode.is_none()
    }
}

// =============================================================================
// Pay Method
// =============================================================================

/// How a ticket was paid.
///
/// Stored as the Spanish label the till has always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PayMethod {
    #[default]
    #[serde(rename = "efectivo")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "efectivo"))]
    Cash,

    #[serde(rename = "debito")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "debito"))]
    Debit,

    #[serde(rename = "credito")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "credito"))]
    Credit,

    #[serde(rename = "transferencia")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "transferencia"))]
    Transfer,
}

impl PayMethod {
    pub const ALL: [PayMethod; 4] = [
        PayMethod::Cash,
        PayMethod::Debit,
        PayMethod::Credit,
        PayMethod::Transfer,
    ];

    /// The stored label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PayMethod::Cash => "efectivo",
            PayMethod::Debit => "debito",
            PayMethod::Credit => "credito",
            PayMethod::Transfer => "transferencia",
        }
    }
}

impl fmt::Display for PayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the stored labels, the labels shown in the charge dialog
/// ("Débito", "Crédito") and English names, case-insensitively.
impl FromStr for PayMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'á' => 'a',
                'é' => 'e',
                'í' => 'i',
                'ó' => 'o',
                'ú' => 'u',
                other => other,
            })
            .collect();

        match normalized.as_str() {
            "efectivo" | "cash" => Ok(PayMethod::Cash),
            "debito" | "debit" => Ok(PayMethod::Debit),
            "credito" | "credit" => Ok(PayMethod::Credit),
            "transferencia" | "transfer" => Ok(PayMethod::Transfer),
            _ => Err(CoreError::UnknownPayMethod(s.to_string())),
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Status of a recorded sale. Written once at checkout and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    Paid,
}

// =============================================================================
// Open Ticket
// =============================================================================

/// An in-progress ticket (shopping cart) that has not been paid yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OpenTicket {
    pub id: i64,
    pub name: Option<String>,
    #[ts(as = "String")]
    pub created_at: NaiveDateTime,
    #[ts(as = "String")]
    pub updated_at: NaiveDateTime,
    pub pay_method: Option<PayMethod>,
    /// Cached `SUM(qty × unit_price)` over the ticket's lines.
    pub pending_total: i64,
}

// =============================================================================
// Ticket Lines
// =============================================================================

/// What a ticket line is selling.
///
/// Catalog lines take their profit from the product's purchase price at
/// report time. Ad-hoc lines ("producto común") sell goods outside the
/// catalog and carry their own profit per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum LineKind {
    Catalog { product_id: i64 },
    AdHoc { display_name: String, gain_per_unit: i64 },
}

impl LineKind {
    /// Profit attributed per unit when the line is sold.
    pub fn gain_per_unit(&self) -> i64 {
        match self {
            LineKind::Catalog { .. } => 0,
            LineKind::AdHoc { gain_per_unit, .. } => *gain_per_unit,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            LineKind::Catalog { .. } => None,
            LineKind::AdHoc { display_name, .. } => Some(display_name),
        }
    }
}

/// A line on an open ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketLine {
    pub id: i64,
    pub ticket_id: i64,
    #[serde(flatten)]
    pub kind: LineKind,
    /// Product name for catalog lines, display name for ad-hoc lines.
    pub name: String,
    pub qty: i64,
    /// Price captured when the line was added.
    pub unit_price: i64,
    /// `qty × unit_price`.
    pub line_total: i64,
}

impl TicketLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_units(self.unit_price).multiply_quantity(self.qty)
    }
}

/// Totals of an open ticket.
///
/// `discount` is always zero; it is kept so callers can rely on a stable
/// `(subtotal, discount, total)` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketTotals {
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
}

impl TicketTotals {
    pub fn as_tuple(&self) -> (i64, i64, i64) {
        (self.subtotal, self.discount, self.total)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    #[ts(as = "String")]
    pub created_at: NaiveDateTime,
    pub subtotal: i64,
    pub total: i64,
    pub pay_method: PayMethod,
    pub status: SaleStatus,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_units(self.total)
    }
}

/// A line item of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub qty: i64,
    pub unit_price: i64,
    pub line_total: i64,
    /// Copied from the ticket line; zero for catalog products.
    pub gain_per_unit: i64,
}

// =============================================================================
// Report Rows
// =============================================================================

/// Sales and profit summary over a date range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    #[ts(as = "String")]
    pub from: NaiveDate,
    #[ts(as = "String")]
    pub to: NaiveDate,
    /// Sum of line revenue (`qty × unit_price`).
    pub revenue: i64,
    pub sales_count: i64,
    /// Average sale total, rounded to the nearest unit.
    pub average_sale: i64,
    pub profit: i64,
    /// Mean of per-line `profit / revenue` over lines with revenue.
    pub average_margin: f64,
    /// Catalog lines whose product has no purchase price recorded; their
    /// whole revenue counts as profit.
    pub lines_without_cost: i64,
}

/// A product ranked by revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TopProduct {
    pub product_id: i64,
    pub name: String,
    pub qty: i64,
    pub revenue: i64,
}

/// Revenue of one time bucket: a day (`YYYY-MM-DD`), an hour (`HH`) or a
/// month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PeriodTotal {
    pub label: String,
    pub total: i64,
}

/// Outcome of a product CSV import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportReport {
    pub created: u32,
    pub updated: u32,
    /// Rows with an empty name or unreadable prices.
    pub skipped: u32,
}

// =============================================================================
// Unit Tests
// =============================================================================
