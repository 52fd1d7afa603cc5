//! # taproom-core: Pure Business Logic for Taproom POS
//!
//! This crate holds the decisions of the till as pure functions with zero
//! I/O dependencies: what a ticket totals, which line an addition merges
//! into, how much a common product earns, and how profit is attributed.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Taproom POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Till (apps/till)                             │   │
//! │  │    config ──► commands ──► ApiError ──► JSON on stdout         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ taproom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ticket   │  │  profit   │  │   │
//! │  │   │  Product  │  │   Money   │  │ recompute │  │ line math │  │   │
//! │  │   │   Sale    │  │  $1.234   │  │ GainRule  │  │  margins  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  taproom-db (Database Layer)                    │   │
//! │  │        SQLite repositories, checkout transaction, reports       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, OpenTicket, TicketLine, Sale, ...)
//! - [`money`] - Money type over whole currency units
//! - [`ticket`] - Ticket totals, merge rule, common-product gain
//! - [`profit`] - Per-line profit and margin averaging
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use taproom_core::ticket::{recompute, GainRule};
//!
//! let totals = recompute(&[(2, 2500), (1, 2200)]);
//! assert_eq!(totals.total, 7200);
//!
//! // A common product sold at $2.000 with 100% markup earns $2.000 per unit
//! assert_eq!(GainRule::Percent(100).gain_per_unit(2000), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod profit;
pub mod ticket;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use ticket::{GainRule, DEFAULT_PAY_METHOD};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Name of the catalog row that ad-hoc lines point at.
///
/// The row is created lazily the first time a common product is sold and is
/// looked up by this exact name.
pub const COMMON_PRODUCT_NAME: &str = "Producto común";

/// Largest quantity a single ticket line may hold.
pub const MAX_ITEM_QUANTITY: i64 = 1_000_000;

/// Largest unit price (sale or purchase) accepted, in whole units.
///
/// Together with [`MAX_ITEM_QUANTITY`] this keeps every line total far
/// below `i64::MAX`.
pub const MAX_PRICE: i64 = 1_000_000_000;

/// Storage format of every timestamp: local wall-clock time, whole seconds.
///
/// SQLite's `date()` and `strftime()` understand it directly.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
