//! # Till Commands
//!
//! Every operation the till exposes to a front end.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── product.rs  ◄─── Catalog search, CRUD, CSV import/export
//! ├── ticket.rs   ◄─── Open tickets and their lines
//! ├── sale.rs     ◄─── Checkout, receipts, today's sales
//! └── report.rs   ◄─── Summary, top products, period totals
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  till ticket add 3 --barcode 7801234567890 --qty 2                      │
//! │         │                                                               │
//! │         ▼  (cli.rs parses arguments)                                    │
//! │  commands::ticket::add_item(                                            │
//! │      &db,                      ◄── opened once per process             │
//! │      3,                                                                 │
//! │      ProductRef::Barcode(..),                                           │
//! │      2,                                                                 │
//! │      None,                     ◄── catalog price                       │
//! │  ) -> Result<TicketView, ApiError>                                      │
//! │         │                                                               │
//! │         ▼  (serde_json)                                                 │
//! │  stdout: {"ticket":{...},"lines":[...],"totals":{...}}                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take `&Database` plus plain arguments, so a desktop shell can
//! call the same functions the CLI does.

pub mod product;
pub mod report;
pub mod sale;
pub mod ticket;
