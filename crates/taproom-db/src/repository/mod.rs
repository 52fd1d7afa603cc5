//! # Repository Module
//!
//! Database repository implementations for Taproom POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Till command                                                          │
//! │       │                                                                 │
//! │       │  db.tickets().add_item(ticket, product, 2, 2500)               │
//! │       ▼                                                                 │
//! │  TicketRepository                                                      │
//! │  ├── validate (taproom-core)                                           │
//! │  ├── BEGIN                                                             │
//! │  ├── merge or insert line                                              │
//! │  ├── recompute totals (taproom-core::ticket::recompute)                │
//! │  └── COMMIT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD, search, guarded delete
//! - [`TicketRepository`](ticket::TicketRepository) - Open tickets and their lines
//! - [`SaleRepository`](sale::SaleRepository) - Checkout and sale history
//! - [`ReportRepository`](report::ReportRepository) - Date-ranged aggregates

pub mod product;
pub mod report;
pub mod sale;
pub mod ticket;
