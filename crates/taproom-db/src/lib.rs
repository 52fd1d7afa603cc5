//! # taproom-db: Database Layer for Taproom POS
//!
//! This crate provides database access for the Taproom POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Taproom POS Data Flow                            │
//! │                                                                         │
//! │  Till command (ticket add, sale checkout, report summary)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    taproom-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ TicketRepo    │    │ 001_initial  │  │   │
//! │  │   │ Connection    │    │ SaleRepo      │    │              │  │   │
//! │  │   │ Management    │    │ ReportRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/taproom/taproom.db                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Products, tickets, sales and reports
//! - [`interchange`] - Semicolon-separated product CSV
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taproom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("taproom.db")).await?;
//!
//! let ticket = db.tickets().create_ticket(None).await?;
//! db.tickets().add_item(ticket, product_id, 3, 1000).await?;
//! let sale_id = db.sales().checkout(ticket).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod interchange;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use interchange::ProductInterchange;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::product::{ForceDeleteReport, ProductRepository};
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::ticket::TicketRepository;
