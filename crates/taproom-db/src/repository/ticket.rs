//! # Ticket Repository
//!
//! Open tickets (shopping carts) and their lines.
//!
//! ## Invariant
//! After every line mutation `open_tickets.pending_total` equals
//! `SUM(qty × unit_price)` over the ticket's current lines. Each mutating
//! call runs its statements and [`recalc_totals`] in one transaction, and
//! `recalc_totals` asks [`taproom_core::ticket::recompute`] for the numbers.
//!
//! ## Line Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(t, p, 2, 1000)      → new line            qty 2              │
//! │  add_item(t, p, 3, 1000)      → same line merged    qty 5              │
//! │  add_item(t, p, 3, 1500)      → second line         qty 3 @ 1500       │
//! │  update_item_qty(line, 0)     → line deleted                           │
//! │  remove_item(missing)         → nothing happens                        │
//! │                                                                         │
//! │  add_common_item(t, 1, 3000, "Vaso shop", 20%)                          │
//! │       └── line against "Producto común", display_name "Vaso shop",      │
//! │           gain_per_unit 600                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::clock::{format_timestamp, local_now};
use crate::error::DbResult;
use crate::repository::product::common_product_id;
use taproom_core::ticket::{find_merge_target, recompute};
use taproom_core::validation::{validate_display_name, validate_price, validate_quantity};
use taproom_core::{
    GainRule, LineKind, Money, OpenTicket, PayMethod, TicketLine, TicketTotals, ValidationError,
    MAX_ITEM_QUANTITY,
};

const TICKET_COLUMNS: &str = "id, name, created_at, updated_at, pay_method, pending_total";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: i64,
    ticket_id: i64,
    product_id: i64,
    product_name: String,
    qty: i64,
    unit_price: i64,
    display_name: Option<String>,
    gain_per_unit: i64,
}

/// A row with a display name is an ad-hoc line; anything else sells the
/// catalog product it points at.
impl From<LineRow> for TicketLine {
    fn from(row: LineRow) -> Self {
        let (kind, name) = match row.display_name {
            Some(display_name) => (
                LineKind::AdHoc {
                    display_name: display_name.clone(),
                    gain_per_unit: row.gain_per_unit,
                },
                display_name,
            ),
            None => (
                LineKind::Catalog {
                    product_id: row.product_id,
                },
                row.product_name,
            ),
        };

        TicketLine {
            id: row.id,
            ticket_id: row.ticket_id,
            kind,
            name,
            qty: row.qty,
            unit_price: row.unit_price,
            line_total: Money::from_units(row.unit_price)
                .multiply_quantity(row.qty)
                .units(),
        }
    }
}

/// Loads a ticket's lines in insertion order.
pub(crate) async fn load_lines(
    conn: &mut SqliteConnection,
    ticket_id: i64,
) -> DbResult<Vec<TicketLine>> {
    let rows = sqlx::query_as::<_, LineRow>(
        r#"
        SELECT
            i.id,
            i.ticket_id,
            i.product_id,
            p.name AS product_name,
            i.qty,
            i.unit_price,
            i.display_name,
            i.gain_per_unit
        FROM open_ticket_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.ticket_id = ?1
        ORDER BY i.id ASC
        "#,
    )
    .bind(ticket_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(TicketLine::from).collect())
}

/// Recomputes a ticket's totals from its current lines and persists
/// `pending_total` and `updated_at`.
///
/// Must run on the same connection (transaction) as the mutation it
/// follows.
pub(crate) async fn recalc_totals(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    now: NaiveDateTime,
) -> DbResult<TicketTotals> {
    let lines = load_lines(conn, ticket_id).await?;
    let totals = recompute(&lines);

    sqlx::query("UPDATE open_tickets SET pending_total = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(totals.total)
        .bind(format_timestamp(now))
        .bind(ticket_id)
        .execute(&mut *conn)
        .await?;

    debug!(ticket_id, total = totals.total, "Recomputed ticket totals");
    Ok(totals)
}

fn clean_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for open tickets.
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    /// Creates a new TicketRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TicketRepository { pool }
    }

    // =========================================================================
    // Ticket Header
    // =========================================================================

    /// Opens a new, empty ticket. A blank name is stored as NULL.
    pub async fn create_ticket(&self, name: Option<&str>) -> DbResult<i64> {
        let now = format_timestamp(local_now());

        let id = sqlx::query(
            r#"
            INSERT INTO open_tickets (name, created_at, updated_at, pay_method, pending_total)
            VALUES (?1, ?2, ?2, NULL, 0)
            "#,
        )
        .bind(clean_name(name))
        .bind(&now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(ticket_id = id, "Opened ticket");
        Ok(id)
    }

    /// Renames a ticket. Returns 0 when the ticket does not exist.
    pub async fn rename_ticket(&self, ticket_id: i64, name: Option<&str>) -> DbResult<u64> {
        let rows = sqlx::query("UPDATE open_tickets SET name = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(clean_name(name))
            .bind(format_timestamp(local_now()))
            .bind(ticket_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(ticket_id, rows, "Renamed ticket");
        Ok(rows)
    }

    /// Sets or clears the pay method. Returns 0 when the ticket does not exist.
    pub async fn set_pay_method(&self, ticket_id: i64, method: Option<PayMethod>) -> DbResult<u64> {
        let rows =
            sqlx::query("UPDATE open_tickets SET pay_method = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(method)
                .bind(format_timestamp(local_now()))
                .bind(ticket_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        debug!(ticket_id, pay_method = ?method, rows, "Set pay method");
        Ok(rows)
    }

    /// Abandons a ticket; its lines go with it. Returns 0 when the ticket
    /// does not exist.
    pub async fn delete_ticket(&self, ticket_id: i64) -> DbResult<u64> {
        let rows = sqlx::query("DELETE FROM open_tickets WHERE id = ?1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(ticket_id, rows, "Deleted ticket");
        Ok(rows)
    }

    pub async fn get_ticket(&self, ticket_id: i64) -> DbResult<Option<OpenTicket>> {
        let ticket = sqlx::query_as::<_, OpenTicket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM open_tickets WHERE id = ?1"
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    /// Open tickets, most recently touched first.
    pub async fn list_open_tickets(&self) -> DbResult<Vec<OpenTicket>> {
        let tickets = sqlx::query_as::<_, OpenTicket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM open_tickets ORDER BY updated_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    // =========================================================================
    // Lines
    // =========================================================================

    /// Adds a catalog product to a ticket and returns the line id.
    ///
    /// A line with the same product and unit price absorbs the quantity;
    /// a different price always starts a new line. A missing ticket or
    /// product fails with `ForeignKeyViolation`.
    pub async fn add_item(
        &self,
        ticket_id: i64,
        product_id: i64,
        qty: i64,
        unit_price: i64,
    ) -> DbResult<i64> {
        validate_quantity(qty)?;
        validate_price("unit_price", unit_price)?;

        let mut tx = self.pool.begin().await?;
        let line_id = add_line(
            &mut tx,
            ticket_id,
            product_id,
            LineKind::Catalog { product_id },
            qty,
            unit_price,
        )
        .await?;
        tx.commit().await?;

        Ok(line_id)
    }

    /// Adds goods outside the catalog ("producto común") and returns the
    /// line id.
    ///
    /// The line points at the common product row, created on first use,
    /// and carries its own display name and profit per unit. A blank
    /// display name falls back to "Producto común".
    pub async fn add_common_item(
        &self,
        ticket_id: i64,
        qty: i64,
        unit_price: i64,
        display_name: Option<&str>,
        gain: GainRule,
    ) -> DbResult<i64> {
        validate_quantity(qty)?;
        validate_price("unit_price", unit_price)?;
        gain.validate()?;
        let display_name = validate_display_name(display_name)?;

        let kind = LineKind::AdHoc {
            display_name,
            gain_per_unit: gain.gain_per_unit(unit_price),
        };

        let mut tx = self.pool.begin().await?;
        let common_id = common_product_id(&mut tx).await?;
        let line_id = add_line(&mut tx, ticket_id, common_id, kind, qty, unit_price).await?;
        tx.commit().await?;

        Ok(line_id)
    }

    /// Removes a line. Returns false when the line does not exist.
    pub async fn remove_item(&self, item_id: i64) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(ticket_id) = owner_of(&mut tx, item_id).await? else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM open_ticket_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        recalc_totals(&mut tx, ticket_id, local_now()).await?;
        tx.commit().await?;

        debug!(item_id, ticket_id, "Removed line");
        Ok(true)
    }

    /// Sets a line's quantity. Zero or less deletes the line.
    ///
    /// Returns false when the line does not exist.
    pub async fn update_item_qty(&self, item_id: i64, new_qty: i64) -> DbResult<bool> {
        if new_qty > 0 {
            validate_quantity(new_qty)?;
        }

        let mut tx = self.pool.begin().await?;

        let Some(ticket_id) = owner_of(&mut tx, item_id).await? else {
            return Ok(false);
        };

        if new_qty <= 0 {
            sqlx::query("DELETE FROM open_ticket_items WHERE id = ?1")
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query("UPDATE open_ticket_items SET qty = ?1 WHERE id = ?2")
                .bind(new_qty)
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
        }

        recalc_totals(&mut tx, ticket_id, local_now()).await?;
        tx.commit().await?;

        debug!(item_id, ticket_id, new_qty, "Updated line quantity");
        Ok(true)
    }

    /// Removes every line of a ticket and returns how many were removed.
    pub async fn clear_items(&self, ticket_id: i64) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM open_ticket_items WHERE ticket_id = ?1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        recalc_totals(&mut tx, ticket_id, local_now()).await?;
        tx.commit().await?;

        debug!(ticket_id, removed, "Cleared ticket");
        Ok(removed)
    }

    /// A ticket's lines in the order they were added. Empty for a missing
    /// ticket.
    pub async fn list_items(&self, ticket_id: i64) -> DbResult<Vec<TicketLine>> {
        let mut conn = self.pool.acquire().await?;
        load_lines(&mut conn, ticket_id).await
    }

    /// Recomputes and persists a ticket's totals, returning
    /// `(subtotal, 0, total)`.
    pub async fn calc_ticket_totals(&self, ticket_id: i64) -> DbResult<(i64, i64, i64)> {
        let mut tx = self.pool.begin().await?;
        let totals = recalc_totals(&mut tx, ticket_id, local_now()).await?;
        tx.commit().await?;

        Ok(totals.as_tuple())
    }
}

/// Merges into a matching line or inserts a new one, then recomputes.
async fn add_line(
    conn: &mut SqliteConnection,
    ticket_id: i64,
    product_id: i64,
    kind: LineKind,
    qty: i64,
    unit_price: i64,
) -> DbResult<i64> {
    let lines = load_lines(conn, ticket_id).await?;

    let line_id = match find_merge_target(&lines, &kind, unit_price) {
        Some(line) => {
            let merged = line
                .qty
                .checked_add(qty)
                .filter(|merged| *merged <= MAX_ITEM_QUANTITY)
                .ok_or(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_ITEM_QUANTITY,
                })?;

            sqlx::query("UPDATE open_ticket_items SET qty = ?1 WHERE id = ?2")
                .bind(merged)
                .bind(line.id)
                .execute(&mut *conn)
                .await?;

            debug!(ticket_id, line_id = line.id, qty, "Merged into existing line");
            line.id
        }
        None => {
            let id = sqlx::query(
                r#"
                INSERT INTO open_ticket_items
                    (ticket_id, product_id, qty, unit_price, display_name, gain_per_unit)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(ticket_id)
            .bind(product_id)
            .bind(qty)
            .bind(unit_price)
            .bind(kind.display_name())
            .bind(kind.gain_per_unit())
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();

            debug!(ticket_id, line_id = id, product_id, qty, unit_price, "Added line");
            id
        }
    };

    recalc_totals(conn, ticket_id, local_now()).await?;
    Ok(line_id)
}

async fn owner_of(conn: &mut SqliteConnection, item_id: i64) -> DbResult<Option<i64>> {
    let ticket_id = sqlx::query_scalar("SELECT ticket_id FROM open_ticket_items WHERE id = ?1")
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(ticket_id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use taproom_core::{NewProduct, COMMON_PRODUCT_NAME};

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(NewProduct::new("IPA Lata 473ml", 1000).purchase_price(600))
            .await
            .unwrap();
        (db, product.id)
    }

    async fn pending_total_matches_lines(db: &Database, ticket: i64) {
        let ticket_row = db.tickets().get_ticket(ticket).await.unwrap().unwrap();
        let expected: i64 = db
            .tickets()
            .list_items(ticket)
            .await
            .unwrap()
            .iter()
            .map(|l| l.qty * l.unit_price)
            .sum();
        assert_eq!(ticket_row.pending_total, expected);
    }

    #[tokio::test]
    async fn test_create_ticket_starts_empty() {
        let (db, _) = setup().await;
        let id = db.tickets().create_ticket(Some("  Mesa 4 ")).await.unwrap();

        let ticket = db.tickets().get_ticket(id).await.unwrap().unwrap();
        assert_eq!(ticket.name.as_deref(), Some("Mesa 4"));
        assert_eq!(ticket.pending_total, 0);
        assert_eq!(ticket.pay_method, None);
        assert_eq!(ticket.created_at, ticket.updated_at);
    }

    #[tokio::test]
    async fn test_same_price_merges() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let first = db.tickets().add_item(ticket, product, 2, 1000).await.unwrap();
        let second = db.tickets().add_item(ticket, product, 3, 1000).await.unwrap();
        assert_eq!(first, second);

        let lines = db.tickets().list_items(ticket).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].qty, 5);
        assert_eq!(lines[0].line_total, 5000);
        assert_eq!(lines[0].name, "IPA Lata 473ml");
        pending_total_matches_lines(&db, ticket).await;
    }

    #[tokio::test]
    async fn test_different_price_new_line() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        db.tickets().add_item(ticket, product, 2, 1000).await.unwrap();
        db.tickets().add_item(ticket, product, 3, 1500).await.unwrap();

        let lines = db.tickets().list_items(ticket).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!((lines[0].qty, lines[0].unit_price), (2, 1000));
        assert_eq!((lines[1].qty, lines[1].unit_price), (3, 1500));

        let ticket_row = db.tickets().get_ticket(ticket).await.unwrap().unwrap();
        assert_eq!(ticket_row.pending_total, 6500);
    }

    #[tokio::test]
    async fn test_validation_leaves_ticket_untouched() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        assert!(db.tickets().add_item(ticket, product, 0, 1000).await.unwrap_err().is_domain());
        assert!(db.tickets().add_item(ticket, product, -2, 1000).await.unwrap_err().is_domain());
        assert!(db.tickets().add_item(ticket, product, 1, -1).await.unwrap_err().is_domain());

        assert!(db.tickets().list_items(ticket).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_quantity_or_price_is_rejected() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let err = db
            .tickets()
            .add_item(ticket, product, i64::MAX / 2, 3)
            .await
            .unwrap_err();
        assert!(err.is_domain());
        let err = db
            .tickets()
            .add_item(ticket, product, 1, i64::MAX)
            .await
            .unwrap_err();
        assert!(err.is_domain());
        let err = db
            .tickets()
            .add_common_item(ticket, MAX_ITEM_QUANTITY + 1, 1000, None, GainRule::None)
            .await
            .unwrap_err();
        assert!(err.is_domain());

        assert!(db.tickets().list_items(ticket).await.unwrap().is_empty());
        let row = db.tickets().get_ticket(ticket).await.unwrap().unwrap();
        assert_eq!(row.pending_total, 0);
    }

    #[tokio::test]
    async fn test_merge_past_max_quantity_is_rejected() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let line = db
            .tickets()
            .add_item(ticket, product, MAX_ITEM_QUANTITY - 1, 0)
            .await
            .unwrap();
        let err = db.tickets().add_item(ticket, product, 5, 0).await.unwrap_err();
        assert!(err.is_domain());

        // Exactly at the bound still merges
        db.tickets().add_item(ticket, product, 1, 0).await.unwrap();
        let lines = db.tickets().list_items(ticket).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id, line);
        assert_eq!(lines[0].qty, MAX_ITEM_QUANTITY);
        pending_total_matches_lines(&db, ticket).await;
    }

    #[tokio::test]
    async fn test_update_qty_above_max_leaves_line() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        let line = db.tickets().add_item(ticket, product, 2, 1000).await.unwrap();

        let err = db
            .tickets()
            .update_item_qty(line, MAX_ITEM_QUANTITY + 1)
            .await
            .unwrap_err();
        assert!(err.is_domain());

        let lines = db.tickets().list_items(ticket).await.unwrap();
        assert_eq!(lines[0].qty, 2);
        pending_total_matches_lines(&db, ticket).await;
    }

    #[tokio::test]
    async fn test_missing_ticket_or_product_is_foreign_key_violation() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let err = db.tickets().add_item(999, product, 1, 1000).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let err = db.tickets().add_item(ticket, 999, 1, 1000).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_qty_non_positive_deletes() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        let a = db.tickets().add_item(ticket, product, 2, 1000).await.unwrap();
        let b = db.tickets().add_item(ticket, product, 1, 1200).await.unwrap();

        assert!(db.tickets().update_item_qty(a, 7).await.unwrap());
        pending_total_matches_lines(&db, ticket).await;

        assert!(db.tickets().update_item_qty(a, 0).await.unwrap());
        assert!(db.tickets().update_item_qty(b, -5).await.unwrap());

        assert!(db.tickets().list_items(ticket).await.unwrap().is_empty());
        let ticket_row = db.tickets().get_ticket(ticket).await.unwrap().unwrap();
        assert_eq!(ticket_row.pending_total, 0);

        // Vanished line: no-op
        assert!(!db.tickets().update_item_qty(a, 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_item_and_missing_line() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        let a = db.tickets().add_item(ticket, product, 2, 1000).await.unwrap();
        db.tickets().add_item(ticket, product, 1, 900).await.unwrap();

        assert!(db.tickets().remove_item(a).await.unwrap());
        assert!(!db.tickets().remove_item(a).await.unwrap());

        let ticket_row = db.tickets().get_ticket(ticket).await.unwrap().unwrap();
        assert_eq!(ticket_row.pending_total, 900);
    }

    #[tokio::test]
    async fn test_total_tracks_every_mutation() {
        let (db, product) = setup().await;
        let other = db
            .products()
            .create(NewProduct::new("Stout Lata 473ml", 2800))
            .await
            .unwrap()
            .id;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let a = db.tickets().add_item(ticket, product, 1, 1000).await.unwrap();
        pending_total_matches_lines(&db, ticket).await;
        let b = db.tickets().add_item(ticket, other, 2, 2800).await.unwrap();
        pending_total_matches_lines(&db, ticket).await;
        db.tickets().add_item(ticket, product, 4, 1000).await.unwrap();
        pending_total_matches_lines(&db, ticket).await;
        db.tickets().update_item_qty(b, 3).await.unwrap();
        pending_total_matches_lines(&db, ticket).await;
        db.tickets().remove_item(a).await.unwrap();
        pending_total_matches_lines(&db, ticket).await;
        db.tickets()
            .add_common_item(ticket, 2, 1500, None, GainRule::None)
            .await
            .unwrap();
        pending_total_matches_lines(&db, ticket).await;

        assert_eq!(
            db.tickets().calc_ticket_totals(ticket).await.unwrap(),
            (3 * 2800 + 2 * 1500, 0, 3 * 2800 + 2 * 1500)
        );
    }

    #[tokio::test]
    async fn test_common_item_lines() {
        let (db, _) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let vaso = db
            .tickets()
            .add_common_item(ticket, 1, 3000, Some("Vaso shop"), GainRule::Percent(20))
            .await
            .unwrap();
        let again = db
            .tickets()
            .add_common_item(ticket, 2, 3000, Some("Vaso shop"), GainRule::Percent(20))
            .await
            .unwrap();
        assert_eq!(vaso, again);

        // Same price, different gain: separate line
        db.tickets()
            .add_common_item(ticket, 1, 3000, Some("Vaso shop"), GainRule::Flat(100))
            .await
            .unwrap();
        // Blank name falls back to the common product name
        db.tickets()
            .add_common_item(ticket, 1, 500, Some("  "), GainRule::None)
            .await
            .unwrap();

        let lines = db.tickets().list_items(ticket).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].name, "Vaso shop");
        assert_eq!(lines[0].qty, 3);
        assert_eq!(
            lines[0].kind,
            LineKind::AdHoc {
                display_name: "Vaso shop".to_string(),
                gain_per_unit: 600
            }
        );
        assert_eq!(lines[1].kind.gain_per_unit(), 100);
        assert_eq!(lines[2].name, COMMON_PRODUCT_NAME);

        let common = db
            .products()
            .find_by_name(COMMON_PRODUCT_NAME)
            .await
            .unwrap();
        assert!(common.is_some());
    }

    #[tokio::test]
    async fn test_common_line_does_not_merge_with_catalog_line() {
        let (db, _) = setup().await;
        let common = db.products().ensure_common_product().await.unwrap();
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let adhoc = db
            .tickets()
            .add_common_item(ticket, 1, 0, None, GainRule::None)
            .await
            .unwrap();
        let catalog = db.tickets().add_item(ticket, common, 1, 0).await.unwrap();
        assert_ne!(adhoc, catalog);
    }

    #[tokio::test]
    async fn test_header_updates_and_missing_ticket_noop() {
        let (db, _) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        assert_eq!(db.tickets().rename_ticket(ticket, Some("Barra")).await.unwrap(), 1);
        assert_eq!(
            db.tickets()
                .set_pay_method(ticket, Some(PayMethod::Debit))
                .await
                .unwrap(),
            1
        );

        let row = db.tickets().get_ticket(ticket).await.unwrap().unwrap();
        assert_eq!(row.name.as_deref(), Some("Barra"));
        assert_eq!(row.pay_method, Some(PayMethod::Debit));

        assert_eq!(db.tickets().rename_ticket(404, Some("x")).await.unwrap(), 0);
        assert_eq!(db.tickets().set_pay_method(404, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_ticket_cascades_lines() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, product, 2, 1000).await.unwrap();

        assert_eq!(db.tickets().delete_ticket(ticket).await.unwrap(), 1);
        assert!(db.tickets().get_ticket(ticket).await.unwrap().is_none());

        let orphan_lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM open_ticket_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphan_lines, 0);
    }

    #[tokio::test]
    async fn test_clear_items() {
        let (db, product) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, product, 2, 1000).await.unwrap();
        db.tickets().add_item(ticket, product, 2, 800).await.unwrap();

        assert_eq!(db.tickets().clear_items(ticket).await.unwrap(), 2);
        let row = db.tickets().get_ticket(ticket).await.unwrap().unwrap();
        assert_eq!(row.pending_total, 0);
    }

    #[tokio::test]
    async fn test_list_open_tickets_newest_first() {
        let (db, _) = setup().await;
        let a = db.tickets().create_ticket(Some("A")).await.unwrap();
        let b = db.tickets().create_ticket(Some("B")).await.unwrap();

        let ids: Vec<i64> = db
            .tickets()
            .list_open_tickets()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![b, a]);
    }
}
