//! # Sale Repository
//!
//! Checkout and sale history.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     checkout(ticket_id)  ── ONE TRANSACTION            │
//! │                                                                         │
//! │  1. Load ticket pay_method (missing ticket → NotFound)                 │
//! │     └── unset → "efectivo"                                             │
//! │  2. Load lines (none → EmptyTicket)                                    │
//! │  3. subtotal = recompute(lines)   (never the cached pending_total)     │
//! │  4. INSERT sales (created_at, subtotal, total, pay_method, 'paid')     │
//! │  5. INSERT sale_items per line, gain_per_unit carried forward          │
//! │  6. DELETE open_tickets (cascade removes its lines)                    │
//! │  7. COMMIT → sale_id                                                   │
//! │                                                                         │
//! │  Any `?` before COMMIT drops the transaction: rolled back, the ticket  │
//! │  stays open and no sale row exists.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales and sale items are never updated after they are written.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::clock::{format_timestamp, local_now, today};
use crate::error::{DbError, DbResult};
use taproom_core::ticket::{recompute, resolve_pay_method, LineAmount};
use taproom_core::{CoreError, PayMethod, Sale, SaleItem, SaleStatus};

const SALE_COLUMNS: &str = "id, created_at, subtotal, total, pay_method, status";

/// A ticket line as checkout copies it.
#[derive(Debug, sqlx::FromRow)]
struct CheckoutLine {
    product_id: i64,
    qty: i64,
    unit_price: i64,
    display_name: Option<String>,
    gain_per_unit: i64,
}

impl LineAmount for CheckoutLine {
    fn qty(&self) -> i64 {
        self.qty
    }

    fn unit_price(&self) -> i64 {
        self.unit_price
    }
}

/// Repository for sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Converts an open ticket into a sale stamped with the current local
    /// time and returns the sale id.
    pub async fn checkout(&self, ticket_id: i64) -> DbResult<i64> {
        self.checkout_at(ticket_id, local_now()).await
    }

    /// Converts an open ticket into a sale stamped `at`.
    ///
    /// ## Errors
    /// - `NotFound` when the ticket does not exist
    /// - `Domain(EmptyTicket)` when it has no lines
    ///
    /// Either way nothing is written.
    pub async fn checkout_at(&self, ticket_id: i64, at: NaiveDateTime) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let pay_method: Option<PayMethod> =
            sqlx::query_scalar::<_, Option<PayMethod>>("SELECT pay_method FROM open_tickets WHERE id = ?1")
                .bind(ticket_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("Ticket", ticket_id))?;
        let pay_method = resolve_pay_method(pay_method);

        let lines = sqlx::query_as::<_, CheckoutLine>(
            r#"
            SELECT product_id, qty, unit_price, display_name, gain_per_unit
            FROM open_ticket_items
            WHERE ticket_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(CoreError::EmptyTicket(ticket_id).into());
        }

        let totals = recompute(&lines);

        let sale_id = sqlx::query(
            r#"
            INSERT INTO sales (created_at, subtotal, total, pay_method, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(format_timestamp(at))
        .bind(totals.subtotal)
        .bind(totals.total)
        .bind(pay_method)
        .bind(SaleStatus::Paid)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO sale_items
                    (sale_id, product_id, qty, unit_price, line_total, display_name, gain_per_unit)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.qty)
            .bind(line.unit_price)
            .bind(line.line_total().units())
            .bind(&line.display_name)
            .bind(line.gain_per_unit)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM open_tickets WHERE id = ?1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            sale_id,
            ticket_id,
            lines = lines.len(),
            total = totals.total,
            pay_method = %pay_method,
            "Sale recorded"
        );

        Ok(sale_id)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, named by display name when the line was
    /// ad-hoc and by product name otherwise.
    pub async fn get_items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT
                si.id,
                si.sale_id,
                si.product_id,
                COALESCE(si.display_name, p.name) AS product_name,
                si.qty,
                si.unit_price,
                si.line_total,
                si.gain_per_unit
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = ?1
            ORDER BY si.id ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Sales of one local calendar day (today when `None`), newest first.
    pub async fn list_for_day(&self, day: Option<NaiveDate>) -> DbResult<Vec<Sale>> {
        let day = day.unwrap_or_else(today);
        self.list_in_range(day, day).await
    }

    /// Sales between two local calendar dates, inclusive, newest first.
    pub async fn list_in_range(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Sale>> {
        debug!(%from, %to, "Listing sales");

        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE date(created_at) BETWEEN ?1 AND ?2
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use taproom_core::{GainRule, NewProduct};

    async fn setup() -> (Database, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ipa = db
            .products()
            .create(NewProduct::new("IPA Lata 473ml", 2500).purchase_price(1200))
            .await
            .unwrap()
            .id;
        let apa = db
            .products()
            .create(NewProduct::new("APA Botella 330ml", 2200).purchase_price(1000))
            .await
            .unwrap()
            .id;
        (db, ipa, apa)
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 15, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_moves_ticket_into_sale() {
        let (db, ipa, apa) = setup().await;
        let ticket = db.tickets().create_ticket(Some("Mesa 1")).await.unwrap();
        db.tickets().add_item(ticket, ipa, 2, 2500).await.unwrap();
        db.tickets().add_item(ticket, apa, 1, 2200).await.unwrap();
        db.tickets()
            .add_common_item(ticket, 1, 3000, Some("Vaso shop"), GainRule::Flat(800))
            .await
            .unwrap();

        let sale_id = db.sales().checkout(ticket).await.unwrap();

        assert_eq!(count(&db, "sales").await, 1);
        assert_eq!(count(&db, "sale_items").await, 3);
        assert_eq!(count(&db, "open_tickets").await, 0);
        assert_eq!(count(&db, "open_ticket_items").await, 0);

        let sale = db.sales().get_by_id(sale_id).await.unwrap().unwrap();
        assert_eq!(sale.subtotal, 10200);
        assert_eq!(sale.total, sale.subtotal);
        assert_eq!(sale.pay_method, PayMethod::Cash);
        assert_eq!(sale.status, SaleStatus::Paid);

        let items = db.sales().get_items(sale_id).await.unwrap();
        assert_eq!(items[0].product_name, "IPA Lata 473ml");
        assert_eq!(items[0].line_total, 5000);
        assert_eq!(items[0].gain_per_unit, 0);
        assert_eq!(items[2].product_name, "Vaso shop");
        assert_eq!(items[2].gain_per_unit, 800);
    }

    #[tokio::test]
    async fn test_checkout_keeps_ticket_pay_method() {
        let (db, ipa, _) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, ipa, 1, 2500).await.unwrap();
        db.tickets()
            .set_pay_method(ticket, Some(PayMethod::Transfer))
            .await
            .unwrap();

        let sale_id = db.sales().checkout(ticket).await.unwrap();
        let sale = db.sales().get_by_id(sale_id).await.unwrap().unwrap();
        assert_eq!(sale.pay_method, PayMethod::Transfer);
    }

    #[tokio::test]
    async fn test_empty_ticket_is_refused() {
        let (db, _, _) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let err = db.sales().checkout(ticket).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyTicket(id)) if id == ticket));

        assert_eq!(count(&db, "sales").await, 0);
        assert!(db.tickets().get_ticket(ticket).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_ticket_is_not_found() {
        let (db, _, _) = setup().await;
        let err = db.sales().checkout(77).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(count(&db, "sales").await, 0);
    }

    #[tokio::test]
    async fn test_failure_mid_checkout_rolls_back() {
        let (db, ipa, apa) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, ipa, 2, 2500).await.unwrap();
        db.tickets().add_item(ticket, apa, 13, 2200).await.unwrap();

        // Fail on the second sale item, after the header and first item
        sqlx::query(
            r#"
            CREATE TRIGGER fail_sale_item BEFORE INSERT ON sale_items
            WHEN NEW.qty = 13
            BEGIN
                SELECT RAISE(ABORT, 'injected failure');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let before = db.tickets().get_ticket(ticket).await.unwrap().unwrap();

        assert!(db.sales().checkout(ticket).await.is_err());

        assert_eq!(count(&db, "sales").await, 0);
        assert_eq!(count(&db, "sale_items").await, 0);

        let after = db.tickets().get_ticket(ticket).await.unwrap().unwrap();
        assert_eq!(after, before);
        assert_eq!(db.tickets().list_items(ticket).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subtotal_ignores_stale_cache() {
        let (db, ipa, _) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, ipa, 3, 2500).await.unwrap();

        sqlx::query("UPDATE open_tickets SET pending_total = 1 WHERE id = ?1")
            .bind(ticket)
            .execute(db.pool())
            .await
            .unwrap();

        let sale_id = db.sales().checkout(ticket).await.unwrap();
        let sale = db.sales().get_by_id(sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total, 7500);
    }

    #[tokio::test]
    async fn test_list_for_day_and_range() {
        let (db, ipa, _) = setup().await;

        let mut ids = Vec::new();
        for (day, hour) in [(1, 10), (1, 18), (3, 12)] {
            let ticket = db.tickets().create_ticket(None).await.unwrap();
            db.tickets().add_item(ticket, ipa, 1, 2500).await.unwrap();
            ids.push(db.sales().checkout_at(ticket, at(day, hour)).await.unwrap());
        }

        let first_day = db
            .sales()
            .list_for_day(NaiveDate::from_ymd_opt(2024, 5, 1))
            .await
            .unwrap();
        let listed: Vec<i64> = first_day.iter().map(|s| s.id).collect();
        assert_eq!(listed, vec![ids[1], ids[0]]);
        assert_eq!(first_day[0].created_at, at(1, 18));

        let range = db
            .sales()
            .list_in_range(
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(range.len(), 3);

        let inverted = db
            .sales()
            .list_in_range(
                NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            )
            .await
            .unwrap();
        assert!(inverted.is_empty());
    }
}
