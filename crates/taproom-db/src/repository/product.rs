//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - CRUD with validation before any statement runs
//! - Name/barcode search
//! - Guarded delete and force delete
//! - Lazy "Producto común" row and demo seeding
//!
//! ## Delete vs Force Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete(id)                                                             │
//! │       │                                                                 │
//! │       ├── referenced by open-ticket lines or sale lines?                │
//! │       │        └── Err(ProductInUse { open_ticket_lines, sale_lines })  │
//! │       ├── no row?  └── Err(NotFound)                                    │
//! │       └── Ok(())                                                        │
//! │                                                                         │
//! │  force_delete(id)   (one transaction)                                   │
//! │       ├── DELETE open_ticket_items WHERE product_id                     │
//! │       ├── DELETE sale_items        WHERE product_id                     │
//! │       ├── DELETE products          WHERE id   (none? → rollback)        │
//! │       ├── recompute totals of every ticket that lost a line             │
//! │       └── COMMIT   (sale headers keep their totals)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::clock::local_now;
use crate::error::{DbError, DbResult};
use crate::repository::ticket::recalc_totals;
use taproom_core::validation::{
    validate_barcode, validate_price, validate_product_name, validate_search_query,
};
use taproom_core::{CoreError, NewProduct, Product, ProductUpdate, COMMON_PRODUCT_NAME};

/// Catalog inserted into an empty database: (name, sale_price, purchase_price, barcode).
pub const DEMO_PRODUCTS: [(&str, i64, i64, &str); 6] = [
    ("IPA Lata 473ml", 2500, 1200, "780000000001"),
    ("APA Botella 330ml", 2200, 1000, "780000000002"),
    ("Stout Lata 473ml", 2800, 1500, "780000000003"),
    ("Amber Ale Lata 473ml", 2400, 1100, "780000000004"),
    ("Porter Botella 330ml", 2300, 1000, "780000000005"),
    ("Pilsner Lata 473ml", 2100, 950, "780000000006"),
];

const PRODUCT_COLUMNS: &str = "id, name, sale_price, purchase_price, barcode";

/// What a force delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForceDeleteReport {
    pub open_ticket_lines: u64,
    pub sale_lines: u64,
    pub tickets_recomputed: usize,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by exact barcode.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1"
        ))
        .bind(barcode.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets the first product (lowest id) with exactly this name.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = ?1 ORDER BY id LIMIT 1"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Searches products by name or barcode substring, ordered by name.
    ///
    /// An empty query lists the whole catalog.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, "Searching products");

        let products = if query.is_empty() {
            sqlx::query_as::<_, Product>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id"
            ))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Product>(&format!(
                r#"
                SELECT {PRODUCT_COLUMNS}
                FROM products
                WHERE name LIKE '%' || ?1 || '%'
                   OR IFNULL(barcode, '') LIKE '%' || ?1 || '%'
                ORDER BY name, id
                "#
            ))
            .bind(&query)
            .fetch_all(&self.pool)
            .await?
        };

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Number of products in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts `(open_ticket_lines, sale_lines)` that reference a product.
    pub async fn usage(&self, id: i64) -> DbResult<(i64, i64)> {
        let mut conn = self.pool.acquire().await?;
        usage_counts(&mut conn, id).await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a product.
    ///
    /// The name is trimmed, a blank barcode is stored as NULL, and a barcode
    /// already in use fails with `UniqueViolation`.
    pub async fn create(&self, product: NewProduct) -> DbResult<Product> {
        let name = validate_product_name(&product.name)?;
        validate_price("sale_price", product.sale_price)?;
        validate_price("purchase_price", product.purchase_price)?;
        let barcode = validate_barcode(product.barcode.as_deref())?;

        debug!(name = %name, barcode = ?barcode, "Creating product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (name, sale_price, purchase_price, barcode)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&name)
        .bind(product.sale_price)
        .bind(product.purchase_price)
        .bind(&barcode)
        .execute(&self.pool)
        .await
        .map_err(|e| barcode_conflict(e, barcode.as_deref()))?;

        Ok(Product {
            id: result.last_insert_rowid(),
            name,
            sale_price: product.sale_price,
            purchase_price: product.purchase_price,
            barcode,
        })
    }

    /// Applies a partial update and returns the number of rows changed.
    ///
    /// Zero when the update is empty or the product does not exist.
    pub async fn update(&self, id: i64, update: ProductUpdate) -> DbResult<u64> {
        if update.is_empty() {
            return Ok(0);
        }

        let name = update
            .name
            .as_deref()
            .map(validate_product_name)
            .transpose()?;
        if let Some(price) = update.sale_price {
            validate_price("sale_price", price)?;
        }
        if let Some(price) = update.purchase_price {
            validate_price("purchase_price", price)?;
        }
        let barcode = match &update.barcode {
            Some(barcode) => Some(validate_barcode(barcode.as_deref())?),
            None => None,
        };

        debug!(id, "Updating product");

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE products SET ");
        let mut sets = builder.separated(", ");
        if let Some(name) = &name {
            sets.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(price) = update.sale_price {
            sets.push("sale_price = ").push_bind_unseparated(price);
        }
        if let Some(price) = update.purchase_price {
            sets.push("purchase_price = ").push_bind_unseparated(price);
        }
        if let Some(barcode) = &barcode {
            sets.push("barcode = ").push_bind_unseparated(barcode.clone());
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| barcode_conflict(e, barcode.as_ref().and_then(|b| b.as_deref())))?;

        Ok(result.rows_affected())
    }

    /// Returns the id of the "Producto común" row, creating it with zero
    /// prices on first use.
    pub async fn ensure_common_product(&self) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        common_product_id(&mut conn).await
    }

    /// Inserts the demo beers when the catalog is empty. Returns how many
    /// products were inserted.
    pub async fn ensure_demo_products(&self) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for (name, sale_price, purchase_price, barcode) in DEMO_PRODUCTS {
            inserted += sqlx::query(
                "INSERT INTO products (name, sale_price, purchase_price, barcode) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(name)
            .bind(sale_price)
            .bind(purchase_price)
            .bind(barcode)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        info!(inserted, "Seeded demo products");
        Ok(inserted)
    }

    /// Deletes a product that nothing references.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let (open_ticket_lines, sale_lines) = usage_counts(&mut tx, id).await?;

        if open_ticket_lines > 0 || sale_lines > 0 {
            warn!(
                id,
                open_ticket_lines, sale_lines, "Refusing to delete product in use"
            );
            return Err(CoreError::ProductInUse {
                product_id: id,
                open_ticket_lines,
                sale_lines,
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        tx.commit().await?;
        info!(id, "Deleted product");
        Ok(())
    }

    /// Deletes a product together with every line that references it.
    ///
    /// Sale headers are kept with their original totals. Open tickets that
    /// lost a line get their totals recomputed in the same transaction.
    pub async fn force_delete(&self, id: i64) -> DbResult<ForceDeleteReport> {
        let mut tx = self.pool.begin().await?;

        let affected_tickets: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT ticket_id FROM open_ticket_items WHERE product_id = ?1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let open_ticket_lines = sqlx::query("DELETE FROM open_ticket_items WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let sale_lines = sqlx::query("DELETE FROM sale_items WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // tx dropped here: rolled back
            return Err(DbError::not_found("Product", id));
        }

        let now = local_now();
        for ticket_id in &affected_tickets {
            recalc_totals(&mut *tx, *ticket_id, now).await?;
        }

        tx.commit().await?;

        warn!(
            id,
            open_ticket_lines,
            sale_lines,
            tickets = affected_tickets.len(),
            "Force-deleted product"
        );

        Ok(ForceDeleteReport {
            open_ticket_lines,
            sale_lines,
            tickets_recomputed: affected_tickets.len(),
        })
    }
}

/// Looks up the common product by exact name, inserting it if absent.
/// The check and the delete that depends on it share one transaction.
async fn usage_counts(conn: &mut SqliteConnection, id: i64) -> DbResult<(i64, i64)> {
    let open_ticket_lines: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM open_ticket_items WHERE product_id = ?1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

    let sale_lines: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE product_id = ?1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

    Ok((open_ticket_lines, sale_lines))
}

pub(crate) async fn common_product_id(conn: &mut SqliteConnection) -> DbResult<i64> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM products WHERE name = ?1 ORDER BY id LIMIT 1")
            .bind(COMMON_PRODUCT_NAME)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id = sqlx::query(
        "INSERT INTO products (name, sale_price, purchase_price, barcode) VALUES (?1, 0, 0, NULL)",
    )
    .bind(COMMON_PRODUCT_NAME)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    info!(id, "Created common product");
    Ok(id)
}

/// Fills in the offending barcode on a UNIQUE violation.
fn barcode_conflict(err: sqlx::Error, barcode: Option<&str>) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("barcode", barcode.unwrap_or_default())
        }
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_trims_and_normalizes() {
        let db = setup().await;
        let product = db
            .products()
            .create(NewProduct::new("  IPA Lata 473ml ", 2500).barcode("   "))
            .await
            .unwrap();

        assert_eq!(product.name, "IPA Lata 473ml");
        assert_eq!(product.purchase_price, 0);
        assert_eq!(product.barcode, None);

        let stored = db.products().get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored, product);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input_before_writing() {
        let db = setup().await;

        let err = db.products().create(NewProduct::new("", 100)).await.unwrap_err();
        assert!(err.is_domain());

        let err = db
            .products()
            .create(NewProduct::new("Stout", -1))
            .await
            .unwrap_err();
        assert!(err.is_domain());

        let err = db
            .products()
            .create(NewProduct::new("Stout", 100).purchase_price(-5))
            .await
            .unwrap_err();
        assert!(err.is_domain());

        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_barcode() {
        let db = setup().await;
        db.products()
            .create(NewProduct::new("IPA", 2500).barcode("780000000001"))
            .await
            .unwrap();

        let err = db
            .products()
            .create(NewProduct::new("APA", 2200).barcode("780000000001"))
            .await
            .unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "barcode");
                assert_eq!(value, "780000000001");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = setup().await;
        let product = db
            .products()
            .create(NewProduct::new("Porter", 2300).barcode("780000000005"))
            .await
            .unwrap();

        let rows = db
            .products()
            .update(
                product.id,
                ProductUpdate {
                    sale_price: Some(2400),
                    barcode: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let stored = db.products().get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Porter");
        assert_eq!(stored.sale_price, 2400);
        assert_eq!(stored.barcode, None);

        assert_eq!(
            db.products()
                .update(product.id, ProductUpdate::default())
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            db.products()
                .update(
                    9999,
                    ProductUpdate {
                        name: Some("Ghost".to_string()),
                        ..Default::default()
                    }
                )
                .await
                .unwrap(),
            0
        );

        let err = db
            .products()
            .update(
                product.id,
                ProductUpdate {
                    purchase_price: Some(-1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_domain());
    }

    #[tokio::test]
    async fn test_search_by_name_and_barcode() {
        let db = setup().await;
        db.products().ensure_demo_products().await.unwrap();

        let lata = db.products().search("lata").await.unwrap();
        let names: Vec<_> = lata.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Amber Ale Lata 473ml",
                "IPA Lata 473ml",
                "Pilsner Lata 473ml",
                "Stout Lata 473ml"
            ]
        );

        let by_code = db.products().search("0000003").await.unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].name, "Stout Lata 473ml");

        assert_eq!(db.products().search("  ").await.unwrap().len(), 6);
        assert!(db.products().search("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_demo_products_only_into_empty_catalog() {
        let db = setup().await;

        assert_eq!(db.products().ensure_demo_products().await.unwrap(), 6);
        assert_eq!(db.products().ensure_demo_products().await.unwrap(), 0);
        assert_eq!(db.products().count().await.unwrap(), 6);

        let ipa = db
            .products()
            .find_by_barcode("780000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ipa.name, "IPA Lata 473ml");
        assert_eq!(ipa.purchase_price, 1200);
    }

    #[tokio::test]
    async fn test_common_product_is_idempotent() {
        let db = setup().await;

        let first = db.products().ensure_common_product().await.unwrap();
        let second = db.products().ensure_common_product().await.unwrap();
        assert_eq!(first, second);

        let common = db
            .products()
            .find_by_name(COMMON_PRODUCT_NAME)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(common.id, first);
        assert_eq!(common.sale_price, 0);
        assert_eq!(common.purchase_price, 0);
    }

    #[tokio::test]
    async fn test_delete_unused_and_missing() {
        let db = setup().await;
        let product = db.products().create(NewProduct::new("APA", 2200)).await.unwrap();

        db.products().delete(product.id).await.unwrap();
        assert!(db.products().get_by_id(product.id).await.unwrap().is_none());

        let err = db.products().delete(product.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_in_use_is_refused() {
        let db = setup().await;
        let product = db.products().create(NewProduct::new("Stout", 2800)).await.unwrap();
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, product.id, 1, 2800).await.unwrap();

        let err = db.products().delete(product.id).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::ProductInUse {
                open_ticket_lines,
                sale_lines,
                ..
            }) => {
                assert_eq!(open_ticket_lines, 1);
                assert_eq!(sale_lines, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(db.products().get_by_id(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_checks_sale_lines_and_frees_after_ticket_goes() {
        let db = setup().await;
        let sold = db.products().create(NewProduct::new("Porter", 2600)).await.unwrap();
        let queued = db.products().create(NewProduct::new("Kolsch", 1900)).await.unwrap();

        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, sold.id, 1, 2600).await.unwrap();
        db.sales().checkout(ticket).await.unwrap();

        let err = db.products().delete(sold.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductInUse { sale_lines: 1, .. })
        ));
        assert_eq!(db.products().usage(sold.id).await.unwrap(), (0, 1));

        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, queued.id, 1, 1900).await.unwrap();
        assert!(db.products().delete(queued.id).await.is_err());

        db.tickets().delete_ticket(ticket).await.unwrap();
        db.products().delete(queued.id).await.unwrap();
        assert!(db.products().get_by_id(queued.id).await.unwrap().is_none());
        assert!(db.products().get_by_id(sold.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_force_delete_cascades_and_recomputes() {
        let db = setup().await;
        let stout = db.products().create(NewProduct::new("Stout", 2800)).await.unwrap();
        let ipa = db.products().create(NewProduct::new("IPA", 2500)).await.unwrap();

        // A historical sale with both products
        let sold = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(sold, stout.id, 1, 2800).await.unwrap();
        db.tickets().add_item(sold, ipa.id, 2, 2500).await.unwrap();
        let sale_id = db.sales().checkout(sold).await.unwrap();

        // An open ticket still holding the product
        let open = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(open, stout.id, 2, 2800).await.unwrap();
        db.tickets().add_item(open, ipa.id, 1, 2500).await.unwrap();

        assert!(db.products().delete(stout.id).await.is_err());

        let report = db.products().force_delete(stout.id).await.unwrap();
        assert_eq!(report.open_ticket_lines, 1);
        assert_eq!(report.sale_lines, 1);
        assert_eq!(report.tickets_recomputed, 1);

        assert!(db.products().get_by_id(stout.id).await.unwrap().is_none());

        // The sale header survives with its original total
        let sale = db.sales().get_by_id(sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total, 7800);
        assert_eq!(db.sales().get_items(sale_id).await.unwrap().len(), 1);

        let ticket = db.tickets().get_ticket(open).await.unwrap().unwrap();
        assert_eq!(ticket.pending_total, 2500);
    }

    #[tokio::test]
    async fn test_force_delete_missing_changes_nothing() {
        let db = setup().await;
        let err = db.products().force_delete(42).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
