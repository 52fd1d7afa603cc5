//! # Product Interchange
//!
//! Semicolon-separated product lists, the format the shop keeps its price
//! lists in.
//!
//! ```text
//! Nombre;PrecioVenta;PrecioCompra;CodigoBarra
//! IPA Lata 473ml;2500;1200;7801234567890
//! Growler 1L;6000;;
//! ```
//!
//! ## Import Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  first row's first cell mentions "nombre"/"name" → header, skipped      │
//! │  blank row                                       → ignored              │
//! │  empty name, bad or negative price, bad barcode  → skipped (counted)    │
//! │                                                                         │
//! │  barcode matches a product   → UPDATE that product                      │
//! │  else name matches exactly   → UPDATE that product                      │
//! │  else                        → INSERT                                   │
//! │                                                                         │
//! │  Never deletes. All rows land in one transaction.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Empty price cells read as zero. Files are read as UTF-8; a cell that is
//! not valid UTF-8 is read as Latin-1, the encoding of older backups.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use taproom_core::validation::{
    parse_amount, validate_barcode, validate_price, validate_product_name,
};
use taproom_core::{ImportReport, Product};

/// Header written on export.
pub const CSV_HEADER: [&str; 4] = ["Nombre", "PrecioVenta", "PrecioCompra", "CodigoBarra"];

const DELIMITER: u8 = b';';

/// One usable import row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportRow {
    name: String,
    sale_price: i64,
    purchase_price: i64,
    barcode: Option<String>,
}

/// CSV import and export of the product catalog.
#[derive(Debug, Clone)]
pub struct ProductInterchange {
    pool: SqlitePool,
}

impl ProductInterchange {
    pub fn new(pool: SqlitePool) -> Self {
        ProductInterchange { pool }
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Writes every product, ordered by name ignoring case. Returns the number
    /// of product rows written.
    pub async fn export_products<W: Write>(&self, writer: W) -> DbResult<usize> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sale_price, purchase_price, barcode
            FROM products
            ORDER BY name COLLATE NOCASE, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut csv = WriterBuilder::new()
            .delimiter(DELIMITER)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);

        csv.write_record(CSV_HEADER)?;
        for product in &products {
            csv.write_record([
                product.name.clone(),
                product.sale_price.to_string(),
                product.purchase_price.to_string(),
                product.barcode.clone().unwrap_or_default(),
            ])?;
        }
        csv.flush()?;

        info!(products = products.len(), "Products exported");
        Ok(products.len())
    }

    pub async fn export_products_file(&self, path: impl AsRef<Path>) -> DbResult<usize> {
        let file = File::create(path.as_ref())?;
        self.export_products(file).await
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Upserts products from a CSV stream.
    ///
    /// A CSV syntax error aborts the import before anything is written.
    pub async fn import_products<R: Read>(&self, reader: R) -> DbResult<ImportReport> {
        let (rows, skipped) = parse_rows(reader)?;

        let mut report = ImportReport {
            skipped,
            ..ImportReport::default()
        };

        let mut tx = self.pool.begin().await?;

        for row in &rows {
            match find_existing(&mut tx, row).await? {
                Some(id) => {
                    sqlx::query(
                        r#"
                        UPDATE products
                        SET name = ?1, sale_price = ?2, purchase_price = ?3, barcode = ?4
                        WHERE id = ?5
                        "#,
                    )
                    .bind(&row.name)
                    .bind(row.sale_price)
                    .bind(row.purchase_price)
                    .bind(&row.barcode)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    report.updated += 1;
                }
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO products (name, sale_price, purchase_price, barcode)
                        VALUES (?1, ?2, ?3, ?4)
                        "#,
                    )
                    .bind(&row.name)
                    .bind(row.sale_price)
                    .bind(row.purchase_price)
                    .bind(&row.barcode)
                    .execute(&mut *tx)
                    .await?;
                    report.created += 1;
                }
            }
        }

        tx.commit().await?;

        info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "Products imported"
        );
        Ok(report)
    }

    pub async fn import_products_file(&self, path: impl AsRef<Path>) -> DbResult<ImportReport> {
        let file = File::open(path.as_ref())?;
        self.import_products(file).await
    }
}

/// Looks a row up by barcode first, then by exact name.
async fn find_existing(conn: &mut SqliteConnection, row: &ImportRow) -> DbResult<Option<i64>> {
    if let Some(barcode) = &row.barcode {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE barcode = ?1")
            .bind(barcode)
            .fetch_optional(&mut *conn)
            .await?;
        if id.is_some() {
            return Ok(id);
        }
    }

    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM products WHERE name = ?1 ORDER BY id LIMIT 1",
    )
    .bind(&row.name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}

/// Reads the whole stream, returning the usable rows and the skipped count.
fn parse_rows<R: Read>(reader: R) -> DbResult<(Vec<ImportRow>, u32)> {
    let mut csv = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0;

    for (index, record) in csv.byte_records().enumerate() {
        let record = decode_record(&record?);

        if index == 0 && is_header(&record) {
            continue;
        }
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        match parse_row(&record) {
            Some(row) => rows.push(row),
            None => {
                debug!(line = index + 1, "Skipping unusable product row");
                skipped += 1;
            }
        }
    }

    Ok((rows, skipped))
}

fn decode_record(record: &ByteRecord) -> StringRecord {
    record.iter().map(decode_cell).collect()
}

/// UTF-8 when valid, otherwise Latin-1 (each byte is its own code point).
fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().copied().map(char::from).collect(),
    }
}

fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map(|cell| {
            let cell = cell.trim().to_lowercase();
            cell.contains("nombre") || cell.contains("name")
        })
        .unwrap_or(false)
}

fn parse_row(record: &StringRecord) -> Option<ImportRow> {
    let name = validate_product_name(record.get(0)?).ok()?;
    let sale_price = price_cell(record.get(1))?;
    let purchase_price = price_cell(record.get(2))?;
    let barcode = validate_barcode(record.get(3)).ok()?;

    Some(ImportRow {
        name,
        sale_price,
        purchase_price,
        barcode,
    })
}

/// Missing or empty cells are zero; negative or oversized amounts are
/// unusable.
fn price_cell(cell: Option<&str>) -> Option<i64> {
    match cell.map(str::trim) {
        None | Some("") => Some(0),
        Some(text) => parse_amount(text)
            .ok()
            .filter(|amount| validate_price("price", *amount).is_ok()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
