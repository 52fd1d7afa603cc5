//! # Product Commands
//!
//! Catalog maintenance and lookup.
//!
//! ## Lookup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier types "7801234567890"                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────┐                         │
//! │  │  Is query a barcode? (8-14 digits)        │                         │
//! │  │  YES: exact barcode lookup first          │──► Found? Return [1]    │
//! │  │  NO:  LIKE search over name and barcode   │                         │
//! │  └───────────────────────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::ApiError;
use taproom_core::{ImportReport, NewProduct, Product, ProductUpdate};
use taproom_db::{Database, ForceDeleteReport};

/// Product as shown to the cashier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    pub sale_price: i64,
    pub purchase_price: i64,
    pub barcode: Option<String>,
    /// True when no purchase price was entered; reports count the whole sale
    /// price as profit.
    pub missing_cost: bool,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            missing_cost: p.purchase_price == 0,
            id: p.id,
            name: p.name,
            sale_price: p.sale_price,
            purchase_price: p.purchase_price,
            barcode: p.barcode,
        }
    }
}

/// Fields accepted by `product add`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub sale_price: i64,
    #[serde(default)]
    pub purchase_price: i64,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// Checks if a query looks like a scanned barcode (EAN-8 up to GTIN-14).
fn is_barcode_query(query: &str) -> bool {
    let len = query.len();
    (8..=14).contains(&len) && query.chars().all(|c| c.is_ascii_digit())
}

/// Searches the catalog. An empty query lists everything.
pub async fn search_products(db: &Database, query: &str) -> Result<Vec<ProductDto>, ApiError> {
    let start = Instant::now();
    let query = query.trim();

    debug!(query = %query, "search_products command");

    if is_barcode_query(query) {
        if let Some(product) = db.products().find_by_barcode(query).await? {
            debug!(barcode = %query, "Barcode hit");
            return Ok(vec![ProductDto::from(product)]);
        }
    }

    let products = db.products().search(query).await?;
    let dtos: Vec<ProductDto> = products.into_iter().map(ProductDto::from).collect();

    debug!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        count = dtos.len(),
        "search_products complete"
    );

    Ok(dtos)
}

pub async fn get_product(db: &Database, id: i64) -> Result<ProductDto, ApiError> {
    let product = db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;
    Ok(ProductDto::from(product))
}

pub async fn create_product(
    db: &Database,
    request: CreateProductRequest,
) -> Result<ProductDto, ApiError> {
    let mut new = NewProduct::new(request.name, request.sale_price)
        .purchase_price(request.purchase_price);
    if let Some(barcode) = request.barcode {
        new = new.barcode(barcode);
    }

    let product = db.products().create(new).await?;
    info!(id = product.id, name = %product.name, "Product created");
    Ok(ProductDto::from(product))
}

/// Applies a partial update and returns the product as stored afterwards.
pub async fn update_product(
    db: &Database,
    id: i64,
    update: ProductUpdate,
) -> Result<ProductDto, ApiError> {
    if update.is_empty() {
        return Err(ApiError::validation("Nothing to update"));
    }

    db.products().update(id, update).await?;
    get_product(db, id).await
}

/// Deletes a product that no ticket or sale refers to.
pub async fn delete_product(db: &Database, id: i64) -> Result<(), ApiError> {
    db.products().delete(id).await?;
    Ok(())
}

/// Deletes a product together with every line that refers to it.
pub async fn force_delete_product(db: &Database, id: i64) -> Result<ForceDeleteReport, ApiError> {
    Ok(db.products().force_delete(id).await?)
}

pub async fn import_products(db: &Database, path: &Path) -> Result<ImportReport, ApiError> {
    Ok(db.interchange().import_products_file(path).await?)
}

/// Returns the number of products written.
pub async fn export_products(db: &Database, path: &Path) -> Result<usize, ApiError> {
    Ok(db.interchange().export_products_file(path).await?)
}

/// Ensures the common product and, on an empty catalog, the demo beers.
pub async fn seed_products(db: &Database) -> Result<u64, ApiError> {
    let inserted = db.products().ensure_demo_products().await?;
    db.products().ensure_common_product().await?;
    Ok(inserted)
}
