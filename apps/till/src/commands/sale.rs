//! # Sale Commands
//!
//! Charging a ticket and looking at what was sold.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::info;

use crate::config::TillConfig;
use crate::error::ApiError;
use taproom_core::{Sale, SaleItem};
use taproom_db::Database;

/// A recorded sale with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

impl Receipt {
    /// Plain-text receipt for the counter printer.
    pub fn to_text(&self, config: &TillConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Venta #{}  {}",
            self.sale.id,
            self.sale.created_at.format("%d-%m-%Y %H:%M")
        );
        for item in &self.items {
            let _ = writeln!(
                out,
                "{:>3} x {:<28} {:>10}",
                item.qty,
                item.product_name,
                config.format_currency(item.line_total)
            );
        }
        let _ = writeln!(out, "TOTAL {:>36}", config.format_currency(self.sale.total));
        let _ = write!(out, "Pago: {}", self.sale.pay_method);
        out
    }
}

/// Charges a ticket. The ticket disappears and a sale takes its place.
pub async fn checkout(db: &Database, ticket_id: i64) -> Result<Receipt, ApiError> {
    let sale_id = db.sales().checkout(ticket_id).await?;
    let receipt = get_sale(db, sale_id).await?;
    info!(sale_id, ticket_id, total = receipt.sale.total, "Ticket charged");
    Ok(receipt)
}

pub async fn get_sale(db: &Database, sale_id: i64) -> Result<Receipt, ApiError> {
    let sale = db
        .sales()
        .get_by_id(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;
    let items = db.sales().get_items(sale_id).await?;
    Ok(Receipt { sale, items })
}

/// Sales of a day, today when `None`, newest first.
pub async fn list_sales_for_day(
    db: &Database,
    day: Option<NaiveDate>,
) -> Result<Vec<Sale>, ApiError> {
    Ok(db.sales().list_for_day(day).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use taproom_core::{GainRule, NewProduct, PayMethod};
    use taproom_db::DbConfig;

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let stout = db
            .products()
            .create(NewProduct::new("Stout", 2800).purchase_price(1500))
            .await
            .unwrap()
            .id;
        (db, stout)
    }

    #[tokio::test]
    async fn test_checkout_returns_receipt() {
        let (db, stout) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets().add_item(ticket, stout, 2, 2800).await.unwrap();
        db.tickets()
            .add_common_item(ticket, 1, 1000, Some("Maní"), GainRule::None)
            .await
            .unwrap();

        let receipt = checkout(&db, ticket).await.unwrap();
        assert_eq!(receipt.sale.total, 6600);
        assert_eq!(receipt.sale.pay_method, PayMethod::Cash);
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[1].product_name, "Maní");

        let text = receipt.to_text(&TillConfig::default());
        assert!(text.contains("$5.600"));
        assert!(text.contains("$6.600"));
        assert!(text.ends_with("Pago: efectivo"));

        let today = list_sales_for_day(&db, None).await.unwrap();
        assert_eq!(today.len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_errors() {
        let (db, _) = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();

        let err = checkout(&db, ticket).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyTicket);

        let err = checkout(&db, 999).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = get_sale(&db, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
