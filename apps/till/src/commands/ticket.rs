//! # Ticket Commands
//!
//! Open tickets ("mesas") and their lines. Every mutating command answers
//! with the full [`TicketView`] so the caller can redraw without a second
//! round trip.

use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use taproom_core::ticket::recompute;
use taproom_core::{GainRule, OpenTicket, PayMethod, TicketLine, TicketTotals};
use taproom_db::Database;

/// A ticket with its lines and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub ticket: OpenTicket,
    pub lines: Vec<TicketLine>,
    pub totals: TicketTotals,
}

/// What to put on a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductRef {
    Id(i64),
    Barcode(String),
}

/// Reads a ticket without touching it; totals come from the current lines.
pub async fn view_ticket(db: &Database, ticket_id: i64) -> Result<TicketView, ApiError> {
    let ticket = db
        .tickets()
        .get_ticket(ticket_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket", ticket_id))?;
    let lines = db.tickets().list_items(ticket_id).await?;
    let totals = recompute(&lines);

    Ok(TicketView {
        ticket,
        lines,
        totals,
    })
}

pub async fn list_tickets(db: &Database) -> Result<Vec<OpenTicket>, ApiError> {
    Ok(db.tickets().list_open_tickets().await?)
}

/// Opens a ticket. `default_pay_method` comes from the till config.
pub async fn create_ticket(
    db: &Database,
    name: Option<&str>,
    default_pay_method: Option<PayMethod>,
) -> Result<TicketView, ApiError> {
    let ticket_id = db.tickets().create_ticket(name).await?;
    if default_pay_method.is_some() {
        db.tickets()
            .set_pay_method(ticket_id, default_pay_method)
            .await?;
    }
    view_ticket(db, ticket_id).await
}

pub async fn rename_ticket(
    db: &Database,
    ticket_id: i64,
    name: Option<&str>,
) -> Result<TicketView, ApiError> {
    db.tickets().rename_ticket(ticket_id, name).await?;
    view_ticket(db, ticket_id).await
}

/// Sets or clears (`None`) the pay method from its label.
pub async fn set_pay_method(
    db: &Database,
    ticket_id: i64,
    method: Option<&str>,
) -> Result<TicketView, ApiError> {
    let method = method.map(str::parse::<PayMethod>).transpose()?;
    db.tickets().set_pay_method(ticket_id, method).await?;
    view_ticket(db, ticket_id).await
}

/// Deletes a ticket and its lines. Deleting a missing ticket is a no-op;
/// returns whether anything was deleted.
pub async fn delete_ticket(db: &Database, ticket_id: i64) -> Result<bool, ApiError> {
    Ok(db.tickets().delete_ticket(ticket_id).await? > 0)
}

/// Adds a catalog product. The unit price defaults to the product's current
/// sale price.
pub async fn add_item(
    db: &Database,
    ticket_id: i64,
    product: ProductRef,
    qty: i64,
    unit_price: Option<i64>,
) -> Result<TicketView, ApiError> {
    let found = match &product {
        ProductRef::Id(id) => db.products().get_by_id(*id).await?,
        ProductRef::Barcode(code) => db.products().find_by_barcode(code).await?,
    };
    let product = found.ok_or_else(|| match product {
        ProductRef::Id(id) => ApiError::not_found("Product", id),
        ProductRef::Barcode(code) => ApiError::not_found("Product with barcode", code),
    })?;

    let unit_price = unit_price.unwrap_or(product.sale_price);
    debug!(ticket_id, product_id = product.id, qty, unit_price, "add_item command");

    db.tickets()
        .add_item(ticket_id, product.id, qty, unit_price)
        .await?;
    view_ticket(db, ticket_id).await
}

/// Adds goods outside the catalog with their own name and gain.
pub async fn add_common_item(
    db: &Database,
    ticket_id: i64,
    qty: i64,
    unit_price: i64,
    display_name: Option<&str>,
    gain: GainRule,
) -> Result<TicketView, ApiError> {
    db.tickets()
        .add_common_item(ticket_id, qty, unit_price, display_name, gain)
        .await?;
    view_ticket(db, ticket_id).await
}

pub async fn remove_item(
    db: &Database,
    ticket_id: i64,
    line_id: i64,
) -> Result<TicketView, ApiError> {
    owned_line(db, ticket_id, line_id).await?;
    db.tickets().remove_item(line_id).await?;
    view_ticket(db, ticket_id).await
}

/// A quantity of zero or less removes the line.
pub async fn update_item_qty(
    db: &Database,
    ticket_id: i64,
    line_id: i64,
    qty: i64,
) -> Result<TicketView, ApiError> {
    owned_line(db, ticket_id, line_id).await?;
    db.tickets().update_item_qty(line_id, qty).await?;
    view_ticket(db, ticket_id).await
}

pub async fn clear_ticket(db: &Database, ticket_id: i64) -> Result<TicketView, ApiError> {
    db.tickets().clear_items(ticket_id).await?;
    view_ticket(db, ticket_id).await
}

/// Line ids are global; refuse to touch a line through the wrong ticket.
async fn owned_line(db: &Database, ticket_id: i64, line_id: i64) -> Result<(), ApiError> {
    let lines = db.tickets().list_items(ticket_id).await?;
    if lines.iter().any(|line| line.id == line_id) {
        Ok(())
    } else {
        Err(ApiError::not_found(
            "Ticket line",
            format!("{} on ticket {}", line_id, ticket_id),
        ))
    }
}
