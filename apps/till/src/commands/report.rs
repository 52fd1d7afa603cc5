//! # Report Commands
//!
//! Date ranges are inclusive local calendar dates written `YYYY-MM-DD`.
//! A missing start means today; a missing end means the same day as the
//! start.

use chrono::NaiveDate;

use crate::error::ApiError;
use taproom_core::{PeriodTotal, Sale, SalesSummary, TopProduct};
use taproom_db::clock::today;
use taproom_db::Database;

/// Rows returned by `top_products` when no limit is given.
pub const DEFAULT_TOP_LIMIT: u32 = 10;

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn day(day: NaiveDate) -> Self {
        DateRange { from: day, to: day }
    }

    /// Parses optional `YYYY-MM-DD` bounds.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, ApiError> {
        let from = match from {
            Some(text) => parse_date(text)?,
            None => today(),
        };
        let to = match to {
            Some(text) => parse_date(text)?,
            None => from,
        };
        Ok(DateRange { from, to })
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::validation(format!("'{}' is not a YYYY-MM-DD date", text.trim())))
}

pub async fn summary(db: &Database, range: DateRange) -> Result<SalesSummary, ApiError> {
    Ok(db.reports().summary(range.from, range.to).await?)
}

pub async fn top_products(
    db: &Database,
    range: DateRange,
    limit: Option<u32>,
) -> Result<Vec<TopProduct>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT);
    Ok(db.reports().top_products(range.from, range.to, limit).await?)
}

pub async fn daily_totals(db: &Database, range: DateRange) -> Result<Vec<PeriodTotal>, ApiError> {
    Ok(db.reports().daily_totals(range.from, range.to).await?)
}

pub async fn hourly_totals(db: &Database, range: DateRange) -> Result<Vec<PeriodTotal>, ApiError> {
    Ok(db.reports().hourly_totals(range.from, range.to).await?)
}

pub async fn monthly_totals(
    db: &Database,
    range: DateRange,
) -> Result<Vec<PeriodTotal>, ApiError> {
    Ok(db.reports().monthly_totals(range.from, range.to).await?)
}

pub async fn list_sales(db: &Database, range: DateRange) -> Result<Vec<Sale>, ApiError> {
    Ok(db.reports().list_sales(range.from, range.to).await?)
}
