//! # Report Repository
//!
//! Read-only aggregates over finished sales. Every range is a pair of local
//! calendar dates, both inclusive; an inverted range simply matches nothing.
//!
//! ## Sources
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────┐
//! │ Report               │ Reads                                        │
//! ├──────────────────────┼──────────────────────────────────────────────┤
//! │ summary              │ sale_items ⋈ products (revenue, profit)      │
//! │                      │ sales headers (count, average sale)          │
//! │ top_products         │ sale_items ⋈ sales ⋈ products                │
//! │ daily/hourly/monthly │ sales.total bucketed by created_at           │
//! └──────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Revenue in the summary is summed from lines, so a sale that lost lines to
//! a force delete contributes less there than in the bucketed totals.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sale::SaleRepository;
use taproom_core::profit::{average_rounded, line_profit, MarginAccumulator};
use taproom_core::{Money, PeriodTotal, Sale, SalesSummary, TopProduct};

/// A sold line with the cost needed to price its profit.
#[derive(Debug, sqlx::FromRow)]
struct ProfitLine {
    qty: i64,
    unit_price: i64,
    purchase_price: i64,
    gain_per_unit: i64,
    ad_hoc: bool,
}

/// Repository for sales reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Revenue, sale count, average sale, profit and average margin.
    ///
    /// Profit per line is `qty × gain_per_unit` for lines carrying a gain and
    /// `qty × (unit_price − purchase_price)` for the rest.
    pub async fn summary(&self, from: NaiveDate, to: NaiveDate) -> DbResult<SalesSummary> {
        debug!(%from, %to, "Building sales summary");

        let mut conn = self.pool.acquire().await?;

        let lines = sqlx::query_as::<_, ProfitLine>(
            r#"
            SELECT
                si.qty,
                si.unit_price,
                COALESCE(p.purchase_price, 0) AS purchase_price,
                COALESCE(si.gain_per_unit, 0) AS gain_per_unit,
                si.display_name IS NOT NULL AS ad_hoc
            FROM sales s
            JOIN sale_items si ON si.sale_id = s.id
            JOIN products p ON p.id = si.product_id
            WHERE date(s.created_at) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await?;

        let (sales_count, sales_total): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total), 0)
            FROM sales
            WHERE date(created_at) BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&mut *conn)
        .await?;

        let mut revenue = Money::zero();
        let mut profit = Money::zero();
        let mut margins = MarginAccumulator::new();
        let mut lines_without_cost = 0;

        for line in &lines {
            let line_revenue = Money::from_units(line.unit_price).multiply_quantity(line.qty);
            let earned = line_profit(
                line.qty,
                line.unit_price,
                line.purchase_price,
                line.gain_per_unit,
            );

            if !line.ad_hoc && line.gain_per_unit == 0 && line.purchase_price == 0 {
                lines_without_cost += 1;
            }

            revenue += line_revenue;
            profit += earned;
            margins.push(earned, line_revenue);
        }

        Ok(SalesSummary {
            from,
            to,
            revenue: revenue.units(),
            sales_count,
            average_sale: average_rounded(sales_total, sales_count),
            profit: profit.units(),
            average_margin: margins.average(),
            lines_without_cost,
        })
    }

    /// Products ranked by revenue, ties broken by name.
    pub async fn top_products(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: u32,
    ) -> DbResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS name,
                SUM(si.qty) AS qty,
                SUM(si.qty * si.unit_price) AS revenue
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE date(s.created_at) BETWEEN ?1 AND ?2
            GROUP BY p.id, p.name
            ORDER BY revenue DESC, p.name ASC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sale totals per day (`YYYY-MM-DD`), oldest first. Days without sales
    /// are absent.
    pub async fn daily_totals(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<PeriodTotal>> {
        self.bucketed("%Y-%m-%d", from, to).await
    }

    /// Sale totals per month (`YYYY-MM`), oldest first.
    pub async fn monthly_totals(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<PeriodTotal>> {
        self.bucketed("%Y-%m", from, to).await
    }

    /// Sale totals per hour of day over the whole range, always 24 buckets
    /// labelled `00` to `23`.
    pub async fn hourly_totals(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<PeriodTotal>> {
        let found = self.bucketed("%H", from, to).await?;

        let mut hours = [0i64; 24];
        for bucket in found {
            if let Some(slot) = bucket
                .label
                .parse::<usize>()
                .ok()
                .and_then(|hour| hours.get_mut(hour))
            {
                *slot = bucket.total;
            }
        }

        Ok(hours
            .iter()
            .enumerate()
            .map(|(hour, total)| PeriodTotal {
                label: format!("{hour:02}"),
                total: *total,
            })
            .collect())
    }

    /// Sales in the range, newest first.
    pub async fn list_sales(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Sale>> {
        SaleRepository::new(self.pool.clone())
            .list_in_range(from, to)
            .await
    }

    async fn bucketed(
        &self,
        pattern: &'static str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<PeriodTotal>> {
        let rows = sqlx::query_as::<_, PeriodTotal>(
            r#"
            SELECT strftime(?1, created_at) AS label, COALESCE(SUM(total), 0) AS total
            FROM sales
            WHERE date(created_at) BETWEEN ?2 AND ?3
            GROUP BY label
            ORDER BY label ASC
            "#,
        )
        .bind(pattern)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDateTime;
    use taproom_core::{GainRule, NewProduct};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn at(d: u32, hour: u32) -> NaiveDateTime {
        day(d).and_hms_opt(hour, 30, 0).unwrap()
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn product(db: &Database, name: &str, price: i64, cost: i64) -> i64 {
        db.products()
            .create(NewProduct::new(name, price).purchase_price(cost))
            .await
            .unwrap()
            .id
    }

    async fn sell(db: &Database, when: NaiveDateTime, lines: &[(i64, i64, i64)]) -> i64 {
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        for &(product_id, qty, price) in lines {
            db.tickets()
                .add_item(ticket, product_id, qty, price)
                .await
                .unwrap();
        }
        db.sales().checkout_at(ticket, when).await.unwrap()
    }

    #[tokio::test]
    async fn test_summary_catalog_profit() {
        let db = setup().await;
        let stout = product(&db, "Stout", 1000, 600).await;
        sell(&db, at(2, 20), &[(stout, 3, 1000)]).await;

        let summary = db.reports().summary(day(1), day(31)).await.unwrap();
        assert_eq!(summary.revenue, 3000);
        assert_eq!(summary.profit, 1200);
        assert_eq!(summary.sales_count, 1);
        assert_eq!(summary.average_sale, 3000);
        assert!((summary.average_margin - 0.4).abs() < 1e-9);
        assert_eq!(summary.lines_without_cost, 0);
    }

    #[tokio::test]
    async fn test_summary_adhoc_profit_uses_gain() {
        let db = setup().await;
        let ticket = db.tickets().create_ticket(None).await.unwrap();
        db.tickets()
            .add_common_item(ticket, 2, 2000, Some("Growler"), GainRule::Percent(100))
            .await
            .unwrap();
        db.sales().checkout_at(ticket, at(4, 12)).await.unwrap();

        let summary = db.reports().summary(day(4), day(4)).await.unwrap();
        assert_eq!(summary.revenue, 4000);
        assert_eq!(summary.profit, 4000);
        assert_eq!(summary.lines_without_cost, 0);
    }

    #[tokio::test]
    async fn test_summary_flags_products_without_cost() {
        let db = setup().await;
        let pils = product(&db, "Pilsner", 1500, 0).await;
        let ipa = product(&db, "IPA", 2500, 1200).await;
        sell(&db, at(1, 10), &[(pils, 2, 1500), (ipa, 1, 2500)]).await;
        sell(&db, at(1, 11), &[(ipa, 1, 2500)]).await;

        let summary = db.reports().summary(day(1), day(1)).await.unwrap();
        assert_eq!(summary.lines_without_cost, 1);
        assert_eq!(summary.profit, 3000 + 1300 + 1300);
        assert_eq!(summary.sales_count, 2);
        assert_eq!(summary.average_sale, 4000);
    }

    #[tokio::test]
    async fn test_summary_empty_and_inverted_range() {
        let db = setup().await;
        let stout = product(&db, "Stout", 1000, 600).await;
        sell(&db, at(2, 20), &[(stout, 1, 1000)]).await;

        let empty = db.reports().summary(day(10), day(12)).await.unwrap();
        assert_eq!(empty.revenue, 0);
        assert_eq!(empty.sales_count, 0);
        assert_eq!(empty.average_sale, 0);
        assert_eq!(empty.average_margin, 0.0);

        let inverted = db.reports().summary(day(3), day(1)).await.unwrap();
        assert_eq!(inverted.sales_count, 0);
    }

    #[tokio::test]
    async fn test_top_products_order_and_limit() {
        let db = setup().await;
        let a = product(&db, "Amber", 1000, 500).await;
        let b = product(&db, "Blonde", 1000, 500).await;
        let c = product(&db, "Porter", 3000, 1500).await;
        sell(&db, at(1, 10), &[(a, 2, 1000), (b, 2, 1000), (c, 1, 3000)]).await;
        sell(&db, at(2, 10), &[(c, 1, 3000)]).await;

        let top = db.reports().top_products(day(1), day(2), 10).await.unwrap();
        let names: Vec<&str> = top.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Porter", "Amber", "Blonde"]);
        assert_eq!(top[0].qty, 2);
        assert_eq!(top[0].revenue, 6000);

        let limited = db.reports().top_products(day(1), day(2), 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_daily_and_monthly_totals() {
        let db = setup().await;
        let ipa = product(&db, "IPA", 2500, 1200).await;
        sell(&db, at(1, 10), &[(ipa, 1, 2500)]).await;
        sell(&db, at(1, 19), &[(ipa, 2, 2500)]).await;
        sell(&db, at(3, 12), &[(ipa, 1, 2500)]).await;
        let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        sell(&db, june.and_hms_opt(9, 0, 0).unwrap(), &[(ipa, 4, 2500)]).await;

        let daily = db.reports().daily_totals(day(1), day(31)).await.unwrap();
        assert_eq!(
            daily,
            vec![
                PeriodTotal { label: "2024-05-01".into(), total: 7500 },
                PeriodTotal { label: "2024-05-03".into(), total: 2500 },
            ]
        );

        let monthly = db.reports().monthly_totals(day(1), june).await.unwrap();
        assert_eq!(
            monthly,
            vec![
                PeriodTotal { label: "2024-05".into(), total: 10000 },
                PeriodTotal { label: "2024-06".into(), total: 10000 },
            ]
        );
    }

    #[tokio::test]
    async fn test_hourly_totals_zero_filled() {
        let db = setup().await;
        let ipa = product(&db, "IPA", 2500, 1200).await;
        sell(&db, at(1, 9), &[(ipa, 1, 2500)]).await;
        sell(&db, at(2, 9), &[(ipa, 1, 2500)]).await;
        sell(&db, at(2, 21), &[(ipa, 2, 2500)]).await;

        let hourly = db.reports().hourly_totals(day(1), day(2)).await.unwrap();
        assert_eq!(hourly.len(), 24);
        assert_eq!(hourly[0].label, "00");
        assert_eq!(hourly[23].label, "23");
        assert_eq!(hourly[9].total, 5000);
        assert_eq!(hourly[21].total, 5000);
        assert_eq!(hourly.iter().map(|h| h.total).sum::<i64>(), 10000);

        let quiet = db.reports().hourly_totals(day(5), day(5)).await.unwrap();
        assert_eq!(quiet.len(), 24);
        assert!(quiet.iter().all(|h| h.total == 0));
    }

    #[tokio::test]
    async fn test_list_sales_newest_first() {
        let db = setup().await;
        let ipa = product(&db, "IPA", 2500, 1200).await;
        let first = sell(&db, at(1, 9), &[(ipa, 1, 2500)]).await;
        let second = sell(&db, at(2, 9), &[(ipa, 1, 2500)]).await;

        let sales = db.reports().list_sales(day(1), day(2)).await.unwrap();
        let ids: Vec<i64> = sales.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);
    }
}
