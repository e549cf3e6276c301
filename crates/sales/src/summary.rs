//! Revenue, cost and profit over ledger records.
//!
//! Everything here is computed from the snapshots a sale carries (`total`,
//! `total_cost`), never from the current catalog, so later price or cost
//! edits do not rewrite past results.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockpos_core::{Money, ProductId};

use crate::sale::{Sale, profit_cents};

/// Bucket width for period summaries.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl SummaryPeriod {
    /// Sortable bucket key: `2025-03-01`, `2025-W09` (ISO week) or `2025-03`.
    pub fn key(self, at: DateTime<Utc>) -> String {
        match self {
            SummaryPeriod::Day => at.format("%Y-%m-%d").to_string(),
            SummaryPeriod::Week => {
                let week = at.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            SummaryPeriod::Month => at.format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown summary period '{0}', expected one of: day, week, month")]
pub struct ParsePeriodError(String);

impl FromStr for SummaryPeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(SummaryPeriod::Day),
            "week" => Ok(SummaryPeriod::Week),
            "month" => Ok(SummaryPeriod::Month),
            _ => Err(ParsePeriodError(s.to_string())),
        }
    }
}

/// Running sums. Saturates instead of wrapping; real ledgers never get close.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct Tally {
    sales: usize,
    quantity: u64,
    revenue: Money,
    cost: Money,
}

impl Tally {
    fn add(&mut self, sale: &Sale) {
        let saturated = Money::from_cents(u64::MAX);
        self.sales += 1;
        self.quantity = self.quantity.saturating_add(sale.quantity());
        self.revenue = self.revenue.checked_add(sale.total()).unwrap_or(saturated);
        self.cost = self.cost.checked_add(sale.total_cost()).unwrap_or(saturated);
    }

    fn profit_cents(&self) -> i64 {
        profit_cents(self.revenue, self.cost)
    }
}

/// Per-product line of a [`SalesSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub product_id: ProductId,
    /// Name on the most recent sale in the set.
    pub product_name: String,
    pub sales: usize,
    pub quantity: u64,
    pub revenue: Money,
    pub cost: Money,
    pub profit_cents: i64,
    pub first_sale_at: DateTime<Utc>,
    pub last_sale_at: DateTime<Utc>,
}

/// Grand totals of a [`SalesSummary`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SummaryTotals {
    pub sales: usize,
    pub quantity: u64,
    pub revenue: Money,
    pub cost: Money,
    pub profit_cents: i64,
}

impl From<Tally> for SummaryTotals {
    fn from(t: Tally) -> Self {
        Self {
            sales: t.sales,
            quantity: t.quantity,
            revenue: t.revenue,
            cost: t.cost,
            profit_cents: t.profit_cents(),
        }
    }
}

/// One bucket of [`SalesSummary::by_period`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodSummary {
    pub period: String,
    pub totals: SummaryTotals,
}

/// Revenue, cost and profit per product plus grand totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesSummary {
    /// Ordered by product id.
    pub products: Vec<ProductSummary>,
    pub totals: SummaryTotals,
}

impl SalesSummary {
    /// Summarize `sales`, which are expected in ledger order.
    pub fn from_sales<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Self {
        let mut totals = Tally::default();
        let mut lines: BTreeMap<ProductId, (Tally, ProductSummary)> = BTreeMap::new();

        for sale in sales {
            totals.add(sale);
            let (tally, line) = lines.entry(sale.product_id()).or_insert_with(|| {
                (
                    Tally::default(),
                    ProductSummary {
                        product_id: sale.product_id(),
                        product_name: sale.product_name().to_string(),
                        sales: 0,
                        quantity: 0,
                        revenue: Money::ZERO,
                        cost: Money::ZERO,
                        profit_cents: 0,
                        first_sale_at: sale.occurred_at(),
                        last_sale_at: sale.occurred_at(),
                    },
                )
            });
            tally.add(sale);
            line.product_name = sale.product_name().to_string();
            line.first_sale_at = line.first_sale_at.min(sale.occurred_at());
            line.last_sale_at = line.last_sale_at.max(sale.occurred_at());
        }

        let products = lines
            .into_values()
            .map(|(tally, line)| ProductSummary {
                sales: tally.sales,
                quantity: tally.quantity,
                revenue: tally.revenue,
                cost: tally.cost,
                profit_cents: tally.profit_cents(),
                ..line
            })
            .collect();

        Self {
            products,
            totals: totals.into(),
        }
    }

    /// Totals bucketed by `period`, oldest bucket first. Empty buckets are
    /// left out.
    pub fn by_period<'a>(
        sales: impl IntoIterator<Item = &'a Sale>,
        period: SummaryPeriod,
    ) -> Vec<PeriodSummary> {
        let mut buckets: BTreeMap<String, Tally> = BTreeMap::new();
        for sale in sales {
            buckets
                .entry(period.key(sale.occurred_at()))
                .or_default()
                .add(sale);
        }

        buckets
            .into_iter()
            .map(|(period, tally)| PeriodSummary {
                period,
                totals: tally.into(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use stockpos_core::SaleId;

    use super::*;
    use crate::sale::NewSale;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn sale(
        id: i64,
        product_id: i64,
        quantity: u64,
        price_cents: u64,
        cost_cents: u64,
        occurred_at: &str,
    ) -> Sale {
        NewSale {
            product_id: ProductId::new(product_id),
            product_name: format!("product {product_id}"),
            quantity,
            unit_price: Money::from_cents(price_cents),
            total: Money::from_cents(price_cents * quantity),
            unit_cost: Money::from_cents(cost_cents),
            total_cost: Money::from_cents(cost_cents * quantity),
            occurred_at: at(occurred_at),
        }
        .into_sale(SaleId::new(id))
    }

    #[test]
    fn empty_ledger_summarizes_to_zero() {
        let summary = SalesSummary::from_sales(&[]);
        assert!(summary.products.is_empty());
        assert_eq!(summary.totals, SummaryTotals::default());
    }

    #[test]
    fn per_product_revenue_cost_and_profit() {
        let sales = vec![
            sale(1, 1, 3, 250, 120, "2025-03-01T10:00:00Z"),
            sale(2, 2, 1, 400, 250, "2025-03-01T11:00:00Z"),
            // Price went up between sales; the snapshot keeps both.
            sale(3, 1, 2, 300, 120, "2025-03-02T09:00:00Z"),
        ];

        let summary = SalesSummary::from_sales(&sales);

        assert_eq!(summary.products.len(), 2);
        let cola = &summary.products[0];
        assert_eq!(cola.product_id, ProductId::new(1));
        assert_eq!(cola.sales, 2);
        assert_eq!(cola.quantity, 5);
        assert_eq!(cola.revenue, Money::from_cents(750 + 600));
        assert_eq!(cola.cost, Money::from_cents(600));
        assert_eq!(cola.profit_cents, 750);
        assert_eq!(cola.first_sale_at, at("2025-03-01T10:00:00Z"));
        assert_eq!(cola.last_sale_at, at("2025-03-02T09:00:00Z"));

        assert_eq!(
            summary.totals,
            SummaryTotals {
                sales: 3,
                quantity: 6,
                revenue: Money::from_cents(1750),
                cost: Money::from_cents(850),
                profit_cents: 900,
            }
        );
    }

    #[test]
    fn selling_below_cost_is_a_loss() {
        let summary = SalesSummary::from_sales(&[sale(1, 1, 2, 100, 150, "2025-03-01T10:00:00Z")]);
        assert_eq!(summary.products[0].profit_cents, -100);
        assert_eq!(summary.totals.profit_cents, -100);
    }

    #[test]
    fn buckets_by_day_week_and_month() {
        let sales = vec![
            sale(1, 1, 1, 100, 50, "2025-02-28T23:59:59Z"),
            sale(2, 1, 1, 100, 50, "2025-03-01T00:00:00Z"),
            sale(3, 2, 2, 100, 50, "2025-03-03T08:00:00Z"),
        ];

        let days: Vec<_> = SalesSummary::by_period(&sales, SummaryPeriod::Day)
            .into_iter()
            .map(|p| (p.period, p.totals.quantity))
            .collect();
        assert_eq!(
            days,
            vec![
                ("2025-02-28".to_string(), 1),
                ("2025-03-01".to_string(), 1),
                ("2025-03-03".to_string(), 2),
            ]
        );

        // Feb 28 and Mar 1 2025 share ISO week 9; Mar 3 starts week 10.
        let weeks = SalesSummary::by_period(&sales, SummaryPeriod::Week);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].period, "2025-W09");
        assert_eq!(weeks[0].totals.revenue, Money::from_cents(200));
        assert_eq!(weeks[1].period, "2025-W10");
        assert_eq!(weeks[1].totals.profit_cents, 100);

        let months = SalesSummary::by_period(&sales, SummaryPeriod::Month);
        let keys: Vec<_> = months.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(keys, vec!["2025-02", "2025-03"]);
    }

    #[test]
    fn period_parses_case_insensitively() {
        assert_eq!("Week".parse::<SummaryPeriod>().unwrap(), SummaryPeriod::Week);
        assert_eq!("month".parse::<SummaryPeriod>().unwrap(), SummaryPeriod::Month);
        assert!("year".parse::<SummaryPeriod>().is_err());
    }
}
