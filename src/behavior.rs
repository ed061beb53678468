//! Descriptive per-customer statistics: weekly spend, order behaviour and
//! customers whose monthly order counts keep falling.

use crate::error::AnalysisResult;
use crate::record::{validate_batch, Transaction};
use chrono::Datelike;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Spend of one customer in one ISO week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySpending {
    pub customer_id: String,
    pub iso_year: i32,
    pub iso_week: u32,
    /// `YYYY-Www`
    pub week_label: String,
    pub total_amount: f64,
}

/// Spread of a customer's weekly spend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySpendingStats {
    pub customer_id: String,
    pub weeks: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerBehavior {
    pub customer_id: String,
    pub total_orders: usize,
    pub total_spending: f64,
    /// Distinct (price, quantity) combinations bought
    pub unique_products: usize,
    pub avg_order_value: f64,
}

/// Three consecutive observed months with strictly falling order counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecliningCustomer {
    pub customer_id: String,
    /// `YYYY-MM to YYYY-MM`
    pub period: String,
    pub orders: [usize; 3],
}

/// Aggregate spend per (customer, ISO year, ISO week), ordered by customer then week
pub fn weekly_spending(transactions: &[Transaction]) -> AnalysisResult<Vec<WeeklySpending>> {
    validate_batch(transactions)?;

    let mut weeks: BTreeMap<(&str, i32, u32), f64> = BTreeMap::new();
    for txn in transactions {
        let iso = txn.order_date.iso_week();
        *weeks
            .entry((txn.customer_id.as_str(), iso.year(), iso.week()))
            .or_default() += txn.total_amount;
    }

    Ok(weeks
        .into_iter()
        .map(|((customer_id, iso_year, iso_week), total_amount)| WeeklySpending {
            customer_id: customer_id.to_string(),
            iso_year,
            iso_week,
            week_label: format!("{iso_year}-W{iso_week:02}"),
            total_amount,
        })
        .collect())
}

/// Mean/min/max of weekly spend per customer
pub fn weekly_spending_stats(weekly: &[WeeklySpending]) -> Vec<WeeklySpendingStats> {
    let mut by_customer: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for week in weekly {
        by_customer
            .entry(week.customer_id.as_str())
            .or_default()
            .push(week.total_amount);
    }

    by_customer
        .into_iter()
        .map(|(customer_id, amounts)| WeeklySpendingStats {
            customer_id: customer_id.to_string(),
            weeks: amounts.len(),
            mean: crate::stats::mean(&amounts),
            min: amounts.iter().copied().fold(f64::INFINITY, f64::min),
            max: amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect()
}

pub fn customer_behavior(transactions: &[Transaction]) -> AnalysisResult<Vec<CustomerBehavior>> {
    validate_batch(transactions)?;

    #[derive(Default)]
    struct Acc {
        orders: usize,
        spending: f64,
        products: BTreeSet<(u64, u32)>,
    }

    let mut customers: BTreeMap<&str, Acc> = BTreeMap::new();
    for txn in transactions {
        let acc = customers.entry(txn.customer_id.as_str()).or_default();
        acc.orders += 1;
        acc.spending += txn.total_amount;
        acc.products.insert((txn.price.to_bits(), txn.quantity));
    }

    Ok(customers
        .into_iter()
        .map(|(customer_id, acc)| CustomerBehavior {
            customer_id: customer_id.to_string(),
            total_orders: acc.orders,
            total_spending: acc.spending,
            unique_products: acc.products.len(),
            avg_order_value: acc.spending / acc.orders as f64,
        })
        .collect())
}

/// Find every run of three consecutive observed months with strictly decreasing
/// order counts. Months without orders are skipped, not counted as zero.
pub fn declining_customers(transactions: &[Transaction]) -> AnalysisResult<Vec<DecliningCustomer>> {
    validate_batch(transactions)?;

    let mut monthly: BTreeMap<&str, BTreeMap<(i32, u32), usize>> = BTreeMap::new();
    for txn in transactions {
        *monthly
            .entry(txn.customer_id.as_str())
            .or_default()
            .entry((txn.order_date.year(), txn.order_date.month()))
            .or_default() += 1;
    }

    let mut declining = Vec::new();
    for (customer_id, months) in monthly {
        let months: Vec<((i32, u32), usize)> = months.into_iter().collect();
        for window in months.windows(3) {
            let [(start, a), (_, b), (end, c)] = [window[0], window[1], window[2]];
            if a > b && b > c {
                declining.push(DecliningCustomer {
                    customer_id: customer_id.to_string(),
                    period: format!("{:04}-{:02} to {:04}-{:02}", start.0, start.1, end.0, end.1),
                    orders: [a, b, c],
                });
            }
        }
    }

    log::info!("behavior: {} declining 3-month windows", declining.len());
    Ok(declining)
}
