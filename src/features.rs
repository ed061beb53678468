//! Aggregation of transactions into one feature vector per calendar day.

use crate::error::AnalysisResult;
use crate::record::{validate_batch, DailyFeatureVector, Transaction};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Default)]
struct DayAccumulator {
    revenue: f64,
    orders: usize,
    items: u64,
    discount_sum: f64,
}

impl DayAccumulator {
    fn push(&mut self, txn: &Transaction) {
        self.revenue += txn.total_amount;
        self.orders += 1;
        self.items += u64::from(txn.quantity);
        self.discount_sum += txn.discount;
    }

    fn finish(self, date: NaiveDate) -> DailyFeatureVector {
        DailyFeatureVector {
            date,
            total_revenue: self.revenue,
            total_orders: self.orders,
            avg_order_value: ratio(self.revenue, self.orders),
            total_items: self.items,
            avg_discount: ratio(self.discount_sum, self.orders),
        }
    }
}

/// Mean over `count` items. Undefined (NaN) for an empty group, never 0.
fn ratio(sum: f64, count: usize) -> f64 {
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Build one [`DailyFeatureVector`] per distinct order day, in date order.
///
/// Days without transactions are not produced, so every row has `total_orders >= 1`.
pub fn build_daily_features(transactions: &[Transaction]) -> AnalysisResult<Vec<DailyFeatureVector>> {
    validate_batch(transactions)?;

    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
    for txn in transactions {
        days.entry(txn.order_day()).or_default().push(txn);
    }

    let features: Vec<DailyFeatureVector> = days
        .into_iter()
        .map(|(date, acc)| acc.finish(date))
        .collect();

    log::info!(
        "daily features: {} days from {} transactions",
        features.len(),
        transactions.len()
    );
    Ok(features)
}
