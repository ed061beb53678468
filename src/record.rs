//! Typed records flowing through the analysis: transactions, flagged transactions,
//! per-day feature rows and cluster assignments.

use crate::error::{AnalysisError, AnalysisResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cleaned sales transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub customer_id: String,
    pub order_date: NaiveDateTime,
    pub price: f64,
    pub quantity: u32,
    /// Fraction in [0, 1]
    pub discount: f64,
    pub total_amount: f64,
}

impl Transaction {
    /// Build a transaction, computing `total_amount` from price, quantity and discount.
    pub fn new(
        customer_id: impl Into<String>,
        order_date: NaiveDateTime,
        price: f64,
        quantity: u32,
        discount: f64,
    ) -> Self {
        Self::with_total(customer_id, order_date, price, quantity, discount, None)
    }

    /// Build a transaction, trusting `total_amount` when the source supplied one.
    pub fn with_total(
        customer_id: impl Into<String>,
        order_date: NaiveDateTime,
        price: f64,
        quantity: u32,
        discount: f64,
        total_amount: Option<f64>,
    ) -> Self {
        let total_amount =
            total_amount.unwrap_or_else(|| compute_total_amount(price, quantity, discount));
        Self {
            customer_id: customer_id.into(),
            order_date,
            price,
            quantity,
            discount,
            total_amount,
        }
    }

    /// Calendar day of the order, time-of-day discarded
    pub fn order_day(&self) -> NaiveDate {
        self.order_date.date()
    }

    fn check(&self, row: usize) -> AnalysisResult<()> {
        let violation = |field: &'static str, reason: String| AnalysisError::SchemaViolation {
            row,
            field,
            reason,
        };

        if self.customer_id.trim().is_empty() {
            return Err(violation("customer_id", "empty".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(violation("price", format!("expected non-negative number, got {}", self.price)));
        }
        if self.quantity == 0 {
            return Err(violation("quantity", "expected positive integer, got 0".to_string()));
        }
        if !self.discount.is_finite() || !(0.0..=1.0).contains(&self.discount) {
            return Err(violation("discount", format!("expected value in [0, 1], got {}", self.discount)));
        }
        if !self.total_amount.is_finite() || self.total_amount < 0.0 {
            return Err(violation(
                "total_amount",
                format!("expected non-negative number, got {}", self.total_amount),
            ));
        }
        Ok(())
    }
}

/// `round(quantity * price * (1 - discount), 2)`
pub fn compute_total_amount(price: f64, quantity: u32, discount: f64) -> f64 {
    let raw = quantity as f64 * price * (1.0 - discount);
    (raw * 100.0).round() / 100.0
}

/// Reject the whole batch on the first malformed transaction.
///
/// Rows are numbered from 1 in the error so they line up with data rows of the source.
pub fn validate_batch(transactions: &[Transaction]) -> AnalysisResult<()> {
    if transactions.is_empty() {
        return Err(AnalysisError::DegenerateInput {
            stage: "validation",
            required: 1,
            actual: 0,
        });
    }
    transactions
        .iter()
        .enumerate()
        .try_for_each(|(i, txn)| txn.check(i + 1))
}

/// Which detector produced a flag. Declaration order is the merge priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionMethod {
    Zscore,
    Iqr,
    Median,
}

impl DetectionMethod {
    pub const EVALUATION_ORDER: [DetectionMethod; 3] =
        [DetectionMethod::Zscore, DetectionMethod::Iqr, DetectionMethod::Median];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Zscore => "ZSCORE",
            Self::Iqr => "IQR",
            Self::Median => "MEDIAN",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A transaction tagged with the detector that flagged it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub detection_method: DetectionMethod,
}

impl FlaggedTransaction {
    pub fn new(transaction: Transaction, detection_method: DetectionMethod) -> Self {
        Self {
            transaction,
            detection_method,
        }
    }

    pub fn total_amount(&self) -> f64 {
        self.transaction.total_amount
    }
}

/// Column order of [`DailyFeatureVector::values`]
pub const FEATURE_NAMES: [&str; 5] = [
    "total_revenue",
    "total_orders",
    "avg_order_value",
    "total_items",
    "avg_discount",
];

/// Aggregate sales behaviour of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFeatureVector {
    pub date: NaiveDate,
    pub total_revenue: f64,
    /// Always >= 1 for produced rows
    pub total_orders: usize,
    pub avg_order_value: f64,
    pub total_items: u64,
    pub avg_discount: f64,
}

impl DailyFeatureVector {
    /// Feature values in [`FEATURE_NAMES`] order
    pub fn values(&self) -> [f64; 5] {
        [
            self.total_revenue,
            self.total_orders as f64,
            self.avg_order_value,
            self.total_items as f64,
            self.avg_discount,
        ]
    }
}

/// A day together with the cluster it was assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    #[serde(flatten)]
    pub features: DailyFeatureVector,
    pub cluster_id: usize,
}
