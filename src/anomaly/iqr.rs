//! IQR (Interquartile Range) based anomaly detection
//!
//! Values strictly below Q1 - k*IQR or strictly above Q3 + k*IQR are anomalies.
//! A value sitting exactly on a fence is not flagged.

use super::{flag_where, AnomalyDetector};
use crate::error::{AnalysisError, AnalysisResult};
use crate::record::{validate_batch, DetectionMethod, FlaggedTransaction, Transaction};
use crate::stats::{quantile_sorted, sorted};

/// IQR-based anomaly detector
#[derive(Clone, Debug)]
pub struct IqrDetector {
    /// Multiplier for IQR (1.5 = outliers, 3.0 = extreme outliers)
    pub k: f64,
}

/// Quartiles and fences computed for one batch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn is_outside(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

impl IqrDetector {
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    /// Compute quartiles (linear interpolation) and fences for `amounts`
    pub fn bounds(&self, amounts: &[f64]) -> IqrBounds {
        let sorted = sorted(amounts);
        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        IqrBounds {
            q1,
            q3,
            lower: q1 - self.k * iqr,
            upper: q3 + self.k * iqr,
        }
    }
}

impl Default for IqrDetector {
    fn default() -> Self {
        Self::new(1.5)
    }
}

impl AnomalyDetector for IqrDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Iqr
    }

    fn detect(&self, transactions: &[Transaction]) -> AnalysisResult<Vec<FlaggedTransaction>> {
        validate_batch(transactions)?;
        if transactions.len() < 2 {
            return Err(AnalysisError::DegenerateInput {
                stage: "iqr detector",
                required: 2,
                actual: transactions.len(),
            });
        }

        let amounts: Vec<f64> = transactions.iter().map(|t| t.total_amount).collect();
        let bounds = self.bounds(&amounts);
        log::debug!(
            "iqr detector: normal range [{:.2}, {:.2}] (Q1={:.2}, Q3={:.2}, IQR={:.2})",
            bounds.lower,
            bounds.upper,
            bounds.q1,
            bounds.q3,
            bounds.iqr()
        );

        Ok(flag_where(transactions, self.method(), |amount| {
            bounds.is_outside(amount)
        }))
    }
}
