//! Median-multiple anomaly detection
//!
//! Flags amounts strictly greater than `multiplier * median`. When the median is
//! zero the threshold is zero and every positive amount is flagged.

use super::{flag_where, AnomalyDetector};
use crate::error::AnalysisResult;
use crate::record::{validate_batch, DetectionMethod, FlaggedTransaction, Transaction};
use crate::stats::median;

#[derive(Clone, Debug)]
pub struct MedianDetector {
    pub multiplier: f64,
}

impl MedianDetector {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    pub fn threshold(&self, amounts: &[f64]) -> f64 {
        median(amounts) * self.multiplier
    }
}

impl Default for MedianDetector {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl AnomalyDetector for MedianDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Median
    }

    fn detect(&self, transactions: &[Transaction]) -> AnalysisResult<Vec<FlaggedTransaction>> {
        validate_batch(transactions)?;

        let amounts: Vec<f64> = transactions.iter().map(|t| t.total_amount).collect();
        let threshold = self.threshold(&amounts);
        log::debug!(
            "median detector: threshold {:.2} ({} x median)",
            threshold,
            self.multiplier
        );

        Ok(flag_where(transactions, self.method(), |amount| amount > threshold))
    }
}
