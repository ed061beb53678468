//! Z-Score based anomaly detection
//!
//! Flags amounts more than `threshold` population standard deviations from the
//! batch mean.

use super::{flag_where, AnomalyDetector};
use crate::error::{AnalysisError, AnalysisResult};
use crate::record::{validate_batch, DetectionMethod, FlaggedTransaction, Transaction};
use crate::stats::{mean_std, VARIANCE_EPSILON};

/// Z-Score anomaly detector over `total_amount`
#[derive(Clone, Debug)]
pub struct ZScoreDetector {
    /// Threshold in standard deviations
    pub threshold: f64,
}

impl ZScoreDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl AnomalyDetector for ZScoreDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Zscore
    }

    fn detect(&self, transactions: &[Transaction]) -> AnalysisResult<Vec<FlaggedTransaction>> {
        validate_batch(transactions)?;
        if transactions.len() < 2 {
            return Err(AnalysisError::DegenerateInput {
                stage: "zscore detector",
                required: 2,
                actual: transactions.len(),
            });
        }

        let amounts: Vec<f64> = transactions.iter().map(|t| t.total_amount).collect();
        let (mu, sigma) = mean_std(&amounts);
        if sigma < VARIANCE_EPSILON {
            log::debug!("zscore detector: constant total_amount ({mu:.2}), nothing to flag");
            return Ok(Vec::new());
        }

        log::debug!("zscore detector: mean={mu:.2} std={sigma:.2} threshold={}", self.threshold);
        let threshold = self.threshold;
        Ok(flag_where(transactions, self.method(), |amount| {
            ((amount - mu) / sigma).abs() > threshold
        }))
    }
}
