//! Amount-based anomaly detection
//!
//! Three independent detectors score the `total_amount` column:
//! - Z-score: distance from the mean in population standard deviations
//! - IQR: Tukey fences around the interquartile range
//! - Median multiple: amounts above a multiple of the median
//!
//! Their results are merged, deduplicated and ranked by [`merge_flagged`].

mod iqr;
mod median;
mod merge;
mod zscore;

pub use iqr::IqrDetector;
pub use median::MedianDetector;
pub use merge::{dedup_key, merge_flagged};
pub use zscore::ZScoreDetector;

use crate::config::DetectorConfig;
use crate::error::AnalysisResult;
use crate::record::{DetectionMethod, FlaggedTransaction, Transaction};
use serde::Serialize;

/// Trait for amount-based anomaly detectors
pub trait AnomalyDetector {
    /// Label attached to every transaction this detector flags
    fn method(&self) -> DetectionMethod;

    /// Return the subset of `transactions` this detector considers anomalous,
    /// in input order.
    fn detect(&self, transactions: &[Transaction]) -> AnalysisResult<Vec<FlaggedTransaction>>;
}

/// Observability summary for one detector run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub method: DetectionMethod,
    pub flagged: usize,
    pub total: usize,
    /// Percentage of the batch flagged
    pub flagged_pct: f64,
    pub mean_amount: Option<f64>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl DetectionSummary {
    pub fn from_flagged(method: DetectionMethod, flagged: &[FlaggedTransaction], total: usize) -> Self {
        let amounts: Vec<f64> = flagged.iter().map(|f| f.total_amount()).collect();
        let (mean_amount, min_amount, max_amount) = if amounts.is_empty() {
            (None, None, None)
        } else {
            (
                Some(crate::stats::mean(&amounts)),
                amounts.iter().copied().reduce(f64::min),
                amounts.iter().copied().reduce(f64::max),
            )
        };
        let flagged_pct = if total == 0 {
            0.0
        } else {
            flagged.len() as f64 / total as f64 * 100.0
        };

        Self {
            method,
            flagged: flagged.len(),
            total,
            flagged_pct,
            mean_amount,
            min_amount,
            max_amount,
        }
    }
}

/// Merged anomaly output plus per-detector summaries
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    pub summaries: Vec<DetectionSummary>,
    pub flagged: Vec<FlaggedTransaction>,
}

/// Build the three detectors in evaluation order from a config
pub fn detectors_from_config(config: &DetectorConfig) -> Vec<Box<dyn AnomalyDetector>> {
    vec![
        Box::new(ZScoreDetector::new(config.zscore_threshold)),
        Box::new(IqrDetector::new(config.iqr_multiplier)),
        Box::new(MedianDetector::new(config.median_multiplier)),
    ]
}

/// Run every detector, then merge, deduplicate and rank the results.
pub fn detect_anomalies(
    transactions: &[Transaction],
    config: &DetectorConfig,
) -> AnalysisResult<AnomalyReport> {
    config.validate()?;

    let mut summaries = Vec::with_capacity(3);
    let mut results = Vec::with_capacity(3);
    for detector in detectors_from_config(config) {
        let flagged = detector.detect(transactions)?;
        let summary = DetectionSummary::from_flagged(detector.method(), &flagged, transactions.len());
        log::info!(
            "{}: flagged {} of {} transactions ({:.2}%)",
            summary.method,
            summary.flagged,
            summary.total,
            summary.flagged_pct
        );
        summaries.push(summary);
        results.push(flagged);
    }

    let mut results = results.into_iter();
    let zscore = results.next().unwrap_or_default();
    let iqr = results.next().unwrap_or_default();
    let median = results.next().unwrap_or_default();
    let flagged = merge_flagged(zscore, iqr, median);
    log::info!("merged anomalies: {} unique transactions", flagged.len());

    Ok(AnomalyReport { summaries, flagged })
}

/// Keep the transactions matching `predicate`, tagged with `method`.
fn flag_where(
    transactions: &[Transaction],
    method: DetectionMethod,
    predicate: impl Fn(f64) -> bool,
) -> Vec<FlaggedTransaction> {
    transactions
        .iter()
        .filter(|txn| predicate(txn.total_amount))
        .map(|txn| FlaggedTransaction::new(txn.clone(), method))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::record::Transaction;
    use chrono::{Duration, NaiveDate};

    /// One transaction per amount, an hour apart, all for the same customer
    pub fn transactions_with_amounts(amounts: &[f64]) -> Vec<Transaction> {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| {
                Transaction::with_total(
                    "STD_1",
                    start + Duration::hours(i as i64),
                    amount,
                    1,
                    0.0,
                    Some(amount),
                )
            })
            .collect()
    }
}
