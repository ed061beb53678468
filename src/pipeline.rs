//! Runs both analysis branches over one cleaned batch.

use crate::anomaly::{detect_anomalies, AnomalyReport};
use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::features::build_daily_features;
use crate::model::{cluster_daily_patterns, DayPatternClustering};
use crate::record::Transaction;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub anomalies: AnomalyReport,
    pub day_patterns: DayPatternClustering,
}

/// Run anomaly detection and day-pattern clustering over one batch.
///
/// Each stage validates its input, so an empty or malformed batch is rejected
/// by the first detector. The branches share no state; either failing fails
/// the whole call.
pub fn analyze(transactions: &[Transaction], config: &AnalysisConfig) -> AnalysisResult<AnalysisReport> {
    config.validate()?;

    let anomalies = detect_anomalies(transactions, &config.detectors)?;
    let days = build_daily_features(transactions)?;
    let day_patterns = cluster_daily_patterns(&days, &config.clustering)?;

    Ok(AnalysisReport {
        anomalies,
        day_patterns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_batch_is_rejected() {
        let err = analyze(&[], &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateInput { actual: 0, .. }));
    }

    #[test]
    fn test_malformed_batch_is_rejected() {
        let date = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let txns = vec![
            Transaction::new("STD_1", date, 10.0, 1, 0.0),
            Transaction::new("STD_1", date, -5.0, 1, 0.0),
        ];
        let err = analyze(&txns, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::SchemaViolation { row: 2, .. }));
    }
}
