//! Union, deduplication and ranking of flagged transactions across detectors.

use crate::record::{FlaggedTransaction, Transaction};
use chrono::NaiveDateTime;
use std::collections::HashSet;

/// Identity used for deduplication: (customer_id, order_date, total_amount bits).
///
/// Distinct transactions sharing all three values collapse into one.
pub fn dedup_key(txn: &Transaction) -> (String, NaiveDateTime, u64) {
    // 0.0 and -0.0 compare equal and must share a key
    let amount = if txn.total_amount == 0.0 { 0.0 } else { txn.total_amount };
    (txn.customer_id.clone(), txn.order_date, amount.to_bits())
}

/// Concatenate in ZSCORE, IQR, MEDIAN order, keep the first occurrence of each
/// key, then sort by `total_amount` descending. The sort is stable, so ties keep
/// their concatenation order.
pub fn merge_flagged(
    zscore: Vec<FlaggedTransaction>,
    iqr: Vec<FlaggedTransaction>,
    median: Vec<FlaggedTransaction>,
) -> Vec<FlaggedTransaction> {
    let mut seen = HashSet::new();
    let mut merged: Vec<FlaggedTransaction> = zscore
        .into_iter()
        .chain(iqr)
        .chain(median)
        .filter(|flagged| seen.insert(dedup_key(&flagged.transaction)))
        .collect();

    merged.sort_by(|a, b| b.total_amount().total_cmp(&a.total_amount()));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::test_support::transactions_with_amounts;
    use crate::record::DetectionMethod;

    fn tag(txns: &[Transaction], idx: &[usize], method: DetectionMethod) -> Vec<FlaggedTransaction> {
        idx.iter()
            .map(|&i| FlaggedTransaction::new(txns[i].clone(), method))
            .collect()
    }

    #[test]
    fn test_first_detector_wins() {
        let txns = transactions_with_amounts(&[5.0, 900.0, 450.0, 700.0]);
        let merged = merge_flagged(
            tag(&txns, &[1], DetectionMethod::Zscore),
            tag(&txns, &[1, 2], DetectionMethod::Iqr),
            tag(&txns, &[3, 2, 1], DetectionMethod::Median),
        );

        let summary: Vec<(f64, DetectionMethod)> = merged
            .iter()
            .map(|f| (f.total_amount(), f.detection_method))
            .collect();
        assert_eq!(
            summary,
            vec![
                (900.0, DetectionMethod::Zscore),
                (700.0, DetectionMethod::Median),
                (450.0, DetectionMethod::Iqr),
            ]
        );
    }

    #[test]
    fn test_output_sorted_and_unique() {
        let txns = transactions_with_amounts(&[30.0, 10.0, 30.0, 20.0, 10.0]);
        let all: Vec<usize> = (0..txns.len()).collect();
        let merged = merge_flagged(
            tag(&txns, &all, DetectionMethod::Zscore),
            tag(&txns, &all, DetectionMethod::Iqr),
            Vec::new(),
        );

        // Same amounts on different timestamps are distinct transactions
        assert_eq!(merged.len(), 5);
        assert!(merged
            .windows(2)
            .all(|w| w[0].total_amount() >= w[1].total_amount()));
        let keys: HashSet<_> = merged.iter().map(|f| dedup_key(&f.transaction)).collect();
        assert_eq!(keys.len(), merged.len());

        // Ties keep input order
        assert_eq!(merged[0].transaction, txns[0]);
        assert_eq!(merged[1].transaction, txns[2]);
    }

    #[test]
    fn test_colliding_keys_collapse() {
        let txns = transactions_with_amounts(&[75.0]);
        let mut twin = txns[0].clone();
        twin.price = 25.0;
        twin.quantity = 3;

        let merged = merge_flagged(
            vec![FlaggedTransaction::new(txns[0].clone(), DetectionMethod::Iqr)],
            Vec::new(),
            vec![FlaggedTransaction::new(twin, DetectionMethod::Median)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].detection_method, DetectionMethod::Iqr);
    }

    #[test]
    fn test_all_empty() {
        assert!(merge_flagged(Vec::new(), Vec::new(), Vec::new()).is_empty());
    }
}
