//! Transaction loading from CSV using Polars

use crate::record::Transaction;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;

/// Columns every input file must carry
pub const REQUIRED_COLUMNS: [&str; 5] = ["customer_id", "order_date", "price", "quantity", "discount"];

/// Transactions read from one file, plus the rows dropped for missing values
#[derive(Debug)]
pub struct LoadedBatch {
    /// Fully populated transactions, in file order
    pub transactions: Vec<Transaction>,
    /// 1-based data-row numbers that had a missing required field
    pub bad_rows: Vec<usize>,
}

impl LoadedBatch {
    pub fn total_rows(&self) -> usize {
        self.transactions.len() + self.bad_rows.len()
    }
}

/// Load a transaction CSV
///
/// # Arguments
/// * `file_path` - Path to a CSV with `customer_id, order_date, price, quantity, discount`
///   and optionally `total_amount`
///
/// # Returns
/// * `LoadedBatch` with the good rows as `Transaction`s and the numbers of dropped rows
pub fn load_transactions(file_path: impl AsRef<Path>) -> crate::Result<LoadedBatch> {
    let file_path = file_path.as_ref();
    let df = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .finish()?
        .collect()
        .with_context(|| format!("failed to read {}", file_path.display()))?;

    if df.height() == 0 {
        anyhow::bail!("No rows found in {}", file_path.display());
    }

    let customer_ids = string_column(&df, "customer_id")?;
    let order_dates = string_column(&df, "order_date")?;
    let prices = f64_column(&df, "price")?;
    let quantities = i64_column(&df, "quantity")?;
    let discounts = f64_column(&df, "discount")?;
    let totals = if df.get_column_names().contains(&"total_amount") {
        Some(f64_column(&df, "total_amount")?)
    } else {
        None
    };

    let mut transactions = Vec::with_capacity(df.height());
    let mut bad_rows = Vec::new();

    for row in 0..df.height() {
        let (Some(customer_id), Some(raw_date), Some(price), Some(quantity), Some(discount)) = (
            customer_ids[row].as_ref(),
            order_dates[row].as_ref(),
            prices[row],
            quantities[row],
            discounts[row],
        ) else {
            bad_rows.push(row + 1);
            continue;
        };

        let order_date = parse_order_date(raw_date)
            .with_context(|| format!("row {}: unparseable order_date '{raw_date}'", row + 1))?;
        let quantity = u32::try_from(quantity)
            .with_context(|| format!("row {}: quantity {quantity} out of range", row + 1))?;
        let total = totals.as_ref().and_then(|t| t[row]);

        transactions.push(Transaction::with_total(
            customer_id.clone(),
            order_date,
            price,
            quantity,
            discount,
            total,
        ));
    }

    if !bad_rows.is_empty() {
        log::warn!(
            "dropped {} of {} rows with missing values",
            bad_rows.len(),
            df.height()
        );
    }
    if transactions.is_empty() {
        anyhow::bail!("No valid data found after dropping incomplete rows");
    }
    log::info!("loaded {} transactions from {}", transactions.len(), file_path.display());

    Ok(LoadedBatch {
        transactions,
        bad_rows,
    })
}

/// Parse timestamps as written by common CSV exporters; a bare date means midnight.
pub fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    let naive = raw.trim_end_matches('Z');
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(naive, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn required(df: &DataFrame, name: &str) -> crate::Result<Series> {
    df.column(name)
        .cloned()
        .with_context(|| format!("missing required column '{name}'"))
}

fn string_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let series = required(df, name)?.cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

fn f64_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let series = required(df, name)?
        .strict_cast(&DataType::Float64)
        .with_context(|| format!("column '{name}' is not numeric"))?;
    Ok(series.f64()?.into_iter().collect())
}

fn i64_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<i64>>> {
    let series = required(df, name)?
        .strict_cast(&DataType::Int64)
        .with_context(|| format!("column '{name}' is not an integer"))?;
    Ok(series.i64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(with_total: bool) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        if with_total {
            writeln!(file, "product_name,customer_id,order_date,price,quantity,discount,total_amount").unwrap();
            writeln!(file, "Product_7,STD_42,2022-01-01 00:00:00,20.0,2,0.1,99.0").unwrap();
            writeln!(file, "Product_3,STD_42,2022-01-01 01:00:00,10.0,1,0.0,").unwrap();
        } else {
            writeln!(file, "product_name,customer_id,order_date,price,quantity,discount").unwrap();
            writeln!(file, "Product_7,STD_42,2022-01-01 00:00:00,20.0,2,0.1").unwrap();
            writeln!(file, "Product_3,STD_42,2022-01-01 01:00:00,,1,0.0").unwrap();
            writeln!(file, "Product_9,STD_42,2022-01-02T05:30:00,15.5,3,0.25").unwrap();
        }
        file
    }

    #[test]
    fn test_load_drops_incomplete_rows() {
        let file = create_test_csv(false);
        let batch = load_transactions(file.path()).unwrap();

        assert_eq!(batch.transactions.len(), 2);
        assert_eq!(batch.bad_rows, vec![2]);
        assert_eq!(batch.total_rows(), 3);

        let first = &batch.transactions[0];
        assert_eq!(first.customer_id, "STD_42");
        assert!((first.total_amount - 36.0).abs() < 1e-9);
        // 3 * 15.5 * 0.75 = 34.875
        assert!((batch.transactions[1].total_amount - 34.88).abs() < 1e-9);
    }

    #[test]
    fn test_load_trusts_present_totals() {
        let file = create_test_csv(true);
        let batch = load_transactions(file.path()).unwrap();

        assert_eq!(batch.transactions[0].total_amount, 99.0);
        assert_eq!(batch.transactions[1].total_amount, 10.0);
        assert!(batch.bad_rows.is_empty());
    }

    #[test]
    fn test_missing_column_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "customer_id,order_date,price,quantity").unwrap();
        writeln!(file, "STD_1,2022-01-01 00:00:00,1.0,1").unwrap();
        assert!(load_transactions(file.path()).is_err());
    }

    #[test]
    fn test_parse_order_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2022, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        assert_eq!(parse_order_date("2022-03-04 05:06:07"), Some(expected));
        assert_eq!(parse_order_date("2022-03-04T05:06:07"), Some(expected));
        assert_eq!(parse_order_date("2022-03-04T05:06:07Z"), Some(expected));
        assert_eq!(
            parse_order_date("2022-03-04"),
            NaiveDate::from_ymd_opt(2022, 3, 4).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_order_date("yesterday"), None);
    }
}
