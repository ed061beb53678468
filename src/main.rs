//! txnlens: anomaly detection and day-pattern clustering for transaction CSVs
//!
//! This is the main entrypoint that orchestrates loading, analysis, report
//! writing and chart rendering.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use txnlens::cli::Mode;
use txnlens::{
    behavior, build_daily_features, cluster_daily_patterns, detect_anomalies, load_transactions,
    viz, AnalysisConfig, Args, Transaction,
};

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = args.resolve_config()?;
    log::debug!("configuration: {config:?}");

    let start_time = Instant::now();
    let batch = load_transactions(&args.input)?;
    println!(
        "✓ Data loaded: {} of {} rows ({} incomplete rows dropped)",
        batch.transactions.len(),
        batch.total_rows(),
        batch.bad_rows.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    if args.mode.includes(Mode::Anomalies) {
        run_anomalies(&args, &config, &batch.transactions)?;
    }
    if args.mode.includes(Mode::Patterns) {
        run_patterns(&args, &config, &batch.transactions)?;
    }
    if args.mode.includes(Mode::Behavior) {
        run_behavior(&args, &batch.transactions)?;
    }

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Detect, merge and report anomalous transactions
fn run_anomalies(args: &Args, config: &AnalysisConfig, transactions: &[Transaction]) -> Result<()> {
    println!("\n=== Anomaly Detection ===");
    let report = detect_anomalies(transactions, &config.detectors)?;

    for summary in &report.summaries {
        println!(
            "{:>6}: {} flagged ({:.2}%)",
            summary.method.label(),
            summary.flagged,
            summary.flagged_pct
        );
        if let (Some(mean), Some(min), Some(max)) =
            (summary.mean_amount, summary.min_amount, summary.max_amount)
        {
            println!("        amount mean ${mean:.2}, min ${min:.2}, max ${max:.2}");
        }
    }
    println!("Unique suspect transactions: {}", report.flagged.len());

    let path = args.output_dir.join("suspect_transactions.json");
    write_json(&path, &report)?;
    println!("Report saved to: {}", path.display());
    Ok(())
}

/// Build daily features, cluster them and render charts
fn run_patterns(args: &Args, config: &AnalysisConfig, transactions: &[Transaction]) -> Result<()> {
    println!("\n=== Daily Pattern Clustering ===");
    let days = build_daily_features(transactions)?;
    let result = cluster_daily_patterns(&days, &config.clustering)?;

    for summary in &result.summaries {
        println!("\nCluster {} ({} days):", summary.cluster_id, summary.member_days);
        println!("  Mean revenue/day:     ${:.2}", summary.mean_total_revenue);
        println!("  Mean orders/day:      {:.0}", summary.mean_total_orders);
        println!("  Mean order value:     ${:.2}", summary.mean_avg_order_value);
        println!("  Mean items/day:       {:.0}", summary.mean_total_items);
        println!("  Mean discount:        {:.2}%", summary.mean_avg_discount * 100.0);
    }
    println!("\nWithin-cluster sum of squares: {:.2}", result.inertia);
    println!("Silhouette score: {:.3}", result.silhouette);

    let path = args.output_dir.join("daily_patterns.json");
    write_json(&path, &result)?;
    println!("Report saved to: {}", path.display());

    if !args.no_charts {
        for chart in viz::generate_chart_report(&result, &args.output_dir)? {
            println!("Chart saved to: {}", chart.display());
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct BehaviorReport {
    weekly_spending: Vec<behavior::WeeklySpending>,
    weekly_spending_stats: Vec<behavior::WeeklySpendingStats>,
    customers: Vec<behavior::CustomerBehavior>,
    declining_customers: Vec<behavior::DecliningCustomer>,
}

/// Per-customer descriptive statistics
fn run_behavior(args: &Args, transactions: &[Transaction]) -> Result<()> {
    println!("\n=== Customer Behavior ===");
    let weekly_spending = behavior::weekly_spending(transactions)?;
    let report = BehaviorReport {
        weekly_spending_stats: behavior::weekly_spending_stats(&weekly_spending),
        weekly_spending,
        customers: behavior::customer_behavior(transactions)?,
        declining_customers: behavior::declining_customers(transactions)?,
    };

    println!("Customers: {}", report.customers.len());
    for declining in &report.declining_customers {
        println!(
            "  {} declining over {}: {:?} orders",
            declining.customer_id, declining.period, declining.orders
        );
    }

    let path = args.output_dir.join("customer_behavior.json");
    write_json(&path, &report)?;
    println!("Report saved to: {}", path.display());
    Ok(())
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}
