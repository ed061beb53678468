//! Command-line interface definitions and argument parsing

use crate::config::AnalysisConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which analyses to run
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Flag unusual transactions
    Anomalies,
    /// Cluster days into behavioural groups
    Patterns,
    /// Per-customer descriptive statistics
    Behavior,
    /// Everything above
    All,
}

impl Mode {
    pub fn includes(&self, other: Mode) -> bool {
        *self == Mode::All || *self == other
    }
}

/// Anomaly detection and day-pattern clustering for transaction CSVs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Analyses to run
    #[arg(value_enum, default_value_t = Mode::All)]
    pub mode: Mode,

    /// Path to the input CSV file
    #[arg(short, long, default_value = "transactions.csv")]
    pub input: PathBuf,

    /// Directory for JSON reports and charts
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// JSON file with detector and clustering parameters
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Z-score threshold
    #[arg(long)]
    pub zscore_threshold: Option<f64>,

    /// IQR fence multiplier
    #[arg(long)]
    pub iqr_multiplier: Option<f64>,

    /// Median multiple above which amounts are flagged
    #[arg(long)]
    pub median_multiplier: Option<f64>,

    /// Maximum iterations for K-Means algorithm
    #[arg(long)]
    pub max_iters: Option<usize>,

    /// Tolerance for K-Means convergence
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Seed for K-Means initialization
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Start from the config file (or defaults) and apply any flag overrides.
    pub fn resolve_config(&self) -> crate::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        let detectors = &mut config.detectors;
        if let Some(v) = self.zscore_threshold {
            detectors.zscore_threshold = v;
        }
        if let Some(v) = self.iqr_multiplier {
            detectors.iqr_multiplier = v;
        }
        if let Some(v) = self.median_multiplier {
            detectors.median_multiplier = v;
        }

        let clustering = &mut config.clustering;
        if let Some(v) = self.clusters {
            clustering.n_clusters = v;
        }
        if let Some(v) = self.max_iters {
            clustering.max_iters = v;
        }
        if let Some(v) = self.tolerance {
            clustering.tolerance = v;
        }
        if let Some(v) = self.seed {
            clustering.seed = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["txnlens"]).unwrap();
        assert_eq!(args.mode, Mode::All);
        assert_eq!(args.input, PathBuf::from("transactions.csv"));
        assert_eq!(args.resolve_config().unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::try_parse_from([
            "txnlens",
            "patterns",
            "-k",
            "3",
            "--zscore-threshold",
            "2.5",
            "--seed",
            "7",
        ])
        .unwrap();
        assert_eq!(args.mode, Mode::Patterns);
        assert!(args.mode.includes(Mode::Patterns));
        assert!(!args.mode.includes(Mode::Anomalies));

        let config = args.resolve_config().unwrap();
        assert_eq!(config.clustering.n_clusters, 3);
        assert_eq!(config.clustering.seed, 7);
        assert_eq!(config.detectors.zscore_threshold, 2.5);
        assert_eq!(config.detectors.median_multiplier, 5.0);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::try_parse_from(["txnlens", "-k", "0"]).unwrap();
        assert!(args.resolve_config().is_err());
    }
}
