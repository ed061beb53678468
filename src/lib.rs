//! txnlens: anomaly detection and day-pattern clustering for e-commerce transactions
//!
//! The library flags unusual transactions with three amount-based detectors and
//! groups calendar days into behavioural clusters with K-Means, projecting them to
//! 2D for inspection. CSV loading, JSON reports and SVG charts live at the edges.

pub mod anomaly;
pub mod behavior;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod pca;
pub mod pipeline;
pub mod record;
pub mod scaler;
pub mod stats;
pub mod viz;

// Re-export public items for easier access
pub use anomaly::{detect_anomalies, merge_flagged, AnomalyDetector, AnomalyReport, DetectionSummary};
pub use cli::Args;
pub use config::{AnalysisConfig, ClusterConfig, DetectorConfig};
pub use data::{load_transactions, LoadedBatch};
pub use error::{AnalysisError, AnalysisResult};
pub use features::build_daily_features;
pub use model::{cluster_daily_patterns, fit_kmeans, ClusterSummary, DayPatternClustering, KMeansModel};
pub use pipeline::{analyze, AnalysisReport};
pub use record::{
    ClusterAssignment, DailyFeatureVector, DetectionMethod, FlaggedTransaction, Transaction,
};

/// Result type for the I/O-facing parts of the crate
pub type Result<T> = anyhow::Result<T>;
