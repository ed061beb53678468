//! Tunable parameters for the detectors and the clustering engine.
//!
//! Every field has a documented default and can be overridden either from a JSON
//! file or programmatically. Nothing here reads the environment.

use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds for the three amount-based anomaly detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Absolute z-score above which a transaction is flagged
    pub zscore_threshold: f64,
    /// Fence width in IQRs beyond Q1/Q3
    pub iqr_multiplier: f64,
    /// Flag amounts above `median_multiplier * median`
    pub median_multiplier: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            zscore_threshold: 3.0,
            iqr_multiplier: 1.5,
            median_multiplier: 5.0,
        }
    }
}

/// Parameters for k-means over daily feature vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of clusters (k)
    pub n_clusters: usize,
    /// Maximum Lloyd iterations per run
    pub max_iters: usize,
    /// Convergence tolerance on centroid movement
    pub tolerance: f64,
    /// Independent k-means++ restarts; the lowest-inertia run wins
    pub n_runs: usize,
    /// Seed for the k-means RNG
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            max_iters: 300,
            tolerance: 1e-4,
            n_runs: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detectors: DetectorConfig,
    pub clustering: ClusterConfig,
}

impl AnalysisConfig {
    /// Load a config from a JSON file. Missing fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        self.detectors.validate()?;
        self.clustering.validate()
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        positive("zscore_threshold", self.zscore_threshold)?;
        positive("iqr_multiplier", self.iqr_multiplier)?;
        positive("median_multiplier", self.median_multiplier)
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.n_clusters == 0 {
            return Err(AnalysisError::InvalidConfig {
                param: "n_clusters",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_iters == 0 {
            return Err(AnalysisError::InvalidConfig {
                param: "max_iters",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.n_runs == 0 {
            return Err(AnalysisError::InvalidConfig {
                param: "n_runs",
                reason: "must be at least 1".to_string(),
            });
        }
        positive("tolerance", self.tolerance)
    }
}

fn positive(param: &'static str, value: f64) -> AnalysisResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig {
            param,
            reason: format!("must be a positive finite number, got {value}"),
        })
    }
}
