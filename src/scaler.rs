//! Column-wise standardization to zero mean and unit variance.

use crate::stats::VARIANCE_EPSILON;
use ndarray::{Array1, Array2, Axis};

/// Per-column mean and population standard deviation fitted on a feature matrix
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub means: Array1<f64>,
    pub stds: Array1<f64>,
}

impl StandardScaler {
    /// Fit on `features` (n_samples, n_features)
    pub fn fit(features: &Array2<f64>) -> Self {
        let n_features = features.ncols();
        if features.nrows() == 0 {
            return Self {
                means: Array1::zeros(n_features),
                stds: Array1::zeros(n_features),
            };
        }
        let means = features
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let stds = features.std_axis(Axis(0), 0.0);
        Self { means, stds }
    }

    /// Whether column `idx` has no spread; such columns transform to zeros
    pub fn is_constant(&self, idx: usize) -> bool {
        self.stds[idx] < VARIANCE_EPSILON
    }

    /// `(value - mean) / std` per column; zero-variance columns become all zeros.
    pub fn transform(&self, features: &Array2<f64>) -> Array2<f64> {
        let mut scaled = features.clone();
        for (idx, mut column) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            if self.is_constant(idx) {
                column.fill(0.0);
            } else {
                let (mean, std) = (self.means[idx], self.stds[idx]);
                column.mapv_inplace(|v| (v - mean) / std);
            }
        }
        scaled
    }

    pub fn fit_transform(features: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(features);
        let scaled = scaler.transform(features);
        (scaler, scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standardizes_columns() {
        let raw = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let (_, scaled) = StandardScaler::fit_transform(&raw);

        for column in scaled.axis_iter(Axis(1)) {
            assert!(column.mean().unwrap().abs() < 1e-12);
            assert!((column.std(0.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_variance_column_is_zero_filled() {
        let raw = array![[5.0, 1.0], [5.0, 2.0], [5.0, 4.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&raw);

        assert!(scaler.is_constant(0));
        assert!(scaled.column(0).iter().all(|&v| v == 0.0));
        assert!(scaled.iter().all(|v| v.is_finite()));
    }
}
