//! Principal component projection of standardized day features to 2D.
//!
//! Used only for visualization; nothing here feeds back into clustering.

use ndarray::{s, Array1, Array2, Axis};

/// Eigenvalue decomposition of a symmetric matrix
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues, sorted descending
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns, in eigenvalue order
    pub eigenvectors: Array2<f64>,
}

impl EigenDecomposition {
    /// Cyclic Jacobi rotations until the off-diagonal mass vanishes
    pub fn from_symmetric(matrix: &Array2<f64>) -> Self {
        const MAX_SWEEPS: usize = 100;
        const TOL: f64 = 1e-14;

        let n = matrix.nrows();
        let mut a = matrix.clone();
        let mut v = Array2::<f64>::eye(n);

        for _ in 0..MAX_SWEEPS {
            let off: f64 = (0..n)
                .flat_map(|p| (p + 1..n).map(move |q| (p, q)))
                .map(|(p, q)| a[[p, q]].powi(2))
                .sum();
            if off < TOL {
                break;
            }

            for p in 0..n {
                for q in p + 1..n {
                    if a[[p, q]].abs() < f64::MIN_POSITIVE {
                        continue;
                    }
                    let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                    let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                    let c = 1.0 / (t * t + 1.0).sqrt();
                    let s = t * c;

                    for k in 0..n {
                        let (akp, akq) = (a[[k, p]], a[[k, q]]);
                        a[[k, p]] = c * akp - s * akq;
                        a[[k, q]] = s * akp + c * akq;
                    }
                    for k in 0..n {
                        let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                        a[[p, k]] = c * apk - s * aqk;
                        a[[q, k]] = s * apk + c * aqk;
                    }
                    for k in 0..n {
                        let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                        v[[k, p]] = c * vkp - s * vkq;
                        v[[k, q]] = s * vkp + c * vkq;
                    }
                }
            }
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

        let eigenvalues = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
        let mut eigenvectors = Array2::zeros((n, n));
        for (dst, &src) in order.iter().enumerate() {
            let mut column = v.column(src).to_owned();
            // Deterministic sign: largest-magnitude loading positive
            let pivot = column
                .iter()
                .copied()
                .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
            if pivot < 0.0 {
                column.mapv_inplace(|x| -x);
            }
            eigenvectors.column_mut(dst).assign(&column);
        }

        Self {
            eigenvalues,
            eigenvectors,
        }
    }
}

/// Sample covariance (n - 1 denominator) of the columns of `data`
pub fn covariance_matrix(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let n_features = data.ncols();
    if n < 2 {
        return Array2::zeros((n_features, n_features));
    }
    let mean = data
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(n_features));
    let centered = data - &mean;
    centered.t().dot(&centered) / (n as f64 - 1.0)
}

/// 2D coordinates of each day plus how much variance the two axes capture
#[derive(Debug, Clone)]
pub struct Projection {
    /// (n_days, 2) scores on the first two principal components
    pub coords: Array2<f64>,
    /// (n_features, 2) principal axes
    pub components: Array2<f64>,
    pub explained_variance_ratio: [f64; 2],
}

/// Project standardized features onto their two leading principal components
pub fn project_2d(features: &Array2<f64>) -> Projection {
    let n_features = features.ncols();
    let n_components = n_features.min(2);

    let cov = covariance_matrix(features);
    let eigen = EigenDecomposition::from_symmetric(&cov);

    let mut components = Array2::zeros((n_features, 2));
    components
        .slice_mut(s![.., ..n_components])
        .assign(&eigen.eigenvectors.slice(s![.., ..n_components]));

    let mean = features
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(n_features));
    let coords = (features - &mean).dot(&components);

    let total_variance: f64 = eigen.eigenvalues.iter().map(|v| v.max(0.0)).sum();
    let mut explained_variance_ratio = [0.0; 2];
    if total_variance > 0.0 {
        for (i, ratio) in explained_variance_ratio.iter_mut().enumerate().take(n_components) {
            *ratio = eigen.eigenvalues[i].max(0.0) / total_variance;
        }
    }

    log::debug!(
        "pca: explained variance ratio {:.3}, {:.3}",
        explained_variance_ratio[0],
        explained_variance_ratio[1]
    );

    Projection {
        coords,
        components,
        explained_variance_ratio,
    }
}
