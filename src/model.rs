//! Day-pattern clustering: standardization, K-Means partitioning and 2D projection

use crate::config::ClusterConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::pca::project_2d;
use crate::record::{ClusterAssignment, DailyFeatureVector};
use crate::scaler::StandardScaler;
use chrono::NaiveDate;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Fitted K-Means partition of standardized day vectors
#[derive(Debug)]
pub struct KMeansModel {
    /// Number of non-empty clusters after relabeling
    pub n_clusters: usize,
    /// Cluster assignment per input row, numbered by first appearance
    pub labels: Array1<usize>,
    /// Cluster centroids in standardized space, row `i` belongs to label `i`
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares (inertia)
    pub inertia: f64,
}

impl KMeansModel {
    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            sizes[label] += 1;
        }
        sizes
    }

    /// Mean silhouette coefficient over every row of `features`
    pub fn silhouette(&self, features: &Array2<f64>) -> f64 {
        let n_samples = features.nrows();
        if n_samples < 2 || self.n_clusters < 2 {
            return 0.0;
        }

        let mut silhouette_sum = 0.0;

        for i in 0..n_samples {
            let point = features.row(i);
            let cluster_label = self.labels[i];

            let mut same_cluster_distances = Vec::new();
            let mut other_cluster_distances: Vec<Vec<f64>> = vec![Vec::new(); self.n_clusters];

            for j in 0..n_samples {
                if i == j {
                    continue;
                }

                let distance = euclidean_distance(&point, &features.row(j));
                let other_label = self.labels[j];

                if other_label == cluster_label {
                    same_cluster_distances.push(distance);
                } else {
                    other_cluster_distances[other_label].push(distance);
                }
            }

            // Singleton clusters score 0
            if same_cluster_distances.is_empty() {
                continue;
            }
            let a_i = same_cluster_distances.iter().sum::<f64>() / same_cluster_distances.len() as f64;

            let b_i = other_cluster_distances
                .iter()
                .filter(|distances| !distances.is_empty())
                .map(|distances| distances.iter().sum::<f64>() / distances.len() as f64)
                .fold(f64::INFINITY, f64::min);

            let silhouette_i = if b_i.is_infinite() || (a_i == 0.0 && b_i == 0.0) {
                0.0
            } else {
                (b_i - a_i) / a_i.max(b_i)
            };

            silhouette_sum += silhouette_i;
        }

        silhouette_sum / n_samples as f64
    }
}

/// Fit K-Means on standardized features
///
/// # Arguments
/// * `features` - Standardized feature matrix (n_days, n_features)
/// * `config` - Cluster count, iteration cap, tolerance, restarts and seed
///
/// # Returns
/// * Fitted `KMeansModel` with labels renumbered by first appearance
pub fn fit_kmeans(features: &Array2<f64>, config: &ClusterConfig) -> AnalysisResult<KMeansModel> {
    config.validate()?;

    let n_samples = features.nrows();
    let distinct_points = count_distinct_rows(features);
    if distinct_points < config.n_clusters {
        return Err(AnalysisError::DegenerateInput {
            stage: "k-means",
            required: config.n_clusters,
            actual: distinct_points,
        });
    }

    // Create dataset for linfa
    let targets: Array1<usize> = Array1::zeros(n_samples);
    let dataset = Dataset::new(features.clone(), targets);

    let rng = Pcg64Mcg::seed_from_u64(config.seed);
    let model = KMeans::params_with(config.n_clusters, rng, L2Dist)
        .n_runs(config.n_runs)
        .max_n_iterations(config.max_iters as u64)
        .tolerance(config.tolerance)
        .fit(&dataset)
        .map_err(|e| AnalysisError::Clustering {
            stage: "k-means",
            message: e.to_string(),
        })?;

    let raw_labels: Array1<usize> = model.predict(&dataset);
    let (labels, centroids) = relabel_by_first_appearance(&raw_labels, model.centroids());
    let n_clusters = centroids.nrows();
    if n_clusters < config.n_clusters {
        return Err(AnalysisError::Clustering {
            stage: "k-means",
            message: format!(
                "{} of {} clusters ended up empty",
                config.n_clusters - n_clusters,
                config.n_clusters
            ),
        });
    }

    let inertia = compute_inertia(features, &labels, &centroids);

    Ok(KMeansModel {
        n_clusters,
        labels,
        centroids,
        inertia,
    })
}

/// Number of distinct points; -0.0 and 0.0 count as the same coordinate
fn count_distinct_rows(features: &Array2<f64>) -> usize {
    features
        .outer_iter()
        .map(|row| row.iter().map(|v| (v + 0.0).to_bits()).collect::<Vec<u64>>())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Renumber clusters in order of first appearance and drop empty ones, so the
/// backend's internal numbering never leaks to callers.
fn relabel_by_first_appearance(
    raw_labels: &Array1<usize>,
    raw_centroids: &Array2<f64>,
) -> (Array1<usize>, Array2<f64>) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let mut order = Vec::new();
    let labels = raw_labels.mapv(|raw| {
        let next = mapping.len();
        *mapping.entry(raw).or_insert_with(|| {
            order.push(raw);
            next
        })
    });

    let mut centroids = Array2::zeros((order.len(), raw_centroids.ncols()));
    for (new, &raw) in order.iter().enumerate() {
        centroids.row_mut(new).assign(&raw_centroids.row(raw));
    }
    (labels, centroids)
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    labels
        .iter()
        .enumerate()
        .map(|(i, &cluster)| {
            let d = euclidean_distance(&features.row(i), &centroids.row(cluster));
            d * d
        })
        .sum()
}

/// Calculate Euclidean distance between two points
fn euclidean_distance(point1: &ArrayView1<f64>, point2: &ArrayView1<f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Human-readable profile of one cluster, in original (unstandardized) units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub member_days: usize,
    pub mean_total_revenue: f64,
    pub mean_total_orders: f64,
    pub mean_avg_order_value: f64,
    pub mean_total_items: f64,
    pub mean_avg_discount: f64,
}

/// One day's position on the first two principal components
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedDay {
    pub date: NaiveDate,
    pub cluster_id: usize,
    pub pc1: f64,
    pub pc2: f64,
}

/// Everything a clustering run produces
#[derive(Debug, Clone, Serialize)]
pub struct DayPatternClustering {
    pub assignments: Vec<ClusterAssignment>,
    pub summaries: Vec<ClusterSummary>,
    pub projection: Vec<ProjectedDay>,
    pub explained_variance_ratio: [f64; 2],
    pub inertia: f64,
    pub silhouette: f64,
}

/// Standardize, partition and project daily feature vectors
pub fn cluster_daily_patterns(
    days: &[DailyFeatureVector],
    config: &ClusterConfig,
) -> AnalysisResult<DayPatternClustering> {
    config.validate()?;

    let distinct_days = days.iter().map(|d| d.date).collect::<BTreeSet<_>>().len();
    if distinct_days < config.n_clusters {
        return Err(AnalysisError::DegenerateInput {
            stage: "day-pattern clustering",
            required: config.n_clusters,
            actual: distinct_days,
        });
    }

    let raw = feature_matrix(days);
    let (scaler, scaled) = StandardScaler::fit_transform(&raw);
    for idx in (0..raw.ncols()).filter(|&idx| scaler.is_constant(idx)) {
        log::debug!(
            "standardization: feature '{}' has zero variance, zero-filled",
            crate::record::FEATURE_NAMES[idx]
        );
    }

    let model = fit_kmeans(&scaled, config)?;
    log::debug!("k-means cluster sizes: {:?}", model.cluster_sizes());
    let silhouette = model.silhouette(&scaled);
    log::info!(
        "day-pattern clustering: {} days into {} clusters, inertia {:.3}, silhouette {:.3}",
        days.len(),
        model.n_clusters,
        model.inertia,
        silhouette
    );

    let assignments: Vec<ClusterAssignment> = days
        .iter()
        .zip(model.labels.iter())
        .map(|(day, &cluster_id)| ClusterAssignment {
            features: day.clone(),
            cluster_id,
        })
        .collect();

    let summaries = summarize_clusters(&assignments, model.n_clusters);
    for summary in &summaries {
        log::info!(
            "cluster {} ({} days): revenue/day {:.2}, orders/day {:.0}, avg order {:.2}, items/day {:.0}, discount {:.2}%",
            summary.cluster_id,
            summary.member_days,
            summary.mean_total_revenue,
            summary.mean_total_orders,
            summary.mean_avg_order_value,
            summary.mean_total_items,
            summary.mean_avg_discount * 100.0
        );
    }

    let projected = project_2d(&scaled);
    let projection = assignments
        .iter()
        .zip(projected.coords.outer_iter())
        .map(|(assignment, coords)| ProjectedDay {
            date: assignment.features.date,
            cluster_id: assignment.cluster_id,
            pc1: coords[0],
            pc2: coords[1],
        })
        .collect();

    Ok(DayPatternClustering {
        assignments,
        summaries,
        projection,
        explained_variance_ratio: projected.explained_variance_ratio,
        inertia: model.inertia,
        silhouette,
    })
}

/// Stack day vectors into an (n_days, 5) matrix
pub fn feature_matrix(days: &[DailyFeatureVector]) -> Array2<f64> {
    let mut matrix = Array2::zeros((days.len(), crate::record::FEATURE_NAMES.len()));
    for (mut row, day) in matrix.outer_iter_mut().zip(days) {
        row.assign(&ArrayView1::from(&day.values()));
    }
    matrix
}

/// Per-cluster member count and mean of each original feature
pub fn summarize_clusters(assignments: &[ClusterAssignment], n_clusters: usize) -> Vec<ClusterSummary> {
    let mut sums = vec![[0.0_f64; 5]; n_clusters];
    let mut counts = vec![0_usize; n_clusters];
    for assignment in assignments {
        counts[assignment.cluster_id] += 1;
        for (acc, value) in sums[assignment.cluster_id].iter_mut().zip(assignment.features.values()) {
            *acc += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .enumerate()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(cluster_id, (sum, count))| {
            let mean = |idx: usize| sum[idx] / count as f64;
            ClusterSummary {
                cluster_id,
                member_days: count,
                mean_total_revenue: mean(0),
                mean_total_orders: mean(1),
                mean_avg_order_value: mean(2),
                mean_total_items: mean(3),
                mean_avg_discount: mean(4),
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::record::DailyFeatureVector;
    use chrono::{Duration, NaiveDate};

    /// Eight days forming four well separated pairs of behaviour
    pub fn eight_days() -> Vec<DailyFeatureVector> {
        let profiles: [(f64, usize, u64, f64); 8] = [
            (1_000.0, 10, 30, 0.10),
            (1_050.0, 11, 31, 0.11),
            (20_000.0, 200, 600, 0.10),
            (20_500.0, 205, 610, 0.12),
            (1_000.0, 10, 30, 0.45),
            (1_020.0, 10, 29, 0.44),
            (20_000.0, 40, 120, 0.30),
            (19_800.0, 41, 118, 0.31),
        ];
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        profiles
            .iter()
            .enumerate()
            .map(|(i, &(revenue, orders, items, discount))| DailyFeatureVector {
                date: start + Duration::days(i as i64),
                total_revenue: revenue,
                total_orders: orders,
                avg_order_value: revenue / orders as f64,
                total_items: items,
                avg_discount: discount,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::eight_days;
    use super::*;
    use ndarray::array;

    #[test]
    fn test_eight_days_four_clusters() {
        let days = eight_days();
        let result = cluster_daily_patterns(&days, &ClusterConfig::default()).unwrap();

        assert_eq!(result.assignments.len(), 8);
        assert_eq!(result.summaries.len(), 4);
        assert!(result.summaries.iter().all(|s| s.member_days > 0));
        assert_eq!(result.summaries.iter().map(|s| s.member_days).sum::<usize>(), 8);
        assert!(result.assignments.iter().all(|a| a.cluster_id < 4));

        // Each behavioural pair lands together
        for pair in result.assignments.chunks(2) {
            assert_eq!(pair[0].cluster_id, pair[1].cluster_id);
        }
        // First-appearance numbering
        let ids: Vec<usize> = result.assignments.iter().step_by(2).map(|a| a.cluster_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(result.silhouette > 0.5);
    }

    #[test]
    fn test_too_few_days_is_degenerate() {
        let config = ClusterConfig {
            n_clusters: 10,
            ..ClusterConfig::default()
        };
        let err = cluster_daily_patterns(&eight_days(), &config).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DegenerateInput { required: 10, actual: 8, .. }
        ));
    }

    #[test]
    fn test_repeated_day_profiles_are_degenerate() {
        // Eight dates but only two distinct behaviours
        let templates = eight_days();
        let days: Vec<DailyFeatureVector> = eight_days()
            .into_iter()
            .enumerate()
            .map(|(i, mut day)| {
                let template = &templates[i % 2 * 2];
                day.total_revenue = template.total_revenue;
                day.total_orders = template.total_orders;
                day.avg_order_value = template.avg_order_value;
                day.total_items = template.total_items;
                day.avg_discount = template.avg_discount;
                day
            })
            .collect();

        let err = cluster_daily_patterns(&days, &ClusterConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DegenerateInput { stage: "k-means", required: 4, actual: 2 }
        ));

        let config = ClusterConfig {
            n_clusters: 2,
            ..ClusterConfig::default()
        };
        let result = cluster_daily_patterns(&days, &config).unwrap();
        let ids: Vec<usize> = result.assignments.iter().map(|a| a.cluster_id).collect();
        assert_eq!(ids, vec![0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_identical_days_are_degenerate() {
        let days: Vec<DailyFeatureVector> = eight_days()
            .into_iter()
            .map(|mut day| {
                day.total_revenue = 500.0;
                day.total_orders = 5;
                day.avg_order_value = 100.0;
                day.total_items = 12;
                day.avg_discount = 0.1;
                day
            })
            .collect();

        let err = cluster_daily_patterns(&days, &ClusterConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DegenerateInput { required: 4, actual: 1, .. }
        ));
    }

    #[test]
    fn test_count_distinct_rows() {
        let features = array![[0.0, 1.0], [-0.0, 1.0], [2.0, 1.0]];
        assert_eq!(count_distinct_rows(&features), 2);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let days = eight_days();
        let config = ClusterConfig {
            n_clusters: 3,
            ..ClusterConfig::default()
        };
        let first = cluster_daily_patterns(&days, &config).unwrap();
        let second = cluster_daily_patterns(&days, &config).unwrap();

        let labels = |r: &DayPatternClustering| r.assignments.iter().map(|a| a.cluster_id).collect::<Vec<_>>();
        assert_eq!(labels(&first), labels(&second));
        assert_eq!(first.projection, second.projection);
    }

    #[test]
    fn test_summary_uses_original_units() {
        let result = cluster_daily_patterns(&eight_days(), &ClusterConfig::default()).unwrap();
        let first = &result.summaries[0];
        assert_eq!(first.member_days, 2);
        assert!((first.mean_total_revenue - 1_025.0).abs() < 1e-9);
        assert!((first.mean_total_orders - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_constant_feature_does_not_break_clustering() {
        let mut days = eight_days();
        for day in &mut days {
            day.avg_discount = 0.2;
        }
        let result = cluster_daily_patterns(&days, &ClusterConfig::default()).unwrap();
        assert!(result.projection.iter().all(|p| p.pc1.is_finite() && p.pc2.is_finite()));
        assert!(result.inertia.is_finite());
    }

    #[test]
    fn test_relabel_drops_empty_clusters() {
        let raw = array![2_usize, 2, 0, 2];
        let centroids = array![[0.0, 0.0], [9.0, 9.0], [1.0, 1.0]];
        let (labels, reordered) = relabel_by_first_appearance(&raw, &centroids);
        assert_eq!(labels, array![0, 0, 1, 0]);
        assert_eq!(reordered, array![[1.0, 1.0], [0.0, 0.0]]);
    }

    #[test]
    fn test_cluster_sizes_and_inertia() {
        let features = array![[0.0, 0.0], [0.0, 2.0], [10.0, 10.0]];
        let model = KMeansModel {
            n_clusters: 2,
            labels: array![0, 0, 1],
            centroids: array![[0.0, 1.0], [10.0, 10.0]],
            inertia: 0.0,
        };
        assert_eq!(model.cluster_sizes(), vec![2, 1]);
        assert!((compute_inertia(&features, &model.labels, &model.centroids) - 2.0).abs() < 1e-12);
        assert!(model.silhouette(&features) > 0.0);
    }
}
