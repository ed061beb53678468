//! SVG charts of the day-pattern clusters using Plotters

use crate::model::{ClusterSummary, DayPatternClustering};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

/// Color palette for different clusters, reused cyclically
const CLUSTER_COLORS: [RGBColor; 6] = [RED, BLUE, GREEN, MAGENTA, CYAN, RGBColor(255, 140, 0)];

fn cluster_color(cluster_id: usize) -> RGBColor {
    CLUSTER_COLORS[cluster_id % CLUSTER_COLORS.len()]
}

/// Min/max with padding; a flat range is widened so the axis stays drawable
fn padded_range(values: impl Iterator<Item = f64> + Clone) -> std::ops::Range<f64> {
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return -1.0..1.0;
    }
    let pad = ((max - min) * 0.1).max(0.5);
    (min - pad)..(max + pad)
}

/// Scatter plot of days on the first two principal components, colored by cluster
///
/// # Arguments
/// * `result` - Clustering output including the 2D projection
/// * `output_path` - Path to save the SVG plot
pub fn create_projection_chart(result: &DayPatternClustering, output_path: &Path) -> crate::Result<()> {
    let points = &result.projection;
    let x_range = padded_range(points.iter().map(|p| p.pc1));
    let y_range = padded_range(points.iter().map(|p| p.pc2));
    let [ratio1, ratio2] = result.explained_variance_ratio;

    let root = SVGBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily patterns (PCA)", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(format!("Principal component 1 ({:.1}%)", ratio1 * 100.0))
        .y_desc(format!("Principal component 2 ({:.1}%)", ratio2 * 100.0))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for summary in &result.summaries {
        let color = cluster_color(summary.cluster_id);
        chart
            .draw_series(
                points
                    .iter()
                    .filter(|p| p.cluster_id == summary.cluster_id)
                    .map(|p| Circle::new((p.pc1, p.pc2), 5, color.filled())),
            )?
            .label(format!("Cluster {} ({} days)", summary.cluster_id, summary.member_days))
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    log::info!("projection chart saved to {}", output_path.display());

    Ok(())
}

/// Bar chart of mean daily revenue per cluster
pub fn create_cluster_revenue_chart(summaries: &[ClusterSummary], output_path: &Path) -> crate::Result<()> {
    let max_revenue = summaries
        .iter()
        .map(|s| s.mean_total_revenue)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let root = SVGBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Mean daily revenue by cluster", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(summaries.len() as f64 - 0.5), 0f64..(max_revenue * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("Cluster ID")
        .y_desc("Revenue")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(summaries.iter().enumerate().map(|(i, summary)| {
        let x = i as f64;
        Rectangle::new(
            [(x - 0.4, 0.0), (x + 0.4, summary.mean_total_revenue)],
            cluster_color(summary.cluster_id).filled(),
        )
    }))?;

    root.present()?;
    log::info!("revenue chart saved to {}", output_path.display());

    Ok(())
}

/// Render every chart into `output_dir`, returning the written paths
pub fn generate_chart_report(result: &DayPatternClustering, output_dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let projection_path = output_dir.join("daily_patterns_pca.svg");
    create_projection_chart(result, &projection_path)?;

    let revenue_path = output_dir.join("daily_patterns_revenue.svg");
    create_cluster_revenue_chart(&result.summaries, &revenue_path)?;

    Ok(vec![projection_path, revenue_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterConfig;
    use crate::model::{cluster_daily_patterns, test_support::eight_days};
    use tempfile::tempdir;

    fn create_test_result() -> DayPatternClustering {
        cluster_daily_patterns(&eight_days(), &ClusterConfig::default()).unwrap()
    }

    #[test]
    fn test_create_projection_chart() {
        let result = create_test_result();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("test_pca.svg");

        create_projection_chart(&result, &output_path).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_generate_chart_report() {
        let result = create_test_result();
        let temp_dir = tempdir().unwrap();

        let written = generate_chart_report(&result, temp_dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_padded_range_handles_flat_values() {
        let range = padded_range([3.0, 3.0].into_iter());
        assert!(range.start < 3.0 && range.end > 3.0);
        assert_eq!(padded_range(std::iter::empty::<f64>()), -1.0..1.0);
    }
}
