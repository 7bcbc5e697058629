use std::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;
use thiserror::Error;

use crate::services::simulation_result::SimulationResult;

#[derive(Error, Debug)]
pub enum HistogramError {
    #[error("failed to render histogram: {0}")]
    Render(String),
}

/// Renders the distribution of `result` as a bar chart. `x_desc` names the
/// outcome axis, e.g. "Items" or "Days".
pub fn write_histogram_png(output_path: &Path, result: &SimulationResult, x_desc: &str) -> Result<(), HistogramError> {
    if result.is_empty() {
        return Ok(());
    }

    let bin_width = bin_width(result);
    let counts = bin_outcomes(result, bin_width);
    let max_count = counts.values().copied().max().unwrap_or(1);
    let min_bin = counts.keys().next().copied().unwrap_or(0);
    let max_bin = counts.keys().next_back().copied().unwrap_or(0) + 1;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| HistogramError::Render(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Simulation Results", ("sans-serif", 30))
        .x_label_area_size(55)
        .y_label_area_size(65)
        .build_cartesian_2d(min_bin..max_bin, 0..(max_count + 1))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(x_desc)
        .y_desc("Trials")
        .label_style(("sans-serif", 18))
        .axis_desc_style(("sans-serif", 22))
        .x_label_formatter(&|bin| (bin * bin_width).to_string())
        .draw()
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let bar_color = RGBColor(30, 122, 204);
    let bar_style = ShapeStyle::from(&bar_color).filled();
    chart
        .draw_series(
            counts
                .iter()
                .map(|(bin, count)| Rectangle::new([(*bin, 0), (*bin + 1, *count)], bar_style)),
        )
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    root.present().map_err(|e| HistogramError::Render(e.to_string()))?;
    Ok(())
}

/// Square-root rule over the number of trials, never below one outcome.
fn bin_width(result: &SimulationResult) -> usize {
    let (Some((min, _)), Some((max, _))) = (result.outcomes().next(), result.outcomes().next_back()) else {
        return 1;
    };
    let bins = (result.total_trials() as f64).sqrt().max(1.0);
    (((max - min) as f64 / bins).ceil() as usize).max(1)
}

fn bin_outcomes(result: &SimulationResult, bin_width: usize) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for (outcome, count) in result.outcomes() {
        *counts.entry(outcome / bin_width).or_insert(0) += count;
    }
    counts
}
