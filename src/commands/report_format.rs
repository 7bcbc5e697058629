use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::services::forecast::{ForecastPercentiles, HowManyForecast, WhenForecast};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HowManyReport {
    pub data_source: String,
    pub days: usize,
    pub trials: usize,
    pub percentiles: ForecastPercentiles,
    pub predictability_score: f64,
}

impl HowManyReport {
    pub fn new(data_source: impl Into<String>, forecast: &HowManyForecast) -> Self {
        Self {
            data_source: data_source.into(),
            days: forecast.days(),
            trials: forecast.simulation_result().total_trials(),
            percentiles: forecast.percentiles(),
            predictability_score: forecast.predictability_score(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DatedPercentile {
    pub days: usize,
    pub date: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WhenReport {
    pub data_source: String,
    pub start_date: String,
    pub remaining_items: usize,
    pub trials: usize,
    pub p50: DatedPercentile,
    pub p70: DatedPercentile,
    pub p85: DatedPercentile,
    pub p95: DatedPercentile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<f64>,
}

impl WhenReport {
    pub fn new(
        data_source: impl Into<String>,
        forecast: &WhenForecast,
        start_date: NaiveDate,
        remaining_items: usize,
        target_date: Option<NaiveDate>,
    ) -> Self {
        let dated = |days: usize| DatedPercentile {
            days,
            date: format_date(start_date + Duration::days(days as i64)),
        };
        let percentiles = forecast.percentiles();
        let likelihood = target_date.map(|target| {
            let days = (target - start_date).num_days().max(0) as usize;
            forecast.get_likelihood(days)
        });

        Self {
            data_source: data_source.into(),
            start_date: format_date(start_date),
            remaining_items,
            trials: forecast.simulation_result().total_trials(),
            p50: dated(percentiles.p50),
            p70: dated(percentiles.p70),
            p85: dated(percentiles.p85),
            p95: dated(percentiles.p95),
            target_date: target_date.map(format_date),
            likelihood,
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_how_many_report(report: &HowManyReport) -> String {
    let mut lines = Vec::new();
    lines.push("How Many Forecast".to_string());
    lines.push(format!("Data source: {}", report.data_source));
    lines.push(format!("Days: {}", report.days));
    lines.push(format!("Trials: {}", report.trials));
    lines.push(format!("Predictability: {:.2}", report.predictability_score));
    lines.push(String::new());
    lines.push("Percentile | Items".to_string());
    lines.push("-----------|------".to_string());
    for (label, items) in percentile_rows(&report.percentiles) {
        lines.push(format!("{label} | {items}"));
    }

    lines.join("\n")
}

pub fn format_when_report(report: &WhenReport) -> String {
    let mut lines = Vec::new();
    lines.push("When Forecast".to_string());
    lines.push(format!("Data source: {}", report.data_source));
    lines.push(format!("Start date: {}", report.start_date));
    lines.push(format!("Remaining items: {}", report.remaining_items));
    lines.push(format!("Trials: {}", report.trials));
    if let (Some(target), Some(likelihood)) = (&report.target_date, report.likelihood) {
        lines.push(format!("Likelihood by {target}: {likelihood:.1}%"));
    }
    lines.push(String::new());
    lines.push("Percentile | Days | Date".to_string());
    lines.push("-----------|------|-----".to_string());
    for (label, percentile) in [("P50", &report.p50), ("P70", &report.p70), ("P85", &report.p85), ("P95", &report.p95)] {
        lines.push(format!("{label} | {} | {}", percentile.days, percentile.date));
    }

    lines.join("\n")
}

fn percentile_rows(percentiles: &ForecastPercentiles) -> [(&'static str, usize); 4] {
    [
        ("P50", percentiles.p50),
        ("P70", percentiles.p70),
        ("P85", percentiles.p85),
        ("P95", percentiles.p95),
    ]
}
