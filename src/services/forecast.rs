use serde::Serialize;

use crate::services::percentiles::{how_many_percentile, likelihood_within, when_percentile};
use crate::services::simulation_result::SimulationResult;

/// Percentiles reported for every forecast.
pub const REPORTED_PERCENTILES: [f64; 4] = [50.0, 70.0, 85.0, 95.0];

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastPercentiles {
    pub p50: usize,
    pub p70: usize,
    pub p85: usize,
    pub p95: usize,
}

impl ForecastPercentiles {
    fn collect(value_at: impl Fn(f64) -> usize) -> Self {
        let [p50, p70, p85, p95] = REPORTED_PERCENTILES.map(value_at);
        Self { p50, p70, p85, p95 }
    }
}

/// "How many items will be done within `days`?"
#[derive(Debug, Clone, PartialEq)]
pub struct HowManyForecast {
    result: SimulationResult,
    days: usize,
}

impl HowManyForecast {
    pub fn new(result: SimulationResult, days: usize) -> Self {
        Self { result, days }
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn simulation_result(&self) -> &SimulationResult {
        &self.result
    }

    pub fn get_probability(&self, percentile: f64) -> usize {
        how_many_percentile(&self.result, percentile)
    }

    pub fn percentiles(&self) -> ForecastPercentiles {
        ForecastPercentiles::collect(|p| self.get_probability(p))
    }

    /// `p95 / p50`; close to 1.0 means little spread between trials.
    pub fn predictability_score(&self) -> f64 {
        let p50 = self.get_probability(50.0);
        if p50 == 0 {
            return 0.0;
        }
        self.get_probability(95.0) as f64 / p50 as f64
    }
}

/// "When will the remaining items be done?"
#[derive(Debug, Clone, PartialEq)]
pub struct WhenForecast {
    result: SimulationResult,
}

impl WhenForecast {
    pub fn new(result: SimulationResult) -> Self {
        Self { result }
    }

    pub fn simulation_result(&self) -> &SimulationResult {
        &self.result
    }

    pub fn get_probability(&self, percentile: f64) -> usize {
        when_percentile(&self.result, percentile)
    }

    pub fn percentiles(&self) -> ForecastPercentiles {
        ForecastPercentiles::collect(|p| self.get_probability(p))
    }

    pub fn get_likelihood(&self, days_to_target: usize) -> f64 {
        likelihood_within(&self.result, days_to_target)
    }
}

/// Likelihood of delivering a set of items by the target, given each item's
/// individual likelihood. Zero entries (no forecast data) are ignored; the
/// most pessimistic remaining value wins, or 0 when nothing is left.
pub fn delivery_likelihood<I: IntoIterator<Item = f64>>(item_likelihoods: I) -> f64 {
    item_likelihoods
        .into_iter()
        .filter(|likelihood| *likelihood > 0.0)
        .fold(None, |lowest: Option<f64>, likelihood| {
            Some(lowest.map_or(likelihood, |value| value.min(likelihood)))
        })
        .unwrap_or(0.0)
}
