use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::domain::throughput::ThroughputHistory;
use crate::services::forecast::{HowManyForecast, WhenForecast};
use crate::services::simulation_result::SimulationResult;

pub const DEFAULT_TRIALS: usize = 10_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ForecastError {
    #[error("throughput data is empty")]
    EmptyThroughput,
    #[error("throughput data has no nonzero values")]
    ZeroThroughput,
    #[error("trials must be greater than zero")]
    InvalidTrials,
    #[error("target date {target} is before {today}")]
    TargetInPast { today: NaiveDate, target: NaiveDate },
}

/// Monte-Carlo forecasts over a throughput history, sampling days with
/// replacement.
pub struct ForecastEngine<R: Rng = StdRng> {
    trials: usize,
    rng: R,
}

impl ForecastEngine<StdRng> {
    pub fn new(trials: usize) -> Self {
        Self::with_rng(trials, StdRng::from_entropy())
    }
}

impl<R: Rng> ForecastEngine<R> {
    pub fn with_rng(trials: usize, rng: R) -> Self {
        Self { trials, rng }
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    /// How many items get done within `days`.
    pub fn how_many(
        &mut self,
        throughput: &ThroughputHistory,
        days: usize,
    ) -> Result<HowManyForecast, ForecastError> {
        let values = self.sampleable(throughput)?;
        debug!(days, trials = self.trials, "running how-many simulation");

        let rng = &mut self.rng;
        let result = SimulationResult::from_trials((0..self.trials).map(|_| {
            (0..days).map(|_| sample_day(values, rng)).sum::<usize>()
        }));
        Ok(HowManyForecast::new(result, days))
    }

    /// How many items get done between `today` and `target`.
    pub fn how_many_by_date(
        &mut self,
        throughput: &ThroughputHistory,
        today: NaiveDate,
        target: NaiveDate,
    ) -> Result<HowManyForecast, ForecastError> {
        if target < today {
            return Err(ForecastError::TargetInPast { today, target });
        }
        let days = (target - today).num_days() as usize;
        self.how_many(throughput, days)
    }

    /// How many days until `remaining_items` are done.
    pub fn when(
        &mut self,
        throughput: &ThroughputHistory,
        remaining_items: usize,
    ) -> Result<WhenForecast, ForecastError> {
        let values = self.sampleable(throughput)?;
        if remaining_items == 0 {
            return Ok(WhenForecast::new(SimulationResult::from_trials(
                std::iter::repeat_n(0, self.trials),
            )));
        }
        if throughput.total() == 0 {
            return Err(ForecastError::ZeroThroughput);
        }
        debug!(remaining_items, trials = self.trials, "running when simulation");

        let rng = &mut self.rng;
        let result = SimulationResult::from_trials(
            (0..self.trials).map(|_| simulate_days_until_done(values, remaining_items, rng)),
        );
        Ok(WhenForecast::new(result))
    }

    /// Forecasts several features worked by one team in priority order.
    ///
    /// Each closed item goes to a random feature among the first `feature_wip`
    /// features that still have work. Returns one result per entry of
    /// `remaining_items`, in the same order.
    pub fn forecast_features(
        &mut self,
        throughput: &ThroughputHistory,
        feature_wip: usize,
        remaining_items: &[usize],
    ) -> Result<Vec<SimulationResult>, ForecastError> {
        let values = self.sampleable(throughput)?;
        let has_work = remaining_items.iter().any(|items| *items > 0);
        if has_work && throughput.total() == 0 {
            return Err(ForecastError::ZeroThroughput);
        }

        let wip = feature_wip.max(1);
        let mut finish_days: Vec<Vec<usize>> = vec![Vec::with_capacity(self.trials); remaining_items.len()];
        for _ in 0..self.trials {
            let days = simulate_feature_trial(values, wip, remaining_items, &mut self.rng);
            for (index, day) in days.into_iter().enumerate() {
                finish_days[index].push(day);
            }
        }

        Ok(finish_days.into_iter().map(SimulationResult::from_trials).collect())
    }

    fn sampleable<'a>(&self, throughput: &'a ThroughputHistory) -> Result<&'a [usize], ForecastError> {
        if self.trials == 0 {
            return Err(ForecastError::InvalidTrials);
        }
        if throughput.is_empty() {
            return Err(ForecastError::EmptyThroughput);
        }
        Ok(throughput.values())
    }
}

fn sample_day<R: Rng + ?Sized>(throughput_values: &[usize], rng: &mut R) -> usize {
    throughput_values.choose(rng).copied().unwrap_or(0)
}

fn simulate_days_until_done<R: Rng + ?Sized>(
    throughput_values: &[usize],
    remaining_items: usize,
    rng: &mut R,
) -> usize {
    let mut completed = 0;
    let mut days = 0;
    while completed < remaining_items {
        days += 1;
        completed += sample_day(throughput_values, rng);
    }
    days
}

/// One trial of [`ForecastEngine::forecast_features`]; returns the finishing
/// day of every feature (0 for features without work).
fn simulate_feature_trial<R: Rng + ?Sized>(
    throughput_values: &[usize],
    wip: usize,
    remaining_items: &[usize],
    rng: &mut R,
) -> Vec<usize> {
    let mut remaining = remaining_items.to_vec();
    let mut finished_on = vec![0; remaining.len()];
    let mut open: Vec<usize> = (0..remaining.len()).filter(|index| remaining[*index] > 0).collect();

    let mut day = 1;
    while !open.is_empty() {
        let closed_today = sample_day(throughput_values, rng);
        for _ in 0..closed_today {
            if open.is_empty() {
                break;
            }
            let slot = rng.gen_range(0..wip.min(open.len()));
            let feature = open[slot];
            remaining[feature] -= 1;
            if remaining[feature] == 0 {
                finished_on[feature] = day;
                open.remove(slot);
            }
        }
        day += 1;
    }

    finished_on
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::on_date;
    use std::collections::BTreeMap;

    fn seeded(trials: usize) -> ForecastEngine<StdRng> {
        ForecastEngine::with_rng(trials, StdRng::seed_from_u64(42))
    }

    #[test]
    fn how_many_tallies_every_trial() {
        let throughput = ThroughputHistory::new(vec![0, 1, 3, 2, 0, 5]);
        let forecast = seeded(2_000).how_many(&throughput, 10).unwrap();

        let result = forecast.simulation_result();
        assert_eq!(result.total_trials(), 2_000);
        assert!(result.outcomes().all(|(items, _)| items <= 50));
    }

    #[test]
    fn how_many_over_zero_days_is_always_zero() {
        let throughput = ThroughputHistory::new(vec![4, 2, 7]);
        let forecast = seeded(500).how_many(&throughput, 0).unwrap();

        assert_eq!(forecast.simulation_result().to_map(), BTreeMap::from([(0, 500)]));
    }

    #[test]
    fn constant_throughput_gives_single_outcome() {
        let throughput = ThroughputHistory::new(vec![2, 2, 2]);

        let how_many = seeded(100).how_many(&throughput, 5).unwrap();
        assert_eq!(how_many.simulation_result().to_map(), BTreeMap::from([(10, 100)]));

        let when = seeded(100).when(&throughput, 7).unwrap();
        assert_eq!(when.simulation_result().to_map(), BTreeMap::from([(4, 100)]));
    }

    #[test]
    fn empty_history_cannot_be_forecast() {
        let empty = ThroughputHistory::default();

        assert_eq!(seeded(10).how_many(&empty, 5).unwrap_err(), ForecastError::EmptyThroughput);
        assert_eq!(seeded(10).when(&empty, 5).unwrap_err(), ForecastError::EmptyThroughput);
        assert_eq!(
            seeded(10).forecast_features(&empty, 1, &[3]).unwrap_err(),
            ForecastError::EmptyThroughput
        );
    }

    #[test]
    fn when_without_any_throughput_is_rejected() {
        let idle = ThroughputHistory::new(vec![0, 0, 0]);

        assert_eq!(seeded(10).when(&idle, 5).unwrap_err(), ForecastError::ZeroThroughput);
        assert_eq!(
            seeded(10).how_many(&idle, 5).unwrap().simulation_result().to_map(),
            BTreeMap::from([(0, 10)])
        );
    }

    #[test]
    fn when_with_nothing_remaining_takes_zero_days() {
        let throughput = ThroughputHistory::new(vec![0, 0, 1]);
        let forecast = seeded(300).when(&throughput, 0).unwrap();

        assert_eq!(forecast.simulation_result().to_map(), BTreeMap::from([(0, 300)]));
    }

    #[test]
    fn zero_trials_is_rejected() {
        let throughput = ThroughputHistory::new(vec![1]);
        assert_eq!(seeded(0).how_many(&throughput, 3).unwrap_err(), ForecastError::InvalidTrials);
    }

    #[test]
    fn when_percentiles_grow_with_confidence() {
        let throughput = ThroughputHistory::new(vec![0, 1, 0, 2, 3, 0, 1, 0, 0, 4]);
        let forecast = seeded(5_000).when(&throughput, 20).unwrap();

        let percentiles = forecast.percentiles();
        assert!(percentiles.p50 <= percentiles.p70);
        assert!(percentiles.p70 <= percentiles.p85);
        assert!(percentiles.p85 <= percentiles.p95);
        assert_eq!(forecast.simulation_result().total_trials(), 5_000);
    }

    #[test]
    fn how_many_by_date_uses_calendar_days() {
        let throughput = ThroughputHistory::new(vec![1]);
        let forecast = seeded(10)
            .how_many_by_date(&throughput, on_date(2026, 3, 1), on_date(2026, 3, 8))
            .unwrap();

        assert_eq!(forecast.days(), 7);
        assert_eq!(forecast.get_probability(50.0), 7);

        let err = seeded(10)
            .how_many_by_date(&throughput, on_date(2026, 3, 8), on_date(2026, 3, 1))
            .unwrap_err();
        assert!(matches!(err, ForecastError::TargetInPast { .. }));
    }

    #[test]
    fn single_feature_forecast_matches_when() {
        let throughput = ThroughputHistory::new(vec![3]);
        let results = seeded(50).forecast_features(&throughput, 1, &[7]).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].to_map(), BTreeMap::from([(3, 50)]));
    }

    #[test]
    fn features_are_worked_in_order_with_wip_of_one() {
        let throughput = ThroughputHistory::new(vec![1]);
        let results = seeded(20).forecast_features(&throughput, 1, &[2, 0, 3]).unwrap();

        assert_eq!(results[0].to_map(), BTreeMap::from([(2, 20)]));
        assert_eq!(results[1].to_map(), BTreeMap::from([(0, 20)]));
        assert_eq!(results[2].to_map(), BTreeMap::from([(5, 20)]));
    }

    #[test]
    fn parallel_wip_never_finishes_later_than_sequential_total() {
        let throughput = ThroughputHistory::new(vec![1]);
        let results = seeded(200).forecast_features(&throughput, 2, &[3, 3]).unwrap();

        for result in &results {
            assert_eq!(result.total_trials(), 200);
            assert!(result.outcomes().all(|(day, _)| (3..=6).contains(&day)));
        }
    }
}
