//! Percentile helpers.
//!
//! Forecast percentiles walk a [`SimulationResult`] and return the first
//! outcome at which the cumulative share of trials reaches the percentile.
//! The walk direction is what differs between the two forecast kinds, so each
//! has its own function:
//!
//! - how-many: outcomes descending, "at least p% of trials reached this many".
//! - when: outcomes ascending, "p% of trials had finished by this day".

use crate::services::simulation_result::SimulationResult;

/// Item count that at least `percentile`% of trials reached or exceeded.
///
/// Larger percentiles give smaller (safer) counts. Empty results give 0.
pub fn how_many_percentile(result: &SimulationResult, percentile: f64) -> usize {
    first_reaching(result.outcomes().rev(), result.total_trials(), percentile)
}

/// Number of days by which at least `percentile`% of trials had finished.
///
/// Larger percentiles give larger (safer) day counts. Empty results give 0.
pub fn when_percentile(result: &SimulationResult, percentile: f64) -> usize {
    first_reaching(result.outcomes(), result.total_trials(), percentile)
}

/// Share of trials, in percent, that finished within `days`.
pub fn likelihood_within(result: &SimulationResult, days: usize) -> f64 {
    let total = result.total_trials();
    if total == 0 {
        return 0.0;
    }

    let finished: usize = result
        .outcomes()
        .take_while(|(outcome, _)| *outcome <= days)
        .map(|(_, count)| count)
        .sum();
    finished as f64 * 100.0 / total as f64
}

fn first_reaching<I>(outcomes: I, total: usize, percentile: f64) -> usize
where
    I: Iterator<Item = (usize, usize)>,
{
    if total == 0 {
        return 0;
    }

    let mut cumulative = 0usize;
    let mut last = 0usize;
    for (outcome, count) in outcomes {
        cumulative += count;
        last = outcome;
        if cumulative as f64 * 100.0 / total as f64 >= percentile {
            return outcome;
        }
    }
    last
}

/// Returns the percentile value from a slice that is already sorted in
/// ascending order, rounding the interpolated position to the nearest index.
///
/// - Empty input => `None`.
/// - `percentile <= 0` => first element.
/// - `percentile >= 100` => last element.
pub fn value_sorted<T: Copy>(sorted_values: &[T], percentile: f64) -> Option<T> {
    if sorted_values.is_empty() {
        return None;
    }

    let index = if percentile <= 0.0 {
        0
    } else if percentile >= 100.0 {
        sorted_values.len() - 1
    } else {
        let position = (percentile / 100.0) * (sorted_values.len() as f64 - 1.0);
        position.round() as usize
    };

    sorted_values.get(index).copied()
}
