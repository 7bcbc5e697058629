use std::collections::BTreeMap;

/// Frequency table of Monte-Carlo outcomes: outcome value -> number of trials.
///
/// The outcome is either an item count (how-many) or a day count (when).
/// The table is fixed once built; [`SimulationResult::to_map`] hands out copies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    outcomes: BTreeMap<usize, usize>,
    trials: usize,
}

impl SimulationResult {
    pub fn new(outcomes: BTreeMap<usize, usize>) -> Self {
        let trials = outcomes.values().sum();
        Self { outcomes, trials }
    }

    /// Tallies raw per-trial outcomes.
    pub fn from_trials<I: IntoIterator<Item = usize>>(trial_outcomes: I) -> Self {
        let mut outcomes = BTreeMap::new();
        for outcome in trial_outcomes {
            *outcomes.entry(outcome).or_insert(0usize) += 1;
        }
        Self::new(outcomes)
    }

    pub fn total_trials(&self) -> usize {
        self.trials
    }

    pub fn is_empty(&self) -> bool {
        self.trials == 0
    }

    /// Outcomes in ascending order.
    pub fn outcomes(&self) -> impl DoubleEndedIterator<Item = (usize, usize)> + '_ {
        self.outcomes.iter().map(|(outcome, count)| (*outcome, *count))
    }

    pub fn count_of(&self, outcome: usize) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn to_map(&self) -> BTreeMap<usize, usize> {
        self.outcomes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_trials_tallies_outcomes() {
        let result = SimulationResult::from_trials([3, 5, 3, 9, 3]);

        assert_eq!(result.total_trials(), 5);
        assert_eq!(result.count_of(3), 3);
        assert_eq!(result.count_of(5), 1);
        assert_eq!(result.count_of(4), 0);
        assert_eq!(result.outcomes().collect::<Vec<_>>(), vec![(3, 3), (5, 1), (9, 1)]);
    }

    #[test]
    fn to_map_is_a_copy() {
        let result = SimulationResult::new(BTreeMap::from([(10, 2)]));
        let mut copy = result.to_map();
        copy.insert(10, 99);

        assert_eq!(result.count_of(10), 2);
        assert_eq!(result.total_trials(), 2);
    }

    #[test]
    fn default_result_is_empty() {
        let result = SimulationResult::default();
        assert!(result.is_empty());
        assert_eq!(result.total_trials(), 0);
    }
}
