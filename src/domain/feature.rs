use crate::domain::update::EntityId;
use crate::services::forecast::{WhenForecast, delivery_likelihood};

/// Work one team holds on a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureWork {
    pub team_id: EntityId,
    pub remaining_items: usize,
    pub total_items: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamForecast {
    pub team_id: EntityId,
    pub forecast: WhenForecast,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    /// Key in the work-tracking system, e.g. `FLOW-12`.
    pub key: String,
    pub name: String,
    pub done: bool,
    /// Size used instead of the project default when the feature has no
    /// child items yet. 0 means unset.
    pub estimated_size: usize,
    /// Team names recorded on the feature itself.
    pub owning_teams: Vec<String>,
    pub work: Vec<FeatureWork>,
    pub is_using_default_size: bool,
    pub forecasts: Vec<TeamForecast>,
}

impl Feature {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn remaining_work(&self) -> usize {
        self.work.iter().map(|work| work.remaining_items).sum()
    }

    pub fn total_work(&self) -> usize {
        self.work.iter().map(|work| work.total_items).sum()
    }

    pub fn remaining_work_for(&self, team_id: EntityId) -> usize {
        self.work
            .iter()
            .filter(|work| work.team_id == team_id)
            .map(|work| work.remaining_items)
            .sum()
    }

    /// Replaces the work entry for `team_id`, or appends one.
    pub fn set_work_for_team(&mut self, team_id: EntityId, remaining_items: usize, total_items: usize) {
        let work = FeatureWork {
            team_id,
            remaining_items,
            total_items,
        };
        match self.work.iter_mut().find(|existing| existing.team_id == team_id) {
            Some(existing) => *existing = work,
            None => self.work.push(work),
        }
    }

    /// True for open features nobody has broken down into items yet.
    pub fn needs_default_size(&self) -> bool {
        !self.done && self.total_work() == 0
    }

    pub fn forecast_for(&self, team_id: EntityId) -> Option<&WhenForecast> {
        self.forecasts
            .iter()
            .find(|forecast| forecast.team_id == team_id)
            .map(|forecast| &forecast.forecast)
    }

    /// Chance in percent that every team finishes its part within `days`.
    pub fn likelihood_for_days(&self, days: usize) -> f64 {
        if self.remaining_work() == 0 {
            return 100.0;
        }
        self.forecasts
            .iter()
            .map(|forecast| forecast.forecast.get_likelihood(days))
            .reduce(f64::min)
            .unwrap_or(0.0)
    }
}

/// Likelihood of delivering all `features` within `days`.
pub fn features_likelihood<'a, I>(features: I, days: usize) -> f64
where
    I: IntoIterator<Item = &'a Feature>,
{
    delivery_likelihood(features.into_iter().map(|feature| feature.likelihood_for_days(days)))
}
