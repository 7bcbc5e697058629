use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::feature::{Feature, features_likelihood};
use crate::domain::update::EntityId;

pub const DEFAULT_WORK_ITEMS_PER_FEATURE: usize = 25;
pub const DEFAULT_WORK_ITEM_PERCENTILE: f64 = 85.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub name: String,
    pub date: NaiveDate,
}

/// A set of features delivered by one or more teams.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    pub team_ids: Vec<EntityId>,
    pub owning_team: Option<EntityId>,
    pub feature_query: String,
    pub historical_features_query: String,
    pub default_work_items_per_feature: usize,
    pub use_percentile_default_size: bool,
    pub default_work_item_percentile: f64,
    pub milestones: Vec<Milestone>,
    /// In priority order.
    pub features: Vec<Feature>,
    pub features_updated_at: Option<DateTime<Utc>>,
    pub forecasts_updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            team_ids: Vec::new(),
            owning_team: None,
            feature_query: String::new(),
            historical_features_query: String::new(),
            default_work_items_per_feature: DEFAULT_WORK_ITEMS_PER_FEATURE,
            use_percentile_default_size: false,
            default_work_item_percentile: DEFAULT_WORK_ITEM_PERCENTILE,
            milestones: Vec::new(),
            features: Vec::new(),
            features_updated_at: None,
            forecasts_updated_at: None,
        }
    }

    pub fn remaining_work(&self) -> usize {
        self.features.iter().map(Feature::remaining_work).sum()
    }

    pub fn delivery_likelihood(&self, days: usize) -> f64 {
        features_likelihood(&self.features, days)
    }

    /// Likelihood of finishing every feature by the milestone. A milestone
    /// that already passed is measured against today.
    pub fn milestone_likelihood(&self, milestone: &Milestone, today: NaiveDate) -> f64 {
        let days = (milestone.date - today).num_days().max(0) as usize;
        self.delivery_likelihood(days)
    }
}
