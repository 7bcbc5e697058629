use chrono::{DateTime, Utc};

use crate::domain::throughput::ThroughputHistory;
use crate::domain::update::EntityId;

pub const DEFAULT_THROUGHPUT_HISTORY_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: EntityId,
    pub name: String,
    /// Connector query selecting this team's work items.
    pub work_item_query: String,
    pub throughput_history_days: u32,
    /// How many features the team works on in parallel.
    pub feature_wip: usize,
    pub throughput: ThroughputHistory,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Team {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            work_item_query: String::new(),
            throughput_history_days: DEFAULT_THROUGHPUT_HISTORY_DAYS,
            feature_wip: 1,
            throughput: ThroughputHistory::default(),
            updated_at: None,
        }
    }
}
