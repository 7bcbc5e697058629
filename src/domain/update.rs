use std::fmt;

use serde::Serialize;

/// Identifier of a team or project inside the store.
pub type EntityId = u32;

/// The refresh categories work can be queued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Team,
    Features,
    Forecasts,
}

impl UpdateType {
    pub const ALL: [UpdateType; 3] = [UpdateType::Team, UpdateType::Features, UpdateType::Forecasts];
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateType::Team => "team",
            UpdateType::Features => "features",
            UpdateType::Forecasts => "forecasts",
        };
        write!(f, "{name}")
    }
}

/// Identity of one schedulable unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UpdateKey {
    pub update_type: UpdateType,
    pub entity_id: EntityId,
}

impl UpdateKey {
    pub fn new(update_type: UpdateType, entity_id: EntityId) -> Self {
        Self {
            update_type,
            entity_id,
        }
    }
}

impl fmt::Display for UpdateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.update_type, self.entity_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Queued => "queued",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Live state of one pending or running update. Only the queue mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub update_type: UpdateType,
    pub entity_id: EntityId,
    pub status: Status,
}

impl UpdateStatus {
    pub fn new(key: UpdateKey, status: Status) -> Self {
        Self {
            update_type: key.update_type,
            entity_id: key.entity_id,
            status,
        }
    }

    pub fn key(&self) -> UpdateKey {
        UpdateKey::new(self.update_type, self.entity_id)
    }

    pub(crate) fn with_status(self, status: Status) -> Self {
        Self { status, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn keys_with_same_type_and_id_are_equal() {
        let mut map = HashMap::new();
        map.insert(UpdateKey::new(UpdateType::Team, 7), "first");
        map.insert(UpdateKey::new(UpdateType::Team, 7), "second");
        map.insert(UpdateKey::new(UpdateType::Features, 7), "other");

        assert_eq!(map.len(), 2);
        assert_eq!(map[&UpdateKey::new(UpdateType::Team, 7)], "second");
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!Status::Queued.is_terminal());
        assert!(!Status::InProgress.is_terminal());
        assert!(Status::Completed.is_terminal());
        assert!(Status::Failed.is_terminal());
    }

    #[test]
    fn status_round_trips_its_key() {
        let key = UpdateKey::new(UpdateType::Forecasts, 3);
        let status = UpdateStatus::new(key, Status::Queued).with_status(Status::InProgress);

        assert_eq!(status.key(), key);
        assert_eq!(status.status, Status::InProgress);
        assert_eq!(key.to_string(), "forecasts/3");
    }
}
