use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::update::{Status, UpdateKey, UpdateStatus};

/// Live map of pending and running updates, shared by everyone holding a clone.
///
/// Every operation takes the lock once, so check-and-insert and
/// remove-on-terminal are atomic per key.
#[derive(Clone, Default)]
pub struct StatusStore {
    entries: Arc<Mutex<HashMap<UpdateKey, UpdateStatus>>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a `Queued` entry unless the key is already live.
    pub fn try_queue(&self, key: UpdateKey) -> Option<UpdateStatus> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return None;
        }
        let status = UpdateStatus::new(key, Status::Queued);
        entries.insert(key, status);
        Some(status)
    }

    /// Moves a live entry to `status`. Returns `None` if the key is not live.
    pub fn transition(&self, key: UpdateKey, status: Status) -> Option<UpdateStatus> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(&key)?;
        *entry = entry.with_status(status);
        Some(*entry)
    }

    pub fn remove(&self, key: UpdateKey) -> Option<UpdateStatus> {
        self.entries.lock().remove(&key)
    }

    pub fn get(&self, key: UpdateKey) -> Option<UpdateStatus> {
        self.entries.lock().get(&key).copied()
    }

    pub fn snapshot(&self) -> Vec<UpdateStatus> {
        let mut statuses: Vec<UpdateStatus> = self.entries.lock().values().copied().collect();
        statuses.sort_by_key(|status| status.key());
        statuses
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
