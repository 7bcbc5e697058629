use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::update::{UpdateKey, UpdateStatus};

/// Buffered transitions per subscriber before the slowest one starts lagging.
pub const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Outbound side of status notifications.
pub trait StatusChannel: Send + Sync {
    /// Delivers to subscribers of `key`.
    fn publish(&self, key: UpdateKey, status: UpdateStatus);
    /// Delivers to subscribers of every update.
    fn publish_global(&self, status: UpdateStatus);
}

/// Broadcast-backed [`StatusChannel`] with per-key and global subscriptions.
///
/// Publishing never blocks; with no live subscriber a transition is dropped.
/// Each receiver buffers [`STATUS_CHANNEL_CAPACITY`] transitions. A receiver
/// that falls further behind gets [`broadcast::error::RecvError::Lagged`] on
/// its next `recv` and has lost the oldest transitions; use
/// [`UpdateQueue::get_status`](crate::services::update_queue::UpdateQueue::get_status)
/// to resynchronise.
pub struct UpdateNotifier {
    global: broadcast::Sender<UpdateStatus>,
    per_key: Mutex<HashMap<UpdateKey, broadcast::Sender<UpdateStatus>>>,
}

impl UpdateNotifier {
    pub fn new() -> Self {
        let (global, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            global,
            per_key: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, key: UpdateKey) -> broadcast::Receiver<UpdateStatus> {
        self.per_key
            .lock()
            .entry(key)
            .or_insert_with(|| broadcast::channel(STATUS_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<UpdateStatus> {
        self.global.subscribe()
    }

    /// Forgets the channel for `key` once its last receiver has been dropped.
    pub fn unsubscribe(&self, key: UpdateKey) {
        let mut per_key = self.per_key.lock();
        if per_key
            .get(&key)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            per_key.remove(&key);
        }
    }

    pub fn subscribed_keys(&self) -> usize {
        self.per_key.lock().len()
    }
}

impl Default for UpdateNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusChannel for UpdateNotifier {
    fn publish(&self, key: UpdateKey, status: UpdateStatus) {
        if let Some(sender) = self.per_key.lock().get(&key) {
            if sender.send(status).is_err() {
                trace!(%key, "no listener for update status");
            }
        }
    }

    fn publish_global(&self, status: UpdateStatus) {
        let _ = self.global.send(status);
    }
}
