use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::update::{Status, UpdateKey, UpdateStatus};
use crate::services::data_source::DataSourceError;
use crate::services::repository::RepositoryError;
use crate::services::simulation::ForecastError;
use crate::services::status_channel::StatusChannel;
use crate::services::status_store::StatusStore;
use crate::services::supervisor::TaskSupervisor;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("data source: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("forecast: {0}")]
    Forecast(#[from] ForecastError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("worker: {0}")]
    Worker(String),
}

pub type UpdateFuture = Pin<Box<dyn Future<Output = Result<(), UpdateError>> + Send>>;

/// Produces the work for one update. Called at most once, after the update
/// has been admitted to the queue.
pub type TaskFactory = Box<dyn FnOnce(UpdateContext) -> UpdateFuture + Send>;

/// Handed to a running task; lets it enqueue follow-up updates.
#[derive(Clone)]
pub struct UpdateContext {
    key: UpdateKey,
    queue: UpdateQueue,
}

impl UpdateContext {
    pub fn key(&self) -> UpdateKey {
        self.key
    }

    pub fn queue(&self) -> &UpdateQueue {
        &self.queue
    }
}

/// Runs at most one update per [`UpdateKey`] at a time.
///
/// A request for a key that is already queued or running is dropped. Every
/// status transition goes to the key's subscribers and to the global channel.
#[derive(Clone)]
pub struct UpdateQueue {
    statuses: StatusStore,
    channel: Arc<dyn StatusChannel>,
    supervisor: TaskSupervisor,
}

impl UpdateQueue {
    pub fn new(statuses: StatusStore, channel: Arc<dyn StatusChannel>) -> Self {
        Self {
            statuses,
            channel,
            supervisor: TaskSupervisor,
        }
    }

    /// Admits `factory` for `key` and returns immediately. Must be called from
    /// within a tokio runtime.
    pub fn enqueue_update(&self, key: UpdateKey, factory: TaskFactory) {
        let Some(queued) = self.statuses.try_queue(key) else {
            debug!(%key, "update already pending, skipping");
            return;
        };
        debug!(%key, "update queued");
        self.notify(queued);

        let queue = self.clone();
        tokio::spawn(async move {
            queue.execute(key, factory).await;
        });
    }

    /// Same as [`enqueue_update`](Self::enqueue_update) for closures returning
    /// any sendable future.
    pub fn enqueue<F, Fut>(&self, key: UpdateKey, task: F)
    where
        F: FnOnce(UpdateContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), UpdateError>> + Send + 'static,
    {
        self.enqueue_update(key, Box::new(move |ctx| Box::pin(task(ctx))));
    }

    pub fn get_status(&self, key: UpdateKey) -> Option<UpdateStatus> {
        self.statuses.get(key)
    }

    /// Every queued or running update, ordered by key.
    pub fn statuses(&self) -> Vec<UpdateStatus> {
        self.statuses.snapshot()
    }

    async fn execute(&self, key: UpdateKey, factory: TaskFactory) {
        match self.statuses.transition(key, Status::InProgress) {
            Some(running) => self.notify(running),
            None => {
                warn!(%key, "queued update vanished before it started");
                return;
            }
        }

        let context = UpdateContext {
            key,
            queue: self.clone(),
        };
        let outcome = self.supervisor.supervise(key, move || factory(context)).await;

        let finished = self
            .statuses
            .transition(key, outcome)
            .unwrap_or_else(|| UpdateStatus::new(key, outcome));
        self.notify(finished);
        self.statuses.remove(key);
    }

    fn notify(&self, status: UpdateStatus) {
        self.channel.publish(status.key(), status);
        self.channel.publish_global(status);
    }
}
