use std::time::Instant;

use tracing::{error, info};

use crate::domain::update::{Status, UpdateKey};
use crate::services::update_queue::UpdateFuture;

/// Runs detached update tasks and turns their outcome into a terminal status.
///
/// The future is built and polled on its own tokio task, so an error return
/// and a panic, even one raised while building the future, all end up as
/// [`Status::Failed`] with the detail written to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskSupervisor;

impl TaskSupervisor {
    pub async fn supervise<F>(&self, key: UpdateKey, start: F) -> Status
    where
        F: FnOnce() -> UpdateFuture + Send + 'static,
    {
        let started = Instant::now();
        let outcome = tokio::spawn(async move { start().await }).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(())) => {
                info!(%key, elapsed_ms, "update completed");
                Status::Completed
            }
            Ok(Err(err)) => {
                error!(%key, elapsed_ms, error = %err, "update failed");
                Status::Failed
            }
            Err(join_error) if join_error.is_panic() => {
                error!(%key, elapsed_ms, "update panicked");
                Status::Failed
            }
            Err(join_error) => {
                error!(%key, elapsed_ms, error = %join_error, "update was cancelled");
                Status::Failed
            }
        }
    }
}
