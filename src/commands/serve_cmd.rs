use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::commands::base_commands::{CommandError, ServeArgs};
use crate::domain::update::UpdateStatus;
use crate::services::capability::CapabilityGate;
use crate::services::jira_api::{AuthData, JiraApiClient};
use crate::services::repository::InMemoryRepository;
use crate::services::settings::{AppSettings, SettingsFile, SettingsProvider};
use crate::services::status_channel::UpdateNotifier;
use crate::services::status_store::StatusStore;
use crate::services::update_handlers::{RefreshServices, UpdateHandlers};
use crate::services::update_queue::UpdateQueue;
use crate::services::workspace_yaml::load_workspace_from_yaml_file;

pub async fn serve_command(args: ServeArgs) -> Result<(), CommandError> {
    let settings = AppSettings::from_yaml_file(&args.settings)?;
    let workspace = load_workspace_from_yaml_file(&args.workspace)?;
    let connection = settings.jira.clone().ok_or(CommandError::MissingJiraConnection)?;
    let connector = JiraApiClient::new(connection, AuthData::from_env()?)?;
    info!(
        teams = workspace.teams.len(),
        projects = workspace.projects.len(),
        trials = settings.forecast.trials,
        "workspace loaded"
    );

    let services = RefreshServices {
        teams: Arc::new(InMemoryRepository::with_entities(workspace.teams)),
        projects: Arc::new(InMemoryRepository::with_entities(workspace.projects)),
        connector: Arc::new(connector),
        trials: settings.forecast.trials,
    };
    run_service(
        services,
        Arc::new(SettingsFile::new(args.settings)),
        Arc::new(settings.license),
        shutdown_signal(),
    )
    .await;
    Ok(())
}

/// Runs one scheduler per update type until `shutdown` resolves.
pub async fn run_service<S>(
    services: RefreshServices,
    settings: Arc<dyn SettingsProvider>,
    gate: Arc<dyn CapabilityGate>,
    shutdown: S,
) where
    S: Future<Output = ()>,
{
    let notifier = Arc::new(UpdateNotifier::new());
    let queue = UpdateQueue::new(StatusStore::new(), notifier.clone());
    let status_log = tokio::spawn(log_statuses(notifier.subscribe_all()));

    let schedulers = UpdateHandlers::new(services).schedulers(&queue, settings, gate);
    for scheduler in &schedulers {
        scheduler.start();
    }
    info!(schedulers = schedulers.len(), "refreshing until shutdown");

    shutdown.await;

    for scheduler in &schedulers {
        scheduler.stop().await;
    }
    let pending = queue.statuses();
    if !pending.is_empty() {
        info!(pending = pending.len(), "leaving running updates to finish on their own");
    }
    status_log.abort();
}

async fn log_statuses(mut statuses: broadcast::Receiver<UpdateStatus>) {
    loop {
        match statuses.recv().await {
            Ok(status) => info!(
                update_type = %status.update_type,
                entity_id = status.entity_id,
                status = %status.status,
                "update status changed"
            ),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "status log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "could not listen for Ctrl-C, shutting down");
    }
    info!("shutting down");
}
