use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::domain::feature::{Feature, TeamForecast};
use crate::domain::project::Project;
use crate::domain::team::Team;
use crate::domain::update::{EntityId, UpdateType};
use crate::services::forecast::WhenForecast;
use crate::services::refresh_scheduler::{RefreshCandidate, RefreshStrategy};
use crate::services::repository::RepositoryError;
use crate::services::simulation::{ForecastEngine, ForecastError};
use crate::services::update_handlers::RefreshServices;
use crate::services::update_queue::{TaskFactory, UpdateError};

/// Re-runs the Monte-Carlo forecasts for every feature of a project.
pub struct ForecastRefresh {
    services: RefreshServices,
}

impl ForecastRefresh {
    pub fn new(services: RefreshServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl RefreshStrategy for ForecastRefresh {
    fn update_type(&self) -> UpdateType {
        UpdateType::Forecasts
    }

    async fn candidates(&self) -> Result<Vec<RefreshCandidate>, RepositoryError> {
        let projects = self.services.projects.get_all().await?;
        Ok(projects
            .into_iter()
            .map(|project| RefreshCandidate {
                id: project.id,
                name: project.name,
                updated_at: project.forecasts_updated_at,
            })
            .collect())
    }

    fn task_for(&self, id: EntityId) -> TaskFactory {
        forecast_task(self.services.clone(), id)
    }
}

pub fn forecast_task(services: RefreshServices, project_id: EntityId) -> TaskFactory {
    Box::new(move |_| Box::pin(async move { refresh_forecasts(&services, project_id).await }))
}

/// Forecasting runs on a snapshot. A feature refresh that lands meanwhile
/// invalidates the snapshot, so the forecast is redone on the new features.
const MAX_FORECAST_ATTEMPTS: usize = 3;

pub async fn refresh_forecasts(services: &RefreshServices, project_id: EntityId) -> Result<(), UpdateError> {
    for attempt in 1..=MAX_FORECAST_ATTEMPTS {
        let Some(project) = services.projects.get_by_id(project_id).await? else {
            info!(entity_id = project_id, "project no longer exists, nothing to forecast");
            return Ok(());
        };

        let mut teams = Vec::with_capacity(project.team_ids.len());
        for team_id in &project.team_ids {
            if let Some(team) = services.teams.get_by_id(*team_id).await? {
                teams.push(team);
            }
        }

        let trials = services.trials;
        let snapshot_taken = project.features_updated_at;
        let forecasted = tokio::task::spawn_blocking(move || forecast_project(project, &teams, trials))
            .await
            .map_err(|err| UpdateError::Worker(err.to_string()))??;

        let last_attempt = attempt == MAX_FORECAST_ATTEMPTS;
        let features = forecasted.features;
        let stored = services
            .projects
            .update(
                project_id,
                Box::new(move |stored: &mut Project| {
                    if stored.features_updated_at != snapshot_taken && !last_attempt {
                        return false;
                    }
                    apply_forecasts(&mut stored.features, features);
                    stored.forecasts_updated_at = Some(Utc::now());
                    true
                }),
            )
            .await?;

        match stored {
            Some(true) => {
                info!(entity_id = project_id, project = %forecasted.name, attempt, "forecasts refreshed");
                return Ok(());
            }
            Some(false) => debug!(entity_id = project_id, attempt, "features changed while forecasting, starting over"),
            None => {
                info!(entity_id = project_id, "project removed while forecasting");
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Copies forecasts onto the stored features with the same key.
fn apply_forecasts(stored: &mut [Feature], forecasted: Vec<Feature>) {
    for forecasted in forecasted {
        if let Some(feature) = stored.iter_mut().find(|feature| feature.key == forecasted.key) {
            feature.forecasts = forecasted.forecasts;
        }
    }
}

/// Replaces the forecasts on every feature. Teams without any throughput do
/// not produce a forecast.
pub fn forecast_project(mut project: Project, teams: &[Team], trials: usize) -> Result<Project, ForecastError> {
    for feature in &mut project.features {
        feature.forecasts.clear();
    }

    let mut engine = ForecastEngine::new(trials);
    for team in teams {
        if team.throughput.total() == 0 {
            debug!(team = %team.name, "no throughput, skipping forecast");
            continue;
        }

        let remaining: Vec<usize> = project
            .features
            .iter()
            .map(|feature| feature.remaining_work_for(team.id))
            .collect();
        if remaining.iter().all(|items| *items == 0) {
            continue;
        }

        let results = engine.forecast_features(&team.throughput, team.feature_wip, &remaining)?;
        for ((feature, result), items) in project.features.iter_mut().zip(results).zip(&remaining) {
            if *items > 0 {
                feature.forecasts.push(TeamForecast {
                    team_id: team.id,
                    forecast: WhenForecast::new(result),
                });
            }
        }
        debug!(team = %team.name, features = remaining.len(), "team forecast done");
    }
    Ok(project)
}
