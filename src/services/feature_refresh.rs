use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::feature::Feature;
use crate::domain::project::Project;
use crate::domain::team::Team;
use crate::domain::update::{EntityId, UpdateKey, UpdateType};
use crate::services::forecast_refresh::forecast_task;
use crate::services::percentiles::value_sorted;
use crate::services::refresh_scheduler::{RefreshCandidate, RefreshStrategy};
use crate::services::repository::RepositoryError;
use crate::services::update_handlers::RefreshServices;
use crate::services::update_queue::{TaskFactory, UpdateError};

/// Re-pulls the features of each project and sizes the ones nobody has
/// broken down yet. Every refresh is followed by a forecast refresh.
pub struct FeatureRefresh {
    services: RefreshServices,
}

impl FeatureRefresh {
    pub fn new(services: RefreshServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl RefreshStrategy for FeatureRefresh {
    fn update_type(&self) -> UpdateType {
        UpdateType::Features
    }

    async fn candidates(&self) -> Result<Vec<RefreshCandidate>, RepositoryError> {
        let projects = self.services.projects.get_all().await?;
        Ok(projects
            .into_iter()
            .map(|project| RefreshCandidate {
                id: project.id,
                name: project.name,
                updated_at: project.features_updated_at,
            })
            .collect())
    }

    fn task_for(&self, id: EntityId) -> TaskFactory {
        let services = self.services.clone();
        Box::new(move |ctx| {
            Box::pin(async move {
                refresh_features(&services, id).await?;
                let forecast_key = UpdateKey::new(UpdateType::Forecasts, id);
                ctx.queue().enqueue_update(forecast_key, forecast_task(services, id));
                Ok(())
            })
        })
    }
}

pub async fn refresh_features(services: &RefreshServices, project_id: EntityId) -> Result<(), UpdateError> {
    let Some(project) = services.projects.get_by_id(project_id).await? else {
        info!(entity_id = project_id, "project no longer exists, nothing to refresh");
        return Ok(());
    };
    info!(entity_id = project.id, project = %project.name, "refreshing features");

    let teams = project_teams(services, &project).await?;
    let mut features = services.connector.fetch_features(&project, &teams).await?;

    for feature in &mut features {
        feature.work.retain(|work| work.total_items > 0);
        feature.is_using_default_size = false;
    }

    let mut default_size = None;
    for feature in features.iter_mut().filter(|feature| feature.needs_default_size()) {
        let remaining = if feature.estimated_size > 0 {
            feature.estimated_size
        } else {
            match default_size {
                Some(size) => size,
                None => {
                    let size = default_feature_size(services, &project).await?;
                    default_size = Some(size);
                    size
                }
            }
        };
        assign_default_work(&project, &teams, feature, remaining);
    }

    info!(
        entity_id = project.id,
        features = features.len(),
        remaining_items = features.iter().map(Feature::remaining_work).sum::<usize>(),
        "features refreshed"
    );
    let stored = services
        .projects
        .update(
            project.id,
            Box::new(move |stored: &mut Project| {
                carry_over_forecasts(&stored.features, &mut features);
                stored.features = features;
                stored.features_updated_at = Some(Utc::now());
                true
            }),
        )
        .await?;
    if stored.is_none() {
        info!(entity_id = project.id, "project removed while refreshing features");
    }
    Ok(())
}

/// Keeps the forecasts of features that are still present until the next
/// forecast refresh replaces them.
fn carry_over_forecasts(previous: &[Feature], features: &mut [Feature]) {
    for feature in features {
        if let Some(earlier) = previous.iter().find(|earlier| earlier.key == feature.key) {
            feature.forecasts = earlier.forecasts.clone();
        }
    }
}

async fn project_teams(services: &RefreshServices, project: &Project) -> Result<Vec<Team>, RepositoryError> {
    let mut teams = Vec::with_capacity(project.team_ids.len());
    for team_id in &project.team_ids {
        match services.teams.get_by_id(*team_id).await? {
            Some(team) => teams.push(team),
            None => warn!(entity_id = project.id, team_id, "project refers to unknown team"),
        }
    }
    Ok(teams)
}

/// Size assumed for features without child items.
async fn default_feature_size(services: &RefreshServices, project: &Project) -> Result<usize, UpdateError> {
    if !project.use_percentile_default_size {
        return Ok(project.default_work_items_per_feature);
    }

    let mut sizes = services.connector.fetch_historical_feature_sizes(project).await?;
    sizes.sort_unstable();
    let size = value_sorted(&sizes, project.default_work_item_percentile).unwrap_or(project.default_work_items_per_feature);
    debug!(
        entity_id = project.id,
        percentile = project.default_work_item_percentile,
        history = sizes.len(),
        size,
        "default feature size from history"
    );
    Ok(size)
}

/// Teams that get default work: the feature's own owners when any of them
/// belong to the project, else the project's owning team, else every team.
fn owning_teams(project: &Project, teams: &[Team], feature: &Feature) -> Vec<EntityId> {
    let named: Vec<EntityId> = teams
        .iter()
        .filter(|team| feature.owning_teams.iter().any(|owner| *owner == team.name))
        .map(|team| team.id)
        .collect();
    if !named.is_empty() {
        return named;
    }

    if let Some(owner) = project.owning_team.filter(|owner| teams.iter().any(|team| team.id == *owner)) {
        return vec![owner];
    }

    teams.iter().map(|team| team.id).collect()
}

fn assign_default_work(project: &Project, teams: &[Team], feature: &mut Feature, items: usize) {
    let owners = owning_teams(project, teams, feature);
    if owners.is_empty() {
        warn!(entity_id = project.id, feature = %feature.key, "no team to assign default work to");
        return;
    }

    for (team_id, bucket) in owners.iter().zip(split_into_buckets(items, owners.len())) {
        feature.set_work_for_team(*team_id, bucket, bucket);
    }
    feature.is_using_default_size = true;
    debug!(entity_id = project.id, feature = %feature.key, items, teams = owners.len(), "assigned default work");
}

/// Splits `items` into `buckets` near-equal parts, the first ones larger.
pub fn split_into_buckets(items: usize, buckets: usize) -> Vec<usize> {
    if buckets == 0 {
        return Vec::new();
    }
    let (quotient, remainder) = (items / buckets, items % buckets);
    (0..buckets).map(|index| quotient + usize::from(index < remainder)).collect()
}
