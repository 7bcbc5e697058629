use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::domain::team::Team;
use crate::domain::throughput::ThroughputHistory;
use crate::domain::update::{EntityId, UpdateType};
use crate::services::refresh_scheduler::{RefreshCandidate, RefreshStrategy};
use crate::services::repository::RepositoryError;
use crate::services::update_handlers::RefreshServices;
use crate::services::update_queue::{TaskFactory, UpdateError};

/// Re-pulls each team's daily throughput.
pub struct ThroughputRefresh {
    services: RefreshServices,
}

impl ThroughputRefresh {
    pub fn new(services: RefreshServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl RefreshStrategy for ThroughputRefresh {
    fn update_type(&self) -> UpdateType {
        UpdateType::Team
    }

    async fn candidates(&self) -> Result<Vec<RefreshCandidate>, RepositoryError> {
        let teams = self.services.teams.get_all().await?;
        Ok(teams
            .into_iter()
            .map(|team| RefreshCandidate {
                id: team.id,
                name: team.name,
                updated_at: team.updated_at,
            })
            .collect())
    }

    fn task_for(&self, id: EntityId) -> TaskFactory {
        let services = self.services.clone();
        Box::new(move |_| Box::pin(async move { refresh_throughput(&services, id).await }))
    }
}

pub async fn refresh_throughput(services: &RefreshServices, team_id: EntityId) -> Result<(), UpdateError> {
    let Some(team) = services.teams.get_by_id(team_id).await? else {
        info!(entity_id = team_id, "team no longer exists, nothing to refresh");
        return Ok(());
    };

    let throughput = ThroughputHistory::new(services.connector.fetch_throughput(&team).await?);
    info!(
        entity_id = team.id,
        team = %team.name,
        days = throughput.len(),
        closed_items = throughput.total(),
        "throughput refreshed"
    );
    let stored = services
        .teams
        .update(
            team_id,
            Box::new(move |stored: &mut Team| {
                stored.throughput = throughput;
                stored.updated_at = Some(Utc::now());
                true
            }),
        )
        .await?;
    if stored.is_none() {
        info!(entity_id = team_id, "team removed while refreshing throughput");
    }
    Ok(())
}
