use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::project::Project;
use crate::domain::team::Team;
use crate::domain::update::UpdateType;
use crate::services::capability::CapabilityGate;
use crate::services::data_source::WorkItemConnector;
use crate::services::feature_refresh::FeatureRefresh;
use crate::services::forecast_refresh::ForecastRefresh;
use crate::services::refresh_scheduler::{RefreshScheduler, RefreshStrategy};
use crate::services::repository::Repository;
use crate::services::settings::SettingsProvider;
use crate::services::throughput_refresh::ThroughputRefresh;
use crate::services::update_queue::UpdateQueue;

/// Collaborators shared by every refresh task.
#[derive(Clone)]
pub struct RefreshServices {
    pub teams: Arc<dyn Repository<Team>>,
    pub projects: Arc<dyn Repository<Project>>,
    pub connector: Arc<dyn WorkItemConnector>,
    pub trials: usize,
}

/// Maps each [`UpdateType`] to the strategy that refreshes it.
pub struct UpdateHandlers {
    strategies: HashMap<UpdateType, Arc<dyn RefreshStrategy>>,
}

impl UpdateHandlers {
    pub fn new(services: RefreshServices) -> Self {
        let strategies = UpdateType::ALL
            .into_iter()
            .map(|update_type| {
                let strategy: Arc<dyn RefreshStrategy> = match update_type {
                    UpdateType::Team => Arc::new(ThroughputRefresh::new(services.clone())),
                    UpdateType::Features => Arc::new(FeatureRefresh::new(services.clone())),
                    UpdateType::Forecasts => Arc::new(ForecastRefresh::new(services.clone())),
                };
                (update_type, strategy)
            })
            .collect();
        Self { strategies }
    }

    pub fn strategy(&self, update_type: UpdateType) -> Option<Arc<dyn RefreshStrategy>> {
        self.strategies.get(&update_type).cloned()
    }

    /// One scheduler per update type, in [`UpdateType::ALL`] order.
    pub fn schedulers(
        &self,
        queue: &UpdateQueue,
        settings: Arc<dyn SettingsProvider>,
        gate: Arc<dyn CapabilityGate>,
    ) -> Vec<RefreshScheduler> {
        UpdateType::ALL
            .into_iter()
            .filter_map(|update_type| self.strategy(update_type))
            .map(|strategy| RefreshScheduler::new(strategy, queue.clone(), settings.clone(), gate.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::capability::LicenseSettings;
    use crate::services::settings::StaticSettings;
    use crate::services::status_channel::UpdateNotifier;
    use crate::services::status_store::StatusStore;
    use crate::test_support::refresh_services;

    #[test]
    fn every_update_type_has_a_strategy() {
        let (services, _) = refresh_services(Vec::new(), Vec::new());
        let handlers = UpdateHandlers::new(services);

        for update_type in UpdateType::ALL {
            assert_eq!(handlers.strategy(update_type).unwrap().update_type(), update_type);
        }
    }

    #[tokio::test]
    async fn builds_one_scheduler_per_type() {
        let (services, _) = refresh_services(Vec::new(), Vec::new());
        let queue = UpdateQueue::new(StatusStore::new(), Arc::new(UpdateNotifier::new()));
        let schedulers = UpdateHandlers::new(services).schedulers(
            &queue,
            Arc::new(StaticSettings::default()),
            Arc::new(LicenseSettings::default()),
        );

        let types: Vec<UpdateType> = schedulers.iter().map(RefreshScheduler::update_type).collect();
        assert_eq!(types, UpdateType::ALL.to_vec());
    }
}
