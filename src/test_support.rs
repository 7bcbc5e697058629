use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::domain::feature::Feature;
use crate::domain::project::Project;
use crate::domain::team::Team;
use crate::domain::update::{EntityId, UpdateKey};
use crate::services::data_source::{DataSourceError, WorkItemConnector};
use crate::services::repository::InMemoryRepository;
use crate::services::update_handlers::RefreshServices;
use crate::services::update_queue::UpdateQueue;

pub const TEST_TRIALS: usize = 200;

pub fn on_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Waits until `key` has left the queue.
pub async fn wait_until_idle(queue: &UpdateQueue, key: UpdateKey) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while queue.get_status(key).is_some() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{key} did not finish in time"));
}

/// Connector serving canned data.
#[derive(Default)]
pub struct FakeConnector {
    throughput: Mutex<HashMap<EntityId, Vec<usize>>>,
    features: Mutex<HashMap<EntityId, Vec<Feature>>>,
    historical_sizes: Mutex<Vec<usize>>,
    failure: Mutex<Option<DataSourceError>>,
    throughput_calls: AtomicUsize,
    historical_calls: AtomicUsize,
}

impl FakeConnector {
    pub fn set_throughput(&self, team_id: EntityId, values: Vec<usize>) {
        self.throughput.lock().insert(team_id, values);
    }

    pub fn set_features(&self, project_id: EntityId, features: Vec<Feature>) {
        self.features.lock().insert(project_id, features);
    }

    pub fn set_historical_sizes(&self, sizes: Vec<usize>) {
        *self.historical_sizes.lock() = sizes;
    }

    /// Every following call fails with `error`.
    pub fn fail_with(&self, error: DataSourceError) {
        *self.failure.lock() = Some(error);
    }

    pub fn throughput_calls(&self) -> usize {
        self.throughput_calls.load(Ordering::SeqCst)
    }

    pub fn historical_calls(&self) -> usize {
        self.historical_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), DataSourceError> {
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkItemConnector for FakeConnector {
    async fn fetch_throughput(&self, team: &Team) -> Result<Vec<usize>, DataSourceError> {
        self.throughput_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.throughput.lock().get(&team.id).cloned().unwrap_or_default())
    }

    async fn fetch_features(&self, project: &Project, _teams: &[Team]) -> Result<Vec<Feature>, DataSourceError> {
        self.check_failure()?;
        Ok(self.features.lock().get(&project.id).cloned().unwrap_or_default())
    }

    async fn fetch_historical_feature_sizes(&self, _project: &Project) -> Result<Vec<usize>, DataSourceError> {
        self.historical_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.historical_sizes.lock().clone())
    }
}

/// In-memory services around a [`FakeConnector`].
pub fn refresh_services(teams: Vec<Team>, projects: Vec<Project>) -> (RefreshServices, Arc<FakeConnector>) {
    let connector = Arc::new(FakeConnector::default());
    let services = RefreshServices {
        teams: Arc::new(InMemoryRepository::with_entities(teams)),
        projects: Arc::new(InMemoryRepository::with_entities(projects)),
        connector: connector.clone(),
        trials: TEST_TRIALS,
    };
    (services, connector)
}
