use async_trait::async_trait;
use thiserror::Error;

use crate::domain::feature::Feature;
use crate::domain::project::Project;
use crate::domain::team::Team;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    #[error("resource not found")]
    NotFound,
    #[error("connection error")]
    Connection,
    #[error("parse error")]
    Parse,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Other(String),
}

/// Pulls raw work-item data from a work-tracking system.
#[async_trait]
pub trait WorkItemConnector: Send + Sync {
    /// Items closed per day over the team's history window, oldest first.
    async fn fetch_throughput(&self, team: &Team) -> Result<Vec<usize>, DataSourceError>;

    /// Open features of `project` in priority order, with each team's share of
    /// their child items filled in.
    async fn fetch_features(&self, project: &Project, teams: &[Team]) -> Result<Vec<Feature>, DataSourceError>;

    /// Child item counts of features closed in the past.
    async fn fetch_historical_feature_sizes(&self, project: &Project) -> Result<Vec<usize>, DataSourceError>;
}
