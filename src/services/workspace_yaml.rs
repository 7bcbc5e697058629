use std::collections::HashSet;
use std::io;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::project::{DEFAULT_WORK_ITEM_PERCENTILE, DEFAULT_WORK_ITEMS_PER_FEATURE, Milestone, Project};
use crate::domain::team::{DEFAULT_THROUGHPUT_HISTORY_DAYS, Team};
use crate::domain::update::EntityId;

#[derive(Error, Debug)]
pub enum WorkspaceYamlError {
    #[error("failed to read workspace yaml: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse workspace yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid date format: {0}")]
    InvalidDate(String),
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: EntityId },
    #[error("project {project} refers to unknown team {team}")]
    UnknownTeam { project: EntityId, team: EntityId },
}

/// Teams and projects the schedulers start from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    pub teams: Vec<Team>,
    pub projects: Vec<Project>,
}

#[derive(Deserialize)]
struct WorkspaceRecord {
    #[serde(default)]
    teams: Vec<TeamRecord>,
    #[serde(default)]
    projects: Vec<ProjectRecord>,
}

#[derive(Deserialize)]
struct TeamRecord {
    id: EntityId,
    name: String,
    #[serde(default)]
    work_item_query: String,
    throughput_history_days: Option<u32>,
    feature_wip: Option<usize>,
}

#[derive(Deserialize)]
struct ProjectRecord {
    id: EntityId,
    name: String,
    #[serde(default)]
    teams: Vec<EntityId>,
    owning_team: Option<EntityId>,
    #[serde(default)]
    feature_query: String,
    #[serde(default)]
    historical_features_query: String,
    default_work_items_per_feature: Option<usize>,
    #[serde(default)]
    use_percentile_default_size: bool,
    default_work_item_percentile: Option<f64>,
    #[serde(default)]
    milestones: Vec<MilestoneRecord>,
}

#[derive(Deserialize)]
struct MilestoneRecord {
    name: String,
    date: String,
}

pub fn load_workspace_from_yaml_file(path: impl AsRef<Path>) -> Result<Workspace, WorkspaceYamlError> {
    let contents = std::fs::read_to_string(path)?;
    deserialize_workspace_from_yaml_str(&contents)
}

pub fn deserialize_workspace_from_yaml_str(input: &str) -> Result<Workspace, WorkspaceYamlError> {
    let record: WorkspaceRecord = serde_yaml::from_str(input)?;

    let mut team_ids = HashSet::new();
    let mut teams = Vec::with_capacity(record.teams.len());
    for team_record in record.teams {
        if !team_ids.insert(team_record.id) {
            return Err(WorkspaceYamlError::DuplicateId {
                kind: "team",
                id: team_record.id,
            });
        }
        let mut team = Team::new(team_record.id, team_record.name);
        team.work_item_query = team_record.work_item_query;
        team.throughput_history_days = team_record
            .throughput_history_days
            .unwrap_or(DEFAULT_THROUGHPUT_HISTORY_DAYS);
        team.feature_wip = team_record.feature_wip.unwrap_or(1).max(1);
        teams.push(team);
    }

    let mut project_ids = HashSet::new();
    let mut projects = Vec::with_capacity(record.projects.len());
    for project_record in record.projects {
        if !project_ids.insert(project_record.id) {
            return Err(WorkspaceYamlError::DuplicateId {
                kind: "project",
                id: project_record.id,
            });
        }
        let referenced = project_record.teams.iter().chain(project_record.owning_team.as_ref());
        for team in referenced {
            if !team_ids.contains(team) {
                return Err(WorkspaceYamlError::UnknownTeam {
                    project: project_record.id,
                    team: *team,
                });
            }
        }

        let mut project = Project::new(project_record.id, project_record.name);
        project.team_ids = project_record.teams;
        project.owning_team = project_record.owning_team;
        project.feature_query = project_record.feature_query;
        project.historical_features_query = project_record.historical_features_query;
        project.default_work_items_per_feature = project_record
            .default_work_items_per_feature
            .unwrap_or(DEFAULT_WORK_ITEMS_PER_FEATURE);
        project.use_percentile_default_size = project_record.use_percentile_default_size;
        project.default_work_item_percentile = project_record
            .default_work_item_percentile
            .unwrap_or(DEFAULT_WORK_ITEM_PERCENTILE);
        project.milestones = project_record
            .milestones
            .into_iter()
            .map(milestone_from_record)
            .collect::<Result<_, _>>()?;
        projects.push(project);
    }

    Ok(Workspace { teams, projects })
}

fn milestone_from_record(record: MilestoneRecord) -> Result<Milestone, WorkspaceYamlError> {
    let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d")
        .map_err(|_| WorkspaceYamlError::InvalidDate(record.date.clone()))?;
    Ok(Milestone {
        name: record.name,
        date,
    })
}
