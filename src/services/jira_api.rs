use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::domain::feature::Feature;
use crate::domain::issue::{Issue, IssueId, IssueStatus};
use crate::domain::project::Project;
use crate::domain::team::Team;
use crate::domain::throughput::ThroughputHistory;
use crate::services::data_source::{DataSourceError, WorkItemConnector};
use crate::services::settings::JiraConnection;

type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone)]
pub struct AuthData {
    pub username: String,
    pub api_token: String,
}

impl AuthData {
    pub fn from_env() -> Result<Self, DataSourceError> {
        let username = env::var("JIRA_USERNAME").ok();
        let api_token = env::var("JIRA_API_TOKEN").ok();
        match (username, api_token) {
            (Some(username), Some(api_token)) => Ok(Self { username, api_token }),
            _ => Err(DataSourceError::Unauthorized),
        }
    }
}

/// [`WorkItemConnector`] backed by the Jira Cloud REST API.
pub struct JiraApiClient {
    connection: JiraConnection,
    auth: AuthData,
    client: Client,
}

impl JiraApiClient {
    pub fn new(connection: JiraConnection, auth: AuthData) -> Result<Self, DataSourceError> {
        if connection.base_url.is_empty() {
            return Err(DataSourceError::Other("jira connection is missing base_url".to_string()));
        }

        Ok(Self {
            connection,
            auth,
            client: Client::new(),
        })
    }

    async fn fetch_json(&self, url: &str, params: &HashMap<&str, String>) -> Result<Value, DataSourceError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .basic_auth(self.auth.username.clone(), Some(self.auth.api_token.clone()))
            .send()
            .await
            .map_err(|_| DataSourceError::Connection)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(DataSourceError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(DataSourceError::NotFound);
        }
        if !status.is_success() {
            return Err(DataSourceError::Connection);
        }

        response.json::<Value>().await.map_err(|_| DataSourceError::Parse)
    }

    /// Runs `jql` and returns the `fields` object and key of every hit,
    /// following both token and offset pagination.
    async fn search(&self, jql: &str, fields: &[&str]) -> Result<Vec<(String, Fields)>, DataSourceError> {
        let url = format!("{}/search/jql", self.connection.base_url);
        let mut params = HashMap::new();
        params.insert("jql", jql.to_string());
        params.insert("fields", fields.join(","));

        let mut hits = Vec::new();
        let mut last_page_token: Option<String> = None;

        loop {
            let payload = self.fetch_json(&url, &params).await?;

            let issues = payload
                .get("issues")
                .and_then(|value| value.as_array())
                .ok_or(DataSourceError::Parse)?;
            for issue in issues {
                let key = issue
                    .get("key")
                    .and_then(|value| value.as_str())
                    .ok_or(DataSourceError::Parse)?;
                let fields = issue
                    .get("fields")
                    .and_then(|value| value.as_object())
                    .cloned()
                    .unwrap_or_default();
                hits.push((key.to_string(), fields));
            }

            if let Some(token) = payload.get("nextPageToken").and_then(|value| value.as_str()) {
                if last_page_token.as_deref() == Some(token) {
                    break;
                }
                last_page_token = Some(token.to_string());
                params.insert("nextPageToken", token.to_string());
                params.remove("startAt");
                continue;
            }

            if payload.get("isLast").and_then(|value| value.as_bool()).unwrap_or(false) {
                break;
            }

            let start_at = payload.get("startAt").and_then(|value| value.as_u64());
            let max_results = payload.get("maxResults").and_then(|value| value.as_u64());
            let total = payload.get("total").and_then(|value| value.as_u64());
            if let (Some(start_at), Some(max_results), Some(total)) = (start_at, max_results, total) {
                let next_start_at = start_at.saturating_add(max_results);
                if next_start_at >= total || max_results == 0 {
                    break;
                }
                params.remove("nextPageToken");
                params.insert("startAt", next_start_at.to_string());
                continue;
            }

            break;
        }

        debug!(jql, hits = hits.len(), "jira search finished");
        Ok(hits)
    }

    async fn issues(&self, jql: &str) -> Result<Vec<Issue>, DataSourceError> {
        let fields = ["statusCategory", "parent", self.connection.done_date_field_id.as_str()];
        let hits = self.search(jql, &fields).await?;
        Ok(hits
            .into_iter()
            .map(|(key, fields)| self.map_issue(key, &fields))
            .collect())
    }

    fn map_issue(&self, key: String, fields: &Fields) -> Issue {
        let mut issue = Issue::new();
        issue.issue_id = Some(IssueId { id: key });
        issue.status = get_field_status_category(fields);
        issue.parent = fields
            .get("parent")
            .and_then(|parent| parent.get("key"))
            .and_then(|key| key.as_str())
            .map(|key| IssueId { id: key.to_string() });
        issue.done_date = parse_date_opt(get_field_string(fields, &self.connection.done_date_field_id).as_deref());
        issue
    }

    fn map_feature(&self, key: String, fields: &Fields) -> Feature {
        let name = get_field_string(fields, "summary").unwrap_or_else(|| key.clone());
        let mut feature = Feature::new(key, name);
        feature.done = get_field_status_category(fields) == Some(IssueStatus::Done);
        feature.estimated_size = self
            .connection
            .estimated_size_field_id
            .as_deref()
            .and_then(|field| get_field_number(fields, field))
            .map_or(0, |size| size.max(0.0).round() as usize);
        feature.owning_teams = self
            .connection
            .owning_team_field_id
            .as_deref()
            .map(|field| get_field_names(fields, field))
            .unwrap_or_default();
        feature
    }

    fn feature_fields(&self) -> Vec<&str> {
        let mut fields = vec!["summary", "statusCategory"];
        fields.extend(self.connection.estimated_size_field_id.as_deref());
        fields.extend(self.connection.owning_team_field_id.as_deref());
        fields
    }
}

#[async_trait]
impl WorkItemConnector for JiraApiClient {
    async fn fetch_throughput(&self, team: &Team) -> Result<Vec<usize>, DataSourceError> {
        let days = team.throughput_history_days.max(1);
        let end = Utc::now().date_naive();
        let start = end - Duration::days(i64::from(days) - 1);
        let jql = format!(
            "({}) AND statusCategory = Done AND {} >= \"{}\"",
            team.work_item_query,
            self.connection.done_date_field_id,
            start.format("%Y-%m-%d")
        );

        let done_dates: Vec<NaiveDate> = self
            .issues(&jql)
            .await?
            .into_iter()
            .filter_map(|issue| issue.done_date)
            .collect();
        Ok(ThroughputHistory::from_done_dates(&done_dates, start, end).values().to_vec())
    }

    async fn fetch_features(&self, project: &Project, teams: &[Team]) -> Result<Vec<Feature>, DataSourceError> {
        let hits = self.search(&project.feature_query, &self.feature_fields()).await?;
        let mut features: Vec<Feature> = hits.into_iter().map(|(key, fields)| self.map_feature(key, &fields)).collect();
        if features.is_empty() {
            return Ok(features);
        }

        let parents = parent_clause(features.iter().map(|feature| feature.key.as_str()));
        for team in teams {
            let children = self.issues(&format!("({}) AND {parents}", team.work_item_query)).await?;
            for feature in &mut features {
                let (remaining, total) = children
                    .iter()
                    .filter(|child| child.parent_key() == Some(feature.key.as_str()))
                    .fold((0, 0), |(remaining, total), child| {
                        (remaining + usize::from(!child.is_done()), total + 1)
                    });
                feature.set_work_for_team(team.id, remaining, total);
            }
        }
        Ok(features)
    }

    async fn fetch_historical_feature_sizes(&self, project: &Project) -> Result<Vec<usize>, DataSourceError> {
        if project.historical_features_query.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = self
            .search(&project.historical_features_query, &["statusCategory"])
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let children = self.issues(&parent_clause(keys.iter().map(String::as_str))).await?;
        Ok(keys
            .iter()
            .map(|key| children.iter().filter(|child| child.parent_key() == Some(key.as_str())).count())
            .filter(|size| *size > 0)
            .collect())
    }
}

/// `parent in (A-1, A-2)` for the given issue keys.
fn parent_clause<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    format!("parent in ({})", keys.collect::<Vec<_>>().join(", "))
}

fn get_field_string(fields: &Fields, key: &str) -> Option<String> {
    fields.get(key).and_then(|value| match value {
        Value::String(text) => Some(text.clone()),
        _ => None,
    })
}

fn get_field_number(fields: &Fields, key: &str) -> Option<f64> {
    fields.get(key).and_then(|value| match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse::<f64>().ok(),
        _ => None,
    })
}

/// Team names from a text, option or multi-option field.
fn get_field_names(fields: &Fields, key: &str) -> Vec<String> {
    fn name_of(value: &Value) -> Option<String> {
        match value {
            Value::String(text) => Some(text.clone()),
            Value::Object(option) => option
                .get("value")
                .or_else(|| option.get("name"))
                .and_then(|name| name.as_str())
                .map(str::to_string),
            _ => None,
        }
    }

    match fields.get(key) {
        Some(Value::Array(values)) => values.iter().filter_map(name_of).collect(),
        Some(value) => name_of(value).into_iter().collect(),
        None => Vec::new(),
    }
}

fn get_field_status_category(fields: &Fields) -> Option<IssueStatus> {
    let status_name = fields
        .get("statusCategory")
        .and_then(|value| value.get("name"))
        .and_then(|value| value.as_str());
    match status_name.map(|value| value.to_ascii_lowercase()) {
        Some(value) if value == "to do" => Some(IssueStatus::ToDo),
        Some(value) if value == "in progress" => Some(IssueStatus::InProgress),
        Some(value) if value == "done" => Some(IssueStatus::Done),
        _ => None,
    }
}

fn parse_date_opt(value: Option<&str>) -> Option<NaiveDate> {
    let text = value?;
    let date = text.split_once('T').map_or(text, |(date_part, _)| date_part);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
