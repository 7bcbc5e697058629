use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::update::UpdateType;
use crate::services::capability::LicenseSettings;
use crate::services::simulation::DEFAULT_TRIALS;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Timing of one refresh category, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RefreshSettings {
    /// Pause between two scans.
    pub interval: u64,
    /// Age after which an entity is stale.
    pub refresh_after: u64,
    /// Pause before the first scan.
    pub start_delay: u64,
}

impl RefreshSettings {
    pub const fn new(interval: u64, refresh_after: u64, start_delay: u64) -> Self {
        Self {
            interval,
            refresh_after,
            start_delay,
        }
    }

    pub fn default_for(update_type: UpdateType) -> Self {
        match update_type {
            UpdateType::Team => Self::new(60, 180, 1),
            UpdateType::Features => Self::new(60, 180, 2),
            UpdateType::Forecasts => Self::new(60, 180, 3),
        }
    }

    pub fn interval(&self) -> Duration {
        minutes(self.interval)
    }

    pub fn start_delay(&self) -> Duration {
        minutes(self.start_delay)
    }

    pub fn refresh_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.refresh_after as i64)
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub trials: usize,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
        }
    }
}

/// Where the Jira connector talks to. Credentials come from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JiraConnection {
    pub base_url: String,
    pub done_date_field_id: String,
    /// Field holding the owning team names of a feature.
    pub owning_team_field_id: Option<String>,
    pub estimated_size_field_id: Option<String>,
}

impl Default for JiraConnection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            done_date_field_id: "resolutiondate".to_string(),
            owning_team_field_id: None,
            estimated_size_field_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppSettings {
    #[serde(default = "throughput_refresh_default")]
    pub throughput_refresh: RefreshSettings,
    #[serde(default = "feature_refresh_default")]
    pub feature_refresh: RefreshSettings,
    #[serde(default = "forecast_refresh_default")]
    pub forecast_refresh: RefreshSettings,
    #[serde(default)]
    pub forecast: ForecastSettings,
    #[serde(default)]
    pub license: LicenseSettings,
    #[serde(default)]
    pub jira: Option<JiraConnection>,
}

fn throughput_refresh_default() -> RefreshSettings {
    RefreshSettings::default_for(UpdateType::Team)
}

fn feature_refresh_default() -> RefreshSettings {
    RefreshSettings::default_for(UpdateType::Features)
}

fn forecast_refresh_default() -> RefreshSettings {
    RefreshSettings::default_for(UpdateType::Forecasts)
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            throughput_refresh: throughput_refresh_default(),
            feature_refresh: feature_refresh_default(),
            forecast_refresh: forecast_refresh_default(),
            forecast: ForecastSettings::default(),
            license: LicenseSettings::default(),
            jira: None,
        }
    }
}

impl AppSettings {
    pub fn from_yaml_str(contents: &str) -> Result<Self, SettingsError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn refresh_settings(&self, update_type: UpdateType) -> RefreshSettings {
        match update_type {
            UpdateType::Team => self.throughput_refresh,
            UpdateType::Features => self.feature_refresh,
            UpdateType::Forecasts => self.forecast_refresh,
        }
    }
}

/// Source of refresh timings, consulted before every scan.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn refresh_settings(&self, update_type: UpdateType) -> Result<RefreshSettings, SettingsError>;
}

/// Settings fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    settings: AppSettings,
}

impl StaticSettings {
    pub fn new(settings: AppSettings) -> Self {
        Self { settings }
    }

    /// Same timings for every category.
    pub fn uniform(refresh: RefreshSettings) -> Self {
        Self::new(AppSettings {
            throughput_refresh: refresh,
            feature_refresh: refresh,
            forecast_refresh: refresh,
            ..AppSettings::default()
        })
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn refresh_settings(&self, update_type: UpdateType) -> Result<RefreshSettings, SettingsError> {
        Ok(self.settings.refresh_settings(update_type))
    }
}

/// Settings re-read from disk on every call, so edits apply on the next scan.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<AppSettings, SettingsError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SettingsError::Io {
                path: self.path.clone(),
                source,
            })?;
        AppSettings::from_yaml_str(&contents)
    }
}

#[async_trait]
impl SettingsProvider for SettingsFile {
    async fn refresh_settings(&self, update_type: UpdateType) -> Result<RefreshSettings, SettingsError> {
        Ok(self.load().await?.refresh_settings(update_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::capability::LicenseTier;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let settings = AppSettings::from_yaml_str("feature_refresh: {interval: 5, refresh_after: 10, start_delay: 0}").unwrap();

        assert_eq!(settings.throughput_refresh, RefreshSettings::new(60, 180, 1));
        assert_eq!(settings.feature_refresh, RefreshSettings::new(5, 10, 0));
        assert_eq!(settings.forecast_refresh, RefreshSettings::new(60, 180, 3));
        assert_eq!(settings.forecast.trials, 10_000);
        assert_eq!(settings.license.tier, LicenseTier::Free);
        assert!(settings.jira.is_none());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(AppSettings::from_yaml_str("").unwrap(), AppSettings::default());
    }

    #[test]
    fn jira_block_keeps_field_defaults() {
        let settings = AppSettings::from_yaml_str("jira:\n  base_url: https://example.atlassian.net/rest/api/3\n").unwrap();
        let jira = settings.jira.unwrap();

        assert_eq!(jira.base_url, "https://example.atlassian.net/rest/api/3");
        assert_eq!(jira.done_date_field_id, "resolutiondate");
        assert_eq!(jira.owning_team_field_id, None);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let err = AppSettings::from_yaml_str("throughput_refresh: [1, 2").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn durations_are_minutes() {
        let refresh = RefreshSettings::new(10, 360, 2);
        assert_eq!(refresh.interval(), Duration::from_secs(600));
        assert_eq!(refresh.start_delay(), Duration::from_secs(120));
        assert_eq!(refresh.refresh_after(), chrono::Duration::hours(6));
    }

    #[tokio::test]
    async fn settings_file_picks_up_edits() {
        let dir = std::env::temp_dir().join(format!("flow-forecasts-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.yaml");
        let provider = SettingsFile::new(&path);

        std::fs::write(&path, "forecast_refresh: {interval: 1, refresh_after: 2, start_delay: 3}").unwrap();
        let first = provider.refresh_settings(UpdateType::Forecasts).await.unwrap();
        std::fs::write(&path, "forecast_refresh: {interval: 4, refresh_after: 5, start_delay: 6}").unwrap();
        let second = provider.refresh_settings(UpdateType::Forecasts).await.unwrap();

        assert_eq!(first, RefreshSettings::new(1, 2, 3));
        assert_eq!(second, RefreshSettings::new(4, 5, 6));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn missing_settings_file_is_io_error() {
        let provider = SettingsFile::new("/definitely/not/here.yaml");
        let err = provider.refresh_settings(UpdateType::Team).await.unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
