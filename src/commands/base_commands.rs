use std::io;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use thiserror::Error;

use crate::services::data_source::DataSourceError;
use crate::services::histogram::HistogramError;
use crate::services::settings::SettingsError;
use crate::services::simulation::{DEFAULT_TRIALS, ForecastError};
use crate::services::throughput_yaml::ThroughputYamlError;
use crate::services::workspace_yaml::WorkspaceYamlError;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Log debug output (overridden by FLOW_FORECASTS_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Keep team throughput, features and forecasts fresh until Ctrl-C
    Serve(ServeArgs),
    /// Forecast how many items get done within a number of days
    HowMany(HowManyArgs),
    /// Forecast when a number of items will be done
    When(WhenArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Settings YAML file, re-read before every scan
    #[arg(short, long)]
    pub settings: PathBuf,
    /// Workspace YAML file with teams and projects
    #[arg(short, long)]
    pub workspace: PathBuf,
}

#[derive(Args, Debug)]
pub struct HowManyArgs {
    /// Throughput YAML file
    #[arg(short = 'f', long)]
    pub throughput: PathBuf,
    /// Number of days to forecast
    #[arg(short, long)]
    pub days: usize,
    /// Number of Monte-Carlo trials
    #[arg(short, long, default_value_t = DEFAULT_TRIALS)]
    pub trials: usize,
    /// Write the report as YAML to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Write a histogram PNG to this file
    #[arg(long)]
    pub histogram: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct WhenArgs {
    /// Throughput YAML file
    #[arg(short = 'f', long)]
    pub throughput: PathBuf,
    /// Number of items left
    #[arg(short, long)]
    pub number_of_items: usize,
    /// Forecast start date (YYYY-MM-DD)
    #[arg(short, long, default_value_t = default_start_date())]
    pub start_date: String,
    /// Report the likelihood of finishing by this date (YYYY-MM-DD)
    #[arg(long)]
    pub target_date: Option<String>,
    /// Number of Monte-Carlo trials
    #[arg(short, long, default_value_t = DEFAULT_TRIALS)]
    pub trials: usize,
    /// Write the report as YAML to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Write a histogram PNG to this file
    #[arg(long)]
    pub histogram: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Throughput(#[from] ThroughputYamlError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceYamlError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error(transparent)]
    Histogram(#[from] HistogramError),
    #[error("jira: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid date {0}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("settings have no jira section")]
    MissingJiraConnection,
}

fn default_start_date() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| CommandError::InvalidDate(value.to_string()))
}
