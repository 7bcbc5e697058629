pub mod capability;
pub mod data_source;
pub mod feature_refresh;
pub mod forecast;
pub mod forecast_refresh;
pub mod histogram;
pub mod jira_api;
pub mod percentiles;
pub mod refresh_scheduler;
pub mod repository;
pub mod settings;
pub mod simulation;
pub mod simulation_result;
pub mod status_channel;
pub mod status_store;
pub mod supervisor;
pub mod throughput_refresh;
pub mod throughput_yaml;
pub mod update_handlers;
pub mod update_queue;
pub mod workspace_yaml;
