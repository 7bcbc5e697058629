use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::throughput::{Throughput, ThroughputHistory};

#[derive(Error, Debug)]
pub enum ThroughputYamlError {
    #[error("failed to read throughput yaml: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse throughput yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid date format: {0}")]
    InvalidDate(String),
}

#[derive(Serialize, Deserialize)]
struct ThroughputRecord {
    date: String,
    completed_issues: usize,
}

pub fn load_throughput_from_yaml_file(path: impl AsRef<Path>) -> Result<ThroughputHistory, ThroughputYamlError> {
    let contents = std::fs::read_to_string(path)?;
    let records = deserialize_throughput_from_yaml_str(&contents)?;
    Ok(ThroughputHistory::from_records(&records))
}

pub fn deserialize_throughput_from_yaml_str(input: &str) -> Result<Vec<Throughput>, ThroughputYamlError> {
    let records: Vec<ThroughputRecord> = serde_yaml::from_str(input)?;
    records
        .into_iter()
        .map(|record| {
            let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d")
                .map_err(|_| ThroughputYamlError::InvalidDate(record.date.clone()))?;
            Ok(Throughput {
                date,
                completed_issues: record.completed_issues,
            })
        })
        .collect()
}

pub fn serialize_throughput_to_yaml<W: Write>(writer: &mut W, data: &[Throughput]) -> io::Result<()> {
    let records: Vec<ThroughputRecord> = data
        .iter()
        .map(|t| ThroughputRecord {
            date: t.date.format("%Y-%m-%d").to_string(),
            completed_issues: t.completed_issues,
        })
        .collect();

    let yaml = serde_yaml::to_string(&records).map_err(io::Error::other)?;
    writer.write_all(yaml.as_bytes())
}
