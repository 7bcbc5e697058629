use std::path::Path;

use crate::commands::base_commands::{CommandError, HowManyArgs};
use crate::commands::report_format::{HowManyReport, format_how_many_report};
use crate::services::histogram::write_histogram_png;
use crate::services::simulation::ForecastEngine;
use crate::services::throughput_yaml::load_throughput_from_yaml_file;

pub async fn how_many_command(args: HowManyArgs) -> Result<(), CommandError> {
    let throughput = load_throughput_from_yaml_file(&args.throughput)?;
    let forecast = ForecastEngine::new(args.trials).how_many(&throughput, args.days)?;
    let report = HowManyReport::new(args.throughput.display().to_string(), &forecast);

    println!("{}", format_how_many_report(&report));

    if let Some(histogram) = &args.histogram {
        write_histogram_png(histogram, forecast.simulation_result(), "Items")?;
        println!("Histogram written to {}", histogram.display());
    }
    if let Some(output) = &args.output {
        write_report(output, &report).await?;
        println!("Forecast written to {}", output.display());
    }
    Ok(())
}

pub(crate) async fn write_report<T: serde::Serialize>(path: &Path, report: &T) -> Result<(), CommandError> {
    let yaml = serde_yaml::to_string(report)?;
    tokio::fs::write(path, yaml).await.map_err(|source| CommandError::Write {
        path: path.to_path_buf(),
        source,
    })
}
