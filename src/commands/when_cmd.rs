use crate::commands::base_commands::{CommandError, WhenArgs, parse_date};
use crate::commands::how_many_cmd::write_report;
use crate::commands::report_format::{WhenReport, format_when_report};
use crate::services::histogram::write_histogram_png;
use crate::services::simulation::ForecastEngine;
use crate::services::throughput_yaml::load_throughput_from_yaml_file;

pub async fn when_command(args: WhenArgs) -> Result<(), CommandError> {
    let start_date = parse_date(&args.start_date)?;
    let target_date = args.target_date.as_deref().map(parse_date).transpose()?;

    let throughput = load_throughput_from_yaml_file(&args.throughput)?;
    let forecast = ForecastEngine::new(args.trials).when(&throughput, args.number_of_items)?;
    let report = WhenReport::new(
        args.throughput.display().to_string(),
        &forecast,
        start_date,
        args.number_of_items,
        target_date,
    );

    println!("{}", format_when_report(&report));

    if let Some(histogram) = &args.histogram {
        write_histogram_png(histogram, forecast.simulation_result(), "Days")?;
        println!("Histogram written to {}", histogram.display());
    }
    if let Some(output) = &args.output {
        write_report(output, &report).await?;
        println!("Forecast written to {}", output.display());
    }
    Ok(())
}
