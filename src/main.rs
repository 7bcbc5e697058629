use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use flow_forecasts::commands::base_commands::{CliArgs, Commands};
use flow_forecasts::commands::how_many_cmd::how_many_command;
use flow_forecasts::commands::serve_cmd::serve_command;
use flow_forecasts::commands::when_cmd::when_command;
use flow_forecasts::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let (action, result) = match args.command {
        Commands::Serve(serve) => ("serve", serve_command(serve).await),
        Commands::HowMany(how_many) => ("forecast how many", how_many_command(how_many).await),
        Commands::When(when) => ("forecast when", when_command(when).await),
        Commands::Completions { shell } => {
            let mut command = CliArgs::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut io::stdout());
            return ExitCode::SUCCESS;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to {action}: {e}");
            ExitCode::FAILURE
        }
    }
}
