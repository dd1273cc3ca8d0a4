use std::process::ExitCode;

use clap::Parser;
use playground_cli::Cli;
use playground_cli::console::Console;
use playground_cli::logging::{LogConfig, Verbosity, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let verbosity = Verbosity::from_flags(cli.global.verbose, log_level.as_deref());
    let log_config = LogConfig::for_terminal(verbosity, cli.global.no_color);
    init_tracing(&log_config);
    let console = Console::new(&log_config);

    match playground_cli::run(cli, &console).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console.error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
