mod agent;
mod app;
mod apply;
mod cli;
mod commands;
mod config;
mod detect;
mod errors;
mod fixes;
mod host;
mod models;
mod output;

use clap::Parser;
use cli::{Cli, Commands, Verbosity};
use errors::MenderError;

#[tokio::main]
async fn main() -> Result<(), MenderError> {
    // Initialize logger
    env_logger::init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Convert verbosity flag
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::from(cli.verbose)
    };

    // Create the core components
    let config_provider = match cli.config {
        Some(path) => config::TomlConfigProvider::with_path(path),
        None => config::TomlConfigProvider::new(),
    };
    let output_formatter = output::PrettyFormatter::new();

    // Create the Mender app
    let app = app::MenderApp::new(config_provider, output_formatter).with_verbosity(verbosity);

    // Determine which command to run
    match cli.command {
        Commands::Analyze(args) => {
            app.analyze(args).await?;
        }
        Commands::Apply(args) => {
            app.apply(args).await?;
        }
        Commands::Push(args) => {
            app.push(args).await?;
        }
        Commands::Status(args) => {
            app.status(args)?;
        }
        Commands::Activity(args) => {
            app.activity(args)?;
        }
        Commands::Configure(args) => {
            app.configure(args)?;
        }
    }

    Ok(())
}
