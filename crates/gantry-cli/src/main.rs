//! Gantry CLI entrypoint.

use clap::Parser;
use std::process::ExitCode;

mod commands;
mod handlers;

use commands::Commands;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(author, version, about = "Gantry pipeline orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => handlers::run(args).await,
        Commands::Validate { path } => handlers::validate(path.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}
