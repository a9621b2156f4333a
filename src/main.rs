//! voxrelay binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use voxrelay::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voxrelay=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Serve(args) => voxrelay::cli::serve::handle_serve(&cli, args).await,
        Commands::Config(args) => voxrelay::cli::serve::handle_config(&cli, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
