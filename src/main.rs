//! typeload CLI entry point

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use typeload::cli::{Cli, Commands};
use typeload::config::ConfigManager;
use typeload::error::TypeLoadResult;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> TypeLoadResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load().await?;

    init_logging(cli.verbose, &config.general.log_format);

    match cli.command {
        Commands::Load(args) => typeload::cli::commands::load(args, &config).await,
        Commands::Analyze(args) => typeload::cli::commands::analyze(args, &config).await,
        Commands::Cache(args) => typeload::cli::commands::cache(args, &config).await,
        Commands::Config(args) => typeload::cli::commands::config(args, &config, &manager).await,
    }
}

/// Logs go to stderr so `--format json` output stays parseable
fn init_logging(verbose: u8, log_format: &str) {
    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("typeload=warn"),
        1 => EnvFilter::new("typeload=info"),
        _ => EnvFilter::new("typeload=debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
