use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

use gator::{cli, AppState, Cli, Config, Database};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = match cli.config_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Failed to locate configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Load configuration
    let config = match Config::load_or_default(&config_path).and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }

    debug!("Using configuration at {}", config_path.display());

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut state = AppState::new(db, config, config_path);
    match cli::run(&mut state, &cli.command, &cli.args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} failed: {e}", cli.command);
            ExitCode::FAILURE
        }
    }
}
