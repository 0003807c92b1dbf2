//! Command-line interface for gator.
//!
//! Arguments are parsed with clap, then the command name is looked up in a
//! registry of handlers (see [`commands`]).

pub mod commands;
mod handlers;

use std::path::PathBuf;

use clap::Parser;

pub use commands::{Command, Commands, Handler, UserHandler};

use crate::config::Config;
use crate::db::{Database, User, UserRepository};
use crate::{GatorError, Result};

/// gator command line.
#[derive(Debug, Parser)]
#[command(name = "gator")]
#[command(about = "A command-line RSS aggregator")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (defaults to ~/.gatorconfig.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command name (register, login, reset, users, agg, addfeed, feeds,
    /// follow, following, unfollow, browse)
    pub command: String,

    /// Command arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Resolve the configuration file path.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::default_path(),
        }
    }
}

/// State shared by every command handler.
pub struct AppState {
    /// Open database.
    pub db: Database,
    /// Loaded configuration.
    pub config: Config,
    /// Where the configuration is saved back to.
    pub config_path: PathBuf,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, config: Config, config_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            config,
            config_path: config_path.into(),
        }
    }

    /// Look up the user named in the configuration.
    ///
    /// Fails with a validation error if nobody is logged in, and with
    /// not-found if the configured user no longer exists.
    pub async fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user_name
            .as_deref()
            .ok_or_else(|| GatorError::Validation("not logged in; run `login <name>`".into()))?;

        UserRepository::new(self.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {name}")))
    }
}

/// Dispatch a parsed command line.
pub async fn run(state: &mut AppState, command: &str, args: &[String]) -> Result<()> {
    Commands::new().run(state, command, args).await
}
