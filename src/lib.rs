//! gator - a command-line RSS aggregator
//!
//! Users register feeds, follow them, and browse the newest posts collected
//! by a periodic poll scheduler. State lives in a local SQLite database.

pub mod cli;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod rss;

pub use cli::{AppState, Cli};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use rss::{
    CycleOutcome, Feed, FeedSource, FetchError, FetchStage, ParsedFeed, ParsedItem, RssFetcher,
    Scheduler,
};
