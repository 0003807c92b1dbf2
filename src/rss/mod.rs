//! RSS aggregation for gator.
//!
//! This module provides feed fetching, the feed/post store and the poll
//! scheduler that ties them together.

pub mod fetcher;
pub mod ingest;
pub mod interval;
pub mod repository;
pub mod scheduler;
pub mod types;

pub use fetcher::{parse_feed, validate_url, FeedSource, FetchError, FetchStage, RssFetcher};
pub use ingest::ingest;
pub use interval::parse_interval;
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{CycleOutcome, PollState, Scheduler};
pub use types::{
    Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, ParsedFeed, ParsedItem, Post, PostWithFeed,
    MAX_DESCRIPTION_LENGTH,
};
