//! Poll scheduler for gator.
//!
//! Each cycle claims the feed that has waited longest, fetches it, stores
//! its items as posts and records the outcome. Cycles run on a fixed
//! interval until a shutdown signal arrives.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::fetcher::FeedSource;
use super::ingest::ingest;
use super::repository::FeedRepository;
use crate::config::{AggregatorConfig, MAX_CLAIM_LEASE_SECS};
use crate::db::DbPool;
use crate::GatorError;

/// Where the scheduler currently is within a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the next tick.
    Idle,
    /// Claiming the next feed.
    Claiming,
    /// Fetching the claimed feed.
    Fetching,
    /// Storing fetched items.
    Ingesting,
    /// Recording the fetch result.
    Recording,
}

/// Result of a single poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A feed was fetched and its items stored.
    Polled {
        feed_id: i64,
        title: String,
        items: usize,
        new_posts: usize,
    },
    /// No feed was eligible for polling.
    NoFeeds,
    /// The cycle ended early; the error has been logged.
    Failed {
        feed_id: Option<i64>,
        error: String,
    },
}

/// Periodic feed poller.
pub struct Scheduler<S> {
    pool: DbPool,
    source: S,
    interval: Duration,
    claim_lease: chrono::Duration,
    max_items_per_feed: usize,
    state: PollState,
    in_flight: Option<i64>,
}

impl<S: FeedSource> Scheduler<S> {
    /// Create a new scheduler polling every `interval`.
    pub fn new(pool: DbPool, source: S, interval: Duration, config: &AggregatorConfig) -> Self {
        let lease_secs = config.claim_lease_secs.min(MAX_CLAIM_LEASE_SECS) as i64;
        Self {
            pool,
            source,
            interval,
            claim_lease: chrono::Duration::seconds(lease_secs),
            max_items_per_feed: config.max_items_per_feed,
            state: PollState::Idle,
            in_flight: None,
        }
    }

    /// Current position within the poll cycle.
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run cycles until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// The first cycle starts immediately. A cycle in progress when the
    /// signal arrives is abandoned: its claim is released and the feed keeps
    /// its previous `last_fetched_at`.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Collecting feeds every {:?}", self.interval);

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            let interrupted = tokio::select! {
                outcome = self.poll_once() => {
                    debug!("Poll cycle finished: {:?}", outcome);
                    false
                }
                _ = shutdown.changed() => true,
            };

            if interrupted {
                info!("Shutdown requested during {:?}; abandoning cycle", self.state);
                self.abandon_cycle().await;
                break;
            }
        }

        info!("Feed collection stopped");
    }

    /// Run a single poll cycle.
    ///
    /// Never fails: errors are logged and reported in the outcome.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let outcome = self.poll_cycle().await;
        self.state = PollState::Idle;
        self.in_flight = None;
        outcome
    }

    /// Drop the claim of a cycle that will not finish.
    async fn abandon_cycle(&mut self) {
        self.state = PollState::Idle;
        let Some(feed_id) = self.in_flight.take() else {
            return;
        };
        match FeedRepository::new(&self.pool).release_claim(feed_id).await {
            Ok(_) => debug!("Released claim on feed {}", feed_id),
            Err(e) => warn!("Failed to release claim on feed {}: {}", feed_id, e),
        }
    }

    async fn poll_cycle(&mut self) -> CycleOutcome {
        let repo = FeedRepository::new(&self.pool);

        self.state = PollState::Claiming;
        let feed = match repo.claim_next_feed(Utc::now(), self.claim_lease).await {
            Ok(feed) => feed,
            Err(GatorError::NotFound(_)) => {
                info!("No feeds to fetch");
                return CycleOutcome::NoFeeds;
            }
            Err(e) => {
                error!("Failed to claim next feed: {}", e);
                return CycleOutcome::Failed {
                    feed_id: None,
                    error: e.to_string(),
                };
            }
        };

        self.in_flight = Some(feed.id);
        debug!("Fetching feed {}: {}", feed.id, feed.url);
        self.state = PollState::Fetching;
        let parsed = match self.source.fetch(&feed.url).await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to fetch feed {} ({}): {}", feed.id, feed.name, e);
                self.state = PollState::Recording;
                let message = e.to_string();
                if let Err(err) = repo.record_fetch_failure(feed.id, &message).await {
                    error!("Failed to record error for feed {}: {}", feed.id, err);
                }
                return CycleOutcome::Failed {
                    feed_id: Some(feed.id),
                    error: message,
                };
            }
        };

        self.state = PollState::Ingesting;
        let new_posts = ingest(
            &self.pool,
            feed.id,
            &parsed.items,
            self.max_items_per_feed,
        )
        .await;

        self.state = PollState::Recording;
        if let Err(e) = repo.record_fetch_success(feed.id, Utc::now()).await {
            error!("Failed to mark feed {} fetched: {}", feed.id, e);
            if let Err(err) = repo.release_claim(feed.id).await {
                warn!("Failed to release claim on feed {}: {}", feed.id, err);
            }
            return CycleOutcome::Failed {
                feed_id: Some(feed.id),
                error: e.to_string(),
            };
        }

        info!("Feed: {}", parsed.title);
        for item in &parsed.items {
            info!("  * {}", item.title);
        }
        info!(
            "Feed {} collected: {} item(s), {} new",
            feed.id,
            parsed.items.len(),
            new_posts
        );

        CycleOutcome::Polled {
            feed_id: feed.id,
            title: parsed.title,
            items: parsed.items.len(),
            new_posts,
        }
    }
}
