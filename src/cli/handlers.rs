//! Command handlers.
//!
//! Each handler prints its result to stdout; diagnostics go through tracing.

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{info, warn};

use super::AppState;
use crate::datetime::format_utc_datetime_default;
use crate::db::{NewUser, User, UserRepository};
use crate::rss::{
    parse_interval, validate_url, FeedFollowRepository, FeedRepository, NewFeed, PostRepository,
    RssFetcher, Scheduler,
};
use crate::{GatorError, Result};

/// Number of posts shown by `browse` without an explicit limit.
pub const DEFAULT_BROWSE_LIMIT: usize = 2;

/// Check that exactly `count` arguments were given.
fn expect_args(args: &[String], count: usize, usage: &str) -> Result<()> {
    if args.len() != count {
        return Err(GatorError::Validation(format!("usage: {usage}")));
    }
    Ok(())
}

pub fn register<'a>(state: &'a mut AppState, args: &'a [String]) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 1, "register <name>")?;

        let user = UserRepository::new(state.db.pool())
            .create(&NewUser::new(args[0].as_str()))
            .await?;
        state.config.set_user(&user.name, &state.config_path)?;

        info!("Registered user {} (id {})", user.name, user.id);
        println!("User {} created", user.name);
        Ok(())
    })
}

pub fn login<'a>(state: &'a mut AppState, args: &'a [String]) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 1, "login <name>")?;
        let name = args[0].as_str();

        let user = UserRepository::new(state.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {name}")))?;
        state.config.set_user(&user.name, &state.config_path)?;

        println!("Logged in as {}", user.name);
        Ok(())
    })
}

pub fn reset<'a>(state: &'a mut AppState, args: &'a [String]) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 0, "reset")?;

        let deleted = UserRepository::new(state.db.pool()).delete_all().await?;
        warn!("Deleted {} user(s) and all their feeds and posts", deleted);
        println!("Database reset ({deleted} user(s) removed)");
        Ok(())
    })
}

pub fn users<'a>(state: &'a mut AppState, args: &'a [String]) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 0, "users")?;

        let current = state.config.current_user_name.as_deref();
        for user in UserRepository::new(state.db.pool()).list().await? {
            if Some(user.name.as_str()) == current {
                println!("* {} (current)", user.name);
            } else {
                println!("* {}", user.name);
            }
        }
        Ok(())
    })
}

pub fn agg<'a>(state: &'a mut AppState, args: &'a [String]) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 1, "agg <interval>  (e.g. 30s, 1m, 1h30m)")?;
        let interval = parse_interval(&args[0])?;

        let fetcher = RssFetcher::new(&state.config.fetcher)?;
        let mut scheduler = Scheduler::new(
            state.db.pool().clone(),
            fetcher,
            interval,
            &state.config.aggregator,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Interrupt received, stopping"),
                Err(e) => warn!("Failed to listen for interrupt: {}", e),
            }
            let _ = shutdown_tx.send(true);
        });

        scheduler.run(shutdown_rx).await;
        Ok(())
    })
}

pub fn feeds<'a>(state: &'a mut AppState, args: &'a [String]) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 0, "feeds")?;

        for entry in FeedRepository::new(state.db.pool()).list_with_owner().await? {
            let feed = &entry.feed;
            println!("* {}", feed.name);
            println!("  URL:   {}", feed.url);
            println!("  Owner: {}", entry.owner_name);
            if let Some(error) = &feed.last_error {
                println!("  Last error: {} ({} in a row)", error, feed.error_count);
            }
        }
        Ok(())
    })
}

pub fn add_feed<'a>(
    state: &'a mut AppState,
    args: &'a [String],
    user: User,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 2, "addfeed <name> <url>")?;
        let (name, url) = (args[0].as_str(), args[1].as_str());
        validate_url(url).map_err(|e| GatorError::Validation(e.to_string()))?;

        let feed = FeedRepository::new(state.db.pool())
            .create(&NewFeed::new(name, url, user.id))
            .await?;
        FeedFollowRepository::new(state.db.pool())
            .create(user.id, feed.id)
            .await?;

        info!("User {} added feed {} ({})", user.name, feed.id, feed.url);
        println!("Feed added: {}", feed.name);
        println!("  ID:  {}", feed.id);
        println!("  URL: {}", feed.url);
        Ok(())
    })
}

pub fn follow<'a>(
    state: &'a mut AppState,
    args: &'a [String],
    user: User,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 1, "follow <url>")?;
        let url = args[0].as_str();

        let feed = FeedRepository::new(state.db.pool())
            .get_by_url(url)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {url}")))?;
        let follow = FeedFollowRepository::new(state.db.pool())
            .create(user.id, feed.id)
            .await?;

        println!("{} now follows {}", follow.user_name, follow.feed_name);
        Ok(())
    })
}

pub fn following<'a>(
    state: &'a mut AppState,
    args: &'a [String],
    user: User,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 0, "following")?;

        for follow in FeedFollowRepository::new(state.db.pool())
            .list_for_user(user.id)
            .await?
        {
            println!("* {}", follow.feed_name);
        }
        Ok(())
    })
}

pub fn unfollow<'a>(
    state: &'a mut AppState,
    args: &'a [String],
    user: User,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        expect_args(args, 1, "unfollow <url>")?;
        let url = args[0].as_str();

        let feed = FeedRepository::new(state.db.pool())
            .get_by_url(url)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {url}")))?;
        let removed = FeedFollowRepository::new(state.db.pool())
            .delete(user.id, feed.id)
            .await?;
        if !removed {
            return Err(GatorError::NotFound(format!("follow of {url}")));
        }

        println!("{} unfollowed {}", user.name, feed.name);
        Ok(())
    })
}

pub fn browse<'a>(
    state: &'a mut AppState,
    args: &'a [String],
    user: User,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let limit = match args {
            [] => DEFAULT_BROWSE_LIMIT,
            [limit] => limit
                .parse::<usize>()
                .map_err(|_| GatorError::Validation(format!("invalid limit: {limit}")))?,
            _ => return Err(GatorError::Validation("usage: browse [limit]".to_string())),
        };

        let timezone = state.config.display.timezone.as_str();
        let posts = PostRepository::new(state.db.pool())
            .list_for_user(user.id, limit)
            .await?;
        if posts.is_empty() {
            println!("No posts yet. Follow a feed and run `agg` to collect some.");
        }

        for entry in posts {
            let post = &entry.post;
            let date = post
                .published_at
                .as_ref()
                .map(|dt| format_utc_datetime_default(dt, timezone))
                .unwrap_or_else(|| "unknown date".to_string());
            println!("{} from {}", date, entry.feed_name);
            println!("--- {} ---", post.title);
            if let Some(description) = &post.description {
                println!("    {description}");
            }
            println!("Link: {}", post.url);
            println!("=====================================");
        }
        Ok(())
    })
}
