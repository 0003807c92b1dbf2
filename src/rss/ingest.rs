//! Post ingestion: stores fetched items as posts.

use tracing::{debug, warn};

use super::repository::PostRepository;
use super::types::{NewPost, ParsedItem};
use crate::db::DbPool;

/// Store the items of a fetched feed as posts of `feed_id`.
///
/// Items are keyed by their link; items without one are skipped, and items
/// already stored for this feed are ignored. A failing insert is logged and
/// the rest of the batch continues. At most `max_items` items are considered.
///
/// Returns the number of newly inserted posts.
pub async fn ingest(pool: &DbPool, feed_id: i64, items: &[ParsedItem], max_items: usize) -> usize {
    let repo = PostRepository::new(pool);
    let mut new_count = 0;

    for item in items.iter().take(max_items) {
        let Some(link) = item.link.as_deref().filter(|l| !l.trim().is_empty()) else {
            debug!("Skipping item without link in feed {}: {}", feed_id, item.title);
            continue;
        };

        let mut post = NewPost::new(feed_id, &item.title, link.trim());
        if let Some(desc) = &item.description {
            post = post.with_description(desc.as_str());
        }
        if let Some(published_at) = item.published_at {
            post = post.with_published_at(published_at);
        }

        match repo.create_or_ignore(&post).await {
            Ok(Some(_)) => new_count += 1,
            Ok(None) => {}
            Err(e) => warn!("Failed to store item {} for feed {}: {}", link, feed_id, e),
        }
    }

    new_count
}
