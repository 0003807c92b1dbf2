//! Feed, post and follow repositories for gator.

use chrono::{DateTime, Duration, Utc};

use super::types::{Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, Post, PostWithFeed};
use crate::datetime::{now_db_string, parse_datetime, to_db_string};
use crate::db::{map_unique_violation, DbPool};
use crate::{GatorError, Result};

/// Columns selected for every feed query.
const FEED_COLUMNS: &str = "id, name, url, user_id, last_fetched_at, last_checked_at, claimed_at, \
                            error_count, last_error, created_at, updated_at";

/// Row type for feeds from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    name: String,
    url: String,
    user_id: i64,
    last_fetched_at: Option<String>,
    last_checked_at: Option<String>,
    claimed_at: Option<String>,
    error_count: i32,
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_datetime(&s)),
            last_checked_at: row.last_checked_at.and_then(|s| parse_datetime(&s)),
            claimed_at: row.claimed_at.and_then(|s| parse_datetime(&s)),
            error_count: row.error_count,
            last_error: row.last_error,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for a feed joined with its owner's name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedWithOwnerRow {
    #[sqlx(flatten)]
    feed: FeedRow,
    owner_name: String,
}

impl From<FeedWithOwnerRow> for FeedWithOwner {
    fn from(row: FeedWithOwnerRow) -> Self {
        FeedWithOwner {
            feed: Feed::from(row.feed),
            owner_name: row.owner_name,
        }
    }
}

/// Row type for posts from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: i64,
    feed_id: i64,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
    created_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at.and_then(|s| parse_datetime(&s)),
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for a post joined with its feed's name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostWithFeedRow {
    #[sqlx(flatten)]
    post: PostRow,
    feed_name: String,
}

impl From<PostWithFeedRow> for PostWithFeed {
    fn from(row: PostWithFeedRow) -> Self {
        PostWithFeed {
            post: Post::from(row.post),
            feed_name: row.feed_name,
        }
    }
}

/// Row type for feed follows joined with user and feed names.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedFollowRow {
    id: i64,
    user_id: i64,
    feed_id: i64,
    feed_name: String,
    user_name: String,
    created_at: String,
}

impl From<FeedFollowRow> for FeedFollow {
    fn from(row: FeedFollowRow) -> Self {
        FeedFollow {
            id: row.id,
            user_id: row.user_id,
            feed_id: row.feed_id,
            feed_name: row.feed_name,
            user_name: row.user_name,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new feed.
    ///
    /// Returns a validation error if a feed with the same URL exists.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let now = now_db_string();
        let query = format!(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FEED_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(&feed.name)
            .bind(&feed.url)
            .bind(feed.user_id)
            .bind(&now)
            .bind(&now)
            .fetch_one(self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "a feed with this URL already exists"))?;

        Ok(Feed::from(row))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = $1");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(Feed::from))
    }

    /// List all feeds with their owners' names (ordered by registration order).
    pub async fn list_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let rows = sqlx::query_as::<_, FeedWithOwnerRow>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.last_fetched_at, f.last_checked_at,
                   f.claimed_at, f.error_count, f.last_error,
                   f.created_at, f.updated_at,
                   u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(FeedWithOwner::from).collect())
    }

    /// Atomically claim the next feed to poll.
    ///
    /// Picks the least recently claimed feed (never claimed first, then the
    /// oldest `last_fetched_at`) among feeds that are not already claimed, or
    /// whose claim is older than `lease`. Every claim moves `last_checked_at`
    /// forward, so a feed that keeps failing goes to the back of the queue
    /// like any other. The selection and the claim happen in one statement,
    /// so concurrent callers never receive the same feed.
    ///
    /// Returns [`GatorError::NotFound`] if no feed is eligible.
    pub async fn claim_next_feed(&self, now: DateTime<Utc>, lease: Duration) -> Result<Feed> {
        let now_str = to_db_string(&now);
        let lease_cutoff = to_db_string(&(now - lease));

        let query = format!(
            r#"
            UPDATE feeds
            SET claimed_at = $1,
                last_checked_at = $2,
                updated_at = $3
            WHERE id = (
                SELECT id FROM feeds
                WHERE claimed_at IS NULL OR claimed_at < $4
                ORDER BY last_checked_at ASC NULLS FIRST,
                         last_fetched_at ASC NULLS FIRST,
                         id ASC
                LIMIT 1
            )
              AND (claimed_at IS NULL OR claimed_at < $5)
            RETURNING {FEED_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(&now_str)
            .bind(&now_str)
            .bind(&now_str)
            .bind(&lease_cutoff)
            .bind(&lease_cutoff)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        row.map(Feed::from)
            .ok_or_else(|| GatorError::NotFound("feed to fetch".to_string()))
    }

    /// Record a successful fetch.
    ///
    /// `last_fetched_at` only ever moves forward; the claim and error state
    /// are cleared. Calling this twice with the same timestamp is a no-op the
    /// second time.
    pub async fn record_fetch_success(&self, id: i64, fetched_at: DateTime<Utc>) -> Result<bool> {
        let fetched_at = to_db_string(&fetched_at);
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = CASE
                    WHEN last_fetched_at IS NULL OR last_fetched_at < $1 THEN $2
                    ELSE last_fetched_at
                END,
                claimed_at = NULL,
                error_count = 0,
                last_error = NULL,
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(&fetched_at)
        .bind(&fetched_at)
        .bind(now_db_string())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a failed fetch.
    ///
    /// Releases the claim, increments the error count and stores the message.
    /// `last_fetched_at` is untouched; the feed is retried on a later cycle.
    pub async fn record_fetch_failure(&self, id: i64, error: &str) -> Result<Option<Feed>> {
        let query = format!(
            r#"
            UPDATE feeds
            SET claimed_at = NULL,
                error_count = error_count + 1,
                last_error = $1,
                updated_at = $2
            WHERE id = $3
            RETURNING {FEED_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(error)
            .bind(now_db_string())
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(Feed::from))
    }

    /// Release a claim without recording a fetch.
    ///
    /// Used when a poll is abandoned; the feed becomes eligible on the next
    /// cycle with its fetch state unchanged.
    pub async fn release_claim(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE feeds SET claimed_at = NULL, updated_at = $1 WHERE id = $2 AND claimed_at IS NOT NULL",
        )
        .bind(now_db_string())
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(count.0)
    }
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new post, ignoring it if the (feed_id, url) pair exists.
    ///
    /// Returns the new post ID, or `None` if it already existed.
    pub async fn create_or_ignore(&self, post: &NewPost) -> Result<Option<i64>> {
        let now = now_db_string();
        let published_at = post.published_at.as_ref().map(to_db_string);

        let result: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (feed_id, url) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(&published_at)
        .bind(&now)
        .bind(&now)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(result.map(|(id,)| id))
    }

    /// List posts of a feed (newest first).
    pub async fn list_by_feed(&self, feed_id: i64, limit: usize) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at
            FROM posts
            WHERE feed_id = $1
            ORDER BY published_at DESC NULLS LAST, id DESC
            LIMIT $2
            "#,
        )
        .bind(feed_id)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// List the newest posts from the feeds a user follows.
    pub async fn list_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<PostWithFeed>> {
        let rows = sqlx::query_as::<_, PostWithFeedRow>(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at, p.created_at,
                   f.name AS feed_name
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            JOIN feeds f ON f.id = p.feed_id
            WHERE ff.user_id = $1
            ORDER BY p.published_at DESC NULLS LAST, p.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(PostWithFeed::from).collect())
    }

    /// Count posts of a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(count.0)
    }
}

/// Repository for feed follow operations.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Follow a feed.
    ///
    /// Returns a validation error if the user already follows it.
    pub async fn create(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let now = now_db_string();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "already following this feed"))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".to_string()))
    }

    /// Get a follow by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FeedFollow>> {
        let row = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, f.name AS feed_name, u.name AS user_name,
                   ff.created_at
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            JOIN users u ON u.id = ff.user_id
            WHERE ff.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(FeedFollow::from))
    }

    /// List the follows of a user (ordered by feed name).
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>> {
        let rows = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, f.name AS feed_name, u.name AS user_name,
                   ff.created_at
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            JOIN users u ON u.id = ff.user_id
            WHERE ff.user_id = $1
            ORDER BY f.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(FeedFollow::from).collect())
    }

    /// Unfollow a feed.
    pub async fn delete(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id)
            .bind(feed_id)
            .execute(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn create_test_user(db: &Database, name: &str) -> i64 {
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new(name)).await.unwrap().id
    }

    async fn create_test_feed(db: &Database, user_id: i64, n: usize) -> Feed {
        let repo = FeedRepository::new(db.pool());
        let new_feed = NewFeed::new(
            format!("Feed {n}"),
            format!("https://example{n}.com/feed.xml"),
            user_id,
        );
        repo.create(&new_feed).await.unwrap()
    }

    fn lease() -> Duration {
        Duration::seconds(300)
    }

    #[tokio::test]
    async fn test_create_feed() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;

        assert!(feed.id > 0);
        assert_eq!(feed.name, "Feed 1");
        assert_eq!(feed.user_id, user_id);
        assert!(feed.last_fetched_at.is_none());
        assert_eq!(feed.error_count, 0);
    }

    #[tokio::test]
    async fn test_create_feed_duplicate_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        create_test_feed(&db, user_id, 1).await;

        let repo = FeedRepository::new(db.pool());
        let dup = NewFeed::new("Other name", "https://example1.com/feed.xml", user_id);
        let result = repo.create(&dup).await;
        assert!(matches!(result, Err(GatorError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_feed_by_url_and_id() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;
        let repo = FeedRepository::new(db.pool());

        assert_eq!(repo.get_by_id(feed.id).await.unwrap(), Some(feed.clone()));
        assert_eq!(repo.get_by_url(&feed.url).await.unwrap(), Some(feed));
        assert!(repo.get_by_url("https://nope.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_with_owner() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let bob = create_test_user(&db, "bob").await;
        create_test_feed(&db, alice, 1).await;
        create_test_feed(&db, bob, 2).await;

        let repo = FeedRepository::new(db.pool());
        let feeds = repo.list_with_owner().await.unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].owner_name, "alice");
        assert_eq!(feeds[1].owner_name, "bob");
    }

    #[tokio::test]
    async fn test_claim_with_no_feeds() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());

        let result = repo.claim_next_feed(Utc::now(), lease()).await;
        assert!(matches!(result, Err(GatorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_claim_prefers_never_fetched() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let first = create_test_feed(&db, user_id, 1).await;
        let second = create_test_feed(&db, user_id, 2).await;
        let repo = FeedRepository::new(db.pool());

        repo.record_fetch_success(first.id, Utc::now()).await.unwrap();

        let claimed = repo.claim_next_feed(Utc::now(), lease()).await.unwrap();
        assert_eq!(claimed.id, second.id);
        assert!(claimed.claimed_at.is_some());
        assert!(claimed.last_checked_at.is_some());
    }

    #[tokio::test]
    async fn test_claim_picks_oldest_fetch() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let first = create_test_feed(&db, user_id, 1).await;
        let second = create_test_feed(&db, user_id, 2).await;
        let repo = FeedRepository::new(db.pool());

        let now = Utc::now();
        repo.record_fetch_success(first.id, now).await.unwrap();
        repo.record_fetch_success(second.id, now - Duration::minutes(10))
            .await
            .unwrap();

        let claimed = repo.claim_next_feed(now, lease()).await.unwrap();
        assert_eq!(claimed.id, second.id);
    }

    #[tokio::test]
    async fn test_claimed_feed_is_not_claimed_again_within_lease() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;
        let repo = FeedRepository::new(db.pool());

        let now = Utc::now();
        assert_eq!(repo.claim_next_feed(now, lease()).await.unwrap().id, feed.id);
        assert!(matches!(
            repo.claim_next_feed(now, lease()).await,
            Err(GatorError::NotFound(_))
        ));

        // After a successful fetch the feed becomes eligible again.
        repo.record_fetch_success(feed.id, now).await.unwrap();
        assert_eq!(repo.claim_next_feed(now, lease()).await.unwrap().id, feed.id);
    }

    #[tokio::test]
    async fn test_expired_claim_is_reclaimable() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;
        let repo = FeedRepository::new(db.pool());

        let start = Utc::now();
        repo.claim_next_feed(start, lease()).await.unwrap();

        let later = start + lease() + Duration::seconds(1);
        let reclaimed = repo.claim_next_feed(later, lease()).await.unwrap();
        assert_eq!(reclaimed.id, feed.id);
        assert!(reclaimed.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_record_fetch_success_is_idempotent_and_monotonic() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;
        let repo = FeedRepository::new(db.pool());

        let at = Utc::now();
        assert!(repo.record_fetch_success(feed.id, at).await.unwrap());
        let once = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert!(repo.record_fetch_success(feed.id, at).await.unwrap());
        let twice = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert_eq!(once.last_fetched_at, twice.last_fetched_at);

        // An older timestamp never moves the cursor backwards.
        repo.record_fetch_success(feed.id, at - Duration::hours(1))
            .await
            .unwrap();
        let after = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert_eq!(after.last_fetched_at, once.last_fetched_at);
    }

    #[tokio::test]
    async fn test_record_fetch_failure() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;
        let repo = FeedRepository::new(db.pool());

        repo.claim_next_feed(Utc::now(), lease()).await.unwrap();
        let failed = repo
            .record_fetch_failure(feed.id, "HTTP status 500")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.error_count, 1);
        assert_eq!(failed.last_error.as_deref(), Some("HTTP status 500"));
        assert!(failed.claimed_at.is_none());
        assert!(failed.last_fetched_at.is_none());

        // Success clears the error state.
        repo.record_fetch_success(feed.id, Utc::now()).await.unwrap();
        let cleared = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert_eq!(cleared.error_count, 0);
        assert!(cleared.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failing_feed_stays_claimable() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;
        let repo = FeedRepository::new(db.pool());

        let start = Utc::now();
        for tick in 0..10 {
            let now = start + Duration::seconds(tick);
            let claimed = repo.claim_next_feed(now, lease()).await.unwrap();
            assert_eq!(claimed.id, feed.id);
            repo.record_fetch_failure(feed.id, "boom").await.unwrap();
        }

        let after = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert_eq!(after.error_count, 10);
        assert!(after.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_claim_prefers_least_recently_checked() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let failing = create_test_feed(&db, user_id, 1).await;
        let healthy = create_test_feed(&db, user_id, 2).await;
        let repo = FeedRepository::new(db.pool());

        // The failing feed has the older fetch but was checked most recently.
        let start = Utc::now();
        repo.record_fetch_success(failing.id, start - Duration::hours(1))
            .await
            .unwrap();
        repo.record_fetch_success(healthy.id, start).await.unwrap();
        let first = repo.claim_next_feed(start, lease()).await.unwrap();
        assert_eq!(first.id, failing.id);
        repo.record_fetch_failure(failing.id, "boom").await.unwrap();

        let next = repo
            .claim_next_feed(start + Duration::seconds(1), lease())
            .await
            .unwrap();
        assert_eq!(next.id, healthy.id);
    }

    #[tokio::test]
    async fn test_release_claim() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;
        let repo = FeedRepository::new(db.pool());

        let now = Utc::now();
        repo.claim_next_feed(now, lease()).await.unwrap();
        assert!(repo.release_claim(feed.id).await.unwrap());
        assert!(!repo.release_claim(feed.id).await.unwrap());

        let reclaimed = repo.claim_next_feed(now, lease()).await.unwrap();
        assert_eq!(reclaimed.id, feed.id);
        assert!(reclaimed.last_fetched_at.is_none());
        assert_eq!(reclaimed.error_count, 0);
    }

    #[tokio::test]
    async fn test_create_post_or_ignore() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, user_id, 1).await;
        let repo = PostRepository::new(db.pool());

        let post = NewPost::new(feed.id, "Article", "https://example.com/a")
            .with_description("Summary");
        let id = repo.create_or_ignore(&post).await.unwrap().unwrap();
        assert!(repo.create_or_ignore(&post).await.unwrap().is_none());

        let stored = repo.list_by_feed(feed.id, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        let stored = &stored[0];
        assert_eq!(stored.id, id);
        assert_eq!(stored.title, "Article");
        assert_eq!(stored.description.as_deref(), Some("Summary"));
        assert!(stored.published_at.is_none());
        assert_eq!(repo.count_by_feed(feed.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_link_in_two_feeds() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "alice").await;
        let first = create_test_feed(&db, user_id, 1).await;
        let second = create_test_feed(&db, user_id, 2).await;
        let repo = PostRepository::new(db.pool());

        let link = "https://example.com/shared";
        assert!(repo
            .create_or_ignore(&NewPost::new(first.id, "Shared", link))
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .create_or_ignore(&NewPost::new(second.id, "Shared", link))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_list_posts_for_user() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let followed = create_test_feed(&db, alice, 1).await;
        let other = create_test_feed(&db, alice, 2).await;
        FeedFollowRepository::new(db.pool())
            .create(alice, followed.id)
            .await
            .unwrap();

        let repo = PostRepository::new(db.pool());
        let now = Utc::now();
        repo.create_or_ignore(
            &NewPost::new(followed.id, "Old", "https://example1.com/old")
                .with_published_at(now - Duration::days(2)),
        )
        .await
        .unwrap();
        repo.create_or_ignore(
            &NewPost::new(followed.id, "New", "https://example1.com/new").with_published_at(now),
        )
        .await
        .unwrap();
        repo.create_or_ignore(&NewPost::new(followed.id, "Undated", "https://example1.com/u"))
            .await
            .unwrap();
        repo.create_or_ignore(&NewPost::new(other.id, "Hidden", "https://example2.com/h"))
            .await
            .unwrap();

        let posts = repo.list_for_user(alice, 10).await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);
        assert_eq!(posts[0].feed_name, "Feed 1");

        let limited = repo.list_for_user(alice, 2).await.unwrap();
        assert_eq!(limited.len(), 2);

        let by_feed = repo.list_by_feed(followed.id, 10).await.unwrap();
        assert_eq!(by_feed.len(), 3);
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, alice, 1).await;
        let repo = FeedFollowRepository::new(db.pool());

        let follow = repo.create(alice, feed.id).await.unwrap();
        assert_eq!(follow.feed_name, "Feed 1");
        assert_eq!(follow.user_name, "alice");

        let dup = repo.create(alice, feed.id).await;
        assert!(matches!(dup, Err(GatorError::Validation(_))));

        assert_eq!(repo.list_for_user(alice).await.unwrap().len(), 1);
        assert!(repo.delete(alice, feed.id).await.unwrap());
        assert!(!repo.delete(alice, feed.id).await.unwrap());
        assert!(repo.list_for_user(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_users_cascades() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let feed = create_test_feed(&db, alice, 1).await;
        FeedFollowRepository::new(db.pool())
            .create(alice, feed.id)
            .await
            .unwrap();
        PostRepository::new(db.pool())
            .create_or_ignore(&NewPost::new(feed.id, "A", "https://example1.com/a"))
            .await
            .unwrap();

        UserRepository::new(db.pool()).delete_all().await.unwrap();

        let feeds = FeedRepository::new(db.pool());
        assert_eq!(feeds.count().await.unwrap(), 0);
        assert_eq!(
            PostRepository::new(db.pool())
                .count_by_feed(feed.id)
                .await
                .unwrap(),
            0
        );
    }
}
