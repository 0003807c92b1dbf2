//! Feed, post and follow types for gator.

use chrono::{DateTime, Utc};

/// Maximum length for a post description, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 10000;

/// A registered feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Display name chosen by the user who added it.
    pub name: String,
    /// Feed URL (unique).
    pub url: String,
    /// User ID who added the feed.
    pub user_id: i64,
    /// Last successful fetch; `None` if never fetched.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Last time the feed was claimed for polling.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Start of the current in-flight claim, if any.
    pub claimed_at: Option<DateTime<Utc>>,
    /// Number of consecutive fetch errors.
    pub error_count: i32,
    /// Last error message.
    pub last_error: Option<String>,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// User ID who creates the feed.
    pub user_id: i64,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// A feed together with the name of the user who added it.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Owner's user name.
    pub owner_name: String,
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Feed ID this post belongs to.
    pub feed_id: i64,
    /// Post title.
    pub title: String,
    /// Link to the original article (natural key within a feed).
    pub url: String,
    /// Post description.
    pub description: Option<String>,
    /// When the item was published, if the source said so.
    pub published_at: Option<DateTime<Utc>>,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Feed ID.
    pub feed_id: i64,
    /// Post title.
    pub title: String,
    /// Link to the original article.
    pub url: String,
    /// Post description.
    pub description: Option<String>,
    /// When the item was published.
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Create a new post.
    pub fn new(feed_id: i64, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            feed_id,
            title: title.into(),
            url: url.into(),
            description: None,
            published_at: None,
        }
    }

    /// Set the description, truncated to [`MAX_DESCRIPTION_LENGTH`] characters.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let desc = description.into();
        if desc.chars().count() > MAX_DESCRIPTION_LENGTH {
            self.description = Some(desc.chars().take(MAX_DESCRIPTION_LENGTH).collect());
        } else {
            self.description = Some(desc);
        }
        self
    }

    /// Set the published date.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// A post as shown when browsing, with the name of its feed.
#[derive(Debug, Clone)]
pub struct PostWithFeed {
    /// The post.
    pub post: Post,
    /// Name of the feed the post came from.
    pub feed_name: String,
}

/// A user's subscription to a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: i64,
    /// Following user.
    pub user_id: i64,
    /// Followed feed.
    pub feed_id: i64,
    /// Followed feed's name.
    pub feed_name: String,
    /// Following user's name.
    pub user_name: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
}

/// Parsed feed data from an external source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    /// Channel title.
    pub title: String,
    /// Channel link.
    pub link: Option<String>,
    /// Channel description.
    pub description: Option<String>,
    /// Parsed items, in document order.
    pub items: Vec<ParsedItem>,
}

/// Parsed item data from an external source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    /// Item title.
    pub title: String,
    /// Link to the original article.
    pub link: Option<String>,
    /// Item description.
    pub description: Option<String>,
    /// Publication date; `None` when absent or unparseable.
    pub published_at: Option<DateTime<Utc>>,
}
