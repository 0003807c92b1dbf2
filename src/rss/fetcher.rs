//! Feed fetcher.
//!
//! Fetches a feed over HTTP and parses it into a [`ParsedFeed`]. Every
//! failure is reported as a [`FetchError`] tagged with the stage it happened
//! in; nothing here retries.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use feed_rs::parser;
use reqwest::Client;
use thiserror::Error;

use crate::config::FetcherConfig;
use crate::rss::types::{ParsedFeed, ParsedItem};

/// Longest entity name considered when decoding (`&CounterClockwiseContourIntegral;`).
const MAX_ENTITY_LENGTH: usize = 32;

/// Pipeline stage in which a fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Building the request: malformed URL, unsupported scheme, client setup.
    Request,
    /// Transport failure, timeout or non-success HTTP status.
    Network,
    /// Reading the response body.
    Read,
    /// The body is not a feed document.
    Parse,
}

impl FetchStage {
    /// Stage name as shown in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStage::Request => "request",
            FetchStage::Network => "network",
            FetchStage::Read => "read",
            FetchStage::Parse => "parse",
        }
    }
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed feed fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} stage failed for {url}: {message}")]
pub struct FetchError {
    /// Stage that failed.
    pub stage: FetchStage,
    /// URL being fetched.
    pub url: String,
    /// Human-readable cause.
    pub message: String,
}

impl FetchError {
    /// Create a new fetch error.
    pub fn new(stage: FetchStage, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Anything that can turn a feed URL into a parsed feed.
///
/// The poll scheduler is generic over this so tests can swap the network out.
pub trait FeedSource {
    /// Fetch and parse the feed at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<ParsedFeed, FetchError>> + Send;
}

/// HTTP feed fetcher.
#[derive(Debug, Clone)]
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
}

impl RssFetcher {
    /// Create a new fetcher from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                FetchError::new(
                    FetchStage::Request,
                    "",
                    format!("failed to create HTTP client: {e}"),
                )
            })?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch and parse a feed from the given URL.
    ///
    /// Dropping the returned future aborts the request.
    pub async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::new(FetchStage::Network, url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::new(
                FetchStage::Network,
                url,
                format!("HTTP status {}", response.status()),
            ));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FetchError::new(
                    FetchStage::Read,
                    url,
                    format!(
                        "feed too large: {} bytes (max {} bytes)",
                        content_length, self.max_feed_size
                    ),
                ));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::new(FetchStage::Read, url, e.to_string()))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(FetchError::new(
                FetchStage::Read,
                url,
                format!(
                    "feed too large: {} bytes (max {} bytes)",
                    bytes.len(),
                    self.max_feed_size
                ),
            ));
        }

        parse_feed(&bytes).map_err(|message| FetchError::new(FetchStage::Parse, url, message))
    }
}

impl FeedSource for RssFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        RssFetcher::fetch(self, url).await
    }
}

/// Check that a URL is well-formed and uses http or https.
pub fn validate_url(url: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| FetchError::new(FetchStage::Request, url, format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FetchError::new(
                FetchStage::Request,
                url,
                format!("unsupported URL scheme: {scheme}"),
            ));
        }
    }

    if parsed.host().is_none() {
        return Err(FetchError::new(FetchStage::Request, url, "URL has no host"));
    }

    Ok(())
}

/// Parse feed bytes into a ParsedFeed.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, String> {
    let feed = parser::parse(bytes).map_err(|e| format!("failed to parse feed: {e}"))?;

    let title = feed
        .title
        .map(|t| unescape_html(&t.content))
        .unwrap_or_else(|| "Untitled Feed".to_string());
    let description = feed.description.map(|d| unescape_html(&d.content));
    let link = feed.links.first().map(|l| l.href.clone());

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let item_title = entry
                .title
                .map(|t| unescape_html(&t.content))
                .unwrap_or_else(|| "Untitled".to_string());
            let item_link = entry.links.first().map(|l| l.href.clone());
            let item_description = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .map(|d| unescape_html(&d));

            ParsedItem {
                title: item_title,
                link: item_link,
                description: item_description,
                published_at: entry.published.or(entry.updated),
            }
        })
        .collect();

    Ok(ParsedFeed {
        title,
        link,
        description,
        items,
    })
}

/// Decode HTML character entities (named and numeric) in text.
///
/// Runs a single pass, so `&amp;lt;` becomes `&lt;`. Unknown or
/// unterminated entities are left as they are.
pub fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(end) = after.find(';') {
            if end > 0 && end <= MAX_ENTITY_LENGTH {
                if let Some(decoded) = decode_entity(&after[..end]) {
                    result.push(decoded);
                    rest = &after[end + 1..];
                    continue;
                }
            }
        }

        result.push('&');
        rest = after;
    }

    result.push_str(rest);
    result
}

/// Decode a single entity name (without `&` and `;`).
fn decode_entity(entity: &str) -> Option<char> {
    let decoded = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "middot" => '·',
        "bull" => '•',
        "euro" => '€',
        _ if entity.starts_with('#') => {
            return parse_numeric_entity(entity).and_then(char::from_u32);
        }
        _ => return None,
    };
    Some(decoded)
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if entity.starts_with("#x") || entity.starts_with("#X") {
        u32::from_str_radix(&entity[2..], 16).ok()
    } else if let Some(digits) = entity.strip_prefix('#') {
        digits.parse().ok()
    } else {
        None
    }
}
