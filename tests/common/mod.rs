//! Test helpers for integration tests.
//!
//! Provides a local feed server and database setup helpers.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use gator::config::FetcherConfig;
use gator::db::{NewUser, UserRepository};
use gator::rss::{FeedRepository, NewFeed};
use gator::{Database, Feed};

/// RSS document served at `/rss.xml`.
pub const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Boot &amp; Dev Blog</title>
    <link>https://blog.example.com/</link>
    <description>Posts about &lt;code&gt;</description>
    <item>
      <title>Learning Rust &amp;amp; Go</title>
      <link>https://blog.example.com/posts/rust</link>
      <description>A comparison</description>
      <pubDate>Mon, 02 Jan 2006 15:04:05 GMT</pubDate>
    </item>
    <item>
      <title>Undated post</title>
      <link>https://blog.example.com/posts/undated</link>
      <pubDate>sometime last week</pubDate>
    </item>
    <item>
      <title>No link here</title>
    </item>
  </channel>
</rss>
"#;

/// Request counters per route.
#[derive(Debug, Default)]
pub struct Hits {
    pub rss: AtomicUsize,
    pub error: AtomicUsize,
    pub broken: AtomicUsize,
}

/// Local HTTP server serving feeds for tests.
pub struct FeedServer {
    addr: SocketAddr,
    hits: Arc<Hits>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FeedServer {
    /// Start a server on a random local port.
    pub async fn start() -> Self {
        let hits = Arc::new(Hits::default());
        let app = Router::new()
            .route("/rss.xml", get(rss))
            .route("/error", get(server_error))
            .route("/broken.xml", get(broken))
            .with_state(Arc::clone(&hits));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            hits,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Full URL of a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request counters.
    pub fn hits(&self) -> &Hits {
        &self.hits
    }
}

impl Drop for FeedServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn rss(State(hits): State<Arc<Hits>>) -> impl IntoResponse {
    hits.rss.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "application/rss+xml")], SAMPLE_RSS)
}

async fn server_error(State(hits): State<Arc<Hits>>) -> impl IntoResponse {
    hits.error.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn broken(State(hits): State<Arc<Hits>>) -> impl IntoResponse {
    hits.broken.fetch_add(1, Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "application/rss+xml")],
        "<html><body>not a feed</body></html>",
    )
}

/// Fetcher settings with short timeouts for tests.
pub fn test_fetcher_config() -> FetcherConfig {
    FetcherConfig {
        connect_timeout_secs: 2,
        read_timeout_secs: 2,
        total_timeout_secs: 5,
        ..FetcherConfig::default()
    }
}

/// Open a file-backed database in a temporary directory.
pub async fn open_temp_db() -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("gator.db")).await.unwrap();
    (db, dir)
}

/// Create a user and return its ID.
pub async fn create_user(db: &Database, name: &str) -> i64 {
    UserRepository::new(db.pool())
        .create(&NewUser::new(name))
        .await
        .unwrap()
        .id
}

/// Register a feed owned by `user_id`.
pub async fn create_feed(db: &Database, user_id: i64, name: &str, url: &str) -> Feed {
    FeedRepository::new(db.pool())
        .create(&NewFeed::new(name, url, user_id))
        .await
        .unwrap()
}
