//! App Store customer-review feed client.
//!
//! The feed is paginated and sorted newest first. Paging stops at the first
//! empty page or at the first entry older than the requested window; every
//! later entry is older still.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use super::http_client::HttpClient;
use super::{FetchError, ReviewSource};
use crate::models::Review;
use crate::repository::parse_datetime;

/// Default upper bound on pages walked in one fetch, for feeds that never
/// run dry.
pub const MAX_PAGES: u32 = 100;

/// Retry behaviour for a single page request.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts per page before the whole fetch is abandoned.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; grows linearly per attempt.
    pub base_delay: StdDuration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: StdDuration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> StdDuration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Why a single page attempt failed.
#[derive(Debug, thiserror::Error)]
enum PageError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed feed: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    feed: Feed,
}

#[derive(Debug, Default, Deserialize)]
struct Feed {
    #[serde(default, deserialize_with = "one_or_many")]
    entry: Vec<FeedEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct Label {
    #[serde(default)]
    label: String,
}

#[derive(Debug, Default, Deserialize)]
struct Author {
    #[serde(default)]
    name: Label,
}

#[derive(Debug, Default, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    id: Label,
    #[serde(default)]
    author: Author,
    #[serde(default)]
    title: Label,
    #[serde(default)]
    content: Label,
    #[serde(rename = "im:rating", default)]
    rating: Label,
    #[serde(default)]
    updated: Label,
}

/// The feed emits a bare object instead of an array when a page has one entry.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

/// What to do with one feed entry.
#[derive(Debug)]
enum Entry {
    Keep(Review),
    Skip,
    TooOld,
}

fn classify(entry: FeedEntry, app_id: &str, now: DateTime<Utc>, since: Duration) -> Entry {
    let Some(created_at) = parse_datetime(&entry.updated.label) else {
        return Entry::Skip;
    };
    if now - created_at > since {
        return Entry::TooOld;
    }
    let Ok(rating) = entry.rating.label.trim().parse::<i32>() else {
        return Entry::Skip;
    };

    Entry::Keep(Review {
        id: entry.id.label,
        app_id: app_id.to_string(),
        author: entry.author.name.label,
        title: entry.title.label,
        content: entry.content.label,
        rating,
        created_at,
    })
}

/// Client for the paginated App Store review feed.
#[derive(Debug, Clone)]
pub struct AppStoreClient {
    http: HttpClient,
    url_template: String,
    retry: RetryConfig,
    max_pages: u32,
}

impl AppStoreClient {
    /// Create a client for a URL template containing `{app_id}` and `{page}`.
    pub fn new(http: HttpClient, url_template: impl Into<String>) -> Self {
        Self {
            http,
            url_template: url_template.into(),
            retry: RetryConfig::default(),
            max_pages: MAX_PAGES,
        }
    }

    /// Override the retry behaviour.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = RetryConfig {
            max_attempts: retry.max_attempts.max(1),
            ..retry
        };
        self
    }

    /// Override the page limit. A fetch that would need more pages fails.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Render the URL for one page of an app's feed.
    pub fn page_url(&self, app_id: &str, page: u32) -> String {
        render_url(&self.url_template, app_id, page)
    }

    async fn try_fetch_page(&self, url: &str) -> Result<FeedResponse, PageError> {
        let response = self.http.get(url).await?;
        if !response.is_ok() {
            return Err(PageError::Status(response.status));
        }
        let content_type = response.content_type().unwrap_or_default().to_string();
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            debug!(url, content_type = %content_type, "Feed body did not decode");
            PageError::Decode(e)
        })
    }

    /// Fetch one page, retrying with linear backoff.
    async fn fetch_page(&self, app_id: &str, page: u32) -> Result<FeedResponse, FetchError> {
        let url = self.page_url(app_id, page);
        let max_attempts = self.retry.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.try_fetch_page(&url).await {
                Ok(feed) => return Ok(feed),
                Err(e) => {
                    warn!(
                        app_id,
                        page,
                        attempt,
                        max_attempts,
                        "Feed request failed: {}",
                        e
                    );
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            app_id: app_id.to_string(),
            page,
            attempts: max_attempts,
            last_error,
        })
    }
}

/// Substitute `{app_id}` (URL-encoded) and `{page}` into a feed URL template.
pub fn render_url(template: &str, app_id: &str, page: u32) -> String {
    template
        .replace("{app_id}", &urlencoding::encode(app_id))
        .replace("{page}", &page.to_string())
}

#[async_trait]
impl ReviewSource for AppStoreClient {
    async fn fetch_recent_reviews(
        &self,
        app_id: &str,
        since: Duration,
    ) -> Result<Vec<Review>, FetchError> {
        let now = Utc::now();
        let mut reviews = Vec::new();

        let mut page = 1;
        'pages: loop {
            if page > self.max_pages {
                warn!(
                    app_id,
                    max_pages = self.max_pages,
                    "Feed did not end within page limit"
                );
                return Err(FetchError::PageLimit {
                    app_id: app_id.to_string(),
                    max_pages: self.max_pages,
                });
            }

            let entries = self.fetch_page(app_id, page).await?.feed.entry;
            if entries.is_empty() {
                debug!(app_id, page, "Reached empty page");
                break;
            }

            debug!(app_id, page, count = entries.len(), "Fetched feed page");
            for entry in entries {
                match classify(entry, app_id, now, since) {
                    Entry::Keep(review) => reviews.push(review),
                    Entry::Skip => {}
                    Entry::TooOld => {
                        debug!(app_id, page, "Reached recency cutoff");
                        break 'pages;
                    }
                }
            }

            page += 1;
        }

        info!(app_id, count = reviews.len(), "Fetched recent reviews");
        Ok(reviews)
    }
}
