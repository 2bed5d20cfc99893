//! Domain models for tracked apps and harvested reviews.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An application whose reviews are polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub id: String,
    /// Time of the last successful fetch cycle.
    pub last_fetched: DateTime<Utc>,
    /// Poll cadence in seconds. Always greater than zero.
    pub poll_every_seconds: u64,
}

impl App {
    /// When the next poll is due, measured from the given baseline.
    pub fn next_poll_after(&self, baseline: DateTime<Utc>) -> DateTime<Utc> {
        let secs = i64::try_from(self.poll_every_seconds).unwrap_or(i64::MAX);
        Duration::try_seconds(secs)
            .and_then(|interval| baseline.checked_add_signed(interval))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A single harvested review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub app_id: String,
    pub author: String,
    pub title: String,
    pub content: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Whether the review is not older than `cutoff` relative to `now`.
    pub fn is_recent(&self, now: DateTime<Utc>, cutoff: Duration) -> bool {
        self.created_at >= now - cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_at(created_at: DateTime<Utc>) -> Review {
        Review {
            id: "r1".to_string(),
            app_id: "42".to_string(),
            author: "someone".to_string(),
            title: "title".to_string(),
            content: "content".to_string(),
            rating: 4,
            created_at,
        }
    }

    #[test]
    fn test_next_poll_after() {
        let base = Utc::now();
        let app = App {
            id: "42".to_string(),
            last_fetched: base,
            poll_every_seconds: 60,
        };
        assert_eq!(app.next_poll_after(base), base + Duration::seconds(60));
    }

    #[test]
    fn test_is_recent_boundary() {
        let now = Utc::now();
        let cutoff = Duration::hours(48);
        assert!(review_at(now - cutoff).is_recent(now, cutoff));
        assert!(!review_at(now - cutoff - Duration::seconds(1)).is_recent(now, cutoff));
    }

    #[test]
    fn test_review_json_field_names() {
        let review = review_at(Utc::now());
        let value = serde_json::to_value(&review).unwrap();
        for field in ["id", "app_id", "author", "title", "content", "rating", "created_at"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }
}
