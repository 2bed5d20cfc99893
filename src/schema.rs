//! Column layout of the flat tables.
//!
//! Every table is a CSV file with one header row followed by data rows.
//! Column positions are fixed; the header is written on every rewrite.

/// Tracked apps and their polling metadata.
pub mod apps {
    pub const ID: usize = 0;
    pub const LAST_FETCHED: usize = 1;
    pub const POLL_EVERY_SECONDS: usize = 2;

    pub const HEADER: &[&str] = &["id", "last_fetched", "poll_every_seconds"];
}

/// Harvested reviews.
pub mod reviews {
    pub const ID: usize = 0;
    pub const APP_ID: usize = 1;
    pub const AUTHOR: usize = 2;
    pub const TITLE: usize = 3;
    pub const CONTENT: usize = 4;
    pub const RATING: usize = 5;
    pub const CREATED_AT: usize = 6;

    pub const HEADER: &[&str] = &[
        "id",
        "app_id",
        "author",
        "title",
        "content",
        "rating",
        "created_at",
    ];
}
