//! reviews-browser: harvests App Store reviews on a per-app schedule and
//! keeps a rolling window of recent reviews in flat CSV tables.

pub mod config;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scheduler;
pub mod scrapers;
pub mod server;
pub mod services;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::Settings;
