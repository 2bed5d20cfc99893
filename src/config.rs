//! Configuration management for reviews-browser using the prefer crate.
//!
//! Precedence, lowest first: built-in defaults, a `reviews-browser` config
//! file discovered by prefer, then environment variables (including `.env`)
//! and command-line flags.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};

use crate::scrapers::appstore::render_url;

/// Default feed URL. `{app_id}` and `{page}` are substituted per request.
pub const DEFAULT_REVIEWS_URL: &str =
    "https://itunes.apple.com/us/rss/customerreviews/id={app_id}/sortBy=mostRecent/page={page}/json";

/// Default recency cutoff in hours (48 hours).
pub const DEFAULT_RECENCY_CUTOFF_HRS: u64 = 48;

/// Default cleanup cadence in hours.
pub const DEFAULT_CLEANUP_EVERY_HRS: u64 = 1;

/// Upper bound for any hour-valued setting (100 years).
const MAX_HOURS: u64 = 24 * 365 * 100;

/// Invalid configuration detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be between 1 and {MAX_HOURS} hours")]
    Hours(&'static str),

    #[error("reviews URL template must contain {{app_id}} and {{page}}: {0}")]
    Template(String),

    #[error("reviews URL template does not render to a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Feed URL template with `{app_id}` and `{page}` placeholders.
    pub reviews_url_template: String,
    /// Address the API server binds to.
    pub server_host: String,
    /// Port the API server listens on.
    pub server_port: u16,
    /// Path of the reviews table.
    pub reviews_csv: PathBuf,
    /// Path of the apps table.
    pub apps_csv: PathBuf,
    /// Maximum review age in hours for reads, insert dedup and cleanup.
    pub recency_cutoff_hours: u64,
    /// Hours between cleanup passes.
    pub cleanup_every_hours: u64,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// User agent for feed requests (None = crate default).
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reviews_url_template: DEFAULT_REVIEWS_URL.to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            reviews_csv: PathBuf::from("data/reviews.csv"),
            apps_csv: PathBuf::from("data/apps.csv"),
            recency_cutoff_hours: DEFAULT_RECENCY_CUTOFF_HRS,
            cleanup_every_hours: DEFAULT_CLEANUP_EVERY_HRS,
            request_timeout: 10,
            user_agent: None,
        }
    }
}

impl Settings {
    /// Recency cutoff as a signed duration.
    pub fn recency_cutoff(&self) -> ChronoDuration {
        ChronoDuration::hours(self.recency_cutoff_hours.min(MAX_HOURS) as i64)
    }

    /// Time between cleanup passes.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_every_hours.min(MAX_HOURS) * 3600)
    }

    /// Feed request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Socket address for the API server.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server_host, self.server_port).parse()
    }

    /// Reject settings the schedulers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_HOURS).contains(&self.recency_cutoff_hours) {
            return Err(ConfigError::Hours("recency cutoff"));
        }
        if !(1..=MAX_HOURS).contains(&self.cleanup_every_hours) {
            return Err(ConfigError::Hours("cleanup interval"));
        }

        let template = &self.reviews_url_template;
        if !template.contains("{app_id}") || !template.contains("{page}") {
            return Err(ConfigError::Template(template.clone()));
        }
        url::Url::parse(&render_url(template, "0", 1))?;

        Ok(())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed URL template.
    #[serde(default)]
    pub reviews_url: Option<String>,
    /// API bind host.
    #[serde(default)]
    pub host: Option<String>,
    /// API port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Reviews table path.
    #[serde(default)]
    pub reviews_csv: Option<String>,
    /// Apps table path.
    #[serde(default)]
    pub apps_csv: Option<String>,
    /// Recency cutoff in hours.
    #[serde(default)]
    pub recency_cutoff_hrs: Option<u64>,
    /// Cleanup cadence in hours.
    #[serde(default)]
    pub cleanup_every_hrs: Option<u64>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// User agent string.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers reviews-browser config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("reviews-browser").await {
            Ok(pref_config) => {
                let reviews_url: Option<String> = pref_config.get("reviews_url").ok();
                let host: Option<String> = pref_config.get("host").ok();
                let port: Option<u16> = pref_config.get("port").ok();
                let reviews_csv: Option<String> = pref_config.get("reviews_csv").ok();
                let apps_csv: Option<String> = pref_config.get("apps_csv").ok();
                let recency_cutoff_hrs: Option<u64> =
                    pref_config.get("recency_cutoff_hrs").ok();
                let cleanup_every_hrs: Option<u64> =
                    pref_config.get("cleanup_every_hrs").ok();
                let request_timeout: Option<u64> = pref_config.get("request_timeout").ok();
                let user_agent: Option<String> = pref_config.get("user_agent").ok();

                Config {
                    reviews_url,
                    host,
                    port,
                    reviews_csv,
                    apps_csv,
                    recency_cutoff_hrs,
                    cleanup_every_hrs,
                    request_timeout,
                    user_agent,
                }
            }
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref url) = self.reviews_url {
            settings.reviews_url_template = url.clone();
        }
        if let Some(ref host) = self.host {
            settings.server_host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server_port = port;
        }
        if let Some(ref path) = self.reviews_csv {
            settings.reviews_csv = PathBuf::from(path);
        }
        if let Some(ref path) = self.apps_csv {
            settings.apps_csv = PathBuf::from(path);
        }
        if let Some(hours) = self.recency_cutoff_hrs {
            settings.recency_cutoff_hours = hours;
        }
        if let Some(hours) = self.cleanup_every_hrs {
            settings.cleanup_every_hours = hours;
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
    }
}

/// Environment and command-line overrides.
///
/// Every field falls back to the matching environment variable, so a `.env`
/// file loaded before parsing works the same as passing the flag.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SettingsArgs {
    /// Feed URL template with {app_id} and {page} placeholders
    #[arg(long = "reviews-url", env = "APPSTORE_REVIEW_URL", global = true)]
    pub reviews_url: Option<String>,

    /// API bind host
    #[arg(long, env = "SERVER_HOST", global = true)]
    pub host: Option<String>,

    /// API port
    #[arg(long, env = "SERVER_PORT", global = true)]
    pub port: Option<u16>,

    /// Path of the reviews table
    #[arg(long = "reviews-csv", env = "REVIEWS_CSV_PATH", global = true)]
    pub reviews_csv: Option<PathBuf>,

    /// Path of the apps table
    #[arg(long = "apps-csv", env = "APPS_CSV_PATH", global = true)]
    pub apps_csv: Option<PathBuf>,

    /// Maximum review age in hours
    #[arg(long = "recency-cutoff-hrs", env = "RECENCY_CUTOFF_HRS", global = true)]
    pub recency_cutoff_hrs: Option<u64>,

    /// Hours between cleanup passes
    #[arg(long = "cleanup-every-hrs", env = "CLEANUP_EVERY_HRS", global = true)]
    pub cleanup_every_hrs: Option<u64>,
}

impl SettingsArgs {
    /// Apply overrides to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref url) = self.reviews_url {
            settings.reviews_url_template = url.clone();
        }
        if let Some(ref host) = self.host {
            settings.server_host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server_port = port;
        }
        if let Some(ref path) = self.reviews_csv {
            settings.reviews_csv = path.clone();
        }
        if let Some(ref path) = self.apps_csv {
            settings.apps_csv = path.clone();
        }
        if let Some(hours) = self.recency_cutoff_hrs {
            settings.recency_cutoff_hours = hours;
        }
        if let Some(hours) = self.cleanup_every_hrs {
            settings.cleanup_every_hours = hours;
        }
    }
}

/// Load settings from the config file and the given overrides, then validate.
pub async fn load_settings(args: &SettingsArgs) -> Result<Settings, ConfigError> {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    args.apply_to_settings(&mut settings);
    settings.validate()?;
    Ok(settings)
}
