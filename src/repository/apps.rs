//! Tracked-app table.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use csv::StringRecord;
use tracing::{debug, warn};

use super::table::CsvTable;
use super::{format_datetime, parse_datetime, StoreResult};
use crate::models::App;
use crate::schema::apps;

/// Parse one stored row. Returns `None` for malformed rows.
fn parse_row(row: &StringRecord) -> Option<App> {
    let id = row.get(apps::ID)?;
    let last_fetched = parse_datetime(row.get(apps::LAST_FETCHED)?)?;
    let poll_every_seconds: u64 = row.get(apps::POLL_EVERY_SECONDS)?.trim().parse().ok()?;
    if poll_every_seconds == 0 {
        return None;
    }

    Some(App {
        id: id.to_string(),
        last_fetched,
        poll_every_seconds,
    })
}

fn to_row(app: &App) -> Vec<String> {
    vec![
        app.id.clone(),
        format_datetime(&app.last_fetched),
        app.poll_every_seconds.to_string(),
    ]
}

/// Repository over the apps table.
#[derive(Debug, Clone)]
pub struct AppRepository {
    table: Arc<CsvTable>,
}

impl AppRepository {
    /// Open the apps table, creating an empty one if missing.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self {
            table: Arc::new(CsvTable::open(path, apps::HEADER)?),
        })
    }

    /// All well-formed apps, in file order.
    pub async fn list(&self) -> StoreResult<Vec<App>> {
        let rows = self.table.read_rows().await?;
        let total = rows.len();
        let apps: Vec<App> = rows.iter().filter_map(parse_row).collect();

        if apps.len() < total {
            debug!(
                skipped = total - apps.len(),
                "Skipped malformed rows in apps table"
            );
        }

        Ok(apps)
    }

    /// Get a single app by ID.
    pub async fn get(&self, id: &str) -> StoreResult<Option<App>> {
        Ok(self.list().await?.into_iter().find(|app| app.id == id))
    }

    /// Record a completed fetch cycle for an app.
    ///
    /// The table is rewritten from the parsed rows, so malformed rows are
    /// dropped as a side effect.
    pub async fn update_last_fetched(
        &self,
        id: &str,
        last_fetched: DateTime<Utc>,
    ) -> StoreResult<()> {
        let _guard = self.table.write_lock().await;

        let mut apps = self.list().await?;
        match apps.iter_mut().find(|app| app.id == id) {
            Some(app) => app.last_fetched = last_fetched,
            None => warn!(app_id = id, "Updating last_fetched for unknown app"),
        }

        self.table.rewrite(apps.iter().map(to_row).collect()).await
    }
}
