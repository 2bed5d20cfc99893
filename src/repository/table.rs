//! File-backed CSV table.
//!
//! A table is a single CSV file with a header row. Reads scan the whole file.
//! Appends add one row at the end. Rewrites build the complete table in a
//! temporary file next to the original and rename it into place, so readers
//! see either the old table or the new one, never a partial write.
//!
//! File access is synchronous and runs on tokio's blocking pool via
//! [`run_blocking`].

use std::fs::{self, File, OpenOptions, Permissions};
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::{StoreError, StoreResult};

/// A CSV table with a per-table write lock.
///
/// The lock is advisory: callers that read-modify-write take it for the whole
/// sequence through [`CsvTable::write_lock`]. Plain reads do not need it.
#[derive(Debug)]
pub struct CsvTable {
    path: PathBuf,
    header: &'static [&'static str],
    write_lock: Mutex<()>,
}

impl CsvTable {
    /// Open a table, creating the parent directory and a header-only file if
    /// the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>, header: &'static [&'static str]) -> StoreResult<Self> {
        let path = path.into();

        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            write_table(&path, header, &[])?;
            info!(path = %path.display(), "Created empty table");
        }

        Ok(Self {
            path,
            header,
            write_lock: Mutex::new(()),
        })
    }

    /// Acquire the table's write lock.
    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Read every data row. Rows that are not valid UTF-8 are skipped.
    pub async fn read_rows(&self) -> StoreResult<Vec<StringRecord>> {
        let path = self.path.clone();
        run_blocking(move || read_rows(&path)).await
    }

    /// Append a single row at the end of the file.
    pub async fn append_row(&self, row: Vec<String>) -> StoreResult<()> {
        let path = self.path.clone();
        let header = self.header;
        run_blocking(move || append_row(&path, header, &row)).await
    }

    /// Replace the whole table with the given rows.
    pub async fn rewrite(&self, rows: Vec<Vec<String>>) -> StoreResult<()> {
        let path = self.path.clone();
        let header = self.header;
        run_blocking(move || write_table(&path, header, &rows)).await
    }
}

/// Run a blocking table operation on tokio's blocking pool.
pub async fn run_blocking<F, T>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn read_rows(path: &Path) -> StoreResult<Vec<StringRecord>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.records() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => debug!(path = %path.display(), "Skipping unreadable row: {}", e),
        }
    }

    Ok(rows)
}

fn append_row(path: &Path, header: &[&str], row: &[String]) -> StoreResult<()> {
    // The file must already exist; a table deleted after open is an error.
    let file = OpenOptions::new().append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if needs_header {
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}

fn write_table(path: &Path, header: &[&str], rows: &[Vec<String>]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file());
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;

    // The temp file is created 0600; carry the table's mode over the rename.
    if let Some(permissions) = table_permissions(path)? {
        tmp.as_file().set_permissions(permissions)?;
    }

    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Permissions for the rewritten table: the current file's, or the usual
/// 0644 for a table being created.
fn table_permissions(path: &Path) -> io::Result<Option<Permissions>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata.permissions())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(default_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &[&str] = &["id", "value"];

    fn row(id: &str, value: &str) -> Vec<String> {
        vec![id.to_string(), value.to_string()]
    }

    #[tokio::test]
    async fn test_open_creates_header_only_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("table.csv");

        let table = CsvTable::open(&path, HEADER).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "id,value\n");
        assert!(table.read_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = tempdir().unwrap();
        let table = CsvTable::open(dir.path().join("t.csv"), HEADER).unwrap();

        table.append_row(row("1", "one")).await.unwrap();
        table
            .append_row(row("2", "with, comma and \"quotes\""))
            .await
            .unwrap();

        let rows = table.read_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][1], "with, comma and \"quotes\"");
    }

    #[tokio::test]
    async fn test_append_to_empty_file_writes_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = CsvTable::open(&path, HEADER).unwrap();
        fs::write(&path, "").unwrap();

        table.append_row(row("1", "one")).await.unwrap();

        let rows = table.read_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "1");
    }

    #[tokio::test]
    async fn test_rewrite_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = CsvTable::open(&path, HEADER).unwrap();
        table.append_row(row("1", "one")).await.unwrap();
        table.append_row(row("2", "two")).await.unwrap();

        table.rewrite(vec![row("3", "three")]).await.unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "id,value\n3,three\n");
    }

    #[tokio::test]
    async fn test_short_rows_are_returned_for_caller_to_validate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "id,value\n1\n2,two\n").unwrap();
        let table = CsvTable::open(&path, HEADER).unwrap();

        let rows = table.read_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_after_open_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = CsvTable::open(&path, HEADER).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(table.read_rows().await.is_err());
        assert!(table.append_row(row("1", "one")).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rewrite_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = CsvTable::open(&path, HEADER).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o644);

        fs::set_permissions(&path, Permissions::from_mode(0o640)).unwrap();
        table.rewrite(vec![row("1", "one")]).await.unwrap();

        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
    }
}
