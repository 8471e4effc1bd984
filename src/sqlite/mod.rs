// ABOUTME: SQLite source access for migration to PostgreSQL
// ABOUTME: Checks the source file is reachable and opens it read-only

pub mod converter;
pub mod reader;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

const SQLITE_EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

/// Validate that a SQLite source file is reachable
///
/// The path is canonicalized (resolving symlinks and relative segments),
/// must point at a regular file, and must carry a `.db`, `.sqlite` or
/// `.sqlite3` extension.
///
/// # Returns
///
/// Canonical absolute path of the database file.
///
/// # Examples
///
/// ```no_run
/// # use sqlite_pg_migrate::sqlite::validate_sqlite_path;
/// # use std::path::Path;
/// assert!(validate_sqlite_path(Path::new(".tmp/data.db")).is_ok());
/// assert!(validate_sqlite_path(Path::new("/etc/passwd")).is_err());
/// ```
pub fn validate_sqlite_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        bail!("SQLite file path cannot be empty");
    }

    let canonical = path.canonicalize().with_context(|| {
        format!(
            "SQLite database not found at '{}'. \
             File may not exist or may not be readable.",
            path.display()
        )
    })?;

    if !canonical.is_file() {
        bail!(
            "Path '{}' is not a regular file (may be a directory)",
            path.display()
        );
    }

    match canonical.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if SQLITE_EXTENSIONS.contains(&ext) => {}
        Some(ext) => bail!(
            "Invalid SQLite file extension '{}'. Must be .db, .sqlite, or .sqlite3",
            ext
        ),
        None => bail!(
            "SQLite file '{}' has no extension. Must be .db, .sqlite, or .sqlite3",
            path.display()
        ),
    }

    tracing::debug!("Validated SQLite path: {}", canonical.display());

    Ok(canonical)
}

/// Open the source database in read-only mode
///
/// Validates the path first, then reads the schema table so a corrupt or
/// non-SQLite file fails here rather than halfway through the run.
pub fn open_sqlite(path: &Path) -> Result<rusqlite::Connection> {
    let canonical = validate_sqlite_path(path)?;

    tracing::info!("Opening SQLite database: {}", canonical.display());

    let conn = rusqlite::Connection::open_with_flags(
        &canonical,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
    )
    .with_context(|| format!("Failed to open SQLite database: {}", canonical.display()))?;

    let table_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))
        .context("Failed to read SQLite schema (file may not be a SQLite database)")?;

    tracing::debug!("Opened SQLite database with {} schema objects", table_count);

    Ok(conn)
}
