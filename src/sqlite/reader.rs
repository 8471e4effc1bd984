// ABOUTME: SQLite catalog introspection and table reading
// ABOUTME: Lists user tables, discovers ordered column types, and loads rows in column order

use crate::sqlite::converter::{SourceValue, StorageClass};
use crate::utils::quote_identifier;
use anyhow::{Context, Result};
use rusqlite::Connection;

/// A column as declared in the SQLite schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    /// Declared type exactly as written in `CREATE TABLE` (may be empty)
    pub declared_type: String,
    pub storage_class: StorageClass,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            storage_class: StorageClass::from_declared_type(&declared_type),
            declared_type,
        }
    }
}

/// List all user tables in a SQLite database
///
/// Excludes SQLite's internal `sqlite_*` tables (sqlite_sequence,
/// sqlite_stat1, ...). Names are returned in lexicographic order so every
/// run visits tables in the same sequence.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    tracing::debug!("Listing tables from SQLite database");

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master \
             WHERE type='table' \
             AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .context("Failed to prepare statement to list tables")?;

    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("Failed to query table list")?
        .collect::<Result<Vec<String>, _>>()
        .context("Failed to collect table names")?;

    tracing::info!("Found {} user tables in SQLite database", tables.len());

    Ok(tables)
}

/// Discover the columns of a table in declaration order
///
/// The order returned here is the canonical column order for both the
/// SELECT that reads rows and the INSERT that writes them. An unknown
/// table yields an empty list.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<SourceColumn>> {
    let mut stmt = conn
        .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
        .with_context(|| format!("Failed to prepare column query for '{}'", table))?;

    let columns = stmt
        .query_map([table], |row| {
            Ok(SourceColumn::new(
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            ))
        })
        .with_context(|| format!("Failed to query columns of table '{}'", table))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to collect columns of table '{}'", table))?;

    tracing::debug!(
        "Table '{}' has {} columns: {:?}",
        table,
        columns.len(),
        columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );

    Ok(columns)
}

/// Read every row of a table into memory
///
/// Each row is a vector of values aligned with `columns`. The whole table
/// is materialized; nothing is streamed.
pub fn read_table_rows(
    conn: &Connection,
    table: &str,
    columns: &[SourceColumn],
) -> Result<Vec<Vec<SourceValue>>> {
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let column_list = columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!(
        "SELECT {} FROM {}",
        column_list,
        quote_identifier(table)
    );

    let mut stmt = conn
        .prepare(&query)
        .with_context(|| format!("Failed to prepare statement for table '{}'", table))?;

    let rows = stmt
        .query_map([], |row| {
            (0..columns.len())
                .map(|idx| row.get_ref(idx).map(SourceValue::from))
                .collect::<Result<Vec<_>, _>>()
        })
        .with_context(|| format!("Failed to query rows from table '{}'", table))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to collect rows from table '{}'", table))?;

    tracing::debug!("Read {} rows from table '{}'", rows.len(), table);

    Ok(rows)
}
