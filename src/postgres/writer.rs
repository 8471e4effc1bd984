// ABOUTME: Conflict-tolerant single-row inserts into PostgreSQL
// ABOUTME: Builds INSERT ... ON CONFLICT DO NOTHING statements and classifies insert failures

use crate::migration::destination::{find_column, DestinationColumn, RowOutcome};
use crate::sqlite::converter::PgValue;
use crate::utils::quote_identifier;
use anyhow::Result;
use std::collections::HashMap;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

/// Column names that must always be quoted in generated SQL.
pub const RESERVED_COLUMN_NAMES: [&str; 6] = ["order", "user", "group", "select", "table", "where"];

/// Escape a column name for use in an INSERT column list
///
/// Names in [`RESERVED_COLUMN_NAMES`] (compared case-insensitively) are
/// quoted; every other name is emitted verbatim, so PostgreSQL folds it
/// the same way it folded the unquoted DDL that created the column.
///
/// # Examples
///
/// ```
/// # use sqlite_pg_migrate::postgres::writer::escape_column_name;
/// assert_eq!(escape_column_name("order"), "\"order\"");
/// assert_eq!(escape_column_name("email"), "email");
/// ```
pub fn escape_column_name(name: &str) -> String {
    let lower = name.to_lowercase();
    if RESERVED_COLUMN_NAMES.contains(&lower.as_str()) {
        quote_identifier(name)
    } else {
        name.to_string()
    }
}

/// The INSERT used for every row of one table
///
/// Every value is bound as `text` and cast to the destination column type,
/// so PostgreSQL's own input functions do the final typing. Columns the
/// destination does not know are bound as plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    columns: Vec<String>,
    sql: String,
}

impl InsertStatement {
    pub fn new(
        table: &str,
        columns: &[String],
        destination_columns: &HashMap<String, DestinationColumn>,
    ) -> Self {
        let column_list = columns
            .iter()
            .map(|c| escape_column_name(c))
            .collect::<Vec<_>>()
            .join(", ");

        let placeholders = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| match find_column(destination_columns, column) {
                Some(dest) => format!("${}::text::{}", idx + 1, dest.cast_type),
                None => format!("${}::text", idx + 1),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
            quote_identifier(table),
            column_list,
            placeholders
        );

        Self {
            table: table.to_string(),
            columns: columns.to_vec(),
            sql,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Execute an insert for a single row
///
/// # Returns
///
/// - `Inserted` when PostgreSQL reports one row written
/// - `Duplicate` when `ON CONFLICT DO NOTHING` skipped it, or a unique
///   violation slipped past it (deferred constraints)
/// - `Failed` for any other server-side rejection
///
/// # Errors
///
/// Only when the connection is closed. That is not a row problem and must
/// stop the run.
pub async fn insert_row(
    client: &Client,
    insert: &InsertStatement,
    values: &[PgValue],
) -> Result<RowOutcome> {
    let params: Vec<Option<String>> = values.iter().map(PgValue::to_text).collect();
    let param_refs: Vec<&(dyn ToSql + Sync)> = params
        .iter()
        .map(|p| p as &(dyn ToSql + Sync))
        .collect();

    match client.execute(insert.sql(), &param_refs).await {
        Ok(0) => Ok(RowOutcome::Duplicate),
        Ok(_) => Ok(RowOutcome::Inserted),
        Err(e) if e.is_closed() => Err(anyhow::Error::new(e).context(format!(
            "Connection closed while inserting into '{}'",
            insert.table()
        ))),
        Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Ok(RowOutcome::Duplicate),
        Err(e) => Ok(RowOutcome::Failed(describe_error(&e))),
    }
}

fn describe_error(error: &tokio_postgres::Error) -> String {
    match error.as_db_error() {
        Some(db) => match db.detail() {
            Some(detail) => format!("{} ({})", db.message(), detail),
            None => db.message().to_string(),
        },
        None => error.to_string(),
    }
}
