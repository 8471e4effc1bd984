// ABOUTME: Destination abstraction used by the row transfer engine
// ABOUTME: Defines catalog lookups, conflict-tolerant inserts, and per-row outcomes

use crate::postgres::writer::InsertStatement;
use crate::sqlite::converter::PgValue;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Type information for one destination column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationColumn {
    /// `information_schema.columns.data_type`, e.g. `timestamp with time zone`
    pub data_type: String,
    /// Quoted type name used to cast bound text, e.g. `"pg_catalog"."int4"`
    pub cast_type: String,
}

/// Find the type of `name`, falling back to its case-folded spelling
///
/// Columns created without quotes are stored lower-cased, which is also
/// what PostgreSQL resolves an unquoted mixed-case name to.
pub fn find_column<'a>(
    columns: &'a HashMap<String, DestinationColumn>,
    name: &str,
) -> Option<&'a DestinationColumn> {
    columns
        .get(name)
        .or_else(|| columns.get(&name.to_lowercase()))
}

/// Result of inserting one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The destination reports a row was written
    Inserted,
    /// A uniqueness conflict; the row is already present
    Duplicate,
    /// Any other rejection, with the database's message
    Failed(String),
}

/// The relational side of a migration
///
/// `Err` from any method means the connection itself is unusable.
/// Rejections of individual rows are reported as [`RowOutcome::Failed`].
#[async_trait]
pub trait Destination: Send + Sync {
    /// True if the table exists in the default schema under this exact name
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Column name to type map; columns the table lacks are missing keys
    async fn column_types(&self, table: &str) -> Result<HashMap<String, DestinationColumn>>;

    /// Insert one row, treating a uniqueness conflict as a duplicate
    async fn insert_row(&self, insert: &InsertStatement, values: &[PgValue]) -> Result<RowOutcome>;

    /// Best-effort rollback after a run-level failure
    async fn rollback(&self) -> Result<()>;

    /// Whether the underlying connection is still open
    fn is_connected(&self) -> bool;
}
