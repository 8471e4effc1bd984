// ABOUTME: Row transfer engine that moves one table from SQLite into PostgreSQL
// ABOUTME: Discovers columns, converts each row, inserts with conflict tolerance, and tallies outcomes

use crate::migration::destination::{find_column, Destination, DestinationColumn, RowOutcome};
use crate::migration::summary::{SkipReason, TableOutcome, TableTally, MAX_REPORTED_ERRORS};
use crate::postgres::writer::InsertStatement;
use crate::sqlite::converter::{convert_value, PgValue, SourceValue};
use crate::sqlite::reader::{self, SourceColumn};
use anyhow::Result;
use indicatif::ProgressBar;
use rusqlite::Connection;
use std::collections::HashMap;

/// Conversion and insert plan for one table
///
/// Pairs every source column with its destination type (if the destination
/// has that column) in source declaration order.
pub struct TablePlan {
    columns: Vec<(SourceColumn, Option<DestinationColumn>)>,
    insert: InsertStatement,
}

impl TablePlan {
    pub fn new(
        table: &str,
        source_columns: Vec<SourceColumn>,
        destination_columns: &HashMap<String, DestinationColumn>,
    ) -> Self {
        let names: Vec<String> = source_columns.iter().map(|c| c.name.clone()).collect();
        let insert = InsertStatement::new(table, &names, destination_columns);
        let columns = source_columns
            .into_iter()
            .map(|column| {
                let dest = find_column(destination_columns, &column.name).cloned();
                if dest.is_none() {
                    tracing::debug!(
                        "Column '{}.{}' has no destination type; using value shape only",
                        table,
                        column.name
                    );
                }
                (column, dest)
            })
            .collect();

        Self { columns, insert }
    }

    pub fn insert(&self) -> &InsertStatement {
        &self.insert
    }

    /// Convert a source row into values aligned with the insert columns
    pub fn convert_row(&self, row: Vec<SourceValue>) -> Vec<PgValue> {
        row.into_iter()
            .zip(&self.columns)
            .map(|(value, (source, dest))| {
                convert_value(
                    value,
                    source.storage_class,
                    dest.as_ref().map(|d| d.data_type.as_str()),
                )
            })
            .collect()
    }
}

/// Migrate a single table
///
/// Never fails because of a single row or a single table: row rejections
/// are tallied and table-level problems become [`TableOutcome::Failed`].
///
/// # Errors
///
/// Only when the destination connection is lost, which ends the run.
pub async fn migrate_table<D>(
    source: &Connection,
    destination: &D,
    table: &str,
    progress: &ProgressBar,
) -> Result<TableOutcome>
where
    D: Destination + ?Sized,
{
    match transfer_table(source, destination, table, progress).await {
        Ok(outcome) => Ok(outcome),
        Err(e) if destination.is_connected() => {
            tracing::warn!("Table '{}' failed: {:#}", table, e);
            Ok(TableOutcome::Failed(format!("{:#}", e)))
        }
        Err(e) => Err(e),
    }
}

async fn transfer_table<D>(
    source: &Connection,
    destination: &D,
    table: &str,
    progress: &ProgressBar,
) -> Result<TableOutcome>
where
    D: Destination + ?Sized,
{
    if !destination.table_exists(table).await? {
        tracing::info!("Skipping '{}': not present in destination", table);
        return Ok(TableOutcome::Skipped(SkipReason::MissingDestination));
    }

    let source_columns = reader::table_columns(source, table)?;
    if source_columns.is_empty() {
        tracing::info!("Skipping '{}': no columns", table);
        return Ok(TableOutcome::Skipped(SkipReason::NoColumns));
    }

    // Without types no value can be cast, so a failed lookup fails the table
    let destination_columns = destination.column_types(table).await?;

    let rows = reader::read_table_rows(source, table, &source_columns)?;
    if rows.is_empty() {
        tracing::info!("Skipping '{}': no rows", table);
        return Ok(TableOutcome::Skipped(SkipReason::Empty));
    }

    let plan = TablePlan::new(table, source_columns, &destination_columns);
    tracing::debug!("Insert for '{}': {}", table, plan.insert().sql());

    let mut tally = TableTally::new(rows.len());
    progress.set_length(rows.len() as u64);

    for (row_num, row) in rows.into_iter().enumerate() {
        let values = plan.convert_row(row);
        let outcome = destination.insert_row(plan.insert(), &values).await?;

        if let RowOutcome::Failed(ref message) = outcome {
            if tally.errors < MAX_REPORTED_ERRORS {
                tracing::warn!("Row {} of '{}' rejected: {}", row_num + 1, table, message);
            }
        }
        tally.record(outcome);
        progress.inc(1);
    }

    tracing::info!(
        "Table '{}': {} inserted, {} already present, {} errors",
        table,
        tally.inserted,
        tally.duplicates,
        tally.errors
    );

    Ok(TableOutcome::Migrated(tally))
}
