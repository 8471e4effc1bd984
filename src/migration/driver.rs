// ABOUTME: Migration driver that opens both databases and walks every source table
// ABOUTME: Owns connection lifetimes, per-table reporting, rollback on fatal errors, and the final summary

use crate::config::MigrationConfig;
use crate::filters::TableFilter;
use crate::migration::destination::Destination;
use crate::migration::summary::{print_table_outcome, MigrationSummary};
use crate::migration::transfer::migrate_table;
use crate::postgres::PostgresDestination;
use crate::sqlite::{self, reader};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;

const PROGRESS_TEMPLATE: &str = "    [{bar:40}] {pos}/{len} rows ({elapsed})";

/// One migration run over an open source and destination
pub struct Migrator<D: Destination> {
    source: Connection,
    destination: D,
    filter: TableFilter,
    show_progress: bool,
}

impl<D: Destination> Migrator<D> {
    pub fn new(source: Connection, destination: D) -> Self {
        Self {
            source,
            destination,
            filter: TableFilter::empty(),
            show_progress: false,
        }
    }

    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Migrate every user table in name order
    ///
    /// Tables are independent: a skipped or failed table never stops the
    /// tables after it. Only a lost destination connection ends the run.
    pub async fn run(&self) -> Result<MigrationSummary> {
        let tables = reader::list_tables(&self.source)?;
        let tables = self.filter.apply(tables);
        println!("Found {} tables to migrate", tables.len());

        let mut summary = MigrationSummary::default();
        for table in tables {
            println!("Migrating table: {}", table);
            let progress = self.progress_bar();

            let outcome = migrate_table(&self.source, &self.destination, &table, &progress)
                .await
                .with_context(|| format!("Migration aborted while copying '{}'", table));
            progress.finish_and_clear();
            let outcome = outcome?;

            print_table_outcome(&table, &outcome);
            summary.record(table, outcome);
        }

        Ok(summary)
    }

    /// Best-effort cleanup after a fatal error
    pub async fn abort(&self) {
        if !self.destination.is_connected() {
            tracing::debug!("Destination already closed; nothing to roll back");
            return;
        }
        if let Err(e) = self.destination.rollback().await {
            tracing::warn!("Rollback failed: {:#}", e);
        }
    }

    /// Release the source handle; the destination closes when dropped
    pub fn close(self) {
        if let Err((_, e)) = self.source.close() {
            tracing::warn!("Failed to close SQLite source cleanly: {}", e);
        }
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        ProgressBar::new(0).with_style(style)
    }
}

/// Run a complete migration with the given settings
///
/// # Errors
///
/// Fails if the source cannot be opened, the destination cannot be reached,
/// or the destination connection is lost mid-run. Per-table and per-row
/// problems are reported in the returned summary instead.
pub async fn run(config: &MigrationConfig) -> Result<MigrationSummary> {
    tracing::info!("Opening SQLite source at {}", config.source_path.display());
    let source = sqlite::open_sqlite(&config.source_path)?;

    tracing::info!("Connecting to PostgreSQL at {}", config.destination);
    let destination = PostgresDestination::connect(&config.destination).await?;

    let migrator = Migrator::new(source, destination)
        .with_filter(config.tables.clone())
        .with_progress(config.show_progress);

    let result = migrator.run().await;
    if let Err(ref e) = result {
        tracing::error!("Migration failed: {:#}", e);
        migrator.abort().await;
    }
    migrator.close();

    let summary = result?;
    summary.print();
    Ok(summary)
}
