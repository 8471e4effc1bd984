// ABOUTME: Per-table outcomes and run-level totals for a migration
// ABOUTME: Tallies inserted, duplicate, and failed rows and renders the console summary

use crate::migration::destination::RowOutcome;
use std::fmt;

/// Only this many row errors per table are kept with their message.
pub const MAX_REPORTED_ERRORS: usize = 3;

/// Why a table was intentionally not migrated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingDestination,
    NoColumns,
    Empty,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingDestination => write!(
                f,
                "table does not exist in PostgreSQL (create the schema first)"
            ),
            SkipReason::NoColumns => write!(f, "no columns found"),
            SkipReason::Empty => write!(f, "table is empty"),
        }
    }
}

/// Row counts for one migrated table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableTally {
    pub rows_read: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
    /// Messages of the first [`MAX_REPORTED_ERRORS`] failed rows
    pub error_samples: Vec<String>,
}

impl TableTally {
    pub fn new(rows_read: usize) -> Self {
        Self {
            rows_read,
            ..Self::default()
        }
    }

    /// Count one row outcome
    ///
    /// Returns true if this failure is one of the first few worth showing.
    pub fn record(&mut self, outcome: RowOutcome) -> bool {
        match outcome {
            RowOutcome::Inserted => self.inserted += 1,
            RowOutcome::Duplicate => self.duplicates += 1,
            RowOutcome::Failed(message) => {
                self.errors += 1;
                if self.error_samples.len() < MAX_REPORTED_ERRORS {
                    self.error_samples.push(message);
                    return true;
                }
            }
        }
        false
    }
}

/// Terminal state of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Migrated(TableTally),
    Skipped(SkipReason),
    /// Introspection or reading failed; the run moved on
    Failed(String),
}

/// One line of the run report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub outcome: TableOutcome,
}

/// Aggregated result of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub tables: Vec<TableReport>,
}

impl MigrationSummary {
    pub fn record(&mut self, table: impl Into<String>, outcome: TableOutcome) {
        self.tables.push(TableReport {
            table: table.into(),
            outcome,
        });
    }

    fn tallies(&self) -> impl Iterator<Item = &TableTally> {
        self.tables.iter().filter_map(|report| match &report.outcome {
            TableOutcome::Migrated(tally) => Some(tally),
            _ => None,
        })
    }

    /// Rows actually written across all tables
    pub fn total_migrated(&self) -> usize {
        self.tallies().map(|t| t.inserted).sum()
    }

    /// Rows skipped as already present
    pub fn total_duplicates(&self) -> usize {
        self.tallies().map(|t| t.duplicates).sum()
    }

    /// Rows rejected by the destination
    pub fn total_row_errors(&self) -> usize {
        self.tallies().map(|t| t.errors).sum()
    }

    /// Tables not migrated on purpose, with their reason
    pub fn skipped_tables(&self) -> Vec<(&str, SkipReason)> {
        self.tables
            .iter()
            .filter_map(|report| match report.outcome {
                TableOutcome::Skipped(reason) => Some((report.table.as_str(), reason)),
                _ => None,
            })
            .collect()
    }

    pub fn failed_tables(&self) -> Vec<(&str, &str)> {
        self.tables
            .iter()
            .filter_map(|report| match &report.outcome {
                TableOutcome::Failed(message) => Some((report.table.as_str(), message.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Print the final summary to stdout
    pub fn print(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration complete")?;
        writeln!(f, "  Rows migrated: {}", self.total_migrated())?;

        let duplicates = self.total_duplicates();
        if duplicates > 0 {
            writeln!(f, "  Rows already present: {}", duplicates)?;
        }

        let row_errors = self.total_row_errors();
        if row_errors > 0 {
            writeln!(f, "  Rows with errors: {}", row_errors)?;
        }

        let skipped = self.skipped_tables();
        if !skipped.is_empty() {
            writeln!(f, "  Tables skipped: {}", skipped.len())?;
            for (table, reason) in skipped {
                writeln!(f, "    - {}: {}", table, reason)?;
            }
        }

        let failed = self.failed_tables();
        if !failed.is_empty() {
            writeln!(f, "  Tables failed: {}", failed.len())?;
            for (table, message) in failed {
                writeln!(f, "    - {}: {}", table, message)?;
            }
        }

        Ok(())
    }
}

/// Print the outcome of one table as soon as it finishes
pub fn print_table_outcome(table: &str, outcome: &TableOutcome) {
    match outcome {
        TableOutcome::Migrated(tally) => {
            println!(
                "  ✓ Migrated {}/{} rows from {}",
                tally.inserted, tally.rows_read, table
            );
            if tally.duplicates > 0 {
                println!("    {} rows already present", tally.duplicates);
            }
            if tally.errors > 0 {
                for message in &tally.error_samples {
                    println!("    ⚠ Error: {}", message);
                }
                println!("    ⚠ {} rows had errors", tally.errors);
            }
        }
        TableOutcome::Skipped(reason) => println!("  ⚠ Skipped {}: {}", table, reason),
        TableOutcome::Failed(message) => println!("  ✗ Failed {}: {}", table, message),
    }
}
