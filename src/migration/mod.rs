// ABOUTME: Migration module tying the SQLite reader to a destination
// ABOUTME: Holds the destination seam, the row transfer engine, the run driver, and reporting

pub mod destination;
pub mod driver;
pub mod summary;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use destination::{Destination, DestinationColumn, RowOutcome};
pub use driver::{run, Migrator};
pub use summary::{MigrationSummary, SkipReason, TableOutcome, TableTally};
pub use transfer::{migrate_table, TablePlan};
