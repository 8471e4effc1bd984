// ABOUTME: Table include/exclude filtering for selective migration
// ABOUTME: Restricts which SQLite tables the driver visits

use anyhow::{bail, Result};

/// Which source tables a run should visit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
}

impl TableFilter {
    /// Creates a filter from CLI arguments or the config file
    pub fn new(
        include_tables: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
    ) -> Result<Self> {
        if include_tables.is_some() && exclude_tables.is_some() {
            bail!("Cannot use both --include-tables and --exclude-tables");
        }

        for table in include_tables.iter().chain(exclude_tables.iter()).flatten() {
            if table.trim().is_empty() {
                bail!("Table names in filters cannot be empty");
            }
        }

        Ok(Self {
            include_tables,
            exclude_tables,
        })
    }

    /// Creates an empty filter (migrate everything)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks if any filters are active
    pub fn is_empty(&self) -> bool {
        self.include_tables.is_none() && self.exclude_tables.is_none()
    }

    /// Determines if a table should be migrated
    pub fn should_migrate(&self, table: &str) -> bool {
        if let Some(ref include) = self.include_tables {
            if !include.iter().any(|t| t == table) {
                return false;
            }
        }

        if let Some(ref exclude) = self.exclude_tables {
            if exclude.iter().any(|t| t == table) {
                return false;
            }
        }

        true
    }

    /// Keeps the tables that pass the filter, preserving order
    pub fn apply(&self, tables: Vec<String>) -> Vec<String> {
        if self.is_empty() {
            return tables;
        }

        let (kept, dropped): (Vec<String>, Vec<String>) =
            tables.into_iter().partition(|t| self.should_migrate(t));
        if !dropped.is_empty() {
            tracing::info!("Filtered out {} tables: {:?}", dropped.len(), dropped);
        }
        kept
    }
}
