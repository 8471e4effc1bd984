// ABOUTME: In-memory destination used by engine and driver unit tests
// ABOUTME: Mimics primary-key conflicts, integer parse rejections, and dropped connections

use crate::migration::destination::{find_column, Destination, DestinationColumn, RowOutcome};
use crate::postgres::writer::InsertStatement;
use crate::sqlite::converter::PgValue;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Destination that keeps rows in memory
///
/// The first column of every table acts as its primary key.
#[derive(Default)]
pub struct MemoryDestination {
    tables: HashMap<String, HashMap<String, DestinationColumn>>,
    rows: Mutex<HashMap<String, Vec<Vec<PgValue>>>>,
    keys: Mutex<HashSet<(String, String)>>,
    last_sql: Mutex<Option<String>>,
    disconnect_after: Option<usize>,
    fail_lookups: bool,
    fail_column_types: bool,
    inserts: AtomicUsize,
    rollbacks: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)]) -> Self {
        let columns = columns
            .iter()
            .map(|(column, data_type)| {
                (
                    column.to_string(),
                    DestinationColumn {
                        data_type: data_type.to_string(),
                        cast_type: format!("\"pg_catalog\".\"{}\"", data_type),
                    },
                )
            })
            .collect();
        self.tables.insert(name.to_string(), columns);
        self
    }

    /// Drop the connection on the insert following the first `n`
    pub fn disconnect_after(mut self, n: usize) -> Self {
        self.disconnect_after = Some(n);
        self
    }

    /// Make catalog lookups fail while the connection stays up
    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    /// Make the column type lookup fail while the connection stays up
    pub fn failing_column_types(mut self) -> Self {
        self.fail_column_types = true;
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Vec<PgValue>> {
        self.rows
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.last_sql.lock().unwrap().clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("connection closed");
        }
        Ok(())
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        self.ensure_open()?;
        if self.fail_lookups {
            bail!("permission denied for schema public");
        }
        Ok(self.tables.contains_key(table))
    }

    async fn column_types(&self, table: &str) -> Result<HashMap<String, DestinationColumn>> {
        self.ensure_open()?;
        if self.fail_column_types {
            bail!("permission denied for table {}", table);
        }
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }

    async fn insert_row(&self, insert: &InsertStatement, values: &[PgValue]) -> Result<RowOutcome> {
        self.ensure_open()?;
        let done = self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.disconnect_after.is_some_and(|n| done >= n) {
            self.closed.store(true, Ordering::SeqCst);
            return Err(anyhow!("connection closed"));
        }

        *self.last_sql.lock().unwrap() = Some(insert.sql().to_string());

        let Some(columns) = self.tables.get(insert.table()) else {
            return Ok(RowOutcome::Failed(format!(
                "relation \"{}\" does not exist",
                insert.table()
            )));
        };

        for (name, value) in insert.columns().iter().zip(values) {
            let Some(column) = find_column(columns, name) else {
                return Ok(RowOutcome::Failed(format!(
                    "column \"{}\" of relation \"{}\" does not exist",
                    name,
                    insert.table()
                )));
            };
            if matches!(column.data_type.as_str(), "integer" | "bigint") {
                if let PgValue::Text(text) = value {
                    if text.parse::<i64>().is_err() {
                        return Ok(RowOutcome::Failed(format!(
                            "invalid input syntax for type integer: \"{}\"",
                            text
                        )));
                    }
                }
            }
        }

        let key = values.first().and_then(PgValue::to_text).unwrap_or_default();
        if !self
            .keys
            .lock()
            .unwrap()
            .insert((insert.table().to_string(), key))
        {
            return Ok(RowOutcome::Duplicate);
        }

        self.rows
            .lock()
            .unwrap()
            .entry(insert.table().to_string())
            .or_default()
            .push(values.to_vec());
        Ok(RowOutcome::Inserted)
    }

    async fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}
