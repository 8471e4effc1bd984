// ABOUTME: PostgreSQL destination for the migration
// ABOUTME: Wraps a tokio-postgres client behind the Destination trait

pub mod connection;
pub mod schema;
pub mod writer;

pub use connection::connect;

use crate::config::DestinationConfig;
use crate::migration::destination::{Destination, DestinationColumn, RowOutcome};
use crate::sqlite::converter::PgValue;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio_postgres::Client;
use writer::InsertStatement;

/// A live PostgreSQL connection in autocommit mode
///
/// No transaction is ever opened, so each insert commits on its own and a
/// failing row cannot undo the rows before it.
pub struct PostgresDestination {
    client: Client,
}

impl PostgresDestination {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the destination settings
    pub async fn connect(config: &DestinationConfig) -> Result<Self> {
        let client = connect(&config.to_pg_config())
            .await
            .with_context(|| format!("Failed to connect to PostgreSQL at {}", config))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Destination for PostgresDestination {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        schema::table_exists(&self.client, table).await
    }

    async fn column_types(&self, table: &str) -> Result<HashMap<String, DestinationColumn>> {
        schema::column_types(&self.client, table).await
    }

    async fn insert_row(&self, insert: &InsertStatement, values: &[PgValue]) -> Result<RowOutcome> {
        writer::insert_row(&self.client, insert, values).await
    }

    async fn rollback(&self) -> Result<()> {
        self.client
            .batch_execute("ROLLBACK")
            .await
            .context("Failed to roll back destination connection")
    }

    fn is_connected(&self) -> bool {
        !self.client.is_closed()
    }
}
