// ABOUTME: PostgreSQL catalog introspection for the migration destination
// ABOUTME: Checks table existence and maps column names to their declared types

use crate::migration::destination::DestinationColumn;
use crate::utils::quote_identifier;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio_postgres::Client;

/// Schema searched for destination tables.
pub const DEFAULT_SCHEMA: &str = "public";

/// Check whether a table exists in the `public` schema
///
/// Matches the exact (case-sensitive) table name, the way it is stored in
/// the catalog.
pub async fn table_exists(client: &Client, table: &str) -> Result<bool> {
    let row = client
        .query_one(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema::text = $1
                  AND table_name::text = $2
             )",
            &[&DEFAULT_SCHEMA, &table],
        )
        .await
        .with_context(|| format!("Failed to check whether table '{}' exists", table))?;

    Ok(row.get(0))
}

/// Map each column of a destination table to its type
///
/// Columns the table does not have are simply absent from the map.
pub async fn column_types(
    client: &Client,
    table: &str,
) -> Result<HashMap<String, DestinationColumn>> {
    let rows = client
        .query(
            "SELECT column_name::text, data_type::text, udt_schema::text, udt_name::text
             FROM information_schema.columns
             WHERE table_schema::text = $1
               AND table_name::text = $2
             ORDER BY ordinal_position",
            &[&DEFAULT_SCHEMA, &table],
        )
        .await
        .with_context(|| format!("Failed to read column types of table '{}'", table))?;

    let columns = rows
        .iter()
        .map(|row| {
            let name: String = row.get(0);
            let data_type: String = row.get(1);
            let udt_schema: String = row.get(2);
            let udt_name: String = row.get(3);
            (
                name,
                DestinationColumn {
                    cast_type: cast_type_for(&udt_schema, &udt_name),
                    data_type,
                },
            )
        })
        .collect::<HashMap<_, _>>();

    tracing::debug!(
        "Destination table '{}' has {} columns",
        table,
        columns.len()
    );

    Ok(columns)
}

/// Build the type name used to cast bound text into a column
///
/// The underlying type (`udt_name`) is used rather than `data_type` so
/// arrays, enums and domains resolve. A bare `bit` cast would truncate to
/// one bit, so it is widened to `varbit` and the column enforces length.
pub fn cast_type_for(udt_schema: &str, udt_name: &str) -> String {
    let udt_name = match (udt_schema, udt_name) {
        ("pg_catalog", "bit") => "varbit",
        (_, name) => name,
    };
    format!(
        "{}.{}",
        quote_identifier(udt_schema),
        quote_identifier(udt_name)
    )
}
