// ABOUTME: PostgreSQL connection setup for the migration destination
// ABOUTME: Applies keepalive and timeout settings, negotiates TLS, and explains connect failures

use anyhow::{Context, Result};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;
use tokio_postgres::Client;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const KEEPALIVE_IDLE: Duration = Duration::from_secs(60);

/// Apply TCP keepalive and connect-timeout settings to a configuration
///
/// Keepalives stop load balancers from dropping the connection while a
/// large table is being read from SQLite. The timeout makes an unreachable
/// server fail fast instead of hanging the run.
pub fn with_connection_defaults(config: &tokio_postgres::Config) -> tokio_postgres::Config {
    let mut config = config.clone();
    config.keepalives(true);
    config.keepalives_idle(KEEPALIVE_IDLE);
    if config.get_connect_timeout().is_none() {
        config.connect_timeout(CONNECT_TIMEOUT);
    }
    config
}

/// Connect to PostgreSQL with TLS support
///
/// TLS is negotiated when the server offers it (the default `prefer` SSL
/// mode), so a local development server without certificates still
/// accepts the connection. The connection task is spawned onto the
/// current runtime; it ends when the returned client is dropped.
///
/// # Errors
///
/// Returns an error with a human-readable explanation if authentication
/// fails, the database does not exist, the server is unreachable, TLS
/// negotiation fails, or the connection times out.
pub async fn connect(config: &tokio_postgres::Config) -> Result<Client> {
    let config = with_connection_defaults(config);

    let tls_connector = TlsConnector::builder()
        .danger_accept_invalid_certs(false)
        .build()
        .context("Failed to build TLS connector")?;
    let tls = MakeTlsConnector::new(tls_connector);

    let (client, connection) = config
        .connect(tls)
        .await
        .map_err(|e| explain_connect_error(&e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    Ok(client)
}

/// Turn a raw driver error message into an actionable one
pub fn explain_connect_error(error_msg: &str) -> anyhow::Error {
    if error_msg.contains("password authentication failed") {
        anyhow::anyhow!(
            "Authentication failed: Invalid username or password.\n\
             Please verify DATABASE_USERNAME and DATABASE_PASSWORD."
        )
    } else if error_msg.contains("database") && error_msg.contains("does not exist") {
        anyhow::anyhow!(
            "Database does not exist: {}\n\
             Please create the database and its schema first.",
            error_msg
        )
    } else if error_msg.contains("Connection refused") || error_msg.contains("could not connect")
    {
        anyhow::anyhow!(
            "Connection refused: Unable to reach database server.\n\
             Please check:\n\
             - DATABASE_HOST and DATABASE_PORT are correct\n\
             - The database server is running\n\
             - Firewall rules allow connections\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("timeout") || error_msg.contains("timed out") {
        anyhow::anyhow!(
            "Connection timeout: Database server did not respond in time.\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("SSL") || error_msg.contains("TLS") {
        anyhow::anyhow!(
            "TLS/SSL error: Failed to establish secure connection.\n\
             Error: {}",
            error_msg
        )
    } else if error_msg.contains("no pg_hba.conf entry") {
        anyhow::anyhow!(
            "Access denied: No pg_hba.conf entry for host.\n\
             The database server is not configured to accept connections from your host.\n\
             Error: {}",
            error_msg
        )
    } else {
        anyhow::anyhow!("Failed to connect to database: {}", error_msg)
    }
}
