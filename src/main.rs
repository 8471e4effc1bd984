// ABOUTME: CLI entry point for sqlite-pg-migrate
// ABOUTME: Resolves configuration from file, environment, and flags, then runs one migration

use clap::Parser;
use sqlite_pg_migrate::config::MigrationConfig;
use sqlite_pg_migrate::filters::TableFilter;
use sqlite_pg_migrate::migration;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlite-pg-migrate")]
#[command(
    about = "Copy table data from a SQLite file into an existing PostgreSQL schema",
    long_about = None
)]
struct Cli {
    /// SQLite database file (overrides SQLITE_PATH)
    #[arg(long)]
    source: Option<PathBuf>,
    /// TOML file with [source], [destination] and [tables] sections
    #[arg(long)]
    config: Option<PathBuf>,
    /// PostgreSQL host (overrides DATABASE_HOST)
    #[arg(long)]
    host: Option<String>,
    /// PostgreSQL port (overrides DATABASE_PORT)
    #[arg(long)]
    port: Option<u16>,
    /// PostgreSQL database name (overrides DATABASE_NAME)
    #[arg(long)]
    database: Option<String>,
    /// PostgreSQL user (overrides DATABASE_USERNAME)
    #[arg(long)]
    user: Option<String>,
    /// PostgreSQL password (overrides DATABASE_PASSWORD)
    #[arg(long)]
    password: Option<String>,
    /// Migrate only these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    include_tables: Option<Vec<String>>,
    /// Skip these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude_tables: Option<Vec<String>>,
    /// Do not draw per-table progress bars
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn apply_to(self, config: &mut MigrationConfig) -> anyhow::Result<()> {
        if let Some(source) = self.source {
            config.source_path = source;
        }
        if let Some(host) = self.host {
            config.destination.host = host;
        }
        if let Some(port) = self.port {
            config.destination.port = port;
        }
        if let Some(database) = self.database {
            config.destination.database = database;
        }
        if let Some(user) = self.user {
            config.destination.user = user;
        }
        if let Some(password) = self.password {
            config.destination.password = password;
        }
        if self.include_tables.is_some() || self.exclude_tables.is_some() {
            config.tables = TableFilter::new(self.include_tables, self.exclude_tables)?;
        }
        if self.no_progress {
            config.show_progress = false;
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = MigrationConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config)?;

    migration::run(&config).await?;
    Ok(())
}
