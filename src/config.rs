// ABOUTME: Migration configuration with documented defaults for local development
// ABOUTME: Layers defaults, an optional TOML file, and environment variables into one struct

use crate::filters::TableFilter;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SQLITE_PATH: &str = ".tmp/data.db";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5433;
pub const DEFAULT_DATABASE: &str = "strapi";
pub const DEFAULT_USER: &str = "strapi";
pub const DEFAULT_PASSWORD: &str = "strapi";

pub const ENV_SQLITE_PATH: &str = "SQLITE_PATH";
pub const ENV_HOST: &str = "DATABASE_HOST";
pub const ENV_PORT: &str = "DATABASE_PORT";
pub const ENV_DATABASE: &str = "DATABASE_NAME";
pub const ENV_USER: &str = "DATABASE_USERNAME";
pub const ENV_PASSWORD: &str = "DATABASE_PASSWORD";

/// Connection parameters for the PostgreSQL destination
///
/// | Field      | Environment variable  | Default     |
/// |------------|-----------------------|-------------|
/// | `host`     | `DATABASE_HOST`       | `localhost` |
/// | `port`     | `DATABASE_PORT`       | `5433`      |
/// | `database` | `DATABASE_NAME`       | `strapi`    |
/// | `user`     | `DATABASE_USERNAME`   | `strapi`    |
/// | `password` | `DATABASE_PASSWORD`   | `strapi`    |
#[derive(Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}

impl DestinationConfig {
    /// Build the driver configuration
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password)
            .application_name("sqlite-pg-migrate");
        config
    }
}

impl fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

/// Everything a migration run needs, passed explicitly to the driver
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// SQLite source file (`SQLITE_PATH`, default `.tmp/data.db`)
    pub source_path: PathBuf,
    pub destination: DestinationConfig,
    pub tables: TableFilter,
    /// Draw a per-table progress bar on the terminal
    pub show_progress: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            destination: DestinationConfig::default(),
            tables: TableFilter::empty(),
            show_progress: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    source: SourceSection,
    #[serde(default)]
    destination: DestinationSection,
    #[serde(default)]
    tables: TablesSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DestinationSection {
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TablesSection {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

impl MigrationConfig {
    /// Load configuration: defaults, then the optional file, then the environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = config_file {
            config.apply_file(path)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply settings from a TOML file
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        self.apply_toml(&raw)
            .with_context(|| format!("Failed to parse TOML config at {}", path.display()))
    }

    /// Apply settings from TOML text
    ///
    /// ```toml
    /// [source]
    /// path = "data/app.db"
    ///
    /// [destination]
    /// host = "db.internal"
    /// port = 5432
    ///
    /// [tables]
    /// exclude = ["strapi_webhooks"]
    /// ```
    pub fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let parsed: ConfigFile = toml::from_str(raw)?;

        if let Some(path) = parsed.source.path {
            self.source_path = path;
        }

        let dest = parsed.destination;
        if let Some(host) = dest.host {
            self.destination.host = host;
        }
        if let Some(port) = dest.port {
            self.destination.port = port;
        }
        if let Some(database) = dest.database {
            self.destination.database = database;
        }
        if let Some(user) = dest.user {
            self.destination.user = user;
        }
        if let Some(password) = dest.password {
            self.destination.password = password;
        }

        if parsed.tables.include.is_some() || parsed.tables.exclude.is_some() {
            self.tables = TableFilter::new(parsed.tables.include, parsed.tables.exclude)?;
        }

        Ok(())
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Unset or empty variables leave the current value in place.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(path) = get(ENV_SQLITE_PATH) {
            self.source_path = PathBuf::from(path);
        }
        if let Some(host) = get(ENV_HOST) {
            self.destination.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.destination.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number, got '{}'", ENV_PORT, port))?;
        }
        if let Some(database) = get(ENV_DATABASE) {
            self.destination.database = database;
        }
        if let Some(user) = get(ENV_USER) {
            self.destination.user = user;
        }
        if let Some(password) = get(ENV_PASSWORD) {
            self.destination.password = password;
        }

        Ok(())
    }
}
