// ABOUTME: Integration tests for SQLite-to-PostgreSQL migration workflow
// ABOUTME: Runs full migrations against real SQLite files and a PostgreSQL target

use rusqlite::Connection;
use sqlite_pg_migrate::config::MigrationConfig;
use sqlite_pg_migrate::migration::{self, Migrator, SkipReason, TableOutcome};
use sqlite_pg_migrate::postgres::{connect, PostgresDestination};
use sqlite_pg_migrate::sqlite::open_sqlite;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_postgres::Client;

/// Helper to get test PostgreSQL target URL from environment
fn get_test_target_url() -> Option<String> {
    env::var("TEST_TARGET_URL").ok()
}

/// Create a SQLite file in a fresh temp dir and run `sql` against it
fn create_sqlite_db(sql: &str) -> anyhow::Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.db");
    let conn = Connection::open(&path)?;
    conn.execute_batch(sql)?;
    conn.close().map_err(|(_, e)| e)?;
    Ok((dir, path))
}

async fn target_client(url: &str) -> anyhow::Result<Client> {
    connect(&url.parse()?).await
}

async fn migrator_for(url: &str, path: &Path) -> anyhow::Result<Migrator<PostgresDestination>> {
    let source = open_sqlite(path)?;
    let destination = PostgresDestination::new(target_client(url).await?);
    Ok(Migrator::new(source, destination))
}

#[tokio::test]
async fn test_unreachable_destination_is_fatal() {
    let (_dir, path) = create_sqlite_db(
        "CREATE TABLE users (id INTEGER PRIMARY KEY); INSERT INTO users VALUES (1);",
    )
    .unwrap();

    let mut config = MigrationConfig {
        source_path: path,
        show_progress: false,
        ..MigrationConfig::default()
    };
    config.destination.host = "127.0.0.1".to_string();
    config.destination.port = 1;

    let result = migration::run(&config).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_missing_source_is_fatal() {
    let config = MigrationConfig {
        source_path: PathBuf::from("/nonexistent/path/data.db"),
        show_progress: false,
        ..MigrationConfig::default()
    };

    let err = migration::run(&config).await.unwrap_err();
    assert!(format!("{:#}", err).to_lowercase().contains("sqlite"));
}

#[tokio::test]
#[ignore]
async fn test_full_migration_and_rerun() {
    let target_url = get_test_target_url().expect("TEST_TARGET_URL must be set");
    let client = target_client(&target_url).await.unwrap();
    client
        .batch_execute(
            "DROP TABLE IF EXISTS it_users;
             DROP TABLE IF EXISTS it_posts;
             CREATE TABLE it_users (
                 id integer PRIMARY KEY,
                 name text NOT NULL,
                 balance double precision,
                 avatar bytea
             );
             CREATE TABLE it_posts (
                 id integer PRIMARY KEY,
                 user_id integer,
                 title text NOT NULL,
                 published boolean
             );",
        )
        .await
        .unwrap();

    let (_dir, path) = create_sqlite_db(
        "CREATE TABLE it_users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, balance REAL, avatar BLOB);
         CREATE TABLE it_posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT NOT NULL, published INTEGER);
         CREATE TABLE it_not_in_target (id INTEGER PRIMARY KEY);
         INSERT INTO it_users VALUES
             (1, 'Alice', 100.5, X'48656c6c6f'),
             (2, 'Bob', 200.75, NULL),
             (3, 'Charlie', NULL, NULL);
         INSERT INTO it_posts VALUES (1, 1, 'First Post', 1), (2, 2, 'Bob Post', 0);
         INSERT INTO it_not_in_target VALUES (1);",
    )
    .unwrap();

    let migrator = migrator_for(&target_url, &path).await.unwrap();
    let first = migrator.run().await.unwrap();
    assert_eq!(first.total_migrated(), 5);
    assert_eq!(first.total_row_errors(), 0);
    assert_eq!(
        first.skipped_tables(),
        vec![("it_not_in_target", SkipReason::MissingDestination)]
    );

    let second = migrator.run().await.unwrap();
    assert_eq!(second.total_migrated(), 0);
    assert_eq!(second.total_duplicates(), 5);
    migrator.close();

    let count: i64 = client
        .query_one("SELECT COUNT(*) FROM it_users", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 3);

    let row = client
        .query_one("SELECT avatar, balance FROM it_users WHERE id = 1", &[])
        .await
        .unwrap();
    let avatar: Vec<u8> = row.get(0);
    let balance: f64 = row.get(1);
    assert_eq!(avatar, b"Hello");
    assert_eq!(balance, 100.5);

    let published: bool = client
        .query_one("SELECT published FROM it_posts WHERE id = 2", &[])
        .await
        .unwrap()
        .get(0);
    assert!(!published);
}

#[tokio::test]
#[ignore]
async fn test_reserved_column_and_typed_values() {
    let target_url = get_test_target_url().expect("TEST_TARGET_URL must be set");
    let client = target_client(&target_url).await.unwrap();
    client
        .batch_execute(
            "DROP TABLE IF EXISTS it_articles;
             CREATE TABLE it_articles (
                 id integer PRIMARY KEY,
                 \"order\" integer,
                 created_at timestamp(6) with time zone,
                 is_public boolean,
                 meta jsonb
             );",
        )
        .await
        .unwrap();

    let (_dir, path) = create_sqlite_db(
        "CREATE TABLE it_articles (id INTEGER PRIMARY KEY, \"order\" INTEGER, created_at DATETIME, is_public BOOLEAN, meta JSON);
         INSERT INTO it_articles VALUES (1, 3, 1700000000000, 1, '{\"tags\": [\"a\", \"b\"]}');
         INSERT INTO it_articles VALUES (2, 1, '2023-11-14 22:13:20', 0, NULL);",
    )
    .unwrap();

    let migrator = migrator_for(&target_url, &path).await.unwrap();
    let summary = migrator.run().await.unwrap();
    migrator.close();

    let TableOutcome::Migrated(tally) = &summary.tables[0].outcome else {
        panic!("expected it_articles to migrate: {:?}", summary.tables[0]);
    };
    assert_eq!(tally.inserted, 2);
    assert_eq!(tally.errors, 0);

    let row = client
        .query_one(
            "SELECT \"order\", extract(epoch FROM created_at)::bigint, is_public, meta->'tags'->>1
             FROM it_articles WHERE id = 1",
            &[],
        )
        .await
        .unwrap();
    let order: i32 = row.get(0);
    let epoch: i64 = row.get(1);
    let is_public: bool = row.get(2);
    let tag: String = row.get(3);
    assert_eq!(order, 3);
    assert_eq!(epoch, 1_700_000_000);
    assert!(is_public);
    assert_eq!(tag, "b");
}

#[tokio::test]
#[ignore]
async fn test_bad_row_does_not_stop_table() {
    let target_url = get_test_target_url().expect("TEST_TARGET_URL must be set");
    let client = target_client(&target_url).await.unwrap();
    client
        .batch_execute(
            "DROP TABLE IF EXISTS it_scores;
             CREATE TABLE it_scores (id integer PRIMARY KEY, points integer);",
        )
        .await
        .unwrap();

    let (_dir, path) = create_sqlite_db(
        "CREATE TABLE it_scores (id INTEGER PRIMARY KEY, points TEXT);
         INSERT INTO it_scores VALUES (1, '10'), (2, 'ten'), (3, '30');",
    )
    .unwrap();

    let migrator = migrator_for(&target_url, &path).await.unwrap();
    let summary = migrator.run().await.unwrap();
    migrator.close();

    assert_eq!(summary.total_migrated(), 2);
    assert_eq!(summary.total_row_errors(), 1);

    let count: i64 = client
        .query_one("SELECT COUNT(*) FROM it_scores", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 2);
}
