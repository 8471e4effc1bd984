// ABOUTME: Library module for sqlite-pg-migrate
// ABOUTME: Exports the converter, both database adapters, and the migration driver

pub mod config;
pub mod filters;
pub mod migration;
pub mod postgres;
pub mod sqlite;
pub mod utils;
