//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for named vector collections.

mod database;

pub use database::{CollectionDb, DATABASE_FILE};
