//! Database configuration module for `EventEase`.
//!
//! This module handles `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models.

use crate::entities::{Account, Document};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::info;

/// Default `SQLite` location used when no database URL is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/eventease.sqlite?mode=rwc";

/// Opens a connection to `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the `documents` and `accounts` tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut document_table = schema.create_table_from_entity(Document);
    let mut account_table = schema.create_table_from_entity(Account);

    document_table.if_not_exists();
    account_table.if_not_exists();

    db.execute(builder.build(&document_table)).await?;
    db.execute(builder.build(&account_table)).await?;

    Ok(())
}
