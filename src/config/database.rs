//! Database configuration module for `EcoTrack`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! models without hand-written SQL. Creation uses `IF NOT EXISTS` and is safe
//! to run on every start-up.

use crate::entities::{
    Achievement, Activity, Challenge, Community, CommunityMember, Emission, User,
    UserAchievement, UserChallenge,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
    sea_query::TableCreateStatement,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database: {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

fn table_for<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    statement
}

/// Creates all necessary database tables from the entity definitions.
///
/// Parent tables are created before the tables that reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements = [
        table_for(&schema, User),
        table_for(&schema, Achievement),
        table_for(&schema, Community),
        table_for(&schema, Activity),
        table_for(&schema, Emission),
        table_for(&schema, CommunityMember),
        table_for(&schema, Challenge),
        table_for(&schema, UserChallenge),
        table_for(&schema, UserAchievement),
    ];

    for statement in &statements {
        db.execute(builder.build(statement)).await?;
    }

    info!("Database tables ensured ({} tables).", statements.len());
    Ok(())
}

/// Directory that must exist before `SQLite` can create the database file.
///
/// Returns `None` for in-memory databases and bare file names.
#[must_use]
pub fn sqlite_parent_dir(database_url: &str) -> Option<PathBuf> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Connects and ensures the schema exists.
///
/// For file-backed `SQLite` URLs the parent directory is created first.
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(database_url) {
        std::fs::create_dir_all(&dir)?;
    }
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}
