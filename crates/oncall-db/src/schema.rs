//! Team table definition and the versioned migration runner.
//!
//! The team table is SCHEMALESS with typed top-level fields: the
//! manager and rotation lists are arrays of small objects and are
//! stored as-is.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

const SCHEMA_V1: &str = "\
DEFINE TABLE team_rotation SCHEMALESS;
DEFINE FIELD team ON TABLE team_rotation TYPE string;
DEFINE FIELD managers ON TABLE team_rotation TYPE array DEFAULT [];
DEFINE FIELD rotation ON TABLE team_rotation TYPE array DEFAULT [];
DEFINE FIELD updated ON TABLE team_rotation TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_by ON TABLE team_rotation TYPE string DEFAULT '';
DEFINE INDEX idx_team_rotation_team ON TABLE team_rotation \
    COLUMNS team UNIQUE;
";

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Ascending by version.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "team_rotation",
    sql: SCHEMA_V1,
}];

#[derive(Debug, SurrealValue)]
struct AppliedMigration {
    version: u32,
}

/// Highest migration version recorded in `_migration`, or 0.
async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut response = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let rows: Vec<AppliedMigration> = response.take(0)?;
    Ok(rows.first().map_or(0, |r| r.version))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    let failed = |stage: &str, e: surrealdb::Error| {
        DbError::Migration(format!(
            "v{} ({}) {stage}: {e}",
            migration.version, migration.name
        ))
    };

    db.query(migration.sql)
        .await?
        .check()
        .map_err(|e| failed("apply", e))?;
    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| failed("record", e))?;
    Ok(())
}

/// Bring the database up to the latest schema version.
///
/// Safe to call on every start: versions already recorded in
/// `_migration` are skipped.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current = applied_version(db).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        debug!(version = current, "Schema is up to date");
        return Ok(());
    }

    for migration in pending {
        info!(
            from = current,
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply(db, migration).await?;
    }
    Ok(())
}

pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
