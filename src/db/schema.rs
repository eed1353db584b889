use rusqlite::Connection;

use super::StoreError;

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "001",
    name: "initial",
    sql: include_str!("migrations/001_initial.sql"),
}];

/// Version of the newest migration this build knows about.
pub fn latest_version() -> &'static str {
    MIGRATIONS.last().map(|m| m.version).unwrap_or("000")
}

pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let applied = get_applied_migrations(conn)?;

    for migration in MIGRATIONS {
        if !applied.iter().any(|v| v == migration.version) {
            apply_migration(conn, migration)?;
        }
    }

    Ok(())
}

/// Fail unless the store was written by a build with the same schema.
pub fn check_current(conn: &Connection) -> Result<(), StoreError> {
    let has_table: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
        [],
        |row| row.get(0),
    )?;
    if has_table == 0 {
        return Err(StoreError::Corrupt(
            "missing schema_migrations table".to_string(),
        ));
    }

    let applied = get_applied_migrations(conn)?;
    match applied.last() {
        Some(version) if version == latest_version() => Ok(()),
        Some(version) => Err(StoreError::Corrupt(format!(
            "unsupported schema version {} (expected {})",
            version,
            latest_version()
        ))),
        None => Err(StoreError::Corrupt("no schema migrations applied".to_string())),
    }
}

fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}

fn mark_migration_applied(conn: &Connection, version: &str, name: &str) -> Result<(), StoreError> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (version, name, &now),
    )?;
    Ok(())
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<(), StoreError> {
    tracing::debug!(
        "Applying migration {}: {}",
        migration.version,
        migration.name
    );

    conn.execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", migration.sql))?;

    mark_migration_applied(conn, migration.version, migration.name)?;
    Ok(())
}
