//! SQLite connection helpers and the embedded schema migrations.
//!
//! Migrations are compiled into the binary and recorded by name in
//! `_migrations`; a database file can be opened by any later build.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;

use crate::error::AppError;

macro_rules! migration {
    ($name:literal) => {
        (
            $name,
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../migrations/", $name)),
        )
    };
}

/// Applied in order; never reorder or edit a shipped entry.
const MIGRATIONS: &[(&str, &str)] = &[
    migration!("0001_document_chunks.sql"),
    migration!("0002_ai_artifacts.sql"),
];

pub fn open(path: &Path) -> Result<Connection, AppError> {
    Connection::open(path).map_err(|e| {
        AppError::new("DB_OPEN_FAILED", "Failed to open SQLite database")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

pub fn open_in_memory() -> Result<Connection, AppError> {
    Connection::open_in_memory().map_err(|e| {
        AppError::new("DB_OPEN_FAILED", "Failed to open in-memory SQLite database")
            .with_details(e.to_string())
    })
}

/// Open (or create) the chunk database at `path` with the current schema.
///
/// Used by `SqliteEmbeddingStore::open`; a fresh file gets every migration,
/// an existing one only those it has not seen.
pub fn open_and_migrate(path: &Path) -> Result<Connection, AppError> {
    let mut conn = open(path)?;
    migrate(&mut conn)?;
    Ok(conn)
}

fn applied_migrations(conn: &Connection) -> Result<HashSet<String>, AppError> {
    let query_err = |e: rusqlite::Error| {
        AppError::new("DB_MIGRATIONS_QUERY_FAILED", "Failed to read applied migrations")
            .with_details(e.to_string())
    };
    let mut stmt = conn.prepare("SELECT name FROM _migrations").map_err(query_err)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(query_err)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(query_err)?;
    Ok(names)
}

/// Bring the schema up to date. Each pending migration runs in its own
/// transaction together with its `_migrations` row.
pub fn migrate(conn: &mut Connection) -> Result<(), AppError> {
    conn.execute_batch(
        r#"
      PRAGMA foreign_keys = ON;
      CREATE TABLE IF NOT EXISTS _migrations (
        name TEXT PRIMARY KEY NOT NULL,
        applied_at TEXT NOT NULL
      );
    "#,
    )
    .map_err(|e| {
        AppError::new(
            "DB_MIGRATIONS_TABLE_FAILED",
            "Failed to ensure migrations table exists",
        )
        .with_details(e.to_string())
    })?;

    let applied = applied_migrations(conn)?;
    let tx_err = |e: rusqlite::Error| {
        AppError::new("DB_TX_FAILED", "Migration transaction failed").with_details(e.to_string())
    };

    for &(name, sql) in MIGRATIONS.iter().filter(|(n, _)| !applied.contains(*n)) {
        let tx = conn.transaction().map_err(tx_err)?;
        tx.execute_batch(sql)
            .and_then(|_| {
                tx.execute(
                    "INSERT INTO _migrations(name, applied_at) VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
                    [name],
                )
            })
            .map_err(|e| {
                AppError::new("DB_MIGRATION_FAILED", format!("Migration {name} failed"))
                    .with_details(e.to_string())
            })?;
        tx.commit().map_err(tx_err)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::OptionalExtension;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .optional()
            .unwrap();
        name.as_deref() == Some(table)
    }

    #[test]
    fn migrations_create_expected_tables() {
        let mut conn = open_in_memory().expect("open");
        migrate(&mut conn).expect("migrate");

        assert!(table_exists(&conn, "document_chunks"));
        assert!(table_exists(&conn, "ai_artifacts"));
    }

    #[test]
    fn only_pending_migrations_run() {
        let mut conn = open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE _migrations (name TEXT PRIMARY KEY NOT NULL, applied_at TEXT NOT NULL);",
        )
        .expect("table");
        conn.execute_batch(MIGRATIONS[0].1).expect("0001");
        conn.execute(
            "INSERT INTO _migrations(name, applied_at) VALUES (?1, '2026-01-01T00:00:00Z')",
            [MIGRATIONS[0].0],
        )
        .expect("record");

        migrate(&mut conn).expect("migrate");
        assert!(table_exists(&conn, "ai_artifacts"));
        let first_applied: String = conn
            .query_row(
                "SELECT applied_at FROM _migrations WHERE name = ?1",
                [MIGRATIONS[0].0],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(first_applied, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn migrate_is_idempotent() {
        let mut conn = open_in_memory().expect("open");
        migrate(&mut conn).expect("migrate");
        migrate(&mut conn).expect("migrate again");

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 2);
    }
}
