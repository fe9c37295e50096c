//! Relational schema definitions and sync
//!
//! The relational table shares its name with the document collection. Sync
//! creates it when absent and otherwise only verifies it; it never alters or
//! drops anything.

use rusqlite::{Connection, OptionalExtension};

use crate::{Error, Result};

/// Table name, identical to the document collection name
pub const TABLE: &str = "hunters";

/// SQL to create the hunters table (no timestamp columns)
pub const CREATE_HUNTERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS hunters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    height REAL NOT NULL,
    weight REAL NOT NULL,
    image_url TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &["CREATE INDEX IF NOT EXISTS idx_hunters_name ON hunters(name)"];

/// Declared column set, in table order
pub const COLUMNS: &[&str] = &["id", "name", "age", "height", "weight", "image_url"];

/// What a sync run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Verified,
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOutcome::Created => write!(f, "created"),
            SyncOutcome::Verified => write!(f, "verified"),
        }
    }
}

/// Ensure the hunters table exists and is compatible.
pub fn sync(conn: &mut Connection) -> Result<SyncOutcome> {
    if !table_exists(conn, TABLE)? {
        let tx = conn.transaction()?;
        tx.execute_batch(CREATE_HUNTERS_TABLE)?;
        for stmt in CREATE_INDEXES {
            tx.execute(stmt, [])?;
        }
        tx.commit()?;
        return Ok(SyncOutcome::Created);
    }

    verify_columns(conn)?;
    for stmt in CREATE_INDEXES {
        conn.execute(stmt, [])?;
    }
    Ok(SyncOutcome::Verified)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Extra columns are tolerated; missing ones or a different primary key are not.
fn verify_columns(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("SELECT name, pk FROM pragma_table_info(?1)")?;
    let existing: Vec<(String, i64)> = stmt
        .query_map([TABLE], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;

    let missing: Vec<&str> = COLUMNS
        .iter()
        .copied()
        .filter(|column| !existing.iter().any(|(name, _)| name.eq_ignore_ascii_case(column)))
        .collect();
    if !missing.is_empty() {
        return Err(Error::SchemaMismatch(format!(
            "table {} is missing columns: {}",
            TABLE,
            missing.join(", ")
        )));
    }

    let id_is_key = existing
        .iter()
        .any(|(name, pk)| name.eq_ignore_ascii_case("id") && *pk == 1);
    if !id_is_key {
        return Err(Error::SchemaMismatch(format!(
            "table {} does not use id as its primary key",
            TABLE
        )));
    }

    Ok(())
}
