//! Relational store repository
//!
//! Rows carry their own auto-increment id, independent of document ids.
//! Request handlers never write here; the CRUD surface mirrors the document
//! repository so a synchronization path can be added without new queries.

use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use super::connection::StoreHandle;
use super::schema::{self, SyncOutcome};
use super::{not_found, HunterRepository};
use crate::hunter::{Hunter, HunterDraft, HunterPatch, RowId, StoredRow};
use crate::{Error, Result};

const SELECT_COLUMNS: &str = "id, name, age, height, weight, image_url";

const FIRST_MATCH: &str = "SELECT id FROM hunters WHERE name_contains(?1, name) ORDER BY id LIMIT 1";

// COALESCE keeps the stored value for every NULL (absent) patch field
const PATCH_ASSIGNMENTS: &str = "name = COALESCE(?2, name), age = COALESCE(?3, age), \
     height = COALESCE(?4, height), weight = COALESCE(?5, weight), \
     image_url = COALESCE(?6, image_url)";

/// Repository over the relational table
#[derive(Clone)]
pub struct RelationalRepository {
    store: StoreHandle,
}

impl RelationalRepository {
    /// Connect to the relational store named by `uri`. The schema is not
    /// touched; call [`RelationalRepository::sync`] before use.
    pub async fn connect(uri: Option<&str>, timeout: Duration) -> Result<Self> {
        let store = StoreHandle::connect("relational", uri, timeout).await?;
        Ok(Self { store })
    }

    /// Open a private in-memory table, already synchronized (for testing)
    pub async fn in_memory() -> Result<Self> {
        let repo = Self {
            store: StoreHandle::open_in_memory("relational")?,
        };
        repo.sync().await?;
        Ok(repo)
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Create the table if absent, otherwise verify it.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let outcome = self.store.call(schema::sync).await?;
        tracing::info!(store = "relational", table = schema::TABLE, %outcome, "schema synchronized");
        Ok(outcome)
    }

    pub async fn get(&self, id: RowId) -> Result<StoredRow> {
        let sql = format!("SELECT {} FROM hunters WHERE id = ?1", SELECT_COLUMNS);
        self.store
            .call(move |conn| Ok(conn.query_row(&sql, [id.0], read_row).optional()?))
            .await?
            .ok_or_else(|| Error::NotFound(format!("no hunter row with id {}", id)))
    }

    pub async fn update(&self, id: RowId, patch: HunterPatch) -> Result<StoredRow> {
        patch.validate()?;
        let sql = format!(
            "UPDATE hunters SET {} WHERE id = ?1 RETURNING {}",
            PATCH_ASSIGNMENTS, SELECT_COLUMNS
        );
        self.store
            .call(move |conn| {
                Ok(apply_patch(conn, &sql, &id.0, &patch)?)
            })
            .await?
            .ok_or_else(|| Error::NotFound(format!("no hunter row with id {}", id)))
    }

    pub async fn delete(&self, id: RowId) -> Result<StoredRow> {
        let sql = format!("DELETE FROM hunters WHERE id = ?1 RETURNING {}", SELECT_COLUMNS);
        self.store
            .call(move |conn| Ok(conn.query_row(&sql, [id.0], read_row).optional()?))
            .await?
            .ok_or_else(|| Error::NotFound(format!("no hunter row with id {}", id)))
    }

    /// Number of rows in the table
    pub async fn count(&self) -> Result<usize> {
        self.store
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM hunters", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
    }
}

#[async_trait]
impl HunterRepository for RelationalRepository {
    type Id = RowId;

    fn store_name(&self) -> &'static str {
        "relational"
    }

    async fn list_all(&self) -> Result<Vec<StoredRow>> {
        let sql = format!("SELECT {} FROM hunters ORDER BY id", SELECT_COLUMNS);
        self.store
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
    }

    async fn find_by_name_fragment(&self, fragment: &str) -> Result<StoredRow> {
        let sql = format!("SELECT {} FROM hunters WHERE id = ({})", SELECT_COLUMNS, FIRST_MATCH);
        let needle = fragment.to_string();
        self.store
            .call(move |conn| Ok(conn.query_row(&sql, [&needle], read_row).optional()?))
            .await?
            .ok_or_else(|| not_found(fragment))
    }

    async fn create(&self, draft: HunterDraft) -> Result<StoredRow> {
        let hunter = draft.validate()?;
        let row = hunter.clone();
        let id = self
            .store
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO hunters (name, age, height, weight, image_url) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![row.name, row.age, row.height, row.weight, row.image_url],
                )?;
                Ok(RowId(conn.last_insert_rowid()))
            })
            .await?;

        tracing::debug!(store = "relational", id = %id, name = %hunter.name, "hunter created");
        Ok(StoredRow::new(id, hunter))
    }

    async fn update_by_name_fragment(&self, fragment: &str, patch: HunterPatch) -> Result<StoredRow> {
        patch.validate()?;
        let sql = format!(
            "UPDATE hunters SET {} WHERE id = ({}) RETURNING {}",
            PATCH_ASSIGNMENTS, FIRST_MATCH, SELECT_COLUMNS
        );
        let needle = fragment.to_string();
        self.store
            .call(move |conn| {
                Ok(apply_patch(conn, &sql, &needle, &patch)?)
            })
            .await?
            .ok_or_else(|| not_found(fragment))
    }

    async fn delete_by_name_fragment(&self, fragment: &str) -> Result<StoredRow> {
        let sql = format!(
            "DELETE FROM hunters WHERE id = ({}) RETURNING {}",
            FIRST_MATCH, SELECT_COLUMNS
        );
        let needle = fragment.to_string();
        self.store
            .call(move |conn| Ok(conn.query_row(&sql, [&needle], read_row).optional()?))
            .await?
            .ok_or_else(|| not_found(fragment))
    }
}

/// Run a patch statement binding `key` as ?1 and the patch fields as ?2..?6
/// (NULL when absent).
fn apply_patch(
    conn: &Connection,
    sql: &str,
    key: &dyn ToSql,
    patch: &HunterPatch,
) -> rusqlite::Result<Option<StoredRow>> {
    conn.query_row(
        sql,
        params![key, patch.name, patch.age, patch.height, patch.weight, patch.image_url],
        read_row,
    )
    .optional()
}

fn read_row(row: &Row) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow::new(
        RowId(row.get(0)?),
        Hunter {
            name: row.get(1)?,
            age: row.get(2)?,
            height: row.get(3)?,
            weight: row.get(4)?,
            image_url: row.get(5)?,
        },
    ))
}
