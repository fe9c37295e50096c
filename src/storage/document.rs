//! Document store repository
//!
//! Hunters live as JSON bodies in the `hunters` collection. The collection
//! keeps an insertion sequence next to each generated id; "first match" and
//! listing order follow that sequence.
//!
//! Update and delete resolve the match and mutate it in one statement
//! (`UPDATE ... RETURNING` / `DELETE ... RETURNING`), so a record cannot vanish
//! between being found and being changed.

use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use super::connection::StoreHandle;
use super::{not_found, HunterRepository};
use crate::hunter::{DocumentId, Hunter, HunterDraft, HunterPatch, StoredDocument};
use crate::Result;

/// SQL to create the collection. Bodies are free-form JSON objects.
const CREATE_COLLECTION: &str = r#"
CREATE TABLE IF NOT EXISTS hunters (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    body TEXT NOT NULL
)
"#;

const FIRST_MATCH: &str =
    "SELECT seq FROM hunters WHERE name_contains(?1, json_extract(body, '$.name')) ORDER BY seq LIMIT 1";

/// Repository over the document collection
#[derive(Clone)]
pub struct DocumentRepository {
    store: StoreHandle,
}

impl DocumentRepository {
    /// Connect to the document store named by `uri`.
    pub async fn connect(uri: Option<&str>, timeout: Duration) -> Result<Self> {
        let store = StoreHandle::connect("document", uri, timeout).await?;
        Self::with_store(store).await
    }

    /// Open a private in-memory collection (for testing)
    pub async fn in_memory() -> Result<Self> {
        Self::with_store(StoreHandle::open_in_memory("document")?).await
    }

    async fn with_store(store: StoreHandle) -> Result<Self> {
        // Collections come into existence on first use, as in any document store
        store
            .call(|conn| {
                conn.execute_batch(CREATE_COLLECTION)?;
                Ok(())
            })
            .await?;
        Ok(Self { store })
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Number of documents in the collection
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
impl HunterRepository for DocumentRepository {
    type Id = DocumentId;

    fn store_name(&self) -> &'static str {
        "document"
    }

    async fn list_all(&self) -> Result<Vec<StoredDocument>> {
        let raw = self
            .store
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, body FROM hunters ORDER BY seq")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        raw.into_iter().map(|(id, body)| decode(id, &body)).collect()
    }

    async fn find_by_name_fragment(&self, fragment: &str) -> Result<StoredDocument> {
        let needle = fragment.to_string();
        let raw = self
            .store
            .call(move |conn| {
                let sql = format!("SELECT id, body FROM hunters WHERE seq = ({})", FIRST_MATCH);
                let row = conn
                    .query_row(&sql, [&needle], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })
                    .optional()?;
                Ok(row)
            })
            .await?;

        match raw {
            Some((id, body)) => decode(id, &body),
            None => Err(not_found(fragment)),
        }
    }

    async fn create(&self, draft: HunterDraft) -> Result<StoredDocument> {
        let hunter = draft.validate()?;
        let id = DocumentId::generate();
        let body = serde_json::to_string(&hunter)?;

        let key = id.clone();
        self.store
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO hunters (id, body) VALUES (?1, ?2)",
                    params![key.as_str(), body],
                )?;
                Ok(())
            })
            .await?;

        tracing::debug!(store = "document", id = %id, name = %hunter.name, "hunter created");
        Ok(StoredDocument::new(id, hunter))
    }

    async fn update_by_name_fragment(&self, fragment: &str, patch: HunterPatch) -> Result<StoredDocument> {
        patch.validate()?;
        // Merge-patch: keys absent from the patch keep their stored values
        let merge = serde_json::to_string(&patch)?;
        let needle = fragment.to_string();

        let raw = self
            .store
            .call(move |conn| {
                let sql = format!(
                    "UPDATE hunters SET body = json_patch(body, ?2) WHERE seq = ({}) RETURNING id, body",
                    FIRST_MATCH
                );
                let row = conn
                    .query_row(&sql, params![needle, merge], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })
                    .optional()?;
                Ok(row)
            })
            .await?;

        match raw {
            Some((id, body)) => {
                tracing::debug!(store = "document", id = %id, fragment, "hunter updated");
                decode(id, &body)
            }
            None => Err(not_found(fragment)),
        }
    }

    async fn delete_by_name_fragment(&self, fragment: &str) -> Result<StoredDocument> {
        let needle = fragment.to_string();
        let raw = self
            .store
            .call(move |conn| {
                let sql = format!("DELETE FROM hunters WHERE seq = ({}) RETURNING id, body", FIRST_MATCH);
                let row = conn
                    .query_row(&sql, [&needle], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })
                    .optional()?;
                Ok(row)
            })
            .await?;

        match raw {
            Some((id, body)) => {
                tracing::debug!(store = "document", id = %id, fragment, "hunter deleted");
                decode(id, &body)
            }
            None => Err(not_found(fragment)),
        }
    }
}

fn decode(id: String, body: &str) -> Result<StoredDocument> {
    let hunter: Hunter = serde_json::from_str(body)?;
    Ok(StoredDocument::new(DocumentId(id), hunter))
}
