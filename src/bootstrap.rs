//! Connection bootstrap
//!
//! Connects both stores, synchronizes the relational schema and hands back a
//! [`HunterContext`] for the HTTP layer. A store that cannot be reached is
//! logged and left out; the service still starts and requests that need the
//! missing store fail individually.

use std::sync::Arc;

use crate::config::HunterConfig;
use crate::storage::{DocumentRepository, RelationalRepository, SyncOutcome};
use crate::{Error, Result};

/// Store handles shared by every request.
#[derive(Clone, Default)]
pub struct HunterContext {
    documents: Option<Arc<DocumentRepository>>,
    relational: Option<Arc<RelationalRepository>>,
}

impl HunterContext {
    pub fn new(documents: Option<DocumentRepository>, relational: Option<RelationalRepository>) -> Self {
        Self {
            documents: documents.map(Arc::new),
            relational: relational.map(Arc::new),
        }
    }

    /// Context over private in-memory stores (for testing)
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(
            Some(DocumentRepository::in_memory().await?),
            Some(RelationalRepository::in_memory().await?),
        ))
    }

    /// Document repository, or `Connectivity` when it failed to connect.
    pub fn documents(&self) -> Result<&DocumentRepository> {
        self.documents
            .as_deref()
            .ok_or_else(|| Error::Connectivity("document store is unavailable".to_string()))
    }

    /// Relational repository, or `Connectivity` when it failed to connect.
    pub fn relational(&self) -> Result<&RelationalRepository> {
        self.relational
            .as_deref()
            .ok_or_else(|| Error::Connectivity("relational store is unavailable".to_string()))
    }

    pub fn is_degraded(&self) -> bool {
        self.documents.is_none() || self.relational.is_none()
    }
}

/// Per-store result of a bootstrap run
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub document: std::result::Result<(), String>,
    pub relational: std::result::Result<SyncOutcome, String>,
}

/// Connect both stores and run the relational sync to completion.
///
/// Never fails: each store's problem is logged and recorded in the report.
pub async fn connect(config: &HunterConfig) -> (HunterContext, BootstrapReport) {
    let timeout = config.store_timeout();

    let (documents, document) =
        match DocumentRepository::connect(config.document_uri.as_deref(), timeout).await {
            Ok(repo) => (Some(repo), Ok(())),
            Err(e) => {
                tracing::error!(store = "document", error = %e, "document store connection failed");
                (None, Err(e.to_string()))
            }
        };

    let (relational, outcome) = match connect_relational(config).await {
        Ok((repo, outcome)) => (Some(repo), Ok(outcome)),
        Err((repo, e)) => {
            tracing::error!(store = "relational", error = %e, "relational store sync failed");
            (repo, Err(e.to_string()))
        }
    };

    let context = HunterContext::new(documents, relational);
    if context.is_degraded() {
        tracing::warn!("starting in degraded mode");
    }

    (
        context,
        BootstrapReport {
            document,
            relational: outcome,
        },
    )
}

/// A repository that connected but failed to sync is still returned with the
/// error; its table may be usable even if it does not match the declaration.
async fn connect_relational(
    config: &HunterConfig,
) -> std::result::Result<(RelationalRepository, SyncOutcome), (Option<RelationalRepository>, Error)> {
    let repo = RelationalRepository::connect(config.relational_url.as_deref(), config.store_timeout())
        .await
        .map_err(|e| (None, e))?;

    match repo.sync().await {
        Ok(outcome) => Ok((repo, outcome)),
        Err(e) => Err((Some(repo), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(dir: &std::path::Path) -> HunterConfig {
        HunterConfig {
            document_uri: Some(format!("sqlite://{}", dir.join("documents.db").display())),
            relational_url: Some(format!("sqlite://{}", dir.join("relational.db").display())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connects_and_syncs_both_stores() {
        let dir = tempfile::tempdir().unwrap();
        let (context, report) = connect(&config_for(dir.path())).await;

        assert!(!context.is_degraded());
        assert!(report.document.is_ok());
        assert_eq!(report.relational.unwrap(), SyncOutcome::Created);

        let (_, again) = connect(&config_for(dir.path())).await;
        assert_eq!(again.relational.unwrap(), SyncOutcome::Verified);
    }

    #[tokio::test]
    async fn test_missing_relational_url_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.relational_url = None;

        let (context, report) = connect(&config).await;

        assert!(context.is_degraded());
        assert!(context.documents().is_ok());
        assert!(matches!(context.relational(), Err(Error::Connectivity(_))));
        assert!(report.relational.is_err());
    }

    #[tokio::test]
    async fn test_missing_document_uri_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.document_uri = Some("mongodb://localhost:27017/hunters".to_string());

        let (context, report) = connect(&config).await;

        assert!(matches!(context.documents(), Err(Error::Connectivity(_))));
        assert!(context.relational().is_ok());
        assert!(report.document.is_err());
    }

    #[tokio::test]
    async fn test_incompatible_table_keeps_store_but_reports() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        {
            let conn = rusqlite::Connection::open(dir.path().join("relational.db")).unwrap();
            conn.execute_batch("CREATE TABLE hunters (id INTEGER PRIMARY KEY, name TEXT)")
                .unwrap();
        }

        let (context, report) = connect(&config).await;

        assert!(context.relational().is_ok());
        assert!(report.relational.unwrap_err().contains("missing columns"));
    }
}
