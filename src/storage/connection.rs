//! Long-lived store connections
//!
//! Each store owns exactly one SQLite connection for the life of the process.
//! Calls are moved onto the blocking pool and bounded by a timeout, so a stuck
//! backend surfaces as `Error::Timeout` instead of hanging a request.
//!
//! A timeout abandons the caller, not the work. The blocking task keeps the
//! connection lock until its statement returns, so calls issued meanwhile
//! time out as well, and a write that timed out may still commit.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use super::matcher;
use crate::{Error, Result};

/// Where a store lives, parsed from a `sqlite://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    /// Accepts `sqlite::memory:`, `sqlite://<path>` and `file:<path>`.
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri == "sqlite::memory:" || uri == ":memory:" {
            return Ok(StoreLocation::Memory);
        }

        let path = uri
            .strip_prefix("sqlite://")
            .or_else(|| uri.strip_prefix("file:"))
            .ok_or_else(|| Error::Connectivity(format!("unsupported store URI '{}'", uri)))?;

        if path.is_empty() {
            return Err(Error::Connectivity(format!("store URI '{}' has no path", uri)));
        }
        Ok(StoreLocation::File(PathBuf::from(path)))
    }
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreLocation::Memory => write!(f, "sqlite::memory:"),
            StoreLocation::File(path) => write!(f, "sqlite://{}", path.display()),
        }
    }
}

/// Shared handle over one store connection.
#[derive(Clone)]
pub struct StoreHandle {
    label: &'static str,
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl StoreHandle {
    /// Open and probe a store. A missing URI, an unsupported scheme or a
    /// failed probe all fail with `Error::Connectivity`.
    pub async fn connect(label: &'static str, uri: Option<&str>, timeout: Duration) -> Result<Self> {
        let uri = uri.ok_or_else(|| {
            Error::Connectivity(format!("{} store URI is not configured", label))
        })?;
        let location = StoreLocation::parse(uri)?;

        let started_at = Instant::now();
        let target = location.clone();
        let task = tokio::task::spawn_blocking(move || open_connection(&target, timeout));
        let conn = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join)) => {
                return Err(Error::Connectivity(format!("{} store open task failed: {}", label, join)));
            }
            Err(_) => {
                return Err(Error::Connectivity(format!(
                    "{} store did not answer within {:?}",
                    label, timeout
                )));
            }
        };

        tracing::info!(
            store = label,
            location = %location,
            duration_ms = started_at.elapsed().as_millis() as u64,
            "store connected"
        );

        Ok(Self {
            label,
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Open a private in-memory store (for testing and ephemeral runs)
    pub fn open_in_memory(label: &'static str) -> Result<Self> {
        let timeout = Duration::from_secs(5);
        let conn = open_connection(&StoreLocation::Memory, timeout)?;
        Ok(Self {
            label,
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Run `op` against the connection on the blocking pool.
    pub async fn call<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Backend("store connection lock poisoned".to_string()))?;
            op(&mut guard)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(Error::Backend(format!("{} store task failed: {}", self.label, join))),
            Err(_) => {
                tracing::warn!(store = self.label, timeout = ?self.timeout, "store call timed out");
                Err(Error::Timeout(self.timeout))
            }
        }
    }
}

fn open_connection(location: &StoreLocation, timeout: Duration) -> Result<Connection> {
    let conn = match location {
        StoreLocation::Memory => Connection::open_in_memory(),
        StoreLocation::File(path) => {
            ensure_parent_dir(path)?;
            Connection::open(path)
        }
    }
    .map_err(|e| Error::Connectivity(format!("cannot open {}: {}", location, e)))?;

    conn.busy_timeout(timeout)
        .and_then(|_| matcher::register(&conn))
        .map_err(|e| Error::Connectivity(format!("cannot configure {}: {}", location, e)))?;

    // Opening is lazy; the probe is what actually touches the file.
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map_err(|e| Error::Connectivity(format!("probe of {} failed: {}", location, e)))?;

    Ok(conn)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Connectivity(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locations() {
        assert_eq!(StoreLocation::parse("sqlite::memory:").unwrap(), StoreLocation::Memory);
        assert_eq!(
            StoreLocation::parse("sqlite://data/docs.db").unwrap(),
            StoreLocation::File(PathBuf::from("data/docs.db"))
        );
        assert_eq!(
            StoreLocation::parse("file:/tmp/rows.db").unwrap(),
            StoreLocation::File(PathBuf::from("/tmp/rows.db"))
        );
    }

    #[test]
    fn test_parse_rejects_foreign_schemes() {
        let err = StoreLocation::parse("mongodb://localhost:27017").unwrap_err();
        assert!(matches!(err, Error::Connectivity(_)));
        assert!(matches!(StoreLocation::parse("sqlite://"), Err(Error::Connectivity(_))));
    }

    #[tokio::test]
    async fn test_connect_without_uri_is_connectivity_error() {
        let err = StoreHandle::connect("document", None, Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connectivity(_)));
    }

    #[tokio::test]
    async fn test_connect_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("sqlite://{}", dir.path().join("nested/rows.db").display());

        let handle = StoreHandle::connect("relational", Some(&uri), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(dir.path().join("nested").exists());

        let one = handle
            .call(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
            .await
            .unwrap();
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn test_slow_call_times_out_until_lock_is_released() {
        let mut handle = StoreHandle::open_in_memory("document").unwrap();
        handle.timeout = Duration::from_millis(50);

        let err = handle
            .call(|_| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(t) if t == Duration::from_millis(50)));
        assert!(err.is_storage());

        // The abandoned task still holds the connection
        let blocked = handle.call(|_| Ok(())).await;
        assert!(matches!(blocked, Err(Error::Timeout(_))));

        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.call(|_| Ok(())).await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_to_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let uri = format!("sqlite://{}", blocker.join("rows.db").display());

        let err = StoreHandle::connect("relational", Some(&uri), Duration::from_secs(5))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connectivity(_)));
    }
}
