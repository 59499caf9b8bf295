//! SQLite implementation of the `StudentsStore` port.
//!
//! Two connection modes:
//! - `PerRequest`: every `connect()` opens a fresh single-connection handle.
//! - `Shared`: one handle opened up front and cloned per call.
//!
//! Both run the migrator on each `connect()`. In-memory databases are always shared,
//! they vanish with their last connection.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ConnectionMode;
use crate::domain::repo::{StudentsRepository, StudentsStore};
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::sea_orm_repo::SeaOrmStudentsRepository;

/// Keeps the single in-memory connection alive for the process lifetime.
const MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to connect to database '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: DbErr,
    },

    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to migrate database: {0}")]
    Migrate(#[source] DbErr),
}

/// Connection parameters, already resolved by the host (absolute paths, defaults applied).
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub url: String,
    pub mode: ConnectionMode,
    /// Pool size in shared mode; per-request handles always hold one connection.
    pub max_conns: Option<u32>,
    pub busy_timeout: Option<Duration>,
}

impl StoreOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: ConnectionMode::default(),
            max_conns: None,
            busy_timeout: None,
        }
    }

    fn is_memory(&self) -> bool {
        is_memory_url(&self.url)
    }
}

pub struct SqliteStudentsStore {
    options: StoreOptions,
    shared: Option<DatabaseConnection>,
    migrate_lock: Mutex<()>,
}

impl SqliteStudentsStore {
    /// Build the store. Shared mode (and any in-memory URL) connects immediately;
    /// per-request mode defers every open to `connect()`.
    pub async fn open(mut options: StoreOptions) -> Result<Self, StorageError> {
        if options.is_memory() && options.mode != ConnectionMode::Shared {
            debug!("In-memory database, forcing shared connection mode");
            options.mode = ConnectionMode::Shared;
        }

        let shared = match options.mode {
            ConnectionMode::Shared => Some(open_connection(&options).await?),
            ConnectionMode::PerRequest => None,
        };

        info!(url = %options.url, mode = ?options.mode, "Students store ready");
        Ok(Self {
            options,
            shared,
            migrate_lock: Mutex::new(()),
        })
    }

    /// Wrap an existing handle in shared mode.
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self {
            options: StoreOptions {
                mode: ConnectionMode::Shared,
                ..StoreOptions::new("sqlite::memory:")
            },
            shared: Some(conn),
            migrate_lock: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        self.options.mode
    }

    /// Open (or reuse) a handle and make sure the schema is in place.
    pub async fn session(&self) -> Result<DatabaseConnection, StorageError> {
        let conn = match &self.shared {
            Some(conn) => conn.clone(),
            None => open_connection(&self.options).await?,
        };
        self.ensure_schema(&conn).await?;
        Ok(conn)
    }

    async fn ensure_schema(&self, conn: &DatabaseConnection) -> Result<(), StorageError> {
        // Two first-time migrations racing on one file would both try to create the table.
        let _guard = self.migrate_lock.lock().await;
        Migrator::up(conn, None).await.map_err(StorageError::Migrate)
    }
}

#[async_trait]
impl StudentsStore for SqliteStudentsStore {
    async fn connect(&self) -> anyhow::Result<Box<dyn StudentsRepository>> {
        let conn = self.session().await?;
        Ok(Box::new(SeaOrmStudentsRepository::new(conn)))
    }
}

async fn open_connection(options: &StoreOptions) -> Result<DatabaseConnection, StorageError> {
    let url = if options.is_memory() {
        options.url.clone()
    } else {
        if let Some(dir) = sqlite_file_path(&options.url).and_then(|p| p.parent().map(PathBuf::from)) {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(&dir)
                    .map_err(|source| StorageError::CreateDir { path: dir, source })?;
            }
        }
        with_create_mode(&options.url)
    };

    let mut opts = ConnectOptions::new(url.clone());
    opts.sqlx_logging(false);
    match (options.is_memory(), options.mode) {
        (true, _) => {
            opts.max_connections(1)
                .min_connections(1)
                .idle_timeout(MEMORY_CONN_LIFETIME)
                .max_lifetime(MEMORY_CONN_LIFETIME);
        }
        (false, ConnectionMode::Shared) => {
            opts.max_connections(options.max_conns.unwrap_or(1).max(1));
        }
        (false, ConnectionMode::PerRequest) => {
            opts.max_connections(1);
        }
    }

    let conn = Database::connect(opts)
        .await
        .map_err(|source| StorageError::Connect {
            url: url.clone(),
            source,
        })?;

    if let (false, Some(timeout)) = (options.is_memory(), options.busy_timeout) {
        let stmt = format!("PRAGMA busy_timeout = {}", timeout.as_millis());
        conn.execute_unprepared(&stmt)
            .await
            .map_err(|source| StorageError::Connect { url, source })?;
    }

    Ok(conn)
}

pub fn is_memory_url(url: &str) -> bool {
    let url = url.trim();
    url.eq_ignore_ascii_case("sqlite::memory:")
        || url.eq_ignore_ascii_case("sqlite://:memory:")
        || url.contains("mode=memory")
}

/// Filesystem path of a `sqlite://` URL, without the query string.
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split_once('?').map_or(rest, |(p, _)| p);
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Append `mode=rwc` so a missing database file is created, unless a mode is already set.
fn with_create_mode(url: &str) -> String {
    if url.contains("mode=") {
        url.to_owned()
    } else if url.contains('?') {
        format!("{url}&mode=rwc")
    } else {
        format!("{url}?mode=rwc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://:memory:"));
        assert!(is_memory_url("sqlite:file:test?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite:///tmp/students.db"));
    }

    #[test]
    fn file_path_strips_scheme_and_query() {
        assert_eq!(
            sqlite_file_path("sqlite:///var/lib/students.db?mode=rwc"),
            Some(PathBuf::from("/var/lib/students.db"))
        );
        assert_eq!(
            sqlite_file_path("sqlite:students.db"),
            Some(PathBuf::from("students.db"))
        );
        assert_eq!(sqlite_file_path("postgres://localhost/db"), None);
    }

    #[test]
    fn create_mode_is_added_once() {
        assert_eq!(with_create_mode("sqlite:///a.db"), "sqlite:///a.db?mode=rwc");
        assert_eq!(
            with_create_mode("sqlite:///a.db?cache=shared"),
            "sqlite:///a.db?cache=shared&mode=rwc"
        );
        assert_eq!(with_create_mode("sqlite:///a.db?mode=ro"), "sqlite:///a.db?mode=ro");
    }

    #[tokio::test]
    async fn memory_store_is_always_shared() {
        let store = SqliteStudentsStore::open(StoreOptions::new("sqlite::memory:"))
            .await
            .unwrap();
        assert_eq!(store.mode(), ConnectionMode::Shared);

        // Schema survives across sessions because the handle is reused.
        let conn = store.session().await.unwrap();
        conn.execute_unprepared("INSERT INTO students (created_at, updated_at, name) VALUES ('2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z', 'x')")
            .await
            .unwrap();
        let again = store.session().await.unwrap();
        let rows = again
            .query_all(sea_orm::Statement::from_string(
                again.get_database_backend(),
                "SELECT id FROM students",
            ))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn per_request_mode_creates_missing_file_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested/dir/students.db");
        let url = format!("sqlite://{}", db_path.display());

        let store = SqliteStudentsStore::open(StoreOptions {
            busy_timeout: Some(Duration::from_millis(2000)),
            ..StoreOptions::new(url)
        })
        .await
        .unwrap();
        assert_eq!(store.mode(), ConnectionMode::PerRequest);
        assert!(!db_path.exists(), "per-request mode must not open eagerly");

        store.session().await.unwrap();
        assert!(db_path.exists());
    }
}
