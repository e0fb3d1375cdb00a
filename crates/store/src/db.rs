//! The explicitly owned handle to the data file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Connection, Sqlite, SqliteConnection, SqlitePool};
use swagstock_core::DomainError;
use swagstock_events::{EventPublisher, LedgerEvent, NoopPublisher};
use swagstock_inventory::DEFAULT_MIN_STOCK;

use crate::catalog::Catalog;
use crate::deletion::DeletionAuditor;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::ledger::Ledger;
use crate::reference::ReferenceData;
use crate::schema;
use crate::transfer::TransferCoordinator;
use crate::unit_of_work::UnitOfWork;

/// How to open the data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Insert default units, categories and a headquarters branch into an empty file.
    pub seed_defaults: bool,
    /// Minimum-stock threshold for new items that do not set one.
    pub default_min_stock: i64,
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_defaults: true,
            default_min_stock: DEFAULT_MIN_STOCK,
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn without_seed(mut self) -> Self {
        self.seed_defaults = false;
        self
    }

    pub fn with_default_min_stock(mut self, min_stock: i64) -> Self {
        self.default_min_stock = min_stock;
        self
    }
}

/// Single-connection handle to the embedded data file.
///
/// Constructed by the application root and lent to each component through the
/// accessor methods. Closing consumes the handle, so nothing can keep using a
/// connection across a restore.
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
    default_min_stock: i64,
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

impl Database {
    /// Open (creating if missing) the data file and bring its layout up to date.
    #[tracing::instrument(skip_all, fields(path = %config.path.display()))]
    pub async fn open(config: &DatabaseConfig) -> StoreResult<Self> {
        if config.default_min_stock < 0 {
            return Err(DomainError::validation(format!(
                "default minimum stock cannot be negative (got {})",
                config.default_min_stock
            ))
            .into());
        }
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| {
                tracing::error!(dir = %parent.display(), error = %source, "failed to create data directory");
                StoreError::Io {
                    operation: "create_data_dir",
                    source,
                }
            })?;
        }

        // Rollback journal rather than WAL: the data file alone is a complete
        // copy, which the backup manager relies on.
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Delete)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("open_database", e))?;

        let mut uow = UnitOfWork::begin(&pool, "initialize_schema").await?;
        let seeded = async {
            schema::apply(uow.conn()).await?;
            if config.seed_defaults {
                schema::seed_defaults(uow.conn()).await
            } else {
                Ok(false)
            }
        }
        .await;
        let seeded = uow.finish(seeded).await?;

        tracing::info!(seeded, "database opened");
        Ok(Self {
            pool,
            path: config.path.clone(),
            default_min_stock: config.default_min_stock,
            events: Arc::new(NoopPublisher),
        })
    }

    /// Attach the sink committed changes are announced on.
    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_min_stock(&self) -> i64 {
        self.default_min_stock
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self)
    }

    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self)
    }

    pub fn transfers(&self) -> TransferCoordinator<'_> {
        TransferCoordinator::new(self)
    }

    pub fn auditor(&self) -> DeletionAuditor<'_> {
        DeletionAuditor::new(self)
    }

    pub fn reference(&self) -> ReferenceData<'_> {
        ReferenceData::new(self)
    }

    /// Current `PRAGMA user_version` of the open file.
    pub async fn schema_version(&self) -> StoreResult<i64> {
        let mut conn = self.acquire().await?;
        schema::read_version(&mut conn).await
    }

    /// Flush and release the connection. The file can be copied or replaced afterwards.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("database closed");
    }

    /// Layout version of a file without opening it for writing.
    ///
    /// `Ok(None)` when the file does not exist yet.
    pub async fn schema_version_of(path: &Path) -> StoreResult<Option<i64>> {
        if !path.exists() {
            return Ok(None);
        }
        let options = SqliteConnectOptions::new().filename(path).read_only(true);
        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| map_sqlx_error("probe_schema_version", e))?;
        let version = schema::read_version(&mut conn).await;
        if let Err(err) = conn.close().await {
            tracing::warn!(error = %err, "failed to close schema probe connection");
        }
        version.map(Some)
    }

    pub(crate) async fn acquire(&self) -> StoreResult<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))
    }

    pub(crate) async fn begin(&self, operation: &'static str) -> StoreResult<UnitOfWork> {
        UnitOfWork::begin(&self.pool, operation).await
    }

    /// Announce a committed change.
    pub(crate) fn emit(&self, event: LedgerEvent) {
        self.events.emit(event);
    }
}
