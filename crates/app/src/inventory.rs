//! The application-owned handle around the data file.

use std::path::Path;
use std::sync::Arc;

use swagstock_backup::{BackupManager, BackupReason, BackupSnapshot, RestoreReport};
use swagstock_events::{InMemoryEventBus, LedgerEvent};
use swagstock_store::{Database, SCHEMA_VERSION};
use tracing::instrument;

use crate::config::AppConfig;
use crate::error::AppError;

/// Owns the one open [`Database`], the event bus it publishes on and the
/// backup manager protecting its file.
///
/// Operations that replace the file close the database first and reopen it
/// afterwards; a failure that may have left the file inconsistent leaves it
/// closed, and [`Inventory::db`] then reports [`AppError::NotOpen`].
pub struct Inventory {
    config: AppConfig,
    db: Option<Database>,
    events: Arc<InMemoryEventBus<LedgerEvent>>,
    backups: BackupManager,
}

impl Inventory {
    /// Back up if due, upgrade the layout if needed, then open.
    #[instrument(skip_all, fields(data_file = %config.data_file.display()))]
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let backups = BackupManager::new(config.backups());
        if config.data_file.exists() {
            match backups.auto_backup_if_needed(false).await {
                Ok(Some(snapshot)) => tracing::info!(file = %snapshot.filename, "startup backup taken"),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "startup backup failed; continuing"),
            }
        }

        let mut inventory = Self {
            config,
            db: None,
            events: Arc::new(InMemoryEventBus::new()),
            backups,
        };
        inventory.open().await?;
        Ok(inventory)
    }

    /// The open database, or [`AppError::NotOpen`].
    pub fn db(&self) -> Result<&Database, AppError> {
        self.db.as_ref().ok_or(AppError::NotOpen)
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    pub fn events(&self) -> &Arc<InMemoryEventBus<LedgerEvent>> {
        &self.events
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Close (if open) and open again.
    pub async fn reopen(&mut self) -> Result<(), AppError> {
        self.close().await;
        self.open().await
    }

    /// Take a backup of the data file with the connection released.
    ///
    /// The database is reopened afterwards whether or not the copy succeeded.
    #[instrument(skip(self), fields(reason = %reason))]
    pub async fn backup(&mut self, reason: BackupReason) -> Result<Option<BackupSnapshot>, AppError> {
        self.close().await;
        let result = self.backups.create_backup(reason).await;
        self.open().await?;
        Ok(result?)
    }

    /// Replace the data file with a snapshot from the backup directory.
    ///
    /// When the file was not touched the database is reopened before the error
    /// is returned. Otherwise it stays closed.
    #[instrument(skip(self), fields(snapshot = %snapshot.display()))]
    pub async fn restore(&mut self, snapshot: &Path) -> Result<RestoreReport, AppError> {
        self.close().await;
        match self.backups.restore_backup(snapshot).await {
            Ok(report) => {
                self.open().await?;
                Ok(report)
            }
            Err(err) if err.data_file_untouched() => {
                tracing::warn!(error = %err, "restore aborted; reopening the current data file");
                self.open().await?;
                Err(err.into())
            }
            Err(err) => {
                tracing::error!(error = %err, "restore failed; data file left closed");
                Err(err.into())
            }
        }
    }

    /// Back up, delete and rebuild an empty (seeded) data file.
    ///
    /// Nothing is deleted unless the `recreate` backup succeeded (or there was
    /// no file to back up).
    #[instrument(skip(self))]
    pub async fn recreate(&mut self) -> Result<Option<BackupSnapshot>, AppError> {
        self.close().await;
        let snapshot = match self.backups.create_backup(BackupReason::Recreate).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!(error = %err, "recreate backup failed; keeping the current data file");
                self.open().await?;
                return Err(err.into());
            }
        };

        for path in [
            self.config.data_file.clone(),
            sidecar(&self.config.data_file, "journal"),
        ] {
            if let Err(source) = std::fs::remove_file(&path) {
                if source.kind() != std::io::ErrorKind::NotFound {
                    tracing::error!(path = %path.display(), error = %source, "failed to remove data file");
                    return Err(swagstock_store::StoreError::Io {
                        operation: "remove_data_file",
                        source,
                    }
                    .into());
                }
            }
        }

        self.open().await?;
        tracing::info!("data file recreated");
        Ok(snapshot)
    }

    /// Close the database and drop the handle.
    pub async fn shutdown(mut self) {
        self.close().await;
    }

    async fn close(&mut self) {
        if let Some(db) = self.db.take() {
            db.close().await;
        }
    }

    async fn open(&mut self) -> Result<(), AppError> {
        if let Some(version) = Database::schema_version_of(&self.config.data_file).await? {
            if version < SCHEMA_VERSION {
                tracing::info!(from = version, to = SCHEMA_VERSION, "data file layout is outdated");
                self.backups.create_backup(BackupReason::SchemaUpdate).await?;
            }
        }

        let db = Database::open(&self.config.database())
            .await?
            .with_events(self.events.clone());
        self.db = Some(db);
        Ok(())
    }
}

fn sidecar(data_file: &Path, suffix: &str) -> std::path::PathBuf {
    let mut name = data_file.as_os_str().to_owned();
    name.push("-");
    name.push(suffix);
    name.into()
}
