use swagstock_backup::BackupError;
use swagstock_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    /// The database was left closed after a failed restore or recreate.
    #[error("the data file is not open; reopen it before continuing")]
    NotOpen,
}

impl AppError {
    /// `true` for expected business outcomes (stock too low, empty motive, ...).
    pub fn is_business(&self) -> bool {
        matches!(self, AppError::Store(e) if e.is_business())
    }
}
