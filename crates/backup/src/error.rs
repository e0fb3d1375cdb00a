use std::path::{Path, PathBuf};

use thiserror::Error;

pub type BackupResult<T> = Result<T, BackupError>;

/// Backup failures. All of them are infrastructure problems and are logged where raised.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("{operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup file not found: {0}")]
    NotFound(PathBuf),

    /// The data file was not touched; a restore stopped before replacing it.
    #[error("restore aborted before the data file was replaced: {0}")]
    RestoreAborted(Box<BackupError>),

    #[error("backup task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BackupError {
    pub(crate) fn io(operation: &'static str, path: &Path, source: std::io::Error) -> Self {
        tracing::error!(operation, path = %path.display(), error = %source, "backup i/o failure");
        BackupError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// `true` when the live data file is known to be unchanged.
    pub fn data_file_untouched(&self) -> bool {
        matches!(self, BackupError::NotFound(_) | BackupError::RestoreAborted(_))
    }
}
