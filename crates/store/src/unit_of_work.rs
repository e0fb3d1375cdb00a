//! Explicit begin/commit/rollback around one logical operation.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::error::{StoreResult, map_sqlx_error};

/// One logical operation's transaction.
///
/// Every step of the operation runs on [`UnitOfWork::conn`]; [`UnitOfWork::finish`]
/// commits when the steps succeeded and rolls back otherwise. Dropping an
/// unfinished unit of work also rolls back, so a panic mid-sequence cannot
/// leave a half-applied change behind.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    operation: &'static str,
}

impl UnitOfWork {
    pub(crate) async fn begin(pool: &SqlitePool, operation: &'static str) -> StoreResult<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Self { tx, operation })
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    pub async fn rollback(self) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))
    }

    /// Commit on `Ok`, roll back on `Err`, and hand the result back.
    pub async fn finish<T>(self, result: StoreResult<T>) -> StoreResult<T> {
        let operation = self.operation;
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if err.is_business() {
                    tracing::debug!(operation, error = %err, "rolling back rejected operation");
                } else {
                    tracing::warn!(operation, error = %err, "rolling back failed operation");
                }
                if let Err(rollback_err) = self.rollback().await {
                    tracing::error!(operation, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
