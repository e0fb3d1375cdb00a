//! `swagstock-backup`
//!
//! Rotating copies of the data file in a flat directory.
//!
//! Snapshots are named `{prefix}_backup_{YYYYmmdd_HHMMSS_mmm}_{reason}.db`
//! (UTC), so the directory listing alone says when and why each copy was
//! taken. After every new snapshot the directory is pruned back to the
//! retention window, newest by modification time first; no reason tag is
//! exempt.

pub mod error;
pub mod manager;
pub mod reason;

pub use error::{BackupError, BackupResult};
pub use manager::{BackupConfig, BackupManager, BackupSnapshot, RestoreReport};
pub use reason::BackupReason;
