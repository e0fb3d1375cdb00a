//! `swagstock-app`
//!
//! Application root: reads configuration, owns the single database handle,
//! the event bus and the backup manager, and sequences the operations that
//! must close and reopen the data file (restore, recreate).

pub mod config;
pub mod error;
pub mod inventory;

pub use config::{AppConfig, ConfigError};
pub use error::AppError;
pub use inventory::Inventory;
