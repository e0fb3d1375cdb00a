//! `swagstock-store`
//!
//! **Responsibility:** the single embedded data file and every operation that
//! mutates it.
//!
//! - [`Database`]: the explicitly owned connection handle (one connection, no pool fan-out)
//! - [`Catalog`]: item rows and the only two quantity primitives (`add_stock` / `remove_stock`)
//! - [`Ledger`]: entry/exit movements
//! - [`TransferCoordinator`]: inter-branch transfers and multi-branch creation
//! - [`DeletionAuditor`]: snapshot-then-delete
//! - [`ReferenceData`]: branches, categories, units, suppliers
//!
//! Every multi-step operation runs inside one [`unit_of_work::UnitOfWork`];
//! events are emitted only after it commits.

pub mod catalog;
pub mod db;
pub mod deletion;
pub mod error;
pub mod ledger;
pub mod reference;
mod rows;
pub mod schema;
pub mod transfer;
pub mod unit_of_work;

pub use catalog::Catalog;
pub use db::{Database, DatabaseConfig};
pub use deletion::DeletionAuditor;
pub use error::{StoreError, StoreResult};
pub use ledger::Ledger;
pub use reference::ReferenceData;
pub use schema::SCHEMA_VERSION;
pub use transfer::TransferCoordinator;
