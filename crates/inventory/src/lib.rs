//! Inventory domain module.
//!
//! Row types for branches, items and the ledger, plus the deterministic rules
//! every quantity change must satisfy (no IO, no storage). The store crate
//! calls these checks before touching the data file.

pub mod deletion;
pub mod distribution;
pub mod item;
pub mod movement;
pub mod period;
pub mod reference;
pub mod rules;
pub mod transfer;

pub use deletion::{DeletedItemSnapshot, DeletionFilter};
pub use distribution::{Distribution, validate_distribution};
pub use item::{DEFAULT_MIN_STOCK, Item, ItemTemplate, ItemUpdate, NewItem, StockRow};
pub use movement::{Movement, MovementFilter, MovementKind};
pub use period::DateRange;
pub use reference::{
    Branch, BranchUpdate, Category, NewBranch, NewCategory, NewSupplier, NewUnit, Supplier, Unit,
};
pub use rules::{
    check_deposit, check_valuation, check_withdrawal, require_positive, require_text,
};
pub use transfer::{Transfer, TransferFilter, TransferOutcome};
