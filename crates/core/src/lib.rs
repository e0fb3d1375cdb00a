//! `swagstock-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! row identifiers, the acting identity, monetary values and the domain error
//! model shared by every other crate in the workspace.

pub mod actor;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use actor::Actor;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    BranchId, CategoryId, DeletionId, ItemId, MovementId, SupplierId, TransferId, UnitId, UserId,
};
pub use money::UnitCost;
pub use value_object::ValueObject;
