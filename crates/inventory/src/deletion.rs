use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use swagstock_core::{DeletionId, Entity, ItemId, UnitCost, UserId};

use crate::period::DateRange;

/// Immutable record of an item taken right before it was removed.
///
/// References are resolved to names because the rows they pointed at may be
/// renamed or removed later; `original_item_id` is kept for traceability only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedItemSnapshot {
    pub id: DeletionId,
    pub original_item_id: ItemId,
    pub description: String,
    pub category: String,
    pub unit: String,
    pub branch: String,
    pub supplier: Option<String>,
    pub quantity: i64,
    pub unit_cost: UnitCost,
    pub internal_code: Option<String>,
    pub notes: Option<String>,
    pub min_stock: i64,
    pub item_created_at: DateTime<Utc>,
    /// Ledger rows that went away with the item.
    pub movement_count: i64,
    pub transfer_count: i64,
    pub deleted_by_id: UserId,
    pub deleted_by_name: String,
    pub motive: String,
    pub deleted_at: DateTime<Utc>,
}

impl Entity for DeletedItemSnapshot {
    type Id = DeletionId;

    fn id(&self) -> DeletionId {
        self.id
    }
}

/// Deletion audit query, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFilter {
    pub deleted_by: Option<UserId>,
    pub period: Option<DateRange>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for DeletionFilter {
    fn default() -> Self {
        Self {
            deleted_by: None,
            period: None,
            limit: 100,
            offset: 0,
        }
    }
}

impl DeletionFilter {
    pub fn by_user(user_id: UserId) -> Self {
        Self {
            deleted_by: Some(user_id),
            ..Self::default()
        }
    }

    pub fn within(mut self, period: DateRange) -> Self {
        self.period = Some(period);
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}
