use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use swagstock_core::{BranchId, Entity, ItemId, TransferId, UserId};

use crate::period::DateRange;

/// A recorded move of quantity from one branch's row to another's.
///
/// `item_id` is the source row; `destination_item_id` is the row that was
/// credited (merged into or newly created).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub item_id: ItemId,
    pub destination_item_id: ItemId,
    pub origin_branch_id: BranchId,
    pub destination_branch_id: BranchId,
    pub quantity: i64,
    pub user_id: UserId,
    pub user_name: String,
    pub justification: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Entity for Transfer {
    type Id = TransferId;

    fn id(&self) -> TransferId {
        self.id
    }
}

/// What a successful transfer did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub transfer: Transfer,
    pub source_quantity_after: i64,
    pub destination_quantity_after: i64,
    /// `true` when no matching row existed and one was created.
    pub created_destination: bool,
}

/// Transfer history query. `branch_id` matches either end of the transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferFilter {
    pub item_id: Option<ItemId>,
    pub branch_id: Option<BranchId>,
    pub period: Option<DateRange>,
    pub limit: Option<u32>,
}

impl TransferFilter {
    pub fn for_item(item_id: ItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn for_branch(branch_id: BranchId) -> Self {
        Self {
            branch_id: Some(branch_id),
            ..Self::default()
        }
    }

    pub fn within(mut self, period: DateRange) -> Self {
        self.period = Some(period);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
