use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use swagstock_core::{BranchId, DeletionId, ItemId, TransferId};

use crate::event::Event;

/// Which kind of reference row changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Branch,
    Category,
    Unit,
    Supplier,
}

/// Facts emitted by the inventory ledger once a change is durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    ItemCreated {
        item_id: ItemId,
        branch_id: BranchId,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    },
    ItemUpdated {
        item_id: ItemId,
        occurred_at: DateTime<Utc>,
    },
    ItemDeleted {
        item_id: ItemId,
        snapshot_id: DeletionId,
        occurred_at: DateTime<Utc>,
    },
    StockChanged {
        item_id: ItemId,
        branch_id: BranchId,
        delta: i64,
        quantity_after: i64,
        occurred_at: DateTime<Utc>,
    },
    TransferRecorded {
        transfer_id: TransferId,
        source_item: ItemId,
        destination_item: ItemId,
        origin: BranchId,
        destination: BranchId,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    },
    ReferenceDataChanged {
        kind: ReferenceKind,
        id: i64,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::ItemCreated { .. } => "inventory.item.created",
            LedgerEvent::ItemUpdated { .. } => "inventory.item.updated",
            LedgerEvent::ItemDeleted { .. } => "inventory.item.deleted",
            LedgerEvent::StockChanged { .. } => "inventory.item.stock_changed",
            LedgerEvent::TransferRecorded { .. } => "inventory.transfer.recorded",
            LedgerEvent::ReferenceDataChanged { .. } => "inventory.reference.changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::ItemCreated { occurred_at, .. }
            | LedgerEvent::ItemUpdated { occurred_at, .. }
            | LedgerEvent::ItemDeleted { occurred_at, .. }
            | LedgerEvent::StockChanged { occurred_at, .. }
            | LedgerEvent::TransferRecorded { occurred_at, .. }
            | LedgerEvent::ReferenceDataChanged { occurred_at, .. } => *occurred_at,
        }
    }
}
