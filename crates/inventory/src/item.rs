use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use swagstock_core::{
    BranchId, CategoryId, DomainError, DomainResult, Entity, ItemId, SupplierId, UnitCost, UnitId,
};

use crate::reference::normalize_optional;
use crate::rules::require_text;

/// Minimum-stock threshold applied when a new item does not set one.
pub const DEFAULT_MIN_STOCK: i64 = 10;

/// One branch-scoped stock row for a product.
///
/// A product is identified by `description + category`; each branch holds at
/// most one row per product. `quantity` only changes through the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub description: String,
    pub quantity: i64,
    pub unit_cost: UnitCost,
    pub category_id: CategoryId,
    pub unit_id: UnitId,
    pub branch_id: BranchId,
    pub supplier_id: Option<SupplierId>,
    pub internal_code: Option<String>,
    pub min_stock: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }

    /// `None` when the value does not fit in a decimal.
    pub fn total_value(&self) -> Option<Decimal> {
        self.unit_cost.total_for(self.quantity)
    }

    /// Descriptive attributes, ready to replicate into another branch.
    pub fn template(&self) -> ItemTemplate {
        ItemTemplate {
            description: self.description.clone(),
            unit_cost: self.unit_cost,
            category_id: self.category_id,
            unit_id: self.unit_id,
            supplier_id: self.supplier_id,
            internal_code: self.internal_code.clone(),
            notes: self.notes.clone(),
            min_stock: Some(self.min_stock),
        }
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

/// Everything about an item except where it lives and how many there are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub description: String,
    pub unit_cost: UnitCost,
    pub category_id: CategoryId,
    pub unit_id: UnitId,
    pub supplier_id: Option<SupplierId>,
    pub internal_code: Option<String>,
    pub notes: Option<String>,
    /// `None` takes the store's configured default ([`DEFAULT_MIN_STOCK`]
    /// unless overridden) on creation and keeps the current value on update.
    pub min_stock: Option<i64>,
}

impl ItemTemplate {
    pub fn validated(self) -> DomainResult<Self> {
        if let Some(min_stock) = self.min_stock.filter(|m| *m < 0) {
            return Err(DomainError::validation(format!(
                "minimum stock cannot be negative (got {min_stock})"
            )));
        }
        Ok(Self {
            description: require_text("description", &self.description)?,
            unit_cost: self.unit_cost,
            category_id: self.category_id,
            unit_id: self.unit_id,
            supplier_id: self.supplier_id,
            internal_code: normalize_optional(self.internal_code),
            notes: normalize_optional(self.notes),
            min_stock: self.min_stock,
        })
    }

    /// The template's threshold, or `default` when it leaves it unset.
    pub fn min_stock_or(&self, default: i64) -> i64 {
        self.min_stock.unwrap_or(default)
    }
}

/// Fields an ordinary edit may change. Quantity is deliberately absent.
pub type ItemUpdate = ItemTemplate;

/// A new row for one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub template: ItemTemplate,
    pub branch_id: BranchId,
    pub quantity: i64,
}

impl NewItem {
    pub fn new(template: ItemTemplate, branch_id: BranchId, quantity: i64) -> Self {
        Self {
            template,
            branch_id,
            quantity,
        }
    }

    pub fn validated(self) -> DomainResult<Self> {
        if self.quantity < 0 {
            return Err(DomainError::validation(format!(
                "initial quantity cannot be negative (got {})",
                self.quantity
            )));
        }
        Ok(Self {
            template: self.template.validated()?,
            branch_id: self.branch_id,
            quantity: self.quantity,
        })
    }
}

/// One row of the current-stock view: an item with its references resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRow {
    pub item_id: ItemId,
    pub description: String,
    pub quantity: i64,
    pub unit_cost: UnitCost,
    /// `None` for a row whose value does not fit in a decimal.
    pub total_value: Option<Decimal>,
    pub category: String,
    pub unit: String,
    pub branch_id: BranchId,
    pub branch: String,
    pub supplier: Option<String>,
    pub min_stock: i64,
    pub low_stock: bool,
}
