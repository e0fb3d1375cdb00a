//! Row <-> domain mapping and the text encodings used in the data file.
//!
//! Timestamps are stored as RFC 3339 text with millisecond precision in UTC
//! (`2025-01-31T12:00:00.000Z`), which sorts lexically in time order. Unit
//! costs are stored as canonical decimal text.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use swagstock_core::{
    BranchId, CategoryId, DeletionId, ItemId, MovementId, SupplierId, TransferId, UnitCost, UnitId,
    UserId,
};
use swagstock_inventory::{
    Branch, Category, DeletedItemSnapshot, Item, Movement, StockRow, Supplier, Transfer, Unit,
};

use crate::error::{StoreError, StoreResult, map_sqlx_error};

/// Current time truncated to what the data file can represent.
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub(crate) fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_ts(table: &'static str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(table, format!("timestamp '{raw}': {e}")))
}

fn decode_cost(table: &'static str, raw: &str) -> StoreResult<UnitCost> {
    raw.parse::<UnitCost>()
        .map_err(|e| StoreError::corrupt(table, format!("unit cost '{raw}': {e}")))
}

fn get<'r, T>(row: &'r SqliteRow, column: &'static str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| map_sqlx_error("decode_row", e))
}

fn get_ts(row: &SqliteRow, table: &'static str, column: &'static str) -> StoreResult<DateTime<Utc>> {
    let raw: String = get(row, column)?;
    decode_ts(table, &raw)
}

pub(crate) fn row_to_branch(row: &SqliteRow) -> StoreResult<Branch> {
    Ok(Branch {
        id: BranchId::new(get(row, "id")?),
        number: get(row, "number")?,
        name: get(row, "name")?,
        location: get(row, "location")?,
        active: get(row, "active")?,
        is_headquarters: get(row, "is_headquarters")?,
        created_at: get_ts(row, "branches", "created_at")?,
        updated_at: get_ts(row, "branches", "updated_at")?,
    })
}

pub(crate) fn row_to_category(row: &SqliteRow) -> StoreResult<Category> {
    Ok(Category {
        id: CategoryId::new(get(row, "id")?),
        name: get(row, "name")?,
        description: get(row, "description")?,
        active: get(row, "active")?,
    })
}

pub(crate) fn row_to_unit(row: &SqliteRow) -> StoreResult<Unit> {
    Ok(Unit {
        id: UnitId::new(get(row, "id")?),
        code: get(row, "code")?,
        name: get(row, "name")?,
        active: get(row, "active")?,
    })
}

pub(crate) fn row_to_supplier(row: &SqliteRow) -> StoreResult<Supplier> {
    Ok(Supplier {
        id: SupplierId::new(get(row, "id")?),
        name: get(row, "name")?,
        contact: get(row, "contact")?,
        phone: get(row, "phone")?,
        email: get(row, "email")?,
        active: get(row, "active")?,
    })
}

pub(crate) fn row_to_item(row: &SqliteRow) -> StoreResult<Item> {
    let cost: String = get(row, "unit_cost")?;
    let supplier: Option<i64> = get(row, "supplier_id")?;
    Ok(Item {
        id: ItemId::new(get(row, "id")?),
        description: get(row, "description")?,
        quantity: get(row, "quantity")?,
        unit_cost: decode_cost("items", &cost)?,
        category_id: CategoryId::new(get(row, "category_id")?),
        unit_id: UnitId::new(get(row, "unit_id")?),
        branch_id: BranchId::new(get(row, "branch_id")?),
        supplier_id: supplier.map(SupplierId::new),
        internal_code: get(row, "internal_code")?,
        min_stock: get(row, "min_stock")?,
        notes: get(row, "notes")?,
        created_at: get_ts(row, "items", "created_at")?,
        updated_at: get_ts(row, "items", "updated_at")?,
    })
}

pub(crate) fn row_to_stock(row: &SqliteRow) -> StoreResult<StockRow> {
    let cost: String = get(row, "unit_cost")?;
    let unit_cost = decode_cost("v_current_stock", &cost)?;
    let quantity: i64 = get(row, "quantity")?;
    Ok(StockRow {
        item_id: ItemId::new(get(row, "item_id")?),
        description: get(row, "description")?,
        quantity,
        unit_cost,
        // The view's REAL product is for reporting tools; recompute exactly here.
        total_value: unit_cost.total_for(quantity),
        category: get(row, "category")?,
        unit: get(row, "unit")?,
        branch_id: BranchId::new(get(row, "branch_id")?),
        branch: get(row, "branch")?,
        supplier: get(row, "supplier")?,
        min_stock: get(row, "min_stock")?,
        low_stock: get(row, "low_stock")?,
    })
}

pub(crate) fn row_to_movement(row: &SqliteRow) -> StoreResult<Movement> {
    let kind: String = get(row, "kind")?;
    let cost: Option<String> = get(row, "unit_cost")?;
    Ok(Movement {
        id: MovementId::new(get(row, "id")?),
        item_id: ItemId::new(get(row, "item_id")?),
        kind: kind
            .parse()
            .map_err(|e| StoreError::corrupt("movements", format!("{e}")))?,
        quantity: get(row, "quantity")?,
        unit_cost: cost.map(|c| decode_cost("movements", &c)).transpose()?,
        user_id: UserId::new(get(row, "user_id")?),
        user_name: get(row, "user_name")?,
        justification: get(row, "justification")?,
        occurred_at: get_ts(row, "movements", "occurred_at")?,
    })
}

pub(crate) fn row_to_transfer(row: &SqliteRow) -> StoreResult<Transfer> {
    Ok(Transfer {
        id: TransferId::new(get(row, "id")?),
        item_id: ItemId::new(get(row, "item_id")?),
        destination_item_id: ItemId::new(get(row, "destination_item_id")?),
        origin_branch_id: BranchId::new(get(row, "origin_branch_id")?),
        destination_branch_id: BranchId::new(get(row, "destination_branch_id")?),
        quantity: get(row, "quantity")?,
        user_id: UserId::new(get(row, "user_id")?),
        user_name: get(row, "user_name")?,
        justification: get(row, "justification")?,
        occurred_at: get_ts(row, "transfers", "occurred_at")?,
    })
}

pub(crate) fn row_to_snapshot(row: &SqliteRow) -> StoreResult<DeletedItemSnapshot> {
    let cost: String = get(row, "unit_cost")?;
    Ok(DeletedItemSnapshot {
        id: DeletionId::new(get(row, "id")?),
        original_item_id: ItemId::new(get(row, "original_item_id")?),
        description: get(row, "description")?,
        category: get(row, "category")?,
        unit: get(row, "unit")?,
        branch: get(row, "branch")?,
        supplier: get(row, "supplier")?,
        quantity: get(row, "quantity")?,
        unit_cost: decode_cost("deleted_items", &cost)?,
        internal_code: get(row, "internal_code")?,
        notes: get(row, "notes")?,
        min_stock: get(row, "min_stock")?,
        item_created_at: get_ts(row, "deleted_items", "item_created_at")?,
        movement_count: get(row, "movement_count")?,
        transfer_count: get(row, "transfer_count")?,
        deleted_by_id: UserId::new(get(row, "deleted_by_id")?),
        deleted_by_name: get(row, "deleted_by_name")?,
        motive: get(row, "motive")?,
        deleted_at: get_ts(row, "deleted_items", "deleted_at")?,
    })
}

/// Map every row, stopping at the first that fails.
pub(crate) fn map_rows<T>(
    rows: Vec<SqliteRow>,
    f: impl Fn(&SqliteRow) -> StoreResult<T>,
) -> StoreResult<Vec<T>> {
    rows.iter().map(f).collect()
}
