//! Branch-scoped item rows and the two primitives that change their quantity.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::instrument;

use swagstock_core::{BranchId, CategoryId, DomainError, ItemId, UnitCost};
use swagstock_events::LedgerEvent;
use swagstock_inventory::{
    Item, ItemTemplate, ItemUpdate, NewItem, StockRow, check_deposit, check_valuation,
    check_withdrawal,
};

use crate::db::Database;
use crate::error::{StoreResult, map_sqlx_error};
use crate::rows::{encode_ts, map_rows, now, row_to_item, row_to_stock};

pub(crate) const ITEM_COLUMNS: &str = "id, description, quantity, unit_cost, category_id, unit_id, \
     branch_id, supplier_id, internal_code, min_stock, notes, created_at, updated_at";

const STOCK_COLUMNS: &str = "item_id, description, quantity, unit_cost, category, unit, \
     branch_id, branch, supplier, min_stock, low_stock";

/// Item rows: create, read, edit descriptive fields, add/remove stock.
///
/// `quantity` is never written by [`Catalog::update_item`]; it only moves
/// through [`Catalog::add_stock`] / [`Catalog::remove_stock`] and the ledger
/// operations built on the same primitives.
pub struct Catalog<'a> {
    db: &'a Database,
}

impl<'a> Catalog<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    #[instrument(
        skip(self, new_item),
        fields(branch = %new_item.branch_id, description = %new_item.template.description)
    )]
    pub async fn create_item(&self, new_item: NewItem) -> StoreResult<Item> {
        let new_item = new_item.validated()?;
        let mut uow = self.db.begin("create_item").await?;
        let result = insert_item(uow.conn(), &new_item, self.db.default_min_stock(), now()).await;
        let item = uow.finish(result).await?;

        tracing::info!(item_id = %item.id, quantity = item.quantity, "item created");
        self.db.emit(LedgerEvent::ItemCreated {
            item_id: item.id,
            branch_id: item.branch_id,
            quantity: item.quantity,
            occurred_at: item.created_at,
        });
        Ok(item)
    }

    pub async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let mut conn = self.db.acquire().await?;
        fetch_item(&mut conn, id).await
    }

    /// Items of a category, optionally restricted to one branch.
    pub async fn items_by_category(
        &self,
        category_id: CategoryId,
        branch_id: Option<BranchId>,
    ) -> StoreResult<Vec<Item>> {
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE category_id = ?1 AND (?2 IS NULL OR branch_id = ?2) \
             ORDER BY description, branch_id"
        ))
        .bind(category_id.get())
        .bind(branch_id.map(BranchId::get))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("items_by_category", e))?;
        map_rows(rows, row_to_item)
    }

    /// Case-insensitive substring search on the description, across every branch.
    pub async fn items_by_description(&self, term: &str) -> StoreResult<Vec<Item>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE description LIKE ?1 ESCAPE '\\' \
             ORDER BY description, branch_id"
        ))
        .bind(format!("%{}%", escape_like(term)))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("items_by_description", e))?;
        map_rows(rows, row_to_item)
    }

    /// The row for a product (exact description + category) in one branch.
    pub async fn find_in_branch(
        &self,
        description: &str,
        category_id: CategoryId,
        branch_id: BranchId,
    ) -> StoreResult<Option<Item>> {
        let mut conn = self.db.acquire().await?;
        find_matching(&mut conn, description.trim(), category_id, branch_id).await
    }

    /// Edit descriptive fields. Quantity is untouched.
    #[instrument(skip(self, update), fields(item_id = %id))]
    pub async fn update_item(&self, id: ItemId, update: ItemUpdate) -> StoreResult<Item> {
        let update = update.validated()?;
        let mut uow = self.db.begin("update_item").await?;
        let result = rewrite_item(uow.conn(), id, &update, now()).await;
        let item = uow.finish(result).await?;

        tracing::info!("item updated");
        self.db.emit(LedgerEvent::ItemUpdated {
            item_id: item.id,
            occurred_at: item.updated_at,
        });
        Ok(item)
    }

    /// Administrative deposit without a movement record.
    ///
    /// A present `new_cost` replaces the unit cost (last-cost basis).
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn add_stock(
        &self,
        id: ItemId,
        quantity: i64,
        new_cost: Option<UnitCost>,
    ) -> StoreResult<Item> {
        let mut uow = self.db.begin("add_stock").await?;
        let result = apply_deposit(uow.conn(), id, quantity, new_cost, now()).await;
        let item = uow.finish(result).await?;
        self.emit_stock_changed(&item, quantity);
        Ok(item)
    }

    /// Administrative withdrawal without a movement record. Never clamps.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn remove_stock(&self, id: ItemId, quantity: i64) -> StoreResult<Item> {
        let mut uow = self.db.begin("remove_stock").await?;
        let result = apply_withdrawal(uow.conn(), id, quantity, now()).await;
        let item = uow.finish(result).await?;
        self.emit_stock_changed(&item, -quantity);
        Ok(item)
    }

    /// Current stock with resolved names, from `v_current_stock`.
    pub async fn stock_overview(&self, branch_id: Option<BranchId>) -> StoreResult<Vec<StockRow>> {
        self.read_stock(branch_id, false).await
    }

    /// Rows at or below their minimum-stock threshold.
    pub async fn low_stock(&self, branch_id: Option<BranchId>) -> StoreResult<Vec<StockRow>> {
        self.read_stock(branch_id, true).await
    }

    async fn read_stock(&self, branch_id: Option<BranchId>, low_only: bool) -> StoreResult<Vec<StockRow>> {
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM v_current_stock \
             WHERE (?1 IS NULL OR branch_id = ?1) AND (?2 = 0 OR low_stock = 1) \
             ORDER BY branch, description"
        ))
        .bind(branch_id.map(BranchId::get))
        .bind(low_only)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("read_stock", e))?;
        map_rows(rows, row_to_stock)
    }

    fn emit_stock_changed(&self, item: &Item, delta: i64) {
        self.db.emit(LedgerEvent::StockChanged {
            item_id: item.id,
            branch_id: item.branch_id,
            delta,
            quantity_after: item.quantity,
            occurred_at: item.updated_at,
        });
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub(crate) async fn fetch_item(conn: &mut SqliteConnection, id: ItemId) -> StoreResult<Option<Item>> {
    let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"))
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("fetch_item", e))?;
    row.as_ref().map(row_to_item).transpose()
}

pub(crate) async fn require_item(conn: &mut SqliteConnection, id: ItemId) -> StoreResult<Item> {
    fetch_item(conn, id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("item {id}")).into())
}

pub(crate) async fn find_matching(
    conn: &mut SqliteConnection,
    description: &str,
    category_id: CategoryId,
    branch_id: BranchId,
) -> StoreResult<Option<Item>> {
    let row = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM items \
         WHERE description = ?1 AND category_id = ?2 AND branch_id = ?3"
    ))
    .bind(description)
    .bind(category_id.get())
    .bind(branch_id.get())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("find_item_in_branch", e))?;
    row.as_ref().map(row_to_item).transpose()
}

/// Referenced rows must exist; a branch receiving a new row must also be active.
async fn check_references(
    conn: &mut SqliteConnection,
    template: &ItemTemplate,
    new_branch: Option<BranchId>,
) -> StoreResult<()> {
    let checks: [(&str, &str, Option<i64>); 4] = [
        ("categories", "category", Some(template.category_id.get())),
        ("units", "unit", Some(template.unit_id.get())),
        ("branches", "branch", new_branch.map(BranchId::get)),
        ("suppliers", "supplier", template.supplier_id.map(|s| s.get())),
    ];
    for (table, label, id) in checks {
        let Some(id) = id else { continue };
        let active: Option<bool> = sqlx::query_scalar(&format!("SELECT active FROM {table} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("check_references", e))?;
        match active {
            None => return Err(DomainError::not_found(format!("{label} {id}")).into()),
            Some(false) if table == "branches" => {
                return Err(DomainError::validation(format!("branch {id} is inactive")).into());
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Insert one row, refusing a second row for the same product in the same branch.
pub(crate) async fn insert_item(
    conn: &mut SqliteConnection,
    new_item: &NewItem,
    default_min_stock: i64,
    at: DateTime<Utc>,
) -> StoreResult<Item> {
    let template = &new_item.template;
    check_valuation(new_item.quantity, template.unit_cost)?;
    check_references(conn, template, Some(new_item.branch_id)).await?;
    if find_matching(conn, &template.description, template.category_id, new_item.branch_id)
        .await?
        .is_some()
    {
        return Err(DomainError::conflict(format!(
            "'{}' already exists in branch {}",
            template.description, new_item.branch_id
        ))
        .into());
    }

    let min_stock = template.min_stock_or(default_min_stock);
    let stamp = encode_ts(at);
    let result = sqlx::query(
        r#"
        INSERT INTO items (
            description, quantity, unit_cost, category_id, unit_id, branch_id,
            supplier_id, internal_code, min_stock, notes, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
        "#,
    )
    .bind(&template.description)
    .bind(new_item.quantity)
    .bind(template.unit_cost.to_string())
    .bind(template.category_id.get())
    .bind(template.unit_id.get())
    .bind(new_item.branch_id.get())
    .bind(template.supplier_id.map(|s| s.get()))
    .bind(&template.internal_code)
    .bind(min_stock)
    .bind(&template.notes)
    .bind(&stamp)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_item", e))?;

    Ok(Item {
        id: ItemId::new(result.last_insert_rowid()),
        description: template.description.clone(),
        quantity: new_item.quantity,
        unit_cost: template.unit_cost,
        category_id: template.category_id,
        unit_id: template.unit_id,
        branch_id: new_item.branch_id,
        supplier_id: template.supplier_id,
        internal_code: template.internal_code.clone(),
        min_stock,
        notes: template.notes.clone(),
        created_at: at,
        updated_at: at,
    })
}

async fn rewrite_item(
    conn: &mut SqliteConnection,
    id: ItemId,
    update: &ItemUpdate,
    at: DateTime<Utc>,
) -> StoreResult<Item> {
    let current = require_item(conn, id).await?;
    check_valuation(current.quantity, update.unit_cost)?;
    check_references(conn, update, None).await?;
    if let Some(other) =
        find_matching(conn, &update.description, update.category_id, current.branch_id).await?
    {
        if other.id != id {
            return Err(DomainError::conflict(format!(
                "'{}' already exists in branch {} as item {}",
                update.description, current.branch_id, other.id
            ))
            .into());
        }
    }

    let min_stock = update.min_stock_or(current.min_stock);
    sqlx::query(
        r#"
        UPDATE items SET
            description = ?1, unit_cost = ?2, category_id = ?3, unit_id = ?4,
            supplier_id = ?5, internal_code = ?6, min_stock = ?7, notes = ?8,
            updated_at = ?9
        WHERE id = ?10
        "#,
    )
    .bind(&update.description)
    .bind(update.unit_cost.to_string())
    .bind(update.category_id.get())
    .bind(update.unit_id.get())
    .bind(update.supplier_id.map(|s| s.get()))
    .bind(&update.internal_code)
    .bind(min_stock)
    .bind(&update.notes)
    .bind(encode_ts(at))
    .bind(id.get())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("update_item", e))?;

    Ok(Item {
        description: update.description.clone(),
        unit_cost: update.unit_cost,
        category_id: update.category_id,
        unit_id: update.unit_id,
        supplier_id: update.supplier_id,
        internal_code: update.internal_code.clone(),
        min_stock,
        notes: update.notes.clone(),
        updated_at: at,
        ..current
    })
}

/// Add `quantity` to a row, optionally replacing its unit cost. Returns the updated row.
pub(crate) async fn apply_deposit(
    conn: &mut SqliteConnection,
    id: ItemId,
    quantity: i64,
    new_cost: Option<UnitCost>,
    at: DateTime<Utc>,
) -> StoreResult<Item> {
    let current = require_item(conn, id).await?;
    let after = check_deposit(current.quantity, quantity)?;
    let unit_cost = new_cost.unwrap_or(current.unit_cost);
    check_valuation(after, unit_cost)?;

    sqlx::query("UPDATE items SET quantity = ?1, unit_cost = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(after)
        .bind(unit_cost.to_string())
        .bind(encode_ts(at))
        .bind(id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("add_stock", e))?;

    Ok(Item {
        quantity: after,
        unit_cost,
        updated_at: at,
        ..current
    })
}

/// Take `quantity` from a row. Fails whole when the row holds less.
pub(crate) async fn apply_withdrawal(
    conn: &mut SqliteConnection,
    id: ItemId,
    quantity: i64,
    at: DateTime<Utc>,
) -> StoreResult<Item> {
    let current = require_item(conn, id).await?;
    let after = check_withdrawal(current.quantity, quantity)?;

    let result = sqlx::query(
        "UPDATE items SET quantity = quantity - ?1, updated_at = ?2 WHERE id = ?3 AND quantity >= ?1",
    )
    .bind(quantity)
    .bind(encode_ts(at))
    .bind(id.get())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("remove_stock", e))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::insufficient_stock(current.quantity, quantity).into());
    }

    Ok(Item {
        quantity: after,
        updated_at: at,
        ..current
    })
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("Pen"), "Pen");
    }
}
