//! Branches, categories, units and suppliers.
//!
//! Reference rows are deactivated rather than deleted while anything points at
//! them. Hard deletion is available but always runs the matching `can_delete_*`
//! pre-flight first, so a blocked delete reports which dependents remain
//! instead of surfacing a raw constraint failure.

use sqlx::SqliteConnection;
use tracing::instrument;

use swagstock_core::{BranchId, CategoryId, DomainError, SupplierId, UnitId};
use swagstock_events::{LedgerEvent, ReferenceKind};
use swagstock_inventory::{
    Branch, BranchUpdate, Category, NewBranch, NewCategory, NewSupplier, NewUnit, Supplier, Unit,
};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::rows::{
    encode_ts, map_rows, now, row_to_branch, row_to_category, row_to_supplier, row_to_unit,
};

/// A reference table and the columns elsewhere that point into it.
#[derive(Debug, Clone, Copy)]
struct RefTable {
    table: &'static str,
    label: &'static str,
    kind: ReferenceKind,
    columns: &'static str,
    order_by: &'static str,
    dependents: &'static [(&'static str, &'static str)],
}

const BRANCHES: RefTable = RefTable {
    table: "branches",
    label: "branch",
    kind: ReferenceKind::Branch,
    columns: "id, number, name, location, active, is_headquarters, created_at, updated_at",
    order_by: "number",
    dependents: &[
        ("items", "branch_id"),
        ("transfers", "origin_branch_id"),
        ("transfers", "destination_branch_id"),
    ],
};

const CATEGORIES: RefTable = RefTable {
    table: "categories",
    label: "category",
    kind: ReferenceKind::Category,
    columns: "id, name, description, active",
    order_by: "name",
    dependents: &[("items", "category_id")],
};

const UNITS: RefTable = RefTable {
    table: "units",
    label: "unit",
    kind: ReferenceKind::Unit,
    columns: "id, code, name, active",
    order_by: "code",
    dependents: &[("items", "unit_id")],
};

const SUPPLIERS: RefTable = RefTable {
    table: "suppliers",
    label: "supplier",
    kind: ReferenceKind::Supplier,
    columns: "id, name, contact, phone, email, active",
    order_by: "name",
    dependents: &[("items", "supplier_id")],
};

/// CRUD over the reference tables items point at.
pub struct ReferenceData<'a> {
    db: &'a Database,
}

impl<'a> ReferenceData<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // --- branches -------------------------------------------------------

    #[instrument(skip(self, new), fields(number = %new.number))]
    pub async fn create_branch(&self, new: NewBranch) -> StoreResult<Branch> {
        let new = new.validated()?;
        let stamp = encode_ts(now());
        let mut conn = self.db.acquire().await?;
        let id = sqlx::query(
            "INSERT INTO branches (number, name, location, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&new.number)
        .bind(&new.name)
        .bind(&new.location)
        .bind(&stamp)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("create_branch", e))?
        .last_insert_rowid();
        drop(conn);

        self.changed(BRANCHES, id);
        self.require_branch(BranchId::new(id)).await
    }

    pub async fn branch(&self, id: BranchId) -> StoreResult<Option<Branch>> {
        self.fetch(BRANCHES, id.get(), row_to_branch).await
    }

    pub async fn branches(&self, include_inactive: bool) -> StoreResult<Vec<Branch>> {
        self.list(BRANCHES, include_inactive, row_to_branch).await
    }

    #[instrument(skip(self, update), fields(branch_id = %id))]
    pub async fn update_branch(&self, id: BranchId, update: BranchUpdate) -> StoreResult<Branch> {
        let update = update.validated()?;
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query(
            "UPDATE branches SET number = ?1, name = ?2, location = ?3, updated_at = ?4 WHERE id = ?5",
        )
        .bind(&update.number)
        .bind(&update.name)
        .bind(&update.location)
        .bind(encode_ts(now()))
        .bind(id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("update_branch", e))?;
        drop(conn);

        ensure_touched(result.rows_affected(), BRANCHES, id.get())?;
        self.changed(BRANCHES, id.get());
        self.require_branch(id).await
    }

    /// Deactivate or reactivate a branch. The headquarters cannot be deactivated.
    #[instrument(skip(self), fields(branch_id = %id))]
    pub async fn set_branch_active(&self, id: BranchId, active: bool) -> StoreResult<()> {
        if !active {
            let branch = self.require_branch(id).await?;
            if branch.is_headquarters {
                return Err(DomainError::validation(
                    "the headquarters branch cannot be deactivated; move the flag first",
                )
                .into());
            }
        }
        self.set_active(BRANCHES, id.get(), active).await
    }

    /// Make `id` the only headquarters branch.
    #[instrument(skip(self), fields(branch_id = %id))]
    pub async fn set_headquarters(&self, id: BranchId) -> StoreResult<Branch> {
        let mut uow = self.db.begin("set_headquarters").await?;
        let result = async {
            let conn = uow.conn();
            let active: Option<bool> = sqlx::query_scalar("SELECT active FROM branches WHERE id = ?1")
                .bind(id.get())
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("set_headquarters", e))?;
            match active {
                None => return Err(StoreError::from(DomainError::not_found(format!("branch {id}")))),
                Some(false) => {
                    return Err(StoreError::from(DomainError::validation(format!(
                        "inactive branch {id} cannot be the headquarters"
                    ))));
                }
                Some(true) => {}
            }
            let stamp = encode_ts(now());
            sqlx::query("UPDATE branches SET is_headquarters = 0, updated_at = ?1 WHERE is_headquarters = 1 AND id <> ?2")
                .bind(&stamp)
                .bind(id.get())
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("set_headquarters", e))?;
            sqlx::query("UPDATE branches SET is_headquarters = 1, updated_at = ?1 WHERE id = ?2")
                .bind(&stamp)
                .bind(id.get())
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("set_headquarters", e))?;
            Ok::<_, StoreError>(())
        }
        .await;
        uow.finish(result).await?;

        tracing::info!("headquarters moved");
        self.changed(BRANCHES, id.get());
        self.require_branch(id).await
    }

    pub async fn headquarters(&self) -> StoreResult<Option<Branch>> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM branches WHERE is_headquarters = 1",
            BRANCHES.columns
        ))
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("headquarters", e))?;
        row.as_ref().map(row_to_branch).transpose()
    }

    /// `true` when no item or transfer references the branch.
    pub async fn can_delete_branch(&self, id: BranchId) -> StoreResult<bool> {
        Ok(self.dependents(BRANCHES, id.get()).await? == 0)
    }

    pub async fn delete_branch(&self, id: BranchId) -> StoreResult<()> {
        if self.require_branch(id).await?.is_headquarters {
            return Err(DomainError::integrity("the headquarters branch cannot be deleted").into());
        }
        self.delete(BRANCHES, id.get()).await
    }

    // --- categories -----------------------------------------------------

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let new = new.validated()?;
        let mut conn = self.db.acquire().await?;
        let id = sqlx::query(
            "INSERT INTO categories (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(encode_ts(now()))
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("create_category", e))?
        .last_insert_rowid();
        drop(conn);

        self.changed(CATEGORIES, id);
        Ok(Category {
            id: CategoryId::new(id),
            name: new.name,
            description: new.description,
            active: true,
        })
    }

    pub async fn category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        self.fetch(CATEGORIES, id.get(), row_to_category).await
    }

    pub async fn categories(&self, include_inactive: bool) -> StoreResult<Vec<Category>> {
        self.list(CATEGORIES, include_inactive, row_to_category).await
    }

    #[instrument(skip(self, update), fields(category_id = %id))]
    pub async fn update_category(&self, id: CategoryId, update: NewCategory) -> StoreResult<Category> {
        let update = update.validated()?;
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query(
            "UPDATE categories SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(encode_ts(now()))
        .bind(id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;
        drop(conn);

        ensure_touched(result.rows_affected(), CATEGORIES, id.get())?;
        self.changed(CATEGORIES, id.get());
        self.fetch(CATEGORIES, id.get(), row_to_category)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("category {id}")).into())
    }

    /// Deactivation is refused while items still use the category.
    pub async fn set_category_active(&self, id: CategoryId, active: bool) -> StoreResult<()> {
        if !active {
            self.refuse_if_in_use(CATEGORIES, id.get(), "deactivate").await?;
        }
        self.set_active(CATEGORIES, id.get(), active).await
    }

    pub async fn can_delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        Ok(self.dependents(CATEGORIES, id.get()).await? == 0)
    }

    pub async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        self.delete(CATEGORIES, id.get()).await
    }

    // --- units ----------------------------------------------------------

    #[instrument(skip(self, new), fields(code = %new.code))]
    pub async fn create_unit(&self, new: NewUnit) -> StoreResult<Unit> {
        let new = new.validated()?;
        let mut conn = self.db.acquire().await?;
        let id = sqlx::query(
            "INSERT INTO units (code, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(&new.code)
        .bind(&new.name)
        .bind(encode_ts(now()))
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("create_unit", e))?
        .last_insert_rowid();
        drop(conn);

        self.changed(UNITS, id);
        Ok(Unit {
            id: UnitId::new(id),
            code: new.code,
            name: new.name,
            active: true,
        })
    }

    pub async fn unit(&self, id: UnitId) -> StoreResult<Option<Unit>> {
        self.fetch(UNITS, id.get(), row_to_unit).await
    }

    pub async fn units(&self, include_inactive: bool) -> StoreResult<Vec<Unit>> {
        self.list(UNITS, include_inactive, row_to_unit).await
    }

    #[instrument(skip(self, update), fields(unit_id = %id))]
    pub async fn update_unit(&self, id: UnitId, update: NewUnit) -> StoreResult<Unit> {
        let update = update.validated()?;
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("UPDATE units SET code = ?1, name = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(&update.code)
            .bind(&update.name)
            .bind(encode_ts(now()))
            .bind(id.get())
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("update_unit", e))?;
        drop(conn);

        ensure_touched(result.rows_affected(), UNITS, id.get())?;
        self.changed(UNITS, id.get());
        self.fetch(UNITS, id.get(), row_to_unit)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("unit {id}")).into())
    }

    /// Deactivation is refused while items still use the unit.
    pub async fn set_unit_active(&self, id: UnitId, active: bool) -> StoreResult<()> {
        if !active {
            self.refuse_if_in_use(UNITS, id.get(), "deactivate").await?;
        }
        self.set_active(UNITS, id.get(), active).await
    }

    pub async fn can_delete_unit(&self, id: UnitId) -> StoreResult<bool> {
        Ok(self.dependents(UNITS, id.get()).await? == 0)
    }

    pub async fn delete_unit(&self, id: UnitId) -> StoreResult<()> {
        self.delete(UNITS, id.get()).await
    }

    // --- suppliers ------------------------------------------------------

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_supplier(&self, new: NewSupplier) -> StoreResult<Supplier> {
        let new = new.validated()?;
        let mut conn = self.db.acquire().await?;
        let id = sqlx::query(
            r#"
            INSERT INTO suppliers (name, contact, phone, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&new.name)
        .bind(&new.contact)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(encode_ts(now()))
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("create_supplier", e))?
        .last_insert_rowid();
        drop(conn);

        self.changed(SUPPLIERS, id);
        Ok(Supplier {
            id: SupplierId::new(id),
            name: new.name,
            contact: new.contact,
            phone: new.phone,
            email: new.email,
            active: true,
        })
    }

    pub async fn supplier(&self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        self.fetch(SUPPLIERS, id.get(), row_to_supplier).await
    }

    pub async fn suppliers(&self, include_inactive: bool) -> StoreResult<Vec<Supplier>> {
        self.list(SUPPLIERS, include_inactive, row_to_supplier).await
    }

    #[instrument(skip(self, update), fields(supplier_id = %id))]
    pub async fn update_supplier(&self, id: SupplierId, update: NewSupplier) -> StoreResult<Supplier> {
        let update = update.validated()?;
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE suppliers SET name = ?1, contact = ?2, phone = ?3, email = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&update.name)
        .bind(&update.contact)
        .bind(&update.phone)
        .bind(&update.email)
        .bind(encode_ts(now()))
        .bind(id.get())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("update_supplier", e))?;
        drop(conn);

        ensure_touched(result.rows_affected(), SUPPLIERS, id.get())?;
        self.changed(SUPPLIERS, id.get());
        self.fetch(SUPPLIERS, id.get(), row_to_supplier)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("supplier {id}")).into())
    }

    pub async fn set_supplier_active(&self, id: SupplierId, active: bool) -> StoreResult<()> {
        self.set_active(SUPPLIERS, id.get(), active).await
    }

    pub async fn can_delete_supplier(&self, id: SupplierId) -> StoreResult<bool> {
        Ok(self.dependents(SUPPLIERS, id.get()).await? == 0)
    }

    pub async fn delete_supplier(&self, id: SupplierId) -> StoreResult<()> {
        self.delete(SUPPLIERS, id.get()).await
    }

    // --- shared ---------------------------------------------------------

    async fn require_branch(&self, id: BranchId) -> StoreResult<Branch> {
        self.branch(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("branch {id}")).into())
    }

    async fn fetch<T>(
        &self,
        table: RefTable,
        id: i64,
        map: fn(&sqlx::sqlite::SqliteRow) -> StoreResult<T>,
    ) -> StoreResult<Option<T>> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE id = ?1",
            table.columns, table.table
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("fetch_reference", e))?;
        row.as_ref().map(map).transpose()
    }

    async fn list<T>(
        &self,
        table: RefTable,
        include_inactive: bool,
        map: fn(&sqlx::sqlite::SqliteRow) -> StoreResult<T>,
    ) -> StoreResult<Vec<T>> {
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE (?1 = 1 OR active = 1) ORDER BY {}",
            table.columns, table.table, table.order_by
        ))
        .bind(include_inactive)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("list_reference", e))?;
        map_rows(rows, map)
    }

    async fn set_active(&self, table: RefTable, id: i64, active: bool) -> StoreResult<()> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query(&format!(
            "UPDATE {} SET active = ?1, updated_at = ?2 WHERE id = ?3",
            table.table
        ))
        .bind(active)
        .bind(encode_ts(now()))
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("set_reference_active", e))?;
        drop(conn);

        ensure_touched(result.rows_affected(), table, id)?;
        tracing::info!(table = table.table, id, active, "reference activity changed");
        self.changed(table, id);
        Ok(())
    }

    async fn dependents(&self, table: RefTable, id: i64) -> StoreResult<i64> {
        let mut conn = self.db.acquire().await?;
        count_dependents(&mut conn, table, id).await
    }

    async fn refuse_if_in_use(&self, table: RefTable, id: i64, action: &str) -> StoreResult<()> {
        let n = self.dependents(table, id).await?;
        if n > 0 {
            return Err(DomainError::integrity(format!(
                "cannot {action} {} {id}: {n} dependent record(s) still reference it",
                table.label
            ))
            .into());
        }
        Ok(())
    }

    #[instrument(skip(self, table), fields(table = table.table))]
    async fn delete(&self, table: RefTable, id: i64) -> StoreResult<()> {
        let mut uow = self.db.begin("delete_reference").await?;
        let result = async {
            let conn = uow.conn();
            let n = count_dependents(conn, table, id).await?;
            if n > 0 {
                return Err(StoreError::from(DomainError::integrity(format!(
                    "cannot delete {} {id}: {n} dependent record(s) still reference it",
                    table.label
                ))));
            }
            let deleted = sqlx::query(&format!("DELETE FROM {} WHERE id = ?1", table.table))
                .bind(id)
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("delete_reference", e))?;
            ensure_touched(deleted.rows_affected(), table, id)
        }
        .await;
        uow.finish(result).await?;

        tracing::info!(id, "reference row deleted");
        self.changed(table, id);
        Ok(())
    }

    fn changed(&self, table: RefTable, id: i64) {
        self.db.emit(LedgerEvent::ReferenceDataChanged {
            kind: table.kind,
            id,
            occurred_at: now(),
        });
    }
}

async fn count_dependents(conn: &mut SqliteConnection, table: RefTable, id: i64) -> StoreResult<i64> {
    let mut total = 0;
    for (dependent, column) in table.dependents {
        let n: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {dependent} WHERE {column} = ?1"
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("count_dependents", e))?;
        total += n;
    }
    Ok(total)
}

fn ensure_touched(rows: u64, table: RefTable, id: i64) -> StoreResult<()> {
    if rows == 0 {
        return Err(DomainError::not_found(format!("{} {id}", table.label)).into());
    }
    Ok(())
}
