//! Snapshot-then-delete for item rows.

use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tracing::instrument;

use swagstock_core::{Actor, DeletionId, DomainError, ItemId};
use swagstock_events::LedgerEvent;
use swagstock_inventory::{DeletedItemSnapshot, DeletionFilter, require_text};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::rows::{encode_ts, map_rows, now, row_to_snapshot};

const SNAPSHOT_COLUMNS: &str = "id, original_item_id, description, category, unit, branch, supplier, \
     quantity, unit_cost, internal_code, notes, min_stock, item_created_at, movement_count, \
     transfer_count, deleted_by_id, deleted_by_name, motive, deleted_at";

/// Permanently removes items, leaving a readable snapshot behind.
pub struct DeletionAuditor<'a> {
    db: &'a Database,
}

impl<'a> DeletionAuditor<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Delete an item after archiving its full state.
    ///
    /// The snapshot resolves category, unit, branch and supplier to names and
    /// is written before the row is removed, in the same unit of work. The
    /// item's movements and transfers cascade away with it; their counts are
    /// kept on the snapshot.
    #[instrument(skip(self, actor, motive), fields(item_id = %item_id, user = %actor.user_id()))]
    pub async fn delete_with_audit(
        &self,
        item_id: ItemId,
        actor: &Actor,
        motive: &str,
    ) -> StoreResult<DeletedItemSnapshot> {
        let motive = require_text("deletion motive", motive)?;

        let mut uow = self.db.begin("delete_with_audit").await?;
        let result = async {
            let conn = uow.conn();
            let snapshot = capture_and_store(conn, item_id, actor, &motive).await?;
            let deleted = sqlx::query("DELETE FROM items WHERE id = ?1")
                .bind(item_id.get())
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("delete_item", e))?;
            if deleted.rows_affected() != 1 {
                return Err(StoreError::corrupt(
                    "items",
                    format!("item {item_id} vanished while being deleted"),
                ));
            }
            Ok::<_, StoreError>(snapshot)
        }
        .await;
        let snapshot = uow.finish(result).await?;

        tracing::info!(
            snapshot_id = %snapshot.id,
            movements = snapshot.movement_count,
            transfers = snapshot.transfer_count,
            "item deleted with audit snapshot"
        );
        self.db.emit(LedgerEvent::ItemDeleted {
            item_id,
            snapshot_id: snapshot.id,
            occurred_at: snapshot.deleted_at,
        });
        Ok(snapshot)
    }

    /// Snapshots newest first, paged and optionally filtered.
    pub async fn snapshots(&self, filter: &DeletionFilter) -> StoreResult<Vec<DeletedItemSnapshot>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM deleted_items WHERE 1 = 1"
        ));
        if let Some(user) = filter.deleted_by {
            qb.push(" AND deleted_by_id = ").push_bind(user.get());
        }
        if let Some(period) = filter.period {
            qb.push(" AND deleted_at >= ").push_bind(encode_ts(period.start()));
            qb.push(" AND deleted_at < ").push_bind(encode_ts(period.end_exclusive()));
        }
        qb.push(" ORDER BY deleted_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let mut conn = self.db.acquire().await?;
        let rows = qb
            .build()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_deleted_items", e))?;
        map_rows(rows, row_to_snapshot)
    }

    pub async fn snapshot(&self, id: DeletionId) -> StoreResult<Option<DeletedItemSnapshot>> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM deleted_items WHERE id = ?1"
        ))
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("get_deleted_item", e))?;
        row.as_ref().map(row_to_snapshot).transpose()
    }

    /// Total number of deletion snapshots.
    pub async fn count(&self) -> StoreResult<i64> {
        let mut conn = self.db.acquire().await?;
        sqlx::query_scalar("SELECT COUNT(*) FROM deleted_items")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("count_deleted_items", e))
    }
}

async fn capture_and_store(
    conn: &mut SqliteConnection,
    item_id: ItemId,
    actor: &Actor,
    motive: &str,
) -> StoreResult<DeletedItemSnapshot> {
    let deleted_at = now();
    let resolved = sqlx::query(
        r#"
        SELECT
            i.description, i.quantity, i.unit_cost, i.internal_code, i.notes,
            i.min_stock, i.created_at,
            c.name AS category, u.code AS unit, b.name AS branch, s.name AS supplier,
            (SELECT COUNT(*) FROM movements m WHERE m.item_id = i.id) AS movement_count,
            (SELECT COUNT(*) FROM transfers t
              WHERE t.item_id = i.id OR t.destination_item_id = i.id) AS transfer_count
        FROM items i
        JOIN categories c ON c.id = i.category_id
        JOIN units u      ON u.id = i.unit_id
        JOIN branches b   ON b.id = i.branch_id
        LEFT JOIN suppliers s ON s.id = i.supplier_id
        WHERE i.id = ?1
        "#,
    )
    .bind(item_id.get())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("resolve_item_for_deletion", e))?
    .ok_or_else(|| StoreError::from(DomainError::not_found(format!("item {item_id}"))))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO deleted_items (
            original_item_id, description, category, unit, branch, supplier,
            quantity, unit_cost, internal_code, notes, min_stock, item_created_at,
            movement_count, transfer_count, deleted_by_id, deleted_by_name, motive, deleted_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(item_id.get())
    .bind(column::<String>(&resolved, "description")?)
    .bind(column::<String>(&resolved, "category")?)
    .bind(column::<String>(&resolved, "unit")?)
    .bind(column::<String>(&resolved, "branch")?)
    .bind(column::<Option<String>>(&resolved, "supplier")?)
    .bind(column::<i64>(&resolved, "quantity")?)
    .bind(column::<String>(&resolved, "unit_cost")?)
    .bind(column::<Option<String>>(&resolved, "internal_code")?)
    .bind(column::<Option<String>>(&resolved, "notes")?)
    .bind(column::<i64>(&resolved, "min_stock")?)
    .bind(column::<String>(&resolved, "created_at")?)
    .bind(column::<i64>(&resolved, "movement_count")?)
    .bind(column::<i64>(&resolved, "transfer_count")?)
    .bind(actor.user_id().get())
    .bind(actor.name())
    .bind(motive)
    .bind(encode_ts(deleted_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_deleted_item", e))?;

    // Read back through the same mapper the queries use.
    let row = sqlx::query(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM deleted_items WHERE id = ?1"
    ))
    .bind(inserted.last_insert_rowid())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("read_deleted_item", e))?;
    row_to_snapshot(&row)
}

fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &'static str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| map_sqlx_error("resolve_item_for_deletion", e))
}
