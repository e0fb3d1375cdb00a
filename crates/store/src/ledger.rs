//! Append-only entry/exit movements.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

use swagstock_core::{Actor, ItemId, MovementId, UnitCost};
use swagstock_events::LedgerEvent;
use swagstock_inventory::{Item, Movement, MovementFilter, MovementKind, require_text};

use crate::catalog::{apply_deposit, apply_withdrawal};
use crate::db::Database;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::rows::{encode_ts, map_rows, now, row_to_movement};

/// Records stock entries and exits.
///
/// Each call applies the quantity change and appends its movement in one unit
/// of work: either both land or neither does.
pub struct Ledger<'a> {
    db: &'a Database,
}

impl<'a> Ledger<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Receive stock. A present `unit_cost` becomes the item's cost (last-cost basis).
    #[instrument(skip(self, actor, justification), fields(item_id = %item_id, user = %actor.user_id()))]
    pub async fn record_entry(
        &self,
        item_id: ItemId,
        quantity: i64,
        unit_cost: Option<UnitCost>,
        actor: &Actor,
        justification: Option<&str>,
    ) -> StoreResult<Movement> {
        let justification = normalize_justification(justification);
        let mut uow = self.db.begin("record_entry").await?;
        let result = async {
            let at = now();
            let item = apply_deposit(uow.conn(), item_id, quantity, unit_cost, at).await?;
            let movement = insert_movement(
                uow.conn(),
                MovementDraft {
                    item_id,
                    kind: MovementKind::Entry,
                    quantity,
                    unit_cost,
                    actor,
                    justification: justification.as_deref(),
                    at,
                },
            )
            .await?;
            Ok::<_, StoreError>((item, movement))
        }
        .await;
        let (item, movement) = uow.finish(result).await?;

        tracing::info!(quantity, quantity_after = item.quantity, "stock entry recorded");
        self.emit_stock_changed(&item, quantity);
        Ok(movement)
    }

    /// Issue stock. Requires a justification; never takes more than the row holds.
    #[instrument(skip(self, actor, justification), fields(item_id = %item_id, user = %actor.user_id()))]
    pub async fn record_exit(
        &self,
        item_id: ItemId,
        quantity: i64,
        actor: &Actor,
        justification: &str,
    ) -> StoreResult<Movement> {
        let justification = require_text("justification", justification)?;
        let mut uow = self.db.begin("record_exit").await?;
        let result = async {
            let at = now();
            let item = apply_withdrawal(uow.conn(), item_id, quantity, at).await?;
            let movement = insert_movement(
                uow.conn(),
                MovementDraft {
                    item_id,
                    kind: MovementKind::Exit,
                    quantity,
                    unit_cost: None,
                    actor,
                    justification: Some(&justification),
                    at,
                },
            )
            .await?;
            Ok::<_, StoreError>((item, movement))
        }
        .await;
        let (item, movement) = match uow.finish(result).await {
            Ok(done) => done,
            Err(err) => {
                if err.is_business() {
                    tracing::warn!(error = %err, "stock exit rejected");
                }
                return Err(err);
            }
        };

        tracing::info!(quantity, quantity_after = item.quantity, "stock exit recorded");
        self.emit_stock_changed(&item, -quantity);
        Ok(movement)
    }

    /// Movement history, newest first. Date bounds are inclusive whole days.
    pub async fn movements(&self, filter: &MovementFilter) -> StoreResult<Vec<Movement>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, item_id, kind, quantity, unit_cost, user_id, user_name, justification, occurred_at \
             FROM v_movement_history WHERE 1 = 1",
        );
        if let Some(item_id) = filter.item_id {
            qb.push(" AND item_id = ").push_bind(item_id.get());
        }
        if let Some(branch_id) = filter.branch_id {
            qb.push(" AND branch_id = ").push_bind(branch_id.get());
        }
        if let Some(period) = filter.period {
            qb.push(" AND occurred_at >= ").push_bind(encode_ts(period.start()));
            qb.push(" AND occurred_at < ").push_bind(encode_ts(period.end_exclusive()));
        }
        qb.push(" ORDER BY occurred_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let mut conn = self.db.acquire().await?;
        let rows = qb
            .build()
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_movements", e))?;
        map_rows(rows, row_to_movement)
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

/// Optional free text: blank is stored as absent.
pub(crate) fn normalize_justification(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

struct MovementDraft<'d> {
    item_id: ItemId,
    kind: MovementKind,
    quantity: i64,
    unit_cost: Option<UnitCost>,
    actor: &'d Actor,
    justification: Option<&'d str>,
    at: DateTime<Utc>,
}

async fn insert_movement(conn: &mut SqliteConnection, draft: MovementDraft<'_>) -> StoreResult<Movement> {
    let result = sqlx::query(
        r#"
        INSERT INTO movements (item_id, kind, quantity, unit_cost, user_id, user_name, justification, occurred_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(draft.item_id.get())
    .bind(draft.kind.as_str())
    .bind(draft.quantity)
    .bind(draft.unit_cost.map(|c| c.to_string()))
    .bind(draft.actor.user_id().get())
    .bind(draft.actor.name())
    .bind(draft.justification)
    .bind(encode_ts(draft.at))
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;

    Ok(Movement {
        id: MovementId::new(result.last_insert_rowid()),
        item_id: draft.item_id,
        kind: draft.kind,
        quantity: draft.quantity,
        unit_cost: draft.unit_cost,
        user_id: draft.actor.user_id(),
        user_name: draft.actor.name().to_string(),
        justification: draft.justification.map(str::to_string),
        occurred_at: draft.at,
    })
}
