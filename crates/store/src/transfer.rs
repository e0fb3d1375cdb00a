//! Inter-branch transfers and multi-branch fan-out creation.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::instrument;

use swagstock_core::{Actor, BranchId, DomainError, ItemId, TransferId};
use swagstock_events::LedgerEvent;
use swagstock_inventory::{
    Distribution, Item, ItemTemplate, NewItem, Transfer, TransferFilter, TransferOutcome,
    check_withdrawal, require_positive, validate_distribution,
};

use crate::catalog::{apply_deposit, apply_withdrawal, find_matching, insert_item, require_item};
use crate::db::Database;
use crate::error::{StoreError, StoreResult, map_sqlx_error};
use crate::ledger::normalize_justification;
use crate::rows::{encode_ts, map_rows, now, row_to_transfer};

/// Moves quantity between branches.
pub struct TransferCoordinator<'a> {
    db: &'a Database,
}

impl<'a> TransferCoordinator<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Move `quantity` of an item to another branch.
    ///
    /// The destination row for the same product (description + category) is
    /// credited at the source's unit cost, or created with the source's
    /// attributes when the branch has none. Debit, credit and the transfer
    /// record commit together or not at all.
    #[instrument(
        skip(self, actor, justification),
        fields(item_id = %item_id, destination = %destination, user = %actor.user_id())
    )]
    pub async fn transfer(
        &self,
        item_id: ItemId,
        destination: BranchId,
        quantity: i64,
        actor: &Actor,
        justification: Option<&str>,
    ) -> StoreResult<TransferOutcome> {
        require_positive("transfer quantity", quantity)?;
        let justification = normalize_justification(justification);

        let default_min_stock = self.db.default_min_stock();
        let mut uow = self.db.begin("transfer").await?;
        let result = async {
            let at = now();
            let conn = uow.conn();
            let source = require_item(conn, item_id).await?;
            if source.branch_id == destination {
                return Err(StoreError::from(DomainError::validation(
                    "origin and destination branches must differ",
                )));
            }
            require_active_branch(conn, destination).await?;
            check_withdrawal(source.quantity, quantity)?;

            let debited = apply_withdrawal(conn, item_id, quantity, at).await?;
            let (credited, created) =
                match find_matching(conn, &source.description, source.category_id, destination).await? {
                    Some(existing) => (
                        apply_deposit(conn, existing.id, quantity, Some(source.unit_cost), at).await?,
                        false,
                    ),
                    None => (
                        insert_item(
                            conn,
                            &NewItem::new(source.template(), destination, quantity),
                            default_min_stock,
                            at,
                        )
                        .await?,
                        true,
                    ),
                };

            let transfer = insert_transfer(
                conn,
                &debited,
                &credited,
                quantity,
                actor,
                justification.as_deref(),
                at,
            )
            .await?;
            Ok::<_, StoreError>((debited, credited, created, transfer))
        }
        .await;

        let (debited, credited, created, transfer) = match uow.finish(result).await {
            Ok(done) => done,
            Err(err) => {
                if err.is_business() {
                    tracing::warn!(error = %err, "transfer rejected");
                }
                return Err(err);
            }
        };

        tracing::info!(
            transfer_id = %transfer.id,
            quantity,
            destination_item = %credited.id,
            created_destination = created,
            "transfer recorded"
        );
        self.db.emit(LedgerEvent::StockChanged {
            item_id: debited.id,
            branch_id: debited.branch_id,
            delta: -quantity,
            quantity_after: debited.quantity,
            occurred_at: transfer.occurred_at,
        });
        if created {
            self.db.emit(LedgerEvent::ItemCreated {
                item_id: credited.id,
                branch_id: credited.branch_id,
                quantity: credited.quantity,
                occurred_at: transfer.occurred_at,
            });
        } else {
            self.db.emit(LedgerEvent::StockChanged {
                item_id: credited.id,
                branch_id: credited.branch_id,
                delta: quantity,
                quantity_after: credited.quantity,
                occurred_at: transfer.occurred_at,
            });
        }
        self.db.emit(LedgerEvent::TransferRecorded {
            transfer_id: transfer.id,
            source_item: debited.id,
            destination_item: credited.id,
            origin: debited.branch_id,
            destination: credited.branch_id,
            quantity,
            occurred_at: transfer.occurred_at,
        });

        Ok(TransferOutcome {
            transfer,
            source_quantity_after: debited.quantity,
            destination_quantity_after: credited.quantity,
            created_destination: created,
        })
    }

    /// Create one row per branch of `distribution`, all from the same template.
    ///
    /// The shares must add up to `declared_total`; every row is created or none is.
    #[instrument(skip(self, template, distribution), fields(description = %template.description, branches = distribution.len()))]
    pub async fn create_multi_branch(
        &self,
        template: ItemTemplate,
        distribution: &Distribution,
        declared_total: i64,
    ) -> StoreResult<Vec<Item>> {
        validate_distribution(distribution, declared_total)?;
        let template = template.validated()?;

        let default_min_stock = self.db.default_min_stock();
        let mut uow = self.db.begin("create_multi_branch").await?;
        let result = async {
            let at = now();
            let mut created = Vec::with_capacity(distribution.len());
            for (&branch_id, &quantity) in distribution {
                let new_item = NewItem::new(template.clone(), branch_id, quantity);
                created.push(insert_item(uow.conn(), &new_item, default_min_stock, at).await?);
            }
            Ok::<_, StoreError>(created)
        }
        .await;
        let items = uow.finish(result).await?;

        tracing::info!(total = declared_total, "multi-branch item created");
        for item in &items {
            self.db.emit(LedgerEvent::ItemCreated {
                item_id: item.id,
                branch_id: item.branch_id,
                quantity: item.quantity,
                occurred_at: item.created_at,
            });
        }
        Ok(items)
    }

    /// Transfer history, newest first. A branch filter matches either end.
    pub async fn transfers(&self, filter: &TransferFilter) -> StoreResult<Vec<Transfer>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, item_id, destination_item_id, origin_branch_id, destination_branch_id, \
             quantity, user_id, user_name, justification, occurred_at FROM transfers WHERE 1 = 1",
        );
        if let Some(item_id) = filter.item_id {
            qb.push(" AND (item_id = ")
                .push_bind(item_id.get())
                .push(" OR destination_item_id = ")
                .push_bind(item_id.get())
                .push(")");
        }
        if let Some(branch_id) = filter.branch_id {
            qb.push(" AND (origin_branch_id = ")
                .push_bind(branch_id.get())
                .push(" OR destination_branch_id = ")
                .push_bind(branch_id.get())
                .push(")");
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
            .map_err(|e| map_sqlx_error("list_transfers", e))?;
        map_rows(rows, row_to_transfer)
    }
}

async fn require_active_branch(conn: &mut SqliteConnection, id: BranchId) -> StoreResult<()> {
    let active: Option<bool> = sqlx::query_scalar("SELECT active FROM branches WHERE id = ?1")
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("check_branch", e))?;
    match active {
        None => Err(DomainError::not_found(format!("branch {id}")).into()),
        Some(false) => Err(DomainError::validation(format!("branch {id} is inactive")).into()),
        Some(true) => Ok(()),
    }
}

async fn insert_transfer(
    conn: &mut SqliteConnection,
    source: &Item,
    destination: &Item,
    quantity: i64,
    actor: &Actor,
    justification: Option<&str>,
    at: DateTime<Utc>,
) -> StoreResult<Transfer> {
    let result = sqlx::query(
        r#"
        INSERT INTO transfers (
            item_id, destination_item_id, origin_branch_id, destination_branch_id,
            quantity, user_id, user_name, justification, occurred_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(source.id.get())
    .bind(destination.id.get())
    .bind(source.branch_id.get())
    .bind(destination.branch_id.get())
    .bind(quantity)
    .bind(actor.user_id().get())
    .bind(actor.name())
    .bind(justification)
    .bind(encode_ts(at))
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_transfer", e))?;

    Ok(Transfer {
        id: TransferId::new(result.last_insert_rowid()),
        item_id: source.id,
        destination_item_id: destination.id,
        origin_branch_id: source.branch_id,
        destination_branch_id: destination.branch_id,
        quantity,
        user_id: actor.user_id(),
        user_name: actor.name().to_string(),
        justification: justification.map(str::to_string),
        occurred_at: at,
    })
}
