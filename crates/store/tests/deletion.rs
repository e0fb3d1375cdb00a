mod common;

use chrono::Utc;
use swagstock_core::{Actor, DomainError, UnitCost, UserId};
use swagstock_inventory::{DateRange, DeletionFilter, MovementFilter, NewSupplier};
use swagstock_store::StoreError;

use common::Fixture;

#[tokio::test]
async fn deletion_leaves_a_snapshot_of_the_previous_state() {
    let fx = Fixture::new().await;
    let mug = fx.item("Mug", fx.branch_one, 5, "3.00").await;

    let snapshot = fx.db.auditor().delete_with_audit(mug.id, &fx.actor, "damaged").await.unwrap();

    assert_eq!(snapshot.original_item_id, mug.id);
    assert_eq!(snapshot.description, "Mug");
    assert_eq!(snapshot.quantity, 5);
    assert_eq!(snapshot.unit_cost, "3.00".parse::<UnitCost>().unwrap());
    assert_eq!(snapshot.motive, "damaged");
    assert_eq!(snapshot.category, "Office");
    assert_eq!(snapshot.unit, "UN");
    assert_eq!(snapshot.branch, "Branch 1");
    assert_eq!(snapshot.supplier, None);
    assert_eq!(snapshot.min_stock, mug.min_stock);
    assert_eq!(snapshot.item_created_at, mug.created_at);
    assert_eq!(snapshot.deleted_by_id, UserId::new(7));
    assert_eq!(snapshot.deleted_by_name, "maria");

    assert!(fx.db.catalog().get_item(mug.id).await.unwrap().is_none());
    assert_eq!(fx.db.auditor().snapshot(snapshot.id).await.unwrap(), Some(snapshot));
    assert_eq!(fx.db.auditor().count().await.unwrap(), 1);
}

#[tokio::test]
async fn empty_motive_is_rejected_and_the_item_survives() {
    let fx = Fixture::new().await;
    let mug = fx.item("Mug", fx.branch_one, 5, "3.00").await;

    let err = fx.db.auditor().delete_with_audit(mug.id, &fx.actor, "  ").await.unwrap_err();

    assert!(matches!(err, StoreError::Rejected(DomainError::Validation(_))));
    assert!(fx.db.catalog().get_item(mug.id).await.unwrap().is_some());
    assert_eq!(fx.db.auditor().count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_delete_discards_the_snapshot() {
    let fx = Fixture::new().await;
    let mug = fx.item("Mug", fx.branch_one, 5, "3.00").await;
    fx.execute_outside(
        "CREATE TRIGGER keep_items BEFORE DELETE ON items BEGIN SELECT RAISE(ABORT, 'items are locked'); END",
    )
    .await;

    let err = fx
        .db
        .auditor()
        .delete_with_audit(mug.id, &fx.actor, "damaged")
        .await
        .unwrap_err();

    assert!(!err.is_business());
    assert_eq!(fx.db.auditor().count().await.unwrap(), 0);
    assert_eq!(fx.quantity_of(&mug).await, 5);
}

#[tokio::test]
async fn deleting_an_unknown_item_writes_no_snapshot() {
    let fx = Fixture::new().await;

    let err = fx
        .db
        .auditor()
        .delete_with_audit(swagstock_core::ItemId::new(42), &fx.actor, "gone")
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Rejected(DomainError::NotFound(_))));
    assert_eq!(fx.db.auditor().count().await.unwrap(), 0);
}

#[tokio::test]
async fn snapshot_counts_the_history_that_cascades_away() {
    let fx = Fixture::new().await;
    let supplier = fx
        .db
        .reference()
        .create_supplier(NewSupplier {
            name: "Acme Gifts".to_string(),
            contact: None,
            phone: None,
            email: None,
        })
        .await
        .unwrap();
    let mut template = fx.template("Mug", "3.00");
    template.supplier_id = Some(supplier.id);
    let mug = fx
        .db
        .catalog()
        .create_item(swagstock_inventory::NewItem::new(template, fx.branch_one, 20))
        .await
        .unwrap();
    fx.db.ledger().record_exit(mug.id, 2, &fx.actor, "sample").await.unwrap();
    fx.db.ledger().record_entry(mug.id, 1, None, &fx.actor, None).await.unwrap();
    fx.db.transfers().transfer(mug.id, fx.branch_two, 4, &fx.actor, None).await.unwrap();

    let snapshot = fx.db.auditor().delete_with_audit(mug.id, &fx.actor, "obsolete").await.unwrap();

    assert_eq!(snapshot.quantity, 15);
    assert_eq!(snapshot.movement_count, 2);
    assert_eq!(snapshot.transfer_count, 1);
    assert_eq!(snapshot.supplier.as_deref(), Some("Acme Gifts"));
    let history = fx.db.ledger().movements(&MovementFilter::for_item(mug.id)).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn snapshots_are_paged_and_filtered_by_user_and_day() {
    let fx = Fixture::new().await;
    let other = Actor::new(UserId::new(8), "joao").unwrap();
    for (i, actor) in [&fx.actor, &other, &fx.actor].into_iter().enumerate() {
        let item = fx.item(&format!("Item {i}"), fx.branch_one, 1, "1.00").await;
        fx.db.auditor().delete_with_audit(item.id, actor, "cleanup").await.unwrap();
    }
    let auditor = fx.db.auditor();

    let all = auditor.snapshots(&DeletionFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].description, "Item 2", "newest first");

    let mine = auditor.snapshots(&DeletionFilter::by_user(UserId::new(7))).await.unwrap();
    assert_eq!(mine.len(), 2);

    let page = auditor.snapshots(&DeletionFilter::default().page(1, 1)).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].description, "Item 1");

    let today = DateRange::day(Utc::now().date_naive());
    assert_eq!(auditor.snapshots(&DeletionFilter::default().within(today)).await.unwrap().len(), 3);
}
