mod common;

use swagstock_core::{DomainError, UnitCost};
use swagstock_inventory::{DEFAULT_MIN_STOCK, NewItem};
use swagstock_store::StoreError;

use common::Fixture;

#[tokio::test]
async fn created_item_reads_back_with_default_min_stock() {
    let fx = Fixture::new().await;
    let pen = fx.item("Pen", fx.branch_one, 100, "2.00").await;

    let read = fx.db.catalog().get_item(pen.id).await.unwrap().unwrap();

    assert_eq!(read, pen);
    assert_eq!(read.min_stock, DEFAULT_MIN_STOCK);
    assert!(fx.db.catalog().get_item(swagstock_core::ItemId::new(999)).await.unwrap().is_none());
}

#[tokio::test]
async fn a_product_has_one_row_per_branch() {
    let fx = Fixture::new().await;
    fx.item("Pen", fx.branch_one, 1, "2.00").await;

    let duplicate = fx
        .db
        .catalog()
        .create_item(NewItem::new(fx.template("Pen", "2.00"), fx.branch_one, 1))
        .await;
    let other_branch = fx
        .db
        .catalog()
        .create_item(NewItem::new(fx.template("Pen", "2.00"), fx.branch_two, 1))
        .await;

    assert!(matches!(duplicate, Err(StoreError::Rejected(DomainError::Conflict(_)))));
    assert!(other_branch.is_ok());
}

#[tokio::test]
async fn remove_stock_never_clamps() {
    let fx = Fixture::new().await;
    let pen = fx.item("Pen", fx.branch_one, 3, "2.00").await;
    let catalog = fx.db.catalog();

    let err = catalog.remove_stock(pen.id, 4).await.unwrap_err();
    assert_eq!(err.domain(), Some(&DomainError::insufficient_stock(3, 4)));
    assert_eq!(catalog.remove_stock(pen.id, 3).await.unwrap().quantity, 0);

    let restocked = catalog.add_stock(pen.id, 7, Some("1.75".parse().unwrap())).await.unwrap();
    assert_eq!(restocked.quantity, 7);
    assert_eq!(restocked.unit_cost, "1.75".parse::<UnitCost>().unwrap());
}

#[tokio::test]
async fn update_changes_descriptive_fields_only() {
    let fx = Fixture::new().await;
    let pen = fx.item("Pen", fx.branch_one, 40, "2.00").await;
    let mut update = pen.template();
    update.description = "Blue Pen".to_string();
    update.notes = Some("logo on clip".to_string());
    update.min_stock = Some(5);

    let updated = fx.db.catalog().update_item(pen.id, update).await.unwrap();

    assert_eq!(updated.description, "Blue Pen");
    assert_eq!(updated.quantity, 40);
    assert_eq!(updated.min_stock, 5);
    assert_eq!(fx.db.catalog().get_item(pen.id).await.unwrap(), Some(updated));
}

#[tokio::test]
async fn update_cannot_collide_with_another_row() {
    let fx = Fixture::new().await;
    fx.item("Pen", fx.branch_one, 1, "2.00").await;
    let pencil = fx.item("Pencil", fx.branch_one, 1, "1.00").await;
    let mut update = pencil.template();
    update.description = "Pen".to_string();

    let err = fx.db.catalog().update_item(pencil.id, update).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected(DomainError::Conflict(_))));
}

#[tokio::test]
async fn lookups_by_category_and_description() {
    let fx = Fixture::new().await;
    fx.item("Pen", fx.branch_one, 1, "2.00").await;
    fx.item("Pen", fx.branch_two, 1, "2.00").await;
    fx.item("Mug", fx.branch_two, 1, "3.00").await;
    let catalog = fx.db.catalog();

    assert_eq!(catalog.items_by_category(fx.category, None).await.unwrap().len(), 3);
    assert_eq!(
        catalog
            .items_by_category(fx.category, Some(fx.branch_two))
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(catalog.items_by_description("pen").await.unwrap().len(), 2);
    assert!(catalog.items_by_description("%").await.unwrap().is_empty());
}

#[tokio::test]
async fn stock_overview_resolves_names_and_flags_low_stock() {
    let fx = Fixture::new().await;
    fx.item("Pen", fx.branch_one, 100, "2.00").await;
    fx.item("Mug", fx.branch_one, 10, "3.50").await;

    let overview = fx.db.catalog().stock_overview(Some(fx.branch_one)).await.unwrap();
    assert_eq!(overview.len(), 2);
    let mug = overview.iter().find(|r| r.description == "Mug").unwrap();
    assert_eq!(mug.total_value, Some("35.00".parse().unwrap()));
    assert_eq!(mug.branch, "Branch 1");
    assert_eq!(mug.unit, "UN");
    assert!(mug.low_stock, "quantity equal to the threshold counts as low");

    let low = fx.db.catalog().low_stock(None).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].description, "Mug");
}

#[tokio::test]
async fn items_cannot_be_created_in_an_inactive_branch() {
    let fx = Fixture::new().await;
    fx.db.reference().set_branch_active(fx.branch_two, false).await.unwrap();

    let err = fx
        .db
        .catalog()
        .create_item(NewItem::new(fx.template("Pen", "2.00"), fx.branch_two, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected(DomainError::Validation(_))));
}

#[tokio::test]
async fn stock_value_out_of_decimal_range_is_refused() {
    let fx = Fixture::new().await;
    let catalog = fx.db.catalog();

    let err = catalog
        .create_item(NewItem::new(
            fx.template("Crate", "100000000000"),
            fx.branch_one,
            1_000_000_000_000_000_000,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected(DomainError::Validation(_))));

    let crate_row = fx.item("Crate", fx.branch_one, 1_000, "100000000000").await;
    let err = catalog
        .add_stock(crate_row.id, 1_000_000_000_000_000_000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected(DomainError::Validation(_))));
    assert_eq!(fx.quantity_of(&crate_row).await, 1_000);
    assert!(catalog.stock_overview(None).await.is_ok());
}

#[tokio::test]
async fn overview_survives_a_row_whose_value_cannot_be_represented() {
    let fx = Fixture::new().await;
    let pen = fx.item("Pen", fx.branch_one, 1, "100000000000").await;

    fx.execute_outside(&format!(
        "UPDATE items SET quantity = 1000000000000000000 WHERE id = {}",
        pen.id.get()
    ))
    .await;

    let overview = fx.db.catalog().stock_overview(None).await.unwrap();
    assert_eq!(overview.len(), 1);
    assert_eq!(overview[0].total_value, None);
    assert_eq!(fx.db.catalog().get_item(pen.id).await.unwrap().unwrap().total_value(), None);
}
