mod common;

use swagstock_core::DomainError;
use swagstock_inventory::NewCategory;
use swagstock_store::StoreError;

use common::{Fixture, branch};

#[tokio::test]
async fn exactly_one_headquarters() {
    let fx = Fixture::new().await;
    let reference = fx.db.reference();

    assert_eq!(reference.headquarters().await.unwrap().unwrap().id, fx.branch_one);
    let moved = reference.set_headquarters(fx.branch_two).await.unwrap();
    assert!(moved.is_headquarters);

    let flagged: Vec<_> = reference
        .branches(true)
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.is_headquarters)
        .collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].id, fx.branch_two);
}

#[tokio::test]
async fn headquarters_cannot_be_deactivated_or_deleted() {
    let fx = Fixture::new().await;
    let reference = fx.db.reference();

    let deactivate = reference.set_branch_active(fx.branch_one, false).await;
    let delete = reference.delete_branch(fx.branch_one).await;

    assert!(matches!(deactivate, Err(StoreError::Rejected(DomainError::Validation(_)))));
    assert!(matches!(delete, Err(StoreError::Rejected(DomainError::Integrity(_)))));
}

#[tokio::test]
async fn branch_numbers_are_unique() {
    let fx = Fixture::new().await;

    let err = fx.db.reference().create_branch(branch("001", "Again")).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected(DomainError::Conflict(_))));
}

#[tokio::test]
async fn category_in_use_cannot_be_deactivated_or_deleted() {
    let fx = Fixture::new().await;
    fx.item("Pen", fx.branch_one, 1, "2.00").await;
    let reference = fx.db.reference();

    assert!(!reference.can_delete_category(fx.category).await.unwrap());
    let deactivate = reference.set_category_active(fx.category, false).await;
    let delete = reference.delete_category(fx.category).await;

    assert!(matches!(deactivate, Err(StoreError::Rejected(DomainError::Integrity(_)))));
    assert!(matches!(delete, Err(StoreError::Rejected(DomainError::Integrity(_)))));
    assert!(reference.category(fx.category).await.unwrap().unwrap().active);
}

#[tokio::test]
async fn unit_in_use_cannot_be_deleted_until_freed() {
    let fx = Fixture::new().await;
    let pen = fx.item("Pen", fx.branch_one, 1, "2.00").await;
    let reference = fx.db.reference();

    assert!(!reference.can_delete_unit(fx.unit).await.unwrap());
    fx.db.auditor().delete_with_audit(pen.id, &fx.actor, "test").await.unwrap();
    assert!(reference.can_delete_unit(fx.unit).await.unwrap());
    reference.delete_unit(fx.unit).await.unwrap();
    assert!(reference.unit(fx.unit).await.unwrap().is_none());
}

#[tokio::test]
async fn inactive_rows_are_hidden_from_default_lists() {
    let fx = Fixture::new().await;
    let reference = fx.db.reference();
    let spare = reference
        .create_category(NewCategory {
            name: "Spare".to_string(),
            description: Some("  ".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(spare.description, None);

    reference.set_category_active(spare.id, false).await.unwrap();

    assert_eq!(reference.categories(false).await.unwrap().len(), 1);
    assert_eq!(reference.categories(true).await.unwrap().len(), 2);
    reference.set_category_active(spare.id, true).await.unwrap();
    assert_eq!(reference.categories(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn branch_with_transfers_cannot_be_deleted() {
    let fx = Fixture::new().await;
    let pen = fx.item("Pen", fx.branch_one, 10, "2.00").await;
    fx.db.transfers().transfer(pen.id, fx.branch_two, 10, &fx.actor, None).await.unwrap();
    let reference = fx.db.reference();

    assert!(!reference.can_delete_branch(fx.branch_two).await.unwrap());
    let empty = reference.create_branch(branch("009", "Pop-up")).await.unwrap();
    assert!(reference.can_delete_branch(empty.id).await.unwrap());
    reference.delete_branch(empty.id).await.unwrap();
}
