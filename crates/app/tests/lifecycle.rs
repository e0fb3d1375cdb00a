use swagstock_app::{AppConfig, AppError, Inventory};
use swagstock_backup::{BackupError, BackupReason};
use swagstock_core::{Actor, UnitCost, UserId};
use swagstock_events::{EventBus, LedgerEvent};
use swagstock_inventory::{ItemTemplate, NewItem};
use tempfile::TempDir;

fn config(dir: &TempDir) -> AppConfig {
    AppConfig::in_dir(dir.path())
}

async fn add_pen(inventory: &Inventory) -> swagstock_inventory::Item {
    let db = inventory.db().unwrap();
    let reference = db.reference();
    let hq = reference.headquarters().await.unwrap().expect("seeded headquarters");
    let category = reference.categories(false).await.unwrap().remove(0);
    let unit = reference.units(false).await.unwrap().remove(0);
    let template = ItemTemplate {
        description: "Pen".to_string(),
        unit_cost: "2.00".parse::<UnitCost>().unwrap(),
        category_id: category.id,
        unit_id: unit.id,
        supplier_id: None,
        internal_code: None,
        notes: None,
        min_stock: None,
    };
    db.catalog().create_item(NewItem::new(template, hq.id, 100)).await.unwrap()
}

#[tokio::test]
async fn first_start_creates_a_seeded_file_without_a_backup() {
    let dir = TempDir::new().unwrap();

    let inventory = Inventory::start(config(&dir)).await.unwrap();

    assert!(inventory.is_open());
    assert!(inventory.config().data_file.exists());
    assert!(inventory.backups().list_backups().await.unwrap().is_empty());
    assert!(inventory.db().unwrap().reference().headquarters().await.unwrap().is_some());
}

#[tokio::test]
async fn later_starts_back_up_the_existing_file_once_per_interval() {
    let dir = TempDir::new().unwrap();
    Inventory::start(config(&dir)).await.unwrap().shutdown().await;

    Inventory::start(config(&dir)).await.unwrap().shutdown().await;
    Inventory::start(config(&dir)).await.unwrap().shutdown().await;

    let inventory = Inventory::start(config(&dir)).await.unwrap();
    let backups = inventory.backups().list_backups().await.unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].reason, BackupReason::AutoFirst);
}

#[tokio::test]
async fn configured_default_min_stock_applies_to_new_items() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.default_min_stock = 3;

    let inventory = Inventory::start(config).await.unwrap();
    let pen = add_pen(&inventory).await;

    assert_eq!(pen.min_stock, 3);
}

#[tokio::test]
async fn restore_brings_back_deleted_data_and_reopens() {
    let dir = TempDir::new().unwrap();
    let mut inventory = Inventory::start(config(&dir)).await.unwrap();
    let pen = add_pen(&inventory).await;
    let actor = Actor::new(UserId::new(1), "admin").unwrap();

    inventory.db().unwrap().ledger().record_exit(pen.id, 40, &actor, "fair").await.unwrap();
    let snapshot = inventory
        .backups()
        .create_backup(BackupReason::Manual)
        .await
        .unwrap()
        .unwrap();
    inventory
        .db()
        .unwrap()
        .auditor()
        .delete_with_audit(pen.id, &actor, "mistake")
        .await
        .unwrap();

    let report = inventory.restore(&snapshot.path).await.unwrap();

    assert_eq!(report.safety_backup.unwrap().reason, BackupReason::PreRestore);
    let restored = inventory.db().unwrap().catalog().get_item(pen.id).await.unwrap().unwrap();
    assert_eq!(restored.quantity, 60);
    assert_eq!(inventory.db().unwrap().auditor().count().await.unwrap(), 0);

    let subscription = inventory.events().subscribe();
    inventory.db().unwrap().ledger().record_exit(pen.id, 1, &actor, "sample").await.unwrap();
    assert!(matches!(
        subscription.try_recv().unwrap(),
        LedgerEvent::StockChanged { quantity_after: 59, .. }
    ));
}

#[tokio::test]
async fn failed_restore_keeps_the_current_file_open() {
    let dir = TempDir::new().unwrap();
    let mut inventory = Inventory::start(config(&dir)).await.unwrap();
    let pen = add_pen(&inventory).await;

    let err = inventory
        .restore(&dir.path().join("backups").join("missing.db"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Backup(BackupError::NotFound(_))));
    assert!(inventory.is_open());
    assert!(inventory.db().unwrap().catalog().get_item(pen.id).await.unwrap().is_some());
}

#[tokio::test]
async fn recreate_backs_up_then_starts_empty() {
    let dir = TempDir::new().unwrap();
    let mut inventory = Inventory::start(config(&dir)).await.unwrap();
    let pen = add_pen(&inventory).await;

    let snapshot = inventory.recreate().await.unwrap().expect("file existed");

    assert_eq!(snapshot.reason, BackupReason::Recreate);
    let db = inventory.db().unwrap();
    assert!(db.catalog().get_item(pen.id).await.unwrap().is_none());
    assert_eq!(db.reference().branches(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reopen_keeps_the_handle_usable() {
    let dir = TempDir::new().unwrap();
    let mut inventory = Inventory::start(config(&dir)).await.unwrap();

    inventory.reopen().await.unwrap();

    assert!(inventory.db().is_ok());
    assert!(!AppError::NotOpen.is_business());
}

#[tokio::test]
async fn manual_backup_releases_the_connection_and_reopens() {
    let dir = TempDir::new().unwrap();
    let mut inventory = Inventory::start(config(&dir)).await.unwrap();
    let pen = add_pen(&inventory).await;

    let snapshot = inventory.backup(BackupReason::Manual).await.unwrap().expect("data file exists");

    assert!(inventory.is_open());
    assert_eq!(snapshot.reason, BackupReason::Manual);
    let copy = dir.path().join("copy.db");
    std::fs::copy(&snapshot.path, &copy).unwrap();
    let restored = swagstock_store::Database::open(&swagstock_store::DatabaseConfig::new(&copy).without_seed())
        .await
        .unwrap();
    let read = restored.catalog().get_item(pen.id).await.unwrap().expect("pen is in the backup");
    assert_eq!(read.quantity, 100);
    restored.close().await;

    let live = inventory.db().unwrap().catalog().get_item(pen.id).await.unwrap();
    assert_eq!(live.map(|item| item.quantity), Some(100));
}
