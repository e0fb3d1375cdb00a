#![allow(dead_code)]

use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};

use swagstock_core::{Actor, BranchId, CategoryId, UnitCost, UnitId, UserId};
use swagstock_events::{InMemoryEventBus, LedgerEvent};
use swagstock_inventory::{Item, ItemTemplate, NewBranch, NewCategory, NewItem, NewUnit};
use swagstock_store::{Database, DatabaseConfig};
use tempfile::TempDir;

/// A fresh data file with two branches, one category and one unit.
pub struct Fixture {
    pub dir: TempDir,
    pub db: Database,
    pub bus: Arc<InMemoryEventBus<LedgerEvent>>,
    pub branch_one: BranchId,
    pub branch_two: BranchId,
    pub category: CategoryId,
    pub unit: UnitId,
    pub actor: Actor,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let config = DatabaseConfig::new(dir.path().join("stock.db")).without_seed();
        let bus: Arc<InMemoryEventBus<LedgerEvent>> = Arc::new(InMemoryEventBus::new());
        let db = Database::open(&config)
            .await
            .expect("failed to open database")
            .with_events(bus.clone());

        let reference = db.reference();
        let branch_one = reference
            .create_branch(branch("001", "Branch 1"))
            .await
            .expect("failed to create branch 1")
            .id;
        reference
            .set_headquarters(branch_one)
            .await
            .expect("failed to set headquarters");
        let branch_two = reference
            .create_branch(branch("002", "Branch 2"))
            .await
            .expect("failed to create branch 2")
            .id;
        let category = reference
            .create_category(NewCategory {
                name: "Office".to_string(),
                description: None,
            })
            .await
            .expect("failed to create category")
            .id;
        let unit = reference
            .create_unit(NewUnit {
                code: "UN".to_string(),
                name: "Unit".to_string(),
            })
            .await
            .expect("failed to create unit")
            .id;

        Self {
            dir,
            db,
            bus,
            branch_one,
            branch_two,
            category,
            unit,
            actor: Actor::new(UserId::new(7), "maria").expect("valid actor"),
        }
    }

    pub fn template(&self, description: &str, cost: &str) -> ItemTemplate {
        ItemTemplate {
            description: description.to_string(),
            unit_cost: cost.parse::<UnitCost>().expect("valid cost"),
            category_id: self.category,
            unit_id: self.unit,
            supplier_id: None,
            internal_code: None,
            notes: None,
            min_stock: None,
        }
    }

    pub async fn item(&self, description: &str, branch: BranchId, quantity: i64, cost: &str) -> Item {
        self.db
            .catalog()
            .create_item(NewItem::new(self.template(description, cost), branch, quantity))
            .await
            .expect("failed to create item")
    }

    /// Run `sql` on a second connection, the way an outside tool would.
    pub async fn execute_outside(&self, sql: &str) {
        let options = SqliteConnectOptions::new().filename(self.dir.path().join("stock.db"));
        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .expect("failed to open side connection");
        sqlx::query(sql)
            .execute(&mut conn)
            .await
            .expect("side statement failed");
        conn.close().await.expect("failed to close side connection");
    }

    pub async fn quantity_of(&self, item: &Item) -> i64 {
        self.db
            .catalog()
            .get_item(item.id)
            .await
            .expect("failed to read item")
            .expect("item exists")
            .quantity
    }
}

pub fn branch(number: &str, name: &str) -> NewBranch {
    NewBranch {
        number: number.to_string(),
        name: name.to_string(),
        location: None,
    }
}
