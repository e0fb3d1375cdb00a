//! Data-file layout: tables, read views, upgrades and first-run seed data.

use sqlx::{Row, SqliteConnection};

use crate::error::{StoreResult, map_sqlx_error};
use crate::rows::{encode_ts, now};

/// Layout version written to `PRAGMA user_version`.
///
/// - 1: original layout without a headquarters flag on branches
/// - 2: `branches.is_headquarters` + single-headquarters index
pub const SCHEMA_VERSION: i64 = 2;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS branches (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        number          TEXT NOT NULL UNIQUE,
        name            TEXT NOT NULL,
        location        TEXT NULL,
        active          BOOLEAN NOT NULL DEFAULT 1,
        is_headquarters BOOLEAN NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        description TEXT NULL,
        active      BOOLEAN NOT NULL DEFAULT 1,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS units (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        code       TEXT NOT NULL UNIQUE,
        name       TEXT NOT NULL,
        active     BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS suppliers (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        name       TEXT NOT NULL,
        contact    TEXT NULL,
        phone      TEXT NULL,
        email      TEXT NULL,
        active     BOOLEAN NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        description   TEXT NOT NULL,
        quantity      INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
        unit_cost     TEXT NOT NULL,
        category_id   INTEGER NOT NULL REFERENCES categories(id),
        unit_id       INTEGER NOT NULL REFERENCES units(id),
        branch_id     INTEGER NOT NULL REFERENCES branches(id),
        supplier_id   INTEGER NULL REFERENCES suppliers(id),
        internal_code TEXT NULL,
        min_stock     INTEGER NOT NULL DEFAULT 10 CHECK (min_stock >= 0),
        notes         TEXT NULL,
        created_at    TEXT NOT NULL,
        updated_at    TEXT NOT NULL,
        UNIQUE (description, category_id, branch_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movements (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id       INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
        kind          TEXT NOT NULL CHECK (kind IN ('ENTRY', 'EXIT')),
        quantity      INTEGER NOT NULL CHECK (quantity > 0),
        unit_cost     TEXT NULL,
        user_id       INTEGER NOT NULL,
        user_name     TEXT NOT NULL,
        justification TEXT NULL,
        occurred_at   TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transfers (
        id                    INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id               INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
        destination_item_id   INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
        origin_branch_id      INTEGER NOT NULL REFERENCES branches(id),
        destination_branch_id INTEGER NOT NULL REFERENCES branches(id),
        quantity              INTEGER NOT NULL CHECK (quantity > 0),
        user_id               INTEGER NOT NULL,
        user_name             TEXT NOT NULL,
        justification         TEXT NULL,
        occurred_at           TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS deleted_items (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        original_item_id INTEGER NOT NULL,
        description      TEXT NOT NULL,
        category         TEXT NOT NULL,
        unit             TEXT NOT NULL,
        branch           TEXT NOT NULL,
        supplier         TEXT NULL,
        quantity         INTEGER NOT NULL,
        unit_cost        TEXT NOT NULL,
        internal_code    TEXT NULL,
        notes            TEXT NULL,
        min_stock        INTEGER NOT NULL,
        item_created_at  TEXT NOT NULL,
        movement_count   INTEGER NOT NULL DEFAULT 0,
        transfer_count   INTEGER NOT NULL DEFAULT 0,
        deleted_by_id    INTEGER NOT NULL,
        deleted_by_name  TEXT NOT NULL,
        motive           TEXT NOT NULL CHECK (length(trim(motive)) > 0),
        deleted_at       TEXT NOT NULL
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_branches_headquarters ON branches(is_headquarters) WHERE is_headquarters = 1",
    "CREATE INDEX IF NOT EXISTS ix_items_branch ON items(branch_id)",
    "CREATE INDEX IF NOT EXISTS ix_items_category ON items(category_id)",
    "CREATE INDEX IF NOT EXISTS ix_movements_item ON movements(item_id, occurred_at)",
    "CREATE INDEX IF NOT EXISTS ix_transfers_item ON transfers(item_id, occurred_at)",
    "CREATE INDEX IF NOT EXISTS ix_deleted_items_deleted_at ON deleted_items(deleted_at)",
];

/// Read-only views for reporting and dashboard collaborators. Never written by the store.
const VIEWS: &[(&str, &str)] = &[
    (
        "v_current_stock",
        r#"
        CREATE VIEW v_current_stock AS
        SELECT
            i.id                                   AS item_id,
            i.description                          AS description,
            i.quantity                             AS quantity,
            i.unit_cost                            AS unit_cost,
            CAST(i.unit_cost AS REAL) * i.quantity AS total_value,
            c.name                                 AS category,
            u.code                                 AS unit,
            i.branch_id                            AS branch_id,
            b.name                                 AS branch,
            s.name                                 AS supplier,
            i.min_stock                            AS min_stock,
            CASE WHEN i.quantity <= i.min_stock THEN 1 ELSE 0 END AS low_stock
        FROM items i
        JOIN categories c ON c.id = i.category_id
        JOIN units u      ON u.id = i.unit_id
        JOIN branches b   ON b.id = i.branch_id
        LEFT JOIN suppliers s ON s.id = i.supplier_id
        "#,
    ),
    (
        "v_movement_history",
        r#"
        CREATE VIEW v_movement_history AS
        SELECT
            m.id, m.item_id, i.description, m.kind, m.quantity, m.unit_cost,
            i.branch_id, b.name AS branch, m.user_id, m.user_name,
            m.justification, m.occurred_at
        FROM movements m
        JOIN items i    ON i.id = m.item_id
        JOIN branches b ON b.id = i.branch_id
        "#,
    ),
    (
        "v_transfer_history",
        r#"
        CREATE VIEW v_transfer_history AS
        SELECT
            t.id, t.item_id, i.description, t.quantity,
            t.origin_branch_id, bo.name AS origin_branch,
            t.destination_branch_id, bd.name AS destination_branch,
            t.user_id, t.user_name, t.justification, t.occurred_at
        FROM transfers t
        JOIN items i     ON i.id = t.item_id
        JOIN branches bo ON bo.id = t.origin_branch_id
        JOIN branches bd ON bd.id = t.destination_branch_id
        "#,
    ),
];

const DEFAULT_UNITS: &[(&str, &str)] = &[
    ("UN", "Unit"),
    ("KG", "Kilogram"),
    ("LT", "Litre"),
    ("CX", "Box"),
    ("PC", "Piece"),
    ("MT", "Metre"),
];

const DEFAULT_CATEGORIES: &[&str] = &[
    "Office",
    "Technology",
    "Apparel",
    "Accessories",
    "Promotional Material",
    "Other",
];

/// `PRAGMA user_version` of an open connection.
pub(crate) async fn read_version(conn: &mut SqliteConnection) -> StoreResult<i64> {
    let row = sqlx::query("PRAGMA user_version")
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("read_schema_version", e))?;
    row.try_get::<i64, _>(0)
        .map_err(|e| map_sqlx_error("read_schema_version", e))
}

/// Bring the connected file up to [`SCHEMA_VERSION`].
///
/// Idempotent: tables are created if missing, older layouts are upgraded in
/// place and views are rebuilt so they always match the current tables.
pub(crate) async fn apply(conn: &mut SqliteConnection) -> StoreResult<()> {
    let before = read_version(conn).await?;

    for ddl in TABLES {
        sqlx::query(ddl)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("create_table", e))?;
    }

    if !has_column(conn, "branches", "is_headquarters").await? {
        add_headquarters_flag(conn).await?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("create_index", e))?;
    }

    for (name, ddl) in VIEWS {
        sqlx::query(&format!("DROP VIEW IF EXISTS {name}"))
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("drop_view", e))?;
        sqlx::query(ddl)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("create_view", e))?;
    }

    sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("write_schema_version", e))?;

    if before != SCHEMA_VERSION {
        tracing::info!(from = before, to = SCHEMA_VERSION, "data file schema updated");
    }
    Ok(())
}

async fn has_column(conn: &mut SqliteConnection, table: &str, column: &str) -> StoreResult<bool> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM pragma_table_info(?1) WHERE name = ?2")
        .bind(table)
        .bind(column)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("inspect_schema", e))?;
    let n: i64 = row
        .try_get("n")
        .map_err(|e| map_sqlx_error("inspect_schema", e))?;
    Ok(n > 0)
}

/// Version 1 -> 2: the oldest branch becomes the headquarters.
async fn add_headquarters_flag(conn: &mut SqliteConnection) -> StoreResult<()> {
    sqlx::query("ALTER TABLE branches ADD COLUMN is_headquarters BOOLEAN NOT NULL DEFAULT 0")
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("add_headquarters_flag", e))?;
    let promoted = sqlx::query(
        r#"
        UPDATE branches SET is_headquarters = 1
        WHERE id = (SELECT MIN(id) FROM branches)
        "#,
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("add_headquarters_flag", e))?;
    tracing::info!(
        promoted = promoted.rows_affected(),
        "added headquarters flag to branches"
    );
    Ok(())
}

/// Default units, categories and a headquarters branch for an empty file.
pub(crate) async fn seed_defaults(conn: &mut SqliteConnection) -> StoreResult<bool> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM branches")
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("seed_defaults", e))?;
    let branches: i64 = row
        .try_get("n")
        .map_err(|e| map_sqlx_error("seed_defaults", e))?;
    if branches > 0 {
        return Ok(false);
    }

    let at = encode_ts(now());
    for (code, name) in DEFAULT_UNITS {
        sqlx::query(
            "INSERT OR IGNORE INTO units (code, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(code)
        .bind(name)
        .bind(&at)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("seed_defaults", e))?;
    }
    for name in DEFAULT_CATEGORIES {
        sqlx::query(
            "INSERT OR IGNORE INTO categories (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind(name)
        .bind(&at)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("seed_defaults", e))?;
    }
    sqlx::query(
        r#"
        INSERT INTO branches (number, name, is_headquarters, created_at, updated_at)
        VALUES ('001', 'Headquarters', 1, ?1, ?1)
        "#,
    )
    .bind(&at)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("seed_defaults", e))?;

    tracing::info!("seeded default units, categories and headquarters branch");
    Ok(true)
}
