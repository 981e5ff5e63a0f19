//! Database layer — migrations, identifier counters, and queries for the
//! identity directory, catalog, and per-party inventory ledger.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::errors::{ApiError, Result};
use crate::models::{
    normalize_address, now, InventoryItemRecord, InventoryUpdate, NewInventoryItem, NewParty,
    NewProduct, PartyRecord, PartyUpdate, ProductRecord, ProductStatus, ProductUpdate,
};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ─────────────────────────────────────────────────────────
// Sequential identifiers
// ─────────────────────────────────────────────────────────

/// Reserve the next catalog identifier (`PRD-` + zero-padded counter).
///
/// The counter row is created on first use, seeded from the highest suffix
/// already in the table, so numbering continues across a counter reset.
/// Runs on the caller's transaction: the reservation commits or rolls back
/// with the surrounding write.
pub async fn next_product_id(conn: &mut SqliteConnection) -> Result<String> {
    let (value,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO sequences (name, value)
        VALUES (
            'product',
            COALESCE((SELECT MAX(CAST(substr(product_id, 5) AS INTEGER)) FROM products), 0) + 1
        )
        ON CONFLICT(name) DO UPDATE SET value = value + 1
        RETURNING value
        "#,
    )
    .fetch_one(conn)
    .await?;
    Ok(format!("PRD-{value:03}"))
}

/// Reserve the next order identifier (`ORD-` + zero-padded counter).
pub async fn next_order_id(conn: &mut SqliteConnection) -> Result<String> {
    let (value,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO sequences (name, value)
        VALUES (
            'order',
            COALESCE((SELECT MAX(CAST(substr(order_id, 5) AS INTEGER)) FROM orders), 0) + 1
        )
        ON CONFLICT(name) DO UPDATE SET value = value + 1
        RETURNING value
        "#,
    )
    .fetch_one(conn)
    .await?;
    Ok(format!("ORD-{value:03}"))
}

// ─────────────────────────────────────────────────────────
// Identity directory
// ─────────────────────────────────────────────────────────

const PARTY_COLUMNS: &str = "id, wallet_address, role, name, company_name, email, phone, \
     location, registration_id, license_number, verified, created_at, updated_at";

/// Resolve a party by wallet address (case-insensitive).
pub async fn get_party(pool: &SqlitePool, address: &str) -> Result<Option<PartyRecord>> {
    let normalized = normalize_address(address);
    let row = sqlx::query_as::<_, PartyRecord>(&format!(
        "SELECT {PARTY_COLUMNS} FROM parties WHERE wallet_address = ?1"
    ))
    .bind(&normalized)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list_parties(pool: &SqlitePool, role: Option<&str>) -> Result<Vec<PartyRecord>> {
    let rows = match role {
        Some(role) => {
            sqlx::query_as::<_, PartyRecord>(&format!(
                "SELECT {PARTY_COLUMNS} FROM parties WHERE role = ?1 ORDER BY created_at ASC, id ASC"
            ))
            .bind(role)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, PartyRecord>(&format!(
                "SELECT {PARTY_COLUMNS} FROM parties ORDER BY created_at ASC, id ASC"
            ))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Register a new party. Conflicts if a party already exists for the
/// normalized address, however the existing record was cased.
pub async fn insert_party(pool: &SqlitePool, party: &NewParty) -> Result<PartyRecord> {
    let address = normalize_address(&party.wallet_address);
    let timestamp = now();

    let row = sqlx::query_as::<_, PartyRecord>(&format!(
        r#"
        INSERT INTO parties
            (wallet_address, role, name, company_name, email, phone, location,
             registration_id, license_number, verified, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)
        RETURNING {PARTY_COLUMNS}
        "#
    ))
    .bind(&address)
    .bind(&party.role)
    .bind(&party.name)
    .bind(&party.company_name)
    .bind(&party.email)
    .bind(&party.phone)
    .bind(&party.location)
    .bind(&party.registration_id)
    .bind(&party.license_number)
    .bind(timestamp)
    .fetch_one(pool)
    .await;

    match row {
        Ok(row) => Ok(row),
        Err(e) if is_unique_violation(&e) => Err(ApiError::Conflict(
            "A party with this wallet address is already registered".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Apply a profile update. Address, role, and verification flag are not
/// reachable through this path.
pub async fn update_party(
    pool: &SqlitePool,
    address: &str,
    update: &PartyUpdate,
) -> Result<Option<PartyRecord>> {
    let normalized = normalize_address(address);
    let row = sqlx::query_as::<_, PartyRecord>(&format!(
        r#"
        UPDATE parties SET
            name            = COALESCE(?2, name),
            company_name    = COALESCE(?3, company_name),
            email           = COALESCE(?4, email),
            phone           = COALESCE(?5, phone),
            location        = COALESCE(?6, location),
            registration_id = COALESCE(?7, registration_id),
            license_number  = COALESCE(?8, license_number),
            updated_at      = ?9
        WHERE wallet_address = ?1
        RETURNING {PARTY_COLUMNS}
        "#
    ))
    .bind(&normalized)
    .bind(&update.name)
    .bind(&update.company_name)
    .bind(&update.email)
    .bind(&update.phone)
    .bind(&update.location)
    .bind(&update.registration_id)
    .bind(&update.license_number)
    .bind(now())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ─────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────

const PRODUCT_COLUMNS: &str = "id, product_id, name, category, description, manufacturer, \
     batch_number, price, quantity, unit, image_url, status, created_at, updated_at";

pub async fn list_products(
    pool: &SqlitePool,
    category: Option<&str>,
    status: Option<&str>,
) -> Result<Vec<ProductRecord>> {
    let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products");
    let mut clauses = Vec::new();
    if category.is_some() {
        clauses.push("category = ?");
    }
    if status.is_some() {
        clauses.push("status = ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at ASC, id ASC");

    let mut query = sqlx::query_as::<_, ProductRecord>(&sql);
    if let Some(category) = category {
        query = query.bind(category);
    }
    if let Some(status) = status {
        query = query.bind(status);
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn get_product(pool: &SqlitePool, product_id: &str) -> Result<Option<ProductRecord>> {
    let row = sqlx::query_as::<_, ProductRecord>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = ?1"
    ))
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Create a catalog entry with a generated identifier and derived status.
pub async fn insert_product(pool: &SqlitePool, product: &NewProduct) -> Result<ProductRecord> {
    let mut tx = pool.begin().await?;
    let product_id = next_product_id(&mut *tx).await?;
    let status = ProductStatus::for_quantity(product.quantity);
    let timestamp = now();

    let row = sqlx::query_as::<_, ProductRecord>(&format!(
        r#"
        INSERT INTO products
            (product_id, name, category, description, manufacturer, batch_number,
             price, quantity, unit, image_url, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(&product_id)
    .bind(&product.name)
    .bind(&product.category)
    .bind(&product.description)
    .bind(&product.manufacturer)
    .bind(&product.batch_number)
    .bind(product.price)
    .bind(product.quantity)
    .bind(&product.unit)
    .bind(&product.image_url)
    .bind(status.as_str())
    .bind(timestamp)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Apply a partial catalog update. When the quantity changes the status is
/// rederived from it; the stored status is kept otherwise.
pub async fn update_product(
    pool: &SqlitePool,
    product_id: &str,
    update: &ProductUpdate,
) -> Result<Option<ProductRecord>> {
    let derived_status = update
        .quantity
        .map(|quantity| ProductStatus::for_quantity(quantity).as_str());

    let row = sqlx::query_as::<_, ProductRecord>(&format!(
        r#"
        UPDATE products SET
            name         = COALESCE(?2, name),
            category     = COALESCE(?3, category),
            description  = COALESCE(?4, description),
            manufacturer = COALESCE(?5, manufacturer),
            batch_number = COALESCE(?6, batch_number),
            price        = COALESCE(?7, price),
            quantity     = COALESCE(?8, quantity),
            unit         = COALESCE(?9, unit),
            image_url    = COALESCE(?10, image_url),
            status       = COALESCE(?11, status),
            updated_at   = ?12
        WHERE product_id = ?1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(product_id)
    .bind(&update.name)
    .bind(&update.category)
    .bind(&update.description)
    .bind(&update.manufacturer)
    .bind(&update.batch_number)
    .bind(update.price)
    .bind(update.quantity)
    .bind(&update.unit)
    .bind(&update.image_url)
    .bind(derived_status)
    .bind(now())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_product(pool: &SqlitePool, product_id: &str) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM products WHERE product_id = ?1")
        .bind(product_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

// ─────────────────────────────────────────────────────────
// Inventory ledger
// ─────────────────────────────────────────────────────────

const INVENTORY_COLUMNS: &str = "id, wallet_address, name, description, quantity, price, \
     category, image_url, created_at, updated_at";

/// List a party's stock records. `address` must already be normalized.
pub async fn list_inventory(pool: &SqlitePool, address: &str) -> Result<Vec<InventoryItemRecord>> {
    let rows = sqlx::query_as::<_, InventoryItemRecord>(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE wallet_address = ?1 ORDER BY name ASC"
    ))
    .bind(address)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Create a stock record. Conflicts if the party already holds an item of
/// this name; the existing record is left untouched.
pub async fn insert_inventory_item(
    pool: &SqlitePool,
    item: &NewInventoryItem,
) -> Result<InventoryItemRecord> {
    let address = normalize_address(&item.wallet_address);
    let timestamp = now();

    let row = sqlx::query_as::<_, InventoryItemRecord>(&format!(
        r#"
        INSERT INTO inventory
            (wallet_address, name, description, quantity, price, category,
             image_url, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        RETURNING {INVENTORY_COLUMNS}
        "#
    ))
    .bind(&address)
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.price)
    .bind(&item.category)
    .bind(&item.image_url)
    .bind(timestamp)
    .fetch_one(pool)
    .await;

    match row {
        Ok(row) => Ok(row),
        Err(e) if is_unique_violation(&e) => Err(ApiError::Conflict(
            "An item with this name already exists in this party's inventory".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_inventory_item(
    pool: &SqlitePool,
    update: &InventoryUpdate,
) -> Result<Option<InventoryItemRecord>> {
    let address = normalize_address(&update.wallet_address);
    let row = sqlx::query_as::<_, InventoryItemRecord>(&format!(
        r#"
        UPDATE inventory SET
            description = COALESCE(?3, description),
            quantity    = COALESCE(?4, quantity),
            price       = COALESCE(?5, price),
            category    = COALESCE(?6, category),
            image_url   = COALESCE(?7, image_url),
            updated_at  = ?8
        WHERE wallet_address = ?1 AND name = ?2
        RETURNING {INVENTORY_COLUMNS}
        "#
    ))
    .bind(&address)
    .bind(&update.name)
    .bind(&update.description)
    .bind(update.quantity)
    .bind(update.price)
    .bind(&update.category)
    .bind(&update.image_url)
    .bind(now())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_inventory_item(pool: &SqlitePool, address: &str, name: &str) -> Result<bool> {
    let normalized = normalize_address(address);
    let affected = sqlx::query("DELETE FROM inventory WHERE wallet_address = ?1 AND name = ?2")
        .bind(&normalized)
        .bind(name)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

/// In-memory pool with the full schema, for tests across the crate.
///
/// Capped at one connection: each in-memory SQLite connection is its own
/// database.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}
