//! Order workflow — transactional creation, guarded status updates, and
//! chain linkage.
//!
//! Creation runs as one database transaction: every catalog decrement, the
//! identifier reservation, and the order insert commit together or not at
//! all. When a chain bridge is configured the anchor call happens inside
//! the open transaction, so a bridge failure rolls back every local write.

use sqlx::SqlitePool;
use tracing::info;

use crate::chain::ChainBridge;
use crate::db;
use crate::errors::{ApiError, Result};
use crate::models::{
    now, ChainLinkage, NewOrder, OrderDetail, OrderLine, OrderRecord, OrderStatus, OrderUpdate,
    PartySummary, ProductRecord, ProductStatus, TrackingEntry,
};

const ORDER_COLUMNS: &str = "id, order_id, buyer_address, seller_address, total_amount, status, \
     shipping_address, transaction_hash, blockchain_order_id, created_at, updated_at";

/// Filters accepted by the order listing.
#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub buyer: Option<String>,
    pub seller: Option<String>,
    pub status: Option<String>,
}

/// Metadata reference anchored alongside an order.
pub(crate) fn metadata_uri(order_id: &str) -> String {
    format!("pharmatrace://order/{order_id}")
}

// ─────────────────────────────────────────────────────────
// Creation
// ─────────────────────────────────────────────────────────

/// Place an order from a cart of catalog references.
///
/// Fails with NotFound for a missing party or product and with Validation
/// for an invalid or unfillable line, in both cases leaving the catalog
/// untouched. Prices are captured per line as the decrement happens; the
/// total is a snapshot and is never recomputed later.
pub async fn create_order(
    pool: &SqlitePool,
    bridge: Option<&ChainBridge>,
    order: &NewOrder,
) -> Result<OrderDetail> {
    if order.items.is_empty() {
        return Err(ApiError::Validation(
            "Order must contain at least one item".to_string(),
        ));
    }
    for line in &order.items {
        if line.quantity < 1 {
            return Err(ApiError::Validation(format!(
                "Invalid quantity for product {}",
                line.product_id
            )));
        }
    }

    let buyer = db::get_party(pool, &order.buyer_address)
        .await?
        .ok_or_else(|| ApiError::NotFound("Buyer not found".to_string()))?;
    let seller = db::get_party(pool, &order.seller_address)
        .await?
        .ok_or_else(|| ApiError::NotFound("Seller not found".to_string()))?;

    let timestamp = now();
    let mut tx = pool.begin().await?;

    let mut captured: Vec<(ProductRecord, i64)> = Vec::with_capacity(order.items.len());
    let mut total = 0.0_f64;

    for line in &order.items {
        let product: Option<ProductRecord> = sqlx::query_as(
            "SELECT id, product_id, name, category, description, manufacturer, batch_number, \
             price, quantity, unit, image_url, status, created_at, updated_at \
             FROM products WHERE product_id = ?1",
        )
        .bind(&line.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let product = product.ok_or_else(|| {
            ApiError::NotFound(format!("Product {} not found", line.product_id))
        })?;
        if product.quantity < line.quantity {
            return Err(ApiError::Validation(format!(
                "Insufficient quantity for product {}",
                product.name
            )));
        }

        let remaining = product.quantity - line.quantity;
        let status = ProductStatus::for_quantity(remaining);

        // The quantity guard catches a competing decrement between the read
        // above and this write.
        let affected = sqlx::query(
            "UPDATE products SET quantity = quantity - ?2, status = ?3, updated_at = ?4 \
             WHERE product_id = ?1 AND quantity >= ?2",
        )
        .bind(&product.product_id)
        .bind(line.quantity)
        .bind(status.as_str())
        .bind(timestamp)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(ApiError::Validation(format!(
                "Insufficient quantity for product {}",
                product.name
            )));
        }

        total += product.price * line.quantity as f64;
        captured.push((product, line.quantity));
    }

    let order_id = db::next_order_id(&mut *tx).await?;

    // Anchor before anything becomes visible; a bridge failure rolls the
    // whole transaction back.
    let mut transaction_hash = None;
    if let Some(bridge) = bridge {
        let receipt = bridge
            .create_order(&order_id, &metadata_uri(&order_id), total)
            .await?;
        transaction_hash = receipt.transaction_hash;
    }

    sqlx::query(
        "INSERT INTO orders \
            (order_id, buyer_address, seller_address, total_amount, status, \
             shipping_address, transaction_hash, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
    )
    .bind(&order_id)
    .bind(&buyer.wallet_address)
    .bind(&seller.wallet_address)
    .bind(total)
    .bind(OrderStatus::Pending.as_str())
    .bind(&order.shipping_address)
    .bind(&transaction_hash)
    .bind(timestamp)
    .execute(&mut *tx)
    .await?;

    for (product, quantity) in &captured {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&order_id)
        .bind(&product.product_id)
        .bind(*quantity)
        .bind(product.price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        "Order {order_id} created: {} -> {}, {} line(s), total {total}",
        seller.wallet_address,
        buyer.wallet_address,
        captured.len()
    );

    get_order_detail(pool, &order_id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Order {order_id} vanished after commit")))
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

/// Fetch one order joined with party display fields, line items, and
/// tracking history.
pub async fn get_order_detail(pool: &SqlitePool, order_id: &str) -> Result<Option<OrderDetail>> {
    let order: Option<OrderRecord> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    match order {
        Some(order) => Ok(Some(load_detail(pool, order).await?)),
        None => Ok(None),
    }
}

/// List orders matching the filter, joined like [`get_order_detail`].
pub async fn list_orders(pool: &SqlitePool, filter: &OrderFilter) -> Result<Vec<OrderDetail>> {
    let buyer = filter.buyer.as_deref().map(crate::models::normalize_address);
    let seller = filter
        .seller
        .as_deref()
        .map(crate::models::normalize_address);

    let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders");
    let mut clauses = Vec::new();
    if buyer.is_some() {
        clauses.push("buyer_address = ?");
    }
    if seller.is_some() {
        clauses.push("seller_address = ?");
    }
    if filter.status.is_some() {
        clauses.push("status = ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at ASC, id ASC");

    let mut query = sqlx::query_as::<_, OrderRecord>(&sql);
    if let Some(buyer) = &buyer {
        query = query.bind(buyer.clone());
    }
    if let Some(seller) = &seller {
        query = query.bind(seller.clone());
    }
    if let Some(status) = &filter.status {
        query = query.bind(status.clone());
    }
    let orders = query.fetch_all(pool).await?;

    let mut details = Vec::with_capacity(orders.len());
    for order in orders {
        details.push(load_detail(pool, order).await?);
    }
    Ok(details)
}

async fn load_detail(pool: &SqlitePool, order: OrderRecord) -> Result<OrderDetail> {
    let buyer = party_summary(pool, &order.buyer_address).await?;
    let seller = party_summary(pool, &order.seller_address).await?;

    // Display fields come from the catalog at read time; the captured price
    // is the line item's own.
    let items: Vec<OrderLine> = sqlx::query_as(
        "SELECT oi.product_id, \
                COALESCE(p.name, oi.product_id) AS product_name, \
                COALESCE(p.category, '') AS category, \
                COALESCE(p.unit, '') AS unit, \
                oi.quantity, oi.price \
         FROM order_items oi \
         LEFT JOIN products p ON p.product_id = oi.product_id \
         WHERE oi.order_id = ?1 \
         ORDER BY oi.id ASC",
    )
    .bind(&order.order_id)
    .fetch_all(pool)
    .await?;

    let tracking: Vec<TrackingEntry> = sqlx::query_as(
        "SELECT status, description, timestamp FROM order_tracking \
         WHERE order_id = ?1 ORDER BY id ASC",
    )
    .bind(&order.order_id)
    .fetch_all(pool)
    .await?;

    Ok(OrderDetail {
        order,
        buyer,
        seller,
        items,
        tracking,
    })
}

async fn party_summary(pool: &SqlitePool, address: &str) -> Result<PartySummary> {
    let summary: Option<PartySummary> = sqlx::query_as(
        "SELECT wallet_address, name, company_name FROM parties WHERE wallet_address = ?1",
    )
    .bind(address)
    .fetch_optional(pool)
    .await?;
    summary.ok_or_else(|| ApiError::NotFound(format!("Party {address} not found")))
}

// ─────────────────────────────────────────────────────────
// Updates
// ─────────────────────────────────────────────────────────

/// Apply a partial update. Buyer, seller, identifier, items, and total are
/// immutable; status changes must follow the transition table. A status
/// change accompanied by a tracking description appends an audit entry.
pub async fn update_order(
    pool: &SqlitePool,
    bridge: Option<&ChainBridge>,
    order_id: &str,
    update: &OrderUpdate,
) -> Result<Option<OrderDetail>> {
    let order: Option<OrderRecord> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
    let Some(order) = order else {
        return Ok(None);
    };

    let mut next_status: Option<OrderStatus> = None;
    if let Some(requested) = &update.status {
        let next = OrderStatus::parse(requested).ok_or_else(|| {
            ApiError::Validation(format!("Unknown order status: {requested}"))
        })?;
        let current = OrderStatus::parse(&order.status).ok_or_else(|| {
            ApiError::Internal(format!("Order {order_id} has corrupt status {}", order.status))
        })?;
        if next != current {
            if !current.can_transition_to(next) {
                return Err(ApiError::Validation(format!(
                    "Cannot move order from {} to {}",
                    current.as_str(),
                    next.as_str()
                )));
            }
            next_status = Some(next);
        }
    }

    // Anchored orders report lifecycle milestones to the contract before
    // any local write; an upstream failure leaves the order untouched.
    if let (Some(bridge), Some(next)) = (bridge, next_status) {
        if order.transaction_hash.is_some() {
            match next {
                OrderStatus::Processing => bridge.accept_order(order_id).await?,
                OrderStatus::Completed => bridge.complete_order(order_id).await?,
                _ => {}
            }
        }
    }

    let timestamp = now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE orders SET \
            status = COALESCE(?2, status), \
            shipping_address = COALESCE(?3, shipping_address), \
            updated_at = ?4 \
         WHERE order_id = ?1",
    )
    .bind(order_id)
    .bind(next_status.map(|s| s.as_str()))
    .bind(&update.shipping_address)
    .bind(timestamp)
    .execute(&mut *tx)
    .await?;

    if let (Some(next), Some(description)) = (next_status, &update.tracking_update) {
        sqlx::query(
            "INSERT INTO order_tracking (order_id, status, description, timestamp) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(order_id)
        .bind(next.as_str())
        .bind(description)
        .bind(timestamp)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    if let Some(next) = next_status {
        info!("Order {order_id} moved to {}", next.as_str());
    }

    get_order_detail(pool, order_id).await
}

/// Record chain-transaction linkage. The only fields this path may touch.
pub async fn set_chain_linkage(
    pool: &SqlitePool,
    order_id: &str,
    linkage: &ChainLinkage,
) -> Result<Option<OrderRecord>> {
    if linkage.transaction_hash.is_none() && linkage.blockchain_order_id.is_none() {
        return Err(ApiError::Validation(
            "Missing blockchain transaction data".to_string(),
        ));
    }
    if let Some(hash) = &linkage.transaction_hash {
        let stripped = hash.strip_prefix("0x").unwrap_or(hash.as_str());
        if stripped.is_empty() || hex::decode(stripped).is_err() {
            return Err(ApiError::Validation(
                "transactionHash must be a hex string".to_string(),
            ));
        }
    }

    let row = sqlx::query_as::<_, OrderRecord>(&format!(
        "UPDATE orders SET \
            transaction_hash = COALESCE(?2, transaction_hash), \
            blockchain_order_id = COALESCE(?3, blockchain_order_id), \
            updated_at = ?4 \
         WHERE order_id = ?1 \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(&linkage.transaction_hash)
    .bind(&linkage.blockchain_order_id)
    .bind(now())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::{CartLine, NewParty, NewProduct};

    async fn register(pool: &SqlitePool, address: &str, role: &str) {
        crate::db::insert_party(
            pool,
            &NewParty {
                wallet_address: address.to_string(),
                role: role.to_string(),
                name: format!("Party {address}"),
                company_name: "Acme Pharma".to_string(),
                email: format!("{address}@acme.example"),
                phone: None,
                location: None,
                registration_id: None,
                license_number: None,
            },
        )
        .await
        .unwrap();
    }

    async fn stock(pool: &SqlitePool, name: &str, quantity: i64, price: f64) -> String {
        crate::db::insert_product(
            pool,
            &NewProduct {
                name: name.to_string(),
                category: "Antibiotics".to_string(),
                description: "Capsules".to_string(),
                manufacturer: "Acme Pharma".to_string(),
                batch_number: None,
                price,
                quantity,
                unit: "box".to_string(),
                image_url: None,
            },
        )
        .await
        .unwrap()
        .product_id
    }

    fn cart(lines: &[(&str, i64)]) -> Vec<CartLine> {
        lines
            .iter()
            .map(|(id, quantity)| CartLine {
                product_id: id.to_string(),
                quantity: *quantity,
            })
            .collect()
    }

    fn order_request(buyer: &str, seller: &str, items: Vec<CartLine>) -> NewOrder {
        NewOrder {
            buyer_address: buyer.to_string(),
            seller_address: seller.to_string(),
            items,
            shipping_address: Some("12 Depot Rd".to_string()),
        }
    }

    #[tokio::test]
    async fn end_to_end_order_flow() {
        let pool = test_pool().await;
        register(&pool, "0xAAA", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 10.0).await;
        assert_eq!(product_id, "PRD-001");

        let detail = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 30)])),
        )
        .await
        .unwrap();

        assert_eq!(detail.order.order_id, "ORD-001");
        assert_eq!(detail.order.status, "Pending");
        assert_eq!(detail.order.total_amount, 300.0);
        assert_eq!(detail.buyer.wallet_address, "0xbbb");
        assert_eq!(detail.seller.wallet_address, "0xaaa");
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].quantity, 30);
        assert_eq!(detail.items[0].price, 10.0);

        let product = crate::db::get_product(&pool, &product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity, 70);
        assert_eq!(product.status, "Available");

        // Only 70 remain; a request for 80 must fail and change nothing.
        let err = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 80)])),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let product = crate::db::get_product(&pool, &product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity, 70);

        // Draining down to 5 crosses the low-stock threshold.
        create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 65)])),
        )
        .await
        .unwrap();
        let product = crate::db::get_product(&pool, &product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity, 5);
        assert_eq!(product.status, "Low Stock");
    }

    #[tokio::test]
    async fn unfillable_line_rolls_back_every_decrement() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let a = stock(&pool, "Amoxicillin", 10, 2.0).await;
        let b = stock(&pool, "Ibuprofen", 8, 1.0).await;

        let err = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&a, 5), (&b, 20)])),
        )
        .await
        .unwrap_err();
        match err {
            ApiError::Validation(message) => assert!(message.contains("Ibuprofen")),
            other => panic!("expected validation error, got {other:?}"),
        }

        // The passing line's decrement must not survive the failing one.
        let a = crate::db::get_product(&pool, &a).await.unwrap().unwrap();
        let b = crate::db::get_product(&pool, &b).await.unwrap().unwrap();
        assert_eq!(a.quantity, 10);
        assert_eq!(b.quantity, 8);

        let orders = list_orders(&pool, &OrderFilter::default()).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn total_is_a_price_snapshot() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 10.0).await;

        let detail = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 3)])),
        )
        .await
        .unwrap();
        assert_eq!(detail.order.total_amount, 30.0);

        // A later price change must not leak into the persisted order.
        sqlx::query("UPDATE products SET price = 99.0 WHERE product_id = ?1")
            .bind(&product_id)
            .execute(&pool)
            .await
            .unwrap();

        let detail = get_order_detail(&pool, &detail.order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.order.total_amount, 30.0);
        assert_eq!(detail.items[0].price, 10.0);
    }

    #[tokio::test]
    async fn order_ids_are_sequential() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 1.0).await;

        let first = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 1)])),
        )
        .await
        .unwrap();
        let second = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 1)])),
        )
        .await
        .unwrap();
        assert_eq!(first.order.order_id, "ORD-001");
        assert_eq!(second.order.order_id, "ORD-002");
    }

    #[tokio::test]
    async fn creation_rejects_bad_input() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 1.0).await;

        let err = create_order(
            &pool,
            None,
            &order_request("0xccc", "0xaaa", cart(&[(&product_id, 1)])),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[("PRD-999", 1)])),
        )
        .await
        .unwrap_err();
        match err {
            ApiError::NotFound(message) => assert!(message.contains("PRD-999")),
            other => panic!("expected not found, got {other:?}"),
        }

        let err = create_order(&pool, None, &order_request("0xbbb", "0xaaa", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 0)])),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn bridge_failure_persists_nothing() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 10.0).await;

        // Nothing listens here; the anchor call fails before commit.
        let bridge = ChainBridge::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/rpc".to_string(),
            "0xc0ffee".to_string(),
        );

        let err = create_order(
            &pool,
            Some(&bridge),
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 30)])),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Http(_) | ApiError::Upstream(_)));

        let product = crate::db::get_product(&pool, &product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.quantity, 100);
        let orders = list_orders(&pool, &OrderFilter::default()).await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn updates_follow_the_transition_table() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 10.0).await;
        let order_id = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 1)])),
        )
        .await
        .unwrap()
        .order
        .order_id;

        // Pending cannot jump straight to Completed.
        let err = update_order(
            &pool,
            None,
            &order_id,
            &OrderUpdate {
                status: Some("Completed".to_string()),
                shipping_address: None,
                tracking_update: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        for status in ["Processing", "Shipped", "Delivered", "Completed"] {
            let detail = update_order(
                &pool,
                None,
                &order_id,
                &OrderUpdate {
                    status: Some(status.to_string()),
                    shipping_address: None,
                    tracking_update: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
            assert_eq!(detail.order.status, status);
        }

        // Completed is terminal.
        let err = update_order(
            &pool,
            None,
            &order_id,
            &OrderUpdate {
                status: Some("Cancelled".to_string()),
                shipping_address: None,
                tracking_update: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn update_never_touches_immutable_fields() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 10.0).await;
        let created = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 4)])),
        )
        .await
        .unwrap();

        let updated = update_order(
            &pool,
            None,
            &created.order.order_id,
            &OrderUpdate {
                status: Some("Processing".to_string()),
                shipping_address: Some("9 Dock St".to_string()),
                tracking_update: Some("Accepted by seller".to_string()),
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.order.buyer_address, created.order.buyer_address);
        assert_eq!(updated.order.seller_address, created.order.seller_address);
        assert_eq!(updated.order.total_amount, created.order.total_amount);
        assert_eq!(updated.items.len(), created.items.len());
        assert_eq!(updated.order.shipping_address.as_deref(), Some("9 Dock St"));

        assert_eq!(updated.tracking.len(), 1);
        assert_eq!(updated.tracking[0].status, "Processing");
        assert_eq!(updated.tracking[0].description, "Accepted by seller");
    }

    #[tokio::test]
    async fn listing_filters_by_party_and_status() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        register(&pool, "0xccc", "retailer").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 1.0).await;

        create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 1)])),
        )
        .await
        .unwrap();
        create_order(
            &pool,
            None,
            &order_request("0xccc", "0xaaa", cart(&[(&product_id, 2)])),
        )
        .await
        .unwrap();

        let all = list_orders(&pool, &OrderFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_buyer = list_orders(
            &pool,
            &OrderFilter {
                buyer: Some("0xBBB".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_buyer.len(), 1);
        assert_eq!(by_buyer[0].buyer.wallet_address, "0xbbb");

        let pending = list_orders(
            &pool,
            &OrderFilter {
                status: Some("Pending".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn chain_linkage_patch() {
        let pool = test_pool().await;
        register(&pool, "0xaaa", "manufacturer").await;
        register(&pool, "0xbbb", "distributor").await;
        let product_id = stock(&pool, "Amoxicillin", 100, 1.0).await;
        let order_id = create_order(
            &pool,
            None,
            &order_request("0xbbb", "0xaaa", cart(&[(&product_id, 1)])),
        )
        .await
        .unwrap()
        .order
        .order_id;

        let err = set_chain_linkage(
            &pool,
            &order_id,
            &ChainLinkage {
                transaction_hash: None,
                blockchain_order_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = set_chain_linkage(
            &pool,
            &order_id,
            &ChainLinkage {
                transaction_hash: Some("0xzz".to_string()),
                blockchain_order_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let updated = set_chain_linkage(
            &pool,
            &order_id,
            &ChainLinkage {
                transaction_hash: Some("0xdeadbeef".to_string()),
                blockchain_order_id: Some("42".to_string()),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.transaction_hash.as_deref(), Some("0xdeadbeef"));
        assert_eq!(updated.blockchain_order_id.as_deref(), Some("42"));

        let missing = set_chain_linkage(
            &pool,
            "ORD-999",
            &ChainLinkage {
                transaction_hash: Some("0xdeadbeef".to_string()),
                blockchain_order_id: None,
            },
        )
        .await
        .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn metadata_uri_names_the_order() {
        assert_eq!(metadata_uri("ORD-007"), "pharmatrace://order/ORD-007");
    }
}
