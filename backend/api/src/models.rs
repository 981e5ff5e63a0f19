//! Canonical entity records and domain enums.
//!
//! One schema per entity: the records here are what the database stores and
//! what the API serves. Wallet addresses are normalized to lowercase before
//! they reach any of these types.

use serde::{Deserialize, Serialize};

/// On-hand quantity at or below which a product is flagged "Low Stock".
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Normalize a wallet address for storage and comparison.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Current wall-clock time as Unix epoch seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────
// Domain enums
// ─────────────────────────────────────────────────────────

/// Supply-chain role of a registered party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Provider,
    Manufacturer,
    Distributor,
    Retailer,
    Admin,
}

impl Role {
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "provider" => Some(Self::Provider),
            "manufacturer" => Some(Self::Manufacturer),
            "distributor" => Some(Self::Distributor),
            "retailer" => Some(Self::Retailer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Manufacturer => "manufacturer",
            Self::Distributor => "distributor",
            Self::Retailer => "retailer",
            Self::Admin => "admin",
        }
    }
}

/// Stock status of a catalog entry, derived from its quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    Available,
    LowStock,
    OutOfStock,
}

impl ProductStatus {
    /// Derive the status for an on-hand quantity.
    ///
    /// Must be re-applied on every quantity mutation; client input never
    /// sets the status directly.
    pub fn for_quantity(quantity: i64) -> Self {
        if quantity <= 0 {
            Self::OutOfStock
        } else if quantity <= LOW_STOCK_THRESHOLD {
            Self::LowStock
        } else {
            Self::Available
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "Available" => Some(Self::Available),
            "Low Stock" => Some(Self::LowStock),
            "Out of Stock" => Some(Self::OutOfStock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::LowStock => "Low Stock",
            Self::OutOfStock => "Out of Stock",
        }
    }
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "Pending" => Some(Self::Pending),
            "Processing" => Some(Self::Processing),
            "Shipped" => Some(Self::Shipped),
            "Delivered" => Some(Self::Delivered),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Rejected)
    }

    /// Whether `next` is reachable from the current state.
    ///
    /// Fulfillment runs Pending → Processing → Shipped → Delivered →
    /// Completed; Pending may also end in Cancelled or Rejected.
    pub fn can_transition_to(&self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Pending, Rejected)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Delivered, Completed)
        )
    }
}

// ─────────────────────────────────────────────────────────
// Stored records
// ─────────────────────────────────────────────────────────

/// A registered supply-chain party, keyed by wallet address.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PartyRecord {
    pub id: i64,
    pub wallet_address: String,
    pub role: String,
    pub name: String,
    pub company_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub registration_id: Option<String>,
    pub license_number: Option<String>,
    pub verified: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A catalog entry: a sellable product independent of any owner.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: i64,
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub manufacturer: String,
    pub batch_number: Option<String>,
    pub price: f64,
    pub quantity: i64,
    pub unit: String,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A per-party stock record, unique per (wallet address, item name).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemRecord {
    pub id: i64,
    pub wallet_address: String,
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub price: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The transactional record binding buyer, seller, line items, and status.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: i64,
    pub order_id: String,
    pub buyer_address: String,
    pub seller_address: String,
    pub total_amount: f64,
    pub status: String,
    pub shipping_address: Option<String>,
    pub transaction_hash: Option<String>,
    pub blockchain_order_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One audit entry in an order's tracking history.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEntry {
    pub status: String,
    pub description: String,
    pub timestamp: i64,
}

// ─────────────────────────────────────────────────────────
// Read-time joins
// ─────────────────────────────────────────────────────────

/// Display fields of a party, joined into order responses.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PartySummary {
    pub wallet_address: String,
    pub name: String,
    pub company_name: String,
}

/// An order line item joined with catalog display fields.
///
/// `price` is the unit price captured when the order was created.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub unit: String,
    pub quantity: i64,
    pub price: f64,
}

/// An order joined with buyer/seller display fields, resolved line items,
/// and tracking history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub buyer: PartySummary,
    pub seller: PartySummary,
    pub items: Vec<OrderLine>,
    pub tracking: Vec<TrackingEntry>,
}

// ─────────────────────────────────────────────────────────
// Write shapes
// ─────────────────────────────────────────────────────────

/// Registration payload for a new party. `role` is validated at the API
/// boundary against [`Role`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParty {
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub registration_id: Option<String>,
    pub license_number: Option<String>,
}

/// Profile update. Address, role, and verification flag are deliberately
/// absent: the general update path can never touch them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyUpdate {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub registration_id: Option<String>,
    pub license_number: Option<String>,
}

impl PartyUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.company_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.location.is_none()
            && self.registration_id.is_none()
            && self.license_number.is_none()
    }
}

/// Creation payload for a catalog entry. The identifier and status are
/// generated server-side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub manufacturer: String,
    pub batch_number: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit: String,
    pub image_url: Option<String>,
}

/// Partial catalog update. A quantity change rederives the status;
/// client-supplied status is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub batch_number: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub image_url: Option<String>,
}

/// Creation payload for an inventory item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category: String,
    pub image_url: Option<String>,
}

/// Partial inventory update, keyed by (walletAddress, name).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdate {
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// One cart line in an order-creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: i64,
}

/// Order-creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(default)]
    pub buyer_address: String,
    #[serde(default)]
    pub seller_address: String,
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub shipping_address: Option<String>,
}

/// Partial order update. Buyer, seller, identifier, items, and total are
/// deliberately absent: they are immutable after creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub status: Option<String>,
    pub shipping_address: Option<String>,
    pub tracking_update: Option<String>,
}

/// Chain-linkage patch: the only fields the PATCH path may touch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLinkage {
    pub transaction_hash: Option<String>,
    pub blockchain_order_id: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds() {
        assert_eq!(ProductStatus::for_quantity(-5), ProductStatus::OutOfStock);
        assert_eq!(ProductStatus::for_quantity(0), ProductStatus::OutOfStock);
        assert_eq!(ProductStatus::for_quantity(1), ProductStatus::LowStock);
        assert_eq!(ProductStatus::for_quantity(10), ProductStatus::LowStock);
        assert_eq!(ProductStatus::for_quantity(11), ProductStatus::Available);
        assert_eq!(ProductStatus::for_quantity(100), ProductStatus::Available);
    }

    #[test]
    fn status_round_trips() {
        for status in [
            ProductStatus::Available,
            ProductStatus::LowStock,
            ProductStatus::OutOfStock,
        ] {
            assert_eq!(ProductStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProductStatus::parse("available"), None);
    }

    #[test]
    fn role_round_trips() {
        for role in [
            Role::Provider,
            Role::Manufacturer,
            Role::Distributor,
            Role::Retailer,
            Role::Admin,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("wholesaler"), None);
    }

    #[test]
    fn fulfillment_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Processing.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        use OrderStatus::*;
        let all = [
            Pending, Processing, Shipped, Delivered, Completed, Cancelled, Rejected,
        ];
        for terminal in [Completed, Cancelled, Rejected] {
            assert!(terminal.is_terminal());
            for next in all {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn address_normalization() {
        assert_eq!(normalize_address("0xAbCd"), "0xabcd");
        assert_eq!(normalize_address("  0xABC  "), "0xabc");
    }
}
