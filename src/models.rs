//! Inventory domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked inventory item
///
/// Timestamps are assigned by the database: `created_at` on insert,
/// `updated_at` on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    /// Unique identifier, assigned server-side on creation
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Units on hand
    pub stock: i32,
    /// Unit price
    pub price: f64,
    /// When the record was inserted
    pub created_at: DateTime<Utc>,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating an item
///
/// The identifier is generated when not supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItem {
    /// Optional caller-supplied identifier
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Display name
    pub name: String,
    /// Units on hand
    pub stock: i32,
    /// Unit price
    pub price: f64,
}

/// Payload for partially updating an item
///
/// Absent fields keep their prior values. Presence is tracked per field so
/// `{"stock": 0}` and an omitted `stock` are distinct requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItem {
    /// New name, when present
    pub name: Option<String>,
    /// New stock count, when present
    pub stock: Option<i32>,
    /// New price, when present
    pub price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_item_partial_deserialization() {
        let update: UpdateItem = serde_json::from_str(r#"{"stock": 9}"#).unwrap();
        assert_eq!(update.stock, Some(9));
        assert!(update.name.is_none());
        assert!(update.price.is_none());
    }

    #[test]
    fn test_update_item_zero_is_present() {
        let update: UpdateItem = serde_json::from_str(r#"{"stock": 0}"#).unwrap();
        assert_eq!(update.stock, Some(0));
    }

    #[test]
    fn test_update_item_empty_body() {
        let update: UpdateItem = serde_json::from_str("{}").unwrap();
        assert!(update.name.is_none());
        assert!(update.stock.is_none());
        assert!(update.price.is_none());
    }

    #[test]
    fn test_create_item_without_id() {
        let create: CreateItem =
            serde_json::from_str(r#"{"name":"Widget","stock":5,"price":1.5}"#).unwrap();
        assert!(create.id.is_none());
        assert_eq!(create.name, "Widget");
        assert_eq!(create.stock, 5);
    }
}
