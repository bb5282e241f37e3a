//! Entity catalogue - the closed set of tables served by Ecomdb
//!
//! Every table is addressed through an [`Entity`] variant. Table and column
//! identifiers used in SQL come only from the static lists below, never from
//! request content:
//! - `Customer`: customer(id, name)
//! - `Seller`: seller(id, nation)
//! - `Catalog`: catalog(id, name, color)
//! - `Order`: "order"(id, customer_id, date, item_id)
//! - `OrderItem`: order_item(order_id, catalog_id, quantity)
//! - `Delivery`: delivery(seller_id, catalog_id, quantity)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the six tables of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Customer,
    Seller,
    Catalog,
    Order,
    /// Order/catalog relation with a quantity, keyed by (order_id, catalog_id)
    OrderItem,
    /// Seller/catalog relation with a quantity, keyed by (seller_id, catalog_id)
    Delivery,
}

impl Entity {
    /// All entities, in schema creation order
    pub const ALL: [Entity; 6] = [
        Entity::Customer,
        Entity::Seller,
        Entity::Catalog,
        Entity::Order,
        Entity::OrderItem,
        Entity::Delivery,
    ];

    /// Get the table name (unquoted)
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Customer => "customer",
            Entity::Seller => "seller",
            Entity::Catalog => "catalog",
            Entity::Order => "order",
            Entity::OrderItem => "order_item",
            Entity::Delivery => "delivery",
        }
    }

    /// Table name quoted for use in SQL (`order` is a keyword)
    pub fn sql_table(&self) -> &'static str {
        match self {
            Entity::Customer => "\"customer\"",
            Entity::Seller => "\"seller\"",
            Entity::Catalog => "\"catalog\"",
            Entity::Order => "\"order\"",
            Entity::OrderItem => "\"order_item\"",
            Entity::Delivery => "\"delivery\"",
        }
    }

    /// Columns of the table, in declaration order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Entity::Customer => &["id", "name"],
            Entity::Seller => &["id", "nation"],
            Entity::Catalog => &["id", "name", "color"],
            Entity::Order => &["id", "customer_id", "date", "item_id"],
            Entity::OrderItem => &["order_id", "catalog_id", "quantity"],
            Entity::Delivery => &["seller_id", "catalog_id", "quantity"],
        }
    }

    /// Resolve a caller-supplied column name to the static identifier.
    pub fn column(&self, name: &str) -> Result<&'static str> {
        self.columns()
            .iter()
            .copied()
            .find(|column| *column == name)
            .ok_or_else(|| Error::UnknownColumn {
                entity: *self,
                column: name.to_string(),
            })
    }

    /// Whether the table has a single integer `id` primary key
    pub fn has_id(&self) -> bool {
        self.columns().first() == Some(&"id")
    }

    /// Whether rows are written through the generic insert path.
    ///
    /// Deliveries are excluded: they go through the accumulating upsert.
    pub fn is_insertable(&self) -> bool {
        !matches!(self, Entity::Delivery)
    }

    /// HTTP collection path
    pub fn route(&self) -> &'static str {
        match self {
            Entity::Customer => "/customers",
            Entity::Seller => "/sellers",
            Entity::Catalog => "/catalog",
            Entity::Order => "/orders",
            Entity::OrderItem => "/order-items",
            Entity::Delivery => "/deliveries",
        }
    }

    /// Column projections exposed over HTTP as `(path segment, column)`
    pub fn projections(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Entity::Customer => &[("ids", "id"), ("names", "name")],
            Entity::Seller => &[("ids", "id"), ("nations", "nation")],
            Entity::Catalog => &[("ids", "id"), ("names", "name"), ("colors", "color")],
            Entity::Order => &[("ids", "id"), ("dates", "date")],
            Entity::OrderItem => &[("quantities", "quantity")],
            Entity::Delivery => &[("quantities", "quantity")],
        }
    }
}

impl FromStr for Entity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "customer" | "customers" => Ok(Entity::Customer),
            "seller" | "sellers" => Ok(Entity::Seller),
            "catalog" | "catalog_item" | "item" | "items" => Ok(Entity::Catalog),
            "order" | "orders" => Ok(Entity::Order),
            "order_item" | "order-item" | "order_items" | "order-items" => Ok(Entity::OrderItem),
            "delivery" | "deliveries" => Ok(Entity::Delivery),
            _ => Err(Error::UnknownEntity(s.to_string())),
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_table_and_route_names() {
        assert_eq!("customer".parse::<Entity>().unwrap(), Entity::Customer);
        assert_eq!("Orders".parse::<Entity>().unwrap(), Entity::Order);
        assert_eq!("order-items".parse::<Entity>().unwrap(), Entity::OrderItem);
        assert!(matches!(
            "customer; DROP TABLE seller".parse::<Entity>(),
            Err(Error::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_column_lookup_is_closed() {
        assert_eq!(Entity::Catalog.column("color").unwrap(), "color");
        assert!(matches!(
            Entity::Catalog.column("nation"),
            Err(Error::UnknownColumn { entity: Entity::Catalog, .. })
        ));
        assert!(Entity::Customer.column("name FROM seller --").is_err());
    }

    #[test]
    fn test_id_and_insert_capabilities() {
        let with_id: Vec<_> = Entity::ALL.iter().filter(|e| e.has_id()).collect();
        assert_eq!(
            with_id,
            [&Entity::Customer, &Entity::Seller, &Entity::Catalog, &Entity::Order]
        );
        assert!(Entity::OrderItem.is_insertable());
        assert!(!Entity::Delivery.is_insertable());
    }

    #[test]
    fn test_projections_reference_real_columns() {
        for entity in Entity::ALL {
            for (_, column) in entity.projections() {
                assert!(entity.column(column).is_ok(), "{entity}.{column}");
            }
        }
    }
}
