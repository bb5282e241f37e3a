//! Database schema definitions and seed data

use crate::Entity;

/// SQL to create the customer table
pub const CREATE_CUSTOMER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS customer (
    id      INTEGER PRIMARY KEY,
    name    TEXT NOT NULL
)
"#;

/// SQL to create the seller table
pub const CREATE_SELLER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS seller (
    id      INTEGER PRIMARY KEY,
    nation  TEXT NOT NULL
)
"#;

/// SQL to create the catalog table
pub const CREATE_CATALOG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS catalog (
    id      INTEGER PRIMARY KEY,
    name    TEXT NOT NULL,
    color   TEXT NOT NULL
)
"#;

/// SQL to create the order table.
///
/// `item_id` is the legacy single-item reference; databases created before it
/// existed get it through [`ADD_ORDER_ITEM_ID_COLUMN`].
pub const CREATE_ORDER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "order" (
    id          INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL,
    date        TEXT NOT NULL,
    item_id     INTEGER,
    FOREIGN KEY (customer_id) REFERENCES customer (id)
)
"#;

/// SQL to create the order_item table (order contains catalog item)
pub const CREATE_ORDER_ITEM_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_item (
    order_id   INTEGER NOT NULL,
    catalog_id INTEGER NOT NULL,
    quantity   INTEGER NOT NULL,
    PRIMARY KEY (order_id, catalog_id),
    FOREIGN KEY (order_id) REFERENCES "order" (id),
    FOREIGN KEY (catalog_id) REFERENCES catalog (id)
)
"#;

/// SQL to create the delivery table (seller delivers catalog item)
pub const CREATE_DELIVERY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS delivery (
    seller_id  INTEGER NOT NULL,
    catalog_id INTEGER NOT NULL,
    quantity   INTEGER NOT NULL,
    PRIMARY KEY (seller_id, catalog_id),
    FOREIGN KEY (seller_id) REFERENCES seller (id),
    FOREIGN KEY (catalog_id) REFERENCES catalog (id)
)
"#;

/// Additive migration for databases predating `order.item_id`
pub const ADD_ORDER_ITEM_ID_COLUMN: &str = r#"ALTER TABLE "order" ADD COLUMN item_id INTEGER"#;

/// Lists the columns of the order table
pub const ORDER_TABLE_INFO: &str = r#"PRAGMA table_info("order")"#;

/// Accumulating upsert for a (seller_id, catalog_id) pair
pub const UPSERT_DELIVERY: &str = r#"
INSERT INTO delivery (seller_id, catalog_id, quantity)
VALUES (?1, ?2, ?3)
ON CONFLICT (seller_id, catalog_id)
DO UPDATE SET quantity = quantity + excluded.quantity
RETURNING quantity
"#;

/// All schema creation statements, in dependency order
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_CUSTOMER_TABLE,
        CREATE_SELLER_TABLE,
        CREATE_CATALOG_TABLE,
        CREATE_ORDER_TABLE,
        CREATE_ORDER_ITEM_TABLE,
        CREATE_DELIVERY_TABLE,
    ]
}

/// Seed rows inserted into a table that holds no rows yet
pub fn seed_statement(entity: Entity) -> &'static str {
    match entity {
        Entity::Customer => {
            "INSERT INTO customer (id, name) VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Carol')"
        }
        Entity::Seller => "INSERT INTO seller (id, nation) VALUES (1, 'Italy'), (2, 'France')",
        Entity::Catalog => {
            "INSERT INTO catalog (id, name, color) VALUES \
             (1, 'T-Shirt', 'red'), (2, 'T-Shirt', 'blue'), (3, 'Shoes', 'black')"
        }
        Entity::Order => {
            "INSERT INTO \"order\" (id, customer_id, date, item_id) VALUES \
             (1, 1, '2026-02-01', 1), (2, 2, '2026-02-02', 2)"
        }
        Entity::OrderItem => {
            "INSERT INTO order_item (order_id, catalog_id, quantity) VALUES \
             (1, 1, 2), (1, 3, 1), (2, 2, 1)"
        }
        Entity::Delivery => {
            "INSERT INTO delivery (seller_id, catalog_id, quantity) VALUES \
             (1, 1, 100), (1, 2, 50), (2, 3, 70)"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entity_has_a_table_and_seed() {
        let stmts = all_schema_statements();
        for entity in Entity::ALL {
            let create = format!("CREATE TABLE IF NOT EXISTS {}", entity.as_str());
            let quoted = format!("CREATE TABLE IF NOT EXISTS {}", entity.sql_table());
            assert!(
                stmts.iter().any(|s| s.contains(&create) || s.contains(&quoted)),
                "no table for {entity}"
            );
            assert!(seed_statement(entity).contains(entity.as_str()));
        }
    }
}
