//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite file with tables:
//! - customer(id, name)
//! - seller(id, nation)
//! - catalog(id, name, color)
//! - "order"(id, customer_id, date, item_id)
//! - order_item(order_id, catalog_id, quantity)
//! - delivery(seller_id, catalog_id, quantity)

pub mod schema;
pub mod sqlite;

pub use sqlite::{Database, DbStats, DeliveryOutcome, DeliveryUpsert, InitReport, SqliteStore};
