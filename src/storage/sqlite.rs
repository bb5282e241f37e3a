//! SQLite storage implementation

use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::value::{self, row_to_map};
use crate::{Entity, Error, Result, Row};
use super::schema;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Location of the store plus per-connection options.
///
/// Owned by process startup and handed to whatever opens connections; every
/// operation gets its own connection through [`Database::connect`].
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    foreign_keys: bool,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            foreign_keys: false,
        }
    }

    /// Enforce foreign keys on every connection (SQLite leaves them off)
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection for a single operation
    pub fn connect(&self) -> Result<SqliteStore> {
        SqliteStore::open_with(&self.path, self.foreign_keys)
    }

    /// Switch the file to WAL mode and run the schema/seed initializer
    pub fn initialize(&self) -> Result<InitReport> {
        let mut store = self.connect()?;
        store.enable_wal()?;
        store.initialize()
    }
}

/// SQLite-backed storage for the e-commerce tables
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    fn open_with(path: &Path, foreign_keys: bool) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::configure(conn, foreign_keys)
    }

    /// Open an initialized in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self::configure(conn, false)?;
        store.initialize()?;
        Ok(store)
    }

    fn configure(conn: Connection, foreign_keys: bool) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", foreign_keys)?;
        Ok(Self { conn })
    }

    fn enable_wal(&self) -> Result<()> {
        let mode: String = self
            .conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "journal mode set");
        Ok(())
    }

    // ========== Schema & Seed ==========

    /// Create missing tables, add `order.item_id` if absent, and seed every
    /// table that currently holds no rows.
    ///
    /// Runs as one transaction: either the whole sequence applies or nothing does.
    pub fn initialize(&mut self) -> Result<InitReport> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for stmt in schema::all_schema_statements() {
            tx.execute(stmt, [])?;
        }

        let added_item_id = ensure_order_item_id(&tx)?;

        let mut seeded = Vec::new();
        for entity in Entity::ALL {
            if count_rows(&tx, entity)? == 0 {
                tx.execute(schema::seed_statement(entity), [])?;
                seeded.push(entity);
            }
        }

        tx.commit()?;

        let report = InitReport {
            seeded,
            added_item_id,
        };
        tracing::info!(
            seeded = ?report.seeded,
            added_item_id = report.added_item_id,
            "schema initialized"
        );
        Ok(report)
    }

    // ========== Read Operations ==========

    /// Every row of a table, in store order
    pub fn list_all(&self, entity: Entity) -> Result<Vec<Row>> {
        let sql = format!("SELECT * FROM {}", entity.sql_table());
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = column_names(&stmt);

        let rows = stmt
            .query_map([], |row| row_to_map(row, &columns))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(entity = %entity, rows = rows.len(), "listed rows");
        Ok(rows)
    }

    /// The row whose `id` equals `id`, or `None`
    pub fn get_by_id(&self, entity: Entity, id: i64) -> Result<Option<Row>> {
        if !entity.has_id() {
            return Err(Error::Unsupported {
                entity,
                operation: "get_by_id",
            });
        }

        let sql = format!("SELECT * FROM {} WHERE id = ?1", entity.sql_table());
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = column_names(&stmt);

        stmt.query_row([id], |row| row_to_map(row, &columns))
            .optional()
            .map_err(Into::into)
    }

    /// A single column across all rows, in the same order as [`Self::list_all`]
    pub fn get_column(&self, entity: Entity, column: &str) -> Result<Vec<Value>> {
        let column = entity.column(column)?;
        let sql = format!("SELECT \"{}\" FROM {}", column, entity.sql_table());
        let mut stmt = self.conn.prepare(&sql)?;

        let values = stmt
            .query_map([], |row| Ok(value::from_sql(row.get_ref(0)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(values)
    }

    // ========== Write Operations ==========

    /// Insert one row using exactly the fields present in `payload`.
    ///
    /// Returns the rowid of the new row. Store failures roll the transaction
    /// back and surface with SQLite's message.
    pub fn insert(&mut self, entity: Entity, payload: &Row) -> Result<i64> {
        if !entity.is_insertable() {
            return Err(Error::Unsupported {
                entity,
                operation: "insert",
            });
        }
        if payload.is_empty() {
            return Err(Error::Validation("Empty payload".to_string()));
        }

        let mut columns = Vec::with_capacity(payload.len());
        let mut values = Vec::with_capacity(payload.len());
        for (field, value) in payload {
            columns.push(format!("\"{}\"", entity.column(field)?));
            values.push(value::to_sql(field, value)?);
        }

        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            entity.sql_table(),
            columns.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Err(err) = tx.execute(&sql, params_from_iter(values.iter())) {
            tracing::warn!(entity = %entity, error = %err, "insert rejected");
            return Err(err.into());
        }
        let rowid = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(entity = %entity, rowid, "inserted row");
        Ok(rowid)
    }

    /// Insert a delivery, or add its quantity to the existing row for the
    /// same (seller_id, catalog_id) pair.
    ///
    /// The write is a single `ON CONFLICT` statement inside an immediate
    /// transaction, so concurrent upserts on one pair never lose an increment.
    /// Negative quantities are accepted and lower the total with no floor.
    pub fn upsert_delivery(&mut self, delivery: &DeliveryUpsert) -> Result<DeliveryOutcome> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous: Option<i64> = tx
            .query_row(
                "SELECT quantity FROM delivery WHERE seller_id = ?1 AND catalog_id = ?2",
                params![delivery.seller_id, delivery.catalog_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(previous) = previous {
            if previous.checked_add(delivery.quantity).is_none() {
                return Err(Error::Validation(format!(
                    "quantity {} would overflow the stored total {}",
                    delivery.quantity, previous
                )));
            }
        }

        let quantity: i64 = tx.query_row(
            schema::UPSERT_DELIVERY,
            params![delivery.seller_id, delivery.catalog_id, delivery.quantity],
            |row| row.get(0),
        )?;

        tx.commit()?;

        let outcome = match previous {
            Some(previous) => DeliveryOutcome::Accumulated { previous, quantity },
            None => DeliveryOutcome::Inserted { quantity },
        };
        tracing::debug!(
            seller_id = delivery.seller_id,
            catalog_id = delivery.catalog_id,
            ?outcome,
            "delivery upserted"
        );
        Ok(outcome)
    }

    // ========== Statistics ==========

    /// Count rows in one table
    pub fn count_rows(&self, entity: Entity) -> Result<usize> {
        count_rows(&self.conn, entity)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            customers: self.count_rows(Entity::Customer)?,
            sellers: self.count_rows(Entity::Seller)?,
            catalog: self.count_rows(Entity::Catalog)?,
            orders: self.count_rows(Entity::Order)?,
            order_items: self.count_rows(Entity::OrderItem)?,
            deliveries: self.count_rows(Entity::Delivery)?,
        })
    }
}

fn count_rows(conn: &Connection, entity: Entity) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", entity.sql_table());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as usize)
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

/// Add `order.item_id` when the table predates it. Returns whether it was added.
fn ensure_order_item_id(conn: &Connection) -> Result<bool> {
    let columns = {
        let mut stmt = conn.prepare(schema::ORDER_TABLE_INFO)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        names
    };

    if columns.iter().any(|c| c == "item_id") {
        return Ok(false);
    }

    conn.execute(schema::ADD_ORDER_ITEM_ID_COLUMN, [])?;
    tracing::info!("added legacy column order.item_id");
    Ok(true)
}

/// Validated input for [`SqliteStore::upsert_delivery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryUpsert {
    pub seller_id: i64,
    pub catalog_id: i64,
    pub quantity: i64,
}

impl DeliveryUpsert {
    pub fn new(seller_id: i64, catalog_id: i64, quantity: i64) -> Self {
        Self {
            seller_id,
            catalog_id,
            quantity,
        }
    }

    /// Build from a request payload; all three fields must be present integers.
    pub fn from_payload(payload: &Row) -> Result<Self> {
        const REQUIRED: [&str; 3] = ["seller_id", "catalog_id", "quantity"];

        if REQUIRED.iter().any(|field| !payload.contains_key(*field)) {
            return Err(Error::Validation(
                "seller_id, catalog_id and quantity are required".to_string(),
            ));
        }

        let field = |name: &str| -> Result<i64> {
            payload
                .get(name)
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::Validation(format!("{name} must be an integer")))
        };

        Ok(Self::new(field("seller_id")?, field("catalog_id")?, field("quantity")?))
    }
}

/// What [`SqliteStore::upsert_delivery`] did to the pair's row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Inserted { quantity: i64 },
    Accumulated { previous: i64, quantity: i64 },
}

impl DeliveryOutcome {
    /// Quantity stored for the pair after the upsert
    pub fn quantity(&self) -> i64 {
        match self {
            DeliveryOutcome::Inserted { quantity } => *quantity,
            DeliveryOutcome::Accumulated { quantity, .. } => *quantity,
        }
    }
}

/// Result of running the initializer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Tables that were empty and received seed rows
    pub seeded: Vec<Entity>,
    /// Whether `order.item_id` had to be added
    pub added_item_id: bool,
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub customers: usize,
    pub sellers: usize,
    pub catalog: usize,
    pub orders: usize,
    pub order_items: usize,
    pub deliveries: usize,
}

impl DbStats {
    /// Row count for one table
    pub fn count(&self, entity: Entity) -> usize {
        match entity {
            Entity::Customer => self.customers,
            Entity::Seller => self.sellers,
            Entity::Catalog => self.catalog,
            Entity::Order => self.orders,
            Entity::OrderItem => self.order_items,
            Entity::Delivery => self.deliveries,
        }
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for entity in Entity::ALL {
            writeln!(f, "  {}: {}", entity, self.count(entity))?;
        }
        Ok(())
    }
}
