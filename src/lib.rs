//! # Ecomdb - E-commerce dataset over HTTP
//!
//! A fixed relational schema (customers, sellers, catalog items, orders,
//! order line-items and seller deliveries) kept in a single SQLite file.
//!
//! Ecomdb provides:
//! - Idempotent schema creation, an additive `item_id` migration and seed data
//! - Generic per-entity reads (whole table, by id, single column) and inserts
//! - An insert-or-accumulate upsert for the seller/catalog delivery relation
//! - An axum HTTP layer and a CLI on top of the store

pub mod entity;
pub mod value;
pub mod storage;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use entity::Entity;
pub use value::Row;
pub use storage::{Database, DbStats, DeliveryOutcome, DeliveryUpsert, InitReport, SqliteStore};

/// Result type alias for Ecomdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Ecomdb operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was rejected before the store was touched.
    #[error("{0}")]
    Validation(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("table {entity} has no column named {column}")]
    UnknownColumn { entity: Entity, column: String },

    #[error("{operation} is not available for {entity}")]
    Unsupported {
        entity: Entity,
        operation: &'static str,
    },

    /// The store refused a write (uniqueness, NOT NULL, foreign key, datatype).
    #[error("{0}")]
    Constraint(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if matches!(
                    code.code,
                    ErrorCode::ConstraintViolation | ErrorCode::TypeMismatch
                ) =>
            {
                Error::Constraint(message.unwrap_or_else(|| code.to_string()))
            }
            other => Error::Storage(other),
        }
    }
}

impl Error {
    /// True for failures caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::UnknownEntity(_)
                | Error::UnknownColumn { .. }
                | Error::Unsupported { .. }
                | Error::Constraint(_)
        )
    }
}
