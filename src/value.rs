//! Conversion between SQLite values and JSON values
//!
//! Rows leave the store as ordered `field -> value` maps and payloads enter
//! it the same way, so both directions go through `serde_json::Value`.

use crate::{Error, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// A row mapping, keyed by column name in column order.
pub type Row = serde_json::Map<String, Value>;

/// Convert a value read from SQLite to JSON
pub fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

/// Convert a payload value to a bindable SQLite value.
///
/// Arrays and objects have no column representation and are rejected.
pub fn to_sql(field: &str, value: &Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(Error::Validation(format!("{field}: number out of range")))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(Error::Validation(format!(
            "{field}: unsupported value type (expected a scalar)"
        ))),
    }
}

/// Read every column of the current row into a [`Row`].
pub fn row_to_map(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Row> {
    let mut map = Row::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        map.insert(name.clone(), from_sql(row.get_ref(idx)?));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_bind() {
        assert_eq!(to_sql("id", &json!(7)).unwrap(), SqlValue::Integer(7));
        assert_eq!(to_sql("ok", &json!(true)).unwrap(), SqlValue::Integer(1));
        assert_eq!(to_sql("x", &json!(1.5)).unwrap(), SqlValue::Real(1.5));
        assert_eq!(
            to_sql("name", &json!("Alice")).unwrap(),
            SqlValue::Text("Alice".into())
        );
        assert_eq!(to_sql("item_id", &Value::Null).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_nested_values_are_rejected() {
        let err = to_sql("name", &json!({"first": "A"})).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.starts_with("name")));
        assert!(to_sql("ids", &json!([1, 2])).is_err());
    }

    #[test]
    fn test_row_keeps_column_order() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT 2 AS z, 'a' AS a, NULL AS m").unwrap();
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let row = stmt.query_row([], |row| row_to_map(row, &columns)).unwrap();

        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(Value::Object(row), json!({"z": 2, "a": "a", "m": null}));
    }
}
