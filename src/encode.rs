//! Type-directed value coercion.
//!
//! Every data value crosses this seam exactly once before it is parameter
//! bound; the statement builders never splice values into SQL text. The trait
//! exists so a front end can plug in its own scalar mapping (the engine ships
//! a permissive default).

use crate::catalog::schema::{ColumnDef, TableSchema};
use crate::catalog::types::{ColumnType, Value};
use crate::error::GraftError;

pub trait ValueEncoder: Send + Sync {
    /// Coerce `value` for `column`, or fail with a validation error. The
    /// column's `type_modifier` is available on `column` for encoders that
    /// care about it.
    fn encode(
        &self,
        value: &Value,
        table: &TableSchema,
        column: &ColumnDef,
    ) -> Result<Value, GraftError>;
}

/// Checks the value against the declared column type and applies the obvious
/// widenings; everything else is a type mismatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncoder;

impl ValueEncoder for DefaultEncoder {
    fn encode(
        &self,
        value: &Value,
        table: &TableSchema,
        column: &ColumnDef,
    ) -> Result<Value, GraftError> {
        if value.is_null() {
            if column.nullable {
                return Ok(Value::Null);
            }
            return Err(GraftError::NotNullViolation {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }

        let coerced = match (column.col_type, value) {
            (ColumnType::Text, Value::Text(_))
            | (ColumnType::Integer, Value::Integer(_))
            | (ColumnType::Float, Value::Float(_))
            | (ColumnType::Boolean, Value::Boolean(_))
            | (ColumnType::Blob, Value::Blob(_))
            | (ColumnType::Timestamp, Value::Timestamp(_))
            | (ColumnType::Json, Value::Json(_)) => Some(value.clone()),
            (ColumnType::Float, Value::Integer(v)) => Some(Value::Float(*v as f64)),
            (ColumnType::Timestamp, Value::Integer(v)) => Some(Value::Timestamp(*v)),
            (ColumnType::Json, Value::Text(s)) => Some(Value::Json(s.clone())),
            _ => None,
        };

        coerced.ok_or_else(|| GraftError::TypeMismatch {
            table: table.name.clone(),
            column: column.name.clone(),
            expected: column.col_type.as_str().to_string(),
            actual: value.type_name().to_string(),
        })
    }
}
