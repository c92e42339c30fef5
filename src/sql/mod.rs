//! SQL statement synthesis.
//!
//! Pure functions from schemas and row value maps to parameter-bound
//! statements. Identifiers are quote-escaped here; data values go through the
//! value encoder and end up in the parameter vector, never in the text.

pub mod diff;
pub mod write;

use crate::catalog::schema::TableSchema;
use crate::catalog::types::Value;
use crate::encode::ValueEncoder;
use crate::error::GraftError;

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Accumulates bound parameters and hands out `$n` placeholders.
#[derive(Debug, Default)]
pub(crate) struct ParamBinder {
    params: Vec<Value>,
}

impl ParamBinder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub(crate) fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// Renders `("a" = $1) AND ("b" = $2)` for the given column/value pairs,
/// encoding each value against its column definition. An empty pair list is
/// rejected: a predicate that matches unconditionally is never intended here.
pub(crate) fn equality_condition(
    table: &TableSchema,
    pairs: &[(String, Value)],
    binder: &mut ParamBinder,
    encoder: &dyn ValueEncoder,
) -> Result<String, GraftError> {
    if pairs.is_empty() {
        return Err(GraftError::EmptyCondition {
            table: table.name.clone(),
        });
    }
    let mut clauses = Vec::with_capacity(pairs.len());
    for (column, value) in pairs {
        let def = table
            .column(column)
            .ok_or_else(|| GraftError::UnknownColumn {
                table: table.name.clone(),
                column: column.clone(),
            })?;
        let encoded = encoder.encode(value, table, def)?;
        let placeholder = binder.push(encoded);
        clauses.push(format!("({} = {})", quote_ident(column), placeholder));
    }
    Ok(clauses.join(" AND "))
}
