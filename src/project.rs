//! Result reprojection.
//!
//! After the primary write and all reverse relations have settled, the row is
//! re-fetched by primary key so the caller sees database-assigned state
//! (defaults, triggers) instead of an echo of the input.

use crate::catalog::schema::TableSchema;
use crate::catalog::types::{Row, Value};
use crate::encode::ValueEncoder;
use crate::error::GraftError;
use crate::session::Session;
use crate::sql::write::build_select;
use serde::{Deserialize, Serialize};

/// The shape the caller asked the resulting row back in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Projection {
    /// `None` means every column.
    pub columns: Option<Vec<String>>,
}

impl Projection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Some(columns.into_iter().map(Into::into).collect()),
        }
    }
}

/// Re-fetch `row` through `projection`.
///
/// Tables without a primary key cannot be re-fetched; for those the written
/// row is returned as-is.
pub async fn reproject(
    session: &dyn Session,
    encoder: &dyn ValueEncoder,
    table: &TableSchema,
    row: Row,
    projection: &Projection,
) -> Result<Option<Row>, GraftError> {
    if !table.has_primary_key() {
        return Ok(Some(row));
    }

    let mut condition: Vec<(String, Value)> = Vec::with_capacity(table.primary_key.len());
    for pk in &table.primary_key {
        let value = row.get(pk).ok_or_else(|| GraftError::MissingKeyValue {
            table: table.name.clone(),
            column: pk.clone(),
        })?;
        condition.push((pk.clone(), value.clone()));
    }

    let statement = build_select(
        table,
        projection.columns.as_deref(),
        &condition,
        encoder,
    )?;
    let rows = session.execute(&statement).await?;
    Ok(rows.into_iter().next())
}
