//! The "remove everything not explicitly kept" diff.

use crate::catalog::relation::RelationDescriptor;
use crate::catalog::schema::TableSchema;
use crate::catalog::types::{Row, Value};
use crate::encode::ValueEncoder;
use crate::error::GraftError;
use crate::session::SqlStatement;
use crate::sql::{equality_condition, quote_ident, ParamBinder};

/// Build the delete that removes every row of `relation` connected to the
/// parent except those whose primary key matches an entry in `keep`.
///
/// `foreign` is the schema of the relation's foreign (child) table and
/// `parent_row` the parent's post-write state; the parent's key values are
/// read through the relation's positional column correspondence. An empty
/// `keep` list removes all connected rows.
pub fn build_delete_others(
    relation: &RelationDescriptor,
    foreign: &TableSchema,
    parent_row: &Row,
    keep: &[Row],
    encoder: &dyn ValueEncoder,
) -> Result<SqlStatement, GraftError> {
    if !foreign.has_primary_key() {
        return Err(GraftError::DeleteOthersWithoutPrimaryKey {
            table: foreign.name.clone(),
        });
    }

    let mut fk_pairs = Vec::with_capacity(relation.local_columns.len());
    for (local, foreign_col) in relation.key_pairs() {
        let value = parent_row
            .get(local)
            .ok_or_else(|| GraftError::MissingKeyValue {
                table: relation.local_table.clone(),
                column: local.to_string(),
            })?;
        fk_pairs.push((foreign_col.to_string(), value.clone()));
    }

    let mut binder = ParamBinder::new();
    let mut text = format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(&foreign.name),
        equality_condition(foreign, &fk_pairs, &mut binder, encoder)?
    );

    for kept in keep {
        let mut cells = Vec::with_capacity(foreign.primary_key.len());
        for pk in &foreign.primary_key {
            let value = kept.get(pk).ok_or_else(|| GraftError::MissingKeyValue {
                table: foreign.name.clone(),
                column: pk.clone(),
            })?;
            let def = foreign
                .column(pk)
                .ok_or_else(|| GraftError::MissingColumn {
                    table: foreign.name.clone(),
                    column: pk.clone(),
                })?;
            let encoded = encoder.encode(value, foreign, def)?;
            let placeholder = binder.push(encoded);
            cells.push(format!("{} = {}", quote_ident(pk), placeholder));
        }
        text.push_str(&format!(" AND NOT ({})", cells.join(" AND ")));
    }

    Ok(SqlStatement::new(text, binder.into_params()))
}
