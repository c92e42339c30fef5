//! Recursive nested-mutation resolution.
//!
//! One resolution walks the input tree depth-first: forward relations settle
//! before the local row is written (the row needs their key values), reverse
//! relations settle after (the children need the row's key values). Sibling
//! relations resolve concurrently; the session serializes their statements.

pub mod forward;
pub mod input;
pub mod reverse;

use crate::catalog::schema::TableSchema;
use crate::catalog::types::{Row, Value};
use crate::catalog::Catalog;
use crate::config::GraftConfig;
use crate::encode::ValueEncoder;
use crate::error::GraftError;
use crate::resolve::input::{CallerContext, MutationInput, RelationInput, RowLocator};
use crate::session::Session;
use crate::sql::write::{build_insert_or_upsert, build_update};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Everything one resolution borrows. Built per request and threaded through
/// the recursion by reference.
pub(crate) struct ResolutionContext<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a GraftConfig,
    pub encoder: &'a dyn ValueEncoder,
    pub session: &'a dyn Session,
    pub caller: &'a CallerContext,
}

/// Insert (or upsert) one node of the input tree and resolve its relations.
///
/// Boxed because the recursion is indirect: creates nested under forward and
/// reverse relations come back through here.
pub(crate) fn mutate_nested<'a>(
    ctx: &'a ResolutionContext<'a>,
    table: Arc<TableSchema>,
    input: MutationInput,
    do_upsert: bool,
    depth: usize,
) -> BoxFuture<'a, Result<Row, GraftError>> {
    Box::pin(async move {
        if depth >= ctx.config.max_resolve_depth {
            return Err(GraftError::DepthExceeded {
                max_depth: ctx.config.max_resolve_depth,
            });
        }

        let overrides = forward::resolve_forward(ctx, &table, &input, depth).await?;
        let values = input.values.merged(&overrides);

        let statement = build_insert_or_upsert(
            &table,
            std::slice::from_ref(&values),
            do_upsert,
            ctx.encoder,
        )?;
        let written = ctx.session.execute(&statement).await?;
        let row = written
            .into_iter()
            .next()
            .ok_or_else(|| GraftError::EmptyWriteResult {
                table: table.name.clone(),
            })?;

        reverse::resolve_reverse(ctx, &table, &row, &input, depth).await?;
        Ok(row)
    })
}

/// Patch one existing row and resolve the nested relations around it.
pub(crate) async fn run_update(
    ctx: &ResolutionContext<'_>,
    table: &Arc<TableSchema>,
    target: &RowLocator,
    patch: &MutationInput,
    depth: usize,
) -> Result<Row, GraftError> {
    if depth >= ctx.config.max_resolve_depth {
        return Err(GraftError::DepthExceeded {
            max_depth: ctx.config.max_resolve_depth,
        });
    }

    let overrides = forward::resolve_forward(ctx, table, patch, depth).await?;
    let values = patch.values.merged(&overrides);

    let condition = locator_condition(table, target)?;
    let statement = build_update(table, &values, &condition, ctx.encoder)?;
    let matched = ctx.session.execute(&statement).await?;
    if matched.len() > 1 {
        return Err(GraftError::AmbiguousTarget {
            target: table.name.clone(),
            matched: matched.len(),
        });
    }
    let row = matched
        .into_iter()
        .next()
        .ok_or_else(|| GraftError::UpdateTargetNotFound {
            target: table.name.clone(),
        })?;

    reverse::resolve_reverse(ctx, table, &row, patch, depth).await?;
    Ok(row)
}

/// Translate a locator into an equality condition against `table`.
///
/// Opaque identifiers are re-validated here: the table they name and their
/// key arity must match the catalog, whatever the front end decoded.
pub(crate) fn locator_condition(
    table: &TableSchema,
    locator: &RowLocator,
) -> Result<Vec<(String, Value)>, GraftError> {
    match locator {
        RowLocator::ById(id) => {
            if id.table != table.name {
                return Err(GraftError::RowIdTableMismatch {
                    expected: table.name.clone(),
                    actual: id.table.clone(),
                });
            }
            if !table.has_primary_key() {
                return Err(GraftError::PrimaryKeyRequired {
                    table: table.name.clone(),
                    operation: "row identifier lookup",
                });
            }
            if id.key_values.len() != table.primary_key.len() {
                return Err(GraftError::RowIdArityMismatch {
                    table: table.name.clone(),
                    expected: table.primary_key.len(),
                    actual: id.key_values.len(),
                });
            }
            Ok(table
                .primary_key
                .iter()
                .cloned()
                .zip(id.key_values.iter().cloned())
                .collect())
        }
        RowLocator::ByKeys(keys) => {
            if keys.is_empty() {
                return Err(GraftError::EmptyCondition {
                    table: table.name.clone(),
                });
            }
            Ok(keys
                .iter()
                .map(|(column, value)| (column.to_string(), value.clone()))
                .collect())
        }
    }
}

/// How many individual nested operations a verb bag carries. Unique relations
/// admit at most one.
pub(crate) fn entry_count(bag: &RelationInput) -> usize {
    bag.connect.len()
        + bag.delete.len()
        + bag.update.len()
        + bag.create.len()
        + bag.upsert.len()
        + bag.batch_create.len()
        + bag.batch_upsert.len()
        + usize::from(bag.delete_others)
}

#[cfg(test)]
mod tests {
    use super::{entry_count, locator_condition};
    use crate::catalog::schema::{ColumnDef, TableSchema};
    use crate::catalog::types::{ColumnType, Row, Value};
    use crate::error::GraftErrorCode;
    use crate::resolve::input::{MutationInput, RelationInput, RowId, RowLocator};

    fn keyed_table() -> TableSchema {
        let mut t = TableSchema::new("thing");
        t.columns = vec![
            ColumnDef::new("id", ColumnType::Integer).with_default(),
            ColumnDef::new("kind", ColumnType::Text),
        ];
        t.primary_key = vec!["id".into()];
        t
    }

    #[test]
    fn row_id_locator_maps_onto_the_primary_key() {
        let condition = locator_condition(
            &keyed_table(),
            &RowLocator::ById(RowId {
                table: "thing".into(),
                key_values: vec![Value::Integer(5)],
            }),
        )
        .expect("condition");
        assert_eq!(condition, vec![("id".to_string(), Value::Integer(5))]);
    }

    #[test]
    fn row_id_for_a_different_table_is_rejected() {
        let err = locator_condition(
            &keyed_table(),
            &RowLocator::ById(RowId {
                table: "other".into(),
                key_values: vec![Value::Integer(5)],
            }),
        )
        .expect_err("table mismatch");
        assert_eq!(err.code(), GraftErrorCode::RowIdTableMismatch);
    }

    #[test]
    fn row_id_arity_must_match_the_key() {
        let err = locator_condition(
            &keyed_table(),
            &RowLocator::ById(RowId {
                table: "thing".into(),
                key_values: vec![Value::Integer(5), Value::Integer(6)],
            }),
        )
        .expect_err("arity mismatch");
        assert_eq!(err.code(), GraftErrorCode::RowIdArityMismatch);
    }

    #[test]
    fn key_locator_without_columns_is_rejected() {
        let err = locator_condition(&keyed_table(), &RowLocator::ByKeys(Row::new()))
            .expect_err("empty key set");
        assert_eq!(err.code(), GraftErrorCode::EmptyCondition);
    }

    #[test]
    fn key_locator_passes_its_columns_through() {
        let condition = locator_condition(
            &keyed_table(),
            &RowLocator::ByKeys(Row::from_pairs([("kind", Value::text("a"))])),
        )
        .expect("condition");
        assert_eq!(condition, vec![("kind".to_string(), Value::text("a"))]);
    }

    #[test]
    fn entry_count_counts_operations_not_verbs() {
        let bag = RelationInput::new()
            .create(MutationInput::default())
            .create(MutationInput::default())
            .delete_others();
        assert_eq!(entry_count(&bag), 3);
    }
}
