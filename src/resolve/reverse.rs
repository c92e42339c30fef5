//! Reverse (owned-side) relation resolution.
//!
//! A reverse relation lives on the table the foreign key points at: its
//! nested operations run after the local row exists, scoped to it by splicing
//! the row's key values into every child operation. Verb order is fixed:
//! connect, delete, update, deleteOthers, then the creating verbs. The
//! deleteOthers sweep must run before new children appear, and its keep set
//! is exactly the rows the earlier verbs touched.

use crate::catalog::relation::{RelationDescriptor, RelationDirection};
use crate::catalog::schema::TableSchema;
use crate::catalog::types::{Row, Value};
use crate::error::GraftError;
use crate::resolve::input::{MutationInput, RelationInput};
use crate::resolve::{entry_count, locator_condition, mutate_nested, ResolutionContext};
use crate::sql::diff::build_delete_others;
use crate::sql::write::{build_delete, build_insert_or_upsert, build_update};
use futures::future::try_join_all;
use tracing::debug;

/// Resolve every reverse relation named by `input` against the freshly
/// written `parent_row`.
pub(crate) async fn resolve_reverse(
    ctx: &ResolutionContext<'_>,
    table: &TableSchema,
    parent_row: &Row,
    input: &MutationInput,
    depth: usize,
) -> Result<(), GraftError> {
    let relations = ctx.catalog.relations_of(&table.name)?;

    let mut pending = Vec::new();
    for (name, bag) in &input.relations {
        // Unknown names were already rejected by the forward pass.
        let Some(descriptor) = relations.find_directed(name, RelationDirection::Reverse) else {
            continue;
        };
        if !bag.is_empty() {
            pending.push(resolve_one(ctx, descriptor, parent_row, bag, depth));
        }
    }
    try_join_all(pending).await?;
    Ok(())
}

async fn resolve_one(
    ctx: &ResolutionContext<'_>,
    relation: &RelationDescriptor,
    parent_row: &Row,
    bag: &RelationInput,
    depth: usize,
) -> Result<(), GraftError> {
    for verb in bag.populated_verbs() {
        if !relation.verbs.contains(verb) {
            return Err(GraftError::IllegalVerb {
                relation: relation.name.clone(),
                verb,
            });
        }
    }
    if relation.unique && entry_count(bag) > 1 {
        return Err(GraftError::UniqueRelationConflict {
            relation: relation.name.clone(),
        });
    }

    let foreign = ctx.catalog.table(&relation.foreign_table)?;
    debug!(
        relation = %relation.name,
        table = %foreign.name,
        caller = %ctx.caller.caller_id,
        "resolving reverse relation"
    );

    // The parent's key values, keyed by the child's fk columns. Both the
    // scoping conditions and the spliced child values come from here.
    let mut fk_row = Row::new();
    for (local, foreign_col) in relation.key_pairs() {
        let value = parent_row
            .get(local)
            .ok_or_else(|| GraftError::MissingKeyValue {
                table: relation.local_table.clone(),
                column: local.to_string(),
            })?;
        fk_row.set(foreign_col, value.clone());
    }
    let fk_condition: Vec<(String, Value)> = fk_row
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect();

    // Rows the explicit verbs touched; deleteOthers keeps exactly these.
    let mut touched: Vec<Row> = Vec::new();

    for locator in &bag.connect {
        let condition = locator_condition(foreign, locator)?;
        let statement = build_update(foreign, &fk_row, &condition, ctx.encoder)?;
        let matched = ctx.session.execute(&statement).await?;
        if matched.is_empty() {
            return Err(GraftError::ConnectTargetNotFound {
                relation: relation.name.clone(),
            });
        }
        if relation.unique && matched.len() > 1 {
            return Err(GraftError::AmbiguousTarget {
                target: relation.name.clone(),
                matched: matched.len(),
            });
        }
        touched.extend(matched);
    }

    for locator in &bag.delete {
        let condition = locator_condition(foreign, locator)?;
        let statement = build_delete(foreign, &condition, ctx.encoder)?;
        let removed = ctx.session.execute(&statement).await?;
        if removed.is_empty() {
            return Err(GraftError::DeleteTargetNotFound {
                relation: relation.name.clone(),
            });
        }
        // Already gone, so excluding them from the sweep is a no-op, but the
        // accumulator stays a faithful record of every row the verbs touched.
        touched.extend(removed);
    }

    for nested in &bag.update {
        // Scope by the parent keys as well as the locator so the patch can
        // never leak onto another parent's child.
        let mut condition = fk_condition.clone();
        condition.extend(locator_condition(foreign, &nested.target)?);
        let statement = build_update(foreign, &nested.patch, &condition, ctx.encoder)?;
        let matched = ctx.session.execute(&statement).await?;
        if matched.is_empty() {
            return Err(GraftError::UpdateTargetNotFound {
                target: relation.name.clone(),
            });
        }
        touched.extend(matched);
    }

    if bag.delete_others {
        let statement =
            build_delete_others(relation, foreign, parent_row, &touched, ctx.encoder)?;
        ctx.session.execute(&statement).await?;
    }

    let creates = bag
        .create
        .iter()
        .map(|child| (child.clone(), false))
        .chain(bag.upsert.iter().map(|child| (child.clone(), true)));
    let nested_writes: Vec<_> = creates
        .map(|(child, do_upsert)| {
            let spliced = MutationInput {
                values: child.values.merged(&fk_row),
                relations: child.relations,
            };
            mutate_nested(ctx, foreign.clone(), spliced, do_upsert, depth + 1)
        })
        .collect();
    try_join_all(nested_writes).await?;

    if !bag.batch_create.is_empty() {
        write_batch(ctx, foreign, &fk_row, &bag.batch_create, false).await?;
    }
    if !bag.batch_upsert.is_empty() {
        write_batch(ctx, foreign, &fk_row, &bag.batch_upsert, true).await?;
    }

    Ok(())
}

/// Splice the parent keys into every batch row and write them as one
/// multi-row statement.
async fn write_batch(
    ctx: &ResolutionContext<'_>,
    foreign: &TableSchema,
    fk_row: &Row,
    rows: &[Row],
    do_upsert: bool,
) -> Result<(), GraftError> {
    let spliced: Vec<Row> = rows.iter().map(|row| row.merged(fk_row)).collect();
    let statement = build_insert_or_upsert(foreign, &spliced, do_upsert, ctx.encoder)?;
    let written = ctx.session.execute(&statement).await?;
    if written.is_empty() {
        return Err(GraftError::EmptyWriteResult {
            table: foreign.name.clone(),
        });
    }
    Ok(())
}
