//! Forward (owning-side) relation resolution.
//!
//! A forward relation lives on the table that holds the foreign-key columns:
//! its nested operations must settle before the local row is written, and the
//! resolved foreign row's key values are spliced into the local row.

use crate::catalog::relation::{RelationDescriptor, RelationDirection, Verb};
use crate::catalog::schema::TableSchema;
use crate::catalog::types::Row;
use crate::error::GraftError;
use crate::resolve::input::{MutationInput, RelationInput};
use crate::resolve::{entry_count, locator_condition, mutate_nested, ResolutionContext};
use crate::sql::write::{build_delete, build_select, build_update};
use futures::future::try_join_all;
use tracing::debug;

/// Resolve every forward relation named by `input` and return the foreign-key
/// override row to merge into the local values.
///
/// Reverse relations in the input are ignored here; they resolve after the
/// write. A name matching no relation at all is an error.
pub(crate) async fn resolve_forward(
    ctx: &ResolutionContext<'_>,
    table: &TableSchema,
    input: &MutationInput,
    depth: usize,
) -> Result<Row, GraftError> {
    let relations = ctx.catalog.relations_of(&table.name)?;

    let mut pending = Vec::new();
    for (name, bag) in &input.relations {
        if relations.find(name).is_none() {
            return Err(GraftError::UnknownRelation {
                table: table.name.clone(),
                relation: name.clone(),
            });
        }
        let Some(descriptor) = relations.find_directed(name, RelationDirection::Forward) else {
            continue;
        };
        if !bag.is_empty() {
            pending.push(resolve_one(ctx, descriptor, bag, depth));
        }
    }

    let fragments = try_join_all(pending).await?;
    let mut overrides = Row::new();
    for fragment in fragments {
        overrides = overrides.merged(&fragment);
    }
    Ok(overrides)
}

/// Resolve a single forward relation's verb bag into a key-override fragment.
async fn resolve_one(
    ctx: &ResolutionContext<'_>,
    relation: &RelationDescriptor,
    bag: &RelationInput,
    depth: usize,
) -> Result<Row, GraftError> {
    for verb in bag.populated_verbs() {
        if !relation.verbs.contains(verb) {
            return Err(GraftError::IllegalVerb {
                relation: relation.name.clone(),
                verb,
            });
        }
    }
    // A forward relation points at exactly one foreign row.
    if entry_count(bag) > 1 {
        return Err(GraftError::UniqueRelationConflict {
            relation: relation.name.clone(),
        });
    }
    // Collection-shaped verbs have no forward meaning even when a verb
    // override lists them.
    for verb in bag.populated_verbs() {
        if matches!(
            verb,
            Verb::Upsert | Verb::BatchCreate | Verb::BatchUpsert | Verb::DeleteOthers
        ) {
            return Err(GraftError::IllegalVerb {
                relation: relation.name.clone(),
                verb,
            });
        }
    }

    let foreign = ctx.catalog.table(&relation.foreign_table)?;
    debug!(
        relation = %relation.name,
        table = %foreign.name,
        caller = %ctx.caller.caller_id,
        "resolving forward relation"
    );

    let mut overrides = Row::new();

    for locator in &bag.connect {
        let condition = locator_condition(foreign, locator)?;
        let statement = build_select(foreign, None, &condition, ctx.encoder)?;
        let matched = ctx.session.execute(&statement).await?;
        if matched.len() > 1 {
            return Err(GraftError::AmbiguousTarget {
                target: relation.name.clone(),
                matched: matched.len(),
            });
        }
        let row = matched
            .into_iter()
            .next()
            .ok_or_else(|| GraftError::ConnectTargetNotFound {
                relation: relation.name.clone(),
            })?;
        splice_keys(relation, &row, &mut overrides)?;
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
        if removed.len() > 1 {
            return Err(GraftError::AmbiguousTarget {
                target: relation.name.clone(),
                matched: removed.len(),
            });
        }
        // The foreign row is gone; nothing to splice.
    }

    for nested in &bag.update {
        let condition = locator_condition(foreign, &nested.target)?;
        let statement = build_update(foreign, &nested.patch, &condition, ctx.encoder)?;
        let matched = ctx.session.execute(&statement).await?;
        if matched.len() > 1 {
            return Err(GraftError::AmbiguousTarget {
                target: relation.name.clone(),
                matched: matched.len(),
            });
        }
        let row = matched
            .into_iter()
            .next()
            .ok_or_else(|| GraftError::UpdateTargetNotFound {
                target: relation.name.clone(),
            })?;
        splice_keys(relation, &row, &mut overrides)?;
    }

    for child in &bag.create {
        let row = mutate_nested(ctx, foreign.clone(), child.clone(), false, depth + 1).await?;
        splice_keys(relation, &row, &mut overrides)?;
    }

    Ok(overrides)
}

/// Copy the foreign row's referenced key values into the local override row,
/// following the relation's positional column correspondence.
fn splice_keys(
    relation: &RelationDescriptor,
    foreign_row: &Row,
    overrides: &mut Row,
) -> Result<(), GraftError> {
    for (local, foreign_col) in relation.key_pairs() {
        let value = foreign_row
            .get(foreign_col)
            .ok_or_else(|| GraftError::MissingKeyValue {
                table: relation.foreign_table.clone(),
                column: foreign_col.to_string(),
            })?;
        overrides.set(local, value.clone());
    }
    Ok(())
}
