//! Insert/upsert, update, select and delete statement builders.

use crate::catalog::schema::{ColumnDef, TableSchema};
use crate::catalog::types::{Row, Value};
use crate::encode::ValueEncoder;
use crate::error::GraftError;
use crate::session::SqlStatement;
use crate::sql::{equality_condition, quote_ident, ParamBinder};

/// Build one insert (or insert-or-update) statement for `rows`.
///
/// The written column set is the schema-ordered set of columns present in the
/// *first* row, plus any primary-key column with a database default; those
/// must appear so the conflict target is never silently missing an identity
/// column. Every row is shaped to that set; cells a row does not provide are
/// written as the `DEFAULT` keyword. With `do_upsert`, a conflict on the
/// primary key updates every non-key column to the incoming (`excluded`)
/// value; key columns are never part of the SET list.
pub fn build_insert_or_upsert(
    table: &TableSchema,
    rows: &[Row],
    do_upsert: bool,
    encoder: &dyn ValueEncoder,
) -> Result<SqlStatement, GraftError> {
    if rows.is_empty() {
        return Err(GraftError::EmptyBatch {
            table: table.name.clone(),
        });
    }

    let first = &rows[0];
    for column in first.columns() {
        if table.column(column).is_none() {
            return Err(GraftError::UnknownColumn {
                table: table.name.clone(),
                column: column.to_string(),
            });
        }
    }

    let mut column_set: Vec<&ColumnDef> = table
        .columns
        .iter()
        .filter(|c| first.contains_column(&c.name))
        .collect();
    for pk in &table.primary_key {
        if column_set.iter().any(|c| c.name == *pk) {
            continue;
        }
        if let Some(def) = table.column(pk) {
            if def.has_default {
                column_set.push(def);
            }
        }
    }

    for row in &rows[1..] {
        for column in row.columns() {
            if !column_set.iter().any(|c| c.name == column) {
                return Err(GraftError::BatchShapeMismatch {
                    table: table.name.clone(),
                    column: column.to_string(),
                });
            }
        }
    }

    let mut binder = ParamBinder::new();
    let mut text = format!("INSERT INTO {}", quote_ident(&table.name));

    if column_set.is_empty() {
        if rows.len() > 1 {
            return Err(GraftError::BatchWithoutColumns {
                table: table.name.clone(),
            });
        }
        text.push_str(" DEFAULT VALUES");
    } else {
        let column_list: Vec<String> = column_set.iter().map(|c| quote_ident(&c.name)).collect();
        text.push_str(&format!(" ({})", column_list.join(", ")));

        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let mut cells = Vec::with_capacity(column_set.len());
            for def in &column_set {
                match row.get(&def.name) {
                    Some(value) => {
                        let encoded = encoder.encode(value, table, def)?;
                        cells.push(binder.push(encoded));
                    }
                    None => cells.push("DEFAULT".to_string()),
                }
            }
            tuples.push(format!("({})", cells.join(", ")));
        }
        text.push_str(&format!(" VALUES {}", tuples.join(", ")));
    }

    if do_upsert {
        if !table.has_primary_key() {
            return Err(GraftError::PrimaryKeyRequired {
                table: table.name.clone(),
                operation: "upsert",
            });
        }
        let conflict_target: Vec<String> =
            table.primary_key.iter().map(|c| quote_ident(c)).collect();
        let set_list: Vec<String> = column_set
            .iter()
            .filter(|c| !table.primary_key.contains(&c.name))
            .map(|c| format!("{id} = excluded.{id}", id = quote_ident(&c.name)))
            .collect();
        if set_list.is_empty() {
            // Only key columns are written; there is nothing to update on
            // conflict, so degrade to insert-or-ignore.
            text.push_str(&format!(
                " ON CONFLICT ({}) DO NOTHING",
                conflict_target.join(", ")
            ));
        } else {
            text.push_str(&format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                conflict_target.join(", "),
                set_list.join(", ")
            ));
        }
    }

    text.push_str(" RETURNING *");
    Ok(SqlStatement::new(text, binder.into_params()))
}

/// Build an update of `values` against the rows matching `condition`.
///
/// When `values` names no columns this intentionally degrades to a plain
/// SELECT by the same condition: the caller still gets the row it "updated"
/// back, but no write happens and no row lock is taken. Callers relying on
/// update side effects (triggers, locks) must send at least one real column
/// change.
pub fn build_update(
    table: &TableSchema,
    values: &Row,
    condition: &[(String, Value)],
    encoder: &dyn ValueEncoder,
) -> Result<SqlStatement, GraftError> {
    if condition.is_empty() {
        return Err(GraftError::EmptyCondition {
            table: table.name.clone(),
        });
    }
    for column in values.columns() {
        if table.column(column).is_none() {
            return Err(GraftError::UnknownColumn {
                table: table.name.clone(),
                column: column.to_string(),
            });
        }
    }

    let changed: Vec<&ColumnDef> = table
        .columns
        .iter()
        .filter(|c| values.contains_column(&c.name))
        .collect();

    if changed.is_empty() {
        return build_select(table, None, condition, encoder);
    }

    let mut binder = ParamBinder::new();
    let mut assignments = Vec::with_capacity(changed.len());
    for def in changed {
        let value = values
            .get(&def.name)
            .ok_or_else(|| GraftError::UnknownColumn {
                table: table.name.clone(),
                column: def.name.clone(),
            })?;
        let encoded = encoder.encode(value, table, def)?;
        let placeholder = binder.push(encoded);
        assignments.push(format!("{} = {}", quote_ident(&def.name), placeholder));
    }
    let where_clause = equality_condition(table, condition, &mut binder, encoder)?;

    let text = format!(
        "UPDATE {} SET {} WHERE {} RETURNING *",
        quote_ident(&table.name),
        assignments.join(", "),
        where_clause
    );
    Ok(SqlStatement::new(text, binder.into_params()))
}

pub fn build_select(
    table: &TableSchema,
    columns: Option<&[String]>,
    condition: &[(String, Value)],
    encoder: &dyn ValueEncoder,
) -> Result<SqlStatement, GraftError> {
    let projection = match columns {
        Some(cols) => {
            for column in cols {
                if table.column(column).is_none() {
                    return Err(GraftError::UnknownColumn {
                        table: table.name.clone(),
                        column: column.clone(),
                    });
                }
            }
            cols.iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        }
        None => "*".to_string(),
    };

    let mut binder = ParamBinder::new();
    let mut text = format!("SELECT {} FROM {}", projection, quote_ident(&table.name));
    if !condition.is_empty() {
        let where_clause = equality_condition(table, condition, &mut binder, encoder)?;
        text.push_str(&format!(" WHERE {where_clause}"));
    }
    Ok(SqlStatement::new(text, binder.into_params()))
}

pub fn build_delete(
    table: &TableSchema,
    condition: &[(String, Value)],
    encoder: &dyn ValueEncoder,
) -> Result<SqlStatement, GraftError> {
    let mut binder = ParamBinder::new();
    let where_clause = equality_condition(table, condition, &mut binder, encoder)?;
    let text = format!(
        "DELETE FROM {} WHERE {} RETURNING *",
        quote_ident(&table.name),
        where_clause
    );
    Ok(SqlStatement::new(text, binder.into_params()))
}
