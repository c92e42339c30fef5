//! Relationship catalog view.
//!
//! The catalog is built once from table schemas and shared read-only across
//! requests. For every declared foreign key it derives two relation
//! descriptors: a forward one on the table that owns the key columns and a
//! reverse one on the referenced table. A self-referencing foreign key puts
//! both descriptors on the same table, so the reverse one takes the key's
//! name with a `_reverse` suffix to stay addressable. Resolution never
//! consults ambient state; the catalog is passed by reference into every
//! call.

pub mod relation;
pub mod schema;
pub mod types;

use crate::catalog::relation::{RelationDescriptor, RelationDirection, VerbSet};
use crate::catalog::schema::TableSchema;
use crate::error::GraftError;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TableRelations {
    pub forward: Vec<Arc<RelationDescriptor>>,
    pub reverse: Vec<Arc<RelationDescriptor>>,
}

impl TableRelations {
    pub fn find(&self, name: &str) -> Option<&Arc<RelationDescriptor>> {
        self.forward
            .iter()
            .chain(self.reverse.iter())
            .find(|r| r.name == name)
    }

    pub fn find_directed(
        &self,
        name: &str,
        direction: RelationDirection,
    ) -> Option<&Arc<RelationDescriptor>> {
        let side = match direction {
            RelationDirection::Forward => &self.forward,
            RelationDirection::Reverse => &self.reverse,
        };
        side.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    tables: BTreeMap<String, Arc<TableSchema>>,
    relations: BTreeMap<String, TableRelations>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn table(&self, name: &str) -> Result<&Arc<TableSchema>, GraftError> {
        self.tables.get(name).ok_or_else(|| GraftError::UnknownTable {
            table: name.to_string(),
        })
    }

    pub fn relations_of(&self, table: &str) -> Result<&TableRelations, GraftError> {
        // Every registered table has an entry, possibly empty.
        self.relations
            .get(table)
            .ok_or_else(|| GraftError::UnknownTable {
                table: table.to_string(),
            })
    }

    pub fn legal_verbs_of(&self, table: &str, relation: &str) -> Result<&VerbSet, GraftError> {
        self.relations_of(table)?
            .find(relation)
            .map(|r| &r.verbs)
            .ok_or_else(|| GraftError::UnknownRelation {
                table: table.to_string(),
                relation: relation.to_string(),
            })
    }
}

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    tables: Vec<TableSchema>,
    verb_overrides: BTreeMap<(String, String), VerbSet>,
}

impl CatalogBuilder {
    pub fn table(mut self, schema: TableSchema) -> Self {
        self.tables.push(schema);
        self
    }

    /// Restrict the verbs legal for one relation, as seen from `table`.
    pub fn restrict_verbs(
        mut self,
        table: impl Into<String>,
        relation: impl Into<String>,
        verbs: VerbSet,
    ) -> Self {
        self.verb_overrides
            .insert((table.into(), relation.into()), verbs);
        self
    }

    pub fn build(self) -> Result<Catalog, GraftError> {
        let mut tables: BTreeMap<String, Arc<TableSchema>> = BTreeMap::new();
        for schema in self.tables {
            if tables.contains_key(&schema.name) {
                return Err(GraftError::DuplicateTable { table: schema.name });
            }
            tables.insert(schema.name.clone(), Arc::new(schema));
        }

        let mut relations: BTreeMap<String, TableRelations> = tables
            .keys()
            .map(|name| (name.clone(), TableRelations::default()))
            .collect();

        for owner in tables.values() {
            for fk in &owner.foreign_keys {
                if fk.columns.is_empty() || fk.columns.len() != fk.references_columns.len() {
                    return Err(GraftError::KeyArityMismatch {
                        table: owner.name.clone(),
                        relation: fk.name.clone(),
                    });
                }
                for column in &fk.columns {
                    if owner.column(column).is_none() {
                        return Err(GraftError::MissingColumn {
                            table: owner.name.clone(),
                            column: column.clone(),
                        });
                    }
                }
                let referenced =
                    tables
                        .get(&fk.references_table)
                        .ok_or_else(|| GraftError::UnknownTable {
                            table: fk.references_table.clone(),
                        })?;
                for column in &fk.references_columns {
                    if referenced.column(column).is_none() {
                        return Err(GraftError::MissingColumn {
                            table: referenced.name.clone(),
                            column: column.clone(),
                        });
                    }
                }

                let forward_verbs = self
                    .verb_overrides
                    .get(&(owner.name.clone(), fk.name.clone()))
                    .cloned()
                    .unwrap_or_else(VerbSet::forward_default);
                let forward = Arc::new(RelationDescriptor {
                    name: fk.name.clone(),
                    direction: RelationDirection::Forward,
                    local_table: owner.name.clone(),
                    foreign_table: referenced.name.clone(),
                    local_columns: fk.columns.clone(),
                    foreign_columns: fk.references_columns.clone(),
                    unique: true,
                    verbs: forward_verbs,
                });

                // Keep the reverse side addressable when both descriptors
                // land on the same table.
                let reverse_name = if owner.name == referenced.name {
                    format!("{}_reverse", fk.name)
                } else {
                    fk.name.clone()
                };
                let reverse_verbs = self
                    .verb_overrides
                    .get(&(referenced.name.clone(), reverse_name.clone()))
                    .cloned()
                    .unwrap_or_else(VerbSet::reverse_default);
                let reverse = Arc::new(RelationDescriptor {
                    name: reverse_name,
                    direction: RelationDirection::Reverse,
                    local_table: referenced.name.clone(),
                    foreign_table: owner.name.clone(),
                    local_columns: fk.references_columns.clone(),
                    foreign_columns: fk.columns.clone(),
                    unique: owner.columns_are_unique(&fk.columns),
                    verbs: reverse_verbs,
                });

                relations
                    .get_mut(&owner.name)
                    .expect("owner table registered")
                    .forward
                    .push(forward);
                relations
                    .get_mut(&referenced.name)
                    .expect("referenced table registered")
                    .reverse
                    .push(reverse);
            }
        }

        // Overrides that name a relation no foreign key produced are a
        // misconfiguration, not something to silently drop.
        for (table, relation) in self.verb_overrides.keys() {
            let known = relations
                .get(table)
                .map(|r| r.find(relation).is_some())
                .unwrap_or(false);
            if !known {
                return Err(GraftError::UnknownRelation {
                    table: table.clone(),
                    relation: relation.clone(),
                });
            }
        }

        Ok(Catalog { tables, relations })
    }
}
