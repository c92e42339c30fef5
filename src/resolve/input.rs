//! The mutation input tree.
//!
//! Constructed by the caller-facing layer per request, read-only to the
//! engine, consumed once. Nested fields are keyed by relation name and hold a
//! verb bag; the closed verb set replaces the string-keyed dispatch the
//! request language works in.

use crate::catalog::relation::Verb;
use crate::catalog::types::{Row, Value};
use crate::project::Projection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller identity and metadata carried through one resolution. Opaque to the
/// engine; surfaced to session implementations that log or audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallerContext {
    pub caller_id: String,
}

impl CallerContext {
    pub fn new(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
        }
    }
}

/// A pre-decoded opaque row identifier. The front end unwraps whatever wire
/// encoding it uses; the engine still re-checks the table identity and the
/// key arity against the catalog before trusting it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowId {
    pub table: String,
    pub key_values: Vec<Value>,
}

/// How an existing row is located.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RowLocator {
    /// Primary-key equality via a decoded opaque identifier.
    ById(RowId),
    /// Explicit constraint-key columns bound to caller-supplied values.
    ByKeys(Row),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedUpdate {
    pub target: RowLocator,
    pub patch: Row,
}

/// The verb bag attached to one nested relation field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationInput {
    #[serde(default)]
    pub connect: Vec<RowLocator>,
    #[serde(default)]
    pub delete: Vec<RowLocator>,
    #[serde(default)]
    pub update: Vec<NestedUpdate>,
    #[serde(default)]
    pub create: Vec<MutationInput>,
    #[serde(default)]
    pub upsert: Vec<MutationInput>,
    /// Batch rows are flat: one multi-row statement cannot interleave
    /// per-row nested resolution.
    #[serde(default)]
    pub batch_create: Vec<Row>,
    #[serde(default)]
    pub batch_upsert: Vec<Row>,
    #[serde(default)]
    pub delete_others: bool,
}

impl RelationInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(mut self, locator: RowLocator) -> Self {
        self.connect.push(locator);
        self
    }

    pub fn delete(mut self, locator: RowLocator) -> Self {
        self.delete.push(locator);
        self
    }

    pub fn update(mut self, target: RowLocator, patch: Row) -> Self {
        self.update.push(NestedUpdate { target, patch });
        self
    }

    pub fn create(mut self, input: MutationInput) -> Self {
        self.create.push(input);
        self
    }

    pub fn upsert(mut self, input: MutationInput) -> Self {
        self.upsert.push(input);
        self
    }

    pub fn batch_create(mut self, rows: Vec<Row>) -> Self {
        self.batch_create = rows;
        self
    }

    pub fn batch_upsert(mut self, rows: Vec<Row>) -> Self {
        self.batch_upsert = rows;
        self
    }

    pub fn delete_others(mut self) -> Self {
        self.delete_others = true;
        self
    }

    /// The verbs this bag actually populates, in resolution order.
    pub fn populated_verbs(&self) -> Vec<Verb> {
        let mut verbs = Vec::new();
        if !self.connect.is_empty() {
            verbs.push(Verb::Connect);
        }
        if !self.delete.is_empty() {
            verbs.push(Verb::Delete);
        }
        if !self.update.is_empty() {
            verbs.push(Verb::Update);
        }
        if self.delete_others {
            verbs.push(Verb::DeleteOthers);
        }
        if !self.create.is_empty() {
            verbs.push(Verb::Create);
        }
        if !self.upsert.is_empty() {
            verbs.push(Verb::Upsert);
        }
        if !self.batch_create.is_empty() {
            verbs.push(Verb::BatchCreate);
        }
        if !self.batch_upsert.is_empty() {
            verbs.push(Verb::BatchUpsert);
        }
        verbs
    }

    pub fn is_empty(&self) -> bool {
        self.populated_verbs().is_empty()
    }
}

/// One node of the input tree: scalar column values plus nested relation
/// fields keyed by relation name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MutationInput {
    pub values: Row,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationInput>,
}

impl MutationInput {
    pub fn new(values: Row) -> Self {
        Self {
            values,
            relations: BTreeMap::new(),
        }
    }

    pub fn with_relation(mut self, name: impl Into<String>, input: RelationInput) -> Self {
        self.relations.insert(name.into(), input);
        self
    }
}

/// The top-level operation kinds the engine exposes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MutationOperation {
    /// Insert one row, resolving its nested relations; `upsert` switches the
    /// primary write to insert-or-update semantics. Nested creates always
    /// insert; only the nested `upsert` verb gets conflict handling.
    Create { input: MutationInput, upsert: bool },
    /// Insert many flat rows in one statement.
    CreateBatch { rows: Vec<Row>, upsert: bool },
    /// Patch one existing row, resolving nested relations around it.
    Update {
        target: RowLocator,
        patch: MutationInput,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MutationRequest {
    pub table: String,
    pub operation: MutationOperation,
    #[serde(default)]
    pub projection: Projection,
    #[serde(default)]
    pub caller: CallerContext,
    /// Echoed back unchanged in the outcome; never interpreted.
    #[serde(default)]
    pub client_context: Option<String>,
}

/// What a successful mutation hands back to the front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MutationOutcome {
    pub row: Option<Row>,
    pub client_context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{MutationInput, RelationInput, RowLocator};
    use crate::catalog::relation::Verb;
    use crate::catalog::types::{Row, Value};

    #[test]
    fn populated_verbs_follow_resolution_order() {
        let bag = RelationInput::new()
            .create(MutationInput::new(Row::new()))
            .connect(RowLocator::ByKeys(Row::from_pairs([(
                "id",
                Value::Integer(1),
            )])))
            .delete_others();
        assert_eq!(
            bag.populated_verbs(),
            vec![Verb::Connect, Verb::DeleteOthers, Verb::Create]
        );
    }

    #[test]
    fn empty_bag_reports_empty() {
        assert!(RelationInput::new().is_empty());
        assert!(!RelationInput::new().delete_others().is_empty());
    }
}
