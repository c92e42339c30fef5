use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which side of the foreign key the relation is seen from.
///
/// Forward: the local table holds the foreign-key columns and must resolve
/// the relation before its own row is written. Reverse: the foreign table
/// holds the columns pointing back, and resolves after the local row exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RelationDirection {
    Forward,
    Reverse,
}

/// The closed set of nested operation verbs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verb {
    Connect,
    Delete,
    Update,
    Create,
    Upsert,
    BatchCreate,
    BatchUpsert,
    DeleteOthers,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Connect => "connect",
            Verb::Delete => "delete",
            Verb::Update => "update",
            Verb::Create => "create",
            Verb::Upsert => "upsert",
            Verb::BatchCreate => "batchCreate",
            Verb::BatchUpsert => "batchUpsert",
            Verb::DeleteOthers => "deleteOthers",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerbSet(BTreeSet<Verb>);

impl VerbSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The verbs legal on a forward (owning-side) relation.
    pub fn forward_default() -> Self {
        [Verb::Connect, Verb::Delete, Verb::Update, Verb::Create]
            .into_iter()
            .collect()
    }

    /// The verbs legal on a reverse (owned-side) relation.
    pub fn reverse_default() -> Self {
        [
            Verb::Connect,
            Verb::Delete,
            Verb::Update,
            Verb::Create,
            Verb::Upsert,
            Verb::BatchCreate,
            Verb::BatchUpsert,
            Verb::DeleteOthers,
        ]
        .into_iter()
        .collect()
    }

    pub fn contains(&self, verb: Verb) -> bool {
        self.0.contains(&verb)
    }

    pub fn insert(&mut self, verb: Verb) {
        self.0.insert(verb);
    }

    pub fn iter(&self) -> impl Iterator<Item = Verb> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Verb> for VerbSet {
    fn from_iter<I: IntoIterator<Item = Verb>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One side of a foreign-key relationship, as seen from `local_table`.
///
/// `local_columns[i]` corresponds positionally to `foreign_columns[i]`; the
/// catalog builder guarantees both lists have equal, non-zero length. Built
/// once per catalog and shared read-only across requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub name: String,
    pub direction: RelationDirection,
    pub local_table: String,
    pub foreign_table: String,
    pub local_columns: Vec<String>,
    pub foreign_columns: Vec<String>,
    /// At most one foreign row may exist per local row (the foreign-key
    /// columns are unique on the foreign table, or this is the forward side).
    pub unique: bool,
    pub verbs: VerbSet,
}

impl RelationDescriptor {
    /// Positional `(local, foreign)` column pairs.
    pub fn key_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.local_columns
            .iter()
            .map(String::as_str)
            .zip(self.foreign_columns.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::{Verb, VerbSet};

    #[test]
    fn default_verb_sets_differ_by_direction() {
        let forward = VerbSet::forward_default();
        let reverse = VerbSet::reverse_default();

        assert!(forward.contains(Verb::Create));
        assert!(!forward.contains(Verb::DeleteOthers));
        assert!(!forward.contains(Verb::BatchUpsert));
        assert!(reverse.contains(Verb::DeleteOthers));
        assert_eq!(reverse.len(), 8);
    }

    #[test]
    fn verb_names_match_the_wire_spelling() {
        assert_eq!(Verb::BatchCreate.as_str(), "batchCreate");
        assert_eq!(Verb::DeleteOthers.as_str(), "deleteOthers");
    }
}
