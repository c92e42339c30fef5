use crate::catalog::relation::Verb;
use thiserror::Error;

/// Broad failure classes surfaced to callers.
///
/// `Validation`, `Resolution` and `Constraint` are detected synchronously by
/// the engine; `Database` wraps a session failure and passes it through
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Resolution,
    Constraint,
    Database,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Resolution => write!(f, "resolution"),
            ErrorKind::Constraint => write!(f, "constraint"),
            ErrorKind::Database => write!(f, "database"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraftErrorCode {
    UniqueRelationConflict,
    IllegalVerb,
    DepthExceeded,
    TypeMismatch,
    NotNullViolation,
    UnknownColumn,
    EmptyCondition,
    EmptyBatch,
    BatchShapeMismatch,
    BatchWithoutColumns,
    ConnectTargetNotFound,
    DeleteTargetNotFound,
    UpdateTargetNotFound,
    AmbiguousTarget,
    RowIdTableMismatch,
    RowIdArityMismatch,
    MissingKeyValue,
    EmptyWriteResult,
    KeyArityMismatch,
    UnknownTable,
    DuplicateTable,
    UnknownRelation,
    MissingColumn,
    PrimaryKeyRequired,
    DeleteOthersWithoutPrimaryKey,
    Database,
}

impl GraftErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            GraftErrorCode::UniqueRelationConflict => "unique_relation_conflict",
            GraftErrorCode::IllegalVerb => "illegal_verb",
            GraftErrorCode::DepthExceeded => "depth_exceeded",
            GraftErrorCode::TypeMismatch => "type_mismatch",
            GraftErrorCode::NotNullViolation => "not_null_violation",
            GraftErrorCode::UnknownColumn => "unknown_column",
            GraftErrorCode::EmptyCondition => "empty_condition",
            GraftErrorCode::EmptyBatch => "empty_batch",
            GraftErrorCode::BatchShapeMismatch => "batch_shape_mismatch",
            GraftErrorCode::BatchWithoutColumns => "batch_without_columns",
            GraftErrorCode::ConnectTargetNotFound => "connect_target_not_found",
            GraftErrorCode::DeleteTargetNotFound => "delete_target_not_found",
            GraftErrorCode::UpdateTargetNotFound => "update_target_not_found",
            GraftErrorCode::AmbiguousTarget => "ambiguous_target",
            GraftErrorCode::RowIdTableMismatch => "row_id_table_mismatch",
            GraftErrorCode::RowIdArityMismatch => "row_id_arity_mismatch",
            GraftErrorCode::MissingKeyValue => "missing_key_value",
            GraftErrorCode::EmptyWriteResult => "empty_write_result",
            GraftErrorCode::KeyArityMismatch => "key_arity_mismatch",
            GraftErrorCode::UnknownTable => "unknown_table",
            GraftErrorCode::DuplicateTable => "duplicate_table",
            GraftErrorCode::UnknownRelation => "unknown_relation",
            GraftErrorCode::MissingColumn => "missing_column",
            GraftErrorCode::PrimaryKeyRequired => "primary_key_required",
            GraftErrorCode::DeleteOthersWithoutPrimaryKey => "delete_others_without_primary_key",
            GraftErrorCode::Database => "database",
        }
    }
}

#[derive(Debug, Error)]
pub enum GraftError {
    #[error("unique relation '{relation}' accepts a single nested operation per request")]
    UniqueRelationConflict { relation: String },
    #[error("operation '{verb}' is not legal for relation '{relation}'")]
    IllegalVerb { relation: String, verb: Verb },
    #[error("mutation tree exceeds the maximum resolution depth of {max_depth}")]
    DepthExceeded { max_depth: usize },
    #[error(
        "type mismatch: column '{column}' in table '{table}' expected {expected}, got {actual}"
    )]
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    #[error("NOT NULL violation: column '{column}' in table '{table}'")]
    NotNullViolation { table: String, column: String },
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("statement against table '{table}' would match unconditionally; at least one key column is required")]
    EmptyCondition { table: String },
    #[error("batch write against table '{table}' carries no rows")]
    EmptyBatch { table: String },
    #[error(
        "batch row column '{column}' is outside the column set fixed by the first row for table '{table}'"
    )]
    BatchShapeMismatch { table: String, column: String },
    #[error("multi-row write against table '{table}' must name at least one column")]
    BatchWithoutColumns { table: String },
    #[error("no row matched the connect keys for relation '{relation}'")]
    ConnectTargetNotFound { relation: String },
    #[error("no row matched the delete keys for relation '{relation}'")]
    DeleteTargetNotFound { relation: String },
    #[error("no row matched the update target for '{target}'")]
    UpdateTargetNotFound { target: String },
    #[error("locator for '{target}' matched {matched} rows, expected exactly one")]
    AmbiguousTarget { target: String, matched: usize },
    #[error("row identifier references table '{actual}', expected '{expected}'")]
    RowIdTableMismatch { expected: String, actual: String },
    #[error("row identifier carries {actual} key values, table '{table}' expects {expected}")]
    RowIdArityMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[error("row for table '{table}' is missing a value for key column '{column}'")]
    MissingKeyValue { table: String, column: String },
    #[error("write against table '{table}' returned no row")]
    EmptyWriteResult { table: String },
    #[error("foreign key '{relation}' on table '{table}' has mismatched or empty key column lists")]
    KeyArityMismatch { table: String, relation: String },
    #[error("unknown table '{table}'")]
    UnknownTable { table: String },
    #[error("table '{table}' registered more than once")]
    DuplicateTable { table: String },
    #[error("unknown relation '{relation}' on table '{table}'")]
    UnknownRelation { table: String, relation: String },
    #[error("table '{table}' declares no column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("{operation} requires a primary key on table '{table}'")]
    PrimaryKeyRequired {
        table: String,
        operation: &'static str,
    },
    #[error(
        "deleteOthers is not supported on relations whose foreign table '{table}' has no primary key"
    )]
    DeleteOthersWithoutPrimaryKey { table: String },
    #[error("database error: {message}")]
    Database { message: String },
}

impl GraftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraftError::UniqueRelationConflict { .. }
            | GraftError::IllegalVerb { .. }
            | GraftError::DepthExceeded { .. }
            | GraftError::TypeMismatch { .. }
            | GraftError::NotNullViolation { .. }
            | GraftError::UnknownColumn { .. }
            | GraftError::EmptyCondition { .. }
            | GraftError::EmptyBatch { .. }
            | GraftError::BatchShapeMismatch { .. }
            | GraftError::BatchWithoutColumns { .. } => ErrorKind::Validation,
            GraftError::ConnectTargetNotFound { .. }
            | GraftError::DeleteTargetNotFound { .. }
            | GraftError::UpdateTargetNotFound { .. }
            | GraftError::AmbiguousTarget { .. }
            | GraftError::RowIdTableMismatch { .. }
            | GraftError::RowIdArityMismatch { .. }
            | GraftError::MissingKeyValue { .. }
            | GraftError::EmptyWriteResult { .. } => ErrorKind::Resolution,
            GraftError::KeyArityMismatch { .. }
            | GraftError::UnknownTable { .. }
            | GraftError::DuplicateTable { .. }
            | GraftError::UnknownRelation { .. }
            | GraftError::MissingColumn { .. }
            | GraftError::PrimaryKeyRequired { .. }
            | GraftError::DeleteOthersWithoutPrimaryKey { .. } => ErrorKind::Constraint,
            GraftError::Database { .. } => ErrorKind::Database,
        }
    }

    pub fn code(&self) -> GraftErrorCode {
        match self {
            GraftError::UniqueRelationConflict { .. } => GraftErrorCode::UniqueRelationConflict,
            GraftError::IllegalVerb { .. } => GraftErrorCode::IllegalVerb,
            GraftError::DepthExceeded { .. } => GraftErrorCode::DepthExceeded,
            GraftError::TypeMismatch { .. } => GraftErrorCode::TypeMismatch,
            GraftError::NotNullViolation { .. } => GraftErrorCode::NotNullViolation,
            GraftError::UnknownColumn { .. } => GraftErrorCode::UnknownColumn,
            GraftError::EmptyCondition { .. } => GraftErrorCode::EmptyCondition,
            GraftError::EmptyBatch { .. } => GraftErrorCode::EmptyBatch,
            GraftError::BatchShapeMismatch { .. } => GraftErrorCode::BatchShapeMismatch,
            GraftError::BatchWithoutColumns { .. } => GraftErrorCode::BatchWithoutColumns,
            GraftError::ConnectTargetNotFound { .. } => GraftErrorCode::ConnectTargetNotFound,
            GraftError::DeleteTargetNotFound { .. } => GraftErrorCode::DeleteTargetNotFound,
            GraftError::UpdateTargetNotFound { .. } => GraftErrorCode::UpdateTargetNotFound,
            GraftError::AmbiguousTarget { .. } => GraftErrorCode::AmbiguousTarget,
            GraftError::RowIdTableMismatch { .. } => GraftErrorCode::RowIdTableMismatch,
            GraftError::RowIdArityMismatch { .. } => GraftErrorCode::RowIdArityMismatch,
            GraftError::MissingKeyValue { .. } => GraftErrorCode::MissingKeyValue,
            GraftError::EmptyWriteResult { .. } => GraftErrorCode::EmptyWriteResult,
            GraftError::KeyArityMismatch { .. } => GraftErrorCode::KeyArityMismatch,
            GraftError::UnknownTable { .. } => GraftErrorCode::UnknownTable,
            GraftError::DuplicateTable { .. } => GraftErrorCode::DuplicateTable,
            GraftError::UnknownRelation { .. } => GraftErrorCode::UnknownRelation,
            GraftError::MissingColumn { .. } => GraftErrorCode::MissingColumn,
            GraftError::PrimaryKeyRequired { .. } => GraftErrorCode::PrimaryKeyRequired,
            GraftError::DeleteOthersWithoutPrimaryKey { .. } => {
                GraftErrorCode::DeleteOthersWithoutPrimaryKey
            }
            GraftError::Database { .. } => GraftErrorCode::Database,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, GraftError, GraftErrorCode};

    #[test]
    fn error_code_strings_are_stable() {
        assert_eq!(
            GraftErrorCode::DeleteOthersWithoutPrimaryKey.as_str(),
            "delete_others_without_primary_key"
        );
        assert_eq!(
            GraftErrorCode::ConnectTargetNotFound.as_str(),
            "connect_target_not_found"
        );
        assert_eq!(
            GraftErrorCode::RowIdArityMismatch.as_str(),
            "row_id_arity_mismatch"
        );
    }

    #[test]
    fn kinds_follow_the_taxonomy() {
        let err = GraftError::UniqueRelationConflict {
            relation: "children".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = GraftError::ConnectTargetNotFound {
            relation: "author".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Resolution);

        let err = GraftError::DeleteOthersWithoutPrimaryKey {
            table: "audit_log".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Constraint);
        assert_eq!(err.code_str(), "delete_others_without_primary_key");
    }
}
