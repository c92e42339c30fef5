//! Database session seam.
//!
//! The engine never opens connections or transactions itself: it is handed an
//! open, already-authenticated session and speaks to it exclusively through
//! this trait. All statements of one request execute serially within the
//! session's transaction even when the engine dispatches them from concurrent
//! resolution branches.

use crate::catalog::types::{Row, Value};
use crate::error::GraftError;
use crate::sql::quote_ident;
use async_trait::async_trait;

/// A parameter-bound statement. `text` uses `$1..$n` placeholders referring
/// into `params`; user-controlled data never appears in `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub text: String,
    pub params: Vec<Value>,
}

impl SqlStatement {
    pub fn new(text: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }
}

#[async_trait]
pub trait Session: Send + Sync {
    async fn execute(&self, statement: &SqlStatement) -> Result<Vec<Row>, GraftError>;

    async fn open_savepoint(&self, name: &str) -> Result<(), GraftError> {
        self.execute(&SqlStatement::raw(format!("SAVEPOINT {}", quote_ident(name))))
            .await
            .map(|_| ())
    }

    async fn rollback_to_savepoint(&self, name: &str) -> Result<(), GraftError> {
        self.execute(&SqlStatement::raw(format!(
            "ROLLBACK TO SAVEPOINT {}",
            quote_ident(name)
        )))
        .await
        .map(|_| ())
    }

    async fn release_savepoint(&self, name: &str) -> Result<(), GraftError> {
        self.execute(&SqlStatement::raw(format!(
            "RELEASE SAVEPOINT {}",
            quote_ident(name)
        )))
        .await
        .map(|_| ())
    }
}
