//! graft: nested relational mutation resolution.
//!
//! A graft engine takes one tree-shaped mutation request (a row to write plus
//! nested operations on its related rows), resolves it into a series of
//! parameter-bound SQL statements against a caller-supplied session, and
//! returns the resulting row reprojected through the caller's column
//! selection. The whole request runs under a savepoint: any failure rolls the
//! session back to the state before the request and surfaces the original
//! error.
//!
//! The engine owns no connections and starts no transactions of its own; it
//! assumes the [`Session`] it is handed is already inside one.
//!
//! ```no_run
//! use graft::{Catalog, GraftEngine, MutationInput, MutationOperation, MutationRequest};
//! # async fn demo(catalog: Catalog, session: &dyn graft::Session) -> Result<(), graft::GraftError> {
//! let engine = GraftEngine::new(catalog);
//! let request = MutationRequest {
//!     table: "parent".into(),
//!     operation: MutationOperation::Create {
//!         input: MutationInput::default(),
//!         upsert: false,
//!     },
//!     projection: Default::default(),
//!     caller: Default::default(),
//!     client_context: None,
//! };
//! let outcome = engine.mutate(session, &request).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod encode;
pub mod error;
pub mod project;
pub mod resolve;
pub mod session;
pub mod sql;

pub use crate::catalog::relation::{RelationDescriptor, RelationDirection, Verb, VerbSet};
pub use crate::catalog::schema::{ColumnDef, ForeignKey, TableSchema, UniqueConstraint};
pub use crate::catalog::types::{ColumnType, Row, Value};
pub use crate::catalog::{Catalog, CatalogBuilder};
pub use crate::config::GraftConfig;
pub use crate::encode::{DefaultEncoder, ValueEncoder};
pub use crate::error::{ErrorKind, GraftError, GraftErrorCode};
pub use crate::project::Projection;
pub use crate::resolve::input::{
    CallerContext, MutationInput, MutationOperation, MutationOutcome, MutationRequest,
    NestedUpdate, RelationInput, RowId, RowLocator,
};
pub use crate::session::{Session, SqlStatement};

use crate::project::reproject;
use crate::resolve::{mutate_nested, run_update, ResolutionContext};
use crate::sql::write::build_insert_or_upsert;
use std::sync::Arc;
use tracing::{debug, warn};

/// The engine: a catalog, a configuration and a value encoder, shared
/// read-only across requests. Cheap to clone.
#[derive(Clone)]
pub struct GraftEngine {
    catalog: Arc<Catalog>,
    config: GraftConfig,
    encoder: Arc<dyn ValueEncoder>,
}

impl GraftEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            config: GraftConfig::default(),
            encoder: Arc::new(DefaultEncoder),
        }
    }

    pub fn with_config(mut self, config: GraftConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ValueEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Execute one mutation request against `session`.
    ///
    /// Opens a savepoint, resolves the request, reprojects the result and
    /// releases the savepoint. On any failure the session is rolled back to
    /// the savepoint before the original error is returned, so a failed
    /// request leaves no partial writes behind. The savepoint is released in
    /// both outcomes; a release or rollback failure after a resolution error
    /// is logged but never masks that error.
    pub async fn mutate(
        &self,
        session: &dyn Session,
        request: &MutationRequest,
    ) -> Result<MutationOutcome, GraftError> {
        let table = self.catalog.table(&request.table)?.clone();
        let savepoint = self.config.savepoint_name.as_str();
        debug!(
            table = %request.table,
            caller = %request.caller.caller_id,
            "resolving nested mutation"
        );

        session.open_savepoint(savepoint).await?;
        match self.run(session, &table, request).await {
            Ok(row) => {
                session.release_savepoint(savepoint).await?;
                Ok(MutationOutcome {
                    row,
                    client_context: request.client_context.clone(),
                })
            }
            Err(err) => {
                warn!(
                    table = %request.table,
                    code = err.code_str(),
                    "nested mutation failed, rolling back to savepoint"
                );
                if let Err(rollback_err) = session.rollback_to_savepoint(savepoint).await {
                    warn!(code = rollback_err.code_str(), "savepoint rollback failed");
                }
                if let Err(release_err) = session.release_savepoint(savepoint).await {
                    warn!(code = release_err.code_str(), "savepoint release failed");
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        session: &dyn Session,
        table: &Arc<TableSchema>,
        request: &MutationRequest,
    ) -> Result<Option<Row>, GraftError> {
        let ctx = ResolutionContext {
            catalog: &self.catalog,
            config: &self.config,
            encoder: self.encoder.as_ref(),
            session,
            caller: &request.caller,
        };

        let row = match &request.operation {
            MutationOperation::Create { input, upsert } => {
                mutate_nested(&ctx, table.clone(), input.clone(), *upsert, 0).await?
            }
            MutationOperation::CreateBatch { rows, upsert } => {
                let statement = build_insert_or_upsert(table, rows, *upsert, ctx.encoder)?;
                let written = session.execute(&statement).await?;
                written
                    .into_iter()
                    .next()
                    .ok_or_else(|| GraftError::EmptyWriteResult {
                        table: table.name.clone(),
                    })?
            }
            MutationOperation::Update { target, patch } => {
                run_update(&ctx, table, target, patch, 0).await?
            }
        };

        reproject(session, ctx.encoder, table, row, &request.projection).await
    }
}
