//! Create, update and read over the stock aggregate.
//!
//! A stock owns its color variants (three images each), their color-scheme
//! links, and three independent tag relations. Writes fan out across these
//! tables concurrently and are joined before the engine answers:
//!
//! - **create** inserts the header, then every tag kind and every variant
//!   in parallel. A variant whose color does not exist is skipped with a
//!   warning.
//! - **update** reconciles the whole aggregate against the submitted state:
//!   submitted rows are upserted, rows left out are deleted together with
//!   their image files. Shape and reference errors are reported before any
//!   write. Updates of one stock are serialized by [`StockLocks`].
//! - **list** pages through headers and resolves every relation.
//!
//! There is no wrapping transaction: a storage error stops the remaining
//! work, keeps what was already written and reports the completed stages.

mod create;
mod error;
pub mod gate;
mod locks;
mod progress;
mod read;
mod update;

use std::path::Path;

use sqlx::PgPool;
use stockroom_core::association::{AssociationGraph, GraphError, JunctionRef};
use stockroom_core::schema::catalog;
use stockroom_core::tags::TagKind;

pub use create::{CreateOutcome, CreateStockRequest};
pub use error::StockSyncError;
pub use locks::{StockLocks, StockUpdateGuard};
pub use progress::Progress;
pub use read::StockPage;
pub use update::{UpdateOutcome, UpdateStockRequest, VariantSubmission};

/// Junction tables of the stock aggregate, resolved once from the graph.
#[derive(Debug, Clone)]
pub struct StockJunctions {
    material: JunctionRef,
    design: JunctionRef,
    environment: JunctionRef,
    /// `Stock` to `StockColor`.
    pub variants: JunctionRef,
    /// `StockColor` to `ColorScheme`.
    pub schemes: JunctionRef,
}

impl StockJunctions {
    pub fn resolve(graph: &AssociationGraph) -> Result<Self, GraphError> {
        let missing = |owner: &'static str, target: &str| GraphError::Malformed {
            entity: owner,
            reason: format!("no many-to-many relation to {target}"),
        };

        let tag = |kind: TagKind| {
            graph
                .many_to_many(catalog::STOCK, kind.entity())
                .ok_or_else(|| missing(catalog::STOCK, kind.entity()))
        };
        let variants = graph
            .many_to_many(catalog::STOCK, catalog::STOCK_COLOR)
            .ok_or_else(|| missing(catalog::STOCK, catalog::STOCK_COLOR))?;
        let schemes = graph
            .junction(catalog::STOCK_COLOR, catalog::STOCK_COLOR_COLOR_SCHEME)
            .ok_or_else(|| missing(catalog::STOCK_COLOR, catalog::COLOR_SCHEME))?;

        Ok(Self {
            material: tag(TagKind::Material)?,
            design: tag(TagKind::Design)?,
            environment: tag(TagKind::Environment)?,
            variants,
            schemes,
        })
    }

    pub fn tag(&self, kind: TagKind) -> &JunctionRef {
        match kind {
            TagKind::Material => &self.material,
            TagKind::Design => &self.design,
            TagKind::Environment => &self.environment,
        }
    }
}

/// Runs aggregate operations against one pool and upload directory.
#[derive(Clone, Copy)]
pub struct StockSyncEngine<'a> {
    pool: &'a PgPool,
    junctions: &'a StockJunctions,
    locks: &'a StockLocks,
    upload_root: &'a Path,
}

impl<'a> StockSyncEngine<'a> {
    pub fn new(
        pool: &'a PgPool,
        junctions: &'a StockJunctions,
        locks: &'a StockLocks,
        upload_root: &'a Path,
    ) -> Self {
        Self {
            pool,
            junctions,
            locks,
            upload_root,
        }
    }
}
