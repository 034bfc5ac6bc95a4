use std::sync::Arc;

use stockroom_core::association::AssociationGraph;
use stockroom_db::stock_sync::{StockJunctions, StockLocks, StockSyncEngine};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything but the pool sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: stockroom_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Association graph built once at startup.
    pub graph: Arc<AssociationGraph>,
    /// Junction tables of the stock aggregate, resolved from `graph`.
    pub junctions: Arc<StockJunctions>,
    /// Serializes concurrent updates of one stock.
    pub stock_locks: Arc<StockLocks>,
}

impl AppState {
    /// Resolve the stock junctions from `graph` and assemble the state.
    pub fn new(
        pool: stockroom_db::DbPool,
        config: ServerConfig,
        graph: AssociationGraph,
    ) -> Result<Self, stockroom_core::association::GraphError> {
        let junctions = StockJunctions::resolve(&graph)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
            graph: Arc::new(graph),
            junctions: Arc::new(junctions),
            stock_locks: Arc::new(StockLocks::new()),
        })
    }

    pub fn stock_engine(&self) -> StockSyncEngine<'_> {
        StockSyncEngine::new(
            &self.pool,
            &self.junctions,
            &self.stock_locks,
            &self.config.upload_dir,
        )
    }
}
