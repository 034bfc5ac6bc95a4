//! Applies the association graph's DDL to PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use stockroom_core::association::{AssociationGraph, GraphError, SchemaSync};

/// Creates every table of a graph inside one transaction, in creation order.
///
/// Statements are `CREATE TABLE IF NOT EXISTS`, so syncing an already
/// provisioned database is a no-op.
pub struct PgSchemaSync<'a> {
    pool: &'a PgPool,
}

impl<'a> PgSchemaSync<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

fn sync_error(e: sqlx::Error) -> GraphError {
    GraphError::Sync(e.to_string())
}

#[async_trait]
impl<'a> SchemaSync for PgSchemaSync<'a> {
    async fn sync(&self, graph: &AssociationGraph) -> Result<(), GraphError> {
        let mut tx = self.pool.begin().await.map_err(sync_error)?;
        for statement in graph.ddl() {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(sync_error)?;
        }
        tx.commit().await.map_err(sync_error)?;

        tracing::debug!(tables = graph.len(), "Schema synchronized");
        Ok(())
    }
}
