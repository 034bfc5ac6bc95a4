use sqlx::postgres::PgPoolOptions;
use stockroom_core::association::{AssociationGraph, AssociationGraphBuilder, GraphError};
use stockroom_core::schema::catalog::catalog_schema;

pub mod models;
pub mod repositories;
pub mod schema_sync;
pub mod stock_sync;

pub use schema_sync::PgSchemaSync;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Wire the catalog's association graph and create any missing tables.
///
/// Runs once at startup; the returned graph is immutable.
pub async fn sync_catalog_schema(pool: &DbPool) -> Result<AssociationGraph, GraphError> {
    let schema = catalog_schema();
    AssociationGraphBuilder::new(&schema)
        .build_and_sync(&PgSchemaSync::new(pool))
        .await
}
