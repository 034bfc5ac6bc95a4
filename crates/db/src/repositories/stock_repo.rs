//! Repository for the `stock` table.

use sqlx::PgPool;
use stockroom_core::types::DbId;

use crate::models::stock::{Stock, StockHeaderInput};

/// Column list for `stock` queries.
const COLUMNS: &str = "\
    id, code, name, description, enable, series_id, supplier_id, main_image, \
    block, absorption, create_id, create_name, modify_id, modify_name, \
    create_time, modify_time";

/// Provides CRUD operations for stock headers.
pub struct StockRepo;

impl StockRepo {
    /// Insert a stock header, returning the created row.
    pub async fn create(pool: &PgPool, input: &StockHeaderInput) -> Result<Stock, sqlx::Error> {
        let query = format!(
            "INSERT INTO stock \
                (code, name, description, enable, series_id, supplier_id, main_image, \
                 block, absorption, create_id, create_name, modify_id, modify_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Stock>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.enable)
            .bind(input.series_id)
            .bind(input.supplier_id)
            .bind(&input.main_image)
            .bind(input.block.map(|g| g.to_string()))
            .bind(input.absorption.map(|g| g.to_string()))
            .bind(&input.author.create_id)
            .bind(&input.author.create_name)
            .bind(input.author.modify_id())
            .bind(input.author.modify_name())
            .fetch_one(pool)
            .await
    }

    /// Overwrite the header fields of a stock. Creator columns are kept.
    ///
    /// Returns `None` if no stock with the given ID exists.
    pub async fn update_header(
        pool: &PgPool,
        id: DbId,
        input: &StockHeaderInput,
    ) -> Result<Option<Stock>, sqlx::Error> {
        let query = format!(
            "UPDATE stock SET \
                code = $2, name = $3, description = $4, enable = $5, series_id = $6, \
                supplier_id = $7, main_image = $8, block = $9, absorption = $10, \
                modify_id = $11, modify_name = $12, modify_time = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Stock>(&query)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.enable)
            .bind(input.series_id)
            .bind(input.supplier_id)
            .bind(&input.main_image)
            .bind(input.block.map(|g| g.to_string()))
            .bind(input.absorption.map(|g| g.to_string()))
            .bind(input.author.modify_id())
            .bind(input.author.modify_name())
            .fetch_optional(pool)
            .await
    }

    /// Find a stock by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Stock>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stock WHERE id = $1");
        sqlx::query_as::<_, Stock>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM stock")
            .fetch_one(pool)
            .await
    }

    /// One page of stock headers, oldest first.
    pub async fn list_page(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Stock>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stock ORDER BY id LIMIT $1 OFFSET $2");
        sqlx::query_as::<_, Stock>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
