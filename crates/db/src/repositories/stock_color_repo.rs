//! Repository for the `stock_color` table and color-name lookups.

use sqlx::PgPool;
use stockroom_core::images::ImageSlot;
use stockroom_core::types::DbId;

use crate::models::audit::Author;
use crate::models::stock_color::{NewStockColor, StockColor, StockColorUpdate};

/// Column list for `stock_color` queries.
const COLUMNS: &str = "\
    id, stock_id, color_name_id, name, \
    stock_image, stock_image_name, color_image, color_image_name, \
    removal_image, removal_image_name, \
    create_id, create_name, modify_id, modify_name, create_time, modify_time";

/// Provides CRUD operations for stock color variants.
pub struct StockColorRepo;

impl StockColorRepo {
    /// Display name of a color, or `None` when the color does not exist.
    pub async fn color_name(
        pool: &PgPool,
        color_name_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT name FROM color_name WHERE id = $1")
            .bind(color_name_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        input: &NewStockColor,
        author: &Author,
    ) -> Result<StockColor, sqlx::Error> {
        let query = format!(
            "INSERT INTO stock_color \
                (stock_id, color_name_id, name, \
                 stock_image, stock_image_name, color_image, color_image_name, \
                 removal_image, removal_image_name, \
                 create_id, create_name, modify_id, modify_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        let images = &input.images;
        sqlx::query_as::<_, StockColor>(&query)
            .bind(input.stock_id)
            .bind(input.color_name_id)
            .bind(&input.name)
            .bind(&images.stock.path)
            .bind(&images.stock.original_name)
            .bind(&images.color.path)
            .bind(&images.color.original_name)
            .bind(&images.removal.path)
            .bind(&images.removal.original_name)
            .bind(&author.create_id)
            .bind(&author.create_name)
            .bind(author.modify_id())
            .bind(author.modify_name())
            .fetch_one(pool)
            .await
    }

    /// Update a variant of `stock_id`. Image slots absent from the input keep
    /// their stored values.
    ///
    /// Returns `None` if the variant does not exist or belongs to another stock.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        stock_id: DbId,
        input: &StockColorUpdate,
        author: &Author,
    ) -> Result<Option<StockColor>, sqlx::Error> {
        let query = format!(
            "UPDATE stock_color SET \
                color_name_id = $3, name = $4, \
                stock_image = COALESCE($5, stock_image), \
                stock_image_name = COALESCE($6, stock_image_name), \
                color_image = COALESCE($7, color_image), \
                color_image_name = COALESCE($8, color_image_name), \
                removal_image = COALESCE($9, removal_image), \
                removal_image_name = COALESCE($10, removal_image_name), \
                modify_id = $11, modify_name = $12, modify_time = now() \
             WHERE id = $1 AND stock_id = $2 \
             RETURNING {COLUMNS}"
        );
        let path = |slot| input.image(slot).map(|i| i.path.as_str());
        let original = |slot| input.image(slot).map(|i| i.original_name.as_str());
        sqlx::query_as::<_, StockColor>(&query)
            .bind(id)
            .bind(stock_id)
            .bind(input.color_name_id)
            .bind(&input.name)
            .bind(path(ImageSlot::Stock))
            .bind(original(ImageSlot::Stock))
            .bind(path(ImageSlot::Color))
            .bind(original(ImageSlot::Color))
            .bind(path(ImageSlot::Removal))
            .bind(original(ImageSlot::Removal))
            .bind(author.modify_id())
            .bind(author.modify_name())
            .fetch_optional(pool)
            .await
    }

    /// All variants of a stock, in insertion order.
    pub async fn list_by_stock(
        pool: &PgPool,
        stock_id: DbId,
    ) -> Result<Vec<StockColor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stock_color WHERE stock_id = $1 ORDER BY id");
        sqlx::query_as::<_, StockColor>(&query)
            .bind(stock_id)
            .fetch_all(pool)
            .await
    }

    /// Variants of a stock whose ids are not in `preserve`.
    pub async fn list_orphans(
        pool: &PgPool,
        stock_id: DbId,
        preserve: &[DbId],
    ) -> Result<Vec<StockColor>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stock_color \
             WHERE stock_id = $1 AND NOT (id = ANY($2)) \
             ORDER BY id"
        );
        sqlx::query_as::<_, StockColor>(&query)
            .bind(stock_id)
            .bind(preserve)
            .fetch_all(pool)
            .await
    }

    /// Delete variants by id. Returns the number of rows removed.
    pub async fn delete_many(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM stock_color WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
