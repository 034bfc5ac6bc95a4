//! Repository for the simple reference tables (series, supplier, tags,
//! colors). The table is picked by [`ReferenceEntity`].

use sqlx::PgPool;
use stockroom_core::association::quote_ident;
use stockroom_core::types::DbId;

use crate::models::reference::{CreateReference, ReferenceEntity, ReferenceRow, UpdateReference};

/// Column list shared by every reference table.
const COLUMNS: &str = "id, code, name, description, enable, comment";

/// Provides CRUD operations for reference rows.
pub struct ReferenceRepo;

impl ReferenceRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        entity: ReferenceEntity,
        id: DbId,
    ) -> Result<Option<ReferenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {} WHERE id = $1",
            quote_ident(entity.table())
        );
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Rows whose id is in `ids`, ordered by id. Unknown ids are skipped.
    pub async fn find_by_ids(
        pool: &PgPool,
        entity: ReferenceEntity,
        ids: &[DbId],
    ) -> Result<Vec<ReferenceRow>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM {} WHERE id = ANY($1) ORDER BY id",
            quote_ident(entity.table())
        );
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &PgPool,
        entity: ReferenceEntity,
        input: &CreateReference,
    ) -> Result<ReferenceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} \
                (code, name, description, enable, comment, \
                 create_id, create_name, modify_id, modify_name) \
             VALUES ($1, $2, $3, COALESCE($4, true), $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}",
            quote_ident(entity.table())
        );
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.enable)
            .bind(&input.comment)
            .bind(&input.author.create_id)
            .bind(&input.author.create_name)
            .bind(input.author.modify_id())
            .bind(input.author.modify_name())
            .fetch_one(pool)
            .await
    }

    /// Update a reference row. Only non-`None` fields are applied.
    ///
    /// Returns `None` if no row with the given ID exists.
    pub async fn update(
        pool: &PgPool,
        entity: ReferenceEntity,
        id: DbId,
        input: &UpdateReference,
    ) -> Result<Option<ReferenceRow>, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET \
                code = COALESCE($2, code), \
                name = COALESCE($3, name), \
                description = COALESCE($4, description), \
                enable = COALESCE($5, enable), \
                comment = COALESCE($6, comment), \
                modify_id = $7, modify_name = $8, modify_time = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}",
            quote_ident(entity.table())
        );
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.enable)
            .bind(&input.comment)
            .bind(&input.modify_id)
            .bind(&input.modify_name)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &PgPool, entity: ReferenceEntity) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", quote_ident(entity.table()));
        sqlx::query_scalar(&query).fetch_one(pool).await
    }

    pub async fn list_page(
        pool: &PgPool,
        entity: ReferenceEntity,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReferenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            quote_ident(entity.table())
        );
        sqlx::query_as::<_, ReferenceRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
