//! Repository for many-to-many junction tables.
//!
//! Junctions carry no surrogate id; a row is identified by its
//! `(owner_key, target_key)` pair, which is unique. Table and column names
//! come from a [`JunctionRef`] resolved in the association graph, so one
//! repository serves every junction.

use sqlx::PgPool;
use stockroom_core::association::{quote_ident, JunctionRef};
use stockroom_core::types::DbId;

use crate::models::audit::Author;

/// Quoted `(table, owner_key, target_key)` for query building.
fn idents(junction: &JunctionRef) -> (String, String, String) {
    (
        quote_ident(junction.table),
        quote_ident(junction.owner_key),
        quote_ident(junction.target_key),
    )
}

/// Provides bulk association operations over any junction table.
pub struct JunctionRepo;

impl JunctionRepo {
    /// Link `owner` to every id in `targets`. Pairs that already exist are
    /// left untouched.
    ///
    /// Returns the number of rows inserted.
    pub async fn insert_many(
        pool: &PgPool,
        junction: &JunctionRef,
        owner: DbId,
        targets: &[DbId],
        author: &Author,
    ) -> Result<u64, sqlx::Error> {
        Self::write_many(pool, junction, owner, targets, author, "DO NOTHING").await
    }

    /// Link `owner` to every id in `targets`, stamping the modifier on pairs
    /// that already exist.
    ///
    /// Returns the number of rows inserted or touched.
    pub async fn upsert_many(
        pool: &PgPool,
        junction: &JunctionRef,
        owner: DbId,
        targets: &[DbId],
        author: &Author,
    ) -> Result<u64, sqlx::Error> {
        Self::write_many(
            pool,
            junction,
            owner,
            targets,
            author,
            "DO UPDATE SET \
                modify_id = EXCLUDED.modify_id, \
                modify_name = EXCLUDED.modify_name, \
                modify_time = now()",
        )
        .await
    }

    async fn write_many(
        pool: &PgPool,
        junction: &JunctionRef,
        owner: DbId,
        targets: &[DbId],
        author: &Author,
        on_conflict: &str,
    ) -> Result<u64, sqlx::Error> {
        if targets.is_empty() {
            return Ok(0);
        }

        let (table, owner_key, target_key) = idents(junction);
        let query = format!(
            "INSERT INTO {table} \
                ({owner_key}, {target_key}, create_id, create_name, modify_id, modify_name) \
             SELECT $1::bigint, target, $3::text, $4::text, $5::text, $6::text \
             FROM (SELECT DISTINCT UNNEST($2::bigint[]) AS target) AS submitted \
             ON CONFLICT ({owner_key}, {target_key}) {on_conflict}"
        );
        let result = sqlx::query(&query)
            .bind(owner)
            .bind(targets)
            .bind(&author.create_id)
            .bind(&author.create_name)
            .bind(author.modify_id())
            .bind(author.modify_name())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove the links of `owner` whose target is not in `keep`. An empty
    /// `keep` removes every link of `owner`.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_unlisted(
        pool: &PgPool,
        junction: &JunctionRef,
        owner: DbId,
        keep: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let (table, owner_key, target_key) = idents(junction);
        let query = format!(
            "DELETE FROM {table} WHERE {owner_key} = $1 AND NOT ({target_key} = ANY($2))"
        );
        let result = sqlx::query(&query)
            .bind(owner)
            .bind(keep)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove every link of the given owners.
    pub async fn delete_by_owners(
        pool: &PgPool,
        junction: &JunctionRef,
        owners: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if owners.is_empty() {
            return Ok(0);
        }
        let (table, owner_key, _) = idents(junction);
        let query = format!("DELETE FROM {table} WHERE {owner_key} = ANY($1)");
        let result = sqlx::query(&query).bind(owners).execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Remove every link pointing at the given targets.
    pub async fn delete_by_targets(
        pool: &PgPool,
        junction: &JunctionRef,
        targets: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if targets.is_empty() {
            return Ok(0);
        }
        let (table, _, target_key) = idents(junction);
        let query = format!("DELETE FROM {table} WHERE {target_key} = ANY($1)");
        let result = sqlx::query(&query).bind(targets).execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Target ids linked to `owner`, ascending.
    pub async fn targets(
        pool: &PgPool,
        junction: &JunctionRef,
        owner: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let (table, owner_key, target_key) = idents(junction);
        let query = format!(
            "SELECT {target_key} FROM {table} WHERE {owner_key} = $1 ORDER BY {target_key}"
        );
        sqlx::query_scalar(&query).bind(owner).fetch_all(pool).await
    }
}
