//! Shared fixtures for the db integration tests.
//!
//! Each `#[sqlx::test]` gets a fresh database; the schema comes from the
//! association graph, not from migration files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sqlx::PgPool;
use stockroom_core::association::AssociationGraph;
use stockroom_core::images::UploadedFile;
use stockroom_core::types::DbId;
use stockroom_core::variant_form::FieldBag;
use stockroom_db::models::audit::Author;
use stockroom_db::models::reference::{CreateReference, ReferenceEntity};
use stockroom_db::repositories::ReferenceRepo;
use stockroom_db::stock_sync::{StockJunctions, StockLocks, StockSyncEngine};
use tempfile::TempDir;

/// Ids of the reference rows every scenario starts from.
pub struct Seeded {
    pub series: DbId,
    pub supplier: DbId,
    pub colors: [DbId; 2],
    pub schemes: [DbId; 2],
    pub materials: [DbId; 2],
    pub design: DbId,
    pub environment: DbId,
}

pub struct Fixture {
    pub pool: PgPool,
    pub graph: AssociationGraph,
    pub junctions: StockJunctions,
    pub locks: StockLocks,
    pub uploads: TempDir,
    pub seeded: Seeded,
}

impl Fixture {
    pub async fn new(pool: PgPool) -> Self {
        let graph = stockroom_db::sync_catalog_schema(&pool).await.unwrap();
        let junctions = StockJunctions::resolve(&graph).unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let seeded = seed(&pool).await;
        Self {
            pool,
            graph,
            junctions,
            locks: StockLocks::new(),
            uploads,
            seeded,
        }
    }

    pub fn engine(&self) -> StockSyncEngine<'_> {
        StockSyncEngine::new(&self.pool, &self.junctions, &self.locks, self.uploads.path())
    }

    pub fn root(&self) -> &Path {
        self.uploads.path()
    }

    /// Write a small file under `<root>/stock/` as the upload decoder would.
    pub fn upload(&self, field_name: &str, file_name: &str) -> UploadedFile {
        let dir = self.root().join("stock");
        std::fs::create_dir_all(&dir).unwrap();
        let stored_path = dir.join(file_name);
        std::fs::write(&stored_path, b"img").unwrap();
        UploadedFile {
            field_name: field_name.to_string(),
            original_name: format!("orig-{file_name}"),
            stored_path,
        }
    }

    /// On-disk location of a servable path.
    pub fn on_disk(&self, servable: &str) -> PathBuf {
        self.root().join(servable)
    }
}

pub fn author() -> Author {
    Author {
        create_id: "u1".into(),
        create_name: "Ann".into(),
        modify_id: None,
        modify_name: None,
    }
}

pub fn reference(name: &str, code: Option<&str>) -> CreateReference {
    CreateReference {
        name: name.to_string(),
        code: code.map(str::to_string),
        description: None,
        enable: None,
        comment: None,
        author: author(),
    }
}

async fn seed_one(pool: &PgPool, entity: ReferenceEntity, name: &str) -> DbId {
    let code = entity.requires_code().then_some(name);
    ReferenceRepo::create(pool, entity, &reference(name, code))
        .await
        .unwrap()
        .id
}

pub async fn seed(pool: &PgPool) -> Seeded {
    Seeded {
        series: seed_one(pool, ReferenceEntity::Series, "S1").await,
        supplier: seed_one(pool, ReferenceEntity::Supplier, "SUP1").await,
        colors: [
            seed_one(pool, ReferenceEntity::ColorName, "Red").await,
            seed_one(pool, ReferenceEntity::ColorName, "Blue").await,
        ],
        schemes: [
            seed_one(pool, ReferenceEntity::ColorScheme, "Warm").await,
            seed_one(pool, ReferenceEntity::ColorScheme, "Cool").await,
        ],
        materials: [
            seed_one(pool, ReferenceEntity::Material, "Oak").await,
            seed_one(pool, ReferenceEntity::Material, "Pine").await,
        ],
        design: seed_one(pool, ReferenceEntity::Design, "Plain").await,
        environment: seed_one(pool, ReferenceEntity::Environment, "Indoor").await,
    }
}

pub fn bag(pairs: &[(&str, String)]) -> FieldBag {
    let mut bag = FieldBag::new();
    for (k, v) in pairs {
        bag.entry(k.to_string()).or_default().push(v.clone());
    }
    bag
}

/// Count rows of `table` matching `column = value`.
pub async fn count_where(pool: &PgPool, table: &str, column: &str, value: DbId) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE {column} = $1"))
        .bind(value)
        .fetch_one(pool)
        .await
        .unwrap()
}
