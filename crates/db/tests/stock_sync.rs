//! Integration tests for the stock aggregate: create, update and list.
//!
//! Runs the engine against a real database and a temporary upload
//! directory, checking rows, junction links and files on disk.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{bag, count_where, Fixture};
use futures::future::join_all;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use stockroom_core::images::{ImageSlot, UploadedFile};
use stockroom_core::pagination::PageQuery;
use stockroom_core::types::DbId;
use stockroom_db::repositories::StockColorRepo;
use stockroom_db::stock_sync::{
    CreateOutcome, CreateStockRequest, StockSyncError, UpdateStockRequest,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn header(fx: &Fixture) -> Vec<(&'static str, String)> {
    vec![
        ("name", "Tile A".into()),
        ("code", "TA-1".into()),
        ("series", fx.seeded.series.to_string()),
        ("create_id", "u1".into()),
        ("create_name", "Ann".into()),
    ]
}

fn three_files(fx: &Fixture, prefix: &str) -> Vec<UploadedFile> {
    ["stock", "color", "removal"]
        .into_iter()
        .map(|slot| fx.upload("files", &format!("{prefix}-{slot}.png")))
        .collect()
}

/// Create a stock with one variant of the first color and both schemes.
async fn create_one(fx: &Fixture) -> CreateOutcome {
    let [warm, cool] = fx.seeded.schemes;
    let mut fields = header(fx);
    fields.push(("color_0", fx.seeded.colors[0].to_string()));
    fields.push(("colorScheme_0", format!("{warm},{cool}")));
    fields.push(("material", fx.seeded.materials[0].to_string()));

    fx.engine()
        .create(CreateStockRequest {
            fields: bag(&fields),
            files: three_files(fx, "v0"),
        })
        .await
        .unwrap()
}

fn update_form(fx: &Fixture, stock_id: DbId, variants: &str) -> Vec<(&'static str, String)> {
    vec![
        ("id", stock_id.to_string()),
        ("name", "Tile A".into()),
        ("code", "TA-1".into()),
        ("series", fx.seeded.series.to_string()),
        ("modify_id", "u2".into()),
        ("modify_name", "Bob".into()),
        ("variants", variants.to_string()),
    ]
}

fn update_request(
    fields: Vec<(&'static str, String)>,
    files: Vec<UploadedFile>,
) -> UpdateStockRequest {
    UpdateStockRequest {
        fields: bag(&fields),
        files: files
            .into_iter()
            .map(|f| (f.field_name.clone(), f))
            .collect::<HashMap<_, _>>(),
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn test_create_writes_aggregate(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let [red, blue] = fx.seeded.colors;
    let [warm, cool] = fx.seeded.schemes;

    let mut fields = header(&fx);
    fields.extend([
        ("color_0", red.to_string()),
        ("colorScheme_0", format!("{warm},{cool}")),
        ("color_4", blue.to_string()),
        ("colorScheme_4", String::new()),
        ("material", fx.seeded.materials[0].to_string()),
        ("material", fx.seeded.materials[1].to_string()),
        ("design", fx.seeded.design.to_string()),
    ]);
    let mut files = three_files(&fx, "v0");
    files.extend(three_files(&fx, "v4"));

    let outcome = fx
        .engine()
        .create(CreateStockRequest {
            fields: bag(&fields),
            files,
        })
        .await
        .unwrap();

    assert_eq!(outcome.variant_ids.len(), 2);
    assert!(outcome.skipped.is_empty());
    assert!(outcome.message.starts_with("Success inserted stock"));
    assert!(outcome.message.contains("stock_color_color_scheme"));

    let pool = &fx.pool;
    assert_eq!(count_where(pool, "stock_material", "stock_id", outcome.id).await, 2);
    assert_eq!(count_where(pool, "stock_design", "stock_id", outcome.id).await, 1);
    assert_eq!(count_where(pool, "stock_environment", "stock_id", outcome.id).await, 0);
    assert_eq!(count_where(pool, "stock_stock_color", "stock_id", outcome.id).await, 2);

    let variants = StockColorRepo::list_by_stock(pool, outcome.id).await.unwrap();
    let listed: Vec<DbId> = variants.iter().map(|v| v.id).collect();
    assert_eq!(listed, outcome.variant_ids, "ids follow form index order");
    assert_eq!(variants[0].color_name_id, red);
    assert_eq!(variants[0].name, "Red");
    assert_eq!(variants[0].stock_image, "stock/v0-stock.png");
    assert_eq!(variants[0].removal_image_name, "orig-v0-removal.png");
    assert_eq!(variants[1].color_image, "stock/v4-color.png");

    let first = variants[0].id;
    assert_eq!(
        count_where(pool, "stock_color_color_scheme", "stock_color_id", first).await,
        2
    );
    assert_eq!(
        count_where(pool, "stock_color_color_scheme", "stock_color_id", variants[1].id).await,
        0
    );
}

#[sqlx::test(migrations = false)]
async fn test_create_rejects_file_count_mismatch(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let mut fields = header(&fx);
    fields.push(("color_0", fx.seeded.colors[0].to_string()));
    fields.push(("colorScheme_0", String::new()));

    let mut files = three_files(&fx, "v0");
    let extra = files.pop().unwrap();

    let err = fx
        .engine()
        .create(CreateStockRequest {
            fields: bag(&fields),
            files: files.clone(),
        })
        .await
        .unwrap_err();

    assert_matches!(
        err,
        StockSyncError::FileCountMismatch {
            variants: 1,
            expected: 3,
            received: 2
        }
    );
    assert_eq!(stockroom_db::repositories::StockRepo::count(&fx.pool).await.unwrap(), 0);
    for file in &files {
        assert!(!file.stored_path.exists(), "upload should be discarded");
    }
    assert!(extra.stored_path.exists());
}

#[sqlx::test(migrations = false)]
async fn test_create_rejects_invalid_header(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let fields: Vec<_> = header(&fx).into_iter().filter(|(k, _)| *k != "name").collect();

    let err = fx
        .engine()
        .create(CreateStockRequest {
            fields: bag(&fields),
            files: Vec::new(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, StockSyncError::ValidationRejected(_));
    assert!(err.is_client_error());
}

#[sqlx::test(migrations = false)]
async fn test_create_skips_unknown_color(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let mut fields = header(&fx);
    fields.extend([
        ("color_0", fx.seeded.colors[0].to_string()),
        ("colorScheme_0", String::new()),
        ("color_1", "99999".to_string()),
        ("colorScheme_1", fx.seeded.schemes[0].to_string()),
    ]);
    let kept = three_files(&fx, "v0");
    let dropped = three_files(&fx, "v1");
    let files = kept.iter().chain(&dropped).cloned().collect();

    let outcome = fx
        .engine()
        .create(CreateStockRequest {
            fields: bag(&fields),
            files,
        })
        .await
        .unwrap();

    assert_eq!(outcome.variant_ids.len(), 1);
    assert_eq!(outcome.skipped, vec![1]);
    for file in &kept {
        assert!(file.stored_path.exists());
    }
    for file in &dropped {
        assert!(!file.stored_path.exists(), "files of a skipped variant are removed");
    }
}

#[sqlx::test(migrations = false)]
async fn test_create_skips_incomplete_variants(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let [red, blue] = fx.seeded.colors;
    let mut fields = header(&fx);
    fields.extend([
        ("color_0", red.to_string()),
        ("colorScheme_1", fx.seeded.schemes[0].to_string()),
        ("color_2", blue.to_string()),
        ("colorScheme_2", fx.seeded.schemes[1].to_string()),
    ]);
    let no_scheme = three_files(&fx, "v0");
    let no_color = three_files(&fx, "v1");
    let kept = three_files(&fx, "v2");
    let files = no_scheme.iter().chain(&no_color).chain(&kept).cloned().collect();

    let outcome = fx
        .engine()
        .create(CreateStockRequest {
            fields: bag(&fields),
            files,
        })
        .await
        .unwrap();

    assert_eq!(outcome.skipped, vec![0, 1]);
    assert_eq!(outcome.variant_ids.len(), 1);

    let variants = StockColorRepo::list_by_stock(&fx.pool, outcome.id).await.unwrap();
    assert_eq!(variants[0].color_name_id, blue);
    assert_eq!(variants[0].stock_image, "stock/v2-stock.png");
    for file in no_scheme.iter().chain(&no_color) {
        assert!(!file.stored_path.exists());
    }
    assert!(kept.iter().all(|file| file.stored_path.exists()));
}

#[sqlx::test(migrations = false)]
async fn test_create_color_without_scheme_still_counts_files(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let mut fields = header(&fx);
    fields.push(("color_0", fx.seeded.colors[0].to_string()));

    let outcome = fx
        .engine()
        .create(CreateStockRequest {
            fields: bag(&fields),
            files: three_files(&fx, "v0"),
        })
        .await
        .unwrap();

    assert!(outcome.variant_ids.is_empty());
    assert_eq!(outcome.skipped, vec![0]);
    assert_eq!(count_where(&fx.pool, "stock_color", "stock_id", outcome.id).await, 0);
}

#[sqlx::test(migrations = false)]
async fn test_create_without_variants(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let outcome = fx
        .engine()
        .create(CreateStockRequest {
            fields: bag(&header(&fx)),
            files: Vec::new(),
        })
        .await
        .unwrap();

    assert!(outcome.variant_ids.is_empty());
    assert_eq!(outcome.message, "Success inserted stock");
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn test_update_with_no_variants_removes_them(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let created = create_one(&fx).await;
    let variant = created.variant_ids[0];
    let before = StockColorRepo::list_by_stock(&fx.pool, created.id).await.unwrap();
    let paths: Vec<_> = before[0]
        .images()
        .into_refs()
        .into_iter()
        .map(|image| fx.on_disk(&image.path))
        .collect();
    assert!(paths.iter().all(|p| p.exists()));

    let outcome = fx
        .engine()
        .update(update_request(update_form(&fx, created.id, "[]"), Vec::new()))
        .await
        .unwrap();

    assert!(outcome.preserved.is_empty());
    assert_eq!(outcome.removed, vec![variant]);
    assert!(outcome.message.contains("cleanup"));

    let pool = &fx.pool;
    assert_eq!(count_where(pool, "stock_color", "stock_id", created.id).await, 0);
    assert_eq!(count_where(pool, "stock_stock_color", "stock_id", created.id).await, 0);
    assert_eq!(
        count_where(pool, "stock_color_color_scheme", "stock_color_id", variant).await,
        0
    );
    assert_eq!(count_where(pool, "stock_material", "stock_id", created.id).await, 0);
    assert!(paths.iter().all(|p| !p.exists()), "variant images are deleted");
}

#[sqlx::test(migrations = false)]
async fn test_update_replaces_one_image(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let created = create_one(&fx).await;
    let variant = created.variant_ids[0];
    let before = StockColorRepo::list_by_stock(&fx.pool, created.id).await.unwrap();
    let old_color = fx.on_disk(&before[0].color_image);
    let old_stock = fx.on_disk(&before[0].stock_image);

    let field = stockroom_core::images::update_field_name(variant, ImageSlot::Color);
    let replacement = fx.upload(&field, "new-color.png");
    let variants = format!(
        r#"[{{"id":{variant},"color":{},"colorScheme":[{}]}}]"#,
        fx.seeded.colors[1], fx.seeded.schemes[1]
    );

    let outcome = fx
        .engine()
        .update(update_request(update_form(&fx, created.id, &variants), vec![replacement]))
        .await
        .unwrap();
    assert_eq!(outcome.preserved, vec![variant]);
    assert!(outcome.removed.is_empty());

    let after = StockColorRepo::list_by_stock(&fx.pool, created.id).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].color_image, "stock/new-color.png");
    assert_eq!(after[0].stock_image, before[0].stock_image);
    assert_eq!(after[0].color_name_id, fx.seeded.colors[1]);
    assert_eq!(after[0].name, "Blue");
    assert_eq!(after[0].modify_id.as_deref(), Some("u2"));

    assert!(!old_color.exists(), "replaced image is deleted");
    assert!(old_stock.exists(), "untouched image is kept");
    assert_eq!(
        count_where(&fx.pool, "stock_color_color_scheme", "stock_color_id", variant).await,
        1
    );
}

#[sqlx::test(migrations = false)]
async fn test_update_adds_new_variant(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let created = create_one(&fx).await;
    let existing = created.variant_ids[0];

    let files = ImageSlot::ALL
        .into_iter()
        .map(|slot| {
            let field = stockroom_core::images::update_field_name(-1, slot);
            fx.upload(&field, &format!("new-{slot}.png"))
        })
        .collect();
    let variants = format!(
        r#"[{{"id":{existing},"color":{red}}},{{"id":-1,"color":{blue}}}]"#,
        red = fx.seeded.colors[0],
        blue = fx.seeded.colors[1],
    );

    let outcome = fx
        .engine()
        .update(update_request(update_form(&fx, created.id, &variants), files))
        .await
        .unwrap();

    assert_eq!(outcome.preserved.len(), 2);
    assert_eq!(outcome.preserved[0], existing);
    assert_eq!(count_where(&fx.pool, "stock_color", "stock_id", created.id).await, 2);
    assert_eq!(
        count_where(&fx.pool, "stock_stock_color", "stock_id", created.id).await,
        2
    );
    // No schemes submitted for the kept variant.
    assert_eq!(
        count_where(&fx.pool, "stock_color_color_scheme", "stock_color_id", existing).await,
        0
    );
}

#[sqlx::test(migrations = false)]
async fn test_update_is_idempotent(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let created = create_one(&fx).await;
    let variant = created.variant_ids[0];
    let variants = format!(
        r#"[{{"id":{variant},"color":{},"colorScheme":[{}]}}]"#,
        fx.seeded.colors[0], fx.seeded.schemes[0]
    );
    let mut form = update_form(&fx, created.id, &variants);
    form.push(("material", fx.seeded.materials[1].to_string()));

    for _ in 0..2 {
        fx.engine()
            .update(update_request(form.clone(), Vec::new()))
            .await
            .unwrap();
    }

    let pool = &fx.pool;
    assert_eq!(count_where(pool, "stock_color", "stock_id", created.id).await, 1);
    assert_eq!(count_where(pool, "stock_stock_color", "stock_id", created.id).await, 1);
    assert_eq!(
        count_where(pool, "stock_color_color_scheme", "stock_color_id", variant).await,
        1
    );
    let materials: Vec<DbId> =
        sqlx::query_scalar("SELECT material_id FROM stock_material WHERE stock_id = $1")
            .bind(created.id)
            .fetch_all(pool)
            .await
            .unwrap();
    assert_eq!(materials, vec![fx.seeded.materials[1]]);
}

#[sqlx::test(migrations = false)]
async fn test_update_new_variant_missing_image(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let created = create_one(&fx).await;
    let field = stockroom_core::images::update_field_name(-1, ImageSlot::Stock);
    let only_one = fx.upload(&field, "lonely.png");
    let variants = format!(r#"[{{"id":-1,"color":{}}}]"#, fx.seeded.colors[0]);

    let err = fx
        .engine()
        .update(update_request(
            update_form(&fx, created.id, &variants),
            vec![only_one.clone()],
        ))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        StockSyncError::MissingImage {
            variant_id: -1,
            slot: ImageSlot::Color
        }
    );
    assert!(!only_one.stored_path.exists());
    // Nothing was written: the original variant is still there.
    assert_eq!(count_where(&fx.pool, "stock_color", "stock_id", created.id).await, 1);
}

#[sqlx::test(migrations = false)]
async fn test_update_rejects_unknown_color(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let created = create_one(&fx).await;
    let variants = format!(r#"[{{"id":{},"color":99999}}]"#, created.variant_ids[0]);

    let err = fx
        .engine()
        .update(update_request(update_form(&fx, created.id, &variants), Vec::new()))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        StockSyncError::InvalidColorReference {
            color_name_id: 99999
        }
    );
}

#[sqlx::test(migrations = false)]
async fn test_update_rejects_foreign_variant(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let first = create_one(&fx).await;
    let second = create_one(&fx).await;
    let variants = format!(
        r#"[{{"id":{},"color":{}}}]"#,
        first.variant_ids[0], fx.seeded.colors[0]
    );

    let err = fx
        .engine()
        .update(update_request(update_form(&fx, second.id, &variants), Vec::new()))
        .await
        .unwrap_err();
    assert_matches!(err, StockSyncError::InvalidShape(_));
}

#[sqlx::test(migrations = false)]
async fn test_update_unknown_stock(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let err = fx
        .engine()
        .update(update_request(update_form(&fx, 99999, "[]"), Vec::new()))
        .await
        .unwrap_err();
    assert_matches!(err, StockSyncError::StockNotFound(99999));
}

#[sqlx::test(migrations = false)]
async fn test_concurrent_updates_are_serialized(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let created = create_one(&fx).await;
    let variant = created.variant_ids[0];
    let form = |scheme: DbId| {
        let variants = format!(
            r#"[{{"id":{variant},"color":{},"colorScheme":[{scheme}]}}]"#,
            fx.seeded.colors[0]
        );
        update_request(update_form(&fx, created.id, &variants), Vec::new())
    };

    let engine = fx.engine();
    let (a, b) = tokio::join!(
        engine.update(form(fx.seeded.schemes[0])),
        engine.update(form(fx.seeded.schemes[1])),
    );
    a.unwrap();
    b.unwrap();

    // Whichever ran last wins; the links are never a mix of both.
    assert_eq!(
        count_where(&fx.pool, "stock_color_color_scheme", "stock_color_id", variant).await,
        1
    );
}

#[sqlx::test(migrations = false)]
async fn test_updates_as_many_as_connections(
    pool_opts: PgPoolOptions,
    connect_opts: PgConnectOptions,
) {
    const CONNECTIONS: u32 = 4;
    let pool = pool_opts
        .max_connections(CONNECTIONS)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(connect_opts)
        .await
        .unwrap();
    let fx = Fixture::new(pool).await;

    let mut stocks = Vec::new();
    for _ in 0..CONNECTIONS {
        stocks.push(create_one(&fx).await.id);
    }

    let engine = fx.engine();
    let results = join_all(
        stocks
            .iter()
            .map(|id| engine.update(update_request(update_form(&fx, *id, "[]"), Vec::new()))),
    )
    .await;
    for (stock_id, result) in stocks.iter().zip(results) {
        let outcome = result.unwrap();
        assert_eq!(outcome.id, *stock_id);
        assert_eq!(outcome.removed.len(), 1);
    }

    // Waiters on one stock hold no connection while queued.
    let target = stocks[0];
    let results = join_all(
        (0..CONNECTIONS + 2)
            .map(|_| engine.update(update_request(update_form(&fx, target, "[]"), Vec::new()))),
    )
    .await;
    assert!(results.iter().all(Result::is_ok));
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn test_list_empty_table(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let page = fx
        .engine()
        .list(
            &PageQuery {
                page: Some(3),
                page_size: Some(5),
            },
            10,
        )
        .await
        .unwrap();

    assert!(page.list.is_empty());
    assert_eq!(page.window.total, 0);
    assert_eq!(page.window.total_pages, 0);
    assert_eq!(page.window.begin, 0);
}

#[sqlx::test(migrations = false)]
async fn test_list_resolves_relations(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    for _ in 0..3 {
        create_one(&fx).await;
    }

    let page = fx
        .engine()
        .list(
            &PageQuery {
                page: Some(2),
                page_size: Some(2),
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(page.window.total, 3);
    assert_eq!(page.window.total_pages, 2);
    assert_eq!(page.list.len(), 1);

    let detail = &page.list[0];
    assert_eq!(detail.series.as_ref().map(|s| s.id), Some(fx.seeded.series));
    assert!(detail.supplier.is_none());
    assert_eq!(detail.material.len(), 1);
    assert_eq!(detail.material[0].name, "Oak");
    assert_eq!(detail.colors.len(), 1);
    assert_eq!(detail.colors[0].color_schemes.len(), 2);
    assert_eq!(detail.color_schemes.len(), 2);

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["totalPages"], 2);
    assert_eq!(json["list"][0]["code"], "TA-1");
}

#[sqlx::test(migrations = false)]
async fn test_get_single_stock(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let created = create_one(&fx).await;

    let detail = fx.engine().get(created.id).await.unwrap().unwrap();
    assert_eq!(detail.stock.id, created.id);
    assert!(fx.engine().get(99999).await.unwrap().is_none());
}
