use sqlx::PgPool;

/// Full bootstrap: wire the graph, create the tables, check the result.
#[sqlx::test(migrations = false)]
async fn test_full_bootstrap(pool: PgPool) {
    stockroom_db::health_check(&pool).await.unwrap();
    let graph = stockroom_db::sync_catalog_schema(&pool).await.unwrap();

    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name FROM information_schema.tables
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    let tables: Vec<String> = tables.into_iter().map(|(t,)| t).collect();

    assert_eq!(tables.len(), graph.len());
    for table in ["user", "stock", "stock_color", "stock_color_color_scheme"] {
        assert!(tables.iter().any(|t| t == table), "missing table {table}");
    }
}

/// A second sync over existing tables is a no-op.
#[sqlx::test(migrations = false)]
async fn test_sync_is_repeatable(pool: PgPool) {
    stockroom_db::sync_catalog_schema(&pool).await.unwrap();
    stockroom_db::sync_catalog_schema(&pool).await.unwrap();
}

/// Junction tables carry no surrogate key.
#[sqlx::test(migrations = false)]
async fn test_junctions_have_no_id(pool: PgPool) {
    stockroom_db::sync_catalog_schema(&pool).await.unwrap();

    for table in ["stock_material", "stock_stock_color", "stock_color_color_scheme"] {
        let id_columns: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1 AND column_name = 'id'",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(id_columns, 0, "{table} should not have an id column");
    }
}

/// The employee foreign key is placed once, nullable, and set null on delete.
#[sqlx::test(migrations = false)]
async fn test_user_delete_nulls_employee(pool: PgPool) {
    stockroom_db::sync_catalog_schema(&pool).await.unwrap();

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO \"user\" (name, account, password, create_id, create_name)
         VALUES ('ann', 'ann', 'x', 'u1', 'Ann') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let employee_id: i64 = sqlx::query_scalar(
        "INSERT INTO employee
            (name, id_code, phone_number, email, password, user_id, create_id, create_name)
         VALUES ('Ann', 'A123456789', '0900000000', 'a@b.c', 'x', $1, 'u1', 'Ann')
         RETURNING id",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM \"user\" WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let linked: Option<i64> = sqlx::query_scalar("SELECT user_id FROM employee WHERE id = $1")
        .bind(employee_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(linked, None);
}
