//! Repository behaviour against a live MySQL. Skipped unless `TEST_DATABASE_URL` is set.

use serde_json::{json, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::sync::Arc;
use storefront_api::{
    AppConfig, AppError, GenericRepository, MySqlDatabase, Record, RecordKey, SchemaIntrospector,
    SchemaPolicy,
};

async fn setup(ddl: &[&str]) -> Option<(MySqlPool, GenericRepository)> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let config = AppConfig::from_lookup(|k| (k == "DATABASE_URL").then(|| url.clone())).ok()?;
    let pool = MySqlPoolOptions::new()
        .max_connections(4)
        .connect_with(config.connect_options().ok()?)
        .await
        .ok()?;
    for stmt in ddl {
        sqlx::query(stmt).execute(&pool).await.ok()?;
    }
    let db = Arc::new(MySqlDatabase::new(pool.clone()));
    let schema = Arc::new(SchemaIntrospector::new(
        db.clone(),
        config.catalog.clone(),
        SchemaPolicy::default(),
    ));
    Some((pool, GenericRepository::new(db, schema)))
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn create_is_atomic_and_duplicates_conflict() {
    let Some((pool, repo)) = setup(&[
        "DROP TABLE IF EXISTS it_talla",
        "CREATE TABLE it_talla (id INT AUTO_INCREMENT PRIMARY KEY, talla VARCHAR(20) NOT NULL UNIQUE)",
    ])
    .await
    else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    let key = repo.create("it_talla", &record(json!({"talla": "XL"}))).await.unwrap();
    let RecordKey::Id(id) = &key else {
        panic!("expected a single-column key, got {:?}", key);
    };
    assert!(id.as_u64().unwrap() > 0);
    let row = repo.find("it_talla", &key).await.unwrap().unwrap();
    assert_eq!(row["talla"], "XL");

    let dup = repo.create("it_talla", &record(json!({"talla": "XL"}))).await;
    assert!(matches!(dup, Err(AppError::Conflict(_))), "got {:?}", dup);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM it_talla")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn concurrent_composite_creates_admit_exactly_one() {
    let Some((_pool, repo)) = setup(&[
        "DROP TABLE IF EXISTS it_stock",
        "CREATE TABLE it_stock (producto_id INT NOT NULL, talla_id INT NOT NULL, stock INT NOT NULL, \
         PRIMARY KEY (producto_id, talla_id))",
    ])
    .await
    else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    // Load metadata first so both inserts race on the row, not the cache.
    repo.table("it_stock").await.unwrap();

    let data = record(json!({"producto_id": 1, "talla_id": 2, "stock": 5}));
    let (a, b) = tokio::join!(repo.create("it_stock", &data), repo.create("it_stock", &data));
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AppError::Conflict(_)))));

    let key = RecordKey::Composite(vec![
        ("producto_id".into(), json!(1)),
        ("talla_id".into(), json!(2)),
    ]);
    let row = repo.find("it_stock", &key).await.unwrap().unwrap();
    assert_eq!(row["stock"], 5);
}
