use super::*;
use crate::ErrorKind;
use crate::embeddings::Embedding;
use std::collections::HashSet;
use tempfile::TempDir;

async fn create_test_store() -> (TempDir, SqliteStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = SqliteStore::open(temp_dir.path().join("knowledge.db"), 3)
        .await
        .expect("Failed to open store");
    (temp_dir, store)
}

fn new_embedding(resource_id: &str, chunk_index: usize, values: [f32; 3]) -> NewEmbedding {
    NewEmbedding {
        resource_id: resource_id.to_string(),
        chunk_index,
        content: format!("chunk {}", chunk_index),
        embedding: Embedding::try_new(values.to_vec(), 3).expect("valid embedding"),
    }
}

#[tokio::test]
async fn schema_migration() {
    let (_temp_dir, store) = create_test_store().await;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'",
    )
    .fetch_all(store.pool())
    .await
    .expect("Failed to list tables");

    let expected: HashSet<&'static str> = ["resources", "embeddings", "store_metadata"]
        .into_iter()
        .collect();
    let actual: HashSet<&str> = tables.iter().map(|t| t.as_str()).collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn store_rejects_blank_resource() {
    let (_temp_dir, store) = create_test_store().await;
    let err = store.create("\t").await.expect_err("blank content");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(store.list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn store_checks_dimensions() {
    let (_temp_dir, store) = create_test_store().await;
    assert_eq!(store.dimension(), 3);

    let err = store
        .search(&[1.0, 0.0], 0.1, 10)
        .await
        .expect_err("query too short");
    assert_eq!(err.kind(), ErrorKind::Storage);

    let resource = store.create("x").await.expect("create");
    let bad = NewEmbedding {
        resource_id: resource.id.clone(),
        chunk_index: 0,
        content: "x".to_string(),
        embedding: Embedding::try_new(vec![1.0, 0.0], 2).expect("valid embedding"),
    };
    let err = store.insert_many(vec![bad]).await.expect_err("wrong dimension");
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[tokio::test]
async fn clear_all_removes_everything() {
    let (_temp_dir, store) = create_test_store().await;
    for _ in 0..3 {
        let resource = store.create("a. b").await.expect("create");
        store
            .insert_many(vec![
                new_embedding(&resource.id, 0, [1.0, 0.0, 0.0]),
                new_embedding(&resource.id, 1, [0.0, 1.0, 0.0]),
            ])
            .await
            .expect("insert");
    }

    let (embeddings, resources) = store.clear_all().await.expect("clear");
    assert_eq!((embeddings, resources), (6, 3));
    assert_eq!(store.count().await.expect("count"), 0);
    assert!(store.list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn in_memory_store_shares_one_database() {
    let store = SqliteStore::in_memory(3).await.expect("open");
    let handle = store.clone();

    let resource = store.create("shared").await.expect("create");
    handle
        .insert_many(vec![new_embedding(&resource.id, 0, [0.0, 0.0, 1.0])])
        .await
        .expect("insert");

    let results = store
        .search(&[0.0, 0.0, 2.0], 0.1, 10)
        .await
        .expect("search");
    assert_eq!(results.len(), 1);
    assert!((results[0].similarity - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn initialize_from_config_creates_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let base_dir = temp_dir.path().join("nested").join(".floatchat");
    let mut config = Config::default();
    config.base_dir = base_dir.clone();

    let store = SqliteStore::initialize_from_config(&config)
        .await
        .expect("open");
    assert_eq!(store.dimension(), config.embedding.dimension as usize);
    assert!(base_dir.join("knowledge.db").exists());
}
