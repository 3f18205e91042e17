use super::*;
use crate::ErrorKind;
use crate::embeddings::Embedding;

fn rows() -> Vec<(&'static str, Vec<f32>)> {
    vec![
        ("north", vec![0.0, 1.0]),
        ("north-east", vec![1.0, 1.0]),
        ("east", vec![1.0, 0.0]),
        ("south", vec![0.0, -1.0]),
        ("origin", vec![0.0, 0.0]),
    ]
}

fn rank(rows: &[(&'static str, Vec<f32>)], query: &[f32], min: f64, limit: usize) -> Vec<SearchResult> {
    rank_by_similarity(
        rows.iter().map(|(c, v)| (*c, v.as_slice())),
        query,
        min,
        limit,
    )
}

#[test]
fn orders_by_similarity_descending() {
    let results = rank(&rows(), &[0.0, 1.0], -1.0, 10);
    let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    // "south" sits exactly at -1.0 and the zero vector has no similarity
    assert_eq!(contents, vec!["north", "north-east", "east"]);
    assert!((results[0].similarity - 1.0).abs() < 1e-9);
    assert!((results[1].similarity - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    assert!(results[2].similarity.abs() < 1e-9);
}

#[test]
fn threshold_is_strict() {
    let results = rank(&rows(), &[0.0, 1.0], 0.0, 10);
    assert!(results.iter().all(|r| r.similarity > 0.0));
    assert_eq!(results.len(), 2, "east scores exactly 0.0 and is excluded");

    let results = rank(&rows(), &[0.0, 1.0], 0.9, 10);
    assert_eq!(results.len(), 1);
    assert!(results.iter().all(|r| r.similarity > 0.9));
}

#[test]
fn limit_caps_results() {
    let many: Vec<(&'static str, Vec<f32>)> = (0..25).map(|_| ("same", vec![1.0, 0.5])).collect();
    let results = rank(&many, &[1.0, 0.5], 0.1, 10);
    assert_eq!(results.len(), 10);

    let results = rank(&many, &[1.0, 0.5], 0.1, 0);
    assert!(results.is_empty());
}

#[test]
fn ties_keep_insertion_order() {
    let tied = vec![
        ("first", vec![2.0, 0.0]),
        ("better", vec![1.0, 0.1]),
        ("second", vec![1.0, 0.0]),
        ("third", vec![5.0, 0.0]),
    ];
    let results = rank(&tied, &[1.0, 0.0], 0.1, 10);
    let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third", "better"]);
}

#[test]
fn ties_at_the_limit_boundary_prefer_earlier_rows() {
    let tied = vec![("a", vec![1.0]), ("b", vec![1.0]), ("c", vec![1.0])];
    let results = rank(&tied, &[1.0], 0.1, 2);
    let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["a", "b"]);
}

#[test]
fn empty_candidates_give_empty_results() {
    let results = rank(&[], &[1.0, 0.0], 0.1, 10);
    assert!(results.is_empty());
}

#[test]
fn ranker_counts_scanned_rows() {
    let mut ranker = SimilarityRanker::new(&[1.0, 0.0], 0.5, 10);
    ranker.offer("match", &[1.0, 0.0]);
    ranker.offer("miss", &[0.0, 1.0]);
    assert_eq!(ranker.scanned(), 2);
    assert_eq!(ranker.finish().len(), 1);
}

#[test]
fn dimension_checks() {
    assert!(check_query_dimension(&[0.1, 0.2], 2).is_ok());
    let err = check_query_dimension(&[0.1], 2).expect_err("wrong dimension");
    assert_eq!(err.kind(), ErrorKind::Storage);

    let record = |dim: usize| NewEmbedding {
        resource_id: "r".to_string(),
        chunk_index: 0,
        content: "c".to_string(),
        embedding: Embedding::try_new(vec![0.5; dim], dim).expect("valid"),
    };
    assert!(check_record_dimensions(&[record(3), record(3)], 3).is_ok());
    let err = check_record_dimensions(&[record(3), record(4)], 3).expect_err("mixed batch");
    assert_eq!(err.kind(), ErrorKind::Storage);
}
