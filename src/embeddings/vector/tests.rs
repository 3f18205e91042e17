use super::*;
use crate::ErrorKind;

#[test]
fn rejects_wrong_dimension() {
    let result = Embedding::try_new(vec![0.1, 0.2, 0.3], 4);
    let err = result.expect_err("three values should not fit four dimensions");
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn rejects_non_finite_values() {
    let err = Embedding::try_new(vec![0.1, f32::NAN], 2).expect_err("NaN is rejected");
    assert_eq!(err.kind(), ErrorKind::Embedding);
    assert!(Embedding::try_new(vec![f32::INFINITY, 0.1], 2).is_err());
}

#[test]
fn blob_encoding_preserves_values() {
    let embedding =
        Embedding::try_new(vec![0.5, -1.25, 3.0e-7, 42.0], 4).expect("valid embedding");
    let bytes = embedding.to_bytes();
    assert_eq!(bytes.len(), 16);

    let decoded = Embedding::from_bytes(&bytes, 4).expect("should decode");
    assert_eq!(decoded, embedding);
}

#[test]
fn truncated_blob_is_a_storage_error() {
    let err = Embedding::from_bytes(&[0, 0, 128], 1).expect_err("3 bytes is not an f32");
    assert_eq!(err.kind(), ErrorKind::Storage);

    let err = Embedding::from_bytes(&[0; 8], 3).expect_err("2 floats is not 3 dimensions");
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn identical_vectors_have_similarity_one() {
    let v = [0.3, -0.7, 0.2, 0.9];
    let similarity = cosine_similarity(&v, &v).expect("defined");
    assert!((similarity - 1.0).abs() < 1e-9);
}

#[test]
fn opposite_and_orthogonal_vectors() {
    let a = [1.0, 0.0];
    let b = [-1.0, 0.0];
    let c = [0.0, 2.0];

    let opposite = cosine_similarity(&a, &b).expect("defined");
    assert!((opposite + 1.0).abs() < 1e-9);

    let orthogonal = cosine_similarity(&a, &c).expect("defined");
    assert!(orthogonal.abs() < 1e-9);
}

#[test]
fn similarity_ignores_magnitude() {
    let a = [1.0, 2.0, 3.0];
    let b = [2.0, 4.0, 6.0];
    let similarity = cosine_similarity(&a, &b).expect("defined");
    assert!((similarity - 1.0).abs() < 1e-9);
}

#[test]
fn zero_vector_similarity_is_undefined() {
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
    assert_eq!(cosine_similarity(&[], &[]), None);
}
