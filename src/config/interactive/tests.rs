use super::check_provider as check_provider_impl;
use super::*;

#[test]
fn cohere_check_requires_api_key() {
    let embedding = EmbeddingConfig {
        api_key_env: "FLOATCHAT_INTERACTIVE_KEY_NEVER_SET".to_string(),
        ..EmbeddingConfig::default()
    };
    let err = check_provider_impl(&embedding).expect_err("key is not set");
    assert!(err.to_string().contains("FLOATCHAT_INTERACTIVE_KEY_NEVER_SET"));
}

#[test]
fn unreachable_ollama_fails_check() {
    let mut embedding = EmbeddingConfig::default();
    embedding.set_provider(EmbeddingProvider::Ollama);
    // port 9 (discard) is never an Ollama server
    embedding
        .set_base_url("http://127.0.0.1:9".to_string())
        .expect("valid url");
    assert!(check_provider_impl(&embedding).is_err());
}
