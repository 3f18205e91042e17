use super::*;

#[test]
fn complete_valid_config() {
    let valid_toml = r#"
        [embedding]
        provider = "ollama"
        base_url = "http://gpu-box:11434"
        model = "mxbai-embed-large"
        dimension = 1024
        batch_size = 32
        api_key_env = ""
        input_type = "search_query"
        timeout_secs = 45
        retry_attempts = 2

        [retrieval]
        similarity_threshold = 0.5
        result_limit = 4
        embedding_timeout_secs = 90
        storage_timeout_secs = 10
        rollback_on_failure = false
    "#;

    let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
    assert!(config.validate().is_ok());
    assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
    assert_eq!(config.embedding.base_url, "http://gpu-box:11434");
    assert_eq!(config.embedding.model, "mxbai-embed-large");
    assert_eq!(config.embedding.retry_attempts, 2);
    assert_eq!(config.retrieval.result_limit, 4);
    assert!(!config.retrieval.rollback_on_failure);
    assert_eq!(
        config.retrieval.embedding_timeout(),
        std::time::Duration::from_secs(90)
    );
}

#[test]
fn empty_document_is_default() {
    let config: Config = toml::from_str("").expect("empty toml is valid");
    assert_eq!(config, Config::default());
}

#[test]
fn invalid_toml_handling() {
    let invalid_toml = r#"
        [embedding
        model = "embed-english-v3.0"
        dimension = "large"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
    assert!(result.is_err());
}

#[test]
fn error_display_messages() {
    let errors = vec![
        ConfigError::InvalidUrl("invalid-url".to_string()),
        ConfigError::InvalidBatchSize(0),
        ConfigError::InvalidModel(String::new()),
        ConfigError::MissingApiKey("COHERE_API_KEY".to_string()),
        ConfigError::InvalidSimilarityThreshold(2.0),
    ];

    for error in errors {
        let message = format!("{error}");
        assert!(message.len() > 10, "message too short: {message}");
    }
}
