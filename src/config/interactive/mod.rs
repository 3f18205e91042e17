#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, EmbeddingConfig, EmbeddingProvider};
use crate::embeddings::ollama::OllamaClient;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🌊 FloatChat Retrieval Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("Choose the model used to embed documents and questions.");
    eprintln!("Changing the model or dimension requires clearing the knowledge base.");
    eprintln!();

    configure_embedding(&mut config.embedding)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    match check_provider(&config.embedding) {
        Ok(()) => eprintln!("{}", style("✓ Embedding provider reachable!").green()),
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("⚠ Warning: provider check failed: {e}")).yellow()
            );
            eprintln!("You can continue, but ingestion and queries will fail until this is fixed.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.embedding.provider).cyan());
    eprintln!("  Base URL: {}", style(&config.embedding.base_url).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
    if config.embedding.provider == EmbeddingProvider::Cohere {
        let key_state = if config.embedding.api_key().is_ok() {
            style("set").green()
        } else {
            style("missing").red()
        };
        eprintln!(
            "  API Key: ${} ({})",
            style(&config.embedding.api_key_env).cyan(),
            key_state
        );
        eprintln!("  Input Type: {}", style(&config.embedding.input_type).cyan());
    }

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!(
        "  Similarity Threshold: > {}",
        style(config.retrieval.similarity_threshold).cyan()
    );
    eprintln!("  Result Limit: {}", style(config.retrieval.result_limit).cyan());
    eprintln!(
        "  Timeouts: embedding {}s, storage {}s",
        style(config.retrieval.embedding_timeout_secs).cyan(),
        style(config.retrieval.storage_timeout_secs).cyan()
    );
    eprintln!(
        "  Roll Back Failed Ingests: {}",
        style(config.retrieval.rollback_on_failure).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!("Database: {}", style(config.database_path().display()).dim());

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    let config_dir = Config::config_dir().context("Failed to locate config directory")?;
    Config::load(&config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.clone(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let providers = EmbeddingProvider::ALL;
    let default_index = providers
        .iter()
        .position(|&p| p == embedding.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(&providers)
        .interact()?;

    let provider = providers[provider_index];
    if provider != embedding.provider {
        embedding.set_provider(provider);
    }

    let base_url: String = Input::new()
        .with_prompt("Provider base URL")
        .default(embedding.base_url.clone())
        .validate_with(|input: &String| -> Result<(), String> {
            url::Url::parse(input)
                .map(|_| ())
                .map_err(|e| format!("Invalid URL: {e}"))
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(embedding.dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Texts per embedding request")
        .default(embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    if provider == EmbeddingProvider::Cohere {
        let api_key_env: String = Input::new()
            .with_prompt("Environment variable holding the API key")
            .default(embedding.api_key_env.clone())
            .interact_text()?;
        embedding.api_key_env = api_key_env;
    }

    embedding.set_base_url(base_url)?;
    embedding.set_model(model)?;
    embedding.set_dimension(dimension)?;
    embedding.set_batch_size(batch_size)?;

    Ok(())
}

fn check_provider(embedding: &EmbeddingConfig) -> Result<()> {
    match embedding.provider {
        EmbeddingProvider::Cohere => {
            embedding.api_key()?;
            Ok(())
        }
        EmbeddingProvider::Ollama => {
            let client = OllamaClient::new(embedding)?
                .with_timeout(std::time::Duration::from_secs(5))
                .with_retry_attempts(1);
            client.health_check()?;
            Ok(())
        }
    }
}
