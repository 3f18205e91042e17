use anyhow::{Context, Result, bail};
use console::style;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::database::{EmbeddingStore, ResourceStore, SqliteStore};
use crate::retrieval::{IngestOutcome, RetrievalService, format_context};

const LIST_PREVIEW_CHARS: usize = 80;

/// Pick the text to ingest from the positional argument or `--file`.
#[inline]
pub fn read_content(content: Option<String>, file: Option<&Path>) -> Result<String> {
    match (content, file) {
        (Some(content), None) => Ok(content),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read content file: {}", path.display())),
        (Some(_), Some(_)) => bail!("Pass either content or --file, not both"),
        (None, None) => bail!("Nothing to add: pass content or --file <path>"),
    }
}

/// Ingest `content` into the knowledge base
#[inline]
pub async fn add_resource(config: &Config, content: &str) -> Result<IngestOutcome> {
    let service = RetrievalService::from_config(config)
        .await
        .context("Failed to initialize retrieval service")?;

    let outcome = service
        .ingest(content)
        .await
        .context("Failed to add resource")?;

    info!("Added resource {}", outcome.resource_id);
    println!(
        "{} Added resource {} ({} chunks embedded)",
        style("✓").green(),
        style(&outcome.resource_id).cyan(),
        outcome.chunk_count
    );
    Ok(outcome)
}

/// List stored resources with their chunk counts
#[inline]
pub async fn list_resources(config: &Config) -> Result<()> {
    let store = SqliteStore::initialize_from_config(config)
        .await
        .context("Failed to open knowledge base")?;

    let resources = store
        .list_all()
        .await
        .context("Failed to list resources")?;

    if resources.is_empty() {
        println!("The knowledge base is empty.");
        println!("Use 'floatchat-retrieval add <content>' to add a resource.");
        return Ok(());
    }

    println!("Resources ({} total):", resources.len());
    println!();

    for resource in &resources {
        let chunks = store
            .list_for_resource(&resource.id)
            .await
            .context("Failed to list resource chunks")?;

        println!("{}", style(&resource.id).cyan());
        println!("   Chunks: {}", chunks.len());
        println!(
            "   Created: {}",
            resource.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!("   Content: {}", preview(&resource.content));
        println!();
    }

    let total = store.count().await.context("Failed to count embeddings")?;
    println!("Total embeddings: {}", total);

    Ok(())
}

/// Run a similarity query and print the ranked chunks
#[inline]
pub async fn query_knowledge_base(config: &Config, question: &str) -> Result<()> {
    let service = RetrievalService::from_config(config)
        .await
        .context("Failed to initialize retrieval service")?;

    let results = service
        .query(question)
        .await
        .context("Failed to query knowledge base")?;

    if results.is_empty() {
        println!(
            "No content scored above similarity {}.",
            service.options().similarity_threshold
        );
        return Ok(());
    }

    println!("Top {} results:", results.len());
    println!();
    for result in &results {
        println!(
            "{} {}",
            style(format!("[{:.4}]", result.similarity)).yellow(),
            result.content.trim()
        );
    }

    println!();
    println!("{}", style("Context:").bold());
    println!("{}", format_context(&results));

    Ok(())
}

/// Delete every resource and embedding
#[inline]
pub async fn clear_knowledge_base(config: &Config, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("Refusing to clear the knowledge base without --yes");
    }

    let store = SqliteStore::initialize_from_config(config)
        .await
        .context("Failed to open knowledge base")?;

    let (embeddings, resources) = store
        .clear_all()
        .await
        .context("Failed to clear knowledge base")?;
    store
        .optimize()
        .await
        .context("Failed to compact database")?;

    println!(
        "{} Deleted {} resources and {} embeddings",
        style("✓").green(),
        resources,
        embeddings
    );
    Ok(())
}

fn preview(content: &str) -> String {
    let flattened = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = flattened.chars();
    let mut head: String = chars.by_ref().take(LIST_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        head.push_str("...");
    }
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.base_dir = temp_dir.path().to_path_buf();
        config
    }

    #[test]
    fn read_content_from_argument() {
        let content = read_content(Some("Argo floats".to_string()), None).expect("content");
        assert_eq!(content, "Argo floats");
    }

    #[test]
    fn read_content_from_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "Salinity. Temperature.").expect("write");

        let content = read_content(None, Some(&path)).expect("content");
        assert_eq!(content, "Salinity. Temperature.");
    }

    #[test]
    fn read_content_requires_exactly_one_source() {
        assert!(read_content(None, None).is_err());
        assert!(read_content(Some("x".to_string()), Some(Path::new("y.txt"))).is_err());
        assert!(read_content(None, Some(Path::new("/definitely/missing.txt"))).is_err());
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("one\n  two"), "one two");
        let long = "word ".repeat(40);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), LIST_PREVIEW_CHARS + 3);
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let temp_dir = TempDir::new().expect("temp dir");
        let config = temp_config(&temp_dir);

        assert!(clear_knowledge_base(&config, false).await.is_err());
        assert!(!config.database_path().exists());
    }

    #[tokio::test]
    async fn list_and_clear_empty_knowledge_base() {
        let temp_dir = TempDir::new().expect("temp dir");
        let config = temp_config(&temp_dir);

        list_resources(&config).await.expect("list");
        clear_knowledge_base(&config, true).await.expect("clear");
        assert!(config.database_path().exists());
    }
}
