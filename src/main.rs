use clap::{Parser, Subcommand};
use floatchat_retrieval::Result;
use floatchat_retrieval::commands::{
    add_resource, clear_knowledge_base, list_resources, query_knowledge_base, read_content,
};
use floatchat_retrieval::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "floatchat-retrieval")]
#[command(about = "Semantic retrieval over the FloatChat knowledge base")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding provider and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Add a resource to the knowledge base
    Add {
        /// Text to ingest
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        content: Option<String>,
        /// Read the text to ingest from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List stored resources
    List,
    /// Find the stored chunks most similar to a question
    Query {
        /// Question to search for
        question: String,
    },
    /// Delete every resource and embedding
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Add { content, file } => {
            let content = read_content(content, file.as_deref())?;
            add_resource(&Config::load_default()?, &content).await?;
        }
        Commands::List => {
            list_resources(&Config::load_default()?).await?;
        }
        Commands::Query { question } => {
            query_knowledge_base(&Config::load_default()?, &question).await?;
        }
        Commands::Clear { yes } => {
            clear_knowledge_base(&Config::load_default()?, yes).await?;
        }
    }

    Ok(())
}
