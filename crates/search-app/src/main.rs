//! # codesearch
//!
//! Natural-language search over the contents of one or more source-code
//! repositories: crawl, chunk, summarize, embed, and persist into a
//! vector-capable Postgres store; query with hybrid ranking (vector
//! cosine similarity, weighted full-text relevance, path trigram
//! similarity, and domain-specific score nudges).
//!
//! ## Modules
//!
//! - [`search_app::config`] — TOML configuration parsing and validation
//! - [`search_app::db`] — Postgres connection management
//! - [`search_app::model`] — model provider selection (OpenAI-style, Vertex-style, stub)
//! - [`search_app::store`] — the Postgres-backed `Store`
//! - [`search_app::index`] — the walker and the indexing pipeline
//! - [`search_app::search`] — the query-time search service

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use search_core::store::SearchOpts;
use tokio_util::sync::CancellationToken;

use search_app::{config::Config, db, index, logging, model, search::SearchService, store::PostgresStore};

#[derive(Parser)]
#[command(
    name = "codesearch",
    about = "Hybrid natural-language search over source-code repositories",
    version
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "./codesearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the Postgres schema for the configured model's embedding dimension.
    Init,

    /// Index a local directory tree.
    Index {
        /// Absolute or relative path to the root of the tree to index.
        root: PathBuf,

        /// Logical repository label (e.g. a clone URL, or "local").
        #[arg(long)]
        repository: String,

        /// Symbolic ref label (branch, tag, or directory name).
        #[arg(long, default_value = "")]
        r#ref: String,
    },

    /// Search indexed chunks.
    Search {
        /// Search query text.
        query: String,

        /// Maximum number of results.
        #[arg(long, default_value_t = 10)]
        k: usize,

        /// Filter by repository.
        #[arg(long)]
        repository: Option<String>,

        /// Filter by ref.
        #[arg(long)]
        r#ref: Option<String>,

        /// Filter by language tag.
        #[arg(long)]
        language: Option<String>,

        /// Filter by a substring of path.
        #[arg(long)]
        path_contains: Option<String>,
    },

    /// List distinct repository labels present in the store.
    Repos,

    /// List distinct refs for a repository.
    ListRefs {
        repository: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    logging::init(&config.logging.level);

    let pool = db::connect(&config).await?;
    let store: Arc<dyn search_core::store::Store> = Arc::new(PostgresStore::new(pool));
    let model_client = model::create_client(&config.model)?;

    match cli.command {
        Commands::Init => {
            store.init_schema(model_client.dim()).await?;
            println!("schema initialized for dim {}", model_client.dim());
        }
        Commands::Index { root, repository, r#ref } => {
            store.init_schema(model_client.dim()).await?;
            let cancel = CancellationToken::new();
            let stats = index::run_index(
                &root,
                &repository,
                &r#ref,
                Arc::clone(&store),
                Arc::clone(&model_client),
                config.indexing.max_workers,
                config.indexing.queue_capacity_multiplier,
                cancel,
            )
            .await?;
            println!("files seen: {}", stats.files_seen);
            println!("chunks upserted: {}", stats.chunks_upserted);
            println!("summarized: {}", stats.summarized);
            println!("embedded: {}", stats.embedded);
            println!("errors: {}", stats.errors);
        }
        Commands::Search {
            query,
            k,
            repository,
            r#ref,
            language,
            path_contains,
        } => {
            let service = SearchService::new(Arc::clone(&store), Arc::clone(&model_client));
            let opts = SearchOpts {
                repository,
                r#ref,
                language,
                path_contains,
                query_text: String::new(),
            };
            let results = service.query(&query, k, opts).await?;
            for scored in results {
                println!(
                    "{:.4}  {}:{}-{}  {}",
                    scored.score, scored.chunk.path, scored.chunk.line_start, scored.chunk.line_end, scored.chunk.summary
                );
            }
        }
        Commands::Repos => {
            for repo in store.list_repositories().await? {
                println!("{repo}");
            }
        }
        Commands::ListRefs { repository } => {
            for r in store.list_refs(&repository).await? {
                println!("{r}");
            }
        }
    }

    Ok(())
}
