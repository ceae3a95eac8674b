use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as Lookback, NaiveDate, Utc};
use clap::Parser;
use tracing::info;

use nh_chat::NewsChat;
use nh_core::highlights::{compute_highlights, sort_rows, DEFAULT_TOP_N};
use nh_core::{AppConfig, Category, Error, Result, SortMode, TableSource};
use nh_inference::create_embedder;
use nh_storage::{create_search, CachedTables, SheetSource, Tables};
use nh_web::AppState;

const DEFAULT_LOOKBACK_DAYS: i64 = 14;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Search backend for the chat retrieval tools. Available backends:
    /// memory (default), weaviate (requires the weaviate feature)
    #[arg(long, default_value = "memory")]
    storage: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the JSON API server
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
    },
    /// Print ranked highlights for the given filters
    Highlights {
        #[arg(long)]
        category: Option<Category>,
        /// Inclusive lower bound, YYYY-MM-DD. Defaults to 14 days back.
        #[arg(long)]
        start_date: Option<String>,
        /// Inclusive upper bound, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        end_date: Option<String>,
        #[arg(long, default_value = "frequency")]
        sort: SortMode,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },
    /// One-shot agent query against the news database
    Chat { message: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { addr } => serve(&cli.storage, &config, &addr).await,
        Commands::Highlights {
            category,
            start_date,
            end_date,
            sort,
            top_n,
        } => highlights(&config, category, start_date, end_date, sort, top_n).await,
        Commands::Chat { message } => chat(&cli.storage, &config, &message).await,
    }
}

async fn serve(storage: &str, config: &AppConfig, addr: &str) -> Result<()> {
    let source = Arc::new(SheetSource::new(config.sheet_url.clone()));
    let tables = CachedTables::new(source, Duration::from_secs(config.cache_ttl_secs));

    let chat = match &config.openai_api_key {
        Some(api_key) => {
            let seed = seed_tables(storage, config).await?;
            let search = create_search(storage, config, seed).await?;
            let embedder = create_embedder(config)?;
            info!("🔎 Search backend initialized successfully (using {})", storage);
            Some(Arc::new(NewsChat::new(
                search,
                embedder,
                api_key.clone(),
                config.openai_base_url.clone(),
                config.model.clone(),
            )))
        }
        None => {
            info!("💬 Chat disabled: OPENAI_API_KEY is not set");
            None
        }
    };

    nh_web::serve(addr, AppState { tables, chat }).await
}

async fn highlights(
    config: &AppConfig,
    category: Option<Category>,
    start_date: Option<String>,
    end_date: Option<String>,
    sort: SortMode,
    top_n: usize,
) -> Result<()> {
    let source = Arc::new(SheetSource::new(config.sheet_url.clone()));
    let cache = CachedTables::new(source, Duration::from_secs(config.cache_ttl_secs));
    let tables = cache.get().await?;

    let today = Utc::now().date_naive();
    let end = match end_date.as_deref() {
        Some(s) => parse_cli_date(s)?,
        None => today,
    };
    let start = match start_date.as_deref() {
        Some(s) => parse_cli_date(s)?,
        None => today - Lookback::days(DEFAULT_LOOKBACK_DAYS),
    };

    let mut rows = compute_highlights(
        &tables.clusters,
        &tables.articles,
        category,
        start,
        end,
        top_n,
    );
    sort_rows(&mut rows, sort);

    if rows.is_empty() {
        println!("No highlights found for the selected filters.");
        return Ok(());
    }
    for (i, row) in rows.iter().enumerate() {
        let last = row
            .last_published
            .map(|d| format!(", last {}", d.format("%Y-%m-%d %H:%M")))
            .unwrap_or_default();
        println!(
            "{:2}. {}  [{} articles, {} sources{}]",
            i + 1,
            row.title.as_deref().unwrap_or("(untitled cluster)"),
            row.frequency,
            row.unique_sources,
            last
        );
        if !row.keywords.is_empty() {
            println!("      {}", row.keywords.join(", "));
        }
    }
    Ok(())
}

async fn chat(storage: &str, config: &AppConfig, message: &str) -> Result<()> {
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;

    let seed = seed_tables(storage, config).await?;
    let search = create_search(storage, config, seed).await?;
    let embedder = create_embedder(config)?;
    let chat = NewsChat::new(
        search,
        embedder,
        api_key,
        config.openai_base_url.clone(),
        config.model.clone(),
    );

    let session_id = chat.create_session().await;
    let answer = chat.query(&session_id, message).await?;
    println!("{}", answer);
    Ok(())
}

/// The memory backend holds nothing until it is seeded from the tables;
/// remote backends hold their own data.
async fn seed_tables(storage: &str, config: &AppConfig) -> Result<Option<Tables>> {
    if storage != "memory" {
        return Ok(None);
    }
    let source = SheetSource::new(config.sheet_url.clone());
    Ok(Some(Tables {
        clusters: source.load_clusters().await?,
        articles: source.load_articles().await?,
    }))
}

fn parse_cli_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidDate(format!("{}: {}", s, e)))
}
