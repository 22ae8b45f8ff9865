use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use sales_dashboard::{
    get_transaction, import_seed, AggregationEngine, CombinedPayload, Config, Dataset, ListQuery, MonthSelector,
    SeedSource, SqliteStore,
};

#[derive(Parser)]
#[command(name = "sales-dashboard")]
#[command(about = "Import the product transaction seed and report monthly sales")]
struct Cli {
    #[arg(short, long, env = "SALES_CONFIG", help = "Path to configuration file")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the seed dataset (configured URL unless --file is given)
    Import {
        #[arg(long, help = "Local JSON or CSV seed file")]
        file: Option<PathBuf>,
    },
    /// Print statistics, bar chart and pie chart data for a month
    Report {
        #[arg(short, long, help = "Month number (1-12) or name")]
        month: String,
    },
    /// Print one page of transactions
    List {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = ListQuery::DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Print one transaction by id
    Show { id: i64 },
    /// Print past imports, most recent first
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.level))
        .with_writer(std::io::stderr)
        .init();

    let store = SqliteStore::open(&config.database.path)
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    let store = Arc::new(store);
    let dataset = Dataset::with_read_timeout(store.clone(), config.read_timeout());

    match cli.command {
        Commands::Import { file } => run_import(&dataset, &config, file).await,
        Commands::Report { month } => run_report(dataset, &month).await,
        Commands::List {
            search,
            page,
            per_page,
        } => run_list(&dataset, search, page, per_page).await,
        Commands::Show { id } => run_show(&store, id),
        Commands::History => run_history(&store),
    }
}

async fn run_import(dataset: &Dataset, config: &Config, file: Option<PathBuf>) -> Result<()> {
    let source = file.map_or_else(|| config.seed_source(), SeedSource::File);
    info!(%source, "Importing seed data");

    let inserted = import_seed(dataset, &source, config.seed_timeout())
        .await
        .with_context(|| format!("Failed to import from {source}"))?;
    let total = dataset.count().await?;

    println!("✓ Inserted: {} transactions", inserted);
    println!("✓ Database contains {} transactions", total);
    Ok(())
}

async fn run_report(dataset: Dataset, month: &str) -> Result<()> {
    let month: MonthSelector = month.parse()?;
    let engine = AggregationEngine::new(dataset);
    let combined = engine.compute_combined(month).await?;

    eprintln!("📊 Report for {}", month);
    println!("{}", serde_json::to_string_pretty(&CombinedPayload::from(combined))?);
    Ok(())
}

async fn run_list(
    dataset: &Dataset,
    search: Option<String>,
    page: u32,
    per_page: u32,
) -> Result<()> {
    anyhow::ensure!(page >= 1 && per_page >= 1, "page and per-page must be at least 1");

    let transactions = dataset
        .list(ListQuery {
            search,
            page,
            per_page: per_page.min(ListQuery::MAX_PER_PAGE),
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&transactions)?);
    Ok(())
}

fn run_show(store: &SqliteStore, id: i64) -> Result<()> {
    let transaction = get_transaction(store, id)?
        .with_context(|| format!("No transaction with id {id}"))?;

    println!("{}", serde_json::to_string_pretty(&transaction)?);
    Ok(())
}

fn run_history(store: &SqliteStore) -> Result<()> {
    let history = store.import_history()?;
    if history.is_empty() {
        println!("No imports yet");
        return Ok(());
    }

    for import in history {
        println!(
            "{}  {}  received {}, inserted {}  ({})",
            import.timestamp.format("%Y-%m-%d %H:%M:%S"),
            import.source,
            import.received,
            import.inserted,
            import.import_id
        );
    }
    Ok(())
}
