//! Operator CLI: crawl once, list stored posts, run the analysis, or keep crawling on a schedule.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chatter_sentiment::analysis::{render_posts, render_report, run_analysis};
use chatter_sentiment::api::{DEFAULT_POST_LIMIT, MAX_POST_LIMIT};
use chatter_sentiment::crawl::default_crawlers;
use chatter_sentiment::scheduler::{run_cycle, spawn_scheduler};
use chatter_sentiment::sentiment::LexiconScorer;
use chatter_sentiment::store::{PostStore, SqlitePostStore};
use chatter_sentiment::{logging, AppConfig};

#[derive(Parser)]
#[command(name = "chatter")]
#[command(about = "Ticker chatter crawler and sentiment outlook")]
#[command(version)]
struct Cli {
    /// Config file (TOML or JSON); defaults to $CHATTER_CONFIG_PATH or config/chatter.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all crawlers once and print post counts per source
    Crawl,

    /// Show recent posts
    Show {
        /// Only this source (reddit, news, ...)
        #[arg(long)]
        source: Option<String>,

        #[arg(long, default_value_t = DEFAULT_POST_LIMIT)]
        limit: usize,
    },

    /// Score unscored posts, predict, and print the report
    Analyze,

    /// Crawl on the configured interval until Ctrl+C (default)
    Schedule,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(p) => AppConfig::load_from(p)?,
        None => AppConfig::load_default()?,
    };
    let store = SqlitePostStore::open(&cfg.db_path.to_string_lossy()).await?;
    let scorer = LexiconScorer::new();

    match cli.command.unwrap_or(Commands::Schedule) {
        Commands::Crawl => {
            let crawlers = default_crawlers(&cfg)?;
            let report = run_cycle(&crawlers, &store, &scorer).await;
            if !report.crawl.failed.is_empty() {
                println!("Failed crawlers: {}", report.crawl.failed.join(", "));
            }
            let counts = store.post_counts().await?;
            println!("\nPost counts by source:");
            for (source, count) in &counts {
                println!("  {source}: {count}");
            }
            if counts.is_empty() {
                println!("  (no posts collected)");
            }
        }

        Commands::Show { source, limit } => {
            let limit = limit.clamp(1, MAX_POST_LIMIT);
            let posts = store.recent_posts(source.as_deref(), limit).await?;
            let counts = store.post_counts().await?;
            print!("{}", render_posts(&posts, &counts));
        }

        Commands::Analyze => {
            let report = run_analysis(&store, &scorer, cfg.window_days).await?;
            print!("{}", render_report(&cfg.ticker, &report));
        }

        Commands::Schedule => {
            println!("Starting scheduled crawler. Press Ctrl+C to stop.");
            let handle = spawn_scheduler(
                default_crawlers(&cfg)?,
                Arc::new(store),
                Arc::new(scorer),
                cfg.crawl_interval_minutes,
            );
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl+C")?;
            handle.abort();
            println!("Scheduler stopped.");
        }
    }
    Ok(())
}
