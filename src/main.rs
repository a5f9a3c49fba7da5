mod db;
mod error;
mod extract;
mod fetcher;
mod query;
mod scrape_loop;
mod server;
mod settings;
mod usage;
mod worker;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::db::Store;
use crate::fetcher::HttpFetcher;
use crate::scrape_loop::Scraper;
use crate::settings::Settings;
use crate::worker::ScrapeWorker;

#[derive(Parser)]
#[command(name = "notice_board", about = "University notice board scraper")]
struct Cli {
    /// SQLite database path (overrides NOTICES_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background scraper until Ctrl-C
    Run,
    /// Run a single scrape cycle now
    Scrape,
    /// List current notices, pinned first
    List {
        /// Max rows to display
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Report host CPU, disk and memory usage
    Usage {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    execute(cli.command, cli.db).await
}

/// Settings are loaded only by the commands that touch the board or the database.
async fn execute(command: Commands, db: Option<PathBuf>) -> anyhow::Result<()> {
    match command {
        Commands::Run => {
            let settings = load_settings(db)?;
            let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
                .await
                .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
            let worker = ScrapeWorker::spawn(build_scraper(&settings)?, settings.schedule());
            info!(
                "Serving notices from {:?} on http://{}; press Ctrl-C to stop",
                settings.db_path,
                listener.local_addr()?
            );
            let served = axum::serve(listener, server::router(settings.db_path.clone()))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("HTTP server failed");
            worker.shutdown().await?;
            served
        }
        Commands::Scrape => {
            let settings = load_settings(db)?;
            let mut scraper = build_scraper(&settings)?;
            let report = scraper.run_cycle().await?;
            println!(
                "Replaced snapshot: {} notices from {} pages in {:.1}s",
                report.rows,
                report.pages,
                report.elapsed.as_secs_f64()
            );
            Ok(())
        }
        Commands::List { limit, json } => {
            let settings = load_settings(db)?;
            let store = Store::open(&settings.db_path)?;
            let mut notices = query::list_notices(&store)?;
            if let Some(n) = limit {
                notices.truncate(n);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&notices)?);
                return Ok(());
            }
            if notices.is_empty() {
                println!("No notices yet. Run 'scrape' or 'run' first.");
                return Ok(());
            }

            println!(
                "{:>7} | {:<40} | {:<12} | {:<10} | {:>7}",
                "#", "Title", "Author", "Date", "Views"
            );
            println!("{}", "-".repeat(88));
            for n in &notices {
                let seq = if n.row.sequence_number == extract::PINNED_SEQUENCE {
                    "pinned".to_string()
                } else {
                    n.row.sequence_number.to_string()
                };
                println!(
                    "{:>7} | {:<40} | {:<12} | {:<10} | {:>7}",
                    seq,
                    truncate(&n.row.title, 40),
                    truncate(&n.row.author, 12),
                    n.row.published_date,
                    n.row.view_count
                );
            }
            println!("\n{} notices", notices.len());
            Ok(())
        }
        Commands::Usage { json } => {
            let u = usage::sample().await;
            if json {
                println!("{}", serde_json::to_string(&u)?);
            } else {
                println!("CPU:    {:>6.2}%", u.cpu_usage);
                println!("Disk:   {:>6.2}%", u.hdd_usage);
                println!("Memory: {:>6.2}%", u.mem_usage);
            }
            Ok(())
        }
    }
}

fn load_settings(db: Option<PathBuf>) -> anyhow::Result<Settings> {
    let mut settings = Settings::load()?;
    if let Some(db) = db {
        settings.db_path = db;
    }
    Ok(settings)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => error!("Failed to listen for Ctrl-C, shutting down: {}", e),
    }
}

fn build_scraper(settings: &Settings) -> anyhow::Result<Scraper<HttpFetcher>> {
    let fetcher = HttpFetcher::new(
        &settings.base_url,
        settings.http_timeout(),
        &settings.user_agent,
    )?;
    let store = Store::open(&settings.db_path)?;
    Ok(Scraper::new(
        fetcher,
        store,
        settings.pages(),
        settings.alignment(),
    ))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
