//! campricer - camera resale valuation front-end
//!
//! Thin CLI over the pipeline library: photos or a free-text query go to
//! the recognition service, results land in the session list and the
//! durable history, and prices display in the selected currency.

use anyhow::Result;
use campricer_common::currency::convert_price;
use campricer_common::{config, currency::RateTable};
use campricer_core::services::csv_export;
use campricer_core::services::image_preparer::{ImageAsset, PrepareOptions};
use campricer_core::services::preferences;
use campricer_core::services::search::run_search;
use campricer_core::services::upload_pipeline::{run_upload, UploadPolicy};
use campricer_core::AppState;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "campricer",
    about = "Identify cameras from photos and estimate resale prices"
)]
struct Cli {
    /// Recognition service base URL (overrides env/config)
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Display currency code (USD, EUR, GBP, JPY, CAD, AUD, MXN, BRL)
    #[arg(long, global = true, default_value = "USD")]
    currency: String,

    /// Data directory override
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify one or more camera photos
    Upload {
        /// Image files to identify
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Send all photos as one single-subject batch
        #[arg(long)]
        batch: bool,

        /// Re-encode photos to WebP before upload
        #[arg(long)]
        webp: bool,
    },

    /// Look up a camera by name
    Search {
        /// Camera name to search for
        query: String,
    },

    /// Recent results
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Get or set the stored camera mode (single = batch, multi = per-item)
    Mode {
        /// New mode; omit to print the current one
        value: Option<String>,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List stored entries, newest first
    List,
    /// Remove one entry by id
    Remove { id: String },
    /// Clear all stored entries
    Clear,
    /// Export entries to CSV
    Export {
        /// Output path; defaults to a dated filename in the current directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let base_url = config::resolve_service_url(cli.service_url.as_deref());
    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref());

    info!("Starting campricer");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(service_url = %base_url, data_dir = %data_dir.display(), "configuration resolved");

    let state = AppState::init(&base_url, config::default_source(), &data_dir).await?;

    // Stand-in notification surface: log every domain event at debug level
    let mut events = state.event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(?event, "pipeline event");
        }
    });

    match cli.command {
        Command::Upload { paths, batch, webp } => {
            let assets: Vec<ImageAsset> = paths.iter().map(ImageAsset::from_path).collect();
            let policy = if batch {
                UploadPolicy::SingleBatch
            } else {
                preferences::load_upload_policy(&state.settings).await
            };
            let options = PrepareOptions {
                reencode_webp: webp,
            };

            let outcome = run_upload(&state, &assets, policy, &cli.currency, &options).await;

            let rates = state.refresh_rates().await;
            let results = state.results.lock().await;
            for group in results.groups() {
                if let Some(image) = &group.image_key {
                    println!("[{image}]");
                }
                for record in &group.records {
                    print_record(record, &cli.currency, &rates);
                }
            }
            if results.record_count() > 1 {
                let totals = results.totals();
                println!("Total eBay value: ${:.2}", totals.loose);
                println!("Total Amazon value: ${:.2}", totals.cib);
                println!("Total Facebook Marketplace value: ${:.2}", totals.new);
            }
            if let Some(summary) = outcome.failure_summary(assets.len()) {
                eprintln!("{summary}. Please try again.");
            }
        }

        Command::Search { query } => match run_search(&state, &query, &cli.currency).await {
            Ok(record) => {
                let rates = state.refresh_rates().await;
                print_record(&record, &cli.currency, &rates);
            }
            Err(e) => {
                eprintln!("Search failed: {e}");
                std::process::exit(1);
            }
        },

        Command::History { command } => match command {
            HistoryCommand::List => {
                let rates = state.refresh_rates().await;
                let recents = state.recents.lock().await;
                if recents.is_empty() {
                    println!("No recent results.");
                }
                for entry in recents.entries() {
                    println!(
                        "{}  {}  {}  eBay: {}  Amazon: {}  FB: {}",
                        entry.id,
                        entry.timestamp,
                        entry.camera,
                        convert_price(&entry.prices.ebay, &cli.currency, &rates),
                        convert_price(&entry.prices.amazon, &cli.currency, &rates),
                        convert_price(&entry.prices.facebook_marketplace, &cli.currency, &rates),
                    );
                }
            }
            HistoryCommand::Remove { id } => {
                let mut recents = state.recents.lock().await;
                if recents.remove(&id).await {
                    println!("Removed {id}");
                } else {
                    eprintln!("No entry with id {id}");
                    std::process::exit(1);
                }
            }
            HistoryCommand::Clear => {
                let mut recents = state.recents.lock().await;
                recents.clear().await;
                println!("Recent results cleared.");
            }
            HistoryCommand::Export { out } => {
                let rates = state.refresh_rates().await;
                let recents = state.recents.lock().await;
                if recents.is_empty() {
                    eprintln!("No recent results to export.");
                    std::process::exit(1);
                }
                let csv = csv_export::history_to_csv(recents.entries(), &cli.currency, &rates);
                let path =
                    out.unwrap_or_else(|| PathBuf::from(csv_export::default_export_filename()));
                tokio::fs::write(&path, csv).await?;
                println!("Exported {} entries to {}", recents.len(), path.display());
            }
        },

        Command::Mode { value } => match value.as_deref() {
            None => {
                let policy = preferences::load_upload_policy(&state.settings).await;
                match policy {
                    UploadPolicy::SingleBatch => println!("single (batch uploads)"),
                    UploadPolicy::PerItem => println!("multi (per-item uploads)"),
                }
            }
            Some("single") => {
                preferences::save_upload_policy(&state.settings, UploadPolicy::SingleBatch).await;
                println!("Camera mode set to single (batch uploads).");
            }
            Some("multi") => {
                preferences::save_upload_policy(&state.settings, UploadPolicy::PerItem).await;
                println!("Camera mode set to multi (per-item uploads).");
            }
            Some(other) => {
                eprintln!("Unknown mode '{other}'; expected 'single' or 'multi'");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn print_record(record: &campricer_common::types::CameraRecord, currency: &str, rates: &RateTable) {
    println!("{}", record.title);
    println!(
        "  eBay: {}",
        convert_price(&record.loose_price, currency, rates)
    );
    println!(
        "  Amazon: {}",
        convert_price(&record.cib_price, currency, rates)
    );
    println!(
        "  Facebook Marketplace: {}",
        convert_price(&record.new_price, currency, rates)
    );
    println!("  {}", record.information);
}
