use anyhow::Context;
use clap::Parser;
use rental_scout::scrapers::{self, Backend};
use rental_scout::{forward_interrupts, run_monitor, AppConfig, JsonSeenStore, RunPlan, SeenStore};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rental-scout", about = "Watch a rental site for new matching listings")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "rental-scout.toml")]
    config: PathBuf,

    /// Browser backend: headless-chrome or chromiumoxide
    #[arg(long)]
    backend: Option<Backend>,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Record results in the seen store (default is preview only)
    #[arg(long)]
    record: bool,

    /// Reject addresses on streets numbered above this
    #[arg(long)]
    max_street: Option<u32>,

    /// Where to write this run's listings
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_with_env(&cli.config)?;
    if let Some(backend) = cli.backend {
        config.browser.backend = backend;
    }
    if cli.headless {
        config.browser.headless = true;
    }
    if cli.record {
        config.output.dry_run = false;
    }
    if let Some(max_street) = cli.max_street {
        config.search.max_street_number = Some(max_street);
    }
    if let Some(output) = cli.output {
        config.output.results_path = output;
    }
    config.validate()?;

    info!("🏠 Rental Scout");
    info!("==========================================");

    let areas = config.area_codes()?;
    let store = JsonSeenStore::new(&config.output.seen_path);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if forward_interrupts(tokio::signal::ctrl_c, interrupt).await {
            std::process::exit(130);
        }
    });

    let surface = scrapers::launch(&config.browser).await?;
    let plan = RunPlan {
        criteria: &config.search,
        rules: &config.rules,
        areas: &areas,
        pacing: &config.pacing,
    };
    let result = run_monitor(surface.as_ref(), plan, &store, cancel).await?;

    if result.is_empty() {
        info!("No new listings.");
    } else {
        info!("✅ Found {} new listings", result.len());
    }

    for (i, listing) in result.listings.iter().enumerate() {
        let price = listing
            .price
            .map(|p| format!("${}", p))
            .unwrap_or_else(|| "price n/a".to_string());
        println!("{}. {} ({})", i + 1, listing.address, price);
        println!("   Neighborhood: {}", listing.neighborhood);
        println!("   ID: {}", listing.listing_id);
        println!("   URL: {}", listing.url);
        println!();
    }

    let json = serde_json::to_string_pretty(&result.listings)?;
    tokio::fs::write(&config.output.results_path, json)
        .await
        .with_context(|| format!("Failed to write {}", config.output.results_path.display()))?;
    info!("💾 Saved listings to {}", config.output.results_path.display());

    if config.output.dry_run {
        info!("Dry run: not recording listings in {}", store.path().display());
    } else {
        store.insert(&result.listings)?;
    }

    Ok(())
}
