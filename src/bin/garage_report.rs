use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use garage_billing::adapters::memory_store::{GarageState, InMemoryStore};
use garage_billing::adapters::snapshot_store::{load_snapshot, DEFAULT_SNAPSHOT_FILE};
use garage_billing::core::garage::{garage_snapshot, occupancy_statistics};
use garage_billing::utils::{logger, validation::Validate};
use garage_billing::{GarageConfig, LocalStorage, RevenueAggregator, SystemClock};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "garage-report")]
#[command(about = "Read-side queries over a persisted garage state")]
struct Args {
    /// Garage layout file, used only when no snapshot exists yet
    #[arg(short, long, default_value = "garage.toml")]
    config: String,

    /// Directory holding the persisted garage state
    #[arg(long)]
    state_dir: String,

    /// Revenue date (YYYY-MM-DD)
    #[arg(long, requires = "sector")]
    date: Option<NaiveDate>,

    /// Revenue sector code
    #[arg(long, requires = "date")]
    sector: Option<String>,

    /// Print the garage layout as JSON
    #[arg(long)]
    garage: bool,

    /// Print per-sector occupancy statistics
    #[arg(long)]
    stats: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let layout = GarageConfig::from_file(&args.config)
        .with_context(|| format!("failed to load garage layout '{}'", args.config))?;
    layout.validate().context("garage layout is invalid")?;
    let (sectors, spots) = layout.to_layout();

    // 只讀取快照，查詢不會改動 state 目錄
    let storage = LocalStorage::new(args.state_dir.clone());
    let state = load_snapshot(&storage, DEFAULT_SNAPSHOT_FILE)
        .await
        .with_context(|| format!("failed to read garage state in '{}'", args.state_dir))?
        .unwrap_or_else(|| GarageState::new(sectors, spots));
    let store = Arc::new(InMemoryStore::from_state(state));

    if args.garage {
        let snapshot = garage_snapshot(store.as_ref()).await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    if args.stats {
        println!("📊 Parking Statistics:");
        for sector in occupancy_statistics(store.as_ref()).await? {
            println!(
                "  Sector {}: {}/{} occupied ({:.1}%), {} free spots - {} {}/hour",
                sector.sector,
                sector.occupied,
                sector.max_capacity,
                sector.occupancy_percent,
                sector.free_spots,
                layout.currency(),
                sector.current_price
            );
        }
    }

    if let (Some(date), Some(sector)) = (args.date, args.sector.as_deref()) {
        let aggregator =
            RevenueAggregator::new(Arc::clone(&store), SystemClock).with_currency(layout.currency());
        match aggregator.report(date, sector).await {
            Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 {}", e.recovery_suggestion());
                std::process::exit(if e.is_business_rejection() { 1 } else { 3 });
            }
        }
    }

    Ok(())
}
