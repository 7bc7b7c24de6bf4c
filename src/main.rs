use clap::Parser;
use garage_billing::core::export::write_sessions_csv;
use garage_billing::core::garage::occupancy_statistics;
use garage_billing::core::ParkingStore;
use garage_billing::adapters::snapshot_store::DEFAULT_SNAPSHOT_FILE;
use garage_billing::utils::error::ErrorSeverity;
use garage_billing::utils::{logger, validation::Validate};
use garage_billing::{
    CliConfig, GarageConfig, InMemoryStore, LocalStorage, ParkingError, ReplayEngine,
    ReplayReport, SessionLifecycleManager, SnapshotStore, SystemClock,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("🚀 Starting garage-billing replay");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&config).await {
        Ok(report) => {
            println!(
                "✅ Replay completed: {} events, {} accepted, {} rejected",
                report.processed,
                report.accepted,
                report.rejected_total()
            );
            for (kind, count) in &report.rejected {
                println!("   {:?}: {}", kind, count);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Replay failed: {} (Kind: {:?}, Severity: {:?})",
                e,
                e.kind(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn load_layout(config: &CliConfig) -> Result<GarageConfig, ParkingError> {
    let layout = match &config.simulator_url {
        Some(url) => GarageConfig::fetch_from_simulator(url).await?,
        None => {
            tracing::info!("📁 Loading garage layout from: {}", config.config);
            GarageConfig::from_file(&config.config)?
        }
    };
    layout.validate()?;

    tracing::info!(
        "🏢 Garage '{}': {} sectors, {} spots, capacity {}",
        layout.name(),
        layout.sectors.len(),
        layout.spots.len(),
        layout.total_capacity()
    );
    Ok(layout)
}

async fn run(config: &CliConfig) -> Result<ReplayReport, ParkingError> {
    let layout = load_layout(config).await?;
    let (sectors, spots) = layout.to_layout();

    match &config.state_dir {
        Some(dir) => {
            let storage = LocalStorage::new(dir.clone());
            let store =
                SnapshotStore::open(storage, DEFAULT_SNAPSHOT_FILE, sectors, spots).await?;
            replay(Arc::new(store), config).await
        }
        None => replay(Arc::new(InMemoryStore::new(sectors, spots)), config).await,
    }
}

async fn replay<S: ParkingStore>(
    store: Arc<S>,
    config: &CliConfig,
) -> Result<ReplayReport, ParkingError> {
    let manager = SessionLifecycleManager::new(Arc::clone(&store), SystemClock);
    let engine = ReplayEngine::new(manager).with_fail_fast(config.fail_fast);

    let report = engine.run_file(&config.events).await?;

    for sector in occupancy_statistics(store.as_ref()).await? {
        tracing::info!(
            "📊 Sector {}: {}/{} occupied ({:.1}%), entry price now {}",
            sector.sector,
            sector.occupied,
            sector.max_capacity,
            sector.occupancy_percent,
            sector.current_price
        );
    }

    if let Some(path) = &config.export_sessions {
        let sessions = store.sessions().await?;
        let file = std::fs::File::create(path)?;
        write_sessions_csv(&sessions, file)?;
        tracing::info!("📁 Exported {} sessions to {}", sessions.len(), path);
    }

    Ok(report)
}
