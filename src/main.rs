use anyhow::Context;
use clap::Parser;
use skill_progress::core::report;
use skill_progress::domain::ports::ProfileRepository;
use skill_progress::utils::{logger, validation::Validate};
use skill_progress::{
    CliConfig, EngineConfig, HttpRepository, MemoryRepository, OutputFormat, StatisticsEngine,
    StatsError,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting skill-progress for profile {}", cli.profile_id);

    let settings = match cli.resolve().and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    tracing::debug!("Resolved settings: {:?}", settings);
    let format: OutputFormat = settings.format.parse()?;

    let repository: Arc<dyn ProfileRepository> = match &cli.snapshot {
        Some(path) => {
            tracing::info!("📁 Reading profile tree from snapshot {}", path);
            let repository = MemoryRepository::from_snapshot_file(path)
                .with_context(|| format!("failed to load snapshot '{}'", path))?;
            Arc::new(repository)
        }
        None => Arc::new(HttpRepository::from_config(&settings)?),
    };

    let engine = StatisticsEngine::new(repository, EngineConfig::from_provider(&settings));
    tracing::debug!("Engine config: {:?}", engine.config());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling aggregation");
            on_signal.cancel();
        }
    });

    let stats = match engine
        .get_profile_statistics_cancellable(cli.profile_id, &cancel)
        .await
    {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            let exit_code = match e {
                StatsError::TimedOut { .. } => {
                    eprintln!("💡 {}", e.recovery_suggestion());
                    124
                }
                _ => 130,
            };
            std::process::exit(exit_code);
        }
    };

    if stats.is_empty() {
        tracing::warn!("No statistics available for profile {}", cli.profile_id);
    }

    match report::render(&stats, format) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!("❌ Rendering failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(3);
        }
    }

    Ok(())
}
