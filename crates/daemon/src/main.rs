use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heraldtv_core::{
    load_config, validate_config, ChatVotePerspective, Clock, DotaClientLauncher,
    HeraldOrchestrator, HttpReplayStore, IrcConnector, LogPresenter, MatchDiscoverer,
    MatchHistory, OpenDotaClient, PerspectiveSelector, PlaybackLauncher, ProcessedLedger,
    RandomPerspective, ReplayFetcher, ReplayStore, ScenePresenter, SystemClock, VoteCollector,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("HERALDTV_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Playback client: {:?}", config.playback.client_path);
    info!("Replay directory: {:?}", config.fetcher.replay_dir);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let api: Arc<dyn MatchHistory> = Arc::new(OpenDotaClient::new(config.match_history.clone()));
    info!("Match-history backend: {}", api.name());

    let store: Arc<dyn ReplayStore> =
        Arc::new(HttpReplayStore::new(config.match_history.timeout_secs as u64));

    let ledger = Arc::new(
        ProcessedLedger::open(&config.ledger.path)
            .with_context(|| format!("Failed to open ledger at {:?}", config.ledger.path))?,
    );
    info!("Dedup ledger loaded ({} matches)", ledger.len());

    let discoverer = Arc::new(MatchDiscoverer::new(
        config.discovery.clone(),
        Arc::clone(&api),
        Arc::clone(&clock),
    ));

    let fetcher = Arc::new(ReplayFetcher::new(
        config.fetcher.clone(),
        Arc::clone(&api),
        store,
        Arc::clone(&ledger),
        Arc::clone(&clock),
    ));

    let launcher: Arc<dyn PlaybackLauncher> =
        Arc::new(DotaClientLauncher::new(config.playback.clone()));

    // The spectated perspective is chat-voted when a vote section is
    // configured, otherwise random.
    let selector: Arc<dyn PerspectiveSelector> = match &config.vote {
        Some(vote_config) => {
            info!(
                channel = %vote_config.channel,
                window_secs = vote_config.window_secs,
                "Chat voting enabled"
            );
            let connector = Arc::new(IrcConnector::new(vote_config.clone()));
            let collector =
                VoteCollector::new(vote_config.clone(), connector, Arc::clone(&clock));
            Arc::new(ChatVotePerspective::new(collector))
        }
        None => {
            info!("Chat voting not configured, using random perspective");
            Arc::new(RandomPerspective::new(10))
        }
    };

    let presenter: Arc<dyn ScenePresenter> = Arc::new(LogPresenter);

    let orchestrator = HeraldOrchestrator::new(
        config.orchestrator.clone(),
        discoverer,
        fetcher,
        launcher,
        selector,
        presenter,
        ledger,
        clock,
    );

    orchestrator.start().await;
    info!("Pipeline started");

    shutdown_signal().await;

    info!("Shutting down...");
    orchestrator.stop().await;

    let status = orchestrator.status().await;
    info!(
        matches_played = status.matches_played,
        matches_discovered = status.matches_discovered,
        "Pipeline stopped"
    );

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
