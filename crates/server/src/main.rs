mod api;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bindery_core::content::{ContentStore, SqliteContentStore};
use bindery_core::events::{create_event_log, EventStore, PipelineEvent, SqliteEventStore};
use bindery_core::pipeline::{
    build_registry, recover_interrupted_tasks, replay_completed_stages, Dispatcher, StageSequencer,
};
use bindery_core::processor::{HttpProcessorClient, ProcessorClient};
use bindery_core::task::{SqliteTaskStore, TaskFilter, TaskStatus, TaskStore};
use bindery_core::translation::{SqliteTranslationStore, TranslationCoordinator, TranslationStore};
use bindery_core::{load_config, validate_config};

use api::create_router;
use state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

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
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("BINDERY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Processing service: {}", config.processor.base_url);

    // Compute config hash for the event log
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Create SQLite stores
    let tasks: Arc<dyn TaskStore> = Arc::new(
        SqliteTaskStore::new(&config.database.path).context("Failed to create task store")?,
    );
    let content: Arc<dyn ContentStore> = Arc::new(
        SqliteContentStore::new(&config.database.path).context("Failed to create content store")?,
    );
    let translations: Arc<dyn TranslationStore> = Arc::new(
        SqliteTranslationStore::new(&config.database.path)
            .context("Failed to create translation store")?,
    );
    let event_store: Arc<dyn EventStore> = Arc::new(
        SqliteEventStore::new(&config.database.path).context("Failed to create event store")?,
    );
    info!("Stores initialized");

    // Create the event log system and spawn its writer
    let (events, event_writer) = create_event_log(Arc::clone(&event_store), config.events.buffer_size);
    let writer_handle = tokio::spawn(event_writer.run());

    events
        .emit(PipelineEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;

    // Processing collaborator client
    let processor: Arc<dyn ProcessorClient> = Arc::new(HttpProcessorClient::new(&config.processor));

    // Recover tasks interrupted by a previous process, before any work is
    // accepted
    let report = recover_interrupted_tasks(
        &tasks,
        config.dispatcher.stale_after_secs as u64,
        &events,
    )
    .await
    .context("Recovery scan failed")?;
    info!(
        requeued = report.requeued,
        exhausted = report.exhausted,
        "Recovery scan finished"
    );

    // Stage execution
    let sequencer = StageSequencer::new(Arc::clone(&content), events.clone());

    // Repair projects whose completed task never advanced them, e.g. when
    // a crash landed between the completion write and the stage advance
    let advanced = replay_completed_stages(&tasks, &sequencer)
        .await
        .context("Stage replay failed")?;
    if advanced > 0 {
        info!(advanced, "Re-applied project stage advances");
    }

    let registry = build_registry(
        Arc::clone(&content),
        Arc::clone(&processor),
        Arc::clone(&translations),
    );
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&tasks),
        registry,
        sequencer.clone(),
        events.clone(),
        config.dispatcher.workers,
        config.dispatcher.queue_capacity,
    ));

    // Re-enqueue everything pending, including tasks the recovery scan just
    // re-queued
    let pending = tasks
        .list(&TaskFilter::new().with_status(TaskStatus::Pending).with_limit(i64::MAX))
        .context("Failed to list pending tasks")?;
    for task in &pending {
        if let Err(e) = dispatcher.submit(&task.id) {
            warn!(task_id = %task.id, "Could not enqueue pending task: {}", e);
        }
    }
    if !pending.is_empty() {
        info!(count = pending.len(), "Re-enqueued pending tasks");
    }

    // Translation fan-out
    let coordinator = TranslationCoordinator::new(
        Arc::clone(&translations),
        Arc::clone(&content),
        Arc::clone(&processor),
        events.clone(),
    );

    // Create app state and router
    let app_state = Arc::new(AppState::new(
        config.clone(),
        tasks,
        content,
        translations,
        event_store,
        events.clone(),
        Arc::clone(&dispatcher),
        sequencer.clone(),
        coordinator.clone(),
    ));
    let app = create_router(app_state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Drain in-flight tasks before closing the event log
    info!("Server shutting down...");
    dispatcher.stop().await;

    events
        .emit(PipelineEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // Drop all holders of the event log handle so the writer's channel
    // closes. The dispatcher and sequencer hold clones; the router's state
    // was dropped when the server stopped.
    drop(dispatcher);
    drop(sequencer);
    drop(coordinator);
    drop(events);

    let _ = writer_handle.await;
    info!("Event log writer stopped");

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
