//! Impresario Studio Server - long-running autonomous show production.
//!
//! This binary drives showrunner cycles on a fixed interval: drain
//! carried-over tasks, ask the impresario for new ones, run the troupe,
//! and route outputs into the show store. State lives in PostgreSQL when
//! `DATABASE_URL` is set, otherwise in memory for the life of the process.

use clap::Parser;
use impresario_database::PgStore;
use impresario_forge::ForgePolicy;
use impresario_interface::{CycleObserver, ShowStore, StoreObserver, TaskStore, TelemetryStore};
use impresario_models::HttpCompletionClient;
use impresario_showrunner::{PlaybookLibrary, Showrunner, TroupeRegistry};
use impresario_storage::MemoryStore;
use impresario_studio::{StudioConfig, StudioServer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the studio server.
#[derive(Parser, Debug)]
#[command(name = "studio-server")]
#[command(about = "Impresario Studio Server - Autonomous show production")]
#[command(version)]
struct Args {
    /// Path to studio configuration file
    #[arg(short, long, default_value = "studio.toml")]
    config: PathBuf,

    /// Database URL for show persistence
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Validate configuration and exit without running cycles
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("Starting Impresario Studio Server");
    info!(config_file = ?args.config, "Loading configuration");

    let config = if args.config.exists() {
        StudioConfig::from_file(&args.config)?
    } else {
        warn!(config_file = ?args.config, "Config file not found, using defaults");
        StudioConfig::default()
    };
    info!(
        cycle_interval_secs = config.cycle_interval_secs,
        model = %config.driver.model,
        "Configuration loaded"
    );

    let troupe = Arc::new(match &config.troupe_path {
        Some(path) => TroupeRegistry::from_file(path)?,
        None => TroupeRegistry::default_troupe(),
    });
    let playbooks = match &config.playbook_path {
        Some(path) => PlaybookLibrary::from_file(path)?,
        None => PlaybookLibrary::builtin(),
    };
    let policy = match &config.policy_path {
        Some(path) => ForgePolicy::from_file(path)?,
        None => ForgePolicy::default(),
    };
    info!(
        blocklist_rules = policy.blocklist.len(),
        allowed_domains = policy.allowed_domains.len(),
        "Forge policy loaded"
    );

    if args.dry_run {
        info!("DRY RUN MODE - No cycles will be run");
        for worker in troupe.list() {
            info!(
                worker = %worker.name(),
                role = %worker.role(),
                task_types = worker.permitted_task_types().len(),
                "Worker validated"
            );
        }
        info!(
            workers = troupe.len(),
            playbooks = playbooks.len(),
            "Configuration validation complete"
        );
        return Ok(());
    }

    let api_key = std::env::var(&config.driver.api_key_env).ok();
    if api_key.is_none() {
        warn!(
            env_var = %config.driver.api_key_env,
            "API key not set, driver requests will be unauthenticated"
        );
    }
    let driver = Arc::new(
        HttpCompletionClient::new(
            config.driver.base_url.clone(),
            api_key,
            config.driver.model.clone(),
            Duration::from_secs(config.driver.request_timeout_secs),
        )?
        .with_max_retries(config.driver.max_retries),
    );

    let (tasks, show, observer): (
        Arc<dyn TaskStore>,
        Arc<dyn ShowStore>,
        Arc<dyn CycleObserver>,
    ) = match &args.database_url {
        Some(url) => {
            info!("PostgreSQL show store enabled");
            let store = Arc::new(PgStore::new(impresario_database::connect_to(url)?));
            store.run_migrations().await?;
            info!("Migrations applied");
            (
                store.clone(),
                store.clone(),
                Arc::new(StoreObserver::new(store as Arc<dyn TelemetryStore>)),
            )
        }
        None => {
            warn!("DATABASE_URL not set - using in-memory store, show state is lost on exit");
            let store = Arc::new(MemoryStore::new());
            (
                store.clone(),
                store.clone(),
                Arc::new(StoreObserver::new(store as Arc<dyn TelemetryStore>)),
            )
        }
    };

    let runner = Showrunner::new(
        driver,
        tasks,
        show,
        troupe,
        playbooks,
        observer,
        config.showrunner.clone(),
    );
    let server = StudioServer::new(runner, Duration::from_secs(config.cycle_interval_secs));
    let metrics = server.metrics();

    // Set up graceful shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    info!(
        interval_secs = config.cycle_interval_secs,
        "Studio server running. Press CTRL+C to shutdown."
    );

    server.run(shutdown).await;

    let snap = metrics.snapshot();
    info!(
        cycles = snap.cycles_run,
        failed = snap.cycles_failed,
        completed = snap.tasks_completed,
        rejected = snap.tasks_rejected,
        "Studio server stopped gracefully"
    );

    Ok(())
}
