use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use paydash::aggregator::Aggregator;
use paydash::cache::{MemoryCache, RedisCache, StatsCache};
use paydash::config::{self, Config};
use paydash::jobs;
use paydash::reader::StatsReader;
use paydash::registry::TenantRegistry;
use paydash::store::tenant::PgTenantConnector;
use paydash::sync::{parse_date, SyncOrchestrator};
use paydash::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "paydash=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
        Some(cli::Commands::Sync { command }) => {
            let sync = build_orchestrator(&cfg).await?;
            handle_sync_command(command, &sync).await
        }
        Some(cli::Commands::Tenant { command }) => {
            handle_tenant_command(command, &TenantRegistry::new(&cfg.registry_path))
        }
    }
}

async fn connect_cache(cfg: &Config) -> anyhow::Result<Arc<dyn StatsCache>> {
    if cfg.redis_url == "memory" {
        tracing::warn!("using in-memory cache, stats will not survive restart");
        return Ok(Arc::new(MemoryCache::new()));
    }
    tracing::info!("connecting to Redis...");
    Ok(Arc::new(RedisCache::connect(&cfg.redis_url).await?))
}

async fn build_orchestrator(cfg: &Config) -> anyhow::Result<Arc<SyncOrchestrator>> {
    let cache = connect_cache(cfg).await?;
    let registry = TenantRegistry::new(&cfg.registry_path);
    let connector = Arc::new(PgTenantConnector::new(cfg.tenant_db_url.clone()));
    let aggregator = Arc::new(Aggregator::new(registry, connector));
    Ok(Arc::new(SyncOrchestrator::new(
        aggregator,
        cache,
        cfg.cache_ttl_secs,
    )))
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    let cache = connect_cache(&cfg).await?;
    let registry = TenantRegistry::new(&cfg.registry_path);
    let connector = Arc::new(PgTenantConnector::new(cfg.tenant_db_url.clone()));
    let aggregator = Arc::new(Aggregator::new(registry, connector));

    let sync = Arc::new(SyncOrchestrator::new(
        aggregator.clone(),
        cache.clone(),
        cfg.cache_ttl_secs,
    ));
    let reader = StatsReader::new(
        aggregator,
        cache.clone(),
        cfg.fallback_write_back,
        cfg.cache_ttl_secs,
    );

    let (queue, _worker) = jobs::worker::spawn(sync.clone(), cfg.sync_queue_depth);
    let scheduler = jobs::scheduler::spawn(
        sync.clone(),
        Duration::from_secs(cfg.sync_interval_secs),
    );
    tracing::info!(
        interval_secs = cfg.sync_interval_secs,
        "sync scheduler started"
    );

    let state = Arc::new(AppState { sync, reader, queue });

    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(paydash::api::api_router())
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("paydash listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // stop the ticker before exit; an in-flight pass finishes first
    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

async fn handle_sync_command(
    cmd: cli::SyncCommands,
    sync: &SyncOrchestrator,
) -> anyhow::Result<()> {
    match cmd {
        cli::SyncCommands::Day { date } => {
            let date = parse_date(&date)?;
            sync.sync_day(date).await?;
            sync.sync_summary(date).await?;
            println!("Synced {date}.");
        }
        cli::SyncCommands::Full => {
            sync.full_sync().await;
            println!("Full 30-day sync complete.");
        }
        cli::SyncCommands::Current => {
            sync.sync_current().await?;
            println!("Current day synced.");
        }
    }
    Ok(())
}

fn handle_tenant_command(
    cmd: cli::TenantCommands,
    registry: &TenantRegistry,
) -> anyhow::Result<()> {
    match cmd {
        cli::TenantCommands::List => {
            let list = registry.load()?;
            if list.databases.is_empty() {
                println!("No tenant databases registered.");
            } else {
                for db in &list.databases {
                    println!("{db}");
                }
            }
        }
        cli::TenantCommands::Add { name } => {
            if registry.add(&name)? {
                println!("Tenant '{name}' registered.");
            } else {
                println!("Tenant '{name}' is already registered.");
            }
        }
        cli::TenantCommands::Remove { name } => {
            if registry.remove(&name)? {
                println!("Tenant '{name}' removed.");
            } else {
                println!("Tenant '{name}' not found.");
            }
        }
    }
    Ok(())
}
