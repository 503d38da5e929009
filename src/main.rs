use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use polywatch::api::create_router;
use polywatch::bus::EventBus;
use polywatch::config::AppConfig;
use polywatch::db::{self, PgStore, Store};
use polywatch::ingestion::{run_feed_listener, run_pipeline, Pipeline};
use polywatch::intelligence::{Analyzer, WalletCache};
use polywatch::models::TradeEvent;
use polywatch::polymarket::ProfileClient;
use polywatch::services::{run_wallet_refresher, NotificationService, SettingsHandle, TelegramMessenger};
use polywatch::shutdown::signalled;
use polywatch::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // rustls needs a process-wide crypto provider before the first TLS handshake
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = polywatch::metrics::init_metrics()?;

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let settings = SettingsHandle::load(store.clone(), config.notification_seed()).await;
    let bus = EventBus::default();

    let stats = ProfileClient::new(config.profile_stats_url.clone(), config.external_call_timeout)?;
    let analyzer = Arc::new(Analyzer::new(
        Arc::new(stats),
        store.clone(),
        settings.clone(),
        WalletCache::new(config.wallet_cache_ttl, config.wallet_cache_capacity),
        config.external_call_timeout,
    ));

    let messenger = TelegramMessenger::new(config.external_call_timeout)?;
    let notifications = Arc::new(NotificationService::new(
        store.clone(),
        settings.clone(),
        Arc::new(messenger),
        config.external_call_timeout,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    // --- Notifications: bus → Telegram ---
    tasks.push(tokio::spawn(
        notifications.clone().run(bus.subscribe(), shutdown_rx.clone()),
    ));

    // --- Background wallet refresh ---
    tasks.push(tokio::spawn(run_wallet_refresher(
        analyzer.clone(),
        store.clone(),
        bus.clone(),
        config.refresh_config(),
        shutdown_rx.clone(),
    )));

    // --- Ingestion: live feed → save-filter → store + bus ---
    let (feed_tx, feed_rx) = mpsc::channel::<TradeEvent>(1000);
    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        settings.clone(),
        bus.clone(),
        analyzer.clone(),
        config.enrich_on_ingest,
    ));
    tasks.push(tokio::spawn(run_pipeline(feed_rx, pipeline, shutdown_rx.clone())));

    if config.feed_enabled {
        tasks.push(tokio::spawn(run_feed_listener(
            config.live_ws_url.clone(),
            feed_tx,
            shutdown_rx.clone(),
        )));
    } else {
        tracing::warn!("FEED_ENABLED=false, live feed listener will not start");
        drop(feed_tx);
    }

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    let state = AppState {
        store,
        settings,
        analyzer,
        notifications,
        bus,
        metrics_handle,
        api_token: config.api_token.clone(),
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");

    let mut server_shutdown = shutdown_rx.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { signalled(&mut server_shutdown).await })
        .await?;

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task panicked");
        }
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
