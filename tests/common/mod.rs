use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use polywatch::api::create_router;
use polywatch::bus::EventBus;
use polywatch::ingestion::Pipeline;
use polywatch::intelligence::{Analyzer, WalletCache};
use polywatch::models::{EventType, NotificationConfig, TradeEvent};
use polywatch::services::{NotificationService, SettingsHandle};
use polywatch::testkit::{MemoryStore, RecordingMessenger, StubStatsSource};
use polywatch::AppState;

/// Fully wired application over in-memory doubles.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub source: Arc<StubStatsSource>,
    pub messenger: Arc<RecordingMessenger>,
    pub pipeline: Pipeline,
}

#[allow(dead_code)]
pub async fn build_test_app(api_token: Option<&str>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(StubStatsSource::new());
    let messenger = Arc::new(RecordingMessenger::new());
    let settings = SettingsHandle::load(store.clone(), None).await;
    let bus = EventBus::new(64);

    let analyzer = Arc::new(Analyzer::new(
        source.clone(),
        store.clone(),
        settings.clone(),
        WalletCache::default(),
        Duration::from_secs(5),
    ));
    let notifications = Arc::new(NotificationService::new(
        store.clone(),
        settings.clone(),
        messenger.clone(),
        Duration::from_secs(5),
    ));
    let pipeline = Pipeline::new(store.clone(), settings.clone(), bus.clone(), analyzer.clone(), true);

    // Render-only handle; no global recorder is installed in tests.
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

    let state = AppState {
        store: store.clone(),
        settings,
        analyzer,
        notifications,
        bus,
        metrics_handle,
        api_token: api_token.map(str::to_string),
    };

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        source,
        messenger,
        pipeline,
    }
}

/// Telegram config that passes `is_configured`.
#[allow(dead_code)]
pub fn telegram_config() -> NotificationConfig {
    NotificationConfig {
        enabled: true,
        telegram_bot_token: "123:abc".into(),
        telegram_chat_ids: vec!["42".into()],
        notify_big_trades: true,
        notify_fresh_wallets: true,
        ..NotificationConfig::default()
    }
}

#[allow(dead_code)]
pub fn make_trade(wallet: &str, price: &str, size: &str) -> TradeEvent {
    let mut event = TradeEvent::new(EventType::Trade);
    event.wallet_address = wallet.into();
    event.price = price.into();
    event.size = size.into();
    event.trade_id = format!("{wallet}-{price}-{size}");
    event.market_name = "Will BTC close above $100k?".into();
    event
}
