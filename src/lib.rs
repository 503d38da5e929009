pub mod api;
pub mod bus;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod polymarket;
pub mod services;
pub mod shutdown;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

use std::sync::Arc;

use crate::bus::EventBus;
use crate::db::Store;
use crate::intelligence::Analyzer;
use crate::services::notifications::NotificationService;
use crate::services::settings::SettingsHandle;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub settings: SettingsHandle,
    pub analyzer: Arc<Analyzer>,
    pub notifications: Arc<NotificationService>,
    pub bus: EventBus,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    /// Bearer token required on `/api/*`; `None` disables auth.
    pub api_token: Option<String>,
}
