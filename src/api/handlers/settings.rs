use axum::extract::State;
use axum::Json;

use super::ApiResponse;
use crate::errors::AppError;
use crate::models::{EventFilter, NotificationConfig, WatcherConfig};
use crate::AppState;

pub async fn get_config(State(state): State<AppState>) -> Json<ApiResponse<WatcherConfig>> {
    ApiResponse::ok(state.settings.config_snapshot().await)
}

pub async fn update_config(
    State(state): State<AppState>,
    Json(config): Json<WatcherConfig>,
) -> Result<Json<ApiResponse<WatcherConfig>>, AppError> {
    state.settings.update_config(config).await?;
    Ok(ApiResponse::ok(state.settings.config_snapshot().await))
}

pub async fn get_filter(State(state): State<AppState>) -> Json<ApiResponse<EventFilter>> {
    ApiResponse::ok(state.settings.filter_snapshot().await)
}

pub async fn update_filter(
    State(state): State<AppState>,
    Json(filter): Json<EventFilter>,
) -> Result<Json<ApiResponse<EventFilter>>, AppError> {
    state.settings.update_filter(filter).await?;
    Ok(ApiResponse::ok(state.settings.filter_snapshot().await))
}

/// The bot token is masked in every response.
pub async fn get_notifications(State(state): State<AppState>) -> Json<ApiResponse<NotificationConfig>> {
    ApiResponse::ok(state.notifications.config().await.redacted())
}

/// A masked token sent back unchanged keeps the stored one.
pub async fn update_notifications(
    State(state): State<AppState>,
    Json(mut config): Json<NotificationConfig>,
) -> Result<Json<ApiResponse<NotificationConfig>>, AppError> {
    let current = state.notifications.config().await;
    config.restore_redacted_token(&current);
    state.notifications.update_config(config).await?;
    Ok(ApiResponse::ok(state.notifications.config().await.redacted()))
}

/// Deliver the test message synchronously so the caller sees the outcome.
pub async fn send_test(State(state): State<AppState>) -> Result<Json<ApiResponse<bool>>, AppError> {
    state.notifications.send_test().await?;
    Ok(ApiResponse::ok(true))
}
