use axum::extract::{Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::ApiResponse;
use crate::errors::AppError;
use crate::models::{EventFilter, EventType, Side, TradeEvent};
use crate::AppState;

const MAX_PAGE_SIZE: i64 = 1000;

/// Query-string form of [`EventFilter`]. `event_types` is comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventQuery {
    pub event_types: Option<String>,
    pub market_name: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub side: Option<String>,
    pub min_size: Option<Decimal>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub fresh_wallets_only: Option<bool>,
    pub min_risk_score: Option<f64>,
    pub max_wallet_bet_count: Option<i32>,
}

impl EventQuery {
    pub fn into_filter(self) -> Result<EventFilter, AppError> {
        let event_types = match self.event_types.as_deref() {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    EventType::from_api_str(s)
                        .ok_or_else(|| AppError::BadRequest(format!("unknown event type: {s}")))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let side = match self.side.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                Side::from_api_str(raw)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown side: {raw}")))?,
            ),
        };

        let limit = self.limit.unwrap_or(0);
        if !(0..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "limit must be between 0 and {MAX_PAGE_SIZE}"
            )));
        }

        Ok(EventFilter {
            event_types,
            market_name: self.market_name.unwrap_or_default(),
            min_price: self.min_price.unwrap_or_default(),
            max_price: self.max_price.unwrap_or_default(),
            side,
            min_size: self.min_size.unwrap_or_default(),
            limit,
            offset: self.offset.unwrap_or(0).max(0),
            fresh_wallets_only: self.fresh_wallets_only.unwrap_or(false),
            min_risk_score: self.min_risk_score.unwrap_or(0.0),
            max_wallet_bet_count: self.max_wallet_bet_count.unwrap_or(0),
        })
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<ApiResponse<Vec<TradeEvent>>>, AppError> {
    let filter = query.into_filter()?;
    let events = state.store.get_events(&filter).await?;
    Ok(ApiResponse::ok(events))
}

/// Purge every stored event and wallet, and forget cached profiles.
pub async fn clear(State(state): State<AppState>) -> Result<Json<ApiResponse<bool>>, AppError> {
    state.store.clear_events().await?;
    state.analyzer.clear_cache().await;
    tracing::info!("Events and wallets cleared");
    Ok(ApiResponse::ok(true))
}
